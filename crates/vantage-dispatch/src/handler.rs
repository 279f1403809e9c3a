use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use vantage_graph::AssetKind;

use crate::dispatcher::DispatchHandle;
use crate::event::Event;

/// Default handler priority, per the contract (`priority ∈ [1..9]`).
pub const DEFAULT_PRIORITY: u8 = 5;

/// A plugin handler, invoked once per dispatched [Event] whose entity kind
/// matches [Handler::event_type]. Object-safe via `async_trait` so handlers
/// of different concrete types can share one registry.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Name of the plugin this handler belongs to, e.g. `"dns"`.
    fn plugin_name(&self) -> &str;

    /// This handler's own name, unique within its plugin.
    fn handler_name(&self) -> &str;

    /// Priority, higher runs first; handlers at a priority level must all
    /// complete before the next level begins.
    fn priority(&self) -> u8 {
        DEFAULT_PRIORITY
    }

    /// The entity kind this handler subscribes to.
    fn event_type(&self) -> AssetKind;

    /// The entity kinds this handler may create, used for diagnostics and
    /// to validate the handler graph at registration time.
    fn transforms(&self) -> Vec<AssetKind> {
        Vec::new()
    }

    /// Maximum concurrent invocations of this handler across the session.
    fn max_instances(&self) -> usize {
        10
    }

    /// Invoked for each matching event. `suppressed` is `true` when the TTL
    /// cache found this (entity, source) pair monitored within its window —
    /// the handler must still run but should short-circuit to a
    /// lookup-only path rather than re-issuing external calls.
    async fn handle(
        &self,
        event: Event,
        handle: DispatchHandle,
        suppressed: bool,
        cancel: CancellationToken,
    ) -> anyhow::Result<()>;
}
