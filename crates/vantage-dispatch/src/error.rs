use thiserror::Error;

/// Errors surfaced by the handler registry and dispatcher.
#[derive(Error, Debug)]
pub enum DispatchError {
    /// Any error not covered by the other variants.
    #[error("{0}")]
    Other(anyhow::Error),

    /// `RegisterHandler` was called twice for the same (eventType, name).
    #[error("handler {name} is already registered for event type {event_type}")]
    DuplicateHandler { event_type: String, name: String },

    /// A handler returned an error that asks for its event to be re-queued.
    #[error("handler {handler} requested retry for its event")]
    RetryRequested { handler: String },

    /// The session's cancellation token fired before in-flight handlers
    /// drained within the shutdown deadline.
    #[error("dispatcher did not drain within the shutdown deadline")]
    DrainTimedOut,
}

impl From<anyhow::Error> for DispatchError {
    fn from(error: anyhow::Error) -> Self {
        DispatchError::Other(error)
    }
}

pub type DispatchResult<T> = Result<T, DispatchError>;
