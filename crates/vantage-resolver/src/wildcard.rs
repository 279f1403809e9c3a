//! Per-parent-subdomain wildcard classifier (§4.4). State is serialized by
//! funneling classification requests through a single consumer task, the
//! same request/response channel pattern used elsewhere for single-writer
//! state.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use trust_dns_resolver::proto::rr::RecordType;
use vantage_common::channel::{request_channel, RequestClient, RequestProcessor};
use vantage_common::random::random_probe_labels;

use crate::pool::ResolverPool;

const PROBE_COUNT: usize = 5;
const PROBE_GAP: Duration = Duration::from_secs(1);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WildcardKind {
    None,
    Static,
    Dynamic,
}

#[derive(Clone, Debug, Default)]
struct WildcardEntry {
    kind: Option<WildcardKind>,
    sample_answers: Vec<String>,
}

/// A query for the `classify` worker: the subdomain to evaluate.
struct ClassifyRequest {
    subdomain: String,
}

/// The tag carried on a resolved request, per the match rule's CERT bypass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestTag {
    Normal,
    Axfr,
    Cert,
}

type ClassifyClient = RequestClient<ClassifyRequest, WildcardEntry>;

/// Public handle to the wildcard detector. Cheap to clone; every clone talks
/// to the same single-writer classification task.
#[derive(Clone)]
pub struct WildcardDetector {
    client: ClassifyClient,
}

impl WildcardDetector {
    /// Spawns the classification worker and returns a handle to it.
    pub fn spawn(pool: Arc<ResolverPool>) -> Self {
        let (client, processor) = request_channel();
        tokio::spawn(run_worker(pool, processor));
        WildcardDetector { client }
    }

    /// Returns `true` if `name` matches a wildcard ancestor and should be
    /// dropped, per the match rule in §4.4. `records` are the answers the
    /// caller obtained resolving `name`; `tag` carries the CERT bypass.
    pub async fn matches(
        &self,
        name: &str,
        records: &[String],
        tag: RequestTag,
    ) -> anyhow::Result<bool> {
        if tag == RequestTag::Cert {
            return Ok(false);
        }
        for ancestor in ancestors(name) {
            let entry = self
                .client
                .send(ClassifyRequest {
                    subdomain: ancestor,
                })
                .await
                .map_err(|e| anyhow::anyhow!(e))?;
            let matched = match entry.kind {
                Some(WildcardKind::Dynamic) => true,
                Some(WildcardKind::Static) => {
                    records.is_empty() || shares_value(records, &entry.sample_answers)
                }
                _ => false,
            };
            if matched {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

/// Ancestors of `name`, from just-below-the-apex up to the apex (excluding
/// the full name itself and the root).
fn ancestors(name: &str) -> Vec<String> {
    let labels: Vec<&str> = name.trim_end_matches('.').split('.').collect();
    let mut result = Vec::new();
    for i in 1..labels.len().saturating_sub(1) {
        result.push(labels[i..].join("."));
    }
    result
}

fn shares_value(a: &[String], b: &[String]) -> bool {
    a.iter()
        .any(|x| b.iter().any(|y| x.eq_ignore_ascii_case(y)))
}

async fn run_worker(pool: Arc<ResolverPool>, mut processor: RequestProcessor<ClassifyRequest, WildcardEntry>) {
    let mut state: HashMap<String, WildcardEntry> = HashMap::new();
    while let Some(message) = processor.recv().await {
        let subdomain = message.request.subdomain.clone();
        if let Some(entry) = state.get(&subdomain) {
            message.respond(entry.clone());
            continue;
        }
        let entry = classify(&pool, &subdomain).await;
        state.insert(subdomain, entry.clone());
        message.respond(entry);
    }
}

async fn classify(pool: &ResolverPool, subdomain: &str) -> WildcardEntry {
    let labels = random_probe_labels(subdomain, PROBE_COUNT);
    let mut probe_results: Vec<Vec<String>> = Vec::with_capacity(labels.len());

    for (i, label) in labels.iter().enumerate() {
        if i > 0 {
            sleep(PROBE_GAP).await;
        }
        let mut answers = Vec::new();
        for qtype in [RecordType::CNAME, RecordType::A, RecordType::AAAA] {
            if let Ok(found) = pool.resolve(label, qtype).await {
                answers.extend(found);
            }
        }
        probe_results.push(answers);
    }

    if probe_results.iter().all(|r| r.is_empty()) {
        return WildcardEntry {
            kind: Some(WildcardKind::None),
            sample_answers: Vec::new(),
        };
    }

    let first = &probe_results[0];
    let all_share_a_value = !first.is_empty()
        && probe_results
            .iter()
            .skip(1)
            .all(|r| shares_value(first, r));

    if all_share_a_value {
        WildcardEntry {
            kind: Some(WildcardKind::Static),
            sample_answers: first.clone(),
        }
    } else {
        WildcardEntry {
            kind: Some(WildcardKind::Dynamic),
            sample_answers: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ancestors_walks_from_just_below_apex_to_apex() {
        assert_eq!(
            ancestors("www.corp.example.com"),
            vec!["corp.example.com", "example.com"]
        );
    }

    #[test]
    fn ancestors_of_a_bare_sld_is_empty() {
        assert!(ancestors("example.com").is_empty());
    }

    #[test]
    fn shares_value_is_case_insensitive() {
        assert!(shares_value(
            &["203.0.113.1".to_string()],
            &["203.0.113.1".to_string()]
        ));
        assert!(shares_value(
            &["Example.com.".to_string()],
            &["example.COM.".to_string()]
        ));
    }
}
