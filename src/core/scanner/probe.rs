// src/core/scanner/probe.rs

use crate::core::cancel::CancelFlag;
use crate::core::events::{EventSink, ScanEvent};
use crate::core::knowledge_base::{CATALOG, DetectionRule, ProbeObservation};
use crate::core::models::{Endpoint, Finding, FindingLog};
use crate::core::scanner::http::{ProbeClient, ProbeRequest};
use std::sync::Arc;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Result of probing one parameter of an endpoint.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ParameterOutcome {
    pub finding: Option<Finding>,
    pub requests_sent: usize,
    pub requests_failed: usize,
}

/// Tries the catalog against one parameter, in catalog order, and stops at the
/// first payload whose oracle fires.
pub async fn probe_parameter(
    client: &dyn ProbeClient,
    endpoint: &Endpoint,
    param: &str,
    catalog: &[DetectionRule],
) -> ParameterOutcome {
    let mut outcome = ParameterOutcome::default();

    for rule in catalog {
        for payload in rule.payloads {
            let request = ProbeRequest {
                method: endpoint.method,
                url: endpoint.url.clone(),
                params: endpoint
                    .params
                    .iter()
                    .map(|(name, value)| {
                        let value = if name == param { (*payload).to_string() } else { value.clone() };
                        (name.clone(), value)
                    })
                    .collect(),
            };
            outcome.requests_sent += 1;

            let response = match client.send(&request).await {
                Ok(response) => response,
                Err(e) => {
                    warn!(url = %endpoint.url, param, error = %e, "Probe request failed.");
                    outcome.requests_failed += 1;
                    continue;
                }
            };

            let observation = ProbeObservation { body: &response.body, elapsed: response.elapsed };
            if rule.matches(payload, &observation) {
                info!(category = %rule.category, url = %endpoint.url, param, payload, "Oracle fired.");
                outcome.finding = Some(Finding {
                    url: endpoint.url.clone(),
                    param: param.to_string(),
                    payload: (*payload).to_string(),
                    category: rule.category,
                });
                return outcome;
            }
        }
    }
    outcome
}

/// Runs every parameter of one endpoint, handing findings to `found` as soon
/// as they are confirmed.
async fn probe_endpoint(
    client: &dyn ProbeClient,
    endpoint: &Endpoint,
    events: &EventSink,
    found: &mpsc::Sender<Finding>,
) {
    let mut failed = 0;
    for param in endpoint.params.keys() {
        let outcome = probe_parameter(client, endpoint, param, CATALOG).await;
        failed += outcome.requests_failed;
        if let Some(finding) = outcome.finding {
            if found.send(finding).await.is_err() {
                return;
            }
        }
    }
    if failed > 0 {
        events
            .warning(format!("{} probe request(s) to {} failed.", failed, endpoint.url))
            .await;
    }
}

/// Concurrent payload testing for one web target.
pub struct ProbeStage<'a> {
    pub client: Arc<dyn ProbeClient>,
    pub events: &'a EventSink,
    pub cancel: &'a CancelFlag,
    pub workers: usize,
}

impl ProbeStage<'_> {
    /// Probes every endpoint on a bounded pool of worker tasks.
    ///
    /// Each worker runs one endpoint's parameters in order through
    /// [`probe_parameter`] and sends confirmed findings to a single collector,
    /// which emits `vulnerability_found` and appends to `findings`.
    ///
    /// # Arguments
    ///
    /// * `endpoints` - Units derived from the crawl of one web target.
    /// * `findings` - The session's append-only finding log.
    ///
    /// # Returns
    ///
    /// How many endpoints were dispatched to a worker.
    ///
    /// # Cancellation
    ///
    /// The flag is checked before each dispatch and before each finding is
    /// recorded. Workers already running finish their requests, but whatever
    /// they report after the stop is discarded.
    pub async fn run(&self, endpoints: Vec<Endpoint>, findings: &mut FindingLog) -> usize {
        let total = endpoints.len();
        let workers = self.workers.max(1);
        info!(endpoints = total, workers, "Starting probe stage.");

        let (tx, mut rx) = mpsc::channel::<Finding>(workers * 4);
        let semaphore = Arc::new(Semaphore::new(workers));

        let dispatch = async {
            let mut tasks = JoinSet::new();
            let mut dispatched = 0;

            for endpoint in endpoints {
                if self.cancel.is_cancelled() {
                    break;
                }
                let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else { break };
                // The wait for a free worker may have outlasted the session.
                if self.cancel.is_cancelled() {
                    break;
                }

                let client = Arc::clone(&self.client);
                let events = self.events.clone();
                let found = tx.clone();
                tasks.spawn(async move {
                    let _permit = permit;
                    debug!(url = %endpoint.url, method = %endpoint.method, "Probing endpoint.");
                    probe_endpoint(client.as_ref(), &endpoint, &events, &found).await;
                });
                dispatched += 1;
            }
            drop(tx);

            if dispatched < total {
                self.events
                    .warning(format!("Probe stopped: {} of {} endpoints were not tested.", total - dispatched, total))
                    .await;
            }
            while let Some(joined) = tasks.join_next().await {
                if let Err(e) = joined {
                    error!(error = %e, "Probe worker panicked.");
                    self.events.error(format!("A probe worker crashed: {}", e)).await;
                }
            }
            dispatched
        };

        let collect = async {
            let mut discarded = 0;
            // Drain to the end so workers never block on a full channel.
            while let Some(finding) = rx.recv().await {
                if self.cancel.is_cancelled() {
                    debug!(url = %finding.url, param = %finding.param, "Discarding finding reported after stop.");
                    discarded += 1;
                    continue;
                }
                self.events.emit(ScanEvent::VulnerabilityFound(finding.clone())).await;
                findings.push(finding);
            }
            if discarded > 0 {
                info!(discarded, "Findings reported after stop were not recorded.");
            }
        };

        let (dispatched, ()) = tokio::join!(dispatch, collect);
        info!(dispatched, findings = findings.len(), "Probe stage finished.");
        dispatched
    }
}
