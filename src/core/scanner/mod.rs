// src/core/scanner/mod.rs

// The stages of a session, in the order the orchestrator drives them.
pub mod resolve;
pub mod nmap;
pub mod recon;
pub mod renderer;
pub mod crawler;
pub mod http;
pub mod probe;

use crate::config::ScanOptions;
use crate::core::cancel::CancelFlag;
use crate::core::error::ScanError;
use crate::core::events::{EventSink, ScanEvent, ScanSummary};
use crate::core::models::{CrawlResult, FindingLog, ReconResult, ScanSession, SessionOutcome, SessionState};
use self::crawler::{CrawlStage, parameterized_urls};
use self::http::{ProbeClient, ReqwestProbeClient, build_client};
use self::nmap::{NmapScanner, PortScanner};
use self::probe::ProbeStage;
use self::recon::ReconStage;
use self::renderer::{HttpRenderer, PageRenderer};
use self::resolve::{DnsResolver, TargetResolver};
use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use url::Url;

/// Ports that get the crawl-and-probe treatment when found open.
pub const WEB_PORTS: &[u16] = &[80, 443, 8080, 8443, 8000, 3000, 5000, 9000];
const TLS_PORTS: &[u16] = &[443, 8443];

/// Base URL of the web service on `port`.
pub fn web_target(address: IpAddr, port: u16) -> Option<Url> {
    let scheme = if TLS_PORTS.contains(&port) { "https" } else { "http" };
    Url::parse(&format!("{}://{}/", scheme, SocketAddr::new(address, port))).ok()
}

/// The external capabilities a session runs on.
#[derive(Clone)]
pub struct Collaborators {
    pub resolver: Arc<dyn TargetResolver>,
    pub port_scanner: Arc<dyn PortScanner>,
    pub renderer: Arc<dyn PageRenderer>,
    pub http: Arc<dyn ProbeClient>,
}

impl Collaborators {
    /// Real DNS, the `nmap` found on `PATH`, and one shared HTTP client for
    /// crawling and probing.
    pub fn system(options: &ScanOptions) -> Result<Self, String> {
        let client = build_client(options.request_timeout)?;
        Ok(Self {
            resolver: Arc::new(DnsResolver),
            port_scanner: Arc::new(NmapScanner::discover()),
            renderer: Arc::new(HttpRenderer::new(client.clone())),
            http: Arc::new(ReqwestProbeClient::new(client)),
        })
    }
}

/// Moves the session forward and tells the observer about it.
async fn advance(session: &mut ScanSession, next: SessionState, events: &EventSink) {
    let from = session.state();
    if session.advance(next) {
        info!(session = session.id, %from, to = %next, "Session state changed.");
        events.emit(ScanEvent::Stage { state: next }).await;
    } else {
        warn!(session = session.id, %from, to = %next, "Ignoring illegal state transition.");
    }
}

/// Progress gathered so far, turned into the outcome at the end.
struct Gathered {
    recon: ReconResult,
    crawls: Vec<CrawlResult>,
    findings: FindingLog,
}

/// Ends the session in `Completed` or `Cancelled` and emits the matching
/// terminal event.
async fn finish(
    mut session: ScanSession,
    terminal: SessionState,
    gathered: Gathered,
    events: &EventSink,
) -> SessionOutcome {
    advance(&mut session, terminal, events).await;
    let outcome = SessionOutcome {
        target: session.target.clone(),
        address: session.address,
        timestamp: session.created_at,
        state: session.state(),
        recon: gathered.recon,
        crawls: gathered.crawls,
        findings: gathered.findings.into_vec(),
    };
    let summary = ScanSummary::from(&outcome);

    if outcome.state == SessionState::Cancelled {
        events
            .warning(format!("Scan stopped. {} finding(s) recorded before stopping.", outcome.findings.len()))
            .await;
        events.emit(ScanEvent::ScanCancelled(summary)).await;
    } else {
        events.success("--- Full Automated Scan Complete ---").await;
        events.emit(ScanEvent::ScanComplete(summary)).await;
    }
    info!(
        session = session.id,
        state = %outcome.state,
        ports = outcome.recon.open_ports.len(),
        findings = outcome.findings.len(),
        "Session finished."
    );
    outcome
}

async fn fail(mut session: ScanSession, err: ScanError, events: &EventSink) -> Result<SessionOutcome, ScanError> {
    error!(session = session.id, error = %err, "Session failed.");
    events.error(format!("Scan failed: {}", err)).await;
    advance(&mut session, SessionState::Failed, events).await;
    Err(err)
}

/// Runs one session end to end: resolve, recon, then a crawl and probe round
/// for every open web port.
///
/// This is the orchestrator behind `ScanController::start_scan`. Stages run
/// one after another; only the probe stage fans out, onto its own worker
/// pool. The cancellation flag is checked between every stage and before
/// each web target, and every transition is announced as a `stage` event.
///
/// # Arguments
///
/// * `session` - The session to drive. Its options must already hold a valid depth.
/// * `deps` - Resolver, port scanner, page renderer and HTTP client.
/// * `events` - Sink already stamped with the session id.
///
/// # Returns
///
/// The finalized `SessionOutcome`, which is also emitted as `scan_complete`
/// or, for a stopped session, `scan_cancelled` with the partial results.
/// An error means the session ended `Failed` (bad options, an unresolvable
/// target or no port scanner); no summary event is sent in that case.
pub async fn run_session(
    mut session: ScanSession,
    deps: &Collaborators,
    events: &EventSink,
) -> Result<SessionOutcome, ScanError> {
    if let Err(e) = session.options.validate() {
        return fail(session, ScanError::InvalidOptions(e), events).await;
    }
    let cancel: CancelFlag = session.cancel_flag();
    let mut gathered = Gathered { recon: ReconResult::default(), crawls: Vec::new(), findings: FindingLog::default() };

    events.success(format!("--- Starting Automated Scan on {} ---", session.target)).await;
    advance(&mut session, SessionState::Resolving, events).await;
    let address = match deps.resolver.resolve(&session.target).await {
        Ok(address) => address,
        Err(e) => return fail(session, e, events).await,
    };
    session.address = Some(address);
    events.info(format!("[*] Resolved {} to {}", session.target, address)).await;
    if cancel.is_cancelled() {
        return Ok(finish(session, SessionState::Cancelled, gathered, events).await);
    }

    // Stage 1: recon.
    advance(&mut session, SessionState::ReconRunning, events).await;
    let output_dir = session.options.output_root.join(address.to_string());
    let recon = ReconStage {
        scanner: deps.port_scanner.as_ref(),
        events,
        cancel: &cancel,
        liveness_timeout: session.options.liveness_timeout,
    };
    gathered.recon = match recon.run(address, &output_dir).await {
        Ok(result) => result,
        Err(e) => return fail(session, e, events).await,
    };
    advance(&mut session, SessionState::ReconDone, events).await;
    if cancel.is_cancelled() {
        return Ok(finish(session, SessionState::Cancelled, gathered, events).await);
    }

    // Stage 2: web services among the open ports.
    events.info("--- Stage 2: Analyzing results for web services ---").await;
    let web_ports: Vec<u16> = gathered
        .recon
        .open_ports
        .iter()
        .copied()
        .filter(|port| WEB_PORTS.contains(port))
        .collect();
    if web_ports.is_empty() {
        events.warning("No common web ports found. Skipping web vulnerability scan.").await;
        return Ok(finish(session, SessionState::Completed, gathered, events).await);
    }
    events.success(format!("Found web ports: {:?}", web_ports)).await;

    for port in web_ports {
        if cancel.is_cancelled() {
            return Ok(finish(session, SessionState::Cancelled, gathered, events).await);
        }
        let Some(base) = web_target(address, port) else {
            warn!(%address, port, "Could not build a base URL.");
            continue;
        };

        advance(&mut session, SessionState::CrawlRunning, events).await;
        events.info(format!("[*] Scanning web target: {}", base)).await;
        let crawl = CrawlStage {
            renderer: deps.renderer.as_ref(),
            events,
            cancel: &cancel,
            politeness_delay: session.options.politeness_delay,
            politeness_jitter: session.options.politeness_jitter,
        }
        .run(&base, session.options.depth)
        .await;
        events
            .info(format!(
                "[*] Crawled {} page(s) on {}: {} URLs ({} with parameters), {} forms, {} API endpoints.",
                crawl.pages_visited,
                base,
                crawl.urls.len(),
                parameterized_urls(&crawl).len(),
                crawl.forms.len(),
                crawl.api_endpoints.len()
            ))
            .await;
        let endpoints = crawl.endpoints();
        gathered.crawls.push(crawl);

        if cancel.is_cancelled() {
            return Ok(finish(session, SessionState::Cancelled, gathered, events).await);
        }
        advance(&mut session, SessionState::ProbeRunning, events).await;
        if endpoints.is_empty() {
            events.info(format!("[*] Nothing to probe on {}.", base)).await;
            continue;
        }
        events
            .info(format!("[*] Testing {} endpoint(s) on {} for vulnerabilities...", endpoints.len(), base))
            .await;
        ProbeStage {
            client: Arc::clone(&deps.http),
            events,
            cancel: &cancel,
            workers: session.options.workers,
        }
        .run(endpoints, &mut gathered.findings)
        .await;
    }

    let terminal = if cancel.is_cancelled() { SessionState::Cancelled } else { SessionState::Completed };
    Ok(finish(session, terminal, gathered, events).await)
}

/// Per-request overrides accepted by `start_scan`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanRequest {
    pub depth: u32,
}

impl Default for ScanRequest {
    fn default() -> Self {
        Self { depth: crate::config::DEFAULT_DEPTH }
    }
}

struct ActiveScan {
    session_id: u64,
    cancel: CancelFlag,
    handle: JoinHandle<Result<SessionOutcome, ScanError>>,
}

/// Owns the single active session slot.
///
/// Starting a scan while one is running cancels the old one first; the old
/// task winds down on its own at its next checkpoint.
pub struct ScanController {
    deps: Collaborators,
    options: ScanOptions,
    events: EventSink,
    active: Mutex<Option<ActiveScan>>,
}

impl ScanController {
    pub fn new(deps: Collaborators, options: ScanOptions, events: EventSink) -> Self {
        Self { deps, options, events, active: Mutex::new(None) }
    }

    /// Starts a session against `target` and returns its id.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start_scan(&self, target: &str, request: ScanRequest) -> Result<u64, ScanError> {
        let target = target.trim();
        if target.is_empty() {
            return Err(ScanError::InvalidOptions("target must not be empty".to_string()));
        }
        let options = ScanOptions { depth: request.depth, ..self.options.clone() };
        options.validate().map_err(ScanError::InvalidOptions)?;

        let session = ScanSession::new(target, options);
        let session_id = session.id;
        let cancel = session.cancel_flag();
        let deps = self.deps.clone();
        let events = self.events.for_session(session_id);

        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = active.take() {
            info!(previous = previous.session_id, next = session_id, "Superseding running session.");
            previous.cancel.cancel();
        }
        info!(session = session_id, %target, depth = request.depth, "Starting scan session.");
        let handle = tokio::spawn(async move { run_session(session, &deps, &events).await });
        *active = Some(ActiveScan { session_id, cancel, handle });
        Ok(session_id)
    }

    /// Signals the active session to stop. Returns `false` if there was none.
    pub fn stop_scan(&self) -> bool {
        let active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        match active.as_ref() {
            Some(scan) if !scan.handle.is_finished() => {
                info!(session = scan.session_id, "Stop requested.");
                scan.cancel.cancel();
                true
            }
            _ => false,
        }
    }

    pub fn is_active(&self) -> bool {
        let active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        active.as_ref().is_some_and(|scan| !scan.handle.is_finished())
    }

    /// Waits for the current session and hands back its result, clearing the slot.
    pub async fn wait(&self) -> Option<Result<SessionOutcome, ScanError>> {
        let scan = self.active.lock().unwrap_or_else(PoisonError::into_inner).take()?;
        Some(match scan.handle.await {
            Ok(result) => result,
            Err(e) => Err(ScanError::TaskAborted(e.to_string())),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::events::SessionEvent;
    use crate::core::models::VulnCategory;
    use crate::core::scanner::crawler::tests::FakeRenderer;
    use crate::core::scanner::probe::tests::FakeClient;
    use crate::core::scanner::recon::tests::FakeScanner;
    use async_trait::async_trait;
    use std::net::Ipv4Addr;
    use std::time::Duration;

    /// Parses IP literals, fails `.invalid` names, and takes its time over `slow.test`.
    struct FakeResolver;

    #[async_trait]
    impl TargetResolver for FakeResolver {
        async fn resolve(&self, target: &str) -> Result<IpAddr, ScanError> {
            if target == "slow.test" {
                tokio::time::sleep(Duration::from_millis(200)).await;
                return Ok(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 2)));
            }
            target.parse().map_err(|_| ScanError::Unresolvable {
                target: target.to_string(),
                reason: "NXDOMAIN".to_string(),
            })
        }
    }

    fn options() -> ScanOptions {
        ScanOptions {
            politeness_delay: Duration::ZERO,
            politeness_jitter: Duration::ZERO,
            liveness_timeout: Duration::from_millis(10),
            output_root: std::env::temp_dir().join(format!("strata-session-test-{}", rand::random::<u32>())),
            ..ScanOptions::default()
        }
    }

    fn deps(scanner: FakeScanner, renderer: FakeRenderer, client: FakeClient) -> Collaborators {
        Collaborators {
            resolver: Arc::new(FakeResolver),
            port_scanner: Arc::new(scanner),
            renderer: Arc::new(renderer),
            http: Arc::new(client),
        }
    }

    async fn run(
        target: &str,
        deps: &Collaborators,
        session: Option<ScanSession>,
    ) -> (Result<SessionOutcome, ScanError>, Vec<ScanEvent>) {
        let (events, mut rx) = EventSink::channel(4096);
        let session = session.unwrap_or_else(|| ScanSession::new(target, options()));
        let output_root = session.options.output_root.clone();
        let result = run_session(session, deps, &events).await;
        drop(events);
        let _ = std::fs::remove_dir_all(output_root);

        let mut seen = Vec::new();
        while let Some(SessionEvent { event, .. }) = rx.recv().await {
            seen.push(event);
        }
        (result, seen)
    }

    fn stages(events: &[ScanEvent]) -> Vec<SessionState> {
        events
            .iter()
            .filter_map(|e| match e {
                ScanEvent::Stage { state } => Some(*state),
                _ => None,
            })
            .collect()
    }

    fn terminal_events(events: &[ScanEvent]) -> usize {
        events
            .iter()
            .filter(|e| matches!(e, ScanEvent::ScanComplete(_) | ScanEvent::ScanCancelled(_)))
            .count()
    }

    #[test]
    fn web_targets_use_https_on_tls_ports() {
        let addr = IpAddr::V4(Ipv4Addr::LOCALHOST);
        assert_eq!(web_target(addr, 80).unwrap().as_str(), "http://127.0.0.1/");
        assert_eq!(web_target(addr, 8443).unwrap().as_str(), "https://127.0.0.1:8443/");
        assert_eq!(web_target(addr, 3000).unwrap().as_str(), "http://127.0.0.1:3000/");
        let v6 = web_target("::1".parse().unwrap(), 8080).unwrap();
        assert_eq!(v6.as_str(), "http://[::1]:8080/");
    }

    #[tokio::test]
    async fn missing_port_scanner_fails_the_session() {
        let deps = deps(FakeScanner::default(), FakeRenderer::default(), FakeClient::quiet());
        let (result, events) = run("127.0.0.1", &deps, None).await;

        assert!(matches!(result, Err(ScanError::ToolUnavailable(_))));
        assert_eq!(
            stages(&events),
            vec![SessionState::Resolving, SessionState::ReconRunning, SessionState::Failed]
        );
        assert_eq!(terminal_events(&events), 0);
        assert!(events.iter().any(|e| matches!(
            e,
            ScanEvent::Log { level: crate::core::events::LogLevel::Error, message } if message.contains("nmap")
        )));
    }

    #[tokio::test]
    async fn unresolvable_target_fails_before_recon() {
        let scanner = FakeScanner::with_fast("80/tcp open http\n");
        let deps = deps(scanner, FakeRenderer::default(), FakeClient::quiet());
        let (result, events) = run("nowhere.invalid", &deps, None).await;

        assert!(matches!(result, Err(ScanError::Unresolvable { .. })));
        assert_eq!(stages(&events), vec![SessionState::Resolving, SessionState::Failed]);
        assert_eq!(terminal_events(&events), 0);
    }

    #[tokio::test]
    async fn only_web_ports_are_crawled() {
        let scanner = FakeScanner::with_fast("22/tcp open ssh\n80/tcp open http\n");
        let renderer = Arc::new(FakeRenderer::default().page("http://127.0.0.1/", "<p>hello</p>"));
        let deps = Collaborators {
            resolver: Arc::new(FakeResolver),
            port_scanner: Arc::new(scanner),
            renderer: renderer.clone(),
            http: Arc::new(FakeClient::quiet()),
        };
        let (result, events) = run("127.0.0.1", &deps, None).await;

        let outcome = result.unwrap();
        assert_eq!(outcome.state, SessionState::Completed);
        assert_eq!(outcome.recon.open_ports, vec![22, 80]);
        assert_eq!(outcome.crawls.len(), 1);
        assert_eq!(outcome.crawls[0].base_url, "http://127.0.0.1/");
        assert!(outcome.findings.is_empty());
        assert_eq!(renderer.visited(), vec!["http://127.0.0.1/"]);

        assert_eq!(
            stages(&events),
            vec![
                SessionState::Resolving,
                SessionState::ReconRunning,
                SessionState::ReconDone,
                SessionState::CrawlRunning,
                SessionState::ProbeRunning,
                SessionState::Completed,
            ]
        );
        assert!(matches!(events.last(), Some(ScanEvent::ScanComplete(summary)) if summary.target == "127.0.0.1"));
    }

    #[tokio::test]
    async fn no_web_ports_completes_without_crawling() {
        let scanner = FakeScanner::with_fast("22/tcp open ssh\n");
        let deps = deps(scanner, FakeRenderer::default(), FakeClient::quiet());
        let (result, events) = run("10.0.0.9", &deps, None).await;

        let outcome = result.unwrap();
        assert_eq!(outcome.state, SessionState::Completed);
        assert!(outcome.crawls.is_empty());
        assert_eq!(
            stages(&events),
            vec![
                SessionState::Resolving,
                SessionState::ReconRunning,
                SessionState::ReconDone,
                SessionState::Completed
            ]
        );
        assert_eq!(terminal_events(&events), 1);
    }

    #[tokio::test]
    async fn vulnerable_form_is_reported_once() {
        let scanner = FakeScanner::with_fast("80/tcp open http\n");
        let renderer = FakeRenderer::default().page(
            "http://127.0.0.1/",
            r#"<form action="/search" method="post"><input name="q"><input type="submit"></form>"#,
        );
        let client = FakeClient::new(|req| {
            let hit = req.params.iter().any(|(n, v)| n == "q" && v == "' OR '1'='1");
            Ok(if hit { "You have an error in your SQL syntax" } else { "no results" }.to_string())
        });
        let deps = deps(scanner, renderer, client);
        let (result, events) = run("127.0.0.1", &deps, None).await;

        let outcome = result.unwrap();
        assert_eq!(outcome.findings.len(), 1);
        let finding = &outcome.findings[0];
        assert_eq!(finding.url, "http://127.0.0.1/search");
        assert_eq!(finding.param, "q");
        assert_eq!(finding.category, VulnCategory::SqlInjection);

        let reported: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                ScanEvent::VulnerabilityFound(f) => Some(f.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(reported, outcome.findings);
        match events.last() {
            Some(ScanEvent::ScanComplete(summary)) => assert_eq!(summary.vulnerabilities, outcome.findings),
            other => panic!("expected scan_complete last, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn stop_during_crawl_ends_cancelled_without_probing() {
        let session = ScanSession::new("127.0.0.1", options());
        let flag = session.cancel_flag();
        let scanner = FakeScanner::with_fast("80/tcp open http\n8080/tcp open http-proxy\n");
        let renderer = FakeRenderer {
            cancel_on: Some(("http://127.0.0.1/".to_string(), flag)),
            ..FakeRenderer::default()
        }
        .page("http://127.0.0.1/", r#"<a href="/item?id=1">item</a>"#);
        let client = Arc::new(FakeClient::quiet());
        let deps = Collaborators {
            resolver: Arc::new(FakeResolver),
            port_scanner: Arc::new(scanner),
            renderer: Arc::new(renderer),
            http: client.clone(),
        };
        let (result, events) = run("127.0.0.1", &deps, Some(session)).await;

        let outcome = result.unwrap();
        assert_eq!(outcome.state, SessionState::Cancelled);
        assert_eq!(outcome.crawls.len(), 1);
        assert!(client.sent.lock().unwrap().is_empty());
        assert!(!stages(&events).contains(&SessionState::ProbeRunning));
        assert!(matches!(events.last(), Some(ScanEvent::ScanCancelled(_))));
        assert_eq!(terminal_events(&events), 1);
    }

    #[tokio::test]
    async fn outcome_is_dated_at_session_start() {
        let session = ScanSession::new("10.0.0.9", options());
        let started = session.created_at;
        let deps = deps(FakeScanner::with_fast("22/tcp open ssh\n"), FakeRenderer::default(), FakeClient::quiet());
        let (result, _) = run("10.0.0.9", &deps, Some(session)).await;
        assert_eq!(result.unwrap().timestamp, started);
    }

    #[tokio::test]
    async fn cancelled_recon_still_reports_partial_ports() {
        let session = ScanSession::new("127.0.0.1", options());
        let scanner = FakeScanner {
            cancel_after_fast: Some(session.cancel_flag()),
            ..FakeScanner::with_fast("80/tcp open http\n")
        };
        let deps = deps(scanner, FakeRenderer::default(), FakeClient::quiet());
        let (result, events) = run("127.0.0.1", &deps, Some(session)).await;

        let outcome = result.unwrap();
        assert_eq!(outcome.state, SessionState::Cancelled);
        assert_eq!(outcome.recon.open_ports, vec![80]);
        assert!(outcome.crawls.is_empty());
        assert!(stages(&events).ends_with(&[SessionState::ReconDone, SessionState::Cancelled]));
    }

    #[tokio::test]
    async fn controller_rejects_bad_requests() {
        let (events, _rx) = EventSink::channel(16);
        let controller = ScanController::new(
            deps(FakeScanner::default(), FakeRenderer::default(), FakeClient::quiet()),
            options(),
            events,
        );
        assert!(matches!(
            controller.start_scan("  ", ScanRequest::default()),
            Err(ScanError::InvalidOptions(_))
        ));
        assert!(matches!(
            controller.start_scan("127.0.0.1", ScanRequest { depth: 0 }),
            Err(ScanError::InvalidOptions(_))
        ));
        assert!(!controller.is_active());
        assert!(!controller.stop_scan());
        assert!(controller.wait().await.is_none());
    }

    #[tokio::test]
    async fn new_scan_supersedes_the_running_one() {
        let (events, mut rx) = EventSink::channel(4096);
        let controller = ScanController::new(
            deps(FakeScanner::with_fast("22/tcp open ssh\n"), FakeRenderer::default(), FakeClient::quiet()),
            options(),
            events,
        );

        let first = controller.start_scan("slow.test", ScanRequest::default()).unwrap();
        let second = controller.start_scan("127.0.0.1", ScanRequest { depth: 1 }).unwrap();
        assert_ne!(first, second);

        let outcome = controller.wait().await.unwrap().unwrap();
        assert_eq!(outcome.target, "127.0.0.1");
        assert_eq!(outcome.state, SessionState::Completed);

        // The superseded session winds down on its own and says so.
        let mut first_cancelled = false;
        let mut second_completed = false;
        let deadline = tokio::time::timeout(Duration::from_secs(5), async {
            while let Some(SessionEvent { session_id, event }) = rx.recv().await {
                match event {
                    ScanEvent::ScanCancelled(_) if session_id == first => first_cancelled = true,
                    ScanEvent::ScanComplete(_) if session_id == second => second_completed = true,
                    ScanEvent::ScanComplete(_) => panic!("superseded session completed"),
                    _ => {}
                }
                if first_cancelled && second_completed {
                    break;
                }
            }
        })
        .await;
        assert!(deadline.is_ok());
        assert!(first_cancelled && second_completed);
        let _ = std::fs::remove_dir_all(&controller.options.output_root);
    }

    #[tokio::test]
    async fn stop_scan_cancels_the_active_session() {
        let (events, _rx) = EventSink::channel(4096);
        let controller = ScanController::new(
            deps(FakeScanner::with_fast("80/tcp open http\n"), FakeRenderer::default(), FakeClient::quiet()),
            options(),
            events,
        );
        controller.start_scan("slow.test", ScanRequest::default()).unwrap();
        assert!(controller.is_active());
        assert!(controller.stop_scan());

        let outcome = controller.wait().await.unwrap().unwrap();
        assert_eq!(outcome.state, SessionState::Cancelled);
        assert!(outcome.recon.open_ports.is_empty());
        assert!(!controller.is_active());
    }
}
