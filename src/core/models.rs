// src/core/models.rs

use crate::config::ScanOptions;
use crate::core::cancel::CancelFlag;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use strum::{Display, EnumIter};
use url::Url;

/// How much of the script scan output downstream consumers get to see.
pub const SCRIPT_PROOF_LIMIT: usize = 2000;

// --- Session State Machine ---

/// Stages of a scan session.
///
/// Transitions only move forward: `Idle → Resolving → ReconRunning → ReconDone`,
/// then any number of `CrawlRunning → ProbeRunning` rounds (one per web port),
/// ending in exactly one of the three terminal states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SessionState {
    Idle,
    Resolving,
    ReconRunning,
    ReconDone,
    CrawlRunning,
    ProbeRunning,
    Completed,
    Cancelled,
    Failed,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Completed | SessionState::Cancelled | SessionState::Failed)
    }

    pub fn can_advance_to(self, next: SessionState) -> bool {
        use SessionState::*;
        match (self, next) {
            (from, _) if from.is_terminal() => false,
            (_, Cancelled) => true,
            (Idle, Resolving) => true,
            (Idle | Resolving | ReconRunning, Failed) => true,
            (Resolving, ReconRunning) => true,
            (ReconRunning, ReconDone) => true,
            (ReconDone, CrawlRunning | Completed) => true,
            (CrawlRunning, ProbeRunning) => true,
            (ProbeRunning, CrawlRunning | Completed) => true,
            _ => false,
        }
    }
}

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// One assessment run. Owned by the orchestrator; the only thing shared with
/// the outside world is the cancellation flag.
#[derive(Debug)]
pub struct ScanSession {
    pub id: u64,
    pub target: String,
    pub address: Option<IpAddr>,
    pub options: ScanOptions,
    pub created_at: DateTime<Utc>,
    state: SessionState,
    cancel: CancelFlag,
}

impl ScanSession {
    pub fn new(target: impl Into<String>, options: ScanOptions) -> Self {
        Self {
            id: NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed),
            target: target.into(),
            address: None,
            options,
            created_at: Utc::now(),
            state: SessionState::Idle,
            cancel: CancelFlag::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Moves to `next` if the transition is legal. Returns whether it happened.
    pub fn advance(&mut self, next: SessionState) -> bool {
        if self.state.can_advance_to(next) {
            self.state = next;
            true
        } else {
            false
        }
    }
}

// --- Stage Results ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconResult {
    /// Open TCP ports in discovery order, without duplicates.
    pub open_ports: Vec<u16>,
    pub os_info: String,
    pub script_output: String,
    /// Raw scanner output files written during recon.
    pub artifacts: Vec<PathBuf>,
}

impl Default for ReconResult {
    fn default() -> Self {
        Self {
            open_ports: Vec::new(),
            os_info: "Unknown".to_string(),
            script_output: String::new(),
            artifacts: Vec::new(),
        }
    }
}

impl ReconResult {
    /// Adds ports not seen yet and returns the ones that were new.
    pub fn merge_ports(&mut self, ports: &[u16]) -> Vec<u16> {
        let mut added = Vec::new();
        for &port in ports {
            if !self.open_ports.contains(&port) {
                self.open_ports.push(port);
                added.push(port);
            }
        }
        added
    }

    /// Script output cut down for reports.
    pub fn script_proof(&self) -> String {
        if self.script_output.chars().count() > SCRIPT_PROOF_LIMIT {
            let head: String = self.script_output.chars().take(SCRIPT_PROOF_LIMIT).collect();
            format!("{}...", head)
        } else {
            self.script_output.clone()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    /// Interprets an HTML `method` attribute. Anything but POST submits as GET.
    pub fn from_form_attr(value: Option<&str>) -> Self {
        match value {
            Some(m) if m.trim().eq_ignore_ascii_case("post") => HttpMethod::Post,
            _ => HttpMethod::Get,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredForm {
    pub url: String,
    pub method: HttpMethod,
    /// Field name → placeholder value. Never empty.
    pub params: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlResult {
    pub base_url: String,
    /// Same-origin URLs seen while crawling, fragments stripped.
    pub urls: BTreeSet<String>,
    pub forms: Vec<DiscoveredForm>,
    /// Data-fetch endpoints, query strings stripped.
    pub api_endpoints: BTreeSet<String>,
    pub pages_visited: usize,
    /// Number of hops below the base URL that were actually inspected.
    pub deepest_level: u32,
}

impl CrawlResult {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into(), ..Default::default() }
    }

    /// Everything worth probing: each URL carrying a query string and each form,
    /// with duplicates (same method, URL and parameter names) dropped.
    pub fn endpoints(&self) -> Vec<Endpoint> {
        let mut seen = BTreeSet::new();
        let mut endpoints = Vec::new();

        let from_urls = self.urls.iter().filter_map(|raw| Endpoint::from_query_url(raw));
        let from_forms = self.forms.iter().map(Endpoint::from_form);

        for endpoint in from_urls.chain(from_forms) {
            if seen.insert(endpoint.signature()) {
                endpoints.push(endpoint);
            }
        }
        endpoints
    }
}

/// A unit of probing work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub method: HttpMethod,
    pub url: String,
    pub params: BTreeMap<String, String>,
}

impl Endpoint {
    /// Builds a GET endpoint out of a URL's query string. `None` if there is none.
    pub fn from_query_url(raw: &str) -> Option<Self> {
        let mut url = Url::parse(raw).ok()?;
        let mut params = BTreeMap::new();
        for (name, value) in url.query_pairs() {
            if name.is_empty() {
                continue;
            }
            params.entry(name.into_owned()).or_insert_with(|| value.into_owned());
        }
        if params.is_empty() {
            return None;
        }
        url.set_query(None);
        url.set_fragment(None);
        Some(Self { method: HttpMethod::Get, url: url.to_string(), params })
    }

    pub fn from_form(form: &DiscoveredForm) -> Self {
        Self { method: form.method, url: form.url.clone(), params: form.params.clone() }
    }

    fn signature(&self) -> (HttpMethod, String, Vec<String>) {
        (self.method, self.url.clone(), self.params.keys().cloned().collect())
    }
}

// --- Findings ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, EnumIter)]
pub enum VulnCategory {
    #[serde(rename = "SQL Injection")]
    #[strum(serialize = "SQL Injection")]
    SqlInjection,
    #[serde(rename = "Cross-Site Scripting")]
    #[strum(serialize = "Cross-Site Scripting")]
    CrossSiteScripting,
    #[serde(rename = "Command Injection")]
    #[strum(serialize = "Command Injection")]
    CommandInjection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub url: String,
    pub param: String,
    pub payload: String,
    #[serde(rename = "type")]
    pub category: VulnCategory,
}

/// Session-scoped storage for findings. Append-only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FindingLog {
    entries: Vec<Finding>,
}

impl FindingLog {
    pub fn push(&mut self, finding: Finding) {
        self.entries.push(finding);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn into_vec(self) -> Vec<Finding> {
        self.entries
    }
}

#[cfg(test)]
impl FindingLog {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn as_slice(&self) -> &[Finding] {
        &self.entries
    }
}

// --- Session Outcome ---

/// What a session leaves behind once it reaches `Completed` or `Cancelled`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionOutcome {
    pub target: String,
    pub address: Option<IpAddr>,
    pub timestamp: DateTime<Utc>,
    pub state: SessionState,
    pub recon: ReconResult,
    pub crawls: Vec<CrawlResult>,
    pub findings: Vec<Finding>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn terminal_states_do_not_move() {
        for terminal in [SessionState::Completed, SessionState::Cancelled, SessionState::Failed] {
            for next in SessionState::iter() {
                assert!(!terminal.can_advance_to(next), "{terminal} -> {next}");
            }
        }
    }

    #[test]
    fn crawl_probe_rounds_can_repeat() {
        let mut session = ScanSession::new("example.test", ScanOptions::default());
        for next in [
            SessionState::Resolving,
            SessionState::ReconRunning,
            SessionState::ReconDone,
            SessionState::CrawlRunning,
            SessionState::ProbeRunning,
            SessionState::CrawlRunning,
            SessionState::ProbeRunning,
            SessionState::Completed,
        ] {
            assert!(session.advance(next), "could not enter {next}");
        }
        assert!(!session.advance(SessionState::Cancelled));
        assert_eq!(session.state(), SessionState::Completed);
    }

    #[test]
    fn stages_cannot_be_skipped_or_repeated() {
        assert!(!SessionState::Idle.can_advance_to(SessionState::ReconRunning));
        assert!(!SessionState::ReconDone.can_advance_to(SessionState::ReconRunning));
        assert!(!SessionState::CrawlRunning.can_advance_to(SessionState::Completed));
        assert!(!SessionState::ProbeRunning.can_advance_to(SessionState::Failed));
        assert!(SessionState::CrawlRunning.can_advance_to(SessionState::Cancelled));
    }

    #[test]
    fn merge_ports_is_a_deduplicated_union() {
        let mut recon = ReconResult { open_ports: vec![22, 80], ..Default::default() };
        let added = recon.merge_ports(&[80, 443, 22, 8080]);
        assert_eq!(added, vec![443, 8080]);
        assert_eq!(recon.open_ports, vec![22, 80, 443, 8080]);
    }

    #[test]
    fn script_proof_is_truncated() {
        let recon = ReconResult { script_output: "a".repeat(2500), ..Default::default() };
        let proof = recon.script_proof();
        assert_eq!(proof.len(), SCRIPT_PROOF_LIMIT + 3);
        assert!(proof.ends_with("..."));

        let short = ReconResult { script_output: "22/tcp open ssh".into(), ..Default::default() };
        assert_eq!(short.script_proof(), "22/tcp open ssh");
        assert_eq!(ReconResult::default().os_info, "Unknown");
    }

    #[test]
    fn endpoints_come_from_query_urls_and_forms() {
        let mut crawl = CrawlResult::new("http://10.0.0.5:80/");
        crawl.urls.insert("http://10.0.0.5:80/".into());
        crawl.urls.insert("http://10.0.0.5:80/item?id=3&id=4&sort=asc".into());
        crawl.urls.insert("http://10.0.0.5:80/item?sort=desc&id=9".into());
        crawl.forms.push(DiscoveredForm {
            url: "http://10.0.0.5:80/search".into(),
            method: HttpMethod::Post,
            params: BTreeMap::from([("q".to_string(), "test".to_string())]),
        });

        let endpoints = crawl.endpoints();
        assert_eq!(endpoints.len(), 2);

        let get = &endpoints[0];
        assert_eq!(get.method, HttpMethod::Get);
        assert_eq!(get.url, "http://10.0.0.5/item");
        assert_eq!(get.params.get("id").map(String::as_str), Some("3"));

        let post = &endpoints[1];
        assert_eq!(post.method, HttpMethod::Post);
        assert_eq!(post.params.keys().collect::<Vec<_>>(), vec!["q"]);
    }

    #[test]
    fn finding_serializes_with_type_field() {
        let finding = Finding {
            url: "http://h/search".into(),
            param: "q".into(),
            payload: "' OR '1'='1".into(),
            category: VulnCategory::SqlInjection,
        };
        let json = serde_json::to_value(&finding).unwrap();
        assert_eq!(json["type"], "SQL Injection");
        assert_eq!(json["param"], "q");
        assert_eq!(VulnCategory::CommandInjection.to_string(), "Command Injection");
    }

    #[test]
    fn form_method_attr_defaults_to_get() {
        assert_eq!(HttpMethod::from_form_attr(Some(" post ")), HttpMethod::Post);
        assert_eq!(HttpMethod::from_form_attr(Some("dialog")), HttpMethod::Get);
        assert_eq!(HttpMethod::from_form_attr(None), HttpMethod::Get);
    }
}
