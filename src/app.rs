// src/app.rs

use crate::core::events::{LogLevel, ScanEvent, ScanSummary, SessionEvent};
use crate::core::models::{Finding, SessionState, VulnCategory};
use chrono::Local;
use ratatui::widgets::{ListState, ScrollbarState};
use std::collections::{BTreeMap, VecDeque};

pub const SPINNER_CHARS: &[char] = &['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];

/// Oldest log lines are dropped past this many.
const LOG_CAPACITY: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Disclaimer,
    Idle,
    Scanning,
    Finished,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub time: String,
    pub level: LogLevel,
    pub message: String,
}

pub struct App {
    pub should_quit: bool,
    pub state: AppState,
    pub input: String,
    pub depth: u32,
    /// Session whose events are shown; everything else is stale.
    pub session_id: Option<u64>,
    pub stage: Option<SessionState>,
    pub web_targets: usize,
    pub findings: Vec<Finding>,
    pub result: Option<ScanSummary>,
    pub stop_requested: bool,
    pub logs: VecDeque<LogEntry>,
    pub show_logs: bool,
    pub findings_list_state: ListState,
    pub spinner_frame: usize,
    pub log_horizontal_scroll: usize,
    pub log_horizontal_scroll_state: ScrollbarState,
}

impl App {
    pub fn new(depth: u32) -> Self {
        Self {
            should_quit: false,
            state: AppState::Disclaimer,
            input: String::new(),
            depth,
            session_id: None,
            stage: None,
            web_targets: 0,
            findings: Vec::new(),
            result: None,
            stop_requested: false,
            logs: VecDeque::new(),
            show_logs: true,
            findings_list_state: ListState::default(),
            spinner_frame: 0,
            log_horizontal_scroll: 0,
            log_horizontal_scroll_state: ScrollbarState::default(),
        }
    }

    pub fn acknowledge_disclaimer(&mut self) {
        if self.state == AppState::Disclaimer {
            self.state = AppState::Idle;
        }
    }

    /// Switches the view over to a freshly started session.
    pub fn begin_scan(&mut self, session_id: u64) {
        self.session_id = Some(session_id);
        self.state = AppState::Scanning;
        self.stage = None;
        self.web_targets = 0;
        self.findings.clear();
        self.result = None;
        self.stop_requested = false;
        self.findings_list_state = ListState::default();
    }

    /// Local note in the log panel, not coming from a session.
    pub fn note(&mut self, level: LogLevel, message: impl Into<String>) {
        self.push_log(level, message.into());
    }

    pub fn apply_event(&mut self, stamped: SessionEvent) {
        if self.session_id != Some(stamped.session_id) {
            return;
        }
        match stamped.event {
            ScanEvent::Log { message, level } => self.push_log(level, message),
            ScanEvent::Stage { state } => {
                self.stage = Some(state);
                match state {
                    SessionState::CrawlRunning => self.web_targets += 1,
                    SessionState::Failed => self.state = AppState::Finished,
                    _ => {}
                }
            }
            ScanEvent::VulnerabilityFound(finding) => {
                self.findings.push(finding);
                if self.findings_list_state.selected().is_none() {
                    self.findings_list_state.select(Some(0));
                }
            }
            ScanEvent::ScanComplete(summary) | ScanEvent::ScanCancelled(summary) => {
                self.result = Some(summary);
                self.state = AppState::Finished;
            }
        }
    }

    fn push_log(&mut self, level: LogLevel, message: String) {
        if self.logs.len() == LOG_CAPACITY {
            self.logs.pop_front();
        }
        self.logs.push_back(LogEntry { time: Local::now().format("%H:%M:%S").to_string(), level, message });
    }

    pub fn findings_by_category(&self) -> BTreeMap<VulnCategory, usize> {
        let mut counts = BTreeMap::new();
        for finding in &self.findings {
            *counts.entry(finding.category).or_insert(0) += 1;
        }
        counts
    }

    pub fn scroll_up(&mut self) {
        if self.findings.is_empty() {
            return;
        }
        let i = self.findings_list_state.selected().map_or(0, |i| i.saturating_sub(1));
        self.findings_list_state.select(Some(i));
    }

    pub fn scroll_down(&mut self) {
        if self.findings.is_empty() {
            return;
        }
        let last = self.findings.len() - 1;
        let i = self.findings_list_state.selected().map_or(0, |i| (i + 1).min(last));
        self.findings_list_state.select(Some(i));
    }

    pub fn scroll_logs_left(&mut self) {
        self.log_horizontal_scroll = self.log_horizontal_scroll.saturating_sub(4);
        self.log_horizontal_scroll_state = self.log_horizontal_scroll_state.position(self.log_horizontal_scroll);
    }

    pub fn scroll_logs_right(&mut self) {
        self.log_horizontal_scroll = self.log_horizontal_scroll.saturating_add(4);
        self.log_horizontal_scroll_state = self.log_horizontal_scroll_state.position(self.log_horizontal_scroll);
    }

    pub fn toggle_logs(&mut self) {
        self.show_logs = !self.show_logs;
    }

    pub fn on_tick(&mut self) {
        if self.state == AppState::Scanning {
            self.spinner_frame = (self.spinner_frame + 1) % SPINNER_CHARS.len();
        }
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    /// Back to the input box. Logs stay.
    pub fn reset(&mut self) {
        self.state = AppState::Idle;
        self.input.clear();
        self.session_id = None;
        self.stage = None;
        self.web_targets = 0;
        self.findings.clear();
        self.result = None;
        self.stop_requested = false;
        self.findings_list_state = ListState::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::ReconResult;

    fn stamped(session_id: u64, event: ScanEvent) -> SessionEvent {
        SessionEvent { session_id, event }
    }

    fn finding(param: &str, category: VulnCategory) -> Finding {
        Finding { url: "http://10.0.0.5/".into(), param: param.into(), payload: "x".into(), category }
    }

    fn summary() -> ScanSummary {
        ScanSummary {
            target: "10.0.0.5".into(),
            address: None,
            vulnerabilities: Vec::new(),
            recon_results: ReconResult::default(),
        }
    }

    #[test]
    fn events_from_other_sessions_are_ignored() {
        let mut app = App::new(2);
        app.acknowledge_disclaimer();
        app.begin_scan(2);

        app.apply_event(stamped(1, ScanEvent::ScanCancelled(summary())));
        app.apply_event(stamped(1, ScanEvent::Log { message: "old".into(), level: LogLevel::Info }));
        assert_eq!(app.state, AppState::Scanning);
        assert!(app.logs.is_empty());

        app.apply_event(stamped(2, ScanEvent::Stage { state: SessionState::CrawlRunning }));
        app.apply_event(stamped(2, ScanEvent::ScanComplete(summary())));
        assert_eq!(app.web_targets, 1);
        assert_eq!(app.state, AppState::Finished);
    }

    #[test]
    fn findings_are_listed_and_counted() {
        let mut app = App::new(2);
        app.begin_scan(5);
        app.apply_event(stamped(5, ScanEvent::VulnerabilityFound(finding("id", VulnCategory::SqlInjection))));
        app.apply_event(stamped(5, ScanEvent::VulnerabilityFound(finding("q", VulnCategory::CrossSiteScripting))));
        app.apply_event(stamped(5, ScanEvent::VulnerabilityFound(finding("p", VulnCategory::SqlInjection))));

        assert_eq!(app.findings_list_state.selected(), Some(0));
        app.scroll_down();
        app.scroll_down();
        app.scroll_down();
        assert_eq!(app.findings_list_state.selected(), Some(2));

        let counts = app.findings_by_category();
        assert_eq!(counts.get(&VulnCategory::SqlInjection), Some(&2));
        assert_eq!(counts.get(&VulnCategory::CommandInjection), None);
    }

    #[test]
    fn failure_finishes_the_view_and_log_is_bounded() {
        let mut app = App::new(2);
        app.begin_scan(9);
        for i in 0..(LOG_CAPACITY + 10) {
            app.apply_event(stamped(9, ScanEvent::Log { message: format!("line {i}"), level: LogLevel::Info }));
        }
        assert_eq!(app.logs.len(), LOG_CAPACITY);
        assert_eq!(app.logs.front().map(|l| l.message.as_str()), Some("line 10"));

        app.apply_event(stamped(9, ScanEvent::Stage { state: SessionState::Failed }));
        assert_eq!(app.state, AppState::Finished);
        assert!(app.result.is_none());

        app.reset();
        assert_eq!(app.state, AppState::Idle);
        assert_eq!(app.session_id, None);
    }
}
