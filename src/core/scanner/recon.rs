// src/core/scanner/recon.rs

use crate::core::cancel::CancelFlag;
use crate::core::error::ScanError;
use crate::core::events::EventSink;
use crate::core::models::ReconResult;
use crate::core::scanner::nmap::{PortScanner, ScanJob, ScanMode};
use once_cell::sync::Lazy;
use regex::Regex;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Below this many open ports the exhaustive scan runs too.
pub const FULL_SCAN_THRESHOLD: usize = 5;

static RE_OPEN_PORT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)/tcp\s+open\s+").unwrap());
static RE_OS_GUESS: Lazy<Regex> = Lazy::new(|| Regex::new(r"Aggressive OS guesses: ([^\n]+)").unwrap());
static RE_OS_DETAILS: Lazy<Regex> = Lazy::new(|| Regex::new(r"OS details: ([^\n]+)").unwrap());
static RE_SERVICE_OS: Lazy<Regex> = Lazy::new(|| Regex::new(r"Service Info: .*?OS: ([^;\n]+)").unwrap());

/// Open TCP ports listed in scanner output, in order of appearance.
pub fn parse_ports(output: &str) -> Vec<u16> {
    let mut ports = Vec::new();
    for caps in RE_OPEN_PORT.captures_iter(output) {
        if let Ok(port) = caps[1].parse::<u16>() {
            if !ports.contains(&port) {
                ports.push(port);
            }
        }
    }
    ports
}

/// Best OS label the output offers, or `None`.
pub fn parse_os(output: &str) -> Option<String> {
    [&RE_OS_GUESS, &RE_OS_DETAILS, &RE_SERVICE_OS]
        .iter()
        .find_map(|re| re.captures(output))
        .map(|caps| caps[1].trim().to_string())
        .filter(|label| !label.is_empty())
}

/// Drives the port scanner through the fixed recon sequence.
pub struct ReconStage<'a> {
    pub scanner: &'a dyn PortScanner,
    pub events: &'a EventSink,
    pub cancel: &'a CancelFlag,
    pub liveness_timeout: Duration,
}

impl ReconStage<'_> {
    /// Runs recon against `address`, writing artifacts into `output_dir`.
    ///
    /// Only an unavailable scanner is an error. Every other failure degrades to
    /// whatever was gathered so far, and cancellation returns the partial result.
    pub async fn run(&self, address: IpAddr, output_dir: &Path) -> Result<ReconResult, ScanError> {
        if let Err(e) = self.scanner.ensure_available() {
            self.events.error(format!("{}. Please install it.", e)).await;
            return Err(e);
        }

        let mut result = ReconResult::default();
        if let Err(e) = tokio::fs::create_dir_all(output_dir).await {
            warn!(dir = %output_dir.display(), error = %e, "Could not create recon output directory.");
            self.events
                .warning(format!("Could not create {}: {}", output_dir.display(), e))
                .await;
        }

        // Step 1: liveness, advisory only.
        if self.stop_requested("liveness probe").await {
            return Ok(result);
        }
        self.events.info(format!("[*] Pinging {}...", address)).await;
        if !self.scanner.is_alive(address, self.liveness_timeout).await {
            self.events
                .warning(format!("Host {} appears to be down or not responding to pings.", address))
                .await;
            self.events.info("Proceeding with scan anyway...").await;
        }

        // Step 2: fast scan.
        if self.stop_requested("fast scan").await {
            return Ok(result);
        }
        self.events.success("--- Starting Nmap Port Scan ---").await;
        let fast_output = self.run_job(address, ScanMode::Fast, &[], output_dir, "port_scan", &mut result).await;
        result.merge_ports(&parse_ports(&fast_output));
        self.events
            .info(format!("[*] Port scan finished. Found open ports: {:?}", result.open_ports))
            .await;

        // Step 3: service and script scan on what the fast scan found.
        if self.stop_requested("script scan").await {
            return Ok(result);
        }
        let ports = result.open_ports.clone();
        self.script_scan(address, &ports, output_dir, "script_scan", &mut result).await;

        // Step 4: exhaustive scan when little was found, then cover the new ports.
        if result.open_ports.len() >= FULL_SCAN_THRESHOLD {
            return Ok(result);
        }
        if self.stop_requested("full port scan").await {
            return Ok(result);
        }
        self.events
            .info("[*] Few ports found, running a full port scan to be thorough.")
            .await;
        self.events.success("--- Starting Nmap Full Port Scan ---").await;
        let full_output = self.run_job(address, ScanMode::Full, &[], output_dir, "full_scan", &mut result).await;
        result.merge_ports(&parse_ports(&full_output));
        self.events
            .info(format!("[*] Full scan finished. Total open ports: {:?}", result.open_ports))
            .await;

        let covered = parse_ports(&result.script_output);
        let uncovered: Vec<u16> = result
            .open_ports
            .iter()
            .copied()
            .filter(|port| !covered.contains(port))
            .collect();
        if uncovered.is_empty() {
            return Ok(result);
        }
        if self.stop_requested("script re-scan").await {
            return Ok(result);
        }
        self.script_scan(address, &uncovered, output_dir, "script_rescan", &mut result).await;

        info!(ports = ?result.open_ports, os = %result.os_info, "Recon finished.");
        Ok(result)
    }

    async fn script_scan(
        &self,
        address: IpAddr,
        ports: &[u16],
        output_dir: &Path,
        name: &str,
        result: &mut ReconResult,
    ) {
        if ports.is_empty() {
            self.events.warning("[*] No ports to run scripts on.").await;
            return;
        }
        self.events.success("--- Starting Nmap Script Scan ---").await;
        let output = self.run_job(address, ScanMode::Script, ports, output_dir, name, result).await;
        if let Some(os) = parse_os(&output) {
            result.os_info = os;
        }
        if !output.is_empty() {
            if !result.script_output.is_empty() {
                result.script_output.push('\n');
            }
            result.script_output.push_str(&output);
        }
        self.events
            .info(format!("[*] Script scan finished. Likely OS: {}", result.os_info))
            .await;
    }

    /// Runs one job; failures become empty output plus an error event.
    async fn run_job(
        &self,
        address: IpAddr,
        mode: ScanMode,
        ports: &[u16],
        output_dir: &Path,
        name: &str,
        result: &mut ReconResult,
    ) -> String {
        let artifact: PathBuf = output_dir.join(format!("{}.nmap", name));
        let job = ScanJob { address, mode, ports, artifact: &artifact };
        match self.scanner.scan(job).await {
            Ok(output) => {
                debug!(%mode, bytes = output.len(), "Scan output received.");
                result.artifacts.push(artifact);
                output
            }
            Err(e) => {
                self.events.error(format!("Nmap command failed: {}", e)).await;
                String::new()
            }
        }
    }

    async fn stop_requested(&self, step: &str) -> bool {
        if self.cancel.is_cancelled() {
            info!(step, "Recon stopped before step.");
            self.events.warning(format!("Scan stopped before {}.", step)).await;
            true
        } else {
            false
        }
    }
}
