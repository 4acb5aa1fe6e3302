// src/core/scanner/nmap.rs

use crate::core::error::ScanError;
use async_trait::async_trait;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use strum::Display;
use tokio::process::Command;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum ScanMode {
    /// Version-aware scan of the common ports.
    Fast,
    /// Every TCP port.
    Full,
    /// Default scripts and version detection on a given port list.
    Script,
}

/// One invocation of the port scanner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanJob<'a> {
    pub address: IpAddr,
    pub mode: ScanMode,
    /// Ports to restrict the scan to. Only meaningful for `Script`.
    pub ports: &'a [u16],
    /// Where the normal-format output goes. The XML artifact sits next to it.
    pub artifact: &'a Path,
}

/// The external port-scanning capability.
#[async_trait]
pub trait PortScanner: Send + Sync {
    /// Fails if the scanner cannot be invoked on this host at all.
    fn ensure_available(&self) -> Result<(), ScanError>;

    /// Single liveness probe. `false` is advisory only.
    async fn is_alive(&self, address: IpAddr, timeout: Duration) -> bool;

    /// Runs one scan and returns its textual output.
    async fn scan(&self, job: ScanJob<'_>) -> Result<String, String>;
}

/// `PortScanner` backed by the `nmap` executable.
#[derive(Debug, Clone)]
pub struct NmapScanner {
    binary: Option<PathBuf>,
}

impl NmapScanner {
    /// Looks `nmap` up on `PATH`.
    pub fn discover() -> Self {
        let binary = find_on_path("nmap");
        match &binary {
            Some(path) => info!(path = %path.display(), "Found nmap."),
            None => warn!("nmap not found on PATH."),
        }
        Self { binary }
    }

    #[cfg(test)]
    pub fn with_binary(path: impl Into<PathBuf>) -> Self {
        Self { binary: Some(path.into()) }
    }

    fn binary(&self) -> Result<&Path, ScanError> {
        self.binary
            .as_deref()
            .ok_or_else(|| ScanError::ToolUnavailable("nmap executable not found in PATH".to_string()))
    }
}

#[async_trait]
impl PortScanner for NmapScanner {
    fn ensure_available(&self) -> Result<(), ScanError> {
        self.binary().map(|_| ())
    }

    async fn is_alive(&self, address: IpAddr, timeout: Duration) -> bool {
        let count_flag = if cfg!(windows) { "-n" } else { "-c" };
        let mut command = Command::new("ping");
        command
            .args([count_flag, "1", &address.to_string()])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        match tokio::time::timeout(timeout, command.status()).await {
            Ok(Ok(status)) => status.success(),
            Ok(Err(e)) => {
                debug!(error = %e, "Could not run ping.");
                false
            }
            Err(_) => {
                debug!(%address, "Ping timed out.");
                false
            }
        }
    }

    async fn scan(&self, job: ScanJob<'_>) -> Result<String, String> {
        let binary = self.binary().map_err(|e| e.to_string())?;
        let args = build_args(&job);
        info!(mode = %job.mode, args = ?args, "Executing nmap.");

        let output = Command::new(binary)
            .args(&args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to spawn nmap.");
                format!("Failed to spawn nmap: {}", e)
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            error!(status = %output.status, %stderr, "nmap exited with an error.");
            return Err(format!("nmap failed ({}): {}", output.status, stderr));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Command line for one scan job, minus the executable.
pub fn build_args(job: &ScanJob<'_>) -> Vec<String> {
    let mut args: Vec<String> = match job.mode {
        ScanMode::Fast => vec!["-sV".into(), "-T4".into()],
        ScanMode::Full => vec!["-p-".into(), "-T4".into()],
        ScanMode::Script => vec!["-sCV".into(), "-p".into(), join_ports(job.ports)],
    };
    args.push("--open".into());
    args.push("-oN".into());
    args.push(job.artifact.display().to_string());
    args.push("-oX".into());
    args.push(job.artifact.with_extension("xml").display().to_string());
    args.push(job.address.to_string());
    args
}

fn join_ports(ports: &[u16]) -> String {
    ports.iter().map(|p| p.to_string()).collect::<Vec<_>>().join(",")
}

fn find_on_path(name: &str) -> Option<PathBuf> {
    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths)
        .flat_map(|dir| {
            let plain = dir.join(name);
            let exe = dir.join(format!("{}.exe", name));
            [plain, exe]
        })
        .find(|candidate| candidate.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn script_job_restricts_ports_and_writes_both_artifacts() {
        let artifact = PathBuf::from("/tmp/out/script_scan.nmap");
        let job = ScanJob {
            address: IpAddr::V4(Ipv4Addr::new(10, 0, 0, 5)),
            mode: ScanMode::Script,
            ports: &[22, 80],
            artifact: &artifact,
        };
        let args = build_args(&job);
        assert_eq!(
            args,
            vec![
                "-sCV", "-p", "22,80", "--open", "-oN", "/tmp/out/script_scan.nmap", "-oX",
                "/tmp/out/script_scan.xml", "10.0.0.5"
            ]
        );
    }

    #[test]
    fn full_job_covers_every_port() {
        let artifact = PathBuf::from("full_scan.nmap");
        let job = ScanJob {
            address: IpAddr::V4(Ipv4Addr::LOCALHOST),
            mode: ScanMode::Full,
            ports: &[],
            artifact: &artifact,
        };
        let args = build_args(&job);
        assert_eq!(&args[..3], &["-p-", "-T4", "--open"]);
        assert_eq!(args.last().map(String::as_str), Some("127.0.0.1"));
    }

    #[test]
    fn missing_binary_is_reported_as_unavailable() {
        let scanner = NmapScanner { binary: None };
        assert!(matches!(scanner.ensure_available(), Err(ScanError::ToolUnavailable(_))));
        assert!(NmapScanner::with_binary("/usr/bin/nmap").ensure_available().is_ok());
    }
}
