// src/core/scanner/resolve.rs

use crate::core::error::ScanError;
use async_trait::async_trait;
use hickory_resolver::TokioAsyncResolver;
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use std::net::IpAddr;
use tracing::{debug, info};
use url::Url;

/// Reduces user input such as `https://host:8080/path` to the bare host.
///
/// Input without a scheme is treated as a host, so `10.0.0.5` and
/// `example.com/login` both work.
pub fn target_host(raw: &str) -> String {
    let raw = raw.trim();
    let with_scheme = if raw.contains("://") { raw.to_string() } else { format!("http://{}", raw) };
    Url::parse(&with_scheme)
        .ok()
        .and_then(|url| url.host_str().map(|h| h.trim_start_matches('[').trim_end_matches(']').to_string()))
        .unwrap_or_else(|| raw.to_string())
}

/// Turns a target into the one address the session scans.
#[async_trait]
pub trait TargetResolver: Send + Sync {
    async fn resolve(&self, target: &str) -> Result<IpAddr, ScanError>;
}

/// System DNS through hickory, with a fast path for IP literals.
#[derive(Debug, Default, Clone, Copy)]
pub struct DnsResolver;

#[async_trait]
impl TargetResolver for DnsResolver {
    async fn resolve(&self, target: &str) -> Result<IpAddr, ScanError> {
        let host = target_host(target);
        if host.is_empty() {
            return Err(ScanError::Unresolvable { target: target.to_string(), reason: "empty host".to_string() });
        }
        if let Ok(address) = host.parse::<IpAddr>() {
            debug!(%address, "Target is an IP literal.");
            return Ok(address);
        }

        let resolver = TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default());
        let lookup = resolver.lookup_ip(host.as_str()).await.map_err(|e| ScanError::Unresolvable {
            target: target.to_string(),
            reason: e.to_string(),
        })?;

        let addresses: Vec<IpAddr> = lookup.iter().collect();
        let chosen = addresses
            .iter()
            .find(|a| a.is_ipv4())
            .or_else(|| addresses.first())
            .copied()
            .ok_or_else(|| ScanError::Unresolvable {
                target: target.to_string(),
                reason: "no address records".to_string(),
            })?;
        info!(%host, address = %chosen, candidates = addresses.len(), "Resolved target.");
        Ok(chosen)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn host_is_extracted_from_urls_and_bare_input() {
        assert_eq!(target_host("https://example.com:8443/login?x=1"), "example.com");
        assert_eq!(target_host("example.com/admin"), "example.com");
        assert_eq!(target_host("  10.0.0.5 "), "10.0.0.5");
        assert_eq!(target_host("http://[::1]:8080/"), "::1");
    }

    #[tokio::test]
    async fn ip_literals_skip_dns() {
        let address = DnsResolver.resolve("http://127.0.0.1/").await.unwrap();
        assert_eq!(address, IpAddr::V4(Ipv4Addr::LOCALHOST));
        let v6 = DnsResolver.resolve("::1").await.unwrap();
        assert!(v6.is_loopback());
    }

    #[tokio::test]
    async fn empty_target_is_unresolvable() {
        let err = DnsResolver.resolve("   ").await.unwrap_err();
        assert!(matches!(err, ScanError::Unresolvable { .. }));
    }
}
