// src/core/scanner/http.rs

use crate::core::models::HttpMethod;
use async_trait::async_trait;
use rand::seq::IndexedRandom;
use reqwest::header::USER_AGENT;
use std::time::{Duration, Instant};
use tracing::debug;
use url::Url;

/// Browser identities rotated across requests.
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36 Edg/124.0.0.0",
];

pub fn random_user_agent() -> &'static str {
    USER_AGENTS.choose(&mut rand::rng()).copied().unwrap_or(USER_AGENTS[0])
}

/// Builds the client shared by the crawler and every probe worker of a session.
///
/// Certificate validation is off because targets are arbitrary hosts, often
/// with self-signed certificates. The cookie store keeps session continuity
/// between crawling and probing.
pub fn build_client(timeout: Duration) -> Result<reqwest::Client, String> {
    reqwest::Client::builder()
        .timeout(timeout)
        .danger_accept_invalid_certs(true)
        .cookie_store(true)
        .redirect(reqwest::redirect::Policy::limited(5))
        .build()
        .map_err(|e| format!("Failed to build HTTP client: {}", e))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeRequest {
    pub method: HttpMethod,
    pub url: String,
    /// Full parameter set, with the probed parameter already substituted.
    pub params: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResponse {
    pub status: u16,
    pub body: String,
    pub elapsed: Duration,
}

/// The HTTP capability probe workers send payloads through.
#[async_trait]
pub trait ProbeClient: Send + Sync {
    async fn send(&self, request: &ProbeRequest) -> Result<ProbeResponse, String>;
}

/// `ProbeClient` on top of a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestProbeClient {
    client: reqwest::Client,
}

impl ReqwestProbeClient {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ProbeClient for ReqwestProbeClient {
    async fn send(&self, request: &ProbeRequest) -> Result<ProbeResponse, String> {
        let builder = match request.method {
            HttpMethod::Get => {
                let mut url = Url::parse(&request.url).map_err(|e| format!("Bad URL {}: {}", request.url, e))?;
                url.query_pairs_mut().clear().extend_pairs(&request.params);
                self.client.get(url)
            }
            HttpMethod::Post => self.client.post(&request.url).form(&request.params),
        };

        let started = Instant::now();
        let response = builder
            .header(USER_AGENT, random_user_agent())
            .send()
            .await
            .map_err(|e| format!("Request to {} failed: {}", request.url, e))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| format!("Could not read body from {}: {}", request.url, e))?;
        let elapsed = started.elapsed();

        debug!(url = %request.url, status, ?elapsed, "Probe response.");
        Ok(ProbeResponse { status, body, elapsed })
    }
}
