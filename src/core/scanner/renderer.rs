// src/core/scanner/renderer.rs

use crate::core::scanner::http::random_user_agent;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use strum::Display;
use tracing::{debug, info};
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum ResourceType {
    Document,
    Script,
    Stylesheet,
    Image,
    Fetch,
    Xhr,
}

impl ResourceType {
    pub fn is_data_fetch(self) -> bool {
        matches!(self, ResourceType::Fetch | ResourceType::Xhr)
    }
}

/// A request the page issued while loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkRequest {
    pub url: String,
    pub resource_type: ResourceType,
}

/// A loaded page as the crawler sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    /// Where the page ended up after redirects.
    pub url: Url,
    pub html: String,
    pub requests: Vec<NetworkRequest>,
}

/// The page-rendering capability used by the crawl stage.
///
/// Only one crawl uses a renderer at a time.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    async fn render(&self, url: &Url) -> Result<RenderedPage, String>;
}

static RE_FETCH_CALL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"fetch\(\s*['"`]([^'"`]+)['"`]"#).unwrap());
static RE_AXIOS_CALL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"axios(?:\.(?:get|post|put|delete|patch))?\(\s*['"`]([^'"`]+)['"`]"#).unwrap());
static RE_XHR_OPEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\.open\(\s*['"][A-Za-z]+['"]\s*,\s*['"`]([^'"`]+)['"`]"#).unwrap());

/// Renders pages by fetching them over HTTP and reading the static markup.
///
/// Sub-resources come from the markup; data-fetch requests are recovered from
/// `fetch`, `axios` and `XMLHttpRequest.open` calls in inline scripts.
#[derive(Debug, Clone)]
pub struct HttpRenderer {
    client: reqwest::Client,
}

impl HttpRenderer {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PageRenderer for HttpRenderer {
    async fn render(&self, url: &Url) -> Result<RenderedPage, String> {
        let response = self
            .client
            .get(url.clone())
            .header(reqwest::header::USER_AGENT, random_user_agent())
            .send()
            .await
            .map_err(|e| format!("Navigation to {} failed: {}", url, e))?;
        let final_url = response.url().clone();
        let html = response
            .text()
            .await
            .map_err(|e| format!("Could not read {}: {}", final_url, e))?;

        let requests = collect_requests(&final_url, &html);
        info!(url = %final_url, requests = requests.len(), "Rendered page.");
        Ok(RenderedPage { url: final_url, html, requests })
    }
}

/// Requests a browser would issue for this markup.
pub fn collect_requests(page_url: &Url, html: &str) -> Vec<NetworkRequest> {
    let document = Html::parse_document(html);
    let mut requests = vec![NetworkRequest { url: page_url.to_string(), resource_type: ResourceType::Document }];

    let sources = [
        ("script[src]", "src", ResourceType::Script),
        ("link[rel~='stylesheet'][href]", "href", ResourceType::Stylesheet),
        ("img[src]", "src", ResourceType::Image),
        ("iframe[src]", "src", ResourceType::Document),
    ];
    for (css, attr, resource_type) in sources {
        let Ok(selector) = Selector::parse(css) else { continue };
        for element in document.select(&selector) {
            if let Some(resolved) = element.value().attr(attr).and_then(|v| page_url.join(v).ok()) {
                requests.push(NetworkRequest { url: resolved.to_string(), resource_type });
            }
        }
    }

    if let Ok(selector) = Selector::parse("script:not([src])") {
        for script in document.select(&selector) {
            let code: String = script.text().collect();
            let calls = [
                (&RE_FETCH_CALL, ResourceType::Fetch),
                (&RE_AXIOS_CALL, ResourceType::Xhr),
                (&RE_XHR_OPEN, ResourceType::Xhr),
            ];
            for (re, resource_type) in calls {
                for caps in re.captures_iter(&code) {
                    if let Ok(resolved) = page_url.join(&caps[1]) {
                        requests.push(NetworkRequest { url: resolved.to_string(), resource_type });
                    }
                }
            }
        }
    }

    debug!(url = %page_url, count = requests.len(), "Collected page requests.");
    requests
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn inline_script_calls_become_data_fetch_requests() {
        let page = Url::parse("http://10.0.0.5:8080/app/").unwrap();
        let html = r#"
            <html><head>
              <script src="/static/main.js"></script>
              <link rel="stylesheet" href="site.css">
            </head><body>
              <img src="logo.png">
              <script>
                fetch('/api/users?page=2').then(r => r.json());
                axios.post("/v1/login", body);
                xhr.open("GET", "/data/feed.json");
              </script>
            </body></html>"#;

        let requests = collect_requests(&page, html);
        let find = |url: &str| requests.iter().find(|r| r.url == url).map(|r| r.resource_type);

        assert_eq!(find("http://10.0.0.5:8080/app/"), Some(ResourceType::Document));
        assert_eq!(find("http://10.0.0.5:8080/static/main.js"), Some(ResourceType::Script));
        assert_eq!(find("http://10.0.0.5:8080/app/site.css"), Some(ResourceType::Stylesheet));
        assert_eq!(find("http://10.0.0.5:8080/app/logo.png"), Some(ResourceType::Image));
        assert_eq!(find("http://10.0.0.5:8080/api/users?page=2"), Some(ResourceType::Fetch));
        assert_eq!(find("http://10.0.0.5:8080/v1/login"), Some(ResourceType::Xhr));
        assert_eq!(find("http://10.0.0.5:8080/data/feed.json"), Some(ResourceType::Xhr));
    }

    #[tokio::test]
    async fn renders_page_from_server() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("<html><body><a href='/about'>About</a><script>fetch('/api/ping')</script></body></html>"),
            )
            .mount(&server)
            .await;

        let client = crate::core::scanner::http::build_client(std::time::Duration::from_secs(5)).unwrap();
        let renderer = HttpRenderer::new(client);
        let url = Url::parse(&format!("{}/", server.uri())).unwrap();
        let page = renderer.render(&url).await.unwrap();

        assert!(page.html.contains("/about"));
        assert!(page.requests.iter().any(|r| r.url.ends_with("/api/ping") && r.resource_type.is_data_fetch()));
    }
}
