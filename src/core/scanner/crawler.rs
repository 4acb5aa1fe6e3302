// src/core/scanner/crawler.rs

use crate::core::cancel::CancelFlag;
use crate::core::events::EventSink;
use crate::core::models::{CrawlResult, DiscoveredForm, HttpMethod};
use crate::core::scanner::renderer::{PageRenderer, RenderedPage};
use rand::Rng;
use scraper::{ElementRef, Html, Selector};
use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::{Origin, Url};

/// Value put into every discovered form field.
pub const FORM_PLACEHOLDER: &str = "test";

/// Path fragment that marks a request as an API call.
const API_MARKER: &str = "/api/";

const IGNORED_INPUT_TYPES: &[&str] = &["submit", "button", "reset", "image"];

/// Depth-bounded traversal of one web target.
pub struct CrawlStage<'a> {
    pub renderer: &'a dyn PageRenderer,
    pub events: &'a EventSink,
    pub cancel: &'a CancelFlag,
    pub politeness_delay: Duration,
    pub politeness_jitter: Duration,
}

/// Mutable state of one crawl, owned by `CrawlStage::run`.
struct Traversal {
    origin: Origin,
    visited: HashSet<String>,
    queue: VecDeque<Hop>,
    form_signatures: HashSet<(String, HttpMethod, Vec<String>)>,
    result: CrawlResult,
}

struct Hop {
    url: Url,
    /// Navigations left including this one.
    budget: u32,
    level: u32,
}

/// What one page contributes, extracted without holding the parsed DOM.
#[derive(Debug, Default)]
struct PageFacts {
    links: Vec<Url>,
    forms: Vec<DiscoveredForm>,
}

impl CrawlStage<'_> {
    /// Crawls one web target breadth-first and collects what can be probed.
    ///
    /// Each page is rendered at most once. Same-origin links are queued with
    /// one less navigation of budget, forms are deduplicated by action, method
    /// and field names, and data-fetch requests the page issued become API
    /// endpoints. A randomized politeness delay separates navigations.
    ///
    /// # Arguments
    ///
    /// * `base` - Root URL of the web service (e.g. `http://10.0.0.5:8080/`).
    /// * `depth` - Navigation budget; `1` renders only `base`.
    ///
    /// # Returns
    ///
    /// A `CrawlResult` with the discovered URLs, forms and API endpoints. A
    /// page that fails to render is logged and skipped, and a stop request
    /// returns whatever was collected so far.
    pub async fn run(&self, base: &Url, depth: u32) -> CrawlResult {
        info!(base = %base, depth, "Starting crawl.");
        let mut traversal = Traversal {
            origin: base.origin(),
            visited: HashSet::new(),
            queue: VecDeque::from([Hop { url: base.clone(), budget: depth, level: 0 }]),
            form_signatures: HashSet::new(),
            result: CrawlResult::new(base.as_str()),
        };

        while let Some(hop) = traversal.queue.pop_front() {
            if self.cancel.is_cancelled() {
                self.events.warning("Crawl stopped, skipping remaining pages.").await;
                break;
            }
            if hop.budget == 0 {
                continue;
            }
            let key = normalize(&hop.url);
            if !traversal.visited.insert(key.clone()) {
                continue;
            }
            traversal.result.urls.insert(key);

            let page = match self.renderer.render(&hop.url).await {
                Ok(page) => page,
                Err(e) => {
                    warn!(url = %hop.url, error = %e, "Abandoning crawl branch.");
                    self.events.warning(format!("Failed to crawl {}: {}", hop.url, e)).await;
                    continue;
                }
            };

            if self.cancel.sleep(self.next_delay()).await {
                self.events.warning("Crawl stopped, skipping remaining pages.").await;
                break;
            }

            self.inspect(&mut traversal, &hop, &page);
        }

        let result = traversal.result;
        info!(
            pages = result.pages_visited,
            urls = result.urls.len(),
            forms = result.forms.len(),
            apis = result.api_endpoints.len(),
            "Crawl finished."
        );
        result
    }

    fn next_delay(&self) -> Duration {
        let jitter_ms = self.politeness_jitter.as_millis() as u64;
        if jitter_ms == 0 {
            return self.politeness_delay;
        }
        self.politeness_delay + Duration::from_millis(rand::rng().random_range(0..=jitter_ms))
    }

    fn inspect(&self, traversal: &mut Traversal, hop: &Hop, page: &RenderedPage) {
        let result = &mut traversal.result;
        result.pages_visited += 1;
        result.deepest_level = result.deepest_level.max(hop.level);

        let facts = extract_page_facts(&page.url, &page.html, &traversal.origin);
        debug!(url = %page.url, links = facts.links.len(), forms = facts.forms.len(), "Inspected page.");

        for link in facts.links {
            let key = normalize(&link);
            result.urls.insert(key.clone());
            if hop.budget > 1 && !traversal.visited.contains(&key) {
                traversal.queue.push_back(Hop { url: link, budget: hop.budget - 1, level: hop.level + 1 });
            }
        }

        for form in facts.forms {
            let signature = (form.url.clone(), form.method, form.params.keys().cloned().collect());
            if traversal.form_signatures.insert(signature) {
                result.forms.push(form);
            }
        }

        for request in &page.requests {
            let Ok(mut url) = Url::parse(&request.url) else { continue };
            if request.resource_type.is_data_fetch() || url.path().contains(API_MARKER) {
                url.set_query(None);
                url.set_fragment(None);
                result.api_endpoints.insert(url.to_string());
            }
        }
    }
}

/// Visited-set key: the URL without its fragment.
fn normalize(url: &Url) -> String {
    let mut url = url.clone();
    url.set_fragment(None);
    url.to_string()
}

fn extract_page_facts(page_url: &Url, html: &str, origin: &Origin) -> PageFacts {
    let document = Html::parse_document(html);
    let mut facts = PageFacts::default();

    if let Ok(anchors) = Selector::parse("a[href]") {
        for anchor in document.select(&anchors) {
            let Some(href) = anchor.value().attr("href") else { continue };
            let Ok(mut link) = page_url.join(href.trim()) else { continue };
            link.set_fragment(None);
            if &link.origin() == origin {
                facts.links.push(link);
            }
        }
    }

    if let Ok(forms) = Selector::parse("form") {
        for form in document.select(&forms) {
            if let Some(discovered) = parse_form(page_url, form, origin) {
                facts.forms.push(discovered);
            }
        }
    }
    facts
}

fn parse_form(page_url: &Url, form: ElementRef<'_>, origin: &Origin) -> Option<DiscoveredForm> {
    let action = form.value().attr("action").map(str::trim).unwrap_or("");
    let mut url = if action.is_empty() { page_url.clone() } else { page_url.join(action).ok()? };
    url.set_fragment(None);
    if &url.origin() != origin {
        return None;
    }

    let fields = Selector::parse("input[name], textarea[name], select[name]").ok()?;
    let mut params = BTreeMap::new();
    for field in form.select(&fields) {
        let element = field.value();
        let kind = element.attr("type").unwrap_or("text").to_ascii_lowercase();
        if element.name() == "input" && IGNORED_INPUT_TYPES.contains(&kind.as_str()) {
            continue;
        }
        match element.attr("name").map(str::trim) {
            Some(name) if !name.is_empty() => {
                params.insert(name.to_string(), FORM_PLACEHOLDER.to_string());
            }
            _ => {}
        }
    }
    if params.is_empty() {
        return None;
    }

    Some(DiscoveredForm {
        url: url.to_string(),
        method: HttpMethod::from_form_attr(form.value().attr("method")),
        params,
    })
}

/// Unique URLs carrying a query string, handy for logging.
pub fn parameterized_urls(result: &CrawlResult) -> BTreeSet<&str> {
    result.urls.iter().map(String::as_str).filter(|u| u.contains('?')).collect()
}
