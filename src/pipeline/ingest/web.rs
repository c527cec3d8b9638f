use std::time::Duration;

use scraper::{ElementRef, Html, Selector};

use super::normalize::normalize_text;
use super::types::{FetchedPage, PageFetcher, SourceDocument, SourceKind};
use super::IngestError;
use crate::config;

/// Blocking HTTP fetcher for web sources.
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new(user_agent: &str, timeout_secs: u64) -> Result<Self, IngestError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| IngestError::Http {
                url: String::new(),
                message: format!("client build failed: {e}"),
            })?;

        Ok(Self { client })
    }

    /// Fetcher with the fixed ingestion user agent and default timeout.
    pub fn with_defaults() -> Result<Self, IngestError> {
        Self::new(config::INGEST_USER_AGENT, config::DEFAULT_FETCH_TIMEOUT_SECS)
    }
}

impl PageFetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<FetchedPage, IngestError> {
        let http_err = |e: reqwest::Error| IngestError::Http {
            url: url.to_string(),
            message: e.to_string(),
        };

        let response = self.client.get(url).send().map_err(http_err)?;
        let status = response.status();
        if !status.is_success() {
            return Err(IngestError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().map_err(http_err)?;
        Ok(FetchedPage {
            url: url.to_string(),
            body,
        })
    }
}

/// Convert a fetched HTML page into a single document.
/// Returns `None` when the page has no readable text.
pub fn html_to_document(page: &FetchedPage) -> Option<SourceDocument> {
    let html = Html::parse_document(&page.body);
    let selectors = PageSelectors::new();

    let title = html
        .select(&selectors.title)
        .next()
        .map(|t| collapse_whitespace(&t.text().collect::<String>()))
        .filter(|t| !t.is_empty());

    let root = selectors.pick_root(&html);
    let mut blocks: Vec<String> = Vec::new();
    for element in root.descendent_elements() {
        if is_block(element) && !inside_skipped(element) {
            let text = collapse_whitespace(&element.text().collect::<String>());
            if !text.is_empty() {
                blocks.push(text);
            }
        }
    }

    // Pages without block markup: fall back to all visible root text.
    if blocks.is_empty() {
        let text = visible_text(root);
        if !text.is_empty() {
            blocks.push(text);
        }
    }

    let text = normalize_text(&blocks.join("\n\n"));
    if text.is_empty() {
        return None;
    }

    Some(SourceDocument {
        text,
        source: page.url.clone(),
        kind: SourceKind::Web,
        page: 1,
        title,
    })
}

struct PageSelectors {
    title: Selector,
    article: Selector,
    main: Selector,
    body: Selector,
}

impl PageSelectors {
    fn new() -> Self {
        Self {
            title: Selector::parse("title").expect("title selector"),
            article: Selector::parse("article").expect("article selector"),
            main: Selector::parse("main").expect("main selector"),
            body: Selector::parse("body").expect("body selector"),
        }
    }

    fn pick_root<'a>(&self, document: &'a Html) -> ElementRef<'a> {
        document
            .select(&self.article)
            .next()
            .or_else(|| document.select(&self.main).next())
            .or_else(|| document.select(&self.body).next())
            .unwrap_or_else(|| document.root_element())
    }
}

const SKIPPED_TAGS: &[&str] = &["script", "style", "template", "noscript", "svg", "nav", "head"];

fn is_block(element: ElementRef<'_>) -> bool {
    matches!(
        element.value().name(),
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "p" | "li" | "blockquote" | "pre" | "td" | "th"
    ) && !has_block_ancestor(element)
}

/// Nested blocks (a `<p>` inside an `<li>`) are already covered by the outer block.
fn has_block_ancestor(element: ElementRef<'_>) -> bool {
    element.ancestors().filter_map(ElementRef::wrap).any(|a| {
        matches!(
            a.value().name(),
            "p" | "li" | "blockquote" | "pre" | "td" | "th"
        )
    })
}

fn inside_skipped(element: ElementRef<'_>) -> bool {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .any(|a| SKIPPED_TAGS.contains(&a.value().name()))
}

fn visible_text(root: ElementRef<'_>) -> String {
    let mut raw = String::new();
    for node in root.descendants() {
        if let Some(text) = node.value().as_text() {
            let skipped = node
                .ancestors()
                .filter_map(ElementRef::wrap)
                .any(|a| SKIPPED_TAGS.contains(&a.value().name()));
            if !skipped {
                raw.push_str(text);
                raw.push(' ');
            }
        }
    }
    collapse_whitespace(&raw)
}

fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}
