use crate::extract::{extract_page, truncate_chars};
use crate::{PageFetcher, DEFAULT_TIMEOUT};
use termpipe_core::{Competitor, CompetitorContent, ScrapedPage};
use tracing::{debug, info};

/// How many candidate URLs are fetched per competitor.
pub const MAX_URL_ATTEMPTS: usize = 5;
/// A candidate counts as a hit only past this much extracted body text.
pub const MIN_CONTENT_CHARS: usize = 200;
/// Per-URL contribution to the merged body.
const PER_URL_CHARS: usize = 4_000;
/// Cap on the merged body across all hits.
const MERGED_CHARS: usize = 8_000;
/// Caps for the homepage-fallback path.
pub(crate) const FALLBACK_BODY_CHARS: usize = 6_000;
pub(crate) const FALLBACK_HEADINGS: usize = 20;
const MAX_MERGED_HEADINGS: usize = 30;

/// Fetch the merged URL candidates in priority order and collect everything
/// usable into one [`CompetitorContent`].
///
/// All [`MAX_URL_ATTEMPTS`] candidates are attempted regardless of earlier
/// hits; each hit contributes a URL-prefixed slice of its body. When nothing
/// hits, the homepage content already fetched by the resolver stage is used
/// instead, provided it clears the same threshold. `None` drops the
/// competitor from this run.
pub async fn scrape_capability_pages(
    fetcher: &PageFetcher,
    competitor: &Competitor,
    capability_name: &str,
    feature_name: &str,
    candidates: &[String],
    terminology_hints: Vec<String>,
    homepage: Option<&ScrapedPage>,
) -> Option<CompetitorContent> {
    let mut urls_scraped: Vec<String> = Vec::new();
    let mut merged_body = String::new();
    let mut headings: Vec<String> = Vec::new();

    for url in candidates.iter().take(MAX_URL_ATTEMPTS) {
        let html = fetcher.fetch_or_empty(url, DEFAULT_TIMEOUT).await;
        if html.is_empty() {
            debug!(%url, "candidate fetch failed");
            continue;
        }
        let page = extract_page(&html, url);
        if page.body.chars().count() <= MIN_CONTENT_CHARS {
            debug!(%url, "candidate had no substantial content");
            continue;
        }
        merged_body.push_str(&format!(
            "\n\n=== FROM {url} ===\n{}",
            truncate_chars(&page.body, PER_URL_CHARS)
        ));
        headings.extend(page.headings);
        urls_scraped.push(url.clone());
        debug!(%url, chars = page.body.chars().count(), "candidate hit");
    }

    if !urls_scraped.is_empty() {
        let pages_scraped = urls_scraped.len();
        info!(
            competitor = %competitor.name,
            pages = pages_scraped,
            "capability pages scraped"
        );
        headings.truncate(MAX_MERGED_HEADINGS);
        return Some(CompetitorContent {
            competitor_name: competitor.name.clone(),
            capability_name: capability_name.to_string(),
            feature_name: feature_name.to_string(),
            urls_scraped,
            body: truncate_chars(&merged_body, MERGED_CHARS),
            headings,
            terminology_hints,
            pages_scraped,
        });
    }

    // Nothing specific hit; reuse the homepage content from the resolver
    // stage when it is substantial enough.
    let hp = homepage?;
    if hp.body.chars().count() <= MIN_CONTENT_CHARS {
        info!(competitor = %competitor.name, "no usable content, competitor dropped");
        return None;
    }
    info!(competitor = %competitor.name, "falling back to homepage content");
    Some(CompetitorContent {
        competitor_name: competitor.name.clone(),
        capability_name: capability_name.to_string(),
        feature_name: capability_name.to_string(),
        urls_scraped: vec![competitor.base_url.clone()],
        body: truncate_chars(&hp.body, FALLBACK_BODY_CHARS),
        headings: hp.headings.iter().take(FALLBACK_HEADINGS).cloned().collect(),
        terminology_hints: Vec::new(),
        pages_scraped: 1,
    })
}
