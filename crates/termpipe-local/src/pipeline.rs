use crate::capability::identify_capability;
use crate::config::competitors_for;
use crate::extract::{extract_article, extract_page, truncate_chars};
use crate::keywords::extract_article_keywords;
use crate::links::discover_doc_links;
use crate::mapper::map_keywords;
use crate::rank::suggest_keywords;
use crate::resolver::{guess_capability_urls, merge_url_candidates};
use crate::scrape::{
    scrape_capability_pages, FALLBACK_BODY_CHARS, FALLBACK_HEADINGS, MIN_CONTENT_CHARS,
};
use crate::{PageFetcher, DEFAULT_TIMEOUT};
use std::sync::Arc;
use std::time::Duration;
use termpipe_core::{
    is_excluded_term, AnalysisReport, Capability, Competitor, CompetitorContent, Error, Keyword,
    Oracle, Result, TimeRange,
};
use tracing::{info, warn};

/// Homepage probes fail fast; the primary article gets more room.
const HOMEPAGE_TIMEOUT: Duration = Duration::from_secs(12);
const ARTICLE_TIMEOUT: Duration = Duration::from_secs(30);

/// Article keywords reported back to the caller, after re-filtering.
const MAX_REPORTED_ARTICLE_KEYWORDS: usize = 5;

#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub url: String,
    pub product: String,
    pub time_range: TimeRange,
    /// Pre-supplied article keywords. When empty, keywords are extracted
    /// from the article itself.
    pub article_keywords: Vec<Keyword>,
}

/// End-to-end discovery run: identify the capability, locate and scrape each
/// competitor's equivalent pages, map keywords, rank suggestions.
///
/// One logical task per request; every stage runs in strict sequence.
pub struct Pipeline {
    fetcher: PageFetcher,
    oracle: Arc<dyn Oracle>,
}

impl Pipeline {
    pub fn new(fetcher: PageFetcher, oracle: Arc<dyn Oracle>) -> Self {
        Self { fetcher, oracle }
    }

    /// Run against the statically configured competitor set for the product.
    pub async fn run(&self, req: &AnalysisRequest) -> Result<AnalysisReport> {
        let competitors = competitors_for(&req.product)?;
        self.run_with_competitors(req, &competitors).await
    }

    /// Run against an explicit competitor set. Seam for callers (and tests)
    /// that manage their own configuration.
    pub async fn run_with_competitors(
        &self,
        req: &AnalysisRequest,
        competitors: &[Competitor],
    ) -> Result<AnalysisReport> {
        let html = self.fetcher.fetch(&req.url, ARTICLE_TIMEOUT).await?;
        let article = extract_article(&html, &req.url)?;
        info!(url = %req.url, title = %article.title, "article scraped");

        let article_keywords = if req.article_keywords.is_empty() {
            extract_article_keywords(self.oracle.as_ref(), &article, req.time_range).await?
        } else {
            req.article_keywords.clone()
        };

        let capability = identify_capability(self.oracle.as_ref(), &article).await?;

        let mut content = self.resolve_and_scrape(competitors, &capability).await;
        if content.is_empty() {
            warn!("capability scraping found nothing; retrying with homepages only");
            content = self.homepage_only_pass(competitors, &capability).await;
        }
        if content.is_empty() {
            return Err(Error::NoCompetitorContent(capability.name.clone()));
        }
        info!(
            competitors_scraped = content.len(),
            capability = %capability.name,
            "competitor content collected"
        );

        let article_context = format!(
            "{}. {}",
            article.title,
            truncate_chars(&article.body, 300)
        );
        let outcome = map_keywords(
            self.oracle.as_ref(),
            &article_keywords,
            &article_context,
            &content,
            req.time_range,
        )
        .await;

        let article_keywords: Vec<Keyword> = article_keywords
            .into_iter()
            .take(MAX_REPORTED_ARTICLE_KEYWORDS)
            .filter(|k| !is_excluded_term(&k.text))
            .collect();
        let suggested_keywords = suggest_keywords(&article_keywords, &outcome.competitor_keywords);

        Ok(AnalysisReport {
            article_keywords,
            competitor_keywords: outcome.competitor_keywords,
            suggested_keywords,
            keyword_mappings: outcome.keyword_mappings,
            capability,
            competitors_scraped: content.len(),
        })
    }

    /// Primary pass: per competitor, discover candidate URLs (oracle guess +
    /// homepage scan) and scrape them. A competitor whose guess call fails
    /// falls through to its homepage content instead of aborting the run.
    async fn resolve_and_scrape(
        &self,
        competitors: &[Competitor],
        capability: &Capability,
    ) -> Vec<CompetitorContent> {
        let mut out = Vec::new();
        for comp in competitors {
            let homepage_html = self
                .fetcher
                .fetch_or_empty(&comp.base_url, HOMEPAGE_TIMEOUT)
                .await;
            let homepage =
                (!homepage_html.is_empty()).then(|| extract_page(&homepage_html, &comp.base_url));
            let discovered = discover_doc_links(&homepage_html, &comp.base_url);

            let sample = homepage.as_ref().map(|p| p.body.as_str()).unwrap_or("");
            let scraped = match guess_capability_urls(
                self.oracle.as_ref(),
                capability,
                comp,
                sample,
            )
            .await
            {
                Ok(guess) => {
                    let feature_name = if guess.likely_feature_name.trim().is_empty() {
                        capability.name.clone()
                    } else {
                        guess.likely_feature_name.clone()
                    };
                    let candidates = merge_url_candidates(&guess.probable_urls, &discovered);
                    scrape_capability_pages(
                        &self.fetcher,
                        comp,
                        &capability.name,
                        &feature_name,
                        &candidates,
                        guess.terminology_hints,
                        homepage.as_ref(),
                    )
                    .await
                }
                Err(e) => {
                    warn!(competitor = %comp.name, "url guess failed, using homepage only: {e}");
                    scrape_capability_pages(
                        &self.fetcher,
                        comp,
                        &capability.name,
                        &capability.name,
                        &[],
                        Vec::new(),
                        homepage.as_ref(),
                    )
                    .await
                }
            };
            match scraped {
                Some(c) => out.push(c),
                None => warn!(competitor = %comp.name, "no usable content this pass"),
            }
        }
        out
    }

    /// Last-resort pass when the capability-directed scrape produced nothing
    /// anywhere: plain homepage content for every competitor.
    async fn homepage_only_pass(
        &self,
        competitors: &[Competitor],
        capability: &Capability,
    ) -> Vec<CompetitorContent> {
        let mut out = Vec::new();
        for comp in competitors {
            let html = self
                .fetcher
                .fetch_or_empty(&comp.base_url, DEFAULT_TIMEOUT)
                .await;
            if html.is_empty() {
                continue;
            }
            let page = extract_page(&html, &comp.base_url);
            if page.body.chars().count() <= MIN_CONTENT_CHARS {
                continue;
            }
            out.push(CompetitorContent {
                competitor_name: comp.name.clone(),
                capability_name: capability.name.clone(),
                feature_name: capability.name.clone(),
                urls_scraped: vec![comp.base_url.clone()],
                body: truncate_chars(&page.body, FALLBACK_BODY_CHARS),
                headings: page.headings.into_iter().take(FALLBACK_HEADINGS).collect(),
                terminology_hints: Vec::new(),
                pages_scraped: 1,
            });
        }
        out
    }
}
