use crate::config::lookup_url;
use crate::extract::truncate_chars;
use crate::oracle::json_object;
use termpipe_core::{
    is_excluded_term, ArticleKeywordRef, CompetitorContent, Difficulty, FoundIn, Keyword,
    KeywordMapping, KeywordOrigin, MappedTerm, Oracle, OracleRequest, Result, TimeRange,
};
use tracing::{info, warn};

/// Cost-control caps: article keywords mapped per run, competitors consulted
/// per keyword.
pub const MAX_MAPPED_KEYWORDS: usize = 5;
pub const MAX_MAPPED_COMPETITORS: usize = 2;

pub(crate) const COMPETITOR_TOOL: &str = "competitor site scrape";

const DEFAULT_VOLUME: u64 = 500;
const DEFAULT_CPC: f64 = 1.5;
const DEFAULT_RELEVANCE: u8 = 7;

pub struct MappingOutcome {
    /// One entry per article keyword that found at least one equivalent,
    /// competitor terms sorted by descending volume.
    pub keyword_mappings: Vec<KeywordMapping>,
    /// Competitor terms merged across keywords and competitors
    /// (case-insensitive text match, `used_by` unioned).
    pub competitor_keywords: Vec<Keyword>,
}

fn prompt(
    article_keyword: &str,
    article_context: &str,
    comp: &CompetitorContent,
    time_range: TimeRange,
) -> String {
    let headings = comp
        .headings
        .iter()
        .take(15)
        .cloned()
        .collect::<Vec<_>>()
        .join(", ");
    let volume_field = time_range.volume_field();
    let name = &comp.competitor_name;
    format!(
        "You are an SEO expert. Find what term/keyword \"{name}\" uses for the same concept as \"{article_keyword}\".\n\n\
ARTICLE KEYWORD: \"{article_keyword}\"\n\
ARTICLE CONTEXT: {context}\n\n\
COMPETITOR: {name}\n\
COMPETITOR HEADINGS: {headings}\n\
COMPETITOR CONTENT: {content}\n\n\
TASK: Find the EQUIVALENT keyword/term that {name} uses for \"{article_keyword}\".\n\n\
For example:\n\
- If article keyword is \"reCAPTCHA\" -> competitor might use \"spam protection\", \"bot detection\", \"CAPTCHA verification\"\n\
- If article keyword is \"form validation\" -> competitor might use \"field validation\", \"input validation\", \"validation rules\"\n\
- If article keyword is \"conditional logic\" -> competitor might use \"branching logic\", \"skip logic\", \"form rules\"\n\n\
RULES:\n\
1. The competitor keyword MUST be semantically related to \"{article_keyword}\"\n\
2. It should be a term the competitor ACTUALLY uses (found in their content/headings)\n\
3. Must be a NOUN or NOUN PHRASE - NO VERBS\n\
4. If you can't find an equivalent, use a closely related industry term\n\n\
Return ONLY valid JSON:\n\
{{\n\
    \"article_keyword\": \"{article_keyword}\",\n\
    \"competitor_keyword\": {{\n\
        \"keyword\": \"equivalent term {name} uses\",\n\
        \"{volume_field}\": <realistic_volume>,\n\
        \"cpc\": <cpc_in_usd>,\n\
        \"difficulty\": \"low|medium|high\",\n\
        \"relevance_score\": <1-10>,\n\
        \"found_in\": \"heading|content|inferred\"\n\
    }}\n\
}}",
        context = truncate_chars(article_context, 500),
        content = truncate_chars(&comp.body, 3_000),
    )
}

/// One (article keyword × competitor) equivalence call.
///
/// `Err` is a transport/parse failure for the caller to absorb; `Ok(None)`
/// means the oracle answered but produced nothing usable. Missing numeric
/// fields are defaulted here — this stage tolerates oracle sloppiness that
/// the extraction stage does not.
async fn equivalent_for(
    oracle: &dyn Oracle,
    article_keyword: &str,
    article_context: &str,
    comp: &CompetitorContent,
    time_range: TimeRange,
) -> Result<Option<MappedTerm>> {
    let name = &comp.competitor_name;
    let raw = oracle
        .complete(&OracleRequest::new(
            &format!(
                "Find what {name} calls the same feature/concept as '{article_keyword}'. \
Return ONLY valid JSON."
            ),
            &prompt(article_keyword, article_context, comp, time_range),
            0.3,
            500,
        ))
        .await?;

    let value = json_object(&raw)?;
    let Some(ckw) = value.get("competitor_keyword") else {
        return Ok(None);
    };
    let text = ckw
        .get("keyword")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .trim()
        .to_string();
    if text.is_empty() || is_excluded_term(&text) {
        return Ok(None);
    }

    let volume = ckw
        .get(time_range.volume_field())
        .and_then(|v| v.as_u64())
        .or_else(|| ckw.get("monthly_volume").and_then(|v| v.as_u64()))
        .unwrap_or(DEFAULT_VOLUME);
    let cpc = ckw.get("cpc").and_then(|v| v.as_f64()).unwrap_or(DEFAULT_CPC);
    let difficulty = ckw
        .get("difficulty")
        .and_then(|v| v.as_str())
        .and_then(Difficulty::parse)
        .unwrap_or_default();
    let relevance = ckw
        .get("relevance_score")
        .and_then(|v| v.as_u64())
        .map(|v| v.min(u8::MAX as u64) as u8)
        .unwrap_or(DEFAULT_RELEVANCE);
    let found_in = ckw
        .get("found_in")
        .and_then(|v| v.as_str())
        .and_then(FoundIn::parse)
        .unwrap_or_default();

    Ok(Some(MappedTerm {
        text,
        competitor: comp.competitor_name.clone(),
        search_volume: volume,
        cpc,
        difficulty,
        relevance,
        found_in,
    }))
}

fn merge_into_pool(pool: &mut Vec<Keyword>, term: &MappedTerm) {
    let key = term.text.trim().to_lowercase();
    if let Some(existing) = pool
        .iter_mut()
        .find(|k| k.text.trim().to_lowercase() == key)
    {
        if !existing.used_by.contains(&term.competitor) {
            existing.used_by.push(term.competitor.clone());
        }
        return;
    }
    pool.push(Keyword {
        text: term.text.clone(),
        search_volume: Some(term.search_volume),
        cpc: term.cpc,
        difficulty: term.difficulty,
        origin: KeywordOrigin::Competitor,
        tool: COMPETITOR_TOOL.to_string(),
        lookup_url: lookup_url(&term.text),
        used_by: vec![term.competitor.clone()],
    });
}

/// For each article keyword, ask each competitor's content what that
/// competitor calls the concept. A failed pair only costs coverage.
pub async fn map_keywords(
    oracle: &dyn Oracle,
    article_keywords: &[Keyword],
    article_context: &str,
    content: &[CompetitorContent],
    time_range: TimeRange,
) -> MappingOutcome {
    let article_keywords = &article_keywords[..article_keywords.len().min(MAX_MAPPED_KEYWORDS)];
    let content = &content[..content.len().min(MAX_MAPPED_COMPETITORS)];

    let mut keyword_mappings: Vec<KeywordMapping> = Vec::new();
    let mut competitor_keywords: Vec<Keyword> = Vec::new();

    for akw in article_keywords {
        let mut terms: Vec<MappedTerm> = Vec::new();
        for comp in content {
            if comp.body.is_empty() {
                continue;
            }
            match equivalent_for(oracle, &akw.text, article_context, comp, time_range).await {
                Ok(Some(term)) => {
                    info!(
                        article_keyword = %akw.text,
                        competitor = %term.competitor,
                        term = %term.text,
                        volume = term.search_volume,
                        "mapped"
                    );
                    terms.push(term);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(
                        article_keyword = %akw.text,
                        competitor = %comp.competitor_name,
                        "mapping pair skipped: {e}"
                    );
                }
            }
        }

        if terms.is_empty() {
            continue;
        }
        terms.sort_by(|a, b| b.search_volume.cmp(&a.search_volume));
        for term in &terms {
            merge_into_pool(&mut competitor_keywords, term);
        }
        keyword_mappings.push(KeywordMapping {
            article_keyword: ArticleKeywordRef {
                text: akw.text.clone(),
                search_volume: akw.search_volume,
            },
            competitor_terms: terms,
        });
    }

    MappingOutcome {
        keyword_mappings,
        competitor_keywords,
    }
}
