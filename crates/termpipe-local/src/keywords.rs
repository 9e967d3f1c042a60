use crate::config::lookup_url;
use crate::extract::truncate_chars;
use crate::oracle::json_object;
use termpipe_core::{
    is_excluded_term, Difficulty, Error, Keyword, KeywordOrigin, Oracle, OracleRequest, Result,
    ScrapedPage, TimeRange,
};
use tracing::info;

/// Cap on article keywords returned from one extraction call.
pub const MAX_ARTICLE_KEYWORDS: usize = 10;

pub(crate) const ARTICLE_TOOL: &str = "llm + article scrape";

const SYSTEM: &str = "You are an SEO expert. Extract ONLY nouns and noun phrases as keywords. \
Include CPC and difficulty level. NO VERBS. DO NOT include product names. Return ONLY valid JSON.";

fn prompt(article: &ScrapedPage, time_range: TimeRange) -> String {
    let headings: Vec<&String> = article.headings.iter().take(20).collect();
    let headings = serde_json::to_string_pretty(&headings).unwrap_or_default();
    let volume_field = time_range.volume_field();
    format!(
        "You are an SEO expert. Analyze this article and extract REAL, GOOGLE-SEARCHABLE keywords.\n\n\
ARTICLE URL: {url}\n\
ARTICLE TITLE: {title}\n\n\
ARTICLE HEADINGS:\n{headings}\n\n\
ARTICLE CONTENT:\n{content}\n\n\
TASK: Extract exactly 5 keywords that:\n\
1. ARE ACTUALLY PRESENT in the article (title, headings, or content)\n\
2. Are REAL search terms people actually type into Google\n\
3. Are generic industry terms that can be used across products\n\
4. Are NOUNS or NOUN PHRASES only - DO NOT include verbs\n\n\
IMPORTANT RULES:\n\
- DO NOT include VERBS in keywords (no \"create\", \"build\", \"manage\", \"use\", etc.)\n\
- Focus on NOUNS and NOUN PHRASES only (e.g., \"form builder\", \"data validation\", \"workflow automation\")\n\
- DO NOT include product names\n\
- Keywords should be concepts/things, not actions\n\n\
For each keyword, provide:\n\
- {time_range}ly search volume estimate\n\
- CPC (Cost Per Click) in USD - realistic estimate based on keyword competitiveness\n\
- Difficulty: \"low\", \"medium\", or \"high\" based on competition level\n\n\
Return ONLY valid JSON:\n\
{{\n\
    \"keywords\": [\n\
        {{\n\
            \"keyword\": \"noun or noun phrase keyword\",\n\
            \"{volume_field}\": <realistic_volume_integer>,\n\
            \"cpc\": <cpc_in_usd_decimal>,\n\
            \"difficulty\": \"low|medium|high\"\n\
        }}\n\
    ]\n\
}}",
        url = article.url,
        title = article.title,
        content = truncate_chars(&article.body, 4_000),
    )
}

/// Extract search keywords from the primary article.
///
/// This stage is strict: a keyword the oracle returns without a volume, CPC,
/// or difficulty is a hard failure, as is an all-filtered-out result. The
/// lenient defaulting lives in the mapping stage only.
pub async fn extract_article_keywords(
    oracle: &dyn Oracle,
    article: &ScrapedPage,
    time_range: TimeRange,
) -> Result<Vec<Keyword>> {
    let raw = oracle
        .complete(&OracleRequest::new(
            SYSTEM,
            &prompt(article, time_range),
            0.2,
            2_500,
        ))
        .await?;

    let value = json_object(&raw)?;
    let entries = value
        .get("keywords")
        .and_then(|v| v.as_array())
        .filter(|a| !a.is_empty())
        .ok_or_else(|| Error::KeywordExtraction("oracle returned no keywords".to_string()))?;

    let volume_field = time_range.volume_field();
    let mut out = Vec::new();
    for entry in entries {
        let text = entry
            .get("keyword")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .trim()
            .to_string();
        if text.is_empty() {
            continue;
        }
        let volume = entry.get(volume_field).and_then(|v| v.as_u64()).ok_or_else(|| {
            Error::KeywordExtraction(format!("no search volume for keyword: {text}"))
        })?;
        let cpc = entry
            .get("cpc")
            .and_then(|v| v.as_f64())
            .ok_or_else(|| Error::KeywordExtraction(format!("no cpc for keyword: {text}")))?;
        let difficulty = entry
            .get("difficulty")
            .and_then(|v| v.as_str())
            .and_then(Difficulty::parse)
            .ok_or_else(|| {
                Error::KeywordExtraction(format!("no difficulty for keyword: {text}"))
            })?;

        if is_excluded_term(&text) {
            continue;
        }
        out.push(Keyword {
            lookup_url: lookup_url(&text),
            text,
            search_volume: Some(volume),
            cpc,
            difficulty,
            origin: KeywordOrigin::Article,
            tool: ARTICLE_TOOL.to_string(),
            used_by: Vec::new(),
        });
    }

    if out.is_empty() {
        return Err(Error::KeywordExtraction(
            "all extracted keywords were filtered out (contained product names)".to_string(),
        ));
    }
    out.truncate(MAX_ARTICLE_KEYWORDS);
    info!(count = out.len(), "article keywords extracted");
    Ok(out)
}
