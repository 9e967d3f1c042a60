use crate::extract::truncate_chars;
use crate::oracle::json_object;
use std::collections::BTreeSet;
use termpipe_core::{
    Capability, Competitor, CompetitorCapabilityGuess, Oracle, OracleRequest, Result,
};
use tracing::debug;

/// Homepage sample size handed to the oracle for URL guessing.
const HOMEPAGE_SAMPLE_CHARS: usize = 1_500;

fn system(competitor: &str) -> String {
    format!(
        "You are an expert at finding equivalent features on competitor websites. \
Generate realistic URLs for {competitor}. Return ONLY valid JSON."
    )
}

fn prompt(capability: &Capability, competitor: &Competitor, homepage_sample: &str) -> String {
    let base = competitor.base_url.trim_end_matches('/');
    let search_terms =
        serde_json::to_string(&capability.competitor_search_terms).unwrap_or_default();
    let sample = if homepage_sample.is_empty() {
        String::new()
    } else {
        format!(
            "COMPETITOR CONTENT SAMPLE: {}\n\n",
            truncate_chars(homepage_sample, HOMEPAGE_SAMPLE_CHARS)
        )
    };
    format!(
        "You are an expert at understanding competitor websites and their URL structures.\n\n\
CAPABILITY TO FIND: {name}\n\
DESCRIPTION: {description}\n\
SEARCH TERMS: {search_terms}\n\n\
COMPETITOR: {comp}\n\
COMPETITOR BASE URL: {base_url}\n\n\
{sample}\
TASK: Generate the most likely URLs where {comp} would document this capability.\n\n\
Consider:\n\
1. Common URL patterns for help/documentation sites\n\
2. How {comp} likely names this feature\n\
3. Their URL structure based on the base URL\n\n\
Return ONLY valid JSON:\n\
{{\n\
    \"competitor_capability\": {{\n\
        \"competitor_name\": \"{comp}\",\n\
        \"likely_feature_name\": \"What {comp} calls this feature\",\n\
        \"probable_urls\": [\n\
            \"{base}/path1\",\n\
            \"{base}/path2\",\n\
            \"{base}/path3\"\n\
        ],\n\
        \"search_query\": \"site:{base_url} {name}\",\n\
        \"terminology_hints\": [\"term1\", \"term2\"]\n\
    }}\n\
}}",
        name = capability.name,
        description = capability.description,
        comp = competitor.name,
        base_url = competitor.base_url,
    )
}

/// Ask the oracle where one competitor most likely documents the capability.
///
/// A malformed response is an error here; the caller treats it as a per-unit
/// failure and falls back to homepage content for that competitor.
pub async fn guess_capability_urls(
    oracle: &dyn Oracle,
    capability: &Capability,
    competitor: &Competitor,
    homepage_sample: &str,
) -> Result<CompetitorCapabilityGuess> {
    let raw = oracle
        .complete(&OracleRequest::new(
            &system(&competitor.name),
            &prompt(capability, competitor, homepage_sample),
            0.3,
            800,
        ))
        .await?;

    let value = json_object(&raw)?;
    let guess = value
        .get("competitor_capability")
        .cloned()
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or_default();
    debug!(competitor = %competitor.name, "capability url guess parsed");
    Ok(guess)
}

/// Merge the two ordered candidate producers: oracle-guessed URLs first,
/// then heuristically discovered ones, exact-string dedup keeping first-seen
/// order. Pure; no IO.
pub fn merge_url_candidates(oracle_urls: &[String], discovered: &[String]) -> Vec<String> {
    let mut seen = BTreeSet::<&str>::new();
    let mut out = Vec::new();
    for u in oracle_urls.iter().chain(discovered.iter()) {
        if seen.insert(u.as_str()) {
            out.push(u.clone());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedOracle;
    use proptest::prelude::*;
    use termpipe_core::Error;

    fn capability() -> Capability {
        serde_json::from_str(
            r#"{"name": "Spam Protection", "description": "Blocks bots.",
                "category": "validation", "competitor_search_terms": ["captcha"]}"#,
        )
        .unwrap()
    }

    fn competitor() -> Competitor {
        Competitor {
            name: "Typeform".to_string(),
            base_url: "https://www.typeform.com/".to_string(),
        }
    }

    #[tokio::test]
    async fn parses_the_guess_object() {
        let oracle = ScriptedOracle::ok(&[r#"
{"competitor_capability": {"competitor_name": "Typeform",
 "likely_feature_name": "Bot Detection",
 "probable_urls": ["https://www.typeform.com/help/bots", "https://www.typeform.com/help/captcha"],
 "search_query": "site:typeform.com spam",
 "terminology_hints": ["respondent verification"]}}"#]);

        let guess = guess_capability_urls(&oracle, &capability(), &competitor(), "sample")
            .await
            .unwrap();
        assert_eq!(guess.likely_feature_name, "Bot Detection");
        assert_eq!(guess.probable_urls.len(), 2);
        assert_eq!(guess.terminology_hints, vec!["respondent verification"]);
    }

    #[tokio::test]
    async fn missing_guess_key_degrades_to_an_empty_guess() {
        let oracle = ScriptedOracle::ok(&[r#"{"unexpected": true}"#]);
        let guess = guess_capability_urls(&oracle, &capability(), &competitor(), "")
            .await
            .unwrap();
        assert!(guess.likely_feature_name.is_empty());
        assert!(guess.probable_urls.is_empty());
    }

    #[tokio::test]
    async fn unparseable_output_is_an_error_for_the_caller_to_absorb() {
        let oracle = ScriptedOracle::ok(&["I do not know their URLs."]);
        let err = guess_capability_urls(&oracle, &capability(), &competitor(), "")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::OracleParse(_)));
    }

    #[test]
    fn merge_keeps_oracle_urls_first_and_dedups_exact_strings() {
        let oracle_urls = vec![
            "https://a/x".to_string(),
            "https://a/y".to_string(),
            "https://a/x".to_string(),
        ];
        let discovered = vec![
            "https://a/y".to_string(),
            "https://a/z".to_string(),
        ];
        let merged = merge_url_candidates(&oracle_urls, &discovered);
        assert_eq!(merged, vec!["https://a/x", "https://a/y", "https://a/z"]);
    }

    proptest! {
        #[test]
        fn merge_output_is_unique_and_order_preserving(
            a in prop::collection::vec("[a-c]{1,2}", 0..8),
            b in prop::collection::vec("[a-c]{1,2}", 0..8),
        ) {
            let merged = merge_url_candidates(&a, &b);
            // No duplicates.
            let unique: BTreeSet<_> = merged.iter().collect();
            prop_assert_eq!(unique.len(), merged.len());
            // Everything present came from an input, and every input is present.
            for u in &merged {
                prop_assert!(a.contains(u) || b.contains(u));
            }
            for u in a.iter().chain(b.iter()) {
                prop_assert!(merged.contains(u));
            }
        }
    }
}
