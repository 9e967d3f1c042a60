use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("http status {status} fetching {url}")]
    Status { url: String, status: u16 },
    #[error("timeout fetching {0}")]
    Timeout(String),
    #[error("fetch failed: {0}")]
    Fetch(String),
    #[error("thin page ({bytes} bytes): {url}")]
    ThinPage { url: String, bytes: usize },
    #[error("no title found in {0}")]
    NoTitle(String),
    #[error("no readable content in {0}")]
    NoContent(String),
    #[error("oracle failed: {0}")]
    Oracle(String),
    #[error("oracle output had no parseable JSON object: {0}")]
    OracleParse(String),
    #[error("capability identification failed: {0}")]
    Capability(String),
    #[error("keyword extraction failed: {0}")]
    KeywordExtraction(String),
    #[error("unknown product: {0}")]
    UnknownProduct(String),
    #[error("invalid time range: {0} (expected week, month, or year)")]
    InvalidTimeRange(String),
    #[error("no competitor produced usable content for capability: {0}")]
    NoCompetitorContent(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Terms that must never appear inside a produced keyword. These are the
/// product's own names; suggesting them back to its writers is useless.
pub const EXCLUDED_PRODUCT_TERMS: &[&str] = &[
    "adaptive form",
    "adaptive forms",
    "aem sites",
    "aem site",
    "aem forms",
    "aem form",
    "aem as a cloud service",
    "aem cloud service",
    "aem assets",
    "aem asset",
    "adobe experience manager",
    "experience manager",
    "aem",
];

/// Case-insensitive substring check against [`EXCLUDED_PRODUCT_TERMS`].
pub fn is_excluded_term(text: &str) -> bool {
    let t = text.trim().to_lowercase();
    EXCLUDED_PRODUCT_TERMS.iter().any(|term| t.contains(term))
}

/// Time window a search-volume estimate is scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeRange {
    Week,
    Month,
    Year,
}

impl TimeRange {
    /// Field name the oracle is asked to put the volume estimate under.
    pub fn volume_field(&self) -> &'static str {
        match self {
            TimeRange::Week => "weekly_volume",
            TimeRange::Month => "monthly_volume",
            TimeRange::Year => "yearly_volume",
        }
    }
}

impl FromStr for TimeRange {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "week" => Ok(TimeRange::Week),
            "month" => Ok(TimeRange::Month),
            "year" => Ok(TimeRange::Year),
            other => Err(Error::InvalidTimeRange(other.to_string())),
        }
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TimeRange::Week => "week",
            TimeRange::Month => "month",
            TimeRange::Year => "year",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Low,
    #[default]
    Medium,
    High,
}

impl Difficulty {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Difficulty::Low),
            "medium" => Some(Difficulty::Medium),
            "high" => Some(Difficulty::High),
            _ => None,
        }
    }
}

/// Where a mapped competitor term was spotted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FoundIn {
    Heading,
    #[default]
    Content,
    Inferred,
}

impl FoundIn {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "heading" => Some(FoundIn::Heading),
            "content" => Some(FoundIn::Content),
            "inferred" => Some(FoundIn::Inferred),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeywordOrigin {
    Article,
    Competitor,
}

/// A keyword with its oracle-estimated research metadata.
///
/// Volumes are estimates, not measurements; `None` means the oracle never
/// supplied one and the entry is excluded from volume-ranked output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Keyword {
    pub text: String,
    pub search_volume: Option<u64>,
    pub cpc: f64,
    pub difficulty: Difficulty,
    pub origin: KeywordOrigin,
    /// Label of the tool/path that produced this keyword.
    pub tool: String,
    /// Research-tool URL for manual follow-up.
    pub lookup_url: String,
    /// Competitors observed using this exact term. Empty for article-derived
    /// keywords.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub used_by: Vec<String>,
}

impl Keyword {
    /// Long-tail keywords are three words or more.
    pub fn is_long_tail(&self) -> bool {
        self.text.split_whitespace().count() >= 3
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CapabilityCategory {
    Validation,
    Logic,
    Integration,
    Customization,
    Automation,
    Submission,
    Analytics,
    #[default]
    Other,
}

impl CapabilityCategory {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "validation" => CapabilityCategory::Validation,
            "logic" => CapabilityCategory::Logic,
            "integration" => CapabilityCategory::Integration,
            "customization" => CapabilityCategory::Customization,
            "automation" => CapabilityCategory::Automation,
            "submission" => CapabilityCategory::Submission,
            "analytics" => CapabilityCategory::Analytics,
            _ => CapabilityCategory::Other,
        }
    }
}

// Oracle-supplied categories are free text; anything unrecognized is Other
// rather than a deserialization failure.
impl<'de> Deserialize<'de> for CapabilityCategory {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(CapabilityCategory::parse(&s))
    }
}

/// The feature/concept a source document is judged to be about. Produced once
/// per run by the capability identifier and read-only afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Capability {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: CapabilityCategory,
    #[serde(default)]
    pub competitor_search_terms: Vec<String>,
    #[serde(default)]
    pub common_url_paths: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Competitor {
    pub name: String,
    pub base_url: String,
}

/// Oracle guess at where one competitor documents a capability. Transient:
/// only seeds the scraping stage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompetitorCapabilityGuess {
    #[serde(default)]
    pub competitor_name: String,
    #[serde(default)]
    pub likely_feature_name: String,
    #[serde(default)]
    pub probable_urls: Vec<String>,
    #[serde(default)]
    pub search_query: String,
    #[serde(default)]
    pub terminology_hints: Vec<String>,
}

/// One extracted page. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapedPage {
    pub url: String,
    pub title: String,
    pub headings: Vec<String>,
    pub body: String,
    /// Raw markup size, before extraction.
    pub bytes: usize,
}

/// Everything usable scraped from one competitor for one capability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompetitorContent {
    pub competitor_name: String,
    pub capability_name: String,
    /// What this competitor appears to call the capability.
    pub feature_name: String,
    pub urls_scraped: Vec<String>,
    pub body: String,
    pub headings: Vec<String>,
    pub terminology_hints: Vec<String>,
    pub pages_scraped: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleKeywordRef {
    pub text: String,
    pub search_volume: Option<u64>,
}

/// One competitor's equivalent for one article keyword.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappedTerm {
    pub text: String,
    pub competitor: String,
    pub search_volume: u64,
    pub cpc: f64,
    pub difficulty: Difficulty,
    /// 1–10, oracle-judged closeness to the article keyword.
    pub relevance: u8,
    pub found_in: FoundIn,
}

/// Per-article-keyword record of the competitor terms judged equivalent,
/// sorted by descending search volume.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordMapping {
    pub article_keyword: ArticleKeywordRef,
    pub competitor_terms: Vec<MappedTerm>,
}

/// Public result shape of a full analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub article_keywords: Vec<Keyword>,
    pub competitor_keywords: Vec<Keyword>,
    pub suggested_keywords: Vec<Keyword>,
    pub keyword_mappings: Vec<KeywordMapping>,
    pub capability: Capability,
    pub competitors_scraped: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleRequest {
    pub messages: Vec<ChatMessage>,
    pub temperature: f64,
    pub max_tokens: u64,
}

impl OracleRequest {
    pub fn new(system: &str, user: &str, temperature: f64, max_tokens: u64) -> Self {
        Self {
            messages: vec![ChatMessage::system(system), ChatMessage::user(user)],
            temperature,
            max_tokens,
        }
    }
}

/// The external text-generation service. It returns free text with no schema
/// guarantee; callers parse the text themselves and must handle malformed
/// output explicitly.
#[async_trait::async_trait]
pub trait Oracle: Send + Sync {
    async fn complete(&self, req: &OracleRequest) -> Result<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn excluded_terms_match_case_insensitively_as_substrings() {
        assert!(is_excluded_term("AEM"));
        assert!(is_excluded_term("adaptive FORMS tutorial"));
        assert!(is_excluded_term("  Adobe Experience Manager assets "));
        assert!(!is_excluded_term("form builder"));
        assert!(!is_excluded_term("spam protection"));
    }

    #[test]
    fn time_range_parses_and_names_its_volume_field() {
        assert_eq!("week".parse::<TimeRange>().unwrap(), TimeRange::Week);
        assert_eq!(" Month ".parse::<TimeRange>().unwrap(), TimeRange::Month);
        assert_eq!(
            "year".parse::<TimeRange>().unwrap().volume_field(),
            "yearly_volume"
        );
        assert!(matches!(
            "quarter".parse::<TimeRange>(),
            Err(Error::InvalidTimeRange(_))
        ));
    }

    #[test]
    fn capability_parses_sparse_objects_and_unknown_categories() {
        let v: Capability = serde_json::from_str(
            r#"{"name":"Form Validation","category":"compliance-weirdness"}"#,
        )
        .unwrap();
        assert_eq!(v.name, "Form Validation");
        assert_eq!(v.category, CapabilityCategory::Other);
        assert!(v.competitor_search_terms.is_empty());

        let v: Capability = serde_json::from_str(r#"{"category":"validation"}"#).unwrap();
        assert!(v.name.is_empty());
        assert_eq!(v.category, CapabilityCategory::Validation);
    }

    #[test]
    fn keyword_omits_empty_used_by_when_serialized() {
        let kw = Keyword {
            text: "form builder".to_string(),
            search_volume: Some(1200),
            cpc: 2.5,
            difficulty: Difficulty::Medium,
            origin: KeywordOrigin::Article,
            tool: "t".to_string(),
            lookup_url: "u".to_string(),
            used_by: Vec::new(),
        };
        let s = serde_json::to_string(&kw).unwrap();
        assert!(!s.contains("used_by"));
    }

    #[test]
    fn long_tail_is_three_words_or_more() {
        let mut kw = Keyword {
            text: "workflow automation".to_string(),
            search_volume: None,
            cpc: 0.0,
            difficulty: Difficulty::Low,
            origin: KeywordOrigin::Article,
            tool: String::new(),
            lookup_url: String::new(),
            used_by: Vec::new(),
        };
        assert!(!kw.is_long_tail());
        kw.text = "online form builder".to_string();
        assert!(kw.is_long_tail());
    }

    #[test]
    fn difficulty_and_found_in_parse_leniently() {
        assert_eq!(Difficulty::parse(" High "), Some(Difficulty::High));
        assert_eq!(Difficulty::parse("brutal"), None);
        assert_eq!(FoundIn::parse("heading"), Some(FoundIn::Heading));
        assert_eq!(FoundIn::parse("dream"), None);
    }
}
