use crate::extract::truncate_chars;
use crate::oracle::json_object;
use termpipe_core::{Capability, Error, Oracle, OracleRequest, Result, ScrapedPage};
use tracing::info;

const SYSTEM: &str = "You are a product analyst expert. Identify the core capability/feature \
from documentation. Return ONLY valid JSON.";

fn prompt(article: &ScrapedPage) -> String {
    let headings: Vec<&String> = article.headings.iter().take(15).collect();
    let headings = serde_json::to_string_pretty(&headings).unwrap_or_default();
    format!(
        "You are an expert at understanding technical documentation and product features.\n\n\
ARTICLE URL: {url}\n\
ARTICLE TITLE: {title}\n\n\
ARTICLE HEADINGS:\n{headings}\n\n\
ARTICLE CONTENT (first 3000 chars):\n{content}\n\n\
TASK: Analyze this article and identify:\n\
1. What is the MAIN CAPABILITY or FEATURE this article is about?\n\
2. What would this capability be called on competitor websites?\n\
3. What search terms would find equivalent help articles/documentation on competitor sites?\n\n\
Examples of capabilities:\n\
- \"Form Validation\" - configuring validation rules for form fields\n\
- \"Conditional Logic\" - showing/hiding fields based on conditions\n\
- \"PDF Generation\" - converting forms to PDF documents\n\
- \"Email Notifications\" - sending automated emails on form submission\n\
- \"Data Integration\" - connecting forms to external systems\n\
- \"Theme Customization\" - changing the visual appearance\n\
- \"Workflow Automation\" - automating processes after submission\n\n\
Return ONLY valid JSON:\n\
{{\n\
    \"capability\": {{\n\
        \"name\": \"Short capability name (2-4 words)\",\n\
        \"description\": \"One sentence description of what this capability does\",\n\
        \"category\": \"validation|logic|integration|customization|automation|submission|analytics|other\",\n\
        \"competitor_search_terms\": [\"term1\", \"term2\", \"term3\", \"term4\", \"term5\"],\n\
        \"common_url_paths\": [\"/help/validation\", \"/docs/form-validation\", \"/features/validation\"]\n\
    }}\n\
}}",
        url = article.url,
        title = article.title,
        content = truncate_chars(&article.body, 3_000),
    )
}

/// Ask the oracle which capability the article demonstrates. Everything
/// downstream keys off this value, so a response without a parseable,
/// non-empty name is a hard failure — there is no fallback.
pub async fn identify_capability(oracle: &dyn Oracle, article: &ScrapedPage) -> Result<Capability> {
    let raw = oracle
        .complete(&OracleRequest::new(SYSTEM, &prompt(article), 0.2, 1_000))
        .await?;

    let value = json_object(&raw)
        .map_err(|_| Error::Capability("oracle response held no JSON object".to_string()))?;
    let capability: Capability = value
        .get("capability")
        .cloned()
        .map(serde_json::from_value::<Capability>)
        .transpose()
        .map_err(|e| Error::Capability(e.to_string()))?
        .ok_or_else(|| Error::Capability("no capability object in oracle response".to_string()))?;

    if capability.name.trim().is_empty() {
        return Err(Error::Capability(
            "oracle returned an unnamed capability".to_string(),
        ));
    }

    info!(
        name = %capability.name,
        category = ?capability.category,
        search_terms = capability.competitor_search_terms.len(),
        "capability identified"
    );
    Ok(capability)
}
