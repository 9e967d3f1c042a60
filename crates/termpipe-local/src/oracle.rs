use serde::{Deserialize, Serialize};
use std::time::Duration;
use termpipe_core::{ChatMessage, Error, Oracle, OracleRequest, Result};

fn env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn preview(text: &str) -> String {
    let p: String = text.chars().take(120).collect();
    if p.len() < text.len() {
        format!("{p}…")
    } else {
        p
    }
}

/// Locate the one JSON object expected somewhere inside free oracle text:
/// the span from the first `{` to the last `}`.
///
/// Lenient to explanatory prose around the object, but brittle if the oracle
/// emits unrelated braces before or after it — that span then fails to parse
/// and the call is reported as malformed. Known limitation, kept as is.
pub fn json_object(text: &str) -> Result<serde_json::Value> {
    let start = text.find('{');
    let end = text.rfind('}');
    let (start, end) = match (start, end) {
        (Some(s), Some(e)) if e > s => (s, e),
        _ => return Err(Error::OracleParse(preview(text))),
    };
    serde_json::from_str(&text[start..=end]).map_err(|_| Error::OracleParse(preview(text)))
}

/// Chat-completions client for the remote text-generation service
/// (Azure-style deployment endpoint, `api-key` header).
#[derive(Debug, Clone)]
pub struct ChatOracle {
    client: reqwest::Client,
    endpoint: String,
    deployment: String,
    api_version: String,
    api_key: String,
}

impl ChatOracle {
    pub fn from_env() -> Result<Self> {
        let endpoint = env("TERMPIPE_ORACLE_ENDPOINT")
            .ok_or_else(|| Error::Oracle("missing TERMPIPE_ORACLE_ENDPOINT".to_string()))?;
        let deployment = env("TERMPIPE_ORACLE_DEPLOYMENT")
            .ok_or_else(|| Error::Oracle("missing TERMPIPE_ORACLE_DEPLOYMENT".to_string()))?;
        let api_version =
            env("TERMPIPE_ORACLE_API_VERSION").unwrap_or_else(|| "2024-02-01".to_string());
        let api_key = env("TERMPIPE_ORACLE_API_KEY")
            .ok_or_else(|| Error::Oracle("missing TERMPIPE_ORACLE_API_KEY".to_string()))?;
        Ok(Self::new(endpoint, deployment, api_version, api_key))
    }

    pub fn new(
        endpoint: String,
        deployment: String,
        api_version: String,
        api_key: String,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
            deployment,
            api_version,
            api_key,
        }
    }

    fn completions_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.endpoint.trim_end_matches('/'),
            self.deployment,
            self.api_version
        )
    }
}

#[async_trait::async_trait]
impl Oracle for ChatOracle {
    async fn complete(&self, req: &OracleRequest) -> Result<String> {
        let payload = CompletionsRequest {
            messages: req.messages.clone(),
            temperature: req.temperature,
            max_tokens: req.max_tokens,
        };

        let resp = self
            .client
            .post(self.completions_url())
            .timeout(Duration::from_secs(120))
            .header("api-key", &self.api_key)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|e| Error::Oracle(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Oracle(format!(
                "chat.completions HTTP {status}: {}",
                preview(&body)
            )));
        }

        let parsed: CompletionsResponse =
            resp.json().await.map_err(|e| Error::Oracle(e.to_string()))?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| Error::Oracle("empty choices in completion".to_string()))
    }
}

#[derive(Debug, Clone, Serialize)]
struct CompletionsRequest {
    messages: Vec<ChatMessage>,
    temperature: f64,
    max_tokens: u64,
}

#[derive(Debug, Clone, Deserialize)]
struct CompletionsResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Clone, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Clone, Deserialize)]
struct ChoiceMessage {
    content: String,
}
