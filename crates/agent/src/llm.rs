use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::warn;

use shelfbot_core::config::{LlmConfig, LlmProvider};

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("generative backend timed out after {0:?}")]
    Timeout(Duration),
    #[error("generative backend request failed: {0}")]
    Transport(String),
    #[error("generative backend returned status {0}")]
    Status(u16),
    #[error("generative backend returned an unreadable response")]
    MalformedResponse,
    #[error("no generative backend is configured")]
    NotConfigured,
}

/// Prompt in, completion out. The only suspension point a chat request has
/// besides persistence.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError>;
}

/// Builds the client selected by `llm.provider`.
pub fn client_from_config(config: &LlmConfig) -> Arc<dyn LlmClient> {
    match (config.provider, config.api_key.as_ref()) {
        (LlmProvider::Gemini, Some(api_key)) => Arc::new(GeminiClient::new(
            config.base_url.clone(),
            config.model.clone(),
            api_key.clone(),
            Duration::from_secs(config.timeout_secs),
        )),
        _ => Arc::new(DisabledLlmClient),
    }
}

/// Always fails with `NotConfigured`, so every caller takes its fallback path.
#[derive(Clone, Copy, Debug, Default)]
pub struct DisabledLlmClient;

#[async_trait]
impl LlmClient for DisabledLlmClient {
    async fn complete(&self, _prompt: &str) -> Result<String, LlmError> {
        Err(LlmError::NotConfigured)
    }
}

pub struct GeminiClient {
    client: Client,
    base_url: String,
    model: String,
    api_key: SecretString,
    timeout: Duration,
}

impl GeminiClient {
    pub fn new(base_url: String, model: String, api_key: SecretString, timeout: Duration) -> Self {
        Self { client: Client::new(), base_url, model, api_key, timeout }
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url.trim_end_matches('/'), self.model)
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let body = json!({ "contents": [{ "parts": [{ "text": prompt }] }] });

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", self.api_key.expose_secret())
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|error| {
                warn!(event_name = "llm.request_failed", model = %self.model, error = %error);
                if error.is_timeout() {
                    LlmError::Timeout(self.timeout)
                } else {
                    LlmError::Transport(error.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(event_name = "llm.bad_status", model = %self.model, status = status.as_u16());
            return Err(LlmError::Status(status.as_u16()));
        }

        let raw = response.text().await.map_err(|error| LlmError::Transport(error.to_string()))?;
        completion_text(&raw).ok_or_else(|| {
            warn!(event_name = "llm.malformed_response", model = %self.model);
            LlmError::MalformedResponse
        })
    }
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    text: Option<String>,
}

/// Pulls `candidates[0].content.parts[0].text` out of a generateContent body,
/// falling back to a raw scan when the body does not deserialize.
pub fn completion_text(raw: &str) -> Option<String> {
    let structured = serde_json::from_str::<GenerateContentResponse>(raw).ok().and_then(|body| {
        body.candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content.parts.into_iter().next())
            .and_then(|part| part.text)
    });

    structured.or_else(|| scan_completion_text(raw)).filter(|text| !text.trim().is_empty())
}

fn scan_completion_text(raw: &str) -> Option<String> {
    let candidates_at = raw.find("\"candidates\"")?;
    let after_candidates = &raw[candidates_at..];
    let text_key_at = after_candidates.find("\"text\":")?;
    let after_key = &after_candidates[text_key_at + "\"text\":".len()..];
    let open_quote = after_key.find('"')?;

    let mut escaped = false;
    let mut body = String::new();
    for ch in after_key[open_quote + 1..].chars() {
        if escaped {
            body.push('\\');
            body.push(ch);
            escaped = false;
            continue;
        }
        match ch {
            '\\' => escaped = true,
            '"' => return Some(unescape(&body)),
            other => body.push(other),
        }
    }

    None
}

fn unescape(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;

    use shelfbot_core::config::{LlmConfig, LlmProvider};

    use super::{client_from_config, completion_text, LlmError};

    #[test]
    fn structured_body_yields_first_part() {
        let raw = r#"{"candidates":[{"content":{"parts":[{"text":"Soft cotton tee."},{"text":"ignored"}]}}]}"#;
        assert_eq!(completion_text(raw).as_deref(), Some("Soft cotton tee."));
    }

    #[test]
    fn truncated_body_falls_back_to_scan() {
        let raw = r#"{"candidates": [{"content": {"parts": [{"text": "Line one\nSays \"hi\" \\ done"}]"#;
        assert_eq!(completion_text(raw).as_deref(), Some("Line one\nSays \"hi\" \\ done"));
    }

    #[test]
    fn bodies_without_candidates_are_rejected() {
        assert_eq!(completion_text(r#"{"error":{"message":"quota"}}"#), None);
        assert_eq!(completion_text(r#"{"candidates":[]}"#), None);
        assert_eq!(completion_text("not json"), None);
    }

    #[test]
    fn empty_completion_is_rejected() {
        let raw = r#"{"candidates":[{"content":{"parts":[{"text":"   "}]}}]}"#;
        assert_eq!(completion_text(raw), None);
    }

    #[tokio::test]
    async fn gemini_without_key_degrades_to_disabled_client() {
        let config = LlmConfig {
            provider: LlmProvider::Gemini,
            api_key: None,
            base_url: "https://example.invalid".to_owned(),
            model: "gemini-1.5-flash".to_owned(),
            timeout_secs: 1,
        };

        let error = client_from_config(&config).complete("hi").await.expect_err("disabled");
        assert!(matches!(error, LlmError::NotConfigured));

        let configured = LlmConfig { api_key: Some(SecretString::from("key".to_owned())), ..config };
        // Only checks construction; no request is sent.
        let _client = client_from_config(&configured);
    }
}
