//! The text-completion seam and its HTTP implementation.

use async_trait::async_trait;

use crate::error::CollaboratorError;

/// The language-model collaborator, reduced to the one call the
/// surrogate needs.
#[async_trait]
pub trait TextCompletion: Send + Sync {
    /// Requests a completion for `user` under `system`. Implementations
    /// return the raw text; callers do their own parsing.
    async fn complete(&self, system: &str, user: &str) -> Result<String, CollaboratorError>;
}

/// OpenAI-style chat-completions client.
pub struct HttpCompletion {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f64,
    max_tokens: u32,
}

impl HttpCompletion {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            temperature: 0.7,
            max_tokens: 200,
        }
    }

    pub fn temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

#[async_trait]
impl TextCompletion for HttpCompletion {
    async fn complete(&self, system: &str, user: &str) -> Result<String, CollaboratorError> {
        let url = format!(
            "{}/chat/completions",
            self.base_url.trim_end_matches('/')
        );
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user}
            ],
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
        });

        let resp = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| CollaboratorError::Request(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(CollaboratorError::Status(status.as_u16()));
        }
        let body = resp
            .text()
            .await
            .map_err(|e| CollaboratorError::Request(e.to_string()))?;

        let content = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| {
                v.get("choices")?
                    .as_array()?
                    .first()?
                    .get("message")?
                    .get("content")?
                    .as_str()
                    .map(|s| s.trim().to_string())
            })
            .ok_or_else(|| CollaboratorError::Unusable("no message content".into()))?;

        Ok(content)
    }
}
