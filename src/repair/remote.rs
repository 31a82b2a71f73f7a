use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{Punctuated, PunctuationRestorer, Translator, TARGET_LANGUAGE};
use crate::{HarvestError, Result};

/// Punctuation and casing restoration served over HTTP.
///
/// The service receives `{"text": ...}` and answers with either `{"text": ...}` or
/// `{"tokens": [...]}`.
pub struct HttpPunctuator {
    endpoint: String,
    client: Client,
}

#[derive(Serialize)]
struct PunctuateRequest<'a> {
    text: &'a str,
}

impl HttpPunctuator {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            endpoint: endpoint.into(),
            client,
        })
    }
}

#[async_trait]
impl PunctuationRestorer for HttpPunctuator {
    async fn restore(&self, text: &str) -> Result<Punctuated> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&PunctuateRequest { text })
            .send()
            .await
            .map_err(|e| HarvestError::PunctuationFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let message = format!("HTTP {}: {}", status, body);
            return Err(HarvestError::PunctuationFailed(message).into());
        }

        response
            .json::<Punctuated>()
            .await
            .map_err(|e| HarvestError::PunctuationFailed(e.to_string()).into())
    }
}

/// Translation through a LibreTranslate-compatible `/translate` endpoint
pub struct HttpTranslator {
    endpoint: String,
    api_key: Option<String>,
    client: Client,
}

#[derive(Serialize)]
struct TranslateRequest<'a> {
    q: &'a str,
    source: &'a str,
    target: &'a str,
    format: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    api_key: Option<&'a str>,
}

#[derive(Deserialize)]
struct TranslateResponse {
    #[serde(rename = "translatedText")]
    translated_text: String,
}

impl HttpTranslator {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            endpoint: endpoint.into(),
            api_key,
            client,
        })
    }
}

#[async_trait]
impl Translator for HttpTranslator {
    async fn translate(&self, text: &str) -> Result<String> {
        let request = TranslateRequest {
            q: text,
            source: "auto",
            target: TARGET_LANGUAGE,
            format: "text",
            api_key: self.api_key.as_deref(),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| HarvestError::TranslationFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let message = format!("HTTP {}: {}", status, body);
            return Err(HarvestError::TranslationFailed(message).into());
        }

        let translated: TranslateResponse = response
            .json()
            .await
            .map_err(|e| HarvestError::TranslationFailed(e.to_string()))?;

        Ok(translated.translated_text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translate_request_shape() {
        let request = TranslateRequest {
            q: "hola",
            source: "auto",
            target: TARGET_LANGUAGE,
            format: "text",
            api_key: None,
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            serde_json::json!({"q": "hola", "source": "auto", "target": "en", "format": "text"})
        );
    }

    #[test]
    fn test_translate_response_shape() {
        let body = r#"{"translatedText": "hello", "detectedLanguage": {"language": "es"}}"#;
        let response: TranslateResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.translated_text, "hello");
    }
}
