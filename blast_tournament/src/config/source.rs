//! Where dynamic configuration documents come from.

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde::Deserialize;
use std::time::Duration;

use super::{
    DynamicConfig,
    errors::{ConfigError, ConfigResult},
};

/// Outbound timeout for configuration fetches
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Produces configuration documents
#[async_trait]
pub trait ConfigSource: Send + Sync {
    async fn fetch(&self) -> ConfigResult<DynamicConfig>;
}

/// Fixed document
#[derive(Debug, Clone, Default)]
pub struct StaticConfigSource {
    config: DynamicConfig,
}

impl StaticConfigSource {
    pub fn new(config: DynamicConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ConfigSource for StaticConfigSource {
    async fn fetch(&self) -> ConfigResult<DynamicConfig> {
        Ok(self.config.clone())
    }
}

/// Repository-contents API response
#[derive(Debug, Deserialize)]
struct ContentsEnvelope {
    content: String,
}

/// Fetches the document over HTTP(S)
pub struct HttpConfigSource {
    client: reqwest::Client,
    url: String,
    token: Option<String>,
}

impl HttpConfigSource {
    pub fn new(url: impl Into<String>, token: Option<String>) -> ConfigResult<Self> {
        let client = reqwest::Client::builder().timeout(FETCH_TIMEOUT).build()?;
        Ok(Self {
            client,
            url: url.into(),
            token,
        })
    }
}

#[async_trait]
impl ConfigSource for HttpConfigSource {
    async fn fetch(&self) -> ConfigResult<DynamicConfig> {
        let mut request = self
            .client
            .get(&self.url)
            .header(ACCEPT, "application/vnd.github+json");
        if let Some(token) = &self.token {
            request = request.header(AUTHORIZATION, format!("Bearer {token}"));
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ConfigError::Status(status.as_u16()));
        }

        let body = response.bytes().await?;
        decode_document(&body)
    }
}

/// Accept either the raw document or a `{"content": "<base64>"}` envelope
pub fn decode_document(body: &[u8]) -> ConfigResult<DynamicConfig> {
    if let Ok(envelope) = serde_json::from_slice::<ContentsEnvelope>(body) {
        // The contents API wraps base64 at 60 columns.
        let compact: String = envelope
            .content
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        let raw = general_purpose::STANDARD.decode(compact)?;
        return Ok(serde_json::from_slice(&raw)?);
    }

    Ok(serde_json::from_slice(body)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_raw_document() {
        let config = decode_document(br#"{"coinPerLevel": 42}"#).unwrap();
        assert_eq!(config.coin_per_level, 42);
    }

    #[test]
    fn test_decode_contents_envelope() {
        let encoded = general_purpose::STANDARD.encode(br#"{"tournamentCutoffHour": 21}"#);
        let (head, tail) = encoded.split_at(10);
        let body = format!(r#"{{"content": "{head}\n{tail}", "encoding": "base64"}}"#);

        let config = decode_document(body.as_bytes()).unwrap();
        assert_eq!(config.tournament_cutoff_hour, 21);
    }

    #[test]
    fn test_decode_rejects_bad_base64() {
        let err = decode_document(br#"{"content": "***"}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Envelope(_)));
    }

    #[tokio::test]
    async fn test_static_source_returns_document() {
        let source = StaticConfigSource::new(DynamicConfig {
            reward1: 1,
            ..DynamicConfig::default()
        });
        assert_eq!(source.fetch().await.unwrap().reward1, 1);
    }
}
