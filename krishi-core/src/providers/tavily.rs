//! Tavily-style web search adapter.

use crate::capability::WebSearchProvider;
use crate::error::CapabilityError;
use crate::types::SearchHit;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

/// HTTP client for the Tavily search API (or any compatible endpoint).
pub struct TavilySearch {
    client: Client,
    base_url: String,
    api_key: String,
    timeout_secs: u64,
}

impl TavilySearch {
    pub fn new(
        base_url: &str,
        api_key: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self, CapabilityError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| CapabilityError::Connection {
                message: format!("failed to build HTTP client: {}", e),
            })?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            timeout_secs,
        })
    }
}

/// Extract hits from a Tavily response body. Results missing a content or
/// url field are skipped rather than failing the whole response.
fn parse_results(body: &Value) -> Result<Vec<SearchHit>, CapabilityError> {
    let results = body
        .get("results")
        .and_then(|r| r.as_array())
        .ok_or_else(|| CapabilityError::ResponseParse {
            message: "search response missing 'results' array".to_string(),
        })?;

    Ok(results
        .iter()
        .filter_map(|r| {
            let content = r.get("content")?.as_str()?.to_string();
            let url = r.get("url")?.as_str()?.to_string();
            Some(SearchHit { content, url })
        })
        .collect())
}

#[async_trait]
impl WebSearchProvider for TavilySearch {
    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SearchHit>, CapabilityError> {
        debug!(max_results, "Sending web search request");
        let response = self
            .client
            .post(format!("{}/search", self.base_url))
            .json(&json!({
                "api_key": self.api_key,
                "query": query,
                "max_results": max_results,
            }))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CapabilityError::Timeout {
                        timeout_secs: self.timeout_secs,
                    }
                } else {
                    CapabilityError::Connection {
                        message: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(CapabilityError::AuthFailed {
                capability: "web search".to_string(),
            });
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(CapabilityError::ApiRequest {
                message: format!("HTTP {}: {}", status, text.chars().take(200).collect::<String>()),
            });
        }

        let body: Value = response.json().await.map_err(|e| CapabilityError::ResponseParse {
            message: format!("invalid JSON body: {}", e),
        })?;
        parse_results(&body)
    }
}
