//! Exa web search as a [`WebResearcher`].

use crate::controller::ResearchConfig;
use crate::error::{Error, Result};
use crate::steps::{Document, StepResult, WebResearchOutput, WebResearcher};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use tracing::debug;

const EXA_SEARCH_URL: &str = "https://api.exa.ai/search";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExaSearchRequest<'a> {
    query: &'a str,
    num_results: u32,
    #[serde(rename = "type")]
    search_type: &'a str,
    contents: ExaContents,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExaContents {
    text: ExaTextConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExaTextConfig {
    max_characters: u32,
}

#[derive(Deserialize)]
struct ExaSearchResponse {
    #[serde(default)]
    results: Vec<ExaResult>,
}

#[derive(Deserialize)]
struct ExaResult {
    #[serde(default)]
    title: Option<String>,
    url: String,
    #[serde(default)]
    text: Option<String>,
}

/// Web researcher that queries the Exa search API.
#[derive(Clone)]
pub struct ExaSearch {
    agent: ureq::Agent,
    api_key: String,
    num_results: u32,
    max_characters: u32,
}

impl ExaSearch {
    pub fn new(api_key: impl Into<String>) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(REQUEST_TIMEOUT))
            .build();
        Self {
            agent: ureq::Agent::new_with_config(config),
            api_key: api_key.into(),
            num_results: 3,
            max_characters: 2000,
        }
    }

    /// Build from the research config, reading the key from `EXA_API_KEY`.
    pub fn from_env(config: &ResearchConfig) -> Result<Self> {
        let api_key = env::var("EXA_API_KEY")
            .map_err(|_| Error::Config("EXA_API_KEY environment variable not set".to_string()))?;
        Ok(Self::new(api_key)
            .num_results(config.num_results)
            .max_characters(config.max_source_chars))
    }

    /// Number of results per query (clamped to 1-10).
    pub fn num_results(mut self, n: u32) -> Self {
        self.num_results = n.clamp(1, 10);
        self
    }

    /// Characters of page text kept per result.
    pub fn max_characters(mut self, n: u32) -> Self {
        self.max_characters = n;
        self
    }

    fn search(&self, query: &str) -> StepResult<ExaSearchResponse> {
        let request = ExaSearchRequest {
            query,
            num_results: self.num_results,
            search_type: "auto",
            contents: ExaContents {
                text: ExaTextConfig {
                    max_characters: self.max_characters,
                },
            },
        };

        let mut response = self
            .agent
            .post(EXA_SEARCH_URL)
            .header("x-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .send_json(&request)?;
        Ok(response.body_mut().read_json::<ExaSearchResponse>()?)
    }
}

/// Map Exa results to documents keyed by URL, in result order.
fn into_documents(response: ExaSearchResponse, max_characters: u32) -> Vec<Document> {
    response
        .results
        .into_iter()
        .filter(|r| !r.url.trim().is_empty())
        .map(|r| {
            let content: String = r
                .text
                .unwrap_or_default()
                .chars()
                .take(max_characters as usize)
                .collect();
            let doc = Document::new(r.url.clone(), r.url, content);
            match r.title.filter(|t| !t.trim().is_empty()) {
                Some(title) => doc.with_title(title),
                None => doc,
            }
        })
        .collect()
}

#[async_trait]
impl WebResearcher for ExaSearch {
    async fn research(&self, query: &str) -> StepResult<WebResearchOutput> {
        let client = self.clone();
        let owned = query.to_string();
        let response = tokio::task::spawn_blocking(move || client.search(&owned)).await??;

        let documents = into_documents(response, self.max_characters);
        debug!(query, results = documents.len(), "exa search complete");
        Ok(WebResearchOutput { documents })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let request = ExaSearchRequest {
            query: "rust",
            num_results: 3,
            search_type: "auto",
            contents: ExaContents {
                text: ExaTextConfig {
                    max_characters: 500,
                },
            },
        };
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["numResults"], 3);
        assert_eq!(json["type"], "auto");
        assert_eq!(json["contents"]["text"]["maxCharacters"], 500);
    }

    #[test]
    fn test_into_documents() {
        let response: ExaSearchResponse = serde_json::from_str(
            r#"{"results": [
                {"title": "Rust", "url": "https://rust-lang.org", "text": "A language empowering everyone"},
                {"title": "", "url": "https://docs.rs", "text": null},
                {"title": "No url", "url": "  "}
            ]}"#,
        )
        .unwrap();

        let docs = into_documents(response, 6);

        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].id, "https://rust-lang.org");
        assert_eq!(docs[0].origin, "https://rust-lang.org");
        assert_eq!(docs[0].title.as_deref(), Some("Rust"));
        assert_eq!(docs[0].content, "A lang");
        assert_eq!(docs[1].title, None);
        assert_eq!(docs[1].content, "");
    }

    #[test]
    fn test_missing_results_field() {
        let response: ExaSearchResponse = serde_json::from_str("{}").unwrap();
        assert!(into_documents(response, 100).is_empty());
    }

    #[test]
    fn test_num_results_clamped() {
        assert_eq!(ExaSearch::new("k").num_results(0).num_results, 1);
        assert_eq!(ExaSearch::new("k").num_results(50).num_results, 10);
    }
}
