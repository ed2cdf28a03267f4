use crate::config::SearchConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub snippet: String,
    pub source: String,
}

/// Ranked web lookup, best result first.
#[async_trait]
pub trait WebSearch: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>>;
}

/// Brave Search web endpoint.
#[derive(Clone)]
pub struct BraveSearch {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    max_results: usize,
}

#[derive(Deserialize)]
struct BraveResponse {
    #[serde(default)]
    web: Option<BraveWeb>,
}

#[derive(Deserialize)]
struct BraveWeb {
    #[serde(default)]
    results: Vec<BraveHit>,
}

#[derive(Deserialize)]
struct BraveHit {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    description: String,
}

impl BraveSearch {
    pub fn new(config: &SearchConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            max_results: config.max_results,
        }
    }
}

#[async_trait]
impl WebSearch for BraveSearch {
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>> {
        tracing::info!(query, "searching the web");

        let count = self.max_results.to_string();
        let response = self
            .http
            .get(&self.endpoint)
            .header("Accept", "application/json")
            .header("X-Subscription-Token", &self.api_key)
            .query(&[("q", query), ("count", count.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::SearchFailed(format!("HTTP {status} for query {query:?}")));
        }

        let body: BraveResponse = response.json().await?;
        let results: Vec<SearchResult> = body
            .web
            .map(|web| web.results)
            .unwrap_or_default()
            .into_iter()
            .take(self.max_results)
            .map(|hit| SearchResult {
                title: hit.title,
                snippet: hit.description,
                source: hit.url,
            })
            .collect();

        tracing::debug!(query, hits = results.len(), "search finished");
        Ok(results)
    }
}
