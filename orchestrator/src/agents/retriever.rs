// Retriever Agent: web search providers and the rate-delayed source fetcher

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use backoff::ExponentialBackoffBuilder;
use serde::Deserialize;
use tracing::{info, warn};

use crate::config::{Config, SearchProviderKind};
use crate::metrics;
use crate::models::SourceRecord;

const BRAVE_ENDPOINT: &str = "https://api.search.brave.com/res/v1/web/search";
const SERPER_ENDPOINT: &str = "https://google.serper.dev/search";
const GOOGLE_ENDPOINT: &str = "https://www.googleapis.com/customsearch/v1";

#[async_trait]
pub trait SearchProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn search(&self, query: &str, count: usize) -> Result<Vec<SourceRecord>>;
}

pub fn provider_from_config(config: &Config, client: reqwest::Client) -> Result<Arc<dyn SearchProvider>> {
    let missing = |var: &str| anyhow::anyhow!("{} is not configured", var);
    let provider: Arc<dyn SearchProvider> = match config.search_provider {
        SearchProviderKind::Brave => Arc::new(BraveSearch::new(
            client,
            config.brave_api_key.clone().ok_or_else(|| missing("BRAVE_API_KEY"))?,
        )),
        SearchProviderKind::Serper => Arc::new(SerperSearch::new(
            client,
            config.serper_api_key.clone().ok_or_else(|| missing("SERPER_API_KEY"))?,
        )),
        SearchProviderKind::Google => Arc::new(GoogleSearch::new(
            client,
            config.google_api_key.clone().ok_or_else(|| missing("GOOGLE_API_KEY"))?,
            config.google_cse_id.clone().ok_or_else(|| missing("GOOGLE_CSE_ID"))?,
        )),
    };
    Ok(provider)
}

async fn read_json<T: for<'de> Deserialize<'de>>(resp: reqwest::Response, provider: &str) -> Result<T> {
    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        bail!("{} API error {}: {}", provider, status, body);
    }
    resp.json()
        .await
        .with_context(|| format!("Failed to parse {} response", provider))
}

pub struct BraveSearch {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
}

impl BraveSearch {
    pub fn new(client: reqwest::Client, api_key: String) -> Self {
        Self {
            client,
            api_key,
            endpoint: BRAVE_ENDPOINT.to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct BraveResponse {
    #[serde(default)]
    web: BraveWeb,
}

#[derive(Debug, Default, Deserialize)]
struct BraveWeb {
    #[serde(default)]
    results: Vec<BraveResult>,
}

#[derive(Debug, Deserialize)]
struct BraveResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    description: String,
}

#[async_trait]
impl SearchProvider for BraveSearch {
    fn name(&self) -> &'static str {
        "brave"
    }

    async fn search(&self, query: &str, count: usize) -> Result<Vec<SourceRecord>> {
        let resp = self
            .client
            .get(&self.endpoint)
            .query(&[("q", query), ("count", &count.to_string())])
            .header("Accept", "application/json")
            .header("X-Subscription-Token", &self.api_key)
            .send()
            .await
            .context("Brave Search request failed")?;

        let data: BraveResponse = read_json(resp, "Brave Search").await?;
        Ok(data
            .web
            .results
            .into_iter()
            .map(|r| SourceRecord::new(r.title, r.url, r.description))
            .collect())
    }
}

pub struct SerperSearch {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
}

impl SerperSearch {
    pub fn new(client: reqwest::Client, api_key: String) -> Self {
        Self {
            client,
            api_key,
            endpoint: SERPER_ENDPOINT.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SerperResponse {
    #[serde(default)]
    organic: Vec<LinkResult>,
}

/// Result shape shared by Serper and Google Custom Search.
#[derive(Debug, Deserialize)]
struct LinkResult {
    #[serde(default)]
    link: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    snippet: String,
}

impl From<LinkResult> for SourceRecord {
    fn from(r: LinkResult) -> Self {
        SourceRecord::new(r.title, r.link, r.snippet)
    }
}

#[async_trait]
impl SearchProvider for SerperSearch {
    fn name(&self) -> &'static str {
        "serper"
    }

    async fn search(&self, query: &str, count: usize) -> Result<Vec<SourceRecord>> {
        let body = serde_json::json!({
            "q": query,
            "num": count,
        });

        let resp = self
            .client
            .post(&self.endpoint)
            .header("X-API-KEY", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .context("Serper API request failed")?;

        let data: SerperResponse = read_json(resp, "Serper").await?;
        Ok(data.organic.into_iter().map(SourceRecord::from).collect())
    }
}

pub struct GoogleSearch {
    client: reqwest::Client,
    api_key: String,
    engine_id: String,
    endpoint: String,
}

impl GoogleSearch {
    pub fn new(client: reqwest::Client, api_key: String, engine_id: String) -> Self {
        Self {
            client,
            api_key,
            engine_id,
            endpoint: GOOGLE_ENDPOINT.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct GoogleResponse {
    #[serde(default)]
    items: Vec<LinkResult>,
}

#[async_trait]
impl SearchProvider for GoogleSearch {
    fn name(&self) -> &'static str {
        "google"
    }

    async fn search(&self, query: &str, count: usize) -> Result<Vec<SourceRecord>> {
        // Custom Search caps `num` at 10.
        let num = count.clamp(1, 10).to_string();
        let resp = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("key", self.api_key.as_str()),
                ("cx", self.engine_id.as_str()),
                ("q", query),
                ("num", num.as_str()),
            ])
            .send()
            .await
            .context("Google Custom Search request failed")?;

        let data: GoogleResponse = read_json(resp, "Google Custom Search").await?;
        Ok(data.items.into_iter().map(SourceRecord::from).collect())
    }
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_interval: Duration,
    pub max_interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_interval: Duration::from_secs(2),
            max_interval: Duration::from_secs(10),
        }
    }
}

/// Runs one query against the provider and never fails: provider errors
/// (after retries) come back as an empty list.
pub struct SourceFetcher {
    provider: Arc<dyn SearchProvider>,
    delay: Duration,
    retry: RetryPolicy,
}

impl SourceFetcher {
    pub fn new(provider: Arc<dyn SearchProvider>, delay: Duration, retry: RetryPolicy) -> Self {
        Self {
            provider,
            delay,
            retry,
        }
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    pub async fn fetch(&self, query: &str, count: usize) -> Vec<SourceRecord> {
        info!(provider = self.provider.name(), query, count, "Searching");

        let policy = ExponentialBackoffBuilder::new()
            .with_initial_interval(self.retry.initial_interval)
            .with_max_interval(self.retry.max_interval)
            .with_max_elapsed_time(None)
            .build();

        let mut attempt = 0u32;
        let outcome = backoff::future::retry(policy, || {
            attempt += 1;
            let attempt = attempt;
            let provider = Arc::clone(&self.provider);
            let max_retries = self.retry.max_retries;
            async move {
                provider.search(query, count).await.map_err(|e| {
                    if attempt > max_retries {
                        backoff::Error::permanent(e)
                    } else {
                        warn!(attempt, "Search attempt failed, retrying: {:#}", e);
                        backoff::Error::transient(e)
                    }
                })
            }
        })
        .await;

        let results = match outcome {
            Ok(records) => {
                let records: Vec<SourceRecord> = records
                    .into_iter()
                    .filter(|r| !r.url.trim().is_empty())
                    .take(count)
                    .collect();
                let label = if records.is_empty() { "empty" } else { "ok" };
                metrics::SEARCH_CALLS
                    .with_label_values(&[self.provider.name(), label])
                    .inc();
                info!(query, results = records.len(), "Search complete");
                records
            }
            Err(e) => {
                metrics::SEARCH_CALLS
                    .with_label_values(&[self.provider.name(), "error"])
                    .inc();
                warn!(query, "Search failed, continuing without sources: {:#}", e);
                Vec::new()
            }
        };

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        results
    }
}
