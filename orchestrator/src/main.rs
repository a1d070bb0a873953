use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::{Quota, RateLimiter};
use tracing::info;
use warp::Filter;

use research_orchestrator::agents::retriever::provider_from_config;
use research_orchestrator::agents::{OpenAiConfig, OpenAiModel, RetryPolicy, SourceFetcher};
use research_orchestrator::report::{GeneratorSettings, ReportGenerator};
use research_orchestrator::{api, config, error, metrics, middleware};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = config::Config::from_env()?;

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .json()
        .init();

    info!("Starting Deep Research report orchestrator");
    info!(
        model = %config.openai_model,
        search_provider = ?config.search_provider,
        max_refinement_passes = config.max_refinement_passes,
        "Configuration loaded"
    );

    let timeout = Duration::from_secs(config.http_timeout_secs);

    // Language model client
    let model = OpenAiModel::new(OpenAiConfig {
        api_key: config.openai_api_key.clone(),
        base_url: config.openai_base_url.clone(),
        model: config.openai_model.clone(),
        temperature: config.temperature,
        max_tokens: config.max_tokens,
        timeout,
    })?;

    // Search provider and fetcher
    let http = reqwest::Client::builder().timeout(timeout).build()?;
    let provider = provider_from_config(&config, http)?;
    let fetcher = SourceFetcher::new(
        provider,
        Duration::from_millis(config.search_delay_ms),
        RetryPolicy {
            max_retries: config.search_max_retries,
            ..RetryPolicy::default()
        },
    );
    info!("Search provider ready: {}", fetcher.provider_name());

    let generator = Arc::new(ReportGenerator::new(
        Arc::new(model),
        fetcher,
        GeneratorSettings {
            max_refinement_passes: config.max_refinement_passes,
            default_depth: config.research_depth,
        },
    ));

    let per_minute = NonZeroU32::new(config.reports_per_minute)
        .ok_or_else(|| anyhow::anyhow!("REPORTS_PER_MINUTE must be greater than zero"))?;
    let limiter = Arc::new(RateLimiter::direct(Quota::per_minute(per_minute)));

    // Build API routes
    let api_routes = api::routes(generator, limiter)
        .with(warp::log("api"))
        .with(middleware::cors());

    // Health check route
    let health = warp::path("health")
        .and(warp::get())
        .map(|| warp::reply::json(&serde_json::json!({"status": "healthy"})));

    // Metrics route
    let metrics = warp::path("metrics")
        .and(warp::get())
        .map(|| {
            let (buffer, content_type) = metrics::render();
            warp::reply::with_header(buffer, "Content-Type", content_type)
        });

    let routes = health
        .or(metrics)
        .or(api_routes)
        .recover(error::handle_rejection);

    // Start server
    let addr = ([0, 0, 0, 0], config.port);
    info!("Server listening on {}", addr.1);

    warp::serve(routes)
        .run(addr)
        .await;

    Ok(())
}
