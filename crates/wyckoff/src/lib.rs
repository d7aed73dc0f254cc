//! Multi-agent Wyckoff analysis for A-share subjects.
//!
//! Five specialist roles interrogate the same market datasets through a
//! streaming reasoning engine, a chief-strategist pass folds their records
//! into one consensus, and the whole batch is written out as JSON.
//!
//! # Library Usage
//!
//! ```rust,no_run
//! use wyckoff::models::{SubjectId, WyckoffConfig};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = WyckoffConfig::default();
//! let orchestrator = wyckoff::build_orchestrator(&config)?;
//! let subject: SubjectId = "300750".parse()?;
//! let batch = orchestrator.analyze(&subject).await;
//! # Ok(())
//! # }
//! ```

pub use wyckoff_agents as agents;
pub use wyckoff_cache as cache;
pub use wyckoff_models as models;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use wyckoff_agents::{
    AgentRunner, CachedFetcher, EngineAggregator, HttpDataProvider, HttpEngine, JsonFileSink,
    Orchestrator, ReasoningEngine, RetryPolicy,
};
use wyckoff_cache::{CacheStore, SqliteStore};
use wyckoff_models::{Role, WyckoffConfig};

/// Build an `Orchestrator` from configuration.
///
/// The engine API key is read from the environment variable named in the
/// config, never from the config file itself.
pub fn build_orchestrator(config: &WyckoffConfig) -> Result<Orchestrator, anyhow::Error> {
    if let Some(parent) = Path::new(&config.cache.sqlite_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }
    let sqlite = SqliteStore::open(&config.cache.sqlite_path)
        .with_context(|| format!("Failed to open cache at {}", config.cache.sqlite_path))?;
    let cache = Arc::new(CacheStore::new(
        sqlite,
        config.cache.memory_max_capacity,
        Duration::from_secs(config.cache.memory_ttl_seconds),
    ));

    let provider = Arc::new(
        HttpDataProvider::new(
            &config.provider.base_url,
            Duration::from_secs(config.provider.timeout_seconds),
        )
        .map_err(|e| anyhow::anyhow!("Failed to build data provider: {e}"))?,
    );
    let fetcher = Arc::new(CachedFetcher::new(
        cache,
        provider,
        Duration::from_secs(config.cache.ttl_hours * 3600),
        RetryPolicy::from_config(&config.retry.fetch),
    ));

    let api_key = std::env::var(&config.engine.api_key_env)
        .with_context(|| format!("Missing API key env var {}", config.engine.api_key_env))?;
    let engine: Arc<dyn ReasoningEngine> = Arc::new(
        HttpEngine::new(
            &config.engine.base_url,
            &config.engine.model,
            api_key,
            Duration::from_secs(config.engine.timeout_seconds),
        )
        .map_err(|e| anyhow::anyhow!("Failed to build engine: {e}"))?,
    );
    let engine_retry = RetryPolicy::from_config(&config.retry.engine)
        .with_attempt_timeout(Duration::from_secs(config.engine.timeout_seconds));

    let runners = Role::ALL
        .iter()
        .map(|role| {
            Arc::new(AgentRunner::new(
                *role,
                Arc::clone(&fetcher),
                Arc::clone(&engine),
                engine_retry,
            ))
        })
        .collect();

    let aggregator = Arc::new(EngineAggregator::new(Arc::clone(&engine), engine_retry));
    let sink = Arc::new(JsonFileSink::new(&config.orchestrator.output_dir));

    Ok(Orchestrator::new(
        runners,
        aggregator,
        Some(sink),
        Duration::from_secs(config.orchestrator.batch_deadline_seconds),
    ))
}
