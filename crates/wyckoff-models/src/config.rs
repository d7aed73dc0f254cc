use serde::{Deserialize, Serialize};

/// Top-level configuration for the analysis pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct WyckoffConfig {
    pub cache: CacheConfig,
    pub provider: ProviderConfig,
    pub engine: EngineConfig,
    pub retry: RetryConfig,
    pub orchestrator: OrchestratorConfig,
}

/// Configuration for the durable dataset cache.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    /// Path to the SQLite blob store.
    pub sqlite_path: String,
    /// Dataset time-to-live in hours. Entries older than this are purged on
    /// read and refetched.
    pub ttl_hours: u64,
    /// Maximum number of entries in the in-memory moka hot cache.
    pub memory_max_capacity: u64,
    /// TTL in seconds for the moka hot layer (how long a read stays hot).
    pub memory_ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            sqlite_path: "data/wyckoff_cache.db".to_string(),
            ttl_hours: 24,
            memory_max_capacity: 1_000,
            memory_ttl_seconds: 300,
        }
    }
}

/// Configuration for the upstream market-data provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProviderConfig {
    /// Base URL of the dataset endpoint; datasets are fetched from
    /// `{base_url}/{kind}/{code}`.
    pub base_url: String,
    pub timeout_seconds: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8030".to_string(),
            timeout_seconds: 30,
        }
    }
}

/// Configuration for the reasoning engine (OpenAI-compatible streaming API).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    pub base_url: String,
    pub model: String,
    /// Environment variable holding the API key; never stored in config.
    pub api_key_env: String,
    /// Per-call timeout in seconds. A timed-out call counts as one failed
    /// attempt against the engine retry policy.
    pub timeout_seconds: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.deepseek.com".to_string(),
            model: "deepseek-reasoner".to_string(),
            api_key_env: "DEEPSEEK_API_KEY".to_string(),
            timeout_seconds: 180,
        }
    }
}

/// Bounded-retry policies. Dataset fetches and engine calls retry under
/// separate policies.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetryConfig {
    pub fetch: RetryPolicyConfig,
    pub engine: RetryPolicyConfig,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            fetch: RetryPolicyConfig {
                max_attempts: 3,
                delay_ms: 1_000,
            },
            engine: RetryPolicyConfig {
                max_attempts: 5,
                delay_ms: 2_000,
            },
        }
    }
}

/// One bounded-retry policy: at most `max_attempts` invocations with a
/// fixed `delay_ms` between them (never after the last).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RetryPolicyConfig {
    pub max_attempts: u32,
    pub delay_ms: u64,
}

/// Configuration for the batch orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Overall deadline for one batch in seconds. Roles still running when
    /// it elapses are cancelled and replaced by fallback records.
    pub batch_deadline_seconds: u64,
    /// Directory where batch documents are written.
    pub output_dir: String,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            batch_deadline_seconds: 900,
            output_dir: ".".to_string(),
        }
    }
}
