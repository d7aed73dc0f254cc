use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgentError {
    /// Primary dataset could not be obtained; role-fatal.
    #[error("primary dataset unavailable: {0}")]
    DataUnavailable(String),

    /// Transport or protocol failure talking to the reasoning engine.
    #[error("engine call failed: {0}")]
    Engine(String),

    /// The chunk stream ended without a finish signal. Retryable as a whole
    /// new call, never resumable mid-stream.
    #[error("engine reply stream ended without a finish signal")]
    StreamIncomplete,

    #[error("engine call timed out after {0} seconds")]
    Timeout(u64),

    /// The assembled reply did not validate as a record.
    #[error("reply parse error: {0}")]
    Parse(String),

    #[error("cache error: {0}")]
    Cache(#[from] wyckoff_cache::CacheError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AgentError {
    /// Stable category label used in fallback debug traces.
    pub fn category(&self) -> &'static str {
        match self {
            AgentError::DataUnavailable(_) => "data_unavailable",
            AgentError::Engine(_) => "engine",
            AgentError::StreamIncomplete => "stream_incomplete",
            AgentError::Timeout(_) => "timeout",
            AgentError::Parse(_) => "parse",
            AgentError::Cache(_) => "cache",
            AgentError::Json(_) => "json",
        }
    }
}
