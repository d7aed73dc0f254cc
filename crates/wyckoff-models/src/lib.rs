pub mod batch;
pub mod config;
pub mod dataset;
pub mod record;
pub mod subject;

pub use batch::{AnalysisBatch, Consensus};
pub use config::{
    CacheConfig, EngineConfig, OrchestratorConfig, ProviderConfig, RetryConfig, RetryPolicyConfig,
    WyckoffConfig,
};
pub use dataset::DatasetKind;
pub use record::{AgentRecord, Role, Signal, FALLBACK_CONFIDENCE};
pub use subject::{BenchmarkIndex, SubjectId, SubjectIdError};
