pub mod engine;
pub mod error;
pub mod orchestrator;
pub mod parser;
pub mod prompts;
pub mod provider;
pub mod retry;
pub mod runner;
pub mod sink;
pub mod stream;

pub mod test_support;

pub use engine::{complete, EngineRequest, HttpEngine, ReasoningEngine};
pub use error::AgentError;
pub use orchestrator::{Aggregator, EngineAggregator, Orchestrator};
pub use provider::{CachedFetcher, DataProvider, HttpDataProvider, ProviderError};
pub use retry::{AttemptError, RetryError, RetryExecutor, RetryPolicy};
pub use runner::AgentRunner;
pub use sink::{BatchSink, JsonFileSink, SinkError};
pub use stream::{SseDecoder, StreamAssembler, StreamChunk};
