use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use wyckoff_models::{AgentRecord, AnalysisBatch, Consensus, SubjectId};

use crate::engine::{complete, EngineRequest, ReasoningEngine};
use crate::error::AgentError;
use crate::parser::parse_consensus;
use crate::prompts::chief_strategist_prompt;
use crate::retry::{AttemptError, RetryExecutor, RetryPolicy};
use crate::runner::AgentRunner;
use crate::sink::BatchSink;

/// Fan-in pass over the five role records.
#[async_trait]
pub trait Aggregator: Send + Sync {
    async fn aggregate(&self, records: &[AgentRecord]) -> Result<Consensus, AgentError>;
}

/// Consensus via a reasoning-engine call over the serialized records.
pub struct EngineAggregator {
    engine: Arc<dyn ReasoningEngine>,
    retry: RetryPolicy,
}

impl EngineAggregator {
    pub fn new(engine: Arc<dyn ReasoningEngine>, retry: RetryPolicy) -> Self {
        Self { engine, retry }
    }
}

#[async_trait]
impl Aggregator for EngineAggregator {
    async fn aggregate(&self, records: &[AgentRecord]) -> Result<Consensus, AgentError> {
        let request = EngineRequest::new(
            chief_strategist_prompt(),
            serde_json::to_string_pretty(records)?,
        );

        let executor = RetryExecutor::new(self.retry);
        let reply = executor
            .run("chief_strategist", |_| complete(&self.engine, &request))
            .await
            .map_err(|e| match e.last_error {
                AttemptError::Op(inner) => inner,
                AttemptError::TimedOut(d) => AgentError::Timeout(d.as_secs()),
            })?;

        parse_consensus(&reply)
    }
}

/// Fans one subject out to the five role runners, folds their records back
/// into a consensus, and hands the batch to the sink.
///
/// Failure never escapes: a runner that misses the batch deadline or panics
/// contributes a fallback record, a failed aggregation yields an inert
/// consensus, and a failed sink write is logged and dropped.
pub struct Orchestrator {
    runners: Vec<Arc<AgentRunner>>,
    aggregator: Arc<dyn Aggregator>,
    sink: Option<Arc<dyn BatchSink>>,
    batch_deadline: Duration,
}

impl Orchestrator {
    pub fn new(
        runners: Vec<Arc<AgentRunner>>,
        aggregator: Arc<dyn Aggregator>,
        sink: Option<Arc<dyn BatchSink>>,
        batch_deadline: Duration,
    ) -> Self {
        Self {
            runners,
            aggregator,
            sink,
            batch_deadline,
        }
    }

    pub async fn analyze(&self, subject: &SubjectId) -> AnalysisBatch {
        info!(subject = %subject, roles = self.runners.len(), "Starting analysis batch");
        let deadline = tokio::time::Instant::now() + self.batch_deadline;

        let handles: Vec<(_, JoinHandle<AgentRecord>)> = self
            .runners
            .iter()
            .map(|runner| {
                let runner = Arc::clone(runner);
                let subject = subject.clone();
                let role = runner.role();
                (
                    role,
                    tokio::spawn(async move { runner.run(&subject).await }),
                )
            })
            .collect();

        let mut records = Vec::with_capacity(handles.len());
        for (role, mut handle) in handles {
            let record = match tokio::time::timeout_at(deadline, &mut handle).await {
                Ok(Ok(record)) => record,
                Ok(Err(e)) => {
                    warn!(role = role.name(), error = %e, "Role task panicked");
                    AgentRecord::fallback(
                        role,
                        "analysis unavailable: role task panicked",
                        vec!["category: panic".to_string()],
                    )
                }
                Err(_) => {
                    warn!(
                        role = role.name(),
                        deadline_secs = self.batch_deadline.as_secs(),
                        "Role missed the batch deadline"
                    );
                    handle.abort();
                    AgentRecord::fallback(
                        role,
                        "analysis unavailable: batch deadline exceeded",
                        vec!["category: deadline".to_string()],
                    )
                }
            };
            records.push(record);
        }

        let consensus = match self.aggregator.aggregate(&records).await {
            Ok(consensus) => consensus,
            Err(e) => {
                warn!(subject = %subject, error = %e, "Aggregation failed, using inert consensus");
                Consensus::default()
            }
        };

        let batch = AnalysisBatch::new(subject.clone(), records, consensus);

        if let Some(sink) = &self.sink {
            if let Err(e) = sink.persist(&batch).await {
                warn!(batch_id = %batch.id, error = %e, "Batch persistence failed");
            }
        }

        info!(
            subject = %subject,
            batch_id = %batch.id,
            signal = ?batch.consensus.signal,
            confidence = batch.consensus.confidence,
            "Analysis batch complete"
        );
        batch
    }
}
