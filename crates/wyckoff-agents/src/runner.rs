use std::sync::Arc;

use tracing::{info, warn};
use wyckoff_models::{AgentRecord, DatasetKind, Role, SubjectId};

use crate::engine::{complete, EngineRequest, ReasoningEngine};
use crate::error::AgentError;
use crate::parser::parse_agent_record;
use crate::prompts::{role_user_prompt, system_prompt};
use crate::provider::CachedFetcher;
use crate::retry::{AttemptError, RetryExecutor, RetryPolicy};

/// Runs one role's full pipeline: datasets → prompt → engine → record.
///
/// `run` never fails; any error along the way is folded into a fallback
/// record so the batch always carries five entries.
pub struct AgentRunner {
    role: Role,
    fetcher: Arc<CachedFetcher>,
    engine: Arc<dyn ReasoningEngine>,
    engine_retry: RetryPolicy,
}

impl AgentRunner {
    pub fn new(
        role: Role,
        fetcher: Arc<CachedFetcher>,
        engine: Arc<dyn ReasoningEngine>,
        engine_retry: RetryPolicy,
    ) -> Self {
        Self {
            role,
            fetcher,
            engine,
            engine_retry,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub async fn run(&self, subject: &SubjectId) -> AgentRecord {
        match self.try_run(subject).await {
            Ok(record) => {
                info!(
                    role = self.role.name(),
                    subject = %subject,
                    signal = ?record.signal,
                    confidence = record.confidence,
                    "Role completed"
                );
                record
            }
            Err(e) => {
                warn!(
                    role = self.role.name(),
                    subject = %subject,
                    error = %e,
                    "Role failed, substituting fallback record"
                );
                AgentRecord::fallback(
                    self.role,
                    format!("analysis unavailable: {e}"),
                    vec![
                        format!("category: {}", e.category()),
                        format!("error: {e}"),
                    ],
                )
            }
        }
    }

    async fn try_run(&self, subject: &SubjectId) -> Result<AgentRecord, AgentError> {
        let code = subject.as_str();

        // Daily bars are the one dataset no role can reason without.
        let daily_bars = self
            .fetcher
            .get_or_fetch(code, DatasetKind::DailyBars)
            .await?;

        let fund_flow = self.auxiliary(code, DatasetKind::FundFlow).await;
        let stock_info = self.auxiliary(code, DatasetKind::StockInfo).await;
        let benchmark_bars = self
            .auxiliary(subject.benchmark_index().code(), DatasetKind::DailyBars)
            .await;

        let request = EngineRequest::new(
            system_prompt(self.role),
            role_user_prompt(
                code,
                &daily_bars,
                fund_flow.as_deref(),
                stock_info.as_deref(),
                benchmark_bars.as_deref(),
            ),
        );

        let executor = RetryExecutor::new(self.engine_retry);
        let reply = executor
            .run(self.role.name(), |_| complete(&self.engine, &request))
            .await
            .map_err(|e| match e.last_error {
                AttemptError::Op(inner) => inner,
                AttemptError::TimedOut(d) => AgentError::Timeout(d.as_secs()),
            })?;

        parse_agent_record(self.role, &reply)
    }

    /// Auxiliary datasets degrade to absence instead of failing the role.
    async fn auxiliary(&self, code: &str, kind: DatasetKind) -> Option<String> {
        match self.fetcher.get_or_fetch(code, kind).await {
            Ok(payload) => Some(payload),
            Err(e) => {
                warn!(
                    role = self.role.name(),
                    dataset = kind.as_str(),
                    code,
                    error = %e,
                    "Auxiliary dataset unavailable, proceeding without it"
                );
                None
            }
        }
    }
}
