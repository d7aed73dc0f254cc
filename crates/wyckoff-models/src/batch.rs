use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::record::{AgentRecord, Role, Signal};
use crate::subject::SubjectId;

/// Aggregated opinion produced by the chief-strategist pass over all five
/// role records. Shaped like a summary record rather than a sixth role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Consensus {
    pub signal: Signal,
    /// How aligned the five roles were (e.g. "strong", "divided").
    pub strength: String,
    pub stop_loss: Option<String>,
    pub target_price: Option<String>,
    /// Suggested position sizing, free-form (e.g. "30%").
    pub position: Option<String>,
    /// 0-100.
    pub confidence: u8,
    pub reason: String,
}

impl Default for Consensus {
    /// Substituted when aggregation fails; per-role records are still
    /// returned, so this is deliberately inert rather than mid-confidence.
    fn default() -> Self {
        Self {
            signal: Signal::Neutral,
            strength: "unavailable".to_string(),
            stop_loss: None,
            target_price: None,
            position: None,
            confidence: 0,
            reason: "consensus aggregation unavailable".to_string(),
        }
    }
}

/// The complete result of one analysis request: exactly one record per role
/// in `Role::ALL` order, plus the consensus. Immutable once returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisBatch {
    pub id: Uuid,
    pub subject: SubjectId,
    pub generated_at: DateTime<Utc>,
    pub records: Vec<AgentRecord>,
    pub consensus: Consensus,
}

impl AnalysisBatch {
    pub fn new(subject: SubjectId, records: Vec<AgentRecord>, consensus: Consensus) -> Self {
        debug_assert_eq!(records.len(), Role::ALL.len());
        Self {
            id: Uuid::new_v4(),
            subject,
            generated_at: Utc::now(),
            records,
            consensus,
        }
    }

    pub fn record_for(&self, role: Role) -> Option<&AgentRecord> {
        self.records.iter().find(|r| r.role == role)
    }
}
