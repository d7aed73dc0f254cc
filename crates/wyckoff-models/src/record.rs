use serde::{Deserialize, Serialize};

/// Confidence assigned to fallback records so callers can spot degraded
/// output without a separate error branch.
pub const FALLBACK_CONFIDENCE: u8 = 50;

/// The five analytical passes, in the fixed order they appear in every
/// batch. Each role reads the same datasets but interrogates them from a
/// different Wyckoff perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    PhaseHunter,
    VolumeDetective,
    SpringHunter,
    TargetEngineer,
    StrengthCommander,
}

impl Role {
    /// Declared batch order. Records in an `AnalysisBatch` always follow it.
    pub const ALL: [Role; 5] = [
        Role::PhaseHunter,
        Role::VolumeDetective,
        Role::SpringHunter,
        Role::TargetEngineer,
        Role::StrengthCommander,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Role::PhaseHunter => "phase_hunter",
            Role::VolumeDetective => "volume_detective",
            Role::SpringHunter => "spring_hunter",
            Role::TargetEngineer => "target_engineer",
            Role::StrengthCommander => "strength_commander",
        }
    }
}

/// Directional opinion carried by a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    Bullish,
    Bearish,
    #[default]
    Neutral,
    /// Stand aside entirely (stronger than neutral).
    Avoid,
}

impl Signal {
    /// Lenient mapping from engine reply labels. The engine answers in
    /// market shorthand, sometimes qualified ("bullish (short-term)"), and
    /// sometimes in the original Chinese labels. Unknown labels are neutral.
    pub fn from_label(label: &str) -> Self {
        let l = label.trim().to_lowercase();
        if l.starts_with("bullish") || l.starts_with("看涨") {
            Signal::Bullish
        } else if l.starts_with("bearish") || l.starts_with("看跌") {
            Signal::Bearish
        } else if l.starts_with("avoid") || l.starts_with("空仓") {
            Signal::Avoid
        } else {
            Signal::Neutral
        }
    }
}

/// One role's structured opinion. The field set is identical whether the
/// role succeeded or fell back; fallbacks are distinguished only by the
/// default signal, `FALLBACK_CONFIDENCE`, and an explicit failure reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRecord {
    pub role: Role,
    pub signal: Signal,
    /// 0-100.
    pub confidence: u8,
    /// Role-specific structured fields (key structures, stop levels, ...)
    /// taken from the engine reply. Empty object for fallbacks.
    pub details: serde_json::Value,
    pub reason: String,
    /// Ordered reasoning/diagnostic trace.
    pub debug_trace: Vec<String>,
}

impl AgentRecord {
    /// Fixed-shape record substituted when a role's pipeline fails at any
    /// stage, so one role's failure never aborts the batch.
    pub fn fallback(role: Role, reason: impl Into<String>, debug_trace: Vec<String>) -> Self {
        Self {
            role,
            signal: Signal::Neutral,
            confidence: FALLBACK_CONFIDENCE,
            details: serde_json::json!({}),
            reason: reason.into(),
            debug_trace,
        }
    }

    pub fn is_fallback_shaped(&self) -> bool {
        self.signal == Signal::Neutral
            && self.confidence == FALLBACK_CONFIDENCE
            && self.details == serde_json::json!({})
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_order_is_stable() {
        assert_eq!(Role::ALL.len(), 5);
        assert_eq!(Role::ALL[0], Role::PhaseHunter);
        assert_eq!(Role::ALL[4], Role::StrengthCommander);
    }

    #[test]
    fn role_names() {
        assert_eq!(Role::PhaseHunter.name(), "phase_hunter");
        assert_eq!(Role::VolumeDetective.name(), "volume_detective");
    }

    #[test]
    fn signal_from_label() {
        assert_eq!(Signal::from_label("bullish"), Signal::Bullish);
        assert_eq!(Signal::from_label("Bullish (short-term)"), Signal::Bullish);
        assert_eq!(Signal::from_label("bearish"), Signal::Bearish);
        assert_eq!(Signal::from_label("看涨（短线）"), Signal::Bullish);
        assert_eq!(Signal::from_label("空仓"), Signal::Avoid);
        assert_eq!(Signal::from_label("whatever"), Signal::Neutral);
    }

    #[test]
    fn fallback_has_full_field_set() {
        let record = AgentRecord::fallback(
            Role::SpringHunter,
            "engine call failed",
            vec!["category: engine".to_string()],
        );
        assert_eq!(record.role, Role::SpringHunter);
        assert_eq!(record.signal, Signal::Neutral);
        assert_eq!(record.confidence, FALLBACK_CONFIDENCE);
        assert!(record.details.is_object());
        assert!(record.is_fallback_shaped());

        // Serializes with the same keys as a successful record.
        let json = serde_json::to_value(&record).unwrap();
        for key in ["role", "signal", "confidence", "details", "reason", "debug_trace"] {
            assert!(json.get(key).is_some(), "missing key {key}");
        }
    }

    #[test]
    fn record_roundtrip() {
        let record = AgentRecord {
            role: Role::TargetEngineer,
            signal: Signal::Bullish,
            confidence: 87,
            details: serde_json::json!({"target_price": "¥215.00", "stop_loss": "¥198.50"}),
            reason: "measured move from accumulation range".to_string(),
            debug_trace: vec!["step 1: range height 12.5".to_string()],
        };
        let json = serde_json::to_string(&record).unwrap();
        let back: AgentRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}
