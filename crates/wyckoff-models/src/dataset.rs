use serde::{Deserialize, Serialize};

/// The datasets a role pipeline acquires before composing its request.
///
/// `DailyBars` is the primary dataset: a role that cannot obtain it falls
/// back immediately. The others are auxiliary; missing ones only shrink the
/// request context. Benchmark index history is `DailyBars` fetched for the
/// index code itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetKind {
    DailyBars,
    FundFlow,
    StockInfo,
}

impl DatasetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DatasetKind::DailyBars => "daily_bars",
            DatasetKind::FundFlow => "fund_flow",
            DatasetKind::StockInfo => "stock_info",
        }
    }

    /// Cache key for this dataset: `{kind}:{code}`.
    pub fn cache_key(&self, code: &str) -> String {
        format!("{}:{}", self.as_str(), code)
    }
}
