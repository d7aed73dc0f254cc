use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A validated A-share subject code: exactly six ASCII digits.
///
/// This is the only input validation the orchestrator performs; anything
/// that parses into a `SubjectId` is accepted downstream.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SubjectId(String);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid subject code {0:?}: expected exactly six digits")]
pub struct SubjectIdError(pub String);

impl SubjectId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Pick the benchmark index for this subject.
    ///
    /// Main-board codes (`6...` / `000...`) track the CSI 300; growth-board
    /// codes (`3...` / `002...`) track the ChiNext index. Unrecognized
    /// prefixes fall back to the CSI 300 rather than failing.
    pub fn benchmark_index(&self) -> BenchmarkIndex {
        if self.0.starts_with('6') || self.0.starts_with("000") {
            BenchmarkIndex::Csi300
        } else if self.0.starts_with('3') || self.0.starts_with("002") {
            BenchmarkIndex::ChiNext
        } else {
            BenchmarkIndex::Csi300
        }
    }
}

impl FromStr for SubjectId {
    type Err = SubjectIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim();
        if code.len() == 6 && code.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Self(code.to_string()))
        } else {
            Err(SubjectIdError(s.to_string()))
        }
    }
}

impl TryFrom<String> for SubjectId {
    type Error = SubjectIdError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<SubjectId> for String {
    fn from(id: SubjectId) -> Self {
        id.0
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Benchmark index used as auxiliary market context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BenchmarkIndex {
    Csi300,
    ChiNext,
}

impl BenchmarkIndex {
    /// Index code usable as a fetch subject in its own right.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Csi300 => "000300",
            Self::ChiNext => "399006",
        }
    }
}
