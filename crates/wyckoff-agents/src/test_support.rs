//! Deterministic doubles for the engine, provider and aggregator seams.
//! Used by unit tests here and by integration scenarios downstream.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use wyckoff_models::{AgentRecord, Consensus, DatasetKind, Signal};

use crate::engine::{EngineRequest, ReasoningEngine};
use crate::error::AgentError;
use crate::orchestrator::Aggregator;
use crate::provider::{DataProvider, ProviderError};
use crate::stream::StreamChunk;

/// Minimal valid role reply.
pub fn reply_json(signal: &str, confidence: u8) -> String {
    format!(
        "{{\"signal\": \"{signal}\", \"confidence\": {confidence}, \"reason\": \"scripted\"}}"
    )
}

/// Engine that replays scripted chunk sequences, one script per call.
///
/// When the scripts run out, the fallback script (if any) is replayed
/// indefinitely; otherwise further calls fail.
pub struct ScriptedEngine {
    scripts: Mutex<VecDeque<Vec<StreamChunk>>>,
    fallback: Option<Vec<StreamChunk>>,
    calls: AtomicU32,
}

impl ScriptedEngine {
    pub fn new(scripts: Vec<Vec<StreamChunk>>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into()),
            fallback: None,
            calls: AtomicU32::new(0),
        }
    }

    /// Engine that answers every call with `reply` followed by a finish
    /// signal.
    pub fn with_reply(reply: &str) -> Self {
        Self {
            scripts: Mutex::new(VecDeque::new()),
            fallback: Some(vec![StreamChunk::content(reply), StreamChunk::finished()]),
            calls: AtomicU32::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReasoningEngine for ScriptedEngine {
    async fn submit(
        &self,
        _request: &EngineRequest,
    ) -> Result<BoxStream<'static, Result<StreamChunk, AgentError>>, AgentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let script = {
            let mut scripts = self.scripts.lock().unwrap();
            scripts.pop_front().or_else(|| self.fallback.clone())
        };

        match script {
            Some(chunks) => Ok(futures_util::stream::iter(chunks.into_iter().map(Ok)).boxed()),
            None => Err(AgentError::Engine("no scripted reply left".into())),
        }
    }
}

/// Provider serving fixed payloads from a map, counting calls.
pub struct StaticProvider {
    datasets: Mutex<HashMap<String, String>>,
    calls: AtomicU32,
}

impl StaticProvider {
    pub fn empty() -> Self {
        Self {
            datasets: Mutex::new(HashMap::new()),
            calls: AtomicU32::new(0),
        }
    }

    pub fn with_dataset(code: &str, kind: DatasetKind, payload: &str) -> Self {
        let provider = Self::empty();
        provider.insert(code, kind, payload);
        provider
    }

    pub fn insert(&self, code: &str, kind: DatasetKind, payload: &str) {
        self.datasets
            .lock()
            .unwrap()
            .insert(kind.cache_key(code), payload.to_string());
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DataProvider for StaticProvider {
    async fn fetch(&self, code: &str, kind: DatasetKind) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.datasets
            .lock()
            .unwrap()
            .get(&kind.cache_key(code))
            .cloned()
            .ok_or(ProviderError::Status(404))
    }
}

/// Provider that fails the first `fail_times` calls, then serves `payload`.
pub struct FlakyProvider {
    fail_times: u32,
    payload: String,
    calls: AtomicU32,
}

impl FlakyProvider {
    pub fn new(fail_times: u32, payload: &str) -> Self {
        Self {
            fail_times,
            payload: payload.to_string(),
            calls: AtomicU32::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DataProvider for FlakyProvider {
    async fn fetch(&self, _code: &str, _kind: DatasetKind) -> Result<String, ProviderError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.fail_times {
            Err(ProviderError::Transport("simulated transient failure".into()))
        } else {
            Ok(self.payload.clone())
        }
    }
}

/// Aggregator returning a canned consensus, or a canned failure.
pub struct MockAggregator {
    outcome: Result<Consensus, String>,
}

impl MockAggregator {
    pub fn bullish() -> Self {
        Self {
            outcome: Ok(Consensus {
                signal: Signal::Bullish,
                strength: "strong".to_string(),
                stop_loss: Some("180.00".to_string()),
                target_price: Some("210.00".to_string()),
                position: Some("30%".to_string()),
                confidence: 75,
                reason: "scripted consensus".to_string(),
            }),
        }
    }

    pub fn failing() -> Self {
        Self {
            outcome: Err("aggregator offline".to_string()),
        }
    }
}

#[async_trait]
impl Aggregator for MockAggregator {
    async fn aggregate(&self, _records: &[AgentRecord]) -> Result<Consensus, AgentError> {
        match &self.outcome {
            Ok(consensus) => Ok(consensus.clone()),
            Err(message) => Err(AgentError::Engine(message.clone())),
        }
    }
}
