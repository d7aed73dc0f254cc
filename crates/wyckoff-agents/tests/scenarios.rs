//! End-to-end orchestration scenarios over scripted engines and providers.

use std::sync::Arc;
use std::time::Duration;

use wyckoff_agents::test_support::{
    reply_json, FlakyProvider, MockAggregator, ScriptedEngine, StaticProvider,
};
use wyckoff_agents::{
    AgentRunner, CachedFetcher, DataProvider, EngineAggregator, Orchestrator, ReasoningEngine,
    RetryPolicy, StreamChunk,
};
use wyckoff_cache::{CacheStore, SqliteStore};
use wyckoff_models::{DatasetKind, Role, Signal, SubjectId, FALLBACK_CONFIDENCE};

const DAY: Duration = Duration::from_secs(24 * 3600);

fn fast_retry() -> RetryPolicy {
    RetryPolicy::new(3, Duration::from_millis(1))
}

fn fetcher_over(provider: Arc<dyn DataProvider>) -> Arc<CachedFetcher> {
    let sqlite = SqliteStore::open_in_memory().unwrap();
    let cache = Arc::new(CacheStore::new(sqlite, 100, Duration::from_secs(60)));
    Arc::new(CachedFetcher::new(cache, provider, DAY, fast_retry()))
}

fn seeded_provider(code: &str) -> StaticProvider {
    let provider = StaticProvider::empty();
    provider.insert(code, DatasetKind::DailyBars, "[bars]");
    provider.insert(code, DatasetKind::FundFlow, "[flows]");
    provider.insert(code, DatasetKind::StockInfo, "{info}");
    provider.insert("000300", DatasetKind::DailyBars, "[csi300]");
    provider.insert("399006", DatasetKind::DailyBars, "[chinext]");
    provider
}

fn uniform_runners(
    fetcher: Arc<CachedFetcher>,
    engine: Arc<dyn ReasoningEngine>,
) -> Vec<Arc<AgentRunner>> {
    Role::ALL
        .iter()
        .map(|role| {
            Arc::new(AgentRunner::new(
                *role,
                Arc::clone(&fetcher),
                Arc::clone(&engine),
                fast_retry(),
            ))
        })
        .collect()
}

#[tokio::test]
async fn happy_path_produces_full_batch() {
    let subject: SubjectId = "600519".parse().unwrap();
    let engine: Arc<dyn ReasoningEngine> =
        Arc::new(ScriptedEngine::with_reply(&reply_json("bullish", 82)));
    let fetcher = fetcher_over(Arc::new(seeded_provider("600519")));

    let orchestrator = Orchestrator::new(
        uniform_runners(fetcher, engine),
        Arc::new(MockAggregator::bullish()),
        None,
        Duration::from_secs(30),
    );

    let batch = orchestrator.analyze(&subject).await;
    assert_eq!(batch.records.len(), 5);
    for record in &batch.records {
        assert_eq!(record.signal, Signal::Bullish);
        assert_eq!(record.confidence, 82);
        assert!(!record.is_fallback_shaped());
    }
    assert_eq!(batch.consensus.signal, Signal::Bullish);
}

#[tokio::test]
async fn total_data_outage_still_yields_five_records() {
    let subject: SubjectId = "600519".parse().unwrap();
    let provider = Arc::new(FlakyProvider::new(u32::MAX, "never"));
    let engine: Arc<dyn ReasoningEngine> =
        Arc::new(ScriptedEngine::with_reply(&reply_json("bullish", 82)));

    let orchestrator = Orchestrator::new(
        uniform_runners(fetcher_over(provider), engine),
        Arc::new(MockAggregator::bullish()),
        None,
        Duration::from_secs(30),
    );

    let batch = orchestrator.analyze(&subject).await;
    assert_eq!(batch.records.len(), 5);
    for (record, role) in batch.records.iter().zip(Role::ALL) {
        assert_eq!(record.role, role);
        assert!(record.is_fallback_shaped());
        assert_eq!(record.confidence, FALLBACK_CONFIDENCE);
        assert!(record.reason.contains("analysis unavailable"));
    }
}

#[tokio::test]
async fn batch_serializes_with_stable_shape_under_failure() {
    let subject: SubjectId = "300750".parse().unwrap();
    let provider = Arc::new(FlakyProvider::new(u32::MAX, "never"));
    let engine: Arc<dyn ReasoningEngine> = Arc::new(ScriptedEngine::new(vec![]));

    let orchestrator = Orchestrator::new(
        uniform_runners(fetcher_over(provider), engine),
        Arc::new(MockAggregator::failing()),
        None,
        Duration::from_secs(30),
    );

    let batch = orchestrator.analyze(&subject).await;
    let json = serde_json::to_value(&batch).unwrap();

    for key in ["id", "subject", "generated_at", "records", "consensus"] {
        assert!(json.get(key).is_some(), "missing key {key}");
    }
    for record in json["records"].as_array().unwrap() {
        for key in ["role", "signal", "confidence", "details", "reason", "debug_trace"] {
            assert!(record.get(key).is_some(), "missing record key {key}");
        }
    }
    assert_eq!(json["consensus"]["confidence"], 0);
}

#[tokio::test]
async fn one_failing_role_leaves_the_others_intact() {
    let subject: SubjectId = "600519".parse().unwrap();
    let fetcher = fetcher_over(Arc::new(seeded_provider("600519")));
    let good: Arc<dyn ReasoningEngine> =
        Arc::new(ScriptedEngine::with_reply(&reply_json("bullish", 82)));
    let broken: Arc<dyn ReasoningEngine> = Arc::new(ScriptedEngine::new(vec![]));

    let runners = Role::ALL
        .iter()
        .map(|role| {
            let engine = if *role == Role::SpringHunter {
                Arc::clone(&broken)
            } else {
                Arc::clone(&good)
            };
            Arc::new(AgentRunner::new(
                *role,
                Arc::clone(&fetcher),
                engine,
                fast_retry(),
            ))
        })
        .collect();

    let orchestrator = Orchestrator::new(
        runners,
        Arc::new(MockAggregator::bullish()),
        None,
        Duration::from_secs(30),
    );

    let batch = orchestrator.analyze(&subject).await;
    assert_eq!(batch.records.len(), 5);
    for record in &batch.records {
        if record.role == Role::SpringHunter {
            assert!(record.is_fallback_shaped());
        } else {
            assert_eq!(record.signal, Signal::Bullish);
            assert!(!record.is_fallback_shaped());
        }
    }
}

#[tokio::test]
async fn transient_provider_failure_recovers_on_retry() {
    // One transient fetch failure, then the provider serves normally.
    let subject: SubjectId = "300750".parse().unwrap();
    let provider = Arc::new(FlakyProvider::new(1, "[bars]"));
    let engine: Arc<dyn ReasoningEngine> =
        Arc::new(ScriptedEngine::with_reply(&reply_json("bullish", 78)));

    let fetcher = fetcher_over(Arc::clone(&provider) as Arc<dyn DataProvider>);
    let runner = AgentRunner::new(
        Role::PhaseHunter,
        fetcher,
        engine,
        fast_retry(),
    );

    let record = runner.run(&subject).await;
    assert_eq!(record.signal, Signal::Bullish);
    assert!(!record.is_fallback_shaped());
    assert!(provider.calls() >= 2);
}

#[tokio::test]
async fn truncated_then_complete_stream_recovers() {
    let subject: SubjectId = "300750".parse().unwrap();
    let engine = ScriptedEngine::new(vec![
        vec![StreamChunk::content("{\"signal\": \"bul")],
        vec![
            StreamChunk::reasoning("re-reading the range"),
            StreamChunk::content(&reply_json("bullish", 70)),
            StreamChunk::finished(),
        ],
    ]);
    let engine = Arc::new(engine);
    let fetcher = fetcher_over(Arc::new(seeded_provider("300750")));

    let runner = AgentRunner::new(
        Role::VolumeDetective,
        fetcher,
        Arc::clone(&engine) as Arc<dyn ReasoningEngine>,
        fast_retry(),
    );

    let record = runner.run(&subject).await;
    assert_eq!(record.signal, Signal::Bullish);
    assert_eq!(record.confidence, 70);
    assert_eq!(engine.calls(), 2);
}

#[tokio::test]
async fn slow_role_is_cut_off_at_the_batch_deadline() {
    struct StallingEngine;

    #[async_trait::async_trait]
    impl ReasoningEngine for StallingEngine {
        async fn submit(
            &self,
            _request: &wyckoff_agents::EngineRequest,
        ) -> Result<
            futures_util::stream::BoxStream<
                'static,
                Result<StreamChunk, wyckoff_agents::AgentError>,
            >,
            wyckoff_agents::AgentError,
        > {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Err(wyckoff_agents::AgentError::Engine("unreachable".into()))
        }
    }

    let subject: SubjectId = "600519".parse().unwrap();
    let fetcher = fetcher_over(Arc::new(seeded_provider("600519")));
    let engine: Arc<dyn ReasoningEngine> = Arc::new(StallingEngine);

    let orchestrator = Orchestrator::new(
        uniform_runners(fetcher, engine),
        Arc::new(MockAggregator::bullish()),
        None,
        Duration::from_millis(100),
    );

    let batch = orchestrator.analyze(&subject).await;
    assert_eq!(batch.records.len(), 5);
    for record in &batch.records {
        assert!(record.is_fallback_shaped());
        assert!(record.reason.contains("deadline"));
    }
}

#[tokio::test]
async fn second_analysis_of_same_subject_is_served_from_cache() {
    let subject: SubjectId = "600519".parse().unwrap();
    let provider = Arc::new(seeded_provider("600519"));
    let engine: Arc<dyn ReasoningEngine> =
        Arc::new(ScriptedEngine::with_reply(&reply_json("neutral", 50)));

    let fetcher = fetcher_over(Arc::clone(&provider) as Arc<dyn DataProvider>);
    let runner = AgentRunner::new(
        Role::PhaseHunter,
        fetcher,
        engine,
        fast_retry(),
    );

    runner.run(&subject).await;
    let first_calls = provider.calls();
    runner.run(&subject).await;
    assert_eq!(provider.calls(), first_calls);
}

#[tokio::test]
async fn engine_aggregator_feeds_records_through_the_engine() {
    let subject: SubjectId = "600519".parse().unwrap();
    let role_engine: Arc<dyn ReasoningEngine> =
        Arc::new(ScriptedEngine::with_reply(&reply_json("bullish", 82)));
    let consensus_engine: Arc<dyn ReasoningEngine> = Arc::new(ScriptedEngine::with_reply(
        r#"{"signal": "bullish", "strength": "strong", "position": "40%", "confidence": 77, "reason": "roles aligned"}"#,
    ));
    let fetcher = fetcher_over(Arc::new(seeded_provider("600519")));

    let orchestrator = Orchestrator::new(
        uniform_runners(fetcher, role_engine),
        Arc::new(EngineAggregator::new(consensus_engine, fast_retry())),
        None,
        Duration::from_secs(30),
    );

    let batch = orchestrator.analyze(&subject).await;
    assert_eq!(batch.consensus.signal, Signal::Bullish);
    assert_eq!(batch.consensus.strength, "strong");
    assert_eq!(batch.consensus.position.as_deref(), Some("40%"));
    assert_eq!(batch.consensus.confidence, 77);
}
