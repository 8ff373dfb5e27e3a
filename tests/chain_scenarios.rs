//! End-to-end chain runs against scripted agents.

mod common;

use agent_prefetch::cache::MemoryCache;
use agent_prefetch::events::{AbandonReason, EventKind, HopSource};
use agent_prefetch::prefetch::PrefetchConfig;
use agent_prefetch::telemetry::InMemoryEventSink;
use agent_prefetch::{AgentId, ChainOptimizer, ChainOptimizerBuilder, Error, OptimizerConfig};
use common::{chain, init_tracing, RecordingPreloader, ScriptedTransport, UnreachableStore};
use std::sync::Arc;
use std::time::Duration;
use tokio_test::assert_ok;

const PIPELINE: [&str; 3] = ["classifier", "retriever", "summarizer"];

struct Fixture {
    optimizer: ChainOptimizer,
    transport: Arc<ScriptedTransport>,
    preloader: Arc<RecordingPreloader>,
    events: Arc<InMemoryEventSink>,
}

fn fixture(transport: ScriptedTransport, preloader: RecordingPreloader, config: OptimizerConfig) -> Fixture {
    init_tracing();
    let transport = Arc::new(transport);
    let preloader = Arc::new(preloader);
    let events = Arc::new(InMemoryEventSink::default());
    let optimizer = ChainOptimizerBuilder::new()
        .config(config.with_agent_ids(PIPELINE))
        .cache_backend(Arc::new(MemoryCache::new(1024)))
        .transport(transport.clone())
        .preloader(preloader.clone())
        .event_sink(events.clone())
        .build()
        .unwrap();
    Fixture {
        optimizer,
        transport,
        preloader,
        events,
    }
}

#[tokio::test]
async fn test_cold_run_invokes_every_agent() {
    let f = fixture(ScriptedTransport::default(), RecordingPreloader::default(), OptimizerConfig::new());

    let run = assert_ok!(f.optimizer.run("doc1").await);

    assert_eq!(run.final_response().unwrap().output, "summarizer(retriever(classifier(doc1)))");
    assert_eq!(run.cache_hits(), 0);
    assert!(run.hops().iter().all(|h| h.source == HopSource::Invocation));
    assert_eq!(f.transport.call_count(), 3);
    assert!(f.preloader.targets().is_empty());

    let stats = f.optimizer.transition_stats();
    assert_eq!(stats.total_observations, 2);
    assert_eq!(stats.transition_pairs, 2);
}

#[tokio::test]
async fn test_repeated_run_is_served_from_cache() {
    let f = fixture(ScriptedTransport::default(), RecordingPreloader::default(), OptimizerConfig::new());

    let first = assert_ok!(f.optimizer.run("doc1").await);
    let second = assert_ok!(f.optimizer.run("doc1").await);

    assert_ne!(first.session_id(), second.session_id());
    assert_eq!(second.cache_hits(), 3);
    assert_eq!(second.final_response().unwrap(), first.final_response().unwrap());
    assert_eq!(f.transport.call_count(), 3);

    let report = f.optimizer.report(&second);
    assert_eq!(report.cache.hits, 3);
    assert_eq!(report.cache.misses, 3);
    assert!(report.per_agent.iter().all(|a| a.source == HopSource::Cache));
}

#[tokio::test]
async fn test_different_input_misses_cache() {
    let f = fixture(ScriptedTransport::default(), RecordingPreloader::default(), OptimizerConfig::new());

    assert_ok!(f.optimizer.run("doc1").await);
    let run = assert_ok!(f.optimizer.run("doc2").await);

    assert_eq!(run.cache_hits(), 0);
    assert_eq!(run.final_response().unwrap().output, "summarizer(retriever(classifier(doc2)))");
    assert_eq!(f.transport.call_count(), 6);
}

#[tokio::test]
async fn test_learned_transitions_preload_next_agent_concurrently() {
    let f = fixture(ScriptedTransport::with_delay(40), RecordingPreloader::default(), OptimizerConfig::new());
    for _ in 0..50 {
        f.optimizer.transition_model().ingest_trace(&chain(&PIPELINE));
    }
    let prediction = f.optimizer.transition_model().predict(&"classifier".into()).unwrap();
    assert_eq!(prediction.agent, AgentId::from("retriever"));
    assert!(prediction.confidence >= 0.7);

    let run = assert_ok!(f.optimizer.run("doc1").await);

    assert_eq!(run.final_response().unwrap().output, "summarizer(retriever(classifier(doc1)))");
    assert_eq!(f.preloader.targets(), chain(&["retriever", "summarizer"]));

    // The retriever warm-up started while the classifier call was still running.
    let calls = f.transport.calls();
    let (_, preload_started) = f.preloader.started()[0].clone();
    assert_eq!(calls[0].agent, AgentId::from("classifier"));
    assert!(preload_started >= calls[0].started);
    assert!(preload_started < calls[0].finished);

    assert!(run.hops()[1].warm_start);
    assert!(run.hops()[2].warm_start);
    assert!(calls[1].warm && calls[2].warm);
    assert_eq!(f.events.count("preload_consumed"), 2);
}

#[tokio::test]
async fn test_misprediction_costs_nothing() {
    let f = fixture(
        ScriptedTransport::with_delay(10),
        RecordingPreloader::with_delay(2_000),
        OptimizerConfig::new(),
    );
    for _ in 0..50 {
        f.optimizer
            .transition_model()
            .ingest_trace(&chain(&["classifier", "translator"]));
    }

    let run = assert_ok!(f.optimizer.run("doc1").await);

    assert_eq!(run.final_response().unwrap().output, "summarizer(retriever(classifier(doc1)))");
    assert_eq!(f.preloader.targets(), chain(&["translator"]));
    assert!(run.total_latency() < Duration::from_millis(1_000));
    assert!(!run.hops()[1].warm_start);

    let events = f.events.events();
    assert!(events.iter().any(|e| matches!(
        &e.kind,
        EventKind::PredictionResolved { correct: false, .. }
    )));
    assert!(events.iter().any(|e| matches!(
        &e.kind,
        EventKind::PreloadAbandoned {
            reason: AbandonReason::Mispredicted,
            ..
        }
    )));

    let baseline = fixture(
        ScriptedTransport::with_delay(10),
        RecordingPreloader::default(),
        OptimizerConfig::new().with_prefetch(PrefetchConfig::new().with_enabled(false)),
    );
    let plain = assert_ok!(baseline.optimizer.run("doc1").await);
    assert_eq!(plain.final_response().unwrap(), run.final_response().unwrap());
}

#[tokio::test]
async fn test_failing_hop_aborts_chain() {
    let f = fixture(
        ScriptedTransport::default().failing_at("retriever"),
        RecordingPreloader::default(),
        OptimizerConfig::new(),
    );

    let err = f.optimizer.run("doc1").await.unwrap_err();

    let (hop, agent) = err.failed_hop().unwrap();
    assert_eq!(hop, 1);
    assert_eq!(agent, &AgentId::from("retriever"));
    assert!(err.to_string().contains("retriever"));
    assert_eq!(f.transport.call_count(), 2);
    assert_eq!(f.optimizer.cache_stats().sets, 1);
    assert_eq!(f.optimizer.transition_model().count(&"retriever".into(), &"summarizer".into()), 0);
}

#[tokio::test]
async fn test_empty_chain_is_rejected() {
    let f = fixture(ScriptedTransport::default(), RecordingPreloader::default(), OptimizerConfig::new());
    let err = f.optimizer.run_chain(&[], "doc1").await.unwrap_err();
    assert!(matches!(err, Error::Validation { .. }));
    assert_eq!(f.transport.call_count(), 0);
}

#[tokio::test]
async fn test_unreachable_store_still_completes() {
    init_tracing();
    let store = Arc::new(UnreachableStore::default());
    let transport = Arc::new(ScriptedTransport::default());
    let optimizer = ChainOptimizerBuilder::new()
        .config(OptimizerConfig::new().with_agent_ids(PIPELINE))
        .cache_backend(store.clone())
        .transport(transport.clone())
        .build()
        .unwrap();

    let first = assert_ok!(optimizer.run("doc1").await);
    let second = assert_ok!(optimizer.run("doc1").await);

    assert_eq!(first.final_response().unwrap(), second.final_response().unwrap());
    assert_eq!(second.cache_hits(), 0);
    assert_eq!(transport.call_count(), 6);
    // Reads only; puts are skipped once a read has failed.
    assert_eq!(store.attempts.load(std::sync::atomic::Ordering::SeqCst), 6);
}

#[tokio::test]
async fn test_expired_entries_are_recomputed() {
    let f = fixture(
        ScriptedTransport::default(),
        RecordingPreloader::default(),
        OptimizerConfig::new().with_cache_ttl(Duration::from_millis(30)),
    );

    assert_ok!(f.optimizer.run("doc1").await);
    tokio::time::sleep(Duration::from_millis(60)).await;
    let run = assert_ok!(f.optimizer.run("doc1").await);

    assert_eq!(run.cache_hits(), 0);
    assert_eq!(f.transport.call_count(), 6);
}

#[tokio::test]
async fn test_report_serializes() {
    let f = fixture(ScriptedTransport::default(), RecordingPreloader::default(), OptimizerConfig::new());
    let run = assert_ok!(f.optimizer.run("doc1").await);

    let json = serde_json::to_value(f.optimizer.report(&run)).unwrap();
    assert_eq!(json["per_agent"].as_array().unwrap().len(), 3);
    assert_eq!(json["per_agent"][2]["agent"], "summarizer");
    assert_eq!(json["router"]["known_agents"], serde_json::json!(["classifier", "retriever"]));
}
