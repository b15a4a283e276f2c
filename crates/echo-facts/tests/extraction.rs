// SPDX-FileCopyrightText: 2026 Echo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fact extraction orchestrator behavior against scripted adapters.

use std::sync::Arc;
use std::time::Duration;

use echo_core::{EchoError, FactSubject, Message};
use echo_facts::{ExtractionOptions, FactExtractor, UnitState};
use echo_test_utils::{message, AgentBehavior, MemoryStore, MockAgent};
use tokio::time::Instant;

fn options(max_concurrent: usize, batch_size: usize, delay_secs: u64) -> ExtractionOptions {
    ExtractionOptions {
        max_concurrent,
        batch_size,
        batch_delay: Duration::from_secs(delay_secs),
        call_timeout: Duration::from_secs(120),
        max_calls_per_minute: None,
        app_name: "fact_extraction".into(),
        user_id: "admin".into(),
    }
}

/// `n` conversations with two messages each, in time order.
fn conversations(n: usize) -> Vec<Message> {
    (0..n)
        .flat_map(|c| {
            let conv = format!("conv_{c}");
            vec![
                message(&conv, c * 10, &format!("hello from {c}"), true),
                message(&conv, c * 10 + 1, &format!("reply in {c}"), false),
            ]
        })
        .collect()
}

fn ids(n: usize) -> Vec<String> {
    (0..n).map(|c| format!("conv_{c}")).collect()
}

fn facts_json(predicates: &[&str]) -> String {
    let facts: Vec<_> = predicates
        .iter()
        .map(|p| {
            serde_json::json!({
                "subject": "me",
                "predicate": p,
                "object": "yes",
                "confidence": 0.7,
                "source_text": "hello",
                "fact_date": "2024-05-01T12:00:00Z",
            })
        })
        .collect();
    serde_json::json!({ "facts": facts }).to_string()
}

fn extractor(
    store: &Arc<MemoryStore>,
    agent: &Arc<MockAgent>,
    options: ExtractionOptions,
) -> FactExtractor {
    FactExtractor::new(store.clone(), agent.clone(), options).unwrap()
}

#[tokio::test(start_paused = true)]
async fn concurrency_never_exceeds_gate_capacity() {
    let store = Arc::new(MemoryStore::with_messages(conversations(12)));
    let agent = Arc::new(MockAgent::with_default(AgentBehavior::DelayedRespond(
        Duration::from_secs(1),
        facts_json(&["likes"]),
    )));

    let report = extractor(&store, &agent, options(3, 50, 5)).run().await.unwrap();

    assert_eq!(agent.peak_concurrency(), 3);
    assert_eq!(report.succeeded, 12);
    assert_eq!(report.facts_inserted, 12);
    assert_eq!(report.batches, 1);
    assert!(agent.leaked_sessions().is_empty());
}

#[tokio::test(start_paused = true)]
async fn delay_runs_between_batches_but_not_after_the_last() {
    let store = Arc::new(MemoryStore::with_messages(conversations(5)));
    let agent = Arc::new(MockAgent::new());

    let start = Instant::now();
    let report = extractor(&store, &agent, options(5, 2, 5)).run().await.unwrap();

    assert_eq!(report.batches, 3);
    assert_eq!(start.elapsed(), Duration::from_secs(10));
}

#[tokio::test(start_paused = true)]
async fn batches_launch_in_list_order() {
    let store = Arc::new(MemoryStore::with_messages(conversations(5)));
    let agent = Arc::new(MockAgent::new());

    extractor(&store, &agent, options(5, 2, 1)).run().await.unwrap();

    let expected: Vec<String> = ids(5).iter().map(|id| format!("session_{id}")).collect();
    assert_eq!(agent.run_order(), expected);
}

#[tokio::test]
async fn facts_are_stored_in_agent_order() {
    let store = Arc::new(MemoryStore::with_messages(conversations(1)));
    let agent = Arc::new(MockAgent::with_default(AgentBehavior::Respond(facts_json(&[
        "first", "second", "third",
    ]))));

    let report = extractor(&store, &agent, options(5, 50, 0)).run().await.unwrap();

    assert_eq!(report.facts_inserted, 3);
    let stored: Vec<String> = store.facts().into_iter().map(|f| f.predicate).collect();
    assert_eq!(stored, ["first", "second", "third"]);
    let fact = &store.facts()[0];
    assert_eq!(fact.conversation_id, "conv_0");
    assert_eq!(fact.subject, FactSubject::Me);
    assert_eq!(fact.date, "2024-05-01");
}

#[tokio::test]
async fn transcript_labels_each_turn() {
    let store = Arc::new(MemoryStore::with_messages(conversations(1)));
    let agent = Arc::new(MockAgent::new());

    extractor(&store, &agent, options(5, 50, 0)).run().await.unwrap();

    let prompt = agent.prompt_for("session_conv_0").unwrap();
    assert!(prompt.contains("Sender: Me\nMessage:\nhello from 0\n-----\n"));
    assert!(prompt.contains("Sender: Other\nMessage:\nreply in 0\n-----\n"));
    assert!(prompt.find("hello from 0") < prompt.find("reply in 0"));
}

#[tokio::test]
async fn validation_failure_is_isolated_to_its_conversation() {
    let store = Arc::new(MemoryStore::with_messages(conversations(3)));
    let agent = Arc::new(
        MockAgent::with_default(AgentBehavior::Respond(facts_json(&["ok"])))
            .script("session_conv_1", AgentBehavior::Respond("I found no facts.".into())),
    );

    let report = extractor(&store, &agent, options(5, 50, 0)).run().await.unwrap();

    assert_eq!(report.succeeded, 2);
    assert_eq!(report.validation_failed, 1);
    assert_eq!(report.outcomes[1].state, UnitState::ValidationFailed);
    assert!(store.facts().iter().all(|f| f.conversation_id != "conv_1"));
    assert!(agent.leaked_sessions().is_empty());
}

#[tokio::test]
async fn one_bad_fact_drops_the_whole_conversation() {
    let bad = serde_json::json!({"facts": [
        {"subject": "me", "predicate": "a", "object": "b", "confidence": 0.5,
         "source_text": "x", "fact_date": "2024-05-01"},
        {"subject": "me", "predicate": "c", "object": "d", "confidence": 0.5,
         "source_text": "y", "fact_date": "around easter"}
    ]})
    .to_string();
    let store = Arc::new(MemoryStore::with_messages(conversations(1)));
    let agent = Arc::new(MockAgent::with_default(AgentBehavior::Respond(bad)));

    let report = extractor(&store, &agent, options(5, 50, 0)).run().await.unwrap();

    assert_eq!(report.validation_failed, 1);
    assert!(store.facts().is_empty());
    assert!(store.fact_writes().is_empty());
}

#[tokio::test]
async fn agent_errors_are_isolated_and_release_the_session() {
    let store = Arc::new(MemoryStore::with_messages(conversations(3)));
    let agent = Arc::new(
        MockAgent::new()
            .script("session_conv_0", AgentBehavior::Fail("connection reset".into()))
            .script("session_conv_2", AgentBehavior::NoEvents),
    );

    let report = extractor(&store, &agent, options(5, 50, 0)).run().await.unwrap();

    assert_eq!(report.agent_errors, 2);
    assert_eq!(report.succeeded, 1);
    assert!(report.outcomes[0]
        .detail
        .as_deref()
        .is_some_and(|d| d.contains("connection reset")));
    assert_eq!(agent.deleted_sessions().len(), 3);
    assert!(agent.leaked_sessions().is_empty());
}

#[tokio::test(start_paused = true)]
async fn stalled_call_times_out_and_frees_its_slot() {
    let store = Arc::new(MemoryStore::with_messages(conversations(3)));
    let agent = Arc::new(MockAgent::new().script("session_conv_0", AgentBehavior::Hang));
    let mut opts = options(1, 50, 0);
    opts.call_timeout = Duration::from_secs(30);

    let start = Instant::now();
    let report = extractor(&store, &agent, opts).run().await.unwrap();

    assert_eq!(start.elapsed(), Duration::from_secs(30));
    assert_eq!(report.agent_errors, 1);
    assert_eq!(report.succeeded, 2);
    assert!(report.outcomes[0]
        .detail
        .as_deref()
        .is_some_and(|d| d.contains("timed out")));
    assert!(agent.leaked_sessions().is_empty());
    assert_eq!(agent.in_flight(), 0);
}

#[tokio::test]
async fn conversation_without_messages_is_a_no_op() {
    let store = Arc::new(MemoryStore::with_messages(conversations(1)));
    let agent = Arc::new(MockAgent::new());

    let report = extractor(&store, &agent, options(5, 50, 0))
        .run_for(&["conv_0".to_string(), "conv_missing".to_string()])
        .await
        .unwrap();

    assert_eq!(report.empty, 1);
    assert_eq!(report.succeeded, 1);
    assert_eq!(agent.created_sessions(), vec!["session_conv_0".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn store_failure_settles_the_batch_then_stops() {
    let store = Arc::new(MemoryStore::with_messages(conversations(4)).fail_inserts_for("conv_1"));
    let agent = Arc::new(MockAgent::with_default(AgentBehavior::Respond(facts_json(&[
        "kept",
    ]))));

    let err = extractor(&store, &agent, options(5, 2, 5))
        .run()
        .await
        .unwrap_err();

    assert!(matches!(err, EchoError::Storage { .. }));
    // conv_0 shared the batch and still landed; the second batch never started.
    assert_eq!(store.fact_writes(), vec!["conv_0".to_string()]);
    assert_eq!(
        agent.created_sessions(),
        vec!["session_conv_0".to_string(), "session_conv_1".to_string()]
    );
    assert!(agent.leaked_sessions().is_empty());
}

#[tokio::test(start_paused = true)]
async fn rate_limit_spaces_call_issuance() {
    let store = Arc::new(MemoryStore::with_messages(conversations(3)));
    let agent = Arc::new(MockAgent::new());
    let mut opts = options(3, 50, 0);
    opts.max_calls_per_minute = Some(60);

    let start = Instant::now();
    let report = extractor(&store, &agent, opts).run().await.unwrap();

    assert_eq!(report.succeeded, 3);
    assert_eq!(start.elapsed(), Duration::from_secs(2));
}

#[test]
fn zero_capacity_is_rejected() {
    let store = Arc::new(MemoryStore::new());
    let agent = Arc::new(MockAgent::new());
    let result = FactExtractor::new(store, agent, options(0, 50, 0));
    assert!(matches!(result, Err(EchoError::Config(_))));
}

#[tokio::test]
async fn empty_store_reports_nothing() {
    let store = Arc::new(MemoryStore::new());
    let agent = Arc::new(MockAgent::new());
    let report = extractor(&store, &agent, options(5, 50, 0)).run().await.unwrap();
    assert_eq!(report.conversations, 0);
    assert!(agent.created_sessions().is_empty());
}
