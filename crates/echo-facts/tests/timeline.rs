// SPDX-FileCopyrightText: 2026 Echo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Monthly synthesis and master timeline, end to end against mocks.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use echo_core::{FactSubject, NewFact};
use echo_facts::{
    write_master_timeline, MonthOutcome, MonthlyTimeline, TimelineOptions, TimelineSynthesizer,
};
use echo_test_utils::{AgentBehavior, MemoryStore, MockAgent};

fn fact(date: &str, predicate: &str) -> NewFact {
    NewFact {
        subject: FactSubject::Relationship,
        predicate: predicate.into(),
        object: "together".into(),
        confidence: 0.9,
        source_text: "we did it".into(),
        date: date.into(),
    }
}

fn timeline_json(date: &str, description: &str) -> String {
    serde_json::json!({
        "month_summary": format!("A month with {description}."),
        "key_events": [
            {"event_date": date, "description": description, "supporting_fact_ids": [1]}
        ],
        "key_learnings": [
            {"description": "They like trips.", "supporting_fact_ids": [1]}
        ]
    })
    .to_string()
}

fn options(dir: &Path) -> TimelineOptions {
    TimelineOptions {
        output_dir: dir.to_path_buf(),
        user_id: "admin".into(),
        call_timeout: Duration::from_secs(120),
    }
}

#[tokio::test]
async fn every_month_with_facts_gets_a_file() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryStore::new());
    store.seed_facts("conv_0", &[fact("2023-03-04", "visited"), fact("2023-05-20", "moved")]);
    let agent = Arc::new(
        MockAgent::new()
            .script(
                "timeline_session_2023_03",
                AgentBehavior::Respond(timeline_json("2023-03-04", "A coast trip")),
            )
            .script(
                "timeline_session_2023_05",
                AgentBehavior::Respond(timeline_json("2023-05-20", "Moving day")),
            ),
    );

    let synthesizer = TimelineSynthesizer::new(store, agent.clone(), options(dir.path())).unwrap();
    let report = synthesizer.run(None).await.unwrap();

    assert_eq!(report.written.len(), 2);
    assert!(report.failed.is_empty());
    let saved: MonthlyTimeline = serde_json::from_str(
        &std::fs::read_to_string(dir.path().join("timeline_2023-03.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(saved.key_events[0].description, "A coast trip");
    assert!(agent.leaked_sessions().is_empty());

    let prompt = agent.prompt_for("timeline_session_2023_05").unwrap();
    assert!(prompt.contains("\"predicate\": \"moved\""));
    assert!(!prompt.contains("visited"));
}

#[tokio::test]
async fn failed_month_is_skipped_and_others_continue() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryStore::new());
    store.seed_facts("conv_0", &[fact("2023-01-09", "met"), fact("2023-02-14", "dated")]);
    let agent = Arc::new(
        MockAgent::with_default(AgentBehavior::Respond(timeline_json("2023-02-14", "Dinner")))
            .script(
                "timeline_session_2023_01",
                AgentBehavior::Respond(r#"{"month_summary": "missing fields"}"#.into()),
            ),
    );

    let synthesizer = TimelineSynthesizer::new(store, agent.clone(), options(dir.path())).unwrap();
    let report = synthesizer.run(None).await.unwrap();

    assert_eq!(report.failed, vec!["2023-01".to_string()]);
    assert_eq!(report.written, vec![dir.path().join("timeline_2023-02.json")]);
    assert!(!dir.path().join("timeline_2023-01.json").exists());
    assert!(agent.leaked_sessions().is_empty());
}

#[tokio::test]
async fn single_month_without_facts_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryStore::new());
    let agent = Arc::new(MockAgent::new());

    let synthesizer = TimelineSynthesizer::new(store, agent.clone(), options(dir.path())).unwrap();
    let outcome = synthesizer.synthesize_month("2022-12").await.unwrap();

    assert_eq!(outcome, MonthOutcome::NoFacts);
    assert!(agent.created_sessions().is_empty());
}

#[tokio::test]
async fn malformed_month_argument_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let synthesizer = TimelineSynthesizer::new(
        Arc::new(MemoryStore::new()),
        Arc::new(MockAgent::new()),
        options(dir.path()),
    )
    .unwrap();
    assert!(synthesizer.run(Some("March 2023")).await.is_err());
}

#[tokio::test]
async fn master_timeline_merges_synthesized_months() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryStore::new());
    store.seed_facts("conv_0", &[fact("2022-12-31", "celebrated"), fact("2023-01-01", "hiked")]);
    let agent = Arc::new(
        MockAgent::new()
            .script(
                "timeline_session_2022_12",
                AgentBehavior::Respond(timeline_json("2022-12-31", "New Year's Eve party")),
            )
            .script(
                "timeline_session_2023_01",
                AgentBehavior::Respond(timeline_json("2023-01-01", "First hike of the year")),
            ),
    );
    TimelineSynthesizer::new(store, agent, options(dir.path()))
        .unwrap()
        .run(None)
        .await
        .unwrap();

    let output = dir.path().join("master_timeline.md");
    let report = write_master_timeline(dir.path(), &output).await.unwrap();

    assert_eq!(report.files_read, 2);
    assert_eq!(report.events, 2);
    let md = std::fs::read_to_string(&output).unwrap();
    let dec = md.find("### 2022").unwrap();
    let jan = md.find("### 2023").unwrap();
    assert!(dec < jan);
    assert!(md.contains("#### December\n- **2022-12-31:** New Year's Eve party\n"));
    assert!(md.contains("#### January\n- **2023-01-01:** First hike of the year\n"));
}
