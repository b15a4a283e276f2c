// SPDX-FileCopyrightText: 2026 Echo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Indexing pipeline behavior against instrumented in-memory adapters.

use std::sync::Arc;

use echo_core::{EchoError, IndexBuild, Message};
use echo_embed::{EmbeddingPipeline, HybridSearcher, PipelineOptions};
use echo_test_utils::{
    message, IndexCall, MockDenseEmbedder, MockSparseEmbedder, MockVectorIndex,
};

const DIM: usize = 8;
const STANDARD: IndexBuild = IndexBuild::Standard {
    m: 16,
    ef_construct: 100,
};

fn options(batch_size: usize, sparse_batch_size: usize, recreate: bool) -> PipelineOptions {
    PipelineOptions {
        collection: "chat".into(),
        batch_size,
        sparse_batch_size,
        recreate,
        standard_build: STANDARD,
    }
}

fn messages(n: usize) -> Vec<Message> {
    (0..n)
        .map(|i| message("conversation_1", i, &format!("message number {i}"), i % 2 == 0))
        .collect()
}

struct Harness {
    dense: Arc<MockDenseEmbedder>,
    sparse: Arc<MockSparseEmbedder>,
    index: Arc<MockVectorIndex>,
}

impl Harness {
    fn new(dense: MockDenseEmbedder, sparse: MockSparseEmbedder, index: MockVectorIndex) -> Self {
        Self {
            dense: Arc::new(dense),
            sparse: Arc::new(sparse),
            index: Arc::new(index),
        }
    }

    fn standard() -> Self {
        Self::new(
            MockDenseEmbedder::new(DIM),
            MockSparseEmbedder::new(),
            MockVectorIndex::new(),
        )
    }

    fn pipeline(&self, options: PipelineOptions) -> EmbeddingPipeline {
        EmbeddingPipeline::new(
            self.dense.clone(),
            self.sparse.clone(),
            self.index.clone(),
            options,
        )
        .unwrap()
    }

    fn configure_calls(&self) -> Vec<IndexBuild> {
        self.index
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                IndexCall::Configure { build, .. } => Some(build),
                _ => None,
            })
            .collect()
    }
}

#[tokio::test]
async fn fresh_collection_is_created_deferred_and_restored_once() {
    let h = Harness::standard();
    let report = h.pipeline(options(4, 2, true)).run(&messages(10)).await.unwrap();

    assert_eq!(report.points_upserted, 10);
    assert_eq!(report.batches, 3);
    assert!(report.collection_created);

    let calls = h.index.calls();
    assert_eq!(calls[0], IndexCall::Exists("chat".into()));
    assert_eq!(
        calls[1],
        IndexCall::Create {
            name: "chat".into(),
            dim: DIM as u64,
            build: IndexBuild::Deferred,
        }
    );
    let upserts: Vec<_> = calls[2..5].to_vec();
    assert!(upserts.iter().all(|c| matches!(
        c,
        IndexCall::Upsert { wait: true, .. }
    )));
    assert_eq!(
        calls[5],
        IndexCall::Configure {
            name: "chat".into(),
            build: STANDARD,
        }
    );
    assert_eq!(calls.len(), 6);
    assert_eq!(h.index.build_mode("chat"), Some(STANDARD));
}

#[tokio::test]
async fn batches_follow_input_order() {
    let h = Harness::standard();
    h.pipeline(options(4, 2, true)).run(&messages(10)).await.unwrap();

    let upserted: Vec<Vec<String>> = h
        .index
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            IndexCall::Upsert { ids, .. } => Some(ids),
            _ => None,
        })
        .collect();
    assert_eq!(upserted.len(), 3);
    assert_eq!(upserted[0][0], "conversation_1-0");
    assert_eq!(upserted[1][0], "conversation_1-4");
    assert_eq!(upserted[2], vec!["conversation_1-8", "conversation_1-9"]);
}

#[tokio::test]
async fn sparse_encoding_runs_in_sub_batches() {
    let h = Harness::standard();
    h.pipeline(options(5, 2, true)).run(&messages(7)).await.unwrap();

    assert_eq!(h.dense.batch_sizes(), vec![5, 2]);
    assert_eq!(h.sparse.batch_sizes(), vec![2, 2, 1, 2]);
}

#[tokio::test]
async fn points_carry_both_vectors_and_payload() {
    let h = Harness::standard();
    let input = messages(3);
    h.pipeline(options(4, 2, true)).run(&input).await.unwrap();

    let point = h.index.point("chat", "conversation_1-1").unwrap();
    assert_eq!(point.dense, h.dense.vector_for("message number 1"));
    assert_eq!(
        point.sparse,
        MockSparseEmbedder::vector_for("message number 1")
    );
    assert_eq!(point.payload.text, "message number 1");
    assert_eq!(point.payload.conversation_id, "conversation_1");
    assert!(!point.payload.is_from_me);
    assert_eq!(point.payload.timestamp_seconds, input[1].timestamp);
}

#[tokio::test]
async fn existing_collection_is_recreated_when_asked() {
    let h = Harness::new(
        MockDenseEmbedder::new(DIM),
        MockSparseEmbedder::new(),
        MockVectorIndex::new().with_collection("chat", DIM as u64, STANDARD),
    );
    h.pipeline(options(4, 2, true)).run(&messages(2)).await.unwrap();

    let mutations = h.index.mutations();
    assert_eq!(mutations[0], IndexCall::Delete("chat".into()));
    assert!(matches!(
        mutations[1],
        IndexCall::Create {
            build: IndexBuild::Deferred,
            ..
        }
    ));
}

#[tokio::test]
async fn appending_defers_indexing_on_existing_collection() {
    let h = Harness::new(
        MockDenseEmbedder::new(DIM),
        MockSparseEmbedder::new(),
        MockVectorIndex::new().with_collection("chat", DIM as u64, STANDARD),
    );
    let report = h
        .pipeline(options(4, 2, false))
        .run(&messages(2))
        .await
        .unwrap();

    assert!(!report.collection_created);
    assert_eq!(h.configure_calls(), vec![IndexBuild::Deferred, STANDARD]);
    assert!(!h
        .index
        .calls()
        .iter()
        .any(|c| matches!(c, IndexCall::Create { .. } | IndexCall::Delete(_))));
}

#[tokio::test]
async fn empty_input_touches_nothing() {
    let h = Harness::standard();
    let report = h.pipeline(options(4, 2, true)).run(&[]).await.unwrap();

    assert_eq!(report.points_upserted, 0);
    assert!(h.index.calls().is_empty());
    assert!(h.dense.batch_sizes().is_empty());
}

#[tokio::test]
async fn short_dense_output_aborts_before_upsert() {
    let h = Harness::new(
        MockDenseEmbedder::new(DIM).drop_last_on_call(2),
        MockSparseEmbedder::new(),
        MockVectorIndex::new(),
    );
    let err = h
        .pipeline(options(4, 2, true))
        .run(&messages(10))
        .await
        .unwrap_err();

    assert!(matches!(err, EchoError::Integrity(ref msg) if msg.contains("batch 1")));
    // First batch landed, second never reached the index, indexing stays deferred.
    assert_eq!(h.index.point_ids("chat").len(), 4);
    assert!(h.configure_calls().is_empty());
    assert_eq!(h.index.build_mode("chat"), Some(IndexBuild::Deferred));
}

#[tokio::test]
async fn short_sparse_sub_batch_is_integrity_error() {
    let h = Harness::new(
        MockDenseEmbedder::new(DIM),
        MockSparseEmbedder::new().drop_last_on_call(1),
        MockVectorIndex::new(),
    );
    let err = h
        .pipeline(options(4, 2, true))
        .run(&messages(4))
        .await
        .unwrap_err();

    assert!(matches!(err, EchoError::Integrity(_)));
    assert!(h.index.point_ids("chat").is_empty());
    assert!(!h
        .index
        .calls()
        .iter()
        .any(|c| matches!(c, IndexCall::Upsert { .. })));
}

#[tokio::test]
async fn upsert_failure_stops_the_run() {
    let h = Harness::new(
        MockDenseEmbedder::new(DIM),
        MockSparseEmbedder::new(),
        MockVectorIndex::new().fail_upsert_on(2),
    );
    let err = h
        .pipeline(options(4, 2, true))
        .run(&messages(12))
        .await
        .unwrap_err();

    assert!(matches!(err, EchoError::Index { .. }));
    assert_eq!(h.dense.batch_sizes().len(), 2);
    assert!(h.configure_calls().is_empty());
}

#[tokio::test]
async fn rerun_after_failure_converges_without_duplicates() {
    let index = Arc::new(MockVectorIndex::new().fail_upsert_on(2));
    let dense = Arc::new(MockDenseEmbedder::new(DIM));
    let sparse = Arc::new(MockSparseEmbedder::new());
    let input = messages(10);

    let first = EmbeddingPipeline::new(
        dense.clone(),
        sparse.clone(),
        index.clone(),
        options(4, 2, true),
    )
    .unwrap();
    assert!(first.run(&input).await.is_err());

    let second =
        EmbeddingPipeline::new(dense, sparse, index.clone(), options(4, 2, false)).unwrap();
    second.run(&input).await.unwrap();

    assert_eq!(index.point_ids("chat").len(), 10);
    assert_eq!(index.build_mode("chat"), Some(STANDARD));
}

#[tokio::test]
async fn second_run_over_same_messages_is_idempotent() {
    let h = Harness::standard();
    let input = messages(10);

    h.pipeline(options(4, 2, true)).run(&input).await.unwrap();
    let mut ids = h.index.point_ids("chat");
    ids.sort();
    let before: Vec<_> = ids
        .iter()
        .map(|id| h.index.point("chat", id).unwrap())
        .collect();

    let report = h.pipeline(options(4, 2, false)).run(&input).await.unwrap();
    assert_eq!(report.points_upserted, 10);

    let mut ids_after = h.index.point_ids("chat");
    ids_after.sort();
    assert_eq!(ids_after, ids);
    for (id, earlier) in ids.iter().zip(&before) {
        let later = h.index.point("chat", id).unwrap();
        assert_eq!(later.dense, earlier.dense, "dense vector of {id}");
        assert_eq!(later.sparse, earlier.sparse, "sparse vector of {id}");
        assert_eq!(later.payload, earlier.payload, "payload of {id}");
    }
    assert_eq!(h.index.build_mode("chat"), Some(STANDARD));
}

#[tokio::test]
async fn progress_reports_every_batch() {
    let h = Harness::standard();
    let mut seen = Vec::new();
    h.pipeline(options(4, 2, true))
        .run_with_progress(&messages(9), |p| seen.push((p.batch, p.points_done)))
        .await
        .unwrap();

    assert_eq!(seen, vec![(1, 4), (2, 8), (3, 9)]);
}

#[test]
fn invalid_batch_sizes_are_rejected() {
    let h = Harness::standard();
    for opts in [options(0, 1, true), options(4, 0, true), options(4, 8, true)] {
        let result = EmbeddingPipeline::new(
            h.dense.clone(),
            h.sparse.clone(),
            h.index.clone(),
            opts,
        );
        assert!(matches!(result, Err(EchoError::Config(_))));
    }
}

#[tokio::test]
async fn hybrid_search_ranks_exact_text_first() {
    let h = Harness::standard();
    let input = vec![
        message("conversation_1", 0, "dinner at eight", true),
        message("conversation_1", 1, "flight lands tomorrow morning", false),
        message("conversation_2", 9, "ok", true),
    ];
    h.pipeline(options(4, 2, true)).run(&input).await.unwrap();

    let searcher = HybridSearcher::new(
        h.dense.clone(),
        h.sparse.clone(),
        h.index.clone(),
        "chat",
    );
    let hits = searcher
        .search("flight lands tomorrow morning", 2)
        .await
        .unwrap();

    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].id, "conversation_1-1");
    assert_eq!(
        hits[0].payload.as_ref().map(|p| p.text.as_str()),
        Some("flight lands tomorrow morning")
    );
}
