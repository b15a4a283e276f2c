// SPDX-FileCopyrightText: 2026 Echo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gap-based conversation segmentation.
//!
//! Messages are split into conversations wherever the silence between two
//! consecutive messages is strictly longer than a threshold. Labels are
//! `conv_0`, `conv_1`, ... in time order.
//!
//! Input must already be sorted by timestamp (non-decreasing). This is not
//! checked: on unsorted input every negative gap is treated as "no gap".

use std::time::Duration;

use echo_core::{Message, RawMessage};

/// Label for the `n`th conversation.
pub fn conversation_label(n: usize) -> String {
    format!("conv_{n}")
}

/// Assign a conversation label to every timestamp.
///
/// A new conversation starts when `timestamps[i] - timestamps[i - 1] > gap_seconds`.
/// A gap exactly equal to the threshold continues the current conversation.
pub fn conversation_labels(timestamps: &[f64], gap_seconds: f64) -> Vec<String> {
    let mut labels = Vec::with_capacity(timestamps.len());
    let mut current = 0usize;
    let mut previous: Option<f64> = None;

    for &ts in timestamps {
        if let Some(prev) = previous
            && ts - prev > gap_seconds
        {
            current += 1;
        }
        labels.push(conversation_label(current));
        previous = Some(ts);
    }
    labels
}

/// Segment sorted raw messages and give each a fresh UUID.
pub fn segment(raw: Vec<RawMessage>, gap: Duration) -> Vec<Message> {
    let timestamps: Vec<f64> = raw.iter().map(|m| m.timestamp).collect();
    let labels = conversation_labels(&timestamps, gap.as_secs_f64());

    raw.into_iter()
        .zip(labels)
        .map(|(m, conversation_id)| Message {
            id: uuid::Uuid::new_v4().to_string(),
            conversation_id,
            text: m.text,
            is_from_me: m.is_from_me,
            timestamp: m.timestamp,
            date_iso: m.date_iso,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn empty_input_yields_no_labels() {
        assert!(conversation_labels(&[], 1800.0).is_empty());
        assert!(segment(Vec::new(), Duration::from_secs(1800)).is_empty());
    }

    #[test]
    fn single_message_is_conversation_zero() {
        assert_eq!(conversation_labels(&[42.0], 1800.0), ["conv_0"]);
    }

    #[test]
    fn gap_over_threshold_splits() {
        let labels = conversation_labels(&[0.0, 60.0, 3000.0], 1800.0);
        assert_eq!(labels, ["conv_0", "conv_0", "conv_1"]);
    }

    #[test]
    fn gap_equal_to_threshold_does_not_split() {
        let labels = conversation_labels(&[0.0, 1800.0, 3600.0, 5400.5], 1800.0);
        assert_eq!(labels, ["conv_0", "conv_0", "conv_0", "conv_1"]);
    }

    #[test]
    fn identical_timestamps_stay_together() {
        let labels = conversation_labels(&[10.0, 10.0, 10.0], 0.0);
        assert_eq!(labels, ["conv_0", "conv_0", "conv_0"]);
    }

    #[test]
    fn segment_preserves_fields_and_assigns_unique_ids() {
        let raw = vec![
            RawMessage {
                text: "hey".into(),
                is_from_me: true,
                timestamp: 0.0,
                date_iso: "a".into(),
            },
            RawMessage {
                text: "later".into(),
                is_from_me: false,
                timestamp: 7200.0,
                date_iso: "b".into(),
            },
        ];
        let messages = segment(raw, Duration::from_secs(30 * 60));
        assert_eq!(messages[0].conversation_id, "conv_0");
        assert_eq!(messages[1].conversation_id, "conv_1");
        assert_eq!(messages[1].text, "later");
        assert!(!messages[1].is_from_me);
        assert_ne!(messages[0].id, messages[1].id);
    }

    fn sorted_timestamps() -> impl Strategy<Value = Vec<f64>> {
        prop::collection::vec(0.0f64..10_000.0, 0..200).prop_map(|steps| {
            steps
                .into_iter()
                .scan(0.0, |acc, step| {
                    *acc += step;
                    Some(*acc)
                })
                .collect()
        })
    }

    fn label_index(label: &str) -> usize {
        label.trim_start_matches("conv_").parse().unwrap()
    }

    proptest! {
        #[test]
        fn one_label_per_message(ts in sorted_timestamps(), gap in 0.0f64..5_000.0) {
            prop_assert_eq!(conversation_labels(&ts, gap).len(), ts.len());
        }

        #[test]
        fn counter_advances_exactly_on_large_gaps(ts in sorted_timestamps(), gap in 0.0f64..5_000.0) {
            let labels = conversation_labels(&ts, gap);
            if let Some(first) = labels.first() {
                prop_assert_eq!(first.as_str(), "conv_0");
            }
            for i in 1..ts.len() {
                let step = label_index(&labels[i]) - label_index(&labels[i - 1]);
                let expected = usize::from(ts[i] - ts[i - 1] > gap);
                prop_assert_eq!(step, expected);
            }
        }

        #[test]
        fn segmentation_is_deterministic(ts in sorted_timestamps(), gap in 0.0f64..5_000.0) {
            prop_assert_eq!(conversation_labels(&ts, gap), conversation_labels(&ts, gap));
        }
    }
}
