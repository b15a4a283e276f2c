// SPDX-FileCopyrightText: 2026 Echo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation transcript rendering.

use std::fmt::Write;

use echo_core::Message;

/// Separator line closing every turn.
pub const TURN_SEPARATOR: &str = "-----";

/// Render messages as labeled turns, in the order given.
pub fn build_transcript(messages: &[Message]) -> String {
    let mut out = String::new();
    for message in messages {
        // Writing to a String cannot fail.
        let _ = write!(
            out,
            "Date: {}\nSender: {}\nMessage:\n{}\n{TURN_SEPARATOR}\n",
            message.date_iso,
            message.sender_label(),
            message.text
        );
    }
    out
}
