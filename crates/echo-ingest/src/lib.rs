// SPDX-FileCopyrightText: 2026 Echo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message ingestion: source export reading and conversation segmentation.

pub mod import;
pub mod segmenter;
pub mod sms;

pub use import::{import_sms, ImportOptions, ImportReport};
pub use segmenter::{conversation_labels, segment};
