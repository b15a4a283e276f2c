// SPDX-FileCopyrightText: 2026 Echo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fact extraction and timeline synthesis.
//!
//! [`FactExtractor`] drives the generative agent over every stored
//! conversation under a concurrency bound and persists validated facts.
//! [`TimelineSynthesizer`] condenses each month's facts into a
//! [`MonthlyTimeline`], and [`write_master_timeline`] merges the monthly files
//! into one markdown document.

pub mod extractor;
pub mod master;
pub mod rate;
pub mod schema;
pub mod timeline;
pub mod transcript;

pub use extractor::{
    ExtractionOptions, ExtractionReport, FactExtractor, UnitOutcome, UnitState, FACT_INSTRUCTION,
};
pub use master::{render_master_timeline, write_master_timeline, MasterReport};
pub use rate::RateLimiter;
pub use schema::{ExtractedFact, ExtractedFacts, MonthlyTimeline, OutputSchema, TimelineEvent};
pub use timeline::{MonthOutcome, TimelineOptions, TimelineReport, TimelineSynthesizer};
pub use transcript::build_transcript;
