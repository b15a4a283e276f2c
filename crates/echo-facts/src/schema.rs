// SPDX-FileCopyrightText: 2026 Echo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Structured output contracts for the generative agent.
//!
//! Each contract is a Rust type deriving [`JsonSchema`]. The generated JSON
//! Schema is sent with the request and is also the first validation gate on
//! the response; the typed decode plus semantic checks are the second.

use std::marker::PhantomData;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use echo_core::{EchoError, FactSubject, NewFact};
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// --- Fact extraction ---

/// Who the fact is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Subject {
    Me,
    Other,
    Relationship,
}

impl From<Subject> for FactSubject {
    fn from(subject: Subject) -> Self {
        match subject {
            Subject::Me => FactSubject::Me,
            Subject::Other => FactSubject::Other,
            Subject::Relationship => FactSubject::Relationship,
        }
    }
}

/// A fact extracted from a text conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ExtractedFact {
    /// Who the fact is about: 'me' (you), 'other' (the other person), or 'relationship'.
    pub subject: Subject,
    /// A short string describing the relation or attribute.
    pub predicate: String,
    /// The value or description of the fact.
    pub object: String,
    /// A number between 0 and 1 indicating confidence in the fact.
    #[schemars(range(min = 0.0, max = 1.0))]
    pub confidence: f64,
    /// The exact message text where this fact appears.
    pub source_text: String,
    /// The estimated date of the fact's origin (ISO 8601).
    pub fact_date: String,
}

/// List of facts extracted from a text conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ExtractedFacts {
    /// Factual statements extracted from the text messages.
    pub facts: Vec<ExtractedFact>,
}

impl ExtractedFacts {
    /// Semantic checks and conversion into storable facts, preserving order.
    pub fn into_new_facts(self) -> Result<Vec<NewFact>, EchoError> {
        self.facts
            .into_iter()
            .enumerate()
            .map(|(i, fact)| {
                fact.into_new_fact()
                    .map_err(|e| EchoError::Validation(format!("fact {i}: {e}")))
            })
            .collect()
    }
}

impl ExtractedFact {
    fn into_new_fact(self) -> Result<NewFact, String> {
        if !self.confidence.is_finite() || !(0.0..=1.0).contains(&self.confidence) {
            return Err(format!("confidence {} is outside [0, 1]", self.confidence));
        }
        let date = parse_fact_date(&self.fact_date)
            .ok_or_else(|| format!("fact_date {:?} is not a date", self.fact_date))?;
        Ok(NewFact {
            subject: self.subject.into(),
            predicate: self.predicate,
            object: self.object,
            confidence: self.confidence,
            source_text: self.source_text,
            date: date.format("%Y-%m-%d").to_string(),
        })
    }
}

/// Accepts RFC 3339 timestamps, naive `YYYY-MM-DDTHH:MM:SS` and plain dates.
pub fn parse_fact_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt.date());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

// --- Timeline synthesis ---

/// A specific event that occurred on a particular day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TimelineEvent {
    /// The estimated date of the event, in YYYY-MM-DD format.
    pub event_date: String,
    /// A concise, past-tense description of the event.
    pub description: String,
    /// Fact ids from the input that support this event.
    pub supporting_fact_ids: Vec<i64>,
}

/// A significant piece of information or insight learned during the month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct KeyLearning {
    /// A summary of the new fact or insight learned.
    pub description: String,
    /// Fact ids from the input that reveal this learning.
    pub supporting_fact_ids: Vec<i64>,
}

/// A synthesized summary of one month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MonthlyTimeline {
    /// A narrative paragraph summarizing the month's key activities, themes, and emotional tone.
    pub month_summary: String,
    /// A chronologically sorted list of specific, dateable events that happened during the month.
    pub key_events: Vec<TimelineEvent>,
    /// Important, non-event facts or insights learned about the subjects.
    pub key_learnings: Vec<KeyLearning>,
}

// --- Validation ---

/// A compiled output contract for `T`.
pub struct OutputSchema<T> {
    schema: Value,
    validator: jsonschema::Validator,
    _marker: PhantomData<fn() -> T>,
}

impl<T: JsonSchema + DeserializeOwned> OutputSchema<T> {
    pub fn new() -> Result<Self, EchoError> {
        let schema = schemars::schema_for!(T).to_value();
        let validator = jsonschema::validator_for(&schema)
            .map_err(|e| EchoError::Internal(format!("generated schema does not compile: {e}")))?;
        Ok(Self {
            schema,
            validator,
            _marker: PhantomData,
        })
    }

    /// The JSON Schema sent to the agent.
    pub fn json(&self) -> &Value {
        &self.schema
    }

    /// Parse and validate a raw agent response.
    pub fn parse(&self, text: &str) -> Result<T, EchoError> {
        let value: Value = serde_json::from_str(text.trim())
            .map_err(|e| EchoError::Validation(format!("response is not valid JSON: {e}")))?;

        let errors: Vec<String> = self
            .validator
            .iter_errors(&value)
            .map(|e| {
                let path = e.instance_path.to_string();
                if path.is_empty() {
                    e.to_string()
                } else {
                    format!("{path}: {e}")
                }
            })
            .collect();
        if !errors.is_empty() {
            return Err(EchoError::Validation(format!(
                "response violates schema: {}",
                errors.join("; ")
            )));
        }

        serde_json::from_value(value)
            .map_err(|e| EchoError::Validation(format!("response does not decode: {e}")))
    }
}
