// SPDX-FileCopyrightText: 2026 Echo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Translation of generated JSON Schemas into Gemini's response schema dialect.
//!
//! Gemini accepts an OpenAPI 3.0 subset: no `$ref`, no `$schema`, no
//! `additionalProperties`, nullable types expressed with `nullable: true`,
//! and a short list of numeric and string formats. References are inlined
//! from `$defs`.

use serde_json::{Map, Value};

const MAX_REF_DEPTH: usize = 32;

const SUPPORTED_FORMATS: &[&str] = &["date-time", "enum", "int32", "int64", "float", "double"];

const DROPPED_KEYS: &[&str] = &[
    "$schema",
    "$defs",
    "definitions",
    "$id",
    "title",
    "additionalProperties",
    "default",
    "examples",
];

/// Convert a JSON Schema document into a Gemini `responseSchema`.
pub fn to_response_schema(schema: &Value) -> Value {
    let defs = schema
        .get("$defs")
        .or_else(|| schema.get("definitions"))
        .cloned()
        .unwrap_or(Value::Null);
    convert(schema, &defs, 0)
}

fn convert(node: &Value, defs: &Value, depth: usize) -> Value {
    let Value::Object(map) = node else {
        return node.clone();
    };

    if let Some(Value::String(reference)) = map.get("$ref") {
        let name = reference.rsplit('/').next().unwrap_or(reference);
        if let Some(target) = defs.get(name)
            && depth < MAX_REF_DEPTH
        {
            let mut resolved = convert(target, defs, depth + 1);
            // Sibling description wins over the referenced one.
            if let (Some(desc), Value::Object(out)) = (map.get("description"), &mut resolved) {
                out.insert("description".into(), desc.clone());
            }
            return resolved;
        }
    }

    let mut out = Map::new();
    for (key, value) in map {
        match key.as_str() {
            k if DROPPED_KEYS.contains(&k) || k == "$ref" => {}
            "type" => convert_type(value, &mut out),
            "format" => {
                if value
                    .as_str()
                    .is_some_and(|f| SUPPORTED_FORMATS.contains(&f))
                {
                    out.insert(key.clone(), value.clone());
                }
            }
            "properties" => {
                if let Value::Object(props) = value {
                    let converted = props
                        .iter()
                        .map(|(name, prop)| (name.clone(), convert(prop, defs, depth)))
                        .collect();
                    out.insert(key.clone(), Value::Object(converted));
                }
            }
            "items" => {
                out.insert(key.clone(), convert(value, defs, depth));
            }
            "anyOf" | "oneOf" => {
                if let Value::Array(options) = value {
                    out.insert(
                        "anyOf".into(),
                        Value::Array(options.iter().map(|o| convert(o, defs, depth)).collect()),
                    );
                }
            }
            _ => {
                out.insert(key.clone(), value.clone());
            }
        }
    }
    Value::Object(out)
}

/// `"type": ["string", "null"]` becomes `"type": "string", "nullable": true`.
fn convert_type(value: &Value, out: &mut Map<String, Value>) {
    match value {
        Value::Array(types) => {
            let mut concrete = types.iter().filter(|t| t.as_str() != Some("null"));
            if types.len() > 1 && types.iter().any(|t| t.as_str() == Some("null")) {
                out.insert("nullable".into(), Value::Bool(true));
            }
            if let Some(first) = concrete.next() {
                out.insert("type".into(), first.clone());
            }
        }
        other => {
            out.insert("type".into(), other.clone());
        }
    }
}
