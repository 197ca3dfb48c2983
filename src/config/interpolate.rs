//! `{{ name }}` placeholder rendering for message and instruction templates.
//!
//! Plain names resolve from the caller's variables; `context.<attr>` resolves
//! from the evaluation context. Unknown placeholders render empty.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;
use std::collections::HashMap;

use crate::types::EvaluationContext;

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_\-]*(?:\.[A-Za-z_][A-Za-z0-9_\-]*)?)\s*\}\}")
        .expect("placeholder pattern is valid")
});

const CONTEXT_PREFIX: &str = "context.";

fn display(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub fn render(
    template: &str,
    variables: &HashMap<String, Value>,
    context: &EvaluationContext,
) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures| {
            let name = &caps[1];
            let value = match name.strip_prefix(CONTEXT_PREFIX) {
                Some(attr) => context.attribute(attr),
                None => variables.get(name).cloned(),
            };
            value.as_ref().map(display).unwrap_or_default()
        })
        .into_owned()
}
