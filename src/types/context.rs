//! Evaluation context: the identity a configuration is resolved for.

use crate::error::{Error, ErrorContext};
use crate::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

const DEFAULT_KIND: &str = "user";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationContext {
    pub key: String,
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub attributes: HashMap<String, Value>,
}

impl EvaluationContext {
    pub fn builder(key: impl Into<String>) -> EvaluationContextBuilder {
        EvaluationContextBuilder {
            key: key.into(),
            kind: DEFAULT_KIND.to_string(),
            name: None,
            attributes: HashMap::new(),
        }
    }

    /// Looks up an attribute the way templates address it: `key`, `kind` and
    /// `name` are built in, everything else comes from custom attributes.
    pub fn attribute(&self, name: &str) -> Option<Value> {
        match name {
            "key" => Some(Value::String(self.key.clone())),
            "kind" => Some(Value::String(self.kind.clone())),
            "name" => self.name.clone().map(Value::String),
            other => self.attributes.get(other).cloned(),
        }
    }
}

pub struct EvaluationContextBuilder {
    key: String,
    kind: String,
    name: Option<String>,
    attributes: HashMap<String, Value>,
}

impl EvaluationContextBuilder {
    pub fn kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn set(mut self, attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(attribute.into(), value.into());
        self
    }

    pub fn build(self) -> Result<EvaluationContext> {
        if self.key.trim().is_empty() {
            return Err(Error::validation_with_context(
                "evaluation context key must not be empty",
                ErrorContext::new().with_field_path("context.key"),
            ));
        }
        if self.kind.trim().is_empty() {
            return Err(Error::validation_with_context(
                "evaluation context kind must not be empty",
                ErrorContext::new().with_field_path("context.kind"),
            ));
        }
        Ok(EvaluationContext {
            key: self.key,
            kind: self.kind,
            name: self.name,
            attributes: self.attributes,
        })
    }
}
