// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Table-driven validation of client-supplied parameter values.

use crate::method::AnalysisMethodName;
use crate::params::{self, ParamDescriptor, ParamKind};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

/// Which descriptor subset a validator covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamFilter {
    File,
    NonFile,
    All,
}

impl ParamFilter {
    fn accepts(&self, descriptor: &ParamDescriptor) -> bool {
        match self {
            ParamFilter::File => descriptor.kind == ParamKind::File,
            ParamFilter::NonFile => descriptor.kind != ParamKind::File,
            ParamFilter::All => true,
        }
    }
}

/// Validation failures surfaced to the client as `BadParameter`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("unknown parameter: {0}")]
    UnknownParameter(String),
    #[error("missing required parameter: {0}")]
    MissingParameter(String),
    #[error("parameter {name} expects {expected}")]
    WrongType { name: String, expected: String },
}

/// Checks a value map against a descriptor table: only recognized keys,
/// required keys present, each value coerced to its declared type, lists
/// where `is_list`.
#[derive(Debug, Clone)]
pub struct Validator {
    descriptors: Vec<ParamDescriptor>,
}

impl Validator {
    pub fn new(descriptors: Vec<ParamDescriptor>, filter: ParamFilter) -> Self {
        Self {
            descriptors: descriptors
                .into_iter()
                .filter(|d| filter.accepts(d))
                .collect(),
        }
    }

    /// Validator over the engine constructor parameters.
    pub fn for_globals(filter: ParamFilter) -> Self {
        Self::new(params::global_descriptors(), filter)
    }

    /// Validator over one method's specific parameters.
    pub fn for_method(method: AnalysisMethodName, filter: ParamFilter) -> Self {
        Self::new(params::method_descriptors(method), filter)
    }

    pub fn descriptors(&self) -> &[ParamDescriptor] {
        &self.descriptors
    }

    /// Validate and coerce `values`. Returns the coerced map; keys the
    /// table does not recognize are errors, required keys may not be
    /// absent. File-typed descriptors accept string filenames here (the
    /// processor substitutes absolute paths later).
    pub fn validate(
        &self,
        values: &BTreeMap<String, Value>,
    ) -> Result<BTreeMap<String, Value>, ValidationError> {
        for key in values.keys() {
            if !self.descriptors.iter().any(|d| &d.name == key) {
                return Err(ValidationError::UnknownParameter(key.clone()));
            }
        }

        let mut coerced = BTreeMap::new();
        for descriptor in &self.descriptors {
            match values.get(&descriptor.name) {
                Some(Value::Null) | None => {
                    if descriptor.required {
                        return Err(ValidationError::MissingParameter(descriptor.name.clone()));
                    }
                }
                Some(value) => {
                    coerced.insert(descriptor.name.clone(), coerce(descriptor, value)?);
                }
            }
        }
        Ok(coerced)
    }
}

fn coerce(descriptor: &ParamDescriptor, value: &Value) -> Result<Value, ValidationError> {
    if descriptor.is_list {
        let items = match value {
            Value::Array(items) => items.clone(),
            // A bare scalar is accepted as a single-element list.
            other => vec![other.clone()],
        };
        let coerced = items
            .iter()
            .map(|item| coerce_scalar(descriptor, item))
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(Value::Array(coerced));
    }
    coerce_scalar(descriptor, value)
}

fn coerce_scalar(descriptor: &ParamDescriptor, value: &Value) -> Result<Value, ValidationError> {
    let wrong_type = || ValidationError::WrongType {
        name: descriptor.name.clone(),
        expected: type_name(descriptor).to_string(),
    };
    match descriptor.kind {
        ParamKind::Str | ParamKind::File => match value {
            Value::String(_) => Ok(value.clone()),
            _ => Err(wrong_type()),
        },
        ParamKind::Int => match value {
            Value::Number(n) if n.is_i64() || n.is_u64() => Ok(value.clone()),
            Value::String(s) => s
                .parse::<i64>()
                .map(Value::from)
                .map_err(|_| wrong_type()),
            _ => Err(wrong_type()),
        },
        ParamKind::Float => match value {
            Value::Number(_) => Ok(value.clone()),
            Value::String(s) => s
                .parse::<f64>()
                .map(Value::from)
                .map_err(|_| wrong_type()),
            _ => Err(wrong_type()),
        },
        ParamKind::Bool => match value {
            Value::Bool(_) => Ok(value.clone()),
            Value::String(s) => match s.as_str() {
                "true" | "True" | "1" => Ok(Value::Bool(true)),
                "false" | "False" | "0" => Ok(Value::Bool(false)),
                _ => Err(wrong_type()),
            },
            _ => Err(wrong_type()),
        },
    }
}

fn type_name(descriptor: &ParamDescriptor) -> &'static str {
    let scalar = match descriptor.kind {
        ParamKind::Str => "a string",
        ParamKind::Int => "an integer",
        ParamKind::Float => "a number",
        ParamKind::Bool => "a boolean",
        ParamKind::File => "a filename",
    };
    if descriptor.is_list {
        match descriptor.kind {
            ParamKind::Str => "a list of strings",
            ParamKind::Int => "a list of integers",
            ParamKind::Float => "a list of numbers",
            ParamKind::Bool => "a list of booleans",
            ParamKind::File => "a list of filenames",
        }
    } else {
        scalar
    }
}

#[cfg(test)]
#[path = "validate_tests.rs"]
mod tests;
