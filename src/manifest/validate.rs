// src/manifest/validate.rs

//! Field value validation against schema definitions

use super::schema::{FieldFormat, FieldSchema, FieldType};
use super::value::Value;
use chrono::NaiveDate;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::{LazyLock, Mutex};
use thiserror::Error;

/// Compiled schema patterns, keyed by pattern text
static PATTERNS: LazyLock<Mutex<HashMap<&'static str, Regex>>> = LazyLock::new(|| Mutex::new(HashMap::new()));

fn compiled_pattern(pattern: &'static str) -> Result<Regex, ValidationError> {
    let mut patterns = PATTERNS.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    if let Some(re) = patterns.get(pattern) {
        return Ok(re.clone());
    }
    let re = Regex::new(pattern).map_err(|_| ValidationError::BadPattern(pattern))?;
    patterns.insert(pattern, re.clone());
    Ok(re)
}

/// Why a value was rejected
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("expected {expected}, found {found}")]
    WrongType { expected: &'static str, found: &'static str },

    #[error("'{0}' is not one of the allowed values")]
    NotAllowed(String),

    #[error("'{value}' does not match pattern {pattern}")]
    PatternMismatch { value: String, pattern: &'static str },

    #[error("length {length} outside {min}..={max}")]
    Length { length: usize, min: usize, max: usize },

    #[error("{0} is out of range")]
    OutOfRange(i64),

    #[error("'{0}' is not a valid date")]
    InvalidDate(String),

    #[error("{count} items exceed the limit of {max}")]
    TooManyItems { count: usize, max: usize },

    #[error("duplicate item {0}")]
    DuplicateItem(String),

    #[error("invalid pattern {0}")]
    BadPattern(&'static str),
}

/// Checks a value against a field definition
pub trait Validator {
    fn validate(&self, value: &Value, schema: &FieldSchema) -> Result<(), ValidationError>;
}

/// Validator implementing the subset of JSON schema used by manifests
#[derive(Debug, Default, Clone, Copy)]
pub struct SchemaValidator;

impl SchemaValidator {
    pub fn new() -> Self {
        Self
    }

    fn expected_name(field_type: FieldType) -> &'static str {
        match field_type {
            FieldType::String => "string",
            FieldType::Integer => "integer",
            FieldType::Boolean => "boolean",
            FieldType::Array => "array",
            FieldType::Object => "object",
        }
    }

    fn validate_string(&self, s: &str, schema: &FieldSchema) -> Result<(), ValidationError> {
        if let Some(allowed) = schema.enum_values {
            if !allowed.contains(&s) {
                return Err(ValidationError::NotAllowed(s.to_string()));
            }
        }

        let length = s.chars().count();
        let min = schema.min_length.unwrap_or(0);
        let max = schema.max_length.unwrap_or(usize::MAX);
        if length < min || length > max {
            return Err(ValidationError::Length { length, min, max });
        }

        if let Some(pattern) = schema.pattern {
            let re = compiled_pattern(pattern)?;
            if !re.is_match(s) {
                return Err(ValidationError::PatternMismatch {
                    value: s.to_string(),
                    pattern,
                });
            }
        }

        if schema.format == Some(FieldFormat::Date) && NaiveDate::parse_from_str(s, "%Y-%m-%d").is_err() {
            return Err(ValidationError::InvalidDate(s.to_string()));
        }

        Ok(())
    }

    fn validate_array(&self, items: &[Value], schema: &FieldSchema) -> Result<(), ValidationError> {
        if let Some(max) = schema.max_items {
            if items.len() > max {
                return Err(ValidationError::TooManyItems { count: items.len(), max });
            }
        }

        if schema.unique_items {
            let mut seen = HashSet::new();
            for item in items {
                let form = super::canonical::canonical_form(item, super::canonical::CANONICAL_DEPTH);
                if !seen.insert(form.clone()) {
                    return Err(ValidationError::DuplicateItem(form));
                }
            }
        }

        if let Some(item_schema) = &schema.items {
            for item in items {
                self.validate(item, item_schema)?;
            }
        }

        Ok(())
    }
}

impl Validator for SchemaValidator {
    fn validate(&self, value: &Value, schema: &FieldSchema) -> Result<(), ValidationError> {
        match (schema.field_type, value) {
            (FieldType::String, Value::String(s)) => self.validate_string(s, schema),
            (FieldType::Integer, Value::Integer(i)) => {
                if schema.minimum.is_some_and(|min| *i < min) || schema.maximum.is_some_and(|max| *i > max) {
                    return Err(ValidationError::OutOfRange(*i));
                }
                Ok(())
            }
            (FieldType::Boolean, Value::Boolean(_)) => Ok(()),
            (FieldType::Array, Value::List(items)) => self.validate_array(items, schema),
            (FieldType::Object, Value::Map(_)) => Ok(()),
            (expected, found) => Err(ValidationError::WrongType {
                expected: Self::expected_name(expected),
                found: found.type_name(),
            }),
        }
    }
}
