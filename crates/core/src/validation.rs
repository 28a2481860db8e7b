//! Field-keyed validation errors.
//!
//! Inputs derive `validator::Validate` for per-field rules; this collector
//! adds required-field and cross-field checks on top and is the shape the
//! API serializes. Every failing field is reported in one response.

use std::collections::BTreeMap;

use serde::Serialize;

/// Key used for errors that are not tied to a single input field.
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

/// Message reported for a required field that is missing or blank.
pub const REQUIRED_FIELD: &str = "This field is required.";

/// Field name → list of messages. Ordered so responses are deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    fields: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Single-field error.
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    /// Error not tied to a specific field.
    pub fn non_field(message: impl Into<String>) -> Self {
        Self::field(NON_FIELD_ERRORS, message)
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.fields.entry(field.into()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn messages(&self, field: &str) -> &[String] {
        self.fields.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Merge the outcome of a `validator` derive. Fields that already carry
    /// an error (typically "required") keep only that one.
    pub fn absorb(&mut self, result: Result<(), validator::ValidationErrors>) {
        let Err(source) = result else {
            return;
        };

        for (field, errors) in source.field_errors() {
            if self.contains(&field) {
                continue;
            }
            for error in errors {
                let message = error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| error.code.to_string());
                self.add(field.to_string(), message);
            }
        }
    }

    /// `Ok(value)` when nothing was recorded, otherwise the collected errors.
    pub fn finish<T>(self, value: impl FnOnce() -> T) -> Result<T, ValidationErrors> {
        if self.is_empty() { Ok(value()) } else { Err(self) }
    }
}

impl core::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut first = true;
        for (field, messages) in &self.fields {
            for message in messages {
                if !first {
                    f.write_str("; ")?;
                }
                write!(f, "{field}: {message}")?;
                first = false;
            }
        }
        Ok(())
    }
}

/// Require a non-blank string field, returning it trimmed.
pub fn required(errors: &mut ValidationErrors, field: &str, value: Option<String>) -> Option<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Some(v.trim().to_string()),
        _ => {
            errors.add(field, REQUIRED_FIELD);
            None
        }
    }
}
