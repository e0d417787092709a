//! # AppError
//!
//! Centralized error handling for the barter backend.
//! Maps domain-specific failures to actionable error types.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// The primary error type for all domain and service operations.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (e.g., Ad, Proposal, Page)
    #[error("{0} not found with ID {1}")]
    NotFound(String, String),

    /// One or more request fields failed validation
    #[error("validation error: {0}")]
    ValidationError(ValidationErrors),

    /// No valid identity on the request (missing/expired token, bad credentials)
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated caller lacks rights over the target resource
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Resource already exists (e.g., duplicate username)
    #[error("conflict: {0}")]
    Conflict(String),

    /// Infrastructure failure (e.g., DB down, hashing task panicked)
    #[error("internal service error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn not_found(entity: &str, id: impl fmt::Display) -> Self {
        Self::NotFound(entity.to_string(), id.to_string())
    }

    /// Shorthand for a single-field validation failure.
    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        let mut errors = ValidationErrors::default();
        errors.push(field, message);
        Self::ValidationError(errors)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}

/// A single rejected field together with a human readable reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Field-level validation failures collected over a whole request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub fn push(&mut self, field: &str, message: impl Into<String>) {
        self.0.push(FieldError {
            field: field.to_string(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn fields(&self) -> &[FieldError] {
        &self.0
    }

    /// Returns `value` when nothing was collected, the errors otherwise.
    pub fn into_result<T>(self, value: T) -> Result<T> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(AppError::ValidationError(self))
        }
    }

    /// Whether any error has been recorded for `field`.
    pub fn has(&self, field: &str) -> bool {
        self.0.iter().any(|e| e.field == field)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", error.field, error.message)?;
        }
        Ok(())
    }
}

/// A specialized Result type for barter domain logic.
pub type Result<T> = std::result::Result<T, AppError>;
