//! Runtime error types.
//!
//! This module provides the error type that callbacks fail with and promises
//! reject with, along with its classification.

use std::fmt;

/// The kind of runtime error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Unclassified failure raised by user code
    Generic,
    /// A value had the wrong shape for the operation (e.g. chaining a promise
    /// to itself)
    Type,
    /// Value out of allowed range
    Range,
    /// Aggregate of several underlying errors (all inputs of `any` rejected)
    Aggregate,
    /// Internal runtime error
    Internal,
}

/// An error raised inside a scheduled callback or used as a rejection reason.
///
/// This is the runtime's "thrown value": callbacks fail with it, promises
/// reject with it, and the event loop's error hook receives it.
///
/// # Examples
///
/// ```
/// use core_types::{ErrorKind, RuntimeError};
///
/// let error = RuntimeError::new(ErrorKind::Type, "expected a promise");
/// assert_eq!(error.kind, ErrorKind::Type);
/// assert!(error.causes.is_empty());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeError {
    /// The classification of this error
    pub kind: ErrorKind,
    /// Human-readable error message
    pub message: String,
    /// Underlying errors; non-empty only for `ErrorKind::Aggregate`
    pub causes: Vec<RuntimeError>,
}

impl RuntimeError {
    /// Creates a new error with the given kind and message.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            causes: Vec::new(),
        }
    }

    /// Creates a generic error with the given message.
    pub fn generic(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Generic, message)
    }

    /// Creates an aggregate error from the given underlying errors.
    ///
    /// Used when every input of a many-to-one combinator rejected; `causes`
    /// preserves input order and may be empty.
    pub fn aggregate(causes: Vec<RuntimeError>) -> Self {
        Self {
            kind: ErrorKind::Aggregate,
            message: format!("all of {} inputs rejected", causes.len()),
            causes,
        }
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ErrorKind::Generic => write!(f, "error: {}", self.message),
            ErrorKind::Type => write!(f, "type error: {}", self.message),
            ErrorKind::Range => write!(f, "range error: {}", self.message),
            ErrorKind::Aggregate => write!(f, "aggregate error: {}", self.message),
            ErrorKind::Internal => write!(f, "internal error: {}", self.message),
        }
    }
}

impl std::error::Error for RuntimeError {}
