//! Core value and error types for the event-loop runtime.
//!
//! This crate provides the foundational types shared by every runtime
//! component: the tagged value representation callbacks trade in, and the
//! error type they fail with.
//!
//! # Overview
//!
//! - [`Value`] - Tagged representation of runtime values
//! - [`RuntimeError`] - Errors raised by callbacks / rejection reasons
//! - [`ErrorKind`] - Classification of runtime errors
//!
//! # Examples
//!
//! ```
//! use core_types::{ErrorKind, RuntimeError, Value};
//!
//! let result = Value::List(vec![Value::Smi(1), Value::String("two".to_string())]);
//! assert!(result.is_truthy());
//!
//! let reason = RuntimeError::new(ErrorKind::Generic, "request failed");
//! assert_eq!(reason.to_string(), "error: request failed");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

mod error;
mod value;

pub use error::{ErrorKind, RuntimeError};
pub use value::Value;
