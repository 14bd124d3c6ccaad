//! Integration test suite for the event-loop runtime
//!
//! This crate provides integration tests that verify the scheduler and the
//! promise primitive work together correctly across component boundaries.

/// Re-export components for test convenience
pub mod components {
    pub use async_runtime;
    pub use core_types;
}
