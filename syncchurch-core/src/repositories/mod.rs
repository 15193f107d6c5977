//! Repository traits for the data access layer
//!
//! Services talk to storage only through these traits. The default implementations
//! are written against [`crate::storage::KeyValueStore`], so any backend that can
//! store strings by key can host them.

pub mod login_attempt;

pub use login_attempt::{AttemptLedger, KeyValueAttemptLedger};
