//! Candidate screening between clustering and metrics.

pub mod validator;

pub use validator::{PlausibilityValidator, RejectionReason, ValidationStats, Verdict};
