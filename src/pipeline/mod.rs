//! The three workshop stages
//!
//! - [`analysis`]: voice, experience and rubric analysis of the essay
//! - [`generation`]: workshop items from independent generation batches
//! - [`retry`]: two-tier validation with bounded regeneration
//!
//! Stages share nothing in memory. Everything one stage needs from the
//! previous one travels in the continuation token.

pub mod analysis;
pub mod calibration;
pub mod generation;
pub mod prompts;
pub mod retry;
pub mod validator;

pub use analysis::run_analysis;
pub use generation::run_generation;
pub use retry::{run_validation_stage, ItemReport, RetryCoordinator, RetryState};
pub use validator::{BatchValidation, QualityValidator};
