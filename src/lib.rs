//! # Narrative Workshop
//!
//! A staged essay-workshop pipeline. An essay is analyzed, turned into
//! workshop items carrying candidate rewrites, and every rewrite is validated
//! with a deterministic pre-filter plus a semantic judge before it is
//! returned. Each stage is a separate, stateless call; state crosses stages
//! only through an opaque continuation token.
//!
//! ## Usage
//!
//! ```bash
//! narrative-workshop serve [--bind 0.0.0.0:8080]
//! narrative-workshop run --essay essay.txt --prompt "Describe a challenge"
//! narrative-workshop check draft.txt
//! ```
//!
//! ## Modules
//!
//! - `app` - Logging setup, process configuration and fatal error reporting
//! - `config` - Layered pipeline configuration (defaults, TOML, environment)
//! - `controller` - Stateless stage dispatcher and response envelope
//! - `error` - Crate error type and client/server classification
//! - `generation` - Generation client seam, HTTP implementation and reply parsing
//! - `model` - Requests, analyses, workshop items and validation results
//! - `pipeline` - Analysis, item generation and validate/regenerate stages
//! - `rules` - Deterministic prose rule engine
//! - `server` - HTTP endpoint for stage dispatch and health
//! - `token` - Continuation token codec
//! - `testing` - Scripted generation client and fixtures (`testing` feature)
pub mod app;
pub mod config;
pub mod controller;
pub mod error;
pub mod generation;
pub mod model;
pub mod pipeline;
pub mod rules;
pub mod server;
pub mod token;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use error::{Error, Result};
