//! Testing utilities and fixtures
//!
//! [`ScriptedClient`] stands in for the generation service so every stage can
//! be driven offline; [`fixtures`] holds canned requests, analyses and reply
//! bodies.

pub mod fixtures;
pub mod mocks;

pub use mocks::ScriptedClient;
