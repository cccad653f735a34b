//! Utility functions and helpers for the nbrp proxy.
//!
//! # Submodules
//!
//! - `logging`: Tracing initialization and credential redaction.
//! - `duration`: Parsing and rendering of duration strings used in configuration.
//!
//! Author: kelexine (<https://github.com/kelexine>)

pub mod duration;
pub mod logging;
