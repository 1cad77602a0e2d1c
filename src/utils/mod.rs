//! Utility functions and data structures
//!
//! - Model and log dumps, and reading a dump back
//! - Metrics and evaluation

pub mod evaluation;
pub mod io;
