//! # podcrawl Common Library
//!
//! Shared code for the podcrawl crates:
//! - Error type and result alias
//! - TOML configuration loading and resolution
//! - Tracing subscriber initialization

pub mod config;
pub mod error;
pub mod logging;

pub use error::{Error, Result};
