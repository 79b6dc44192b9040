//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the audio compression core:
//! - Logging and tracing infrastructure
//! - Configuration management (bridge wiring, backend preference)
//!
//! ## Overview
//!
//! This crate contains the runtime utilities that other modules depend on.
//! It establishes the logging conventions and the dependency-injection
//! surface through which hosts hand their bridge implementations to the core.

pub mod config;
pub mod error;
pub mod logging;

pub use error::{Error, Result};
