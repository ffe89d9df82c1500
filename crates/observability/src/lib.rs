//! # signalhub-observability
//!
//! Structured Logging fuer den Signal-Hub via tracing-subscriber, wahlweise
//! als Text oder JSON.

pub mod logging;

pub use logging::{log_format_gueltig, logging_initialisieren, LogFormat, LoggingError};
