//! Forecast experiment setup
//!
//! This crate resolves the layered configuration of a regional forecast
//! experiment (defaults, constants, machine, fixed files and user
//! settings) into one validated document, derives the settings the
//! workflow needs, and writes the variable-definitions file workflow
//! scripts source.

pub mod config;
pub mod derive;
pub mod document;
pub mod emit;
pub mod error;
pub mod logging;
pub mod paths;
pub mod pipeline;
pub mod rules;
pub mod sweep;
pub mod value;

pub use document::Document;
pub use error::{ErrorKind, SetupError, SetupResult, Violation};
pub use logging::{init_logging, LogConfig, LogFormat, LogLevel};
pub use paths::UshLayout;
pub use pipeline::{Resolution, Setup};
pub use rules::{Stage, Warning};
pub use value::{Mapping, Value};
