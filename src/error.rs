//! Setup errors
//!
//! Every fatal condition the resolution pipeline detects maps to one
//! variant. `kind()` groups them into the categories the CLI turns into exit
//! codes.

use std::fmt;
use std::path::PathBuf;

/// Broad category of a setup error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A required file or directory is absent
    NotFound,
    /// A source could not be parsed or a value has the wrong type
    Parse,
    /// Unknown key in the user layer, or a mandatory key is missing
    Schema,
    /// A cross-field rule failed
    Consistency,
    /// An enumerated choice has no matching implementation
    Unsupported,
    /// Filesystem side effect failed
    Io,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::Parse => "PARSE",
            ErrorKind::Schema => "SCHEMA",
            ErrorKind::Consistency => "CONSISTENCY",
            ErrorKind::Unsupported => "UNSUPPORTED",
            ErrorKind::Io => "IO",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A user-layer key with no counterpart in the default layer
#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    /// Dotted path of the key, e.g. `workflow.typo_field`
    pub path: String,
    /// Rendered value the user supplied
    pub value: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.path, self.value)
    }
}

/// Setup errors
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error("configuration file not found: {path}{}", hint_suffix(.hint))]
    ConfigNotFound { path: PathBuf, hint: Option<String> },

    #[error("could not parse configuration file {path}: {message}")]
    ConfigParse { path: PathBuf, message: String },

    #[error(
        "date variable {key}={value} is not in a valid date format \
         (expected YYYYMMDDHH, YYYYMMDDHHMM or similar)"
    )]
    InvalidDateFormat { key: String, value: String },

    #[error("{key} has the wrong type: expected {expected}, found {value}")]
    InvalidType {
        key: String,
        value: String,
        expected: &'static str,
    },

    #[error(
        "invalid key(s) specified in {source_path}:\n{}\nCheck {reference} for allowed user-specified variables",
        join_lines(.violations)
    )]
    UnknownSetting {
        source_path: PathBuf,
        violations: Vec<Violation>,
        reference: PathBuf,
    },

    #[error("mandatory variable \"{key}\" not found in {file}")]
    MissingMandatory { key: String, file: String },

    #[error("{what} ({key}) does not exist: {path}")]
    NotFound {
        what: String,
        key: String,
        path: PathBuf,
    },

    #[error("{flag} has been set, but {key} is null")]
    NullPath { flag: String, key: String },

    #[error("{message}")]
    Consistency { rule: &'static str, message: String },

    #[error("unsupported value {key} = {value}; valid values are {}", .supported.join(" and "))]
    Unsupported {
        key: String,
        value: String,
        supported: Vec<String>,
    },

    #[error(
        "the variable {key}={value} does not have a valid value; possible values are: {key} = [{}]",
        .allowed.join(", ")
    )]
    InvalidValue {
        key: String,
        value: String,
        allowed: Vec<String>,
    },

    #[error("externals configuration file {path} does not contain {component}.{property}")]
    Externals {
        path: PathBuf,
        component: String,
        property: String,
    },

    #[error("{path} already exists and PREEXISTING_DIR_METHOD = {method}; delete the directory or set PREEXISTING_DIR_METHOD to delete or rename")]
    AlreadyExists { path: PathBuf, method: String },

    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("grid generation failed: {0}")]
    Grid(#[from] fcst_grid::GridError),

    #[error("fixed-file mapping failed: {0}")]
    FixFiles(#[from] fcst_fixfiles::FixFileError),
}

fn hint_suffix(hint: &Option<String>) -> String {
    match hint {
        Some(h) => format!(" ({})", h),
        None => String::new(),
    }
}

fn join_lines(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|v| format!("  {}", v))
        .collect::<Vec<_>>()
        .join("\n")
}

impl SetupError {
    /// Category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            SetupError::ConfigNotFound { .. } => ErrorKind::NotFound,
            SetupError::NotFound { .. } => ErrorKind::NotFound,
            SetupError::NullPath { .. } => ErrorKind::NotFound,
            SetupError::Externals { .. } => ErrorKind::NotFound,
            SetupError::ConfigParse { .. } => ErrorKind::Parse,
            SetupError::InvalidDateFormat { .. } => ErrorKind::Parse,
            SetupError::InvalidType { .. } => ErrorKind::Parse,
            SetupError::UnknownSetting { .. } => ErrorKind::Schema,
            SetupError::MissingMandatory { .. } => ErrorKind::Schema,
            SetupError::Consistency { .. } => ErrorKind::Consistency,
            SetupError::InvalidValue { .. } => ErrorKind::Consistency,
            SetupError::AlreadyExists { .. } => ErrorKind::Consistency,
            SetupError::Unsupported { .. } => ErrorKind::Unsupported,
            SetupError::Io { .. } => ErrorKind::Io,
            SetupError::Grid(_) => ErrorKind::Consistency,
            SetupError::FixFiles(fcst_fixfiles::FixFileError::NoFiles { .. }) => ErrorKind::NotFound,
            SetupError::FixFiles(fcst_fixfiles::FixFileError::SuiteRead { .. }) => ErrorKind::NotFound,
            SetupError::FixFiles(fcst_fixfiles::FixFileError::Io { .. }) => ErrorKind::Io,
            SetupError::FixFiles(_) => ErrorKind::Consistency,
        }
    }

    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self.kind() {
            ErrorKind::Io => 1,
            ErrorKind::NotFound => 2,
            ErrorKind::Parse => 3,
            ErrorKind::Schema => 4,
            ErrorKind::Consistency => 5,
            ErrorKind::Unsupported => 6,
        }
    }

    /// Shorthand for a failed cross-field rule
    pub fn consistency(rule: &'static str, message: impl Into<String>) -> Self {
        SetupError::Consistency {
            rule,
            message: message.into(),
        }
    }

    /// Shorthand for an IO failure at a path
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SetupError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for setup operations
pub type SetupResult<T> = Result<T, SetupError>;
