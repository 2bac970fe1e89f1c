//! Error types.
//!
//! Two layers:
//!
//! - `AppError` terminates the binary with an exit code (bad CLI input, unreadable
//!   source config, store I/O).
//! - `ExtractError` / `FieldError` never leave a source task. They are logged and
//!   turn into "fewer records", never into a failed run.

use thiserror::Error;

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

/// Document-level failures: the whole fetch/extraction for one document is lost.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ExtractError {
    /// Network/transport failure, or a non-success HTTP status.
    #[error("fetch of {url} failed: {message}")]
    Fetch { url: String, message: String },

    /// The anchor (phrase, caption, script id, JSON key) or the region it points
    /// at is absent from the document.
    #[error("{0} not found")]
    NotFound(String),

    /// The region was found but its structure is unusable (unterminated JSON,
    /// wrong type at a path hop, empty table, unreadable PDF).
    #[error("unexpected document shape: {0}")]
    Shape(String),
}

impl ExtractError {
    pub fn fetch(url: &str, message: impl std::fmt::Display) -> Self {
        Self::Fetch {
            url: url.to_string(),
            message: message.to_string(),
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn shape(what: impl Into<String>) -> Self {
        Self::Shape(what.into())
    }
}

/// Field-level failures: only the row or field that produced it is skipped.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FieldError {
    #[error("empty value")]
    Empty,

    /// `-` and friends: the institution did not publish a value for the period.
    #[error("value not published ('{0}')")]
    NotPublished(String),

    #[error("invalid number '{0}'")]
    InvalidNumber(String),

    #[error("rate must be positive, got {0}")]
    NonPositiveRate(f32),

    #[error("invalid date '{0}'")]
    InvalidDate(String),

    #[error("month {0} outside 1-12")]
    MonthOutOfRange(u32),

    #[error("year {0} outside 1940-2100")]
    YearOutOfRange(i32),

    #[error("unsupported term '{0}'")]
    UnsupportedTerm(String),

    /// The token is a column/row label such as "Bindningstid", not a term.
    #[error("'{0}' is a label, not a term")]
    NotATerm(String),

    #[error("invalid LTV bracket '{0}'")]
    InvalidRatio(String),

    #[error("missing field '{0}'")]
    MissingField(String),

    /// An index-reference payload could not be dereferenced for this field.
    #[error("unresolvable reference: {0}")]
    Unresolvable(String),
}

impl FieldError {
    /// Header/label rows are expected in every table; callers skip them quietly.
    pub fn is_label(&self) -> bool {
        matches!(self, FieldError::NotATerm(_))
    }
}
