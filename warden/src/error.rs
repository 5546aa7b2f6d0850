//! Unified error types for warden.
//!
//! Three failure kinds exist in the core (see the module docs of
//! [`crate::args`] for the first):
//!
//! - a scanner returning no value is *not* an error — the resolver falls
//!   back to the argument's default;
//! - [`ValidationError`] is the only user-facing failure: it carries the
//!   offending argument's canonical alias and a localized message key, and
//!   callers surface the localized text to the end user while logging the
//!   internal diagnostic separately;
//! - everything else is an internal error: logged in full, the user only
//!   ever sees the generic `error.internal` string.

use crate::localize::Localizer;

/// The main error type for warden operations.
#[derive(Debug, thiserror::Error)]
pub enum WardenError {
    /// A validation predicate rejected an argument value.
    #[error("validation: {0}")]
    Validation(#[from] ValidationError),

    /// Task store error.
    #[error("store: {0}")]
    Store(#[from] StoreError),

    /// Configuration error.
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    /// IO error.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    /// Task join error.
    #[error("task: {0}")]
    Task(String),

    /// Generic internal error.
    #[error("{0}")]
    Internal(String),
}

impl WardenError {
    /// Create an internal error.
    #[inline]
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Render the message shown to the end user.
    ///
    /// Validation errors localize through `catalog`; every other variant
    /// collapses to the generic internal-error string, never the raw
    /// diagnostic text.
    pub fn user_message(&self, catalog: &dyn Localizer) -> String {
        match self {
            Self::Validation(v) => v.localized(catalog),
            _ => catalog.string("error.internal"),
        }
    }

    /// Whether this error should be shown to the user verbatim.
    #[must_use]
    pub const fn is_user_facing(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

impl From<tokio::task::JoinError> for WardenError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Task(err.to_string())
    }
}

/// Result type alias for warden operations.
pub type Result<T> = std::result::Result<T, WardenError>;

/// A rejected argument value.
///
/// Carries everything needed to build the user-facing text: the canonical
/// (already localized) alias of the argument, the message key, and the
/// positional format arguments beyond the alias.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("argument `{arg}` failed `{message_key}`")]
pub struct ValidationError {
    /// Canonical alias of the offending argument.
    pub arg: String,
    /// Localized message key (`error.validation.*`).
    pub message_key: String,
    /// Extra format arguments appended after the alias.
    pub args: Vec<String>,
}

impl ValidationError {
    /// Create a validation error for `arg` with the given message key.
    pub fn new(arg: impl Into<String>, message_key: impl Into<String>) -> Self {
        Self {
            arg: arg.into(),
            message_key: message_key.into(),
            args: Vec::new(),
        }
    }

    /// Append a format argument.
    #[must_use]
    pub fn with_arg(mut self, value: impl Into<String>) -> Self {
        self.args.push(value.into());
        self
    }

    /// Render the localized user-facing text. `{0}` is always the
    /// argument alias; further markers take from `self.args`.
    #[must_use]
    pub fn localized(&self, catalog: &dyn Localizer) -> String {
        let mut all: Vec<&str> = Vec::with_capacity(self.args.len() + 1);
        all.push(&self.arg);
        all.extend(self.args.iter().map(String::as_str));
        catalog.format(&self.message_key, &all)
    }
}

/// Error type for task store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// IO error.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    /// Task not found.
    #[error("task not found: {0}")]
    NotFound(String),
}

/// Result type for task store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Error type for configuration operations.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO error.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error.
    #[error("parse: {0}")]
    Parse(#[from] serde_json::Error),

    /// Invalid value.
    #[error("invalid: {0}")]
    Invalid(String),
}

impl ConfigError {
    /// Create an invalid value error.
    #[inline]
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::Invalid(msg.into())
    }
}

/// Result type for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::localize::StaticCatalog;

    #[test]
    fn test_error_conversions() {
        let store_err = StoreError::NotFound("task-1".into());
        let err: WardenError = store_err.into();
        assert!(matches!(err, WardenError::Store(_)));

        let val_err = ValidationError::new("time", "error.validation.non_null");
        let err: WardenError = val_err.into();
        assert!(err.is_user_facing());
    }

    #[test]
    fn test_user_message_split() {
        let catalog = StaticCatalog::english();

        let err: WardenError = ValidationError::new("time", "error.validation.non_null").into();
        assert_eq!(err.user_message(&catalog), "argument `time` is required");

        // Internal detail must never leak to the user.
        let err = WardenError::internal("connection refused to 10.0.0.3");
        let shown = err.user_message(&catalog);
        assert!(!shown.contains("10.0.0.3"));
        assert_eq!(shown, catalog.string("error.internal"));
    }
}
