//! Error types for routing.

use std::path::PathBuf;

use thiserror::Error;

/// Router-specific errors.
///
/// Everything except [`RouterError::MissingUrlParameter`],
/// [`RouterError::InvalidHostLabel`] and [`RouterError::UnknownRouteName`] is
/// raised while routes are being registered and should abort startup.
#[derive(Debug, Error)]
pub enum RouterError {
    /// A path or domain template could not be compiled.
    #[error("invalid route pattern '{template}': {message}")]
    PatternSyntax {
        /// The template as declared (after group prefixes were applied).
        template: String,
        /// What is wrong with it.
        message: String,
    },

    /// Two routes were registered under the same name.
    #[error("duplicate route name: {0}")]
    DuplicateRouteName(String),

    /// Reverse lookup of a name no route carries.
    #[error("route not found: {0}")]
    UnknownRouteName(String),

    /// `url_for` was called without a value for a placeholder it needs.
    #[error("missing parameter '{param}' for route '{route}'")]
    MissingUrlParameter {
        /// Name of the route being generated.
        route: String,
        /// The placeholder that had no value.
        param: String,
    },

    /// `url_for` got a domain placeholder value that is not a host label.
    #[error("invalid host label '{value}' for parameter '{param}' of route '{route}'")]
    InvalidHostLabel {
        /// Name of the route being generated.
        route: String,
        /// The domain placeholder.
        param: String,
        /// The rejected value.
        value: String,
    },

    /// A constraint could not be built (bad regex source).
    #[error("invalid constraint for '{param}': {message}")]
    InvalidConstraint {
        /// Parameter the constraint was attached to.
        param: String,
        /// Compiler message.
        message: String,
    },

    /// `fallback` was called twice on the same registrar.
    #[error("a fallback route is already registered")]
    FallbackAlreadyRegistered,

    /// A route or group references a middleware alias that was never declared.
    #[error("unknown middleware: {0}")]
    UnknownMiddleware(String),

    /// The configuration file could not be read.
    #[error("failed to read config file '{path}': {source}")]
    ConfigIo {
        /// Path that was being read.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// The configuration could not be parsed.
    #[error("invalid configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

impl RouterError {
    pub(crate) fn pattern(template: &str, message: impl Into<String>) -> Self {
        Self::PatternSyntax {
            template: template.to_string(),
            message: message.into(),
        }
    }
}

/// Result type alias for router operations.
pub type Result<T> = std::result::Result<T, RouterError>;
