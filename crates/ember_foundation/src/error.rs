//! Error types for the Ember system.
//!
//! Uses `thiserror` for ergonomic error definition with rich context.

use std::fmt;

use thiserror::Error;

use crate::fact::FactId;

/// The main error type for Ember operations.
#[derive(Debug, Clone, Error)]
#[error("{kind}")]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
    /// Optional context about where the error occurred.
    pub context: Option<ErrorContext>,
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Creates a new error with the given kind.
    #[must_use]
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            context: None,
        }
    }

    /// Adds context to this error.
    #[must_use]
    pub fn with_context(mut self, context: ErrorContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Creates a definition error (missing or blank identity).
    #[must_use]
    pub fn definition(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Definition(message.into()))
    }

    /// Creates a schema validation error.
    #[must_use]
    pub fn validation(
        kind: impl Into<String>,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(ErrorKind::Validation {
            kind: kind.into(),
            field: field.into(),
            message: message.into(),
        })
    }

    /// Creates a guard evaluation error.
    #[must_use]
    pub fn guard(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Guard(message.into()))
    }

    /// Creates an unbound variable error.
    #[must_use]
    pub fn unbound(variable: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnboundVariable(variable.into()))
    }

    /// Creates an error raised by rule code, dispatched to `throws` handlers
    /// by its kind name.
    #[must_use]
    pub fn action(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Action {
            kind: kind.into(),
            message: message.into(),
        })
    }

    /// Creates an unknown definition error.
    #[must_use]
    pub fn unknown_definition(id: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnknownDefinition(id.into()))
    }

    /// Creates a limit exceeded error (kill switch triggered).
    #[must_use]
    pub fn limit_exceeded(limit: usize) -> Self {
        Self::new(ErrorKind::LimitExceeded { limit })
    }

    /// Returns the name used to dispatch this error to a `throws` handler.
    #[must_use]
    pub fn kind_name(&self) -> &str {
        match &self.kind {
            ErrorKind::Action { kind, .. } => kind.as_str(),
            ErrorKind::MissingKind | ErrorKind::Validation { .. } | ErrorKind::UnknownType(_) => {
                "ValidationError"
            }
            ErrorKind::Definition(_) | ErrorKind::UnknownDefinition(_) => "DefinitionError",
            ErrorKind::Guard(_) | ErrorKind::DivisionByZero | ErrorKind::UnboundVariable(_) => {
                "GuardError"
            }
            ErrorKind::Projection { .. } => "ProjectionError",
            ErrorKind::FactNotFound(_) => "FactNotFound",
            ErrorKind::LimitExceeded { .. } => "LimitExceeded",
            ErrorKind::Internal(_) => "InternalError",
        }
    }

    /// Returns true for errors raised while evaluating an expression.
    #[must_use]
    pub fn is_guard_error(&self) -> bool {
        self.kind_name() == "GuardError"
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

/// Categorized error kinds for pattern matching.
#[derive(Debug, Clone, Error)]
pub enum ErrorKind {
    /// A fact was asserted without a non-empty string discriminant.
    #[error("fact is missing a non-empty `kind`")]
    MissingKind,

    /// A definition was rejected at add-time.
    #[error("invalid definition: {0}")]
    Definition(String),

    /// A fact violated its schema.
    #[error("validation failed for {kind}.{field}: {message}")]
    Validation {
        /// The fact kind being validated.
        kind: String,
        /// The offending field.
        field: String,
        /// Description of the violation.
        message: String,
    },

    /// A schema referenced a type name that is neither primitive nor a
    /// registered schema.
    #[error("unknown type: {0}")]
    UnknownType(String),

    /// Malformed or ill-typed guard expression.
    #[error("guard error: {0}")]
    Guard(String),

    /// Division by zero inside an expression.
    #[error("division by zero")]
    DivisionByZero,

    /// An expression referenced a variable with no binding.
    #[error("unbound variable: {0}")]
    UnboundVariable(String),

    /// A projection field could not be computed.
    #[error("projection error in field {field}: {message}")]
    Projection {
        /// The output field.
        field: String,
        /// Description of the failure.
        message: String,
    },

    /// Error raised by rule code.
    #[error("{kind}: {message}")]
    Action {
        /// User-visible error kind used for `throws` dispatch.
        kind: String,
        /// Description of the failure.
        message: String,
    },

    /// No rule or query with this identity.
    #[error("unknown definition: {0}")]
    UnknownDefinition(String),

    /// No fact with this identity.
    #[error("fact not found: {0}")]
    FactNotFound(FactId),

    /// Kill switch triggered.
    #[error("limit exceeded: max activations ({limit}) exceeded")]
    LimitExceeded {
        /// The configured limit.
        limit: usize,
    },

    /// Internal error (should not happen).
    #[error("internal error: {0}")]
    Internal(String),
}

/// Context about where an error occurred.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// Rule or query identity.
    pub source: Option<String>,
    /// Stack of stages the error passed through (action, around, after...).
    pub stack: Vec<String>,
}

impl ErrorContext {
    /// Creates a new empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the source definition.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Adds a stack frame.
    #[must_use]
    pub fn with_frame(mut self, frame: impl Into<String>) -> Self {
        self.stack.push(frame.into());
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(source) = &self.source {
            write!(f, "in {source}")?;
        }
        for frame in &self.stack {
            write!(f, " / {frame}")?;
        }
        Ok(())
    }
}
