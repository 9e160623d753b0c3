use crate::{config::ConfigError, model::SchemaError, serialize::SerializeError};
use std::{fmt, ops::Range};
use thiserror::Error as ThisError;

///
/// FilterError
///
/// Every failure the engine reports. All variants are local and
/// deterministic; nothing here is retryable.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum FilterError {
    #[error("malformed filter: {message} at {span} in \"{filter}\"")]
    Malformed {
        message: String,
        span: Span,
        filter: String,
    },

    #[error("{0}")]
    Binding(#[from] BindingError),

    #[error("unsupported constant for property '{property}': {message}")]
    UnsupportedConstant { property: String, message: String },

    #[error("{0}")]
    Schema(#[from] SchemaError),

    #[error("normal form rewrite exceeds the limit of {limit} clauses")]
    NormalFormTooLarge { limit: usize },

    #[error("filter nesting exceeds the limit of {limit} levels")]
    FilterTooDeep { limit: usize },

    #[error("{0}")]
    Serialize(#[from] SerializeError),

    #[error("{0}")]
    Config(#[from] ConfigError),
}

impl FilterError {
    /// Construct a malformed-filter error for a byte span of `filter`.
    pub(crate) fn malformed(message: impl Into<String>, span: Span, filter: &str) -> Self {
        Self::Malformed {
            message: message.into(),
            span,
            filter: filter.to_string(),
        }
    }

    pub(crate) fn unsupported_constant(
        property: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::UnsupportedConstant {
            property: property.into(),
            message: message.into(),
        }
    }

    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::Malformed { .. } => ErrorClass::Malformed,
            Self::Binding(_) => ErrorClass::Precondition,
            Self::UnsupportedConstant { .. } => ErrorClass::Unsupported,
            Self::Schema(_) | Self::Config(_) => ErrorClass::Schema,
            Self::NormalFormTooLarge { .. } | Self::FilterTooDeep { .. } => ErrorClass::Limit,
            Self::Serialize(_) => ErrorClass::Serialize,
        }
    }

    /// The offending text span, for malformed-filter errors.
    #[must_use]
    pub const fn span(&self) -> Option<Span> {
        match self {
            Self::Malformed { span, .. } => Some(*span),
            _ => None,
        }
    }

    #[must_use]
    pub fn display_with_class(&self) -> String {
        format!("{}: {self}", self.class())
    }
}

///
/// BindingError
///
/// Parameter-supply precondition violations.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum BindingError {
    #[error("too many values supplied: filter has {slots} parameter slots")]
    TooManyValues { slots: usize },

    #[error("{remaining} parameter slots are still blank")]
    BlankSlots { remaining: usize },

    #[error("parameter '{filter}' does not belong to the bound filter")]
    UnknownParameter { filter: String },

    #[error("parameter '{filter}' is not bound; bind the filter first")]
    Unbound { filter: String },
}

///
/// Span
/// Half-open byte range into the filter text.
///

#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    #[must_use]
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        Self {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    #[must_use]
    pub const fn range(self) -> Range<usize> {
        self.start..self.end
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

///
/// ErrorClass
/// Coarse taxonomy used by callers that route errors by kind.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorClass {
    Malformed,
    Precondition,
    Unsupported,
    Schema,
    Limit,
    Serialize,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Malformed => "malformed",
            Self::Precondition => "precondition",
            Self::Unsupported => "unsupported",
            Self::Schema => "schema",
            Self::Limit => "limit",
            Self::Serialize => "serialize",
        };
        write!(f, "{label}")
    }
}

///
/// TESTS
///
