use std::fmt;
use thiserror::Error as ThisError;

///
/// InternalError
///
/// Structured runtime error with a stable internal classification.
/// Module-local error enums construct these via `From` impls; the
/// (class, origin) pair is the contract callers may match on, the
/// message is diagnostic text only.
///

#[derive(Clone, Debug, ThisError)]
#[error("{message}")]
pub struct InternalError {
    pub class: ErrorClass,
    pub origin: ErrorOrigin,
    pub message: String,
}

impl InternalError {
    /// Construct a classified error.
    pub(crate) fn new(class: ErrorClass, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            class,
            origin,
            message: message.into(),
        }
    }

    /// True for absent-key lookups and removals.
    ///
    /// Dispatch-side callers downgrade this case to "not overridden"
    /// rather than propagating it.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self.class, ErrorClass::NotFound)
    }

    /// True when an index shape or operand pairing is outside the
    /// supported forms.
    #[must_use]
    pub const fn is_unsupported(&self) -> bool {
        matches!(self.class, ErrorClass::Unsupported)
    }

    #[must_use]
    pub fn display_with_class(&self) -> String {
        format!("{}:{}: {}", self.origin, self.class, self.message)
    }
}

///
/// ErrorClass
/// Internal error taxonomy for runtime classification.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorClass {
    /// Lookup or removal addressed a key that is not present.
    NotFound,
    /// Positional or slice index outside the valid range.
    OutOfRange,
    /// A binding's length disagrees with the schema arity.
    Arity,
    /// Two registries disagree on arity.
    ArityMismatch,
    /// A key or row candidate has an unordered or text-as-sequence shape.
    KeyShape,
    /// An index shape or operand pairing outside the recognized forms.
    Unsupported,
    InvariantViolation,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::NotFound => "not_found",
            Self::OutOfRange => "out_of_range",
            Self::Arity => "arity",
            Self::ArityMismatch => "arity_mismatch",
            Self::KeyShape => "key_shape",
            Self::Unsupported => "unsupported",
            Self::InvariantViolation => "invariant_violation",
        };
        write!(f, "{label}")
    }
}

///
/// ErrorOrigin
/// Internal origin taxonomy for runtime classification.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorOrigin {
    Schema,
    Container,
    Index,
    View,
    Algebra,
    Update,
}

impl fmt::Display for ErrorOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Schema => "schema",
            Self::Container => "container",
            Self::Index => "index",
            Self::View => "view",
            Self::Algebra => "algebra",
            Self::Update => "update",
        };
        write!(f, "{label}")
    }
}

///
/// TESTS
///
