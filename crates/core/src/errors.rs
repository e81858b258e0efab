use std::fmt;

use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("unknown {kind} code `{code}`")]
    UnknownCode { kind: &'static str, code: String },
}

/// Failures surfaced by the assistant and its adapters. Expected user
/// mistakes never reach this type; they are answered in conversation.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("integration failure: {0}")]
    Integration(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InterfaceErrorKind {
    BadRequest,
    ServiceUnavailable,
    Internal,
}

impl InterfaceErrorKind {
    fn label(self) -> &'static str {
        match self {
            Self::BadRequest => "bad request",
            Self::ServiceUnavailable => "service unavailable",
            Self::Internal => "internal error",
        }
    }
}

/// What an inbound surface may report back to its caller. `message` is for
/// logs only; callers see [`InterfaceError::user_message`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InterfaceError {
    kind: InterfaceErrorKind,
    message: String,
    correlation_id: String,
}

impl InterfaceError {
    pub fn kind(&self) -> InterfaceErrorKind {
        self.kind
    }

    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    pub fn user_message(&self) -> &'static str {
        match self.kind {
            InterfaceErrorKind::BadRequest => {
                "The request could not be processed. Check inputs and try again."
            }
            InterfaceErrorKind::ServiceUnavailable => {
                "The service is temporarily unavailable. Please retry shortly."
            }
            InterfaceErrorKind::Internal => "An unexpected internal error occurred.",
        }
    }
}

impl fmt::Display for InterfaceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} [{}]", self.kind.label(), self.message, self.correlation_id)
    }
}

impl std::error::Error for InterfaceError {}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let kind = match &self {
            Self::Domain(_) => InterfaceErrorKind::BadRequest,
            Self::Persistence(_) | Self::Integration(_) => InterfaceErrorKind::ServiceUnavailable,
            Self::Configuration(_) => InterfaceErrorKind::Internal,
        };
        InterfaceError { kind, message: self.to_string(), correlation_id: correlation_id.into() }
    }
}
