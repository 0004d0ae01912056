//! Error type shared by the resolver, the bulk coordinator and the
//! attribute builder.
//!
//! Every failure the client can recover from inside a bulk loop is one of
//! these variants. Commands that operate on a single resource let them
//! propagate to the caller instead.

use thiserror::Error;

/// Errors produced while resolving, building or mutating resources.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// No resource of the kind matched the token by ID or by name.
    #[error("No {kind} with a name or ID of '{token}' exists.")]
    NotFound {
        /// Human readable resource kind, e.g. `security group`.
        kind: String,
        /// The token the user supplied.
        token: String,
    },

    /// The token did not match an ID and matched more than one name.
    #[error("More than one {kind} exists with the name '{token}'.")]
    AmbiguousName {
        kind: String,
        token: String,
        /// How many resources carried the name.
        matches: usize,
    },

    /// A flag combination violates a documented rule. Raised before any
    /// request is made.
    #[error("{0}")]
    Validation(String),

    /// The remote API (or the transport in front of it) rejected a call.
    #[error("{}", describe_backend(.status, .message))]
    Backend {
        /// HTTP status, when the failure came from a response.
        status: Option<u16>,
        message: String,
    },

    /// One or more items of a bulk mutation failed.
    #[error("{failed} of {total} {noun} failed to {verb}.")]
    Batch {
        failed: usize,
        total: usize,
        /// Plural resource noun, e.g. `routers`.
        noun: String,
        /// Mutation verb, e.g. `delete`.
        verb: String,
    },
}

impl Error {
    /// Builds a [`Error::Validation`] from anything printable.
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation(message.into())
    }

    /// Builds a [`Error::Backend`] carrying an HTTP status.
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Error::Backend {
            status: Some(status),
            message: message.into(),
        }
    }

    /// Builds a [`Error::Backend`] for failures without a response.
    pub fn transport(message: impl Into<String>) -> Self {
        Error::Backend {
            status: None,
            message: message.into(),
        }
    }

    /// Returns true for the two resolution failures.
    pub fn is_resolution(&self) -> bool {
        matches!(self, Error::NotFound { .. } | Error::AmbiguousName { .. })
    }

    /// Returns the HTTP status for backend failures that have one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Backend { status, .. } => *status,
            _ => None,
        }
    }
}

fn describe_backend(status: &Option<u16>, message: &str) -> String {
    match status {
        Some(code) => format!("{} (HTTP {})", message, code),
        None => message.to_string(),
    }
}

/// Result alias used across the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;
