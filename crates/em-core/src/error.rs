//! # AppError
//!
//! Centralized error handling for the Embers ecosystem. `Gone` is distinct
//! from `NotFound` so clients can tell "never existed" from "existed,
//! expired".

use thiserror::Error;

/// The primary error type for all em-core operations.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (e.g., Post, Room, RoomMessage)
    #[error("{0} not found with ID {1}")]
    NotFound(String, String),

    /// Resource existed but its validity window has passed
    #[error("{0} has expired")]
    Gone(String),

    /// Membership/authorization failure (e.g., posting into a room the
    /// caller never joined)
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Room is at max_users
    #[error("capacity exceeded: {0}")]
    CapacityExceeded(String),

    /// Validation failure (e.g., bad duration, empty content)
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A post has used up all of its renewals
    #[error("renewal limit exceeded: a post can be renewed at most 3 times")]
    RenewalLimitExceeded,

    /// Infrastructure failure (e.g., DB down, media store timeout)
    #[error("internal service error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Internal(format!("serialization failure: {err}"))
    }
}

/// A specialized Result type for Embers logic.
pub type Result<T> = std::result::Result<T, AppError>;
