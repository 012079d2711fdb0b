//! # Error Types
//!
//! This module defines error types used throughout the posnet library.
//!
//! Every failure kind gets its own variant so callers can match on exactly
//! the cases they care about: a checksum mismatch, a printer-reported
//! error, and a timed-out transport are three different situations with
//! three different recovery stories.

use std::fmt;

use thiserror::Error;

/// Main error type for posnet operations
#[derive(Debug, Error)]
pub enum PosnetError {
    /// Invalid input to frame encoding (reserved byte in a value or
    /// instruction, bad parameter name length)
    #[error("Cannot encode frame: {0}")]
    Encoding(String),

    /// Missing or misplaced frame markers on decode
    #[error("Invalid frame: {0}")]
    Framing(String),

    /// Checksum mismatch on decode (data corruption or transport error)
    #[error("Checksum mismatch: computed {computed}, frame carried {received}")]
    Checksum { computed: String, received: String },

    /// A frame field cannot be split into name and value
    #[error("Malformed field: {0}")]
    MalformedField(String),

    /// The printer explicitly replied with an `ERR` frame
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The printer replied with a different instruction than expected, or
    /// a standard reply carried unexpected parameters
    #[error("Unexpected response: expected `{expected}`, printer sent `{}`", .frame.instruction)]
    UnexpectedResponse {
        expected: String,
        /// The full decoded reply, kept for diagnostics
        frame: crate::protocol::Frame,
    },

    /// Transport-level errors (connection, configuration)
    #[error("Transport error: {0}")]
    Transport(String),

    /// I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Structured error reported by the printer in an `ERR` reply.
///
/// All fields are optional: the printer includes only the attributes that
/// apply to the failed request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProtocolError {
    /// Error number (wire parameter `?`)
    pub error_number: Option<String>,
    /// Instruction the error refers to (wire parameter `cm`)
    pub instruction: Option<String>,
    /// Request field the error refers to (wire parameter `fd`)
    pub field: Option<String>,
    /// Request token echoed back (wire parameter `@`)
    pub token: Option<String>,
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Printer reported error")?;
        if let Some(number) = &self.error_number {
            write!(f, " {number}")?;
        }
        if let Some(instruction) = &self.instruction {
            write!(f, " for instruction `{instruction}`")?;
        }
        if let Some(field) = &self.field {
            write!(f, " (field `{field}`)")?;
        }
        if let Some(token) = &self.token {
            write!(f, " [token {token}]")?;
        }
        Ok(())
    }
}

impl std::error::Error for ProtocolError {}
