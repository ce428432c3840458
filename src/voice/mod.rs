//! Voice Read Module
//!
//! Plays prompts to a caller on one active call, collects DTMF digits,
//! retries on invalid input and enforces an inactivity timeout.

pub mod channel;
pub mod collector;
pub mod config;
pub mod media;
pub mod reader;
pub mod report;
pub mod session;
pub mod simulated;

pub use channel::*;
pub use collector::*;
pub use config::*;
pub use reader::*;
pub use report::*;
pub use simulated::*;

use thiserror::Error;

/// Call-control collaborator errors
#[derive(Error, Debug)]
pub enum VoiceError {
    #[error("Playback error: {0}")]
    Playback(String),

    #[error("Hangup error: {0}")]
    Hangup(String),

    #[error("Channel closed")]
    ChannelClosed,
}

/// Result type for collaborator operations
pub type Result<T> = std::result::Result<T, VoiceError>;

/// Terminal failures of a read
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReadError {
    /// Every attempt was consumed without an accepted response
    #[error("attempt limit")]
    AttemptLimit,

    /// The caller stopped pressing digits for the configured timeout
    #[error("timeout limit")]
    TimeoutLimit,

    /// The call ended while the read was in progress
    #[error("hangup")]
    Hangup,

    #[error("invalid options: {0}")]
    InvalidOptions(String),
}

impl ReadError {
    /// Short machine-readable reason
    pub fn reason(&self) -> &'static str {
        match self {
            ReadError::AttemptLimit => "attempt limit",
            ReadError::TimeoutLimit => "timeout limit",
            ReadError::Hangup => "hangup",
            ReadError::InvalidOptions(_) => "invalid options",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_error_reasons() {
        assert_eq!(ReadError::AttemptLimit.reason(), "attempt limit");
        assert_eq!(ReadError::TimeoutLimit.reason(), "timeout limit");
        assert_eq!(ReadError::Hangup.reason(), "hangup");
        assert_eq!(
            ReadError::InvalidOptions("no prompts".to_string()).reason(),
            "invalid options"
        );
    }

    #[test]
    fn test_read_error_display_matches_reason() {
        assert_eq!(ReadError::AttemptLimit.to_string(), "attempt limit");
        assert_eq!(ReadError::TimeoutLimit.to_string(), "timeout limit");
    }
}
