//! Per-message validity predicate.
//!
//! A message from a real agent is valid when:
//! - `agent_id <= 3000`
//! - `agent_x_location <= 15000`
//! - `agent_x_location < agent_y_location` and `5000 <= agent_y_location <= 20000`
//! - `check_sum == agent_id + agent_x_location + agent_y_location`
//!
//! System messages (`agent_id == 0`) are valid regardless of the other fields.

use thiserror::Error;

use crate::types::Message;
use crate::SYSTEM_AGENT_ID;

/// Largest accepted agent id.
pub const MAX_AGENT_ID: u32 = 3000;

/// Largest accepted X coordinate.
pub const MAX_X_LOCATION: u32 = 15000;

/// Smallest accepted Y coordinate.
pub const MIN_Y_LOCATION: u32 = 5000;

/// Largest accepted Y coordinate.
pub const MAX_Y_LOCATION: u32 = 20000;

/// The first rule a message breaks.
///
/// A violation is an expected outcome, not a failure of the fold: the
/// message is still accepted into the chain but cannot advance the maximum.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum MessageViolation {
    #[error("agent id {0} exceeds 3000")]
    AgentIdOutOfRange(u32),

    #[error("x location {0} exceeds 15000")]
    XLocationOutOfRange(u32),

    #[error("y location {y} is not above x location {x}")]
    YLocationNotAboveX { x: u32, y: u32 },

    #[error("y location {0} is below 5000")]
    YLocationBelowMin(u32),

    #[error("y location {0} exceeds 20000")]
    YLocationAboveMax(u32),

    #[error("checksum operands overflow u32")]
    ChecksumOverflow,

    #[error("checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: u32, actual: u32 },
}

impl Message {
    /// Check every rule and report the first one broken.
    pub fn validate(&self) -> Result<(), MessageViolation> {
        if self.agent_id == SYSTEM_AGENT_ID {
            return Ok(());
        }

        if self.agent_id > MAX_AGENT_ID {
            return Err(MessageViolation::AgentIdOutOfRange(self.agent_id));
        }

        if self.agent_x_location > MAX_X_LOCATION {
            return Err(MessageViolation::XLocationOutOfRange(self.agent_x_location));
        }

        if self.agent_y_location <= self.agent_x_location {
            return Err(MessageViolation::YLocationNotAboveX {
                x: self.agent_x_location,
                y: self.agent_y_location,
            });
        }

        if self.agent_y_location < MIN_Y_LOCATION {
            return Err(MessageViolation::YLocationBelowMin(self.agent_y_location));
        }

        if self.agent_y_location > MAX_Y_LOCATION {
            return Err(MessageViolation::YLocationAboveMax(self.agent_y_location));
        }

        let expected = self
            .agent_id
            .checked_add(self.agent_x_location)
            .and_then(|sum| sum.checked_add(self.agent_y_location))
            .ok_or(MessageViolation::ChecksumOverflow)?;

        if expected != self.check_sum {
            return Err(MessageViolation::ChecksumMismatch {
                expected,
                actual: self.check_sum,
            });
        }

        Ok(())
    }

    /// Whether the message passes the validity predicate.
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

/// Free-function form of [`Message::is_valid`].
pub fn is_valid(message: &Message) -> bool {
    message.is_valid()
}
