//! # telemetry-common
//!
//! Shared data model for the telemetry rail.
//!
//! Agents emit telemetry messages carrying a message number, their id, a
//! position on the grid and a checksum over the other fields. This crate
//! defines those messages, the public output that every chained proof
//! carries, and the pure validity predicate the recursive folder applies to
//! each message.
//!
//! ```text
//! raw messages ──► validator ──► recursive folder ──► chained proof ──► state anchor
//!                  (this crate)   (telemetry-ivc)                      (telemetry-anchor)
//! ```
//!
//! Nothing in this crate performs I/O or holds mutable state.

pub mod types;
pub mod validator;

pub use types::{AggregationOutput, Message, MessageNumber, MessageNumberParseError};
pub use validator::{
    is_valid, MessageViolation, MAX_AGENT_ID, MAX_X_LOCATION, MAX_Y_LOCATION, MIN_Y_LOCATION,
};

/// Agent id reserved for system / no-op messages that skip field checks.
pub const SYSTEM_AGENT_ID: u32 = 0;
