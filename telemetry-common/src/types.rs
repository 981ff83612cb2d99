//! Core types for the telemetry rail.

use std::fmt;
use std::str::FromStr;

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Domain separator for message digests.
const MESSAGE_DIGEST_DOMAIN: &[u8] = b"telemetry_rail_message_v1";

/// A message counter of unbounded width.
///
/// Message numbers are not assumed to be unique or ordered in the input
/// stream. They are carried as decimal strings on the wire so values wider
/// than 64 bits survive JSON round trips.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MessageNumber(BigUint);

/// Error returned when a decimal message number cannot be parsed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid message number: {0:?}")]
pub struct MessageNumberParseError(pub String);

impl MessageNumber {
    /// The zero message number, which is also the base-case output.
    pub fn zero() -> Self {
        Self(BigUint::default())
    }

    /// Whether this is the zero message number.
    pub fn is_zero(&self) -> bool {
        self.0 == BigUint::default()
    }

    /// Wrap an arbitrary-width integer.
    pub fn from_biguint(value: BigUint) -> Self {
        Self(value)
    }

    /// Borrow the underlying integer.
    pub fn as_biguint(&self) -> &BigUint {
        &self.0
    }

    /// Length-prefixed big-endian encoding used when hashing.
    ///
    /// The prefix keeps adjacent fields in a transcript from running into
    /// each other.
    pub fn to_transcript_bytes(&self) -> Vec<u8> {
        let be = self.0.to_bytes_be();
        let mut bytes = Vec::with_capacity(4 + be.len());
        bytes.extend_from_slice(&(be.len() as u32).to_le_bytes());
        bytes.extend_from_slice(&be);
        bytes
    }
}

impl From<u64> for MessageNumber {
    fn from(value: u64) -> Self {
        Self(BigUint::from(value))
    }
}

impl From<BigUint> for MessageNumber {
    fn from(value: BigUint) -> Self {
        Self(value)
    }
}

impl FromStr for MessageNumber {
    type Err = MessageNumberParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(MessageNumberParseError(s.to_string()));
        }
        trimmed
            .parse::<BigUint>()
            .map(Self)
            .map_err(|_| MessageNumberParseError(s.to_string()))
    }
}

impl fmt::Display for MessageNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl Serialize for MessageNumber {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for MessageNumber {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct MessageNumberVisitor;

        impl<'de> serde::de::Visitor<'de> for MessageNumberVisitor {
            type Value = MessageNumber;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a non-negative decimal integer (string or number)")
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                v.parse().map_err(E::custom)
            }

            fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(MessageNumber::from(v))
            }

            fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                u64::try_from(v)
                    .map(MessageNumber::from)
                    .map_err(|_| E::custom(format!("message number cannot be negative: {v}")))
            }
        }

        deserializer.deserialize_any(MessageNumberVisitor)
    }
}

/// A single agent telemetry message.
///
/// A pure data record: whether it is valid is computed by
/// [`Message::is_valid`], never stored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Counter assigned by the sender.
    pub message_number: MessageNumber,

    /// Agent identifier. Zero marks a system message.
    pub agent_id: u32,

    /// Agent X coordinate.
    pub agent_x_location: u32,

    /// Agent Y coordinate.
    pub agent_y_location: u32,

    /// Claimed `agent_id + agent_x_location + agent_y_location`.
    pub check_sum: u32,
}

impl Message {
    /// Create a new message.
    pub fn new(
        message_number: impl Into<MessageNumber>,
        agent_id: u32,
        agent_x_location: u32,
        agent_y_location: u32,
        check_sum: u32,
    ) -> Self {
        Self {
            message_number: message_number.into(),
            agent_id,
            agent_x_location,
            agent_y_location,
            check_sum,
        }
    }

    /// Compute the message digest bound into a fold step.
    pub fn digest(&self) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new();
        hasher.update(MESSAGE_DIGEST_DOMAIN);
        hasher.update(&self.message_number.to_transcript_bytes());
        hasher.update(&self.agent_id.to_le_bytes());
        hasher.update(&self.agent_x_location.to_le_bytes());
        hasher.update(&self.agent_y_location.to_le_bytes());
        hasher.update(&self.check_sum.to_le_bytes());
        *hasher.finalize().as_bytes()
    }
}

/// The public output of every chained proof.
///
/// Across a correctly built chain this is the largest message number among
/// the valid messages folded so far, or zero if none were valid.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationOutput {
    /// Highest valid message number seen so far.
    pub current_highest_message_number: MessageNumber,
}

impl AggregationOutput {
    /// Output of the base case.
    pub fn initial() -> Self {
        Self::default()
    }

    /// Wrap a message number as an output.
    pub fn new(current_highest_message_number: MessageNumber) -> Self {
        Self {
            current_highest_message_number,
        }
    }

    /// The tracked maximum.
    pub fn highest(&self) -> &MessageNumber {
        &self.current_highest_message_number
    }
}
