//! # telemetry-anchor
//!
//! Monotonic state anchor for the telemetry rail.
//!
//! The anchor holds a single durable value, the highest processed message
//! number, and accepts completed chained proofs against it:
//!
//! ```text
//!   Uninitialized ──deploy──► Initialized(0)
//!
//!   Initialized(n) ──check(π), out(π) > n──► Initialized(out(π))
//!   Initialized(n) ──check(π), out(π) ≤ n──► Initialized(n)
//! ```
//!
//! The merge is commutative and idempotent, so the order in which proofs
//! arrive never changes the final value. Only the verified public output of
//! a proof is trusted; raw messages never reach the anchor.
//!
//! Persistence and write authorization belong to the ledger collaborator
//! behind [`LedgerState`].

pub mod anchor;
pub mod error;
pub mod ledger;

pub use anchor::{CheckOutcome, MonotonicAnchor};
pub use error::AnchorError;
pub use ledger::{InMemoryLedger, LedgerSnapshot, LedgerState, PersistedState, SharedLedger};
