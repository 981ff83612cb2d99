//! # telemetry-ivc
//!
//! Recursive proof composition for the telemetry rail.
//!
//! Each fold step consumes the previous [`ChainedProof`] and one telemetry
//! message, re-verifies the previous proof, applies the validity predicate
//! and emits a new proof whose public output is the highest valid message
//! number seen so far. Verifying the last proof of a chain stands in for
//! verifying every step before it.
//!
//! ```text
//!   base_case()          step(π₀, m₁)          step(π₁, m₂)               step(πₙ₋₁, mₙ)
//! ┌────────────┐       ┌────────────┐        ┌────────────┐             ┌────────────┐
//! │ π₀: max=0  │──────►│ π₁: max≥0  │───────►│ π₂: max≥π₁ │──► ... ───►│ πₙ         │
//! └────────────┘       └────────────┘        └────────────┘             └────────────┘
//!
//!   independently built chains can be merged pairwise:
//!
//!        πₐ ─┐
//!            ├─► merge(πₐ, π_b): max = max(outₐ, out_b)
//!        π_b ─┘
//! ```
//!
//! The proof system itself sits behind [`ProvingBackend`]. [`Blake3Backend`]
//! is the reference backend: a keyed BLAKE3 attestation over the fold
//! statement.

pub mod backend;
pub mod ivc;
pub mod types;

pub use backend::{Blake3Backend, FoldRequest, ProvingBackend};
pub use ivc::{next_highest, IvcError, RecursiveFolder};
pub use types::{base_transcript, ChainedProof, FoldStatement, IvcConfig, ProofKind};

pub use telemetry_common::{AggregationOutput, Message, MessageNumber};
