//! Monotonic merge of completed proofs into persisted state.

use telemetry_common::MessageNumber;
use telemetry_ivc::{ChainedProof, ProvingBackend};
use tracing::{debug, info, warn};

use crate::error::AnchorError;
use crate::ledger::{LedgerState, SharedLedger};

/// Result of a successful [`MonotonicAnchor::check`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CheckOutcome {
    /// The proof's output exceeded the persisted value and was written.
    Advanced {
        previous: MessageNumber,
        current: MessageNumber,
    },
    /// The proof's output did not exceed the persisted value. Nothing was
    /// written.
    Unchanged {
        current: MessageNumber,
        candidate: MessageNumber,
    },
}

impl CheckOutcome {
    pub fn advanced(&self) -> bool {
        matches!(self, CheckOutcome::Advanced { .. })
    }

    /// Persisted value after the check.
    pub fn current(&self) -> &MessageNumber {
        match self {
            CheckOutcome::Advanced { current, .. } | CheckOutcome::Unchanged { current, .. } => {
                current
            }
        }
    }
}

/// Accepts completed proofs and folds their output into the ledger.
///
/// The persisted value only moves up: a proof whose output does not exceed
/// it is accepted as a no-op. Submitting the same proof twice, or proofs
/// out of order, therefore never regresses state.
#[derive(Debug, Clone)]
pub struct MonotonicAnchor<B> {
    backend: B,
}

impl<B: ProvingBackend> MonotonicAnchor<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Verify `proof` and merge its output into `ledger`.
    ///
    /// Fails with [`AnchorError::ProofRejected`] without touching the
    /// ledger if the proof does not verify.
    pub fn check<L: LedgerState + ?Sized>(
        &self,
        ledger: &mut L,
        proof: &ChainedProof,
    ) -> Result<CheckOutcome, AnchorError> {
        if let Err(err) = self.backend.check(proof) {
            warn!(%err, "rejecting proof submitted to anchor");
            return Err(AnchorError::ProofRejected(err.to_string()));
        }

        let current = ledger.read_state()?;
        let candidate = proof.highest().clone();

        if candidate > current {
            ledger.write_state(candidate.clone())?;
            info!(
                previous = %current,
                current = %candidate,
                steps = proof.step_count(),
                "highest processed message number advanced"
            );
            Ok(CheckOutcome::Advanced {
                previous: current,
                current: candidate,
            })
        } else {
            debug!(%current, %candidate, "proof does not advance persisted state");
            Ok(CheckOutcome::Unchanged { current, candidate })
        }
    }

    /// [`check`](Self::check) against a shared ledger, holding its write
    /// lock for the whole read-modify-write.
    pub fn check_shared<L: LedgerState>(
        &self,
        ledger: &SharedLedger<L>,
        proof: &ChainedProof,
    ) -> Result<CheckOutcome, AnchorError> {
        ledger.transact(|inner| self.check(inner, proof))
    }
}
