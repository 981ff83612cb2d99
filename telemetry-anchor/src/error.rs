//! Error types for the state anchor.

use telemetry_ivc::IvcError;
use thiserror::Error;

/// Error type for the monotonic state anchor.
#[derive(Error, Debug)]
pub enum AnchorError {
    /// The submitted proof does not verify. The ledger was not touched.
    #[error("proof rejected: {0}")]
    ProofRejected(String),

    /// The ledger has not been deployed yet.
    #[error("ledger not deployed")]
    NotDeployed,

    /// State/storage error from the ledger collaborator.
    #[error("ledger error: {0}")]
    Ledger(String),

    /// Error raised by the folding layer.
    #[error(transparent)]
    Ivc(#[from] IvcError),

    /// Snapshot (de)serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
