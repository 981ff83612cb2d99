//! IVC (Incrementally Verifiable Computation) step relation.
//!
//! This module folds telemetry messages one at a time into a chain of
//! proofs. Every step re-verifies the proof it extends before producing the
//! next one, so the final proof alone vouches for the whole batch.

use telemetry_common::{AggregationOutput, Message, MessageNumber};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::backend::{Blake3Backend, FoldRequest, ProvingBackend};
use crate::types::{ChainedProof, FoldStatement, IvcConfig, ProofKind};

/// IVC-related errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IvcError {
    #[error("Verification failed: {0}")]
    VerificationFailed(String),

    #[error("Proof folding failed: {0}")]
    FoldingFailed(String),

    #[error("Merge tree depth {depth} exceeds maximum {max}")]
    DepthExceeded { depth: usize, max: usize },
}

/// The step rule on public outputs.
///
/// A message advances the maximum only when it is valid and its number is
/// strictly greater than the current maximum. Everything else (invalid
/// messages, duplicates, replays, stragglers) leaves it unchanged.
pub fn next_highest(prior: &MessageNumber, message: &Message) -> MessageNumber {
    if message.is_valid() && message.message_number > *prior {
        message.message_number.clone()
    } else {
        prior.clone()
    }
}

/// Folds messages into chained proofs.
#[derive(Debug, Clone)]
pub struct RecursiveFolder<B> {
    backend: B,
    config: IvcConfig,
}

impl RecursiveFolder<Blake3Backend> {
    /// Create a folder over the BLAKE3 backend described by `config`.
    pub fn from_config(config: IvcConfig) -> Self {
        let backend = Blake3Backend::from_config(&config);
        Self { backend, config }
    }
}

impl<B: ProvingBackend> RecursiveFolder<B> {
    /// Create a folder with the default configuration.
    pub fn new(backend: B) -> Self {
        let config = IvcConfig {
            program_id: backend.program_id().to_string(),
            ..IvcConfig::default()
        };
        Self { backend, config }
    }

    /// Create a folder with a custom configuration.
    ///
    /// The backend's program id wins over `config.program_id`.
    pub fn with_config(backend: B, mut config: IvcConfig) -> Self {
        if backend.program_id() != config.program_id {
            warn!(
                backend = backend.program_id(),
                config = %config.program_id,
                "program id mismatch between backend and config, using backend"
            );
            config.program_id = backend.program_id().to_string();
        }
        Self { backend, config }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn config(&self) -> &IvcConfig {
        &self.config
    }

    /// Produce the canonical starting proof with output zero.
    pub fn base_case(&self) -> Result<ChainedProof, IvcError> {
        let statement = FoldStatement::base(self.backend.program_id());
        self.attest(statement)
    }

    /// Fold one message onto `prior`.
    ///
    /// `prior` is consumed: a proof extends exactly one chain. Fails with
    /// [`IvcError::VerificationFailed`] if `prior` does not verify, in which
    /// case no proof is produced.
    pub fn step(&self, prior: ChainedProof, message: &Message) -> Result<ChainedProof, IvcError> {
        self.require_verified(&prior, "prior proof")?;

        let prior_max = prior.highest();
        let highest = next_highest(prior_max, message);

        match message.validate() {
            Ok(()) if highest != *prior_max => debug!(
                message_number = %message.message_number,
                previous = %prior_max,
                "maximum advanced"
            ),
            Ok(()) => debug!(
                message_number = %message.message_number,
                current = %prior_max,
                "valid message does not exceed current maximum"
            ),
            Err(violation) => debug!(
                message_number = %message.message_number,
                %violation,
                "invalid message folded without advancing maximum"
            ),
        }

        let step_count = prior
            .step_count()
            .checked_add(1)
            .ok_or_else(|| IvcError::FoldingFailed("step count overflow".into()))?;

        let mut hasher = blake3::Hasher::new();
        hasher.update(b"telemetry_fold_step_v1");
        hasher.update(prior.transcript());
        hasher.update(&message.digest());

        let statement = FoldStatement {
            kind: ProofKind::Step,
            output: AggregationOutput::new(highest),
            step_count,
            depth: prior.depth(),
            transcript: *hasher.finalize().as_bytes(),
        };

        self.attest(statement)
    }

    /// Merge two independently built proofs.
    ///
    /// Both inputs are re-verified. The output is the greater of the two
    /// outputs, so merge order never changes the result.
    pub fn merge(&self, left: ChainedProof, right: ChainedProof) -> Result<ChainedProof, IvcError> {
        self.require_verified(&left, "left proof")?;
        self.require_verified(&right, "right proof")?;

        let depth = left.depth().max(right.depth()) as usize + 1;
        if depth > self.config.max_tree_depth {
            return Err(IvcError::DepthExceeded {
                depth,
                max: self.config.max_tree_depth,
            });
        }

        let step_count = left
            .step_count()
            .checked_add(right.step_count())
            .ok_or_else(|| IvcError::FoldingFailed("step count overflow".into()))?;

        let highest = left.highest().max(right.highest()).clone();

        let mut hasher = blake3::Hasher::new();
        hasher.update(b"telemetry_fold_merge_v1");
        hasher.update(left.transcript());
        hasher.update(right.transcript());

        debug!(
            left = %left.highest(),
            right = %right.highest(),
            depth,
            "merging proofs"
        );

        let statement = FoldStatement {
            kind: ProofKind::Merge,
            output: AggregationOutput::new(highest),
            step_count,
            depth: depth as u32,
            transcript: *hasher.finalize().as_bytes(),
        };

        self.attest(statement)
    }

    /// Extend `prior` with every message in order.
    pub fn extend(&self, prior: ChainedProof, messages: &[Message]) -> Result<ChainedProof, IvcError> {
        messages
            .iter()
            .try_fold(prior, |proof, message| self.step(proof, message))
    }

    /// Fold a batch of messages into a fresh chain.
    pub fn fold_batch(&self, messages: &[Message]) -> Result<ChainedProof, IvcError> {
        let proof = self.extend(self.base_case()?, messages)?;
        info!(
            messages = messages.len(),
            highest = %proof.highest(),
            "batch folded"
        );
        Ok(proof)
    }

    /// Merge proofs pairwise until one remains.
    ///
    /// An odd proof at any level is carried up unchanged. An empty input
    /// yields the base case.
    pub fn fold_tree(&self, proofs: Vec<ChainedProof>) -> Result<ChainedProof, IvcError> {
        let mut current_level = proofs;

        if current_level.is_empty() {
            return self.base_case();
        }

        while current_level.len() > 1 {
            let mut next_level = Vec::with_capacity(current_level.len().div_ceil(2));
            let mut iter = current_level.into_iter();

            while let Some(left) = iter.next() {
                match iter.next() {
                    Some(right) => next_level.push(self.merge(left, right)?),
                    None => next_level.push(left),
                }
            }

            current_level = next_level;
        }

        // The loop leaves exactly one proof.
        match current_level.pop() {
            Some(root) => Ok(root),
            None => self.base_case(),
        }
    }

    fn require_verified(&self, proof: &ChainedProof, what: &str) -> Result<(), IvcError> {
        self.backend.check(proof).map_err(|err| {
            warn!(proof = %hex::encode(&proof.hash()[..8]), %err, "{what} rejected");
            match err {
                IvcError::VerificationFailed(reason) => {
                    IvcError::VerificationFailed(format!("{what}: {reason}"))
                }
                other => other,
            }
        })
    }

    fn attest(&self, statement: FoldStatement) -> Result<ChainedProof, IvcError> {
        let proof_bytes = self.backend.produce(FoldRequest::new(&statement))?;
        Ok(ChainedProof::new(statement, proof_bytes))
    }
}
