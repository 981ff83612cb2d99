//! Proving backend capability.
//!
//! The folder never touches a proof system directly. It asks a backend to
//! attest a [`FoldStatement`] and to check an existing [`ChainedProof`], so
//! a different proof system can be dropped in without touching the step
//! relation.
//!
//! Attestation requests can only be built inside this crate, after the step
//! or merge relation has derived the statement. Callers holding a backend
//! can check proofs but cannot get an arbitrary statement attested.

use std::sync::Arc;

use crate::ivc::IvcError;
use crate::types::{ChainedProof, FoldStatement, IvcConfig};

/// Context string for deriving attestation keys from a program id.
const KEY_DERIVATION_CONTEXT: &str = "telemetry-rail 2024 fold attestation key v1";

/// A statement derived by the folder, waiting to be attested.
///
/// Only [`RecursiveFolder`](crate::RecursiveFolder) creates these:
///
/// ```compile_fail
/// use telemetry_ivc::{Blake3Backend, FoldRequest, FoldStatement, ProvingBackend};
///
/// let backend = Blake3Backend::default();
/// let statement = FoldStatement::base(backend.program_id());
/// backend.produce(FoldRequest::new(&statement));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct FoldRequest<'a> {
    statement: &'a FoldStatement,
}

impl<'a> FoldRequest<'a> {
    pub(crate) fn new(statement: &'a FoldStatement) -> Self {
        Self { statement }
    }

    pub fn statement(&self) -> &'a FoldStatement {
        self.statement
    }
}

/// Capability interface to the underlying proof system.
pub trait ProvingBackend {
    /// Program identifier bound into every proof this backend produces.
    fn program_id(&self) -> &str;

    /// Produce proof bytes attesting the requested statement.
    fn produce(&self, request: FoldRequest<'_>) -> Result<Vec<u8>, IvcError>;

    /// Check a proof, explaining why it fails.
    fn check(&self, proof: &ChainedProof) -> Result<(), IvcError>;

    /// Whether a proof verifies.
    fn verify(&self, proof: &ChainedProof) -> bool {
        self.check(proof).is_ok()
    }
}

impl<B: ProvingBackend + ?Sized> ProvingBackend for &B {
    fn program_id(&self) -> &str {
        (**self).program_id()
    }

    fn produce(&self, request: FoldRequest<'_>) -> Result<Vec<u8>, IvcError> {
        (**self).produce(request)
    }

    fn check(&self, proof: &ChainedProof) -> Result<(), IvcError> {
        (**self).check(proof)
    }
}

impl<B: ProvingBackend + ?Sized> ProvingBackend for Arc<B> {
    fn program_id(&self) -> &str {
        (**self).program_id()
    }

    fn produce(&self, request: FoldRequest<'_>) -> Result<Vec<u8>, IvcError> {
        (**self).produce(request)
    }

    fn check(&self, proof: &ChainedProof) -> Result<(), IvcError> {
        (**self).check(proof)
    }
}

/// Reference backend: a keyed BLAKE3 attestation over the fold statement.
///
/// Whoever holds the key can produce proofs, and any holder of the key can
/// check them without replaying the chain. This is an attestation scheme,
/// not a zero-knowledge proof.
#[derive(Clone)]
pub struct Blake3Backend {
    program_id: String,
    key: [u8; 32],
}

impl std::fmt::Debug for Blake3Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Blake3Backend")
            .field("program_id", &self.program_id)
            .finish_non_exhaustive()
    }
}

impl Blake3Backend {
    /// Create a backend whose key is derived from the program id.
    pub fn new(program_id: impl Into<String>) -> Self {
        let program_id = program_id.into();
        let key = blake3::derive_key(KEY_DERIVATION_CONTEXT, program_id.as_bytes());
        Self { program_id, key }
    }

    /// Create a backend with an explicit attestation key.
    pub fn with_key(program_id: impl Into<String>, key: [u8; 32]) -> Self {
        Self {
            program_id: program_id.into(),
            key,
        }
    }

    /// Create a backend from configuration.
    pub fn from_config(config: &IvcConfig) -> Self {
        match config.backend_key {
            Some(key) => Self::with_key(config.program_id.clone(), key),
            None => Self::new(config.program_id.clone()),
        }
    }

    fn attest(&self, statement: &FoldStatement) -> [u8; 32] {
        *blake3::keyed_hash(&self.key, &statement.encode(&self.program_id)).as_bytes()
    }
}

impl Default for Blake3Backend {
    fn default() -> Self {
        Self::from_config(&IvcConfig::default())
    }
}

impl ProvingBackend for Blake3Backend {
    fn program_id(&self) -> &str {
        &self.program_id
    }

    fn produce(&self, request: FoldRequest<'_>) -> Result<Vec<u8>, IvcError> {
        let statement = request.statement();
        statement
            .check_well_formed(&self.program_id)
            .map_err(IvcError::FoldingFailed)?;
        Ok(self.attest(statement).to_vec())
    }

    fn check(&self, proof: &ChainedProof) -> Result<(), IvcError> {
        if proof.proof_bytes().is_empty() {
            return Err(IvcError::VerificationFailed("empty proof bytes".into()));
        }

        proof
            .statement()
            .check_well_formed(&self.program_id)
            .map_err(IvcError::VerificationFailed)?;

        let expected = self.attest(proof.statement());
        if proof.proof_bytes() != expected.as_slice() {
            tracing::debug!(
                expected = %hex::encode(&expected[..8]),
                got_len = proof.proof_bytes().len(),
                "attestation mismatch"
            );
            return Err(IvcError::VerificationFailed(
                "attestation does not match statement".into(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ivc::RecursiveFolder;
    use crate::types::FoldStatement;
    use telemetry_common::{AggregationOutput, Message, MessageNumber};

    fn base_proof(backend: &Blake3Backend) -> ChainedProof {
        let statement = FoldStatement::base(backend.program_id());
        let bytes = backend.produce(FoldRequest::new(&statement)).unwrap();
        ChainedProof::new(statement, bytes)
    }

    #[test]
    fn test_base_proof_verifies() {
        let backend = Blake3Backend::new("test-program");
        assert!(backend.verify(&base_proof(&backend)));
    }

    #[test]
    fn test_other_program_rejects() {
        let backend = Blake3Backend::new("test-program");
        let other = Blake3Backend::new("other-program");
        assert!(!other.verify(&base_proof(&backend)));
    }

    #[test]
    fn test_explicit_key_differs_from_derived() {
        let derived = Blake3Backend::new("test-program");
        let keyed = Blake3Backend::with_key("test-program", [7u8; 32]);
        let proof = base_proof(&keyed);
        assert!(keyed.verify(&proof));
        assert!(!derived.verify(&proof));
    }

    #[test]
    fn test_from_config_uses_key() {
        let config = IvcConfig {
            backend_key: Some([9u8; 32]),
            ..IvcConfig::default()
        };
        let from_config = Blake3Backend::from_config(&config);
        let explicit = Blake3Backend::with_key(config.program_id.clone(), [9u8; 32]);
        assert!(explicit.verify(&base_proof(&from_config)));
    }

    #[test]
    fn test_produce_refuses_malformed_base() {
        let backend = Blake3Backend::default();
        let mut statement = FoldStatement::base(backend.program_id());
        statement.output = AggregationOutput::new(MessageNumber::from(5));
        assert!(matches!(
            backend.produce(FoldRequest::new(&statement)),
            Err(IvcError::FoldingFailed(_))
        ));
    }

    #[test]
    fn test_forged_base_with_valid_tag_still_rejected() {
        // A key holder signing a nonzero base case must not get it accepted.
        let backend = Blake3Backend::default();
        let mut statement = FoldStatement::base(backend.program_id());
        statement.output = AggregationOutput::new(MessageNumber::from(5));
        let tag = backend.attest(&statement).to_vec();
        let forged = ChainedProof::new(statement, tag);
        assert!(!backend.verify(&forged));
    }

    #[test]
    fn test_empty_bytes_rejected() {
        let backend = Blake3Backend::default();
        let proof = ChainedProof::new(FoldStatement::base(backend.program_id()), Vec::new());
        assert!(matches!(backend.check(&proof), Err(IvcError::VerificationFailed(_))));
    }

    #[test]
    fn test_tampered_statement_rejected() {
        let folder = RecursiveFolder::new(Blake3Backend::default());
        let proof = folder.fold_batch(&[Message::new(10u64, 0, 0, 0, 0)]).unwrap();

        let mut tampered = proof.statement().clone();
        tampered.output = AggregationOutput::new(MessageNumber::from(11));
        let spliced = ChainedProof::new(tampered, proof.proof_bytes().to_vec());

        assert!(!folder.backend().verify(&spliced));
        assert!(folder.backend().verify(&proof));
    }

    #[test]
    fn test_shared_backend_delegates() {
        let backend = Arc::new(Blake3Backend::default());
        let proof = base_proof(&backend);
        assert!(backend.verify(&proof));
        assert_eq!(backend.program_id(), crate::types::DEFAULT_PROGRAM_ID);
    }

    #[test]
    fn test_debug_hides_key() {
        let backend = Blake3Backend::with_key("p", [0x42; 32]);
        let rendered = format!("{:?}", backend);
        assert!(rendered.contains("\"p\""));
        assert!(!rendered.contains("66"));
    }
}
