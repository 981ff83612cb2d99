//! Core types for recursive folding.

use std::env;

use serde::{Deserialize, Serialize};
use telemetry_common::{AggregationOutput, MessageNumber};

/// Default program identifier bound into every proof.
pub const DEFAULT_PROGRAM_ID: &str = "telemetry-rail/check-batch-v1";

/// Default bound on the height of a merge tree.
pub const DEFAULT_MAX_TREE_DEPTH: usize = 32;

/// Configuration for the recursive folder and its backend.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IvcConfig {
    /// Program identifier. Proofs built under one program never verify
    /// under another.
    pub program_id: String,

    /// Maximum height of a merge tree.
    pub max_tree_depth: usize,

    /// Explicit attestation key for the BLAKE3 backend. When absent the key
    /// is derived from `program_id`.
    #[serde(default, with = "serde_opt_key_hex")]
    pub backend_key: Option<[u8; 32]>,
}

impl Default for IvcConfig {
    fn default() -> Self {
        Self {
            program_id: DEFAULT_PROGRAM_ID.to_string(),
            max_tree_depth: DEFAULT_MAX_TREE_DEPTH,
            backend_key: None,
        }
    }
}

impl IvcConfig {
    /// Load configuration from the environment.
    ///
    /// - `TELEMETRY_IVC_PROGRAM_ID`
    /// - `TELEMETRY_IVC_MAX_TREE_DEPTH`
    /// - `TELEMETRY_IVC_BACKEND_KEY` (64 hex chars)
    ///
    /// Missing or unparsable values fall back to the defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let program_id = env::var("TELEMETRY_IVC_PROGRAM_ID")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(defaults.program_id);

        let max_tree_depth: usize = env::var("TELEMETRY_IVC_MAX_TREE_DEPTH")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.max_tree_depth);

        let backend_key = env::var("TELEMETRY_IVC_BACKEND_KEY")
            .ok()
            .and_then(|s| parse_key_hex(&s));

        if backend_key.is_none() && env::var("TELEMETRY_IVC_BACKEND_KEY").is_ok() {
            tracing::warn!("TELEMETRY_IVC_BACKEND_KEY is not 32 hex-encoded bytes, deriving key from program id");
        }

        Self {
            program_id,
            max_tree_depth,
            backend_key,
        }
    }
}

fn parse_key_hex(s: &str) -> Option<[u8; 32]> {
    let s = s.trim();
    let hex = s.strip_prefix("0x").unwrap_or(s);
    hex::decode(hex).ok()?.try_into().ok()
}

/// Serde for an optional 32-byte key as a hex string.
mod serde_opt_key_hex {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(key: &Option<[u8; 32]>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match key {
            Some(bytes) => serializer.serialize_some(&hex::encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<[u8; 32]>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value: Option<String> = Option::deserialize(deserializer)?;
        match value {
            None => Ok(None),
            Some(s) => super::parse_key_hex(&s).map(Some).ok_or_else(|| {
                serde::de::Error::custom(format!("expected 32 hex-encoded bytes, got {:?}", s))
            }),
        }
    }
}

/// How a proof was produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProofKind {
    /// The canonical start of a chain.
    Base,
    /// One message folded onto a prior proof.
    Step,
    /// Two proofs merged pairwise.
    Merge,
}

impl ProofKind {
    fn tag(self) -> u8 {
        match self {
            ProofKind::Base => 0,
            ProofKind::Step => 1,
            ProofKind::Merge => 2,
        }
    }
}

/// The public statement a chained proof attests to.
///
/// Statements other than the base case are derived by the folder and are
/// read-only outside this crate:
///
/// ```compile_fail
/// use telemetry_ivc::{AggregationOutput, FoldStatement, MessageNumber, ProofKind};
///
/// let forged = FoldStatement {
///     kind: ProofKind::Step,
///     output: AggregationOutput::new(MessageNumber::from(1_000_000u64)),
///     step_count: 1,
///     depth: 0,
///     transcript: [0u8; 32],
/// };
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoldStatement {
    /// How this proof was produced.
    pub(crate) kind: ProofKind,

    /// Public output.
    pub(crate) output: AggregationOutput,

    /// Number of messages folded into the chain.
    pub(crate) step_count: u64,

    /// Height of the merge tree (0 for a linear chain).
    pub(crate) depth: u32,

    /// Running commitment over everything folded so far.
    pub(crate) transcript: [u8; 32],
}

impl FoldStatement {
    pub fn kind(&self) -> ProofKind {
        self.kind
    }

    pub fn output(&self) -> &AggregationOutput {
        &self.output
    }

    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn transcript(&self) -> &[u8; 32] {
        &self.transcript
    }

    /// The canonical base-case statement for a program.
    pub fn base(program_id: &str) -> Self {
        Self {
            kind: ProofKind::Base,
            output: AggregationOutput::initial(),
            step_count: 0,
            depth: 0,
            transcript: base_transcript(program_id),
        }
    }

    /// Canonical encoding of the statement, bound to a program.
    pub fn encode(&self, program_id: &str) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(96);
        bytes.extend_from_slice(b"telemetry_fold_statement_v1");
        bytes.extend_from_slice(&(program_id.len() as u32).to_le_bytes());
        bytes.extend_from_slice(program_id.as_bytes());
        bytes.push(self.kind.tag());
        bytes.extend_from_slice(&self.output.current_highest_message_number.to_transcript_bytes());
        bytes.extend_from_slice(&self.step_count.to_le_bytes());
        bytes.extend_from_slice(&self.depth.to_le_bytes());
        bytes.extend_from_slice(&self.transcript);
        bytes
    }

    /// Structural rules every statement must satisfy, independent of the
    /// attestation.
    pub fn check_well_formed(&self, program_id: &str) -> Result<(), String> {
        match self.kind {
            ProofKind::Base => {
                if !self.output.current_highest_message_number.is_zero() {
                    return Err(format!(
                        "base case claims nonzero output {}",
                        self.output.current_highest_message_number
                    ));
                }
                if self.step_count != 0 || self.depth != 0 {
                    return Err("base case claims folded messages".into());
                }
                if self.transcript != base_transcript(program_id) {
                    return Err("base case transcript is not canonical".into());
                }
            }
            ProofKind::Step => {
                if self.step_count == 0 {
                    return Err("step proof claims zero folded messages".into());
                }
            }
            ProofKind::Merge => {
                if self.depth == 0 {
                    return Err("merge proof claims zero depth".into());
                }
            }
        }
        Ok(())
    }
}

/// Transcript of the base case for a program.
pub fn base_transcript(program_id: &str) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    hasher.update(b"telemetry_fold_base_v1");
    hasher.update(program_id.as_bytes());
    *hasher.finalize().as_bytes()
}

/// A proof together with the public output it binds.
///
/// Produced once by the folder and consumed by the next fold step or by the
/// state anchor. There are no mutating methods; extending a chain always
/// yields a new proof.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainedProof {
    statement: FoldStatement,

    /// Backend attestation over the statement.
    #[serde(with = "serde_hex_bytes")]
    proof_bytes: Vec<u8>,
}

impl ChainedProof {
    pub(crate) fn new(statement: FoldStatement, proof_bytes: Vec<u8>) -> Self {
        Self {
            statement,
            proof_bytes,
        }
    }

    /// The attested statement.
    pub fn statement(&self) -> &FoldStatement {
        &self.statement
    }

    /// Public output.
    pub fn output(&self) -> &AggregationOutput {
        &self.statement.output
    }

    /// Highest valid message number attested by this proof.
    pub fn highest(&self) -> &MessageNumber {
        &self.statement.output.current_highest_message_number
    }

    pub fn kind(&self) -> ProofKind {
        self.statement.kind
    }

    pub fn step_count(&self) -> u64 {
        self.statement.step_count
    }

    pub fn depth(&self) -> u32 {
        self.statement.depth
    }

    pub fn transcript(&self) -> &[u8; 32] {
        &self.statement.transcript
    }

    pub fn proof_bytes(&self) -> &[u8] {
        &self.proof_bytes
    }

    /// Hash of the whole proof, for logging and audit.
    pub fn hash(&self) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"telemetry_chained_proof_v1");
        hasher.update(&self.statement.transcript);
        hasher.update(&self.proof_bytes);
        *hasher.finalize().as_bytes()
    }
}

/// Serde for proof bytes as a hex string.
mod serde_hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        hex::decode(&s).map_err(serde::de::Error::custom)
    }
}
