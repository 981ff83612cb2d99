//! Ledger collaborator for the persisted maximum.
//!
//! The real ledger (account, signed transaction, funding) lives outside this
//! workspace. The anchor talks to it through [`LedgerState`]; the in-memory
//! ledger here is for development and testing.

use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use telemetry_common::MessageNumber;

use crate::error::AnchorError;

/// Read/write access to the single persisted value.
///
/// Authorization of writes is the implementor's concern.
pub trait LedgerState {
    /// Current persisted maximum.
    fn read_state(&self) -> Result<MessageNumber, AnchorError>;

    /// Replace the persisted maximum.
    fn write_state(&mut self, value: MessageNumber) -> Result<(), AnchorError>;
}

/// The system's only durable fact.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedState {
    /// Highest message number accepted so far.
    pub highest_processed_message_number: MessageNumber,
}

/// Serializable image of an [`InMemoryLedger`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    /// `None` before deployment.
    pub state: Option<PersistedState>,

    /// Number of writes applied since deployment.
    pub write_count: u64,
}

/// In-memory ledger for development/testing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InMemoryLedger {
    state: Option<PersistedState>,
    write_count: u64,
}

impl InMemoryLedger {
    /// A ledger that has not been deployed. Reads and writes fail.
    pub fn undeployed() -> Self {
        Self {
            state: None,
            write_count: 0,
        }
    }

    /// A freshly deployed ledger holding zero.
    pub fn deploy() -> Self {
        Self {
            state: Some(PersistedState::default()),
            write_count: 0,
        }
    }

    /// Deploy in place, resetting to zero.
    pub fn redeploy(&mut self) {
        *self = Self::deploy();
    }

    pub fn is_deployed(&self) -> bool {
        self.state.is_some()
    }

    pub fn state(&self) -> Option<&PersistedState> {
        self.state.as_ref()
    }

    /// Writes applied since deployment.
    pub fn write_count(&self) -> u64 {
        self.write_count
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            state: self.state.clone(),
            write_count: self.write_count,
        }
    }

    pub fn from_snapshot(snapshot: LedgerSnapshot) -> Self {
        Self {
            state: snapshot.state,
            write_count: snapshot.write_count,
        }
    }

    /// Serialize the ledger to JSON.
    pub fn to_json(&self) -> Result<String, AnchorError> {
        Ok(serde_json::to_string(&self.snapshot())?)
    }

    /// Restore a ledger from JSON.
    pub fn from_json(json: &str) -> Result<Self, AnchorError> {
        let snapshot: LedgerSnapshot = serde_json::from_str(json)?;
        Ok(Self::from_snapshot(snapshot))
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::deploy()
    }
}

impl LedgerState for InMemoryLedger {
    fn read_state(&self) -> Result<MessageNumber, AnchorError> {
        self.state
            .as_ref()
            .map(|s| s.highest_processed_message_number.clone())
            .ok_or(AnchorError::NotDeployed)
    }

    fn write_state(&mut self, value: MessageNumber) -> Result<(), AnchorError> {
        let state = self.state.as_mut().ok_or(AnchorError::NotDeployed)?;
        state.highest_processed_message_number = value;
        self.write_count += 1;
        Ok(())
    }
}

/// A ledger shared between threads.
///
/// Each transaction holds the write lock for its whole read-modify-write,
/// so concurrent submissions are applied one at a time.
#[derive(Debug)]
pub struct SharedLedger<L> {
    inner: Arc<RwLock<L>>,
}

impl<L> Clone for SharedLedger<L> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<L: LedgerState> SharedLedger<L> {
    pub fn new(ledger: L) -> Self {
        Self {
            inner: Arc::new(RwLock::new(ledger)),
        }
    }

    /// Current persisted maximum.
    pub fn read_state(&self) -> Result<MessageNumber, AnchorError> {
        let guard = self
            .inner
            .read()
            .map_err(|_| AnchorError::Ledger("ledger lock poisoned".into()))?;
        guard.read_state()
    }

    /// Run `f` against the ledger under the write lock.
    pub fn transact<T, F>(&self, f: F) -> Result<T, AnchorError>
    where
        F: FnOnce(&mut L) -> Result<T, AnchorError>,
    {
        let mut guard = self
            .inner
            .write()
            .map_err(|_| AnchorError::Ledger("ledger lock poisoned".into()))?;
        f(&mut *guard)
    }

    /// Inspect the ledger under the read lock.
    pub fn with_ledger<T>(&self, f: impl FnOnce(&L) -> T) -> Result<T, AnchorError> {
        let guard = self
            .inner
            .read()
            .map_err(|_| AnchorError::Ledger("ledger lock poisoned".into()))?;
        Ok(f(&*guard))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deploy_starts_at_zero() {
        let ledger = InMemoryLedger::deploy();
        assert!(ledger.is_deployed());
        assert!(ledger.read_state().unwrap().is_zero());
        assert_eq!(ledger.write_count(), 0);
    }

    #[test]
    fn test_undeployed_rejects_access() {
        let mut ledger = InMemoryLedger::undeployed();
        assert!(matches!(ledger.read_state(), Err(AnchorError::NotDeployed)));
        assert!(matches!(
            ledger.write_state(MessageNumber::from(1)),
            Err(AnchorError::NotDeployed)
        ));
    }

    #[test]
    fn test_write_counts() {
        let mut ledger = InMemoryLedger::deploy();
        ledger.write_state(MessageNumber::from(9)).unwrap();
        assert_eq!(ledger.read_state().unwrap(), MessageNumber::from(9));
        assert_eq!(ledger.write_count(), 1);
    }

    #[test]
    fn test_redeploy_resets() {
        let mut ledger = InMemoryLedger::deploy();
        ledger.write_state(MessageNumber::from(9)).unwrap();
        ledger.redeploy();
        assert!(ledger.read_state().unwrap().is_zero());
        assert_eq!(ledger.write_count(), 0);
    }

    #[test]
    fn test_snapshot_json() {
        let mut ledger = InMemoryLedger::deploy();
        ledger.write_state(MessageNumber::from(77)).unwrap();

        let json = ledger.to_json().unwrap();
        assert!(json.contains("\"77\""));
        let restored = InMemoryLedger::from_json(&json).unwrap();
        assert_eq!(restored, ledger);

        assert!(matches!(
            InMemoryLedger::from_json("{not json"),
            Err(AnchorError::Serialization(_))
        ));
    }

    #[test]
    fn test_shared_ledger_transact() {
        let shared = SharedLedger::new(InMemoryLedger::deploy());
        let other = shared.clone();
        shared
            .transact(|ledger| ledger.write_state(MessageNumber::from(3)))
            .unwrap();
        assert_eq!(other.read_state().unwrap(), MessageNumber::from(3));
        assert_eq!(other.with_ledger(|l| l.write_count()).unwrap(), 1);
    }
}
