use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use veil_core::{RevocationRegistryDefinitionId, RevocationSettings, TimestampPolicy};

use crate::error::CredentialError;
use crate::revocation::registry::{RevocationRegistryDefinition, RevocationRegistryDefinitionPrivate};
use crate::revocation::status_list::{now_timestamp, RevocationStatusList};

/// Owner-side state of one revocation registry.
///
/// Status-list updates are serialised by a writer lock over the snapshot
/// history. Index assignment for issuance is serialised separately.
pub struct RegistryContext {
    id: RevocationRegistryDefinitionId,
    definition: RevocationRegistryDefinition,
    private: RevocationRegistryDefinitionPrivate,
    policy: TimestampPolicy,
    issuance_by_default: bool,
    history: RwLock<Vec<Arc<RevocationStatusList>>>,
    assigned: Mutex<BTreeSet<u32>>,
}

/// Where a revocable credential is bound at issuance.
///
/// Holds its index until committed; dropping an uncommitted config returns
/// the index to the registry.
pub struct RevocationConfig<'a> {
    pub context: &'a RegistryContext,
    pub index: u32,
    /// Snapshot the issued witness is computed against.
    pub status_list: Arc<RevocationStatusList>,
    committed: bool,
}

impl RevocationConfig<'_> {
    /// Keep the index assigned for good.
    pub fn commit(mut self) {
        self.committed = true;
        tracing::debug!(rev_reg_def_id = %self.context.id, index = self.index, "revocation index committed");
    }
}

impl Drop for RevocationConfig<'_> {
    fn drop(&mut self) {
        if !self.committed {
            self.context.release(self.index);
            tracing::debug!(rev_reg_def_id = %self.context.id, index = self.index, "revocation index released");
        }
    }
}

impl RegistryContext {
    /// Take ownership of a registry and publish its first status list.
    pub fn new(
        id: RevocationRegistryDefinitionId,
        definition: RevocationRegistryDefinition,
        private: RevocationRegistryDefinitionPrivate,
        settings: &RevocationSettings,
        timestamp: Option<u64>,
    ) -> Result<Self, CredentialError> {
        let first = RevocationStatusList::create(
            &definition,
            id.clone(),
            &private,
            settings.issuance_by_default,
            timestamp,
        )?;
        Ok(Self {
            id,
            definition,
            private,
            policy: settings.timestamp_policy,
            issuance_by_default: settings.issuance_by_default,
            history: RwLock::new(vec![Arc::new(first)]),
            assigned: Mutex::new(BTreeSet::new()),
        })
    }

    pub fn id(&self) -> &RevocationRegistryDefinitionId {
        &self.id
    }

    pub fn definition(&self) -> &RevocationRegistryDefinition {
        &self.definition
    }

    pub(crate) fn private(&self) -> &RevocationRegistryDefinitionPrivate {
        &self.private
    }

    pub fn policy(&self) -> TimestampPolicy {
        self.policy
    }

    /// Latest published snapshot.
    pub fn current(&self) -> Result<Arc<RevocationStatusList>, CredentialError> {
        latest(&self.read_history()?)
    }

    /// Most recent snapshot published at exactly `timestamp`.
    pub fn status_list_at(&self, timestamp: u64) -> Option<Arc<RevocationStatusList>> {
        self.read_history()
            .ok()?
            .iter()
            .rev()
            .find(|l| l.timestamp == timestamp)
            .cloned()
    }

    /// Every published snapshot, oldest first.
    pub fn history(&self) -> Vec<Arc<RevocationStatusList>> {
        self.read_history().map(|h| h.clone()).unwrap_or_default()
    }

    /// Flip indices and publish the next snapshot.
    pub fn update(
        &self,
        timestamp: Option<u64>,
        revoked: &BTreeSet<u32>,
        unrevoked: &BTreeSet<u32>,
    ) -> Result<Arc<RevocationStatusList>, CredentialError> {
        let mut history = self.write_history()?;
        let last = latest(&history)?;
        self.publish(&mut history, &last, timestamp, revoked, unrevoked)
    }

    pub fn revoke(&self, timestamp: Option<u64>, indices: &[u32]) -> Result<Arc<RevocationStatusList>, CredentialError> {
        self.update(timestamp, &indices.iter().copied().collect(), &BTreeSet::new())
    }

    /// Assign an index for issuance: `index` if given and free, otherwise the
    /// lowest free one.
    ///
    /// On registries that start inactive the index is activated by publishing
    /// a new snapshot. The index stays assigned only once the returned config
    /// is committed.
    pub fn revocation_config(&self, index: Option<u32>) -> Result<RevocationConfig<'_>, CredentialError> {
        let index = self.allocate(index)?;
        let status_list = if self.issuance_by_default {
            self.current()
        } else {
            self.activate(index)
        };
        match status_list {
            Ok(status_list) => Ok(RevocationConfig {
                context: self,
                index,
                status_list,
                committed: false,
            }),
            Err(e) => {
                self.release(index);
                Err(e)
            }
        }
    }

    /// Publish a snapshot with `index` active unless the latest already has it.
    /// The timestamp is derived from the latest snapshot under the writer lock.
    fn activate(&self, index: u32) -> Result<Arc<RevocationStatusList>, CredentialError> {
        let mut history = self.write_history()?;
        let last = latest(&history)?;
        if !last.is_revoked(index) {
            return Ok(last);
        }
        let timestamp = self.next_timestamp(last.timestamp);
        let activated = [index].into_iter().collect();
        self.publish(&mut history, &last, Some(timestamp), &BTreeSet::new(), &activated)
    }

    fn publish(
        &self,
        history: &mut Vec<Arc<RevocationStatusList>>,
        last: &RevocationStatusList,
        timestamp: Option<u64>,
        revoked: &BTreeSet<u32>,
        unrevoked: &BTreeSet<u32>,
    ) -> Result<Arc<RevocationStatusList>, CredentialError> {
        let next = Arc::new(last.update(
            &self.definition,
            &self.private,
            self.policy,
            timestamp,
            revoked,
            unrevoked,
        )?);
        history.push(next.clone());
        Ok(next)
    }

    /// Return an unused index to the pool.
    pub fn release(&self, index: u32) {
        if let Ok(mut assigned) = self.assigned.lock() {
            assigned.remove(&index);
        }
    }

    pub fn assigned_count(&self) -> usize {
        self.assigned.lock().map(|a| a.len()).unwrap_or_default()
    }

    fn allocate(&self, index: Option<u32>) -> Result<u32, CredentialError> {
        let max = self.definition.max_cred_num();
        let mut assigned = self
            .assigned
            .lock()
            .map_err(|_| CredentialError::InvalidConfiguration("allocator lock poisoned".into()))?;
        let index = match index {
            Some(index) => {
                self.definition.check_index(index)?;
                if assigned.contains(&index) {
                    return Err(CredentialError::IndexAlreadyAssigned(index));
                }
                index
            }
            None => (0..max)
                .find(|i| !assigned.contains(i))
                .ok_or(CredentialError::RevocationCapacity { max })?,
        };
        assigned.insert(index);
        tracing::debug!(rev_reg_def_id = %self.id, index, "revocation index assigned");
        Ok(index)
    }

    fn next_timestamp(&self, last: u64) -> u64 {
        let now = now_timestamp();
        if self.policy.permits(last, now) {
            now
        } else {
            last + 1
        }
    }

    fn read_history(
        &self,
    ) -> Result<RwLockReadGuard<'_, Vec<Arc<RevocationStatusList>>>, CredentialError> {
        self.history
            .read()
            .map_err(|_| CredentialError::InvalidConfiguration("registry lock poisoned".into()))
    }

    fn write_history(
        &self,
    ) -> Result<RwLockWriteGuard<'_, Vec<Arc<RevocationStatusList>>>, CredentialError> {
        self.history
            .write()
            .map_err(|_| CredentialError::InvalidConfiguration("registry lock poisoned".into()))
    }
}

fn latest(history: &[Arc<RevocationStatusList>]) -> Result<Arc<RevocationStatusList>, CredentialError> {
    history
        .last()
        .cloned()
        .ok_or_else(|| CredentialError::InvalidConfiguration("registry has no status list".into()))
}
