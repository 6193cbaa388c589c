// ── SiteRecord persistence ──
//
// The store is the sole shared mutable resource. The orchestrator writes
// through it only once every provisioning step has succeeded.

mod file;
mod memory;

pub use file::JsonFileStore;
pub use memory::MemoryStore;

use crate::error::StoreError;
use crate::model::{Domain, SiteRecord};

/// Load-by-domain, list-all, save, delete.
pub trait SiteStore {
    fn load(&self, domain: &Domain) -> Result<Option<SiteRecord>, StoreError>;

    /// Every record, sorted by domain.
    fn list(&self) -> Result<Vec<SiteRecord>, StoreError>;

    /// Insert or replace the record for `record.domain`.
    fn save(&self, record: &SiteRecord) -> Result<(), StoreError>;

    /// Remove the record. Returns whether one was present.
    fn delete(&self, domain: &Domain) -> Result<bool, StoreError>;
}
