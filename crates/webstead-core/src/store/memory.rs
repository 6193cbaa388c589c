use std::cell::RefCell;
use std::collections::BTreeMap;

use super::SiteStore;
use crate::error::StoreError;
use crate::model::{Domain, SiteRecord};

/// In-process store for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RefCell<BTreeMap<Domain, SiteRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: impl IntoIterator<Item = SiteRecord>) -> Self {
        let map = records
            .into_iter()
            .map(|r| (r.domain.clone(), r))
            .collect();
        Self {
            records: RefCell::new(map),
        }
    }

    pub fn len(&self) -> usize {
        self.records.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.borrow().is_empty()
    }
}

impl SiteStore for MemoryStore {
    fn load(&self, domain: &Domain) -> Result<Option<SiteRecord>, StoreError> {
        Ok(self.records.borrow().get(domain).cloned())
    }

    fn list(&self) -> Result<Vec<SiteRecord>, StoreError> {
        Ok(self.records.borrow().values().cloned().collect())
    }

    fn save(&self, record: &SiteRecord) -> Result<(), StoreError> {
        self.records
            .borrow_mut()
            .insert(record.domain.clone(), record.clone());
        Ok(())
    }

    fn delete(&self, domain: &Domain) -> Result<bool, StoreError> {
        Ok(self.records.borrow_mut().remove(domain).is_some())
    }
}
