use crate::domain_port::*;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

/// Credentials held in memory, typically seeded from settings.
pub struct MemoryCredentialRepo {
    records: DashMap<String, CredentialRecord>,
}

impl MemoryCredentialRepo {
    pub fn new(records: impl IntoIterator<Item = CredentialRecord>) -> Self {
        let records = records
            .into_iter()
            .map(|r| (r.login_id.clone(), r))
            .collect();
        MemoryCredentialRepo { records }
    }
}

#[async_trait::async_trait]
impl CredentialRepo for MemoryCredentialRepo {
    async fn get_by_login_id(
        &self,
        login_id: &str,
    ) -> Result<Option<CredentialRecord>, StoreError> {
        Ok(self.records.get(login_id).map(|r| r.value().clone()))
    }

    async fn create(&self, record: &CredentialRecord) -> Result<(), StoreError> {
        match self.records.entry(record.login_id.clone()) {
            Entry::Occupied(_) => Err(StoreError::Duplicate(record.login_id.clone())),
            Entry::Vacant(slot) => {
                slot.insert(record.clone());
                Ok(())
            }
        }
    }
}
