use crate::application_port::RefreshToken;
use crate::domain_model::SubjectId;
use crate::domain_port::*;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;

struct Entry {
    token: RefreshToken,
    expires_at: DateTime<Utc>,
}

/// Revocation store kept in process memory, for development and tests.
///
/// Expired entries are dropped when read, and swept from the whole map on
/// every write so subjects that never return do not linger.
pub struct MemoryRevocationStore {
    entries: DashMap<SubjectId, Entry>,
    clock: Arc<dyn Clock>,
}

impl MemoryRevocationStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        MemoryRevocationStore {
            entries: DashMap::new(),
            clock,
        }
    }
}

#[async_trait::async_trait]
impl RevocationStore for MemoryRevocationStore {
    async fn put(
        &self,
        subject: &SubjectId,
        token: &RefreshToken,
        ttl_secs: u64,
    ) -> Result<(), StoreError> {
        let now = self.clock.now();
        self.entries.retain(|_, e| e.expires_at > now);

        let expires_at = now + Duration::from_secs(ttl_secs);
        self.entries.insert(
            subject.clone(),
            Entry {
                token: token.clone(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn get(&self, subject: &SubjectId) -> Result<Option<RefreshToken>, StoreError> {
        let now = self.clock.now();
        // copy out before touching the map again, a held guard would deadlock `remove_if`
        let found = self
            .entries
            .get(subject)
            .map(|e| (e.token.clone(), e.expires_at));
        match found {
            Some((token, expires_at)) if now < expires_at => Ok(Some(token)),
            Some(_) => {
                self.entries.remove_if(subject, |_, e| e.expires_at <= now);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, subject: &SubjectId) -> Result<(), StoreError> {
        self.entries.remove(subject);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (Arc<ManualClock>, MemoryRevocationStore) {
        let clock = Arc::new(ManualClock::new(
            DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        ));
        (clock.clone(), MemoryRevocationStore::new(clock))
    }

    #[tokio::test]
    async fn put_overwrites_previous_token() {
        let (_clock, store) = store();
        let subject = SubjectId::from("u1");
        store.put(&subject, &RefreshToken("r1".into()), 60).await.unwrap();
        store.put(&subject, &RefreshToken("r2".into()), 60).await.unwrap();

        assert_eq!(
            store.get(&subject).await.unwrap(),
            Some(RefreshToken("r2".into()))
        );
    }

    #[tokio::test]
    async fn entries_expire_after_ttl() {
        let (clock, store) = store();
        let subject = SubjectId::from("u1");
        store.put(&subject, &RefreshToken("r1".into()), 60).await.unwrap();

        clock.advance(Duration::from_secs(59));
        assert!(store.get(&subject).await.unwrap().is_some());

        clock.advance(Duration::from_secs(1));
        assert_eq!(store.get(&subject).await.unwrap(), None);
        assert!(store.entries.is_empty());
    }

    #[tokio::test]
    async fn writes_sweep_expired_subjects() {
        let (clock, store) = store();
        let gone = SubjectId::from("gone");
        let kept = SubjectId::from("kept");
        store.put(&gone, &RefreshToken("r1".into()), 60).await.unwrap();
        store.put(&kept, &RefreshToken("r2".into()), 600).await.unwrap();

        clock.advance(Duration::from_secs(120));
        store.put(&SubjectId::from("new"), &RefreshToken("r3".into()), 60).await.unwrap();

        // `gone` was never read again
        assert_eq!(store.entries.len(), 2);
        assert!(!store.entries.contains_key(&gone));
        assert!(store.entries.contains_key(&kept));
    }

    #[tokio::test]
    async fn delete_and_delete_all_are_idempotent() {
        let (_clock, store) = store();
        let subject = SubjectId::from("u1");
        store.put(&subject, &RefreshToken("r1".into()), 60).await.unwrap();

        store.delete(&subject).await.unwrap();
        store.delete(&subject).await.unwrap();
        assert_eq!(store.get(&subject).await.unwrap(), None);

        store.put(&subject, &RefreshToken("r2".into()), 60).await.unwrap();
        store.delete_all_for_user(&subject).await.unwrap();
        assert_eq!(store.get(&subject).await.unwrap(), None);
    }

    #[tokio::test]
    async fn subjects_are_independent() {
        let (_clock, store) = store();
        let a = SubjectId::from("a");
        let b = SubjectId::from("b");
        store.put(&a, &RefreshToken("ra".into()), 60).await.unwrap();
        store.put(&b, &RefreshToken("rb".into()), 60).await.unwrap();

        store.delete(&a).await.unwrap();
        assert_eq!(store.get(&b).await.unwrap(), Some(RefreshToken("rb".into())));
    }
}
