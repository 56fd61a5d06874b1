//! Entity persistence contract and the bundled in-memory store.

use std::path::Path;

use ahash::AHashMap;
use parking_lot::RwLock;
use phonebook_core::{EntityKey, EntityKind, EntityRecord};

use crate::error::Result;

/// Loads and stores entity snapshots.
///
/// Called outside any arbiter. Records handed out are copies; the core
/// filters them before anything reaches a caller.
pub trait EntityStore: Send + Sync {
    fn fetch(&self, key: &EntityKey) -> Result<Option<EntityRecord>>;

    /// Insert or replace the record under its own key.
    fn save(&self, record: EntityRecord) -> Result<()>;

    /// Store a record that does not exist yet. A zero key is replaced by the
    /// next free key of its kind. `None` when the key is already taken.
    fn insert(&self, record: EntityRecord) -> Result<Option<EntityKey>>;

    /// Returns whether a record was removed.
    fn remove(&self, key: &EntityKey) -> Result<bool>;

    /// Every record of `kind`, ordered by key.
    fn list(&self, kind: EntityKind) -> Result<Vec<EntityRecord>>;
}

#[derive(Debug, Default)]
pub struct MemoryEntityStore {
    records: RwLock<AHashMap<EntityKey, EntityRecord>>,
}

impl MemoryEntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON array of kind-tagged records.
    pub fn from_json(json: &str) -> Result<Self> {
        let records: Vec<EntityRecord> = serde_json::from_str(json)?;
        let map = records.into_iter().map(|r| (r.entity_key(), r)).collect();
        Ok(Self {
            records: RwLock::new(map),
        })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let store = Self::from_json(&std::fs::read_to_string(path)?)?;
        tracing::info!(path = %path.display(), count = store.len(), "entities loaded");
        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

impl EntityStore for MemoryEntityStore {
    fn fetch(&self, key: &EntityKey) -> Result<Option<EntityRecord>> {
        Ok(self.records.read().get(key).cloned())
    }

    fn save(&self, record: EntityRecord) -> Result<()> {
        self.records.write().insert(record.entity_key(), record);
        Ok(())
    }

    fn insert(&self, mut record: EntityRecord) -> Result<Option<EntityKey>> {
        let mut records = self.records.write();
        if record.entity_key().key == 0 {
            let kind = record.kind();
            let next = records
                .keys()
                .filter(|k| k.kind == kind)
                .map(|k| k.key)
                .max()
                .unwrap_or(0)
                + 1;
            record.set_key(next);
        }
        let key = record.entity_key();
        if records.contains_key(&key) {
            return Ok(None);
        }
        records.insert(key, record);
        Ok(Some(key))
    }

    fn remove(&self, key: &EntityKey) -> Result<bool> {
        Ok(self.records.write().remove(key).is_some())
    }

    fn list(&self, kind: EntityKind) -> Result<Vec<EntityRecord>> {
        let mut out: Vec<EntityRecord> = self
            .records
            .read()
            .values()
            .filter(|r| r.kind() == kind)
            .cloned()
            .collect();
        out.sort_by_key(|r| r.entity_key().key);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use phonebook_core::{Company, Person};

    const SEED: &str = r#"[
        {"kind": "Person", "UID": 2, "FirstName": "Ann", "LastName": "Lee", "CoCode": 10},
        {"kind": "Person", "UID": 1, "FirstName": "Bo", "LastName": "Ek"},
        {"kind": "Company", "CoCode": 10, "CommonName": "Acme"}
    ]"#;

    #[test]
    fn test_seed_and_fetch() {
        let store = MemoryEntityStore::from_json(SEED).unwrap();
        assert_eq!(store.len(), 3);

        let rec = store
            .fetch(&EntityKey::new(EntityKind::Person, 2))
            .unwrap()
            .unwrap();
        match rec {
            EntityRecord::Person(p) => {
                assert_eq!(p.first_name, "Ann");
                assert_eq!(p.co_code, 10);
            }
            other => panic!("unexpected record {other:?}"),
        }
        assert!(store
            .fetch(&EntityKey::new(EntityKind::Class, 2))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_list_is_ordered_by_key() {
        let store = MemoryEntityStore::from_json(SEED).unwrap();
        let people = store.list(EntityKind::Person).unwrap();
        let keys: Vec<i64> = people.iter().map(|r| r.entity_key().key).collect();
        assert_eq!(keys, vec![1, 2]);
    }

    #[test]
    fn test_insert_assigns_free_keys() {
        let store = MemoryEntityStore::from_json(SEED).unwrap();

        let key = store
            .insert(EntityRecord::Person(Person::default()))
            .unwrap()
            .unwrap();
        assert_eq!(key, EntityKey::new(EntityKind::Person, 3));

        let taken = EntityRecord::Company(Company {
            co_code: 10,
            common_name: "Other".into(),
            ..Default::default()
        });
        assert_eq!(store.insert(taken).unwrap(), None);
        assert_eq!(
            store
                .insert(EntityRecord::Company(Company::default()))
                .unwrap(),
            Some(EntityKey::new(EntityKind::Company, 11))
        );
        assert_eq!(store.len(), 5);
    }

    #[test]
    fn test_save_and_remove() {
        let store = MemoryEntityStore::new();
        store
            .save(EntityRecord::Company(Company {
                co_code: 3,
                ..Default::default()
            }))
            .unwrap();
        store
            .save(EntityRecord::Person(Person {
                uid: 3,
                ..Default::default()
            }))
            .unwrap();

        let key = EntityKey::new(EntityKind::Company, 3);
        assert!(store.remove(&key).unwrap());
        assert!(!store.remove(&key).unwrap());
        assert_eq!(store.len(), 1);
    }
}
