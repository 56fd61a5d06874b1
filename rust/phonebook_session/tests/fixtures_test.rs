//! The sample seed files shipped under `fixtures/` load and wire together.

use std::path::PathBuf;
use std::sync::Arc;

use phonebook_core::{EntityKey, EntityKind, EntityRecord, JsonRoleSource, PermissionTable};
use phonebook_session::{
    Counters, Directory, LookupCache, LookupSeed, LookupTables, MemoryCredentialStore,
    MemoryEntityStore, SessionConfig, SessionManager,
};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../fixtures")
        .join(name)
}

#[tokio::test]
async fn test_sample_fixtures() {
    let permissions =
        Arc::new(PermissionTable::load(&JsonRoleSource::new(fixture("roles.json"))).unwrap());
    let credentials = Arc::new(MemoryCredentialStore::load(fixture("accounts.json")).unwrap());
    let store = Arc::new(MemoryEntityStore::load(fixture("entities.json")).unwrap());
    let seed = LookupSeed::load(fixture("lookups.json")).unwrap();
    let tables = LookupTables::build(store.as_ref(), seed).unwrap();
    assert_eq!(tables.companies.name(11), Some("Globex"));
    assert_eq!(tables.job_titles.code("Engineer"), Some(1));

    let sessions = SessionManager::new(credentials, permissions, SessionConfig::default());
    let dir = Directory::new(sessions, store, LookupCache::new(tables), Counters::new());

    let s = dir.sign_in("morgan", "changeme").await.unwrap();
    match dir
        .view(&s.token, EntityKey::new(EntityKind::Person, 3))
        .await
        .unwrap()
    {
        EntityRecord::Person(p) => {
            assert_eq!(p.home_city, "Reno");
            assert!(p.emergency_contact_name.is_empty());
            assert!(p.primary_email.is_empty());
        }
        other => panic!("unexpected record {other:?}"),
    }
}
