//! Shared fixtures: three roles, four accounts, a small directory.

#![allow(dead_code)]

use std::sync::Arc;

use phonebook_core::entity::recognized_fields;
use phonebook_core::{EntityKind, FieldPerm, Perm, PermissionTable, Role};
use phonebook_session::{
    Account, Counters, Directory, LookupCache, LookupSeed, LookupTables, MemoryCredentialStore,
    MemoryEntityStore, SessionConfig, SessionManager,
};

pub const ADMIN: i64 = 1;
pub const MANAGER: i64 = 2;
pub const VIEWER: i64 = 3;

pub const PASSWORD: &str = "correct horse";

pub fn roles() -> Vec<Role> {
    let mut admin = Vec::new();
    for kind in [EntityKind::Person, EntityKind::Company, EntityKind::Class] {
        for field in recognized_fields(kind) {
            admin.push(FieldPerm::new(
                kind,
                field,
                Perm::VIEW | Perm::CREATE | Perm::MODIFY | Perm::DELETE | Perm::PRINT,
            ));
        }
    }
    admin.push(FieldPerm::new(EntityKind::Service, "Shutdown", Perm::EXECUTE));

    vec![
        Role {
            rid: ADMIN,
            name: "Administrator".into(),
            descr: "Full access".into(),
            perms: admin,
        },
        Role {
            rid: MANAGER,
            name: "Manager".into(),
            descr: "People managers".into(),
            perms: vec![
                FieldPerm::new(EntityKind::Person, "FirstName", Perm::VIEW),
                FieldPerm::new(EntityKind::Person, "LastName", Perm::VIEW),
                FieldPerm::new(EntityKind::Person, "PreferredName", Perm::VIEW | Perm::OWNER_MODIFY),
                FieldPerm::new(EntityKind::Person, "HomeCity", Perm::VIEW),
                FieldPerm::new(EntityKind::Person, "OfficePhone", Perm::VIEW),
                FieldPerm::new(
                    EntityKind::Person,
                    "EmergencyContactName",
                    Perm::OWNER_VIEW | Perm::OWNER_MODIFY,
                ),
                FieldPerm::new(EntityKind::Company, "CommonName", Perm::VIEW),
            ],
        },
        Role {
            rid: VIEWER,
            name: "Viewer".into(),
            descr: String::new(),
            perms: vec![
                FieldPerm::new(EntityKind::Person, "FirstName", Perm::VIEW),
                FieldPerm::new(EntityKind::Person, "LastName", Perm::VIEW),
            ],
        },
    ]
}

pub fn permissions() -> Arc<PermissionTable> {
    Arc::new(PermissionTable::from_roles(roles()).unwrap())
}

fn account(uid: i64, username: &str, display_name: &str, rid: i64) -> Account {
    Account {
        uid,
        username: username.into(),
        display_name: display_name.into(),
        rid,
        image: None,
    }
}

pub fn credentials() -> Arc<MemoryCredentialStore> {
    let store = MemoryCredentialStore::new();
    store.insert(account(1, "admin", "Ada", ADMIN), PASSWORD);
    store.insert(account(2, "morgan", "Morgan", MANAGER), PASSWORD);
    store.insert(account(3, "vic", "Vic", VIEWER), PASSWORD);
    store.insert(account(9, "ghost", "Ghost", 99), PASSWORD);
    Arc::new(store)
}

pub const PEOPLE: &str = r#"[
    {"kind": "Person", "UID": 1, "FirstName": "Ada", "LastName": "Admin", "PrimaryEmail": "ada@example.com"},
    {"kind": "Person", "UID": 2, "FirstName": "Morgan", "LastName": "Reed", "MgrUID": 1,
     "HomeCity": "Tulsa", "OfficePhone": "555-0102", "EmergencyContactName": "Sam Reed",
     "CoCode": 10, "PrimaryEmail": "morgan@example.com"},
    {"kind": "Person", "UID": 3, "FirstName": "Vic", "LastName": "Lane", "MgrUID": 2,
     "HomeCity": "Reno", "OfficePhone": "555-0103", "EmergencyContactName": "Jo Lane",
     "PrimaryEmail": "vic@example.com"},
    {"kind": "Company", "CoCode": 10, "CommonName": "Acme", "LegalName": "Acme Holdings"},
    {"kind": "Company", "CoCode": 11, "CommonName": "Globex"},
    {"kind": "Class", "ClassCode": 5, "Name": "Engineering", "Designation": "ENG"}
]"#;

pub fn manager(config: SessionConfig) -> SessionManager {
    SessionManager::new(credentials(), permissions(), config)
}

pub fn directory() -> Directory {
    let store = Arc::new(MemoryEntityStore::from_json(PEOPLE).unwrap());
    let tables = LookupTables::build(store.as_ref(), LookupSeed::default()).unwrap();
    Directory::new(
        manager(SessionConfig::default()),
        store,
        LookupCache::new(tables),
        Counters::new(),
    )
}
