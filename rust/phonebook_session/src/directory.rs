//! Request-level operations over sessions, permissions and the store.
//!
//! Every operation follows the same order: touch the session, gate the
//! action coarsely, talk to the store outside any arbiter, filter what goes
//! back to the caller. Refusals are logged at `warn` with the acting uid,
//! display name and role name.

use std::sync::Arc;

use phonebook_core::{
    AdminField, EntityKey, EntityKind, EntityRecord, FieldValue, Perm, PermissionTable,
    Principal, UpdateOutcome, ENTITY_FIELD,
};
use serde::Serialize;
use tokio::sync::watch;

use crate::counters::{Counter, Counters};
use crate::error::{Result, SessionError};
use crate::lookup::LookupCache;
use crate::manager::SessionManager;
use crate::session::{Session, SessionToken};
use crate::store::EntityStore;

const SHUTDOWN_FIELD: &str = "Shutdown";

/// Result of a saved edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Saved {
    pub outcome: UpdateOutcome,
    /// Page to send the user back to.
    pub redirect: String,
}

/// Record plus the administration rows the caller may see on it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdminScreen {
    pub record: EntityRecord,
    pub fields: Vec<AdminField>,
}

#[derive(Clone)]
pub struct Directory {
    sessions: SessionManager,
    store: Arc<dyn EntityStore>,
    lookups: LookupCache,
    counters: Counters,
    shutdown_tx: Arc<watch::Sender<bool>>,
}

impl Directory {
    pub fn new(
        sessions: SessionManager,
        store: Arc<dyn EntityStore>,
        lookups: LookupCache,
        counters: Counters,
    ) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            sessions,
            store,
            lookups,
            counters,
            shutdown_tx: Arc::new(shutdown_tx),
        }
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub fn lookups(&self) -> &LookupCache {
        &self.lookups
    }

    pub fn counters(&self) -> &Counters {
        &self.counters
    }

    /// Flips to `true` once an authorized shutdown has been executed.
    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown_tx.subscribe()
    }

    fn permissions(&self) -> &PermissionTable {
        self.sessions.permissions()
    }

    pub async fn sign_in(&self, username: &str, secret: &str) -> Result<Session> {
        let session = self.sessions.authenticate(username, secret).await?;
        self.counters.bump(Counter::SignIn).await?;
        Ok(session)
    }

    pub async fn sign_out(&self, token: &SessionToken) -> Result<bool> {
        let removed = self.sessions.destroy(token).await?;
        if removed {
            self.counters.bump(Counter::SignOut).await?;
        }
        Ok(removed)
    }

    /// Fetch one entity, redacted for the caller.
    pub async fn view(&self, token: &SessionToken, key: EntityKey) -> Result<EntityRecord> {
        let session = self.sessions.touch(token).await?;
        let who = session.principal();
        if !self
            .permissions()
            .has_entity_access(&who, key.kind, Perm::VIEW | Perm::OWNER_VIEW)
        {
            return Err(self.refuse(&session, key.kind, "view").await);
        }

        let record = self.fetch(key)?;
        let record = self.permissions().filter_record(record, &who);
        self.sessions
            .push_breadcrumb(token, key.kind.as_str(), &page_path("detail", key))
            .await?;
        self.counters.bump(view_counter(key.kind)).await?;
        Ok(record)
    }

    /// Records of `kind` whose visible name fields contain `query`
    /// (case-insensitive). Matching runs on the redacted copy, so hidden
    /// fields cannot be probed through search.
    pub async fn search(
        &self,
        token: &SessionToken,
        kind: EntityKind,
        query: &str,
    ) -> Result<Vec<EntityRecord>> {
        let session = self.sessions.touch(token).await?;
        let who = session.principal();
        if !self
            .permissions()
            .has_entity_access(&who, kind, Perm::VIEW | Perm::OWNER_VIEW)
        {
            return Err(self.refuse(&session, kind, "search").await);
        }

        let needle = query.trim().to_lowercase();
        let hits: Vec<EntityRecord> = self
            .store
            .list(kind)?
            .into_iter()
            .map(|r| self.permissions().filter_record(r, &who))
            .filter(|r| matches_query(r, &needle))
            .collect();
        self.counters.bump(Counter::Search).await?;
        Ok(hits)
    }

    /// Fetch one entity for an edit screen: fields the caller may view or
    /// modify survive.
    pub async fn edit(&self, token: &SessionToken, key: EntityKey) -> Result<EntityRecord> {
        let session = self.sessions.touch(token).await?;
        let who = session.principal();
        if !self.may_modify(&who, key) {
            return Err(self.refuse(&session, key.kind, "edit").await);
        }

        let record = self.fetch(key)?;
        let record = self
            .permissions()
            .filter_record_with(record, &who, Perm::VIEW | Perm::MODIFY);
        self.sessions
            .push_breadcrumb(token, "Edit", &page_path("edit", key))
            .await?;
        Ok(record)
    }

    /// Apply the permitted subset of `changes` and store the result.
    pub async fn update<K, V>(
        &self,
        token: &SessionToken,
        key: EntityKey,
        changes: &[(K, V)],
    ) -> Result<Saved>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let session = self.sessions.touch(token).await?;
        let who = session.principal();
        if !self.may_modify(&who, key) {
            return Err(self.refuse(&session, key.kind, "modify").await);
        }

        let mut record = self.fetch(key)?;
        let outcome = self
            .permissions()
            .apply_record_update(&mut record, &who, changes)?;

        self.store.save(record.clone())?;
        self.lookups.apply(&record).await?;

        if let EntityRecord::Person(p) = &record {
            if p.uid == session.uid {
                self.sessions
                    .update_profile(token, p.display_name(), session.image.clone())
                    .await?;
            }
        }

        self.counters.bump(edit_counter(key.kind)).await?;
        let redirect = self.sessions.breadcrumb_back(token, 2).await?;
        Ok(Saved { outcome, redirect })
    }

    /// Store a new entity. A zero key gets the next free key of the kind.
    pub async fn create(&self, token: &SessionToken, record: EntityRecord) -> Result<EntityKey> {
        let session = self.sessions.touch(token).await?;
        let who = session.principal();
        let kind = record.kind();
        if !self
            .permissions()
            .has_field_access(&who, kind, ENTITY_FIELD, Perm::CREATE)
        {
            return Err(self.refuse(&session, kind, "create").await);
        }

        let requested = record.entity_key();
        let Some(key) = self.store.insert(record)? else {
            return Err(SessionError::EntityExists {
                kind,
                key: requested.key,
            });
        };
        if let Some(stored) = self.store.fetch(&key)? {
            self.lookups.apply(&stored).await?;
        }
        self.counters.bump(create_counter(kind)).await?;
        tracing::info!(uid = session.uid, kind = kind.as_str(), key = key.key, "entity created");
        Ok(key)
    }

    /// Administration view of one entity: the redacted record and the
    /// admin-screen rows the caller may read.
    pub async fn admin_view(&self, token: &SessionToken, key: EntityKey) -> Result<AdminScreen> {
        self.admin_screen(token, key, Perm::VIEW, "admin view").await
    }

    /// Administration edit form: like [`admin_view`](Self::admin_view) but
    /// over the rows the caller may modify.
    pub async fn admin_edit(&self, token: &SessionToken, key: EntityKey) -> Result<AdminScreen> {
        self.admin_screen(token, key, Perm::MODIFY, "admin edit").await
    }

    /// The surface renders only when some field of the kind grants
    /// `required` and at least one admin row of this record survives.
    async fn admin_screen(
        &self,
        token: &SessionToken,
        key: EntityKey,
        required: Perm,
        action: &'static str,
    ) -> Result<AdminScreen> {
        let session = self.sessions.touch(token).await?;
        let who = session.principal();
        if !self
            .permissions()
            .has_any_field_permission(&who, key.kind, required)
        {
            return Err(self.refuse(&session, key.kind, action).await);
        }

        let record = self.fetch(key)?;
        let fields = self.permissions().admin_fields(&record, &who, required);
        if fields.is_empty() {
            return Err(self.refuse(&session, key.kind, action).await);
        }
        let record = self
            .permissions()
            .filter_record_with(record, &who, Perm::VIEW | required);
        let page = if required.contains(Perm::MODIFY) { "adminEdit" } else { "adminView" };
        self.sessions
            .push_breadcrumb(token, "Admin", &page_path(page, key))
            .await?;
        Ok(AdminScreen { record, fields })
    }

    /// Delete an entity nothing else refers to.
    pub async fn delete(&self, token: &SessionToken, key: EntityKey) -> Result<()> {
        let session = self.sessions.touch(token).await?;
        let who = session.principal();
        if !self
            .permissions()
            .has_field_access(&who, key.kind, ENTITY_FIELD, Perm::DELETE)
        {
            return Err(self.refuse(&session, key.kind, "delete").await);
        }

        self.fetch(key)?;
        let references = self.references(key)?;
        if references > 0 {
            return Err(SessionError::EntityInUse {
                kind: key.kind,
                key: key.key,
                references,
            });
        }

        self.store.remove(&key)?;
        self.lookups.forget(key.kind, key.key).await?;
        self.counters.bump(delete_counter(key.kind)).await?;
        tracing::info!(uid = session.uid, kind = key.kind.as_str(), key = key.key, "entity deleted");
        Ok(())
    }

    /// Execute the service shutdown command.
    pub async fn shutdown(&self, token: &SessionToken) -> Result<()> {
        let session = self.sessions.touch(token).await?;
        let who = session.principal();
        if !self
            .permissions()
            .has_field_access(&who, EntityKind::Service, SHUTDOWN_FIELD, Perm::EXECUTE)
        {
            return Err(self.refuse(&session, EntityKind::Service, "execute").await);
        }
        tracing::warn!(uid = session.uid, name = %session.display_name, "shutdown requested");
        self.shutdown_tx.send_replace(true);
        Ok(())
    }

    /// Coarse write gate: MODIFY anywhere on the kind, or OWNER_MODIFY on
    /// the kind when the target is the caller's own record.
    fn may_modify(&self, who: &Principal, key: EntityKey) -> bool {
        let perms = self.permissions();
        perms.has_entity_access(who, key.kind, Perm::MODIFY)
            || (owner_of(key) == Some(who.uid)
                && perms.has_entity_access(who, key.kind, Perm::OWNER_MODIFY))
    }

    fn fetch(&self, key: EntityKey) -> Result<EntityRecord> {
        self.store
            .fetch(&key)?
            .ok_or(SessionError::EntityNotFound {
                kind: key.kind,
                key: key.key,
            })
    }

    /// People that point at `key`: reports of a manager, employees of a
    /// company, members of a class.
    fn references(&self, key: EntityKey) -> Result<usize> {
        let field = match key.kind {
            EntityKind::Person => "MgrUID",
            EntityKind::Company => "CoCode",
            EntityKind::Class => "ClassCode",
            EntityKind::Service => return Ok(0),
        };
        let count = self
            .store
            .list(EntityKind::Person)?
            .iter()
            .filter(|r| r.entity_key() != key)
            .filter(|r| r.value(field) == Some(FieldValue::Int(key.key)))
            .count();
        Ok(count)
    }

    async fn refuse(&self, session: &Session, kind: EntityKind, action: &'static str) -> SessionError {
        tracing::warn!(
            uid = session.uid,
            name = %session.display_name,
            role = %session.role_name,
            kind = kind.as_str(),
            action,
            "permission refused"
        );
        if let Err(e) = self.counters.bump(Counter::Refused).await {
            return e;
        }
        SessionError::PermissionDenied {
            uid: session.uid,
            role: session.role_name.clone(),
            kind,
            action,
        }
    }
}

fn owner_of(key: EntityKey) -> Option<phonebook_core::Uid> {
    (key.kind == EntityKind::Person).then_some(key.key)
}

fn page_path(page: &str, key: EntityKey) -> String {
    let prefix = match (page, key.kind) {
        ("detail", EntityKind::Person) => "detail",
        ("adminView", EntityKind::Person) => "adminView",
        ("detail" | "adminView", EntityKind::Company) => "company",
        ("detail" | "adminView", _) => "class",
        ("adminEdit", EntityKind::Person) => "adminEdit",
        (_, EntityKind::Person) => "editDetail",
        (_, EntityKind::Company) => "adminEditCo",
        _ => "adminEditClass",
    };
    format!("/{prefix}/{}", key.key)
}

fn matches_query(record: &EntityRecord, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    let fields: &[&str] = match record {
        EntityRecord::Person(_) => &["FirstName", "LastName", "PreferredName", "PrimaryEmail"],
        EntityRecord::Company(_) => &["LegalName", "CommonName"],
        EntityRecord::Class(_) => &["Name", "Designation"],
    };
    fields.iter().any(|f| match record.value(f) {
        Some(FieldValue::Text(s)) => s.to_lowercase().contains(needle),
        _ => false,
    })
}

fn view_counter(kind: EntityKind) -> Counter {
    match kind {
        EntityKind::Company => Counter::ViewCompany,
        EntityKind::Class => Counter::ViewClass,
        _ => Counter::ViewPerson,
    }
}

fn edit_counter(kind: EntityKind) -> Counter {
    match kind {
        EntityKind::Company => Counter::EditCompany,
        EntityKind::Class => Counter::EditClass,
        _ => Counter::EditPerson,
    }
}

fn create_counter(kind: EntityKind) -> Counter {
    match kind {
        EntityKind::Company => Counter::CreateCompany,
        EntityKind::Class => Counter::CreateClass,
        _ => Counter::CreatePerson,
    }
}

fn delete_counter(kind: EntityKind) -> Counter {
    match kind {
        EntityKind::Company => Counter::DeleteCompany,
        EntityKind::Class => Counter::DeleteClass,
        _ => Counter::DeletePerson,
    }
}
