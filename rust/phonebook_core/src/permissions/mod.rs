//! Role permission table and the field filter.
//!
//! The table is built once from the role store before any request traffic
//! and is read-only afterwards, so it is shared through `Arc` without any
//! synchronization. Every decision is deny-by-default: a (role, kind, field)
//! triple without an entry has no permissions at all.

pub mod config;


use ahash::AHashMap;
use serde::Serialize;

use crate::entity::{is_recognized, Class, Company, Entity, EntityRecord, Person};
use crate::error::{CoreError, Result};
use crate::types::{EntityKind, Perm, Principal, Role, RoleId};

/// Field permissions of one role for one entity kind.
#[derive(Debug, Clone, Default)]
struct KindGrants {
    fields: AHashMap<String, Perm>,
    /// Union of every field mask, for the "any field" checks.
    any: Perm,
}

/// Immutable (role, entity kind, field) -> [`Perm`] index.
#[derive(Debug, Clone, Default)]
pub struct PermissionTable {
    roles: Vec<Role>,
    index: AHashMap<(RoleId, EntityKind), KindGrants>,
}

/// Result of [`PermissionTable::apply_update`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateOutcome {
    pub applied: Vec<&'static str>,
    /// Fields the principal may not modify, or that the kind does not have.
    pub refused: Vec<String>,
}

/// One row of an administration screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdminField {
    pub name: &'static str,
    pub description: &'static str,
    pub editable: bool,
}

impl UpdateOutcome {
    pub fn is_clean(&self) -> bool {
        self.refused.is_empty()
    }
}

impl PermissionTable {
    /// Build the index, rejecting duplicate role ids, duplicate
    /// (kind, field) entries within a role, and unknown field names.
    pub fn from_roles(mut roles: Vec<Role>) -> Result<Self> {
        roles.sort_by_key(|r| r.rid);
        let mut index: AHashMap<(RoleId, EntityKind), KindGrants> = AHashMap::new();

        for (i, role) in roles.iter().enumerate() {
            if i > 0 && roles[i - 1].rid == role.rid {
                return Err(CoreError::DuplicateRole(role.rid));
            }
            for fp in &role.perms {
                if !is_recognized(fp.elem, &fp.field) {
                    return Err(CoreError::UnknownField {
                        role: role.name.clone(),
                        kind: fp.elem,
                        field: fp.field.clone(),
                    });
                }
                let grants = index.entry((role.rid, fp.elem)).or_default();
                if grants.fields.insert(fp.field.clone(), fp.perm).is_some() {
                    return Err(CoreError::DuplicatePermission {
                        role: role.name.clone(),
                        kind: fp.elem,
                        field: fp.field.clone(),
                    });
                }
                grants.any |= fp.perm;
            }
        }

        tracing::debug!(
            roles = roles.len(),
            grants = index.values().map(|g| g.fields.len()).sum::<usize>(),
            "permission table built"
        );
        Ok(Self { roles, index })
    }

    /// Load roles from a role source. Failure here is fatal to startup.
    pub fn load(source: &dyn config::RoleSource) -> Result<Self> {
        Self::from_roles(source.load_roles()?)
    }

    /// All roles, ordered by id.
    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    pub fn role(&self, rid: RoleId) -> Option<&Role> {
        self.roles
            .binary_search_by_key(&rid, |r| r.rid)
            .ok()
            .map(|i| &self.roles[i])
    }

    /// Stored mask for the triple, or the empty mask. Total, never fails.
    pub fn lookup(&self, rid: RoleId, kind: EntityKind, field: &str) -> Perm {
        self.index
            .get(&(rid, kind))
            .and_then(|g| g.fields.get(field))
            .copied()
            .unwrap_or_default()
    }

    /// True if any field entry of (role, kind) has any of `required` set.
    ///
    /// Coarse action gating ("may this role ever delete a Person"). Owner
    /// bits are compared as stored; the caller decides whether an owner bit
    /// is acceptable by including it in `required`.
    pub fn has_entity_access(&self, who: &Principal, kind: EntityKind, required: Perm) -> bool {
        self.index
            .get(&(who.rid, kind))
            .is_some_and(|g| g.any.intersects(required))
    }

    /// Whether an admin view/edit surface for `kind` should render at all:
    /// OR across the role's field entries, never AND.
    pub fn has_any_field_permission(
        &self,
        who: &Principal,
        kind: EntityKind,
        required: Perm,
    ) -> bool {
        self.index
            .get(&(who.rid, kind))
            .is_some_and(|g| g.fields.values().any(|p| p.intersects(required)))
    }

    /// Single-field check, e.g. `EXECUTE` on `Service.Shutdown`.
    pub fn has_field_access(
        &self,
        who: &Principal,
        kind: EntityKind,
        field: &str,
        required: Perm,
    ) -> bool {
        self.lookup(who.rid, kind, field).intersects(required)
    }

    /// Mask for one field of one concrete entity, with owner bits resolved.
    fn resolved<E: Entity>(&self, entity: &E, who: &Principal, field: &str) -> Perm {
        let is_owner = entity.owner() == Some(who.uid);
        self.lookup(who.rid, E::KIND, field).resolve(is_owner)
    }

    /// Clear every field whose resolved mask has none of `required`.
    ///
    /// Ownership is decided before any field is cleared, so redacting the
    /// identity field itself cannot change the outcome for later fields.
    pub fn filter_with<E: Entity>(&self, entity: &mut E, who: &Principal, required: Perm) {
        let is_owner = entity.owner() == Some(who.uid);
        for d in E::fields() {
            let perm = self.lookup(who.rid, E::KIND, d.name).resolve(is_owner);
            if !perm.intersects(required) {
                (d.clear)(entity);
            }
        }
    }

    /// Redact `entity` for reading: a field survives if the role has `VIEW`,
    /// or `OWNER_VIEW` and the principal is the entity's owner.
    pub fn filter_for_read<E: Entity>(&self, entity: &mut E, who: &Principal) {
        self.filter_with(entity, who, Perm::VIEW);
    }

    /// [`filter_for_read`](Self::filter_for_read) over the tagged record.
    pub fn filter_record(&self, record: EntityRecord, who: &Principal) -> EntityRecord {
        self.filter_record_with(record, who, Perm::VIEW)
    }

    /// [`filter_with`](Self::filter_with) over the tagged record. Edit
    /// screens pass `VIEW | MODIFY` so write-only fields stay visible.
    pub fn filter_record_with(
        &self,
        mut record: EntityRecord,
        who: &Principal,
        required: Perm,
    ) -> EntityRecord {
        match &mut record {
            EntityRecord::Person(p) => self.filter_with(p, who, required),
            EntityRecord::Company(c) => self.filter_with(c, who, required),
            EntityRecord::Class(c) => self.filter_with(c, who, required),
        }
        record
    }

    /// Administration-screen rows of `entity` whose resolved mask has any of
    /// `required`, in table order.
    pub fn admin_fields_of<E: Entity>(
        &self,
        entity: &E,
        who: &Principal,
        required: Perm,
    ) -> Vec<AdminField> {
        E::fields()
            .iter()
            .filter(|d| d.admin_only)
            .filter_map(|d| {
                let perm = self.resolved(entity, who, d.name);
                perm.intersects(required).then(|| AdminField {
                    name: d.name,
                    description: d.description,
                    editable: perm.contains(Perm::MODIFY),
                })
            })
            .collect()
    }

    /// [`admin_fields_of`](Self::admin_fields_of) over the tagged record.
    pub fn admin_fields(
        &self,
        record: &EntityRecord,
        who: &Principal,
        required: Perm,
    ) -> Vec<AdminField> {
        match record {
            EntityRecord::Person(p) => self.admin_fields_of(p, who, required),
            EntityRecord::Company(c) => self.admin_fields_of(c, who, required),
            EntityRecord::Class(c) => self.admin_fields_of(c, who, required),
        }
    }

    pub fn can_modify_field<E: Entity>(&self, entity: &E, who: &Principal, field: &str) -> bool {
        self.resolved(entity, who, field).contains(Perm::MODIFY)
    }

    /// Apply textual field changes the principal is allowed to make.
    ///
    /// Refused and unknown fields are reported and left untouched, and so is
    /// the primary key whatever the role grants on it. A value
    /// that fails to parse aborts the whole update and leaves `entity`
    /// unchanged.
    pub fn apply_update<E, K, V>(
        &self,
        entity: &mut E,
        who: &Principal,
        changes: &[(K, V)],
    ) -> Result<UpdateOutcome>
    where
        E: Entity + Clone,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut work = entity.clone();
        let mut outcome = UpdateOutcome::default();

        for (name, value) in changes {
            let name = name.as_ref();
            let Some(d) = E::descriptor(name) else {
                outcome.refused.push(name.to_string());
                continue;
            };
            if d.name == E::KEY_FIELD || !self.can_modify_field(entity, who, name) {
                outcome.refused.push(name.to_string());
                continue;
            }
            (d.set)(&mut work, value.as_ref()).map_err(|reason| CoreError::InvalidValue {
                field: name.to_string(),
                reason,
            })?;
            outcome.applied.push(d.name);
        }

        if !outcome.refused.is_empty() {
            tracing::debug!(
                uid = who.uid,
                rid = who.rid,
                kind = E::KIND.as_str(),
                refused = ?outcome.refused,
                "field update refused"
            );
        }
        *entity = work;
        Ok(outcome)
    }

    /// [`apply_update`](Self::apply_update) over the tagged record.
    pub fn apply_record_update<K, V>(
        &self,
        record: &mut EntityRecord,
        who: &Principal,
        changes: &[(K, V)],
    ) -> Result<UpdateOutcome>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        match record {
            EntityRecord::Person(p) => self.apply_update::<Person, K, V>(p, who, changes),
            EntityRecord::Company(c) => self.apply_update::<Company, K, V>(c, who, changes),
            EntityRecord::Class(c) => self.apply_update::<Class, K, V>(c, who, changes),
        }
    }
}
