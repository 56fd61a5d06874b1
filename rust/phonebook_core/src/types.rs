//! Domain types shared across phonebook_core modules.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Person identifier. Also the identity carried by a session.
pub type Uid = i64;

/// Role identifier as assigned by the role store.
pub type RoleId = i64;

/// Pseudo field every entity kind recognizes; role tables use it for
/// whole-entity grants (create, delete).
pub const ENTITY_FIELD: &str = "ElemEntity";

bitflags! {
    /// Permission bits attached to one (role, entity kind, field) entry.
    ///
    /// The `OWNER_*` bits only take effect when the acting identity is the
    /// entity's own identity, which in practice means a person editing or
    /// viewing their own record.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct Perm: u16 {
        const VIEW         = 1 << 0;
        const CREATE       = 1 << 1;
        const MODIFY       = 1 << 2;
        const DELETE       = 1 << 3;
        const PRINT        = 1 << 4;
        const OWNER_VIEW   = 1 << 5;
        const OWNER_MODIFY = 1 << 6;
        const OWNER_PRINT  = 1 << 7;
        const EXECUTE      = 1 << 8;
    }
}

impl Perm {
    /// Bits that are only honoured for the entity's owner.
    pub const OWNER_ONLY: Self = Self::OWNER_VIEW
        .union(Self::OWNER_MODIFY)
        .union(Self::OWNER_PRINT);

    /// Bits that actually apply for this actor.
    ///
    /// For the owner each `OWNER_*` bit also grants its plain counterpart,
    /// so callers can test `VIEW` / `MODIFY` / `PRINT` uniformly. For anyone
    /// else the owner bits are dropped.
    pub fn resolve(self, is_owner: bool) -> Self {
        if !is_owner {
            return self.difference(Self::OWNER_ONLY);
        }
        let mut out = self;
        if self.contains(Self::OWNER_VIEW) {
            out |= Self::VIEW;
        }
        if self.contains(Self::OWNER_MODIFY) {
            out |= Self::MODIFY;
        }
        if self.contains(Self::OWNER_PRINT) {
            out |= Self::PRINT;
        }
        out
    }
}

/// The business record types the permission model knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityKind {
    Person = 1,
    Company = 2,
    Class = 3,
    /// The running service itself; has no record, only executable fields.
    Service = 4,
}

impl EntityKind {
    pub const ALL: [EntityKind; 4] = [
        EntityKind::Person,
        EntityKind::Company,
        EntityKind::Class,
        EntityKind::Service,
    ];

    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            1 => Some(Self::Person),
            2 => Some(Self::Company),
            3 => Some(Self::Class),
            4 => Some(Self::Service),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Person => "Person",
            Self::Company => "Company",
            Self::Class => "Class",
            Self::Service => "Service",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "person" => Ok(Self::Person),
            "company" => Ok(Self::Company),
            "class" => Ok(Self::Class),
            "service" => Ok(Self::Service),
            other => Err(format!("unknown entity kind: {other}")),
        }
    }
}

/// One role-scoped grant for a single (entity kind, field) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldPerm {
    pub elem: EntityKind,
    pub field: String,
    pub perm: Perm,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub descr: String,
}

impl FieldPerm {
    pub fn new(elem: EntityKind, field: impl Into<String>, perm: Perm) -> Self {
        Self {
            elem,
            field: field.into(),
            perm,
            descr: String::new(),
        }
    }
}

/// A named collection of field permissions assigned to people.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub rid: RoleId,
    pub name: String,
    #[serde(default)]
    pub descr: String,
    #[serde(default)]
    pub perms: Vec<FieldPerm>,
}

/// The acting identity for a permission decision: who, under which role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Principal {
    pub uid: Uid,
    pub rid: RoleId,
}

impl Principal {
    pub fn new(uid: Uid, rid: RoleId) -> Self {
        Self { uid, rid }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_bits_dropped_for_non_owner() {
        let p = Perm::VIEW | Perm::OWNER_MODIFY;
        assert_eq!(p.resolve(false), Perm::VIEW);
        assert_eq!(p.resolve(true), p | Perm::MODIFY);
        assert_eq!(Perm::OWNER_VIEW.resolve(false), Perm::empty());
    }

    #[test]
    fn perm_text_form_in_json() {
        let entry: FieldPerm = serde_json::from_str(
            r#"{"elem":"Person","field":"HomeCity","perm":"VIEW | OWNER_MODIFY"}"#,
        )
        .unwrap();
        assert_eq!(entry.perm, Perm::VIEW | Perm::OWNER_MODIFY);
        assert_eq!(entry.elem, EntityKind::Person);
    }

    #[test]
    fn entity_kind_parse_and_codes() {
        assert_eq!("company".parse::<EntityKind>().unwrap(), EntityKind::Company);
        assert!("building".parse::<EntityKind>().is_err());
        for kind in EntityKind::ALL {
            assert_eq!(EntityKind::from_u8(kind as u8), Some(kind));
        }
        assert_eq!(EntityKind::from_u8(0), None);
    }
}
