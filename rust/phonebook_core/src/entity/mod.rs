//! Entity snapshots and their static field descriptor tables.
//!
//! The permission engine never looks at a record through type-specific code.
//! Each entity kind publishes a table of [`FieldDescriptor`]s (name, typed
//! accessor, clear-to-zero mutator, set-from-text mutator) and the filter
//! walks that table. Adding a field to a record means adding one row.

mod class;
mod company;
mod person;

pub use class::Class;
pub use company::Company;
pub use person::Person;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::types::{EntityKind, Uid, ENTITY_FIELD};

/// Fields of the service pseudo-entity. There is no record behind them;
/// role tables grant `EXECUTE` on these.
pub const SERVICE_FIELDS: &[&str] = &["Shutdown"];

/// Borrowed view of one field's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue<'a> {
    Int(i64),
    Text(&'a str),
    Date(Option<NaiveDate>),
}

impl FieldValue<'_> {
    /// True when the value equals the field type's zero value, which is what
    /// a redacted field looks like.
    pub fn is_zero(&self) -> bool {
        match self {
            FieldValue::Int(v) => *v == 0,
            FieldValue::Text(s) => s.is_empty(),
            FieldValue::Date(d) => d.is_none(),
        }
    }
}

/// One row of an entity kind's field table.
pub struct FieldDescriptor<E: 'static> {
    /// Name as it appears in role permission tables.
    pub name: &'static str,
    pub description: &'static str,
    /// Only editable from the administration screens.
    pub admin_only: bool,
    pub get: for<'a> fn(&'a E) -> FieldValue<'a>,
    pub clear: fn(&mut E),
    pub set: fn(&mut E, &str) -> std::result::Result<(), String>,
}

/// A record shape the permission engine can filter.
pub trait Entity: Sized + 'static {
    const KIND: EntityKind;

    /// Table name of the primary key field. Keys are assigned at creation
    /// and never rewritten by an update.
    const KEY_FIELD: &'static str;

    fn fields() -> &'static [FieldDescriptor<Self>];

    /// Primary key (UID, company code, class code).
    fn key(&self) -> i64;

    /// Assign the primary key of a record that is not stored yet.
    fn set_key(&mut self, key: i64);

    /// Identity that owns this record, if any. Only people own themselves.
    fn owner(&self) -> Option<Uid> {
        None
    }

    fn descriptor(name: &str) -> Option<&'static FieldDescriptor<Self>> {
        Self::fields().iter().find(|d| d.name == name)
    }
}

/// Names a role table may reference for `kind`.
pub fn recognized_fields(kind: EntityKind) -> Vec<&'static str> {
    let mut names: Vec<&'static str> = match kind {
        EntityKind::Person => Person::fields().iter().map(|d| d.name).collect(),
        EntityKind::Company => Company::fields().iter().map(|d| d.name).collect(),
        EntityKind::Class => Class::fields().iter().map(|d| d.name).collect(),
        EntityKind::Service => SERVICE_FIELDS.to_vec(),
    };
    names.push(ENTITY_FIELD);
    names
}

pub fn is_recognized(kind: EntityKind, field: &str) -> bool {
    if field == ENTITY_FIELD {
        return true;
    }
    match kind {
        EntityKind::Person => Person::descriptor(field).is_some(),
        EntityKind::Company => Company::descriptor(field).is_some(),
        EntityKind::Class => Class::descriptor(field).is_some(),
        EntityKind::Service => SERVICE_FIELDS.contains(&field),
    }
}

/// Lookup key used by the persistence collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityKey {
    pub kind: EntityKind,
    pub key: i64,
}

impl EntityKey {
    pub fn new(kind: EntityKind, key: i64) -> Self {
        Self { kind, key }
    }
}

/// Tagged variant over the filterable record shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum EntityRecord {
    Person(Person),
    Company(Company),
    Class(Class),
}

impl EntityRecord {
    /// Fresh record of `kind` with the defaults an add screen starts from.
    /// `None` for kinds without records.
    pub fn blank(kind: EntityKind) -> Option<Self> {
        match kind {
            EntityKind::Person => Some(EntityRecord::Person(Person::default())),
            EntityKind::Company => Some(EntityRecord::Company(Company::blank())),
            EntityKind::Class => Some(EntityRecord::Class(Class::default())),
            EntityKind::Service => None,
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            EntityRecord::Person(_) => EntityKind::Person,
            EntityRecord::Company(_) => EntityKind::Company,
            EntityRecord::Class(_) => EntityKind::Class,
        }
    }

    pub fn entity_key(&self) -> EntityKey {
        let key = match self {
            EntityRecord::Person(p) => p.key(),
            EntityRecord::Company(c) => c.key(),
            EntityRecord::Class(c) => c.key(),
        };
        EntityKey::new(self.kind(), key)
    }

    pub fn owner(&self) -> Option<Uid> {
        match self {
            EntityRecord::Person(p) => p.owner(),
            EntityRecord::Company(c) => c.owner(),
            EntityRecord::Class(c) => c.owner(),
        }
    }

    pub fn set_key(&mut self, key: i64) {
        match self {
            EntityRecord::Person(p) => p.set_key(key),
            EntityRecord::Company(c) => c.set_key(key),
            EntityRecord::Class(c) => c.set_key(key),
        }
    }

    /// Set one field from text, without any permission check. Used to fill
    /// in a record before it is created.
    pub fn set_value(&mut self, name: &str, value: &str) -> Result<()> {
        let applied = match self {
            EntityRecord::Person(p) => Person::descriptor(name).map(|d| (d.set)(p, value)),
            EntityRecord::Company(c) => Company::descriptor(name).map(|d| (d.set)(c, value)),
            EntityRecord::Class(c) => Class::descriptor(name).map(|d| (d.set)(c, value)),
        };
        match applied {
            None => Err(CoreError::NoSuchField {
                kind: self.kind(),
                field: name.to_string(),
            }),
            Some(res) => res.map_err(|reason| CoreError::InvalidValue {
                field: name.to_string(),
                reason,
            }),
        }
    }

    /// Value of a named field, `None` when the kind has no such field.
    pub fn value(&self, name: &str) -> Option<FieldValue<'_>> {
        match self {
            EntityRecord::Person(p) => Person::descriptor(name).map(|d| (d.get)(p)),
            EntityRecord::Company(c) => Company::descriptor(name).map(|d| (d.get)(c)),
            EntityRecord::Class(c) => Class::descriptor(name).map(|d| (d.get)(c)),
        }
    }
}

// ---------------------------------------------------------------------------
// Descriptor row builders
// ---------------------------------------------------------------------------

pub(crate) fn parse_int(v: &str) -> std::result::Result<i64, String> {
    let v = v.trim();
    if v.is_empty() {
        return Ok(0);
    }
    v.parse::<i64>().map_err(|e| format!("{v:?}: {e}"))
}

pub(crate) fn parse_date(v: &str) -> std::result::Result<Option<NaiveDate>, String> {
    let v = v.trim();
    if v.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(v, "%Y-%m-%d")
        .map(Some)
        .map_err(|e| format!("{v:?}: {e}"))
}

macro_rules! text_field {
    ($name:literal, $field:ident, $admin:expr, $descr:literal) => {
        $crate::entity::FieldDescriptor {
            name: $name,
            description: $descr,
            admin_only: $admin,
            get: |e| $crate::entity::FieldValue::Text(&e.$field),
            clear: |e| e.$field.clear(),
            set: |e, v| {
                e.$field = v.trim().to_string();
                Ok(())
            },
        }
    };
}

macro_rules! int_field {
    ($name:literal, $field:ident, $admin:expr, $descr:literal) => {
        $crate::entity::FieldDescriptor {
            name: $name,
            description: $descr,
            admin_only: $admin,
            get: |e| $crate::entity::FieldValue::Int(e.$field),
            clear: |e| e.$field = 0,
            set: |e, v| {
                e.$field = $crate::entity::parse_int(v)?;
                Ok(())
            },
        }
    };
}

macro_rules! date_field {
    ($name:literal, $field:ident, $admin:expr, $descr:literal) => {
        $crate::entity::FieldDescriptor {
            name: $name,
            description: $descr,
            admin_only: $admin,
            get: |e| $crate::entity::FieldValue::Date(e.$field),
            clear: |e| e.$field = None,
            set: |e, v| {
                e.$field = $crate::entity::parse_date(v)?;
                Ok(())
            },
        }
    };
}

pub(crate) use date_field;
pub(crate) use int_field;
pub(crate) use text_field;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_recognizes_entity_pseudo_field() {
        for kind in EntityKind::ALL {
            assert!(is_recognized(kind, ENTITY_FIELD));
            assert!(recognized_fields(kind).contains(&ENTITY_FIELD));
        }
        assert!(is_recognized(EntityKind::Service, "Shutdown"));
        assert!(!is_recognized(EntityKind::Company, "HomeCity"));
    }

    #[test]
    fn descriptor_names_are_unique_per_kind() {
        for kind in [EntityKind::Person, EntityKind::Company, EntityKind::Class] {
            let mut names = recognized_fields(kind);
            let total = names.len();
            names.sort_unstable();
            names.dedup();
            assert_eq!(names.len(), total, "duplicate field name in {kind}");
        }
    }

    #[test]
    fn setters_parse_and_reject() {
        let mut p = Person::default();
        let d = Person::descriptor("MgrUID").unwrap();
        (d.set)(&mut p, " 42 ").unwrap();
        assert_eq!(p.mgr_uid, 42);
        assert!((d.set)(&mut p, "forty-two").is_err());

        let hire = Person::descriptor("Hire").unwrap();
        (hire.set)(&mut p, "2015-03-09").unwrap();
        assert_eq!(p.hire, NaiveDate::from_ymd_opt(2015, 3, 9));
        (hire.set)(&mut p, "").unwrap();
        assert_eq!(p.hire, None);
    }

    #[test]
    fn blank_records_and_text_setters() {
        let mut co = EntityRecord::blank(EntityKind::Company).unwrap();
        assert_eq!(co.value("Active"), Some(FieldValue::Int(1)));
        assert_eq!(co.value("EmploysPersonnel"), Some(FieldValue::Int(0)));
        assert_eq!(co.value("Country"), Some(FieldValue::Text("USA")));
        assert!(EntityRecord::blank(EntityKind::Service).is_none());

        co.set_value("CommonName", "Initech").unwrap();
        co.set_key(12);
        assert_eq!(co.entity_key(), EntityKey::new(EntityKind::Company, 12));
        assert!(matches!(
            co.set_value("HomeCity", "Reno"),
            Err(CoreError::NoSuchField { .. })
        ));
        assert!(matches!(
            co.set_value("Active", "yes"),
            Err(CoreError::InvalidValue { .. })
        ));
        assert_eq!(co.value("CommonName"), Some(FieldValue::Text("Initech")));
    }

    #[test]
    fn record_json_uses_table_names() {
        let json = r#"{"kind":"Person","UID":7,"FirstName":"Ada","HomeCity":"Boise"}"#;
        let rec: EntityRecord = serde_json::from_str(json).unwrap();
        assert_eq!(rec.entity_key(), EntityKey::new(EntityKind::Person, 7));
        assert_eq!(rec.owner(), Some(7));
        assert_eq!(rec.value("HomeCity"), Some(FieldValue::Text("Boise")));
        assert_eq!(rec.value("Nope"), None);
    }
}
