//! `phonebook_core` — role permissions and field-level redaction for the
//! Phonebook directory.
//!
//! Pure computation: no runtime, no locks. The permission table is built
//! once at startup and shared read-only by every request handler.
//!
//! Modules:
//! - `types`       — permission bits, roles, entity kinds, principals
//! - `entity`      — Person / Company / Class records and their field tables
//! - `permissions` — the permission table, read filter and update checks
//! - `error`       — error type for table construction and updates

pub mod entity;
pub mod error;
pub mod permissions;
pub mod types;

pub use entity::{Class, Company, Entity, EntityKey, EntityRecord, FieldValue, Person};
pub use error::{CoreError, Result};
pub use permissions::config::{parse_roles, JsonRoleSource, RoleSource};
pub use permissions::{AdminField, PermissionTable, UpdateOutcome};
pub use types::{EntityKind, FieldPerm, Perm, Principal, Role, RoleId, Uid, ENTITY_FIELD};
