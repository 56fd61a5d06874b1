use thiserror::Error;

use crate::types::{EntityKind, RoleId};

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("role {role}: duplicate permission for {kind}.{field}")]
    DuplicatePermission {
        role: String,
        kind: EntityKind,
        field: String,
    },

    #[error("role {role}: {kind} has no field named {field}")]
    UnknownField {
        role: String,
        kind: EntityKind,
        field: String,
    },

    #[error("duplicate role id: {0}")]
    DuplicateRole(RoleId),

    #[error("unknown role id: {0}")]
    UnknownRole(RoleId),

    #[error("{kind} has no field named {field}")]
    NoSuchField { kind: EntityKind, field: String },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("role file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("role parse error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
