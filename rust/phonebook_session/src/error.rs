use phonebook_core::{CoreError, EntityKind, RoleId, Uid};
use thiserror::Error;

use crate::arbiter::ArbiterError;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("authentication failed")]
    AuthenticationFailure,

    #[error("session not found")]
    SessionNotFound,

    #[error("permission denied: uid {uid} (role {role}) may not {action} {kind}")]
    PermissionDenied {
        uid: Uid,
        role: String,
        kind: EntityKind,
        action: &'static str,
    },

    #[error("{kind} {key} not found")]
    EntityNotFound { kind: EntityKind, key: i64 },

    #[error("{kind} {key} already exists")]
    EntityExists { kind: EntityKind, key: i64 },

    #[error("{kind} {key} is still referenced by {references} record(s)")]
    EntityInUse {
        kind: EntityKind,
        key: i64,
        references: usize,
    },

    #[error("unknown role: {0}")]
    UnknownRole(RoleId),

    #[error(transparent)]
    Arbiter(#[from] ArbiterError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SessionError>;
