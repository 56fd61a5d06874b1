//! Session records, tokens and navigation history.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use phonebook_core::{Principal, RoleId, Uid};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

/// Most breadcrumbs kept per session; the oldest is dropped beyond this.
pub const MAX_BREADCRUMBS: usize = 10;

/// Where `breadcrumb_back` sends a session with an empty trail.
pub const DEFAULT_BACK_PATH: &str = "/search/";

const TOKEN_HEX_LEN: usize = 64;

/// Opaque session identifier presented by the client on every request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    /// Fresh 64-hex-char token.
    ///
    /// BLAKE3 over a random v4 UUID, the uid and the wall clock in
    /// nanoseconds. The UUID carries the entropy; the other inputs only
    /// separate tokens minted in the same instant.
    pub fn generate(uid: Uid) -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        let mut hasher = blake3::Hasher::new();
        hasher.update(uuid::Uuid::new_v4().as_bytes());
        hasher.update(&uid.to_le_bytes());
        hasher.update(&nanos.to_le_bytes());
        Self(hasher.finalize().to_hex().to_string())
    }

    /// Accepts only well-formed tokens: 64 lowercase hex characters.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        let well_formed = s.len() == TOKEN_HEX_LEN
            && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'));
        well_formed.then(|| Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SessionToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breadcrumb {
    pub label: String,
    pub path: String,
}

/// Bounded navigation history.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Breadcrumbs {
    trail: Vec<Breadcrumb>,
}

impl Breadcrumbs {
    /// Append `path`. Revisiting a path already on the trail truncates the
    /// trail back to that entry instead of growing a loop.
    pub fn push(&mut self, label: impl Into<String>, path: impl Into<String>) {
        let path = path.into();
        if let Some(i) = self.trail.iter().position(|b| b.path == path) {
            self.trail.truncate(i + 1);
            self.trail[i].label = label.into();
            return;
        }
        if self.trail.len() == MAX_BREADCRUMBS {
            self.trail.remove(0);
        }
        self.trail.push(Breadcrumb {
            label: label.into(),
            path,
        });
    }

    /// Pop `n` entries and return the path of the last one popped.
    ///
    /// The returned path is a redirect target; the page it names pushes
    /// itself again when rendered. Falls back to [`DEFAULT_BACK_PATH`] when
    /// nothing could be popped.
    pub fn back(&mut self, n: usize) -> String {
        let mut target = None;
        for _ in 0..n {
            match self.trail.pop() {
                Some(b) => target = Some(b.path),
                None => break,
            }
        }
        target.unwrap_or_else(|| DEFAULT_BACK_PATH.to_string())
    }

    pub fn current(&self) -> Option<&Breadcrumb> {
        self.trail.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Breadcrumb> {
        self.trail.iter()
    }

    pub fn len(&self) -> usize {
        self.trail.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trail.is_empty()
    }
}

/// One authenticated user's live session.
///
/// Callers always receive copies; the authoritative record lives in the
/// session table and only changes under its arbiter.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: SessionToken,
    pub uid: Uid,
    pub username: String,
    pub display_name: String,
    pub rid: RoleId,
    pub role_name: String,
    pub created: Instant,
    pub last_access: Instant,
    pub image: Option<String>,
    pub breadcrumbs: Breadcrumbs,
}

impl Session {
    pub fn principal(&self) -> Principal {
        Principal::new(self.uid, self.rid)
    }

    /// True once the record has been idle for strictly longer than `timeout`.
    pub fn is_expired(&self, now: Instant, timeout: std::time::Duration) -> bool {
        now.saturating_duration_since(self.last_access) > timeout
    }
}
