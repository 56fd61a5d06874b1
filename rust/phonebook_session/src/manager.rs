//! Session lifecycle: authenticate, touch, destroy, sweep.
//!
//! ```text
//!   Anonymous ──authenticate──▶ Active ──destroy / sweep──▶ Terminated
//!                                 │ ▲
//!                                 └─┘ touch
//! ```
//!
//! Credential checks run before the session arbiter is requested; every
//! table operation is a synchronous closure over the arbitrated map.

use std::sync::Arc;
use std::time::Duration;

use phonebook_core::PermissionTable;
use tokio::time::Instant;

use crate::arbiter::Arbiter;
use crate::config::SessionConfig;
use crate::credentials::CredentialStore;
use crate::error::{Result, SessionError};
use crate::session::{Breadcrumbs, Session, SessionToken};
use crate::table::SessionTable;

/// Handle to the live session table. Cheap to clone.
#[derive(Clone)]
pub struct SessionManager {
    table: Arbiter<SessionTable>,
    credentials: Arc<dyn CredentialStore>,
    permissions: Arc<PermissionTable>,
    config: SessionConfig,
}

impl SessionManager {
    /// Start the session arbiter. Must be called from within a Tokio runtime.
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        permissions: Arc<PermissionTable>,
        config: SessionConfig,
    ) -> Self {
        Self {
            table: Arbiter::spawn("sessions", SessionTable::new()),
            credentials,
            permissions,
            config,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn permissions(&self) -> &Arc<PermissionTable> {
        &self.permissions
    }

    /// Verify credentials and open a new session.
    pub async fn authenticate(&self, username: &str, secret: &str) -> Result<Session> {
        let Some(uid) = self.credentials.verify(username, secret) else {
            tracing::info!(username, "sign-in refused");
            return Err(SessionError::AuthenticationFailure);
        };
        let account = self
            .credentials
            .profile(uid)
            .ok_or(SessionError::AuthenticationFailure)?;
        let role = self
            .permissions
            .role(account.rid)
            .ok_or(SessionError::UnknownRole(account.rid))?;

        let now = Instant::now();
        let mut session = Session {
            token: SessionToken::generate(uid),
            uid,
            username: account.username,
            display_name: account.display_name,
            rid: role.rid,
            role_name: role.name.clone(),
            created: now,
            last_access: now,
            image: account.image,
            breadcrumbs: Breadcrumbs::default(),
        };

        loop {
            let inserted = self
                .table
                .with(|t| {
                    let copy = session.clone();
                    t.insert(session).map(|()| copy)
                })
                .await?;
            match inserted {
                Ok(copy) => {
                    tracing::info!(uid, role = %role.name, "session opened");
                    return Ok(copy);
                }
                Err(mut rejected) => {
                    tracing::warn!(uid, "session token collision, regenerating");
                    rejected.token = SessionToken::generate(uid);
                    session = rejected;
                }
            }
        }
    }

    /// Refresh last-access and return a copy of the session.
    pub async fn touch(&self, token: &SessionToken) -> Result<Session> {
        let now = Instant::now();
        self.table
            .with(|t| t.touch(token, now))
            .await?
            .ok_or(SessionError::SessionNotFound)
    }

    /// Copy of the session without refreshing it.
    pub async fn get(&self, token: &SessionToken) -> Result<Session> {
        self.table
            .with(|t| t.get(token).cloned())
            .await?
            .ok_or(SessionError::SessionNotFound)
    }

    /// Terminate the session. Idempotent; returns whether a record existed.
    pub async fn destroy(&self, token: &SessionToken) -> Result<bool> {
        let removed = self.table.with(|t| t.remove(token)).await?;
        if let Some(s) = &removed {
            tracing::info!(uid = s.uid, "session closed");
        }
        Ok(removed.is_some())
    }

    /// Remove every session idle for strictly longer than `timeout`.
    pub async fn sweep_expired(&self, now: Instant, timeout: Duration) -> Result<usize> {
        let removed = self.table.with(|t| t.sweep(now, timeout)).await?;
        for s in &removed {
            tracing::info!(uid = s.uid, username = %s.username, "session expired");
        }
        Ok(removed.len())
    }

    pub async fn push_breadcrumb(
        &self,
        token: &SessionToken,
        label: &str,
        path: &str,
    ) -> Result<()> {
        self.table
            .with(|t| t.get_mut(token).map(|s| s.breadcrumbs.push(label, path)))
            .await?
            .ok_or(SessionError::SessionNotFound)
    }

    /// Pop `n` breadcrumbs and return the redirect target.
    pub async fn breadcrumb_back(&self, token: &SessionToken, n: usize) -> Result<String> {
        self.table
            .with(|t| t.get_mut(token).map(|s| s.breadcrumbs.back(n)))
            .await?
            .ok_or(SessionError::SessionNotFound)
    }

    /// Reflect an owner's edit of their own record in the live session.
    pub async fn update_profile(
        &self,
        token: &SessionToken,
        display_name: &str,
        image: Option<String>,
    ) -> Result<()> {
        self.table
            .with(|t| {
                t.get_mut(token).map(|s| {
                    s.display_name = display_name.to_string();
                    s.image = image;
                })
            })
            .await?
            .ok_or(SessionError::SessionNotFound)
    }

    /// Number of live sessions.
    pub async fn len(&self) -> Result<usize> {
        Ok(self.table.with(|t| t.len()).await?)
    }
}
