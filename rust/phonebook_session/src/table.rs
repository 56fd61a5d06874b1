//! The live session map. Only ever touched through its arbiter.

use std::time::Duration;

use ahash::AHashMap;
use tokio::time::Instant;

use crate::session::{Session, SessionToken};

#[derive(Debug, Default)]
pub struct SessionTable {
    sessions: AHashMap<SessionToken, Session>,
}

impl SessionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert unless the token is already taken. Returns the record back on
    /// collision so the caller can retry with a fresh token.
    pub fn insert(&mut self, session: Session) -> Result<(), Session> {
        if self.sessions.contains_key(&session.token) {
            return Err(session);
        }
        self.sessions.insert(session.token.clone(), session);
        Ok(())
    }

    pub fn get(&self, token: &SessionToken) -> Option<&Session> {
        self.sessions.get(token)
    }

    pub fn get_mut(&mut self, token: &SessionToken) -> Option<&mut Session> {
        self.sessions.get_mut(token)
    }

    /// Refresh last-access and return a copy.
    pub fn touch(&mut self, token: &SessionToken, now: Instant) -> Option<Session> {
        let s = self.sessions.get_mut(token)?;
        s.last_access = now;
        Some(s.clone())
    }

    pub fn remove(&mut self, token: &SessionToken) -> Option<Session> {
        self.sessions.remove(token)
    }

    /// Drop every session idle for strictly longer than `timeout`; returns
    /// the removed records.
    pub fn sweep(&mut self, now: Instant, timeout: Duration) -> Vec<Session> {
        let expired: Vec<SessionToken> = self
            .sessions
            .values()
            .filter(|s| s.is_expired(now, timeout))
            .map(|s| s.token.clone())
            .collect();
        expired
            .iter()
            .filter_map(|t| self.sessions.remove(t))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Breadcrumbs;

    fn session(uid: i64, at: Instant) -> Session {
        Session {
            token: SessionToken::generate(uid),
            uid,
            username: format!("user{uid}"),
            display_name: format!("User {uid}"),
            rid: 1,
            role_name: "Viewer".into(),
            created: at,
            last_access: at,
            image: None,
            breadcrumbs: Breadcrumbs::default(),
        }
    }

    #[test]
    fn test_insert_rejects_duplicate_token() {
        let now = Instant::now();
        let mut table = SessionTable::new();
        let s = session(1, now);
        let dup = s.clone();
        table.insert(s).unwrap();
        assert!(table.insert(dup).is_err());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_touch_refreshes_last_access() {
        let t0 = Instant::now();
        let mut table = SessionTable::new();
        let s = session(1, t0);
        let token = s.token.clone();
        table.insert(s).unwrap();

        let later = t0 + Duration::from_secs(30);
        let copy = table.touch(&token, later).unwrap();
        assert_eq!(copy.last_access, later);
        assert_eq!(table.get(&token).unwrap().last_access, later);
        assert_eq!(copy.created, t0);
    }

    #[test]
    fn test_sweep_removes_only_idle() {
        let t0 = Instant::now();
        let mut table = SessionTable::new();
        let old = session(1, t0);
        let fresh = session(2, t0 + Duration::from_secs(300));
        let fresh_token = fresh.token.clone();
        table.insert(old).unwrap();
        table.insert(fresh).unwrap();

        let removed = table.sweep(t0 + Duration::from_secs(601), Duration::from_secs(600));
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].uid, 1);
        assert!(table.get(&fresh_token).is_some());
        assert!(!table.is_empty());
    }
}
