//! `phonebook_session` — live sessions and shared request state for the
//! Phonebook directory.
//!
//! Shared mutable state (the session table, the lookup tables, the usage
//! counters) each lives inside its own [`Arbiter`]: a task that owns the
//! value and lends it to one caller at a time. Nothing here takes a lock
//! around shared request state, and nothing holds two grants at once.
//!
//! Modules:
//! - `arbiter`     — rendezvous-based exclusive access to a shared value
//! - `session`     — session records, tokens, breadcrumbs
//! - `table`       — the session map guarded by the session arbiter
//! - `manager`     — authenticate / touch / destroy / sweep
//! - `sweeper`     — background expiry task
//! - `directory`   — gated, filtered entity operations for request handlers
//! - `lookup`      — code <-> name tables
//! - `counters`    — per-operation usage counters
//! - `credentials` — credential store contract and in-memory store
//! - `store`       — entity persistence contract and in-memory store
//! - `cookie`      — session cookie helpers
//! - `config`      — session timeout settings

pub mod arbiter;
pub mod config;
pub mod cookie;
pub mod counters;
pub mod credentials;
pub mod directory;
pub mod error;
pub mod lookup;
pub mod manager;
pub mod session;
pub mod store;
pub mod sweeper;
pub mod table;

pub use arbiter::{Arbiter, ArbiterError, ArbiterGuard};
pub use config::SessionConfig;
pub use counters::{Counter, Counters};
pub use credentials::{Account, CredentialStore, MemoryCredentialStore};
pub use directory::{AdminScreen, Directory, Saved};
pub use error::{Result, SessionError};
pub use lookup::{LookupCache, LookupSeed, LookupTables};
pub use manager::SessionManager;
pub use session::{Breadcrumb, Breadcrumbs, Session, SessionToken};
pub use store::{EntityStore, MemoryEntityStore};
pub use sweeper::SessionSweeper;
