//! Arbiter — exclusive access to a shared region through a rendezvous.
//!
//! One background task owns the protected value. A caller sends a request
//! carrying a reply channel; the task answers with a grant that *moves the
//! value itself* to the caller; dropping the grant moves it back, which is
//! the completion signal. The task does not look at the next request until
//! the value has come back.
//!
//! ```text
//!   caller A ──request──┐
//!   caller B ──request──┤   ┌────────────────┐  grant(T)   ┌──────────┐
//!   sweeper  ──request──┴─▶ │ arbitration    │ ──────────▶ │  holder  │
//!                           │ loop (owns T)  │ ◀────────── │          │
//!                           └────────────────┘  release(T) └──────────┘
//! ```
//!
//! Because the value travels with the grant there is no lock and no
//! `unsafe`: at most one [`ArbiterGuard`] can exist, and the region cannot
//! be touched without one. Release happens in `Drop`, so it runs on normal
//! return, on `?` and during panic unwinding.

use std::fmt;
use std::ops::{Deref, DerefMut};

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

/// Pending requests allowed before `acquire` itself waits to enqueue.
const REQUEST_QUEUE_DEPTH: usize = 256;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ArbiterError {
    /// The arbitration task is gone: either every handle was dropped or a
    /// grant was leaked and the region is lost. Both are programming errors.
    #[error("arbiter '{0}' is closed")]
    Closed(&'static str),
}

type Request<T> = oneshot::Sender<ArbiterGuard<T>>;

/// Handle to an arbitrated region. Cheap to clone; the arbitration task
/// stops when the last handle is dropped.
pub struct Arbiter<T> {
    name: &'static str,
    requests: mpsc::Sender<Request<T>>,
}

impl<T> Clone for Arbiter<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            requests: self.requests.clone(),
        }
    }
}

impl<T> fmt::Debug for Arbiter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arbiter").field("name", &self.name).finish()
    }
}

impl<T: Send + 'static> Arbiter<T> {
    /// Start the arbitration task for `state`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn(name: &'static str, state: T) -> Self {
        let (requests, rx) = mpsc::channel(REQUEST_QUEUE_DEPTH);
        tokio::spawn(arbitrate(name, state, rx));
        tracing::debug!(arbiter = name, "arbiter started");
        Self { name, requests }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Wait for exclusive access. The returned guard releases on drop.
    ///
    /// Do not hold the guard across unrelated `.await` points, and never
    /// acquire a second arbiter while holding one.
    pub async fn acquire(&self) -> Result<ArbiterGuard<T>, ArbiterError> {
        let (reply, grant) = oneshot::channel();
        self.requests
            .send(reply)
            .await
            .map_err(|_| ArbiterError::Closed(self.name))?;
        grant.await.map_err(|_| ArbiterError::Closed(self.name))
    }

    /// Run `f` with exclusive access and release before returning.
    ///
    /// `f` is synchronous, so nothing can be awaited (no I/O, no second
    /// arbiter) inside the critical section.
    pub async fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> Result<R, ArbiterError> {
        let mut guard = self.acquire().await?;
        Ok(f(&mut *guard))
    }
}

/// The arbitration loop: request -> grant -> wait for release -> next.
async fn arbitrate<T: Send + 'static>(
    name: &'static str,
    mut state: T,
    mut requests: mpsc::Receiver<Request<T>>,
) {
    while let Some(reply) = requests.recv().await {
        let (release, returned) = oneshot::channel();
        let guard = ArbiterGuard {
            grant: Some(Grant { state, release }),
        };
        // If the requester stopped waiting, the guard comes back here and
        // dropping it returns the state through `release` like any holder.
        if let Err(unclaimed) = reply.send(guard) {
            drop(unclaimed);
        }
        match returned.await {
            Ok(s) => state = s,
            Err(_) => {
                tracing::error!(
                    arbiter = name,
                    "grant dropped without release; shared region lost, arbiter stopping"
                );
                return;
            }
        }
    }
    tracing::debug!(arbiter = name, "arbiter stopped");
}

#[derive(Debug)]
struct Grant<T> {
    state: T,
    release: oneshot::Sender<T>,
}

/// Exclusive access to the arbitrated value. Dropping it is the release.
#[derive(Debug)]
pub struct ArbiterGuard<T> {
    grant: Option<Grant<T>>,
}

impl<T> Deref for ArbiterGuard<T> {
    type Target = T;

    fn deref(&self) -> &T {
        // Only `Drop` takes the grant out.
        &self.grant.as_ref().expect("grant held until drop").state
    }
}

impl<T> DerefMut for ArbiterGuard<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.grant.as_mut().expect("grant held until drop").state
    }
}

impl<T> Drop for ArbiterGuard<T> {
    fn drop(&mut self) {
        if let Some(Grant { state, release }) = self.grant.take() {
            // Fails only if the arbitration task is already gone (runtime
            // shutdown); the state is dropped with us in that case.
            let _ = release.send(state);
        }
    }
}
