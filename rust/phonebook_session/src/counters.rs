//! Per-operation usage counters, behind their own arbiter.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::arbiter::Arbiter;
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Counter {
    SignIn,
    SignOut,
    Search,
    ViewPerson,
    ViewCompany,
    ViewClass,
    EditPerson,
    EditCompany,
    EditClass,
    DeletePerson,
    DeleteCompany,
    DeleteClass,
    CreatePerson,
    CreateCompany,
    CreateClass,
    Refused,
}

pub type CounterSnapshot = BTreeMap<Counter, u64>;

#[derive(Debug, Clone)]
pub struct Counters {
    counts: Arbiter<CounterSnapshot>,
}

impl Default for Counters {
    fn default() -> Self {
        Self::new()
    }
}

impl Counters {
    /// Must be called from within a Tokio runtime.
    pub fn new() -> Self {
        Self {
            counts: Arbiter::spawn("counters", BTreeMap::new()),
        }
    }

    /// Increment and return the new value.
    pub async fn bump(&self, counter: Counter) -> Result<u64> {
        Ok(self
            .counts
            .with(|c| {
                let n = c.entry(counter).or_insert(0);
                *n += 1;
                *n
            })
            .await?)
    }

    pub async fn get(&self, counter: Counter) -> Result<u64> {
        Ok(self
            .counts
            .with(|c| c.get(&counter).copied().unwrap_or(0))
            .await?)
    }

    pub async fn snapshot(&self) -> Result<CounterSnapshot> {
        Ok(self.counts.with(|c| c.clone()).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_bumps_are_exact() {
        let counters = Counters::new();
        let mut tasks = Vec::new();
        for _ in 0..16 {
            let c = counters.clone();
            tasks.push(tokio::spawn(async move {
                for _ in 0..25 {
                    c.bump(Counter::EditPerson).await.unwrap();
                }
            }));
        }
        for t in tasks {
            t.await.unwrap();
        }
        assert_eq!(counters.get(Counter::EditPerson).await.unwrap(), 400);
        assert_eq!(counters.get(Counter::SignIn).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_snapshot_serializes_by_name() {
        let counters = Counters::new();
        counters.bump(Counter::SignIn).await.unwrap();
        counters.bump(Counter::SignIn).await.unwrap();
        counters.bump(Counter::Search).await.unwrap();

        let json = serde_json::to_string(&counters.snapshot().await.unwrap()).unwrap();
        assert_eq!(json, r#"{"SignIn":2,"Search":1}"#);
    }
}
