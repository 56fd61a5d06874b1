//! Code <-> name lookup tables shared by request handlers.
//!
//! Loaded at startup from the entity store and a seed file, then kept in
//! step with company and class edits. Lives behind its own arbiter,
//! independent of the session table.

use std::path::Path;

use ahash::AHashMap;
use phonebook_core::{EntityKind, EntityRecord};
use serde::{Deserialize, Serialize};

use crate::arbiter::Arbiter;
use crate::error::Result;
use crate::store::EntityStore;

/// Bidirectional map between an integer code and a display name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeMap {
    by_code: AHashMap<i64, String>,
    by_name: AHashMap<String, i64>,
}

impl CodeMap {
    /// Insert or rename. A rename drops the stale name.
    pub fn insert(&mut self, code: i64, name: impl Into<String>) {
        let name = name.into();
        if let Some(old) = self.by_code.insert(code, name.clone()) {
            self.by_name.remove(&old);
        }
        self.by_name.insert(name, code);
    }

    pub fn remove(&mut self, code: i64) -> Option<String> {
        let name = self.by_code.remove(&code)?;
        self.by_name.remove(&name);
        Some(name)
    }

    pub fn name(&self, code: i64) -> Option<&str> {
        self.by_code.get(&code).map(String::as_str)
    }

    pub fn code(&self, name: &str) -> Option<i64> {
        self.by_name.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.by_code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_code.is_empty()
    }

    /// Entries sorted by code, for selection lists.
    pub fn entries(&self) -> Vec<CodeName> {
        let mut out: Vec<CodeName> = self
            .by_code
            .iter()
            .map(|(code, name)| CodeName {
                code: *code,
                name: name.clone(),
            })
            .collect();
        out.sort_by_key(|e| e.code);
        out
    }
}

impl FromIterator<CodeName> for CodeMap {
    fn from_iter<I: IntoIterator<Item = CodeName>>(iter: I) -> Self {
        let mut map = CodeMap::default();
        for e in iter {
            map.insert(e.code, e.name);
        }
        map
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeName {
    pub code: i64,
    pub name: String,
}

/// Job titles and departments have no entity of their own; they come from
/// a seed file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LookupSeed {
    #[serde(default)]
    pub job_titles: Vec<CodeName>,
    #[serde(default)]
    pub departments: Vec<CodeName>,
}

impl LookupSeed {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Ok(serde_json::from_str(&std::fs::read_to_string(path)?)?)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LookupTables {
    /// Company code <-> common name.
    pub companies: CodeMap,
    /// Class code <-> designation.
    pub classes: CodeMap,
    pub job_titles: CodeMap,
    pub departments: CodeMap,
}

impl LookupTables {
    /// Build from stored companies and classes plus the seed lists.
    pub fn build(store: &dyn EntityStore, seed: LookupSeed) -> Result<Self> {
        let mut tables = LookupTables {
            job_titles: seed.job_titles.into_iter().collect(),
            departments: seed.departments.into_iter().collect(),
            ..Default::default()
        };
        for kind in [EntityKind::Company, EntityKind::Class] {
            for record in store.list(kind)? {
                tables.apply(&record);
            }
        }
        Ok(tables)
    }

    /// Track a saved company or class.
    pub fn apply(&mut self, record: &EntityRecord) {
        match record {
            EntityRecord::Company(c) => self.companies.insert(c.co_code, c.common_name.clone()),
            EntityRecord::Class(c) => self.classes.insert(c.class_code, c.designation.clone()),
            EntityRecord::Person(_) => {}
        }
    }

    /// Forget a deleted company or class.
    pub fn forget(&mut self, kind: EntityKind, code: i64) {
        match kind {
            EntityKind::Company => {
                self.companies.remove(code);
            }
            EntityKind::Class => {
                self.classes.remove(code);
            }
            EntityKind::Person | EntityKind::Service => {}
        }
    }
}

/// Arbitrated handle to the lookup tables.
#[derive(Debug, Clone)]
pub struct LookupCache {
    tables: Arbiter<LookupTables>,
}

impl LookupCache {
    pub fn new(tables: LookupTables) -> Self {
        Self {
            tables: Arbiter::spawn("lookups", tables),
        }
    }

    pub async fn company_name(&self, code: i64) -> Result<Option<String>> {
        Ok(self
            .tables
            .with(|t| t.companies.name(code).map(str::to_string))
            .await?)
    }

    pub async fn company_code(&self, name: &str) -> Result<Option<i64>> {
        Ok(self.tables.with(|t| t.companies.code(name)).await?)
    }

    pub async fn class_name(&self, code: i64) -> Result<Option<String>> {
        Ok(self
            .tables
            .with(|t| t.classes.name(code).map(str::to_string))
            .await?)
    }

    pub async fn class_code(&self, name: &str) -> Result<Option<i64>> {
        Ok(self.tables.with(|t| t.classes.code(name)).await?)
    }

    pub async fn job_code(&self, title: &str) -> Result<Option<i64>> {
        Ok(self.tables.with(|t| t.job_titles.code(title)).await?)
    }

    pub async fn dept_code(&self, name: &str) -> Result<Option<i64>> {
        Ok(self.tables.with(|t| t.departments.code(name)).await?)
    }

    pub async fn apply(&self, record: &EntityRecord) -> Result<()> {
        Ok(self.tables.with(|t| t.apply(record)).await?)
    }

    pub async fn forget(&self, kind: EntityKind, code: i64) -> Result<()> {
        Ok(self.tables.with(|t| t.forget(kind, code)).await?)
    }

    /// Private copy for a page render, so the grant is not held while the
    /// page is built.
    pub async fn snapshot(&self) -> Result<LookupTables> {
        Ok(self.tables.with(|t| t.clone()).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryEntityStore;
    use phonebook_core::Company;

    #[test]
    fn test_code_map_rename() {
        let mut m = CodeMap::default();
        m.insert(1, "Acme");
        m.insert(1, "Acme Corp");
        assert_eq!(m.name(1), Some("Acme Corp"));
        assert_eq!(m.code("Acme"), None);
        assert_eq!(m.code("Acme Corp"), Some(1));
        assert_eq!(m.remove(1).as_deref(), Some("Acme Corp"));
        assert!(m.is_empty());
    }

    #[tokio::test]
    async fn test_build_and_update() {
        let store = MemoryEntityStore::from_json(
            r#"[
                {"kind": "Company", "CoCode": 10, "CommonName": "Acme"},
                {"kind": "Class", "ClassCode": 3, "Designation": "ENG"},
                {"kind": "Person", "UID": 1}
            ]"#,
        )
        .unwrap();
        let seed = LookupSeed {
            job_titles: vec![CodeName {
                code: 7,
                name: "Engineer".into(),
            }],
            departments: vec![],
        };
        let cache = LookupCache::new(LookupTables::build(&store, seed).unwrap());

        assert_eq!(cache.company_name(10).await.unwrap().as_deref(), Some("Acme"));
        assert_eq!(cache.class_code("ENG").await.unwrap(), Some(3));
        assert_eq!(cache.job_code("Engineer").await.unwrap(), Some(7));
        assert_eq!(cache.dept_code("Sales").await.unwrap(), None);

        let renamed = EntityRecord::Company(Company {
            co_code: 10,
            common_name: "Acme Corp".into(),
            ..Default::default()
        });
        cache.apply(&renamed).await.unwrap();
        assert_eq!(cache.company_code("Acme").await.unwrap(), None);
        assert_eq!(cache.company_code("Acme Corp").await.unwrap(), Some(10));

        cache.forget(EntityKind::Class, 3).await.unwrap();
        let snap = cache.snapshot().await.unwrap();
        assert!(snap.classes.is_empty());
        assert_eq!(snap.companies.entries().len(), 1);
    }
}
