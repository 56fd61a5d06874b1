//! Role loading.
//!
//! Roles come from the role store once at startup. The store is an external
//! collaborator; the core only needs something that can produce the list.

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::types::Role;

/// Anything that can produce the process-wide role list.
pub trait RoleSource {
    fn load_roles(&self) -> Result<Vec<Role>>;
}

impl RoleSource for Vec<Role> {
    fn load_roles(&self) -> Result<Vec<Role>> {
        Ok(self.clone())
    }
}

/// Parse a JSON array of roles.
pub fn parse_roles(json: &str) -> Result<Vec<Role>> {
    Ok(serde_json::from_str(json)?)
}

/// Reads roles from a JSON file on disk.
#[derive(Debug, Clone)]
pub struct JsonRoleSource {
    path: PathBuf,
}

impl JsonRoleSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl RoleSource for JsonRoleSource {
    fn load_roles(&self) -> Result<Vec<Role>> {
        let text = std::fs::read_to_string(&self.path)?;
        let roles = parse_roles(&text)?;
        tracing::info!(path = %self.path.display(), count = roles.len(), "roles loaded");
        Ok(roles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use crate::permissions::PermissionTable;
    use crate::types::{EntityKind, Perm};
    use std::io::Write;

    const ROLES: &str = r#"[
        {"rid": 2, "name": "Manager", "descr": "People managers", "perms": [
            {"elem": "Person", "field": "HomeCity", "perm": "VIEW"},
            {"elem": "Person", "field": "EmergencyContactName", "perm": "OWNER_VIEW | OWNER_MODIFY"}
        ]},
        {"rid": 1, "name": "Viewer", "perms": []}
    ]"#;

    #[test]
    fn parse_role_list() {
        let roles = parse_roles(ROLES).unwrap();
        assert_eq!(roles.len(), 2);
        assert_eq!(roles[0].perms[1].perm, Perm::OWNER_VIEW | Perm::OWNER_MODIFY);
        assert!(roles[1].descr.is_empty());
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(ROLES.as_bytes()).unwrap();

        let table = PermissionTable::load(&JsonRoleSource::new(file.path())).unwrap();
        assert_eq!(table.roles()[0].name, "Viewer");
        assert_eq!(table.lookup(2, EntityKind::Person, "HomeCity"), Perm::VIEW);
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = PermissionTable::load(&JsonRoleSource::new("/nonexistent/roles.json"));
        assert!(matches!(err, Err(CoreError::Io(_))));
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(matches!(parse_roles("[{\"rid\":"), Err(CoreError::Json(_))));
    }
}
