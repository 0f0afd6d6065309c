//! Update-server (WSUS) client.
//!
//! [`UpdateServer`] is the seam between the servicing pipeline and the WSUS
//! administration API. [`PowerShellUpdateServer`] is the production backend;
//! tests use `testing::MockUpdateServer`.

mod powershell;

pub use powershell::PowerShellUpdateServer;

use anyhow::Result;
use serde::Deserialize;

use crate::error::PatchError;

/// A computer target group as listed by the server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TargetGroup {
    pub id: String,
    pub name: String,
}

/// One file attached to an update's installable items.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FileReference {
    pub uri: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateRecord {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub files: Vec<FileReference>,
}

/// Filter for the update query. Built once per run by [`build_scope`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateScope {
    approved_only: bool,
    target_groups: Vec<String>,
}

impl UpdateScope {
    /// Updates whose latest revision is approved, for any group.
    pub fn approved() -> Self {
        Self {
            approved_only: true,
            target_groups: Vec::new(),
        }
    }

    pub fn approved_only(&self) -> bool {
        self.approved_only
    }

    /// Target-group ids; empty means unrestricted.
    pub fn target_groups(&self) -> &[String] {
        &self.target_groups
    }

    fn restricted_to(mut self, group_id: String) -> Self {
        self.target_groups.push(group_id);
        self
    }
}

/// Trait for the WSUS administration operations vhdpatch needs.
pub trait UpdateServer {
    fn target_groups(&self) -> Result<Vec<TargetGroup>>;

    /// Single blocking query; the API exposes no paging.
    fn updates(&self, scope: &UpdateScope) -> Result<Vec<UpdateRecord>>;
}

/// Build the query scope, resolving `group_name` by exact name.
///
/// An unknown group is an error rather than an unrestricted scope.
pub fn build_scope(server: &dyn UpdateServer, group_name: Option<&str>) -> Result<UpdateScope> {
    let scope = UpdateScope::approved();
    let Some(name) = group_name else {
        return Ok(scope);
    };

    let groups = server.target_groups()?;
    tracing::debug!(count = groups.len(), "listed computer target groups");
    match groups.into_iter().find(|g| g.name == name) {
        Some(group) => {
            tracing::info!(group = %group.name, id = %group.id, "restricting to target group");
            Ok(scope.restricted_to(group.id))
        }
        None => Err(PatchError::GroupNotFound {
            name: name.to_string(),
        }
        .into()),
    }
}

#[cfg(test)]
#[allow(dead_code)]
pub mod testing {
    use super::*;
    use std::cell::RefCell;

    /// In-memory server that records the scopes it was queried with.
    #[derive(Default)]
    pub struct MockUpdateServer {
        pub groups: Vec<TargetGroup>,
        pub updates: Vec<UpdateRecord>,
        queries: RefCell<Vec<UpdateScope>>,
    }

    impl MockUpdateServer {
        pub fn new(updates: Vec<UpdateRecord>) -> Self {
            Self {
                updates,
                ..Default::default()
            }
        }

        pub fn with_group(mut self, id: &str, name: &str) -> Self {
            self.groups.push(TargetGroup {
                id: id.to_string(),
                name: name.to_string(),
            });
            self
        }

        pub fn queries(&self) -> Vec<UpdateScope> {
            self.queries.borrow().clone()
        }
    }

    impl UpdateServer for MockUpdateServer {
        fn target_groups(&self) -> Result<Vec<TargetGroup>> {
            Ok(self.groups.clone())
        }

        fn updates(&self, scope: &UpdateScope) -> Result<Vec<UpdateRecord>> {
            self.queries.borrow_mut().push(scope.clone());
            Ok(self.updates.clone())
        }
    }

    pub fn record(title: &str, uris: &[&str]) -> UpdateRecord {
        UpdateRecord {
            title: title.to_string(),
            files: uris
                .iter()
                .map(|uri| FileReference {
                    uri: uri.to_string(),
                    name: String::new(),
                })
                .collect(),
        }
    }
}
