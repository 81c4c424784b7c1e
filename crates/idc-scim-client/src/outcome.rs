//! Result of a reconciliation run.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A member reference annotated with its userName.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberRef {
    pub id: String,
    pub user_name: String,
}

/// What changed (or would change, in a dry run) for one natural key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ChangeDetail {
    /// A user was created or replaced.
    User {
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        #[serde(rename = "changedFields", default, skip_serializing_if = "Vec::is_empty")]
        changed_fields: Vec<String>,
    },
    /// A group was created or its membership changed.
    Group {
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        #[serde(default)]
        added: Vec<MemberRef>,
        #[serde(default)]
        removed: Vec<MemberRef>,
        /// Desired member names with no matching user in the directory.
        #[serde(default)]
        skipped: Vec<String>,
    },
    /// A record absent from the desired set was deleted.
    Deleted { id: String },
    /// A user without an externalId was given one.
    #[serde(rename = "externalId", rename_all = "camelCase")]
    ExternalId { id: String, external_id: String },
}

/// Outcome of one phase (users or groups).
///
/// `created`, `updated`, `deleted` and `unchanged` are disjoint. Errors are
/// `"<name>: <message>"` strings in the order they occurred.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncOutcome {
    pub created: Vec<String>,
    pub updated: Vec<String>,
    pub deleted: Vec<String>,
    pub unchanged: Vec<String>,
    pub errors: Vec<String>,
    pub details: BTreeMap<String, ChangeDetail>,
    pub dry_run: bool,
}

impl SyncOutcome {
    #[must_use]
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            ..Self::default()
        }
    }

    pub(crate) fn record_error(&mut self, name: &str, message: impl std::fmt::Display) {
        self.errors.push(format!("{name}: {message}"));
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Number of mutations applied (or planned, in a dry run).
    #[must_use]
    pub fn change_count(&self) -> usize {
        self.created.len() + self.updated.len() + self.deleted.len()
    }
}

/// Outcome of a combined run, one [`SyncOutcome`] per phase.
///
/// Users and groups live in separate namespaces, so a user and a group may
/// share a name without their details colliding.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOutcome {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub users: Option<SyncOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub groups: Option<SyncOutcome>,
}

impl RunOutcome {
    fn phases(&self) -> impl Iterator<Item = &SyncOutcome> {
        self.users.iter().chain(self.groups.iter())
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.phases().any(SyncOutcome::has_errors)
    }

    /// Errors across both phases.
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.phases().map(|p| p.errors.len()).sum()
    }

    #[must_use]
    pub fn change_count(&self) -> usize {
        self.phases().map(SyncOutcome::change_count).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_run_outcome_counts_both_phases() {
        let mut users = SyncOutcome::new(true);
        users.created.push("alice".into());
        users.record_error("bob", "[400] bad email");

        let mut groups = SyncOutcome::new(true);
        groups.unchanged.push("Eng".into());
        groups.record_error("Ops", "boom");

        let run = RunOutcome {
            users: Some(users),
            groups: Some(groups),
        };
        assert!(run.has_errors());
        assert_eq!(run.error_count(), 2);
        assert_eq!(run.change_count(), 1);
    }

    #[test]
    fn test_run_outcome_skips_missing_phase() {
        let run = RunOutcome {
            users: None,
            groups: Some(SyncOutcome::new(false)),
        };
        assert!(!run.has_errors());
        let value = serde_json::to_value(&run).unwrap();
        assert!(value.get("users").is_none());
        assert_eq!(value["groups"]["created"], json!([]));
    }

    #[test]
    fn test_detail_serialization() {
        let detail = ChangeDetail::Group {
            id: Some("g1".into()),
            added: vec![MemberRef {
                id: "u1".into(),
                user_name: "alice".into(),
            }],
            removed: vec![],
            skipped: vec!["ghost".into()],
        };
        assert_eq!(
            serde_json::to_value(&detail).unwrap(),
            json!({
                "kind": "group",
                "id": "g1",
                "added": [{"id": "u1", "userName": "alice"}],
                "removed": [],
                "skipped": ["ghost"]
            })
        );
    }
}
