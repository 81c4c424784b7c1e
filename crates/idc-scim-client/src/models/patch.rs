//! PATCH request bodies.

use super::PATCH_OP_SCHEMA;
use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;

/// Patch operation kind.
///
/// Group membership patches accept only `Add` and `Remove`; `Replace` is
/// reserved for user attribute updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchOpKind {
    Add,
    Remove,
    Replace,
}

impl PatchOpKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Remove => "remove",
            Self::Replace => "replace",
        }
    }
}

impl fmt::Display for PatchOpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PatchOpKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "add" => Ok(Self::Add),
            "remove" => Ok(Self::Remove),
            "replace" => Ok(Self::Replace),
            _ => Err(ValidationError::UnsupportedPatchOp(s.to_string())),
        }
    }
}

/// A single operation inside a PATCH body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchOperation {
    pub op: PatchOpKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl PatchOperation {
    /// Replace the attribute at `path`.
    pub fn replace(path: impl Into<String>, value: Value) -> Self {
        Self {
            op: PatchOpKind::Replace,
            path: Some(path.into()),
            value: Some(value),
        }
    }

    /// Add every id in `member_ids` to a group.
    pub fn add_members<S: AsRef<str>>(member_ids: &[S]) -> Self {
        let members: Vec<Value> = member_ids
            .iter()
            .map(|id| json!({ "value": id.as_ref() }))
            .collect();
        Self {
            op: PatchOpKind::Add,
            path: Some("members".to_string()),
            value: Some(Value::Array(members)),
        }
    }

    /// Remove a single member from a group.
    pub fn remove_member(member_id: &str) -> Self {
        Self {
            op: PatchOpKind::Remove,
            path: Some(format!("members[value eq \"{member_id}\"]")),
            value: None,
        }
    }
}

/// `{ schemas: [PatchOp], Operations: [...] }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchRequest {
    pub schemas: Vec<String>,
    #[serde(rename = "Operations")]
    pub operations: Vec<PatchOperation>,
}

impl PatchRequest {
    /// Patch body for a user. Any operation kind is accepted.
    #[must_use]
    pub fn for_user(operations: Vec<PatchOperation>) -> Self {
        Self {
            schemas: vec![PATCH_OP_SCHEMA.to_string()],
            operations,
        }
    }

    /// Patch body for a group. Only membership add/remove is accepted.
    pub fn for_group(operations: Vec<PatchOperation>) -> Result<Self, ValidationError> {
        if operations.iter().any(|op| op.op == PatchOpKind::Replace) {
            return Err(ValidationError::OperationNotAllowed {
                op: PatchOpKind::Replace.as_str(),
                resource: "Group",
            });
        }
        Ok(Self::for_user(operations))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_op_kind_at_boundary() {
        assert_eq!("Add".parse::<PatchOpKind>().unwrap(), PatchOpKind::Add);
        assert_eq!("remove".parse::<PatchOpKind>().unwrap(), PatchOpKind::Remove);
        assert_eq!(
            "move".parse::<PatchOpKind>().unwrap_err(),
            ValidationError::UnsupportedPatchOp("move".into())
        );
    }

    #[test]
    fn test_add_members_body() {
        let request = PatchRequest::for_group(vec![PatchOperation::add_members(&["u1", "u2"])])
            .unwrap();
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "schemas": [PATCH_OP_SCHEMA],
                "Operations": [{
                    "op": "add",
                    "path": "members",
                    "value": [{"value": "u1"}, {"value": "u2"}]
                }]
            })
        );
    }

    #[test]
    fn test_remove_member_has_no_value() {
        let op = PatchOperation::remove_member("u9");
        assert_eq!(
            serde_json::to_value(&op).unwrap(),
            json!({"op": "remove", "path": "members[value eq \"u9\"]"})
        );
    }

    #[test]
    fn test_group_patch_rejects_replace() {
        let err = PatchRequest::for_group(vec![PatchOperation::replace(
            "displayName",
            json!("x"),
        )])
        .unwrap_err();
        assert!(matches!(err, ValidationError::OperationNotAllowed { resource: "Group", .. }));
    }
}
