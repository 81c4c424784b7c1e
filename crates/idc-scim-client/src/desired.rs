//! Desired-state input.
//!
//! Users are given in SCIM JSON shape. Groups are given as
//! `{ "displayName": ..., "externalId": ..., "members": [userName | {"value": userName}] }`.
//! Records that fail validation are kept aside as [`Rejected`] so a run can
//! report them and avoid deleting their directory counterparts.

use crate::error::ValidationError;
use crate::models::{ScimGroup, ScimUser};
use serde::Deserialize;
use serde_json::Value;

/// An input record that could not be turned into a valid desired record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejected {
    /// Natural key when it could be read, otherwise the record position.
    pub name: String,
    pub reason: ValidationError,
}

/// A group and the userNames that should belong to it.
#[derive(Debug, Clone, PartialEq)]
pub struct DesiredGroup {
    group: ScimGroup,
    members: Vec<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum MemberInput {
    Name(String),
    Ref { value: String },
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroupInput {
    display_name: String,
    external_id: Option<String>,
    #[serde(default)]
    members: Vec<MemberInput>,
}

impl DesiredGroup {
    pub fn new<S: Into<String>>(
        display_name: impl Into<String>,
        members: impl IntoIterator<Item = S>,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            group: ScimGroup::new(display_name)?,
            members: members.into_iter().map(Into::into).collect(),
        })
    }

    /// Same group with an `externalId` set on create.
    #[must_use]
    pub fn with_external_id(mut self, external_id: impl Into<String>) -> Self {
        self.group = self.group.with_external_id(external_id);
        self
    }

    pub fn from_value(value: Value) -> Result<Self, ValidationError> {
        let input: GroupInput =
            serde_json::from_value(value).map_err(|e| ValidationError::Malformed(e.to_string()))?;
        let mut group = ScimGroup::new(input.display_name)?;
        if let Some(external_id) = input.external_id {
            group = group.with_external_id(external_id);
        }
        let members = input
            .members
            .into_iter()
            .map(|m| match m {
                MemberInput::Name(name) | MemberInput::Ref { value: name } => name,
            })
            .filter(|name| !name.trim().is_empty())
            .collect();
        Ok(Self { group, members })
    }

    #[must_use]
    pub fn group(&self) -> &ScimGroup {
        &self.group
    }

    #[must_use]
    pub fn display_name(&self) -> &str {
        self.group.display_name()
    }

    /// Desired member userNames, in input order.
    #[must_use]
    pub fn members(&self) -> &[String] {
        &self.members
    }
}

/// Desired users plus the input records that were rejected.
#[derive(Debug, Clone, Default)]
pub struct DesiredUsers {
    pub users: Vec<ScimUser>,
    pub rejected: Vec<Rejected>,
}

impl DesiredUsers {
    /// Validate each record independently.
    pub fn parse(values: impl IntoIterator<Item = Value>) -> Self {
        let mut desired = Self::default();
        for (position, value) in values.into_iter().enumerate() {
            let name = natural_key(&value, "userName", position);
            match ScimUser::from_desired(value) {
                Ok(user) => desired.users.push(user),
                Err(reason) => desired.rejected.push(Rejected { name, reason }),
            }
        }
        desired
    }

    /// Accept a JSON array of users or a document with a `users` array.
    pub fn from_json(document: Value) -> Result<Self, ValidationError> {
        Ok(Self::parse(records(document, "users")?))
    }
}

impl From<Vec<ScimUser>> for DesiredUsers {
    fn from(users: Vec<ScimUser>) -> Self {
        Self {
            users,
            rejected: Vec::new(),
        }
    }
}

/// Desired groups plus the input records that were rejected.
#[derive(Debug, Clone, Default)]
pub struct DesiredGroups {
    pub groups: Vec<DesiredGroup>,
    pub rejected: Vec<Rejected>,
}

impl DesiredGroups {
    pub fn parse(values: impl IntoIterator<Item = Value>) -> Self {
        let mut desired = Self::default();
        for (position, value) in values.into_iter().enumerate() {
            let name = natural_key(&value, "displayName", position);
            match DesiredGroup::from_value(value) {
                Ok(group) => desired.groups.push(group),
                Err(reason) => desired.rejected.push(Rejected { name, reason }),
            }
        }
        desired
    }

    /// Accept a JSON array of groups or a document with a `groups` array.
    pub fn from_json(document: Value) -> Result<Self, ValidationError> {
        Ok(Self::parse(records(document, "groups")?))
    }
}

impl From<Vec<DesiredGroup>> for DesiredGroups {
    fn from(groups: Vec<DesiredGroup>) -> Self {
        Self {
            groups,
            rejected: Vec::new(),
        }
    }
}

fn natural_key(value: &Value, key: &str, position: usize) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .map_or_else(|| format!("record #{}", position + 1), str::to_string)
}

fn records(document: Value, key: &str) -> Result<Vec<Value>, ValidationError> {
    match document {
        Value::Array(items) => Ok(items),
        Value::Object(mut map) => match map.remove(key) {
            Some(Value::Array(items)) => Ok(items),
            Some(_) => Err(ValidationError::Malformed(format!("'{key}' must be an array"))),
            None => Ok(Vec::new()),
        },
        _ => Err(ValidationError::Malformed(format!(
            "expected an array or an object with '{key}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_group_members_accept_names_and_refs() {
        let group = DesiredGroup::from_value(json!({
            "displayName": "Eng",
            "externalId": "ext-1",
            "members": ["alice", {"value": "bob"}, ""]
        }))
        .unwrap();
        assert_eq!(group.display_name(), "Eng");
        assert_eq!(group.group().external_id(), Some("ext-1"));
        assert_eq!(group.members(), ["alice", "bob"]);
    }

    #[test]
    fn test_users_parse_keeps_rejected_aside() {
        let desired = DesiredUsers::from_json(json!({
            "users": [
                {"userName": "ok", "emails": [{"value": "ok@example.com"}]},
                {"userName": "two", "emails": [{"value": "a@x.com"}, {"value": "b@x.com"}]},
                {"displayName": "nameless"}
            ]
        }))
        .unwrap();

        assert_eq!(desired.users.len(), 1);
        assert_eq!(desired.rejected.len(), 2);
        assert_eq!(desired.rejected[0].name, "two");
        assert_eq!(desired.rejected[1].name, "record #3");
        assert_eq!(
            desired.rejected[1].reason,
            ValidationError::MissingField("userName")
        );
    }

    #[test]
    fn test_groups_from_array() {
        let desired = DesiredGroups::from_json(json!([
            {"displayName": "A"},
            {"displayName": ""}
        ]))
        .unwrap();
        assert_eq!(desired.groups.len(), 1);
        assert_eq!(desired.rejected[0].reason, ValidationError::MissingField("displayName"));
    }

    #[test]
    fn test_rejects_scalar_document() {
        assert!(DesiredGroups::from_json(json!("nope")).is_err());
    }
}
