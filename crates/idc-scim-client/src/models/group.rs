//! Group resource.
//!
//! Listings never return `members`; they are only filled in when membership
//! is reconstructed explicitly. Membership changes go through PATCH, never
//! through the create body.

use super::GROUP_SCHEMA;
use crate::error::{ScimClientError, ScimClientResult, ValidationError};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Member reference inside a group. The directory does not support `display`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMember {
    #[serde(default)]
    pub value: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(rename = "$ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScimGroup {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(default)]
    display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    external_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty", deserialize_with = "super::nullable")]
    members: Vec<GroupMember>,
    #[serde(skip_serializing_if = "Option::is_none")]
    meta: Option<Value>,
}

impl ScimGroup {
    /// New group. `displayName` is required.
    pub fn new(display_name: impl Into<String>) -> Result<Self, ValidationError> {
        let display_name = display_name.into();
        if display_name.trim().is_empty() {
            return Err(ValidationError::MissingField("displayName"));
        }
        Ok(Self {
            id: None,
            display_name,
            external_id: None,
            members: Vec::new(),
            meta: None,
        })
    }

    #[must_use]
    pub fn with_external_id(mut self, external_id: impl Into<String>) -> Self {
        self.external_id = Some(external_id.into());
        self
    }

    /// Parse a group returned by the directory.
    pub fn from_directory(value: Value) -> ScimClientResult<Self> {
        serde_json::from_value(value)
            .map_err(|e| ScimClientError::ParseError(format!("invalid Group resource: {e}")))
    }

    /// Body for `POST /Groups`. Members are never included.
    #[must_use]
    pub fn to_create_body(&self) -> Value {
        let mut body = json!({
            "schemas": [GROUP_SCHEMA],
            "displayName": self.display_name,
        });
        if let (Some(external_id), Value::Object(map)) = (&self.external_id, &mut body) {
            map.insert("externalId".to_string(), Value::from(external_id.as_str()));
        }
        body
    }

    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    #[must_use]
    pub fn external_id(&self) -> Option<&str> {
        self.external_id.as_deref()
    }

    /// Members, if they were explicitly reconstructed.
    #[must_use]
    pub fn members(&self) -> &[GroupMember] {
        &self.members
    }

    #[must_use]
    pub fn meta(&self) -> Option<&Value> {
        self.meta.as_ref()
    }
}
