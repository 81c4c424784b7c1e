//! User resource as the directory accepts it.
//!
//! The directory restricts the multi-valued SCIM attributes: exactly one
//! email, at most one phone number and at most one address. Records built
//! locally go through [`UserBuilder::build`] (or [`ScimUser::from_desired`])
//! and are rejected eagerly when they break a restriction. Records parsed
//! from directory responses are taken as-is.

use super::patch::PatchOperation;
use super::{nullable, ENTERPRISE_USER_SCHEMA, USER_SCHEMA};
use crate::error::{ScimClientError, ScimClientResult, ValidationError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Structured name. Every part is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Name {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formatted: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub middle_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub honorific_prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub honorific_suffix: Option<String>,
}

impl Name {
    /// True when no part is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.formatted.is_none()
            && self.family_name.is_none()
            && self.given_name.is_none()
            && self.middle_name.is_none()
            && self.honorific_prefix.is_none()
            && self.honorific_suffix.is_none()
    }
}

/// Email address. The directory does not support `display`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Email {
    #[serde(default)]
    pub value: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary: Option<bool>,
}

impl Email {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            kind: None,
            primary: None,
        }
    }

    /// Typed (`work`, `home`, ...) primary address.
    pub fn primary(value: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            kind: Some(kind.into()),
            primary: Some(true),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhoneNumber {
    #[serde(default)]
    pub value: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formatted: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub street_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locality: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    #[serde(default)]
    pub value: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary: Option<bool>,
}

/// Manager reference. The directory does not support `displayName` here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manager {
    #[serde(default)]
    pub value: String,
    #[serde(rename = "$ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

/// Enterprise extension block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnterpriseUser {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employee_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_center: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub division: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manager: Option<Manager>,
}

impl EnterpriseUser {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.employee_number.is_none()
            && self.cost_center.is_none()
            && self.organization.is_none()
            && self.division.is_none()
            && self.department.is_none()
            && self.manager.is_none()
    }
}

fn name_is_empty(name: &Option<Name>) -> bool {
    name.as_ref().map_or(true, Name::is_empty)
}

fn enterprise_is_empty(enterprise: &Option<EnterpriseUser>) -> bool {
    enterprise.as_ref().map_or(true, EnterpriseUser::is_empty)
}

/// A user record.
///
/// The derived `Serialize` impl is the plain mode: present attributes only,
/// no `id`, no `schemas`, no `meta`. Request bodies are produced by
/// [`to_create_body`](Self::to_create_body),
/// [`to_replace_body`](Self::to_replace_body) and
/// [`to_patch_operations`](Self::to_patch_operations).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScimUser {
    #[serde(skip_serializing, default)]
    id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    external_id: Option<String>,
    #[serde(default)]
    user_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    nick_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    profile_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    preferred_language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    locale: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    timezone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    active: Option<bool>,
    #[serde(skip_serializing_if = "name_is_empty")]
    name: Option<Name>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Vec::is_empty")]
    emails: Vec<Email>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Vec::is_empty")]
    phone_numbers: Vec<PhoneNumber>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Vec::is_empty")]
    addresses: Vec<Address>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Vec::is_empty")]
    roles: Vec<Role>,
    #[serde(
        rename = "urn:ietf:params:scim:schemas:extension:enterprise:2.0:User",
        skip_serializing_if = "enterprise_is_empty"
    )]
    enterprise: Option<EnterpriseUser>,
    #[serde(skip_serializing, default)]
    meta: Option<Value>,
}

impl ScimUser {
    /// Start building a user with the given `userName`.
    pub fn builder(user_name: impl Into<String>) -> UserBuilder {
        UserBuilder::new(user_name)
    }

    /// Parse and validate a caller-supplied record in SCIM JSON shape.
    pub fn from_desired(value: Value) -> Result<Self, ValidationError> {
        let user: Self =
            serde_json::from_value(value).map_err(|e| ValidationError::Malformed(e.to_string()))?;
        user.validate()?;
        Ok(user)
    }

    /// Parse a record returned by the directory. No restriction is checked.
    pub fn from_directory(value: Value) -> ScimClientResult<Self> {
        serde_json::from_value(value)
            .map_err(|e| ScimClientError::ParseError(format!("invalid User resource: {e}")))
    }

    /// Check the directory's restrictions on a locally built record.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.user_name.trim().is_empty() {
            return Err(ValidationError::MissingField("userName"));
        }
        match self.emails.len() {
            0 => return Err(ValidationError::MissingField("emails")),
            1 => {}
            count => {
                return Err(ValidationError::TooManyValues {
                    attribute: "emails",
                    count,
                })
            }
        }
        if self.emails.iter().any(|e| e.value.trim().is_empty()) {
            return Err(ValidationError::MissingField("emails.value"));
        }
        if self.phone_numbers.len() > 1 {
            return Err(ValidationError::TooManyValues {
                attribute: "phoneNumbers",
                count: self.phone_numbers.len(),
            });
        }
        if self.phone_numbers.iter().any(|p| p.value.trim().is_empty()) {
            return Err(ValidationError::MissingField("phoneNumbers.value"));
        }
        if self.addresses.len() > 1 {
            return Err(ValidationError::TooManyValues {
                attribute: "addresses",
                count: self.addresses.len(),
            });
        }
        let manager = self.enterprise.as_ref().and_then(|e| e.manager.as_ref());
        if manager.is_some_and(|m| m.value.trim().is_empty()) {
            return Err(ValidationError::MissingField("manager.value"));
        }
        Ok(())
    }

    /// Plain serialization used for diffing.
    pub fn to_value(&self) -> ScimClientResult<Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Body for `POST /Users`: schema list, no id.
    pub fn to_create_body(&self) -> ScimClientResult<Value> {
        let mut body = self.to_value()?;
        if let Value::Object(map) = &mut body {
            map.insert("schemas".to_string(), Value::from(self.schemas()));
        }
        Ok(body)
    }

    /// Body for `PUT /Users/{id}`. The directory requires the id in the body.
    pub fn to_replace_body(&self) -> ScimClientResult<Value> {
        let id = self.id.as_deref().ok_or_else(|| ScimClientError::MissingId {
            resource: "User",
            name: self.user_name.clone(),
        })?;
        let mut body = self.to_create_body()?;
        if let Value::Object(map) = &mut body {
            map.insert("id".to_string(), Value::from(id));
        }
        Ok(body)
    }

    /// One `replace` operation per present top-level attribute.
    pub fn to_patch_operations(&self) -> ScimClientResult<Vec<PatchOperation>> {
        let Value::Object(map) = self.to_value()? else {
            return Ok(Vec::new());
        };
        Ok(map
            .into_iter()
            .map(|(path, value)| PatchOperation::replace(path, value))
            .collect())
    }

    fn schemas(&self) -> Vec<&'static str> {
        let mut schemas = vec![USER_SCHEMA];
        if !enterprise_is_empty(&self.enterprise) {
            schemas.push(ENTERPRISE_USER_SCHEMA);
        }
        schemas
    }

    pub(crate) fn set_id(&mut self, id: impl Into<String>) {
        self.id = Some(id.into());
    }

    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    #[must_use]
    pub fn user_name(&self) -> &str {
        &self.user_name
    }

    #[must_use]
    pub fn external_id(&self) -> Option<&str> {
        self.external_id.as_deref()
    }

    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    #[must_use]
    pub fn active(&self) -> Option<bool> {
        self.active
    }

    #[must_use]
    pub fn name(&self) -> Option<&Name> {
        self.name.as_ref()
    }

    /// The single email of a valid record.
    #[must_use]
    pub fn email(&self) -> Option<&Email> {
        self.emails.first()
    }

    #[must_use]
    pub fn phone_number(&self) -> Option<&PhoneNumber> {
        self.phone_numbers.first()
    }

    #[must_use]
    pub fn address(&self) -> Option<&Address> {
        self.addresses.first()
    }

    #[must_use]
    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    #[must_use]
    pub fn enterprise(&self) -> Option<&EnterpriseUser> {
        self.enterprise.as_ref()
    }

    /// Read-only metadata as returned by the directory.
    #[must_use]
    pub fn meta(&self) -> Option<&Value> {
        self.meta.as_ref()
    }
}

/// Builder for [`ScimUser`]. [`build`](Self::build) validates.
#[derive(Debug, Clone)]
pub struct UserBuilder {
    user: ScimUser,
}

impl UserBuilder {
    fn new(user_name: impl Into<String>) -> Self {
        Self {
            user: ScimUser {
                id: None,
                external_id: None,
                user_name: user_name.into(),
                display_name: None,
                nick_name: None,
                profile_url: None,
                title: None,
                user_type: None,
                preferred_language: None,
                locale: None,
                timezone: None,
                active: None,
                name: None,
                emails: Vec::new(),
                phone_numbers: Vec::new(),
                addresses: Vec::new(),
                roles: Vec::new(),
                enterprise: None,
                meta: None,
            },
        }
    }

    #[must_use]
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.user.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn external_id(mut self, external_id: impl Into<String>) -> Self {
        self.user.external_id = Some(external_id.into());
        self
    }

    #[must_use]
    pub fn display_name(mut self, display_name: impl Into<String>) -> Self {
        self.user.display_name = Some(display_name.into());
        self
    }

    #[must_use]
    pub fn nick_name(mut self, nick_name: impl Into<String>) -> Self {
        self.user.nick_name = Some(nick_name.into());
        self
    }

    #[must_use]
    pub fn profile_url(mut self, profile_url: impl Into<String>) -> Self {
        self.user.profile_url = Some(profile_url.into());
        self
    }

    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.user.title = Some(title.into());
        self
    }

    #[must_use]
    pub fn user_type(mut self, user_type: impl Into<String>) -> Self {
        self.user.user_type = Some(user_type.into());
        self
    }

    #[must_use]
    pub fn preferred_language(mut self, preferred_language: impl Into<String>) -> Self {
        self.user.preferred_language = Some(preferred_language.into());
        self
    }

    #[must_use]
    pub fn locale(mut self, locale: impl Into<String>) -> Self {
        self.user.locale = Some(locale.into());
        self
    }

    #[must_use]
    pub fn timezone(mut self, timezone: impl Into<String>) -> Self {
        self.user.timezone = Some(timezone.into());
        self
    }

    #[must_use]
    pub fn active(mut self, active: bool) -> Self {
        self.user.active = Some(active);
        self
    }

    #[must_use]
    pub fn name(mut self, name: Name) -> Self {
        self.user.name = Some(name);
        self
    }

    /// Add an email. More than one fails at [`build`](Self::build).
    #[must_use]
    pub fn email(mut self, email: Email) -> Self {
        self.user.emails.push(email);
        self
    }

    #[must_use]
    pub fn phone_number(mut self, phone: PhoneNumber) -> Self {
        self.user.phone_numbers.push(phone);
        self
    }

    #[must_use]
    pub fn address(mut self, address: Address) -> Self {
        self.user.addresses.push(address);
        self
    }

    #[must_use]
    pub fn role(mut self, role: Role) -> Self {
        self.user.roles.push(role);
        self
    }

    #[must_use]
    pub fn enterprise(mut self, enterprise: EnterpriseUser) -> Self {
        self.user.enterprise = Some(enterprise);
        self
    }

    pub fn build(self) -> Result<ScimUser, ValidationError> {
        self.user.validate()?;
        Ok(self.user)
    }
}
