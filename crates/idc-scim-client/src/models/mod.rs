//! Resource model for the restricted SCIM dialect spoken by the directory.

pub mod group;
pub mod list;
pub mod patch;
pub mod user;

pub use group::{GroupMember, ScimGroup};
pub use list::ListPage;
pub use patch::{PatchOpKind, PatchOperation, PatchRequest};
pub use user::{
    Address, Email, EnterpriseUser, Manager, Name, PhoneNumber, Role, ScimUser, UserBuilder,
};

use serde::{Deserialize, Deserializer};

pub const USER_SCHEMA: &str = "urn:ietf:params:scim:schemas:core:2.0:User";
pub const ENTERPRISE_USER_SCHEMA: &str =
    "urn:ietf:params:scim:schemas:extension:enterprise:2.0:User";
pub const GROUP_SCHEMA: &str = "urn:ietf:params:scim:schemas:core:2.0:Group";
pub const PATCH_OP_SCHEMA: &str = "urn:ietf:params:scim:api:messages:2.0:PatchOp";

/// Treat an explicit JSON `null` like a missing field.
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
