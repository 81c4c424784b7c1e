//! Typed resource client.
//!
//! Wraps a [`Transport`] with user and group operations and the directory's
//! membership rules: group membership is only mutable through PATCH, at most
//! [`MAX_BATCH_SIZE`] members per call, and is only readable through the
//! reverse `members.value eq` query.

use crate::config::ScimConfig;
use crate::error::{ScimClientError, ScimClientResult};
use crate::filter::Filter;
use crate::models::{PatchOperation, PatchRequest, ScimGroup, ScimUser};
use crate::pagination;
use crate::transport::{HttpTransport, Transport};
use futures::stream::{Stream, TryStreamExt};
use serde_json::Value;
use tracing::debug;

/// Maximum member ids (or remove operations) per membership PATCH.
pub const MAX_BATCH_SIZE: usize = 100;

const USERS: &str = "/Users";
const GROUPS: &str = "/Groups";

/// Client for the directory's user and group resources.
#[derive(Debug, Clone)]
pub struct ScimClient<T: Transport = HttpTransport> {
    transport: T,
}

impl ScimClient<HttpTransport> {
    /// Build an HTTP client from validated settings.
    pub fn from_config(config: &ScimConfig) -> ScimClientResult<Self> {
        Ok(Self::new(HttpTransport::new(config)?))
    }
}

impl<T: Transport> ScimClient<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    // ── User Operations ───────────────────────────────────────────────

    /// Lazily list users, optionally filtered.
    pub fn list_users(
        &self,
        filter: Option<Filter>,
    ) -> impl Stream<Item = ScimClientResult<ScimUser>> + Send + '_ {
        pagination::paginate(&self.transport, USERS, filter)
            .and_then(|value| async move { ScimUser::from_directory(value) })
    }

    pub async fn get_all_users(&self, filter: Option<Filter>) -> ScimClientResult<Vec<ScimUser>> {
        self.list_users(filter).try_collect().await
    }

    /// Get a user by server id (GET /Users/:id).
    pub async fn get_user(&self, id: &str) -> ScimClientResult<ScimUser> {
        let body = self.transport.get(&user_path(id), &[]).await?;
        ScimUser::from_directory(require_body(body, "GET", "User")?)
    }

    pub async fn find_user_by_username(&self, user_name: &str) -> ScimClientResult<Option<ScimUser>> {
        pagination::first(&self.transport, USERS, Some(Filter::user_name(user_name)))
            .await?
            .map(ScimUser::from_directory)
            .transpose()
    }

    /// Create a user (POST /Users).
    pub async fn create_user(&self, user: &ScimUser) -> ScimClientResult<ScimUser> {
        let body = self.transport.post(USERS, &user.to_create_body()?).await?;
        ScimUser::from_directory(require_body(body, "POST", "User")?)
    }

    /// Replace a user (PUT /Users/:id). The record must carry its server id.
    pub async fn replace_user(&self, user: &ScimUser) -> ScimClientResult<ScimUser> {
        let body = user.to_replace_body()?;
        let id = user.id().ok_or_else(|| ScimClientError::MissingId {
            resource: "User",
            name: user.user_name().to_string(),
        })?;
        match self.transport.put(&user_path(id), &body).await? {
            Some(updated) => ScimUser::from_directory(updated),
            None => Ok(user.clone()),
        }
    }

    /// Patch a user (PATCH /Users/:id). Returns `None` on an empty response.
    pub async fn patch_user(
        &self,
        id: &str,
        operations: Vec<PatchOperation>,
    ) -> ScimClientResult<Option<ScimUser>> {
        let request = PatchRequest::for_user(operations);
        let body = serde_json::to_value(&request)?;
        self.transport
            .patch(&user_path(id), &body)
            .await?
            .map(ScimUser::from_directory)
            .transpose()
    }

    /// Delete a user (DELETE /Users/:id).
    pub async fn delete_user(&self, id: &str) -> ScimClientResult<()> {
        self.transport.delete(&user_path(id)).await
    }

    /// Set a user's `externalId`, generating a UUID when none is given.
    ///
    /// Returns the value that was written.
    pub async fn set_user_external_id(
        &self,
        id: &str,
        external_id: Option<&str>,
    ) -> ScimClientResult<String> {
        let external_id = external_id
            .map(str::to_string)
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        self.patch_user(
            id,
            vec![PatchOperation::replace("externalId", Value::from(external_id.as_str()))],
        )
        .await?;
        Ok(external_id)
    }

    // ── Group Operations ──────────────────────────────────────────────

    /// Lazily list groups. Members are never populated.
    pub fn list_groups(
        &self,
        filter: Option<Filter>,
    ) -> impl Stream<Item = ScimClientResult<ScimGroup>> + Send + '_ {
        pagination::paginate(&self.transport, GROUPS, filter)
            .and_then(|value| async move { ScimGroup::from_directory(value) })
    }

    pub async fn get_all_groups(&self, filter: Option<Filter>) -> ScimClientResult<Vec<ScimGroup>> {
        self.list_groups(filter).try_collect().await
    }

    /// Get a group by server id (GET /Groups/:id).
    pub async fn get_group(&self, id: &str) -> ScimClientResult<ScimGroup> {
        let body = self.transport.get(&group_path(id), &[]).await?;
        ScimGroup::from_directory(require_body(body, "GET", "Group")?)
    }

    pub async fn find_group_by_name(&self, display_name: &str) -> ScimClientResult<Option<ScimGroup>> {
        pagination::first(&self.transport, GROUPS, Some(Filter::display_name(display_name)))
            .await?
            .map(ScimGroup::from_directory)
            .transpose()
    }

    /// Create a group (POST /Groups). Members are added separately.
    pub async fn create_group(&self, group: &ScimGroup) -> ScimClientResult<ScimGroup> {
        let body = self.transport.post(GROUPS, &group.to_create_body()).await?;
        ScimGroup::from_directory(require_body(body, "POST", "Group")?)
    }

    /// Delete a group (DELETE /Groups/:id).
    pub async fn delete_group(&self, id: &str) -> ScimClientResult<()> {
        self.transport.delete(&group_path(id)).await
    }

    // ── Membership ────────────────────────────────────────────────────

    /// Add members in batches of at most [`MAX_BATCH_SIZE`] ids, in order.
    ///
    /// A failing batch aborts the remaining ones; earlier batches stay applied.
    pub async fn add_group_members<S: AsRef<str> + Sync>(
        &self,
        group_id: &str,
        user_ids: &[S],
    ) -> ScimClientResult<()> {
        for (index, batch) in user_ids.chunks(MAX_BATCH_SIZE).enumerate() {
            debug!(group_id, batch = index, size = batch.len(), "Adding group members");
            self.patch_group(group_id, vec![PatchOperation::add_members(batch)])
                .await?;
        }
        Ok(())
    }

    /// Remove members in batches of at most [`MAX_BATCH_SIZE`] operations.
    pub async fn remove_group_members<S: AsRef<str> + Sync>(
        &self,
        group_id: &str,
        user_ids: &[S],
    ) -> ScimClientResult<()> {
        for (index, batch) in user_ids.chunks(MAX_BATCH_SIZE).enumerate() {
            debug!(group_id, batch = index, size = batch.len(), "Removing group members");
            let operations = batch
                .iter()
                .map(|id| PatchOperation::remove_member(id.as_ref()))
                .collect();
            self.patch_group(group_id, operations).await?;
        }
        Ok(())
    }

    /// Groups that have `user_id` as a member.
    pub async fn get_user_groups(&self, user_id: &str) -> ScimClientResult<Vec<ScimGroup>> {
        self.get_all_groups(Some(Filter::member(user_id))).await
    }

    /// The directory rejects `id eq X and members.value eq Y`, so this looks
    /// through every group of the user.
    pub async fn is_user_in_group(&self, group_id: &str, user_id: &str) -> ScimClientResult<bool> {
        let groups = self.get_user_groups(user_id).await?;
        Ok(groups.iter().any(|g| g.id() == Some(group_id)))
    }

    /// Members of a group, found by scanning every user. One query per user.
    pub async fn list_group_members(&self, group_id: &str) -> ScimClientResult<Vec<ScimUser>> {
        let mut members = Vec::new();
        for user in self.get_all_users(None).await? {
            let Some(user_id) = user.id() else {
                continue;
            };
            if self.is_user_in_group(group_id, user_id).await? {
                members.push(user);
            }
        }
        Ok(members)
    }

    async fn patch_group(
        &self,
        group_id: &str,
        operations: Vec<PatchOperation>,
    ) -> ScimClientResult<()> {
        let request = PatchRequest::for_group(operations)?;
        let body = serde_json::to_value(&request)?;
        self.transport.patch(&group_path(group_id), &body).await?;
        Ok(())
    }
}

fn user_path(id: &str) -> String {
    format!("{USERS}/{id}")
}

fn group_path(id: &str) -> String {
    format!("{GROUPS}/{id}")
}

fn require_body(body: Option<Value>, method: &str, resource: &str) -> ScimClientResult<Value> {
    body.ok_or_else(|| ScimClientError::ParseError(format!("{method} {resource} returned no body")))
}
