//! Reconciliation engine.
//!
//! Compares a desired-state snapshot with what the directory currently holds
//! and applies the minimal set of creates, replaces, deletes and membership
//! patches. Every run re-reads the full actual state; nothing is cached
//! between runs.
//!
//! Failures while reading the baseline listings abort the run. Failures on a
//! single record are recorded in the [`SyncOutcome`] and the run continues.

use crate::client::ScimClient;
use crate::desired::{DesiredGroup, DesiredGroups, DesiredUsers, Rejected};
use crate::error::{ScimClientError, ScimClientResult};
use crate::membership::MembershipIndex;
use crate::models::{ScimGroup, ScimUser};
use crate::outcome::{ChangeDetail, MemberRef, RunOutcome, SyncOutcome};
use crate::transport::Transport;
use serde_json::Value;
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::{debug, info, warn};

/// Attributes owned by the directory and ignored when diffing users.
const IGNORED_FIELDS: [&str; 3] = ["id", "schemas", "meta"];

/// How far a run is allowed to go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncMode {
    /// Create and update only. Group members are only ever added.
    #[default]
    Incremental,
    /// Also remove group members absent from the desired set, and delete
    /// records absent from the desired set when `delete` is set.
    Full { delete: bool },
}

impl SyncMode {
    #[must_use]
    pub fn removes_members(self) -> bool {
        matches!(self, Self::Full { .. })
    }

    #[must_use]
    pub fn deletes(self) -> bool {
        matches!(self, Self::Full { delete: true })
    }
}

/// Options for one reconciliation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncOptions {
    pub mode: SyncMode,
    /// Compute everything, mutate nothing.
    pub dry_run: bool,
}

impl SyncOptions {
    #[must_use]
    pub fn incremental() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn full(delete: bool) -> Self {
        Self {
            mode: SyncMode::Full { delete },
            dry_run: false,
        }
    }

    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

/// Membership change planned for one existing group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MembershipDiff {
    pub to_add: BTreeSet<String>,
    pub to_remove: BTreeSet<String>,
}

impl MembershipDiff {
    /// `to_add = desired − actual`; `to_remove = actual − desired` only when
    /// `remove` is set.
    #[must_use]
    pub fn compute(desired: &BTreeSet<String>, actual: &BTreeSet<String>, remove: bool) -> Self {
        Self {
            to_add: desired.difference(actual).cloned().collect(),
            to_remove: if remove {
                actual.difference(desired).cloned().collect()
            } else {
                BTreeSet::new()
            },
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

/// Names of top-level attributes that differ between two plain records.
///
/// Keys from both sides are compared; `id`, `schemas` and `meta` are ignored.
/// The result is sorted.
#[must_use]
pub fn diff_fields(desired: &Value, actual: &Value) -> Vec<String> {
    let empty = serde_json::Map::new();
    let desired = desired.as_object().unwrap_or(&empty);
    let actual = actual.as_object().unwrap_or(&empty);

    let keys: BTreeSet<&String> = desired.keys().chain(actual.keys()).collect();
    keys.into_iter()
        .filter(|key| !IGNORED_FIELDS.contains(&key.as_str()))
        .filter(|key| desired.get(*key) != actual.get(*key))
        .cloned()
        .collect()
}

enum UserChange {
    Created { id: Option<String> },
    Updated { id: Option<String>, fields: Vec<String> },
    Unchanged,
}

/// Reconciles desired users and groups against the directory.
pub struct ReconciliationEngine<'a, T: Transport> {
    client: &'a ScimClient<T>,
    options: SyncOptions,
}

impl<'a, T: Transport> ReconciliationEngine<'a, T> {
    pub fn new(client: &'a ScimClient<T>, options: SyncOptions) -> Self {
        Self { client, options }
    }

    #[must_use]
    pub fn options(&self) -> SyncOptions {
        self.options
    }

    // ── Users ─────────────────────────────────────────────────────────

    /// Reconcile users by `userName`.
    pub async fn sync_users(&self, desired: impl Into<DesiredUsers>) -> ScimClientResult<SyncOutcome> {
        let desired = desired.into();
        let mut outcome = SyncOutcome::new(self.options.dry_run);
        record_rejected(&mut outcome, &desired.rejected);

        info!(
            desired = desired.users.len(),
            rejected = desired.rejected.len(),
            dry_run = self.options.dry_run,
            mode = ?self.options.mode,
            "Starting user sync"
        );

        let actual = self.client.get_all_users(None).await?;
        let actual_by_name: HashMap<&str, &ScimUser> =
            actual.iter().map(|u| (u.user_name(), u)).collect();

        // Rejected records still count as desired so their directory
        // counterparts are not deleted.
        let desired_names: HashSet<String> = desired
            .users
            .iter()
            .map(|u| u.user_name().to_string())
            .chain(desired.rejected.iter().map(|r| r.name.clone()))
            .collect();

        for user in desired.users {
            let name = user.user_name().to_string();
            let existing = actual_by_name.get(name.as_str()).copied();
            match self.sync_user(user, existing).await {
                Ok(UserChange::Created { id }) => {
                    outcome.created.push(name.clone());
                    outcome.details.insert(
                        name,
                        ChangeDetail::User {
                            id,
                            changed_fields: Vec::new(),
                        },
                    );
                }
                Ok(UserChange::Updated { id, fields }) => {
                    outcome.updated.push(name.clone());
                    outcome.details.insert(
                        name,
                        ChangeDetail::User {
                            id,
                            changed_fields: fields,
                        },
                    );
                }
                Ok(UserChange::Unchanged) => outcome.unchanged.push(name),
                Err(e) => {
                    warn!(user = %name, error = %e, "User sync failed");
                    outcome.record_error(&name, e);
                }
            }
        }

        if self.options.mode.deletes() {
            for user in &actual {
                if desired_names.contains(user.user_name()) {
                    continue;
                }
                let Some(id) = user.id() else {
                    debug!(user = user.user_name(), "Skipping delete of user without id");
                    continue;
                };
                self.delete(&mut outcome, user.user_name(), id, Resource::User)
                    .await;
            }
        }

        log_summary("user", &outcome);
        Ok(outcome)
    }

    async fn sync_user(
        &self,
        mut user: ScimUser,
        existing: Option<&ScimUser>,
    ) -> ScimClientResult<UserChange> {
        let Some(existing) = existing else {
            if self.options.dry_run {
                return Ok(UserChange::Created { id: None });
            }
            let created = self.client.create_user(&user).await?;
            return Ok(UserChange::Created {
                id: created.id().map(str::to_string),
            });
        };

        let fields = diff_fields(&user.to_value()?, &existing.to_value()?);
        if fields.is_empty() {
            return Ok(UserChange::Unchanged);
        }

        let id = existing.id().map(str::to_string);
        if !self.options.dry_run {
            let server_id = id.as_deref().ok_or_else(|| ScimClientError::MissingId {
                resource: "User",
                name: user.user_name().to_string(),
            })?;
            user.set_id(server_id);
            self.client.replace_user(&user).await?;
        }
        Ok(UserChange::Updated { id, fields })
    }

    // ── Groups ────────────────────────────────────────────────────────

    /// Reconcile groups by `displayName`, including membership.
    ///
    /// Desired member names are resolved against the directory's users;
    /// unknown names are reported as skipped and never fail the group.
    pub async fn sync_groups(
        &self,
        desired: impl Into<DesiredGroups>,
    ) -> ScimClientResult<SyncOutcome> {
        let desired = desired.into();
        let mut outcome = SyncOutcome::new(self.options.dry_run);
        record_rejected(&mut outcome, &desired.rejected);

        info!(
            desired = desired.groups.len(),
            rejected = desired.rejected.len(),
            dry_run = self.options.dry_run,
            mode = ?self.options.mode,
            "Starting group sync"
        );

        let actual_groups = self.client.get_all_groups(None).await?;
        let actual_users = self.client.get_all_users(None).await?;

        let directory = UserDirectory::new(&actual_users);
        let actual_by_name: HashMap<&str, &ScimGroup> = actual_groups
            .iter()
            .map(|g| (g.display_name(), g))
            .collect();
        let desired_names: HashSet<String> = desired
            .groups
            .iter()
            .map(|g| g.display_name().to_string())
            .chain(desired.rejected.iter().map(|r| r.name.clone()))
            .collect();

        // Built on first use so runs that touch no existing group issue no
        // membership queries.
        let mut index: Option<MembershipIndex> = None;

        for group in &desired.groups {
            let name = group.display_name();
            let (member_ids, skipped) = directory.resolve(group.members());

            let result = match actual_by_name.get(name) {
                None => {
                    self.create_group(&mut outcome, group, &member_ids, skipped, &directory)
                        .await
                }
                Some(existing) => {
                    let index = match index.take() {
                        Some(built) => index.insert(built),
                        None => index.insert(
                            MembershipIndex::build(self.client, directory.user_ids()).await,
                        ),
                    };
                    self.update_group(
                        &mut outcome,
                        existing,
                        index,
                        &member_ids,
                        skipped,
                        &directory,
                    )
                    .await
                }
            };

            if let Err(e) = result {
                warn!(group = name, error = %e, "Group sync failed");
                outcome.record_error(name, e);
            }
        }

        if self.options.mode.deletes() {
            for group in &actual_groups {
                if desired_names.contains(group.display_name()) {
                    continue;
                }
                let Some(id) = group.id() else {
                    debug!(group = group.display_name(), "Skipping delete of group without id");
                    continue;
                };
                self.delete(&mut outcome, group.display_name(), id, Resource::Group)
                    .await;
            }
        }

        log_summary("group", &outcome);
        Ok(outcome)
    }

    async fn create_group(
        &self,
        outcome: &mut SyncOutcome,
        desired: &DesiredGroup,
        member_ids: &BTreeSet<String>,
        skipped: Vec<String>,
        directory: &UserDirectory<'_>,
    ) -> ScimClientResult<()> {
        let name = desired.display_name().to_string();
        let added = directory.annotate(member_ids);

        let id = if self.options.dry_run {
            None
        } else {
            let created = self.client.create_group(desired.group()).await?;
            created.id().map(str::to_string)
        };

        outcome.created.push(name.clone());
        outcome.details.insert(
            name.clone(),
            ChangeDetail::Group {
                id: id.clone(),
                added,
                removed: Vec::new(),
                skipped,
            },
        );

        if self.options.dry_run || member_ids.is_empty() {
            return Ok(());
        }
        let id = id.ok_or(ScimClientError::MissingId {
            resource: "Group",
            name,
        })?;
        let ids: Vec<&String> = member_ids.iter().collect();
        self.client.add_group_members(&id, &ids).await
    }

    async fn update_group(
        &self,
        outcome: &mut SyncOutcome,
        existing: &ScimGroup,
        index: &MembershipIndex,
        member_ids: &BTreeSet<String>,
        skipped: Vec<String>,
        directory: &UserDirectory<'_>,
    ) -> ScimClientResult<()> {
        let name = existing.display_name().to_string();
        let id = existing.id().ok_or_else(|| ScimClientError::MissingId {
            resource: "Group",
            name: name.clone(),
        })?;

        if !index.is_complete() {
            return Err(ScimClientError::IncompleteMembership(
                index.failures().len(),
            ));
        }

        let diff = MembershipDiff::compute(
            member_ids,
            &index.members_of(id),
            self.options.mode.removes_members(),
        );
        debug!(
            group = %name,
            to_add = diff.to_add.len(),
            to_remove = diff.to_remove.len(),
            "Membership diff computed"
        );

        if diff.is_empty() {
            outcome.unchanged.push(name.clone());
            if !skipped.is_empty() {
                outcome.details.insert(
                    name,
                    ChangeDetail::Group {
                        id: Some(id.to_string()),
                        added: Vec::new(),
                        removed: Vec::new(),
                        skipped,
                    },
                );
            }
            return Ok(());
        }

        if !self.options.dry_run {
            let to_add: Vec<&String> = diff.to_add.iter().collect();
            let to_remove: Vec<&String> = diff.to_remove.iter().collect();
            self.client.add_group_members(id, &to_add).await?;
            self.client.remove_group_members(id, &to_remove).await?;
        }

        outcome.updated.push(name.clone());
        outcome.details.insert(
            name,
            ChangeDetail::Group {
                id: Some(id.to_string()),
                added: directory.annotate(&diff.to_add),
                removed: directory.annotate(&diff.to_remove),
                skipped,
            },
        );
        Ok(())
    }

    // ── Combined ──────────────────────────────────────────────────────

    /// User phase, then group phase, each with its own outcome.
    ///
    /// The group phase re-reads users, so members created in the user phase
    /// resolve.
    pub async fn sync_all(
        &self,
        users: impl Into<DesiredUsers>,
        groups: impl Into<DesiredGroups>,
    ) -> ScimClientResult<RunOutcome> {
        let users = self.sync_users(users).await?;
        let groups = self.sync_groups(groups).await?;
        Ok(RunOutcome {
            users: Some(users),
            groups: Some(groups),
        })
    }

    // ── External ids ──────────────────────────────────────────────────

    /// Give every directory user without an `externalId` a fresh UUID.
    ///
    /// Users that already carry one are reported unchanged. A failed write
    /// is recorded against that user and the run continues.
    pub async fn assign_missing_external_ids(&self) -> ScimClientResult<SyncOutcome> {
        let mut outcome = SyncOutcome::new(self.options.dry_run);
        let users = self.client.get_all_users(None).await?;

        for user in &users {
            let name = user.user_name();
            if user.external_id().is_some_and(|e| !e.is_empty()) {
                outcome.unchanged.push(name.to_string());
                continue;
            }
            let Some(id) = user.id() else {
                outcome.record_error(name, "user has no id");
                continue;
            };

            let planned = uuid::Uuid::new_v4().to_string();
            let result = if self.options.dry_run {
                Ok(planned)
            } else {
                self.client
                    .set_user_external_id(id, Some(planned.as_str()))
                    .await
            };
            match result {
                Ok(external_id) => {
                    outcome.updated.push(name.to_string());
                    outcome.details.insert(
                        name.to_string(),
                        ChangeDetail::ExternalId {
                            id: id.to_string(),
                            external_id,
                        },
                    );
                }
                Err(e) => {
                    warn!(user = %name, error = %e, "Setting externalId failed");
                    outcome.record_error(name, e);
                }
            }
        }

        log_summary("externalId", &outcome);
        Ok(outcome)
    }

    /// Remove every member from one group, leaving the group in place.
    ///
    /// Runs the group phase in full mode without deletes for that group only.
    /// The dry-run flag of this engine is honoured.
    pub async fn clear_group_members(&self, display_name: &str) -> ScimClientResult<SyncOutcome> {
        if self.client.find_group_by_name(display_name).await?.is_none() {
            let mut outcome = SyncOutcome::new(self.options.dry_run);
            outcome.record_error(display_name, "group not found");
            return Ok(outcome);
        }

        let clearing = ReconciliationEngine::new(
            self.client,
            SyncOptions {
                mode: SyncMode::Full { delete: false },
                dry_run: self.options.dry_run,
            },
        );
        let group = DesiredGroup::new(display_name, Vec::<String>::new())?;
        clearing.sync_groups(vec![group]).await
    }

    async fn delete(&self, outcome: &mut SyncOutcome, name: &str, id: &str, resource: Resource) {
        let result = if self.options.dry_run {
            Ok(())
        } else {
            match resource {
                Resource::User => self.client.delete_user(id).await,
                Resource::Group => self.client.delete_group(id).await,
            }
        };
        match result {
            Ok(()) => {
                outcome.deleted.push(name.to_string());
                outcome
                    .details
                    .insert(name.to_string(), ChangeDetail::Deleted { id: id.to_string() });
            }
            Err(e) => {
                warn!(resource = ?resource, name, error = %e, "Delete failed");
                outcome.record_error(name, e);
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Resource {
    User,
    Group,
}

/// userName ↔ id lookups over the actual users of one run.
struct UserDirectory<'u> {
    by_name: HashMap<&'u str, &'u str>,
    by_id: HashMap<&'u str, &'u str>,
    ordered_ids: Vec<&'u str>,
}

impl<'u> UserDirectory<'u> {
    fn new(users: &'u [ScimUser]) -> Self {
        let mut by_name = HashMap::new();
        let mut by_id = HashMap::new();
        let mut ordered_ids = Vec::new();
        for user in users {
            if let Some(id) = user.id() {
                by_name.insert(user.user_name(), id);
                by_id.insert(id, user.user_name());
                ordered_ids.push(id);
            }
        }
        Self {
            by_name,
            by_id,
            ordered_ids,
        }
    }

    /// Map member names to ids. Unknown names come back as skipped.
    fn resolve(&self, names: &[String]) -> (BTreeSet<String>, Vec<String>) {
        let mut ids = BTreeSet::new();
        let mut skipped = Vec::new();
        for name in names {
            match self.by_name.get(name.as_str()) {
                Some(id) => {
                    ids.insert((*id).to_string());
                }
                None => skipped.push(name.clone()),
            }
        }
        (ids, skipped)
    }

    fn annotate(&self, ids: &BTreeSet<String>) -> Vec<MemberRef> {
        ids.iter()
            .map(|id| MemberRef {
                id: id.clone(),
                user_name: self
                    .by_id
                    .get(id.as_str())
                    .map_or_else(|| "?".to_string(), |n| (*n).to_string()),
            })
            .collect()
    }

    fn user_ids(&self) -> impl Iterator<Item = &'u str> + '_ {
        self.ordered_ids.iter().copied()
    }
}

fn record_rejected(outcome: &mut SyncOutcome, rejected: &[Rejected]) {
    for record in rejected {
        warn!(name = %record.name, error = %record.reason, "Rejected desired record");
        outcome.record_error(&record.name, &record.reason);
    }
}

fn log_summary(phase: &str, outcome: &SyncOutcome) {
    info!(
        phase,
        created = outcome.created.len(),
        updated = outcome.updated.len(),
        deleted = outcome.deleted.len(),
        unchanged = outcome.unchanged.len(),
        errors = outcome.errors.len(),
        dry_run = outcome.dry_run,
        "Sync finished"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_membership_diff_full_and_incremental() {
        let actual = set(&["A", "B", "C"]);
        let desired = set(&["B", "C", "D"]);

        let full = MembershipDiff::compute(&desired, &actual, true);
        assert_eq!(full.to_add, set(&["D"]));
        assert_eq!(full.to_remove, set(&["A"]));

        let incremental = MembershipDiff::compute(&desired, &actual, false);
        assert_eq!(incremental.to_add, set(&["D"]));
        assert!(incremental.to_remove.is_empty());
    }

    #[test]
    fn test_diff_fields_ignores_server_owned_keys() {
        let desired = json!({"userName": "a", "title": "Eng", "schemas": ["x"]});
        let actual = json!({"userName": "a", "title": "Eng", "id": "1", "meta": {}});
        assert!(diff_fields(&desired, &actual).is_empty());
    }

    #[test]
    fn test_diff_fields_reports_both_sides() {
        let desired = json!({"userName": "a", "title": "Eng", "nickName": "al"});
        let actual = json!({"userName": "a", "title": "Ops", "locale": "en-US"});
        assert_eq!(
            diff_fields(&desired, &actual),
            vec!["locale", "nickName", "title"]
        );
    }

    #[test]
    fn test_sync_mode_flags() {
        assert!(!SyncMode::Incremental.removes_members());
        assert!(SyncMode::Full { delete: false }.removes_members());
        assert!(!SyncMode::Full { delete: false }.deletes());
        assert!(SyncMode::Full { delete: true }.deletes());
        assert!(SyncOptions::full(true).with_dry_run(true).dry_run);
    }
}
