//! Group membership reconstruction.
//!
//! Group listings never include members, and the directory rejects
//! `id eq X and members.value eq Y`. The only way to learn membership is to
//! ask, for every known user, which groups list that user as a member, and
//! invert the answers into a group → members index.

use crate::client::ScimClient;
use crate::transport::Transport;
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, warn};

/// A user whose reverse membership query failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupFailure {
    pub user_id: String,
    pub message: String,
}

/// Group id → member user ids, built once per run.
#[derive(Debug, Clone, Default)]
pub struct MembershipIndex {
    members: HashMap<String, BTreeSet<String>>,
    failures: Vec<LookupFailure>,
    queries: usize,
}

impl MembershipIndex {
    /// Query the groups of every user id and invert the results.
    ///
    /// A failed query is recorded and does not stop the others.
    pub async fn build<'a, T, I>(client: &ScimClient<T>, user_ids: I) -> Self
    where
        T: Transport,
        I: IntoIterator<Item = &'a str>,
    {
        let mut index = Self::default();
        for user_id in user_ids {
            index.queries += 1;
            match client.get_user_groups(user_id).await {
                Ok(groups) => {
                    for group_id in groups.iter().filter_map(|g| g.id()) {
                        index.insert(group_id, user_id);
                    }
                }
                Err(e) => {
                    warn!(user_id, error = %e, "Membership lookup failed");
                    index.failures.push(LookupFailure {
                        user_id: user_id.to_string(),
                        message: e.to_string(),
                    });
                }
            }
        }
        debug!(
            queries = index.queries,
            groups = index.members.len(),
            failures = index.failures.len(),
            "Membership index built"
        );
        index
    }

    /// Build an index from known `(group_id, user_id)` pairs.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut index = Self::default();
        for (group_id, user_id) in pairs {
            index.insert(group_id, user_id);
        }
        index
    }

    fn insert(&mut self, group_id: &str, user_id: &str) {
        self.members
            .entry(group_id.to_string())
            .or_default()
            .insert(user_id.to_string());
    }

    /// Members of `group_id`. Empty when the group has none.
    #[must_use]
    pub fn members_of(&self, group_id: &str) -> BTreeSet<String> {
        self.members.get(group_id).cloned().unwrap_or_default()
    }

    /// True when every reverse query succeeded.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    #[must_use]
    pub fn failures(&self) -> &[LookupFailure] {
        &self.failures
    }

    /// Number of reverse queries issued while building.
    #[must_use]
    pub fn query_count(&self) -> usize {
        self.queries
    }
}
