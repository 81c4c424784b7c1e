//! In-memory directory implementing [`Transport`].
//!
//! Mimics the restricted dialect closely enough to drive the reconciliation
//! engine: cursor pagination (with the empty-cursor rule), `eq` filters,
//! group listings without members, and membership PATCH. Every call is
//! recorded, and failures can be injected per method/path/body.

#![allow(dead_code)]

use async_trait::async_trait;
use idc_scim_client::error::{ProtocolError, ScimClientResult};
use idc_scim_client::Transport;
use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::sync::Mutex;

const PAGE: usize = 100;

/// One recorded transport call.
#[derive(Debug, Clone)]
pub struct Call {
    pub method: &'static str,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl Call {
    pub fn is_mutating(&self) -> bool {
        self.method != "GET"
    }

    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

struct Failure {
    method: &'static str,
    path: String,
    needle: Option<String>,
    status: u16,
    detail: String,
}

#[derive(Default)]
struct State {
    users: Vec<Value>,
    groups: Vec<Value>,
    memberships: BTreeSet<(String, String)>,
    calls: Vec<Call>,
    failures: Vec<Failure>,
    next_id: u64,
}

impl State {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{:04}", self.next_id)
    }
}

#[derive(Default)]
pub struct FakeDirectory {
    state: Mutex<State>,
}

impl FakeDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Seeding ───────────────────────────────────────────────────────

    /// Insert a user with a single email equal to its userName.
    pub fn seed_user(&self, user_name: &str) -> String {
        self.seed_user_value(json!({
            "userName": user_name,
            "emails": [{"value": user_name}]
        }))
    }

    /// Insert a raw user record. Returns its id.
    pub fn seed_user_value(&self, mut value: Value) -> String {
        let mut state = self.state.lock().unwrap();
        let id = state.next_id("u");
        value["id"] = json!(id);
        value["meta"] = json!({"resourceType": "User"});
        state.users.push(value);
        id
    }

    pub fn seed_group(&self, display_name: &str) -> String {
        let mut state = self.state.lock().unwrap();
        let id = state.next_id("g");
        state.groups.push(json!({
            "id": id,
            "displayName": display_name,
            "meta": {"resourceType": "Group"}
        }));
        id
    }

    pub fn seed_membership(&self, group_id: &str, user_id: &str) {
        self.state
            .lock()
            .unwrap()
            .memberships
            .insert((group_id.to_string(), user_id.to_string()));
    }

    /// Fail calls matching `method` and `path` (and, when given, whose body
    /// or query contains `needle`) with `status`.
    pub fn fail(&self, method: &'static str, path: &str, needle: Option<&str>, status: u16) {
        self.state.lock().unwrap().failures.push(Failure {
            method,
            path: path.to_string(),
            needle: needle.map(str::to_string),
            status,
            detail: format!("injected failure on {method} {path}"),
        });
    }

    // ── Inspection ────────────────────────────────────────────────────

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    pub fn mutating_calls(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_mutating).collect()
    }

    pub fn calls_to(&self, method: &str, path: &str) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| c.method == method && c.path == path)
            .collect()
    }

    /// Reverse membership queries issued so far.
    pub fn membership_queries(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| {
                c.path == "/Groups"
                    && c.query_value("filter")
                        .is_some_and(|f| f.starts_with("members.value eq"))
            })
            .count()
    }

    pub fn user_names(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .users
            .iter()
            .filter_map(|u| u["userName"].as_str().map(str::to_string))
            .collect()
    }

    pub fn group_names(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .groups
            .iter()
            .filter_map(|g| g["displayName"].as_str().map(str::to_string))
            .collect()
    }

    pub fn user(&self, user_name: &str) -> Option<Value> {
        self.state
            .lock()
            .unwrap()
            .users
            .iter()
            .find(|u| u["userName"] == user_name)
            .cloned()
    }

    pub fn group_id(&self, display_name: &str) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .groups
            .iter()
            .find(|g| g["displayName"] == display_name)
            .and_then(|g| g["id"].as_str().map(str::to_string))
    }

    /// Member userNames of a group, sorted.
    pub fn member_names(&self, group_id: &str) -> Vec<String> {
        let state = self.state.lock().unwrap();
        let mut names: Vec<String> = state
            .memberships
            .iter()
            .filter(|(g, _)| g == group_id)
            .filter_map(|(_, u)| {
                state
                    .users
                    .iter()
                    .find(|user| user["id"] == u.as_str())
                    .and_then(|user| user["userName"].as_str().map(str::to_string))
            })
            .collect();
        names.sort();
        names
    }

    // ── Internals ─────────────────────────────────────────────────────

    fn record(
        &self,
        method: &'static str,
        path: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> ScimClientResult<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call {
            method,
            path: path.to_string(),
            query: query
                .iter()
                .map(|(k, v)| ((*k).to_string(), v.clone()))
                .collect(),
            body: body.cloned(),
        });

        let mut body_text = body.map(Value::to_string).unwrap_or_default();
        for (_, value) in query {
            body_text.push_str(value);
        }
        let failure = state.failures.iter().find(|f| {
            f.method == method
                && f.path == path
                && f.needle.as_deref().map_or(true, |n| body_text.contains(n))
        });
        if let Some(f) = failure {
            return Err(ProtocolError {
                detail: Some(f.detail.clone()),
                request_id: Some("fake-request".to_string()),
                ..ProtocolError::from_status(f.status)
            }
            .into());
        }
        Ok(())
    }

    fn list(&self, path: &str, query: &[(&str, String)]) -> ScimClientResult<Value> {
        let lookup = |key: &str| {
            query
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.clone())
        };
        let filter = lookup("filter");
        let cursor = lookup("cursor");

        if filter.is_some() && cursor.as_deref() == Some("") {
            return Err(ProtocolError {
                detail: Some("cursor must not be empty with a filter".to_string()),
                ..ProtocolError::from_status(400)
            }
            .into());
        }

        let state = self.state.lock().unwrap();
        let source = if path == "/Users" {
            &state.users
        } else {
            &state.groups
        };
        let parsed = filter.as_deref().map(parse_eq);

        let matching: Vec<Value> = source
            .iter()
            .filter(|item| match &parsed {
                None => true,
                Some((attr, value)) if attr == "members.value" => {
                    let group_id = item["id"].as_str().unwrap_or_default();
                    state
                        .memberships
                        .contains(&(group_id.to_string(), value.clone()))
                }
                Some((attr, value)) => item[attr.as_str()] == value.as_str(),
            })
            .cloned()
            .collect();

        let offset: usize = cursor
            .as_deref()
            .and_then(|c| c.strip_prefix("o"))
            .and_then(|o| o.parse().ok())
            .unwrap_or(0);
        let page: Vec<Value> = matching.iter().skip(offset).take(PAGE).cloned().collect();
        let next = offset + page.len();
        let next_cursor = if next < matching.len() {
            format!("o{next}")
        } else {
            String::new()
        };

        Ok(json!({
            "totalResults": matching.len(),
            "itemsPerPage": page.len(),
            "startIndex": 1,
            "Resources": page,
            "nextCursor": next_cursor
        }))
    }

    fn find(&self, collection: &str, id: &str) -> Option<Value> {
        let state = self.state.lock().unwrap();
        let items = if collection == "Users" {
            &state.users
        } else {
            &state.groups
        };
        items.iter().find(|v| v["id"] == id).cloned()
    }
}

/// Parse `attr eq "value"` (the only shape the engine sends).
fn parse_eq(filter: &str) -> (String, String) {
    let (attr, value) = filter.split_once(" eq ").unwrap_or((filter, ""));
    (attr.to_string(), value.trim_matches('"').to_string())
}

fn split(path: &str) -> (&str, Option<&str>) {
    let trimmed = path.trim_start_matches('/');
    match trimmed.split_once('/') {
        Some((collection, id)) => (collection, Some(id)),
        None => (trimmed, None),
    }
}

fn not_found(path: &str) -> idc_scim_client::ScimClientError {
    ProtocolError {
        detail: Some(format!("{path} not found")),
        ..ProtocolError::from_status(404)
    }
    .into()
}

#[async_trait]
impl Transport for FakeDirectory {
    async fn get(&self, path: &str, query: &[(&str, String)]) -> ScimClientResult<Option<Value>> {
        self.record("GET", path, query, None)?;
        match split(path) {
            (_, None) => self.list(path, query).map(Some),
            (collection, Some(id)) => {
                let mut found = self.find(collection, id).ok_or_else(|| not_found(path))?;
                if collection == "Groups" {
                    if let Value::Object(map) = &mut found {
                        map.remove("members");
                    }
                }
                Ok(Some(found))
            }
        }
    }

    async fn post(&self, path: &str, body: &Value) -> ScimClientResult<Option<Value>> {
        self.record("POST", path, &[], Some(body))?;
        let mut state = self.state.lock().unwrap();
        let mut created = body.clone();
        if path == "/Users" {
            let duplicate = state
                .users
                .iter()
                .any(|u| u["userName"] == body["userName"]);
            if duplicate {
                return Err(ProtocolError {
                    detail: Some("Duplicate userName".to_string()),
                    scim_type: Some("uniqueness".to_string()),
                    ..ProtocolError::from_status(409)
                }
                .into());
            }
            created["id"] = json!(state.next_id("u"));
            created["meta"] = json!({"resourceType": "User"});
            state.users.push(created.clone());
        } else {
            if let Value::Object(map) = &mut created {
                map.remove("members");
            }
            created["id"] = json!(state.next_id("g"));
            created["meta"] = json!({"resourceType": "Group"});
            state.groups.push(created.clone());
        }
        Ok(Some(created))
    }

    async fn put(&self, path: &str, body: &Value) -> ScimClientResult<Option<Value>> {
        self.record("PUT", path, &[], Some(body))?;
        let (_, Some(id)) = split(path) else {
            return Err(ProtocolError::from_status(405).into());
        };
        if body["id"] != id {
            return Err(ProtocolError {
                detail: Some("id is required in the body".to_string()),
                ..ProtocolError::from_status(400)
            }
            .into());
        }
        let mut state = self.state.lock().unwrap();
        let user = state
            .users
            .iter_mut()
            .find(|u| u["id"] == id)
            .ok_or_else(|| not_found(path))?;
        let mut replaced = body.clone();
        replaced["meta"] = json!({"resourceType": "User"});
        *user = replaced.clone();
        Ok(Some(replaced))
    }

    async fn patch(&self, path: &str, body: &Value) -> ScimClientResult<Option<Value>> {
        self.record("PATCH", path, &[], Some(body))?;
        let (collection, Some(id)) = split(path) else {
            return Err(ProtocolError::from_status(405).into());
        };
        let operations = body["Operations"].as_array().cloned().unwrap_or_default();
        let mut state = self.state.lock().unwrap();

        if collection == "Groups" {
            if !state.groups.iter().any(|g| g["id"] == id) {
                return Err(not_found(path));
            }
            for op in operations {
                match op["op"].as_str() {
                    Some("add") => {
                        for member in op["value"].as_array().cloned().unwrap_or_default() {
                            if let Some(user_id) = member["value"].as_str() {
                                state
                                    .memberships
                                    .insert((id.to_string(), user_id.to_string()));
                            }
                        }
                    }
                    Some("remove") => {
                        let path = op["path"].as_str().unwrap_or_default();
                        let user_id = path
                            .trim_start_matches("members[value eq \"")
                            .trim_end_matches("\"]");
                        state
                            .memberships
                            .remove(&(id.to_string(), user_id.to_string()));
                    }
                    _ => return Err(ProtocolError::from_status(400).into()),
                }
            }
            return Ok(None);
        }

        let user = state
            .users
            .iter_mut()
            .find(|u| u["id"] == id)
            .ok_or_else(|| not_found(path))?;
        for op in operations {
            if let (Some(attr), Some(value)) = (op["path"].as_str(), op.get("value")) {
                user[attr] = value.clone();
            }
        }
        Ok(Some(user.clone()))
    }

    async fn delete(&self, path: &str) -> ScimClientResult<()> {
        self.record("DELETE", path, &[], None)?;
        let (collection, Some(id)) = split(path) else {
            return Err(ProtocolError::from_status(405).into());
        };
        let mut state = self.state.lock().unwrap();
        let items = if collection == "Users" {
            &mut state.users
        } else {
            &mut state.groups
        };
        let before = items.len();
        items.retain(|v| v["id"] != id);
        if items.len() == before {
            return Err(not_found(path));
        }
        state
            .memberships
            .retain(|(g, u)| g != id && u != id);
        Ok(())
    }
}
