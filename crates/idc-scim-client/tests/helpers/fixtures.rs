//! Desired-state builders shared by the integration tests.

#![allow(dead_code)]

use idc_scim_client::models::{Email, ScimUser};
use idc_scim_client::DesiredGroup;
use serde_json::{json, Value};

/// Desired user whose single email equals its userName, matching
/// [`FakeDirectory::seed_user`](super::fake_directory::FakeDirectory::seed_user).
pub fn user(user_name: &str) -> ScimUser {
    ScimUser::builder(user_name)
        .email(Email::new(user_name))
        .build()
        .unwrap()
}

pub fn user_with_title(user_name: &str, title: &str) -> ScimUser {
    ScimUser::builder(user_name)
        .email(Email::new(user_name))
        .title(title)
        .build()
        .unwrap()
}

pub fn users(names: &[&str]) -> Vec<ScimUser> {
    names.iter().map(|n| user(n)).collect()
}

pub fn group(display_name: &str, members: &[&str]) -> DesiredGroup {
    DesiredGroup::new(display_name, members.iter().copied()).unwrap()
}

/// A page of `count` user resources, numbered from `start`.
pub fn user_page(start: usize, count: usize, next_cursor: Option<&str>) -> Value {
    let resources: Vec<Value> = (start..start + count)
        .map(|i| {
            json!({
                "id": format!("id-{i}"),
                "userName": format!("user{i}@example.com"),
                "emails": [{"value": format!("user{i}@example.com")}]
            })
        })
        .collect();
    let mut page = json!({
        "totalResults": 250,
        "itemsPerPage": count,
        "startIndex": 1,
        "Resources": resources
    });
    if let Some(cursor) = next_cursor {
        page["nextCursor"] = json!(cursor);
    }
    page
}
