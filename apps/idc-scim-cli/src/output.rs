//! Rendering of records and sync outcomes.

use crate::error::CliResult;
use idc_scim_client::models::{ScimGroup, ScimUser};
use idc_scim_client::{ChangeDetail, MemberRef, RunOutcome, SyncOutcome};
use serde_json::Value;

/// Print a value as pretty JSON on stdout.
pub fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// A user in plain mode plus its server id.
pub fn user_json(user: &ScimUser) -> CliResult<Value> {
    let mut value = user.to_value()?;
    if let (Some(id), Value::Object(map)) = (user.id(), &mut value) {
        map.insert("id".to_string(), Value::from(id));
    }
    Ok(value)
}

pub fn group_json(group: &ScimGroup) -> Value {
    let mut value = serde_json::json!({ "displayName": group.display_name() });
    if let Some(id) = group.id() {
        value["id"] = Value::from(id);
    }
    if let Some(external_id) = group.external_id() {
        value["externalId"] = Value::from(external_id);
    }
    value
}

/// Truncate a string to a maximum width, adding "..." if truncated.
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

pub fn print_user_table(users: &[ScimUser]) {
    for line in user_table_lines(users) {
        println!("{line}");
    }
}

/// Header, rule and one row per user.
pub fn user_table_lines(users: &[ScimUser]) -> Vec<String> {
    let mut lines = vec![
        format!(
            "{:<38} {:<30} {:<30} {:<38} {:<6}",
            "ID", "USER NAME", "EMAIL", "EXTERNAL ID", "ACTIVE"
        ),
        "-".repeat(146),
    ];
    for user in users {
        let email = user.email().map_or("-", |e| e.value.as_str());
        let active = user
            .active()
            .map_or_else(|| "-".to_string(), |a| a.to_string());
        lines.push(format!(
            "{:<38} {:<30} {:<30} {:<38} {:<6}",
            user.id().unwrap_or("-"),
            truncate(user.user_name(), 28),
            truncate(email, 28),
            truncate(user.external_id().unwrap_or("-"), 36),
            active
        ));
    }
    lines
}

pub fn print_group_table(groups: &[ScimGroup]) {
    println!("{:<38} {:<36} {:<36}", "ID", "DISPLAY NAME", "EXTERNAL ID");
    println!("{}", "-".repeat(112));
    for group in groups {
        println!(
            "{:<38} {:<36} {:<36}",
            group.id().unwrap_or("-"),
            truncate(group.display_name(), 34),
            group.external_id().unwrap_or("-")
        );
    }
}

/// One line per item, grouped by change kind.
pub fn outcome_lines(outcome: &SyncOutcome) -> Vec<String> {
    let mut lines = Vec::new();
    for name in &outcome.unchanged {
        lines.push(with_skipped(format!("○ {name}"), outcome.details.get(name)));
    }
    for name in &outcome.created {
        let line = match outcome.details.get(name) {
            Some(ChangeDetail::Group { added, .. }) if !added.is_empty() => {
                format!("+ {name} (members: {})", names(added))
            }
            _ => format!("+ {name}"),
        };
        lines.push(with_skipped(line, outcome.details.get(name)));
    }
    for name in &outcome.updated {
        let line = match outcome.details.get(name) {
            Some(ChangeDetail::User { changed_fields, .. }) => {
                format!("↻ {name} ({})", changed_fields.join(", "))
            }
            Some(ChangeDetail::ExternalId { external_id, .. }) => {
                format!("↻ {name} (externalId: {external_id})")
            }
            Some(ChangeDetail::Group { added, removed, .. }) => {
                let mut parts = Vec::new();
                if !added.is_empty() {
                    parts.push(format!("+{}", names(added)));
                }
                if !removed.is_empty() {
                    parts.push(format!("-{}", names(removed)));
                }
                format!("↻ {name} ({})", parts.join("; "))
            }
            _ => format!("↻ {name}"),
        };
        lines.push(with_skipped(line, outcome.details.get(name)));
    }
    for name in &outcome.deleted {
        lines.push(format!("- {name}"));
    }
    for error in &outcome.errors {
        lines.push(format!("✗ {error}"));
    }
    lines
}

pub fn summary_line(outcome: &SyncOutcome) -> String {
    let mut line = format!(
        "{} created, {} updated, {} deleted, {} unchanged, {} errors",
        outcome.created.len(),
        outcome.updated.len(),
        outcome.deleted.len(),
        outcome.unchanged.len(),
        outcome.errors.len()
    );
    if outcome.dry_run {
        line.push_str(" (dry run, nothing was changed)");
    }
    line
}

/// Print an outcome as lines plus a summary, or as JSON.
pub fn print_outcome(outcome: &SyncOutcome, json: bool) -> CliResult<()> {
    if json {
        return print_json(outcome);
    }
    for line in outcome_lines(outcome) {
        println!("{line}");
    }
    println!();
    println!("{}", summary_line(outcome));
    Ok(())
}

/// Print each phase that ran, users first, then a total.
pub fn print_run_outcome(outcome: &RunOutcome, json: bool) -> CliResult<()> {
    if json {
        return print_json(outcome);
    }
    for line in run_outcome_lines(outcome) {
        println!("{line}");
    }
    Ok(())
}

pub fn run_outcome_lines(outcome: &RunOutcome) -> Vec<String> {
    let phases = [("Users", &outcome.users), ("Groups", &outcome.groups)];
    let mut lines = Vec::new();
    for (title, phase) in phases {
        let Some(phase) = phase else { continue };
        lines.push(format!("--- {title} ---"));
        lines.extend(outcome_lines(phase));
        lines.push(format!("{title}: {}", summary_line(phase)));
        lines.push(String::new());
    }
    if outcome.has_errors() {
        lines.push(format!("{} error(s) in total", outcome.error_count()));
    }
    lines
}

fn names(members: &[MemberRef]) -> String {
    members
        .iter()
        .map(|m| m.user_name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn with_skipped(line: String, detail: Option<&ChangeDetail>) -> String {
    match detail {
        Some(ChangeDetail::Group { skipped, .. }) if !skipped.is_empty() => {
            format!("{line} [unknown: {}]", skipped.join(", "))
        }
        _ => line,
    }
}
