//! CSV import of group membership into a desired-groups file
//!
//! The CSV needs an `email` and a `group` column (header names in any
//! letter case; other columns are ignored). Each row links one user to one
//! group. Links are merged into the groups file, which is rewritten with
//! groups and members sorted.

use crate::error::{CliError, CliResult};
use crate::input;
use idc_scim_client::DesiredGroups;
use serde_json::{json, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// A group in the merged file.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct GroupEntry {
    pub external_id: Option<String>,
    pub members: BTreeSet<String>,
}

/// What an import did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSummary {
    /// Rows with both an email and a group.
    pub rows: usize,
    /// Links not already present in the groups file.
    pub added: usize,
    /// Groups written.
    pub groups: usize,
}

/// Read `(email, group)` pairs from a CSV file.
pub fn read_links(path: &Path) -> CliResult<Vec<(String, String)>> {
    let input_error = |message: String| CliError::Input {
        path: path.display().to_string(),
        message,
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| input_error(e.to_string()))?;

    let headers = reader
        .headers()
        .map_err(|e| input_error(format!("failed to read CSV headers: {e}")))?
        .clone();
    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim_start_matches('\u{feff}').eq_ignore_ascii_case(name))
    };
    let (Some(email_col), Some(group_col)) = (column("email"), column("group")) else {
        return Err(input_error(
            "CSV needs an 'email' and a 'group' column".to_string(),
        ));
    };

    let mut links = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let line = idx + 2;
        let record = record.map_err(|e| input_error(format!("line {line}: {e}")))?;
        let email = record.get(email_col).unwrap_or_default();
        let group = record.get(group_col).unwrap_or_default();
        if !email.is_empty() && !group.is_empty() {
            links.push((email.to_string(), group.to_string()));
        }
    }

    if links.is_empty() {
        return Err(input_error(
            "no rows with both an email and a group".to_string(),
        ));
    }
    Ok(links)
}

/// Load an existing groups file; a missing file is an empty one.
pub fn load_existing(path: &Path) -> CliResult<BTreeMap<String, GroupEntry>> {
    if !path.exists() {
        return Ok(BTreeMap::new());
    }
    let desired = DesiredGroups::from_json(input::read_json(path)?)?;
    if let Some(rejected) = desired.rejected.first() {
        return Err(CliError::Input {
            path: path.display().to_string(),
            message: format!("{}: {}", rejected.name, rejected.reason),
        });
    }

    Ok(desired
        .groups
        .iter()
        .map(|group| {
            let entry = GroupEntry {
                external_id: group.group().external_id().map(str::to_string),
                members: group.members().iter().cloned().collect(),
            };
            (group.display_name().to_string(), entry)
        })
        .collect())
}

/// Add links to the groups. Returns how many were new.
pub fn merge_links(
    groups: &mut BTreeMap<String, GroupEntry>,
    links: &[(String, String)],
) -> usize {
    let mut added = 0;
    for (email, group) in links {
        let entry = groups.entry(group.clone()).or_default();
        if entry.members.insert(email.clone()) {
            added += 1;
        }
    }
    added
}

/// The groups file document: `[{"displayName", "members": [{"value"}]}]`.
pub fn to_document(groups: &BTreeMap<String, GroupEntry>) -> Value {
    Value::Array(
        groups
            .iter()
            .map(|(name, entry)| {
                let members: Vec<Value> = entry
                    .members
                    .iter()
                    .map(|m| json!({ "value": m }))
                    .collect();
                let mut group = json!({ "displayName": name, "members": members });
                if let Some(external_id) = &entry.external_id {
                    group["externalId"] = Value::from(external_id.as_str());
                }
                group
            })
            .collect(),
    )
}

/// Merge the CSV at `csv_path` into the groups file at `output`.
pub fn import(csv_path: &Path, output: &Path) -> CliResult<ImportSummary> {
    let links = read_links(csv_path)?;
    let mut groups = load_existing(output)?;
    let added = merge_links(&mut groups, &links);

    let mut rendered = serde_json::to_string_pretty(&to_document(&groups))?;
    rendered.push('\n');
    std::fs::write(output, rendered).map_err(|e| CliError::Input {
        path: output.display().to_string(),
        message: e.to_string(),
    })?;

    Ok(ImportSummary {
        rows: links.len(),
        added,
        groups: groups.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    fn read(path: &Path) -> Value {
        serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn test_import_creates_groups_file() {
        let dir = TempDir::new().unwrap();
        let csv = write(
            &dir,
            "links.csv",
            "name,Email,GROUP\nBob,bob@example.com,Eng\nAna,ana@example.com,Eng\nCy,cy@example.com,Ops\n",
        );
        let output = dir.path().join("groups.json");

        let summary = import(&csv, &output).unwrap();
        assert_eq!(
            summary,
            ImportSummary {
                rows: 3,
                added: 3,
                groups: 2
            }
        );
        assert_eq!(
            read(&output),
            json!([
                {"displayName": "Eng", "members": [
                    {"value": "ana@example.com"}, {"value": "bob@example.com"}
                ]},
                {"displayName": "Ops", "members": [{"value": "cy@example.com"}]}
            ])
        );
    }

    #[test]
    fn test_import_merges_into_existing_file() {
        let dir = TempDir::new().unwrap();
        let output = write(
            &dir,
            "groups.json",
            r#"[
                {"displayName": "Eng", "externalId": "eng-1", "members": [{"value": "ana@example.com"}]},
                {"displayName": "Sales", "members": ["dee@example.com"]}
            ]"#,
        );
        let csv = write(
            &dir,
            "links.csv",
            "email,group\n ana@example.com , Eng\nbob@example.com,Eng\nbob@example.com,Eng\n,Eng\n",
        );

        let summary = import(&csv, &output).unwrap();
        assert_eq!(summary.rows, 3);
        assert_eq!(summary.added, 1);
        assert_eq!(summary.groups, 2);
        assert_eq!(
            read(&output),
            json!([
                {"displayName": "Eng", "externalId": "eng-1", "members": [
                    {"value": "ana@example.com"}, {"value": "bob@example.com"}
                ]},
                {"displayName": "Sales", "members": [{"value": "dee@example.com"}]}
            ])
        );
    }

    #[test]
    fn test_header_with_byte_order_mark() {
        let dir = TempDir::new().unwrap();
        let csv = write(&dir, "links.csv", "\u{feff}EMAIL,Group\nana@example.com,Eng\n");
        let links = read_links(&csv).unwrap();
        assert_eq!(links, vec![("ana@example.com".to_string(), "Eng".to_string())]);
    }

    #[test]
    fn test_missing_columns_is_an_input_error() {
        let dir = TempDir::new().unwrap();
        let csv = write(&dir, "links.csv", "user,team\nana,Eng\n");
        let err = read_links(&csv).unwrap_err();
        assert!(matches!(err, CliError::Input { .. }));
        assert!(err.to_string().contains("'email'"));
    }

    #[test]
    fn test_csv_without_usable_rows_leaves_output_alone() {
        let dir = TempDir::new().unwrap();
        let csv = write(&dir, "links.csv", "email,group\nana@example.com,\n");
        let output = dir.path().join("groups.json");
        assert!(import(&csv, &output).is_err());
        assert!(!output.exists());
    }
}
