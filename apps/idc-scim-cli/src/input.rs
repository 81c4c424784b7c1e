//! Desired-state files.

use crate::error::{CliError, CliResult};
use idc_scim_client::{DesiredGroups, DesiredUsers};
use serde_json::Value;
use std::path::Path;

/// Read and parse a JSON document.
pub fn read_json(path: &Path) -> CliResult<Value> {
    let input_error = |message: String| CliError::Input {
        path: path.display().to_string(),
        message,
    };
    let raw = std::fs::read_to_string(path).map_err(|e| input_error(e.to_string()))?;
    serde_json::from_str(&raw).map_err(|e| input_error(e.to_string()))
}

/// Users for create/update: one user object or an array of them.
///
/// Each record is validated on its own; invalid ones come back as rejected.
pub fn load_user_records(path: &Path) -> CliResult<DesiredUsers> {
    let records = match read_json(path)? {
        Value::Array(items) => items,
        single @ Value::Object(_) => vec![single],
        _ => {
            return Err(CliError::Input {
                path: path.display().to_string(),
                message: "expected a user object or an array of users".to_string(),
            })
        }
    };
    Ok(DesiredUsers::parse(records))
}

/// A users file: an array of user objects or `{"users": [...]}`.
pub fn load_users(path: &Path) -> CliResult<DesiredUsers> {
    Ok(DesiredUsers::from_json(read_json(path)?)?)
}

/// A groups file: an array of group objects or `{"groups": [...]}`.
pub fn load_groups(path: &Path) -> CliResult<DesiredGroups> {
    Ok(DesiredGroups::from_json(read_json(path)?)?)
}
