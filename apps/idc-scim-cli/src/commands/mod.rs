//! CLI command implementations

pub mod groups;
pub mod sync;
pub mod users;

use crate::error::{CliError, CliResult};
use clap::Args;
use idc_scim_client::config::DEFAULT_TIMEOUT_SECS;
use idc_scim_client::{RunOutcome, ScimClient, ScimConfig, SyncOptions, SyncOutcome};
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

/// Connection and logging flags shared by every command.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// JSON config file with scim_endpoint, scim_token and timeout_secs
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// SCIM endpoint URL (overrides config file and environment)
    #[arg(long, global = true)]
    pub endpoint: Option<String>,

    /// Bearer token (overrides config file and environment)
    #[arg(long, global = true)]
    pub token: Option<String>,

    /// Request timeout in seconds
    #[arg(long, global = true, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub log_json: bool,
}

impl GlobalArgs {
    /// Resolve settings: flags over config file over environment.
    pub fn load_config(&self) -> CliResult<ScimConfig> {
        let base = match (&self.config, &self.endpoint, &self.token) {
            (Some(path), _, _) => ScimConfig::from_file(path)?,
            (None, Some(endpoint), Some(token)) => ScimConfig::new(
                endpoint.as_str(),
                token.as_str(),
                Duration::from_secs(self.timeout.unwrap_or(DEFAULT_TIMEOUT_SECS)),
            )?,
            _ => ScimConfig::from_env()?,
        };

        let mut config = base;
        if let Some(endpoint) = &self.endpoint {
            config = config.with_endpoint(endpoint.as_str())?;
        }
        if let Some(token) = &self.token {
            config = config.with_token(token.as_str())?;
        }
        if let Some(secs) = self.timeout {
            config = config.with_timeout(Duration::from_secs(secs))?;
        }
        debug!(config = ?config, "Configuration resolved");
        Ok(config)
    }

    pub fn client(&self) -> CliResult<ScimClient> {
        Ok(ScimClient::from_config(&self.load_config()?)?)
    }
}

/// Flags shared by the sync commands.
#[derive(Args, Debug, Clone, Copy)]
pub struct SyncFlags {
    /// Remove group members that are not in the desired set
    #[arg(long)]
    pub full: bool,

    /// Delete records absent from the desired set (requires --full)
    #[arg(long, requires = "full")]
    pub delete: bool,

    /// Show what would change without changing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Output the outcome as JSON
    #[arg(long)]
    pub json: bool,
}

impl SyncFlags {
    pub fn options(&self) -> SyncOptions {
        let options = if self.full {
            SyncOptions::full(self.delete)
        } else {
            SyncOptions::incremental()
        };
        options.with_dry_run(self.dry_run)
    }
}

/// Print a sync outcome and turn per-item errors into a partial failure.
pub fn finish_sync(outcome: &SyncOutcome, json: bool) -> CliResult<()> {
    crate::output::print_outcome(outcome, json)?;
    partial(outcome.errors.len())
}

/// Print a combined run, one section per phase.
pub fn finish_run(outcome: &RunOutcome, json: bool) -> CliResult<()> {
    crate::output::print_run_outcome(outcome, json)?;
    partial(outcome.error_count())
}

/// `Partial` when any item failed.
pub fn partial(failed: usize) -> CliResult<()> {
    if failed > 0 {
        return Err(CliError::Partial(failed));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use idc_scim_client::SyncMode;
    use std::io::Write;

    #[test]
    fn test_flags_without_config_file() {
        let args = GlobalArgs {
            endpoint: Some("https://scim.example.com/scim/v2/".to_string()),
            token: Some("secret".to_string()),
            timeout: Some(5),
            ..GlobalArgs::default()
        };
        let config = args.load_config().unwrap();
        assert_eq!(config.endpoint(), "https://scim.example.com/scim/v2");
        assert_eq!(config.timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_flags_override_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"scim_endpoint": "https://file.example.com/scim/v2", "scim_token": "from-file"}}"#
        )
        .unwrap();

        let args = GlobalArgs {
            config: Some(file.path().to_path_buf()),
            endpoint: Some("https://flag.example.com/scim/v2".to_string()),
            ..GlobalArgs::default()
        };
        let config = args.load_config().unwrap();
        assert_eq!(config.endpoint(), "https://flag.example.com/scim/v2");
        assert_eq!(config.token(), "from-file");
        assert_eq!(config.timeout(), Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    }

    #[test]
    fn test_invalid_timeout_flag_is_config_error() {
        let args = GlobalArgs {
            endpoint: Some("https://scim.example.com".to_string()),
            token: Some("secret".to_string()),
            timeout: Some(0),
            ..GlobalArgs::default()
        };
        let err = args.load_config().unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_partial_only_when_something_failed() {
        assert!(partial(0).is_ok());
        assert!(matches!(partial(3), Err(CliError::Partial(3))));
    }

    #[test]
    fn test_sync_flags_to_options() {
        let flags = SyncFlags {
            full: true,
            delete: true,
            dry_run: true,
            json: false,
        };
        let options = flags.options();
        assert_eq!(options.mode, SyncMode::Full { delete: true });
        assert!(options.dry_run);

        let incremental = SyncFlags {
            full: false,
            delete: false,
            dry_run: false,
            json: false,
        };
        assert_eq!(incremental.options().mode, SyncMode::Incremental);
    }
}
