//! idc-scim - keep users and groups in an IAM Identity Center style SCIM
//! directory in line with desired-state files.
//!
//! This CLI enables operators to:
//! - Inspect users, groups and group membership
//! - Create, update and delete individual records
//! - Reconcile users and groups from JSON files, with dry-run previews
//! - Build a desired-groups file from a CSV export

use clap::{Parser, Subcommand};

mod commands;
mod error;
mod group_csv;
mod input;
mod logging;
mod output;

use commands::GlobalArgs;
use error::CliResult;

/// idc-scim - SCIM provisioning and reconciliation
#[derive(Parser)]
#[command(name = "idc-scim")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage and sync users
    Users(commands::users::UsersArgs),

    /// Manage and sync groups and their members
    Groups(commands::groups::GroupsArgs),

    /// Sync users, then groups
    Sync(commands::sync::SyncArgs),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init_logging(cli.global.verbose, cli.global.log_json);

    let result = run(cli).await;

    match result {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            e.print();
            std::process::exit(e.exit_code());
        }
    }
}

async fn run(cli: Cli) -> CliResult<()> {
    match cli.command {
        Commands::Users(args) => commands::users::execute(args, &cli.global).await,
        Commands::Groups(args) => commands::groups::execute(args, &cli.global).await,
        Commands::Sync(args) => commands::sync::execute(args, &cli.global).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "idc-scim",
            "users",
            "sync",
            "users.json",
            "--full",
            "--delete",
            "--dry-run",
            "--endpoint",
            "https://scim.example.com/scim/v2",
            "-v",
        ])
        .unwrap();
        assert!(cli.global.verbose);
        assert_eq!(
            cli.global.endpoint.as_deref(),
            Some("https://scim.example.com/scim/v2")
        );
        let Commands::Users(users) = cli.command else {
            panic!("expected users command");
        };
        let commands::users::UsersCommands::Sync(sync) = users.command else {
            panic!("expected sync");
        };
        assert!(sync.flags.full && sync.flags.delete && sync.flags.dry_run);
    }

    #[test]
    fn test_delete_requires_full() {
        let result = Cli::try_parse_from(["idc-scim", "groups", "sync", "g.json", "--delete"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_set_external_id_is_optional() {
        let cli = Cli::try_parse_from(["idc-scim", "users", "set-external-id", "ana"]).unwrap();
        let Commands::Users(users) = cli.command else {
            panic!("expected users command");
        };
        let commands::users::UsersCommands::SetExternalId(args) = users.command else {
            panic!("expected set-external-id");
        };
        assert_eq!(args.user_name, "ana");
        assert!(args.external_id.is_none());
    }

    #[test]
    fn test_users_delete_takes_no_json_flag() {
        let result = Cli::try_parse_from(["idc-scim", "users", "delete", "ana", "--json"]);
        assert!(result.is_err());
        assert!(Cli::try_parse_from(["idc-scim", "users", "delete", "ana"]).is_ok());
    }

    #[test]
    fn test_auto_set_external_ids_dry_run() {
        let cli =
            Cli::try_parse_from(["idc-scim", "users", "auto-set-external-ids", "--dry-run"])
                .unwrap();
        let Commands::Users(users) = cli.command else {
            panic!("expected users command");
        };
        let commands::users::UsersCommands::AutoSetExternalIds(args) = users.command else {
            panic!("expected auto-set-external-ids");
        };
        assert!(args.dry_run);
    }

    #[test]
    fn test_combined_sync_defaults_and_phases() {
        use commands::sync::Phases;

        let cli = Cli::try_parse_from(["idc-scim", "sync", "--dry-run"]).unwrap();
        let Commands::Sync(sync) = cli.command else {
            panic!("expected sync");
        };
        assert_eq!(sync.users.to_str(), Some("users.json"));
        assert_eq!(sync.groups.to_str(), Some("groups.json"));
        assert_eq!(sync.phases(), Phases::Both);
        assert!(sync.flags.dry_run);

        let cli = Cli::try_parse_from([
            "idc-scim",
            "sync",
            "--groups",
            "teams.json",
            "--groups-only",
            "--full",
            "--delete",
        ])
        .unwrap();
        let Commands::Sync(sync) = cli.command else {
            panic!("expected sync");
        };
        assert_eq!(sync.groups.to_str(), Some("teams.json"));
        assert_eq!(sync.phases(), Phases::GroupsOnly);
        assert!(sync.flags.full && sync.flags.delete);
    }

    #[test]
    fn test_combined_sync_phase_flags_conflict() {
        let result =
            Cli::try_parse_from(["idc-scim", "sync", "--users-only", "--groups-only"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_import_csv_output_defaults_to_groups_file() {
        let cli = Cli::try_parse_from(["idc-scim", "groups", "import-csv", "links.csv"]).unwrap();
        let Commands::Groups(groups) = cli.command else {
            panic!("expected groups command");
        };
        let commands::groups::GroupsCommands::ImportCsv(args) = groups.command else {
            panic!("expected import-csv");
        };
        assert_eq!(args.output.to_str(), Some("groups.json"));
    }
}
