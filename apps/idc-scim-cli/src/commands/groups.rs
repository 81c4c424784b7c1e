//! Group management CLI commands

use crate::commands::{finish_sync, GlobalArgs, SyncFlags};
use crate::error::{CliError, CliResult};
use crate::group_csv;
use crate::input;
use crate::output::{group_json, print_group_table, print_json, print_user_table, user_json};
use clap::{Args, Subcommand};
use idc_scim_client::models::ScimGroup;
use idc_scim_client::{ReconciliationEngine, ScimClient, SyncOptions};
use std::path::PathBuf;

/// Group management commands
#[derive(Args, Debug)]
pub struct GroupsArgs {
    #[command(subcommand)]
    pub command: GroupsCommands,
}

#[derive(Subcommand, Debug)]
pub enum GroupsCommands {
    /// List every group in the directory
    List(ListArgs),

    /// Create an empty group
    Create(CreateArgs),

    /// Delete a group by displayName
    Delete(NameArgs),

    /// List the members of a group (one query per directory user)
    Members(MembersArgs),

    /// Add a user to a group
    AddMember(MemberArgs),

    /// Remove a user from a group
    RemoveMember(MemberArgs),

    /// Reconcile groups and membership against a desired-state file
    Sync(SyncArgs),

    /// Remove every member from a group, keeping the group
    ClearMembers(ClearArgs),

    /// Merge email/group rows from a CSV file into a desired-groups file
    ImportCsv(ImportCsvArgs),
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// displayName of the new group
    pub display_name: String,

    /// Optional externalId
    #[arg(long)]
    pub external_id: Option<String>,
}

#[derive(Args, Debug)]
pub struct NameArgs {
    /// displayName of the group
    pub display_name: String,
}

#[derive(Args, Debug)]
pub struct MembersArgs {
    /// displayName of the group
    pub display_name: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct MemberArgs {
    /// displayName of the group
    pub group: String,

    /// userName of the user
    pub user: String,
}

#[derive(Args, Debug)]
pub struct SyncArgs {
    /// JSON file with the desired groups
    pub file: PathBuf,

    #[command(flatten)]
    pub flags: SyncFlags,
}

#[derive(Args, Debug)]
pub struct ClearArgs {
    /// displayName of the group
    pub display_name: String,

    /// Show what would be removed without removing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Output the outcome as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ImportCsvArgs {
    /// CSV file with email and group columns
    pub file: PathBuf,

    /// Desired-groups file to create or merge into
    #[arg(short, long, value_name = "FILE", default_value = "groups.json")]
    pub output: PathBuf,
}

/// Execute group commands
pub async fn execute(args: GroupsArgs, global: &GlobalArgs) -> CliResult<()> {
    // Local file work; no directory connection needed.
    if let GroupsCommands::ImportCsv(a) = args.command {
        return execute_import_csv(a);
    }

    let client = global.client()?;
    match args.command {
        GroupsCommands::List(a) => execute_list(&client, a).await,
        GroupsCommands::Create(a) => execute_create(&client, a).await,
        GroupsCommands::Delete(a) => execute_delete(&client, a).await,
        GroupsCommands::Members(a) => execute_members(&client, a).await,
        GroupsCommands::AddMember(a) => execute_add_member(&client, a).await,
        GroupsCommands::RemoveMember(a) => execute_remove_member(&client, a).await,
        GroupsCommands::Sync(a) => execute_sync(&client, a).await,
        GroupsCommands::ClearMembers(a) => execute_clear(&client, a).await,
        GroupsCommands::ImportCsv(a) => execute_import_csv(a),
    }
}

async fn execute_list(client: &ScimClient, args: ListArgs) -> CliResult<()> {
    let groups = client.get_all_groups(None).await?;

    if args.json {
        let values: Vec<_> = groups.iter().map(group_json).collect();
        print_json(&values)?;
    } else if groups.is_empty() {
        println!("No groups found.");
    } else {
        print_group_table(&groups);
        println!();
        println!("{} group(s)", groups.len());
    }
    Ok(())
}

async fn execute_create(client: &ScimClient, args: CreateArgs) -> CliResult<()> {
    let mut group = ScimGroup::new(args.display_name)?;
    if let Some(external_id) = args.external_id {
        group = group.with_external_id(external_id);
    }
    let created = client.create_group(&group).await?;
    println!(
        "Created group {} ({})",
        created.display_name(),
        created.id().unwrap_or("-")
    );
    Ok(())
}

async fn execute_delete(client: &ScimClient, args: NameArgs) -> CliResult<()> {
    let id = require_group_id(client, &args.display_name).await?;
    client.delete_group(&id).await?;
    println!("Deleted group {} ({id})", args.display_name);
    Ok(())
}

async fn execute_members(client: &ScimClient, args: MembersArgs) -> CliResult<()> {
    let id = require_group_id(client, &args.display_name).await?;
    let members = client.list_group_members(&id).await?;

    if args.json {
        let values = members.iter().map(user_json).collect::<CliResult<Vec<_>>>()?;
        print_json(&values)?;
    } else if members.is_empty() {
        println!("Group {} has no members.", args.display_name);
    } else {
        print_user_table(&members);
        println!();
        println!("{} member(s)", members.len());
    }
    Ok(())
}

async fn execute_add_member(client: &ScimClient, args: MemberArgs) -> CliResult<()> {
    let group_id = require_group_id(client, &args.group).await?;
    let user_id = require_user_id(client, &args.user).await?;
    client.add_group_members(&group_id, &[user_id]).await?;
    println!("Added {} to {}", args.user, args.group);
    Ok(())
}

async fn execute_remove_member(client: &ScimClient, args: MemberArgs) -> CliResult<()> {
    let group_id = require_group_id(client, &args.group).await?;
    let user_id = require_user_id(client, &args.user).await?;
    client.remove_group_members(&group_id, &[user_id]).await?;
    println!("Removed {} from {}", args.user, args.group);
    Ok(())
}

async fn execute_sync(client: &ScimClient, args: SyncArgs) -> CliResult<()> {
    let desired = input::load_groups(&args.file)?;
    let engine = ReconciliationEngine::new(client, args.flags.options());
    let outcome = engine.sync_groups(desired).await?;
    finish_sync(&outcome, args.flags.json)
}

async fn execute_clear(client: &ScimClient, args: ClearArgs) -> CliResult<()> {
    let options = SyncOptions::incremental().with_dry_run(args.dry_run);
    let engine = ReconciliationEngine::new(client, options);
    let outcome = engine.clear_group_members(&args.display_name).await?;
    finish_sync(&outcome, args.json)
}

fn execute_import_csv(args: ImportCsvArgs) -> CliResult<()> {
    let summary = group_csv::import(&args.file, &args.output)?;
    println!("Read {} row(s) from {}", summary.rows, args.file.display());
    println!("Added {} membership link(s)", summary.added);
    println!(
        "Wrote {} group(s) to {}",
        summary.groups,
        args.output.display()
    );
    println!();
    println!(
        "Next: idc-scim groups sync {} --dry-run",
        args.output.display()
    );
    Ok(())
}

async fn require_group_id(client: &ScimClient, display_name: &str) -> CliResult<String> {
    let group = client
        .find_group_by_name(display_name)
        .await?
        .ok_or_else(|| CliError::NotFound(format!("group {display_name}")))?;
    group
        .id()
        .map(str::to_string)
        .ok_or_else(|| CliError::Directory(format!("group {display_name} has no id")))
}

async fn require_user_id(client: &ScimClient, user_name: &str) -> CliResult<String> {
    let user = client
        .find_user_by_username(user_name)
        .await?
        .ok_or_else(|| CliError::NotFound(format!("user {user_name}")))?;
    user.id()
        .map(str::to_string)
        .ok_or_else(|| CliError::Directory(format!("user {user_name} has no id")))
}
