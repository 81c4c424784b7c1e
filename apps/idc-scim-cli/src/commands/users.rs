//! User management CLI commands

use crate::commands::{finish_sync, partial, GlobalArgs, SyncFlags};
use crate::error::{CliError, CliResult};
use crate::input;
use crate::output::{print_json, print_user_table, user_json};
use clap::{Args, Subcommand};
use idc_scim_client::desired::Rejected;
use idc_scim_client::models::ScimUser;
use idc_scim_client::{ReconciliationEngine, ScimClient, SyncOptions};
use std::path::PathBuf;

/// User management commands
#[derive(Args, Debug)]
pub struct UsersArgs {
    #[command(subcommand)]
    pub command: UsersCommands,
}

#[derive(Subcommand, Debug)]
pub enum UsersCommands {
    /// List every user in the directory
    List(ListArgs),

    /// Show one user by userName
    Get(NameArgs),

    /// Create users from a JSON file (one object or an array)
    Create(FileArgs),

    /// Update the users named in a JSON file (one object or an array)
    Update(FileArgs),

    /// Delete a user by userName
    Delete(DeleteArgs),

    /// Reconcile users against a desired-state file
    Sync(SyncArgs),

    /// Set a user's externalId (a UUID is generated when omitted)
    SetExternalId(SetExternalIdArgs),

    /// Give every user without an externalId a generated UUID
    AutoSetExternalIds(AutoSetExternalIdsArgs),
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct NameArgs {
    /// userName of the user
    pub user_name: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// userName of the user
    pub user_name: String,
}

#[derive(Args, Debug)]
pub struct FileArgs {
    /// JSON file with a user object or an array of user objects
    pub file: PathBuf,
}

#[derive(Args, Debug)]
pub struct SyncArgs {
    /// JSON file with the desired users
    pub file: PathBuf,

    #[command(flatten)]
    pub flags: SyncFlags,
}

#[derive(Args, Debug)]
pub struct SetExternalIdArgs {
    /// userName of the user
    pub user_name: String,

    /// New externalId
    pub external_id: Option<String>,
}

#[derive(Args, Debug)]
pub struct AutoSetExternalIdsArgs {
    /// Show the ids that would be assigned without writing them
    #[arg(long)]
    pub dry_run: bool,

    /// Output the outcome as JSON
    #[arg(long)]
    pub json: bool,
}

/// Execute user commands
pub async fn execute(args: UsersArgs, global: &GlobalArgs) -> CliResult<()> {
    let client = global.client()?;
    match args.command {
        UsersCommands::List(a) => execute_list(&client, a).await,
        UsersCommands::Get(a) => execute_get(&client, a).await,
        UsersCommands::Create(a) => execute_create(&client, a).await,
        UsersCommands::Update(a) => execute_update(&client, a).await,
        UsersCommands::Delete(a) => execute_delete(&client, a).await,
        UsersCommands::Sync(a) => execute_sync(&client, a).await,
        UsersCommands::SetExternalId(a) => execute_set_external_id(&client, a).await,
        UsersCommands::AutoSetExternalIds(a) => execute_auto_set_external_ids(&client, a).await,
    }
}

async fn execute_list(client: &ScimClient, args: ListArgs) -> CliResult<()> {
    let users = client.get_all_users(None).await?;

    if args.json {
        let values = users.iter().map(user_json).collect::<CliResult<Vec<_>>>()?;
        print_json(&values)?;
    } else if users.is_empty() {
        println!("No users found.");
    } else {
        print_user_table(&users);
        println!();
        println!("{} user(s)", users.len());
    }
    Ok(())
}

async fn execute_get(client: &ScimClient, args: NameArgs) -> CliResult<()> {
    let user = require_user(client, &args.user_name).await?;
    if args.json {
        print_json(&user_json(&user)?)?;
    } else {
        print_user_table(std::slice::from_ref(&user));
    }
    Ok(())
}

async fn execute_create(client: &ScimClient, args: FileArgs) -> CliResult<()> {
    let desired = input::load_user_records(&args.file)?;
    let mut failed = report_rejected(&desired.rejected);
    for user in &desired.users {
        match client.create_user(user).await {
            Ok(created) => println!(
                "Created user {} ({})",
                created.user_name(),
                created.id().unwrap_or("-")
            ),
            Err(e) => {
                failed += 1;
                eprintln!("✗ {}: {e}", user.user_name());
            }
        }
    }
    partial(failed)
}

async fn execute_update(client: &ScimClient, args: FileArgs) -> CliResult<()> {
    let desired = input::load_user_records(&args.file)?;
    let mut failed = report_rejected(&desired.rejected);
    for user in &desired.users {
        match update_user(client, user).await {
            Ok(id) => println!("Updated user {} ({id})", user.user_name()),
            Err(e) => {
                failed += 1;
                eprintln!("✗ {}: {e}", user.user_name());
            }
        }
    }
    partial(failed)
}

async fn update_user(client: &ScimClient, user: &ScimUser) -> CliResult<String> {
    let existing = require_user(client, user.user_name()).await?;
    let id = existing
        .id()
        .ok_or_else(|| CliError::Directory(format!("user {} has no id", user.user_name())))?;
    client.patch_user(id, user.to_patch_operations()?).await?;
    Ok(id.to_string())
}

async fn execute_delete(client: &ScimClient, args: DeleteArgs) -> CliResult<()> {
    let user = require_user(client, &args.user_name).await?;
    let id = user
        .id()
        .ok_or_else(|| CliError::Directory(format!("user {} has no id", args.user_name)))?;
    client.delete_user(id).await?;
    println!("Deleted user {} ({id})", args.user_name);
    Ok(())
}

async fn execute_sync(client: &ScimClient, args: SyncArgs) -> CliResult<()> {
    let desired = input::load_users(&args.file)?;
    let engine = ReconciliationEngine::new(client, args.flags.options());
    let outcome = engine.sync_users(desired).await?;
    finish_sync(&outcome, args.flags.json)
}

async fn execute_set_external_id(client: &ScimClient, args: SetExternalIdArgs) -> CliResult<()> {
    let user = require_user(client, &args.user_name).await?;
    let id = user
        .id()
        .ok_or_else(|| CliError::Directory(format!("user {} has no id", args.user_name)))?;
    let written = client
        .set_user_external_id(id, args.external_id.as_deref())
        .await?;
    println!("Set externalId of {} to {written}", args.user_name);
    Ok(())
}

async fn execute_auto_set_external_ids(
    client: &ScimClient,
    args: AutoSetExternalIdsArgs,
) -> CliResult<()> {
    let options = SyncOptions::incremental().with_dry_run(args.dry_run);
    let engine = ReconciliationEngine::new(client, options);
    let outcome = engine.assign_missing_external_ids().await?;
    finish_sync(&outcome, args.json)
}

/// Print records that failed validation; returns how many there were.
fn report_rejected(rejected: &[Rejected]) -> usize {
    for record in rejected {
        eprintln!("✗ {}: {}", record.name, record.reason);
    }
    rejected.len()
}

async fn require_user(client: &ScimClient, user_name: &str) -> CliResult<ScimUser> {
    client
        .find_user_by_username(user_name)
        .await?
        .ok_or_else(|| CliError::NotFound(format!("user {user_name}")))
}
