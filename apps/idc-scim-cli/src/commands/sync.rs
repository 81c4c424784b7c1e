//! Combined user and group sync

use crate::commands::{finish_run, GlobalArgs, SyncFlags};
use crate::error::CliResult;
use crate::input;
use clap::Args;
use idc_scim_client::{ReconciliationEngine, RunOutcome};
use std::path::PathBuf;

/// Reconcile users, then groups, from their desired-state files
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// JSON file with the desired users
    #[arg(long, value_name = "FILE", default_value = "users.json")]
    pub users: PathBuf,

    /// JSON file with the desired groups
    #[arg(long, value_name = "FILE", default_value = "groups.json")]
    pub groups: PathBuf,

    /// Only run the user phase
    #[arg(long, conflicts_with = "groups_only")]
    pub users_only: bool,

    /// Only run the group phase
    #[arg(long)]
    pub groups_only: bool,

    #[command(flatten)]
    pub flags: SyncFlags,
}

/// Which phases a run covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phases {
    Both,
    UsersOnly,
    GroupsOnly,
}

impl SyncArgs {
    pub fn phases(&self) -> Phases {
        match (self.users_only, self.groups_only) {
            (true, _) => Phases::UsersOnly,
            (_, true) => Phases::GroupsOnly,
            _ => Phases::Both,
        }
    }
}

/// Execute the combined sync
///
/// Both files are read and validated before anything is written.
pub async fn execute(args: SyncArgs, global: &GlobalArgs) -> CliResult<()> {
    let phases = args.phases();
    let users = match phases {
        Phases::GroupsOnly => None,
        _ => Some(input::load_users(&args.users)?),
    };
    let groups = match phases {
        Phases::UsersOnly => None,
        _ => Some(input::load_groups(&args.groups)?),
    };

    let client = global.client()?;
    let engine = ReconciliationEngine::new(&client, args.flags.options());
    let outcome = match (users, groups) {
        (Some(users), Some(groups)) => engine.sync_all(users, groups).await?,
        (users, groups) => {
            let mut outcome = RunOutcome::default();
            if let Some(users) = users {
                outcome.users = Some(engine.sync_users(users).await?);
            }
            if let Some(groups) = groups {
                outcome.groups = Some(engine.sync_groups(groups).await?);
            }
            outcome
        }
    };

    finish_run(&outcome, args.flags.json)
}
