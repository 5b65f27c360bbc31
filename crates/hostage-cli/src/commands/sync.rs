//! External task source sync commands.

use chrono::Utc;
use clap::Subcommand;
use hostage_core::{Config, Keeper, NotionTaskSource, SqliteStore};

use super::{print_json, CliResult};

#[derive(Subcommand)]
pub enum SyncAction {
    /// Penalize the pet for overdue tasks in the configured Notion database
    Notion {
        /// Owner ID
        #[arg(long)]
        owner: String,
    },
}

pub fn run(action: SyncAction) -> CliResult {
    let config = Config::load()?.with_env_overrides();
    let keeper = Keeper::from_config(SqliteStore::open()?, &config)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    match action {
        SyncAction::Notion { owner } => {
            let source = NotionTaskSource::from_config(&config.notion)?;
            let report = runtime.block_on(keeper.sync_external(&owner, &source, Utc::now()))?;
            print_json(&report)?;
        }
    }
    Ok(())
}
