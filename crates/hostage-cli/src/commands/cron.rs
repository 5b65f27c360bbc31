use chrono::Utc;
use clap::Subcommand;

use super::{open_keeper, print_json, CliResult};

#[derive(Subcommand)]
pub enum CronAction {
    /// Run the batch overdue penalty across every living pet
    Damage {
        /// Shared secret; must match `cron.secret` (or HOSTAGE_CRON_SECRET)
        #[arg(long, env = "HOSTAGE_CRON_API_KEY")]
        api_key: String,
    },
}

pub fn run(action: CronAction) -> CliResult {
    let keeper = open_keeper()?;

    match action {
        CronAction::Damage { api_key } => {
            let report = keeper.run_batch_penalty(&api_key, Utc::now())?;
            print_json(&report)?;
        }
    }
    Ok(())
}
