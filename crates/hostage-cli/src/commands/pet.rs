//! Pet lifecycle commands.

use chrono::Utc;
use clap::Subcommand;

use super::{open_keeper, print_json, CliResult};

#[derive(Subcommand)]
pub enum PetAction {
    /// Adopt a new pet (fails if one is already alive)
    Create {
        /// Owner ID
        #[arg(long)]
        owner: String,
        /// Pet name
        name: String,
    },
    /// Show the living pet with decay applied
    Status {
        /// Owner ID
        #[arg(long)]
        owner: String,
    },
    /// Revive the most recently deceased pet as a new one
    Revive {
        /// Owner ID
        #[arg(long)]
        owner: String,
    },
    /// Permanently delete a pet
    Purge {
        /// Pet ID
        id: String,
    },
}

pub fn run(action: PetAction) -> CliResult {
    let keeper = open_keeper()?;
    let now = Utc::now();

    match action {
        PetAction::Create { owner, name } => {
            let pet = keeper.create_pet(&owner, &name, now)?;
            print_json(&pet)?;
        }
        PetAction::Status { owner } => {
            let reading = keeper.pet_status(&owner, now)?;
            print_json(&reading)?;
        }
        PetAction::Revive { owner } => {
            let pet = keeper.revive_pet(&owner, now)?;
            print_json(&pet)?;
        }
        PetAction::Purge { id } => {
            keeper.purge_pet(&id)?;
            println!("Pet deleted: {id}");
        }
    }
    Ok(())
}
