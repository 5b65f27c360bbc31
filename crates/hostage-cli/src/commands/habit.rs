use chrono::Utc;
use clap::Subcommand;

use super::{open_keeper, print_json, CliResult};

#[derive(Subcommand)]
pub enum HabitAction {
    /// Create a daily habit
    Create {
        /// Owner ID
        #[arg(long)]
        owner: String,
        /// Habit title
        title: String,
    },
    /// List habits, newest first
    List {
        /// Owner ID
        #[arg(long)]
        owner: String,
        /// Maximum number of habits to return
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Check today's habit, or uncheck it if already checked today
    Check {
        /// Habit ID
        id: String,
    },
    /// Complete a habit and heal the pet by the flat habit amount
    Complete {
        /// Habit ID
        id: String,
    },
    /// Delete a habit
    Delete {
        /// Habit ID
        id: String,
    },
}

pub fn run(action: HabitAction) -> CliResult {
    let keeper = open_keeper()?;
    let now = Utc::now();

    match action {
        HabitAction::Create { owner, title } => {
            let habit = keeper.create_habit(&owner, &title, now)?;
            print_json(&habit)?;
        }
        HabitAction::List { owner, limit } => {
            let habits = keeper.list_habits(&owner, limit)?;
            print_json(&habits)?;
        }
        HabitAction::Check { id } => {
            let outcome = keeper.toggle_habit(&id, now)?;
            print_json(&outcome)?;
        }
        HabitAction::Complete { id } => {
            let completion = keeper.complete_habit(&id, now)?;
            print_json(&completion)?;
        }
        HabitAction::Delete { id } => {
            keeper.delete_habit(&id)?;
            println!("Habit deleted: {id}");
        }
    }
    Ok(())
}
