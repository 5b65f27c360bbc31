//! Task management commands for CLI.

use chrono::{DateTime, Utc};
use clap::Subcommand;
use hostage_core::{NewTask, Priority};

use super::{open_keeper, print_json, CliResult};

#[derive(Subcommand)]
pub enum TaskAction {
    /// Create a new task
    Create {
        /// Owner ID
        #[arg(long)]
        owner: String,
        /// Task title
        title: String,
        /// Task description
        #[arg(long)]
        description: Option<String>,
        /// Priority: low, medium, high, or critical (default: medium)
        #[arg(long, default_value = "medium")]
        priority: String,
        /// Due date (RFC 3339, e.g. 2025-03-10T09:00:00Z)
        #[arg(long)]
        due: Option<String>,
    },
    /// List tasks, newest first
    List {
        /// Owner ID
        #[arg(long)]
        owner: String,
        /// Only completed (true) or only open (false) tasks
        #[arg(long)]
        completed: Option<bool>,
        /// Maximum number of tasks to return
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Complete a task and heal the pet
    Complete {
        /// Task ID
        id: String,
    },
    /// Delete a task
    Delete {
        /// Task ID
        id: String,
    },
    /// Preview the damage overdue tasks would deal right now
    Overdue {
        /// Owner ID
        #[arg(long)]
        owner: String,
    },
}

fn parse_due(value: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("invalid due date '{value}': {e}"))
}

pub fn run(action: TaskAction) -> CliResult {
    let keeper = open_keeper()?;
    let now = Utc::now();

    match action {
        TaskAction::Create {
            owner,
            title,
            description,
            priority,
            due,
        } => {
            let priority: Priority = priority.parse()?;
            let due_at = due.as_deref().map(parse_due).transpose()?;
            let task = keeper.create_task(
                NewTask {
                    owner_id: owner,
                    title,
                    description,
                    priority,
                    due_at,
                },
                now,
            )?;
            print_json(&task)?;
        }
        TaskAction::List {
            owner,
            completed,
            limit,
        } => {
            let tasks = keeper.list_tasks(&owner, completed, limit)?;
            print_json(&tasks)?;
        }
        TaskAction::Complete { id } => {
            let completion = keeper.complete_task(&id, now)?;
            print_json(&completion)?;
        }
        TaskAction::Delete { id } => {
            keeper.delete_task(&id)?;
            println!("Task deleted: {id}");
        }
        TaskAction::Overdue { owner } => {
            let preview = keeper.overdue_preview(&owner, now)?;
            print_json(&preview)?;
        }
    }
    Ok(())
}
