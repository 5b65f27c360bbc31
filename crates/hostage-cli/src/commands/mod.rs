pub mod config;
pub mod cron;
pub mod habit;
pub mod pet;
pub mod sync;
pub mod task;

use hostage_core::{Config, Keeper, SqliteStore};
use serde::Serialize;

pub type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Open the default store and build a keeper from the on-disk config with
/// environment overrides applied.
pub fn open_keeper() -> Result<Keeper<SqliteStore>, Box<dyn std::error::Error>> {
    let config = Config::load()?.with_env_overrides();
    let store = SqliteStore::open()?;
    tracing::debug!("record store opened");
    Ok(Keeper::from_config(store, &config)?)
}

pub fn print_json<T: Serialize>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
