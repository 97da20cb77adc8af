use super::{load_config, open_database};
use crate::time::parse_age;
use anyhow::{anyhow, Result};
use chrono::Utc;
use std::path::Path;

pub fn execute(older_than: &str, config_path: Option<&Path>) -> Result<()> {
    let age = parse_age(older_than)?;
    let cutoff = Utc::now()
        .checked_sub_signed(age)
        .ok_or_else(|| anyhow!("age {older_than:?} is too large"))?;

    let config = load_config(config_path)?;
    let deleted = open_database(&config)?.prune_older_than(cutoff)?;

    println!("Deleted {deleted} events recorded before {}", cutoff.to_rfc3339());
    Ok(())
}
