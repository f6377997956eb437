//! View or change the persisted configuration

use anyhow::Result;
use colored::Colorize;

use super::Session;
use crate::config::ConfigUpdate;

pub fn run(session: &mut Session, update: ConfigUpdate) -> Result<()> {
    if session.config.apply(update) {
        session.config.save(&session.config_path)?;
        println!("{}", format!("Saved {}", session.config_path.display()).green());
        println!();
    }

    println!("{}", serde_json::to_string_pretty(&session.config)?);
    Ok(())
}
