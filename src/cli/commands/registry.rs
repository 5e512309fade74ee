//! Registry lookup commands

use std::path::PathBuf;

use clap::Args;

use crate::config::AppConfig;
use crate::errors::AppResult;
use crate::registry::TicketRegistry;
use crate::tickets::{IdentityRegistration, Ticket, TicketTypeTag};

fn open_registry(database: &Option<PathBuf>) -> AppResult<TicketRegistry> {
    let path = database
        .clone()
        .unwrap_or_else(|| AppConfig::get_defaults().database.path);
    Ok(TicketRegistry::open(&path.to_string_lossy())?)
}

/// Look up an identity registration by identity string
#[derive(Args)]
pub struct FindIdentityCommand {
    /// The identity string to look up
    pub identity: String,

    /// Path to the ticket registry database
    #[arg(long)]
    pub database: Option<PathBuf>,
}

impl FindIdentityCommand {
    pub fn run(&self) -> AppResult<()> {
        let registry = open_registry(&self.database)?;
        match registry.get::<IdentityRegistration>(&self.identity)? {
            Some(ticket) => println!("{}", serde_json::to_string_pretty(&ticket.render())?),
            None => println!("Identity '{}' is not registered", self.identity),
        }
        Ok(())
    }
}

/// List all registered identity strings
#[derive(Args)]
pub struct ListIdentitiesCommand {
    /// Path to the ticket registry database
    #[arg(long)]
    pub database: Option<PathBuf>,
}

impl ListIdentitiesCommand {
    pub fn run(&self) -> AppResult<()> {
        let registry = open_registry(&self.database)?;
        for key in registry.all_keys(TicketTypeTag::Identity)? {
            println!("{}", key);
        }
        Ok(())
    }
}

/// Check ticket existence by primary or secondary key
#[derive(Args)]
pub struct ExistsCommand {
    /// Primary or secondary lookup key
    pub key: String,

    /// Path to the ticket registry database
    #[arg(long)]
    pub database: Option<PathBuf>,
}

impl ExistsCommand {
    pub fn run(&self) -> AppResult<()> {
        let registry = open_registry(&self.database)?;
        let found = registry.exists(TicketTypeTag::Identity, &self.key)?
            || registry.exists_by_secondary(TicketTypeTag::Identity, &self.key)?;
        println!("{}", found);
        Ok(())
    }
}
