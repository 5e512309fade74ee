//! P2FMS Ticket Transport and Registry
//!
//! Embeds application-defined records ("tickets") inside a chain's
//! transaction outputs as fake multisig scripts, and maintains a queryable
//! per-type registry rebuilt from newly connected blocks.

pub mod chain;
pub mod cli;
pub mod codec;
pub mod config;
pub mod errors;
pub mod processor;
pub mod registry;
pub mod tickets;
