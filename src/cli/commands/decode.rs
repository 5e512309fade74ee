//! Offline ticket decoding from raw transaction hex

use clap::Args;

use crate::codec;
use crate::errors::{AppError, AppResult};
use crate::tickets::{IdentityRegistration, Ticket, TicketTypeTag};

/// Decode the embedded ticket payload from a raw transaction
#[derive(Args)]
pub struct DecodeTxCommand {
    /// Raw transaction, hex-encoded
    pub raw_tx: String,
}

impl DecodeTxCommand {
    pub fn run(&self) -> AppResult<()> {
        let bytes = hex::decode(&self.raw_tx)
            .map_err(|e| AppError::InvalidData(format!("Invalid transaction hex: {}", e)))?;
        let tx: bitcoin::Transaction = bitcoin::consensus::deserialize(&bytes)
            .map_err(|e| AppError::InvalidData(format!("Invalid transaction: {}", e)))?;

        let payload = codec::decode(&tx.output)?;
        let (&tag_byte, ticket_bytes) = payload
            .split_first()
            .ok_or_else(|| AppError::InvalidData("Empty ticket payload".to_string()))?;

        match TicketTypeTag::from_byte(tag_byte) {
            Some(TicketTypeTag::Identity) => {
                let ticket = IdentityRegistration::from_bytes(ticket_bytes)?;
                println!("{}", serde_json::to_string_pretty(&ticket.render())?);
            }
            Some(tag) => {
                println!(
                    "{} ticket, {} payload bytes (variant not decodable yet)",
                    tag.name(),
                    ticket_bytes.len()
                );
            }
            None => {
                println!(
                    "Unknown ticket type tag {:#04x}, {} payload bytes",
                    tag_byte,
                    ticket_bytes.len()
                );
            }
        }
        Ok(())
    }
}
