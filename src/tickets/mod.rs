//! Ticket variants and the per-variant contract
//!
//! A ticket is an application-level record carried inside a chain
//! transaction. Every variant declares a stable type tag (the first byte of
//! the transported payload), a content-derived primary key, an optional
//! secondary key for alternate lookup, a byte serialisation, and a
//! human-readable projection.

pub mod identity;

pub use identity::IdentityRegistration;

use serde::{Deserialize, Serialize};

use crate::errors::TicketError;

/// Closed set of ticket kinds. The byte values are part of the wire and
/// storage formats and must never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TicketTypeTag {
    /// Identity registration
    Identity,
    /// Content registration
    Content,
    /// Registration confirmation
    Confirm,
    /// Trade
    Trade,
    /// Takedown (itself a record, never an erasure)
    Takedown,
}

/// Every tag in dispatch/namespace order
pub const ALL_TAGS: [TicketTypeTag; 5] = [
    TicketTypeTag::Identity,
    TicketTypeTag::Content,
    TicketTypeTag::Confirm,
    TicketTypeTag::Trade,
    TicketTypeTag::Takedown,
];

impl TicketTypeTag {
    /// Stable wire byte for this tag
    pub fn to_byte(self) -> u8 {
        match self {
            TicketTypeTag::Identity => 1,
            TicketTypeTag::Content => 2,
            TicketTypeTag::Confirm => 3,
            TicketTypeTag::Trade => 4,
            TicketTypeTag::Takedown => 5,
        }
    }

    /// Parse a wire byte; `None` for unknown/out-of-range bytes
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            1 => Some(TicketTypeTag::Identity),
            2 => Some(TicketTypeTag::Content),
            3 => Some(TicketTypeTag::Confirm),
            4 => Some(TicketTypeTag::Trade),
            5 => Some(TicketTypeTag::Takedown),
            _ => None,
        }
    }

    /// Storage namespace (table) for this ticket type, fixed at first release
    pub fn namespace(self) -> &'static str {
        match self {
            TicketTypeTag::Identity => "identity_tickets",
            TicketTypeTag::Content => "content_tickets",
            TicketTypeTag::Confirm => "confirm_tickets",
            TicketTypeTag::Trade => "trade_tickets",
            TicketTypeTag::Takedown => "takedown_tickets",
        }
    }

    /// Display name used in rendered projections and logs
    pub fn name(self) -> &'static str {
        match self {
            TicketTypeTag::Identity => "identity-registration",
            TicketTypeTag::Content => "content-registration",
            TicketTypeTag::Confirm => "confirmation",
            TicketTypeTag::Trade => "trade",
            TicketTypeTag::Takedown => "takedown",
        }
    }
}

/// Capability contract implemented by every ticket variant
pub trait Ticket: Sized {
    /// The variant's constant type tag
    const TYPE_TAG: TicketTypeTag;

    /// Canonical content-derived lookup key within this type's namespace
    fn primary_key(&self) -> String;

    /// Alternate content-derived lookup key, if the variant defines one
    fn secondary_key(&self) -> Option<String>;

    /// Stable byte serialisation
    fn to_bytes(&self) -> Result<Vec<u8>, TicketError>;

    /// Inverse of [`Ticket::to_bytes`]; fails with `MalformedTicket` on any
    /// structural mismatch
    fn from_bytes(bytes: &[u8]) -> Result<Self, TicketError>;

    /// Structured display form for diagnostics and API responses
    fn render(&self) -> serde_json::Value;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_byte_round_trip() {
        for tag in ALL_TAGS {
            assert_eq!(TicketTypeTag::from_byte(tag.to_byte()), Some(tag));
        }
    }

    #[test]
    fn test_tag_bytes_are_stable() {
        // Persisted data depends on these exact values
        assert_eq!(TicketTypeTag::Identity.to_byte(), 1);
        assert_eq!(TicketTypeTag::Content.to_byte(), 2);
        assert_eq!(TicketTypeTag::Confirm.to_byte(), 3);
        assert_eq!(TicketTypeTag::Trade.to_byte(), 4);
        assert_eq!(TicketTypeTag::Takedown.to_byte(), 5);
    }

    #[test]
    fn test_unknown_tag_bytes() {
        assert_eq!(TicketTypeTag::from_byte(0), None);
        assert_eq!(TicketTypeTag::from_byte(6), None);
        assert_eq!(TicketTypeTag::from_byte(0xff), None);
    }

    #[test]
    fn test_namespaces_are_distinct() {
        let mut names: Vec<&str> = ALL_TAGS.iter().map(|t| t.namespace()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), ALL_TAGS.len());
    }
}
