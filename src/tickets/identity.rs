//! Identity registration tickets
//!
//! Registers an identity string on chain, bound to a collateral address and,
//! for masternode-issued registrations, the masternode's collateral outpoint.

use byteorder::{ByteOrder, LittleEndian};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::chain::{MasternodeRoster, TicketSigner};
use crate::errors::TicketError;
use crate::tickets::{Ticket, TicketTypeTag};

/// An identity registration record.
///
/// `signature` covers the digest of (identity, address, outpoint, created_at);
/// whether it verifies against the identity's public material is a signer
/// collaborator concern, never enforced by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityRegistration {
    /// The registered identity string; doubles as the primary key
    pub identity: String,
    /// Collateral address the registration is bound to
    pub address: String,
    /// Collateral outpoint short form; `None` for address-issued identities
    pub outpoint: Option<String>,
    /// Unix time the ticket was constructed
    pub created_at: i64,
    /// Raw signature bytes over [`IdentityRegistration::signing_digest`]
    pub signature: Vec<u8>,
    /// Transaction that carried this ticket; set by the processor
    #[serde(default)]
    pub carrying_txid: String,
    /// Height of the block that carried this ticket; set by the processor
    #[serde(default)]
    pub carrying_block_height: u32,
}

impl IdentityRegistration {
    /// Masternode-issued registration: the collateral address and outpoint
    /// come from this node's active masternode record.
    pub fn for_masternode(
        identity: String,
        keypass: &str,
        roster: &dyn MasternodeRoster,
        signer: &dyn TicketSigner,
    ) -> Result<Self, TicketError> {
        let record = roster
            .active_masternode()
            .ok_or(TicketError::NotAnActiveMasternode)?;
        Self::build(
            identity,
            keypass,
            record.collateral_address,
            Some(record.collateral_outpoint),
            signer,
        )
    }

    /// Address-issued registration: explicit address, no collateral outpoint
    pub fn for_address(
        identity: String,
        keypass: &str,
        address: String,
        signer: &dyn TicketSigner,
    ) -> Result<Self, TicketError> {
        Self::build(identity, keypass, address, None, signer)
    }

    fn build(
        identity: String,
        keypass: &str,
        address: String,
        outpoint: Option<String>,
        signer: &dyn TicketSigner,
    ) -> Result<Self, TicketError> {
        let created_at = Utc::now().timestamp();
        let digest = signing_digest(&identity, &address, outpoint.as_deref(), created_at);
        let signature = signer.sign(&digest, &identity, keypass)?;
        Ok(Self {
            identity,
            address,
            outpoint,
            created_at,
            signature,
            carrying_txid: String::new(),
            carrying_block_height: 0,
        })
    }

    /// Digest the ticket signature covers
    pub fn signing_digest(&self) -> [u8; 32] {
        signing_digest(
            &self.identity,
            &self.address,
            self.outpoint.as_deref(),
            self.created_at,
        )
    }
}

fn signing_digest(identity: &str, address: &str, outpoint: Option<&str>, created_at: i64) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(identity.as_bytes());
    hasher.update(address.as_bytes());
    hasher.update(outpoint.unwrap_or("").as_bytes());
    let mut ts = [0u8; 8];
    LittleEndian::write_i64(&mut ts, created_at);
    hasher.update(ts);
    hasher.finalize().into()
}

impl Ticket for IdentityRegistration {
    const TYPE_TAG: TicketTypeTag = TicketTypeTag::Identity;

    fn primary_key(&self) -> String {
        self.identity.clone()
    }

    fn secondary_key(&self) -> Option<String> {
        self.outpoint.clone()
    }

    fn to_bytes(&self) -> Result<Vec<u8>, TicketError> {
        serde_json::to_vec(self).map_err(|e| TicketError::MalformedTicket(e.to_string()))
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, TicketError> {
        serde_json::from_slice(bytes).map_err(|e| TicketError::MalformedTicket(e.to_string()))
    }

    fn render(&self) -> serde_json::Value {
        let mut ticket = serde_json::json!({
            "type": Self::TYPE_TAG.name(),
            "identity": self.identity,
            "address": self.address,
            "timestamp": self.created_at.to_string(),
            "signature": hex::encode(&self.signature),
        });
        if let Some(outpoint) = &self.outpoint {
            ticket["outpoint"] = serde_json::json!(outpoint);
        }
        serde_json::json!({
            "txid": self.carrying_txid,
            "height": self.carrying_block_height,
            "ticket": ticket,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::MasternodeRecord;

    struct FakeSigner;

    impl TicketSigner for FakeSigner {
        fn sign(
            &self,
            digest: &[u8; 32],
            _identity: &str,
            keypass: &str,
        ) -> Result<Vec<u8>, TicketError> {
            if keypass == "wrong" {
                return Err(TicketError::SigningFailed {
                    reason: "bad passphrase".to_string(),
                });
            }
            // Deterministic stand-in: the digest itself, doubled
            let mut sig = digest.to_vec();
            sig.extend_from_slice(digest);
            Ok(sig)
        }

        fn verify(&self, digest: &[u8; 32], signature: &[u8], _identity: &str) -> bool {
            signature.len() == 64 && &signature[..32] == digest
        }
    }

    struct FakeRoster(Option<MasternodeRecord>);

    impl MasternodeRoster for FakeRoster {
        fn active_masternode(&self) -> Option<MasternodeRecord> {
            self.0.clone()
        }
    }

    fn sample_record() -> MasternodeRecord {
        MasternodeRecord {
            collateral_address: "tAddrMn1".to_string(),
            collateral_outpoint: "aa11bb22-0".to_string(),
        }
    }

    #[test]
    fn test_masternode_issued_registration() {
        let roster = FakeRoster(Some(sample_record()));
        let ticket =
            IdentityRegistration::for_masternode("mn-id".to_string(), "pass", &roster, &FakeSigner)
                .unwrap();

        assert_eq!(ticket.address, "tAddrMn1");
        assert_eq!(ticket.outpoint.as_deref(), Some("aa11bb22-0"));
        assert_eq!(ticket.primary_key(), "mn-id");
        assert_eq!(ticket.secondary_key().as_deref(), Some("aa11bb22-0"));
        assert!(FakeSigner.verify(&ticket.signing_digest(), &ticket.signature, "mn-id"));
    }

    #[test]
    fn test_masternode_issued_requires_active_masternode() {
        let roster = FakeRoster(None);
        let err =
            IdentityRegistration::for_masternode("mn-id".to_string(), "pass", &roster, &FakeSigner)
                .unwrap_err();
        assert!(matches!(err, TicketError::NotAnActiveMasternode));
    }

    #[test]
    fn test_address_issued_registration() {
        let ticket = IdentityRegistration::for_address(
            "user-id".to_string(),
            "pass",
            "tAddr1".to_string(),
            &FakeSigner,
        )
        .unwrap();

        assert_eq!(ticket.address, "tAddr1");
        assert!(ticket.outpoint.is_none());
        assert!(ticket.secondary_key().is_none());
        assert!(ticket.created_at > 0);
    }

    #[test]
    fn test_signing_failure_propagates() {
        let err = IdentityRegistration::for_address(
            "user-id".to_string(),
            "wrong",
            "tAddr1".to_string(),
            &FakeSigner,
        )
        .unwrap_err();
        assert!(matches!(err, TicketError::SigningFailed { .. }));
    }

    #[test]
    fn test_bytes_round_trip() {
        let ticket = IdentityRegistration {
            identity: "abc".to_string(),
            address: "tAddr1".to_string(),
            outpoint: Some("deadbeef-1".to_string()),
            created_at: 1000,
            signature: vec![1, 2, 3],
            carrying_txid: "txid".to_string(),
            carrying_block_height: 42,
        };
        let bytes = ticket.to_bytes().unwrap();
        let parsed = IdentityRegistration::from_bytes(&bytes).unwrap();
        assert_eq!(parsed, ticket);
    }

    #[test]
    fn test_from_bytes_malformed() {
        let err = IdentityRegistration::from_bytes(b"not a ticket").unwrap_err();
        assert!(matches!(err, TicketError::MalformedTicket(_)));
    }

    #[test]
    fn test_render_projection() {
        let ticket = IdentityRegistration {
            identity: "abc".to_string(),
            address: "tAddr1".to_string(),
            outpoint: None,
            created_at: 1000,
            signature: vec![0xde, 0xad],
            carrying_txid: "feed".to_string(),
            carrying_block_height: 7,
        };
        let rendered = ticket.render();
        assert_eq!(rendered["txid"], "feed");
        assert_eq!(rendered["height"], 7);
        assert_eq!(rendered["ticket"]["type"], "identity-registration");
        assert_eq!(rendered["ticket"]["signature"], "dead");
        assert!(rendered["ticket"].get("outpoint").is_none());
    }
}
