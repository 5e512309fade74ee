//! Collaborator capabilities consumed from the surrounding node.
//!
//! The transport core never talks to a ledger, wallet or key store directly.
//! Everything it needs from those subsystems is expressed as a trait here and
//! injected at construction or call time, so the core carries no implicit
//! dependency on process-wide state.

use bitcoin::{Amount, OutPoint, Script, ScriptBuf, Transaction};
use thiserror::Error;

use crate::errors::{SubmitError, TicketError};

/// Block-tip notification payload: the new height plus every transaction in
/// the connected block, in block order.
#[derive(Debug, Clone)]
pub struct ConnectedBlock {
    pub height: u32,
    pub transactions: Vec<Transaction>,
}

/// A single spendable wallet output offered for funding a carrier transaction
#[derive(Debug, Clone)]
pub struct SpendableOutput {
    pub outpoint: OutPoint,
    pub value: Amount,
    pub script_pubkey: ScriptBuf,
}

/// Rejection detail reported by the relay path.
///
/// Invalid transactions, missing inputs and policy rejections all surface as
/// `Rejected` with a distinguishing code and reason.
#[derive(Error, Debug)]
pub enum RelayError {
    #[error("{code}: {reason}")]
    Rejected { code: i32, reason: String },
    #[error("relay timed out")]
    Timeout,
}

/// Ledger access: tip height and transaction relay
pub trait ChainAccess {
    fn current_height(&self) -> u32;

    /// Submit a constructed transaction for mempool admission and relay
    fn submit_transaction(&self, tx: &Transaction) -> Result<(), RelayError>;
}

/// Wallet access: coin selection, signing, fee estimation
pub trait WalletAccess {
    /// Select a single spendable output with value strictly greater than
    /// `min_value`, or `None` if the wallet holds no such coin
    fn select_unspent_output(&self, min_value: Amount) -> Option<SpendableOutput>;

    /// Produce the script_sig unlocking `tx.input[input_index]`, which spends
    /// `prev_script` worth `prev_value`
    fn sign_input(
        &self,
        tx: &Transaction,
        input_index: usize,
        prev_script: &Script,
        prev_value: Amount,
    ) -> Result<ScriptBuf, SubmitError>;

    /// Estimated fee for a transaction of `byte_size` serialised bytes
    fn estimate_fee(&self, byte_size: usize) -> Amount;

    /// Fresh output script for the change of a carrier transaction
    fn change_script(&self) -> ScriptBuf;
}

/// The registration record of this node's masternode, if it is one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasternodeRecord {
    /// Address the collateral is held at
    pub collateral_address: String,
    /// Short form of the collateral outpoint ("txid-n")
    pub collateral_outpoint: String,
}

/// Masternode roster lookup for masternode-issued tickets
pub trait MasternodeRoster {
    /// The active, registered masternode this node is running as, if any
    fn active_masternode(&self) -> Option<MasternodeRecord>;
}

/// Opaque identity-key signing service for ticket payloads
pub trait TicketSigner {
    /// Sign `digest` with the key material behind `identity`, unlocked by
    /// `keypass`
    fn sign(&self, digest: &[u8; 32], identity: &str, keypass: &str)
        -> Result<Vec<u8>, TicketError>;

    /// Verify `signature` over `digest` against `identity`'s public material
    fn verify(&self, digest: &[u8; 32], signature: &[u8], identity: &str) -> bool;
}
