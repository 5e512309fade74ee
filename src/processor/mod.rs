//! Bridges the ledger and the ticket registry.
//!
//! On every connected block the processor runs each transaction's outputs
//! through the transport codec, dispatches decoded payloads by type tag and
//! writes the resulting tickets into the registry. On the outbound path it
//! wraps a ticket into a funded, signed carrier transaction and hands it to
//! the relay collaborator.
//!
//! Most transactions carry no ticket at all: "no embedded data" is the
//! overwhelmingly common, non-error outcome during block processing and is
//! kept apart from genuine corruption in the logs. Neither ever aborts the
//! containing block.

use bitcoin::{absolute, transaction, Amount, ScriptBuf, Sequence, Transaction, TxIn, TxOut, Txid, Witness};
use tracing::{debug, info, warn};

use crate::chain::{ChainAccess, ConnectedBlock, MasternodeRoster, RelayError, TicketSigner, WalletAccess};
use crate::codec;
use crate::errors::{AppError, AppResult, CodecError, RegistryError, SubmitError, TicketError};
use crate::registry::TicketRegistry;
use crate::tickets::{IdentityRegistration, Ticket, TicketTypeTag};

/// Value carried by each payload output, distinct from the change output
pub const TICKET_OUTPUT_VALUE: Amount = Amount::from_sat(30_000);

/// Orchestrates codec, registry and the injected chain/wallet capabilities
pub struct TicketProcessor<C: ChainAccess, W: WalletAccess> {
    registry: TicketRegistry,
    chain: C,
    wallet: W,
}

impl<C: ChainAccess, W: WalletAccess> TicketProcessor<C, W> {
    pub fn new(registry: TicketRegistry, chain: C, wallet: W) -> Self {
        Self {
            registry,
            chain,
            wallet,
        }
    }

    pub fn registry(&self) -> &TicketRegistry {
        &self.registry
    }

    /// Ingest every transaction of a newly connected block.
    ///
    /// Decode or dispatch failure for one transaction is logged and skipped;
    /// it never halts ingestion of the rest of the block.
    pub fn on_block_connected(&mut self, block: &ConnectedBlock) {
        for tx in &block.transactions {
            let txid = tx.compute_txid();
            match self.ingest_transaction(tx, block.height) {
                Ok(Some(tag)) => info!(
                    "Stored {} ticket from txid {} at height {}",
                    tag.name(),
                    txid,
                    block.height
                ),
                Ok(None) => {}
                Err(AppError::Codec(CodecError::NoEmbeddedData)) => {
                    debug!("No embedded ticket data in txid {}", txid)
                }
                Err(e) => warn!("Skipping ticket candidate txid {}: {}", txid, e),
            }
        }
    }

    /// Decode one transaction and store the ticket it carries, if any.
    ///
    /// `Ok(Some(tag))` means a ticket was persisted; `Ok(None)` means the
    /// payload decoded to a recognised tag whose variant is not persisted yet.
    fn ingest_transaction(
        &mut self,
        tx: &Transaction,
        height: u32,
    ) -> AppResult<Option<TicketTypeTag>> {
        let payload = codec::decode(&tx.output)?;
        let (&tag_byte, ticket_bytes) = payload
            .split_first()
            .ok_or_else(|| TicketError::MalformedTicket("empty ticket payload".to_string()))?;
        let tag =
            TicketTypeTag::from_byte(tag_byte).ok_or(TicketError::UnknownTypeTag(tag_byte))?;

        match tag {
            TicketTypeTag::Identity => {
                let mut ticket = IdentityRegistration::from_bytes(ticket_bytes)?;
                ticket.carrying_txid = tx.compute_txid().to_string();
                ticket.carrying_block_height = height;
                self.registry.put(&ticket)?;
                Ok(Some(tag))
            }
            other => {
                debug!("Decoded {} ticket, variant not persisted yet", other.name());
                Ok(None)
            }
        }
    }

    /// Serialise `ticket`, wrap it into a funded and signed carrier
    /// transaction, and submit it for relay.
    pub fn submit<T: Ticket>(&mut self, ticket: &T) -> Result<Txid, SubmitError> {
        let mut payload = Vec::new();
        payload.push(T::TYPE_TAG.to_byte());
        payload.extend(ticket.to_bytes()?);

        let tx = self.build_carrier_transaction(&payload)?;
        self.chain.submit_transaction(&tx).map_err(|e| match e {
            RelayError::Rejected { code, reason } => SubmitError::RelayRejected { code, reason },
            RelayError::Timeout => SubmitError::RelayTimeout,
        })?;
        Ok(tx.compute_txid())
    }

    /// Assemble the carrier: payload outputs in codec order, then one change
    /// output, funded from a single wallet coin.
    fn build_carrier_transaction(&self, payload: &[u8]) -> Result<Transaction, SubmitError> {
        let scripts = codec::encode(payload)?;
        let carried = TICKET_OUTPUT_VALUE * scripts.len() as u64;

        // Rough fee from the frame size, doubled to leave signing headroom;
        // corrected below once the real serialised size is known
        let approx_fee = self.wallet.estimate_fee(codec::padded_frame_len(payload.len())) * 2;
        let required = carried + approx_fee;
        let funding = self
            .wallet
            .select_unspent_output(required)
            .ok_or(SubmitError::NoSuitableInput { required })?;

        let mut output: Vec<TxOut> = scripts
            .into_iter()
            .map(|script_pubkey| TxOut {
                value: TICKET_OUTPUT_VALUE,
                script_pubkey,
            })
            .collect();
        let change_value = funding
            .value
            .checked_sub(carried)
            .ok_or(SubmitError::NoSuitableInput { required })?;
        output.push(TxOut {
            value: change_value,
            script_pubkey: self.wallet.change_script(),
        });

        let mut tx = Transaction {
            version: transaction::Version::TWO,
            lock_time: absolute::LockTime::ZERO,
            input: vec![TxIn {
                previous_output: funding.outpoint,
                script_sig: ScriptBuf::new(),
                sequence: Sequence::MAX,
                witness: Witness::new(),
            }],
            output,
        };

        let script_sig =
            self.wallet
                .sign_input(&tx, 0, &funding.script_pubkey, funding.value)?;
        tx.input[0].script_sig = script_sig;

        // Signing changed the serialised size; re-estimate once and take the
        // final fee out of the change output
        let fee = self.wallet.estimate_fee(tx.total_size());
        let change_index = tx.output.len() - 1;
        tx.output[change_index].value = change_value
            .checked_sub(fee)
            .ok_or(SubmitError::NoSuitableInput { required })?;

        Ok(tx)
    }

    /// Construct and submit an identity registration.
    ///
    /// With an explicit `address` the ticket is address-issued; without one
    /// it is masternode-issued and requires this node's active masternode
    /// record.
    pub fn register_identity(
        &mut self,
        identity: String,
        keypass: &str,
        address: Option<String>,
        roster: &dyn MasternodeRoster,
        signer: &dyn TicketSigner,
    ) -> AppResult<Txid> {
        let ticket = match address {
            Some(address) => {
                IdentityRegistration::for_address(identity, keypass, address, signer)?
            }
            None => IdentityRegistration::for_masternode(identity, keypass, roster, signer)?,
        };
        Ok(self.submit(&ticket)?)
    }

    /// Look up an identity registration by its identity string
    pub fn find_identity(
        &self,
        identity: &str,
    ) -> Result<Option<IdentityRegistration>, RegistryError> {
        self.registry.get(identity)
    }

    /// All registered identity strings, in key order
    pub fn list_identities(&self) -> Result<Vec<String>, RegistryError> {
        self.registry.all_keys(TicketTypeTag::Identity)
    }

    /// Existence check accepting either a primary or a secondary key
    pub fn ticket_exists(&self, key: &str) -> Result<bool, RegistryError> {
        if self.registry.exists(TicketTypeTag::Identity, key)? {
            return Ok(true);
        }
        self.registry
            .exists_by_secondary(TicketTypeTag::Identity, key)
    }

    /// Current chain tip height as reported by the ledger collaborator
    pub fn current_height(&self) -> u32 {
        self.chain.current_height()
    }
}
