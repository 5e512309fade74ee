//! Durable per-type ticket storage with primary and secondary key lookup.
//!
//! Each [`TicketTypeTag`] owns one namespace (a SQLite table) holding both
//! primary-key records and secondary-key pointers. A pointer's value is the
//! primary key it resolves to; the primary record is always the source of
//! truth. Records are overwritten on re-submission and never deleted here
//! (a takedown is itself a new record).

use rusqlite::{Connection, OptionalExtension};
use tracing::{debug, info};

use crate::errors::{AppResult, RegistryError};
use crate::tickets::{Ticket, TicketTypeTag, ALL_TAGS};

/// Row discriminator within a namespace: a serialised ticket record
const KIND_RECORD: &str = "record";
/// Row discriminator within a namespace: a secondary-to-primary pointer
const KIND_POINTER: &str = "pointer";

/// The ticket store: one SQLite connection, one table per ticket type
pub struct TicketRegistry {
    connection: Connection,
}

impl TicketRegistry {
    /// Open (or create) the registry at `database_path` and initialise every
    /// type's namespace
    pub fn open(database_path: &str) -> Result<Self, RegistryError> {
        let connection = Connection::open(database_path)?;
        setup_schema(&connection)?;
        info!("Ticket registry initialised at: {}", database_path);
        Ok(Self { connection })
    }

    /// Get a reference to the underlying connection
    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Write `ticket` under its primary key and, when the variant defines
    /// one, a secondary-key pointer in the same namespace.
    ///
    /// Both writes happen in a single database transaction: a resolvable
    /// secondary pointer to an unreadable primary record is never observable.
    pub fn put<T: Ticket>(&mut self, ticket: &T) -> AppResult<()> {
        let namespace = T::TYPE_TAG.namespace();
        let primary = ticket.primary_key();
        let bytes = ticket.to_bytes()?;
        let secondary = ticket.secondary_key();

        let tx = self.connection.transaction().map_err(storage)?;
        tx.execute(
            &format!("INSERT OR REPLACE INTO {namespace} (key, value, kind) VALUES (?1, ?2, ?3)"),
            rusqlite::params![primary, bytes, KIND_RECORD],
        )
        .map_err(storage)?;
        if let Some(secondary) = &secondary {
            tx.execute(
                &format!(
                    "INSERT OR REPLACE INTO {namespace} (key, value, kind) VALUES (?1, ?2, ?3)"
                ),
                rusqlite::params![secondary, primary.as_bytes(), KIND_POINTER],
            )
            .map_err(storage)?;
        }
        tx.commit().map_err(storage)?;

        debug!(
            "Ticket added into registry namespace {} with key {}",
            namespace, primary
        );
        Ok(())
    }

    /// True if a record exists under `primary_key` in `tag`'s namespace
    pub fn exists(&self, tag: TicketTypeTag, primary_key: &str) -> Result<bool, RegistryError> {
        let found: Option<i64> = self
            .connection
            .query_row(
                &format!(
                    "SELECT 1 FROM {} WHERE key = ?1 AND kind = ?2",
                    tag.namespace()
                ),
                rusqlite::params![primary_key, KIND_RECORD],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Resolve `secondary_key` to its primary key, then check record
    /// existence. An absent pointer or a dangling target both yield `false`.
    pub fn exists_by_secondary(
        &self,
        tag: TicketTypeTag,
        secondary_key: &str,
    ) -> Result<bool, RegistryError> {
        match self.resolve_pointer(tag, secondary_key)? {
            Some(primary) => self.exists(tag, &primary),
            None => Ok(false),
        }
    }

    /// Fetch and deserialise the record under `primary_key`.
    ///
    /// Returns `None` for a missing key; `CorruptRecord` if stored bytes fail
    /// the variant's `from_bytes`.
    pub fn get<T: Ticket>(&self, primary_key: &str) -> Result<Option<T>, RegistryError> {
        let bytes: Option<Vec<u8>> = self
            .connection
            .query_row(
                &format!(
                    "SELECT value FROM {} WHERE key = ?1 AND kind = ?2",
                    T::TYPE_TAG.namespace()
                ),
                rusqlite::params![primary_key, KIND_RECORD],
                |row| row.get(0),
            )
            .optional()?;
        match bytes {
            Some(bytes) => {
                let ticket =
                    T::from_bytes(&bytes).map_err(|_| RegistryError::CorruptRecord {
                        key: primary_key.to_string(),
                    })?;
                Ok(Some(ticket))
            }
            None => Ok(None),
        }
    }

    /// Pointer-then-fetch lookup; a dangling pointer is "not found", never an
    /// error
    pub fn get_by_secondary<T: Ticket>(
        &self,
        secondary_key: &str,
    ) -> Result<Option<T>, RegistryError> {
        match self.resolve_pointer(T::TYPE_TAG, secondary_key)? {
            Some(primary) => self.get(&primary),
            None => Ok(None),
        }
    }

    /// Ordered scan of the primary-key space for one type. A fresh call
    /// re-scans from the start.
    pub fn all_keys(&self, tag: TicketTypeTag) -> Result<Vec<String>, RegistryError> {
        let mut stmt = self.connection.prepare(&format!(
            "SELECT key FROM {} WHERE kind = ?1 ORDER BY key",
            tag.namespace()
        ))?;
        let keys = stmt
            .query_map(rusqlite::params![KIND_RECORD], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(keys)
    }

    fn resolve_pointer(
        &self,
        tag: TicketTypeTag,
        secondary_key: &str,
    ) -> Result<Option<String>, RegistryError> {
        let bytes: Option<Vec<u8>> = self
            .connection
            .query_row(
                &format!(
                    "SELECT value FROM {} WHERE key = ?1 AND kind = ?2",
                    tag.namespace()
                ),
                rusqlite::params![secondary_key, KIND_POINTER],
                |row| row.get(0),
            )
            .optional()?;
        Ok(bytes.map(|b| String::from_utf8_lossy(&b).into_owned()))
    }
}

fn setup_schema(connection: &Connection) -> Result<(), RegistryError> {
    for tag in ALL_TAGS {
        connection.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS {} (
                    key   TEXT PRIMARY KEY,
                    value BLOB NOT NULL,
                    kind  TEXT NOT NULL CHECK(kind IN ('record', 'pointer'))
                )",
                tag.namespace()
            ),
            [],
        )?;
    }
    Ok(())
}

fn storage(e: rusqlite::Error) -> RegistryError {
    RegistryError::StorageUnavailable(e)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tickets::IdentityRegistration;

    fn test_registry() -> TicketRegistry {
        TicketRegistry::open(":memory:").unwrap()
    }

    fn sample_ticket(identity: &str, outpoint: Option<&str>) -> IdentityRegistration {
        IdentityRegistration {
            identity: identity.to_string(),
            address: "tAddr1".to_string(),
            outpoint: outpoint.map(|s| s.to_string()),
            created_at: 1000,
            signature: vec![7; 64],
            carrying_txid: "txid-a".to_string(),
            carrying_block_height: 10,
        }
    }

    #[test]
    fn test_put_and_get() {
        let mut registry = test_registry();
        let ticket = sample_ticket("abc", None);
        registry.put(&ticket).unwrap();

        let fetched: IdentityRegistration = registry.get("abc").unwrap().unwrap();
        assert_eq!(fetched, ticket);
        assert!(registry.exists(TicketTypeTag::Identity, "abc").unwrap());
        assert!(!registry.exists(TicketTypeTag::Identity, "nope").unwrap());
    }

    #[test]
    fn test_get_missing_is_none() {
        let registry = test_registry();
        let fetched: Option<IdentityRegistration> = registry.get("absent").unwrap();
        assert!(fetched.is_none());
    }

    #[test]
    fn test_secondary_key_atomicity() {
        let mut registry = test_registry();
        let ticket = sample_ticket("mn-id", Some("outpoint-0"));
        registry.put(&ticket).unwrap();

        assert!(registry.exists(TicketTypeTag::Identity, "mn-id").unwrap());
        assert!(registry
            .exists_by_secondary(TicketTypeTag::Identity, "outpoint-0")
            .unwrap());
        let via_secondary: IdentityRegistration =
            registry.get_by_secondary("outpoint-0").unwrap().unwrap();
        assert_eq!(via_secondary, ticket);
    }

    #[test]
    fn test_dangling_pointer_is_not_found() {
        let mut registry = test_registry();
        let ticket = sample_ticket("mn-id", Some("outpoint-0"));
        registry.put(&ticket).unwrap();

        // Remove the primary record out of band, leaving the pointer behind
        registry
            .connection()
            .execute(
                "DELETE FROM identity_tickets WHERE key = 'mn-id' AND kind = 'record'",
                [],
            )
            .unwrap();

        assert!(!registry
            .exists_by_secondary(TicketTypeTag::Identity, "outpoint-0")
            .unwrap());
        let fetched: Option<IdentityRegistration> =
            registry.get_by_secondary("outpoint-0").unwrap();
        assert!(fetched.is_none());
    }

    #[test]
    fn test_corrupt_record_surfaces() {
        let registry = test_registry();
        registry
            .connection()
            .execute(
                "INSERT INTO identity_tickets (key, value, kind) VALUES ('bad', x'00ff', 'record')",
                [],
            )
            .unwrap();

        let err = registry.get::<IdentityRegistration>("bad").unwrap_err();
        assert!(matches!(err, RegistryError::CorruptRecord { key } if key == "bad"));
    }

    #[test]
    fn test_resubmission_overwrites() {
        let mut registry = test_registry();
        registry.put(&sample_ticket("abc", None)).unwrap();

        let mut updated = sample_ticket("abc", None);
        updated.carrying_txid = "txid-b".to_string();
        updated.carrying_block_height = 20;
        registry.put(&updated).unwrap();

        let fetched: IdentityRegistration = registry.get("abc").unwrap().unwrap();
        assert_eq!(fetched.carrying_txid, "txid-b");
        assert_eq!(fetched.carrying_block_height, 20);
        assert_eq!(registry.all_keys(TicketTypeTag::Identity).unwrap().len(), 1);
    }

    #[test]
    fn test_all_keys_ordered_and_pointer_free() {
        let mut registry = test_registry();
        registry.put(&sample_ticket("charlie", Some("op-c"))).unwrap();
        registry.put(&sample_ticket("alpha", Some("op-a"))).unwrap();
        registry.put(&sample_ticket("bravo", None)).unwrap();

        let keys = registry.all_keys(TicketTypeTag::Identity).unwrap();
        assert_eq!(keys, vec!["alpha", "bravo", "charlie"]);
    }

    #[test]
    fn test_namespaces_are_independent() {
        let mut registry = test_registry();
        registry.put(&sample_ticket("abc", None)).unwrap();

        assert!(registry.all_keys(TicketTypeTag::Content).unwrap().is_empty());
        assert!(!registry.exists(TicketTypeTag::Trade, "abc").unwrap());
    }
}
