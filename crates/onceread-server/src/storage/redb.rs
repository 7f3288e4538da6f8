//! Redb-backed durable storage implementation.
//!
//! Uses Redb's ACID transactions with Copy-on-Write for crash safety. Redb
//! admits a single write transaction at a time, which is what makes
//! `take_live` atomic: the read-check-remove runs inside one write
//! transaction, so two callers can never both observe the same envelope.

use std::{fmt::Display, path::Path, sync::Arc};

use onceread_core::{Envelope, EnvelopeId, Timestamp};
use redb::{Database, ReadableTable, ReadableTableMetadata, TableDefinition};

use super::{Storage, StorageError};

/// Table: envelopes
/// Key: envelope id bytes [16 bytes]
/// Value: CBOR-encoded Envelope
const ENVELOPES: TableDefinition<&[u8], &[u8]> = TableDefinition::new("envelopes");

/// Table: expiry
/// Key: (expires_at: u64 BE, id) [24 bytes], ordered by expiry for sweeping
/// Value: empty
const EXPIRY: TableDefinition<&[u8], &[u8]> = TableDefinition::new("expiry");

/// Durable storage backed by Redb.
///
/// Thread-safe through Redb's internal locking. Clone is cheap (Arc).
#[derive(Clone)]
pub struct RedbStorage {
    db: Arc<Database>,
}

impl RedbStorage {
    /// Open or create a Redb database at the given path.
    ///
    /// Creates tables if they don't exist (ENVELOPES, EXPIRY).
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Io` if the database cannot be opened or created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let db = Database::create(path.as_ref()).map_err(io)?;

        let txn = db.begin_write().map_err(io)?;
        {
            let _ = txn.open_table(ENVELOPES).map_err(io)?;
            let _ = txn.open_table(EXPIRY).map_err(io)?;
        }
        txn.commit().map_err(io)?;

        Ok(Self { db: Arc::new(db) })
    }
}

impl Storage for RedbStorage {
    fn insert(&self, envelope: &Envelope) -> Result<(), StorageError> {
        let mut bytes = Vec::with_capacity(envelope.ciphertext.len() + 128);
        ciborium::into_writer(envelope, &mut bytes)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;

        let txn = self.db.begin_write().map_err(io)?;
        {
            let mut envelopes = txn.open_table(ENVELOPES).map_err(io)?;
            let key = envelope.id.as_bytes().as_slice();

            if envelopes.get(key).map_err(io)?.is_some() {
                // Dropping the transaction aborts it
                return Err(StorageError::Conflict(envelope.id));
            }
            envelopes.insert(key, bytes.as_slice()).map_err(io)?;

            let mut expiry = txn.open_table(EXPIRY).map_err(io)?;
            let expiry_key = encode_expiry_key(envelope.expires_at, &envelope.id);
            expiry.insert(expiry_key.as_slice(), [].as_slice()).map_err(io)?;
        }
        txn.commit().map_err(io)?;

        Ok(())
    }

    fn peek(&self, id: &EnvelopeId) -> Result<Option<Envelope>, StorageError> {
        let txn = self.db.begin_read().map_err(io)?;
        let table = txn.open_table(ENVELOPES).map_err(io)?;

        match table.get(id.as_bytes().as_slice()).map_err(io)? {
            Some(value) => decode_envelope(value.value()).map(Some),
            None => Ok(None),
        }
    }

    fn take_live(
        &self,
        id: &EnvelopeId,
        now: Timestamp,
    ) -> Result<Option<Envelope>, StorageError> {
        let txn = self.db.begin_write().map_err(io)?;
        let removed = {
            let mut envelopes = txn.open_table(ENVELOPES).map_err(io)?;
            let removed = envelopes
                .remove(id.as_bytes().as_slice())
                .map_err(io)?
                .map(|value| value.value().to_vec());

            match removed {
                Some(bytes) => {
                    let envelope = decode_envelope(&bytes)?;
                    let mut expiry = txn.open_table(EXPIRY).map_err(io)?;
                    let expiry_key = encode_expiry_key(envelope.expires_at, id);
                    expiry.remove(expiry_key.as_slice()).map_err(io)?;
                    Some(envelope)
                },
                None => None,
            }
        };
        txn.commit().map_err(io)?;

        Ok(removed.filter(|envelope| envelope.is_live_at(now)))
    }

    fn remove_expired(&self, now: Timestamp) -> Result<usize, StorageError> {
        let txn = self.db.begin_write().map_err(io)?;
        let removed = {
            let mut expiry = txn.open_table(EXPIRY).map_err(io)?;
            let mut envelopes = txn.open_table(ENVELOPES).map_err(io)?;

            let upper = encode_expiry_key(now, &EnvelopeId::from_bytes([0xFF; 16]));
            let mut expired_keys = Vec::new();
            for result in expiry.range(..=upper.as_slice()).map_err(io)? {
                let (key, _) = result.map_err(io)?;
                expired_keys.push(key.value().to_vec());
            }

            for key in &expired_keys {
                expiry.remove(key.as_slice()).map_err(io)?;
                envelopes.remove(&key[8..]).map_err(io)?;
            }
            expired_keys.len()
        };
        txn.commit().map_err(io)?;

        Ok(removed)
    }

    fn len(&self) -> Result<usize, StorageError> {
        let txn = self.db.begin_read().map_err(io)?;
        let table = txn.open_table(ENVELOPES).map_err(io)?;
        Ok(table.len().map_err(io)? as usize)
    }
}

fn io(err: impl Display) -> StorageError {
    StorageError::Io(err.to_string())
}

fn decode_envelope(bytes: &[u8]) -> Result<Envelope, StorageError> {
    ciborium::from_reader(bytes).map_err(|e| StorageError::Serialization(e.to_string()))
}

/// Encode (expires_at, id) as a 24-byte key ordered by expiry.
fn encode_expiry_key(expires_at: Timestamp, id: &EnvelopeId) -> [u8; 24] {
    let mut key = [0u8; 24];
    key[..8].copy_from_slice(&expires_at.as_millis().to_be_bytes());
    key[8..].copy_from_slice(id.as_bytes());
    key
}
