//! Record codec
//!
//! Every entity record is stored as a [`StoredRecord`] envelope carrying the
//! entity id next to its state. Decoding checks the envelope id against the
//! id the record was read under, so a blob written under the wrong key is
//! reported as corrupt instead of being handed back as another entity.

use flowmuse_core::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Byte representation of stored blobs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Codec {
    /// MessagePack with named fields (self-describing)
    #[default]
    MessagePack,
    /// JSON
    Json,
}

impl Codec {
    /// Serialize `value`
    pub fn encode<V: Serialize + ?Sized>(&self, value: &V) -> Result<Vec<u8>> {
        match self {
            Codec::MessagePack => rmp_serde::to_vec_named(value)
                .map_err(|e| Error::Serialization(format!("msgpack encode: {}", e))),
            Codec::Json => serde_json::to_vec(value)
                .map_err(|e| Error::Serialization(format!("json encode: {}", e))),
        }
    }

    /// Deserialize a value from `bytes`
    pub fn decode<V: DeserializeOwned>(&self, bytes: &[u8]) -> Result<V> {
        match self {
            Codec::MessagePack => rmp_serde::from_slice(bytes)
                .map_err(|e| Error::Serialization(format!("msgpack decode: {}", e))),
            Codec::Json => serde_json::from_slice(bytes)
                .map_err(|e| Error::Serialization(format!("json decode: {}", e))),
        }
    }
}

/// On-disk envelope of one entity record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord<T> {
    /// Id the record belongs to
    pub id: String,
    /// Entity state
    pub state: T,
}

#[derive(Serialize)]
struct StoredRecordRef<'a, T> {
    id: &'a str,
    state: &'a T,
}

/// Encode the record of entity `id`
pub fn encode_record<T: Serialize>(codec: Codec, id: &str, state: &T) -> Result<Vec<u8>> {
    codec.encode(&StoredRecordRef { id, state })
}

/// Decode the record read under `id`
///
/// # Errors
///
/// `Serialization` if the bytes do not decode to the expected shape or the
/// envelope names a different id.
pub fn decode_record<T: DeserializeOwned>(codec: Codec, id: &str, bytes: &[u8]) -> Result<T> {
    let record: StoredRecord<T> = codec.decode(bytes)?;
    if record.id != id {
        return Err(Error::Serialization(format!(
            "record read under {:?} belongs to {:?}",
            id, record.id
        )));
    }
    Ok(record.state)
}
