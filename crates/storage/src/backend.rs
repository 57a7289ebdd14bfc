//! Backend trait
//!
//! A backend is a flat map from [`Key`] to bytes. Besides plain get/put/delete
//! it must offer `update`: a read-modify-write that is serializable per key.
//! Everything the entity store guarantees about atomicity rests on that one
//! primitive.
//!
//! ## Thread Safety
//!
//! Backends are `Send + Sync` and shared behind `Arc`. Operations on different
//! keys must not block each other.

use flowmuse_core::{Key, StorageResult};
use std::future::Future;

/// Outcome of an `update` closure
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Write {
    /// Leave the stored value untouched
    Keep,
    /// Replace (or create) the stored value
    Put(Vec<u8>),
    /// Remove the stored value
    Delete,
}

/// Durable key-value primitive
pub trait Backend: Send + Sync + 'static {
    /// Read the value stored under `key`.
    fn get(&self, key: &Key) -> impl Future<Output = StorageResult<Option<Vec<u8>>>> + Send;

    /// Store `value` under `key`, replacing any previous value.
    fn put(&self, key: &Key, value: Vec<u8>) -> impl Future<Output = StorageResult<()>> + Send;

    /// Remove `key`. Returns whether a value was present.
    fn delete(&self, key: &Key) -> impl Future<Output = StorageResult<bool>> + Send;

    /// Serializable read-modify-write on one key.
    ///
    /// `f` receives the current value (or `None`) and returns the write to
    /// apply together with a result handed back to the caller. No other
    /// `update`, `put` or `delete` on the same key may interleave between the
    /// read and the write.
    ///
    /// # Purity Requirement
    ///
    /// `f` may be called more than once when a transient failure is retried.
    /// It must be a pure function of its input and must not call back into
    /// the backend.
    fn update<F, R>(&self, key: &Key, f: F) -> impl Future<Output = StorageResult<R>> + Send
    where
        F: FnMut(Option<&[u8]>) -> (Write, R) + Send,
        R: Send;
}
