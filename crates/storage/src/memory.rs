//! In-memory backend
//!
//! DashMap keyed by [`Key`]. Reads take a shard read lock, writes lock only
//! the target shard, and `update` holds the shard's write lock across the
//! read, the closure and the write, which makes it serializable per key.
//!
//! # Fault Injection
//!
//! Tests schedule failures with [`MemoryBackend::inject`]. A fault names an
//! operation kind, optionally a single key, how many matching operations to
//! let through first, how many times it fires, and whether the failure is
//! transient (retryable) or permanent.
//!
//! ```ignore
//! let backend = MemoryBackend::new();
//! backend.inject(Fault::transient(FaultOp::Put).times(2));
//! // the next two puts fail with StorageError::Unavailable
//! ```

use crate::backend::{Backend, Write};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use flowmuse_core::{Key, StorageError, StorageResult};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

/// Operation kind a [`Fault`] applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultOp {
    /// `get`
    Get,
    /// `put`
    Put,
    /// `delete`
    Delete,
    /// `update`
    Update,
    /// Every operation
    Any,
}

impl FaultOp {
    fn matches(self, op: FaultOp) -> bool {
        self == FaultOp::Any || self == op
    }
}

/// A scheduled backend failure
#[derive(Debug, Clone)]
pub struct Fault {
    op: FaultOp,
    key: Option<Key>,
    skip: u32,
    remaining: u32,
    transient: bool,
}

impl Fault {
    /// Fail once with [`StorageError::Unavailable`]
    pub fn transient(op: FaultOp) -> Self {
        Fault {
            op,
            key: None,
            skip: 0,
            remaining: 1,
            transient: true,
        }
    }

    /// Fail once with [`StorageError::Backend`]
    pub fn permanent(op: FaultOp) -> Self {
        Fault {
            op,
            key: None,
            skip: 0,
            remaining: 1,
            transient: false,
        }
    }

    /// Only fire for operations on `key`
    pub fn on(mut self, key: Key) -> Self {
        self.key = Some(key);
        self
    }

    /// Let `n` matching operations succeed before firing
    pub fn after(mut self, n: u32) -> Self {
        self.skip = n;
        self
    }

    /// Fire `n` times before disarming
    pub fn times(mut self, n: u32) -> Self {
        self.remaining = n;
        self
    }

    fn applies(&self, op: FaultOp, key: &Key) -> bool {
        self.remaining > 0 && self.op.matches(op) && self.key.as_ref().map_or(true, |k| k == key)
    }
}

/// In-process backend
///
/// # Example
///
/// ```ignore
/// use flowmuse_storage::{Backend, MemoryBackend};
///
/// let backend = MemoryBackend::new();
/// backend.put(&key, b"value".to_vec()).await?;
/// assert_eq!(backend.get(&key).await?, Some(b"value".to_vec()));
/// ```
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: DashMap<Key, Vec<u8>>,
    faults: Mutex<Vec<Fault>>,
    operations: AtomicU64,
}

impl MemoryBackend {
    /// Create an empty backend
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule a failure
    pub fn inject(&self, fault: Fault) {
        self.faults.lock().push(fault);
    }

    /// Drop every pending fault
    pub fn clear_faults(&self) {
        self.faults.lock().clear();
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if nothing is stored
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check if `key` holds a value (bypasses fault injection)
    pub fn contains(&self, key: &Key) -> bool {
        self.entries.contains_key(key)
    }

    /// Total operations attempted, failed ones included
    pub fn operations(&self) -> u64 {
        self.operations.load(Ordering::Relaxed)
    }

    fn check_fault(&self, op: FaultOp, key: &Key) -> StorageResult<()> {
        self.operations.fetch_add(1, Ordering::Relaxed);

        let mut faults = self.faults.lock();
        let Some(pos) = faults.iter().position(|f| f.applies(op, key)) else {
            return Ok(());
        };

        let fault = &mut faults[pos];
        if fault.skip > 0 {
            fault.skip -= 1;
            return Ok(());
        }
        fault.remaining -= 1;
        let transient = fault.transient;
        if fault.remaining == 0 {
            faults.remove(pos);
        }

        let msg = format!("injected {:?} fault on {}", op, key);
        if transient {
            Err(StorageError::Unavailable(msg))
        } else {
            Err(StorageError::Backend(msg))
        }
    }

    fn apply_update<F, R>(&self, key: &Key, f: &mut F) -> R
    where
        F: FnMut(Option<&[u8]>) -> (Write, R),
    {
        match self.entries.entry(key.clone()) {
            Entry::Occupied(mut entry) => {
                let (write, result) = f(Some(entry.get().as_slice()));
                match write {
                    Write::Keep => {}
                    Write::Put(bytes) => {
                        entry.insert(bytes);
                    }
                    Write::Delete => {
                        entry.remove();
                    }
                }
                result
            }
            Entry::Vacant(entry) => {
                let (write, result) = f(None);
                if let Write::Put(bytes) = write {
                    entry.insert(bytes);
                }
                result
            }
        }
    }
}

impl Backend for MemoryBackend {
    async fn get(&self, key: &Key) -> StorageResult<Option<Vec<u8>>> {
        self.check_fault(FaultOp::Get, key)?;
        Ok(self.entries.get(key).map(|v| v.value().clone()))
    }

    async fn put(&self, key: &Key, value: Vec<u8>) -> StorageResult<()> {
        self.check_fault(FaultOp::Put, key)?;
        self.entries.insert(key.clone(), value);
        Ok(())
    }

    async fn delete(&self, key: &Key) -> StorageResult<bool> {
        self.check_fault(FaultOp::Delete, key)?;
        Ok(self.entries.remove(key).is_some())
    }

    async fn update<F, R>(&self, key: &Key, mut f: F) -> StorageResult<R>
    where
        F: FnMut(Option<&[u8]>) -> (Write, R) + Send,
        R: Send,
    {
        self.check_fault(FaultOp::Update, key)?;
        Ok(self.apply_update(key, &mut f))
    }
}
