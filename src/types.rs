//! Public types re-exported from the layer crates.

// Errors
pub use flowmuse_core::{Error, Result, StorageError};

// Entities and paging
pub use flowmuse_core::{Entity, Page};

// Backends
pub use flowmuse_storage::{Backend, Fault, FaultOp, MemoryBackend, RetryPolicy, RetryingBackend};

// Engine
pub use flowmuse_engine::{Codec, CollectionDescriptor, EntityStore, IndexAudit, SeedOutcome, StoreOptions};
