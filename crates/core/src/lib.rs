//! Core types for the FlowMuse entity store
//!
//! This crate defines the vocabulary shared by every layer:
//! - [`Error`]: the store's error taxonomy (NotFound, Conflict, Validation, Storage)
//! - [`StorageError`]: failures reported by a storage backend
//! - [`Key`]: backend key shapes (index, seed marker, per-entity record)
//! - [`Entity`] and [`Page`]: the values handed back to callers

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod types;

pub use error::{Error, Result, StorageError, StorageResult};
pub use types::{validate_id, CollectionName, Entity, Key, Page, Slot, MAX_ID_LEN};
