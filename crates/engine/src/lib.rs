//! Generic indexed entity store
//!
//! Turns a flat key-value [`Backend`](flowmuse_storage::Backend) into a
//! paginated, seedable, atomically mutable collection of typed records.
//!
//! - [`Codec`]: record serialization (MessagePack or JSON)
//! - [`IndexRegistry`]: the ordered id sequence of a collection
//! - [`CollectionDescriptor`]: per-collection name, validation and seed data
//! - [`EntityStore`]: create, get, list, mutate, delete and seed operations

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod codec;
pub mod descriptor;
pub mod index;
pub mod seed;
pub mod store;

pub use codec::{Codec, StoredRecord};
pub use descriptor::CollectionDescriptor;
pub use index::{IndexClaim, IndexRegistry, IndexSnapshot};
pub use seed::SeedOutcome;
pub use store::{CollectionState, EntityStore, IndexAudit, StoreOptions};
