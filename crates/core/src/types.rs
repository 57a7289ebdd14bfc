//! Core types for the entity store
//!
//! This module defines the fundamental types used throughout the system:
//! - [`CollectionName`]: validated name of a resource collection
//! - [`Key`]: backend key, one of three slots per collection
//! - [`Entity`]: an id plus its structured state
//! - [`Page`]: one page of a cursor-paginated listing

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Maximum length of an entity id in bytes
pub const MAX_ID_LEN: usize = 256;

/// Name of a collection
///
/// Fixed for the store's lifetime. Names are non-empty and contain neither
/// whitespace nor `:` (the key separator).
///
/// # Examples
///
/// ```
/// use flowmuse_core::CollectionName;
///
/// let name = CollectionName::new("boards").unwrap();
/// assert_eq!(name.as_str(), "boards");
/// assert!(CollectionName::new("bad name").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CollectionName(String);

impl CollectionName {
    /// Create a collection name, rejecting empty names and separators.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::validation("collection name must not be empty"));
        }
        if name.chars().any(|c| c == ':' || c.is_whitespace()) {
            return Err(Error::validation(format!(
                "collection name {:?} contains ':' or whitespace",
                name
            )));
        }
        Ok(CollectionName(name))
    }

    /// Borrow the name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CollectionName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which record of a collection a key addresses
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Slot {
    /// The collection's ordered id sequence
    Index,
    /// The "already seeded" flag
    SeedMarker,
    /// One entity's record
    Record(String),
}

/// Backend key
///
/// Layout per collection:
/// - one index record, `boards:index`
/// - one seed marker, `boards:seed`
/// - one record per entity, `boards:record:<id>`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key {
    /// Owning collection
    pub collection: CollectionName,
    /// Slot within the collection
    pub slot: Slot,
}

impl Key {
    /// Key of a collection's index record
    pub fn index(collection: &CollectionName) -> Self {
        Key {
            collection: collection.clone(),
            slot: Slot::Index,
        }
    }

    /// Key of a collection's seed marker
    pub fn seed_marker(collection: &CollectionName) -> Self {
        Key {
            collection: collection.clone(),
            slot: Slot::SeedMarker,
        }
    }

    /// Key of one entity record
    pub fn record(collection: &CollectionName, id: impl Into<String>) -> Self {
        Key {
            collection: collection.clone(),
            slot: Slot::Record(id.into()),
        }
    }

    /// Entity id, if this is a record key
    pub fn record_id(&self) -> Option<&str> {
        match &self.slot {
            Slot::Record(id) => Some(id),
            _ => None,
        }
    }
}

impl std::fmt::Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.slot {
            Slot::Index => write!(f, "{}:index", self.collection),
            Slot::SeedMarker => write!(f, "{}:seed", self.collection),
            Slot::Record(id) => write!(f, "{}:record:{}", self.collection, id),
        }
    }
}

/// Validate a caller-supplied entity id
///
/// Ids must be non-empty, at most [`MAX_ID_LEN`] bytes, free of control
/// characters and of leading/trailing whitespace.
pub fn validate_id(id: &str) -> Result<()> {
    if id.is_empty() {
        return Err(Error::validation("id must not be empty"));
    }
    if id.len() > MAX_ID_LEN {
        return Err(Error::validation(format!(
            "id exceeds {} bytes",
            MAX_ID_LEN
        )));
    }
    if id.trim() != id {
        return Err(Error::validation(format!(
            "id {:?} has surrounding whitespace",
            id
        )));
    }
    if id.chars().any(char::is_control) {
        return Err(Error::validation("id contains control characters"));
    }
    Ok(())
}

/// An id plus its structured state
///
/// Serializes flat: the id sits beside the state's own fields, so a user
/// renders as `{"id": "u1", "name": "User A"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity<T> {
    /// Unique within its collection, immutable after creation
    pub id: String,
    /// Collection-specific state
    #[serde(flatten)]
    pub state: T,
}

impl<T> Entity<T> {
    /// Pair an id with a state
    pub fn new(id: impl Into<String>, state: T) -> Self {
        Entity {
            id: id.into(),
            state,
        }
    }
}

/// One page of a listing
///
/// `next` is the cursor to pass to the following call, or `None` once the
/// walk reached the end of the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    /// Entities on this page, in index order
    pub items: Vec<Entity<T>>,
    /// Resume cursor (the last returned id)
    pub next: Option<String>,
}

impl<T> Page<T> {
    /// An empty final page
    pub fn empty() -> Self {
        Page {
            items: Vec::new(),
            next: None,
        }
    }

    /// Ids on this page, in order
    pub fn ids(&self) -> Vec<&str> {
        self.items.iter().map(|e| e.id.as_str()).collect()
    }
}
