//! Entity Store
//!
//! Generic collection of typed records over a [`Backend`]. One index record
//! per collection defines listing order; one record per entity holds its
//! state.
//!
//! ## Write ordering
//!
//! `create` claims a pending index entry first, writes the record, then
//! commits the entry. `delete` removes the record first, then the index entry.
//! A crash or backend failure between the steps leaves one of two garbage
//! states:
//!
//! - **Dangling entry**: indexed id without a record. Reads treat it as absent
//!   and reclaim it on the spot: `get`, `exists`, `list` and `mutate` remove
//!   it from the index, and `create` of the same id takes it over. Entries
//!   whose claim is younger than [`StoreOptions::claim_lease`] belong to a
//!   create still in flight and are left alone.
//! - **Orphan record**: record without an index entry. Invisible to `get` and
//!   `exists`; overwritten by a later `create` of the same id or removed by
//!   `delete`.
//!
//! Neither state ever produces an entity that is listed but unreadable or
//! readable but unlisted.
//!
//! ## Atomicity
//!
//! `mutate` runs decode, transform, validation and encode inside one
//! [`Backend::update`] call, so concurrent mutations of the same id serialize
//! on the backend and never overwrite each other's result.

use crate::codec::{self, Codec};
use crate::descriptor::CollectionDescriptor;
use crate::index::{IndexClaim, IndexRegistry};
use flowmuse_core::{validate_id, CollectionName, Entity, Error, Key, Page, Result};
use flowmuse_storage::{Backend, Write};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Bounds every collection state type satisfies
pub trait CollectionState: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {}

impl<T> CollectionState for T where T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {}

/// Tunables of an [`EntityStore`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreOptions {
    /// Age after which an unfinished seed claim may be taken over
    pub seed_lease: Duration,
    /// Age after which the index entry of an unfinished create counts as
    /// dangling
    pub claim_lease: Duration,
}

impl Default for StoreOptions {
    fn default() -> Self {
        StoreOptions {
            seed_lease: Duration::from_secs(30),
            claim_lease: Duration::from_secs(10),
        }
    }
}

pub(crate) fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

pub(crate) fn lease_ms(lease: Duration) -> i64 {
    i64::try_from(lease.as_millis()).unwrap_or(i64::MAX)
}

/// Result of an index consistency scan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexAudit {
    /// Ids in the index
    pub indexed: usize,
    /// Indexed ids whose record is missing
    pub dangling: Vec<String>,
}

impl IndexAudit {
    /// Number of ids `get` would resolve
    pub fn retrievable(&self) -> usize {
        self.indexed - self.dangling.len()
    }

    /// Check if every indexed id has a record
    pub fn is_consistent(&self) -> bool {
        self.dangling.is_empty()
    }
}

/// Generic indexed entity store for one collection
///
/// Cheap to clone: the backend and the descriptor are shared.
///
/// # Example
///
/// ```ignore
/// let store = EntityStore::new(backend, descriptor);
/// let user = store.create(Some("u9"), User { name: "Ada".into() }).await?;
/// let page = store.list(None, 10).await?;
/// ```
pub struct EntityStore<B, T> {
    pub(crate) backend: Arc<B>,
    pub(crate) descriptor: Arc<CollectionDescriptor<T>>,
    pub(crate) index: IndexRegistry,
    pub(crate) options: StoreOptions,
}

impl<B, T> Clone for EntityStore<B, T> {
    fn clone(&self) -> Self {
        EntityStore {
            backend: Arc::clone(&self.backend),
            descriptor: Arc::clone(&self.descriptor),
            index: self.index.clone(),
            options: self.options,
        }
    }
}

impl<B, T> std::fmt::Debug for EntityStore<B, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityStore")
            .field("collection", self.descriptor.name())
            .field("options", &self.options)
            .finish()
    }
}

impl<B: Backend, T: CollectionState> EntityStore<B, T> {
    /// Store for the collection `descriptor` configures
    pub fn new(backend: Arc<B>, descriptor: CollectionDescriptor<T>) -> Self {
        let index = IndexRegistry::new(descriptor.name(), descriptor.record_codec());
        EntityStore {
            backend,
            descriptor: Arc::new(descriptor),
            index,
            options: StoreOptions::default(),
        }
    }

    /// Replace the store options
    pub fn with_options(mut self, options: StoreOptions) -> Self {
        self.options = options;
        self
    }

    /// Collection name
    pub fn collection(&self) -> &CollectionName {
        self.descriptor.name()
    }

    /// Collection configuration
    pub fn descriptor(&self) -> &CollectionDescriptor<T> {
        &self.descriptor
    }

    /// Underlying backend
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Active options
    pub fn options(&self) -> StoreOptions {
        self.options
    }

    pub(crate) fn codec(&self) -> Codec {
        self.descriptor.record_codec()
    }

    pub(crate) fn record_key(&self, id: &str) -> Key {
        Key::record(self.collection(), id)
    }

    fn not_found(&self, id: &str) -> Error {
        Error::not_found(self.collection().as_str(), id)
    }

    async fn read_record(&self, id: &str) -> Result<Option<T>> {
        match self.backend.get(&self.record_key(id)).await? {
            Some(bytes) => Ok(Some(codec::decode_record(self.codec(), id, &bytes)?)),
            None => Ok(None),
        }
    }

    // =========================================================================
    // Create / Read
    // =========================================================================

    /// Create an entity
    ///
    /// # Arguments
    ///
    /// * `proposed_id` - Id to use; a fresh UUID is generated when `None`
    /// * `state` - Initial state, checked by the descriptor's validator
    ///
    /// # Errors
    ///
    /// - `Validation` if the id or the state is rejected
    /// - `Conflict` if the id belongs to a stored entity or to a create still
    ///   in flight; a dangling index entry does not count
    /// - `Storage` if the backend fails; a failed record write rolls the index
    ///   entry back on a best-effort basis
    pub async fn create(&self, proposed_id: Option<&str>, state: T) -> Result<Entity<T>> {
        let id = match proposed_id {
            Some(id) => {
                validate_id(id)?;
                id.to_string()
            }
            None => uuid::Uuid::new_v4().to_string(),
        };
        self.descriptor.validate(&id, &state)?;
        let bytes = codec::encode_record(self.codec(), &id, &state)?;

        if !self.claim_entry(&id).await? {
            return Err(Error::conflict(self.collection().as_str(), id));
        }

        if let Err(e) = self.backend.put(&self.record_key(&id), bytes).await {
            warn!(
                collection = %self.collection(),
                id = %id,
                error = %e,
                "record write failed after index claim, rolling back"
            );
            if let Err(undo) = self.index.remove(&*self.backend, &id).await {
                warn!(
                    collection = %self.collection(),
                    id = %id,
                    error = %undo,
                    "rollback failed, index entry left dangling"
                );
            }
            return Err(e.into());
        }
        self.index.commit(&*self.backend, &id).await?;

        debug!(collection = %self.collection(), id = %id, "created entity");
        Ok(Entity::new(id, state))
    }

    /// Claim the index entry of `id`, taking over a dangling one
    async fn claim_entry(&self, id: &str) -> Result<bool> {
        let lease = lease_ms(self.options.claim_lease);
        match self.index.claim(&*self.backend, id, now_ms(), lease).await? {
            IndexClaim::Claimed => return Ok(true),
            IndexClaim::InFlight => return Ok(false),
            IndexClaim::Indexed => {}
        }
        if !self.repair_dangling(id).await? {
            return Ok(false);
        }
        let claim = self.index.claim(&*self.backend, id, now_ms(), lease).await?;
        Ok(claim == IndexClaim::Claimed)
    }

    /// Fetch an entity
    ///
    /// An orphan record (no index entry) is reported as `NotFound`.
    pub async fn get(&self, id: &str) -> Result<Entity<T>> {
        let Some(state) = self.read_record(id).await? else {
            if self.index.contains(&*self.backend, id).await? {
                self.repair_quietly(id).await;
            }
            return Err(self.not_found(id));
        };
        if !self.index.contains(&*self.backend, id).await? {
            debug!(collection = %self.collection(), id = %id, "ignoring unindexed record");
            return Err(self.not_found(id));
        }
        Ok(Entity::new(id, state))
    }

    /// Check if `id` resolves to an entity
    ///
    /// Never fails: backend errors are logged and reported as `false`.
    pub async fn exists(&self, id: &str) -> bool {
        match self.try_exists(id).await {
            Ok(found) => found,
            Err(e) => {
                warn!(
                    collection = %self.collection(),
                    id = %id,
                    error = %e,
                    "existence check failed"
                );
                false
            }
        }
    }

    async fn try_exists(&self, id: &str) -> Result<bool> {
        let has_record = self.backend.get(&self.record_key(id)).await?.is_some();
        let indexed = self.index.contains(&*self.backend, id).await?;
        if indexed && !has_record {
            self.repair_quietly(id).await;
        }
        Ok(indexed && has_record)
    }

    /// List one page in index order
    ///
    /// # Arguments
    ///
    /// * `cursor` - Last id of the previous page; `None` or `""` starts at the head
    /// * `limit` - Page size, clamped to at least 1
    ///
    /// # Returns
    ///
    /// Up to `limit` entities strictly after `cursor`. Indexed ids whose
    /// record is missing are skipped and reclaimed. `next` is the last
    /// returned id while the index continues past it, otherwise `None`.
    ///
    /// A cursor whose id was deleted since it was handed out resumes after
    /// the id that preceded it.
    ///
    /// # Errors
    ///
    /// `Validation` if `cursor` was never handed out by this collection.
    pub async fn list(&self, cursor: Option<&str>, limit: usize) -> Result<Page<T>> {
        let limit = limit.max(1);
        let index = self.index.snapshot(&*self.backend).await?;
        let remaining = index.window(cursor)?;

        let mut items = Vec::new();
        let mut consumed = 0;
        for id in remaining {
            if items.len() == limit {
                break;
            }
            consumed += 1;
            match self.read_record(id).await? {
                Some(state) => items.push(Entity::new(id.clone(), state)),
                None => {
                    debug!(collection = %self.collection(), id = %id, "skipping dangling index entry");
                    self.repair_quietly(id).await;
                }
            }
        }

        let next = if consumed < remaining.len() {
            items.last().map(|e| e.id.clone())
        } else {
            None
        };
        Ok(Page { items, next })
    }

    /// Snapshot of the index, in listing order
    pub async fn ids(&self) -> Result<Vec<String>> {
        self.index.load(&*self.backend).await
    }

    // =========================================================================
    // Mutate
    // =========================================================================

    /// Atomically transform an entity's state
    ///
    /// The record is read, transformed, passed through the descriptor's
    /// mutation hook, validator and transition check, and written back inside
    /// one backend read-modify-write. Nothing is written if any step fails.
    ///
    /// # Purity Requirement
    ///
    /// `transform` may run more than once if a transient backend failure is
    /// retried. It must depend only on the state it receives.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the entity does not exist
    /// - whatever `transform` returns
    /// - `Validation` if the new state or the transition is rejected
    pub async fn mutate<F>(&self, id: &str, mut transform: F) -> Result<Entity<T>>
    where
        F: FnMut(T) -> Result<T> + Send,
    {
        if !self.index.contains(&*self.backend, id).await? {
            return Err(self.not_found(id));
        }

        let state = self
            .backend
            .update(&self.record_key(id), |current| {
                let Some(bytes) = current else {
                    return (Write::Keep, None);
                };
                match self.apply_transform(id, bytes, &mut transform) {
                    Ok((state, encoded)) => (Write::Put(encoded), Some(Ok(state))),
                    Err(e) => (Write::Keep, Some(Err(e))),
                }
            })
            .await?;
        let Some(state) = state else {
            self.repair_quietly(id).await;
            return Err(self.not_found(id));
        };
        let state = state?;

        debug!(collection = %self.collection(), id = %id, "mutated entity");
        Ok(Entity::new(id, state))
    }

    fn apply_transform<F>(&self, id: &str, bytes: &[u8], transform: &mut F) -> Result<(T, Vec<u8>)>
    where
        F: FnMut(T) -> Result<T>,
    {
        let before: T = codec::decode_record(self.codec(), id, bytes)?;
        let mut after = transform(before.clone())?;
        self.descriptor.touch(&mut after);
        self.descriptor.validate(id, &after)?;
        self.descriptor.check_transition(&before, &after)?;
        let encoded = codec::encode_record(self.codec(), id, &after)?;
        Ok((after, encoded))
    }

    /// Replace-with-merge update
    ///
    /// Top-level fields of `patch` override the entity's current fields
    /// (compared by their serialized names). `id` and the descriptor's
    /// immutable fields are ignored even when present.
    ///
    /// # Errors
    ///
    /// - `Validation` if `patch` is not an object or the merged value no
    ///   longer decodes as a state
    /// - everything [`mutate`](Self::mutate) reports
    pub async fn update_merge(&self, id: &str, patch: &serde_json::Value) -> Result<Entity<T>> {
        let fields = patch
            .as_object()
            .ok_or_else(|| Error::validation("update body must be a JSON object"))?;
        self.mutate(id, |state| self.merge_fields(state, fields)).await
    }

    fn merge_fields(&self, state: T, fields: &serde_json::Map<String, serde_json::Value>) -> Result<T> {
        let mut merged = serde_json::to_value(&state)?;
        let Some(target) = merged.as_object_mut() else {
            return Err(Error::Internal(format!(
                "{} state does not serialize to an object",
                self.collection()
            )));
        };
        for (field, value) in fields {
            if self.descriptor.is_immutable(field) {
                continue;
            }
            target.insert(field.clone(), value.clone());
        }
        serde_json::from_value(merged).map_err(|e| Error::validation(format!("invalid update: {}", e)))
    }

    // =========================================================================
    // Delete
    // =========================================================================

    /// Delete an entity
    ///
    /// Idempotent. Removes the record, then the index entry.
    ///
    /// # Returns
    ///
    /// `true` if either the record or the index entry existed.
    pub async fn delete(&self, id: &str) -> Result<bool> {
        let had_record = self.backend.delete(&self.record_key(id)).await?;
        let had_entry = self.index.remove(&*self.backend, id).await?;
        if had_record != had_entry {
            debug!(
                collection = %self.collection(),
                id = %id,
                had_record,
                had_entry,
                "reclaimed partially written entity"
            );
        } else if had_record {
            debug!(collection = %self.collection(), id = %id, "deleted entity");
        }
        Ok(had_record || had_entry)
    }

    /// Delete every id in `ids`, in order
    ///
    /// Missing ids are not errors. A backend failure stops the batch: ids
    /// before the failing one are deleted, the rest are untouched.
    ///
    /// # Returns
    ///
    /// Number of ids that were present and removed.
    pub async fn delete_many<S>(&self, ids: &[S]) -> Result<usize>
    where
        S: AsRef<str> + Sync,
    {
        let mut deleted = 0;
        for id in ids {
            if self.delete(id.as_ref()).await? {
                deleted += 1;
            }
        }
        Ok(deleted)
    }

    // =========================================================================
    // Maintenance
    // =========================================================================

    /// Remove the index entry of `id` if its record is missing
    ///
    /// Entries claimed by a create still in flight are left alone. If the
    /// record shows up right after the removal, the entry is put back.
    ///
    /// # Returns
    ///
    /// `true` if a dangling entry was removed.
    async fn repair_dangling(&self, id: &str) -> Result<bool> {
        let key = self.record_key(id);
        if self.backend.get(&key).await?.is_some() {
            return Ok(false);
        }
        let lease = lease_ms(self.options.claim_lease);
        if !self.index.reclaim(&*self.backend, id, now_ms(), lease).await? {
            return Ok(false);
        }
        if self.backend.get(&key).await?.is_some() {
            // a create committed its record between the check and the removal
            self.index.commit(&*self.backend, id).await?;
            return Ok(false);
        }
        info!(collection = %self.collection(), id = %id, "reclaimed dangling index entry");
        Ok(true)
    }

    /// [`repair_dangling`](Self::repair_dangling) on a read path, where
    /// repair failures must not fail the read
    async fn repair_quietly(&self, id: &str) {
        if let Err(e) = self.repair_dangling(id).await {
            warn!(
                collection = %self.collection(),
                id = %id,
                error = %e,
                "dangling index entry repair failed"
            );
        }
    }

    /// Scan the index for dangling entries
    pub async fn audit(&self) -> Result<IndexAudit> {
        let ids = self.ids().await?;
        let mut dangling = Vec::new();
        for id in &ids {
            if self.backend.get(&self.record_key(id)).await?.is_none() {
                dangling.push(id.clone());
            }
        }
        Ok(IndexAudit {
            indexed: ids.len(),
            dangling,
        })
    }
}
