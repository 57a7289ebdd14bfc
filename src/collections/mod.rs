//! Resource collections
//!
//! Every collection is the same generic [`Collection`] facade over an
//! [`EntityStore`]; the modules here only contribute the state type, its
//! descriptor, and a few collection-specific operations:
//!
//! - [`users`]: `User { name }`
//! - [`chats`]: chat threads with an append-only message list
//! - [`boards`]: flow boards holding a node/edge graph

pub mod boards;
pub mod chats;
pub mod users;

use crate::contract::{DeleteManyResponse, DeleteResponse, SeedResponse};
use flowmuse_core::{Entity, Error, Page, Result};
use flowmuse_engine::{CollectionState, EntityStore};
use flowmuse_storage::Backend;

/// Facade settings shared by every collection of one database
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Settings {
    pub(crate) default_page_size: usize,
    pub(crate) auto_seed: bool,
}

/// One resource collection
///
/// Exposes the endpoint contract: paginated listing, lookup, creation,
/// merge updates, deletes and seeding.
pub struct Collection<B, T> {
    store: EntityStore<B, T>,
    settings: Settings,
}

impl<B, T> Clone for Collection<B, T> {
    fn clone(&self) -> Self {
        Collection {
            store: self.store.clone(),
            settings: self.settings,
        }
    }
}

impl<B, T> std::fmt::Debug for Collection<B, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collection")
            .field("store", &self.store)
            .field("settings", &self.settings)
            .finish()
    }
}

impl<B: Backend, T: CollectionState> Collection<B, T> {
    pub(crate) fn new(store: EntityStore<B, T>, settings: Settings) -> Self {
        Collection { store, settings }
    }

    /// The underlying entity store
    pub fn store(&self) -> &EntityStore<B, T> {
        &self.store
    }

    /// List one page
    ///
    /// Seeds the collection first unless auto-seeding is disabled. A missing
    /// `limit` uses the configured default page size.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let first = db.boards.list(None, Some(2)).await?;
    /// let second = db.boards.list(first.next.as_deref(), Some(2)).await?;
    /// ```
    pub async fn list(&self, cursor: Option<&str>, limit: Option<usize>) -> Result<Page<T>> {
        if self.settings.auto_seed {
            self.store.ensure_seed().await?;
        }
        let limit = limit.unwrap_or(self.settings.default_page_size);
        self.store.list(cursor, limit).await
    }

    /// Fetch one entity
    pub async fn get(&self, id: &str) -> Result<Entity<T>> {
        self.store.get(id).await
    }

    /// Check if an entity exists
    pub async fn exists(&self, id: &str) -> bool {
        self.store.exists(id).await
    }

    /// Store a fully formed state under `proposed_id` (or a fresh id)
    pub async fn insert(&self, proposed_id: Option<&str>, state: T) -> Result<Entity<T>> {
        self.store.create(proposed_id, state).await
    }

    /// Merge the top-level fields of `patch` into an entity
    pub async fn update(&self, id: &str, patch: &serde_json::Value) -> Result<Entity<T>> {
        self.store.update_merge(id, patch).await
    }

    /// Delete one entity
    pub async fn delete(&self, id: &str) -> Result<DeleteResponse> {
        let deleted = self.store.delete(id).await?;
        Ok(DeleteResponse {
            id: id.to_string(),
            deleted,
        })
    }

    /// Delete a batch of entities
    ///
    /// # Errors
    ///
    /// `Validation` if `ids` is empty.
    pub async fn delete_many(&self, ids: &[String]) -> Result<DeleteManyResponse> {
        if ids.is_empty() {
            return Err(Error::validation("ids required"));
        }
        let deleted_count = self.store.delete_many(ids).await?;
        Ok(DeleteManyResponse {
            deleted_count,
            ids: ids.to_vec(),
        })
    }

    /// Seed the collection if it never was
    pub async fn seed(&self) -> Result<SeedResponse> {
        self.store.ensure_seed().await?;
        Ok(SeedResponse::default())
    }
}

/// Trim `value`, rejecting it when nothing is left
pub(crate) fn required(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::validation(format!("{} required", field)));
    }
    Ok(trimmed.to_string())
}

pub(crate) fn non_blank(field: &str, value: &str) -> std::result::Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{} must not be empty", field));
    }
    Ok(())
}
