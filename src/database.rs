//! Main database entry point for FlowMuse.
//!
//! This module provides the `FlowMuse` struct, which owns the backend and
//! exposes one facade per resource collection.

use crate::collections::boards::{self, Boards};
use crate::collections::chats::{self, Chats};
use crate::collections::users::{self, Users};
use crate::collections::{Collection, Settings};
use flowmuse_core::Result;
use flowmuse_engine::{CollectionDescriptor, CollectionState, EntityStore, StoreOptions};
use flowmuse_storage::{Backend, MemoryBackend, RetryPolicy, RetryingBackend};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Backend used when none is configured
pub type DefaultBackend = RetryingBackend<MemoryBackend>;

/// The FlowMuse entity database.
///
/// One handle per process. Cloning is cheap: every collection shares the
/// same backend.
///
/// # Example
///
/// ```ignore
/// use flowmuse::prelude::*;
///
/// let db = FlowMuse::ephemeral()?;
///
/// let board = db.boards.create("Roadmap").await?;
/// let page = db.boards.list(None, Some(10)).await?;
///
/// let chat = db.chats.create("Standup").await?;
/// db.chats.append_message(&chat.id, "u1", "morning").await?;
/// ```
pub struct FlowMuse<B = DefaultBackend> {
    backend: Arc<B>,

    /// User operations
    pub users: Users<B>,

    /// Chat thread operations
    pub chats: Chats<B>,

    /// Flow board operations
    pub boards: Boards<B>,
}

impl FlowMuse<DefaultBackend> {
    /// Create an in-memory database with default settings.
    ///
    /// Data lives as long as the handle. Transient backend failures are
    /// retried with the default [`RetryPolicy`].
    pub fn ephemeral() -> Result<Self> {
        Self::builder().open()
    }

    /// Create a builder for database configuration.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let db = FlowMuse::builder()
    ///     .default_page_size(20)
    ///     .auto_seed(false)
    ///     .open()?;
    /// ```
    pub fn builder() -> FlowMuseBuilder {
        FlowMuseBuilder::new()
    }
}

impl<B: Backend> FlowMuse<B> {
    /// The shared backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Seed every collection.
    pub async fn seed_all(&self) -> Result<()> {
        self.users.seed().await?;
        self.chats.seed().await?;
        self.boards.seed().await?;
        Ok(())
    }
}

impl<B> Clone for FlowMuse<B> {
    fn clone(&self) -> Self {
        FlowMuse {
            backend: Arc::clone(&self.backend),
            users: self.users.clone(),
            chats: self.chats.clone(),
            boards: self.boards.clone(),
        }
    }
}

/// Builder for database configuration.
///
/// # Example
///
/// ```ignore
/// // Flaky backend: more patience
/// let db = FlowMuse::builder()
///     .retry(RetryPolicy::default().with_max_attempts(5))
///     .open()?;
///
/// // Custom backend, no retries
/// let db = FlowMuse::builder()
///     .retry(RetryPolicy::none())
///     .backend(MemoryBackend::new())
///     .open()?;
/// ```
#[derive(Debug)]
pub struct FlowMuseBuilder<B = MemoryBackend> {
    backend: B,
    retry: RetryPolicy,
    default_page_size: usize,
    auto_seed: bool,
    seed_lease: Duration,
}

impl FlowMuseBuilder<MemoryBackend> {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        FlowMuseBuilder {
            backend: MemoryBackend::new(),
            retry: RetryPolicy::default(),
            default_page_size: 50,
            auto_seed: true,
            seed_lease: StoreOptions::default().seed_lease,
        }
    }
}

impl Default for FlowMuseBuilder<MemoryBackend> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: Backend> FlowMuseBuilder<B> {
    /// Store entities in `backend` instead of a fresh [`MemoryBackend`].
    pub fn backend<C: Backend>(self, backend: C) -> FlowMuseBuilder<C> {
        FlowMuseBuilder {
            backend,
            retry: self.retry,
            default_page_size: self.default_page_size,
            auto_seed: self.auto_seed,
            seed_lease: self.seed_lease,
        }
    }

    /// Retry policy for transient backend failures.
    ///
    /// Default: 3 attempts, 10 ms base delay doubling up to 200 ms.
    pub fn retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    /// Page size used when a listing passes no limit (default 50, minimum 1).
    pub fn default_page_size(mut self, size: usize) -> Self {
        self.default_page_size = size.max(1);
        self
    }

    /// Seed a collection before listing it (default on).
    pub fn auto_seed(mut self, enabled: bool) -> Self {
        self.auto_seed = enabled;
        self
    }

    /// Age after which an unfinished seed claim is taken over (default 30 s).
    pub fn seed_lease(mut self, lease: Duration) -> Self {
        self.seed_lease = lease;
        self
    }

    /// Open the database.
    pub fn open(self) -> Result<FlowMuse<RetryingBackend<B>>> {
        let settings = Settings {
            default_page_size: self.default_page_size,
            auto_seed: self.auto_seed,
        };
        let options = StoreOptions {
            seed_lease: self.seed_lease,
            ..StoreOptions::default()
        };
        let backend = Arc::new(RetryingBackend::new(self.backend, self.retry));

        debug!(
            retry_attempts = self.retry.max_attempts,
            page_size = settings.default_page_size,
            auto_seed = settings.auto_seed,
            "opening database"
        );

        Ok(FlowMuse {
            users: collection(&backend, users::descriptor()?, settings, options),
            chats: collection(&backend, chats::descriptor()?, settings, options),
            boards: collection(&backend, boards::descriptor()?, settings, options),
            backend,
        })
    }
}

fn collection<B: Backend, T: CollectionState>(
    backend: &Arc<B>,
    descriptor: CollectionDescriptor<T>,
    settings: Settings,
    options: StoreOptions,
) -> Collection<B, T> {
    let store = EntityStore::new(Arc::clone(backend), descriptor).with_options(options);
    Collection::new(store, settings)
}
