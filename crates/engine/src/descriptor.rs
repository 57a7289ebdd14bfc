//! Collection Descriptor
//!
//! Per-collection configuration injected into the generic
//! [`EntityStore`](crate::EntityStore): the name, the record codec, state
//! validation, an optional transition check between consecutive states, the
//! seed generator, the fields a merge update must never overwrite, and a hook
//! run on every mutation.
//!
//! ```ignore
//! let users = CollectionDescriptor::<User>::new("users")?
//!     .validator(|_, user| {
//!         if user.name.trim().is_empty() {
//!             return Err("name must not be empty".into());
//!         }
//!         Ok(())
//!     })
//!     .seed(|| vec![("u1".into(), User { name: "User A".into() })]);
//! ```

use crate::codec::Codec;
use flowmuse_core::{CollectionName, Error, Result};
use std::fmt;
use std::sync::Arc;

/// Checks one state; `Err` carries the reason
pub type Validator<T> = Arc<dyn Fn(&str, &T) -> std::result::Result<(), String> + Send + Sync>;
/// Checks a `before -> after` mutation
pub type TransitionCheck<T> = Arc<dyn Fn(&T, &T) -> std::result::Result<(), String> + Send + Sync>;
/// Produces the default entities of a collection
pub type SeedFn<T> = Arc<dyn Fn() -> Vec<(String, T)> + Send + Sync>;
/// Adjusts a state after every transform (for example a modification time)
pub type MutateHook<T> = Arc<dyn Fn(&mut T) + Send + Sync>;

/// Configuration of one collection
pub struct CollectionDescriptor<T> {
    name: CollectionName,
    codec: Codec,
    validator: Option<Validator<T>>,
    transition: Option<TransitionCheck<T>>,
    seed: Option<SeedFn<T>>,
    immutable_fields: Vec<String>,
    on_mutate: Option<MutateHook<T>>,
}

impl<T> CollectionDescriptor<T> {
    /// Descriptor with no validation, no seed data and the default codec
    pub fn new(name: &str) -> Result<Self> {
        Ok(CollectionDescriptor {
            name: CollectionName::new(name)?,
            codec: Codec::default(),
            validator: None,
            transition: None,
            seed: None,
            immutable_fields: Vec::new(),
            on_mutate: None,
        })
    }

    /// Use `codec` for records, index and seed marker
    pub fn codec(mut self, codec: Codec) -> Self {
        self.codec = codec;
        self
    }

    /// Reject states for which `f` returns `Err` at create and mutate
    pub fn validator<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, &T) -> std::result::Result<(), String> + Send + Sync + 'static,
    {
        self.validator = Some(Arc::new(f));
        self
    }

    /// Reject mutations for which `f(before, after)` returns `Err`
    pub fn transition<F>(mut self, f: F) -> Self
    where
        F: Fn(&T, &T) -> std::result::Result<(), String> + Send + Sync + 'static,
    {
        self.transition = Some(Arc::new(f));
        self
    }

    /// Default entities written by `ensure_seed`
    pub fn seed<F>(mut self, f: F) -> Self
    where
        F: Fn() -> Vec<(String, T)> + Send + Sync + 'static,
    {
        self.seed = Some(Arc::new(f));
        self
    }

    /// Wire field names a merge update leaves untouched (`id` always is)
    pub fn immutable_fields(mut self, fields: &[&str]) -> Self {
        self.immutable_fields = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    /// Run `f` on the transformed state of every mutation, before validation
    pub fn on_mutate<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut T) + Send + Sync + 'static,
    {
        self.on_mutate = Some(Arc::new(f));
        self
    }

    /// Collection name
    pub fn name(&self) -> &CollectionName {
        &self.name
    }

    /// Record codec
    pub fn record_codec(&self) -> Codec {
        self.codec
    }

    /// Check if a merge update must skip `field`
    pub fn is_immutable(&self, field: &str) -> bool {
        field == "id" || self.immutable_fields.iter().any(|f| f == field)
    }

    /// Seed entities, in index order
    pub fn seed_entities(&self) -> Vec<(String, T)> {
        self.seed.as_ref().map(|f| f()).unwrap_or_default()
    }

    /// Validate the state of entity `id`
    pub fn validate(&self, id: &str, state: &T) -> Result<()> {
        match &self.validator {
            Some(f) => f(id, state).map_err(|reason| self.rejected(reason)),
            None => Ok(()),
        }
    }

    /// Validate a `before -> after` mutation
    pub fn check_transition(&self, before: &T, after: &T) -> Result<()> {
        match &self.transition {
            Some(f) => f(before, after).map_err(|reason| self.rejected(reason)),
            None => Ok(()),
        }
    }

    /// Apply the mutation hook
    pub fn touch(&self, state: &mut T) {
        if let Some(f) = &self.on_mutate {
            f(state);
        }
    }

    fn rejected(&self, reason: String) -> Error {
        Error::validation(format!("{}: {}", self.name, reason))
    }
}

impl<T> Clone for CollectionDescriptor<T> {
    fn clone(&self) -> Self {
        CollectionDescriptor {
            name: self.name.clone(),
            codec: self.codec,
            validator: self.validator.clone(),
            transition: self.transition.clone(),
            seed: self.seed.clone(),
            immutable_fields: self.immutable_fields.clone(),
            on_mutate: self.on_mutate.clone(),
        }
    }
}

impl<T> fmt::Debug for CollectionDescriptor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionDescriptor")
            .field("name", &self.name)
            .field("codec", &self.codec)
            .field("immutable_fields", &self.immutable_fields)
            .field("has_validator", &self.validator.is_some())
            .field("has_seed", &self.seed.is_some())
            .finish()
    }
}
