//! Index Registry
//!
//! The ordered id sequence of one collection, stored as a single record
//! under the collection's index key. Insertion order is listing order.
//!
//! Every change goes through [`Backend::update`], so concurrent appends and
//! removals on the same collection serialize on the index key and never lose
//! each other's entries.
//!
//! Besides the ids the record carries two pieces of bookkeeping:
//!
//! - **Pending claims**: ids appended by a `create` whose record write has not
//!   been committed yet, with the claim time. A pending entry younger than the
//!   claim lease is never reclaimed as dangling.
//! - **Departures**: the most recent removals, each with the id that preceded
//!   it. A cursor naming a removed id resumes after that predecessor.

use crate::codec::Codec;
use flowmuse_core::{CollectionName, Error, Key, Result};
use flowmuse_storage::{Backend, Write};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

/// Removals remembered for cursor resumption
const DEPARTURE_LIMIT: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Departure {
    id: String,
    /// Id that preceded the removed one, `None` at the head
    after: Option<String>,
}

/// Decoded index record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSnapshot {
    ids: Vec<String>,
    #[serde(default)]
    pending: BTreeMap<String, i64>,
    #[serde(default)]
    departures: VecDeque<Departure>,
}

impl IndexSnapshot {
    /// Ids in listing order
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// Check if `id` is indexed
    pub fn contains(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    /// Check if `id` carries a claim younger than `lease_ms`
    pub fn is_settling(&self, id: &str, now_ms: i64, lease_ms: i64) -> bool {
        self.pending
            .get(id)
            .map_or(false, |at| now_ms.saturating_sub(*at) < lease_ms)
    }

    /// Ids strictly after `cursor`, or the whole sequence for no cursor
    ///
    /// An empty cursor string is the head. A cursor naming a removed id
    /// resumes after the id that preceded it at removal time, following
    /// earlier removals back as needed, so no position is visited twice.
    ///
    /// # Errors
    ///
    /// `Validation` if the cursor was never indexed or its removal is too old
    /// to be remembered.
    pub fn window(&self, cursor: Option<&str>) -> Result<&[String]> {
        let cursor = match cursor {
            None | Some("") => return Ok(&self.ids),
            Some(cursor) => cursor,
        };

        let mut anchor = cursor;
        for _ in 0..=self.departures.len() {
            if let Some(pos) = self.position(anchor) {
                return Ok(&self.ids[pos + 1..]);
            }
            match self.departures.iter().rev().find(|d| d.id == anchor) {
                Some(Departure { after: Some(prev), .. }) => anchor = prev.as_str(),
                Some(Departure { after: None, .. }) => return Ok(&self.ids),
                None => break,
            }
        }
        Err(Error::validation(format!("unknown cursor {:?}", cursor)))
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.ids.iter().position(|x| x == id)
    }

    fn remove_entry(&mut self, id: &str) -> bool {
        self.pending.remove(id);
        let Some(pos) = self.position(id) else {
            return false;
        };
        let removed = self.ids.remove(pos);
        let after = pos.checked_sub(1).map(|p| self.ids[p].clone());
        self.departures.push_back(Departure { id: removed, after });
        while self.departures.len() > DEPARTURE_LIMIT {
            self.departures.pop_front();
        }
        true
    }
}

/// What [`IndexRegistry::claim`] found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexClaim {
    /// The id was appended as a pending entry
    Claimed,
    /// The id was already indexed and not pending
    Indexed,
    /// The id carries another caller's live claim
    InFlight,
}

/// Handle on one collection's index record
#[derive(Debug, Clone)]
pub struct IndexRegistry {
    key: Key,
    codec: Codec,
}

impl IndexRegistry {
    /// Registry for `collection`, encoded with `codec`
    pub fn new(collection: &CollectionName, codec: Codec) -> Self {
        IndexRegistry {
            key: Key::index(collection),
            codec,
        }
    }

    /// Backend key of the index record
    pub fn key(&self) -> &Key {
        &self.key
    }

    /// Current index record
    pub async fn snapshot<B: Backend>(&self, backend: &B) -> Result<IndexSnapshot> {
        let bytes = backend.get(&self.key).await?;
        self.decode(bytes.as_deref())
    }

    /// Snapshot of the id sequence
    pub async fn load<B: Backend>(&self, backend: &B) -> Result<Vec<String>> {
        Ok(self.snapshot(backend).await?.ids)
    }

    /// Check if `id` is indexed
    pub async fn contains<B: Backend>(&self, backend: &B, id: &str) -> Result<bool> {
        Ok(self.snapshot(backend).await?.contains(id))
    }

    /// Append `id` at the tail unless already present
    ///
    /// # Returns
    ///
    /// `true` if the id was appended, `false` if it was already indexed.
    pub async fn append<B: Backend>(&self, backend: &B, id: &str) -> Result<bool> {
        self.modify(backend, |index| {
            if index.contains(id) {
                return (false, false);
            }
            index.ids.push(id.to_string());
            (true, true)
        })
        .await
    }

    /// Append `id` as a pending entry claimed at `now_ms`
    ///
    /// A pending entry younger than `lease_ms` belongs to its claimer until
    /// [`commit`](Self::commit) clears the mark.
    pub async fn claim<B: Backend>(
        &self,
        backend: &B,
        id: &str,
        now_ms: i64,
        lease_ms: i64,
    ) -> Result<IndexClaim> {
        self.modify(backend, |index| {
            if index.is_settling(id, now_ms, lease_ms) {
                return (false, IndexClaim::InFlight);
            }
            if index.contains(id) {
                return (false, IndexClaim::Indexed);
            }
            index.ids.push(id.to_string());
            index.pending.insert(id.to_string(), now_ms);
            (true, IndexClaim::Claimed)
        })
        .await
    }

    /// Settle `id`: clear its pending mark and re-append it if it was removed
    /// in the meantime
    pub async fn commit<B: Backend>(&self, backend: &B, id: &str) -> Result<()> {
        self.modify(backend, |index| {
            let cleared = index.pending.remove(id).is_some();
            if index.contains(id) {
                return (cleared, ());
            }
            index.ids.push(id.to_string());
            (true, ())
        })
        .await
    }

    /// Remove `id` from the sequence
    ///
    /// # Returns
    ///
    /// `true` if the id was present.
    pub async fn remove<B: Backend>(&self, backend: &B, id: &str) -> Result<bool> {
        self.modify(backend, |index| {
            let removed = index.remove_entry(id);
            (removed, removed)
        })
        .await
    }

    /// Remove `id` unless it carries a claim younger than `lease_ms`
    ///
    /// # Returns
    ///
    /// `true` if the id was removed.
    pub async fn reclaim<B: Backend>(
        &self,
        backend: &B,
        id: &str,
        now_ms: i64,
        lease_ms: i64,
    ) -> Result<bool> {
        self.modify(backend, |index| {
            if index.is_settling(id, now_ms, lease_ms) {
                return (false, false);
            }
            let removed = index.remove_entry(id);
            (removed, removed)
        })
        .await
    }

    /// Read-modify-write of the index record
    ///
    /// `f` reports whether it changed the snapshot; unchanged snapshots are
    /// not written back.
    async fn modify<B, R, F>(&self, backend: &B, mut f: F) -> Result<R>
    where
        B: Backend,
        R: Send,
        F: FnMut(&mut IndexSnapshot) -> (bool, R) + Send,
    {
        backend
            .update(&self.key, |current| {
                let mut index = match self.decode(current) {
                    Ok(index) => index,
                    Err(e) => return (Write::Keep, Err(e)),
                };
                let (changed, outcome) = f(&mut index);
                if !changed {
                    return (Write::Keep, Ok(outcome));
                }
                match self.codec.encode(&index) {
                    Ok(bytes) => (Write::Put(bytes), Ok(outcome)),
                    Err(e) => (Write::Keep, Err(e)),
                }
            })
            .await?
    }

    fn decode(&self, bytes: Option<&[u8]>) -> Result<IndexSnapshot> {
        match bytes {
            None => Ok(IndexSnapshot::default()),
            Some(bytes) => self.codec.decode(bytes),
        }
    }
}
