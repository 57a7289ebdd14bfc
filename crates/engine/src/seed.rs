//! Idempotent seeding
//!
//! Each collection has one seed marker record with two states:
//!
//! ```text
//!   (absent) --claim--> Seeding { claimed_at_ms } --finish--> Seeded { seeded_at_ms }
//!                              |
//!                              +-- failure: claimer deletes its own claim, a later call retries
//!                              +-- older than the lease: next caller takes over
//! ```
//!
//! The claim is a per-key read-modify-write on the marker, so among
//! concurrent first callers exactly one wins. The others poll the marker
//! with backoff and return once it reads `Seeded`, or take over once the
//! claim outlives the lease. Seed writes skip ids that are already stored,
//! which keeps a takeover after a crashed seeder from producing duplicates.

use crate::codec;
use crate::index::IndexClaim;
use crate::store::{lease_ms, now_ms, CollectionState, EntityStore};
use flowmuse_core::{validate_id, Error, Key, Result, StorageError};
use flowmuse_storage::{Backend, Write};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// First delay between polls of a claimed marker
const POLL_START: Duration = Duration::from_millis(5);

/// Longest delay between polls of a claimed marker
const POLL_CEILING: Duration = Duration::from_millis(100);

/// What [`EntityStore::ensure_seed`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedOutcome {
    /// This call wrote the seed data
    Seeded,
    /// Another call seeded the collection, earlier or while this one waited
    AlreadySeeded,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
enum SeedMarker {
    Seeding { claimed_at_ms: i64 },
    Seeded { seeded_at_ms: i64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Claim {
    Won,
    TookOver,
    Busy,
    Done,
}

impl<B: Backend, T: CollectionState> EntityStore<B, T> {
    /// Seed the collection once
    ///
    /// Writes the descriptor's seed entities and marks the collection seeded.
    /// Later calls are no-ops. Concurrent callers race on the seed marker;
    /// the losers wait until the winner marks the collection seeded, so on
    /// return the seed entities are always in place.
    ///
    /// # Errors
    ///
    /// - Backend and validation failures of the seed write. The claim is
    ///   released first so the next call starts over.
    /// - `Storage` if another caller's claim neither finishes nor expires
    ///   within the seed lease
    pub async fn ensure_seed(&self) -> Result<SeedOutcome> {
        let marker_key = Key::seed_marker(self.collection());
        let lease = self.options.seed_lease;
        let deadline = Instant::now().checked_add(lease.saturating_add(POLL_CEILING));
        let mut delay = POLL_START;

        let claimed_at = loop {
            let now = now_ms();
            match self.claim_seed(&marker_key, now, lease_ms(lease)).await? {
                Claim::Done => return Ok(SeedOutcome::AlreadySeeded),
                Claim::Won => break now,
                Claim::TookOver => {
                    warn!(collection = %self.collection(), "taking over expired seed claim");
                    break now;
                }
                Claim::Busy => {
                    if deadline.map_or(false, |d| Instant::now() >= d) {
                        return Err(Error::Storage(StorageError::Unavailable(format!(
                            "seeding of {} still in progress",
                            self.collection()
                        ))));
                    }
                    debug!(collection = %self.collection(), "waiting for concurrent seeding");
                    tokio::time::sleep(delay).await;
                    delay = delay.saturating_mul(2).min(POLL_CEILING);
                }
            }
        };

        let written = match self.write_seed().await {
            Ok(written) => written,
            Err(e) => {
                self.release_claim(&marker_key, claimed_at).await;
                return Err(e);
            }
        };

        let done = self.codec().encode(&SeedMarker::Seeded {
            seeded_at_ms: now_ms(),
        })?;
        self.backend.put(&marker_key, done).await?;

        info!(collection = %self.collection(), written, "seeded collection");
        Ok(SeedOutcome::Seeded)
    }

    /// Check if the seed marker reached its final state
    pub async fn is_seeded(&self) -> Result<bool> {
        let bytes = self
            .backend
            .get(&Key::seed_marker(self.collection()))
            .await?;
        match bytes {
            Some(bytes) => Ok(matches!(
                self.codec().decode::<SeedMarker>(&bytes)?,
                SeedMarker::Seeded { .. }
            )),
            None => Ok(false),
        }
    }

    async fn claim_seed(&self, marker_key: &Key, now: i64, lease_ms: i64) -> Result<Claim> {
        let codec = self.codec();
        self.backend
            .update(marker_key, |current| {
                let marker = match current.map(|b| codec.decode::<SeedMarker>(b)).transpose() {
                    Ok(marker) => marker,
                    Err(e) => return (Write::Keep, Err(e)),
                };
                let claim = match marker {
                    Some(SeedMarker::Seeded { .. }) => return (Write::Keep, Ok(Claim::Done)),
                    Some(SeedMarker::Seeding { claimed_at_ms })
                        if now.saturating_sub(claimed_at_ms) < lease_ms =>
                    {
                        return (Write::Keep, Ok(Claim::Busy))
                    }
                    Some(SeedMarker::Seeding { .. }) => Claim::TookOver,
                    None => Claim::Won,
                };
                match codec.encode(&SeedMarker::Seeding { claimed_at_ms: now }) {
                    Ok(bytes) => (Write::Put(bytes), Ok(claim)),
                    Err(e) => (Write::Keep, Err(e)),
                }
            })
            .await?
    }

    /// Delete the marker if it still holds the claim made at `claimed_at`
    async fn release_claim(&self, marker_key: &Key, claimed_at: i64) {
        let codec = self.codec();
        let released = self
            .backend
            .update(marker_key, |current| {
                let ours = matches!(
                    current.map(|b| codec.decode::<SeedMarker>(b)),
                    Some(Ok(SeedMarker::Seeding { claimed_at_ms })) if claimed_at_ms == claimed_at
                );
                if ours {
                    (Write::Delete, true)
                } else {
                    (Write::Keep, false)
                }
            })
            .await;
        match released {
            Ok(true) => {}
            Ok(false) => debug!(
                collection = %self.collection(),
                "seed claim was taken over, leaving the marker"
            ),
            Err(e) => warn!(
                collection = %self.collection(),
                error = %e,
                "failed to release seed claim"
            ),
        }
    }

    async fn write_seed(&self) -> Result<usize> {
        let lease = lease_ms(self.options.claim_lease);
        let mut written = 0;
        for (id, state) in self.descriptor.seed_entities() {
            validate_id(&id)?;
            self.descriptor.validate(&id, &state)?;
            let bytes = codec::encode_record(self.codec(), &id, &state)?;
            let key = self.record_key(&id);

            let claim = self.index.claim(&*self.backend, &id, now_ms(), lease).await?;
            // an indexed id keeps its record; one left by an interrupted
            // attempt gets it filled in
            if claim == IndexClaim::Claimed || self.backend.get(&key).await?.is_none() {
                self.backend.put(&key, bytes).await?;
                written += 1;
            }
            self.index.commit(&*self.backend, &id).await?;
        }
        Ok(written)
    }
}
