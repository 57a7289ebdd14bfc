//! Collections Comprehensive Test Suite
//!
//! Exercises the three resource collections through the `FlowMuse` handle,
//! the way the request layer drives them.
//!
//! ## Key Verification Points
//!
//! 1. Listing seeds first and paginates by last-returned id
//! 2. Creation trims input and rejects blanks
//! 3. Merge updates never touch `id` or `createdAt`
//! 4. Chat messages are append-only with non-decreasing timestamps
//! 5. Response shapes match the wire contract
//!
//! ## Running Tests
//!
//! ```bash
//! # Run the whole suite
//! cargo test --test collections_comprehensive
//!
//! # Run chat tests only
//! cargo test --test collections_comprehensive chats::
//! ```

use flowmuse::{FlowMuse, MemoryBackend, RetryPolicy};
use std::time::Duration;

// Test modules
pub mod boards;
pub mod chats;
pub mod contract;
pub mod seeding;
pub mod users;

// =============================================================================
// SHARED TEST UTILITIES
// =============================================================================

/// Route logs to the test harness (visible with `--nocapture`)
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Retry policy that keeps fault tests fast
pub fn fast_retry() -> RetryPolicy {
    RetryPolicy::default().with_base_delay(Duration::from_millis(1))
}

/// Database whose collections start empty
pub fn empty_db() -> FlowMuse {
    init_tracing();
    FlowMuse::builder()
        .auto_seed(false)
        .retry(fast_retry())
        .open()
        .expect("open database")
}

/// Database with default settings (listing seeds)
pub fn default_db() -> FlowMuse {
    init_tracing();
    FlowMuse::builder()
        .retry(fast_retry())
        .backend(MemoryBackend::new())
        .open()
        .expect("open database")
}

/// Walk every page of a listing
pub async fn walk_boards(db: &FlowMuse, limit: usize) -> Vec<String> {
    let mut seen = Vec::new();
    let mut cursor: Option<String> = None;
    loop {
        let page = db.boards.list(cursor.as_deref(), Some(limit)).await.unwrap();
        seen.extend(page.items.into_iter().map(|e| e.id));
        match page.next {
            Some(next) => cursor = Some(next),
            None => return seen,
        }
    }
}
