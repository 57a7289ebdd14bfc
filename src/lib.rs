//! # FlowMuse
//!
//! Indexed entity store behind the FlowMuse flowchart editor.
//!
//! Every resource collection (users, chat threads, flow boards) is one
//! generic store that turns a flat key-value backend into a paginated,
//! seedable, atomically mutable collection of typed records.
//!
//! ## Quick Start
//!
//! ```ignore
//! use flowmuse::prelude::*;
//!
//! let db = FlowMuse::ephemeral()?;
//!
//! // Boards
//! let board = db.boards.create("Roadmap").await?;
//! db.boards.update(&board.id, &json!({"title": "Roadmap 2"})).await?;
//!
//! // Paginated listing (seeds the collection on first use)
//! let page = db.boards.list(None, Some(2)).await?;
//!
//! // Chat threads
//! let chat = db.chats.create("Standup").await?;
//! db.chats.append_message(&chat.id, "u1", "morning").await?;
//! ```
//!
//! ## Layers
//!
//! - `flowmuse-core`: errors, keys, `Entity`, `Page`
//! - `flowmuse-storage`: the `Backend` trait, in-memory backend, retries
//! - `flowmuse-engine`: codec, index registry, descriptors, `EntityStore`
//! - this crate: the database handle and the three collections

#![warn(missing_docs)]

mod collections;
mod contract;
mod database;
mod types;

pub mod prelude;

// Re-export main entry points
pub use database::{DefaultBackend, FlowMuse, FlowMuseBuilder};

// Re-export collections
pub use collections::boards::{Board, Boards, Edge, Node, NodeData, NodeKind, Position};
pub use collections::chats::{ChatMessage, ChatSummary, ChatThread, Chats};
pub use collections::users::{User, Users};
pub use collections::Collection;

// Re-export response shapes
pub use contract::{ApiResponse, DeleteManyResponse, DeleteResponse, SeedResponse};

// Re-export types
pub use types::*;
