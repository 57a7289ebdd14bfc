//! Convenient imports for FlowMuse.
//!
//! ```ignore
//! use flowmuse::prelude::*;
//!
//! let db = FlowMuse::ephemeral()?;
//! let users = db.users.list(None, None).await?;
//! ```

// Main entry point
pub use crate::database::{FlowMuse, FlowMuseBuilder};

// Error handling
pub use crate::types::{Error, Result};

// Collections
pub use crate::collections::boards::{Board, Edge, Node, NodeData, NodeKind, Position};
pub use crate::collections::chats::{ChatMessage, ChatSummary, ChatThread};
pub use crate::collections::users::User;

// Core types
pub use crate::types::{Entity, Page, RetryPolicy};

// Re-export serde_json for convenience
pub use serde_json::json;
