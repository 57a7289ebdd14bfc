//! Storage layer for the FlowMuse entity store
//!
//! This crate defines the durable key-value primitive the store is built on:
//! - [`Backend`]: async get/put/delete plus per-key read-modify-write
//! - [`MemoryBackend`]: DashMap-sharded in-process backend with fault injection
//! - [`RetryingBackend`]: bounded retry with exponential backoff for transient failures

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod memory;
pub mod retry;

pub use backend::{Backend, Write};
pub use memory::{Fault, FaultOp, MemoryBackend};
pub use retry::{RetryPolicy, RetryingBackend};
