//! Chat threads collection
//!
//! A thread owns its ordered message list. Messages are only ever appended:
//! every mutation must keep the previous list as a prefix, and timestamps
//! never decrease along the list.

use super::{non_blank, required, Collection};
use chrono::Utc;
use flowmuse_core::{Error, Result};
use flowmuse_engine::CollectionDescriptor;
use flowmuse_storage::Backend;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

/// Collection name
pub const COLLECTION: &str = "chats";

/// One chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Unique within the thread
    pub id: String,
    /// Owning thread
    pub chat_id: String,
    /// Author
    pub user_id: String,
    /// Message body, trimmed
    pub text: String,
    /// Epoch milliseconds
    pub ts: i64,
}

/// A chat thread
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatThread {
    /// Thread title
    pub title: String,
    /// Messages in posting order
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

/// Id and title of a thread, as returned on creation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSummary {
    /// Thread id
    pub id: String,
    /// Thread title
    pub title: String,
}

/// Chat threads facade
pub type Chats<B> = Collection<B, ChatThread>;

fn validate_thread(id: &str, thread: &ChatThread) -> std::result::Result<(), String> {
    non_blank("title", &thread.title)?;

    let mut seen = HashSet::new();
    let mut last_ts = i64::MIN;
    for message in &thread.messages {
        if message.id.is_empty() {
            return Err("message id must not be empty".into());
        }
        if !seen.insert(message.id.as_str()) {
            return Err(format!("duplicate message id {:?}", message.id));
        }
        if message.chat_id != id {
            return Err(format!(
                "message {:?} belongs to chat {:?}",
                message.id, message.chat_id
            ));
        }
        non_blank("userId", &message.user_id)?;
        non_blank("text", &message.text)?;
        if message.ts < last_ts {
            return Err(format!("message {:?} is older than its predecessor", message.id));
        }
        last_ts = message.ts;
    }
    Ok(())
}

fn append_only(before: &ChatThread, after: &ChatThread) -> std::result::Result<(), String> {
    if !after.messages.starts_with(&before.messages) {
        return Err("messages are append-only".into());
    }
    Ok(())
}

/// Descriptor of the chat threads collection
pub fn descriptor() -> Result<CollectionDescriptor<ChatThread>> {
    Ok(CollectionDescriptor::<ChatThread>::new(COLLECTION)?
        .validator(validate_thread)
        .transition(append_only)
        .seed(|| {
            let welcome = ChatMessage {
                id: "m1".into(),
                chat_id: "c1".into(),
                user_id: "u1".into(),
                text: "Hello".into(),
                ts: Utc::now().timestamp_millis(),
            };
            vec![(
                "c1".to_string(),
                ChatThread {
                    title: "General".into(),
                    messages: vec![welcome],
                },
            )]
        }))
}

impl<B: Backend> Collection<B, ChatThread> {
    /// Create an empty thread with a generated id
    ///
    /// # Errors
    ///
    /// `Validation` if `title` is blank.
    pub async fn create(&self, title: &str) -> Result<ChatSummary> {
        let title = required("title", title)?;
        let created = self
            .insert(
                None,
                ChatThread {
                    title,
                    messages: Vec::new(),
                },
            )
            .await?;
        Ok(ChatSummary {
            id: created.id,
            title: created.state.title,
        })
    }

    /// Append a message to a thread
    ///
    /// The message gets a fresh id and a timestamp no earlier than the
    /// thread's last message, and is written through the atomic mutate path.
    ///
    /// # Errors
    ///
    /// - `Validation` if `text` or `author_id` is blank after trimming
    /// - `NotFound` if the thread does not exist
    pub async fn append_message(&self, thread_id: &str, author_id: &str, text: &str) -> Result<ChatMessage> {
        let text = required("text", text)?;
        let user_id = required("userId", author_id)?;
        let message_id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().timestamp_millis();

        let thread = self
            .store()
            .mutate(thread_id, |mut thread| {
                let ts = thread.messages.last().map_or(now, |last| last.ts.max(now));
                thread.messages.push(ChatMessage {
                    id: message_id.clone(),
                    chat_id: thread_id.to_string(),
                    user_id: user_id.clone(),
                    text: text.clone(),
                    ts,
                });
                Ok(thread)
            })
            .await?;

        debug!(chat = %thread_id, message = %message_id, "appended message");
        thread
            .state
            .messages
            .into_iter()
            .last()
            .ok_or_else(|| Error::Internal("appended message missing from thread".into()))
    }

    /// Messages of a thread, in posting order
    pub async fn list_messages(&self, thread_id: &str) -> Result<Vec<ChatMessage>> {
        Ok(self.get(thread_id).await?.state.messages)
    }
}
