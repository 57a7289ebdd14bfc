//! Chat Threads Collection Tests
//!
//! Thread creation, message append and listing.

use crate::*;

#[tokio::test]
async fn test_create_returns_summary() {
    let db = empty_db();
    let summary = db.chats.create(" Standup ").await.unwrap();
    assert_eq!(summary.title, "Standup");
    assert!(db.chats.list_messages(&summary.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_append_two_messages() {
    let db = empty_db();
    let chat = db.chats.create("General").await.unwrap();

    let first = db.chats.append_message(&chat.id, "u1", "hi").await.unwrap();
    let second = db.chats.append_message(&chat.id, "u2", "hello").await.unwrap();

    let messages = db.chats.list_messages(&chat.id).await.unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0], first);
    assert_eq!(messages[1], second);
    assert_ne!(first.id, second.id);
    assert!(messages[0].ts <= messages[1].ts);
    assert_eq!(second.chat_id, chat.id);
    assert_eq!(second.user_id, "u2");
}

#[tokio::test]
async fn test_append_trims_and_rejects_blank() {
    let db = empty_db();
    let chat = db.chats.create("General").await.unwrap();

    let msg = db.chats.append_message(&chat.id, "u1", "  yo \n").await.unwrap();
    assert_eq!(msg.text, "yo");

    let err = db.chats.append_message(&chat.id, "u1", " \t ").await.unwrap_err();
    assert!(err.is_validation());
    assert_eq!(db.chats.list_messages(&chat.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_append_to_missing_thread() {
    let db = empty_db();
    let err = db.chats.append_message("nope", "u1", "hi").await.unwrap_err();
    assert!(err.is_not_found());
    assert!(db.chats.list_messages("nope").await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_timestamps_never_go_backwards() {
    let db = empty_db();
    let future = chrono::Utc::now().timestamp_millis() + 60_000;
    let thread = flowmuse::ChatThread {
        title: "clock skew".into(),
        messages: vec![flowmuse::ChatMessage {
            id: "m0".into(),
            chat_id: "skewed".into(),
            user_id: "u1".into(),
            text: "from the future".into(),
            ts: future,
        }],
    };
    db.chats.insert(Some("skewed"), thread).await.unwrap();

    let msg = db.chats.append_message("skewed", "u2", "now").await.unwrap();
    assert!(msg.ts >= future);
}

#[tokio::test]
async fn test_messages_cannot_be_rewritten() {
    let db = empty_db();
    let chat = db.chats.create("General").await.unwrap();
    db.chats.append_message(&chat.id, "u1", "hi").await.unwrap();

    let err = db
        .chats
        .update(&chat.id, &serde_json::json!({"messages": []}))
        .await
        .unwrap_err();
    assert!(err.is_validation());

    let renamed = db
        .chats
        .update(&chat.id, &serde_json::json!({"title": "Random"}))
        .await
        .unwrap();
    assert_eq!(renamed.state.title, "Random");
    assert_eq!(renamed.state.messages.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_appends_all_kept() {
    let db = empty_db();
    let chat = db.chats.create("Busy").await.unwrap();

    let mut handles = Vec::new();
    for n in 0..8 {
        let db = db.clone();
        let id = chat.id.clone();
        handles.push(tokio::spawn(async move {
            for i in 0..5 {
                db.chats
                    .append_message(&id, "u1", &format!("{}-{}", n, i))
                    .await
                    .unwrap();
            }
        }));
    }
    for h in handles {
        h.await.unwrap();
    }

    let messages = db.chats.list_messages(&chat.id).await.unwrap();
    assert_eq!(messages.len(), 40);
    assert!(messages.windows(2).all(|w| w[0].ts <= w[1].ts));
}

#[tokio::test]
async fn test_seeded_thread() {
    let db = default_db();
    let page = db.chats.list(None, None).await.unwrap();
    assert_eq!(page.ids(), vec!["c1"]);

    let messages = db.chats.list_messages("c1").await.unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].id, "m1");
    assert_eq!(messages[0].text, "Hello");
}
