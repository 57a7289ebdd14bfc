//! Response Contract Tests
//!
//! JSON shapes the request layer serializes.

use crate::*;
use flowmuse::{ApiResponse, Error};
use serde_json::json;

#[tokio::test]
async fn test_page_shape() {
    let db = default_db();
    let page = db.users.list(None, Some(1)).await.unwrap();
    assert_eq!(
        serde_json::to_value(&page).unwrap(),
        json!({"items": [{"id": "u1", "name": "User A"}], "next": "u1"})
    );
}

#[tokio::test]
async fn test_delete_shape() {
    let db = empty_db();
    let resp = db.boards.delete("missing").await.unwrap();
    assert_eq!(
        serde_json::to_value(&resp).unwrap(),
        json!({"id": "missing", "deleted": false})
    );
}

#[tokio::test]
async fn test_board_entity_shape() {
    let db = empty_db();
    let board = db.boards.create("Roadmap").await.unwrap();
    let value = serde_json::to_value(&board).unwrap();

    assert_eq!(value["id"], json!(board.id));
    assert_eq!(value["title"], "Roadmap");
    assert_eq!(value["nodes"], json!([]));
    assert_eq!(value["edges"], json!([]));
    assert!(value["createdAt"].is_string());
    assert!(value["updatedAt"].is_string());
}

#[tokio::test]
async fn test_message_shape() {
    let db = empty_db();
    let chat = db.chats.create("General").await.unwrap();
    let msg = db.chats.append_message(&chat.id, "u1", "hi").await.unwrap();
    let value = serde_json::to_value(&msg).unwrap();

    assert_eq!(value["chatId"], json!(chat.id));
    assert_eq!(value["userId"], "u1");
    assert_eq!(value["text"], "hi");
    assert!(value["ts"].is_i64());
}

#[tokio::test]
async fn test_envelope_wraps_results() {
    let db = empty_db();
    let ok = ApiResponse::from(db.users.create("Ada").await);
    assert!(ok.success);
    assert_eq!(ok.data.unwrap().state.name, "Ada");

    let failed = ApiResponse::from(db.users.get("ghost").await);
    assert!(!failed.success);
    assert_eq!(failed.code.as_deref(), Some("NotFound"));
}

#[tokio::test]
async fn test_unknown_cursor_is_client_error() {
    let db = empty_db();
    db.boards.create("a").await.unwrap();
    let err: Error = db.boards.list(Some("never-listed"), Some(5)).await.unwrap_err();
    assert_eq!(err.code(), "Validation");
    assert_eq!(err.http_status(), 400);
}

#[tokio::test]
async fn test_cursor_of_deleted_item_resumes() {
    let db = empty_db();
    let a = db.boards.create("a").await.unwrap().id;
    let b = db.boards.create("b").await.unwrap().id;
    let c = db.boards.create("c").await.unwrap().id;

    let first = db.boards.list(None, Some(1)).await.unwrap();
    assert_eq!(first.next.as_deref(), Some(a.as_str()));
    db.boards.delete(&a).await.unwrap();

    let rest = db.boards.list(first.next.as_deref(), Some(5)).await.unwrap();
    assert_eq!(rest.ids(), vec![b.as_str(), c.as_str()]);
    assert_eq!(rest.next, None);
}
