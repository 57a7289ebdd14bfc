//! Flow Boards Collection Tests
//!
//! Creation, graph validation, merge updates and listing.

use crate::*;
use flowmuse::{Board, NodeKind};
use serde_json::json;

#[tokio::test]
async fn test_create_empty_board() {
    let db = empty_db();
    let board = db.boards.create("  Roadmap ").await.unwrap();
    assert_eq!(board.state.title, "Roadmap");
    assert!(board.state.nodes.is_empty());
    assert!(board.state.edges.is_empty());
    assert_eq!(board.state.created_at, board.state.updated_at);
    assert!(db.boards.exists(&board.id).await);
}

#[tokio::test]
async fn test_blank_title_rejected() {
    let db = empty_db();
    assert!(db.boards.create("").await.unwrap_err().is_validation());
}

#[tokio::test]
async fn test_update_preserves_id_and_created_at() {
    let db = empty_db();
    let board = db.boards.create("Roadmap").await.unwrap();

    let patch = json!({
        "id": "hijack",
        "title": "Roadmap v2",
        "createdAt": "2001-01-01T00:00:00Z",
    });
    let updated = db.boards.update(&board.id, &patch).await.unwrap();

    assert_eq!(updated.id, board.id);
    assert_eq!(updated.state.title, "Roadmap v2");
    assert_eq!(updated.state.created_at, board.state.created_at);
    assert!(updated.state.updated_at >= board.state.updated_at);
    assert!(!db.boards.exists("hijack").await);
}

#[tokio::test]
async fn test_update_replaces_graph() {
    let db = empty_db();
    let board = db.boards.create("Graph").await.unwrap();

    let patch = json!({
        "nodes": [
            {"id": "a", "type": "input", "position": {"x": 0, "y": 0}, "data": {"title": "Start"}},
            {"id": "b", "type": "output", "position": {"x": 200, "y": 0}, "data": {"title": "End", "color": "#f00"}}
        ],
        "edges": [{"id": "a-b", "source": "a", "target": "b", "animated": true}]
    });
    let updated = db.boards.update(&board.id, &patch).await.unwrap();
    assert_eq!(updated.state.nodes.len(), 2);
    assert_eq!(updated.state.nodes[0].kind, NodeKind::Input);
    assert_eq!(updated.state.nodes[1].data.color.as_deref(), Some("#f00"));
    assert!(updated.state.edges[0].animated);

    let fetched = db.boards.get(&board.id).await.unwrap();
    assert_eq!(fetched, updated);
}

#[tokio::test]
async fn test_update_rejects_dangling_edge() {
    let db = empty_db();
    let board = db.boards.create("Graph").await.unwrap();

    let patch = json!({
        "edges": [{"id": "x", "source": "ghost", "target": "ghost"}]
    });
    let err = db.boards.update(&board.id, &patch).await.unwrap_err();
    assert!(err.is_validation());
    assert!(db.boards.get(&board.id).await.unwrap().state.edges.is_empty());
}

#[tokio::test]
async fn test_update_rejects_unknown_node_kind() {
    let db = empty_db();
    let board = db.boards.create("Graph").await.unwrap();

    let patch = json!({
        "nodes": [{"id": "a", "type": "hexagon", "position": {"x": 0, "y": 0}, "data": {"title": "?"}}]
    });
    assert!(db.boards.update(&board.id, &patch).await.unwrap_err().is_validation());
}

#[tokio::test]
async fn test_update_missing_board() {
    let db = empty_db();
    let err = db.boards.update("nope", &json!({"title": "x"})).await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.http_status(), 404);
}

#[tokio::test]
async fn test_board_listing_scenario() {
    let db = empty_db();
    let b1 = db.boards.insert(Some("B1"), Board::new("A")).await.unwrap();
    let b2 = db.boards.insert(Some("B2"), Board::new("B")).await.unwrap();

    let page = db.boards.list(None, Some(1)).await.unwrap();
    assert_eq!(page.ids(), vec![b1.id.as_str()]);
    assert_eq!(page.next.as_deref(), Some("B1"));

    let page = db.boards.list(Some("B1"), Some(1)).await.unwrap();
    assert_eq!(page.ids(), vec![b2.id.as_str()]);
    assert_eq!(page.next, None);

    let resp = db.boards.delete("B1").await.unwrap();
    assert!(resp.deleted);

    let page = db.boards.list(None, Some(10)).await.unwrap();
    assert_eq!(page.ids(), vec!["B2"]);
    assert_eq!(page.next, None);
}

#[tokio::test]
async fn test_default_page_size_applies() {
    init_tracing();
    let db = FlowMuse::builder()
        .auto_seed(false)
        .default_page_size(2)
        .open()
        .unwrap();
    for title in ["a", "b", "c"] {
        db.boards.create(title).await.unwrap();
    }

    let page = db.boards.list(None, None).await.unwrap();
    assert_eq!(page.items.len(), 2);
    assert!(page.next.is_some());
}

#[tokio::test]
async fn test_walk_visits_every_board_once() {
    let db = empty_db();
    let mut created = Vec::new();
    for i in 0..7 {
        created.push(db.boards.create(&format!("board {}", i)).await.unwrap().id);
    }
    assert_eq!(walk_boards(&db, 3).await, created);
}
