//! Seeding Tests
//!
//! Listing seeds each collection exactly once; explicit seeding is
//! idempotent.

use crate::*;
use flowmuse::{Fault, FaultOp};

#[tokio::test]
async fn test_list_seeds_boards() {
    let db = default_db();
    let page = db.boards.list(None, None).await.unwrap();
    assert_eq!(page.ids(), vec!["board-1", "board-2", "board-3"]);

    let first = &page.items[0].state;
    assert_eq!(first.title, "My First Flow");
    assert_eq!(first.nodes.len(), 3);
    assert_eq!(first.edges.len(), 2);
    assert!(first.created_at < first.updated_at);
}

#[tokio::test]
async fn test_seed_twice_is_stable() {
    let db = empty_db();
    assert!(db.boards.seed().await.unwrap().seeded);
    let ids = db.boards.store().ids().await.unwrap();

    assert!(db.boards.seed().await.unwrap().seeded);
    assert_eq!(db.boards.store().ids().await.unwrap(), ids);
    assert_eq!(ids.len(), 3);
}

#[tokio::test]
async fn test_deleted_seed_not_restored() {
    let db = default_db();
    db.users.list(None, None).await.unwrap();
    db.users.delete("u1").await.unwrap();

    let page = db.users.list(None, None).await.unwrap();
    assert_eq!(page.ids(), vec!["u2"]);
}

#[tokio::test]
async fn test_seed_pagination_completeness() {
    let db = default_db();
    let mut created = vec![
        "board-1".to_string(),
        "board-2".to_string(),
        "board-3".to_string(),
    ];
    db.boards.seed().await.unwrap();
    for title in ["four", "five"] {
        created.push(db.boards.create(title).await.unwrap().id);
    }

    let seen = walk_boards(&db, 2).await;
    assert_eq!(seen, created);
}

#[tokio::test]
async fn test_seed_all() {
    let db = empty_db();
    db.seed_all().await.unwrap();
    assert_eq!(db.users.store().ids().await.unwrap().len(), 2);
    assert_eq!(db.chats.store().ids().await.unwrap().len(), 1);
    assert_eq!(db.boards.store().ids().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_seed_survives_transient_faults() {
    let db = default_db();
    db.backend()
        .inner()
        .inject(Fault::transient(FaultOp::Put).times(2));

    let page = db.boards.list(None, None).await.unwrap();
    assert_eq!(page.items.len(), 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_first_listings_seed_once() {
    let db = default_db();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let db = db.clone();
        handles.push(tokio::spawn(async move {
            let users = db.users.list(None, None).await.unwrap();
            let boards = db.boards.list(None, None).await.unwrap();
            (users.items.len(), boards.items.len())
        }));
    }
    for h in handles {
        assert_eq!(h.await.unwrap(), (2, 3));
    }

    let ids = db.users.store().ids().await.unwrap();
    assert_eq!(ids, vec!["u1", "u2"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_explicit_seeds_see_data() {
    let db = empty_db();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let db = db.clone();
        handles.push(tokio::spawn(async move {
            assert!(db.chats.seed().await.unwrap().seeded);
            db.chats.store().audit().await.unwrap().retrievable()
        }));
    }
    for h in handles {
        assert_eq!(h.await.unwrap(), 1);
    }
}
