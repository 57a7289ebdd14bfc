//! Users Collection Tests

use crate::*;

#[tokio::test]
async fn test_create_trims_name() {
    let db = empty_db();
    let user = db.users.create("  Ada  ").await.unwrap();
    assert_eq!(user.state.name, "Ada");
    assert_eq!(db.users.get(&user.id).await.unwrap(), user);
}

#[tokio::test]
async fn test_blank_name_rejected() {
    let db = empty_db();
    let err = db.users.create("   ").await.unwrap_err();
    assert!(err.is_validation());
    assert_eq!(err.http_status(), 400);
    assert!(db.users.store().ids().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_list_seeds_default_users() {
    let db = default_db();
    let page = db.users.list(None, None).await.unwrap();
    assert_eq!(page.ids(), vec!["u1", "u2"]);
    assert_eq!(page.items[0].state.name, "User A");
    assert_eq!(page.next, None);
}

#[tokio::test]
async fn test_insert_with_id_conflicts_once_taken() {
    let db = empty_db();
    db.users
        .insert(Some("u7"), flowmuse::User::new("Seven"))
        .await
        .unwrap();
    let err = db
        .users
        .insert(Some("u7"), flowmuse::User::new("Other"))
        .await
        .unwrap_err();
    assert!(err.is_conflict());
    assert_eq!(err.http_status(), 409);
}

#[tokio::test]
async fn test_update_name() {
    let db = empty_db();
    let user = db.users.create("Ada").await.unwrap();
    let updated = db
        .users
        .update(&user.id, &serde_json::json!({"name": "Grace"}))
        .await
        .unwrap();
    assert_eq!(updated.state.name, "Grace");

    let blank = db
        .users
        .update(&user.id, &serde_json::json!({"name": ""}))
        .await;
    assert!(blank.unwrap_err().is_validation());
}

#[tokio::test]
async fn test_delete_many() {
    let db = empty_db();
    let a = db.users.create("A").await.unwrap();
    let b = db.users.create("B").await.unwrap();

    let ids = vec![a.id.clone(), "nobody".to_string(), b.id.clone()];
    let resp = db.users.delete_many(&ids).await.unwrap();
    assert_eq!(resp.deleted_count, 2);
    assert_eq!(resp.ids, ids);
    assert!(!db.users.exists(&a.id).await);

    let empty: Vec<String> = Vec::new();
    assert!(db.users.delete_many(&empty).await.unwrap_err().is_validation());
}
