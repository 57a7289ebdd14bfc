//! Backend Contract Tests
//!
//! Behavior every `Backend` must show, checked against the in-memory backend
//! both bare and wrapped in the retrying backend.

use flowmuse_core::{CollectionName, Key};
use flowmuse_storage::{Backend, MemoryBackend, RetryPolicy, RetryingBackend, Write};
use std::sync::Arc;

fn key(collection: &str, id: &str) -> Key {
    Key::record(&CollectionName::new(collection).unwrap(), id)
}

async fn check_contract<B: Backend>(backend: &B) {
    let a = key("c", "a");
    let b = key("c", "b");

    // get/put/delete
    assert_eq!(backend.get(&a).await.unwrap(), None);
    backend.put(&a, vec![1]).await.unwrap();
    backend.put(&a, vec![2]).await.unwrap();
    assert_eq!(backend.get(&a).await.unwrap(), Some(vec![2]));
    assert_eq!(backend.get(&b).await.unwrap(), None);

    // update sees the current value and its result is returned
    let seen = backend
        .update(&a, |cur| (Write::Put(vec![3]), cur.map(|v| v.to_vec())))
        .await
        .unwrap();
    assert_eq!(seen, Some(vec![2]));
    assert_eq!(backend.get(&a).await.unwrap(), Some(vec![3]));

    // update can delete
    backend.update(&a, |_| (Write::Delete, ())).await.unwrap();
    assert_eq!(backend.get(&a).await.unwrap(), None);
    assert!(!backend.delete(&a).await.unwrap());

    // keys of different collections never alias
    backend.put(&key("x", "id"), vec![9]).await.unwrap();
    assert_eq!(backend.get(&key("y", "id")).await.unwrap(), None);
}

#[tokio::test]
async fn test_memory_backend_contract() {
    check_contract(&MemoryBackend::new()).await;
}

#[tokio::test]
async fn test_retrying_backend_contract() {
    check_contract(&RetryingBackend::new(MemoryBackend::new(), RetryPolicy::default())).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_disjoint_keys_update_concurrently() {
    let backend = Arc::new(RetryingBackend::new(MemoryBackend::new(), RetryPolicy::none()));

    let mut handles = Vec::new();
    for t in 0..8 {
        let backend = Arc::clone(&backend);
        handles.push(tokio::spawn(async move {
            let k = key("counters", &format!("k{}", t));
            for _ in 0..50 {
                backend
                    .update(&k, |cur| {
                        let n = cur.map_or(0, |b| b[0]);
                        (Write::Put(vec![n + 1]), ())
                    })
                    .await
                    .unwrap();
            }
        }));
    }
    for h in handles {
        h.await.unwrap();
    }

    for t in 0..8 {
        let k = key("counters", &format!("k{}", t));
        assert_eq!(backend.get(&k).await.unwrap(), Some(vec![50]));
    }
    assert_eq!(backend.inner().len(), 8);
}
