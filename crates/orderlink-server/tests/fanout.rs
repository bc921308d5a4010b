mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{FlakyStore, order};
use orderlink_core::WorkerPool;
use orderlink_server::{FanoutState, FanoutUpdater, RecordCache};
use orderlink_storage::{DynStore, Order, RecordStore};

struct Harness {
    store: Arc<FlakyStore<Order>>,
    cache: Arc<RecordCache<Order>>,
    updater: FanoutUpdater<Order>,
}

fn harness() -> Harness {
    let store = FlakyStore::<Order>::new();
    let dyn_store: DynStore<Order> = store.clone();
    let cache = RecordCache::new_shared(dyn_store.clone());
    let updater = FanoutUpdater::new(
        dyn_store,
        cache.clone(),
        Arc::new(WorkerPool::new("test-discovery", 1).unwrap()),
        Arc::new(WorkerPool::new("test-apply", 3).unwrap()),
    );
    Harness {
        store,
        cache,
        updater,
    }
}

async fn settle(handle: &orderlink_server::CompletionHandle) {
    tokio::time::timeout(Duration::from_secs(5), handle.settled())
        .await
        .expect("fan-out did not settle");
}

#[tokio::test]
async fn one_failure_does_not_affect_siblings() {
    let h = harness();
    let a = h.store.save(&order("alice", "alice")).await.unwrap();
    let b = h.store.save(&order("alice", "alice")).await.unwrap();
    let c = h.store.save(&order("alice", "alice")).await.unwrap();
    let other = h.store.save(&order("bob", "bob")).await.unwrap();
    h.store.fail_save_of(b.id);

    let handle = h
        .updater
        .apply_to_all("alice", |o: &mut Order| o.customer_name = "Alice".into());
    assert_eq!(handle.subject(), "alice");
    settle(&handle).await;
    assert_eq!(handle.state(), FanoutState::Settled);

    for id in [a.id, c.id] {
        let stored = h.store.get_by_id(&id).await.unwrap().unwrap();
        assert_eq!(stored.customer_name, "Alice");
        assert_eq!(h.cache.peek(&id), Some(stored));
    }
    assert_eq!(
        h.store.get_by_id(&b.id).await.unwrap().unwrap().customer_name,
        "alice"
    );
    assert!(h.cache.peek(&b.id).is_none());
    assert_eq!(
        h.store.get_by_id(&other.id).await.unwrap().unwrap().customer_name,
        "bob"
    );
}

#[tokio::test]
async fn panicking_mutation_is_isolated() {
    let h = harness();
    let keep = h.store.save(&order("alice", "alice")).await.unwrap();
    let boom = h.store.save(&order("alice", "alice")).await.unwrap();
    let boom_id = boom.id;

    let handle = h.updater.apply_to_all("alice", move |o: &mut Order| {
        if o.id == boom_id {
            panic!("mutation failed");
        }
        o.customer_name = "Alice".into();
    });
    settle(&handle).await;

    assert_eq!(
        h.store.get_by_id(&keep.id).await.unwrap().unwrap().customer_name,
        "Alice"
    );
    assert_eq!(
        h.store.get_by_id(&boom.id).await.unwrap().unwrap().customer_name,
        "alice"
    );
}

#[tokio::test]
async fn record_deleted_after_discovery_stays_deleted() {
    let h = harness();
    let kept = h.store.save(&order("alice", "alice")).await.unwrap();
    let gone = h.store.save(&order("alice", "alice")).await.unwrap();
    h.store.delete_after_scan(gone.id);

    let handle = h
        .updater
        .apply_to_all("alice", |o: &mut Order| o.customer_name = "Alice".into());
    settle(&handle).await;

    assert!(h.store.get_by_id(&gone.id).await.unwrap().is_none());
    assert!(h.cache.peek(&gone.id).is_none());
    assert_eq!(
        h.store.get_by_id(&kept.id).await.unwrap().unwrap().customer_name,
        "Alice"
    );
}

#[tokio::test]
async fn empty_set_settles() {
    let h = harness();
    let handle = h.updater.apply_to_all("nobody", |_: &mut Order| {});
    settle(&handle).await;
    assert!(handle.is_settled());
}

#[tokio::test]
async fn discovery_failure_settles_without_writes() {
    let h = harness();
    let a = h.store.save(&order("alice", "alice")).await.unwrap();
    h.store.fail_discovery();

    let handle = h
        .updater
        .apply_to_all("alice", |o: &mut Order| o.customer_name = "Alice".into());
    settle(&handle).await;

    assert_eq!(
        h.store.get_by_id(&a.id).await.unwrap().unwrap().customer_name,
        "alice"
    );
}

#[tokio::test]
async fn reapplying_converges() {
    let h = harness();
    let updater = h.updater.with_max_in_flight(Some(1));
    for _ in 0..4 {
        h.store.save(&order("alice", "alice")).await.unwrap();
    }

    for _ in 0..2 {
        let handle = updater.apply_to_all("alice", |o: &mut Order| o.customer_name = "Alice".into());
        settle(&handle).await;
    }

    let orders = h.store.list_by_owner("alice").await.unwrap();
    assert_eq!(orders.len(), 4);
    assert!(orders.iter().all(|o| o.customer_name == "Alice"));
}
