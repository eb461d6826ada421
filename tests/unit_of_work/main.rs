#[path = "../support/mod.rs"]
mod support;


use std::collections::HashSet;
use std::sync::Arc;

use chrono::Duration;
use outbox_relay::{
    Aggregate, Database, DomainEventDispatcher, Entity, InMemoryDatabase, OutboxStore, SaveError,
    UnitOfWork,
};

use aggregate::{Counter, COUNTERS};
use support::{manual_clock, Pinged};

fn dispatcher() -> DomainEventDispatcher {
    DomainEventDispatcher::new(Arc::new(manual_clock()))
}

// =============================================================================
// Commit
// =============================================================================

#[tokio::test]
async fn state_and_outbox_rows_commit_together() {
    let db = InMemoryDatabase::new();
    let dispatcher = dispatcher();
    let mut counter = Counter::default();
    counter.increment();
    counter.increment();

    let mut uow = UnitOfWork::begin(&db, &dispatcher).await.unwrap();
    counter.stage(uow.session());
    let written = uow.save_changes(&mut counter).await.unwrap();

    assert_eq!(written, 3);
    assert!(!counter.entity().has_domain_events());
    assert_eq!(counter.entity().version(), 1);
    assert_eq!(db.document(COUNTERS, counter.id()).unwrap().unwrap().version, 1);

    let outbox = db.outbox_messages().unwrap();
    assert_eq!(outbox.len(), 2);
    assert!(outbox.iter().all(|m| m.event_type == "test.pinged" && m.is_pending()));
    assert_eq!(outbox[0].event_data["n"], 1);
    assert_eq!(outbox[1].event_data["n"], 2);
}

#[tokio::test]
async fn saving_without_events_writes_only_state() {
    let db = InMemoryDatabase::new();
    let dispatcher = dispatcher();
    let mut counter = Counter::default();

    let mut uow = UnitOfWork::begin(&db, &dispatcher).await.unwrap();
    counter.stage(uow.session());
    let written = uow.save_changes(&mut counter).await.unwrap();

    assert_eq!(written, 1);
    assert!(db.outbox_messages().unwrap().is_empty());
}

#[tokio::test]
async fn drained_events_are_not_dispatched_twice() {
    let db = InMemoryDatabase::new();
    let dispatcher = dispatcher();
    let mut counter = Counter::default();
    counter.increment();

    let mut uow = UnitOfWork::begin(&db, &dispatcher).await.unwrap();
    counter.stage(uow.session());
    uow.save_changes(&mut counter).await.unwrap();

    let mut uow = UnitOfWork::begin(&db, &dispatcher).await.unwrap();
    counter.stage(uow.session());
    let written = uow.save_changes(&mut counter).await.unwrap();

    assert_eq!(written, 1);
    assert_eq!(db.outbox_messages().unwrap().len(), 1);
    assert_eq!(counter.entity().version(), 2);
}

#[tokio::test]
async fn every_raised_event_gets_exactly_one_row() {
    let db = InMemoryDatabase::new();
    let dispatcher = dispatcher();
    let mut a = Entity::new();
    let mut b = Entity::new();
    let mut c = Entity::new();
    for n in 0..3 {
        a.raise(Pinged { n });
    }
    b.raise(Pinged { n: 10 });
    for n in 20..25 {
        c.raise(Pinged { n });
    }

    let uow = UnitOfWork::begin(&db, &dispatcher).await.unwrap();
    let written = uow.save_changes(&mut [&mut a, &mut b, &mut c]).await.unwrap();

    assert_eq!(written, 9);
    let outbox = db.outbox_messages().unwrap();
    let ids: HashSet<_> = outbox.iter().map(|m| m.id).collect();
    assert_eq!(ids.len(), 9);
    let order: Vec<u64> = outbox.iter().map(|m| m.event_data["n"].as_u64().unwrap()).collect();
    assert_eq!(order, vec![0, 1, 2, 10, 20, 21, 22, 23, 24]);
    assert!(outbox
        .windows(2)
        .all(|pair| pair[0].occurred_on_utc <= pair[1].occurred_on_utc));
}

#[tokio::test]
async fn only_entities_with_staged_writes_advance() {
    let db = InMemoryDatabase::new();
    let dispatcher = dispatcher();
    let mut stored = Counter::default();
    let mut unstored = Counter::default();
    stored.increment();
    unstored.increment();

    let mut uow = UnitOfWork::begin(&db, &dispatcher).await.unwrap();
    stored.stage(uow.session());
    uow.save_changes(&mut [stored.entity_mut(), unstored.entity_mut()])
        .await
        .unwrap();

    assert_eq!(stored.entity().version(), 1);
    assert_eq!(unstored.entity().version(), 0);
    assert_eq!(db.outbox_messages().unwrap().len(), 2);

    // A later first write of the other counter is not mistaken for a stale one.
    let mut uow = UnitOfWork::begin(&db, &dispatcher).await.unwrap();
    unstored.stage(uow.session());
    uow.save_changes(&mut unstored).await.unwrap();
    assert_eq!(db.document(COUNTERS, unstored.id()).unwrap().unwrap().version, 1);
}

#[tokio::test]
async fn rows_are_stamped_by_the_clock() {
    let db = InMemoryDatabase::new();
    let clock = manual_clock();
    let dispatcher = DomainEventDispatcher::new(Arc::new(clock.clone()));
    clock.advance(Duration::minutes(5));
    let mut entity = Entity::new();
    entity.raise(Pinged { n: 1 });

    let uow = UnitOfWork::begin(&db, &dispatcher).await.unwrap();
    uow.save_changes(&mut entity).await.unwrap();

    let batch = db.fetch_unprocessed(10).await.unwrap();
    assert_eq!(batch[0].occurred_on_utc, support::epoch() + Duration::minutes(5));
}

// =============================================================================
// Atomicity
// =============================================================================

#[tokio::test]
async fn serialization_failure_writes_nothing() {
    let db = InMemoryDatabase::new();
    let dispatcher = dispatcher();
    let mut counter = Counter::default();
    counter.increment();
    counter.corrupt();

    let mut uow = UnitOfWork::begin(&db, &dispatcher).await.unwrap();
    counter.stage(uow.session());
    let err = uow.save_changes(&mut counter).await.unwrap_err();

    assert!(matches!(err, SaveError::Serialization(_)), "{err:?}");
    assert!(db.document(COUNTERS, counter.id()).unwrap().is_none());
    assert!(db.outbox_messages().unwrap().is_empty());
    assert_eq!(counter.entity().version(), 0);
}

#[tokio::test]
async fn version_conflict_writes_nothing() {
    let db = InMemoryDatabase::new();
    let dispatcher = dispatcher();
    let mut counter = Counter::default();
    counter.increment();
    let mut uow = UnitOfWork::begin(&db, &dispatcher).await.unwrap();
    counter.stage(uow.session());
    uow.save_changes(&mut counter).await.unwrap();
    let id = counter.id();

    // Two writers load the same version.
    let mut first = UnitOfWork::begin(&db, &dispatcher).await.unwrap();
    let mut second = UnitOfWork::begin(&db, &dispatcher).await.unwrap();
    let mut mine = Counter::load(first.session(), id).unwrap().unwrap();
    let mut theirs = Counter::load(second.session(), id).unwrap().unwrap();

    mine.increment();
    mine.stage(first.session());
    first.save_changes(&mut mine).await.unwrap();

    theirs.increment();
    theirs.stage(second.session());
    let err = second.save_changes(&mut theirs).await.unwrap_err();

    assert!(matches!(err, SaveError::Concurrency(_)), "{err:?}");
    assert_eq!(db.document(COUNTERS, id).unwrap().unwrap().version, 2);
    // The initial save's event and the winner's.
    assert_eq!(db.outbox_messages().unwrap().len(), 2);
    assert_eq!(theirs.entity().version(), 1);
}

#[tokio::test]
async fn explicit_rollback_discards_staged_work() {
    let db = InMemoryDatabase::new();
    let dispatcher = dispatcher();
    let counter = Counter::default();

    let mut uow = UnitOfWork::begin(&db, &dispatcher).await.unwrap();
    counter.stage(uow.session());
    uow.rollback().await.unwrap();

    let session = db.begin().await.unwrap();
    assert!(Counter::load(&session, counter.id()).unwrap().is_none());
}
