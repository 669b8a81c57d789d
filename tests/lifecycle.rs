use spark_store::{
    derived, derived_batched, record, select, store, tick, NodeStatus, Readable, Record,
    Writable,
};
use std::cell::Cell;
use std::rc::Rc;

fn count(r: &Record) -> i64 {
    r.get_as::<i64>("count").unwrap_or(0)
}

#[test]
fn test_derived_drop_detaches_from_source() {
    let runs = Rc::new(Cell::new(0));
    let runs_clone = runs.clone();

    let source = store(record! { "count" => 0 });

    {
        let _node = select(source.clone(), move |s| {
            runs_clone.set(runs_clone.get() + 1);
            count(&s)
        });

        assert_eq!(runs.get(), 1);
        assert_eq!(source.subscriber_count(), 1);

        source.set(record! { "count" => 1 });
        assert_eq!(runs.get(), 2);

        // _node drops here
    }

    assert_eq!(source.subscriber_count(), 0, "Dropped node should unsubscribe");

    source.set(record! { "count" => 2 });
    assert_eq!(runs.get(), 2, "Dropped node should not recompute");
}

#[test]
fn test_clone_keeps_node_alive() {
    let source = store(record! { "count" => 1 });
    let node = select(source.clone(), |s| count(&s));
    let kept = node.clone();

    drop(node);
    source.set(record! { "count" => 5 });
    assert_eq!(kept.get(), 5);
    assert_eq!(source.subscriber_count(), 1);
}

#[test]
fn test_destroy_detaches_and_freezes_value() {
    let source = store(record! { "count" => 3 });
    let node = select(source.clone(), |s| count(&s) * 10);

    let notified = Rc::new(Cell::new(0));
    let notified_clone = notified.clone();
    let _unsub = node.subscribe(move |_| notified_clone.set(notified_clone.get() + 1));
    assert_eq!(notified.get(), 1);

    node.destroy();
    assert_eq!(node.status(), NodeStatus::Destroyed);
    assert_eq!(source.subscriber_count(), 0);
    assert_eq!(node.subscriber_count(), 0);

    source.set(record! { "count" => 4 });
    assert_eq!(node.get(), 30, "Destroyed node keeps its last value");
    assert_eq!(notified.get(), 1);
}

#[test]
fn test_destroy_is_idempotent() {
    let source = store(record! { "count" => 0 });
    let node = select(source.clone(), |s| count(&s));

    node.destroy();
    node.destroy();
    drop(node);

    assert_eq!(source.subscriber_count(), 0);
}

#[test]
fn test_subscribe_after_destroy_only_catches_up() {
    let source = store(record! { "count" => 2 });
    let node = select(source.clone(), |s| count(&s));
    node.destroy();

    let seen = Rc::new(Cell::new(0));
    let seen_clone = seen.clone();
    let unsub = node.subscribe(move |v| seen_clone.set(*v));

    assert_eq!(seen.get(), 2);
    assert!(!unsub.is_active());

    source.set(record! { "count" => 9 });
    assert_eq!(seen.get(), 2);
}

#[test]
fn test_dropped_batched_node_skips_scheduled_recompute() {
    let runs = Rc::new(Cell::new(0));
    let runs_clone = runs.clone();
    let source = store(record! { "count" => 0 });

    {
        let _node = derived_batched((source.clone(),), move |(s,)| {
            runs_clone.set(runs_clone.get() + 1);
            count(&s)
        });
        source.set(record! { "count" => 1 });
        // _node drops with a recompute still scheduled
    }

    tick().unwrap();
    assert_eq!(runs.get(), 1, "Only the initial compute should have run");
}

#[test]
fn test_chain_teardown_from_the_middle() {
    let source = store(record! { "count" => 1 });
    let doubled = select(source.clone(), |s| count(&s) * 2);
    let quadrupled = derived((doubled.clone(),), |(d,)| d * 2);

    doubled.destroy();
    source.set(record! { "count" => 2 });

    assert_eq!(doubled.get(), 2);
    assert_eq!(quadrupled.get(), 4);
    assert_eq!(quadrupled.status(), NodeStatus::Live);
}

#[test]
fn test_unsubscribe_handle_drop_keeps_listener() {
    let source = store(record! { "count" => 0 });
    let seen = Rc::new(Cell::new(0));
    let seen_clone = seen.clone();

    drop(source.subscribe(move |s| seen_clone.set(count(s))));

    source.set(record! { "count" => 7 });
    assert_eq!(seen.get(), 7, "Dropping the handle must not unsubscribe");
}
