//! Scheduling Order Integration Tests
//!
//! Verifies the loop's core ordering guarantees end to end: microtasks drain
//! to exhaustion before the next macrotask, one macrotask runs per
//! iteration, and a synchronous turn settles before anything deferred.

use async_runtime::EventLoop;
use core_types::Value;
use std::cell::RefCell;
use std::rc::Rc;

type Log = Rc<RefCell<Vec<String>>>;

fn log() -> Log {
    Rc::new(RefCell::new(Vec::new()))
}

fn push(log: &Log, entry: &str) {
    log.borrow_mut().push(entry.to_string());
}

/// Test: a microtask scheduled in the same turn as a delay-0 timer wins.
#[test]
fn test_same_turn_microtask_precedes_zero_delay_timer() {
    let event_loop = EventLoop::new();
    let order = log();

    let lp = event_loop.clone();
    let o = order.clone();
    event_loop
        .run_main("main", move || {
            push(&o, "sync");
            let o2 = o.clone();
            lp.schedule_timeout(
                move || {
                    push(&o2, "timer");
                    Ok(Value::Undefined)
                },
                0,
            );
            let o2 = o.clone();
            lp.schedule_microtask(move || {
                push(&o2, "microtask");
                Ok(Value::Undefined)
            });
            Ok(Value::Undefined)
        })
        .unwrap();
    event_loop.run_until_idle().unwrap();

    assert_eq!(*order.borrow(), vec!["sync", "microtask", "timer"]);
}

/// Test: microtasks enqueued while draining run before the next macrotask,
/// under bounded recursion.
#[test]
fn test_bounded_microtask_recursion_starves_macrotasks() {
    let event_loop = EventLoop::new();
    let order = log();

    let o = order.clone();
    event_loop.post_event(move || {
        push(&o, "macrotask");
        Ok(Value::Undefined)
    });

    fn chain(event_loop: &EventLoop, order: &Log, depth: u32) {
        if depth == 0 {
            return;
        }
        let lp = event_loop.clone();
        let o = order.clone();
        event_loop.schedule_microtask(move || {
            push(&o, &format!("micro-{}", depth));
            chain(&lp, &o, depth - 1);
            Ok(Value::Undefined)
        });
    }
    chain(&event_loop, &order, 5);

    event_loop.run_until_idle().unwrap();

    // First tick: one macrotask, then the entire recursive microtask chain.
    assert_eq!(
        *order.borrow(),
        vec![
            "macrotask".to_string(),
            "micro-5".to_string(),
            "micro-4".to_string(),
            "micro-3".to_string(),
            "micro-2".to_string(),
            "micro-1".to_string(),
        ]
    );
}

/// Test: each iteration takes exactly one posted event, with a full drain
/// in between.
#[test]
fn test_one_macrotask_per_iteration_with_drain_between() {
    let event_loop = EventLoop::new();
    let order = log();

    for name in ["event-1", "event-2"] {
        let lp = event_loop.clone();
        let o = order.clone();
        event_loop.post_event(move || {
            push(&o, name);
            let o2 = o.clone();
            let tag = format!("{}-micro", name);
            lp.schedule_microtask(move || {
                push(&o2, &tag);
                Ok(Value::Undefined)
            });
            Ok(Value::Undefined)
        });
    }

    event_loop.run_until_idle().unwrap();
    assert_eq!(
        *order.borrow(),
        vec!["event-1", "event-1-micro", "event-2", "event-2-micro"]
    );
}

/// Test: promise reactions ride the microtask queue, so they interleave
/// ahead of macrotasks exactly like explicit microtasks.
#[test]
fn test_promise_reactions_share_microtask_priority() {
    let event_loop = EventLoop::new();
    let order = log();

    let o = order.clone();
    event_loop.post_event(move || {
        push(&o, "macrotask");
        Ok(Value::Undefined)
    });

    let promise = async_runtime::Promise::resolved(&event_loop, Value::Undefined);
    let o = order.clone();
    promise.then(
        Some(Box::new(move |_value| {
            push(&o, "reaction");
            Ok(Value::Undefined)
        })),
        None,
    );

    event_loop.run_until_idle().unwrap();
    // The reaction was queued before any tick ran, so it drains ahead of
    // the first macrotask's follow-up work but after that macrotask itself.
    assert_eq!(*order.borrow(), vec!["macrotask", "reaction"]);
}
