//! Unit tests for EventLoop

use async_runtime::{EventLoop, EventLoopConfig, LoopError};
use core_types::{RuntimeError, Value};
use std::cell::RefCell;
use std::rc::Rc;

fn order_log() -> Rc<RefCell<Vec<String>>> {
    Rc::new(RefCell::new(Vec::new()))
}

fn push(log: &Rc<RefCell<Vec<String>>>, entry: &str) {
    log.borrow_mut().push(entry.to_string());
}

#[test]
fn microtasks_enqueued_by_microtasks_run_before_next_macrotask() {
    let event_loop = EventLoop::new();
    let order = order_log();

    let o = order.clone();
    event_loop.post_event(move || {
        push(&o, "macro-1");
        Ok(Value::Undefined)
    });
    let o = order.clone();
    event_loop.post_event(move || {
        push(&o, "macro-2");
        Ok(Value::Undefined)
    });

    let o = order.clone();
    let lp = event_loop.clone();
    event_loop.schedule_microtask(move || {
        push(&o, "micro-1");
        let o2 = o.clone();
        lp.schedule_microtask(move || {
            push(&o2, "micro-2");
            Ok(Value::Undefined)
        });
        Ok(Value::Undefined)
    });

    event_loop.run_until_idle().unwrap();
    assert_eq!(
        *order.borrow(),
        vec!["macro-1", "micro-1", "micro-2", "macro-2"]
    );
}

#[test]
fn equal_delay_timers_fire_in_schedule_order() {
    let event_loop = EventLoop::new();
    let order = order_log();

    let o = order.clone();
    event_loop.schedule_timeout(
        move || {
            push(&o, "first");
            Ok(Value::Undefined)
        },
        20,
    );
    let o = order.clone();
    event_loop.schedule_timeout(
        move || {
            push(&o, "second");
            Ok(Value::Undefined)
        },
        20,
    );

    event_loop.run_until_idle().unwrap();
    assert_eq!(*order.borrow(), vec!["first", "second"]);
}

#[test]
fn same_turn_microtask_beats_zero_delay_timer() {
    let event_loop = EventLoop::new();
    let order = order_log();

    let lp = event_loop.clone();
    let o = order.clone();
    event_loop
        .run_main("main", move || {
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
                push(&o2, "micro");
                Ok(Value::Undefined)
            });
            Ok(Value::Undefined)
        })
        .unwrap();
    event_loop.run_until_idle().unwrap();

    assert_eq!(*order.borrow(), vec!["micro", "timer"]);
}

#[test]
fn nested_timer_scheduling_from_callbacks() {
    let event_loop = EventLoop::new();
    let order = order_log();

    let lp = event_loop.clone();
    let o = order.clone();
    event_loop.schedule_timeout(
        move || {
            push(&o, "outer");
            let o2 = o.clone();
            lp.schedule_timeout(
                move || {
                    push(&o2, "inner");
                    Ok(Value::Undefined)
                },
                5,
            );
            Ok(Value::Undefined)
        },
        5,
    );

    event_loop.run_until_idle().unwrap();
    assert_eq!(*order.borrow(), vec!["outer", "inner"]);
    assert_eq!(event_loop.now_ms(), 10);
}

#[test]
fn run_until_idle_is_a_noop_on_an_idle_loop() {
    let event_loop = EventLoop::new();
    event_loop.run_until_idle().unwrap();
    assert_eq!(event_loop.stats().ticks, 0);
}

#[test]
fn posted_events_keep_fifo_order_across_ticks() {
    let event_loop = EventLoop::new();
    let order = order_log();

    for name in ["a", "b", "c"] {
        let o = order.clone();
        event_loop.post_event(move || {
            push(&o, name);
            Ok(Value::Undefined)
        });
    }

    event_loop.run_until_idle().unwrap();
    assert_eq!(*order.borrow(), vec!["a", "b", "c"]);
    assert_eq!(event_loop.stats().ticks, 3);
}

#[test]
fn callback_error_does_not_stop_the_loop() {
    let event_loop = EventLoop::new();
    let errors = Rc::new(RefCell::new(Vec::new()));
    let order = order_log();

    let e = errors.clone();
    event_loop.set_error_hook(move |label, error| {
        e.borrow_mut().push(format!("{}: {}", label, error));
    });

    event_loop.schedule_timeout(|| Err(RuntimeError::generic("timer blew up")), 1);
    let o = order.clone();
    event_loop.schedule_timeout(
        move || {
            push(&o, "still running");
            Ok(Value::Undefined)
        },
        2,
    );

    event_loop.run_until_idle().unwrap();
    assert_eq!(errors.borrow().len(), 1);
    assert!(errors.borrow()[0].contains("timer blew up"));
    assert_eq!(*order.borrow(), vec!["still running"]);
}

#[test]
fn starvation_limit_reports_and_preserves_the_loop() {
    let event_loop = EventLoop::with_config(EventLoopConfig {
        microtask_limit: Some(4),
        ..EventLoopConfig::default()
    });

    fn requeue(event_loop: &EventLoop) {
        let lp = event_loop.clone();
        event_loop.schedule_microtask(move || {
            requeue(&lp);
            Ok(Value::Undefined)
        });
    }
    requeue(&event_loop);

    assert_eq!(
        event_loop.run_until_idle(),
        Err(LoopError::MicrotaskStarvation { limit: 4 })
    );
    // The offending microtask is still queued; the loop itself survives.
    assert!(event_loop.has_pending_work());
}

#[test]
fn interval_catches_up_one_firing_per_iteration() {
    let event_loop = EventLoop::new();
    let count = Rc::new(RefCell::new(0u32));

    let c = count.clone();
    let handle = event_loop
        .schedule_interval(
            move || {
                *c.borrow_mut() += 1;
                Ok(Value::Undefined)
            },
            10,
        )
        .unwrap();

    // Jump far past several due times; each tick fires one catch-up.
    event_loop.tick(35).unwrap();
    assert_eq!(*count.borrow(), 1);
    event_loop.tick(35).unwrap();
    assert_eq!(*count.borrow(), 2);
    event_loop.tick(35).unwrap();
    assert_eq!(*count.borrow(), 3);
    // Caught up: next due time is 40.
    event_loop.tick(35).unwrap();
    assert_eq!(*count.borrow(), 3);

    event_loop.clear_timer(handle);
}

#[test]
fn stats_roundtrip_through_json() {
    let event_loop = EventLoop::new();
    event_loop.post_event(|| Ok(Value::Undefined));
    event_loop.run_until_idle().unwrap();

    let stats = event_loop.stats();
    let json = serde_json::to_string(&stats).unwrap();
    let back: async_runtime::LoopStats = serde_json::from_str(&json).unwrap();
    assert_eq!(back, stats);
}
