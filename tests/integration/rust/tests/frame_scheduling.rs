//! Frame Scheduling Integration Tests
//!
//! Frame batches ride the loop's tick cadence: coalesced, ordered,
//! deferred-on-re-request, and paused while the host is backgrounded.

use async_runtime::{EventLoop, EventLoopConfig};
use core_types::Value;
use std::cell::RefCell;
use std::rc::Rc;

type Log = Rc<RefCell<Vec<String>>>;

fn log() -> Log {
    Rc::new(RefCell::new(Vec::new()))
}

/// Test: all registered callbacks fire together at one boundary, in
/// registration order.
#[test]
fn test_frame_batch_is_coalesced_and_ordered() {
    let event_loop = EventLoop::new();
    let order = log();

    for name in ["paint-1", "paint-2", "paint-3"] {
        let o = order.clone();
        event_loop.request_frame(move || {
            o.borrow_mut().push(name.to_string());
            Ok(Value::Undefined)
        });
    }

    event_loop.tick(0).unwrap();
    assert_eq!(*order.borrow(), vec!["paint-1", "paint-2", "paint-3"]);
}

/// Test: an animation loop re-requesting itself fires once per frame
/// boundary, not once per tick.
#[test]
fn test_animation_self_request_respects_frame_cadence() {
    let event_loop = EventLoop::new();
    let frames_seen = Rc::new(RefCell::new(Vec::new()));

    fn animate(event_loop: &EventLoop, seen: &Rc<RefCell<Vec<u64>>>, frames_left: u32) {
        if frames_left == 0 {
            return;
        }
        let lp = event_loop.clone();
        let s = seen.clone();
        event_loop.request_frame(move || {
            s.borrow_mut().push(lp.now_ms());
            animate(&lp, &s, frames_left - 1);
            Ok(Value::Undefined)
        });
    }
    animate(&event_loop, &frames_seen, 3);

    // Drive well past three 16 ms boundaries with dense ticks.
    for now in 0..=40 {
        event_loop.tick(now).unwrap();
    }
    assert_eq!(*frames_seen.borrow(), vec![0, 16, 32]);
}

/// Test: frames hold entirely while inactive and resume where they left
/// off, macrotasks unaffected.
#[test]
fn test_backgrounded_host_pauses_frames_only() {
    let event_loop = EventLoop::new();
    let order = log();

    let o = order.clone();
    event_loop.request_frame(move || {
        o.borrow_mut().push("frame".to_string());
        Ok(Value::Undefined)
    });
    let o = order.clone();
    event_loop.schedule_timeout(
        move || {
            o.borrow_mut().push("timer".to_string());
            Ok(Value::Undefined)
        },
        5,
    );

    event_loop.set_frames_active(false);
    event_loop.tick(5).unwrap();
    event_loop.tick(20).unwrap();
    assert_eq!(*order.borrow(), vec!["timer"]);

    event_loop.set_frames_active(true);
    event_loop.tick(40).unwrap();
    assert_eq!(*order.borrow(), vec!["timer", "frame"]);
}

/// Test: cancellation inside a batch suppresses a later callback of the
/// same batch.
#[test]
fn test_cancel_within_batch_suppresses_later_callback() {
    let event_loop = EventLoop::new();
    let order = log();

    let victim_slot: Rc<RefCell<Option<async_runtime::FrameHandle>>> =
        Rc::new(RefCell::new(None));

    let lp = event_loop.clone();
    let o = order.clone();
    let v = victim_slot.clone();
    event_loop.request_frame(move || {
        o.borrow_mut().push("assassin".to_string());
        if let Some(handle) = *v.borrow() {
            lp.cancel_frame(handle);
        }
        Ok(Value::Undefined)
    });

    let o = order.clone();
    let victim = event_loop.request_frame(move || {
        o.borrow_mut().push("victim".to_string());
        Ok(Value::Undefined)
    });
    *victim_slot.borrow_mut() = Some(victim);

    event_loop.tick(0).unwrap();
    assert_eq!(*order.borrow(), vec!["assassin"]);
}

/// Test: frame cadence follows the configured interval, independent of
/// timer cadence.
#[test]
fn test_frame_interval_is_configurable() {
    let event_loop = EventLoop::with_config(EventLoopConfig {
        frame_interval_ms: 100,
        ..EventLoopConfig::default()
    });
    let count = Rc::new(RefCell::new(0u32));

    fn animate(event_loop: &EventLoop, count: &Rc<RefCell<u32>>) {
        let lp = event_loop.clone();
        let c = count.clone();
        event_loop.request_frame(move || {
            *c.borrow_mut() += 1;
            animate(&lp, &c);
            Ok(Value::Undefined)
        });
    }
    animate(&event_loop, &count);

    for now in (0..=250).step_by(10) {
        event_loop.tick(now).unwrap();
    }
    // Boundaries at 0, 100, 200.
    assert_eq!(*count.borrow(), 3);
}
