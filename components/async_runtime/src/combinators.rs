//! Many-to-one promise combinators.
//!
//! Each combinator takes a fixed, finite collection of input promises and
//! returns one output promise derived from their settlements. Inputs keep
//! settling independently; a combinator that has already produced its result
//! ignores the stragglers.

use crate::event_loop::EventLoop;
use crate::promise::{FulfillHandler, Promise, RejectHandler};
use core_types::{RuntimeError, Value};
use std::cell::RefCell;
use std::rc::Rc;

/// Per-input outcome record produced by [`Promise::all_settled`].
#[derive(Debug, Clone, PartialEq)]
pub enum SettledOutcome {
    /// The input fulfilled with this value.
    Fulfilled(Value),
    /// The input rejected with this reason.
    Rejected(RuntimeError),
}

impl SettledOutcome {
    /// Returns true for a fulfilled outcome.
    pub fn is_fulfilled(&self) -> bool {
        matches!(self, SettledOutcome::Fulfilled(_))
    }

    /// Wraps an outcome list in a [`Value`] for promise fulfillment.
    pub fn list_to_value(outcomes: Vec<SettledOutcome>) -> Value {
        Value::NativeObject(Rc::new(RefCell::new(outcomes)))
    }

    /// Recovers the outcome list from a fulfillment value.
    pub fn list_from_value(value: &Value) -> Option<Vec<SettledOutcome>> {
        match value {
            Value::NativeObject(object) => object
                .borrow()
                .downcast_ref::<Vec<SettledOutcome>>()
                .cloned(),
            _ => None,
        }
    }
}

struct SlotState<T> {
    slots: Vec<Option<T>>,
    remaining: usize,
}

impl<T> SlotState<T> {
    fn new(len: usize) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self {
            slots: (0..len).map(|_| None).collect(),
            remaining: len,
        }))
    }

    /// Fills one slot; returns the completed, index-aligned collection once
    /// every slot is filled.
    fn fill(&mut self, index: usize, item: T) -> Option<Vec<T>> {
        self.slots[index] = Some(item);
        self.remaining -= 1;
        if self.remaining == 0 {
            Some(self.slots.iter_mut().flat_map(Option::take).collect())
        } else {
            None
        }
    }
}

impl Promise {
    /// Fulfills with the index-aligned list of every input's value once all
    /// inputs have fulfilled; rejects with the reason of the first input to
    /// reject.
    ///
    /// Later settlements of the other inputs are ignored for the result,
    /// though those promises still settle independently. An empty input
    /// fulfills immediately with an empty list.
    pub fn all(event_loop: &EventLoop, inputs: Vec<Promise>) -> Promise {
        let result = Promise::new(event_loop);
        if inputs.is_empty() {
            result.resolve(Value::List(Vec::new()));
            return result;
        }
        let state = SlotState::new(inputs.len());
        for (index, input) in inputs.iter().enumerate() {
            let on_fulfilled: FulfillHandler = {
                let state = state.clone();
                let result = result.clone();
                Box::new(move |value| {
                    let complete = state.borrow_mut().fill(index, value);
                    if let Some(values) = complete {
                        result.resolve(Value::List(values));
                    }
                    Ok(Value::Undefined)
                })
            };
            let on_rejected: RejectHandler = {
                let result = result.clone();
                Box::new(move |reason| {
                    result.reject(reason);
                    Ok(Value::Undefined)
                })
            };
            input.then(Some(on_fulfilled), Some(on_rejected));
        }
        result
    }

    /// Settles exactly like whichever input settles first, in real
    /// settlement order, not input order.
    ///
    /// With an empty input the result never settles; there is nothing to
    /// race.
    pub fn race(event_loop: &EventLoop, inputs: Vec<Promise>) -> Promise {
        let result = Promise::new(event_loop);
        for input in inputs.iter() {
            let on_fulfilled: FulfillHandler = {
                let result = result.clone();
                Box::new(move |value| {
                    result.resolve(value);
                    Ok(Value::Undefined)
                })
            };
            let on_rejected: RejectHandler = {
                let result = result.clone();
                Box::new(move |reason| {
                    result.reject(reason);
                    Ok(Value::Undefined)
                })
            };
            input.then(Some(on_fulfilled), Some(on_rejected));
        }
        result
    }

    /// Fulfills with an index-aligned list of [`SettledOutcome`] records
    /// once every input has settled. Never rejects.
    ///
    /// The outcome list travels as a native object; recover it with
    /// [`SettledOutcome::list_from_value`]. An empty input fulfills
    /// immediately with an empty list.
    pub fn all_settled(event_loop: &EventLoop, inputs: Vec<Promise>) -> Promise {
        let result = Promise::new(event_loop);
        if inputs.is_empty() {
            result.resolve(SettledOutcome::list_to_value(Vec::new()));
            return result;
        }
        let state = SlotState::new(inputs.len());
        for (index, input) in inputs.iter().enumerate() {
            let on_fulfilled: FulfillHandler = {
                let state = state.clone();
                let result = result.clone();
                Box::new(move |value| {
                    let complete = state
                        .borrow_mut()
                        .fill(index, SettledOutcome::Fulfilled(value));
                    if let Some(outcomes) = complete {
                        result.resolve(SettledOutcome::list_to_value(outcomes));
                    }
                    Ok(Value::Undefined)
                })
            };
            let on_rejected: RejectHandler = {
                let state = state.clone();
                let result = result.clone();
                Box::new(move |reason| {
                    let complete = state
                        .borrow_mut()
                        .fill(index, SettledOutcome::Rejected(reason));
                    if let Some(outcomes) = complete {
                        result.resolve(SettledOutcome::list_to_value(outcomes));
                    }
                    Ok(Value::Undefined)
                })
            };
            input.then(Some(on_fulfilled), Some(on_rejected));
        }
        result
    }

    /// Fulfills with the value of the first input to fulfill; rejects only
    /// when every input has rejected, with an aggregate error carrying all
    /// rejection reasons in input order.
    ///
    /// An empty input rejects immediately with an empty aggregate: the
    /// all-rejected condition holds vacuously, and an observable settlement
    /// beats hanging forever.
    pub fn any(event_loop: &EventLoop, inputs: Vec<Promise>) -> Promise {
        let result = Promise::new(event_loop);
        if inputs.is_empty() {
            result.reject(RuntimeError::aggregate(Vec::new()));
            return result;
        }
        let state = SlotState::new(inputs.len());
        for (index, input) in inputs.iter().enumerate() {
            let on_fulfilled: FulfillHandler = {
                let result = result.clone();
                Box::new(move |value| {
                    result.resolve(value);
                    Ok(Value::Undefined)
                })
            };
            let on_rejected: RejectHandler = {
                let state = state.clone();
                let result = result.clone();
                Box::new(move |reason| {
                    let complete = state.borrow_mut().fill(index, reason);
                    if let Some(reasons) = complete {
                        result.reject(RuntimeError::aggregate(reasons));
                    }
                    Ok(Value::Undefined)
                })
            };
            input.then(Some(on_fulfilled), Some(on_rejected));
        }
        result
    }
}
