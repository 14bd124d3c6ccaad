//! Promise implementation.
//!
//! A promise is a single-assignment deferred result: it settles at most
//! once, from `Pending` to `Fulfilled` or `Rejected`, and that transition is
//! terminal. Continuations registered with [`Promise::then`] are dispatched
//! through the owning loop's microtask queue, never synchronously, even when
//! the promise is already settled. Dispatch is iterative: a chain of any
//! depth costs one microtask per link, not one stack frame per link.

use crate::event_loop::EventLoop;
use core_types::{ErrorKind, RuntimeError, Value};
use std::cell::RefCell;
use std::rc::Rc;

/// Continuation invoked with the fulfillment value.
///
/// Returning `Ok` fulfills the reaction's child promise with the returned
/// value (adopting it when it wraps a promise); returning `Err` rejects the
/// child.
pub type FulfillHandler = Box<dyn FnMut(Value) -> Result<Value, RuntimeError>>;

/// Continuation invoked with the rejection reason.
///
/// Returning `Ok` recovers: the child promise fulfills. Returning `Err`
/// keeps the chain rejected.
pub type RejectHandler = Box<dyn FnMut(RuntimeError) -> Result<Value, RuntimeError>>;

/// Capability handed to an executor for fulfilling its promise.
pub type ResolveFn = Box<dyn Fn(Value)>;

/// Capability handed to an executor for rejecting its promise.
pub type RejectFn = Box<dyn Fn(RuntimeError)>;

/// The state of a promise.
///
/// Once settled (`Fulfilled` or `Rejected`), a promise cannot change state.
#[derive(Debug, Clone, PartialEq)]
pub enum PromiseState {
    /// Neither fulfilled nor rejected yet.
    Pending,
    /// Settled with a value.
    Fulfilled(Value),
    /// Settled with a rejection reason.
    Rejected(RuntimeError),
}

/// A continuation pending on a promise: the two optional handlers and the
/// child promise whose settlement derives from whichever handler runs.
struct Reaction {
    on_fulfilled: Option<FulfillHandler>,
    on_rejected: Option<RejectHandler>,
    child: Promise,
}

struct PromiseInner {
    state: PromiseState,
    reactions: Vec<Reaction>,
    /// Set when resolve/reject was called, including when resolution is
    /// adopting another promise and settlement is still in flight. Later
    /// settlement attempts through the public surface are no-ops.
    settle_locked: bool,
    /// Some reaction has taken responsibility for a rejection of this
    /// promise (explicitly or by passing it through to its child).
    rejection_handled: bool,
    /// The unhandled-rejection hook already fired for this promise.
    rejection_reported: bool,
}

/// A single-assignment deferred result with chainable continuations.
///
/// Cloning the handle shares the underlying promise.
///
/// # Examples
///
/// ```
/// use async_runtime::{EventLoop, Promise, PromiseState};
/// use core_types::Value;
///
/// let event_loop = EventLoop::new();
/// let promise = Promise::new(&event_loop);
/// assert_eq!(promise.state(), PromiseState::Pending);
///
/// promise.resolve(Value::Smi(42));
/// assert_eq!(promise.state(), PromiseState::Fulfilled(Value::Smi(42)));
/// ```
#[derive(Clone)]
pub struct Promise {
    inner: Rc<RefCell<PromiseInner>>,
    event_loop: EventLoop,
}

impl Promise {
    /// Creates a new pending promise owned by the given loop.
    pub fn new(event_loop: &EventLoop) -> Self {
        Self {
            inner: Rc::new(RefCell::new(PromiseInner {
                state: PromiseState::Pending,
                reactions: Vec::new(),
                settle_locked: false,
                rejection_handled: false,
                rejection_reported: false,
            })),
            event_loop: event_loop.clone(),
        }
    }

    /// Creates a promise and runs `executor` synchronously, handing it the
    /// resolve and reject capabilities.
    ///
    /// Only the settlement's reactions are deferred; the executor itself
    /// runs on the calling stack.
    ///
    /// # Examples
    ///
    /// ```
    /// use async_runtime::{EventLoop, Promise, PromiseState};
    /// use core_types::Value;
    ///
    /// let event_loop = EventLoop::new();
    /// let promise = Promise::with_executor(&event_loop, |resolve, _reject| {
    ///     resolve(Value::String("done".to_string()));
    /// });
    /// assert!(matches!(promise.state(), PromiseState::Fulfilled(_)));
    /// ```
    pub fn with_executor<F>(event_loop: &EventLoop, executor: F) -> Self
    where
        F: FnOnce(ResolveFn, RejectFn),
    {
        let promise = Promise::new(event_loop);
        let resolve: ResolveFn = {
            let promise = promise.clone();
            Box::new(move |value| promise.resolve(value))
        };
        let reject: RejectFn = {
            let promise = promise.clone();
            Box::new(move |reason| promise.reject(reason))
        };
        executor(resolve, reject);
        promise
    }

    /// Creates an already-fulfilled promise (or an adopting one, when the
    /// value wraps a promise).
    pub fn resolved(event_loop: &EventLoop, value: Value) -> Self {
        let promise = Promise::new(event_loop);
        promise.resolve(value);
        promise
    }

    /// Creates an already-rejected promise.
    pub fn rejected(event_loop: &EventLoop, reason: RuntimeError) -> Self {
        let promise = Promise::new(event_loop);
        promise.reject(reason);
        promise
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> PromiseState {
        self.inner.borrow().state.clone()
    }

    /// Returns true while the promise has not settled.
    pub fn is_pending(&self) -> bool {
        matches!(self.inner.borrow().state, PromiseState::Pending)
    }

    /// Returns true if both handles refer to the same promise.
    pub fn ptr_eq(&self, other: &Promise) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Wraps this handle in a [`Value`] so it can travel through callbacks
    /// and settle other promises by adoption.
    pub fn to_value(&self) -> Value {
        Value::NativeObject(Rc::new(RefCell::new(self.clone())))
    }

    /// Resolves the promise with a value.
    ///
    /// When the value wraps another promise, this promise adopts its
    /// eventual state instead of fulfilling with the handle itself.
    /// First call wins: once resolve or reject has been called, further
    /// calls are no-ops.
    pub fn resolve(&self, value: Value) {
        if self.lock() {
            self.settle_with(Ok(value));
        }
    }

    /// Rejects the promise with a reason. First call wins.
    pub fn reject(&self, reason: RuntimeError) {
        if self.lock() {
            self.settle_with(Err(reason));
        }
    }

    /// Claims the one settlement permit. Returns false if it is gone.
    fn lock(&self) -> bool {
        let mut inner = self.inner.borrow_mut();
        if inner.settle_locked {
            false
        } else {
            inner.settle_locked = true;
            true
        }
    }

    /// Settles from a completion, bypassing the public first-write lock.
    /// Used by the lock holder and by reaction dispatch, which owns its
    /// child promise outright.
    pub(crate) fn settle_with(&self, completion: Result<Value, RuntimeError>) {
        self.inner.borrow_mut().settle_locked = true;
        match completion {
            Ok(value) => {
                if let Some(target) = as_promise(&value) {
                    if target.ptr_eq(self) {
                        self.force_reject(RuntimeError::new(
                            ErrorKind::Type,
                            "promise cannot adopt itself",
                        ));
                    } else {
                        target.attach(None, None, self.clone());
                    }
                } else {
                    self.force_fulfill(value);
                }
            }
            Err(reason) => self.force_reject(reason),
        }
    }

    fn force_fulfill(&self, value: Value) {
        let reactions = {
            let mut inner = self.inner.borrow_mut();
            if !matches!(inner.state, PromiseState::Pending) {
                return;
            }
            inner.state = PromiseState::Fulfilled(value.clone());
            std::mem::take(&mut inner.reactions)
        };
        for reaction in reactions {
            self.schedule_reaction(reaction, Ok(value.clone()));
        }
    }

    fn force_reject(&self, reason: RuntimeError) {
        let (reactions, track) = {
            let mut inner = self.inner.borrow_mut();
            if !matches!(inner.state, PromiseState::Pending) {
                return;
            }
            inner.state = PromiseState::Rejected(reason.clone());
            let track = !inner.rejection_handled;
            (std::mem::take(&mut inner.reactions), track)
        };
        if track {
            self.event_loop.track_rejection(self.clone());
        }
        for reaction in reactions {
            self.schedule_reaction(reaction, Err(reason.clone()));
        }
    }

    /// Registers a reaction, returning the child promise whose settlement
    /// derives from it.
    ///
    /// The matching handler runs as a microtask once this promise settles;
    /// with the promise already settled the microtask is scheduled
    /// immediately. Either way the handler never runs synchronously within
    /// the `then` call itself. An absent handler passes the settlement
    /// through to the child unchanged.
    pub fn then(
        &self,
        on_fulfilled: Option<FulfillHandler>,
        on_rejected: Option<RejectHandler>,
    ) -> Promise {
        let child = Promise::new(&self.event_loop);
        self.attach(on_fulfilled, on_rejected, child.clone());
        child
    }

    /// Registers a rejection handler; sugar for `then(None, Some(..))`.
    pub fn catch<F>(&self, on_rejected: F) -> Promise
    where
        F: FnMut(RuntimeError) -> Result<Value, RuntimeError> + 'static,
    {
        self.then(None, Some(Box::new(on_rejected)))
    }

    /// Runs `callback` when the promise settles, regardless of outcome.
    ///
    /// The settled value or reason passes through to the returned promise
    /// unchanged, unless the callback itself fails, in which case the
    /// returned promise rejects with the callback's error.
    pub fn finally<F>(&self, callback: F) -> Promise
    where
        F: FnMut() -> Result<(), RuntimeError> + 'static,
    {
        let callback = Rc::new(RefCell::new(callback));
        let on_fulfilled: FulfillHandler = {
            let callback = callback.clone();
            Box::new(move |value| {
                (&mut *callback.borrow_mut())()?;
                Ok(value)
            })
        };
        let on_rejected: RejectHandler = Box::new(move |reason| {
            (&mut *callback.borrow_mut())()?;
            Err(reason)
        });
        self.then(Some(on_fulfilled), Some(on_rejected))
    }

    fn attach(
        &self,
        on_fulfilled: Option<FulfillHandler>,
        on_rejected: Option<RejectHandler>,
        child: Promise,
    ) {
        let mut inner = self.inner.borrow_mut();
        inner.rejection_handled = true;
        let outcome = match &inner.state {
            PromiseState::Pending => None,
            PromiseState::Fulfilled(value) => Some(Ok(value.clone())),
            PromiseState::Rejected(reason) => Some(Err(reason.clone())),
        };
        let reaction = Reaction {
            on_fulfilled,
            on_rejected,
            child,
        };
        match outcome {
            None => inner.reactions.push(reaction),
            Some(outcome) => {
                drop(inner);
                self.schedule_reaction(reaction, outcome);
            }
        }
    }

    fn schedule_reaction(&self, reaction: Reaction, outcome: Result<Value, RuntimeError>) {
        self.event_loop.enqueue_reaction(move || {
            let Reaction {
                mut on_fulfilled,
                mut on_rejected,
                child,
            } = reaction;
            let completion = match outcome {
                Ok(value) => match on_fulfilled.as_mut() {
                    Some(handler) => handler(value),
                    None => Ok(value),
                },
                Err(reason) => match on_rejected.as_mut() {
                    Some(handler) => handler(reason),
                    None => Err(reason),
                },
            };
            child.settle_with(completion);
            Ok(Value::Undefined)
        });
    }

    /// Hands the rejection reason to the loop's sweep if it is still
    /// unhandled and unreported, marking it reported.
    pub(crate) fn take_unreported_rejection(&self) -> Option<RuntimeError> {
        let mut inner = self.inner.borrow_mut();
        if inner.rejection_handled || inner.rejection_reported {
            return None;
        }
        let reason = match &inner.state {
            PromiseState::Rejected(reason) => reason.clone(),
            _ => return None,
        };
        inner.rejection_reported = true;
        Some(reason)
    }
}

impl std::fmt::Debug for Promise {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Promise")
            .field("state", &inner.state)
            .field("reactions", &inner.reactions.len())
            .finish_non_exhaustive()
    }
}

/// Extracts a promise handle from a value, if it wraps one.
///
/// This is the explicit adoption check used by [`Promise::resolve`]: a
/// tagged inspection of [`Value::NativeObject`], not duck typing.
pub fn as_promise(value: &Value) -> Option<Promise> {
    match value {
        Value::NativeObject(object) => object.borrow().downcast_ref::<Promise>().cloned(),
        _ => None,
    }
}

/// Returns true if the value wraps a promise handle.
pub fn is_promise(value: &Value) -> bool {
    as_promise(value).is_some()
}
