//! One-shot result channel between the thread that issues an instruction and
//! the thread that executes it.
//!
//! A [`Promise`] is fulfilled exactly once by whoever executes the instruction.
//! Fulfilling consumes the promise, so a second fulfilment doesn't compile.
//! Dropping a promise without fulfilling it *breaks* the channel, and any
//! waiter wakes up with [`FutureError::BrokenPromise`] instead of blocking
//! forever.
//!
//! A [`Future`] has a single reader. Instructions that need to read the same
//! result (e.g. several draws using one vertex array) take a [`SharedFuture`]
//! instead, which can be cloned freely and hands out clones of the value.

use parking_lot::{Condvar, Mutex};
use snafu::Snafu;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Snafu)]
pub enum FutureError {
    #[snafu(display("The promise was dropped before it was fulfilled"))]
    BrokenPromise,

    #[snafu(display("The value of this future was already retrieved"))]
    AlreadyRetrieved,
}

enum SlotState<T> {
    Pending,
    Fulfilled(T),
    Retrieved,
    Broken,
}

struct Slot<T> {
    state: Mutex<SlotState<T>>,
    ready: Condvar,
}

impl<T> Slot<T> {
    fn settle(&self, state: SlotState<T>) {
        let mut guard = self.state.lock();
        *guard = state;
        drop(guard);
        self.ready.notify_all();
    }
}

/// Creates a connected promise/future pair.
pub fn channel<T>() -> (Promise<T>, Future<T>) {
    let slot = Arc::new(Slot {
        state: Mutex::new(SlotState::Pending),
        ready: Condvar::new(),
    });

    (
        Promise {
            slot: Some(slot.clone()),
        },
        Future { slot },
    )
}

/// Writing end of the channel.
pub struct Promise<T> {
    slot: Option<Arc<Slot<T>>>,
}

impl<T> Promise<T> {
    pub fn fulfill(mut self, value: T) {
        if let Some(slot) = self.slot.take() {
            slot.settle(SlotState::Fulfilled(value));
        }
    }
}

impl<T> Drop for Promise<T> {
    fn drop(&mut self) {
        if let Some(slot) = self.slot.take() {
            slot.settle(SlotState::Broken);
        }
    }
}

impl<T> Debug for Promise<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Promise").finish_non_exhaustive()
    }
}

/// Reading end of the channel, single consumer.
pub struct Future<T> {
    slot: Arc<Slot<T>>,
}

impl<T> Future<T> {
    /// Blocks until the promise is fulfilled or broken.
    pub fn wait(self) -> Result<T, FutureError> {
        let mut state = self.slot.state.lock();
        loop {
            match std::mem::replace(&mut *state, SlotState::Retrieved) {
                SlotState::Pending => {
                    *state = SlotState::Pending;
                    self.slot.ready.wait(&mut state);
                }
                SlotState::Fulfilled(value) => return Ok(value),
                SlotState::Retrieved => return Err(FutureError::AlreadyRetrieved),
                SlotState::Broken => {
                    *state = SlotState::Broken;
                    return Err(FutureError::BrokenPromise);
                }
            }
        }
    }

    /// Takes the value if it is there, without blocking.
    ///
    /// Returns `None` while the promise is still pending.
    pub fn try_take(&mut self) -> Option<Result<T, FutureError>> {
        let mut state = self.slot.state.lock();
        match std::mem::replace(&mut *state, SlotState::Retrieved) {
            SlotState::Pending => {
                *state = SlotState::Pending;
                None
            }
            SlotState::Fulfilled(value) => Some(Ok(value)),
            SlotState::Retrieved => Some(Err(FutureError::AlreadyRetrieved)),
            SlotState::Broken => {
                *state = SlotState::Broken;
                Some(Err(FutureError::BrokenPromise))
            }
        }
    }

    /// Returns true once the promise was either fulfilled or broken.
    pub fn is_ready(&self) -> bool {
        !matches!(*self.slot.state.lock(), SlotState::Pending)
    }

    pub fn share(self) -> SharedFuture<T> {
        SharedFuture { slot: self.slot }
    }
}

impl<T> Debug for Future<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Future")
            .field("ready", &self.is_ready())
            .finish()
    }
}

/// A future that any number of readers can wait on.
pub struct SharedFuture<T> {
    slot: Arc<Slot<T>>,
}

impl<T> Clone for SharedFuture<T> {
    fn clone(&self) -> Self {
        Self {
            slot: self.slot.clone(),
        }
    }
}

impl<T: Clone> SharedFuture<T> {
    /// A future that is already resolved to `value`.
    pub fn ready(value: T) -> Self {
        let (promise, future) = channel();
        promise.fulfill(value);
        future.share()
    }

    pub fn wait(&self) -> Result<T, FutureError> {
        let mut state = self.slot.state.lock();
        loop {
            match &*state {
                SlotState::Pending => self.slot.ready.wait(&mut state),
                SlotState::Fulfilled(value) => return Ok(value.clone()),
                SlotState::Broken => return Err(FutureError::BrokenPromise),
                SlotState::Retrieved => return Err(FutureError::AlreadyRetrieved),
            }
        }
    }

    pub fn try_get(&self) -> Option<Result<T, FutureError>> {
        match &*self.slot.state.lock() {
            SlotState::Pending => None,
            SlotState::Fulfilled(value) => Some(Ok(value.clone())),
            SlotState::Broken => Some(Err(FutureError::BrokenPromise)),
            SlotState::Retrieved => Some(Err(FutureError::AlreadyRetrieved)),
        }
    }
}

impl<T> SharedFuture<T> {
    pub fn is_ready(&self) -> bool {
        !matches!(*self.slot.state.lock(), SlotState::Pending)
    }
}

impl<T> From<Future<T>> for SharedFuture<T> {
    fn from(future: Future<T>) -> Self {
        future.share()
    }
}

impl<T> Debug for SharedFuture<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedFuture")
            .field("ready", &self.is_ready())
            .finish()
    }
}
