//! Blocking primitives for handing buffers between producers and workers.

use crossbeam_channel::{Receiver, Sender, TryRecvError, TrySendError};
use parking_lot::{Condvar, Mutex};
use tandem_utils::debug_panic;

/// Binary semaphore. A token in the channel means the gate is open.
#[derive(Debug)]
pub struct Gate {
    name: &'static str,
    tx: Sender<()>,
    rx: Receiver<()>,
}

impl Gate {
    pub fn new(name: &'static str, open: bool) -> Self {
        let (tx, rx) = crossbeam_channel::bounded(1);
        if open {
            let _ = tx.try_send(());
        }
        Self { name, tx, rx }
    }

    /// Blocks until the gate is open, then closes it behind us.
    pub fn acquire(&self) {
        profiling::scope!("gate acquire", self.name);
        if self.rx.recv().is_err() {
            // Both ends live in self, the channel can't disconnect.
            debug_panic!("Gate {} disconnected", self.name);
        }
    }

    pub fn try_acquire(&self) -> bool {
        match self.rx.try_recv() {
            Ok(()) => true,
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => false,
        }
    }

    pub fn release(&self) {
        match self.tx.try_send(()) {
            Ok(()) => {}
            Err(TrySendError::Full(())) => {
                debug_panic!("Gate {} released twice", self.name);
            }
            Err(TrySendError::Disconnected(())) => {
                debug_panic!("Gate {} disconnected", self.name);
            }
        }
    }

    pub fn is_open(&self) -> bool {
        !self.rx.is_empty()
    }
}

/// Counting semaphore, one token per queued item.
#[derive(Debug)]
pub struct Semaphore {
    tx: Sender<()>,
    rx: Receiver<()>,
}

impl Default for Semaphore {
    fn default() -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self { tx, rx }
    }
}

impl Semaphore {
    pub fn post(&self) {
        let _ = self.tx.send(());
    }

    pub fn wait(&self) {
        let _ = self.rx.recv();
    }

    pub fn count(&self) -> usize {
        self.rx.len()
    }
}

/// Counts items that were queued but not yet fully processed.
#[derive(Debug, Default)]
pub struct IdleTracker {
    in_flight: Mutex<usize>,
    idle: Condvar,
}

impl IdleTracker {
    pub fn begin(&self) {
        *self.in_flight.lock() += 1;
    }

    pub fn end(&self) {
        let mut in_flight = self.in_flight.lock();
        match in_flight.checked_sub(1) {
            Some(n) => *in_flight = n,
            None => debug_panic!("IdleTracker ended more work than it began"),
        }
        if *in_flight == 0 {
            self.idle.notify_all();
        }
    }

    pub fn in_flight(&self) -> usize {
        *self.in_flight.lock()
    }

    pub fn is_idle(&self) -> bool {
        self.in_flight() == 0
    }

    pub fn wait_idle(&self) {
        let mut in_flight = self.in_flight.lock();
        while *in_flight != 0 {
            self.idle.wait(&mut in_flight);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn gate_blocks_until_released() {
        let gate = Arc::new(Gate::new("test", false));
        assert!(!gate.try_acquire());

        let opener = {
            let gate = gate.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(10));
                gate.release();
            })
        };

        gate.acquire();
        assert!(!gate.is_open());
        opener.join().unwrap();
    }

    #[test]
    fn open_gate_admits_once() {
        let gate = Gate::new("test", true);
        assert!(gate.is_open());
        assert!(gate.try_acquire());
        assert!(!gate.try_acquire());
        gate.release();
        assert!(gate.try_acquire());
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "released twice")]
    fn double_release_is_a_usage_error() {
        let gate = Gate::new("test", true);
        gate.release();
    }

    #[test]
    fn semaphore_counts_posts() {
        let sem = Semaphore::default();
        sem.post();
        sem.post();
        assert_eq!(sem.count(), 2);
        sem.wait();
        sem.wait();
        assert_eq!(sem.count(), 0);
    }

    #[test]
    fn idle_tracker_wakes_waiter() {
        let tracker = Arc::new(IdleTracker::default());
        tracker.begin();
        tracker.begin();

        let worker = {
            let tracker = tracker.clone();
            thread::spawn(move || {
                tracker.end();
                thread::sleep(Duration::from_millis(5));
                tracker.end();
            })
        };

        tracker.wait_idle();
        assert!(tracker.is_idle());
        worker.join().unwrap();
    }
}
