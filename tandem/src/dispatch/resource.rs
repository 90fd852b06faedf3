//! Resource queue, drained one instruction at a time by the resource thread.

use crate::dispatch::executor::{Executor, Flow};
use crate::dispatch::instruction::{Instruction, QueueKind};
use crate::dispatch::linear_buffer::BufferFull;
use crate::dispatch::ring_buffer::RingBuffer;
use crate::dispatch::sync::{IdleTracker, Semaphore};
use crate::rendering::error::{DispatchError, OverflowErr};
use parking_lot::Mutex;
use tandem_utils::debug_panic;
use tracing::{debug, instrument};

pub(crate) struct ResourceQueue {
    ring: Mutex<RingBuffer>,
    queued: Semaphore,
    in_flight: IdleTracker,
}

impl ResourceQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            ring: Mutex::new(RingBuffer::new(capacity)),
            queued: Semaphore::default(),
            in_flight: IdleTracker::default(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.ring.lock().capacity()
    }

    pub fn push(&self, instruction: Instruction) -> Result<(), DispatchError> {
        self.in_flight.begin();

        let rejected = self.ring.lock().push(instruction).err();
        if let Some(BufferFull {
            instruction,
            required,
            available,
        }) = rejected
        {
            drop(instruction);
            self.in_flight.end();
            return OverflowErr {
                queue: QueueKind::Resource,
                required,
                available,
                capacity: self.capacity(),
            }
            .fail();
        }

        self.queued.post();
        Ok(())
    }

    /// Queues a deletion from a released handle. Never refused for lack of
    /// space, since the handle is gone by now.
    pub fn release(&self, instruction: Instruction) {
        self.in_flight.begin();

        let opcode = instruction.opcode();
        if self.ring.lock().push_or_park(instruction) {
            debug!("Resource queue is full, parked {opcode:?}");
        }

        self.queued.post();
    }

    /// Whether every pushed instruction was executed and dropped.
    pub fn is_idle(&self) -> bool {
        self.in_flight.is_idle()
    }

    #[instrument(skip_all)]
    pub fn wait_idle(&self) {
        self.in_flight.wait_idle();
    }

    /// Resource thread loop. Returns once a `Quit` was executed.
    pub fn run(&self, executor: &mut Executor) {
        loop {
            self.queued.wait();

            let Some(instruction) = self.ring.lock().pop() else {
                debug_panic!("The resource queue was posted without an instruction");
                continue;
            };

            let flow = executor.execute(instruction);
            self.in_flight.end();

            if flow == Flow::Quit {
                executor.log_summary();
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::instruction::INSTRUCTION_SLOT_SIZE;

    #[test]
    fn push_counts_in_flight_work() {
        let queue = ResourceQueue::new(4 * INSTRUCTION_SLOT_SIZE);
        assert!(queue.is_idle());

        queue.push(Instruction::delete_buffer(1)).unwrap();
        queue.push(Instruction::Quit).unwrap();
        assert!(!queue.is_idle());
        assert_eq!(queue.queued.count(), 2);
    }

    #[test]
    fn release_goes_through_a_full_queue() {
        let queue = ResourceQueue::new(INSTRUCTION_SLOT_SIZE);
        queue.push(Instruction::Quit).unwrap();

        queue.release(Instruction::delete_buffer(4));
        assert_eq!(queue.ring.lock().parked(), 1);
        assert_eq!(queue.in_flight.in_flight(), 2);
        assert_eq!(queue.queued.count(), 2);
    }

    #[test]
    fn rejected_push_leaves_queue_idle() {
        let queue = ResourceQueue::new(INSTRUCTION_SLOT_SIZE);
        queue.push(Instruction::Quit).unwrap();

        let err = queue.push(Instruction::delete_shader(2)).unwrap_err();
        assert!(matches!(
            err,
            DispatchError::Overflow {
                queue: QueueKind::Resource,
                ..
            }
        ));
        assert_eq!(queue.in_flight.in_flight(), 1);
        assert_eq!(queue.queued.count(), 1);
    }
}
