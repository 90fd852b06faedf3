//! Double-buffered rendering queue.
//!
//! Producers fill the *write* buffer while the rendering thread drains the
//! other one. Each buffer has two gates:
//!
//! - its producer gate is open while producers may switch to it, i.e. after
//!   the rendering thread finished draining it,
//! - its consumer gate is open while the rendering thread may drain it, i.e.
//!   after producers retired it with a swap.
//!
//! A swap therefore blocks when the rendering thread is still busy with the
//! previous frame, which keeps producers at most one buffer ahead.
//!
//! The rendering thread itself may push while it drains (handles dropped by
//! executed instructions queue their deletion). It doesn't touch the write
//! index lock for that, since a producer may be holding it while waiting in a
//! swap, and pushes straight into the buffer it is draining instead.
//!
//! Deletions from released handles go through [`RenderingQueue::release`],
//! which parks them in the target buffer when it is full. The same drain
//! executes them after everything else in that buffer.

use crate::dispatch::executor::{Executor, Flow};
use crate::dispatch::instruction::{Instruction, QueueKind};
use crate::dispatch::linear_buffer::{BufferFull, LinearBuffer};
use crate::dispatch::sync::Gate;
use crate::rendering::error::{DispatchError, OverflowErr, SwapFromRenderingThreadErr};
use parking_lot::{Mutex, ReentrantMutex};
use snafu::ensure;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::ThreadId;
use tracing::{debug, instrument, trace};

pub(crate) const INITIAL_WRITE_INDEX: usize = 0;

pub(crate) struct RenderingQueue {
    buffers: [Mutex<LinearBuffer>; 2],
    producer_gates: [Gate; 2],
    consumer_gates: [Gate; 2],
    write_index: AtomicUsize,
    write_lock: ReentrantMutex<()>,
    rendering_thread: OnceLock<ThreadId>,
    capacity: usize,
}

impl RenderingQueue {
    pub fn new(capacity: usize) -> Self {
        let initial = INITIAL_WRITE_INDEX;
        Self {
            buffers: [
                Mutex::new(LinearBuffer::new(capacity)),
                Mutex::new(LinearBuffer::new(capacity)),
            ],
            // Producers start out owning the initial write buffer.
            producer_gates: [
                Gate::new("rendering producer 0", initial != 0),
                Gate::new("rendering producer 1", initial != 1),
            ],
            consumer_gates: [
                Gate::new("rendering consumer 0", false),
                Gate::new("rendering consumer 1", false),
            ],
            write_index: AtomicUsize::new(initial),
            write_lock: ReentrantMutex::new(()),
            rendering_thread: OnceLock::new(),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn write_index(&self) -> usize {
        self.write_index.load(Ordering::Acquire)
    }

    pub fn is_rendering_thread(&self) -> bool {
        self.rendering_thread.get() == Some(&std::thread::current().id())
    }

    pub fn push(&self, instruction: Instruction) -> Result<(), DispatchError> {
        if self.is_rendering_thread() {
            let draining = 1 - self.write_index();
            return self.push_into(draining, instruction);
        }

        let _guard = self.write_lock.lock();
        self.push_into(self.write_index(), instruction)
    }

    /// Queues a deletion from a released handle. Never refused for lack of
    /// space, since the handle is gone by now.
    pub fn release(&self, instruction: Instruction) {
        if self.is_rendering_thread() {
            let draining = 1 - self.write_index();
            self.release_into(draining, instruction);
            return;
        }

        let _guard = self.write_lock.lock();
        self.release_into(self.write_index(), instruction);
    }

    fn release_into(&self, index: usize, instruction: Instruction) {
        let opcode = instruction.opcode();
        if self.buffers[index].lock().push_or_park(instruction) {
            trace!("Rendering buffer {index} is full, parked {opcode:?}");
        }
    }

    fn push_into(&self, index: usize, instruction: Instruction) -> Result<(), DispatchError> {
        let rejected = self.buffers[index].lock().push(instruction).err();
        match rejected {
            None => Ok(()),
            Some(BufferFull {
                instruction,
                required,
                available,
            }) => {
                drop(instruction);
                OverflowErr {
                    queue: QueueKind::Rendering,
                    required,
                    available,
                    capacity: self.capacity,
                }
                .fail()
            }
        }
    }

    #[instrument(skip_all)]
    pub fn swap(&self) -> Result<(), DispatchError> {
        ensure!(!self.is_rendering_thread(), SwapFromRenderingThreadErr);

        let _guard = self.write_lock.lock();
        self.swap_locked();
        Ok(())
    }

    /// Pushes `instruction` as the last one of the current buffer and retires it.
    pub fn push_and_swap(&self, instruction: Instruction) -> Result<(), DispatchError> {
        ensure!(!self.is_rendering_thread(), SwapFromRenderingThreadErr);

        let _guard = self.write_lock.lock();
        self.push_into(self.write_index(), instruction)?;
        self.swap_locked();
        Ok(())
    }

    /// Retires the current buffer and waits until the rendering thread drained it.
    #[instrument(skip_all)]
    pub fn flush(&self) -> Result<(), DispatchError> {
        ensure!(!self.is_rendering_thread(), SwapFromRenderingThreadErr);

        let _guard = self.write_lock.lock();
        let retired = self.write_index();
        self.swap_locked();
        self.producer_gates[retired].acquire();
        self.producer_gates[retired].release();
        Ok(())
    }

    /// Whether nothing was queued since the last swap.
    pub fn is_write_buffer_empty(&self) -> bool {
        let _guard = self.write_lock.lock();
        self.buffers[self.write_index()].lock().is_empty()
    }

    fn swap_locked(&self) {
        profiling::scope!("swap rendering queues");
        let finished = self.write_index();
        let next = 1 - finished;

        self.producer_gates[next].acquire();
        self.write_index.store(next, Ordering::Release);
        self.consumer_gates[finished].release();
    }

    fn pop(&self, index: usize) -> Option<Instruction> {
        self.buffers[index].lock().pop()
    }

    /// Rendering thread loop. Returns once a `Quit` was executed.
    pub fn run(&self, executor: &mut Executor) {
        if self.rendering_thread.set(std::thread::current().id()).is_err() {
            tandem_utils::debug_panic!("The rendering queue was drained by two threads");
        }

        let mut index = INITIAL_WRITE_INDEX ^ 1;
        loop {
            index ^= 1;
            self.consumer_gates[index].acquire();

            let mut flow = Flow::Continue;
            while let Some(instruction) = self.pop(index) {
                flow = executor.execute(instruction);
                if flow == Flow::Quit {
                    break;
                }
            }

            let leftovers = self.buffers[index].lock().reset();
            if !leftovers.is_empty() {
                debug!("Discarding {} instructions queued after quit", leftovers.len());
            }
            drop(leftovers);
            self.producer_gates[index].release();

            profiling::finish_frame!();
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
    use crate::dispatch::instruction::{INSTRUCTION_HEADER_SIZE, OpCode};

    #[test]
    fn producers_start_on_the_initial_buffer() {
        let queue = RenderingQueue::new(1024);
        assert_eq!(queue.write_index(), INITIAL_WRITE_INDEX);
        assert!(!queue.producer_gates[INITIAL_WRITE_INDEX].is_open());
        assert!(queue.producer_gates[INITIAL_WRITE_INDEX ^ 1].is_open());
        assert!(!queue.consumer_gates[0].is_open());
        assert!(!queue.consumer_gates[1].is_open());
    }

    #[test]
    fn swap_hands_the_buffer_to_the_consumer() {
        let queue = RenderingQueue::new(1024);
        queue.push(Instruction::SwapBuffers).unwrap();
        assert!(!queue.is_write_buffer_empty());

        queue.swap().unwrap();
        assert_eq!(queue.write_index(), 1);
        assert!(queue.consumer_gates[0].is_open());
        assert!(!queue.producer_gates[1].is_open());
        assert!(queue.is_write_buffer_empty());
        assert!(queue.pop(0).is_some());
    }

    #[test]
    fn release_parks_in_a_full_buffer() {
        let queue = RenderingQueue::new(INSTRUCTION_HEADER_SIZE);
        queue.push(Instruction::SwapBuffers).unwrap();
        assert!(queue.push(Instruction::delete_vertex_array(1)).is_err());

        queue.release(Instruction::delete_vertex_array(1));
        queue.swap().unwrap();
        assert_eq!(queue.pop(0).map(|i| i.opcode()), Some(OpCode::SwapBuffers));
        assert_eq!(queue.pop(0).map(|i| i.opcode()), Some(OpCode::DeleteVertexArray));
        assert!(queue.pop(0).is_none());
    }

    #[test]
    fn overflow_reports_capacity() {
        let queue = RenderingQueue::new(2);
        let err = queue.push(Instruction::SwapBuffers).unwrap_err();
        assert!(matches!(
            err,
            DispatchError::Overflow {
                queue: QueueKind::Rendering,
                available: 2,
                capacity: 2,
                ..
            }
        ));
        assert!(queue.is_write_buffer_empty());
    }
}
