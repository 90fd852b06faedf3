//! Synchronous dispatch: every instruction executes on the calling thread
//! before the call that issued it returns.
//!
//! Executing an instruction may issue more instructions, typically deletions
//! from handles released by it. Those are queued behind the running one and
//! executed before the outermost call returns, so the order each queue sees is
//! the same as with worker threads.

use crate::config::{RendererConfig, RenderingMode};
use crate::context::WindowSystem;
use crate::dispatch::executor::Executor;
use crate::dispatch::instruction::{INSTRUCTION_SLOT_SIZE, Instruction, QueueKind};
use crate::dispatch::{Dispatch, check_route};
use crate::rendering::error::{DispatchError, OverflowErr, ShutDownErr};
use parking_lot::ReentrantMutex;
use snafu::ensure;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::thread::ThreadId;
use tracing::{debug, error, info};

struct ImmediateState {
    executor: RefCell<Executor>,
    pending: RefCell<VecDeque<Instruction>>,
    running: Cell<bool>,
    bound_thread: Cell<Option<ThreadId>>,
}

pub(crate) struct ImmediateDispatch {
    state: ReentrantMutex<ImmediateState>,
    write_index: AtomicUsize,
    rendering_capacity: usize,
    resource_slots: usize,
    closed: AtomicBool,
}

impl ImmediateDispatch {
    pub fn new(
        config: &RendererConfig,
        window: Arc<dyn WindowSystem>,
    ) -> Result<Arc<Self>, DispatchError> {
        let context = window.create_context(&config.rendering_thread_name, None)?;

        let dispatch = Arc::new_cyclic(|weak: &Weak<Self>| {
            let weak: Weak<dyn Dispatch> = weak.clone();
            let executor = Executor::new(
                config.rendering_thread_name.clone(),
                None,
                context,
                window,
                weak,
                config.poll_device_errors,
            );

            Self {
                state: ReentrantMutex::new(ImmediateState {
                    executor: RefCell::new(executor),
                    pending: RefCell::new(VecDeque::new()),
                    running: Cell::new(false),
                    bound_thread: Cell::new(None),
                }),
                write_index: AtomicUsize::new(0),
                rendering_capacity: config.rendering_buffer_size,
                resource_slots: config.resource_buffer_size / INSTRUCTION_SLOT_SIZE,
                closed: AtomicBool::new(false),
            }
        });

        {
            let state = dispatch.state.lock();
            dispatch.bind(&state)?;
        }

        info!("Started synchronous dispatch");
        Ok(dispatch)
    }

    fn bind(&self, state: &ImmediateState) -> Result<(), DispatchError> {
        let current = std::thread::current().id();
        if state.bound_thread.get() != Some(current) {
            state.executor.borrow_mut().bind()?;
            if state.bound_thread.replace(Some(current)).is_some() {
                debug!("Moved the graphics context to {current:?}");
            }
        }
        Ok(())
    }

    fn check_capacity(&self, queue: QueueKind, instruction: &Instruction) -> Result<(), DispatchError> {
        let required = instruction.encoded_size();
        let (fits, capacity) = match queue {
            QueueKind::Rendering => (required <= self.rendering_capacity, self.rendering_capacity),
            QueueKind::Resource => (
                self.resource_slots > 0,
                self.resource_slots * INSTRUCTION_SLOT_SIZE,
            ),
        };

        ensure!(
            fits,
            OverflowErr {
                queue,
                required,
                available: capacity,
                capacity,
            }
        );
        Ok(())
    }

    fn execute(&self, instruction: Instruction) -> Result<(), DispatchError> {
        let state = self.state.lock();
        state.pending.borrow_mut().push_back(instruction);

        if state.running.replace(true) {
            // Re-entered from an instruction that is executing right now.
            return Ok(());
        }

        if let Err(e) = self.bind(&state) {
            state.running.set(false);
            let dropped = std::mem::take(&mut *state.pending.borrow_mut());
            drop(dropped);
            return Err(e);
        }

        loop {
            let next = state.pending.borrow_mut().pop_front();
            let Some(instruction) = next else {
                break;
            };
            state.executor.borrow_mut().execute(instruction);
        }

        state.running.set(false);
        Ok(())
    }
}

impl Dispatch for ImmediateDispatch {
    fn push(&self, queue: QueueKind, instruction: Instruction) -> Result<(), DispatchError> {
        check_route(queue, &instruction)?;
        ensure!(!self.closed.load(Ordering::Acquire), ShutDownErr);
        self.check_capacity(queue, &instruction)?;

        self.execute(instruction)
    }

    fn release(&self, queue: QueueKind, instruction: Instruction) -> Result<(), DispatchError> {
        check_route(queue, &instruction)?;
        ensure!(!self.closed.load(Ordering::Acquire), ShutDownErr);

        self.execute(instruction)
    }

    fn swap_rendering_queues(&self) -> Result<(), DispatchError> {
        ensure!(!self.closed.load(Ordering::Acquire), ShutDownErr);
        self.write_index.fetch_xor(1, Ordering::AcqRel);
        Ok(())
    }

    fn swap_buffers(&self) -> Result<(), DispatchError> {
        self.push(QueueKind::Rendering, Instruction::SwapBuffers)?;
        self.swap_rendering_queues()
    }

    fn flush(&self) -> Result<(), DispatchError> {
        ensure!(!self.closed.load(Ordering::Acquire), ShutDownErr);
        Ok(())
    }

    fn shutdown(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        let state = self.state.lock();
        if state.running.get() {
            error!("Synchronous dispatch was shut down while executing");
        }
        state.executor.borrow().log_summary();
        info!("Synchronous dispatch shut down");
    }

    fn mode(&self) -> RenderingMode {
        RenderingMode::Synchronous
    }
}
