//! Instruction dispatch: the queues, the workers draining them and the two
//! dispatchers tying them together.

pub(crate) mod executor;
pub mod future;
pub(crate) mod immediate;
pub mod instruction;
pub mod linear_buffer;
pub(crate) mod rendering;
pub(crate) mod resource;
pub mod ring_buffer;
pub(crate) mod sync;
pub(crate) mod threaded;

use crate::config::RenderingMode;
use crate::dispatch::instruction::{Instruction, QueueKind};
use crate::rendering::error::{DispatchError, MisroutedErr};
use snafu::ensure;

/// Upper bound on drain rounds before shutdown gives up waiting for quiescence.
pub(crate) const MAX_SHUTDOWN_ROUNDS: usize = 16;

/// Moves instructions from producers to whoever executes them.
pub(crate) trait Dispatch: Send + Sync {
    fn push(&self, queue: QueueKind, instruction: Instruction) -> Result<(), DispatchError>;

    fn push_rendering(&self, instruction: Instruction) -> Result<(), DispatchError> {
        self.push(QueueKind::Rendering, instruction)
    }

    fn push_resource(&self, instruction: Instruction) -> Result<(), DispatchError> {
        self.push(QueueKind::Resource, instruction)
    }

    /// Queues the deletion of a released handle. Unlike [`Dispatch::push`] it
    /// is not subject to the queue capacity, only fails once shut down.
    fn release(&self, queue: QueueKind, instruction: Instruction) -> Result<(), DispatchError>;

    /// Ends the current frame. Blocks while the previous one is still rendering.
    fn swap_rendering_queues(&self) -> Result<(), DispatchError>;

    /// Queues a buffer swap as the last instruction of the frame and ends it.
    fn swap_buffers(&self) -> Result<(), DispatchError>;

    /// Ends the current frame and waits until it was rendered.
    fn flush(&self) -> Result<(), DispatchError>;

    /// Drains both queues, stops the workers and rejects further instructions.
    fn shutdown(&self);

    fn mode(&self) -> RenderingMode;
}

pub(crate) fn check_route(queue: QueueKind, instruction: &Instruction) -> Result<(), DispatchError> {
    let opcode = instruction.opcode();
    ensure!(opcode.accepts(queue), MisroutedErr { opcode, queue });
    Ok(())
}
