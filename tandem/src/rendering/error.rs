use crate::context::ContextError;
use crate::dispatch::instruction::{OpCode, QueueKind};
use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(context(suffix(Err)), visibility(pub))]
pub enum DispatchError {
    #[snafu(display(
        "The {queue} queue is full: {required} bytes required, {available} of {capacity} available"
    ))]
    Overflow {
        queue: QueueKind,
        required: usize,
        available: usize,
        capacity: usize,
    },

    #[snafu(display("{opcode} can't be executed by the {queue} queue"))]
    Misrouted { opcode: OpCode, queue: QueueKind },

    #[snafu(display("The renderer was shut down"))]
    ShutDown,

    #[snafu(display("The rendering thread can't swap its own queues"))]
    SwapFromRenderingThread,

    #[snafu(display("Graphics context error: {source}"))]
    Context { source: ContextError },

    #[snafu(display("Failed to spawn the {name} thread: {source}"))]
    SpawnThread {
        name: String,
        source: std::io::Error,
    },
}

impl From<ContextError> for DispatchError {
    fn from(source: ContextError) -> Self {
        DispatchError::Context { source }
    }
}
