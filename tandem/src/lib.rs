//! Double-buffered command dispatch for thread-affine graphics APIs.
//!
//! Producers record instructions into the write half of a pair of buffers
//! while a dedicated rendering thread executes the other half. A second worker
//! drains a resource queue on a context that shares objects with the rendering
//! one. Results come back as futures, and GPU objects are released through
//! reference counted handles.
//!
//! [`RenderingMode::Synchronous`] runs everything inline on the calling thread
//! instead, which helps when debugging ordering problems.

pub mod config;
pub mod context;
pub mod dispatch;
pub mod rendering;
pub mod utils;

pub use config::{RendererConfig, RenderingMode};
pub use context::headless::{DeviceCall, DeviceLogEntry, HeadlessWindowSystem};
pub use context::{ContextError, WindowSystem};
pub use dispatch::future::{Future, FutureError, Promise, SharedFuture};
pub use dispatch::instruction::{Instruction, OpCode, QueueKind};
pub use rendering::*;

pub use ::tandem_utils;
pub use ::tracing;
