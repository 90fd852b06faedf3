use bon::Builder;
use std::fmt::{Display, Formatter};
use tandem_utils::EngineArgs;
use tandem_utils::sizes::KIB;

pub const DEFAULT_RENDERING_BUFFER_SIZE: usize = 256 * KIB;
pub const DEFAULT_RESOURCE_BUFFER_SIZE: usize = 64 * KIB;

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub enum RenderingMode {
    /// Rendering and resource loading run on their own threads.
    #[default]
    Asynchronous,
    /// Everything executes on the calling thread before the call returns.
    Synchronous,
}

impl Display for RenderingMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            RenderingMode::Asynchronous => f.write_str("asynchronous"),
            RenderingMode::Synchronous => f.write_str("synchronous"),
        }
    }
}

#[derive(Debug, Clone, Builder)]
pub struct RendererConfig {
    #[builder(default)]
    pub mode: RenderingMode,
    /// Capacity in bytes of *each* of the two rendering buffers.
    #[builder(default = DEFAULT_RENDERING_BUFFER_SIZE)]
    pub rendering_buffer_size: usize,
    #[builder(default = DEFAULT_RESOURCE_BUFFER_SIZE)]
    pub resource_buffer_size: usize,
    #[builder(into, default = "tandem-rendering".to_owned())]
    pub rendering_thread_name: String,
    #[builder(into, default = "tandem-resources".to_owned())]
    pub resource_thread_name: String,
    /// Drain and log device errors after every instruction.
    #[builder(default = cfg!(debug_assertions))]
    pub poll_device_errors: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl RendererConfig {
    /// Defaults, overridden by whatever was given on the command line.
    pub fn from_args() -> Self {
        Self::from_engine_args(EngineArgs::get())
    }

    pub fn from_engine_args(args: &EngineArgs) -> Self {
        let mode = if args.synchronous {
            RenderingMode::Synchronous
        } else {
            RenderingMode::Asynchronous
        };

        Self::builder()
            .mode(mode)
            .rendering_buffer_size(
                args.rendering_buffer_size()
                    .unwrap_or(DEFAULT_RENDERING_BUFFER_SIZE),
            )
            .resource_buffer_size(
                args.resource_buffer_size()
                    .unwrap_or(DEFAULT_RESOURCE_BUFFER_SIZE),
            )
            .build()
    }
}
