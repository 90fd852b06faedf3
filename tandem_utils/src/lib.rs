mod engine_args;
mod logging;
pub mod sizes;

pub use engine_args::EngineArgs;

pub use tracing;
