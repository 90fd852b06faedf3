mod profiler;

pub use profiler::Profiler;
