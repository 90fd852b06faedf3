use std::collections::VecDeque;
use std::time::Duration;
use web_time::Instant;

const DEFAULT_RUNNING_SIZE: usize = 120;

/// Accumulates how long a worker spent executing, both over its whole lifetime
/// and over a sliding window of recent samples.
#[derive(Debug, Clone, Default)]
pub struct Profiler {
    recent: VecDeque<Duration>,
    total: Duration,
    samples: u64,
    started: Option<Instant>,
}

impl Profiler {
    pub fn start(&mut self) {
        self.started = Some(Instant::now());
    }

    /// Ends the sample opened by [`Profiler::start`]. Does nothing without one.
    pub fn stop(&mut self) {
        if let Some(started) = self.started.take() {
            self.record(started.elapsed());
        }
    }

    pub fn record(&mut self, sample: Duration) {
        if self.recent.len() >= DEFAULT_RUNNING_SIZE {
            self.recent.pop_front();
        }
        self.recent.push_back(sample);
        self.total += sample;
        self.samples += 1;
    }

    pub fn samples(&self) -> u64 {
        self.samples
    }

    pub fn total(&self) -> Duration {
        self.total
    }

    pub fn average(&self) -> Duration {
        if self.samples == 0 {
            return Duration::ZERO;
        }
        let nanos = self.total.as_nanos() / self.samples as u128;
        Duration::from_nanos(nanos.min(u64::MAX as u128) as u64)
    }

    pub fn recent_mean(&self) -> Duration {
        if self.recent.is_empty() {
            return Duration::ZERO;
        }
        self.recent.iter().sum::<Duration>() / self.recent.len() as u32
    }

    pub fn recent_high(&self) -> Duration {
        self.recent.iter().copied().max().unwrap_or_default()
    }
}
