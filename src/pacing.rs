use std::time::Duration;

pub const DEFAULT_TICKS_PER_SECOND: u32 = 10;

/// Converts elapsed wall-clock time into a count of due simulation ticks.
#[derive(Debug, Clone)]
pub struct TickPacer {
    interval: Duration,
    accumulator: Duration,
    running: bool,
}

impl TickPacer {
    pub fn new(ticks_per_second: u32) -> Self {
        let ticks_per_second = ticks_per_second.max(1);
        Self {
            interval: Duration::from_secs(1) / ticks_per_second,
            accumulator: Duration::ZERO,
            running: false,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Starts counting time; nothing accumulates before this.
    pub fn start(&mut self) {
        self.running = true;
    }

    pub fn pause(&mut self) {
        self.running = false;
        self.accumulator = Duration::ZERO;
    }

    /// Adds `elapsed` and returns how many whole ticks are now due.
    pub fn advance(&mut self, elapsed: Duration) -> u32 {
        if !self.running {
            self.accumulator = Duration::ZERO;
            return 0;
        }
        self.accumulator += elapsed;
        let mut due = 0;
        while self.accumulator >= self.interval {
            self.accumulator -= self.interval;
            due += 1;
        }
        due
    }
}

impl Default for TickPacer {
    fn default() -> Self {
        Self::new(DEFAULT_TICKS_PER_SECOND)
    }
}
