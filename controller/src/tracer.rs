//! Rolling record of input arrivals.

/// Fixed-size ring of per-tick outcomes: `true` when the expected input
/// arrived in time, `false` for a miss.
#[derive(Debug, Clone)]
pub struct NetworkTracer {
    history: Vec<bool>,
    cursor: usize,
}

impl NetworkTracer {
    /// Creates a tracer remembering `frames` ticks, all marked as arrived.
    #[must_use]
    pub fn new(frames: usize) -> Self {
        Self {
            history: vec![true; frames],
            cursor: 0,
        }
    }

    /// Marks every remembered tick as arrived.
    pub fn reset(&mut self) {
        self.history.fill(true);
        self.cursor = 0;
    }

    pub fn notify_arrived(&mut self) {
        self.record(true);
    }

    pub fn notify_missing(&mut self) {
        self.record(false);
    }

    /// Misses within the window.
    #[must_use]
    pub fn missing_packets(&self) -> usize {
        self.history.iter().filter(|arrived| !**arrived).count()
    }

    #[must_use]
    pub fn window(&self) -> usize {
        self.history.len()
    }

    fn record(&mut self, arrived: bool) {
        if self.history.is_empty() {
            return;
        }
        self.cursor = (self.cursor + 1) % self.history.len();
        self.history[self.cursor] = arrived;
    }
}
