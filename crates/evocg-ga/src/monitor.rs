//! Convergence detection over a sliding window of best objectives.

/// Remembers the best objective of the last `window` generations.
///
/// A search counts as converged once it has run longer than the window and
/// the best objective now equals the one recorded `window - 1` generations
/// ago.
#[derive(Debug, Clone)]
pub struct ConvergenceMonitor {
    buffer: Vec<f64>,
}

impl ConvergenceMonitor {
    /// `window` is clamped to at least one slot.
    pub fn new(window: usize) -> Self {
        Self {
            buffer: vec![f64::NAN; window.max(1)],
        }
    }

    pub fn window(&self) -> usize {
        self.buffer.len()
    }

    pub fn record(&mut self, generation: u64, best: f64) {
        let slot = self.slot(generation);
        self.buffer[slot] = best;
    }

    pub fn is_converged(&self, generation: u64) -> bool {
        let window = self.buffer.len() as u64;
        generation > window
            && self.buffer[self.slot(generation)] == self.buffer[self.slot(generation + 1)]
    }

    /// True once `generation` has passed the generation limit.
    pub fn exceeded(generation: u64, max_generations: u64) -> bool {
        generation > max_generations
    }

    fn slot(&self, generation: u64) -> usize {
        (generation % self.buffer.len() as u64) as usize
    }
}
