//! Bounded rolling window of outcome observations

use std::collections::VecDeque;

/// Default number of outcomes kept per context
pub const DEFAULT_WINDOW: usize = 50;

/// Recent agree/disagree observations for one context, oldest first
#[derive(Debug, Clone)]
pub struct OutcomeWindow {
    /// `true` = the inference disagreed with the observed outcome
    observations: VecDeque<bool>,
    capacity: usize,
}

impl OutcomeWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            observations: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Record an outcome, evicting the oldest one when full
    pub fn record(&mut self, disagreed: bool) {
        self.observations.push_back(disagreed);
        if self.observations.len() > self.capacity {
            self.observations.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.observations.clear();
    }

    /// Counts over the last `last` outcomes, as `(observed, disagreements)`.
    ///
    /// `pending` is an outcome not yet recorded; it is counted as the most
    /// recent observation.
    pub fn tally(&self, last: usize, pending: Option<bool>) -> (usize, usize) {
        let last = last.max(1);
        let from_window = if pending.is_some() { last - 1 } else { last };
        let recorded = self
            .observations
            .iter()
            .rev()
            .take(from_window);

        let mut observed = 0;
        let mut disagreements = 0;
        for &disagreed in recorded.chain(pending.iter()) {
            observed += 1;
            if disagreed {
                disagreements += 1;
            }
        }
        (observed, disagreements)
    }

    /// Disagreement rate over the last `last` outcomes, `None` when empty
    pub fn disagreement_rate(&self, last: usize, pending: Option<bool>) -> Option<f64> {
        match self.tally(last, pending) {
            (0, _) => None,
            (observed, disagreements) => Some(disagreements as f64 / observed as f64),
        }
    }
}

impl Default for OutcomeWindow {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}
