//! Capacity reserve for demand uncertainty.

use std::collections::VecDeque;

use serde::Serialize;

use crate::config::BufferConfig;

/// Capacity figures used for one solve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CapacityState {
    pub configured: f64,
    pub buffer: f64,
    /// `max(0, configured - buffer)`
    pub effective: f64,
    /// Set when the buffer swallowed the whole capacity.
    pub clamped: bool,
}

impl CapacityState {
    pub fn unbuffered(capacity: f64) -> Self {
        Self {
            configured: capacity,
            buffer: 0.0,
            effective: capacity,
            clamped: false,
        }
    }
}

/// Trailing window of aggregate demand, one sample per tick.
#[derive(Debug, Clone)]
pub struct DemandHistory {
    window: usize,
    samples: VecDeque<f64>,
}

impl DemandHistory {
    pub fn new(window: usize) -> Self {
        Self {
            window,
            samples: VecDeque::with_capacity(window),
        }
    }

    pub fn record(&mut self, aggregate_demand: f64) {
        if self.samples.len() == self.window {
            self.samples.pop_front();
        }
        self.samples.push_back(aggregate_demand);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.samples.len() >= self.window
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    /// Sample standard deviation (n - 1) once the window is full.
    ///
    /// A single-sample window has no spread and reports zero.
    pub fn sample_std(&self) -> Option<f64> {
        if !self.is_full() {
            return None;
        }
        let n = self.samples.len();
        if n < 2 {
            return Some(0.0);
        }
        let mean = self.samples.iter().sum::<f64>() / n as f64;
        let var = self
            .samples
            .iter()
            .map(|x| (x - mean).powi(2))
            .sum::<f64>()
            / (n - 1) as f64;
        Some(var.sqrt())
    }
}

/// `buffer = β · σ_demand`, applied once the history window is full.
#[derive(Debug, Clone, Copy)]
pub struct RobustBuffer {
    coefficient: f64,
}

impl RobustBuffer {
    pub fn new(cfg: &BufferConfig) -> Self {
        Self {
            coefficient: cfg.coefficient,
        }
    }

    pub fn capacity_state(&self, capacity: f64, history: &DemandHistory) -> CapacityState {
        if self.coefficient == 0.0 {
            return CapacityState::unbuffered(capacity);
        }
        let Some(sigma) = history.sample_std() else {
            return CapacityState::unbuffered(capacity);
        };

        let buffer = self.coefficient * sigma;
        let clamped = buffer > capacity;
        if clamped {
            tracing::warn!(
                capacity = capacity,
                buffer = %format!("{:.3}", buffer),
                coefficient = self.coefficient,
                sigma = %format!("{:.3}", sigma),
                "Capacity buffer exceeds configured capacity, effective capacity clamped to zero; \
                 buffer.coefficient is likely misconfigured"
            );
        }

        CapacityState {
            configured: capacity,
            buffer,
            effective: (capacity - buffer).max(0.0),
            clamped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history(samples: &[f64], window: usize) -> DemandHistory {
        let mut h = DemandHistory::new(window);
        for &s in samples {
            h.record(s);
        }
        h
    }

    #[test]
    fn no_buffer_until_window_fills() {
        let buffer = RobustBuffer::new(&BufferConfig {
            coefficient: 2.0,
            window: 4,
        });
        let h = history(&[10.0, 90.0, 10.0], 4);
        assert_eq!(buffer.capacity_state(100.0, &h), CapacityState::unbuffered(100.0));
    }

    #[test]
    fn buffer_uses_sample_std() {
        let buffer = RobustBuffer::new(&BufferConfig {
            coefficient: 1.0,
            window: 4,
        });
        // mean 5, squared deviations 9+1+1+9 = 20, sample variance 20/3.
        let h = history(&[2.0, 4.0, 6.0, 8.0], 4);
        let state = buffer.capacity_state(100.0, &h);
        let expected = (20.0_f64 / 3.0).sqrt();
        assert!((state.buffer - expected).abs() < 1e-12);
        assert!((state.effective - (100.0 - expected)).abs() < 1e-12);
        assert!(!state.clamped);
    }

    #[test]
    fn window_drops_old_samples() {
        let h = history(&[1000.0, 5.0, 5.0], 2);
        assert_eq!(h.len(), 2);
        assert_eq!(h.sample_std(), Some(0.0));
    }

    #[test]
    fn zero_coefficient_keeps_exact_capacity() {
        let buffer = RobustBuffer::new(&BufferConfig {
            coefficient: 0.0,
            window: 2,
        });
        let h = history(&[1.0, 500.0], 2);
        let state = buffer.capacity_state(100.0, &h);
        assert_eq!(state.effective, 100.0);
        assert_eq!(state.buffer, 0.0);
    }

    #[test]
    fn clamps_to_zero_and_flags() {
        let buffer = RobustBuffer::new(&BufferConfig {
            coefficient: 10.0,
            window: 2,
        });
        let h = history(&[0.0, 100.0], 2);
        let state = buffer.capacity_state(100.0, &h);
        assert_eq!(state.effective, 0.0);
        assert!(state.clamped);
    }

    #[test]
    fn single_sample_window_has_no_spread() {
        let buffer = RobustBuffer::new(&BufferConfig {
            coefficient: 3.0,
            window: 1,
        });
        let h = history(&[40.0], 1);
        assert_eq!(buffer.capacity_state(100.0, &h).effective, 100.0);
    }
}
