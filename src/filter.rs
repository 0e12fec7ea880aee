/*
 * This file is part of hal-xadc.
 *
 * Copyright (C) 2025 hal-xadc contributors
 *
 * hal-xadc is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * hal-xadc is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with hal-xadc. If not, see <https://www.gnu.org/licenses/>.
 */

use std::collections::VecDeque;

/// Moving-average low pass filter over the last `capacity` raw samples.
#[derive(Debug, Clone)]
pub struct MovingAverage {
    samples: VecDeque<f64>,
    capacity: usize,
    mean: Option<f64>,
}

impl MovingAverage {
    /// `capacity` is clamped to at least one sample.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
            mean: None,
        }
    }

    /// Push a sample, evicting the oldest one at capacity, and return the new mean.
    pub fn push(&mut self, value: f64) -> f64 {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(value);
        // Recomputed from scratch so rounding drift never accumulates
        let mean = self.samples.iter().sum::<f64>() / self.samples.len() as f64;
        self.mean = Some(mean);
        mean
    }

    /// Mean of the samples currently held, `None` before the first sample.
    pub fn mean(&self) -> Option<f64> {
        self.mean
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn samples(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_filter_has_no_mean() {
        let f = MovingAverage::new(4);
        assert!(f.is_empty());
        assert_eq!(f.mean(), None);
    }

    #[test]
    fn test_running_mean_before_full() {
        let mut f = MovingAverage::new(10);
        assert_eq!(f.push(100.0), 100.0);
        assert_eq!(f.push(200.0), 150.0);
        assert_eq!(f.push(300.0), 200.0);
        assert_eq!(f.len(), 3);
    }

    #[test]
    fn test_oldest_sample_evicted() {
        let mut f = MovingAverage::new(3);
        for v in [1.0, 2.0, 3.0, 4.0, 5.0] {
            f.push(v);
        }
        assert_eq!(f.len(), 3);
        assert_eq!(f.samples().collect::<Vec<_>>(), vec![3.0, 4.0, 5.0]);
        assert_eq!(f.mean(), Some(4.0));
    }

    #[test]
    fn test_window_never_exceeds_capacity() {
        let mut f = MovingAverage::new(5);
        for i in 0..100 {
            f.push(i as f64);
            assert!(f.len() <= 5);
            let expected: f64 = f.samples().sum::<f64>() / f.len() as f64;
            assert_eq!(f.mean(), Some(expected));
        }
        // last five are 95..=99
        assert_eq!(f.mean(), Some(97.0));
    }

    #[test]
    fn test_zero_capacity_clamped() {
        let mut f = MovingAverage::new(0);
        assert_eq!(f.capacity(), 1);
        f.push(7.0);
        assert_eq!(f.push(9.0), 9.0);
    }
}
