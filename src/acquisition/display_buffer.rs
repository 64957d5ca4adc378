// src/acquisition/display_buffer.rs
//! Fixed-capacity buffer for live plotting

use std::collections::VecDeque;

/// Drop-oldest buffer, pre-filled with zeros so a plot has a full x-axis from
/// the first frame.
#[derive(Debug, Clone)]
pub struct DisplayBuffer {
    samples: VecDeque<f64>,
    capacity: usize,
}

impl DisplayBuffer {
    /// A zero capacity is raised to one sample
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: std::iter::repeat(0.0).take(capacity).collect(),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Always equal to the capacity
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn push(&mut self, value: f64) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(value);
    }

    pub fn extend_from_slice(&mut self, values: &[f64]) {
        // Only the newest `capacity` values can survive
        let start = values.len().saturating_sub(self.capacity);
        for &value in &values[start..] {
            self.push(value);
        }
    }

    /// Oldest first
    pub fn iter(&self) -> impl Iterator<Item = &f64> {
        self.samples.iter()
    }

    pub fn latest(&self) -> Option<f64> {
        self.samples.back().copied()
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.samples.iter().copied().collect()
    }

    /// Back to all zeros
    pub fn reset(&mut self) {
        self.samples.iter_mut().for_each(|v| *v = 0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefilled_with_zeros() {
        let buffer = DisplayBuffer::new(4);
        assert_eq!(buffer.len(), 4);
        assert_eq!(buffer.to_vec(), vec![0.0; 4]);
    }

    #[test]
    fn test_drops_oldest() {
        let mut buffer = DisplayBuffer::new(3);
        buffer.extend_from_slice(&[1.0, 2.0]);
        assert_eq!(buffer.to_vec(), vec![0.0, 1.0, 2.0]);
        buffer.extend_from_slice(&[3.0, 4.0, 5.0, 6.0]);
        assert_eq!(buffer.to_vec(), vec![4.0, 5.0, 6.0]);
        assert_eq!(buffer.latest(), Some(6.0));
        assert_eq!(buffer.len(), buffer.capacity());
    }

    #[test]
    fn test_reset() {
        let mut buffer = DisplayBuffer::new(2);
        buffer.push(9.0);
        buffer.reset();
        assert_eq!(buffer.to_vec(), vec![0.0, 0.0]);
    }

    #[test]
    fn test_zero_capacity_raised() {
        let mut buffer = DisplayBuffer::new(0);
        buffer.push(1.0);
        assert_eq!(buffer.to_vec(), vec![1.0]);
    }
}
