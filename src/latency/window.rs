// Latency Window - Rolling round-trip samples for one peer
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

/// Number of samples kept per peer
pub const LATENCY_WINDOW_CAPACITY: usize = 5;

/// Most recent round-trip times for a peer, newest first, in milliseconds.
///
/// Eviction is by insertion order: a late result from an older probe still
/// lands at the front and pushes the oldest entry out.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<f64>", into = "Vec<f64>")]
pub struct LatencyWindow {
    samples: VecDeque<f64>,
}

impl LatencyWindow {
    /// Create an empty window
    pub fn new() -> Self {
        Self {
            samples: VecDeque::with_capacity(LATENCY_WINDOW_CAPACITY + 1),
        }
    }

    /// Push a sample (milliseconds) to the front, evicting the tail at capacity
    pub fn push(&mut self, latency_ms: f64) {
        self.samples.push_front(latency_ms);
        self.samples.truncate(LATENCY_WINDOW_CAPACITY);
    }

    /// Push a measured round-trip time
    pub fn push_rtt(&mut self, rtt: Duration) {
        self.push(rtt.as_secs_f64() * 1000.0);
    }

    /// Samples, newest first
    pub fn values(&self) -> Vec<f64> {
        self.samples.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Samples arrive newest first; anything past capacity is dropped
impl From<Vec<f64>> for LatencyWindow {
    fn from(mut samples: Vec<f64>) -> Self {
        samples.truncate(LATENCY_WINDOW_CAPACITY);
        Self {
            samples: samples.into(),
        }
    }
}

impl From<LatencyWindow> for Vec<f64> {
    fn from(window: LatencyWindow) -> Self {
        window.samples.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_newest_first() {
        let mut window = LatencyWindow::new();
        window.push(10.0);
        window.push(20.0);
        assert_eq!(window.values(), vec![20.0, 10.0]);
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut window = LatencyWindow::new();
        for i in 1..=8 {
            window.push(i as f64);
            assert!(window.len() <= LATENCY_WINDOW_CAPACITY);
        }
        assert_eq!(window.values(), vec![8.0, 7.0, 6.0, 5.0, 4.0]);
    }

    #[test]
    fn test_rtt_in_milliseconds() {
        let mut window = LatencyWindow::new();
        window.push_rtt(Duration::from_micros(12_500));
        assert_eq!(window.values(), vec![12.5]);
    }

    #[test]
    fn test_deserialize_keeps_newest_within_capacity() {
        let window: LatencyWindow = serde_json::from_str("[1,2,3,4,5,6,7,8]").unwrap();
        assert_eq!(window.len(), LATENCY_WINDOW_CAPACITY);
        assert_eq!(window.values(), vec![1.0, 2.0, 3.0, 4.0, 5.0]);

        let short: LatencyWindow = serde_json::from_str("[3.5]").unwrap();
        assert_eq!(short.values(), vec![3.5]);
    }

    #[test]
    fn test_serializes_as_array() {
        let mut window = LatencyWindow::new();
        window.push(1.0);
        window.push(2.0);
        assert_eq!(serde_json::to_string(&window).unwrap(), "[2.0,1.0]");
    }
}
