pub mod logger;
pub mod analyzer;
pub mod sweep;

use crate::error::{SimError, SimResult};
use serde::{Deserialize, Serialize};

pub fn mean_wait(samples: &[f64]) -> SimResult<f64> {
    if samples.is_empty() {
        return Err(SimError::EmptySample);
    }
    Ok(samples.iter().sum::<f64>() / samples.len() as f64)
}

/// Share of samples strictly above `threshold`, in percent.
pub fn percent_exceeding(samples: &[f64], threshold: f64) -> SimResult<f64> {
    if samples.is_empty() {
        return Err(SimError::EmptySample);
    }
    let over = samples.iter().filter(|&&w| w > threshold).count();
    Ok(100.0 * over as f64 / samples.len() as f64)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaitStats {
    pub count: usize,
    pub mean_wait: f64,
    pub max_wait: f64,
    pub threshold: f64,
    pub percent_exceeding: f64,
}

impl WaitStats {
    pub fn from_samples(samples: &[f64], threshold: f64) -> SimResult<Self> {
        Ok(Self {
            count: samples.len(),
            mean_wait: mean_wait(samples)?,
            max_wait: samples.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            threshold,
            percent_exceeding: percent_exceeding(samples, threshold)?,
        })
    }
}

/// Mean wait observed so far, one point per step once somebody has been served.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TracePoint {
    pub time: f64,
    pub mean_wait: f64,
}

/// What a finished run hands to whoever prints or plots it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub name: String,
    pub agents: usize,
    pub end_time: f64,
    pub total_clients: usize,
    pub finished_clients: usize,
    pub stats: WaitStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_of_samples() {
        assert_eq!(mean_wait(&[1.0, 2.0, 6.0]), Ok(3.0));
    }

    #[test]
    fn empty_sample_is_an_error() {
        assert_eq!(mean_wait(&[]), Err(SimError::EmptySample));
        assert_eq!(percent_exceeding(&[], 5.0), Err(SimError::EmptySample));
        assert_eq!(WaitStats::from_samples(&[], 5.0), Err(SimError::EmptySample));
    }

    #[test]
    fn threshold_is_strict() {
        let samples = [0.0, 5.0, 5.0001, 12.0];
        assert_eq!(percent_exceeding(&samples, 5.0), Ok(50.0));
        assert_eq!(percent_exceeding(&samples, 100.0), Ok(0.0));
    }

    #[test]
    fn stats_bundle() {
        let stats = WaitStats::from_samples(&[0.0, 10.0, 2.0, 0.0], 5.0).unwrap();
        assert_eq!(stats.count, 4);
        assert_eq!(stats.mean_wait, 3.0);
        assert_eq!(stats.max_wait, 10.0);
        assert_eq!(stats.percent_exceeding, 25.0);
    }

    #[test]
    fn recomputing_is_identical() {
        let samples: Vec<f64> = (0..97).map(|i| (i as f64 * 0.731).sin().abs() * 9.0).collect();
        let a = WaitStats::from_samples(&samples, 5.0).unwrap();
        let b = WaitStats::from_samples(&samples, 5.0).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.mean_wait.to_bits(), b.mean_wait.to_bits());
    }
}
