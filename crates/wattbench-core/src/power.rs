use serde::{Deserialize, Serialize};

use crate::metrics::round2;

/// Which vendor tool the sampler reads power draw from. Discovered once at
/// sampler construction and immutable afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PowerMethod {
    NvidiaSmi,
    RocmSmi,
    Powermetrics,
}

impl PowerMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PowerMethod::NvidiaSmi => "nvidia-smi",
            PowerMethod::RocmSmi => "rocm-smi",
            PowerMethod::Powermetrics => "powermetrics",
        }
    }
}

/// Summary of one sampling window. `available` is false whenever zero samples
/// were collected, even if a method was detected; the numeric fields stay
/// `None` in that case rather than reporting a fake zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerStats {
    pub available: bool,
    pub method: Option<PowerMethod>,
    pub avg_watts: Option<f64>,
    pub max_watts: Option<f64>,
    pub min_watts: Option<f64>,
    pub samples: usize,
}

impl PowerStats {
    pub fn unavailable(method: Option<PowerMethod>) -> Self {
        Self {
            available: false,
            method,
            avg_watts: None,
            max_watts: None,
            min_watts: None,
            samples: 0,
        }
    }

    /// Reduce an ordered sample sequence to summary statistics.
    pub fn from_samples(method: Option<PowerMethod>, samples: &[f64]) -> Self {
        if samples.is_empty() {
            return Self::unavailable(method);
        }
        let sum: f64 = samples.iter().sum();
        let max = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let min = samples.iter().copied().fold(f64::INFINITY, f64::min);
        Self {
            available: true,
            method,
            avg_watts: Some(round2(sum / samples.len() as f64)),
            max_watts: Some(round2(max)),
            min_watts: Some(round2(min)),
            samples: samples.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_samples_are_unavailable() {
        let stats = PowerStats::from_samples(Some(PowerMethod::NvidiaSmi), &[]);
        assert!(!stats.available);
        assert_eq!(stats.method, Some(PowerMethod::NvidiaSmi));
        assert_eq!(stats.avg_watts, None);
        assert_eq!(stats.max_watts, None);
        assert_eq!(stats.min_watts, None);
        assert_eq!(stats.samples, 0);
    }

    #[test]
    fn stats_cover_the_whole_sequence() {
        let stats = PowerStats::from_samples(Some(PowerMethod::RocmSmi), &[100.0, 150.0, 125.0]);
        assert!(stats.available);
        assert_eq!(stats.avg_watts, Some(125.0));
        assert_eq!(stats.max_watts, Some(150.0));
        assert_eq!(stats.min_watts, Some(100.0));
        assert_eq!(stats.samples, 3);
    }

    #[test]
    fn method_serializes_as_tool_name() {
        let json = serde_json::to_string(&PowerMethod::NvidiaSmi).unwrap();
        assert_eq!(json, "\"nvidia-smi\"");
    }
}
