use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, timeout, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use wattbench_core::{PowerMethod, PowerStats};

use super::probe::{detect_method, PowerProbe, VendorProbe};

/// How often the background task reads the probe.
const SAMPLE_INTERVAL: Duration = Duration::from_millis(500);
/// How long `stop` waits for the task before abandoning it.
const STOP_TIMEOUT: Duration = Duration::from_secs(2);

/// Best-effort power-draw recorder that runs alongside the benchmark loop.
///
/// The probe is fixed at construction and never re-detected. All probe and
/// parse failures are absorbed here; the benchmark can never fail or stall
/// because power tooling is missing or broken.
pub struct PowerSampler {
    probe: Option<Arc<dyn PowerProbe>>,
    samples: Arc<Mutex<Vec<f64>>>,
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
    last_stats: Option<PowerStats>,
}

impl PowerSampler {
    /// Detect a usable vendor tool and build a sampler around it.
    pub async fn detect() -> Self {
        let probe = match detect_method().await {
            Some(method) => {
                info!(method = method.as_str(), "power monitoring available");
                Some(Arc::new(VendorProbe::new(method)) as Arc<dyn PowerProbe>)
            }
            None => {
                info!("power monitoring not available");
                None
            }
        };
        Self::with_probe(probe)
    }

    /// Build a sampler around an explicit probe, or none at all.
    pub fn with_probe(probe: Option<Arc<dyn PowerProbe>>) -> Self {
        Self {
            probe,
            samples: Arc::new(Mutex::new(Vec::new())),
            token: CancellationToken::new(),
            task: None,
            last_stats: None,
        }
    }

    pub fn method(&self) -> Option<PowerMethod> {
        self.probe.as_ref().map(|p| p.method())
    }

    pub fn is_available(&self) -> bool {
        self.probe.is_some()
    }

    /// Begin background sampling. Without a detected method this is a no-op
    /// and the sampler stays permanently unavailable. Starting resets the
    /// sample sequence and any previously computed stats.
    pub fn start(&mut self) {
        let Some(probe) = self.probe.clone() else {
            return;
        };
        if self.task.is_some() {
            return;
        }

        self.samples.lock().unwrap().clear();
        self.last_stats = None;
        self.token = CancellationToken::new();

        let samples = Arc::clone(&self.samples);
        let token = self.token.clone();
        self.task = Some(tokio::spawn(async move {
            let mut ticker = interval(SAMPLE_INTERVAL);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        // A failed reading is dropped, not recorded as zero,
                        // and non-positive readings never enter the sequence.
                        if let Some(watts) = probe.sample().await {
                            if watts > 0.0 {
                                samples.lock().unwrap().push(watts);
                            }
                        }
                    }
                }
            }
            debug!("power sampling task stopped");
        }));
    }

    /// Stop sampling and return summary statistics.
    ///
    /// The task is halted and joined before the sample buffer is read, so no
    /// append can race the snapshot. The join is bounded: a task stuck inside
    /// a probe invocation is abandoned rather than blocking the run. Repeated
    /// calls (or a call before `start`) return the last computed stats, or an
    /// unavailable record.
    pub async fn stop(&mut self) -> PowerStats {
        if let Some(stats) = &self.last_stats {
            return stats.clone();
        }

        if let Some(mut task) = self.task.take() {
            self.token.cancel();
            if timeout(STOP_TIMEOUT, &mut task).await.is_err() {
                warn!("power sampling task did not stop in time; abandoning it");
                task.abort();
            }
        }

        let stats = {
            let samples = self.samples.lock().unwrap();
            PowerStats::from_samples(self.method(), &samples)
        };
        self.last_stats = Some(stats.clone());
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct FixedProbe {
        watts: f64,
    }

    #[async_trait]
    impl PowerProbe for FixedProbe {
        fn method(&self) -> PowerMethod {
            PowerMethod::NvidiaSmi
        }

        async fn sample(&self) -> Option<f64> {
            (self.watts > 0.0).then_some(self.watts)
        }
    }

    #[tokio::test]
    async fn start_without_method_is_a_noop() {
        let mut sampler = PowerSampler::with_probe(None);
        assert!(!sampler.is_available());
        sampler.start();
        let stats = sampler.stop().await;
        assert!(!stats.available);
        assert_eq!(stats.method, None);
        assert_eq!(stats.samples, 0);
        assert_eq!(stats.avg_watts, None);
    }

    #[tokio::test]
    async fn collects_positive_samples() {
        let mut sampler = PowerSampler::with_probe(Some(Arc::new(FixedProbe { watts: 142.5 })));
        sampler.start();
        // The first interval tick fires immediately; one sample lands before
        // the next tick 500ms out.
        tokio::time::sleep(Duration::from_millis(50)).await;
        let stats = sampler.stop().await;
        assert!(stats.available);
        assert_eq!(stats.method, Some(PowerMethod::NvidiaSmi));
        assert_eq!(stats.samples, 1);
        assert_eq!(stats.avg_watts, Some(142.5));
        assert_eq!(stats.max_watts, Some(142.5));
        assert_eq!(stats.min_watts, Some(142.5));
    }

    /// Probe that violates the `sample` contract by reporting a raw reading.
    struct RawProbe {
        watts: f64,
    }

    #[async_trait]
    impl PowerProbe for RawProbe {
        fn method(&self) -> PowerMethod {
            PowerMethod::RocmSmi
        }

        async fn sample(&self) -> Option<f64> {
            Some(self.watts)
        }
    }

    #[tokio::test]
    async fn non_positive_readings_never_count() {
        let mut sampler = PowerSampler::with_probe(Some(Arc::new(RawProbe { watts: -5.0 })));
        sampler.start();
        tokio::time::sleep(Duration::from_millis(50)).await;
        let stats = sampler.stop().await;
        assert!(!stats.available);
        assert_eq!(stats.samples, 0);
    }

    #[tokio::test]
    async fn failed_probes_never_count() {
        // A probe that can never produce a positive reading.
        let mut sampler = PowerSampler::with_probe(Some(Arc::new(FixedProbe { watts: 0.0 })));
        sampler.start();
        tokio::time::sleep(Duration::from_millis(50)).await;
        let stats = sampler.stop().await;
        assert!(!stats.available);
        // The detected method is still reported for diagnostics.
        assert_eq!(stats.method, Some(PowerMethod::NvidiaSmi));
        assert_eq!(stats.samples, 0);
        assert_eq!(stats.avg_watts, None);
    }

    #[tokio::test]
    async fn stop_is_idempotent() {
        let mut sampler = PowerSampler::with_probe(Some(Arc::new(FixedProbe { watts: 99.0 })));
        sampler.start();
        tokio::time::sleep(Duration::from_millis(50)).await;
        let first = sampler.stop().await;
        let second = sampler.stop().await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn stop_before_start_returns_unavailable() {
        let mut sampler = PowerSampler::with_probe(Some(Arc::new(FixedProbe { watts: 99.0 })));
        let stats = sampler.stop().await;
        assert!(!stats.available);
        assert_eq!(stats.method, Some(PowerMethod::NvidiaSmi));
    }

    #[tokio::test]
    async fn restart_resets_the_sequence() {
        let mut sampler = PowerSampler::with_probe(Some(Arc::new(FixedProbe { watts: 10.0 })));
        sampler.start();
        tokio::time::sleep(Duration::from_millis(50)).await;
        let first = sampler.stop().await;
        assert_eq!(first.samples, 1);

        sampler.start();
        tokio::time::sleep(Duration::from_millis(50)).await;
        let second = sampler.stop().await;
        // Fresh window, not an accumulation of both runs.
        assert_eq!(second.samples, 1);
    }
}
