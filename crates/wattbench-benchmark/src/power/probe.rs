//! Vendor power probes: bounded external tool invocations and the pure
//! parsers that turn their free-text output into wattage readings.

use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use tokio::process::Command;
use tokio::time::timeout;
use wattbench_core::{round2, PowerMethod};

/// Hard bound on every vendor tool invocation; a hung probe costs at most one
/// tick and can never starve the sampling loop.
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// One reading source behind the sampler. `sample` is best-effort: every
/// failure maps to `None`, never an error.
#[async_trait]
pub trait PowerProbe: Send + Sync {
    fn method(&self) -> PowerMethod;

    /// Take a single reading, in watts. `None` means "no sample this tick".
    async fn sample(&self) -> Option<f64>;
}

/// Probe backed by the external tool the detected method names.
pub struct VendorProbe {
    method: PowerMethod,
}

impl VendorProbe {
    pub fn new(method: PowerMethod) -> Self {
        Self { method }
    }
}

#[async_trait]
impl PowerProbe for VendorProbe {
    fn method(&self) -> PowerMethod {
        self.method
    }

    async fn sample(&self) -> Option<f64> {
        let output = run_probe(self.method).await?;
        let watts = parse_output(self.method, &output)?;
        (watts > 0.0).then_some(watts)
    }
}

/// Probe vendor tools in fixed priority order and fix the method for the
/// sampler's lifetime. NVIDIA first (works on every OS), then AMD on Linux,
/// then powermetrics on macOS. No re-probing happens later, even if a call
/// starts failing mid-run.
pub async fn detect_method() -> Option<PowerMethod> {
    if let Some(out) = run_probe(PowerMethod::NvidiaSmi).await {
        if !out.trim().is_empty() {
            return Some(PowerMethod::NvidiaSmi);
        }
    }

    if cfg!(target_os = "linux") && run_probe(PowerMethod::RocmSmi).await.is_some() {
        return Some(PowerMethod::RocmSmi);
    }

    if cfg!(target_os = "macos") && run_probe(PowerMethod::Powermetrics).await.is_some() {
        return Some(PowerMethod::Powermetrics);
    }

    None
}

fn probe_command(method: PowerMethod) -> Command {
    let mut cmd = match method {
        PowerMethod::NvidiaSmi => {
            let mut c = Command::new("nvidia-smi");
            c.args(["--query-gpu=power.draw", "--format=csv,noheader,nounits"]);
            c
        }
        PowerMethod::RocmSmi => {
            let mut c = Command::new("rocm-smi");
            c.arg("--showpower");
            c
        }
        PowerMethod::Powermetrics => {
            // powermetrics needs root; `sudo -n` fails immediately instead of
            // hanging on a password prompt when no sudoers entry exists
            let mut c = Command::new("sudo");
            c.args(["-n", "powermetrics", "-n", "1", "-i", "100", "--samplers", "gpu_power"]);
            c
        }
    };
    cmd.kill_on_drop(true);
    cmd
}

/// Invoke the vendor tool once. Spawn failure, timeout, or non-zero exit all
/// yield `None`.
async fn run_probe(method: PowerMethod) -> Option<String> {
    match timeout(PROBE_TIMEOUT, probe_command(method).output()).await {
        Ok(Ok(out)) if out.status.success() => {
            Some(String::from_utf8_lossy(&out.stdout).into_owned())
        }
        Ok(Ok(out)) => {
            tracing::debug!(
                method = method.as_str(),
                code = out.status.code(),
                "power probe exited non-zero"
            );
            None
        }
        Ok(Err(e)) => {
            tracing::debug!(method = method.as_str(), error = %e, "power probe failed to launch");
            None
        }
        Err(_) => {
            tracing::debug!(method = method.as_str(), "power probe timed out");
            None
        }
    }
}

fn parse_output(method: PowerMethod, output: &str) -> Option<f64> {
    match method {
        PowerMethod::NvidiaSmi => parse_nvidia_smi(output),
        PowerMethod::RocmSmi => parse_rocm_smi(output),
        PowerMethod::Powermetrics => parse_powermetrics(output),
    }
}

/// nvidia-smi with `--format=csv,noheader,nounits` prints one wattage per
/// line, one line per GPU. Any unparseable line (e.g. `[N/A]`) invalidates
/// the whole reading.
fn parse_nvidia_smi(output: &str) -> Option<f64> {
    let mut total = 0.0;
    let mut seen = false;
    for line in output.lines() {
        let val = line.trim();
        if val.is_empty() {
            continue;
        }
        total += val.parse::<f64>().ok()?;
        seen = true;
    }
    seen.then(|| round2(total))
}

fn rocm_power_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)graphics package power\s*\((?:w|watts)\)\s*:\s*([0-9]+(?:\.[0-9]+)?)")
            .expect("rocm power regex is valid")
    })
}

/// rocm-smi `--showpower` prints one
/// `GPU[i] : <...> Graphics Package Power (W): <value>` line per device.
/// Matching that exact field keeps unrelated numeric columns out of the sum.
fn parse_rocm_smi(output: &str) -> Option<f64> {
    let mut total = 0.0;
    let mut seen = false;
    for cap in rocm_power_regex().captures_iter(output) {
        if let Ok(w) = cap[1].parse::<f64>() {
            total += w;
            seen = true;
        }
    }
    (seen && total > 0.0).then(|| round2(total))
}

/// powermetrics reports `GPU Power: <n> mW`.
fn parse_powermetrics(output: &str) -> Option<f64> {
    for line in output.lines() {
        if !line.contains("GPU Power") {
            continue;
        }
        let value = line.split(':').nth(1)?.trim().split_whitespace().next()?;
        let mw = value.parse::<f64>().ok()?;
        return Some(round2(mw / 1000.0));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nvidia_sums_across_gpus() {
        assert_eq!(parse_nvidia_smi("215.37\n"), Some(215.37));
        assert_eq!(parse_nvidia_smi("215.37\n102.63\n"), Some(318.0));
    }

    #[test]
    fn nvidia_rejects_unparseable_output() {
        assert_eq!(parse_nvidia_smi(""), None);
        assert_eq!(parse_nvidia_smi("[N/A]\n"), None);
        assert_eq!(parse_nvidia_smi("215.37\n[N/A]\n"), None);
    }

    #[test]
    fn rocm_matches_the_package_power_line() {
        let out = "\
========================= ROCm System Management Interface =========================\n\
=================================== Power Usage ====================================\n\
GPU[0]\t\t: Average Graphics Package Power (W): 87.0\n\
GPU[1]\t\t: Average Graphics Package Power (W): 42.5\n\
====================================================================================\n";
        assert_eq!(parse_rocm_smi(out), Some(129.5));
    }

    #[test]
    fn rocm_accepts_the_current_socket_variant() {
        let out = "GPU[0]\t\t: Current Socket Graphics Package Power (W): 35.125\n";
        assert_eq!(parse_rocm_smi(out), Some(35.13));
    }

    #[test]
    fn rocm_ignores_unrelated_numbers() {
        // Clock and temperature rows must not leak into the wattage sum.
        let out = "\
GPU[0]\t\t: Temperature (Sensor edge) (C): 64.0\n\
GPU[0]\t\t: sclk clock speed: (1800Mhz)\n";
        assert_eq!(parse_rocm_smi(out), None);
    }

    #[test]
    fn powermetrics_converts_milliwatts() {
        let out = "**** GPU usage ****\n\nGPU Power: 9240 mW\n";
        assert_eq!(parse_powermetrics(out), Some(9.24));
        assert_eq!(parse_powermetrics("no power here"), None);
    }
}
