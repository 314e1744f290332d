//! Result transport: payload assembly, local save, remote submission.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use wattbench_core::{
    BenchmarkRun, CpuReport, GpuReport, OsReport, PowerStats, PromptResult, RamReport, Result,
    ScoreRecord, SystemReport, WattbenchError,
};

const PAYLOAD_VERSION: &str = "1.0.0";
const SUBMIT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemSection {
    pub os: OsReport,
    pub cpu: CpuReport,
    pub ram: RamReport,
    pub gpu: Vec<GpuReport>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkSection {
    pub model: String,
    pub duration_s: f64,
}

/// The full document POSTed to the collector endpoint and saved locally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payload {
    pub version: String,
    pub timestamp: String,
    pub machine_uuid: String,
    pub system: SystemSection,
    pub ollama_version: String,
    pub benchmark: BenchmarkSection,
    pub scores: ScoreRecord,
    pub power: PowerStats,
    pub results: Vec<PromptResult>,
}

pub fn build_payload(system: &SystemReport, run: &BenchmarkRun, ollama_version: &str) -> Payload {
    Payload {
        version: PAYLOAD_VERSION.to_string(),
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        machine_uuid: system.machine_uuid.clone(),
        system: SystemSection {
            os: system.os.clone(),
            cpu: system.cpu.clone(),
            ram: system.ram.clone(),
            gpu: system.gpu.clone(),
        },
        ollama_version: ollama_version.to_string(),
        benchmark: BenchmarkSection {
            model: run.model.clone(),
            duration_s: run.benchmark_duration_s,
        },
        scores: run.scores.clone(),
        power: run.power.clone(),
        results: run.results.clone(),
    }
}

/// Write the payload to a local JSON file and return its path.
pub fn save_local(payload: &Payload, path: &Path) -> Result<PathBuf> {
    let json = serde_json::to_string_pretty(payload)?;
    std::fs::write(path, json)?;
    Ok(path.to_path_buf())
}

/// POST the payload to the collector. Success is a 200 or 201 response.
pub async fn submit(payload: &Payload, endpoint: &str) -> Result<()> {
    tracing::info!(endpoint, "submitting results");

    let client = reqwest::Client::new();
    let resp = client
        .post(endpoint)
        .json(payload)
        .timeout(SUBMIT_TIMEOUT)
        .send()
        .await
        .map_err(|e| WattbenchError::Submit(e.to_string()))?;

    let status = resp.status();
    if matches!(status.as_u16(), 200 | 201) {
        tracing::info!("results submitted");
        Ok(())
    } else {
        let body = resp.text().await.unwrap_or_default();
        Err(WattbenchError::Submit(format!(
            "HTTP {} - {}",
            status,
            &body[..body.len().min(200)]
        )))
    }
}
