//! Static hardware snapshot types. Collection lives in the benchmark crate;
//! these records travel in the submission payload.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OsReport {
    pub platform: String,
    pub os_name: String,
    pub os_version: String,
    pub architecture: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CpuReport {
    pub cpu_name: String,
    pub physical_cores: Option<usize>,
    pub logical_cores: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RamReport {
    pub total_gb: f64,
    pub available_gb: f64,
}

/// One detected GPU. Unknown quantities stay `None`; a missing VRAM figure
/// is not the same thing as zero VRAM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GpuReport {
    pub vendor: String,
    pub name: String,
    pub vram_mb: Option<u64>,
    pub memory_type: Option<String>,
    pub driver: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemReport {
    pub os: OsReport,
    pub cpu: CpuReport,
    pub ram: RamReport,
    pub gpu: Vec<GpuReport>,
    pub machine_uuid: String,
}

/// Deterministic machine identity: UUIDv5 over the hardware fingerprint, so
/// repeat submissions from the same box collapse to one leaderboard entry.
pub fn fingerprint_uuid(os: &OsReport, cpu: &CpuReport, ram: &RamReport, gpus: &[GpuReport]) -> String {
    let gpu_names: Vec<&str> = gpus.iter().map(|g| g.name.as_str()).collect();
    let fingerprint = format!(
        "{}|{}|{}|{}",
        os.os_name,
        cpu.cpu_name,
        gpu_names.join(", "),
        ram.total_gb
    );
    Uuid::new_v5(&Uuid::NAMESPACE_X500, fingerprint.as_bytes()).to_string()
}
