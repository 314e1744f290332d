//! Cross-platform system detection: CPU, GPU, RAM, OS for all vendors.
//!
//! Collected once per run, strictly before the timed window. Everything here
//! is best-effort: a missing tool degrades the report, it never fails the
//! benchmark.

use std::process::Command;

use sysinfo::System;
use wattbench_core::{fingerprint_uuid, CpuReport, GpuReport, OsReport, RamReport, SystemReport};

/// Collect the full hardware snapshot.
pub fn collect_system_report() -> SystemReport {
    let mut sys = System::new_all();
    sys.refresh_all();

    let os = collect_os();
    let cpu = collect_cpu(&sys);
    let ram = collect_ram(&sys);
    let gpu = collect_gpus(&ram);
    let machine_uuid = fingerprint_uuid(&os, &cpu, &ram, &gpu);

    SystemReport { os, cpu, ram, gpu, machine_uuid }
}

/// Run a tool and return stdout on a zero exit; anything else is `None`.
fn run_tool(program: &str, args: &[&str]) -> Option<String> {
    match Command::new(program).args(args).output() {
        Ok(out) if out.status.success() => Some(String::from_utf8_lossy(&out.stdout).into_owned()),
        Ok(_) => None,
        Err(e) => {
            tracing::debug!(program, error = %e, "hardware probe failed to launch");
            None
        }
    }
}

fn collect_os() -> OsReport {
    let platform = std::env::consts::OS;
    let (os_name, os_version) = match platform {
        "macos" => (
            "macOS".to_string(),
            run_tool("sw_vers", &["-productVersion"])
                .map(|v| v.trim().to_string())
                .unwrap_or_default(),
        ),
        "linux" => {
            let version = run_tool("lsb_release", &["-d", "-s"])
                .map(|v| v.trim().to_string())
                .or_else(|| {
                    std::fs::read_to_string("/etc/os-release")
                        .ok()
                        .and_then(|content| parse_os_release(&content))
                })
                .unwrap_or_default();
            ("Linux".to_string(), version)
        }
        "windows" => (
            "Windows".to_string(),
            run_tool(
                "powershell.exe",
                &["(Get-CimInstance Win32_OperatingSystem).Caption"],
            )
            .map(|v| v.trim().to_string())
            .unwrap_or_default(),
        ),
        other => (other.to_string(), String::new()),
    };

    OsReport {
        platform: platform.to_string(),
        os_name,
        os_version: if os_version.is_empty() { "unknown".to_string() } else { os_version },
        architecture: std::env::consts::ARCH.to_string(),
    }
}

fn parse_os_release(content: &str) -> Option<String> {
    content
        .lines()
        .find_map(|line| line.strip_prefix("PRETTY_NAME="))
        .map(|v| v.trim().trim_matches('"').to_string())
}

fn collect_cpu(sys: &System) -> CpuReport {
    let brand = sys
        .cpus()
        .first()
        .map(|c| c.brand().trim().to_string())
        .filter(|b| !b.is_empty());

    // sysinfo's brand string is empty on some ARM platforms; fall back to the
    // OS-native query.
    let cpu_name = brand
        .or_else(cpu_name_from_tools)
        .unwrap_or_else(|| "unknown".to_string());

    CpuReport {
        cpu_name,
        physical_cores: sys.physical_core_count(),
        logical_cores: sys.cpus().len(),
    }
}

fn cpu_name_from_tools() -> Option<String> {
    match std::env::consts::OS {
        "macos" => run_tool("sysctl", &["-n", "machdep.cpu.brand_string"])
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty()),
        "linux" => std::fs::read_to_string("/proc/cpuinfo").ok().and_then(|content| {
            content
                .lines()
                .find(|l| l.to_lowercase().starts_with("model name"))
                .and_then(|l| l.split(':').nth(1))
                .map(|v| v.trim().to_string())
        }),
        "windows" => run_tool("powershell.exe", &["(Get-CimInstance Win32_Processor).Name"])
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty()),
        _ => None,
    }
}

fn collect_ram(sys: &System) -> RamReport {
    const GB: f64 = 1024.0 * 1024.0 * 1024.0;
    RamReport {
        total_gb: wattbench_core::round2(sys.total_memory() as f64 / GB),
        available_gb: wattbench_core::round2(sys.available_memory() as f64 / GB),
    }
}

/// Detect all GPUs across all vendors, in a fixed vendor order.
fn collect_gpus(ram: &RamReport) -> Vec<GpuReport> {
    let mut gpus = Vec::new();

    gpus.extend(detect_gpu_nvidia(ram));
    if std::env::consts::OS == "macos" {
        gpus.extend(detect_gpu_apple(ram));
    }
    if std::env::consts::OS == "linux" {
        gpus.extend(detect_gpu_amd_linux());
        gpus.extend(detect_gpu_intel_linux());
    }
    if std::env::consts::OS == "windows" {
        // WMI catches whatever the vendor tools missed (AMD on Windows etc).
        let known: Vec<String> = gpus.iter().map(|g| g.name.to_lowercase()).collect();
        gpus.extend(
            detect_gpu_windows_wmi()
                .into_iter()
                .filter(|g| !known.contains(&g.name.to_lowercase())),
        );
    }

    if gpus.is_empty() {
        gpus.push(GpuReport {
            vendor: "None".to_string(),
            name: "No dedicated GPU detected".to_string(),
            vram_mb: None,
            memory_type: None,
            driver: None,
        });
    }
    gpus
}

fn detect_gpu_nvidia(ram: &RamReport) -> Vec<GpuReport> {
    run_tool(
        "nvidia-smi",
        &[
            "--query-gpu=name,memory.total,driver_version",
            "--format=csv,noheader,nounits",
        ],
    )
    .map(|out| parse_nvidia_gpu_csv(&out, ram))
    .unwrap_or_default()
}

fn parse_nvidia_gpu_csv(output: &str, ram: &RamReport) -> Vec<GpuReport> {
    let mut gpus = Vec::new();
    for line in output.lines() {
        let parts: Vec<&str> = line.split(',').map(str::trim).collect();
        if parts.len() < 3 || parts[0].is_empty() {
            continue;
        }
        // Jetson-class boards report "[N/A]" for VRAM; they share system RAM.
        let (vram_mb, memory_type) = match parts[1].parse::<f64>() {
            Ok(mb) => (Some(mb as u64), "dedicated"),
            Err(_) => (Some((ram.total_gb * 1024.0) as u64), "unified"),
        };
        let driver = match parts[2] {
            "" | "N/A" | "[N/A]" => None,
            d => Some(d.to_string()),
        };
        gpus.push(GpuReport {
            vendor: "NVIDIA".to_string(),
            name: parts[0].to_string(),
            vram_mb,
            memory_type: Some(memory_type.to_string()),
            driver,
        });
    }
    gpus
}

fn detect_gpu_apple(ram: &RamReport) -> Vec<GpuReport> {
    let Some(out) = run_tool("system_profiler", &["SPHardwareDataType"]) else {
        return Vec::new();
    };
    for line in out.lines() {
        if let Some(chip) = line.split_once("Chip:").map(|(_, v)| v.trim()) {
            if chip.starts_with("Apple") {
                return vec![GpuReport {
                    vendor: "Apple".to_string(),
                    name: chip.to_string(),
                    // Unified memory: the GPU shares system RAM.
                    vram_mb: Some((ram.total_gb * 1024.0) as u64),
                    memory_type: Some("unified".to_string()),
                    driver: Some("Metal".to_string()),
                }];
            }
        }
    }
    Vec::new()
}

fn detect_gpu_amd_linux() -> Vec<GpuReport> {
    let mut gpus = Vec::new();

    if let Some(out) = run_tool("rocm-smi", &["--showproductname"]) {
        for line in out.lines() {
            if line.to_lowercase().contains("card series") {
                if let Some(name) = line.split(':').next_back().map(str::trim) {
                    if !name.is_empty() {
                        gpus.push(GpuReport {
                            vendor: "AMD".to_string(),
                            name: name.to_string(),
                            vram_mb: None,
                            memory_type: Some("dedicated".to_string()),
                            driver: None,
                        });
                    }
                }
            }
        }
        if !gpus.is_empty() {
            if let Some(out) = run_tool("rocm-smi", &["--showmeminfo", "vram"]) {
                if let Some(vram_mb) = parse_rocm_vram_total(&out) {
                    gpus[0].vram_mb = Some(vram_mb);
                }
            }
        }
    }

    // Fallback: rocminfo lists marketing names even when rocm-smi is absent.
    if gpus.is_empty() {
        if let Some(out) = run_tool("rocminfo", &[]) {
            for line in out.lines() {
                if let Some(name) = line.split_once("Marketing Name:").map(|(_, v)| v.trim()) {
                    if !name.is_empty() && name != "N/A" && !name.contains("Intel") {
                        gpus.push(GpuReport {
                            vendor: "AMD".to_string(),
                            name: name.to_string(),
                            vram_mb: None,
                            memory_type: Some("dedicated".to_string()),
                            driver: None,
                        });
                    }
                }
            }
        }
    }

    gpus
}

/// rocm-smi `--showmeminfo vram` prints `... Total Memory (B): <bytes>`.
fn parse_rocm_vram_total(output: &str) -> Option<u64> {
    for line in output.lines() {
        if !line.contains("Total") {
            continue;
        }
        let parts: Vec<&str> = line.split_whitespace().collect();
        if let Some(pos) = parts.iter().position(|p| *p == "Total") {
            if let Some(bytes) = parts.get(pos + 2).and_then(|v| v.parse::<u64>().ok()) {
                return Some(bytes / (1024 * 1024));
            }
        }
    }
    None
}

fn detect_gpu_intel_linux() -> Vec<GpuReport> {
    let Some(out) = run_tool("lspci", &[]) else {
        return Vec::new();
    };
    out.lines()
        .filter(|line| line.contains("VGA") && line.contains("Intel"))
        .filter_map(|line| line.split(':').next_back())
        .map(|name| GpuReport {
            vendor: "Intel".to_string(),
            name: name.trim().to_string(),
            vram_mb: None,
            memory_type: Some("shared".to_string()),
            driver: None,
        })
        .collect()
}

fn detect_gpu_windows_wmi() -> Vec<GpuReport> {
    run_tool(
        "powershell.exe",
        &["Get-CimInstance Win32_VideoController | ForEach-Object { $_.Name + '|' + $_.AdapterRAM + '|' + $_.DriverVersion }"],
    )
    .map(|out| parse_wmi_gpus(&out))
    .unwrap_or_default()
}

fn parse_wmi_gpus(output: &str) -> Vec<GpuReport> {
    let mut gpus = Vec::new();
    for line in output.lines() {
        let parts: Vec<&str> = line.trim().split('|').collect();
        let Some(name) = parts.first().map(|n| n.trim()).filter(|n| !n.is_empty()) else {
            continue;
        };
        // The Basic Display Adapter is a software device, not hardware.
        if name.contains("Microsoft") {
            continue;
        }
        let vram_mb = parts
            .get(1)
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(|bytes| bytes / (1024 * 1024));
        let driver = parts
            .get(2)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(str::to_string);

        let lower = name.to_lowercase();
        let vendor = if ["nvidia", "geforce", "rtx", "gtx"].iter().any(|v| lower.contains(v)) {
            "NVIDIA"
        } else if lower.contains("amd") || lower.contains("radeon") {
            "AMD"
        } else if lower.contains("intel") {
            "Intel"
        } else {
            "Unknown"
        };

        gpus.push(GpuReport {
            vendor: vendor.to_string(),
            name: name.to_string(),
            vram_mb,
            memory_type: Some("dedicated".to_string()),
            driver,
        });
    }
    gpus
}
