// Domain modules
pub mod config;
pub mod error;
pub mod metrics;
pub mod power;
pub mod prompts;
pub mod system;

pub use config::{BenchmarkConfig, OllamaConfig, SubmitConfig, WattbenchConfig};
pub use error::{Result, WattbenchError};
pub use metrics::{
    round2, round4, BenchmarkRun, PromptFailure, PromptMetrics, PromptResult, ScoreRecord,
};
pub use power::{PowerMethod, PowerStats};
pub use prompts::{PromptSpec, BENCHMARK_MODEL, BENCHMARK_PROMPTS, WARMUP_PROMPT};
pub use system::{fingerprint_uuid, CpuReport, GpuReport, OsReport, RamReport, SystemReport};
