pub mod hardware;
pub mod ollama;
pub mod power;
pub mod runner;
pub mod score;
pub mod submit;

pub use hardware::collect_system_report;
pub use ollama::{GenerateOptions, GenerateStats, InferenceEngine, OllamaClient};
pub use power::{PowerProbe, PowerSampler, VendorProbe};
pub use runner::BenchmarkRunner;
pub use score::compute_score;
pub use submit::{build_payload, save_local, submit, BenchmarkSection, Payload, SystemSection};
