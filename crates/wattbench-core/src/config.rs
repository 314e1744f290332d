use serde::{Deserialize, Serialize};

use crate::prompts::BENCHMARK_MODEL;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WattbenchConfig {
    #[serde(default)]
    pub ollama: OllamaConfig,
    #[serde(default)]
    pub benchmark: BenchmarkConfig,
    #[serde(default)]
    pub submit: SubmitConfig,
}

impl Default for WattbenchConfig {
    fn default() -> Self {
        Self {
            ollama: OllamaConfig::default(),
            benchmark: BenchmarkConfig::default(),
            submit: SubmitConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    pub host: String,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: "http://localhost:11434".to_string(),
        }
    }
}

/// Generation settings for the standardized run. Temperature and the output
/// token cap are fixed for every submission so scores stay comparable across
/// machines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkConfig {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            model: BENCHMARK_MODEL.to_string(),
            temperature: 0.7,
            max_tokens: 256,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitConfig {
    pub endpoint: String,
}

impl Default for SubmitConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://benchverz.com/api/llm-bench".to_string(),
        }
    }
}
