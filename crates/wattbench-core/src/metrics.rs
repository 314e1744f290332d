use serde::{Deserialize, Serialize};

use crate::power::PowerStats;

/// Round to 2 decimal places for display-stable throughput and score fields.
pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Round to 4 decimal places; efficiency scores are small (tok/s per watt).
pub fn round4(v: f64) -> f64 {
    (v * 10_000.0).round() / 10_000.0
}

fn is_false(b: &bool) -> bool {
    !*b
}

/// Successful per-request measurement. Raw engine durations arrive in
/// nanoseconds and are converted to milliseconds when this record is built;
/// derived rates are rounded once, at that same boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptMetrics {
    pub prompt_id: String,
    pub category: String,
    pub total_duration_ms: f64,
    pub load_duration_ms: f64,
    pub prompt_eval_count: u64,
    pub prompt_eval_duration_ms: f64,
    pub prompt_eval_tps: f64,
    pub eval_count: u64,
    pub eval_duration_ms: f64,
    pub eval_tps: f64,
    pub ttft_ms: f64,
    #[serde(default, skip_serializing_if = "is_false")]
    pub warmup: bool,
}

/// Failed per-request outcome. The run continues past these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptFailure {
    pub prompt_id: String,
    pub category: String,
    pub error: String,
}

/// Outcome of one benchmark request. Serializes flat, so completed and failed
/// entries sit side by side in the submitted results list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PromptResult {
    Completed(PromptMetrics),
    Failed(PromptFailure),
}

impl PromptResult {
    pub fn prompt_id(&self) -> &str {
        match self {
            PromptResult::Completed(m) => &m.prompt_id,
            PromptResult::Failed(f) => &f.prompt_id,
        }
    }

    pub fn as_completed(&self) -> Option<&PromptMetrics> {
        match self {
            PromptResult::Completed(m) => Some(m),
            PromptResult::Failed(_) => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, PromptResult::Failed(_))
    }
}

/// Final score summary. `efficiency_score` is `None` whenever power data was
/// unavailable; absence is distinguishable from a true zero downstream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub performance_score: f64,
    pub efficiency_score: Option<f64>,
    pub avg_prompt_eval_tps: f64,
    pub avg_eval_tps: f64,
    pub avg_ttft_ms: f64,
    pub total_tokens_generated: u64,
    pub total_prompt_tokens: u64,
    pub prompts_completed: usize,
}

/// Everything one invocation produced. Assembled by the runner and handed to
/// the transport as-is; immutable once built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkRun {
    pub model: String,
    pub benchmark_duration_s: f64,
    pub results: Vec<PromptResult>,
    pub scores: ScoreRecord,
    pub power: PowerStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(id: &str) -> PromptMetrics {
        PromptMetrics {
            prompt_id: id.to_string(),
            category: "Reasoning".to_string(),
            total_duration_ms: 1200.0,
            load_duration_ms: 100.0,
            prompt_eval_count: 30,
            prompt_eval_duration_ms: 200.0,
            prompt_eval_tps: 150.0,
            eval_count: 80,
            eval_duration_ms: 900.0,
            eval_tps: 88.89,
            ttft_ms: 300.0,
            warmup: false,
        }
    }

    #[test]
    fn results_serialize_flat() {
        let ok = PromptResult::Completed(metrics("reasoning"));
        let json = serde_json::to_value(&ok).unwrap();
        assert_eq!(json["prompt_id"], "reasoning");
        assert_eq!(json["eval_tps"], 88.89);
        assert!(json.get("warmup").is_none());

        let failed = PromptResult::Failed(PromptFailure {
            prompt_id: "summarization".to_string(),
            category: "Summarization".to_string(),
            error: "connection refused".to_string(),
        });
        let json = serde_json::to_value(&failed).unwrap();
        assert_eq!(json["error"], "connection refused");
        assert!(json.get("eval_tps").is_none());
    }

    #[test]
    fn failure_roundtrips_as_failure() {
        let json = r#"{"prompt_id":"x","category":"Reasoning","error":"boom"}"#;
        let parsed: PromptResult = serde_json::from_str(json).unwrap();
        assert!(parsed.is_failed());
        assert_eq!(parsed.prompt_id(), "x");
    }

    #[test]
    fn warmup_flag_survives_serialization() {
        let mut m = metrics("warmup");
        m.warmup = true;
        let json = serde_json::to_value(PromptResult::Completed(m)).unwrap();
        assert_eq!(json["warmup"], true);
    }

    #[test]
    fn rounding_helpers() {
        assert_eq!(round2(26.499_999), 26.5);
        assert_eq!(round4(0.123_456), 0.1235);
    }
}
