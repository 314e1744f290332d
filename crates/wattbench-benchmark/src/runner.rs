use std::time::Instant;

use tracing::{info, warn};
use wattbench_core::{
    round2, BenchmarkConfig, BenchmarkRun, PromptFailure, PromptMetrics, PromptResult, PromptSpec,
    BENCHMARK_PROMPTS, WARMUP_PROMPT,
};

use crate::ollama::{GenerateOptions, GenerateStats, InferenceEngine};
use crate::power::PowerSampler;
use crate::score::compute_score;

/// Drives the fixed prompt sequence against the inference engine while the
/// power sampler polls in the background.
///
/// Once the run has begun, individual prompt failures degrade the result set
/// but never abort it; the engine being unreachable is checked by the caller
/// before a runner is ever invoked.
pub struct BenchmarkRunner<E> {
    engine: E,
    config: BenchmarkConfig,
}

impl<E: InferenceEngine> BenchmarkRunner<E> {
    pub fn new(engine: E, config: BenchmarkConfig) -> Self {
        Self { engine, config }
    }

    /// Run one warmup request plus every benchmark prompt in order, then
    /// score whatever completed.
    pub async fn run(&self, sampler: &mut PowerSampler) -> BenchmarkRun {
        self.run_prompts(sampler, BENCHMARK_PROMPTS).await
    }

    pub(crate) async fn run_prompts(
        &self,
        sampler: &mut PowerSampler,
        prompts: &[PromptSpec],
    ) -> BenchmarkRun {
        // Warmup loads the model into memory. Its result is discarded, and a
        // failure here is non-fatal.
        if let PromptResult::Failed(f) = self.run_single(&WARMUP_PROMPT, true).await {
            warn!(error = %f.error, "warmup request failed; continuing");
        }

        sampler.start();
        let started = Instant::now();

        let mut results = Vec::with_capacity(prompts.len());
        for (i, spec) in prompts.iter().enumerate() {
            info!(
                prompt = spec.id,
                category = spec.category,
                "benchmark prompt {}/{}",
                i + 1,
                prompts.len()
            );
            let result = self.run_single(spec, false).await;
            if let PromptResult::Failed(f) = &result {
                warn!(prompt = spec.id, error = %f.error, "prompt failed; continuing");
            }
            results.push(result);
        }

        // Wall-clock duration is taken before the sampler join so a slow
        // probe shutdown cannot inflate it.
        let benchmark_duration_s = round2(started.elapsed().as_secs_f64());
        let power = sampler.stop().await;
        let scores = compute_score(&results, &power);

        BenchmarkRun {
            model: self.config.model.clone(),
            benchmark_duration_s,
            results,
            scores,
            power,
        }
    }

    async fn run_single(&self, spec: &PromptSpec, warmup: bool) -> PromptResult {
        let options = GenerateOptions {
            temperature: self.config.temperature,
            num_predict: self.config.max_tokens,
        };
        match self.engine.generate(&self.config.model, spec.prompt, options).await {
            Ok(stats) => PromptResult::Completed(build_metrics(spec, &stats, warmup)),
            Err(e) => PromptResult::Failed(PromptFailure {
                prompt_id: spec.id.to_string(),
                category: spec.category.to_string(),
                error: e.to_string(),
            }),
        }
    }
}

/// Convert raw nanosecond engine timings into the millisecond record and
/// derive throughput rates. Rounding happens here, once.
fn build_metrics(spec: &PromptSpec, stats: &GenerateStats, warmup: bool) -> PromptMetrics {
    let total_ms = stats.total_duration as f64 / 1e6;
    let load_ms = stats.load_duration as f64 / 1e6;
    let prompt_eval_ms = stats.prompt_eval_duration as f64 / 1e6;
    let eval_ms = stats.eval_duration as f64 / 1e6;

    let prompt_eval_tps = if stats.prompt_eval_duration > 0 {
        stats.prompt_eval_count as f64 / (stats.prompt_eval_duration as f64 / 1e9)
    } else {
        0.0
    };
    let eval_tps = if stats.eval_duration > 0 {
        stats.eval_count as f64 / (stats.eval_duration as f64 / 1e9)
    } else {
        0.0
    };

    PromptMetrics {
        prompt_id: spec.id.to_string(),
        category: spec.category.to_string(),
        total_duration_ms: round2(total_ms),
        load_duration_ms: round2(load_ms),
        prompt_eval_count: stats.prompt_eval_count,
        prompt_eval_duration_ms: round2(prompt_eval_ms),
        prompt_eval_tps: round2(prompt_eval_tps),
        eval_count: stats.eval_count,
        eval_duration_ms: round2(eval_ms),
        eval_tps: round2(eval_tps),
        // Time to first token: model load plus prompt processing.
        ttft_ms: round2(load_ms + prompt_eval_ms),
        warmup,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use wattbench_core::{Result, WattbenchError};

    fn stats() -> GenerateStats {
        GenerateStats {
            total_duration: 4_000_000_000,
            load_duration: 500_000_000,
            prompt_eval_count: 30,
            prompt_eval_duration: 1_000_000_000,
            eval_count: 100,
            eval_duration: 2_000_000_000,
        }
    }

    /// Engine that fails on an exact prompt text and succeeds elsewhere.
    struct ScriptedEngine {
        fail_on: Option<&'static str>,
        calls: AtomicUsize,
        fail_first_call: bool,
    }

    impl ScriptedEngine {
        fn ok() -> Self {
            Self { fail_on: None, calls: AtomicUsize::new(0), fail_first_call: false }
        }

        fn failing_on(prompt: &'static str) -> Self {
            Self { fail_on: Some(prompt), calls: AtomicUsize::new(0), fail_first_call: false }
        }

        fn failing_warmup() -> Self {
            Self { fail_on: None, calls: AtomicUsize::new(0), fail_first_call: true }
        }
    }

    #[async_trait]
    impl InferenceEngine for ScriptedEngine {
        async fn generate(
            &self,
            _model: &str,
            prompt: &str,
            _options: GenerateOptions,
        ) -> Result<GenerateStats> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_first_call && call == 0 {
                return Err(WattbenchError::Ollama("model not loaded".to_string()));
            }
            if self.fail_on == Some(prompt) {
                return Err(WattbenchError::Http("connection reset".to_string()));
            }
            Ok(stats())
        }
    }

    fn runner<E: InferenceEngine>(engine: E) -> BenchmarkRunner<E> {
        BenchmarkRunner::new(engine, BenchmarkConfig::default())
    }

    #[tokio::test]
    async fn all_prompts_complete_in_order() {
        let mut sampler = PowerSampler::with_probe(None);
        let run = runner(ScriptedEngine::ok()).run(&mut sampler).await;

        assert_eq!(run.results.len(), BENCHMARK_PROMPTS.len());
        for (result, spec) in run.results.iter().zip(BENCHMARK_PROMPTS) {
            assert_eq!(result.prompt_id(), spec.id);
        }
        // Warmup is discarded, not stored.
        assert!(run.results.iter().all(|r| r.prompt_id() != "warmup"));
        assert_eq!(run.scores.prompts_completed, BENCHMARK_PROMPTS.len());
        assert!(!run.power.available);
    }

    #[tokio::test]
    async fn derived_rates_come_from_engine_durations() {
        let mut sampler = PowerSampler::with_probe(None);
        let run = runner(ScriptedEngine::ok()).run(&mut sampler).await;

        let m = run.results[0].as_completed().expect("completed");
        // 30 tokens over 1s prompt eval, 100 tokens over 2s generation.
        assert_eq!(m.prompt_eval_tps, 30.0);
        assert_eq!(m.eval_tps, 50.0);
        assert_eq!(m.load_duration_ms, 500.0);
        assert_eq!(m.ttft_ms, 1500.0);
        assert_eq!(m.total_duration_ms, 4000.0);
    }

    #[tokio::test]
    async fn one_failure_does_not_abort_the_run() {
        let failing_spec = &BENCHMARK_PROMPTS[2];
        let engine = ScriptedEngine::failing_on(failing_spec.prompt);
        let mut sampler = PowerSampler::with_probe(None);
        let run = runner(engine).run(&mut sampler).await;

        assert_eq!(run.results.len(), BENCHMARK_PROMPTS.len());
        let failures: Vec<usize> = run
            .results
            .iter()
            .enumerate()
            .filter(|(_, r)| r.is_failed())
            .map(|(i, _)| i)
            .collect();
        // Exactly one failure, in the failing prompt's position.
        assert_eq!(failures, vec![2]);
        assert_eq!(run.results[2].prompt_id(), failing_spec.id);
        assert_eq!(run.scores.prompts_completed, BENCHMARK_PROMPTS.len() - 1);
    }

    #[tokio::test]
    async fn warmup_failure_is_nonfatal() {
        let mut sampler = PowerSampler::with_probe(None);
        let run = runner(ScriptedEngine::failing_warmup()).run(&mut sampler).await;

        assert_eq!(run.results.len(), BENCHMARK_PROMPTS.len());
        assert!(run.results.iter().all(|r| !r.is_failed()));
        assert_eq!(run.scores.prompts_completed, BENCHMARK_PROMPTS.len());
    }

    #[tokio::test]
    async fn zero_durations_produce_zero_rates() {
        struct ZeroEngine;

        #[async_trait]
        impl InferenceEngine for ZeroEngine {
            async fn generate(
                &self,
                _model: &str,
                _prompt: &str,
                _options: GenerateOptions,
            ) -> Result<GenerateStats> {
                Ok(GenerateStats::default())
            }
        }

        let mut sampler = PowerSampler::with_probe(None);
        let run = runner(ZeroEngine).run(&mut sampler).await;
        let m = run.results[0].as_completed().expect("completed");
        assert_eq!(m.prompt_eval_tps, 0.0);
        assert_eq!(m.eval_tps, 0.0);
    }
}
