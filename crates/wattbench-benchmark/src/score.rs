use wattbench_core::{round2, round4, PowerStats, PromptMetrics, PromptResult, ScoreRecord};

/// Weighting of prompt-processing vs generation throughput in the blended
/// score. Generation dominates perceived latency for typical workloads, so it
/// carries the larger weight.
const PROMPT_TPS_WEIGHT: f64 = 0.3;
const EVAL_TPS_WEIGHT: f64 = 0.7;

/// Reduce per-prompt results and power statistics to the final score record.
///
/// Failed and warmup-tagged entries never count. With no valid entries at all
/// the record is zeroed with `efficiency_score` absent, whatever the power
/// stats say.
pub fn compute_score(results: &[PromptResult], power: &PowerStats) -> ScoreRecord {
    let valid: Vec<&PromptMetrics> = results
        .iter()
        .filter_map(PromptResult::as_completed)
        .filter(|m| !m.warmup)
        .collect();

    if valid.is_empty() {
        return ScoreRecord::default();
    }

    let n = valid.len() as f64;
    let avg_prompt_tps = valid.iter().map(|m| m.prompt_eval_tps).sum::<f64>() / n;
    let avg_eval_tps = valid.iter().map(|m| m.eval_tps).sum::<f64>() / n;
    let avg_ttft = valid.iter().map(|m| m.ttft_ms).sum::<f64>() / n;
    let total_tokens = valid.iter().map(|m| m.eval_count).sum();
    let total_prompt_tokens = valid.iter().map(|m| m.prompt_eval_count).sum();

    let performance_score =
        round2(avg_prompt_tps * PROMPT_TPS_WEIGHT + avg_eval_tps * EVAL_TPS_WEIGHT);

    // Present only when real power data exists; a degenerate zero average
    // must not produce an infinite score.
    let efficiency_score = match power.avg_watts {
        Some(watts) if power.available && watts > 0.0 => {
            Some(round4(performance_score / watts))
        }
        _ => None,
    };

    ScoreRecord {
        performance_score,
        efficiency_score,
        avg_prompt_eval_tps: round2(avg_prompt_tps),
        avg_eval_tps: round2(avg_eval_tps),
        avg_ttft_ms: round2(avg_ttft),
        total_tokens_generated: total_tokens,
        total_prompt_tokens,
        prompts_completed: valid.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wattbench_core::{PowerMethod, PromptFailure};

    fn completed(id: &str, prompt_tps: f64, eval_tps: f64) -> PromptResult {
        PromptResult::Completed(PromptMetrics {
            prompt_id: id.to_string(),
            category: "Reasoning".to_string(),
            total_duration_ms: 1000.0,
            load_duration_ms: 120.0,
            prompt_eval_count: 30,
            prompt_eval_duration_ms: 250.0,
            prompt_eval_tps: prompt_tps,
            eval_count: 100,
            eval_duration_ms: 800.0,
            eval_tps,
            ttft_ms: 370.0,
            warmup: false,
        })
    }

    fn failed(id: &str) -> PromptResult {
        PromptResult::Failed(PromptFailure {
            prompt_id: id.to_string(),
            category: "Reasoning".to_string(),
            error: "engine unreachable".to_string(),
        })
    }

    fn power_on(avg: f64) -> PowerStats {
        PowerStats {
            available: true,
            method: Some(PowerMethod::NvidiaSmi),
            avg_watts: Some(avg),
            max_watts: Some(avg + 20.0),
            min_watts: Some(avg - 20.0),
            samples: 40,
        }
    }

    #[test]
    fn weighted_blend_favors_generation() {
        let results: Vec<PromptResult> = [
            (10.0, 5.0),
            (20.0, 15.0),
            (30.0, 25.0),
            (40.0, 35.0),
            (50.0, 45.0),
        ]
        .iter()
        .enumerate()
        .map(|(i, (p, e))| completed(&format!("p{i}"), *p, *e))
        .collect();

        let record = compute_score(&results, &PowerStats::unavailable(None));
        assert_eq!(record.avg_prompt_eval_tps, 30.0);
        assert_eq!(record.avg_eval_tps, 25.0);
        // 30*0.3 + 25*0.7 = 9 + 17.5
        assert_eq!(record.performance_score, 26.5);
        assert_eq!(record.prompts_completed, 5);
        assert_eq!(record.efficiency_score, None);
    }

    #[test]
    fn efficiency_present_only_with_real_power() {
        let results = vec![completed("a", 60.0, 40.0)];

        let with_power = compute_score(&results, &power_on(200.0));
        // performance = 60*0.3 + 40*0.7 = 46; 46 / 200 = 0.23
        assert_eq!(with_power.performance_score, 46.0);
        assert_eq!(with_power.efficiency_score, Some(0.23));

        let without = compute_score(&results, &PowerStats::unavailable(Some(PowerMethod::RocmSmi)));
        assert_eq!(without.efficiency_score, None);
    }

    #[test]
    fn zero_average_watts_never_divides() {
        let results = vec![completed("a", 60.0, 40.0)];
        let mut degenerate = power_on(0.0);
        degenerate.avg_watts = Some(0.0);
        let record = compute_score(&results, &degenerate);
        assert_eq!(record.efficiency_score, None);
    }

    #[test]
    fn failures_and_warmup_are_excluded() {
        let mut warmup = completed("warmup", 500.0, 500.0);
        if let PromptResult::Completed(m) = &mut warmup {
            m.warmup = true;
        }
        let results = vec![warmup, completed("a", 20.0, 10.0), failed("b"), completed("c", 40.0, 30.0)];

        let record = compute_score(&results, &PowerStats::unavailable(None));
        assert_eq!(record.prompts_completed, 2);
        assert_eq!(record.avg_prompt_eval_tps, 30.0);
        assert_eq!(record.avg_eval_tps, 20.0);
        assert_eq!(record.total_tokens_generated, 200);
        assert_eq!(record.total_prompt_tokens, 60);
    }

    #[test]
    fn all_errored_yields_the_zero_record() {
        let results = vec![failed("a"), failed("b"), failed("c")];
        let record = compute_score(&results, &power_on(300.0));
        assert_eq!(record, ScoreRecord::default());
        assert_eq!(record.performance_score, 0.0);
        assert_eq!(record.efficiency_score, None);
        assert_eq!(record.prompts_completed, 0);
    }
}
