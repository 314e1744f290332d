use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use wattbench_benchmark::{
    build_payload, collect_system_report, compute_score, save_local, submit, BenchmarkRunner,
    OllamaClient, PowerSampler,
};
use wattbench_core::{
    BenchmarkRun, PowerMethod, PowerStats, PromptMetrics, PromptResult, SystemReport,
    WattbenchConfig, BENCHMARK_PROMPTS,
};

#[derive(Parser)]
#[command(name = "wattbench")]
#[command(about = "Cross-platform AI system benchmark — compare hardware, not models", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the AI system benchmark
    Run(RunArgs),

    /// Display detected system information
    Sysinfo,

    /// Show Ollama server status
    Status,

    /// Write a sample submission payload without running the benchmark
    PayloadPreview {
        /// Output file for the payload preview
        #[arg(short, long, default_value = "payload_preview.json")]
        output: PathBuf,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Remote endpoint URL to submit results to
    #[arg(short, long)]
    endpoint: Option<String>,

    /// Skip submitting results to the remote endpoint
    #[arg(long)]
    no_submit: bool,

    /// Skip saving results to a local JSON file
    #[arg(long)]
    no_save: bool,

    /// Output JSON file path
    #[arg(short, long, default_value = "benchmark_result.json")]
    output: PathBuf,

    /// Ollama host URL (overrides OLLAMA_HOST)
    #[arg(long)]
    ollama_host: Option<String>,
}

impl Default for RunArgs {
    fn default() -> Self {
        Self {
            endpoint: None,
            no_submit: false,
            no_save: false,
            output: PathBuf::from("benchmark_result.json"),
            ollama_host: None,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Run(args)) => cmd_run(args).await?,
        Some(Commands::Sysinfo) => cmd_sysinfo(),
        Some(Commands::Status) => cmd_status().await?,
        Some(Commands::PayloadPreview { output }) => cmd_payload_preview(&output).await?,
        None => cmd_run(RunArgs::default()).await?,
    }

    Ok(())
}

fn resolve_host(flag: Option<String>, config: &WattbenchConfig) -> String {
    flag.or_else(|| std::env::var("OLLAMA_HOST").ok())
        .unwrap_or_else(|| config.ollama.host.clone())
}

async fn cmd_run(args: RunArgs) -> Result<()> {
    let config = WattbenchConfig::default();
    let host = resolve_host(args.ollama_host.clone(), &config);
    let client = OllamaClient::new(&host);

    println!();
    println!("AI System Benchmark");
    println!("  Model: {}", config.benchmark.model);
    println!("  Comparing hardware performance across devices");
    println!();

    println!("Checking Ollama at {host}...");
    let ollama_version = match client.version().await {
        Ok(v) => {
            println!("  Ollama version: {v}");
            v
        }
        Err(e) => {
            anyhow::bail!("Ollama is not running at {host} ({e}). Start it first: ollama serve")
        }
    };

    println!("\nDetecting system hardware...");
    let system = collect_system_report();
    print_system(&system);

    println!("\nPreparing benchmark model: {}", config.benchmark.model);
    client.ensure_model(&config.benchmark.model).await?;

    let mut sampler = PowerSampler::detect().await;
    match sampler.method() {
        Some(m) => println!("  Power monitoring: {}", m.as_str()),
        None => println!("  Power monitoring: not available"),
    }

    println!("\nRunning benchmark ({} prompts)...", BENCHMARK_PROMPTS.len());
    let runner = BenchmarkRunner::new(client, config.benchmark.clone());
    let run = runner.run(&mut sampler).await;

    print_results(&run);

    let payload = build_payload(&system, &run, &ollama_version);
    if !args.no_save {
        let path = save_local(&payload, &args.output)?;
        println!("Results saved to: {}", path.display());
    }
    if !args.no_submit {
        let endpoint = args.endpoint.unwrap_or(config.submit.endpoint);
        match submit(&payload, &endpoint).await {
            Ok(()) => println!("Results submitted successfully!"),
            Err(e) => println!("Submission failed: {e}"),
        }
    }

    println!("\nBenchmark complete!");
    Ok(())
}

fn cmd_sysinfo() {
    println!("\nDetecting system hardware...");
    let system = collect_system_report();
    print_system(&system);
}

async fn cmd_status() -> Result<()> {
    let config = WattbenchConfig::default();
    let host = resolve_host(None, &config);
    let client = OllamaClient::new(&host);

    println!("System Status:");
    println!("{:-<50}", "");
    println!("  Ollama Host: {host}");
    match client.version().await {
        Ok(v) => println!("  Ollama: connected (version {v})"),
        Err(e) => println!("  Ollama: disconnected ({e})"),
    }
    if let Ok(models) = client.list_models().await {
        println!("  Models available: {}", models.len());
    }

    let sampler = PowerSampler::detect().await;
    match sampler.method() {
        Some(m) => println!("  Power monitoring: {}", m.as_str()),
        None => println!("  Power monitoring: not available"),
    }

    Ok(())
}

async fn cmd_payload_preview(output: &PathBuf) -> Result<()> {
    println!("Generating payload preview...");

    let system = collect_system_report();
    let config = WattbenchConfig::default();
    let client = OllamaClient::new(&resolve_host(None, &config));
    let ollama_version = client.version().await.unwrap_or_else(|_| "unknown".to_string());

    let run = sample_run(&config);
    let payload = build_payload(&system, &run, &ollama_version);
    let path = save_local(&payload, output)?;

    println!("{}", serde_json::to_string_pretty(&payload)?);
    println!("\nPreview written to: {}", path.display());
    Ok(())
}

/// Fake run with plausible numbers, for previewing the submission shape.
fn sample_run(config: &WattbenchConfig) -> BenchmarkRun {
    let results: Vec<PromptResult> = BENCHMARK_PROMPTS
        .iter()
        .map(|spec| {
            PromptResult::Completed(PromptMetrics {
                prompt_id: spec.id.to_string(),
                category: spec.category.to_string(),
                total_duration_ms: 8500.0,
                load_duration_ms: 150.0,
                prompt_eval_count: 32,
                prompt_eval_duration_ms: 450.0,
                prompt_eval_tps: 71.11,
                eval_count: 256,
                eval_duration_ms: 7900.0,
                eval_tps: 32.41,
                ttft_ms: 600.0,
                warmup: false,
            })
        })
        .collect();

    let power = PowerStats {
        available: true,
        method: Some(PowerMethod::NvidiaSmi),
        avg_watts: Some(285.5),
        max_watts: Some(320.0),
        min_watts: Some(210.25),
        samples: 85,
    };
    let scores = compute_score(&results, &power);

    BenchmarkRun {
        model: config.benchmark.model.clone(),
        benchmark_duration_s: 42.5,
        results,
        scores,
        power,
    }
}

fn print_system(system: &SystemReport) {
    println!();
    println!("System Information:");
    println!("{:-<65}", "");
    println!("  {:<14} {} {}", "OS", system.os.os_name, system.os.os_version);
    println!("  {:<14} {}", "Architecture", system.os.architecture);
    println!("  {:<14} {}", "CPU", system.cpu.cpu_name);
    let physical = system
        .cpu
        .physical_cores
        .map(|c| c.to_string())
        .unwrap_or_else(|| "?".to_string());
    println!("  {:<14} {} physical / {} logical", "Cores", physical, system.cpu.logical_cores);
    println!(
        "  {:<14} {} GB total / {} GB available",
        "RAM", system.ram.total_gb, system.ram.available_gb
    );
    for (i, gpu) in system.gpu.iter().enumerate() {
        let label = if system.gpu.len() > 1 { format!("GPU {i}") } else { "GPU".to_string() };
        let vram = gpu
            .vram_mb
            .map(|mb| {
                let mem_type = gpu.memory_type.as_deref().unwrap_or("");
                format!(" ({mb} MB {mem_type})")
            })
            .unwrap_or_default();
        let driver = gpu
            .driver
            .as_deref()
            .map(|d| format!(" [driver: {d}]"))
            .unwrap_or_default();
        println!("  {:<14} {} {}{}{}", label, gpu.vendor, gpu.name, vram, driver);
    }
    println!("  {:<14} {}", "Machine UUID", system.machine_uuid);
}

fn print_results(run: &BenchmarkRun) {
    println!();
    println!("Benchmark Results:");
    println!("{:-<65}", "");
    print!("  Performance Score: {}", run.scores.performance_score);
    match run.scores.efficiency_score {
        Some(eff) => println!("  |  Efficiency: {eff} (tok/s/W)"),
        None => println!(),
    }
    println!();
    println!("  Avg Generation:  {} tok/s", run.scores.avg_eval_tps);
    println!("  Avg Prompt Eval: {} tok/s", run.scores.avg_prompt_eval_tps);
    println!("  Avg TTFT:        {} ms", run.scores.avg_ttft_ms);
    println!("  Total Tokens:    {}", run.scores.total_tokens_generated);
    println!("  Duration:        {} s", run.benchmark_duration_s);

    if run.power.available {
        println!();
        println!("Power Monitoring:");
        println!("{:-<65}", "");
        if let (Some(avg), Some(max), Some(min)) =
            (run.power.avg_watts, run.power.max_watts, run.power.min_watts)
        {
            println!("  Avg Power: {avg} W");
            println!("  Max Power: {max} W");
            println!("  Min Power: {min} W");
        }
        if let Some(method) = run.power.method {
            println!("  Method:    {}", method.as_str());
        }
        println!("  Samples:   {}", run.power.samples);
    }

    let completed: Vec<&PromptMetrics> =
        run.results.iter().filter_map(PromptResult::as_completed).collect();
    if !completed.is_empty() {
        println!();
        println!("Per-Prompt Results:");
        println!("{:-<65}", "");
        println!(
            "  {:<24} {:>10} {:>12} {:>10} {:>7}",
            "Category", "Gen tok/s", "Prompt tok/s", "TTFT (ms)", "Tokens"
        );
        println!("{:-<65}", "");
        for m in &completed {
            println!(
                "  {:<24} {:>10} {:>12} {:>10} {:>7}",
                m.category, m.eval_tps, m.prompt_eval_tps, m.ttft_ms, m.eval_count
            );
        }
    }

    for r in &run.results {
        if let PromptResult::Failed(f) = r {
            println!("  ERROR [{}]: {}", f.prompt_id, f.error);
        }
    }
    println!();
}
