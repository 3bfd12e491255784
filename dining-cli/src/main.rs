// ABOUTME: dining CLI - runs the agent ring or benchmarks the aggregation utility.
// ABOUTME: `dining dine` runs until a bound or Ctrl-C; `dining aggregate` compares sums.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use dining::aggregate::{self, CATEGORIES};
use dining::prelude::*;

/// Exit code for a run interrupted with Ctrl-C.
const EXIT_INTERRUPTED: u8 = 130;

/// Pair arbitration for a ring of contending agents.
#[derive(Parser, Debug)]
#[command(name = "dining")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run agents around a shared arbiter
    Dine(DineArgs),
    /// Compare sequential and parallel sums over generated records
    Aggregate(AggregateArgs),
}

#[derive(Args, Debug)]
struct DineArgs {
    /// JSON config file; flags override its fields
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of agents (and resources) in the ring
    #[arg(short = 'n', long)]
    agents: Option<usize>,

    /// Minimum think time in milliseconds
    #[arg(long)]
    think_min_ms: Option<u64>,

    /// Maximum think time in milliseconds
    #[arg(long)]
    think_max_ms: Option<u64>,

    /// Minimum eat time in milliseconds
    #[arg(long)]
    eat_min_ms: Option<u64>,

    /// Maximum eat time in milliseconds
    #[arg(long)]
    eat_max_ms: Option<u64>,

    /// Meals per agent before it stops
    #[arg(long)]
    cycles: Option<u64>,

    /// Total grants across all agents before the run stops
    #[arg(long)]
    grants: Option<u64>,

    /// Stop starting new cycles after this many seconds
    #[arg(short = 'd', long)]
    duration_secs: Option<u64>,

    /// Seed for reproducible think/eat durations
    #[arg(long)]
    seed: Option<u64>,

    /// Record every grant and release and check for overlapping holds
    #[arg(long)]
    audit: bool,

    /// Print the run report as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct AggregateArgs {
    /// Record set sizes to benchmark
    #[arg(short, long, value_delimiter = ',', default_values_t = [1_000, 100_000])]
    records: Vec<usize>,

    /// Category to sum
    #[arg(long, default_value = CATEGORIES[0])]
    category: String,

    /// Group key to sum
    #[arg(long, default_value = "1")]
    group_key: i64,

    /// Seed for record generation
    #[arg(long)]
    seed: Option<u64>,

    /// Print the comparisons as JSON
    #[arg(long)]
    json: bool,
}

impl DineArgs {
    fn into_config(self) -> Result<HarnessConfig> {
        let mut config = match &self.config {
            Some(path) => HarnessConfig::from_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
            None => HarnessConfig::default(),
        };

        if let Some(agents) = self.agents {
            config = config.agents(agents);
        }
        let think = config.timing.think;
        config = config.think(DurationRange::new(
            self.think_min_ms.unwrap_or(think.min_ms),
            self.think_max_ms.unwrap_or(think.max_ms),
        ));
        let eat = config.timing.eat;
        config = config.eat(DurationRange::new(
            self.eat_min_ms.unwrap_or(eat.min_ms),
            self.eat_max_ms.unwrap_or(eat.max_ms),
        ));
        if let Some(cycles) = self.cycles {
            config = config.cycles(cycles);
        }
        if let Some(grants) = self.grants {
            config = config.total_grants(grants);
        }
        if let Some(secs) = self.duration_secs {
            config = config.duration(Duration::from_secs(secs));
        }
        if let Some(seed) = self.seed {
            config = config.seed(seed);
        }
        if self.audit {
            config = config.audit(true);
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Dine(args) => dine(args).await,
        Command::Aggregate(args) => {
            benchmark(&args)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn dine(args: DineArgs) -> Result<ExitCode> {
    let json = args.json;
    let config = args.into_config()?;

    info!(
        agents = config.agents,
        think_ms = ?(config.timing.think.min_ms, config.timing.think.max_ms),
        eat_ms = ?(config.timing.eat.min_ms, config.timing.eat.max_ms),
        bounded = config.is_bounded(),
        "Starting dining run"
    );
    if !config.is_bounded() {
        info!("No bound set, press Ctrl-C to stop");
    }

    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };
    let report = run_with_cancel(config, interrupt).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", report.summary());
        if let Some(audit) = &report.audit {
            println!(
                "audit: {} grants, {} releases, {} violations, peak {} held",
                audit.grants, audit.releases, audit.violations, audit.peak_held
            );
        }
    }

    Ok(match report.status {
        RunStatus::Cancelled => ExitCode::from(EXIT_INTERRUPTED),
        _ => ExitCode::SUCCESS,
    })
}

fn benchmark(args: &AggregateArgs) -> Result<()> {
    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let mut comparisons = Vec::with_capacity(args.records.len());
    for &count in &args.records {
        let records = aggregate::generate_records(count, &mut rng);
        let comparison = aggregate::compare(&records, &args.category, args.group_key);
        if !comparison.agrees() {
            anyhow::bail!(
                "Sums disagree on {} records: sequential {} vs parallel {}",
                count,
                comparison.sequential,
                comparison.parallel
            );
        }

        if !args.json {
            println!(
                "{} records, {} group {}: sequential {} in {:?}, parallel {} in {:?} ({} chunks)",
                comparison.records,
                args.category,
                args.group_key,
                comparison.sequential,
                comparison.sequential_time,
                comparison.parallel,
                comparison.parallel_time,
                comparison.chunks
            );
        }
        comparisons.push(comparison);
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&comparisons)?);
    }
    Ok(())
}
