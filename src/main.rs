//! CHUNKRECALL: serial recall with weighted chunk memory.
//!
//! This is the CLI binary entry point.

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use chunkrecall::config::{DEFAULT_GROUP_SIZE, DEFAULT_SD, DEFAULT_SEED};
use chunkrecall::experiment::{run_batch, run_shared, Encoding, ExperimentConfig};
use chunkrecall::runtime::{CueRoute, ParticipantConfig};
use chunkrecall::selection::SelectionPolicy;

const DEMO_SEQUENCES: [&str; 7] = [
    "123456789", "222333444", "555666777", "888999000", "098178322", "111122233", "632876343",
];

#[derive(Clone, Copy, Debug, ValueEnum)]
enum EncodingArg {
    Chunked,
    Ungrouped,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PolicyArg {
    Deterministic,
    Boltzmann,
    NoisyArgmax,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum RouteArg {
    BottomUp,
    Reinstate,
}

/// Serial-recall simulation CLI.
#[derive(Parser, Debug)]
#[command(
    name = "chunkrecall",
    about = "CHUNKRECALL: digit-list recall with weighted chunk memory",
    version
)]
struct Cli {
    /// How each list is encoded into chunks.
    #[arg(short, long, value_enum, default_value_t = EncodingArg::Chunked)]
    encoding: EncodingArg,

    /// Response selection policy.
    #[arg(short, long, value_enum, default_value_t = PolicyArg::Deterministic)]
    policy: PolicyArg,

    /// Selection noise scale.
    #[arg(long, default_value_t = DEFAULT_SD)]
    sd: f64,

    /// Base RNG seed; trial i uses seed + i.
    #[arg(long, default_value_t = DEFAULT_SEED)]
    seed: u64,

    /// Digits per group chunk.
    #[arg(short, long, default_value_t = DEFAULT_GROUP_SIZE)]
    group_size: usize,

    /// How cues reach the store.
    #[arg(long, value_enum, default_value_t = RouteArg::BottomUp)]
    route: RouteArg,

    /// Recall cycle bound (default: chunks compiled for the list).
    #[arg(long)]
    max_cycles: Option<usize>,

    /// One participant studies every list instead of one participant per list.
    #[arg(long, default_value_t = false)]
    shared: bool,

    /// Print the report as JSON.
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Digit sequences to study and recall.
    #[arg(trailing_var_arg = true)]
    sequences: Vec<String>,
}

impl Cli {
    fn config(&self) -> ExperimentConfig {
        ExperimentConfig {
            encoding: match self.encoding {
                EncodingArg::Chunked => Encoding::Chunked,
                EncodingArg::Ungrouped => Encoding::Ungrouped,
            },
            group_size: self.group_size,
            participant: ParticipantConfig {
                policy: match self.policy {
                    PolicyArg::Deterministic => SelectionPolicy::Deterministic,
                    PolicyArg::Boltzmann => SelectionPolicy::Boltzmann,
                    PolicyArg::NoisyArgmax => SelectionPolicy::NoisyArgmax,
                },
                sd: self.sd,
                seed: self.seed,
                cue_route: match self.route {
                    RouteArg::BottomUp => CueRoute::BottomUp,
                    RouteArg::Reinstate => CueRoute::Reinstate,
                },
                ..Default::default()
            },
            max_cycles: self.max_cycles,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    tracing::info!("CHUNKRECALL v{}", env!("CARGO_PKG_VERSION"));

    let sequences: Vec<String> = if cli.sequences.is_empty() {
        tracing::warn!("No sequences provided. Running the demo lists.");
        DEMO_SEQUENCES.iter().map(|s| s.to_string()).collect()
    } else {
        cli.sequences.clone()
    };

    let config = cli.config();
    tracing::info!(
        "Config: {:?} encoding, {:?} policy, sd={}, seed={}",
        config.encoding,
        config.participant.policy,
        config.participant.sd,
        config.participant.seed,
    );

    let report = if cli.shared {
        run_shared(&sequences, &config)?
    } else {
        run_batch(&sequences, &config)?
    };

    if cli.json {
        let json = serde_json::to_string_pretty(&report).context("serialising report")?;
        println!("{}", json);
        return Ok(());
    }

    for trial in &report.trials {
        println!("Trial {}:", trial.trial);
        println!("Stimulus: {}", trial.stimulus);
        println!("Response: {}", trial.response);
        println!("Correct Rate (with order): {:.2}", trial.score.ordered_rate);
        println!("Correct Digits Rate (without order): {:.2}", trial.score.digit_rate);
        println!("{}", "-".repeat(30));
    }
    tracing::info!(
        "Mean ordered rate {:.3}, mean digit rate {:.3}, exact prefix {:.1}%",
        report.summary.mean_ordered_rate,
        report.summary.mean_digit_rate,
        report.summary.exact_prefix_rate * 100.0,
    );
    tracing::info!("Done.");
    Ok(())
}
