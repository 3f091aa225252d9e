//! Kuhn poker equilibrium solver binary.
//!
//! Approximates a Nash equilibrium strategy (NES) with CFR+, tracking
//! exploitability on a sparse schedule, and saves the average policy.

use std::error::Error;
use std::fs;
use std::path::PathBuf;

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};

use semistatic_cfr::cfr::{BestResponseOracle, CFRConfig, CFRSolver};
use semistatic_cfr::games::kuhn::KuhnPoker;
use semistatic_cfr::training::{Schedule, Trainer};

#[derive(Parser)]
#[command(name = "solve_nes")]
#[command(about = "Approximate a Nash equilibrium strategy of Kuhn poker with CFR+")]
struct Cli {
    /// Number of CFR+ iterations
    #[arg(short, long, default_value_t = 1_000)]
    iterations: u64,
    /// Output directory for the policy and exploitability series
    #[arg(short, long, default_value = "policies/NES")]
    output: PathBuf,
    /// Snapshot every iteration up to this one
    #[arg(long, default_value_t = 10)]
    dense: u64,
    /// Snapshot every N-th iteration after the dense phase
    #[arg(long, default_value_t = 10)]
    stride: u64,
    /// Use vanilla CFR instead of CFR+
    #[arg(long)]
    vanilla: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    fs::create_dir_all(&cli.output)?;

    let config = if cli.vanilla {
        CFRConfig::vanilla()
    } else {
        CFRConfig::default()
    };
    let mut solver = CFRSolver::new(KuhnPoker::new(), config)?;
    let oracle = BestResponseOracle::new();

    let pb = ProgressBar::new(cli.iterations);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("#>-"),
    );

    let mut trainer = Trainer::new(&mut solver, "NES")
        .with_schedule(Schedule::new(cli.dense, cli.stride)?)?
        .with_oracle(&oracle);
    trainer.run_with_callback(cli.iterations, |iteration| pb.set_position(iteration))?;
    pb.finish_and_clear();
    let session = trainer.into_session();

    let policy_path = cli.output.join("policy.json");
    let session_path = cli.output.join("exploitabilities.json");
    solver.average_policy().save_json(&policy_path)?;
    session.save_json(&session_path)?;

    if let Some((iteration, value)) = session.exploitability.average.last() {
        println!("Exploitability after {} iterations: {:.6}", iteration, value);
    }
    println!("Policy saved to {}", policy_path.display());
    println!("Exploitability series saved to {}", session_path.display());
    Ok(())
}
