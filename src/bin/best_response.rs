//! Best responses to biased equilibrium strategies.
//!
//! Loads the NES, biases it toward one action at a time, and trains a static
//! best response against each biased policy while tracking exploitability and
//! self-play payoff.

use std::error::Error;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};

use semistatic_cfr::cfr::{
    ActionSelectionBias, BestResponseOracle, CFRConfig, CFRSolver, SharedPolicy, TabularPolicy,
};
use semistatic_cfr::games::kuhn::{KuhnAction, KuhnPoker};
use semistatic_cfr::play::{Agent, Experiment, ExperimentConfig};
use semistatic_cfr::training::{Schedule, Trainer};

#[derive(Parser)]
#[command(name = "best_response")]
#[command(about = "Train static best responses to biased NES policies")]
struct Cli {
    /// Action indices to bias
    #[arg(short, long, num_args = 1.., required = true)]
    actions: Vec<usize>,
    /// Bias weights to apply
    #[arg(short, long, num_args = 1.., required = true)]
    biases: Vec<f64>,
    /// Number of solver iterations per best response
    #[arg(short, long, default_value_t = 1_000)]
    iterations: u64,
    /// Self-play rounds per payoff snapshot
    #[arg(short, long, default_value_t = 1_000)]
    experiment: u64,
    /// NES policy produced by solve_nes
    #[arg(long, default_value = "policies/NES/policy.json")]
    nes: PathBuf,
    /// Output directory, one sub-directory per (action, bias)
    #[arg(short, long, default_value = "policies/NES_bias")]
    output: PathBuf,
    /// Random seed for self-play
    #[arg(long)]
    seed: Option<u64>,
    /// Parallel self-play tasks
    #[arg(long)]
    threads: Option<usize>,
}

/// Directory name for one (action, bias) combination.
fn folder_name(action: usize, bias: f64) -> String {
    format!("action_{}__bias_{}", action, bias.to_string().replace('.', "_"))
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let game = KuhnPoker::new();
    let oracle = BestResponseOracle::new();
    let nes = TabularPolicy::<KuhnAction>::load_json(&cli.nes)?;
    log::info!("loaded NES with {} information states from {}", nes.len(), cli.nes.display());

    let report_path = cli.output.join("report.txt");
    fs::create_dir_all(&cli.output)?;

    for &action in &cli.actions {
        let biased_action = KuhnAction::from_index(action)
            .ok_or_else(|| format!("no action with index {}", action))?;

        for &weight in &cli.biases {
            let folder = cli.output.join(folder_name(action, weight));
            fs::create_dir_all(&folder)?;

            let bias = ActionSelectionBias::new(biased_action, weight)?;
            let frozen: SharedPolicy<KuhnPoker> = Arc::new(nes.clone().with_bias(bias));
            let opponent = Agent::new(frozen.clone(), format!("NES-B ({}x{})", action, weight));
            let title = format!("BR to NES-B ({}x{})", action, weight);

            let mut experiment_config = ExperimentConfig::new(format!(
                "best_response_vs_bias_{}_{}",
                action, weight
            ))
            .with_rounds(cli.experiment);
            if let Some(seed) = cli.seed {
                experiment_config = experiment_config.with_seed(seed);
            }
            if let Some(threads) = cli.threads {
                experiment_config = experiment_config.with_threads(threads);
            }
            let experiment = Experiment::new(game.clone(), experiment_config)?;

            let mut solver =
                CFRSolver::static_best_response(game.clone(), CFRConfig::default(), frozen)?;

            let pb = ProgressBar::new(cli.iterations);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")?
                    .progress_chars("#>-"),
            );
            pb.set_message(title.clone());

            let mut trainer = Trainer::new(&mut solver, title.clone())
                .with_schedule(Schedule::default())?
                .with_oracle(&oracle)
                .with_evaluation(experiment.clone(), opponent.clone());
            trainer.run_with_callback(cli.iterations, |iteration| pb.set_position(iteration))?;
            pb.finish_and_clear();
            let session = trainer.into_session();

            solver.current_policy().save_json(folder.join("current_policy.json"))?;
            solver.average_policy().save_json(folder.join("average_policy.json"))?;
            session.save_json(folder.join("session.json"))?;

            let learner = Agent::new(solver.measurement_policy(solver.average_policy()), title);
            let outcome = experiment.run([&learner, &opponent])?;
            experiment.write_report([&learner, &opponent], &outcome, &report_path)?;

            println!(
                "{}: exploitability {:.6}, average return {:.4}",
                learner.description(),
                session.exploitability.average.last().map_or(f64::NAN, |(_, v)| v),
                outcome.p0_average_return
            );
        }
    }
    Ok(())
}
