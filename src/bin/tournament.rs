//! Tournament matrix between NES, biased NES and their best responses.
//!
//! For each biased action, plays the NES and every saved best response against
//! the NES and every biased NES, and writes a JSON results matrix with
//! bootstrap confidence intervals of the mean return.

use std::error::Error;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;

use semistatic_cfr::cfr::{ActionSelectionBias, TabularPolicy};
use semistatic_cfr::games::kuhn::{KuhnAction, KuhnPoker};
use semistatic_cfr::play::{confidence_interval, Agent, ConfidenceInterval, Experiment, ExperimentConfig};

#[derive(Parser)]
#[command(name = "tournament")]
#[command(about = "Play NES and best responses against NES and biased NES")]
struct Cli {
    /// Action indices that were biased
    #[arg(short, long, num_args = 1.., required = true)]
    actions: Vec<usize>,
    /// Bias weights that were applied
    #[arg(short, long, num_args = 1.., required = true)]
    biases: Vec<f64>,
    /// Number of rounds per match
    #[arg(short, long, default_value_t = 100_000)]
    rounds: u64,
    /// NES policy produced by solve_nes
    #[arg(long, default_value = "policies/NES/policy.json")]
    nes: PathBuf,
    /// Directory holding the best responses produced by best_response
    #[arg(long, default_value = "policies/NES_bias")]
    responses: PathBuf,
    /// Output directory for results and the plain-text report
    #[arg(short, long, default_value = "experiments/tournament_matrix")]
    output: PathBuf,
    /// Confidence level of the reported intervals
    #[arg(long, default_value_t = 0.95)]
    interval: f64,
    /// Bootstrap resamples per interval
    #[arg(long, default_value_t = 1_000)]
    resamples: usize,
    /// Random seed
    #[arg(long)]
    seed: Option<u64>,
    /// Parallel self-play tasks
    #[arg(long)]
    threads: Option<usize>,
}

/// One cell of the results matrix.
#[derive(Serialize)]
struct MatchResult {
    player: String,
    opponent: String,
    average_return: f64,
    confidence_interval: ConfidenceInterval,
    player_win_percentage: f64,
    opponent_win_percentage: f64,
}

fn folder_name(action: usize, bias: f64) -> String {
    format!("action_{}__bias_{}", action, bias.to_string().replace('.', "_"))
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    std::fs::create_dir_all(&cli.output)?;

    let game = KuhnPoker::new();
    let nes = TabularPolicy::<KuhnAction>::load_json(&cli.nes)?;
    let report_path = cli.output.join("report.txt");
    let mut rng = match cli.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    for &action in &cli.actions {
        let biased_action = KuhnAction::from_index(action)
            .ok_or_else(|| format!("no action with index {}", action))?;

        let mut opponents: Vec<Agent<KuhnPoker>> = vec![Agent::from_policy(nes.clone(), "NES agent")];
        let mut players: Vec<Agent<KuhnPoker>> = vec![Agent::from_policy(nes.clone(), "NES agent")];
        for &weight in &cli.biases {
            let bias = ActionSelectionBias::new(biased_action, weight)?;
            opponents.push(Agent::from_policy(
                nes.clone().with_bias(bias),
                format!("Biased NES agent (action: {}, bias: {})", action, weight),
            ));

            let loc = folder_name(action, weight);
            let response = TabularPolicy::<KuhnAction>::load_json(
                cli.responses.join(&loc).join("current_policy.json"),
            )?;
            players.push(Agent::from_policy(response, format!("BR agent to {}", loc)));
        }

        let pb = ProgressBar::new((players.len() * opponents.len()) as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
                .progress_chars("#>-"),
        );

        let mut results = Vec::with_capacity(players.len() * opponents.len());
        for player in &players {
            for opponent in &opponents {
                let title = format!("{} vs. {}", player.description(), opponent.description());
                let mut config = ExperimentConfig::new(title)
                    .with_rounds(cli.rounds)
                    .with_save_outcomes(true);
                if let Some(seed) = cli.seed {
                    config = config.with_seed(seed);
                }
                if let Some(threads) = cli.threads {
                    config = config.with_threads(threads);
                }

                let experiment = Experiment::new(game.clone(), config)?;
                let outcome = experiment.run([player, opponent])?;
                experiment.write_report([player, opponent], &outcome, &report_path)?;

                let ci = confidence_interval(&outcome.p0_returns, cli.interval, cli.resamples, &mut rng)?;
                log::info!("{}: {}", experiment.config().title, ci);
                results.push(MatchResult {
                    player: player.description().to_string(),
                    opponent: opponent.description().to_string(),
                    average_return: outcome.p0_average_return,
                    confidence_interval: ci,
                    player_win_percentage: outcome.p0_win_percentage(),
                    opponent_win_percentage: outcome.p1_win_percentage(),
                });
                pb.inc(1);
            }
        }
        pb.finish_and_clear();

        let results_path = cli.output.join(format!("results_action_{}.json", action));
        let writer = BufWriter::new(File::create(&results_path)?);
        serde_json::to_writer_pretty(writer, &results)?;
        println!("Results for action {} saved to {}", action, results_path.display());
    }
    Ok(())
}
