//! Training loop with exploitability and payoff tracking.

use std::time::Instant;

use crate::cfr::exploitability::ExploitabilityOracle;
use crate::cfr::game::Game;
use crate::cfr::solver::CFRSolver;
use crate::play::agent::Agent;
use crate::play::experiment::Experiment;
use crate::training::series::{Schedule, TrainingError, TrainingSession};

/// Self-play measurement against a fixed opponent.
pub struct Evaluation<G: Game> {
    /// Experiment used for every payoff snapshot.
    pub experiment: Experiment<G>,
    /// Opponent of the learner, usually the frozen policy.
    pub opponent: Agent<G>,
}

/// Drives a solver and records snapshots on a [`Schedule`].
///
/// A snapshot measures, in order: exploitability of the average strategy,
/// payoff of the average strategy, and in static mode the same two for the
/// current strategy. The current strategy is measured by binding it to the
/// learner agent for the duration of the measurement.
pub struct Trainer<'a, G: Game> {
    solver: &'a mut CFRSolver<G>,
    schedule: Schedule,
    oracle: Option<&'a dyn ExploitabilityOracle<G>>,
    evaluation: Option<Evaluation<G>>,
    learner: Agent<G>,
    session: TrainingSession,
}

impl<'a, G: Game> Trainer<'a, G> {
    /// Create a trainer with the default schedule and no measurements.
    pub fn new(solver: &'a mut CFRSolver<G>, title: impl Into<String>) -> Self {
        let title = title.into();
        let learner = Agent::new(
            solver.measurement_policy(solver.average_policy()),
            format!("{} learner", title),
        );
        Self {
            solver,
            schedule: Schedule::default(),
            oracle: None,
            evaluation: None,
            learner,
            session: TrainingSession::new(title),
        }
    }

    /// Builder method: set the snapshot schedule.
    pub fn with_schedule(mut self, schedule: Schedule) -> Result<Self, TrainingError> {
        schedule.validate()?;
        self.schedule = schedule;
        Ok(self)
    }

    /// Builder method: measure exploitability with `oracle`.
    pub fn with_oracle(mut self, oracle: &'a dyn ExploitabilityOracle<G>) -> Self {
        self.oracle = Some(oracle);
        self
    }

    /// Builder method: measure self-play payoff against `opponent`.
    pub fn with_evaluation(mut self, experiment: Experiment<G>, opponent: Agent<G>) -> Self {
        self.evaluation = Some(Evaluation {
            experiment,
            opponent,
        });
        self
    }

    /// Recorded snapshots so far.
    pub fn session(&self) -> &TrainingSession {
        &self.session
    }

    /// Consume the trainer and return the recorded session.
    pub fn into_session(self) -> TrainingSession {
        self.session
    }

    /// The agent used for learner measurements.
    pub fn learner(&self) -> &Agent<G> {
        &self.learner
    }

    /// The solver being trained.
    pub fn solver(&self) -> &CFRSolver<G> {
        &*self.solver
    }

    /// Run `iterations` solver iterations.
    pub fn run(&mut self, iterations: u64) -> Result<&TrainingSession, TrainingError> {
        self.run_with_callback(iterations, |_| {})
    }

    /// Run `iterations` solver iterations, calling `callback` with the
    /// iteration number after each one.
    ///
    /// Snapshots the starting iteration first unless it is already recorded.
    pub fn run_with_callback<F>(
        &mut self,
        iterations: u64,
        mut callback: F,
    ) -> Result<&TrainingSession, TrainingError>
    where
        F: FnMut(u64),
    {
        let start_time = Instant::now();
        log::info!(
            "{}: training {} iterations from iteration {}",
            self.session.title,
            iterations,
            self.solver.iteration()
        );

        let start = self.solver.iteration();
        if self.last_snapshot() != Some(start) {
            self.snapshot()?;
        }

        for _ in 0..iterations {
            self.solver.evaluate_and_update_policy()?;
            let iteration = self.solver.iteration();
            self.session.iterations = iteration;

            if self.schedule.is_scheduled(iteration) {
                self.snapshot()?;
            }
            callback(iteration);
        }
        self.bind_average();

        log::info!(
            "{}: finished at iteration {} in {:.2}s",
            self.session.title,
            self.solver.iteration(),
            start_time.elapsed().as_secs_f64()
        );
        if let Some((iteration, value)) = self.session.exploitability.average.last() {
            log::info!("{}: exploitability {:.6} at iteration {}", self.session.title, value, iteration);
        }
        Ok(&self.session)
    }

    /// Latest iteration with any recorded snapshot.
    fn last_snapshot(&self) -> Option<u64> {
        let series = [&self.session.exploitability, &self.session.payoff];
        series
            .iter()
            .flat_map(|s| [s.average.last_iteration(), s.current.last_iteration()])
            .flatten()
            .max()
    }

    /// Bind the learner to the solver's latest average strategy.
    fn bind_average(&mut self) {
        let average = self.solver.measurement_policy(self.solver.average_policy());
        self.learner.replace_policy(average);
    }

    /// Measure the learner at the solver's current iteration.
    ///
    /// Every measurement runs before anything is recorded, so a failure
    /// leaves all series at the same length.
    pub fn snapshot(&mut self) -> Result<(), TrainingError> {
        let iteration = self.solver.iteration();
        if let Some(last) = self.last_snapshot() {
            if iteration <= last {
                return Err(TrainingError::NonMonotonicSnapshot { iteration, last });
            }
        }

        self.bind_average();
        let average_exploitability = self.measure_exploitability()?;
        let average_payoff = self.measure_payoff()?;

        let (current_exploitability, current_payoff) = if self.solver.is_static() {
            let current = self.solver.measurement_policy(self.solver.current_policy());
            let average = self.learner.replace_policy(current);

            let exploitability = self.measure_exploitability();
            let payoff = self.measure_payoff();
            self.learner.replace_policy(average);
            (exploitability?, payoff?)
        } else {
            (None, None)
        };

        self.session.iterations = iteration;
        let session = &mut self.session;
        if let Some(value) = average_exploitability {
            session.exploitability.average.record(iteration, value)?;
            log::debug!("iteration {}: average exploitability {:.6}", iteration, value);
        }
        if let Some(value) = average_payoff {
            session.payoff.average.record(iteration, value)?;
            log::debug!("iteration {}: average payoff {:.4}", iteration, value);
        }
        if let Some(value) = current_exploitability {
            session.exploitability.current.record(iteration, value)?;
            log::debug!("iteration {}: current exploitability {:.6}", iteration, value);
        }
        if let Some(value) = current_payoff {
            session.payoff.current.record(iteration, value)?;
            log::debug!("iteration {}: current payoff {:.4}", iteration, value);
        }
        Ok(())
    }

    fn measure_exploitability(&self) -> Result<Option<f64>, TrainingError> {
        match self.oracle {
            Some(oracle) => Ok(Some(self.learner.exploitability(self.solver.game(), oracle)?)),
            None => Ok(None),
        }
    }

    fn measure_payoff(&self) -> Result<Option<f64>, TrainingError> {
        match &self.evaluation {
            Some(evaluation) => {
                let outcome = evaluation.experiment.run([&self.learner, &evaluation.opponent])?;
                Ok(Some(outcome.p0_average_return))
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rustc_hash::FxHashMap;

    use super::*;
    use crate::cfr::config::CFRConfig;
    use crate::cfr::exploitability::BestResponseOracle;
    use crate::cfr::policy::{Policy, SharedPolicy, TabularPolicy};
    use crate::games::kuhn::{KuhnAction, KuhnPoker, KuhnState};
    use crate::play::experiment::ExperimentConfig;

    fn always_bet(game: &KuhnPoker) -> TabularPolicy<KuhnAction> {
        let uniform = TabularPolicy::uniform(game).unwrap();
        let table = uniform.table().keys().map(|k| (k.clone(), vec![0.0, 1.0])).collect();
        TabularPolicy::new(table)
    }

    #[test]
    fn test_two_sided_snapshots_follow_schedule() {
        let game = KuhnPoker::new();
        let oracle = BestResponseOracle::new();
        let mut solver = CFRSolver::new(game, CFRConfig::default()).unwrap();

        let mut trainer = Trainer::new(&mut solver, "nes").with_oracle(&oracle);
        let session = trainer.run(30).unwrap();

        let iterations: Vec<u64> = session.exploitability.average.iterations().collect();
        assert_eq!(iterations, vec![0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 20, 30]);
        assert!(session.exploitability.current.is_empty());
        assert!(session.payoff.average.is_empty());
        assert_eq!(session.iterations, 30);

        let first = session.exploitability.average.get(0).unwrap();
        let last = session.exploitability.average.get(30).unwrap();
        assert!(last < first, "exploitability {} should fall below {}", last, first);
    }

    #[test]
    fn test_resumed_run_does_not_duplicate_start() {
        let oracle = BestResponseOracle::new();
        let mut solver = CFRSolver::new(KuhnPoker::new(), CFRConfig::default()).unwrap();
        let mut trainer = Trainer::new(&mut solver, "resume").with_oracle(&oracle);

        trainer.run(20).unwrap();
        trainer.run(10).unwrap();

        let iterations: Vec<u64> = trainer.session().exploitability.average.iterations().collect();
        assert_eq!(iterations.last(), Some(&30));
        assert_eq!(iterations.iter().filter(|&&i| i == 20).count(), 1);
    }

    #[test]
    fn test_static_mode_tracks_current_and_average() {
        let game = KuhnPoker::new();
        let oracle = BestResponseOracle::new();
        let frozen: SharedPolicy<KuhnPoker> = Arc::new(always_bet(&game));
        let mut solver =
            CFRSolver::static_best_response(game.clone(), CFRConfig::default(), frozen.clone())
                .unwrap();

        let experiment = Experiment::new(
            game.clone(),
            ExperimentConfig::new("br vs. always bet").with_rounds(2_000).with_seed(17),
        )
        .unwrap();
        let opponent = Agent::new(frozen, "always bet");

        let mut trainer = Trainer::new(&mut solver, "br")
            .with_schedule(Schedule::new(2, 50).unwrap())
            .unwrap()
            .with_oracle(&oracle)
            .with_evaluation(experiment, opponent);
        let session = trainer.run(200).unwrap().clone();

        let expected: Vec<u64> = vec![0, 1, 2, 50, 100, 150, 200];
        assert_eq!(session.exploitability.average.iterations().collect::<Vec<_>>(), expected);
        assert_eq!(session.exploitability.current.iterations().collect::<Vec<_>>(), expected);
        assert_eq!(session.payoff.average.iterations().collect::<Vec<_>>(), expected);
        assert_eq!(session.payoff.current.iterations().collect::<Vec<_>>(), expected);

        // Best response to always-bet earns 1/3 per hand from either seat
        let (_, payoff) = session.payoff.average.last().unwrap();
        assert!(payoff > 0.15, "payoff against always-bet {}", payoff);
    }

    #[test]
    fn test_learner_bound_to_latest_average_after_run() {
        let game = KuhnPoker::new();
        let oracle = BestResponseOracle::new();
        let frozen: SharedPolicy<KuhnPoker> = Arc::new(always_bet(&game));
        let mut solver =
            CFRSolver::static_best_response(game.clone(), CFRConfig::default(), frozen).unwrap();

        let mut trainer = Trainer::new(&mut solver, "swap").with_oracle(&oracle);
        trainer.run(15).unwrap();

        let state = KuhnState {
            cards: [1, 0],
            dealt: 2,
            history: "b".to_string(),
            pot: [2, 1],
        };
        let bound = trainer.learner().policy().action_probabilities(&game, &state).unwrap();
        let average = trainer.solver().average_policy().action_probabilities(&game, &state).unwrap();
        assert_eq!(bound, average);
    }

    #[test]
    fn test_failed_snapshot_records_nothing() {
        let game = KuhnPoker::new();
        let oracle = BestResponseOracle::new();
        let mut solver = CFRSolver::new(game.clone(), CFRConfig::default()).unwrap();

        let experiment = Experiment::new(
            game,
            ExperimentConfig::new("nes vs. nobody").with_rounds(100).with_seed(3),
        )
        .unwrap();
        let empty = Agent::from_policy(TabularPolicy::<KuhnAction>::new(FxHashMap::default()), "empty");

        let mut trainer = Trainer::new(&mut solver, "partial")
            .with_oracle(&oracle)
            .with_evaluation(experiment, empty);
        assert!(trainer.run(5).is_err());

        // Exploitability succeeded but payoff failed at iteration 0
        let session = trainer.session();
        assert!(session.exploitability.average.is_empty());
        assert!(session.payoff.average.is_empty());
    }

    #[test]
    fn test_snapshot_rejects_repeated_iteration() {
        let oracle = BestResponseOracle::new();
        let mut solver = CFRSolver::new(KuhnPoker::new(), CFRConfig::default()).unwrap();
        let mut trainer = Trainer::new(&mut solver, "repeat").with_oracle(&oracle);

        trainer.snapshot().unwrap();
        assert_eq!(
            trainer.snapshot(),
            Err(TrainingError::NonMonotonicSnapshot { iteration: 0, last: 0 })
        );
        assert_eq!(trainer.session().exploitability.average.len(), 1);
    }
}
