//! Benchmarks for the CFR solver and self-play.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use semistatic_cfr::cfr::{BestResponseOracle, CFRConfig, CFRSolver, ExploitabilityOracle, SharedPolicy};
use semistatic_cfr::games::kuhn::KuhnPoker;
use semistatic_cfr::play::{Agent, Experiment, ExperimentConfig};

fn kuhn_iteration_benchmark(c: &mut Criterion) {
    let game = KuhnPoker::new();
    let mut solver = CFRSolver::new(game, CFRConfig::default()).unwrap();

    c.bench_function("kuhn_single_iteration", |b| {
        b.iter(|| {
            solver.evaluate_and_update_policy().unwrap();
            black_box(solver.iteration())
        })
    });
}

fn kuhn_1000_iterations_benchmark(c: &mut Criterion) {
    c.bench_function("kuhn_1000_iterations", |b| {
        b.iter(|| {
            let game = KuhnPoker::new();
            let mut solver = CFRSolver::new(game, CFRConfig::default()).unwrap();
            solver.train(black_box(1000)).unwrap().iterations
        })
    });
}

fn kuhn_static_best_response_benchmark(c: &mut Criterion) {
    let game = KuhnPoker::new();
    let mut nes_solver = CFRSolver::new(game.clone(), CFRConfig::default()).unwrap();
    nes_solver.train(200).unwrap();
    let frozen: SharedPolicy<KuhnPoker> = Arc::new(nes_solver.average_policy());

    c.bench_function("kuhn_static_br_100_iterations", |b| {
        b.iter(|| {
            let mut solver =
                CFRSolver::static_best_response(game.clone(), CFRConfig::default(), frozen.clone())
                    .unwrap();
            solver.train(black_box(100)).unwrap().iterations
        })
    });
}

fn kuhn_exploitability_benchmark(c: &mut Criterion) {
    let game = KuhnPoker::new();
    let mut solver = CFRSolver::new(game.clone(), CFRConfig::default()).unwrap();
    solver.train(100).unwrap();
    let policy = solver.average_policy();
    let oracle = BestResponseOracle::new();

    c.bench_function("kuhn_exploitability", |b| {
        b.iter(|| oracle.exploitability(&game, black_box(&policy)).unwrap())
    });
}

fn kuhn_self_play_benchmark(c: &mut Criterion) {
    let game = KuhnPoker::new();
    let mut solver = CFRSolver::new(game.clone(), CFRConfig::default()).unwrap();
    solver.train(200).unwrap();
    let nes = Agent::from_policy(solver.average_policy(), "NES");

    let sequential = Experiment::new(
        game.clone(),
        ExperimentConfig::new("bench").with_rounds(10_000).with_seed(42),
    )
    .unwrap();
    let parallel = Experiment::new(
        game,
        ExperimentConfig::new("bench").with_rounds(10_000).with_seed(42).with_threads(8),
    )
    .unwrap();

    c.bench_function("kuhn_self_play_10000_rounds", |b| {
        b.iter(|| sequential.run([&nes, &nes]).unwrap().p0_average_return)
    });
    c.bench_function("kuhn_self_play_10000_rounds_parallel", |b| {
        b.iter(|| parallel.run([&nes, &nes]).unwrap().p0_average_return)
    });
}

criterion_group!(
    benches,
    kuhn_iteration_benchmark,
    kuhn_1000_iterations_benchmark,
    kuhn_static_best_response_benchmark,
    kuhn_exploitability_benchmark,
    kuhn_self_play_benchmark
);
criterion_main!(benches);
