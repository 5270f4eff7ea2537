use callqueue::metrics::sweep::{self, SweepConfig};
use callqueue::prelude::*;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn single_run(c: &mut Criterion) {
    let cfg = SimConfig::default()
        .with_clients(1_000)
        .with_agents(5)
        .with_budget(None)
        .with_seed(1);

    c.bench_function("run 1000 clients, event", |b| {
        b.iter(|| {
            let mut sim = Simulation::new(black_box(cfg.clone())).unwrap();
            sim.run_to_end().unwrap()
        })
    });

    let tick = cfg.clone().with_stepping("tick");
    c.bench_function("run 1000 clients, tick", |b| {
        b.iter(|| {
            let mut sim = Simulation::new(black_box(tick.clone())).unwrap();
            sim.run_to_end().unwrap()
        })
    });
}

fn agent_sweep(c: &mut Criterion) {
    let base = SimConfig::default().with_clients(100);
    let sweep_cfg = SweepConfig::default().with_trials(8).with_seed(3);
    c.bench_function("sweep 1..=9 agents x 8 trials", |b| {
        b.iter(|| sweep::run(black_box(&base), &sweep_cfg).unwrap())
    });
}

criterion_group!(benches, single_run, agent_sweep);
criterion_main!(benches);
