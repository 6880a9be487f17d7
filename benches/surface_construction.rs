use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use ivsurf::implied::{BlackImpliedVol, bs_price};
use ivsurf::surface::{InterpolationMethod, SparseGrid, interpolate, smooth};
use ivsurf::{OptionQuote, OptionType, SurfaceEngine};

const SPOT: f64 = 100.0;
const RATE: f64 = 0.04;

/// Synthetic OTM chain with `n_tenors × n_strikes` quotes.
fn generate_chain(n_tenors: usize, n_strikes: usize) -> Vec<OptionQuote> {
    let mut quotes = Vec::with_capacity(n_tenors * n_strikes);
    for i in 1..=n_tenors {
        let t = i as f64 * 0.1;
        for j in 0..n_strikes {
            let k = 80.0 + 40.0 * j as f64 / (n_strikes - 1) as f64;
            let m = (k / SPOT).ln();
            let vol = 0.2 - 0.1 * m + 0.3 * m * m;
            let ty = if k < SPOT { OptionType::Put } else { OptionType::Call };
            let p = bs_price(SPOT, k, t, RATE, vol, ty);
            quotes.push(OptionQuote::new(k, p * 0.995, p * 1.005, 10, ty, t));
        }
    }
    quotes
}

fn solver_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("implied_vol");
    let solver = BlackImpliedVol::default();
    let chain = generate_chain(8, 25);

    group.bench_function("single_atm", |b| {
        let price = bs_price(SPOT, 100.0, 0.5, RATE, 0.25, OptionType::Call);
        b.iter(|| solver.solve(black_box(price), SPOT, 100.0, 0.5, RATE, OptionType::Call))
    });

    group.bench_function("chain_200", |b| b.iter(|| solver.solve_chain(SPOT, RATE, black_box(&chain))));

    group.finish();
}

fn interpolation_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("interpolation");
    let solved = BlackImpliedVol::default().solve_chain(SPOT, RATE, &generate_chain(8, 15));
    let sparse = SparseGrid::build(&solved);

    for name in ["linear", "cubic", "nearest", "kriging"] {
        let method = InterpolationMethod::from_name(name);
        group.bench_with_input(BenchmarkId::new(name, 50), &method, |b, m| {
            b.iter(|| interpolate(black_box(&sparse), m, 50))
        });
    }

    let dense = interpolate(&sparse, &InterpolationMethod::Cubic, 50).map(|i| i.grid);
    if let Ok(dense) = dense {
        group.bench_function("smooth_50x50", |b| b.iter(|| smooth(black_box(&dense), 50)));
    }

    group.finish();
}

fn engine_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine");

    for (n_tenors, n_strikes) in [(5, 15), (12, 30)] {
        let chain = generate_chain(n_tenors, n_strikes);
        let engine = SurfaceEngine::default();
        group.bench_function(format!("build_{n_tenors}x{n_strikes}"), |b| {
            b.iter(|| engine.build("BENCH", SPOT, black_box(&chain)))
        });
    }

    group.finish();
}

criterion_group!(benches, solver_benchmarks, interpolation_benchmarks, engine_benchmarks);
criterion_main!(benches);
