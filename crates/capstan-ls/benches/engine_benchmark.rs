// Copyright (c) 2025 Felix Kahle.
//
// Permission is hereby granted, free of charge, to any person obtaining
// a copy of this software and associated documentation files (the
// "Software"), to deal in the Software without restriction, including
// without limitation the rights to use, copy, modify, merge, publish,
// distribute, sublicense, and/or sell copies of the Software, and to
// permit persons to whom the Software is furnished to do so, subject to
// the following conditions:
//
// The above copyright notice and this permission notice shall be
// included in all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND,
// EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF
// MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND
// NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE
// LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION
// OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION
// WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! Hot-path benchmarks: incremental move application against the full
//! activity refresh, across model sizes.

use capstan_core::num::Tolerances;
use capstan_ls::state::SearchState;
use capstan_model::constraint::ConSense;
use capstan_model::index::{VarIndex, OBJECTIVE_CON};
use capstan_model::store::ModelStore;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Builds a dense-ish random packing model: `num_vars` binaries, one
/// objective term each, and `num_vars / 4` rows with ~16 terms.
fn build_model(num_vars: usize, seed: u64) -> ModelStore {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut store = ModelStore::new(Tolerances::default());
    for var_idx in 0..num_vars {
        let idx = store.make_variable(&format!("x{}", var_idx), true);
        store.add_term(OBJECTIVE_CON, idx, rng.random_range(1..=10) as f64);
    }
    for con_idx in 0..num_vars / 4 {
        let con = store.make_constraint(&format!("c{}", con_idx), ConSense::LessEqual);
        for _ in 0..16 {
            let var = VarIndex::new(rng.random_range(0..num_vars));
            store.add_term(con, var, rng.random_range(1..=5) as f64);
        }
        store.con_mut(con).set_rhs(rng.random_range(8..=40) as f64);
    }
    store.process_after_read().unwrap();
    store
}

fn bench_apply_move(c: &mut Criterion) {
    let mut group = c.benchmark_group("apply_move");
    for &num_vars in &[256usize, 2048] {
        let model = build_model(num_vars, 7);
        let mut state = SearchState::new(&model);
        state.refresh_activities(&model);
        let mut rng = StdRng::seed_from_u64(13);
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::from_parameter(num_vars), &model, |b, model| {
            let mut toggle = 1.0;
            b.iter(|| {
                let var = VarIndex::new(rng.random_range(0..num_vars));
                state.apply_move(model, var, toggle, &mut rng, 4, 7, usize::MAX);
                toggle = -toggle;
            });
        });
    }
    group.finish();
}

fn bench_refresh_activities(c: &mut Criterion) {
    let mut group = c.benchmark_group("refresh_activities");
    for &num_vars in &[256usize, 2048] {
        let model = build_model(num_vars, 7);
        let mut state = SearchState::new(&model);
        state.refresh_activities(&model);
        group.throughput(Throughput::Elements((num_vars / 4) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(num_vars), &model, |b, model| {
            b.iter(|| state.refresh_activities(model));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_apply_move, bench_refresh_activities);
criterion_main!(benches);
