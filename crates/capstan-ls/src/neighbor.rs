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

//! Candidate move generation.
//!
//! Each strategy fills the shared [`OpBuffer`] with (variable, delta)
//! candidates and sets the accepted count. Work per step is kept constant
//! by bounded-multiple-selection (BMS): a bounded uniform sample of source
//! rows or variables, and a bounded resample of the emitted operations.
//!
//! The delta computations are shared: a *tight* delta makes a sampled row
//! exactly satisfied by moving one of its variables, a *breakthrough*
//! delta pushes the objective row below the current improvement threshold.
//! Bound violations clamp toward satisfaction for violated rows and away
//! from it for satisfied rows (which is what makes `sat_mtm` an
//! exploration strategy rather than a no-op).

use crate::state::{OpBuffer, SearchState, NO_POS};
use capstan_model::index::{ConIndex, VarIndex, OBJECTIVE_CON};
use capstan_model::store::ModelStore;
use rand::rngs::StdRng;
use rand::Rng;
use std::collections::HashMap;

/// Reusable sampling scratch. The remap table makes the partial
/// Fisher-Yates draw distinct indices without mutating the source list.
#[derive(Debug, Clone, Default)]
pub struct SampleScratch {
    con_idxs: Vec<ConIndex>,
    var_idxs: Vec<VarIndex>,
    remap: HashMap<usize, usize>,
}

/// Draws up to `max_sample` distinct elements uniformly from `source`.
/// Returns the source itself when it is small enough.
fn sample_idxs<'a, T: Copy>(
    source: &'a [T],
    max_sample: usize,
    scratch: &'a mut Vec<T>,
    remap: &mut HashMap<usize, usize>,
    rng: &mut StdRng,
) -> &'a [T] {
    if source.len() <= max_sample {
        return source;
    }
    scratch.clear();
    remap.clear();
    let mut available = source.len();
    for _ in 0..max_sample {
        let random_idx = rng.random_range(0..available);
        let actual = *remap.get(&random_idx).unwrap_or(&random_idx);
        let last = available - 1;
        let mapped_last = *remap.get(&last).unwrap_or(&last);
        remap.insert(random_idx, mapped_last);
        scratch.push(source[actual]);
        available -= 1;
    }
    scratch
}

/// Keeps a uniform `max_ops`-subset at the front of the op lists via
/// in-place partial Fisher-Yates. Returns the accepted count.
fn sample_op(max_ops: usize, ops: &mut OpBuffer, rng: &mut StdRng) -> usize {
    let available = ops.len();
    if available == 0 || max_ops == 0 {
        return 0;
    }
    if available <= max_ops {
        return available;
    }
    for base in 0..max_ops {
        let random_idx = base + rng.random_range(0..available - base);
        ops.var_idxs.swap(random_idx, base);
        ops.deltas.swap(random_idx, base);
    }
    max_ops
}

/// The standard tabu predicate: a direction is forbidden until its allow
/// step has been reached.
#[inline]
pub(crate) fn tabu(state: &SearchState, var_idx: VarIndex, delta: f64) -> bool {
    let j = var_idx.get();
    (delta < 0.0 && state.cur_step < state.allow_dec_step[j])
        || (delta > 0.0 && state.cur_step < state.allow_inc_step[j])
}

/// The stricter immediate-reversal predicate used by the random strategy:
/// reject a delta that would undo the previous step on this variable.
#[inline]
pub(crate) fn tabu_latest(state: &SearchState, var_idx: VarIndex, delta: f64) -> bool {
    let j = var_idx.get();
    (delta < 0.0 && state.cur_step == state.last_inc_step[j] + 1)
        || (delta > 0.0 && state.cur_step == state.last_dec_step[j] + 1)
}

/// Delta that makes inequality row `con_idx` exactly satisfied by moving
/// `var_idx` (term `term_idx` of the row), rounded toward the feasible
/// side for integral variables and clamped on bound violation.
pub(crate) fn inequality_tight(
    model: &ModelStore,
    state: &SearchState,
    con_idx: ConIndex,
    term_idx: usize,
    var_idx: VarIndex,
) -> f64 {
    let con = model.con(con_idx);
    let var = model.var(var_idx);
    let gap = state.con_activity[con_idx.get()] - state.con_rhs[con_idx.get()];
    let coeff = con.coeff(term_idx);
    if coeff.abs() < state.tol.zero {
        return 0.0;
    }
    let mut delta = -(gap / coeff);
    if !var.is_real() {
        delta = if coeff > 0.0 { delta.floor() } else { delta.ceil() };
    }
    let value = state.var_value[var_idx.get()];
    if !var.in_bound(value + delta, state.tol.feas) {
        let row_unsat = state.pos_in_unsat[con_idx.get()] != NO_POS;
        delta = if row_unsat {
            // Drag the row toward satisfaction as far as bounds allow.
            if coeff > 0.0 {
                var.lower_bound() - value
            } else {
                var.upper_bound() - value
            }
        } else {
            // Satisfied row: walk away from the tight side instead.
            if coeff > 0.0 {
                var.upper_bound() - value
            } else {
                var.lower_bound() - value
            }
        };
    }
    delta
}

/// Equality-row variant: round to nearest, clamp by the sign of
/// `gap * coeff`.
pub(crate) fn equality_tight(
    model: &ModelStore,
    state: &SearchState,
    con_idx: ConIndex,
    term_idx: usize,
    var_idx: VarIndex,
) -> f64 {
    let con = model.con(con_idx);
    let var = model.var(var_idx);
    let gap = state.con_activity[con_idx.get()] - state.con_rhs[con_idx.get()];
    let coeff = con.coeff(term_idx);
    if coeff.abs() < state.tol.zero {
        return 0.0;
    }
    let mut delta = -(gap / coeff);
    if !var.is_real() {
        delta = delta.round();
    }
    let value = state.var_value[var_idx.get()];
    if !var.in_bound(value + delta, state.tol.feas) {
        delta = if (gap > 0.0 && coeff > 0.0) || (gap < 0.0 && coeff < 0.0) {
            var.lower_bound() - value
        } else {
            var.upper_bound() - value
        };
    }
    delta
}

/// Delta that would push the objective row's activity below the current
/// improvement threshold through objective term `term_idx`.
pub(crate) fn breakthrough(
    model: &ModelStore,
    state: &SearchState,
    term_idx: usize,
    var_idx: VarIndex,
) -> f64 {
    debug_assert!(
        !state.obj_breakthrough,
        "called `breakthrough` while the objective row is already below its threshold"
    );
    let obj = model.objective();
    let var = model.var(var_idx);
    let c = OBJECTIVE_CON.get();
    let gap = state.con_activity[c] - state.con_rhs[c];
    let coeff = obj.coeff(term_idx);
    if coeff.abs() < state.tol.zero {
        return 0.0;
    }
    let mut delta = -(gap / coeff);
    if !var.is_real() {
        delta = if coeff > 0.0 { delta.floor() } else { delta.ceil() };
    }
    let value = state.var_value[var_idx.get()];
    if !var.in_bound(value + delta, state.tol.feas) {
        delta = if coeff > 0.0 {
            var.lower_bound() - value
        } else {
            var.upper_bound() - value
        };
    }
    delta
}

/// Everything a generator reads and writes during one exploration.
pub struct NeighborCtx<'a> {
    pub model: &'a ModelStore,
    pub state: &'a SearchState,
    pub ops: &'a mut OpBuffer,
    pub rng: &'a mut StdRng,
    pub scratch: &'a mut SampleScratch,
}

/// Callback type for user-supplied generators.
pub type NeighborCbk = Box<dyn FnMut(&mut NeighborCtx<'_>) + Send>;

enum Strategy {
    UnsatMtmBm,
    SatMtm,
    Flip,
    Easy,
    UnsatMtmBmRandom,
    Custom(NeighborCbk),
}

/// One entry of the exploration pipeline: a strategy plus its BMS caps.
pub struct Neighbor {
    strategy: Strategy,
    bms_con: usize,
    bms_op: usize,
}

impl std::fmt::Debug for Neighbor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match &self.strategy {
            Strategy::UnsatMtmBm => "unsat_mtm_bm",
            Strategy::SatMtm => "sat_mtm",
            Strategy::Flip => "flip",
            Strategy::Easy => "easy",
            Strategy::UnsatMtmBmRandom => "unsat_mtm_bm_random",
            Strategy::Custom(_) => "custom",
        };
        write!(f, "Neighbor({}, bms_con: {}, bms_op: {})", name, self.bms_con, self.bms_op)
    }
}

impl Neighbor {
    /// Creates a named strategy; unknown names fall back to
    /// `unsat_mtm_bm`.
    pub fn new(name: &str, bms_con: usize, bms_op: usize) -> Self {
        let strategy = match name.to_ascii_lowercase().as_str() {
            "" | "unsat_mtm_bm" => Strategy::UnsatMtmBm,
            "sat_mtm" => Strategy::SatMtm,
            "flip" => Strategy::Flip,
            "easy" => Strategy::Easy,
            "unsat_mtm_bm_random" => Strategy::UnsatMtmBmRandom,
            other => {
                tracing::warn!(
                    method = other,
                    "unsupported neighbor method, fallback to unsat_mtm_bm"
                );
                Strategy::UnsatMtmBm
            }
        };
        Self {
            strategy,
            bms_con,
            bms_op,
        }
    }

    /// Creates a user-defined strategy.
    pub fn custom(cbk: NeighborCbk) -> Self {
        Self {
            strategy: Strategy::Custom(cbk),
            bms_con: 0,
            bms_op: 0,
        }
    }

    /// Runs the strategy, leaving candidates in `ctx.ops`.
    pub fn explore(&mut self, ctx: &mut NeighborCtx<'_>) {
        match &mut self.strategy {
            Strategy::UnsatMtmBm => explore_unsat_mtm_bm(ctx, self.bms_con, self.bms_op),
            Strategy::SatMtm => explore_sat_mtm(ctx, self.bms_con, self.bms_op),
            Strategy::Flip => explore_flip(ctx, self.bms_op),
            Strategy::Easy => explore_easy(ctx, self.bms_op),
            Strategy::UnsatMtmBmRandom => explore_unsat_random_bm(ctx, self.bms_op),
            Strategy::Custom(cbk) => cbk(ctx),
        }
    }
}

fn explore_unsat_mtm_bm(ctx: &mut NeighborCtx<'_>, bms_con: usize, bms_op: usize) {
    if bms_con == 0 || bms_op == 0 {
        return;
    }
    let model = ctx.model;
    let state = ctx.state;
    let ops = &mut *ctx.ops;
    let rng = &mut *ctx.rng;
    let scratch = &mut *ctx.scratch;
    if !state.unsat_idxs.is_empty() {
        let sampled = sample_idxs(
            &state.unsat_idxs,
            bms_con,
            &mut scratch.con_idxs,
            &mut scratch.remap,
            rng,
        );
        for &con_idx in sampled {
            let con = model.con(con_idx);
            let is_eq = state.con_is_equality[con_idx.get()];
            for term_idx in 0..con.term_num() {
                let var_idx = con.var_idx(term_idx);
                let delta = if is_eq {
                    equality_tight(model, state, con_idx, term_idx, var_idx)
                } else {
                    inequality_tight(model, state, con_idx, term_idx, var_idx)
                };
                if tabu(state, var_idx, delta) {
                    continue;
                }
                if delta.abs() < state.tol.zero {
                    continue;
                }
                ops.push(var_idx, delta);
            }
        }
    }
    if state.found_feasible && !state.obj_breakthrough {
        let obj = model.objective();
        for term_idx in 0..obj.term_num() {
            let var_idx = obj.var_idx(term_idx);
            let delta = breakthrough(model, state, term_idx, var_idx);
            if tabu(state, var_idx, delta) {
                continue;
            }
            if delta.abs() < state.tol.zero {
                continue;
            }
            ops.push(var_idx, delta);
        }
    }
    ops.size = sample_op(bms_op, ops, rng);
}

fn explore_sat_mtm(ctx: &mut NeighborCtx<'_>, bms_con: usize, bms_op: usize) {
    let model = ctx.model;
    let state = ctx.state;
    let ops = &mut *ctx.ops;
    let rng = &mut *ctx.rng;
    let scratch = &mut *ctx.scratch;
    if model.con_num() <= 1 || !state.found_feasible || bms_con == 0 || bms_op == 0 {
        return;
    }
    if !state.sat_idxs.is_empty() {
        let sampled = sample_idxs(
            &state.sat_idxs,
            bms_con,
            &mut scratch.con_idxs,
            &mut scratch.remap,
            rng,
        );
        for &con_idx in sampled {
            let con = model.con(con_idx);
            if state.con_is_equality[con_idx.get()] || con.is_inferred_sat() {
                continue;
            }
            for term_idx in 0..con.term_num() {
                let var_idx = con.var_idx(term_idx);
                let delta = inequality_tight(model, state, con_idx, term_idx, var_idx);
                if tabu(state, var_idx, delta) {
                    continue;
                }
                if delta.abs() < state.tol.zero {
                    continue;
                }
                ops.push(var_idx, delta);
            }
        }
    }
    ops.size = sample_op(bms_op, ops, rng);
}

fn explore_flip(ctx: &mut NeighborCtx<'_>, bms_op: usize) {
    let model = ctx.model;
    let state = ctx.state;
    let ops = &mut *ctx.ops;
    let rng = &mut *ctx.rng;
    let scratch = &mut *ctx.scratch;
    let binaries = model.binary_idx_list();
    if binaries.is_empty() || bms_op == 0 {
        return;
    }
    let sampled = sample_idxs(
        binaries,
        bms_op,
        &mut scratch.var_idxs,
        &mut scratch.remap,
        rng,
    );
    for &var_idx in sampled {
        debug_assert!(model.var(var_idx).is_binary(state.tol.feas));
        let delta = if state.var_value[var_idx.get()] > 0.5 {
            -1.0
        } else {
            1.0
        };
        if !tabu(state, var_idx, delta) {
            ops.push(var_idx, delta);
        }
    }
    ops.size = ops.len();
}

fn explore_easy(ctx: &mut NeighborCtx<'_>, bms_op: usize) {
    let model = ctx.model;
    let state = ctx.state;
    let ops = &mut *ctx.ops;
    let rng = &mut *ctx.rng;
    let scratch = &mut *ctx.scratch;
    if bms_op == 0 {
        return;
    }
    let sampled = sample_idxs(
        model.non_fixed_var_idxs(),
        bms_op,
        &mut scratch.var_idxs,
        &mut scratch.remap,
        rng,
    );
    let feas = state.tol.feas;
    for &var_idx in sampled {
        let var = model.var(var_idx);
        let value = state.var_value[var_idx.get()];
        // Toward the bound carrying the sign of the current region, or
        // zero when the interval spans it.
        let delta = if var.lower_bound() > 0.0 {
            var.lower_bound() - value
        } else if var.upper_bound() < 0.0 {
            var.upper_bound() - value
        } else {
            -value
        };
        if delta.abs() > feas && !tabu(state, var_idx, delta) {
            ops.push(var_idx, delta);
        }
        let has_finite_lower = var.has_finite_lower();
        let has_finite_upper = var.has_finite_upper();
        if var.is_real() && has_finite_lower && has_finite_upper {
            let delta = (var.lower_bound() + var.upper_bound()) * 0.5 - value;
            if delta.abs() > feas && !tabu(state, var_idx, delta) {
                ops.push(var_idx, delta);
            }
        }
        if has_finite_lower && var.lower_bound() < 0.0 {
            let delta = var.lower_bound() - value;
            if delta.abs() > feas && !tabu(state, var_idx, delta) {
                ops.push(var_idx, delta);
            }
        }
        if has_finite_upper && var.upper_bound() > 0.0 {
            let delta = var.upper_bound() - value;
            if delta.abs() > feas && !tabu(state, var_idx, delta) {
                ops.push(var_idx, delta);
            }
        }
    }
    ops.size = ops.len();
}

fn explore_unsat_random_bm(ctx: &mut NeighborCtx<'_>, bms_op: usize) {
    let model = ctx.model;
    let state = ctx.state;
    let ops = &mut *ctx.ops;
    let rng = &mut *ctx.rng;
    if !state.unsat_idxs.is_empty() {
        let con_idx = state.unsat_idxs[rng.random_range(0..state.unsat_idxs.len())];
        let con = model.con(con_idx);
        let is_eq = state.con_is_equality[con_idx.get()];
        for term_idx in 0..con.term_num() {
            let var_idx = con.var_idx(term_idx);
            let delta = if is_eq {
                equality_tight(model, state, con_idx, term_idx, var_idx)
            } else {
                inequality_tight(model, state, con_idx, term_idx, var_idx)
            };
            if tabu_latest(state, var_idx, delta) {
                continue;
            }
            if delta.abs() < state.tol.zero {
                continue;
            }
            ops.push(var_idx, delta);
        }
    }
    if state.found_feasible && !state.obj_breakthrough {
        let obj = model.objective();
        for term_idx in 0..obj.term_num() {
            let var_idx = obj.var_idx(term_idx);
            let delta = breakthrough(model, state, term_idx, var_idx);
            if tabu_latest(state, var_idx, delta) {
                continue;
            }
            if delta.abs() < state.tol.zero {
                continue;
            }
            ops.push(var_idx, delta);
        }
    }
    ops.size = sample_op(bms_op, ops, rng);
}

#[cfg(test)]
mod tests {
    use super::*;
    use capstan_core::num::Tolerances;
    use capstan_model::constraint::ConSense;
    use capstan_model::store::ModelStore;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(99)
    }

    #[test]
    fn test_sample_idxs_returns_source_when_small() {
        let source: Vec<usize> = (0..5).collect();
        let mut scratch = Vec::new();
        let mut remap = HashMap::new();
        let mut rng = rng();
        let sampled = sample_idxs(&source, 10, &mut scratch, &mut remap, &mut rng);
        assert_eq!(sampled, &source[..]);
    }

    #[test]
    fn test_sample_idxs_draws_distinct() {
        let source: Vec<usize> = (0..100).collect();
        let mut scratch = Vec::new();
        let mut remap = HashMap::new();
        let mut rng = rng();
        let sampled = sample_idxs(&source, 20, &mut scratch, &mut remap, &mut rng).to_vec();
        assert_eq!(sampled.len(), 20);
        let mut unique = sampled.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), 20, "sample must be without replacement");
    }

    #[test]
    fn test_sample_op_keeps_prefix_subset() {
        let mut ops = OpBuffer::default();
        for i in 0..50 {
            ops.push(VarIndex::new(i), i as f64);
        }
        let mut rng = rng();
        let size = sample_op(10, &mut ops, &mut rng);
        assert_eq!(size, 10);
        // Pairs stay aligned through the swaps.
        for i in 0..10 {
            assert_eq!(ops.deltas[i], ops.var_idxs[i].get() as f64);
        }
    }

    /// `x + y >= 2` (normalised to `-x - y <= -2`) over integers in
    /// [0, 5], objective `x`.
    fn unsat_model() -> ModelStore {
        let mut store = ModelStore::new(Tolerances::default());
        let x = store.make_variable("x", true);
        let y = store.make_variable("y", true);
        store.var_mut(x).set_kind(capstan_model::variable::VarKind::GeneralInteger);
        store.var_mut(x).set_upper_bound(5.0);
        store.var_mut(y).set_kind(capstan_model::variable::VarKind::GeneralInteger);
        store.var_mut(y).set_upper_bound(5.0);
        store.add_term(OBJECTIVE_CON, x, 1.0);
        let c = store.make_constraint("cover", ConSense::GreaterEqual);
        store.add_term(c, x, 1.0);
        store.add_term(c, y, 1.0);
        store.con_mut(c).set_rhs(2.0);
        store.set_bound_strengthen(capstan_model::store::BoundStrengthen::Off);
        store.process_after_read().unwrap();
        store
    }

    #[test]
    fn test_inequality_tight_reaches_satisfaction() {
        let model = unsat_model();
        let mut state = SearchState::new(&model);
        state.refresh_activities(&model);
        let c = ConIndex::new(1);
        assert!(state.con_unsat(c.get()));
        let x = model.var_index_by_name("x").unwrap();
        // Row is -x - y <= -2 with activity 0: delta = -(2 / -1) = 2.
        let delta = inequality_tight(&model, &state, c, 0, x);
        assert_eq!(delta, 2.0);
    }

    #[test]
    fn test_unsat_generator_emits_candidates() {
        let model = unsat_model();
        let mut state = SearchState::new(&model);
        state.refresh_activities(&model);
        let mut ops = OpBuffer::default();
        let mut scratch = SampleScratch::default();
        let mut rng = rng();
        let mut ctx = NeighborCtx {
            model: &model,
            state: &state,
            ops: &mut ops,
            rng: &mut rng,
            scratch: &mut scratch,
        };
        let mut neighbor = Neighbor::new("unsat_mtm_bm", 12, 2250);
        neighbor.explore(&mut ctx);
        assert_eq!(ops.size, 2);
        for i in 0..ops.size {
            assert_eq!(ops.deltas[i], 2.0);
        }
    }

    #[test]
    fn test_flip_generator_toggles_binaries() {
        let mut store = ModelStore::new(Tolerances::default());
        let x = store.make_variable("x", true);
        let y = store.make_variable("y", true);
        let c = store.make_constraint("c", ConSense::LessEqual);
        store.add_term(c, x, 1.0);
        store.add_term(c, y, 1.0);
        store.con_mut(c).set_rhs(1.0);
        store.process_after_read().unwrap();

        let mut state = SearchState::new(&store);
        state.var_value = vec![1.0, 0.0];
        state.refresh_activities(&store);
        let mut ops = OpBuffer::default();
        let mut scratch = SampleScratch::default();
        let mut rng = rng();
        let mut ctx = NeighborCtx {
            model: &store,
            state: &state,
            ops: &mut ops,
            rng: &mut rng,
            scratch: &mut scratch,
        };
        let mut neighbor = Neighbor::new("flip", 0, 8);
        neighbor.explore(&mut ctx);
        assert_eq!(ops.size, 2);
        let mut by_var: Vec<(usize, f64)> = (0..ops.size)
            .map(|i| (ops.var_idxs[i].get(), ops.deltas[i]))
            .collect();
        by_var.sort_by_key(|&(v, _)| v);
        assert_eq!(by_var, vec![(0, -1.0), (1, 1.0)]);
    }

    #[test]
    fn test_tabu_blocks_direction() {
        let model = unsat_model();
        let mut state = SearchState::new(&model);
        state.refresh_activities(&model);
        let x = model.var_index_by_name("x").unwrap();
        state.allow_inc_step[x.get()] = 10;
        state.cur_step = 5;
        assert!(tabu(&state, x, 1.0));
        assert!(!tabu(&state, x, -1.0));
        state.cur_step = 10;
        assert!(!tabu(&state, x, 1.0));
    }

    #[test]
    fn test_tabu_latest_blocks_immediate_reversal() {
        let model = unsat_model();
        let mut state = SearchState::new(&model);
        state.refresh_activities(&model);
        let x = model.var_index_by_name("x").unwrap();
        state.last_inc_step[x.get()] = 4;
        state.cur_step = 5;
        assert!(tabu_latest(&state, x, -1.0));
        assert!(!tabu_latest(&state, x, 1.0));
        state.cur_step = 6;
        assert!(!tabu_latest(&state, x, -1.0));
    }

    #[test]
    fn test_easy_generator_proposes_bound_moves() {
        let model = unsat_model();
        let mut state = SearchState::new(&model);
        state.var_value = vec![3.0, 0.0];
        state.refresh_activities(&model);
        let mut ops = OpBuffer::default();
        let mut scratch = SampleScratch::default();
        let mut rng = rng();
        let mut ctx = NeighborCtx {
            model: &model,
            state: &state,
            ops: &mut ops,
            rng: &mut rng,
            scratch: &mut scratch,
        };
        let mut neighbor = Neighbor::new("easy", 0, 10);
        neighbor.explore(&mut ctx);
        assert!(ops.size > 0);
        // x sits at 3 in [0, 5]: both the move to zero and the move to
        // the upper bound must be on offer.
        let moves: Vec<(usize, f64)> = (0..ops.size)
            .map(|i| (ops.var_idxs[i].get(), ops.deltas[i]))
            .collect();
        assert!(moves.contains(&(0, -3.0)));
        assert!(moves.contains(&(0, 2.0)));
    }

    #[test]
    fn test_random_generator_uses_single_row() {
        let model = unsat_model();
        let mut state = SearchState::new(&model);
        state.refresh_activities(&model);
        let mut ops = OpBuffer::default();
        let mut scratch = SampleScratch::default();
        let mut rng = rng();
        let mut ctx = NeighborCtx {
            model: &model,
            state: &state,
            ops: &mut ops,
            rng: &mut rng,
            scratch: &mut scratch,
        };
        let mut neighbor = Neighbor::new("unsat_mtm_bm_random", 0, 250);
        neighbor.explore(&mut ctx);
        assert_eq!(ops.size, 2);
    }
}
