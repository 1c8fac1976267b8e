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

//! Mutable search state: the incumbent assignment, per-row activities and
//! weights, the sat/unsat partition, and per-variable tabu bookkeeping.
//!
//! The state borrows nothing from the model; it is sized once from it and
//! then owns every per-step mutable quantity. `apply_move` is the single
//! write path for values and activities. The partition is maintained with
//! inverted position arrays so membership changes are O(1) swap-and-pop.
//!
//! Row 0 is the objective. Its entry in `con_rhs` is not a model constant
//! but the current improvement threshold: the infinity sentinel until the
//! first feasible solution, then `best_obj - opt_tolerance` after every
//! capture.

use capstan_core::num::{accumulate, NeumaierSum, Tolerances, INF};
use capstan_model::index::{ConIndex, VarIndex, OBJECTIVE_CON};
use capstan_model::store::ModelStore;
use rand::rngs::StdRng;
use rand::Rng;

/// Sentinel for "row is not in this partition list".
pub(crate) const NO_POS: usize = usize::MAX;

/// Candidate operation buffer shared by the neighbor generators: parallel
/// lists of (variable, delta) plus the accepted count after resampling.
#[derive(Debug, Clone, Default)]
pub struct OpBuffer {
    pub var_idxs: Vec<VarIndex>,
    pub deltas: Vec<f64>,
    pub size: usize,
}

impl OpBuffer {
    #[inline]
    pub fn clear(&mut self) {
        self.var_idxs.clear();
        self.deltas.clear();
        self.size = 0;
    }

    #[inline]
    pub fn push(&mut self, var_idx: VarIndex, delta: f64) {
        self.var_idxs.push(var_idx);
        self.deltas.push(delta);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.var_idxs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.var_idxs.is_empty()
    }
}

/// The per-run mutable search state.
#[derive(Debug, Clone)]
pub struct SearchState {
    pub(crate) tol: Tolerances,
    pub(crate) var_value: Vec<f64>,
    pub(crate) var_best: Vec<f64>,
    pub(crate) allow_inc_step: Vec<usize>,
    pub(crate) allow_dec_step: Vec<usize>,
    pub(crate) last_inc_step: Vec<usize>,
    pub(crate) last_dec_step: Vec<usize>,
    pub(crate) con_activity: Vec<f64>,
    pub(crate) con_rhs: Vec<f64>,
    pub(crate) con_weight: Vec<u64>,
    pub(crate) con_is_equality: Vec<bool>,
    pub(crate) unsat_idxs: Vec<ConIndex>,
    pub(crate) pos_in_unsat: Vec<usize>,
    pub(crate) sat_idxs: Vec<ConIndex>,
    pub(crate) pos_in_sat: Vec<usize>,
    pub(crate) cur_step: usize,
    pub(crate) last_improve_step: usize,
    pub(crate) found_feasible: bool,
    pub(crate) obj_breakthrough: bool,
    pub(crate) best_obj: f64,
    pub(crate) min_unsat_con: usize,
    pub(crate) activity_hits: usize,
}

impl SearchState {
    /// Sizes the state from a preprocessed model. Row constants are copied
    /// from the model; the objective row's threshold starts at the
    /// infinity sentinel.
    pub fn new(model: &ModelStore) -> Self {
        let var_num = model.var_num();
        let con_num = model.con_num();
        let mut con_rhs = vec![0.0; con_num];
        for con_idx in 1..con_num {
            con_rhs[con_idx] = model.con(ConIndex::new(con_idx)).rhs();
        }
        con_rhs[OBJECTIVE_CON.get()] = INF;
        Self {
            tol: *model.tolerances(),
            var_value: vec![0.0; var_num],
            var_best: vec![0.0; var_num],
            allow_inc_step: vec![0; var_num],
            allow_dec_step: vec![0; var_num],
            last_inc_step: vec![0; var_num],
            last_dec_step: vec![0; var_num],
            con_activity: vec![0.0; con_num],
            con_rhs,
            con_weight: vec![1; con_num],
            con_is_equality: model.con_is_equality().to_vec(),
            unsat_idxs: Vec::with_capacity(con_num),
            pos_in_unsat: vec![NO_POS; con_num],
            sat_idxs: Vec::with_capacity(con_num),
            pos_in_sat: vec![NO_POS; con_num],
            cur_step: 0,
            last_improve_step: 0,
            found_feasible: false,
            obj_breakthrough: false,
            best_obj: INF,
            min_unsat_con: con_num,
            activity_hits: 0,
        }
    }

    #[inline(always)]
    pub fn value(&self, var_idx: VarIndex) -> f64 {
        self.var_value[var_idx.get()]
    }

    #[inline(always)]
    pub fn best_value(&self, var_idx: VarIndex) -> f64 {
        self.var_best[var_idx.get()]
    }

    #[inline(always)]
    pub fn best_values(&self) -> &[f64] {
        &self.var_best
    }

    #[inline(always)]
    pub fn activity(&self, con_idx: ConIndex) -> f64 {
        self.con_activity[con_idx.get()]
    }

    #[inline(always)]
    pub fn rhs(&self, con_idx: ConIndex) -> f64 {
        self.con_rhs[con_idx.get()]
    }

    #[inline(always)]
    pub fn weight(&self, con_idx: ConIndex) -> u64 {
        self.con_weight[con_idx.get()]
    }

    #[inline(always)]
    pub fn cur_step(&self) -> usize {
        self.cur_step
    }

    #[inline(always)]
    pub fn found_feasible(&self) -> bool {
        self.found_feasible
    }

    #[inline(always)]
    pub fn best_obj(&self) -> f64 {
        self.best_obj
    }

    #[inline(always)]
    pub fn unsat_idxs(&self) -> &[ConIndex] {
        &self.unsat_idxs
    }

    #[inline(always)]
    pub fn sat_idxs(&self) -> &[ConIndex] {
        &self.sat_idxs
    }

    #[inline(always)]
    pub fn min_unsat_con(&self) -> usize {
        self.min_unsat_con
    }

    /// Whether the row at `con_idx` is within the feasibility tolerance.
    #[inline(always)]
    pub fn con_sat(&self, con_idx: usize) -> bool {
        let gap = self.con_activity[con_idx] - self.con_rhs[con_idx];
        if self.con_is_equality[con_idx] {
            gap.abs() <= self.tol.feas
        } else {
            gap <= self.tol.feas
        }
    }

    #[inline(always)]
    pub fn con_unsat(&self, con_idx: usize) -> bool {
        !self.con_sat(con_idx)
    }

    #[inline]
    pub(crate) fn insert_unsat(&mut self, con_idx: usize) {
        debug_assert!(
            self.pos_in_unsat[con_idx] == NO_POS,
            "called `SearchState::insert_unsat` with row {} already present",
            con_idx
        );
        self.pos_in_unsat[con_idx] = self.unsat_idxs.len();
        self.unsat_idxs.push(ConIndex::new(con_idx));
    }

    #[inline]
    pub(crate) fn delete_unsat(&mut self, con_idx: usize) {
        debug_assert!(
            self.pos_in_unsat[con_idx] != NO_POS,
            "called `SearchState::delete_unsat` with row {} absent",
            con_idx
        );
        let pos = self.pos_in_unsat[con_idx];
        let last = *self.unsat_idxs.last().unwrap();
        self.unsat_idxs[pos] = last;
        self.pos_in_unsat[last.get()] = pos;
        self.unsat_idxs.pop();
        self.pos_in_unsat[con_idx] = NO_POS;
    }

    #[inline]
    pub(crate) fn insert_sat(&mut self, con_idx: usize) {
        debug_assert!(
            self.pos_in_sat[con_idx] == NO_POS,
            "called `SearchState::insert_sat` with row {} already present",
            con_idx
        );
        self.pos_in_sat[con_idx] = self.sat_idxs.len();
        self.sat_idxs.push(ConIndex::new(con_idx));
    }

    #[inline]
    pub(crate) fn delete_sat(&mut self, con_idx: usize) {
        debug_assert!(
            self.pos_in_sat[con_idx] != NO_POS,
            "called `SearchState::delete_sat` with row {} absent",
            con_idx
        );
        let pos = self.pos_in_sat[con_idx];
        let last = *self.sat_idxs.last().unwrap();
        self.sat_idxs[pos] = last;
        self.pos_in_sat[last.get()] = pos;
        self.sat_idxs.pop();
        self.pos_in_sat[con_idx] = NO_POS;
    }

    /// Recomputes every activity with compensated summation and reseeds
    /// the sat/unsat partition from scratch. The back-stop that bounds
    /// incremental floating-point drift.
    pub fn refresh_activities(&mut self, model: &ModelStore) {
        self.unsat_idxs.clear();
        self.sat_idxs.clear();
        self.pos_in_unsat.fill(NO_POS);
        self.pos_in_sat.fill(NO_POS);
        let obj = model.objective();
        let mut acc = NeumaierSum::new();
        for term_idx in 0..obj.term_num() {
            acc.add_product(obj.coeff(term_idx), self.var_value[obj.var_idx(term_idx).get()]);
        }
        self.con_activity[OBJECTIVE_CON.get()] = acc.value();
        for con_idx in 1..self.con_activity.len() {
            let con = model.con(ConIndex::new(con_idx));
            let mut acc = NeumaierSum::new();
            for term_idx in 0..con.term_num() {
                acc.add_product(con.coeff(term_idx), self.var_value[con.var_idx(term_idx).get()]);
            }
            self.con_activity[con_idx] = acc.value();
            if self.con_unsat(con_idx) {
                self.insert_unsat(con_idx);
            } else {
                self.insert_sat(con_idx);
            }
        }
        self.activity_hits = 0;
    }

    /// The single write path for moves. Clamps the delta to the variable's
    /// bounds, updates the value and every incident activity, repairs the
    /// partition, refreshes on drift, and stamps tabu thresholds.
    #[allow(clippy::too_many_arguments)]
    pub fn apply_move(
        &mut self,
        model: &ModelStore,
        var_idx: VarIndex,
        mut delta: f64,
        rng: &mut StdRng,
        tabu_base: usize,
        tabu_variation: usize,
        activity_period: usize,
    ) {
        let j = var_idx.get();
        let var = model.var(var_idx);
        if !var.in_bound(self.var_value[j] + delta, self.tol.feas) {
            delta = delta.clamp(
                var.lower_bound() - self.var_value[j],
                var.upper_bound() - self.var_value[j],
            );
        }
        self.var_value[j] += delta;
        for term_idx in 0..var.term_num() {
            let con_idx = var.con_idx(term_idx);
            let c = con_idx.get();
            let coeff = model.con(con_idx).coeff(var.pos_in_con(term_idx));
            let maintain = c != OBJECTIVE_CON.get();
            let was_sat = maintain && self.con_sat(c);
            self.con_activity[c] = accumulate(self.con_activity[c], coeff, delta);
            if maintain {
                let now_sat = self.con_sat(c);
                if was_sat && !now_sat {
                    self.delete_sat(c);
                    self.insert_unsat(c);
                } else if !was_sat && now_sat {
                    self.insert_sat(c);
                    self.delete_unsat(c);
                }
            }
        }
        self.activity_hits += 1;
        if self.activity_hits >= activity_period {
            self.refresh_activities(model);
        }
        debug_assert!(tabu_variation > 0);
        let jitter = rng.random_range(0..tabu_variation);
        if delta > 0.0 {
            self.last_inc_step[j] = self.cur_step;
            self.allow_dec_step[j] = self.cur_step + tabu_base + jitter;
        } else {
            self.last_dec_step[j] = self.cur_step;
            self.allow_inc_step[j] = self.cur_step + tabu_base + jitter;
        }
        self.obj_breakthrough =
            self.con_activity[OBJECTIVE_CON.get()] <= self.con_rhs[OBJECTIVE_CON.get()];
        if self.unsat_idxs.len() < self.min_unsat_con {
            self.min_unsat_con = self.unsat_idxs.len();
        }
        debug_assert!(
            var.in_bound(self.var_value[j], self.tol.feas),
            "called `SearchState::apply_move` leaving {} out of bounds at {}",
            var.name(),
            self.var_value[j]
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use capstan_model::constraint::ConSense;
    use rand::SeedableRng;

    /// x + y <= 4 and x - y <= 1 over reals in [0, 10], objective x.
    fn small_model() -> ModelStore {
        let mut store = ModelStore::new(Tolerances::default());
        let x = store.make_variable("x", false);
        let y = store.make_variable("y", false);
        store.var_mut(x).set_upper_bound(10.0);
        store.var_mut(y).set_upper_bound(10.0);
        store.add_term(OBJECTIVE_CON, x, 1.0);
        let c1 = store.make_constraint("c1", ConSense::LessEqual);
        store.add_term(c1, x, 1.0);
        store.add_term(c1, y, 1.0);
        store.con_mut(c1).set_rhs(4.0);
        let c2 = store.make_constraint("c2", ConSense::LessEqual);
        store.add_term(c2, x, 1.0);
        store.add_term(c2, y, -1.0);
        store.con_mut(c2).set_rhs(1.0);
        store.process_after_read().unwrap();
        store
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test]
    fn test_refresh_seeds_partition() {
        let model = small_model();
        let mut state = SearchState::new(&model);
        state.var_value = vec![3.0, 0.5];
        state.refresh_activities(&model);
        // c1: 3.5 <= 4 sat; c2: 2.5 > 1 unsat.
        assert_eq!(state.con_activity[1], 3.5);
        assert_eq!(state.con_activity[2], 2.5);
        assert_eq!(state.sat_idxs.len(), 1);
        assert_eq!(state.unsat_idxs.len(), 1);
        assert_eq!(state.unsat_idxs[0], ConIndex::new(2));
    }

    #[test]
    fn test_partition_exclusivity_invariant() {
        let model = small_model();
        let mut state = SearchState::new(&model);
        state.refresh_activities(&model);
        for c in 1..model.con_num() {
            let in_unsat = state.pos_in_unsat[c] != NO_POS;
            let in_sat = state.pos_in_sat[c] != NO_POS;
            assert!(in_unsat != in_sat, "row {} must be in exactly one list", c);
            if in_unsat {
                assert_eq!(state.unsat_idxs[state.pos_in_unsat[c]], ConIndex::new(c));
            } else {
                assert_eq!(state.sat_idxs[state.pos_in_sat[c]], ConIndex::new(c));
            }
        }
    }

    #[test]
    fn test_apply_move_updates_activities_incrementally() {
        let model = small_model();
        let mut state = SearchState::new(&model);
        state.refresh_activities(&model);
        let x = model.var_index_by_name("x").unwrap();
        let mut rng = rng();
        state.apply_move(&model, x, 3.0, &mut rng, 4, 7, 100_000);
        assert_eq!(state.var_value[x.get()], 3.0);
        assert_eq!(state.con_activity[0], 3.0);
        assert_eq!(state.con_activity[1], 3.0);
        assert_eq!(state.con_activity[2], 3.0);
        // c2 (x - y <= 1) became unsat.
        assert!(state.pos_in_unsat[2] != NO_POS);
    }

    #[test]
    fn test_apply_move_clamps_to_bounds() {
        let model = small_model();
        let mut state = SearchState::new(&model);
        state.refresh_activities(&model);
        let x = model.var_index_by_name("x").unwrap();
        let mut rng = rng();
        state.apply_move(&model, x, 25.0, &mut rng, 4, 7, 100_000);
        assert_eq!(state.var_value[x.get()], 10.0);
    }

    #[test]
    fn test_apply_then_revert_restores_partition() {
        let model = small_model();
        let mut state = SearchState::new(&model);
        state.refresh_activities(&model);
        let x = model.var_index_by_name("x").unwrap();
        let before_activity = state.con_activity.clone();
        let before_unsat: Vec<ConIndex> = state.unsat_idxs.clone();
        let mut rng = rng();
        state.apply_move(&model, x, 2.0, &mut rng, 4, 7, 100_000);
        state.apply_move(&model, x, -2.0, &mut rng, 4, 7, 100_000);
        for (c, activity) in state.con_activity.iter().enumerate() {
            assert!((activity - before_activity[c]).abs() < 1e-9);
        }
        let mut after_unsat = state.unsat_idxs.clone();
        let mut before_unsat = before_unsat;
        after_unsat.sort();
        before_unsat.sort();
        assert_eq!(after_unsat, before_unsat);
    }

    #[test]
    fn test_tabu_thresholds_monotone() {
        let model = small_model();
        let mut state = SearchState::new(&model);
        state.refresh_activities(&model);
        let x = model.var_index_by_name("x").unwrap();
        let mut rng = rng();
        state.apply_move(&model, x, 1.0, &mut rng, 4, 7, 100_000);
        let first = state.allow_dec_step[x.get()];
        assert!(first >= state.cur_step + 4);
        state.cur_step += 10;
        state.apply_move(&model, x, 1.0, &mut rng, 4, 7, 100_000);
        assert!(state.allow_dec_step[x.get()] >= first);
        assert_eq!(state.last_inc_step[x.get()], state.cur_step);
    }

    #[test]
    fn test_periodic_refresh_resets_hit_counter() {
        let model = small_model();
        let mut state = SearchState::new(&model);
        state.refresh_activities(&model);
        let x = model.var_index_by_name("x").unwrap();
        let mut rng = rng();
        // Period of 2: the second move triggers a refresh.
        state.apply_move(&model, x, 1.0, &mut rng, 4, 7, 2);
        assert_eq!(state.activity_hits, 1);
        state.apply_move(&model, x, 1.0, &mut rng, 4, 7, 2);
        assert_eq!(state.activity_hits, 0);
    }

    #[test]
    fn test_min_unsat_watermark() {
        let model = small_model();
        let mut state = SearchState::new(&model);
        state.refresh_activities(&model);
        assert_eq!(state.min_unsat_con, model.con_num());
        let x = model.var_index_by_name("x").unwrap();
        let mut rng = rng();
        state.apply_move(&model, x, 1.0, &mut rng, 4, 7, 100_000);
        assert!(state.min_unsat_con <= model.con_num());
    }
}
