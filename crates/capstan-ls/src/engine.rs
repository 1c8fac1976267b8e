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

//! The local-search driver.
//!
//! `LocalSearch` owns the mutable search state and orchestrates one run:
//! seed the start assignment, then loop until cancelled. While any row is
//! violated the step explores the neighbor strategies in order, committing
//! the first strictly improving candidate and letting the final strategy
//! commit unconditionally (after a weight update). While feasible, lift
//! moves descend the objective inside the feasible region, and the
//! objective row's moving threshold turns "improve the objective" into an
//! ordinary violated-row repair for the generators.
//!
//! Cancellation is cooperative: timeout threads and signal handlers set a
//! shared flag which the loop polls once per step. The best objective is
//! published through a relaxed atomic for an external logger.

use crate::neighbor::{Neighbor, NeighborCbk, NeighborCtx, SampleScratch};
use crate::restart::{Restart, RestartCbk, RestartCtx};
use crate::result::{OutcomeStatus, SearchOutcome, SearchStatistics};
use crate::scoring::{
    BestMove, LiftScoreCbk, NeighborScoreCbk, NeighborScoreCtx, Scoring, StampSet,
};
use crate::start::{Start, StartCbk, StartCtx};
use crate::state::{OpBuffer, SearchState};
use crate::weight::{Weight, WeightCbk, WeightCtx};
use capstan_core::num::{finite_lower, finite_upper, NeumaierSum, INF};
use capstan_model::index::{VarIndex, OBJECTIVE_CON};
use capstan_model::store::ModelStore;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// A `f64` published across threads through relaxed bit-cast atomics. The
/// driver stores at every best-solution capture; the logger thread polls.
#[derive(Debug, Clone)]
pub struct SharedObjective(Arc<AtomicU64>);

impl Default for SharedObjective {
    fn default() -> Self {
        Self(Arc::new(AtomicU64::new(f64::NAN.to_bits())))
    }
}

impl SharedObjective {
    #[inline]
    pub fn store(&self, value: f64) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }

    #[inline]
    pub fn load(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Relaxed))
    }
}

/// The local-search engine for one preprocessed model.
pub struct LocalSearch<'a> {
    pub(crate) model: &'a ModelStore,
    pub(crate) state: SearchState,
    pub(crate) ops: OpBuffer,
    pub(crate) scratch: SampleScratch,
    pub(crate) stamps: StampSet,
    pub(crate) best_move: BestMove,
    pub(crate) rng: StdRng,
    pub(crate) scoring: Scoring,
    start: Start,
    restart: Restart,
    weight: Weight,
    neighbors: Vec<Neighbor>,
    pub(crate) lift_delta: Vec<f64>,
    pub(crate) feas_touch_vars: HashSet<VarIndex>,
    pub(crate) touch_list: Vec<VarIndex>,
    pub(crate) keep_feas: bool,
    pub(crate) strict_feas: bool,
    pub(crate) break_eq_feas: bool,
    pub(crate) tabu_base: usize,
    pub(crate) tabu_variation: usize,
    pub(crate) activity_period: usize,
    bms_unsat_con: usize,
    bms_mtm_unsat_op: usize,
    bms_sat_con: usize,
    bms_mtm_sat_op: usize,
    bms_flip_op: usize,
    bms_easy_op: usize,
    bms_random_op: usize,
    pub(crate) obj_var_num: usize,
    has_objective: bool,
    unbounded: bool,
    terminated: Arc<AtomicBool>,
    published_obj: SharedObjective,
    stats: SearchStatistics,
}

impl<'a> LocalSearch<'a> {
    /// Creates an engine for a preprocessed model with the default
    /// parameterisation.
    pub fn new(model: &'a ModelStore) -> Self {
        Self {
            model,
            state: SearchState::new(model),
            ops: OpBuffer::default(),
            scratch: SampleScratch::default(),
            stamps: StampSet::new(model.var_num()),
            best_move: BestMove::default(),
            rng: StdRng::seed_from_u64(0),
            scoring: Scoring::default(),
            start: Start::default(),
            restart: Restart::default(),
            weight: Weight::default(),
            neighbors: Vec::new(),
            lift_delta: Vec::new(),
            feas_touch_vars: HashSet::new(),
            touch_list: Vec::new(),
            keep_feas: false,
            strict_feas: true,
            break_eq_feas: false,
            tabu_base: 4,
            tabu_variation: 7,
            activity_period: 100_000,
            bms_unsat_con: 12,
            bms_mtm_unsat_op: 2250,
            bms_sat_con: 1,
            bms_mtm_sat_op: 80,
            bms_flip_op: 0,
            bms_easy_op: 5,
            bms_random_op: 250,
            obj_var_num: 0,
            has_objective: false,
            unbounded: false,
            terminated: Arc::new(AtomicBool::new(false)),
            published_obj: SharedObjective::default(),
            stats: SearchStatistics::default(),
        }
    }

    /// Requests cooperative termination; the loop notices at the top of
    /// its next iteration.
    pub fn terminate(&self) {
        self.terminated.store(true, Ordering::Relaxed);
    }

    /// The shared stop flag, for timeout threads and signal handlers.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.terminated)
    }

    /// Adopts an externally owned stop flag (e.g. one a signal handler
    /// already writes to) instead of the engine's own.
    pub fn set_stop_flag(&mut self, flag: Arc<AtomicBool>) {
        self.terminated = flag;
    }

    /// The published best objective (user sense), for logger threads.
    pub fn shared_objective(&self) -> SharedObjective {
        self.published_obj.clone()
    }

    /// The best objective published so far, in the user's sense.
    pub fn get_obj_value(&self) -> f64 {
        self.published_obj.load()
    }

    pub fn is_feasible(&self) -> bool {
        self.state.found_feasible
    }

    pub fn set_random_seed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    pub fn set_start_method(&mut self, name: &str) {
        self.start.set_method(name);
    }

    pub fn set_start_cbk(&mut self, cbk: StartCbk) {
        self.start.set_cbk(cbk);
    }

    pub fn set_restart_method(&mut self, name: &str) {
        self.restart.set_method(name);
    }

    pub fn set_restart_step(&mut self, restart_step: usize) {
        self.restart.set_restart_step(restart_step);
    }

    pub fn set_restart_cbk(&mut self, cbk: RestartCbk) {
        self.restart.set_cbk(cbk);
    }

    pub fn set_weight_method(&mut self, name: &str) {
        self.weight.set_method(name);
    }

    pub fn set_weight_cbk(&mut self, cbk: WeightCbk) {
        self.weight.set_cbk(cbk);
    }

    pub fn set_weight_smooth_probability(&mut self, prob: u64) {
        self.weight.set_smooth_probability(prob);
    }

    pub fn set_lift_scoring_method(&mut self, name: &str) {
        self.scoring.set_lift_method(name);
    }

    pub fn set_neighbor_scoring_method(&mut self, name: &str) {
        self.scoring.set_neighbor_method(name);
    }

    pub fn set_lift_scoring_cbk(&mut self, cbk: LiftScoreCbk) {
        self.scoring.set_lift_cbk(cbk);
    }

    pub fn set_neighbor_scoring_cbk(&mut self, cbk: NeighborScoreCbk) {
        self.scoring.set_neighbor_cbk(cbk);
    }

    pub fn set_bms_unsat_con(&mut self, value: usize) {
        self.bms_unsat_con = value;
    }

    pub fn set_bms_mtm_unsat_op(&mut self, value: usize) {
        self.bms_mtm_unsat_op = value;
    }

    pub fn set_bms_sat_con(&mut self, value: usize) {
        self.bms_sat_con = value;
    }

    pub fn set_bms_mtm_sat_op(&mut self, value: usize) {
        self.bms_mtm_sat_op = value;
    }

    pub fn set_bms_flip_op(&mut self, value: usize) {
        self.bms_flip_op = value;
    }

    pub fn set_bms_easy_op(&mut self, value: usize) {
        self.bms_easy_op = value;
    }

    pub fn set_bms_random_op(&mut self, value: usize) {
        self.bms_random_op = value;
    }

    pub fn set_tabu_base(&mut self, value: usize) {
        self.tabu_base = value;
    }

    pub fn set_tabu_variation(&mut self, value: usize) {
        self.tabu_variation = value.max(1);
    }

    pub fn set_activity_period(&mut self, value: usize) {
        self.activity_period = value.max(1);
    }

    pub fn set_break_eq_feas(&mut self, enable: bool) {
        self.break_eq_feas = enable;
    }

    pub fn clear_neighbor_list(&mut self) {
        self.neighbors.clear();
    }

    pub fn add_neighbor(&mut self, name: &str, bms_con: usize, bms_op: usize) {
        self.neighbors.push(Neighbor::new(name, bms_con, bms_op));
    }

    pub fn add_custom_neighbor(&mut self, cbk: NeighborCbk) {
        self.neighbors.push(Neighbor::custom(cbk));
    }

    pub fn reset_default_neighbor_list(&mut self) {
        self.neighbors.clear();
        self.install_default_neighbors();
    }

    fn install_default_neighbors(&mut self) {
        self.neighbors = vec![
            Neighbor::new("unsat_mtm_bm", self.bms_unsat_con, self.bms_mtm_unsat_op),
            Neighbor::new("sat_mtm", self.bms_sat_con, self.bms_mtm_sat_op),
            Neighbor::new("flip", 0, self.bms_flip_op),
            Neighbor::new("easy", 0, self.bms_easy_op),
            Neighbor::new("unsat_mtm_bm_random", 0, self.bms_random_op),
        ];
    }

    /// Runs the search until cancelled. Returns the outcome with the best
    /// assignment found, verified.
    pub fn run_search(&mut self) -> SearchOutcome {
        let run_start = Instant::now();
        self.init_data();
        if let Some(outcome) = self.solve_objective_only(run_start) {
            return outcome;
        }
        {
            let state = &mut self.state;
            let mut ctx = StartCtx {
                model: self.model,
                values: &mut state.var_value,
                rng: &mut self.rng,
            };
            self.start.apply(&mut ctx);
        }
        self.init_state();
        while !self.terminated.load(Ordering::Relaxed) {
            if self.try_restart() {
                self.reset_after_restart();
            }
            if self.state.unsat_idxs.is_empty() {
                if self.state.activity_hits > 0 {
                    // Incremental drift may hide a violation; trust only a
                    // fresh recomputation before capturing.
                    self.state.refresh_activities(self.model);
                    if !self.state.unsat_idxs.is_empty() {
                        self.keep_feas = false;
                        continue;
                    }
                }
                if !self.state.found_feasible || self.state.obj_breakthrough {
                    self.update_best_solution();
                    self.state.found_feasible = true;
                    if !self.has_objective {
                        break;
                    }
                }
                let lift_ok = self.lift_move();
                self.state.cur_step += 1;
                self.stats.on_step();
                if lift_ok {
                    self.stats.on_lift_move();
                    continue;
                }
            }
            self.explore_neighbor();
            self.apply_best_neighbor();
            self.keep_feas = false;
            self.state.cur_step += 1;
            self.stats.on_step();
        }
        self.finish(run_start)
    }

    fn init_data(&mut self) {
        self.obj_var_num = self.model.objective().term_num();
        self.has_objective = self.obj_var_num > 0;
        self.lift_delta = vec![0.0; self.obj_var_num];
        if self.neighbors.is_empty() {
            self.install_default_neighbors();
        }
    }

    fn init_state(&mut self) {
        self.state.con_rhs[OBJECTIVE_CON.get()] = INF;
        self.state.refresh_activities(self.model);
    }

    /// Coordinate-separable optimum for models with no rows beyond the
    /// objective. Detects unboundedness.
    fn solve_objective_only(&mut self, run_start: Instant) -> Option<SearchOutcome> {
        if self.model.con_num() > 1 {
            return None;
        }
        let costs = self.model.var_obj_cost();
        let mut best = NeumaierSum::new();
        for var_idx in 0..self.model.var_num() {
            let var = self.model.var(VarIndex::new(var_idx));
            let coeff = costs[var_idx];
            let lower = var.lower_bound();
            let upper = var.upper_bound();
            let value = if coeff.abs() < self.state.tol.zero {
                let mut value = 0.0;
                if value < lower - self.state.tol.feas {
                    value = lower;
                }
                if value > upper + self.state.tol.feas {
                    value = upper;
                }
                value
            } else if coeff > 0.0 {
                if !finite_lower(lower) {
                    return Some(self.finish_unbounded(run_start));
                }
                lower
            } else {
                if !finite_upper(upper) {
                    return Some(self.finish_unbounded(run_start));
                }
                upper
            };
            self.state.var_value[var_idx] = value;
            self.state.var_best[var_idx] = value;
            best.add_product(coeff, value);
        }
        self.state.best_obj = best.value();
        self.state.con_activity[OBJECTIVE_CON.get()] = self.state.best_obj;
        self.state.found_feasible = true;
        self.state.min_unsat_con = 0;
        self.publish_best_obj();
        Some(self.finish(run_start))
    }

    /// Unbounded objective-only outcome. A positive cost with no lower
    /// bound or a negative cost with no upper bound both drive the
    /// internal (minimised) objective to negative infinity.
    fn finish_unbounded(&mut self, run_start: Instant) -> SearchOutcome {
        self.unbounded = true;
        self.state.found_feasible = false;
        self.state.best_obj = f64::NEG_INFINITY;
        self.state.con_activity[OBJECTIVE_CON.get()] = self.state.best_obj;
        self.state.min_unsat_con = 0;
        self.publish_best_obj();
        self.finish(run_start)
    }

    fn try_restart(&mut self) -> bool {
        let state = &mut self.state;
        let mut ctx = RestartCtx {
            model: self.model,
            values: &mut state.var_value,
            best_values: &state.var_best,
            weights: &mut state.con_weight,
            found_feasible: state.found_feasible,
            cur_step: state.cur_step,
            last_improve_step: state.last_improve_step,
            rng: &mut self.rng,
        };
        let fired = self.restart.execute(&mut ctx);
        if fired {
            self.stats.on_restart();
            tracing::debug!(step = self.state.cur_step, "restart fired");
        }
        fired
    }

    fn reset_after_restart(&mut self) {
        let state = &mut self.state;
        state.allow_inc_step.fill(0);
        state.allow_dec_step.fill(0);
        state.last_inc_step.fill(0);
        state.last_dec_step.fill(0);
        state.last_improve_step = state.cur_step;
        state.refresh_activities(self.model);
    }

    /// Advances the binary dedup token and resets the running best for a
    /// new selection round.
    pub(crate) fn reset_selection(&mut self, require_positive: bool) {
        self.stamps.advance();
        self.best_move.reset(require_positive);
    }

    fn update_weights(&mut self) {
        let state = &mut self.state;
        let mut ctx = WeightCtx {
            weights: &mut state.con_weight,
            unsat_idxs: &state.unsat_idxs,
            pos_in_unsat: &state.pos_in_unsat,
            found_feasible: state.found_feasible,
            obj_breakthrough: state.obj_breakthrough,
            rng: &mut self.rng,
        };
        self.weight.update(&mut ctx);
    }

    /// Runs the strategy list in order, scoring every emitted candidate.
    /// Stops early on a strictly improving candidate; the final strategy
    /// accepts anything (after a weight update).
    fn explore_neighbor(&mut self) {
        debug_assert!(
            !self.neighbors.is_empty(),
            "called `LocalSearch::explore_neighbor` with an empty strategy list"
        );
        self.reset_selection(true);
        let last = self.neighbors.len() - 1;
        for neighbor_idx in 0..self.neighbors.len() {
            self.ops.clear();
            if neighbor_idx == last {
                self.reset_selection(false);
                self.update_weights();
            }
            let mut ctx = NeighborCtx {
                model: self.model,
                state: &self.state,
                ops: &mut self.ops,
                rng: &mut self.rng,
                scratch: &mut self.scratch,
            };
            self.neighbors[neighbor_idx].explore(&mut ctx);
            for op_idx in 0..self.ops.size {
                let var_idx = self.ops.var_idxs[op_idx];
                let delta = self.ops.deltas[op_idx];
                let mut ctx = NeighborScoreCtx {
                    model: self.model,
                    state: &self.state,
                    stamps: &mut self.stamps,
                    best: &mut self.best_move,
                };
                self.scoring.score_neighbor(&mut ctx, var_idx, delta);
            }
            if self.best_move.score > 0 {
                break;
            }
        }
    }

    fn apply_best_neighbor(&mut self) {
        let Some(var_idx) = self.best_move.var_idx else {
            return;
        };
        let delta = self.best_move.delta;
        if delta == 0.0 {
            return;
        }
        self.state.apply_move(
            self.model,
            var_idx,
            delta,
            &mut self.rng,
            self.tabu_base,
            self.tabu_variation,
            self.activity_period,
        );
    }

    /// Helper for the lift move, which applies through the same path.
    pub(crate) fn apply_move_now(&mut self, var_idx: VarIndex, delta: f64) {
        self.state.apply_move(
            self.model,
            var_idx,
            delta,
            &mut self.rng,
            self.tabu_base,
            self.tabu_variation,
            self.activity_period,
        );
    }

    fn update_best_solution(&mut self) {
        let state = &mut self.state;
        state.last_improve_step = state.cur_step;
        let (best, current) = (&mut state.var_best, &state.var_value);
        best.copy_from_slice(current);
        state.best_obj = state.con_activity[OBJECTIVE_CON.get()];
        state.con_rhs[OBJECTIVE_CON.get()] = state.best_obj - state.tol.opt;
        state.obj_breakthrough = false;
        self.stats.on_capture();
        self.publish_best_obj();
    }

    fn publish_best_obj(&self) {
        self.published_obj.store(
            self.model.sense_factor() * (self.state.best_obj + self.model.obj_offset()),
        );
    }

    /// Checks the best assignment against bounds, every row, and the
    /// recorded objective. Failures are reported, not fatal; drift caught
    /// here means the periodic refresh was too coarse for this run.
    pub fn verify_solution(&self) -> bool {
        let feas = self.state.tol.feas;
        for var_idx in 0..self.model.var_num() {
            let var = self.model.var(VarIndex::new(var_idx));
            let value = self.state.var_best[var_idx];
            if !var.in_bound(value, feas) {
                tracing::warn!(var = var.name(), value, "best value out of bounds");
                return false;
            }
        }
        for con_idx in 1..self.model.con_num() {
            let con = self.model.con(capstan_model::index::ConIndex::new(con_idx));
            let mut acc = NeumaierSum::new();
            for term_idx in 0..con.term_num() {
                acc.add_product(
                    con.coeff(term_idx),
                    self.state.var_best[con.var_idx(term_idx).get()],
                );
            }
            let gap = acc.value() - self.state.con_rhs[con_idx];
            let violated = if self.state.con_is_equality[con_idx] {
                gap.abs() > feas
            } else {
                gap > feas
            };
            if violated {
                tracing::warn!(
                    con = con.name(),
                    activity = acc.value(),
                    rhs = self.state.con_rhs[con_idx],
                    "best solution violates constraint"
                );
                return false;
            }
        }
        let obj = self.model.objective();
        let mut acc = NeumaierSum::new();
        for term_idx in 0..obj.term_num() {
            acc.add_product(
                obj.coeff(term_idx),
                self.state.var_best[obj.var_idx(term_idx).get()],
            );
        }
        if (acc.value() - self.state.best_obj).abs() > self.state.tol.opt {
            tracing::warn!(
                recomputed = acc.value(),
                recorded = self.state.best_obj,
                "objective mismatch on best solution"
            );
            return false;
        }
        true
    }

    fn finish(&mut self, run_start: Instant) -> SearchOutcome {
        self.stats.set_total_time(run_start.elapsed());
        let status = if self.unbounded {
            OutcomeStatus::Unbounded
        } else if self.state.found_feasible {
            OutcomeStatus::Feasible
        } else {
            OutcomeStatus::NoFeasibleFound
        };
        let verified = status == OutcomeStatus::Feasible && self.verify_solution();
        let best_objective = match status {
            OutcomeStatus::Feasible | OutcomeStatus::Unbounded => self.get_obj_value(),
            OutcomeStatus::NoFeasibleFound => f64::NAN,
        };
        SearchOutcome::new(
            status,
            best_objective,
            self.state.var_best.clone(),
            verified,
            self.state.min_unsat_con,
            self.stats.clone(),
        )
    }
}

impl std::fmt::Debug for LocalSearch<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalSearch")
            .field("step", &self.state.cur_step)
            .field("found_feasible", &self.state.found_feasible)
            .field("best_obj", &self.state.best_obj)
            .field("neighbors", &self.neighbors)
            .finish()
    }
}
