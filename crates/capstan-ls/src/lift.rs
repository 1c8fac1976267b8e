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

//! The lift move: feasible-phase objective descent.
//!
//! For every objective-term variable, project the set of deltas that keep
//! every row satisfied onto a closed interval: intersect, row by row, the
//! direction bound each inequality allows, collapse to the current point
//! when an equality pins the variable, round inward for integral
//! variables, and intersect with the variable's own bounds. The admissible
//! endpoint on the objective-decreasing side is the lift candidate.
//!
//! Candidates are cached across steps: after a committed lift move only
//! the variables sharing a row with the moved variable can have a changed
//! admissible range, so only those are recomputed. Any non-lift move or
//! activity refresh invalidates the whole cache.
//!
//! The optional `break_eq_feas` second pass recomputes candidates without
//! the equality collapse and commits the best one even though it may leave
//! an equality row; the step still counts as "no lift move" so the driver
//! falls through to neighbor exploration.

use crate::engine::LocalSearch;
use crate::scoring::LiftScoreCtx;
use capstan_core::math::interval::ClosedInterval;
use capstan_model::index::{VarIndex, OBJECTIVE_CON};

impl LocalSearch<'_> {
    /// Attempts one lift move. Returns whether a move was committed.
    pub(crate) fn lift_move(&mut self) -> bool {
        self.reset_selection(true);
        self.strict_feas = true;
        if !self.keep_feas {
            for term_idx in 0..self.obj_var_num {
                let var_idx = self.model.objective().var_idx(term_idx);
                self.lift_delta[term_idx] = self.lift_move_operation(var_idx);
            }
        }
        self.score_lift_candidates();
        if let Some(best_var) = self.best_move.var_idx {
            if self.best_move.delta != 0.0 {
                let best_delta = self.best_move.delta;
                let obj_term = self.model.var_to_obj_term(best_var);
                self.apply_move_now(best_var, best_delta);
                if let Some(term_idx) = obj_term {
                    self.lift_delta[term_idx] = self.lift_move_operation(best_var);
                }
                self.keep_feas = true;
                self.collect_touched_vars(best_var);
                for touch_idx in 0..self.touch_list.len() {
                    let touched = self.touch_list[touch_idx];
                    if let Some(term_idx) = self.model.var_to_obj_term(touched) {
                        self.lift_delta[term_idx] = self.lift_move_operation(touched);
                    }
                }
                return true;
            }
        }
        if self.break_eq_feas {
            self.keep_feas = false;
            self.strict_feas = false;
            for term_idx in 0..self.obj_var_num {
                let var_idx = self.model.objective().var_idx(term_idx);
                self.lift_delta[term_idx] = self.lift_move_operation(var_idx);
            }
            self.score_lift_candidates();
            if let Some(best_var) = self.best_move.var_idx {
                if self.best_move.delta != 0.0 {
                    let best_delta = self.best_move.delta;
                    self.apply_move_now(best_var, best_delta);
                }
            }
            return false;
        }
        self.keep_feas = false;
        false
    }

    fn score_lift_candidates(&mut self) {
        for term_idx in 0..self.obj_var_num {
            let var_idx = self.model.objective().var_idx(term_idx);
            let delta = self.lift_delta[term_idx];
            let mut ctx = LiftScoreCtx {
                model: self.model,
                state: &self.state,
                rng: &mut self.rng,
                best: &mut self.best_move,
            };
            self.scoring.score_lift(&mut ctx, var_idx, delta);
        }
    }

    /// Records every variable sharing a non-objective row with `moved`.
    fn collect_touched_vars(&mut self, moved: VarIndex) {
        self.feas_touch_vars.clear();
        let var = self.model.var(moved);
        for &con_idx in var.con_idx_set() {
            if con_idx == OBJECTIVE_CON {
                continue;
            }
            for &touched in self.model.con(con_idx).var_idx_set() {
                self.feas_touch_vars.insert(touched);
            }
        }
        self.touch_list.clear();
        self.touch_list.extend(self.feas_touch_vars.iter().copied());
    }

    /// The admissible-interval projection for one objective term. Returns
    /// the endpoint on the objective-decreasing side.
    pub(crate) fn lift_move_operation(&self, var_idx: VarIndex) -> f64 {
        let var = self.model.var(var_idx);
        let value = self.state.var_value[var_idx.get()];
        let mut range = ClosedInterval::new(var.lower_bound() - value, var.upper_bound() - value);
        for var_term in 0..var.term_num() {
            let con_idx = var.con_idx(var_term);
            if con_idx == OBJECTIVE_CON {
                continue;
            }
            let coeff = self.model.con(con_idx).coeff(var.pos_in_con(var_term));
            if coeff.abs() < self.state.tol.zero {
                continue;
            }
            let c = con_idx.get();
            let gap = self.state.con_activity[c] - self.state.con_rhs[c];
            if self.state.con_is_equality[c] {
                if self.strict_feas {
                    // An equality in its satisfied position pins the
                    // variable: only the current point remains.
                    range = ClosedInterval::point(0.0);
                }
            } else if gap >= 0.0 {
                // Row already tight (or over): no slack in the
                // activity-increasing direction.
                if coeff > 0.0 {
                    range.tighten_upper(0.0);
                } else {
                    range.tighten_lower(0.0);
                }
            } else {
                let mut delta = -(gap / coeff);
                if coeff > 0.0 {
                    if !var.is_real() {
                        delta = delta.floor();
                    }
                    range.tighten_upper(delta);
                } else {
                    if !var.is_real() {
                        delta = delta.ceil();
                    }
                    range.tighten_lower(delta);
                }
            }
            if range.lower() >= range.upper() {
                break;
            }
        }
        if self.model.var_obj_cost()[var_idx.get()] > 0.0 {
            range.lower()
        } else {
            range.upper()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use capstan_core::num::{Tolerances, NEG_INF};
    use capstan_model::builder::ModelBuilder;
    use capstan_model::store::ModelStore;
    use capstan_model::variable::VarKind;

    /// min -x - 2y s.t. x + y <= 6, y <= 4, x, y real in [0, 10].
    fn model() -> ModelStore {
        let mut builder = ModelBuilder::new();
        let x = builder.add_variable("x", 0.0, 10.0, -1.0, VarKind::Real).unwrap();
        let y = builder.add_variable("y", 0.0, 10.0, -2.0, VarKind::Real).unwrap();
        builder.add_constraint(NEG_INF, 6.0, &[(x, 1.0), (y, 1.0)]).unwrap();
        builder.add_constraint(NEG_INF, 4.0, &[(y, 1.0)]).unwrap();
        let mut model = builder.build(Tolerances::default()).unwrap();
        model.process_after_read().unwrap();
        model
    }

    #[test]
    fn test_lift_operation_intersects_rows() {
        let model = model();
        let mut engine = LocalSearch::new(&model);
        engine.state.refresh_activities(&model);
        let y = model.var_index_by_name("y").unwrap();
        // From zero, y may rise to min(row slack 6, row slack 4, bound
        // 10) = 4; cost is negative so the candidate is the upper end.
        let delta = engine.lift_move_operation(y);
        assert_eq!(delta, 4.0);
    }

    #[test]
    fn test_lift_operation_integer_rounds_inward() {
        let mut builder = ModelBuilder::new();
        let x = builder
            .add_variable("x", 0.0, 10.0, -1.0, VarKind::GeneralInteger)
            .unwrap();
        builder.add_constraint(NEG_INF, 7.0, &[(x, 2.0)]).unwrap();
        let mut model = builder.build(Tolerances::default()).unwrap();
        model.process_after_read().unwrap();

        let mut engine = LocalSearch::new(&model);
        engine.state.refresh_activities(&model);
        let x = model.var_index_by_name("x").unwrap();
        // Slack allows 3.5; the integer projection floors to 3.
        assert_eq!(engine.lift_move_operation(x), 3.0);
    }

    #[test]
    fn test_lift_operation_equality_pins_variable() {
        let mut builder = ModelBuilder::new();
        let x = builder.add_variable("x", 0.0, 10.0, -1.0, VarKind::Real).unwrap();
        let y = builder.add_variable("y", 0.0, 10.0, 0.0, VarKind::Real).unwrap();
        builder.add_constraint(3.0, 3.0, &[(x, 1.0), (y, 1.0)]).unwrap();
        let mut model = builder.build(Tolerances::default()).unwrap();
        // Keep the raw equality so the collapse path is exercised.
        model.set_split_eq(false);
        model.process_after_read().unwrap();

        let mut engine = LocalSearch::new(&model);
        engine.state.var_value = vec![1.0, 2.0];
        engine.state.refresh_activities(&model);
        let x = model.var_index_by_name("x").unwrap();
        assert_eq!(engine.lift_move_operation(x), 0.0);
        // With break_eq_feas the second pass ignores the equality and the
        // full bound range opens up.
        engine.strict_feas = false;
        assert_eq!(engine.lift_move_operation(x), 9.0);
    }

    #[test]
    fn test_lift_move_commits_and_caches() {
        let model = model();
        let mut engine = LocalSearch::new(&model);
        engine.obj_var_num = model.objective().term_num();
        engine.lift_delta = vec![0.0; engine.obj_var_num];
        engine.state.refresh_activities(&model);
        assert!(engine.lift_move());
        // The strongest candidate is y -> 4 (score 8 beats x's 6).
        let y = model.var_index_by_name("y").unwrap();
        assert_eq!(engine.state.value(y), 4.0);
        assert!(engine.keep_feas);
        // A second lift still improves through x (slack 2 remains).
        assert!(engine.lift_move());
        let x = model.var_index_by_name("x").unwrap();
        assert_eq!(engine.state.value(x), 2.0);
    }
}
