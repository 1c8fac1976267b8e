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

//! Move scoring.
//!
//! Two independent rules, both selectable by name and replaceable with a
//! user callback:
//!
//! * the **lift score** ranks feasible-phase moves purely by objective
//!   delta (`-cost * delta`), breaking near-ties by move age or by coin
//!   flip;
//! * the **neighbor score** ranks arbitrary candidate moves by a weighted
//!   sum of per-row progress indicators (satisfied/violated transitions
//!   and gap shrinkage), with an objective term and a bonus subscore once
//!   a feasible solution exists.
//!
//! Binary variables are deduplicated across candidate sources within one
//! exploration through a monotone stamp: a binary's two possible moves are
//! value-determined, so scoring it twice is pure waste.

use crate::state::SearchState;
use capstan_model::index::{VarIndex, OBJECTIVE_CON};
use capstan_model::store::ModelStore;
use rand::rngs::StdRng;
use rand::Rng;

/// The best candidate seen during the current selection round.
#[derive(Debug, Clone)]
pub struct BestMove {
    pub lift_score: f64,
    pub score: i64,
    pub subscore: i64,
    pub age: usize,
    pub var_idx: Option<VarIndex>,
    pub delta: f64,
}

impl Default for BestMove {
    fn default() -> Self {
        Self {
            lift_score: 0.0,
            score: 0,
            subscore: i64::MIN,
            age: usize::MAX,
            var_idx: None,
            delta: 0.0,
        }
    }
}

impl BestMove {
    /// Resets for a new round. With `require_positive` the running best
    /// starts at zero so only strictly improving candidates can win; the
    /// last-chance round instead starts at the minimum so something always
    /// gets committed.
    pub fn reset(&mut self, require_positive: bool) {
        self.lift_score = if require_positive { 0.0 } else { f64::MIN };
        self.score = if require_positive { 0 } else { i64::MIN };
        self.subscore = i64::MIN;
        self.age = usize::MAX;
        self.var_idx = None;
        self.delta = 0.0;
    }
}

/// Monotone per-variable stamps deduplicating binary candidates within one
/// exploration round.
#[derive(Debug, Clone, Default)]
pub struct StampSet {
    stamps: Vec<u32>,
    token: u32,
}

impl StampSet {
    pub fn new(var_num: usize) -> Self {
        Self {
            stamps: vec![0; var_num],
            token: 0,
        }
    }

    /// Starts a new round. On token wrap-around every stamp is cleared so
    /// stale marks cannot collide with the restarted token sequence.
    pub fn advance(&mut self) {
        self.token = self.token.wrapping_add(1);
        if self.token == 0 {
            self.stamps.fill(0);
            self.token = 1;
        }
    }

    /// Returns `true` if the variable was already seen this round, marking
    /// it otherwise.
    #[inline]
    pub fn seen_or_mark(&mut self, var_idx: VarIndex) -> bool {
        let stamp = &mut self.stamps[var_idx.get()];
        if *stamp == self.token {
            return true;
        }
        *stamp = self.token;
        false
    }
}

/// Context handed to lift scoring (and lift-scoring callbacks).
pub struct LiftScoreCtx<'a> {
    pub model: &'a ModelStore,
    pub state: &'a SearchState,
    pub rng: &'a mut StdRng,
    pub best: &'a mut BestMove,
}

/// Context handed to neighbor scoring (and neighbor-scoring callbacks).
pub struct NeighborScoreCtx<'a> {
    pub model: &'a ModelStore,
    pub state: &'a SearchState,
    pub stamps: &'a mut StampSet,
    pub best: &'a mut BestMove,
}

/// Callback type for user-supplied lift scoring.
pub type LiftScoreCbk = Box<dyn FnMut(&mut LiftScoreCtx<'_>, VarIndex, f64) + Send>;

/// Callback type for user-supplied neighbor scoring.
pub type NeighborScoreCbk = Box<dyn FnMut(&mut NeighborScoreCtx<'_>, VarIndex, f64) + Send>;

enum LiftMethod {
    Age,
    Random,
    Custom(LiftScoreCbk),
}

enum NeighborMethod {
    ProgressBonus,
    ProgressAge,
    Custom(NeighborScoreCbk),
}

/// The scoring configuration: one lift rule and one neighbor rule.
pub struct Scoring {
    lift: LiftMethod,
    neighbor: NeighborMethod,
}

impl Default for Scoring {
    fn default() -> Self {
        Self {
            lift: LiftMethod::Age,
            neighbor: NeighborMethod::ProgressBonus,
        }
    }
}

impl std::fmt::Debug for Scoring {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let lift = match &self.lift {
            LiftMethod::Age => "lift_age",
            LiftMethod::Random => "lift_random",
            LiftMethod::Custom(_) => "custom",
        };
        let neighbor = match &self.neighbor {
            NeighborMethod::ProgressBonus => "progress_bonus",
            NeighborMethod::ProgressAge => "progress_age",
            NeighborMethod::Custom(_) => "custom",
        };
        write!(f, "Scoring(lift: {}, neighbor: {})", lift, neighbor)
    }
}

impl Scoring {
    /// Selects the lift rule by name; unknown names fall back to
    /// `lift_age`.
    pub fn set_lift_method(&mut self, name: &str) {
        self.lift = match name.to_ascii_lowercase().as_str() {
            "" | "lift_age" => LiftMethod::Age,
            "lift_random" => LiftMethod::Random,
            other => {
                tracing::warn!(method = other, "unsupported lift scoring method, fallback to lift_age");
                LiftMethod::Age
            }
        };
    }

    /// Selects the neighbor rule by name; unknown names fall back to
    /// `progress_bonus`.
    pub fn set_neighbor_method(&mut self, name: &str) {
        self.neighbor = match name.to_ascii_lowercase().as_str() {
            "" | "progress_bonus" => NeighborMethod::ProgressBonus,
            "progress_age" => NeighborMethod::ProgressAge,
            other => {
                tracing::warn!(
                    method = other,
                    "unsupported neighbor scoring method, fallback to progress_bonus"
                );
                NeighborMethod::ProgressBonus
            }
        };
    }

    pub fn set_lift_cbk(&mut self, cbk: LiftScoreCbk) {
        self.lift = LiftMethod::Custom(cbk);
    }

    pub fn set_neighbor_cbk(&mut self, cbk: NeighborScoreCbk) {
        self.neighbor = NeighborMethod::Custom(cbk);
    }

    /// Scores one lift candidate against the running best.
    pub fn score_lift(&mut self, ctx: &mut LiftScoreCtx<'_>, var_idx: VarIndex, delta: f64) {
        match &mut self.lift {
            LiftMethod::Custom(cbk) => cbk(ctx, var_idx, delta),
            LiftMethod::Random => lift_random(ctx, var_idx, delta),
            LiftMethod::Age => lift_age(ctx, var_idx, delta),
        }
    }

    /// Scores one neighbor candidate against the running best.
    pub fn score_neighbor(
        &mut self,
        ctx: &mut NeighborScoreCtx<'_>,
        var_idx: VarIndex,
        delta: f64,
    ) {
        match &mut self.neighbor {
            NeighborMethod::Custom(cbk) => cbk(ctx, var_idx, delta),
            NeighborMethod::ProgressAge => progress_age(ctx, var_idx, delta),
            NeighborMethod::ProgressBonus => progress_bonus(ctx, var_idx, delta),
        }
    }
}

#[inline]
fn move_age(state: &SearchState, var_idx: VarIndex) -> usize {
    state.last_dec_step[var_idx.get()].max(state.last_inc_step[var_idx.get()])
}

fn lift_age(ctx: &mut LiftScoreCtx<'_>, var_idx: VarIndex, delta: f64) {
    let lift_score = -ctx.model.var_obj_cost()[var_idx.get()] * delta;
    let age = move_age(ctx.state, var_idx);
    let opt = ctx.state.tol.opt;
    if ctx.best.lift_score + opt < lift_score
        || (ctx.best.lift_score <= lift_score && age < ctx.best.age)
    {
        ctx.best.var_idx = Some(var_idx);
        ctx.best.delta = delta;
        ctx.best.lift_score = lift_score;
        ctx.best.age = age;
    }
}

fn lift_random(ctx: &mut LiftScoreCtx<'_>, var_idx: VarIndex, delta: f64) {
    let lift_score = -ctx.model.var_obj_cost()[var_idx.get()] * delta;
    let age = move_age(ctx.state, var_idx);
    let opt = ctx.state.tol.opt;
    if ctx.best.var_idx.is_none() || ctx.best.lift_score + opt < lift_score {
        ctx.best.var_idx = Some(var_idx);
        ctx.best.delta = delta;
        ctx.best.lift_score = lift_score;
        ctx.best.age = age;
        return;
    }
    if ctx.best.lift_score <= lift_score && ctx.rng.random::<bool>() {
        ctx.best.var_idx = Some(var_idx);
        ctx.best.delta = delta;
        ctx.best.lift_score = lift_score;
        ctx.best.age = age;
    }
}

/// Weighted progress score over every row the variable touches, plus the
/// objective bonus subscore. Shared by both neighbor rules; the bonus only
/// participates in tie-breaking for `progress_bonus`.
fn neighbor_scores(
    ctx: &NeighborScoreCtx<'_>,
    var_idx: VarIndex,
    delta: f64,
) -> Option<(i64, i64)> {
    let var = ctx.model.var(var_idx);
    let term_num = var.term_num();
    if term_num == 0 {
        return None;
    }
    let state = ctx.state;
    let feas = state.tol.feas;
    let mut score: i64 = 0;
    let mut bonus: i64 = 0;
    for term_idx in 0..term_num {
        let con_idx = var.con_idx(term_idx);
        let c = con_idx.get();
        let coeff = ctx.model.con(con_idx).coeff(var.pos_in_con(term_idx));
        let weight = state.con_weight[c] as i64;
        if c == OBJECTIVE_CON.get() && state.found_feasible {
            let new_obj = state.con_activity[c] + coeff * delta;
            if new_obj < state.con_activity[c] {
                score += weight;
            } else {
                score -= weight;
            }
            if new_obj < state.best_obj {
                bonus += weight;
            }
            continue;
        }
        let pre_gap = state.con_activity[c] - state.con_rhs[c];
        let new_gap = pre_gap + coeff * delta;
        if state.con_is_equality[c] {
            let pre_sat = pre_gap.abs() <= feas;
            let now_sat = new_gap.abs() <= feas;
            if !pre_sat && now_sat {
                score += weight * 2;
            } else if pre_sat && !now_sat {
                score -= weight * 2;
            } else if !pre_sat && !now_sat {
                if new_gap.abs() < pre_gap.abs() {
                    score += weight;
                } else {
                    score -= weight;
                }
            }
        } else {
            let pre_sat = pre_gap <= feas;
            let now_sat = new_gap <= feas;
            if !pre_sat && now_sat {
                score += weight;
            } else if pre_sat && !now_sat {
                score -= weight;
            } else if !pre_sat && !now_sat {
                if new_gap < pre_gap {
                    score += weight >> 1;
                } else {
                    score -= weight >> 1;
                }
            }
        }
    }
    Some((score, bonus))
}

fn progress_bonus(ctx: &mut NeighborScoreCtx<'_>, var_idx: VarIndex, delta: f64) {
    if ctx.model.var(var_idx).is_binary(ctx.state.tol.feas) && ctx.stamps.seen_or_mark(var_idx) {
        return;
    }
    let Some((score, bonus)) = neighbor_scores(ctx, var_idx, delta) else {
        return;
    };
    let age = move_age(ctx.state, var_idx);
    let best = &mut ctx.best;
    if best.score < score
        || (best.score == score && best.subscore < bonus)
        || (best.score == score && best.subscore == bonus && age < best.age)
    {
        best.var_idx = Some(var_idx);
        best.delta = delta;
        best.score = score;
        best.subscore = bonus;
        best.age = age;
    }
}

fn progress_age(ctx: &mut NeighborScoreCtx<'_>, var_idx: VarIndex, delta: f64) {
    if ctx.model.var(var_idx).is_binary(ctx.state.tol.feas) && ctx.stamps.seen_or_mark(var_idx) {
        return;
    }
    let Some((score, _)) = neighbor_scores(ctx, var_idx, delta) else {
        return;
    };
    let age = move_age(ctx.state, var_idx);
    let best = &mut ctx.best;
    if best.score < score || (best.score == score && age < best.age) {
        best.var_idx = Some(var_idx);
        best.delta = delta;
        best.score = score;
        best.age = age;
    }
}
