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

//! Dynamic constraint weighting.
//!
//! When a step found no improving move, the weights of the violated rows
//! grow so the scorer starts favouring moves that repair them. The
//! monotone rule only ever increments; the smooth (PAWS-style) rule
//! occasionally decays satisfied rows instead, keeping weights from
//! growing without bound. Once a feasible solution exists the objective
//! row participates: its weight grows while no row is violated, pushing
//! the scorer toward breakthrough moves.

use crate::state::NO_POS;
use capstan_model::index::{ConIndex, OBJECTIVE_CON};
use rand::rngs::StdRng;
use rand::Rng;

/// Everything a weight update reads and writes.
pub struct WeightCtx<'a> {
    pub weights: &'a mut [u64],
    pub unsat_idxs: &'a [ConIndex],
    pub pos_in_unsat: &'a [usize],
    pub found_feasible: bool,
    pub obj_breakthrough: bool,
    pub rng: &'a mut StdRng,
}

/// Callback type for user-supplied weighting.
pub type WeightCbk = Box<dyn FnMut(&mut WeightCtx<'_>) + Send>;

enum Method {
    Monotone,
    Smooth,
    Custom(WeightCbk),
}

/// The weighting strategy. Probability is expressed on a 0..10000 scale.
pub struct Weight {
    method: Method,
    smooth_prob: u64,
}

impl Default for Weight {
    fn default() -> Self {
        Self {
            method: Method::Monotone,
            smooth_prob: 1,
        }
    }
}

impl std::fmt::Debug for Weight {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match &self.method {
            Method::Monotone => "monotone",
            Method::Smooth => "smooth",
            Method::Custom(_) => "custom",
        };
        write!(f, "Weight({}, smooth_prob: {})", name, self.smooth_prob)
    }
}

impl Weight {
    /// Selects the method by name; unknown names fall back to `smooth`.
    pub fn set_method(&mut self, name: &str) {
        self.method = match name.to_ascii_lowercase().as_str() {
            "" | "smooth" => Method::Smooth,
            "monotone" => Method::Monotone,
            other => {
                tracing::warn!(method = other, "unsupported weight method, fallback to smooth");
                Method::Smooth
            }
        };
    }

    pub fn set_cbk(&mut self, cbk: WeightCbk) {
        self.method = Method::Custom(cbk);
    }

    pub fn set_smooth_probability(&mut self, prob: u64) {
        self.smooth_prob = prob;
    }

    pub fn smooth_probability(&self) -> u64 {
        self.smooth_prob
    }

    /// Applies one weight update.
    pub fn update(&mut self, ctx: &mut WeightCtx<'_>) {
        match &mut self.method {
            Method::Custom(cbk) => cbk(ctx),
            Method::Monotone => monotone_update(ctx),
            Method::Smooth => smooth_update(ctx, self.smooth_prob),
        }
    }
}

fn monotone_update(ctx: &mut WeightCtx<'_>) {
    for &con_idx in ctx.unsat_idxs {
        ctx.weights[con_idx.get()] += 1;
    }
    if ctx.found_feasible && ctx.unsat_idxs.is_empty() {
        ctx.weights[OBJECTIVE_CON.get()] += 1;
    }
}

fn smooth_update(ctx: &mut WeightCtx<'_>, smooth_prob: u64) {
    if ctx.rng.random_range(0..10_000u64) >= smooth_prob {
        monotone_update(ctx);
        return;
    }
    for con_idx in 1..ctx.weights.len() {
        let is_sat = ctx.pos_in_unsat[con_idx] == NO_POS;
        if is_sat && ctx.weights[con_idx] > 0 {
            ctx.weights[con_idx] -= 1;
        }
    }
    if ctx.found_feasible && ctx.obj_breakthrough && ctx.weights[OBJECTIVE_CON.get()] > 0 {
        ctx.weights[OBJECTIVE_CON.get()] -= 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn ctx_parts() -> (Vec<u64>, Vec<ConIndex>, Vec<usize>) {
        // Rows 1 and 3 violated, row 2 satisfied.
        let weights = vec![1, 1, 1, 1];
        let unsat = vec![ConIndex::new(1), ConIndex::new(3)];
        let pos = vec![NO_POS, 0, NO_POS, 1];
        (weights, unsat, pos)
    }

    #[test]
    fn test_monotone_bumps_unsat_rows() {
        let (mut weights, unsat, pos) = ctx_parts();
        let mut rng = StdRng::seed_from_u64(3);
        let mut weight = Weight::default();
        let mut ctx = WeightCtx {
            weights: &mut weights,
            unsat_idxs: &unsat,
            pos_in_unsat: &pos,
            found_feasible: false,
            obj_breakthrough: false,
            rng: &mut rng,
        };
        weight.update(&mut ctx);
        assert_eq!(weights, vec![1, 2, 1, 2]);
    }

    #[test]
    fn test_monotone_bumps_objective_when_all_sat() {
        let mut weights = vec![1, 1];
        let unsat: Vec<ConIndex> = Vec::new();
        let pos = vec![NO_POS, NO_POS];
        let mut rng = StdRng::seed_from_u64(3);
        let mut weight = Weight::default();
        let mut ctx = WeightCtx {
            weights: &mut weights,
            unsat_idxs: &unsat,
            pos_in_unsat: &pos,
            found_feasible: true,
            obj_breakthrough: false,
            rng: &mut rng,
        };
        weight.update(&mut ctx);
        assert_eq!(weights[0], 2);
    }

    #[test]
    fn test_smooth_decays_satisfied_rows() {
        let (mut weights, unsat, pos) = ctx_parts();
        weights = weights.iter().map(|w| w + 4).collect();
        let mut rng = StdRng::seed_from_u64(3);
        let mut weight = Weight::default();
        // Probability 10000 forces the smoothing branch.
        weight.set_method("smooth");
        weight.set_smooth_probability(10_000);
        let mut ctx = WeightCtx {
            weights: &mut weights,
            unsat_idxs: &unsat,
            pos_in_unsat: &pos,
            found_feasible: false,
            obj_breakthrough: false,
            rng: &mut rng,
        };
        weight.update(&mut ctx);
        // Satisfied row 2 decayed; violated rows 1 and 3 untouched; the
        // objective row is never decayed while infeasible.
        assert_eq!(weights, vec![5, 5, 4, 5]);
    }

    #[test]
    fn test_smooth_usually_falls_back_to_monotone() {
        let (mut weights, unsat, pos) = ctx_parts();
        let mut rng = StdRng::seed_from_u64(3);
        let mut weight = Weight::default();
        weight.set_method("smooth");
        // Probability 0: the draw can never select smoothing.
        weight.set_smooth_probability(0);
        let mut ctx = WeightCtx {
            weights: &mut weights,
            unsat_idxs: &unsat,
            pos_in_unsat: &pos,
            found_feasible: false,
            obj_breakthrough: false,
            rng: &mut rng,
        };
        weight.update(&mut ctx);
        assert_eq!(weights, vec![1, 2, 1, 2]);
    }
}
