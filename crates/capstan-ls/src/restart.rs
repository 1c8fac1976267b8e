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

//! Restart policies.
//!
//! When the no-improvement budget elapses, the incumbent is reseeded and
//! all row weights reset to one. The `best` policy anchors on the best
//! assignment found so far (falling back to random while still
//! infeasible), `random` redraws every variable inside its bounds, and
//! `hybrid` mixes the two per variable with equal probability.

use capstan_model::store::ModelStore;
use capstan_model::variable::Variable;
use rand::rngs::StdRng;
use rand::Rng;

/// Everything a restart reads and writes.
pub struct RestartCtx<'a> {
    pub model: &'a ModelStore,
    pub values: &'a mut [f64],
    pub best_values: &'a [f64],
    pub weights: &'a mut [u64],
    pub found_feasible: bool,
    pub cur_step: usize,
    pub last_improve_step: usize,
    pub rng: &'a mut StdRng,
}

/// Callback type for user-supplied restarts.
pub type RestartCbk = Box<dyn FnMut(&mut RestartCtx<'_>) + Send>;

enum Policy {
    Random,
    Best,
    Hybrid,
    Custom(RestartCbk),
}

/// The restart strategy plus its no-improvement budget.
pub struct Restart {
    policy: Policy,
    restart_step: usize,
}

impl Default for Restart {
    fn default() -> Self {
        Self {
            policy: Policy::Best,
            restart_step: 1_000_000,
        }
    }
}

impl std::fmt::Debug for Restart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match &self.policy {
            Policy::Random => "random",
            Policy::Best => "best",
            Policy::Hybrid => "hybrid",
            Policy::Custom(_) => "custom",
        };
        write!(f, "Restart({}, restart_step: {})", name, self.restart_step)
    }
}

impl Restart {
    /// Selects the policy by name; unknown names fall back to `random`.
    pub fn set_method(&mut self, name: &str) {
        self.policy = match name.to_ascii_lowercase().as_str() {
            "" | "random" => Policy::Random,
            "best" => Policy::Best,
            "hybrid" => Policy::Hybrid,
            other => {
                tracing::warn!(method = other, "unsupported restart method, fallback to random");
                Policy::Random
            }
        };
    }

    pub fn set_cbk(&mut self, cbk: RestartCbk) {
        self.policy = Policy::Custom(cbk);
    }

    /// Sets the no-improvement step budget; zero disables restarts.
    pub fn set_restart_step(&mut self, restart_step: usize) {
        self.restart_step = restart_step;
    }

    #[inline]
    fn should_restart(&self, ctx: &RestartCtx<'_>) -> bool {
        if self.restart_step == 0 {
            return false;
        }
        ctx.cur_step > ctx.last_improve_step + self.restart_step
    }

    /// Fires the restart if the budget has elapsed. Returns whether a
    /// restart happened (the caller then resets tabu state and refreshes
    /// activities).
    pub fn execute(&mut self, ctx: &mut RestartCtx<'_>) -> bool {
        if !self.should_restart(ctx) {
            return false;
        }
        match &mut self.policy {
            Policy::Custom(cbk) => cbk(ctx),
            Policy::Best => best_restart(ctx),
            Policy::Hybrid => hybrid_restart(ctx),
            Policy::Random => random_restart(ctx),
        }
        true
    }
}

fn reset_weights(ctx: &mut RestartCtx<'_>) {
    ctx.weights.fill(1);
}

fn random_restart(ctx: &mut RestartCtx<'_>) {
    for var_idx in 0..ctx.values.len() {
        let var = ctx.model.var(capstan_model::index::VarIndex::new(var_idx));
        ctx.values[var_idx] = sample_random_value(
            var,
            ctx.best_values[var_idx],
            ctx.found_feasible,
            ctx.model.tolerances().feas,
            ctx.rng,
        );
    }
    reset_weights(ctx);
}

fn best_restart(ctx: &mut RestartCtx<'_>) {
    if !ctx.found_feasible {
        random_restart(ctx);
        return;
    }
    for var_idx in 0..ctx.values.len() {
        let var = ctx.model.var(capstan_model::index::VarIndex::new(var_idx));
        ctx.values[var_idx] = ctx.best_values[var_idx].clamp(var.lower_bound(), var.upper_bound());
    }
    reset_weights(ctx);
}

fn hybrid_restart(ctx: &mut RestartCtx<'_>) {
    if !ctx.found_feasible {
        random_restart(ctx);
        return;
    }
    for var_idx in 0..ctx.values.len() {
        let var = ctx.model.var(capstan_model::index::VarIndex::new(var_idx));
        let random_value = sample_random_value(
            var,
            ctx.best_values[var_idx],
            ctx.found_feasible,
            ctx.model.tolerances().feas,
            ctx.rng,
        );
        let best_value = ctx.best_values[var_idx].clamp(var.lower_bound(), var.upper_bound());
        ctx.values[var_idx] = if ctx.rng.random::<bool>() {
            best_value
        } else {
            random_value
        };
    }
    reset_weights(ctx);
}

/// Draws a fresh value inside the variable's bounds: uniform for bounded
/// domains, anchored on the best value (or the nearest finite bound, or
/// zero) when a side is unbounded.
fn sample_random_value(
    var: &Variable,
    best_value: f64,
    found_feasible: bool,
    feas_tol: f64,
    rng: &mut StdRng,
) -> f64 {
    let lower = var.lower_bound();
    let upper = var.upper_bound();
    let finite_lower = var.has_finite_lower();
    let finite_upper = var.has_finite_upper();
    let value = if var.is_fixed(feas_tol) {
        lower
    } else if var.is_binary(feas_tol) {
        rng.random_range(0..=1) as f64
    } else if var.is_general_integer() {
        if finite_lower && finite_upper {
            let lower_int = lower.ceil() as i64;
            let upper_int = upper.floor() as i64;
            debug_assert!(
                lower_int <= upper_int,
                "called `sample_random_value` with crossed integer bounds [{}, {}]",
                lower_int,
                upper_int
            );
            rng.random_range(lower_int..=upper_int) as f64
        } else if found_feasible {
            best_value
        } else if finite_lower {
            lower
        } else if finite_upper {
            upper
        } else {
            0.0
        }
    } else if finite_lower && finite_upper {
        rng.random_range(lower..=upper)
    } else if found_feasible {
        best_value
    } else if finite_lower {
        lower
    } else if finite_upper {
        upper
    } else {
        0.0
    };
    value.clamp(lower, upper)
}

#[cfg(test)]
mod tests {
    use super::*;
    use capstan_core::num::Tolerances;
    use capstan_model::index::OBJECTIVE_CON;
    use capstan_model::store::ModelStore;
    use capstan_model::variable::VarKind;
    use rand::SeedableRng;

    fn model() -> ModelStore {
        let mut store = ModelStore::new(Tolerances::default());
        let b = store.make_variable("b", true);
        let i = store.make_variable("i", false);
        let r = store.make_variable("r", false);
        store.var_mut(i).set_kind(VarKind::GeneralInteger);
        store.var_mut(i).set_lower_bound(-3.0);
        store.var_mut(i).set_upper_bound(7.0);
        store.var_mut(r).set_upper_bound(2.5);
        store.add_term(OBJECTIVE_CON, b, 1.0);
        store.process_after_read().unwrap();
        store
    }

    #[test]
    fn test_no_restart_before_budget() {
        let model = model();
        let mut values = vec![0.0; 3];
        let best = vec![0.0; 3];
        let mut weights = vec![1u64; 1];
        let mut rng = StdRng::seed_from_u64(11);
        let mut restart = Restart::default();
        restart.set_restart_step(100);
        let mut ctx = RestartCtx {
            model: &model,
            values: &mut values,
            best_values: &best,
            weights: &mut weights,
            found_feasible: false,
            cur_step: 50,
            last_improve_step: 0,
            rng: &mut rng,
        };
        assert!(!restart.execute(&mut ctx));
    }

    #[test]
    fn test_restart_step_zero_disables() {
        let model = model();
        let mut values = vec![0.0; 3];
        let best = vec![0.0; 3];
        let mut weights = vec![1u64; 1];
        let mut rng = StdRng::seed_from_u64(11);
        let mut restart = Restart::default();
        restart.set_restart_step(0);
        let mut ctx = RestartCtx {
            model: &model,
            values: &mut values,
            best_values: &best,
            weights: &mut weights,
            found_feasible: false,
            cur_step: usize::MAX / 2,
            last_improve_step: 0,
            rng: &mut rng,
        };
        assert!(!restart.execute(&mut ctx));
    }

    #[test]
    fn test_random_restart_respects_bounds_and_kinds() {
        let model = model();
        let mut values = vec![0.5; 3];
        let best = vec![0.0; 3];
        let mut weights = vec![9u64; 1];
        let mut rng = StdRng::seed_from_u64(11);
        let mut restart = Restart::default();
        restart.set_method("random");
        restart.set_restart_step(10);
        let mut ctx = RestartCtx {
            model: &model,
            values: &mut values,
            best_values: &best,
            weights: &mut weights,
            found_feasible: false,
            cur_step: 100,
            last_improve_step: 0,
            rng: &mut rng,
        };
        assert!(restart.execute(&mut ctx));
        // Binary lands on {0, 1}.
        assert!(values[0] == 0.0 || values[0] == 1.0);
        // Integer lands on an integer inside [-3, 7].
        assert!((-3.0..=7.0).contains(&values[1]));
        assert_eq!(values[1], values[1].round());
        // Real lands inside [0, 2.5].
        assert!((0.0..=2.5).contains(&values[2]));
        // Weights reset.
        assert_eq!(weights, vec![1]);
    }

    #[test]
    fn test_best_restart_copies_best_when_feasible() {
        let model = model();
        let mut values = vec![0.0; 3];
        let best = vec![1.0, 5.0, 9.9];
        let mut weights = vec![4u64; 1];
        let mut rng = StdRng::seed_from_u64(11);
        let mut restart = Restart::default();
        restart.set_method("best");
        restart.set_restart_step(10);
        let mut ctx = RestartCtx {
            model: &model,
            values: &mut values,
            best_values: &best,
            weights: &mut weights,
            found_feasible: true,
            cur_step: 100,
            last_improve_step: 0,
            rng: &mut rng,
        };
        assert!(restart.execute(&mut ctx));
        assert_eq!(values[0], 1.0);
        assert_eq!(values[1], 5.0);
        // Best value above the bound is clamped back in.
        assert_eq!(values[2], 2.5);
        assert_eq!(weights, vec![1]);
    }

    #[test]
    fn test_hybrid_restart_stays_in_bounds() {
        let model = model();
        let mut values = vec![0.0; 3];
        let best = vec![1.0, 2.0, 1.5];
        let mut weights = vec![4u64; 1];
        let mut rng = StdRng::seed_from_u64(42);
        let mut restart = Restart::default();
        restart.set_method("hybrid");
        restart.set_restart_step(10);
        let mut ctx = RestartCtx {
            model: &model,
            values: &mut values,
            best_values: &best,
            weights: &mut weights,
            found_feasible: true,
            cur_step: 100,
            last_improve_step: 0,
            rng: &mut rng,
        };
        assert!(restart.execute(&mut ctx));
        for (idx, value) in values.iter().enumerate() {
            let var = model.var(capstan_model::index::VarIndex::new(idx));
            assert!(var.in_bound(*value, 1e-6));
        }
    }
}
