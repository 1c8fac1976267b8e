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

//! Initial assignment strategies.
//!
//! `zero` puts every variable on zero clamped into its bounds (the bound
//! nearest zero when zero is outside them). `random` starts from the zero
//! assignment and redraws every bounded integral variable uniformly.

use capstan_model::store::ModelStore;
use rand::rngs::StdRng;
use rand::Rng;

/// Everything a start strategy reads and writes.
pub struct StartCtx<'a> {
    pub model: &'a ModelStore,
    pub values: &'a mut [f64],
    pub rng: &'a mut StdRng,
}

/// Callback type for user-supplied starts.
pub type StartCbk = Box<dyn FnMut(&mut StartCtx<'_>) + Send>;

enum Method {
    Zero,
    Random,
    Custom(StartCbk),
}

/// The start strategy.
pub struct Start {
    method: Method,
}

impl Default for Start {
    fn default() -> Self {
        Self {
            method: Method::Zero,
        }
    }
}

impl std::fmt::Debug for Start {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match &self.method {
            Method::Zero => "zero",
            Method::Random => "random",
            Method::Custom(_) => "custom",
        };
        write!(f, "Start({})", name)
    }
}

impl Start {
    /// Selects the method by name; unknown names fall back to `zero`.
    pub fn set_method(&mut self, name: &str) {
        self.method = match name.to_ascii_lowercase().as_str() {
            "" | "zero" => Method::Zero,
            "random" => Method::Random,
            other => {
                tracing::warn!(method = other, "unsupported start method, fallback to zero");
                Method::Zero
            }
        };
    }

    pub fn set_cbk(&mut self, cbk: StartCbk) {
        self.method = Method::Custom(cbk);
    }

    /// Fills in the initial assignment.
    pub fn apply(&mut self, ctx: &mut StartCtx<'_>) {
        match &mut self.method {
            Method::Custom(cbk) => cbk(ctx),
            Method::Random => random_start(ctx),
            Method::Zero => zero_start(ctx),
        }
    }
}

fn zero_start(ctx: &mut StartCtx<'_>) {
    for var_idx in 0..ctx.values.len() {
        let var = ctx.model.var(capstan_model::index::VarIndex::new(var_idx));
        ctx.values[var_idx] = if var.lower_bound() > 0.0 {
            var.lower_bound()
        } else if var.upper_bound() < 0.0 {
            var.upper_bound()
        } else {
            0.0
        };
    }
}

fn random_start(ctx: &mut StartCtx<'_>) {
    zero_start(ctx);
    let feas = ctx.model.tolerances().feas;
    for var_idx in 0..ctx.values.len() {
        let var = ctx.model.var(capstan_model::index::VarIndex::new(var_idx));
        let integral = var.is_binary(feas) || var.is_general_integer();
        if !integral || !var.has_finite_lower() || !var.has_finite_upper() {
            continue;
        }
        let mut lower = var.lower_bound().round() as i64;
        let mut upper = var.upper_bound().round() as i64;
        if lower > upper {
            std::mem::swap(&mut lower, &mut upper);
        }
        ctx.values[var_idx] = ctx.rng.random_range(lower..=upper) as f64;
    }
}
