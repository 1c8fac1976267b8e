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

//! Numeric constants, tolerances, and the compensated accumulator.
//!
//! MIP models use a large-but-finite sentinel for "unbounded" instead of
//! IEEE infinities so that arithmetic on bounds stays well-defined. Every
//! comparison against a model quantity goes through a [`Tolerances`] value;
//! there is no exact arithmetic anywhere in the solver.

/// Sentinel for an infinite upper bound. Finite on purpose: bound
/// arithmetic (negation, midpoints, differences) must not produce NaN.
pub const INF: f64 = 1e20;

/// Sentinel for an infinite lower bound.
pub const NEG_INF: f64 = -INF;

/// Returns `true` if `lower` is a real (finite) lower bound rather than the
/// [`NEG_INF`] sentinel.
#[inline(always)]
pub fn finite_lower(lower: f64) -> bool {
    lower > NEG_INF * 0.5
}

/// Returns `true` if `upper` is a real (finite) upper bound rather than the
/// [`INF`] sentinel.
#[inline(always)]
pub fn finite_upper(upper: f64) -> bool {
    upper < INF * 0.5
}

/// The comparison tolerances used throughout the solver.
///
/// * `feas` — constraint slack: a row is satisfied when its gap is within
///   this tolerance.
/// * `opt` — objective strict-improvement threshold.
/// * `zero` — magnitude below which a coefficient is treated as zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerances {
    pub feas: f64,
    pub opt: f64,
    pub zero: f64,
}

impl Default for Tolerances {
    #[inline]
    fn default() -> Self {
        Self {
            feas: 1e-6,
            opt: 1e-4,
            zero: 1e-9,
        }
    }
}

impl Tolerances {
    /// Creates a tolerance bundle from explicit values.
    ///
    /// # Panics
    ///
    /// Panics if any tolerance is negative or not finite.
    #[inline]
    pub fn new(feas: f64, opt: f64, zero: f64) -> Self {
        assert!(
            feas >= 0.0 && feas.is_finite(),
            "called `Tolerances::new` with invalid feasibility tolerance {}",
            feas
        );
        assert!(
            opt >= 0.0 && opt.is_finite(),
            "called `Tolerances::new` with invalid optimality tolerance {}",
            opt
        );
        assert!(
            zero >= 0.0 && zero.is_finite(),
            "called `Tolerances::new` with invalid zero tolerance {}",
            zero
        );
        Self { feas, opt, zero }
    }

    /// Returns `true` if `value` is within the zero tolerance.
    #[inline(always)]
    pub fn is_zero(&self, value: f64) -> bool {
        value.abs() < self.zero
    }
}

/// A compensated (Neumaier) floating-point accumulator.
///
/// Activity refresh sums long sparse rows; naive `f64` summation loses low
/// bits that the incremental activity updates then inherit. Neumaier's
/// variant of Kahan summation tracks the running rounding error in a
/// separate compensation term, recovering nearly the precision of a wider
/// accumulator at the cost of a few extra flops per term.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NeumaierSum {
    sum: f64,
    compensation: f64,
}

impl NeumaierSum {
    /// Creates an empty accumulator.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `value` to the running sum.
    #[inline(always)]
    pub fn add(&mut self, value: f64) {
        let t = self.sum + value;
        if self.sum.abs() >= value.abs() {
            self.compensation += (self.sum - t) + value;
        } else {
            self.compensation += (value - t) + self.sum;
        }
        self.sum = t;
    }

    /// Adds the product `a * b` using a fused multiply-add so the product
    /// is rounded only once.
    #[inline(always)]
    pub fn add_product(&mut self, a: f64, b: f64) {
        self.add(a.mul_add(b, 0.0));
    }

    /// Returns the compensated total.
    #[inline(always)]
    pub fn value(&self) -> f64 {
        self.sum + self.compensation
    }
}

/// Single compensated update `base + coeff * delta`, the inner operation of
/// incremental activity maintenance. The fused multiply-add keeps the
/// product at full precision before the final rounding.
#[inline(always)]
pub fn accumulate(base: f64, coeff: f64, delta: f64) -> f64 {
    coeff.mul_add(delta, base)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tolerances_match_solver_defaults() {
        let tol = Tolerances::default();
        assert_eq!(tol.feas, 1e-6);
        assert_eq!(tol.opt, 1e-4);
        assert_eq!(tol.zero, 1e-9);
    }

    #[test]
    fn test_finite_bound_predicates() {
        assert!(finite_lower(0.0));
        assert!(finite_upper(1e10));
        assert!(!finite_lower(NEG_INF));
        assert!(!finite_upper(INF));
        // Values near the sentinel count as infinite too.
        assert!(!finite_upper(0.9 * INF));
    }

    #[test]
    fn test_neumaier_sum_recovers_cancellation() {
        // 1.0 + 1e100 - 1e100 == 1.0 only with compensation.
        let mut acc = NeumaierSum::new();
        acc.add(1.0);
        acc.add(1e100);
        acc.add(-1e100);
        assert_eq!(acc.value(), 1.0);
    }

    #[test]
    fn test_neumaier_sum_of_products_matches_exact() {
        let coeffs = [1.5, -2.25, 0.125, 4.0];
        let values = [2.0, 3.0, -8.0, 0.5];
        let mut acc = NeumaierSum::new();
        for (c, v) in coeffs.iter().zip(values.iter()) {
            acc.add_product(*c, *v);
        }
        // All inputs are exactly representable, so the sum is exact.
        assert_eq!(acc.value(), 1.5 * 2.0 - 2.25 * 3.0 + 0.125 * -8.0 + 4.0 * 0.5);
    }

    #[test]
    fn test_is_zero_uses_zero_tolerance() {
        let tol = Tolerances::default();
        assert!(tol.is_zero(1e-10));
        assert!(!tol.is_zero(1e-8));
    }
}
