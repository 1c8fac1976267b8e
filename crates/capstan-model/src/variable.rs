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

//! The variable (column) entity.
//!
//! A variable stores its bounds, its kind, and one half of the dual
//! incidence structure: for every term the variable participates in, the
//! constraint's index and the term's position inside that constraint's
//! parallel term vectors. The constraint stores the mirror image, so either
//! side can reach the other in O(1).

use crate::index::{ConIndex, VarIndex};
use capstan_core::num::{INF, NEG_INF};

/// The kind of a variable after preprocessing.
///
/// `Binary` and `GeneralInteger` restrict values to integers; `Fixed` marks
/// a variable whose bounds have collapsed (the preprocessor substitutes it
/// away). Kinds are reclassified during preprocessing: a general integer
/// with `{0, 1}` bounds becomes `Binary`, equal bounds become `Fixed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VarKind {
    Binary,
    GeneralInteger,
    Real,
    Fixed,
}

/// A single decision variable.
#[derive(Debug, Clone)]
pub struct Variable {
    name: String,
    index: VarIndex,
    kind: VarKind,
    lower: f64,
    upper: f64,
    con_idxs: Vec<ConIndex>,
    pos_in_con: Vec<usize>,
}

impl Variable {
    /// Creates a variable. An integral hint yields a binary variable with
    /// `[0, 1]` bounds (the MPS marker convention); otherwise the variable
    /// is real with `[0, +inf)` bounds until a BOUNDS entry says otherwise.
    pub fn new(name: impl Into<String>, index: VarIndex, integral: bool) -> Self {
        let (kind, upper) = if integral {
            (VarKind::Binary, 1.0)
        } else {
            (VarKind::Real, INF)
        };
        Self {
            name: name.into(),
            index,
            kind,
            lower: 0.0,
            upper,
            con_idxs: Vec::new(),
            pos_in_con: Vec::new(),
        }
    }

    #[inline(always)]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline(always)]
    pub fn index(&self) -> VarIndex {
        self.index
    }

    #[inline(always)]
    pub fn kind(&self) -> VarKind {
        self.kind
    }

    #[inline(always)]
    pub fn lower_bound(&self) -> f64 {
        self.lower
    }

    #[inline(always)]
    pub fn upper_bound(&self) -> f64 {
        self.upper
    }

    /// Number of terms (constraints) this variable participates in.
    #[inline(always)]
    pub fn term_num(&self) -> usize {
        self.con_idxs.len()
    }

    /// The constraint of the `term_idx`-th incidence.
    #[inline(always)]
    pub fn con_idx(&self, term_idx: usize) -> ConIndex {
        self.con_idxs[term_idx]
    }

    /// The position of the `term_idx`-th incidence inside that constraint's
    /// term vectors.
    #[inline(always)]
    pub fn pos_in_con(&self, term_idx: usize) -> usize {
        self.pos_in_con[term_idx]
    }

    /// All constraints this variable touches, in incidence order.
    #[inline(always)]
    pub fn con_idx_set(&self) -> &[ConIndex] {
        &self.con_idxs
    }

    /// Appends an incidence. Called by the store when a term is added.
    #[inline]
    pub(crate) fn add_con(&mut self, con_idx: ConIndex, pos_in_con: usize) {
        self.con_idxs.push(con_idx);
        self.pos_in_con.push(pos_in_con);
    }

    /// Repairs the mirrored position after a swap-with-last term deletion.
    #[inline]
    pub(crate) fn set_pos_in_con(&mut self, term_idx: usize, pos_in_con: usize) {
        self.pos_in_con[term_idx] = pos_in_con;
    }

    /// Drops all incidences. Called once a fixed variable has been
    /// substituted out of every row it touched.
    #[inline]
    pub(crate) fn clear_incidence(&mut self) {
        self.con_idxs.clear();
        self.pos_in_con.clear();
    }

    /// Overrides the kind. Readers use this when a BOUNDS entry or an
    /// `integer`/`binary` section reinterprets a variable.
    #[inline]
    pub fn set_kind(&mut self, kind: VarKind) {
        self.kind = kind;
    }

    /// Sets the lower bound, rounding up for integral kinds.
    pub fn set_lower_bound(&mut self, lower: f64) {
        debug_assert!(
            self.kind != VarKind::Fixed,
            "called `Variable::set_lower_bound` on fixed variable {}",
            self.name
        );
        self.lower = match self.kind {
            VarKind::Real => lower,
            _ => lower.ceil(),
        };
    }

    /// Sets the upper bound, rounding down for integral kinds.
    pub fn set_upper_bound(&mut self, upper: f64) {
        debug_assert!(
            self.kind != VarKind::Fixed,
            "called `Variable::set_upper_bound` on fixed variable {}",
            self.name
        );
        self.upper = match self.kind {
            VarKind::Real => upper,
            _ => upper.floor(),
        };
    }

    /// Sets both bounds without integral rounding. Used when a variable is
    /// pinned to an exact (possibly fractional) value.
    pub(crate) fn fix_at(&mut self, value: f64) {
        self.lower = value;
        self.upper = value;
        self.kind = VarKind::Fixed;
    }

    /// Returns `true` if `value` lies within the bounds, up to `feas_tol`.
    #[inline(always)]
    pub fn in_bound(&self, value: f64, feas_tol: f64) -> bool {
        self.lower - feas_tol <= value && value <= self.upper + feas_tol
    }

    /// A variable is fixed when its bounds coincide up to `feas_tol`.
    #[inline(always)]
    pub fn is_fixed(&self, feas_tol: f64) -> bool {
        (self.lower - self.upper).abs() < feas_tol
    }

    /// A variable is binary if declared so, or if it is a general integer
    /// whose bounds are exactly `{0, 1}` up to `feas_tol`.
    #[inline]
    pub fn is_binary(&self, feas_tol: f64) -> bool {
        self.kind == VarKind::Binary
            || (self.kind == VarKind::GeneralInteger
                && self.lower.abs() < feas_tol
                && (self.upper - 1.0).abs() < feas_tol)
    }

    #[inline(always)]
    pub fn is_real(&self) -> bool {
        self.kind == VarKind::Real
    }

    #[inline(always)]
    pub fn is_general_integer(&self) -> bool {
        self.kind == VarKind::GeneralInteger
    }

    /// Midpoint of the bounds; the substitution value for fixed variables.
    #[inline(always)]
    pub fn fixed_value(&self) -> f64 {
        (self.lower + self.upper) * 0.5
    }

    #[inline(always)]
    pub fn has_finite_lower(&self) -> bool {
        self.lower > NEG_INF * 0.5
    }

    #[inline(always)]
    pub fn has_finite_upper(&self) -> bool {
        self.upper < INF * 0.5
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEAS: f64 = 1e-6;

    #[test]
    fn test_integral_hint_creates_binary() {
        let var = Variable::new("x", VarIndex::new(0), true);
        assert_eq!(var.kind(), VarKind::Binary);
        assert_eq!(var.lower_bound(), 0.0);
        assert_eq!(var.upper_bound(), 1.0);
        assert!(var.is_binary(FEAS));
    }

    #[test]
    fn test_default_real_bounds() {
        let var = Variable::new("y", VarIndex::new(1), false);
        assert_eq!(var.kind(), VarKind::Real);
        assert_eq!(var.lower_bound(), 0.0);
        assert!(!var.has_finite_upper());
    }

    #[test]
    fn test_integer_bounds_round_inward() {
        let mut var = Variable::new("z", VarIndex::new(0), false);
        var.set_kind(VarKind::GeneralInteger);
        var.set_lower_bound(1.3);
        var.set_upper_bound(7.8);
        assert_eq!(var.lower_bound(), 2.0);
        assert_eq!(var.upper_bound(), 7.0);
    }

    #[test]
    fn test_general_integer_with_unit_bounds_is_binary() {
        let mut var = Variable::new("b", VarIndex::new(0), false);
        var.set_kind(VarKind::GeneralInteger);
        var.set_lower_bound(0.0);
        var.set_upper_bound(1.0);
        assert!(var.is_binary(FEAS));
        assert!(!var.is_fixed(FEAS));
    }

    #[test]
    fn test_in_bound_respects_tolerance() {
        let mut var = Variable::new("r", VarIndex::new(0), false);
        var.set_lower_bound(0.0);
        var.set_upper_bound(5.0);
        assert!(var.in_bound(5.0 + 0.5e-6, FEAS));
        assert!(!var.in_bound(5.1, FEAS));
        assert!(var.in_bound(-0.5e-6, FEAS));
    }

    #[test]
    fn test_fix_at_keeps_fractional_value() {
        let mut var = Variable::new("f", VarIndex::new(0), false);
        var.fix_at(2.5);
        assert_eq!(var.kind(), VarKind::Fixed);
        assert_eq!(var.fixed_value(), 2.5);
        assert!(var.is_fixed(FEAS));
    }

    #[test]
    fn test_incidence_bookkeeping() {
        let mut var = Variable::new("v", VarIndex::new(0), false);
        var.add_con(ConIndex::new(1), 0);
        var.add_con(ConIndex::new(3), 2);
        assert_eq!(var.term_num(), 2);
        assert_eq!(var.con_idx(1), ConIndex::new(3));
        assert_eq!(var.pos_in_con(1), 2);
        var.set_pos_in_con(1, 0);
        assert_eq!(var.pos_in_con(1), 0);
    }
}
