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

//! The constraint (row) entity.
//!
//! A constraint stores its sparse terms as three parallel vectors: the
//! coefficient, the variable index, and the position of the mirrored entry
//! inside that variable's incidence lists. Keeping the cross-position makes
//! term deletion O(1): swap the last term into the hole, then fix up a
//! single position on the variable side (the store drives that repair, see
//! `ModelStore::delete_term_at`).
//!
//! After preprocessing only two senses survive: `<=` rows and `=` rows.
//! `>=` rows are negated in place, and equalities are optionally split into
//! a pair of opposing `<=` rows.

use crate::classify::ConType;
use crate::index::{ConIndex, VarIndex};
use smallvec::SmallVec;

/// The sense a constraint is created with. Preprocessing normalises
/// `GreaterEqual` away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConSense {
    LessEqual,
    Equal,
    GreaterEqual,
}

/// A term removed by [`Constraint::remove_term`], together with the
/// information the store needs to repair position symmetry and fold the
/// substituted value into the right-hand side.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RemovedTerm {
    /// Coefficient of the deleted term.
    pub coeff: f64,
    /// Variable that owned the term moved into the hole, if any.
    pub moved_var: Option<(VarIndex, usize)>,
}

/// A single linear constraint. Row 0 is the objective.
#[derive(Debug, Clone)]
pub struct Constraint {
    name: String,
    index: ConIndex,
    is_equality: bool,
    is_greater: bool,
    coeffs: Vec<f64>,
    var_idxs: Vec<VarIndex>,
    pos_in_var: Vec<usize>,
    rhs: f64,
    inferred_sat: bool,
    types: SmallVec<[ConType; 2]>,
}

impl Constraint {
    pub fn new(name: impl Into<String>, index: ConIndex, sense: ConSense) -> Self {
        Self {
            name: name.into(),
            index,
            is_equality: sense == ConSense::Equal,
            is_greater: sense == ConSense::GreaterEqual,
            coeffs: Vec::new(),
            var_idxs: Vec::new(),
            pos_in_var: Vec::new(),
            rhs: 0.0,
            inferred_sat: false,
            types: SmallVec::new(),
        }
    }

    #[inline(always)]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline(always)]
    pub fn index(&self) -> ConIndex {
        self.index
    }

    #[inline(always)]
    pub fn is_equality(&self) -> bool {
        self.is_equality
    }

    #[inline(always)]
    pub fn is_greater(&self) -> bool {
        self.is_greater
    }

    #[inline(always)]
    pub fn rhs(&self) -> f64 {
        self.rhs
    }

    #[inline(always)]
    pub fn set_rhs(&mut self, rhs: f64) {
        self.rhs = rhs;
    }

    #[inline(always)]
    pub fn term_num(&self) -> usize {
        self.coeffs.len()
    }

    #[inline(always)]
    pub fn coeff(&self, term_idx: usize) -> f64 {
        self.coeffs[term_idx]
    }

    #[inline(always)]
    pub fn set_coeff(&mut self, term_idx: usize, coeff: f64) {
        self.coeffs[term_idx] = coeff;
    }

    #[inline(always)]
    pub fn var_idx(&self, term_idx: usize) -> VarIndex {
        self.var_idxs[term_idx]
    }

    #[inline(always)]
    pub fn var_idx_set(&self) -> &[VarIndex] {
        &self.var_idxs
    }

    #[inline(always)]
    pub fn coeff_set(&self) -> &[f64] {
        &self.coeffs
    }

    /// Coefficient of a singleton row.
    ///
    /// # Panics
    ///
    /// Panics if the row has no terms.
    #[inline(always)]
    pub fn unique_coeff(&self) -> f64 {
        self.coeffs[0]
    }

    /// Variable of a singleton row.
    #[inline(always)]
    pub fn unique_var_idx(&self) -> VarIndex {
        self.var_idxs[0]
    }

    #[inline(always)]
    pub fn is_inferred_sat(&self) -> bool {
        self.inferred_sat
    }

    #[inline(always)]
    pub(crate) fn mark_inferred_sat(&mut self) {
        self.inferred_sat = true;
    }

    /// Appends a term. Called by the store, which inserts the mirrored
    /// incidence on the variable side first.
    #[inline]
    pub(crate) fn add_term(&mut self, var_idx: VarIndex, coeff: f64, pos_in_var: usize) {
        self.var_idxs.push(var_idx);
        self.coeffs.push(coeff);
        self.pos_in_var.push(pos_in_var);
    }

    /// Negates every coefficient and the rhs, turning a `>=` row into `<=`.
    pub(crate) fn convert_greater_to_less(&mut self) {
        debug_assert!(
            self.is_greater,
            "called `Constraint::convert_greater_to_less` on non-greater row {}",
            self.name
        );
        for coeff in &mut self.coeffs {
            *coeff = -*coeff;
        }
        self.rhs = -self.rhs;
        self.is_greater = false;
    }

    /// Reinterprets an equality row as its `<=` half. The store appends the
    /// negated sibling separately.
    pub(crate) fn convert_equality_to_less(&mut self) {
        debug_assert!(
            self.is_equality,
            "called `Constraint::convert_equality_to_less` on non-equality row {}",
            self.name
        );
        self.is_equality = false;
        self.is_greater = false;
    }

    /// Removes the term at `term_idx` by swapping the last term into its
    /// place. Returns what the caller needs to finish the job: the deleted
    /// coefficient (to fold into rhs or the objective offset) and the moved
    /// term's variable-side position (to repair symmetry). The constraint
    /// cannot reach into the variable list itself, so the store completes
    /// the repair.
    pub(crate) fn remove_term(&mut self, term_idx: usize) -> RemovedTerm {
        debug_assert!(
            term_idx < self.term_num(),
            "called `Constraint::remove_term` with term index out of bounds: the len is {} but the index is {}",
            self.term_num(),
            term_idx
        );
        let coeff = self.coeffs[term_idx];
        let last = self.term_num() - 1;
        let moved_var = if term_idx != last {
            let moved = (self.var_idxs[last], self.pos_in_var[last]);
            self.var_idxs[term_idx] = self.var_idxs[last];
            self.coeffs[term_idx] = self.coeffs[last];
            self.pos_in_var[term_idx] = self.pos_in_var[last];
            Some(moved)
        } else {
            None
        };
        self.var_idxs.pop();
        self.coeffs.pop();
        self.pos_in_var.pop();
        RemovedTerm { coeff, moved_var }
    }

    /// A zero-term row is trivially satisfiable iff its rhs admits the
    /// empty sum: `0 <= rhs` (inequality) or `rhs == 0` (equality), both up
    /// to `feas_tol`.
    #[inline]
    pub fn verify_empty_sat(&self, feas_tol: f64) -> bool {
        if self.is_equality {
            self.rhs.abs() <= feas_tol
        } else {
            self.rhs + feas_tol >= 0.0
        }
    }

    #[inline]
    pub fn has_type(&self, ty: ConType) -> bool {
        self.types.contains(&ty)
    }

    #[inline]
    pub fn types(&self) -> &[ConType] {
        &self.types
    }

    #[inline]
    pub(crate) fn add_type(&mut self, ty: ConType) {
        if !self.has_type(ty) {
            self.types.push(ty);
        }
    }

    #[inline(always)]
    pub(crate) fn pos_in_var(&self, term_idx: usize) -> usize {
        self.pos_in_var[term_idx]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(sense: ConSense) -> Constraint {
        Constraint::new("c0", ConIndex::new(1), sense)
    }

    #[test]
    fn test_greater_to_less_negates_terms_and_rhs() {
        let mut con = row(ConSense::GreaterEqual);
        con.add_term(VarIndex::new(0), 2.0, 0);
        con.add_term(VarIndex::new(1), -3.0, 0);
        con.set_rhs(4.0);
        con.convert_greater_to_less();
        assert!(!con.is_greater());
        assert_eq!(con.coeff(0), -2.0);
        assert_eq!(con.coeff(1), 3.0);
        assert_eq!(con.rhs(), -4.0);
    }

    #[test]
    fn test_remove_middle_term_swaps_last() {
        let mut con = row(ConSense::LessEqual);
        con.add_term(VarIndex::new(0), 1.0, 0);
        con.add_term(VarIndex::new(1), 2.0, 5);
        con.add_term(VarIndex::new(2), 3.0, 7);
        let removed = con.remove_term(0);
        assert_eq!(removed.coeff, 1.0);
        assert_eq!(removed.moved_var, Some((VarIndex::new(2), 7)));
        assert_eq!(con.term_num(), 2);
        assert_eq!(con.var_idx(0), VarIndex::new(2));
        assert_eq!(con.coeff(0), 3.0);
    }

    #[test]
    fn test_remove_last_term_moves_nothing() {
        let mut con = row(ConSense::LessEqual);
        con.add_term(VarIndex::new(0), 1.0, 0);
        let removed = con.remove_term(0);
        assert_eq!(removed.moved_var, None);
        assert_eq!(con.term_num(), 0);
    }

    #[test]
    fn test_verify_empty_sat() {
        let mut ineq = row(ConSense::LessEqual);
        ineq.set_rhs(0.5);
        assert!(ineq.verify_empty_sat(1e-6));
        ineq.set_rhs(-0.5);
        assert!(!ineq.verify_empty_sat(1e-6));

        let mut eq = row(ConSense::Equal);
        eq.set_rhs(0.0);
        assert!(eq.verify_empty_sat(1e-6));
        eq.set_rhs(0.5);
        assert!(!eq.verify_empty_sat(1e-6));
    }

    #[test]
    fn test_type_tags_deduplicate() {
        let mut con = row(ConSense::LessEqual);
        con.add_type(ConType::SetPacking);
        con.add_type(ConType::SetPacking);
        con.add_type(ConType::Knapsack);
        assert_eq!(con.types().len(), 2);
        assert!(con.has_type(ConType::SetPacking));
        assert!(con.has_type(ConType::Knapsack));
    }
}
