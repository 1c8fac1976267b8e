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

//! The model store and its preprocessing pipeline.
//!
//! `ModelStore` owns every variable and constraint, the name maps that make
//! creation idempotent, and the caches the search engine reads (objective
//! costs per variable, binary and non-fixed index lists, the equality-flag
//! vector). Readers and the builder populate it; `process_after_read` then
//! normalises the model exactly once:
//!
//! 1. optional equality split into opposing `<=` pairs,
//! 2. `>=` negation,
//! 3. objective negation for maximisation (offset sign flipped so reported
//!    values stay in the user's sense),
//! 4. singleton-row bound tightening,
//! 5. fixed-variable substitution with O(1) term deletion,
//! 6. variable kind reclassification,
//! 7. informational structural classification.
//!
//! After a successful `process_after_read` the model is immutable; the
//! search engine holds it behind a shared reference.

use crate::classify::{self, ConType};
use crate::constraint::{ConSense, Constraint};
use crate::error::ModelError;
use crate::index::{ConIndex, VarIndex, OBJECTIVE_CON};
use crate::variable::{VarKind, Variable};
use capstan_core::num::Tolerances;
use fixedbitset::FixedBitSet;
use std::collections::HashMap;

/// Bound-strengthening level: off, only for purely integral models, or
/// always.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BoundStrengthen {
    Off,
    #[default]
    IntegerOnly,
    Always,
}

/// The user-facing optimisation sense. The engine always minimises
/// internally; maximisation is handled by negating the objective row once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ObjSense {
    #[default]
    Minimize,
    Maximize,
}

/// Sentinel for "variable has no objective term".
const NO_OBJ_TERM: usize = usize::MAX;

/// The model store. See the module docs for the lifecycle.
#[derive(Debug, Clone)]
pub struct ModelStore {
    tolerances: Tolerances,
    bound_strengthen: BoundStrengthen,
    split_eq: bool,
    sense: ObjSense,
    obj_offset: f64,
    obj_name: String,
    vars: Vec<Variable>,
    cons: Vec<Constraint>,
    var_name_to_idx: HashMap<String, VarIndex>,
    con_name_to_idx: HashMap<String, ConIndex>,
    normalized: bool,
    var_num: usize,
    con_num: usize,
    binary_num: usize,
    general_integer_num: usize,
    fixed_num: usize,
    real_num: usize,
    deleted_con_num: usize,
    deleted_var_num: usize,
    inferred_var_num: usize,
    binary_idxs: Vec<VarIndex>,
    non_fixed_idxs: Vec<VarIndex>,
    var_obj_cost: Vec<f64>,
    var_to_obj_term: Vec<usize>,
    con_is_equality: Vec<bool>,
}

impl ModelStore {
    /// Creates an empty store. The objective row is inserted immediately at
    /// index 0 with an empty name.
    pub fn new(tolerances: Tolerances) -> Self {
        let mut store = Self {
            tolerances,
            bound_strengthen: BoundStrengthen::default(),
            split_eq: true,
            sense: ObjSense::default(),
            obj_offset: 0.0,
            obj_name: String::new(),
            vars: Vec::new(),
            cons: Vec::new(),
            var_name_to_idx: HashMap::new(),
            con_name_to_idx: HashMap::new(),
            normalized: false,
            var_num: 0,
            con_num: 0,
            binary_num: 0,
            general_integer_num: 0,
            fixed_num: 0,
            real_num: 0,
            deleted_con_num: 0,
            deleted_var_num: 0,
            inferred_var_num: 0,
            binary_idxs: Vec::new(),
            non_fixed_idxs: Vec::new(),
            var_obj_cost: Vec::new(),
            var_to_obj_term: Vec::new(),
            con_is_equality: Vec::new(),
        };
        store
            .cons
            .push(Constraint::new("", OBJECTIVE_CON, ConSense::LessEqual));
        store
            .con_name_to_idx
            .insert(String::new(), OBJECTIVE_CON);
        store
    }

    #[inline]
    pub fn tolerances(&self) -> &Tolerances {
        &self.tolerances
    }

    #[inline]
    pub fn set_bound_strengthen(&mut self, level: BoundStrengthen) {
        self.bound_strengthen = level;
    }

    #[inline]
    pub fn set_split_eq(&mut self, enable: bool) {
        self.split_eq = enable;
    }

    #[inline]
    pub fn set_sense(&mut self, sense: ObjSense) {
        self.sense = sense;
    }

    #[inline]
    pub fn sense(&self) -> ObjSense {
        self.sense
    }

    /// `+1.0` when minimising, `-1.0` when maximising. Multiplying an
    /// internal objective value by this factor (after adding the offset)
    /// yields the value in the user's sense.
    #[inline(always)]
    pub fn sense_factor(&self) -> f64 {
        match self.sense {
            ObjSense::Minimize => 1.0,
            ObjSense::Maximize => -1.0,
        }
    }

    #[inline]
    pub fn obj_offset(&self) -> f64 {
        self.obj_offset
    }

    #[inline]
    pub(crate) fn add_obj_offset(&mut self, delta: f64) {
        self.obj_offset += delta;
    }

    #[inline]
    pub fn set_obj_name(&mut self, name: impl Into<String>) {
        self.obj_name = name.into();
    }

    #[inline]
    pub fn obj_name(&self) -> &str {
        &self.obj_name
    }

    /// Creates a variable, or returns the existing one with the same name.
    pub fn make_variable(&mut self, name: &str, integral: bool) -> VarIndex {
        if let Some(&idx) = self.var_name_to_idx.get(name) {
            return idx;
        }
        let idx = VarIndex::new(self.vars.len());
        self.var_name_to_idx.insert(name.to_owned(), idx);
        self.vars.push(Variable::new(name, idx, integral));
        idx
    }

    /// Creates a constraint, or returns the existing one with the same
    /// name. The empty name maps to the objective row.
    pub fn make_constraint(&mut self, name: &str, sense: ConSense) -> ConIndex {
        if let Some(&idx) = self.con_name_to_idx.get(name) {
            return idx;
        }
        let idx = ConIndex::new(self.cons.len());
        self.con_name_to_idx.insert(name.to_owned(), idx);
        self.cons.push(Constraint::new(name, idx, sense));
        idx
    }

    /// Appends a term to a row, maintaining position symmetry on both
    /// sides. Coefficients below the zero tolerance are dropped.
    pub fn add_term(&mut self, con_idx: ConIndex, var_idx: VarIndex, coeff: f64) {
        if coeff.abs() < self.tolerances.zero {
            tracing::debug!(
                constraint = self.cons[con_idx.get()].name(),
                coeff,
                "dropping near-zero coefficient"
            );
            return;
        }
        let pos_in_con = self.cons[con_idx.get()].term_num();
        let var = &mut self.vars[var_idx.get()];
        var.add_con(con_idx, pos_in_con);
        let pos_in_var = var.term_num() - 1;
        self.cons[con_idx.get()].add_term(var_idx, coeff, pos_in_var);
    }

    #[inline]
    pub fn var(&self, idx: VarIndex) -> &Variable {
        &self.vars[idx.get()]
    }

    #[inline]
    pub fn var_mut(&mut self, idx: VarIndex) -> &mut Variable {
        &mut self.vars[idx.get()]
    }

    #[inline]
    pub fn var_index_by_name(&self, name: &str) -> Option<VarIndex> {
        self.var_name_to_idx.get(name).copied()
    }

    #[inline]
    pub fn con(&self, idx: ConIndex) -> &Constraint {
        &self.cons[idx.get()]
    }

    #[inline]
    pub fn con_mut(&mut self, idx: ConIndex) -> &mut Constraint {
        &mut self.cons[idx.get()]
    }

    #[inline]
    pub fn con_index_by_name(&self, name: &str) -> Option<ConIndex> {
        self.con_name_to_idx.get(name).copied()
    }

    /// The objective row.
    #[inline]
    pub fn objective(&self) -> &Constraint {
        &self.cons[OBJECTIVE_CON.get()]
    }

    /// Sets the right-hand side of a named row. Unknown names are ignored
    /// (MPS files may carry RHS entries for the free objective row name).
    pub fn set_rhs_by_name(&mut self, name: &str, rhs: f64) {
        let idx = if name == self.obj_name {
            Some(OBJECTIVE_CON)
        } else {
            self.con_index_by_name(name)
        };
        if let Some(idx) = idx {
            self.cons[idx.get()].set_rhs(rhs);
        }
    }

    /// Number of variables. Valid after `process_after_read`.
    #[inline(always)]
    pub fn var_num(&self) -> usize {
        self.var_num
    }

    /// Number of rows including the objective. Valid after
    /// `process_after_read`.
    #[inline(always)]
    pub fn con_num(&self) -> usize {
        self.con_num
    }

    #[inline]
    pub fn binary_num(&self) -> usize {
        self.binary_num
    }

    #[inline]
    pub fn general_integer_num(&self) -> usize {
        self.general_integer_num
    }

    #[inline]
    pub fn fixed_num(&self) -> usize {
        self.fixed_num
    }

    #[inline]
    pub fn real_num(&self) -> usize {
        self.real_num
    }

    /// Indices of binary variables, rebuilt by preprocessing.
    #[inline]
    pub fn binary_idx_list(&self) -> &[VarIndex] {
        &self.binary_idxs
    }

    /// Indices of non-fixed variables, rebuilt by preprocessing.
    #[inline]
    pub fn non_fixed_var_idxs(&self) -> &[VarIndex] {
        &self.non_fixed_idxs
    }

    /// Objective coefficient per variable (0 for variables without an
    /// objective term).
    #[inline]
    pub fn var_obj_cost(&self) -> &[f64] {
        &self.var_obj_cost
    }

    /// The objective term position of a variable, if it has one.
    #[inline(always)]
    pub fn var_to_obj_term(&self, var_idx: VarIndex) -> Option<usize> {
        match self.var_to_obj_term[var_idx.get()] {
            NO_OBJ_TERM => None,
            term => Some(term),
        }
    }

    /// Equality flag per row (row 0 is never an equality).
    #[inline]
    pub fn con_is_equality(&self) -> &[bool] {
        &self.con_is_equality
    }

    /// Runs the preprocessing pipeline. On error the model is infeasible
    /// and the search must be skipped.
    pub fn process_after_read(&mut self) -> Result<(), ModelError> {
        self.var_num = self.vars.len();
        let original_con_num = self.cons.len();
        tracing::info!(
            variables = self.var_num,
            constraints = original_con_num.saturating_sub(1),
            "original problem size"
        );
        if self.split_eq {
            self.convert_eq_to_ineq();
        }
        self.con_num = self.cons.len();
        for con_idx in 1..self.con_num {
            if self.cons[con_idx].is_greater() {
                self.cons[con_idx].convert_greater_to_less();
            }
        }
        if !self.normalized {
            if self.obj_offset == 0.0 {
                self.obj_offset = -self.cons[OBJECTIVE_CON.get()].rhs();
            }
            if self.sense == ObjSense::Maximize {
                let obj = &mut self.cons[OBJECTIVE_CON.get()];
                for term_idx in 0..obj.term_num() {
                    let coeff = obj.coeff(term_idx);
                    obj.set_coeff(term_idx, -coeff);
                }
                self.obj_offset = -self.obj_offset;
            }
            self.normalized = true;
        }
        self.calculate_vars()?;
        let strengthen = match self.bound_strengthen {
            BoundStrengthen::Off => false,
            BoundStrengthen::IntegerOnly => self.real_num == 0,
            BoundStrengthen::Always => true,
        };
        if strengthen {
            self.tighten_bounds()?;
            self.global_propagation()?;
            self.calculate_vars()?;
        }
        for con_idx in 1..self.con_num {
            let con = &mut self.cons[con_idx];
            if !con.is_inferred_sat() && con.term_num() == 0 && con.verify_empty_sat(self.tolerances.feas) {
                con.mark_inferred_sat();
                self.deleted_con_num += 1;
            }
            classify::classify_into(&mut self.cons[con_idx], &self.vars, &self.tolerances);
        }
        self.log_type_summary();
        self.var_to_obj_term = vec![NO_OBJ_TERM; self.var_num];
        self.var_obj_cost = vec![0.0; self.var_num];
        let obj = &self.cons[OBJECTIVE_CON.get()];
        for term_idx in 0..obj.term_num() {
            let var_idx = obj.var_idx(term_idx).get();
            self.var_obj_cost[var_idx] = obj.coeff(term_idx);
            self.var_to_obj_term[var_idx] = term_idx;
        }
        self.con_is_equality = vec![false; self.con_num];
        for con_idx in 1..self.con_num {
            self.con_is_equality[con_idx] = self.cons[con_idx].is_equality();
        }
        Ok(())
    }

    /// Splits every equality row into its `<=` half plus a negated sibling.
    fn convert_eq_to_ineq(&mut self) {
        let original_con_num = self.cons.len();
        let equality_count = self.cons[1..original_con_num]
            .iter()
            .filter(|con| con.is_equality())
            .count();
        if equality_count == 0 {
            return;
        }
        self.cons.reserve(equality_count);
        for con_idx in 1..original_con_num {
            if !self.cons[con_idx].is_equality() {
                continue;
            }
            self.cons[con_idx].convert_equality_to_less();
            self.append_negated_con(con_idx);
        }
        tracing::info!(
            count = equality_count,
            "converted equality constraints to inequality pairs"
        );
    }

    /// Appends `-lhs <= -rhs` as a sibling of the (already converted) row
    /// at `source_idx`, wiring up incidences on both sides.
    fn append_negated_con(&mut self, source_idx: usize) {
        let new_idx = ConIndex::new(self.cons.len());
        let new_name = self.duplicate_con_name(self.cons[source_idx].name());
        self.con_name_to_idx.insert(new_name.clone(), new_idx);
        self.cons
            .push(Constraint::new(new_name, new_idx, ConSense::LessEqual));
        let rhs = self.cons[source_idx].rhs();
        self.cons[new_idx.get()].set_rhs(-rhs);
        let term_num = self.cons[source_idx].term_num();
        for term_idx in 0..term_num {
            let var_idx = self.cons[source_idx].var_idx(term_idx);
            let coeff = -self.cons[source_idx].coeff(term_idx);
            let pos_in_con = self.cons[new_idx.get()].term_num();
            let var = &mut self.vars[var_idx.get()];
            var.add_con(new_idx, pos_in_con);
            let pos_in_var = var.term_num() - 1;
            self.cons[new_idx.get()].add_term(var_idx, coeff, pos_in_var);
        }
    }

    /// Synthesises a unique name for the negated sibling of `base`.
    fn duplicate_con_name(&self, base: &str) -> String {
        let mut candidate = format!("{}_neg", base);
        let mut counter = 1usize;
        while self.con_name_to_idx.contains_key(&candidate) {
            candidate = format!("{}_neg{}", base, counter);
            counter += 1;
        }
        candidate
    }

    /// Validates bounds and reclassifies every variable's kind; rebuilds
    /// the binary and non-fixed index lists and the kind counters.
    fn calculate_vars(&mut self) -> Result<(), ModelError> {
        self.general_integer_num = 0;
        self.binary_num = 0;
        self.fixed_num = 0;
        self.real_num = 0;
        self.binary_idxs.clear();
        self.non_fixed_idxs.clear();
        self.binary_idxs.reserve(self.var_num);
        self.non_fixed_idxs.reserve(self.var_num);
        let feas = self.tolerances.feas;
        for var_idx in 0..self.var_num {
            let var = &mut self.vars[var_idx];
            if var.lower_bound() > var.upper_bound() + feas {
                return Err(ModelError::InfeasibleVariableBounds {
                    name: var.name().to_owned(),
                    lower: var.lower_bound(),
                    upper: var.upper_bound(),
                });
            }
            if var.is_fixed(feas) {
                self.fixed_num += 1;
                var.set_kind(VarKind::Fixed);
            } else if var.is_binary(feas) {
                self.binary_num += 1;
                var.set_kind(VarKind::Binary);
                self.binary_idxs.push(VarIndex::new(var_idx));
            } else if var.kind() == VarKind::GeneralInteger {
                self.general_integer_num += 1;
            } else {
                var.set_kind(VarKind::Real);
                self.real_num += 1;
            }
            if !self.vars[var_idx].is_fixed(feas) {
                self.non_fixed_idxs.push(VarIndex::new(var_idx));
            }
        }
        tracing::info!(
            fixed = self.fixed_num,
            binary = self.binary_num,
            general_integer = self.general_integer_num,
            real = self.real_num,
            "variable kinds"
        );
        Ok(())
    }

    /// One pass of singleton tightening over all rows.
    fn tighten_bounds(&mut self) -> Result<(), ModelError> {
        for con_idx in 1..self.con_num {
            if self.cons[con_idx].term_num() == 1 {
                self.singleton_deduction(con_idx)?;
                self.cons[con_idx].mark_inferred_sat();
                self.deleted_con_num += 1;
            } else if self.cons[con_idx].term_num() == 0 {
                if self.cons[con_idx].verify_empty_sat(self.tolerances.feas) {
                    self.cons[con_idx].mark_inferred_sat();
                    self.deleted_con_num += 1;
                } else {
                    return Err(ModelError::InfeasibleEmptyConstraint {
                        name: self.cons[con_idx].name().to_owned(),
                        rhs: self.cons[con_idx].rhs(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Tightens the bounds of the single variable of row `con_idx`, or
    /// reports infeasibility. The row itself is marked inferred-satisfied
    /// by the caller.
    fn singleton_deduction(&mut self, con_idx: usize) -> Result<(), ModelError> {
        let feas = self.tolerances.feas;
        let (coeff, rhs, is_eq) = {
            let con = &self.cons[con_idx];
            (con.unique_coeff(), con.rhs(), con.is_equality())
        };
        if coeff.abs() <= self.tolerances.zero {
            let violated = if is_eq {
                rhs.abs() > feas
            } else {
                rhs + feas < 0.0
            };
            if violated {
                return Err(ModelError::InfeasibleSingleton {
                    name: self.cons[con_idx].name().to_owned(),
                    rhs,
                    coeff,
                });
            }
            return Ok(());
        }
        let var_idx = self.cons[con_idx].unique_var_idx();
        let var = &self.vars[var_idx.get()];
        if var.is_fixed(feas) {
            let fixed_value = var.fixed_value();
            let conflict = if is_eq {
                (rhs / coeff - fixed_value).abs() > feas
            } else {
                let new_bound = (rhs + feas) / coeff;
                (coeff > 0.0 && fixed_value > new_bound + feas)
                    || (coeff < 0.0 && fixed_value < new_bound - feas)
            };
            if conflict {
                return Err(ModelError::InfeasibleSingleton {
                    name: self.cons[con_idx].name().to_owned(),
                    rhs,
                    coeff,
                });
            }
            return Ok(());
        }
        if is_eq {
            let target = rhs / coeff;
            if target > var.upper_bound() + feas || target < var.lower_bound() - feas {
                return Err(ModelError::InfeasibleSingleton {
                    name: self.cons[con_idx].name().to_owned(),
                    rhs,
                    coeff,
                });
            }
            let var = &mut self.vars[var_idx.get()];
            if coeff > 0.0 {
                var.set_upper_bound((rhs + feas) / coeff);
                var.set_lower_bound((rhs - feas) / coeff);
            } else {
                var.set_upper_bound((rhs - feas) / coeff);
                var.set_lower_bound((rhs + feas) / coeff);
            }
        } else {
            let new_bound = (rhs + feas) / coeff;
            if (coeff > 0.0 && new_bound < var.lower_bound() - feas)
                || (coeff < 0.0 && new_bound > var.upper_bound() + feas)
            {
                return Err(ModelError::InfeasibleSingleton {
                    name: self.cons[con_idx].name().to_owned(),
                    rhs,
                    coeff,
                });
            }
            let var = &mut self.vars[var_idx.get()];
            if coeff > 0.0 && new_bound < var.upper_bound() {
                var.set_upper_bound(new_bound);
            } else if coeff < 0.0 && var.lower_bound() < new_bound {
                var.set_lower_bound(new_bound);
            }
        }
        Ok(())
    }

    /// Substitutes every fixed variable into its rows, propagating any
    /// singletons that emerge until the worklist drains.
    fn global_propagation(&mut self) -> Result<(), ModelError> {
        let feas = self.tolerances.feas;
        let mut queued = FixedBitSet::with_capacity(self.var_num);
        let mut worklist: Vec<VarIndex> = Vec::new();
        for var_idx in 0..self.var_num {
            if self.vars[var_idx].is_fixed(feas) {
                self.vars[var_idx].set_kind(VarKind::Fixed);
                queued.insert(var_idx);
                worklist.push(VarIndex::new(var_idx));
            }
        }
        while let Some(delete_idx) = worklist.pop() {
            self.deleted_var_num += 1;
            let delete_value = self.vars[delete_idx.get()].fixed_value();
            let term_num = self.vars[delete_idx.get()].term_num();
            for term_idx in 0..term_num {
                // Positions must be re-read every iteration: earlier
                // deletions may have moved this variable's terms.
                let con_idx = self.vars[delete_idx.get()].con_idx(term_idx);
                let pos_in_con = self.vars[delete_idx.get()].pos_in_con(term_idx);
                self.delete_term_at(con_idx, pos_in_con, delete_value);
                if con_idx == OBJECTIVE_CON {
                    continue;
                }
                let remaining = self.cons[con_idx.get()].term_num();
                if remaining == 1 {
                    self.singleton_deduction(con_idx.get())?;
                    self.cons[con_idx.get()].mark_inferred_sat();
                    self.deleted_con_num += 1;
                    let related_idx = self.cons[con_idx.get()].unique_var_idx();
                    let related = &mut self.vars[related_idx.get()];
                    if !queued.contains(related_idx.get()) && related.is_fixed(feas) {
                        related.set_kind(VarKind::Fixed);
                        queued.insert(related_idx.get());
                        worklist.push(related_idx);
                        self.inferred_var_num += 1;
                    }
                } else if remaining == 0 {
                    if self.cons[con_idx.get()].verify_empty_sat(feas) {
                        self.cons[con_idx.get()].mark_inferred_sat();
                        self.deleted_con_num += 1;
                    } else {
                        return Err(ModelError::InfeasibleEmptyConstraint {
                            name: self.cons[con_idx.get()].name().to_owned(),
                            rhs: self.cons[con_idx.get()].rhs(),
                        });
                    }
                }
            }
            self.vars[delete_idx.get()].clear_incidence();
        }
        tracing::debug!(
            deleted_cons = self.deleted_con_num,
            deleted_vars = self.deleted_var_num,
            inferred_vars = self.inferred_var_num,
            "fixed-variable propagation finished"
        );
        Ok(())
    }

    /// Deletes one term from a row, folding `coeff * substituted` into the
    /// row's rhs (or the objective offset for row 0) and repairing position
    /// symmetry for the term swapped into the hole.
    fn delete_term_at(&mut self, con_idx: ConIndex, term_idx: usize, substituted: f64) {
        let removed = self.cons[con_idx.get()].remove_term(term_idx);
        if let Some((moved_var, moved_pos)) = removed.moved_var {
            debug_assert!(
                self.vars[moved_var.get()].con_idx(moved_pos) == con_idx,
                "called `ModelStore::delete_term_at` with broken position symmetry on row {}",
                self.cons[con_idx.get()].name()
            );
            debug_assert!(
                self.vars[moved_var.get()].pos_in_con(moved_pos)
                    == self.cons[con_idx.get()].term_num(),
                "called `ModelStore::delete_term_at` with stale moved-term position on row {}",
                self.cons[con_idx.get()].name()
            );
            self.vars[moved_var.get()].set_pos_in_con(moved_pos, term_idx);
        }
        if con_idx == OBJECTIVE_CON {
            self.add_obj_offset(removed.coeff * substituted);
        } else {
            let con = &mut self.cons[con_idx.get()];
            let rhs = con.rhs();
            con.set_rhs(rhs - removed.coeff * substituted);
        }
    }

    fn log_type_summary(&self) {
        let mut parts: Vec<String> = Vec::new();
        for ty in ConType::ALL {
            let count = self.cons[1..self.con_num]
                .iter()
                .filter(|con| !con.is_inferred_sat() && con.has_type(ty))
                .count();
            if count > 0 {
                parts.push(format!("{}: {}", ty.label(), count));
            }
        }
        if !parts.is_empty() {
            tracing::debug!(summary = %parts.join(", "), "constraint types");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> ModelStore {
        ModelStore::new(Tolerances::default())
    }

    /// Checks position symmetry in both directions for every live entity.
    fn assert_position_symmetry(store: &ModelStore) {
        for con_idx in 0..store.con_num() {
            let con = store.con(ConIndex::new(con_idx));
            for k in 0..con.term_num() {
                let var = store.var(con.var_idx(k));
                let p = con.pos_in_var(k);
                assert_eq!(var.con_idx(p), ConIndex::new(con_idx));
                assert_eq!(var.pos_in_con(p), k);
            }
        }
        for var_idx in 0..store.var_num() {
            let var = store.var(VarIndex::new(var_idx));
            for t in 0..var.term_num() {
                let con = store.con(var.con_idx(t));
                let k = var.pos_in_con(t);
                assert_eq!(con.var_idx(k), VarIndex::new(var_idx));
                assert_eq!(con.pos_in_var(k), t);
            }
        }
    }

    #[test]
    fn test_make_variable_is_idempotent() {
        let mut store = store();
        let a = store.make_variable("x", false);
        let b = store.make_variable("x", true);
        assert_eq!(a, b);
        assert_eq!(store.vars.len(), 1);
        // The integral hint of the second call is ignored.
        assert!(store.var(a).is_real());
    }

    #[test]
    fn test_objective_row_exists_at_zero() {
        let mut store = store();
        assert_eq!(store.make_constraint("", ConSense::LessEqual), OBJECTIVE_CON);
        assert_eq!(store.objective().term_num(), 0);
    }

    #[test]
    fn test_equality_split_creates_negated_sibling() {
        let mut store = store();
        let x = store.make_variable("x", false);
        let y = store.make_variable("y", false);
        let c = store.make_constraint("bal", ConSense::Equal);
        store.add_term(c, x, 2.0);
        store.add_term(c, y, -1.0);
        store.con_mut(c).set_rhs(3.0);
        store.process_after_read().unwrap();

        assert_eq!(store.con_num(), 3);
        let orig = store.con(ConIndex::new(1));
        let twin = store.con(ConIndex::new(2));
        assert!(!orig.is_equality());
        assert!(!twin.is_equality());
        assert_eq!(twin.rhs(), -3.0);
        assert_eq!(twin.coeff(0), -orig.coeff(0));
        assert_eq!(twin.coeff(1), -orig.coeff(1));
        assert_position_symmetry(&store);
    }

    #[test]
    fn test_split_disabled_keeps_equality() {
        let mut store = store();
        store.set_split_eq(false);
        let x = store.make_variable("x", false);
        let y = store.make_variable("y", false);
        let c = store.make_constraint("bal", ConSense::Equal);
        store.add_term(c, x, 1.0);
        store.add_term(c, y, 1.0);
        store.con_mut(c).set_rhs(1.0);
        store.process_after_read().unwrap();
        assert_eq!(store.con_num(), 2);
        assert!(store.con(ConIndex::new(1)).is_equality());
        assert!(store.con_is_equality()[1]);
    }

    #[test]
    fn test_greater_rows_are_negated() {
        let mut store = store();
        let x = store.make_variable("x", false);
        let c = store.make_constraint("low", ConSense::GreaterEqual);
        store.add_term(c, x, 2.0);
        store.con_mut(c).set_rhs(4.0);
        store.set_bound_strengthen(BoundStrengthen::Off);
        store.process_after_read().unwrap();
        let con = store.con(ConIndex::new(1));
        assert!(!con.is_greater());
        assert_eq!(con.coeff(0), -2.0);
        assert_eq!(con.rhs(), -4.0);
    }

    #[test]
    fn test_maximize_negates_objective_once() {
        let mut store = store();
        let x = store.make_variable("x", false);
        store.add_term(OBJECTIVE_CON, x, 2.0);
        store.set_sense(ObjSense::Maximize);
        store.process_after_read().unwrap();
        assert_eq!(store.objective().coeff(0), -2.0);
        assert_eq!(store.var_obj_cost()[0], -2.0);
        // Idempotent: a second pass must not negate again.
        store.process_after_read().unwrap();
        assert_eq!(store.objective().coeff(0), -2.0);
    }

    #[test]
    fn test_objective_rhs_becomes_negated_offset() {
        let mut store = store();
        let x = store.make_variable("x", false);
        store.add_term(OBJECTIVE_CON, x, 1.0);
        store.cons[0].set_rhs(5.0);
        store.process_after_read().unwrap();
        assert_eq!(store.obj_offset(), -5.0);
    }

    #[test]
    fn test_infeasible_singleton_detected() {
        // x = 5 with x in [0, 1]: scenario 2 of the acceptance suite.
        let mut store = store();
        store.set_split_eq(false);
        let x = store.make_variable("x", false);
        store.var_mut(x).set_upper_bound(1.0);
        let c = store.make_constraint("pin", ConSense::Equal);
        store.add_term(c, x, 1.0);
        store.con_mut(c).set_rhs(5.0);
        store.set_bound_strengthen(BoundStrengthen::Always);
        let err = store.process_after_read().unwrap_err();
        assert!(matches!(err, ModelError::InfeasibleSingleton { .. }));
    }

    #[test]
    fn test_singleton_tightens_integer_upper_bound() {
        let mut store = store();
        let x = store.make_variable("x", false);
        store.var_mut(x).set_kind(VarKind::GeneralInteger);
        store.var_mut(x).set_upper_bound(100.0);
        let c = store.make_constraint("cap", ConSense::LessEqual);
        store.add_term(c, x, 2.0);
        store.con_mut(c).set_rhs(7.0);
        store.set_bound_strengthen(BoundStrengthen::Always);
        store.process_after_read().unwrap();
        // 2x <= 7 tightens x to floor(3.5) = 3 for an integer variable.
        assert_eq!(store.var(x).upper_bound(), 3.0);
        assert!(store.con(c).is_inferred_sat());
    }

    #[test]
    fn test_fixed_variable_folds_into_rhs_and_offset() {
        let mut store = store();
        store.set_split_eq(false);
        let x = store.make_variable("x", false);
        let y = store.make_variable("y", false);
        store.var_mut(y).set_upper_bound(10.0);
        // x fixed at 2.
        store.var_mut(x).set_lower_bound(2.0);
        store.var_mut(x).set_upper_bound(2.0);
        store.add_term(OBJECTIVE_CON, x, 3.0);
        store.add_term(OBJECTIVE_CON, y, 1.0);
        let c = store.make_constraint("sum", ConSense::LessEqual);
        store.add_term(c, x, 1.0);
        store.add_term(c, y, 1.0);
        store.con_mut(c).set_rhs(8.0);
        store.set_bound_strengthen(BoundStrengthen::Always);
        store.process_after_read().unwrap();

        // Objective: 3 * 2 folded into the offset.
        assert_eq!(store.obj_offset(), 6.0);
        // Row: rhs 8 - 1 * 2 = 6, and the row became a singleton on y
        // which tightened y's upper bound.
        let con = store.con(c);
        assert!(con.is_inferred_sat());
        assert!(store.var(y).upper_bound() <= 6.0 + 1e-5);
        assert!(!store.non_fixed_var_idxs().contains(&x));
        assert_position_symmetry(&store);
    }

    #[test]
    fn test_propagation_infeasible_empty_row() {
        let mut store = store();
        store.set_split_eq(false);
        let x = store.make_variable("x", false);
        store.var_mut(x).set_lower_bound(1.0);
        store.var_mut(x).set_upper_bound(1.0);
        let c = store.make_constraint("bad", ConSense::LessEqual);
        store.add_term(c, x, 1.0);
        // x = 1 forced, but row requires x <= 0.
        store.con_mut(c).set_rhs(0.0);
        store.set_bound_strengthen(BoundStrengthen::Always);
        let err = store.process_after_read().unwrap_err();
        assert!(matches!(
            err,
            ModelError::InfeasibleSingleton { .. } | ModelError::InfeasibleEmptyConstraint { .. }
        ));
    }

    #[test]
    fn test_infeasible_variable_bounds() {
        let mut store = store();
        let x = store.make_variable("x", false);
        store.var_mut(x).set_lower_bound(3.0);
        store.var_mut(x).set_upper_bound(1.0);
        let err = store.process_after_read().unwrap_err();
        assert!(matches!(err, ModelError::InfeasibleVariableBounds { .. }));
    }

    #[test]
    fn test_preprocessing_is_idempotent_after_elimination() {
        let mut store = store();
        let x = store.make_variable("x", false);
        let y = store.make_variable("y", true);
        store.var_mut(x).set_upper_bound(4.0);
        store.add_term(OBJECTIVE_CON, x, 1.0);
        let c = store.make_constraint("mix", ConSense::Equal);
        store.add_term(c, x, 1.0);
        store.add_term(c, y, 2.0);
        store.con_mut(c).set_rhs(2.0);
        store.process_after_read().unwrap();

        let cons_after: Vec<(f64, Vec<f64>)> = (0..store.con_num())
            .map(|i| {
                let con = store.con(ConIndex::new(i));
                (con.rhs(), con.coeff_set().to_vec())
            })
            .collect();
        let offset_after = store.obj_offset();

        store.process_after_read().unwrap();
        for (i, (rhs, coeffs)) in cons_after.iter().enumerate() {
            let con = store.con(ConIndex::new(i));
            assert_eq!(con.rhs(), *rhs);
            assert_eq!(con.coeff_set(), &coeffs[..]);
        }
        assert_eq!(store.obj_offset(), offset_after);
    }

    #[test]
    fn test_caches_built_for_engine() {
        let mut store = store();
        let x = store.make_variable("x", true);
        let y = store.make_variable("y", false);
        store.var_mut(y).set_upper_bound(3.0);
        store.add_term(OBJECTIVE_CON, y, 4.0);
        let c = store.make_constraint("r", ConSense::LessEqual);
        store.add_term(c, x, 1.0);
        store.add_term(c, y, 1.0);
        store.con_mut(c).set_rhs(2.0);
        store.process_after_read().unwrap();

        assert_eq!(store.binary_idx_list(), &[x]);
        assert_eq!(store.non_fixed_var_idxs().len(), 2);
        assert_eq!(store.var_obj_cost()[y.get()], 4.0);
        assert_eq!(store.var_obj_cost()[x.get()], 0.0);
        assert_eq!(store.var_to_obj_term(y), Some(0));
        assert_eq!(store.var_to_obj_term(x), None);
    }
}
