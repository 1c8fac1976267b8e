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

//! Programmatic model construction.
//!
//! `ModelBuilder` is the embedding surface: callers declare variables with
//! bounds, costs and kinds, then rows as `lb <= expr <= ub` ranges. The
//! builder maps ranges onto the store's senses when `build` is called:
//! equal finite bounds become an `=` row, a finite upper bound a `<=` row,
//! a finite lower bound a `>=` row (which preprocessing later negates), and
//! a two-sided range produces both rows.
//!
//! The builder validates eagerly and returns errors instead of printing;
//! nothing is written into a `ModelStore` until `build`.

use crate::constraint::ConSense;
use crate::index::OBJECTIVE_CON;
use crate::store::{ModelStore, ObjSense};
use crate::variable::VarKind;
use capstan_core::num::{Tolerances, INF, NEG_INF};
use std::collections::HashMap;

/// The error type for model building.
#[derive(Debug, Clone, PartialEq)]
pub enum BuildError {
    /// Variable names must be unique and non-empty.
    InvalidVariableName { name: String },
    /// A variable's lower bound exceeds its upper bound.
    InvalidVariableBounds { name: String, lower: f64, upper: f64 },
    /// An index does not refer to a declared variable or constraint.
    UnknownIndex { index: usize },
    /// A constraint range with `lb > ub`.
    InvalidConstraintRange { lower: f64, upper: f64 },
    /// A constraint without any terms.
    EmptyConstraint { index: usize },
    /// Term and coefficient lists of different lengths.
    MismatchedTerms,
}

impl std::fmt::Display for BuildError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BuildError::InvalidVariableName { name } => {
                write!(f, "invalid or duplicate variable name '{}'", name)
            }
            BuildError::InvalidVariableBounds { name, lower, upper } => {
                write!(f, "variable '{}' has lower bound {} > upper bound {}", name, lower, upper)
            }
            BuildError::UnknownIndex { index } => write!(f, "unknown index {}", index),
            BuildError::InvalidConstraintRange { lower, upper } => {
                write!(f, "constraint range lower bound {} > upper bound {}", lower, upper)
            }
            BuildError::EmptyConstraint { index } => {
                write!(f, "constraint {} has no terms", index)
            }
            BuildError::MismatchedTerms => {
                write!(f, "variable and coefficient lists have different lengths")
            }
        }
    }
}

impl std::error::Error for BuildError {}

#[derive(Debug, Clone)]
struct VarData {
    name: String,
    lower: f64,
    upper: f64,
    cost: f64,
    kind: VarKind,
}

#[derive(Debug, Clone)]
struct ConData {
    lower: f64,
    upper: f64,
    var_idxs: Vec<usize>,
    coeffs: Vec<f64>,
}

/// Staged model description, converted into a [`ModelStore`] by
/// [`ModelBuilder::build`].
#[derive(Debug, Clone, Default)]
pub struct ModelBuilder {
    sense: ObjSense,
    obj_offset: f64,
    vars: Vec<VarData>,
    cons: Vec<ConData>,
    name_to_idx: HashMap<String, usize>,
}

impl ModelBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn set_sense(&mut self, sense: ObjSense) {
        self.sense = sense;
    }

    #[inline]
    pub fn set_objective_offset(&mut self, offset: f64) {
        self.obj_offset = offset;
    }

    /// Declares a variable and returns its builder index.
    pub fn add_variable(
        &mut self,
        name: &str,
        lower: f64,
        upper: f64,
        cost: f64,
        kind: VarKind,
    ) -> Result<usize, BuildError> {
        if name.is_empty() || self.name_to_idx.contains_key(name) {
            return Err(BuildError::InvalidVariableName {
                name: name.to_owned(),
            });
        }
        if lower > upper {
            return Err(BuildError::InvalidVariableBounds {
                name: name.to_owned(),
                lower,
                upper,
            });
        }
        let idx = self.vars.len();
        self.name_to_idx.insert(name.to_owned(), idx);
        self.vars.push(VarData {
            name: name.to_owned(),
            lower,
            upper,
            cost,
            kind,
        });
        Ok(idx)
    }

    /// Overwrites the objective cost of a declared variable.
    pub fn set_cost(&mut self, var: usize, cost: f64) -> Result<(), BuildError> {
        let data = self
            .vars
            .get_mut(var)
            .ok_or(BuildError::UnknownIndex { index: var })?;
        data.cost = cost;
        Ok(())
    }

    /// Overwrites the kind of a declared variable.
    pub fn set_integrality(&mut self, var: usize, kind: VarKind) -> Result<(), BuildError> {
        let data = self
            .vars
            .get_mut(var)
            .ok_or(BuildError::UnknownIndex { index: var })?;
        data.kind = kind;
        Ok(())
    }

    /// Looks up a declared variable by name.
    pub fn variable_index(&self, name: &str) -> Option<usize> {
        self.name_to_idx.get(name).copied()
    }

    /// Declares the row `lower <= sum coeffs[i] * vars[i] <= upper` and
    /// returns its builder index. Use [`capstan_core::num::INF`] /
    /// [`capstan_core::num::NEG_INF`] for one-sided rows.
    pub fn add_constraint(
        &mut self,
        lower: f64,
        upper: f64,
        terms: &[(usize, f64)],
    ) -> Result<usize, BuildError> {
        if lower > upper + Tolerances::default().feas {
            return Err(BuildError::InvalidConstraintRange { lower, upper });
        }
        for &(var, _) in terms {
            if var >= self.vars.len() {
                return Err(BuildError::UnknownIndex { index: var });
            }
        }
        let idx = self.cons.len();
        self.cons.push(ConData {
            lower,
            upper,
            var_idxs: terms.iter().map(|&(v, _)| v).collect(),
            coeffs: terms.iter().map(|&(_, c)| c).collect(),
        });
        Ok(idx)
    }

    /// Appends a term to an already-declared row.
    pub fn add_term_to_constraint(
        &mut self,
        row: usize,
        var: usize,
        coeff: f64,
    ) -> Result<(), BuildError> {
        if var >= self.vars.len() {
            return Err(BuildError::UnknownIndex { index: var });
        }
        let con = self
            .cons
            .get_mut(row)
            .ok_or(BuildError::UnknownIndex { index: row })?;
        con.var_idxs.push(var);
        con.coeffs.push(coeff);
        Ok(())
    }

    /// Converts the staged description into a populated (but not yet
    /// preprocessed) model store. Call `process_after_read` on the result
    /// before searching.
    pub fn build(self, tolerances: Tolerances) -> Result<ModelStore, BuildError> {
        let mut store = ModelStore::new(tolerances);
        store.set_sense(self.sense);
        if self.obj_offset != 0.0 {
            store.add_obj_offset(self.obj_offset);
        }
        store.set_obj_name("obj");
        let mut mapped = Vec::with_capacity(self.vars.len());
        for data in &self.vars {
            let integral = matches!(data.kind, VarKind::Binary | VarKind::GeneralInteger);
            let idx = store.make_variable(&data.name, integral);
            {
                let var = store.var_mut(idx);
                var.set_lower_bound(data.lower);
                var.set_upper_bound(data.upper);
                var.set_kind(data.kind);
            }
            if data.cost.abs() > tolerances.zero {
                store.add_term(OBJECTIVE_CON, idx, data.cost);
            }
            mapped.push(idx);
        }
        for (row, data) in self.cons.iter().enumerate() {
            if data.var_idxs.is_empty() {
                return Err(BuildError::EmptyConstraint { index: row });
            }
            let base_name = format!("__api_c{}", row);
            let lb_inf = data.lower <= NEG_INF;
            let ub_inf = data.upper >= INF;
            let equal = !lb_inf && !ub_inf && (data.lower - data.upper).abs() < tolerances.feas;
            if equal {
                let con_idx = store.make_constraint(&base_name, ConSense::Equal);
                store.con_mut(con_idx).set_rhs(data.upper);
                for (&var, &coeff) in data.var_idxs.iter().zip(data.coeffs.iter()) {
                    store.add_term(con_idx, mapped[var], coeff);
                }
                continue;
            }
            if lb_inf && ub_inf {
                tracing::warn!(row, "constraint has both bounds infinite, skipping");
                continue;
            }
            if !ub_inf {
                let name = format!("{}_ub", base_name);
                let con_idx = store.make_constraint(&name, ConSense::LessEqual);
                store.con_mut(con_idx).set_rhs(data.upper);
                for (&var, &coeff) in data.var_idxs.iter().zip(data.coeffs.iter()) {
                    store.add_term(con_idx, mapped[var], coeff);
                }
            }
            if !lb_inf {
                let name = format!("{}_lb", base_name);
                let con_idx = store.make_constraint(&name, ConSense::GreaterEqual);
                store.con_mut(con_idx).set_rhs(data.lower);
                for (&var, &coeff) in data.var_idxs.iter().zip(data.coeffs.iter()) {
                    store.add_term(con_idx, mapped[var], coeff);
                }
            }
        }
        Ok(store)
    }
}
