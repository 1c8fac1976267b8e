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

//! Structural classification of constraint rows.
//!
//! Rows are tagged with zero or more MIPLIB-style structural types after
//! preprocessing. The tags are purely informational: the search engine
//! never branches on them, and the only behavioural output of this stage is
//! the `inferred_sat` flag set elsewhere in the pipeline. They exist for
//! model diagnostics and for downstream tooling that wants to know what
//! kind of instance it is looking at.

use crate::constraint::Constraint;
use crate::variable::Variable;
use capstan_core::num::{INF, Tolerances};

/// MIPLIB-style structural row types. A row can carry several tags: every
/// set-packing row is also an invariant knapsack, for instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConType {
    /// No variables.
    Empty,
    /// No finite side.
    Free,
    /// Single variable.
    Singleton,
    /// `ax + by = c`.
    Aggregation,
    /// `ax - ay <= b` with matching variable types.
    Precedence,
    /// `ax + by <= c` with a binary participant.
    VarBound,
    /// `sum x_i = 1`, binary.
    SetPartitioning,
    /// `sum x_i <= 1`, binary.
    SetPacking,
    /// `sum -x_i <= -1`, binary (normalised covering row).
    SetCovering,
    /// `sum x_i = k`, binary, integral k >= 2.
    Cardinality,
    /// `sum x_i <= b`, binary, integral b >= 2.
    InvariantKnapsack,
    /// `sum a_i x_i = b`, binary, integral b >= 2.
    EquationKnapsack,
    /// Knapsack with a coefficient equal to the capacity.
    BinPacking,
    /// `sum a_i x_i <= b`, binary, integral b >= 2.
    Knapsack,
    /// Integral row with a general-integer participant.
    IntegerKnapsack,
    /// Binary and real participants, no general integers.
    MixedBinary,
    /// Any remaining equality.
    GeneralEquality,
    /// Any remaining inequality.
    GeneralInequality,
}

impl ConType {
    /// Short label used in the classification summary.
    pub fn label(&self) -> &'static str {
        match self {
            ConType::Empty => "Empty",
            ConType::Free => "Free",
            ConType::Singleton => "Sing.",
            ConType::Aggregation => "Agg.",
            ConType::Precedence => "Precedence",
            ConType::VarBound => "Var. Bound",
            ConType::SetPartitioning => "Set Part.",
            ConType::SetPacking => "Set Pack.",
            ConType::SetCovering => "Set Cover.",
            ConType::Cardinality => "Cardinality",
            ConType::InvariantKnapsack => "Inv. Knaps.",
            ConType::EquationKnapsack => "Eq. Knaps.",
            ConType::BinPacking => "Bin. Pack.",
            ConType::Knapsack => "Knaps.",
            ConType::IntegerKnapsack => "Int. Knaps.",
            ConType::MixedBinary => "Mixed Bin.",
            ConType::GeneralEquality => "Eq.",
            ConType::GeneralInequality => "Ineq.",
        }
    }

    /// All types in summary display order.
    pub const ALL: [ConType; 18] = [
        ConType::Empty,
        ConType::Free,
        ConType::Singleton,
        ConType::Aggregation,
        ConType::Precedence,
        ConType::VarBound,
        ConType::SetPartitioning,
        ConType::SetPacking,
        ConType::SetCovering,
        ConType::Cardinality,
        ConType::InvariantKnapsack,
        ConType::EquationKnapsack,
        ConType::BinPacking,
        ConType::Knapsack,
        ConType::IntegerKnapsack,
        ConType::MixedBinary,
        ConType::GeneralEquality,
        ConType::GeneralInequality,
    ];
}

impl std::fmt::Display for ConType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Aggregate variable-type facts about a row's participants.
struct VarTypeFlags {
    all_binary: bool,
    all_integral: bool,
    has_binary: bool,
    has_real: bool,
    has_general_integer: bool,
}

fn analyze_var_types(con: &Constraint, vars: &[Variable], feas_tol: f64) -> VarTypeFlags {
    let mut flags = VarTypeFlags {
        all_binary: true,
        all_integral: true,
        has_binary: false,
        has_real: false,
        has_general_integer: false,
    };
    if con.term_num() == 0 {
        flags.all_binary = false;
        flags.all_integral = false;
        return flags;
    }
    for &var_idx in con.var_idx_set() {
        let var = &vars[var_idx.get()];
        let is_bin = var.is_binary(feas_tol);
        let is_real = var.is_real();
        let is_int = var.is_general_integer();
        flags.all_binary &= is_bin;
        flags.all_integral &= !is_real;
        flags.has_binary |= is_bin;
        flags.has_real |= is_real;
        flags.has_general_integer |= !is_bin && is_int;
    }
    flags
}

/// Tags `con` with every structural type that matches.
pub(crate) fn classify_into(con: &mut Constraint, vars: &[Variable], tol: &Tolerances) {
    let term_count = con.term_num();
    let rhs = con.rhs();
    let is_eq = con.is_equality();
    let is_leq = !is_eq;

    let is_integral_value = |value: f64| (value - value.round()).abs() <= tol.zero;
    let all_unit = term_count > 0
        && con
            .coeff_set()
            .iter()
            .all(|&c| (c - 1.0).abs() <= tol.zero);
    let all_neg_unit = term_count > 0
        && con
            .coeff_set()
            .iter()
            .all(|&c| (c + 1.0).abs() <= tol.zero);
    let has_coeff_equal_rhs = con
        .coeff_set()
        .iter()
        .any(|&c| (c - rhs).abs() <= tol.zero);

    let flags = analyze_var_types(con, vars, tol.feas);

    if term_count == 0 {
        con.add_type(ConType::Empty);
    }
    if is_leq && rhs >= INF {
        con.add_type(ConType::Free);
    }
    if term_count == 1 {
        con.add_type(ConType::Singleton);
    }
    if is_eq
        && term_count == 2
        && con.coeff(0).abs() > tol.zero
        && con.coeff(1).abs() > tol.zero
    {
        con.add_type(ConType::Aggregation);
    }
    if is_leq && term_count == 2 {
        let a = con.coeff(0);
        let b = con.coeff(1);
        let scale = a.abs().max(b.abs());
        let var_a = &vars[con.var_idx(0).get()];
        let var_b = &vars[con.var_idx(1).get()];
        if scale > tol.zero
            && (a.abs() - b.abs()).abs() <= tol.zero
            && a * b < 0.0
            && var_a.kind() == var_b.kind()
        {
            con.add_type(ConType::Precedence);
        }
    }
    if is_leq && term_count == 2 && flags.has_binary {
        con.add_type(ConType::VarBound);
    }
    if term_count > 0 && flags.all_binary {
        if all_unit && (rhs - 1.0).abs() <= tol.zero {
            con.add_type(if is_eq {
                ConType::SetPartitioning
            } else {
                ConType::SetPacking
            });
        }
        if is_leq && all_neg_unit && (rhs + 1.0).abs() <= tol.zero {
            con.add_type(ConType::SetCovering);
        }
        if all_unit && is_integral_value(rhs) && rhs >= 2.0 - tol.zero {
            con.add_type(if is_eq {
                ConType::Cardinality
            } else {
                ConType::InvariantKnapsack
            });
        }
        if is_integral_value(rhs) && rhs >= 2.0 - tol.zero {
            if is_eq {
                con.add_type(ConType::EquationKnapsack);
            } else {
                if has_coeff_equal_rhs {
                    con.add_type(ConType::BinPacking);
                }
                con.add_type(ConType::Knapsack);
            }
        }
    }
    if is_leq
        && term_count > 0
        && flags.all_integral
        && flags.has_general_integer
        && is_integral_value(rhs)
    {
        con.add_type(ConType::IntegerKnapsack);
    }
    if term_count > 0 && flags.has_binary && flags.has_real && !flags.has_general_integer {
        con.add_type(ConType::MixedBinary);
    }
    con.add_type(if is_eq {
        ConType::GeneralEquality
    } else {
        ConType::GeneralInequality
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::ConSense;
    use crate::index::{ConIndex, VarIndex};

    fn binary_var(idx: usize) -> Variable {
        Variable::new(format!("x{}", idx), VarIndex::new(idx), true)
    }

    fn tagged(con: &mut Constraint, vars: &[Variable]) -> Vec<ConType> {
        classify_into(con, vars, &Tolerances::default());
        con.types().to_vec()
    }

    #[test]
    fn test_set_partitioning_row() {
        let vars = vec![binary_var(0), binary_var(1), binary_var(2)];
        let mut con = Constraint::new("part", ConIndex::new(1), ConSense::Equal);
        for (i, _) in vars.iter().enumerate() {
            con.add_term(VarIndex::new(i), 1.0, 0);
        }
        con.set_rhs(1.0);
        let types = tagged(&mut con, &vars);
        assert!(types.contains(&ConType::SetPartitioning));
        assert!(types.contains(&ConType::GeneralEquality));
        assert!(!types.contains(&ConType::SetPacking));
    }

    #[test]
    fn test_knapsack_row() {
        let vars = vec![binary_var(0), binary_var(1)];
        let mut con = Constraint::new("knap", ConIndex::new(1), ConSense::LessEqual);
        con.add_term(VarIndex::new(0), 3.0, 0);
        con.add_term(VarIndex::new(1), 5.0, 0);
        con.set_rhs(5.0);
        let types = tagged(&mut con, &vars);
        assert!(types.contains(&ConType::Knapsack));
        // Capacity matches a coefficient.
        assert!(types.contains(&ConType::BinPacking));
        assert!(types.contains(&ConType::VarBound));
    }

    #[test]
    fn test_precedence_row() {
        let mut a = Variable::new("a", VarIndex::new(0), false);
        let mut b = Variable::new("b", VarIndex::new(1), false);
        a.set_upper_bound(10.0);
        b.set_upper_bound(10.0);
        let vars = vec![a, b];
        let mut con = Constraint::new("prec", ConIndex::new(1), ConSense::LessEqual);
        con.add_term(VarIndex::new(0), 2.0, 0);
        con.add_term(VarIndex::new(1), -2.0, 0);
        con.set_rhs(1.0);
        let types = tagged(&mut con, &vars);
        assert!(types.contains(&ConType::Precedence));
    }

    #[test]
    fn test_empty_and_singleton_rows() {
        let vars = vec![binary_var(0)];
        let mut empty = Constraint::new("e", ConIndex::new(1), ConSense::LessEqual);
        let types = tagged(&mut empty, &vars);
        assert!(types.contains(&ConType::Empty));

        let mut single = Constraint::new("s", ConIndex::new(2), ConSense::LessEqual);
        single.add_term(VarIndex::new(0), 1.0, 0);
        single.set_rhs(1.0);
        let types = tagged(&mut single, &vars);
        assert!(types.contains(&ConType::Singleton));
        assert!(types.contains(&ConType::SetPacking));
    }

    #[test]
    fn test_mixed_binary_row() {
        let mut real = Variable::new("r", VarIndex::new(1), false);
        real.set_upper_bound(100.0);
        let vars = vec![binary_var(0), real];
        let mut con = Constraint::new("mix", ConIndex::new(1), ConSense::LessEqual);
        con.add_term(VarIndex::new(0), 4.0, 0);
        con.add_term(VarIndex::new(1), 1.5, 0);
        con.set_rhs(8.0);
        let types = tagged(&mut con, &vars);
        assert!(types.contains(&ConType::MixedBinary));
        assert!(!types.contains(&ConType::IntegerKnapsack));
    }
}
