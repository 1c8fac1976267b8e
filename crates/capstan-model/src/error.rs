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

//! Preprocessing failure reporting.
//!
//! Every variant means the same thing for the caller: the model is
//! infeasible before any search has run, and the solve must be skipped with
//! a non-zero exit. The variants carry enough context to point the user at
//! the offending entity.

/// The error type for model preprocessing.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelError {
    /// A variable's lower bound exceeds its upper bound beyond tolerance.
    InfeasibleVariableBounds {
        name: String,
        lower: f64,
        upper: f64,
    },
    /// A singleton row forces a variable outside its bounds, or pins a
    /// fixed variable to a different value.
    InfeasibleSingleton {
        name: String,
        rhs: f64,
        coeff: f64,
    },
    /// A row with no terms left has a right-hand side the empty sum cannot
    /// satisfy.
    InfeasibleEmptyConstraint { name: String, rhs: f64 },
}

impl std::fmt::Display for ModelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelError::InfeasibleVariableBounds { name, lower, upper } => write!(
                f,
                "infeasible variable bound: {} LB: {} UB: {}",
                name, lower, upper
            ),
            ModelError::InfeasibleSingleton { name, rhs, coeff } => write!(
                f,
                "infeasible singleton constraint {} (rhs: {}, coeff: {})",
                name, rhs, coeff
            ),
            ModelError::InfeasibleEmptyConstraint { name, rhs } => write!(
                f,
                "infeasible empty constraint {} (rhs: {})",
                name, rhs
            ),
        }
    }
}

impl std::error::Error for ModelError {}
