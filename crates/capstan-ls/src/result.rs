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

//! Search outcome and run statistics.
//!
//! The outcome is the single transport object handed to callers: the
//! termination status, the best assignment (in preprocessed variable
//! order), the best objective in the user's sense, whether the final
//! verification pass succeeded, and aggregate statistics.

use std::time::Duration;

/// Aggregate counters for one search run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchStatistics {
    /// Total search steps (moves plus no-op steps).
    pub steps: u64,
    /// Committed lift moves.
    pub lift_moves: u64,
    /// Restarts fired.
    pub restarts: u64,
    /// Best-solution captures.
    pub captures: u64,
    /// Wall-clock time of the run.
    pub total_time: Duration,
}

impl SearchStatistics {
    #[inline]
    pub fn on_step(&mut self) {
        self.steps += 1;
    }

    #[inline]
    pub fn on_lift_move(&mut self) {
        self.lift_moves += 1;
    }

    #[inline]
    pub fn on_restart(&mut self) {
        self.restarts += 1;
    }

    #[inline]
    pub fn on_capture(&mut self) {
        self.captures += 1;
    }

    #[inline]
    pub fn set_total_time(&mut self, total_time: Duration) {
        self.total_time = total_time;
    }
}

/// How the run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeStatus {
    /// A feasible assignment was found; `best_objective` is meaningful.
    Feasible,
    /// The budget elapsed without reaching feasibility.
    NoFeasibleFound,
    /// The objective is unbounded (objective-only models).
    Unbounded,
}

impl std::fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutcomeStatus::Feasible => write!(f, "feasible"),
            OutcomeStatus::NoFeasibleFound => write!(f, "no feasible solution found"),
            OutcomeStatus::Unbounded => write!(f, "unbounded"),
        }
    }
}

/// Result of a finished search.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    status: OutcomeStatus,
    /// Best objective in the user's sense (offset applied, maximisation
    /// un-negated). `NaN` when no feasible solution exists.
    best_objective: f64,
    best_values: Vec<f64>,
    verified: bool,
    min_unsat: usize,
    statistics: SearchStatistics,
}

impl SearchOutcome {
    pub(crate) fn new(
        status: OutcomeStatus,
        best_objective: f64,
        best_values: Vec<f64>,
        verified: bool,
        min_unsat: usize,
        statistics: SearchStatistics,
    ) -> Self {
        Self {
            status,
            best_objective,
            best_values,
            verified,
            min_unsat,
            statistics,
        }
    }

    #[inline]
    pub fn status(&self) -> OutcomeStatus {
        self.status
    }

    #[inline]
    pub fn is_feasible(&self) -> bool {
        self.status == OutcomeStatus::Feasible
    }

    /// Best objective in the user's sense.
    #[inline]
    pub fn best_objective(&self) -> f64 {
        self.best_objective
    }

    /// Best assignment, indexed like the model's variables.
    #[inline]
    pub fn best_values(&self) -> &[f64] {
        &self.best_values
    }

    /// Whether the final verification pass confirmed the best assignment.
    #[inline]
    pub fn verified(&self) -> bool {
        self.verified
    }

    /// Smallest number of simultaneously violated rows seen; a progress
    /// indicator when no feasible solution was found.
    #[inline]
    pub fn min_unsat(&self) -> usize {
        self.min_unsat
    }

    #[inline]
    pub fn statistics(&self) -> &SearchStatistics {
        &self.statistics
    }
}
