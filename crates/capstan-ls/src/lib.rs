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

//! # Capstan LS
//!
//! The stochastic local-search engine. A single incumbent assignment walks
//! through coordinate moves: in the infeasible phase, bounded samples of
//! violated rows propose "tight" deltas that would exactly satisfy a row;
//! once feasible, lift moves walk variables along the objective inside the
//! feasible region and "breakthrough" moves chase the moving improvement
//! threshold on the objective row. Dynamic row weights (PAWS-style),
//! two-threshold tabu bookkeeping, and anchored restarts keep the walk from
//! stalling.
//!
//! ## Modules
//!
//! - `state`: incumbent values, incremental activities, the sat/unsat
//!   partition and tabu bookkeeping.
//! - `scoring`: lift and neighbor move scoring with pluggable rules.
//! - `neighbor`: the five candidate generators and bounded sampling.
//! - `lift`: feasible-phase objective descent.
//! - `weight` / `restart` / `start`: strategy objects.
//! - `engine`: the driver loop.
//! - `result`: outcome and statistics types.

pub mod engine;
pub mod lift;
pub mod neighbor;
pub mod restart;
pub mod result;
pub mod scoring;
pub mod start;
pub mod state;
pub mod weight;
