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

//! # Capstan Model
//!
//! The immutable-after-preprocessing model layer of the Capstan solver:
//! variables, constraints, the dual-indexed incidence structure between
//! them, and the normalisation pipeline that every model passes through
//! exactly once before search.
//!
//! ## Modules
//!
//! - `index`: typed indices for variables and constraints.
//! - `variable` / `constraint`: the two entities and their term-level
//!   operations (including O(1) term deletion with symmetry repair).
//! - `store`: the `ModelStore` owning both entity lists, the name maps, and
//!   the preprocessing pipeline (`process_after_read`).
//! - `classify`: informational MIPLIB-style structural tagging.
//! - `builder`: programmatic model construction for embedding and tests.
//! - `error`: preprocessing infeasibility reporting.

pub mod builder;
pub mod classify;
pub mod constraint;
pub mod error;
pub mod index;
pub mod store;
pub mod variable;
