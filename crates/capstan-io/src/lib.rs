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

//! # Capstan IO
//!
//! Model ingestion and solution output. Two readers populate a
//! `ModelStore`: the classical MPS format and the CPLEX-flavoured LP
//! format. Dispatch is by file extension. The solution writer emits the
//! plain-text `.sol` format (one `name value` line per non-zero variable).

pub mod error;
pub mod lp;
pub mod mps;
pub mod sol;

use capstan_model::store::ModelStore;
use error::ReadError;
use std::path::Path;

/// Reads a model file into `store`, dispatching on the file extension
/// (`.mps` or `.lp`, case-insensitive).
pub fn read_model(path: &Path, store: &mut ModelStore) -> Result<(), ReadError> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "mps" => mps::read_file(path, store),
        "lp" => lp::read_file(path, store),
        _ => Err(ReadError::UnsupportedFormat {
            path: path.display().to_string(),
        }),
    }
}
