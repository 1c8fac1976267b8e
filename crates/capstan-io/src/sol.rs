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

//! Plain-text `.sol` solution output.
//!
//! A header line followed by one `name value` line per variable whose best
//! value is non-zero. Callers are expected to verify the solution before
//! writing it.

use capstan_model::index::VarIndex;
use capstan_model::store::ModelStore;
use std::io::Write;
use std::path::Path;

/// Writes the solution file. `values` is indexed like the store's
/// variables.
pub fn write_solution(path: &Path, store: &ModelStore, values: &[f64]) -> std::io::Result<()> {
    let file = std::fs::File::create(path)?;
    let mut writer = std::io::BufWriter::new(file);
    write_solution_to(&mut writer, store, values)
}

/// Writes the solution to any writer; split out for testability.
pub fn write_solution_to<W: Write>(
    writer: &mut W,
    store: &ModelStore,
    values: &[f64],
) -> std::io::Result<()> {
    debug_assert!(
        values.len() == store.var_num(),
        "called `write_solution_to` with {} values for {} variables",
        values.len(),
        store.var_num()
    );
    writeln!(writer, "{:<50}        {}", "Variable name", "Variable value")?;
    for (var_idx, &value) in values.iter().enumerate() {
        if value == 0.0 {
            continue;
        }
        let name = store.var(VarIndex::new(var_idx)).name();
        writeln!(writer, "{:<50}        {}", name, value)?;
    }
    writer.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use capstan_core::num::Tolerances;

    #[test]
    fn test_solution_skips_zero_values() {
        let mut store = ModelStore::new(Tolerances::default());
        store.make_variable("x", false);
        store.make_variable("y", false);
        store.make_variable("z", true);
        store.process_after_read().unwrap();

        let mut out = Vec::new();
        write_solution_to(&mut out, &store, &[1.5, 0.0, 1.0]).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Variable name"));
        assert!(lines[1].starts_with("x"));
        assert!(lines[1].trim_end().ends_with("1.5"));
        assert!(lines[2].starts_with("z"));
    }
}
