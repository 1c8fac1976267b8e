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

//! File-level round trips for the readers and the solution writer.

use capstan_core::num::Tolerances;
use capstan_io::{read_model, sol};
use capstan_model::store::ModelStore;
use regex::Regex;
use std::io::Write;

#[test]
fn test_sol_file_format() {
    let mut store = ModelStore::new(Tolerances::default());
    store.make_variable("assign[1]", true);
    store.make_variable("flow.out#2", false);
    store.make_variable("unused", false);
    store.process_after_read().unwrap();

    let dir = tempfile::tempdir().unwrap();
    let sol_path = dir.path().join("best.sol");
    sol::write_solution(&sol_path, &store, &[1.0, 2.25, 0.0]).unwrap();

    let content = std::fs::read_to_string(&sol_path).unwrap();
    let mut lines = content.lines();
    assert!(lines.next().unwrap().starts_with("Variable name"));

    // Every data line is a name column padded to at least 50 characters
    // followed by a numeric value.
    let line_re = Regex::new(r"^(\S+)\s+(-?\d+(\.\d+)?([eE][+-]?\d+)?)$").unwrap();
    let data: Vec<&str> = lines.collect();
    assert_eq!(data.len(), 2);
    for line in &data {
        let caps = line_re.captures(line).expect("malformed solution line");
        assert!(caps.get(1).unwrap().as_str().len() <= 50);
    }
    assert!(data[0].starts_with("assign[1]"));
    assert!(data[1].starts_with("flow.out#2"));
}

#[test]
fn test_read_model_dispatches_by_extension() {
    let dir = tempfile::tempdir().unwrap();

    let lp_path = dir.path().join("toy.lp");
    let mut lp_file = std::fs::File::create(&lp_path).unwrap();
    writeln!(lp_file, "minimize x\nsubject to\nc: x >= 1\nend").unwrap();
    drop(lp_file);

    let mut store = ModelStore::new(Tolerances::default());
    read_model(&lp_path, &mut store).unwrap();
    assert!(store.con_index_by_name("c").is_some());

    let bad_path = dir.path().join("toy.txt");
    std::fs::write(&bad_path, "nothing").unwrap();
    let mut store = ModelStore::new(Tolerances::default());
    let err = read_model(&bad_path, &mut store).unwrap_err();
    assert!(matches!(
        err,
        capstan_io::error::ReadError::UnsupportedFormat { .. }
    ));
}

#[test]
fn test_missing_file_is_io_error() {
    let mut store = ModelStore::new(Tolerances::default());
    let err = read_model(std::path::Path::new("/nonexistent/model.mps"), &mut store).unwrap_err();
    assert!(matches!(err, capstan_io::error::ReadError::Io(_)));
}
