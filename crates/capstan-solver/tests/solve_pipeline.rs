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

//! End-to-end pipeline tests: model file in, verified solution out.

use capstan_solver::settings::SolverSettings;
use capstan_solver::solver::{SolveError, Solver};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

fn write_model(dir: &tempfile::TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    path
}

fn fast_settings() -> SolverSettings {
    let mut settings = SolverSettings::default();
    settings.time_limit = 0.4;
    settings.log_obj = false;
    settings
}

#[test]
fn test_lp_maximisation_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_model(
        &dir,
        "max.lp",
        "maximize 2 x + 3 y\nsubject to\nc: x + y <= 4\nbounds\nx <= 5\ny <= 5\nend\n",
    );
    let mut settings = fast_settings();
    let sol_path = dir.path().join("max.sol");
    settings.sol_path = Some(sol_path.clone());

    let solver = Solver::new(&path, settings);
    let outcome = solver.run(Arc::new(AtomicBool::new(false))).unwrap();
    assert!(outcome.is_feasible());
    assert!(outcome.verified());
    assert!((outcome.best_objective() - 12.0).abs() < 1e-3);

    let sol = std::fs::read_to_string(&sol_path).unwrap();
    assert!(sol.starts_with("Variable name"));
    assert!(sol.contains('y') || sol.contains('x'));
}

#[test]
fn test_mps_model_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    // min x s.t. x >= 2, x in [0, 10].
    let path = write_model(
        &dir,
        "toy.mps",
        "\
NAME          TOY
ROWS
 N  obj
 G  low
COLUMNS
    x  obj  1.0  low  1.0
RHS
    r  low  2.0
BOUNDS
 UP B x 10.0
ENDATA
",
    );
    let solver = Solver::new(&path, fast_settings());
    let outcome = solver.run(Arc::new(AtomicBool::new(false))).unwrap();
    assert!(outcome.is_feasible());
    assert!((outcome.best_objective() - 2.0).abs() <= 1e-3);
}

#[test]
fn test_infeasible_by_preprocessing_skips_search() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_model(
        &dir,
        "bad.lp",
        "minimize x\nsubject to\npin: x = 5\nbounds\nx <= 1\nend\n",
    );
    let mut settings = fast_settings();
    // Force tightening so the singleton contradiction is detected.
    settings.bound_strengthen =
        SolverSettings::bound_strengthen_from_level(2).unwrap();
    settings.split_eq = false;
    let solver = Solver::new(&path, settings);
    let err = solver.run(Arc::new(AtomicBool::new(false))).unwrap_err();
    assert!(matches!(err, SolveError::Infeasible(_)));
}

#[test]
fn test_missing_model_file_is_read_error() {
    let solver = Solver::new("/nonexistent/model.lp", fast_settings());
    let err = solver.run(Arc::new(AtomicBool::new(false))).unwrap_err();
    assert!(matches!(err, SolveError::Read(_)));
}

#[test]
fn test_invalid_settings_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_model(&dir, "toy.lp", "minimize x\nsubject to\nx >= 0\nend\n");
    let mut settings = fast_settings();
    settings.activity_period = 0;
    let solver = Solver::new(&path, settings);
    let err = solver.run(Arc::new(AtomicBool::new(false))).unwrap_err();
    assert!(matches!(err, SolveError::Settings(_)));
}

#[test]
fn test_pre_set_stop_flag_exits_quickly() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_model(
        &dir,
        "loop.lp",
        "minimize x + y\nsubject to\nc: x + y >= 1\nbounds\nx <= 1\ny <= 1\nend\n",
    );
    let stop = Arc::new(AtomicBool::new(true));
    let mut settings = fast_settings();
    settings.time_limit = 30.0;
    let solver = Solver::new(&path, settings);
    let start = std::time::Instant::now();
    let outcome = solver.run(stop).unwrap();
    // The engine saw the flag at its first poll: hardly any steps ran.
    assert!(start.elapsed().as_secs_f64() < 5.0);
    assert_eq!(outcome.statistics().steps, 0);
}
