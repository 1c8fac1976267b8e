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

//! The solver facade.
//!
//! One `Solver::run` call is the whole pipeline: read the model file
//! (dispatching on extension), preprocess, configure the engine from the
//! settings, start the timeout thread and the objective logger, run the
//! search, verify, print the result lines and write the solution file.
//!
//! The boundary threads follow the cooperative-cancellation contract: the
//! timeout thread parks on a condition variable and flips the engine's
//! stop flag when the limit expires; the logger polls a relaxed atomic
//! every ~100 ms and prints the published objective when it changes. Both
//! are joined before `run` returns.

use crate::settings::{SettingsError, SolverSettings};
use capstan_core::num::Tolerances;
use capstan_io::error::ReadError;
use capstan_ls::engine::{LocalSearch, SharedObjective};
use capstan_ls::result::{OutcomeStatus, SearchOutcome};
use capstan_model::error::ModelError;
use capstan_model::store::ModelStore;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// The error type for a solve.
#[derive(Debug)]
pub enum SolveError {
    /// Settings outside their accepted ranges.
    Settings(SettingsError),
    /// The model file could not be read or parsed.
    Read(ReadError),
    /// Preprocessing proved the model infeasible; no search ran.
    Infeasible(ModelError),
    /// Writing the solution file failed.
    SolutionIo(std::io::Error),
}

impl std::fmt::Display for SolveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SolveError::Settings(e) => write!(f, "{}", e),
            SolveError::Read(e) => write!(f, "{}", e),
            SolveError::Infeasible(e) => write!(f, "model is infeasible: {}", e),
            SolveError::SolutionIo(e) => write!(f, "failed to write solution: {}", e),
        }
    }
}

impl std::error::Error for SolveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SolveError::Settings(e) => Some(e),
            SolveError::Read(e) => Some(e),
            SolveError::Infeasible(e) => Some(e),
            SolveError::SolutionIo(e) => Some(e),
        }
    }
}

impl From<ReadError> for SolveError {
    fn from(e: ReadError) -> Self {
        SolveError::Read(e)
    }
}

impl From<ModelError> for SolveError {
    fn from(e: ModelError) -> Self {
        SolveError::Infeasible(e)
    }
}

/// Timeout thread handle. Parks on a condition variable; on expiry it
/// flips the stop flag. Cancelling wakes it early.
struct TimeoutGuard {
    shared: Arc<(Mutex<bool>, Condvar)>,
    handle: Option<JoinHandle<()>>,
}

impl TimeoutGuard {
    fn start(limit: Duration, stop: Arc<AtomicBool>) -> Self {
        let shared = Arc::new((Mutex::new(false), Condvar::new()));
        let thread_shared = Arc::clone(&shared);
        let handle = std::thread::spawn(move || {
            let (lock, condvar) = &*thread_shared;
            let cancelled = lock.lock().unwrap();
            let (cancelled, wait) = condvar
                .wait_timeout_while(cancelled, limit, |cancelled| !*cancelled)
                .unwrap();
            if wait.timed_out() && !*cancelled {
                stop.store(true, Ordering::Relaxed);
                tracing::info!("time limit reached, terminating search");
            }
        });
        Self {
            shared,
            handle: Some(handle),
        }
    }

    fn cancel(&mut self) {
        {
            let (lock, condvar) = &*self.shared;
            let mut cancelled = lock.lock().unwrap();
            *cancelled = true;
            condvar.notify_all();
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for TimeoutGuard {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Objective logger thread: prints the published best objective every
/// ~100 ms when it changes.
struct ObjLogger {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl ObjLogger {
    fn start(objective: SharedObjective, clock_start: Instant) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop);
        let handle = std::thread::spawn(move || {
            let mut last_value = f64::NAN;
            let mut has_value = false;
            loop {
                let current = objective.load();
                if !current.is_nan() && (!has_value || current != last_value) {
                    last_value = current;
                    has_value = true;
                    println!(
                        "c [{:>10.2}] obj*: {}",
                        clock_start.elapsed().as_secs_f64(),
                        current
                    );
                }
                if thread_stop.load(Ordering::Relaxed) {
                    break;
                }
                std::thread::sleep(Duration::from_millis(100));
            }
        });
        Self {
            stop,
            handle: Some(handle),
        }
    }

    fn finish(mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// The file-to-solution pipeline.
#[derive(Debug, Clone)]
pub struct Solver {
    model_file: PathBuf,
    settings: SolverSettings,
}

impl Solver {
    pub fn new(model_file: impl Into<PathBuf>, settings: SolverSettings) -> Self {
        Self {
            model_file: model_file.into(),
            settings,
        }
    }

    #[inline]
    pub fn settings(&self) -> &SolverSettings {
        &self.settings
    }

    /// Runs the whole pipeline and returns the search outcome. The stop
    /// flag passed by the caller (usually wired to a signal handler) is
    /// shared with the engine so external termination works; pass a fresh
    /// flag when that is not needed.
    pub fn run(&self, external_stop: Arc<AtomicBool>) -> Result<SearchOutcome, SolveError> {
        self.settings.validate().map_err(SolveError::Settings)?;
        let tolerances = Tolerances::new(
            self.settings.feas_tolerance,
            self.settings.opt_tolerance,
            self.settings.zero_tolerance,
        );
        let mut store = ModelStore::new(tolerances);
        store.set_bound_strengthen(self.settings.bound_strengthen);
        store.set_split_eq(self.settings.split_eq);
        tracing::info!(file = %self.model_file.display(), "reading model");
        let read_start = Instant::now();
        capstan_io::read_model(&self.model_file, &mut store)?;
        tracing::info!(
            elapsed = read_start.elapsed().as_secs_f64(),
            "model read"
        );
        store.process_after_read()?;

        let clock_start = Instant::now();
        let mut engine = LocalSearch::new(&store);
        self.configure_engine(&mut engine, &external_stop);
        let mut timeout = TimeoutGuard::start(
            Duration::from_secs_f64(self.settings.time_limit),
            engine.stop_handle(),
        );
        let logger = self
            .settings
            .log_obj
            .then(|| ObjLogger::start(engine.shared_objective(), clock_start));

        let outcome = engine.run_search();

        timeout.cancel();
        if let Some(logger) = logger {
            logger.finish();
        }
        self.report(&store, &outcome)?;
        tracing::info!(
            elapsed = clock_start.elapsed().as_secs_f64(),
            steps = outcome.statistics().steps,
            "local search finished"
        );
        Ok(outcome)
    }

    fn configure_engine(&self, engine: &mut LocalSearch<'_>, external_stop: &Arc<AtomicBool>) {
        let settings = &self.settings;
        engine.set_random_seed(settings.random_seed);
        engine.set_start_method(&settings.start);
        engine.set_restart_method(&settings.restart);
        engine.set_restart_step(settings.restart_step);
        engine.set_weight_method(&settings.weight);
        engine.set_weight_smooth_probability(settings.smooth_prob);
        engine.set_lift_scoring_method(&settings.lift_scoring);
        engine.set_neighbor_scoring_method(&settings.neighbor_scoring);
        engine.set_bms_unsat_con(settings.bms_unsat_con);
        engine.set_bms_mtm_unsat_op(settings.bms_unsat_ops);
        engine.set_bms_sat_con(settings.bms_sat_con);
        engine.set_bms_mtm_sat_op(settings.bms_sat_ops);
        engine.set_bms_flip_op(settings.bms_flip_ops);
        engine.set_bms_easy_op(settings.bms_easy_ops);
        engine.set_bms_random_op(settings.bms_random_ops);
        engine.set_tabu_base(settings.tabu_base);
        engine.set_tabu_variation(settings.tabu_variation);
        engine.set_activity_period(settings.activity_period);
        engine.set_break_eq_feas(settings.break_eq_feas);
        // The engine adopts the caller's flag so signal handlers and the
        // timeout thread all write the same place.
        engine.set_stop_flag(Arc::clone(external_stop));
    }

    /// Prints the protocol result lines and writes the solution file.
    fn report(&self, store: &ModelStore, outcome: &SearchOutcome) -> Result<(), SolveError> {
        match outcome.status() {
            OutcomeStatus::Unbounded => {
                println!("o problem is unbounded.");
                println!("o best objective: {}", outcome.best_objective());
            }
            OutcomeStatus::NoFeasibleFound => {
                println!("o no feasible solution found.");
                println!("c min unsat constraints: {}", outcome.min_unsat());
            }
            OutcomeStatus::Feasible => {
                if !outcome.verified() {
                    println!("o solution verify failed.");
                    return Ok(());
                }
                println!("o best objective: {}", outcome.best_objective());
                if let Some(sol_path) = &self.settings.sol_path {
                    capstan_io::sol::write_solution(sol_path, store, outcome.best_values())
                        .map_err(SolveError::SolutionIo)?;
                    println!(
                        "c best-found solution is written to {}",
                        sol_path.display()
                    );
                }
            }
        }
        Ok(())
    }
}
