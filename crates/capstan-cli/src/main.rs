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

//! Capstan command line.
//!
//! Flags map one-to-one onto the solver settings; a parameter file
//! (`--param-set-file`) is applied first and explicit flags override it.
//! SIGINT/SIGTERM request cooperative termination through an atomic flag
//! the search engine polls, so an interrupted run still reports and
//! writes its best solution. Exit code 0 means a clean run (with or
//! without a feasible solution); anything fatal exits non-zero.

mod params;

use capstan_solver::settings::SolverSettings;
use capstan_solver::solver::Solver;
use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicPtr, Ordering};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Capstan: a stochastic local-search solver for mixed-integer programs"
)]
struct Cli {
    /// .mps/.lp format model file path
    #[arg(long, short = 'i')]
    model_file: Option<PathBuf>,

    /// .sol format solution output path
    #[arg(long, short = 's')]
    sol_path: Option<PathBuf>,

    /// Parameter configuration file (.set); flags override its values
    #[arg(long, short = 'c')]
    param_set_file: Option<PathBuf>,

    /// Time limit in seconds
    #[arg(long, short = 't')]
    time_limit: Option<f64>,

    /// Random seed (0 uses the internal fixed seed)
    #[arg(long)]
    random_seed: Option<u64>,

    /// Feasibility tolerance
    #[arg(long)]
    feas_tolerance: Option<f64>,

    /// Optimality tolerance
    #[arg(long)]
    opt_tolerance: Option<f64>,

    /// Zero value tolerance
    #[arg(long)]
    zero_tolerance: Option<f64>,

    /// Bound strengthen level: 0=off, 1=pure-integer models only, 2=always
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=2))]
    bound_strengthen: Option<u8>,

    /// Split equalities into two inequalities (0/1)
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=1))]
    split_eq: Option<u8>,

    /// Log the objective while searching (0/1)
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=1))]
    log_obj: Option<u8>,

    /// No-improvement steps before restart (0 disables)
    #[arg(long)]
    restart_step: Option<usize>,

    /// Weight smooth probability in 1/10000
    #[arg(long)]
    smooth_prob: Option<u64>,

    /// BMS unsatisfied constraint sample size
    #[arg(long)]
    bms_unsat_con: Option<usize>,

    /// BMS unsatisfied tight-move operations
    #[arg(long)]
    bms_unsat_ops: Option<usize>,

    /// BMS satisfied constraint sample size
    #[arg(long)]
    bms_sat_con: Option<usize>,

    /// BMS satisfied tight-move operations
    #[arg(long)]
    bms_sat_ops: Option<usize>,

    /// BMS flip operations
    #[arg(long)]
    bms_flip_ops: Option<usize>,

    /// BMS easy operations
    #[arg(long)]
    bms_easy_ops: Option<usize>,

    /// BMS random unsatisfied operations
    #[arg(long)]
    bms_random_ops: Option<usize>,

    /// Tabu base tenure
    #[arg(long)]
    tabu_base: Option<usize>,

    /// Tabu tenure variation (min 1)
    #[arg(long)]
    tabu_var: Option<usize>,

    /// Constraint activity recompute period
    #[arg(long)]
    activity_period: Option<usize>,

    /// Allow lift moves to leave equality rows on a second pass (0/1)
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=1))]
    break_eq_feas: Option<u8>,

    /// Start method: zero/random
    #[arg(long)]
    start: Option<String>,

    /// Restart strategy: random/best/hybrid
    #[arg(long)]
    restart: Option<String>,

    /// Weight method: smooth/monotone
    #[arg(long)]
    weight: Option<String>,

    /// Feasible-phase scoring: lift_age/lift_random
    #[arg(long)]
    lift_scoring: Option<String>,

    /// Neighbor scoring: progress_bonus/progress_age
    #[arg(long)]
    neighbor_scoring: Option<String>,
}

impl Cli {
    /// Overlays explicit flags onto `settings` (the parameter file has
    /// already been applied).
    fn apply_to(&self, settings: &mut SolverSettings) {
        if let Some(value) = self.time_limit {
            settings.time_limit = value;
        }
        if let Some(value) = self.random_seed {
            settings.random_seed = value;
        }
        if let Some(value) = self.feas_tolerance {
            settings.feas_tolerance = value;
        }
        if let Some(value) = self.opt_tolerance {
            settings.opt_tolerance = value;
        }
        if let Some(value) = self.zero_tolerance {
            settings.zero_tolerance = value;
        }
        if let Some(level) = self.bound_strengthen {
            // The clap range keeps the level valid.
            settings.bound_strengthen =
                SolverSettings::bound_strengthen_from_level(level).unwrap();
        }
        if let Some(value) = self.split_eq {
            settings.split_eq = value != 0;
        }
        if let Some(value) = self.log_obj {
            settings.log_obj = value != 0;
        }
        if let Some(value) = self.restart_step {
            settings.restart_step = value;
        }
        if let Some(value) = self.smooth_prob {
            settings.smooth_prob = value;
        }
        if let Some(value) = self.bms_unsat_con {
            settings.bms_unsat_con = value;
        }
        if let Some(value) = self.bms_unsat_ops {
            settings.bms_unsat_ops = value;
        }
        if let Some(value) = self.bms_sat_con {
            settings.bms_sat_con = value;
        }
        if let Some(value) = self.bms_sat_ops {
            settings.bms_sat_ops = value;
        }
        if let Some(value) = self.bms_flip_ops {
            settings.bms_flip_ops = value;
        }
        if let Some(value) = self.bms_easy_ops {
            settings.bms_easy_ops = value;
        }
        if let Some(value) = self.bms_random_ops {
            settings.bms_random_ops = value;
        }
        if let Some(value) = self.tabu_base {
            settings.tabu_base = value;
        }
        if let Some(value) = self.tabu_var {
            settings.tabu_variation = value;
        }
        if let Some(value) = self.activity_period {
            settings.activity_period = value;
        }
        if let Some(value) = self.break_eq_feas {
            settings.break_eq_feas = value != 0;
        }
        if let Some(value) = &self.start {
            settings.start = value.clone();
        }
        if let Some(value) = &self.restart {
            settings.restart = value.clone();
        }
        if let Some(value) = &self.weight {
            settings.weight = value.clone();
        }
        if let Some(value) = &self.lift_scoring {
            settings.lift_scoring = value.clone();
        }
        if let Some(value) = &self.neighbor_scoring {
            settings.neighbor_scoring = value.clone();
        }
        if let Some(value) = &self.sol_path {
            settings.sol_path = Some(value.clone());
        }
    }
}

/// The stop flag the signal handler writes through. Only the pointer is
/// shared with the handler; the `Arc` itself lives in `main` for the
/// whole program.
static ACTIVE_STOP: AtomicPtr<AtomicBool> = AtomicPtr::new(std::ptr::null_mut());

extern "C" fn handle_signal(_signal: libc::c_int) {
    // Async-signal-safe: a single relaxed atomic store through an
    // acquired pointer.
    let flag = ACTIVE_STOP.load(Ordering::Acquire);
    if !flag.is_null() {
        unsafe { (*flag).store(true, Ordering::Relaxed) };
    }
}

fn install_signal_handlers(stop: &Arc<AtomicBool>) {
    ACTIVE_STOP.store(Arc::as_ptr(stop) as *mut AtomicBool, Ordering::Release);
    let handler = handle_signal as extern "C" fn(libc::c_int);
    unsafe {
        libc::signal(libc::SIGINT, handler as libc::sighandler_t);
        libc::signal(libc::SIGTERM, handler as libc::sighandler_t);
    }
}

fn run() -> i32 {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();
    let cli = Cli::parse();
    let mut settings = SolverSettings::default();
    let mut model_file_from_params: Option<PathBuf> = None;
    if let Some(param_file) = &cli.param_set_file {
        if let Err(error) =
            params::load_from_file(param_file, &mut settings, &mut model_file_from_params)
        {
            eprintln!("e {}", error);
            return 1;
        }
    }
    cli.apply_to(&mut settings);
    let Some(model_file) = cli.model_file.clone().or(model_file_from_params) else {
        eprintln!("e no model file given (use --model-file or a parameter file)");
        return 1;
    };
    if let Err(error) = settings.validate() {
        eprintln!("e {}", error);
        return 1;
    }

    let stop = Arc::new(AtomicBool::new(false));
    install_signal_handlers(&stop);

    let solver = Solver::new(model_file, settings);
    match solver.run(Arc::clone(&stop)) {
        Ok(_) => 0,
        Err(error) => {
            eprintln!("e {}", error);
            1
        }
    }
}

fn main() {
    std::process::exit(run());
}
