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

//! The full solver parameterisation with range validation.
//!
//! Every field maps one-to-one onto a CLI flag and a parameter-file key.
//! Values outside their documented ranges are rejected up front so a bad
//! configuration never reaches the engine.

use capstan_model::store::BoundStrengthen;
use std::path::PathBuf;

/// The error type for settings validation: which parameter, what value,
/// and the accepted range.
#[derive(Debug, Clone, PartialEq)]
pub struct SettingsError {
    pub name: &'static str,
    pub value: String,
    pub low: String,
    pub high: String,
}

impl std::fmt::Display for SettingsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "parameter {} = {} is out of range [{}, {}]",
            self.name, self.value, self.low, self.high
        )
    }
}

impl std::error::Error for SettingsError {}

/// The solver parameters with their defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverSettings {
    /// Hard wall-clock cap in seconds.
    pub time_limit: f64,
    /// 0 selects the internal fixed seed.
    pub random_seed: u64,
    pub feas_tolerance: f64,
    pub opt_tolerance: f64,
    pub zero_tolerance: f64,
    pub bound_strengthen: BoundStrengthen,
    /// Split equalities into opposing inequality pairs.
    pub split_eq: bool,
    /// Run the objective-logging thread.
    pub log_obj: bool,
    /// No-improvement steps before a restart; 0 disables.
    pub restart_step: usize,
    /// Weight smoothing probability on a 0..10000 scale.
    pub smooth_prob: u64,
    pub bms_unsat_con: usize,
    pub bms_unsat_ops: usize,
    pub bms_sat_con: usize,
    pub bms_sat_ops: usize,
    pub bms_flip_ops: usize,
    pub bms_easy_ops: usize,
    pub bms_random_ops: usize,
    pub tabu_base: usize,
    pub tabu_variation: usize,
    pub activity_period: usize,
    pub break_eq_feas: bool,
    pub start: String,
    pub restart: String,
    pub weight: String,
    pub lift_scoring: String,
    pub neighbor_scoring: String,
    /// Where to write the `.sol` file; `None` skips writing.
    pub sol_path: Option<PathBuf>,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            time_limit: 10.0,
            random_seed: 0,
            feas_tolerance: 1e-6,
            opt_tolerance: 1e-4,
            zero_tolerance: 1e-9,
            bound_strengthen: BoundStrengthen::IntegerOnly,
            split_eq: true,
            log_obj: true,
            restart_step: 1_000_000,
            smooth_prob: 1,
            bms_unsat_con: 12,
            bms_unsat_ops: 2250,
            bms_sat_con: 1,
            bms_sat_ops: 80,
            bms_flip_ops: 0,
            bms_easy_ops: 5,
            bms_random_ops: 250,
            tabu_base: 4,
            tabu_variation: 7,
            activity_period: 100_000,
            break_eq_feas: false,
            start: "zero".to_owned(),
            restart: "best".to_owned(),
            weight: "monotone".to_owned(),
            lift_scoring: "lift_age".to_owned(),
            neighbor_scoring: "progress_bonus".to_owned(),
            sol_path: None,
        }
    }
}

impl SolverSettings {
    /// Maps the CLI's 0/1/2 bound-strengthening level.
    pub fn bound_strengthen_from_level(level: u8) -> Option<BoundStrengthen> {
        match level {
            0 => Some(BoundStrengthen::Off),
            1 => Some(BoundStrengthen::IntegerOnly),
            2 => Some(BoundStrengthen::Always),
            _ => None,
        }
    }

    /// Validates every range-limited parameter.
    pub fn validate(&self) -> Result<(), SettingsError> {
        fn check_f64(
            name: &'static str,
            value: f64,
            low: f64,
            high: f64,
        ) -> Result<(), SettingsError> {
            if value < low || value > high || !value.is_finite() {
                return Err(SettingsError {
                    name,
                    value: value.to_string(),
                    low: low.to_string(),
                    high: high.to_string(),
                });
            }
            Ok(())
        }
        fn check_usize(
            name: &'static str,
            value: usize,
            low: usize,
            high: usize,
        ) -> Result<(), SettingsError> {
            if value < low || value > high {
                return Err(SettingsError {
                    name,
                    value: value.to_string(),
                    low: low.to_string(),
                    high: high.to_string(),
                });
            }
            Ok(())
        }
        check_f64("time_limit", self.time_limit, 0.0, 1e8)?;
        check_f64("feas_tolerance", self.feas_tolerance, 0.0, 1e-2)?;
        check_f64("opt_tolerance", self.opt_tolerance, 0.0, 1.0)?;
        check_f64("zero_tolerance", self.zero_tolerance, 0.0, 1e-3)?;
        check_usize("restart_step", self.restart_step, 0, 100_000_000)?;
        check_usize("smooth_prob", self.smooth_prob as usize, 0, 10_000)?;
        check_usize("bms_unsat_con", self.bms_unsat_con, 0, 100_000_000)?;
        check_usize("bms_unsat_ops", self.bms_unsat_ops, 0, 100_000_000)?;
        check_usize("bms_sat_con", self.bms_sat_con, 0, 100_000_000)?;
        check_usize("bms_sat_ops", self.bms_sat_ops, 0, 100_000_000)?;
        check_usize("bms_flip_ops", self.bms_flip_ops, 0, 100_000_000)?;
        check_usize("bms_easy_ops", self.bms_easy_ops, 0, 100_000_000)?;
        check_usize("bms_random_ops", self.bms_random_ops, 0, 100_000_000)?;
        check_usize("tabu_base", self.tabu_base, 0, 100_000_000)?;
        check_usize("tabu_variation", self.tabu_variation, 1, 100_000_000)?;
        check_usize("activity_period", self.activity_period, 1, 100_000_000)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(SolverSettings::default().validate().is_ok());
    }

    #[test]
    fn test_out_of_range_is_rejected() {
        let mut settings = SolverSettings::default();
        settings.smooth_prob = 20_000;
        let err = settings.validate().unwrap_err();
        assert_eq!(err.name, "smooth_prob");

        let mut settings = SolverSettings::default();
        settings.tabu_variation = 0;
        assert!(settings.validate().is_err());

        let mut settings = SolverSettings::default();
        settings.feas_tolerance = 1.0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_bound_strengthen_levels() {
        assert_eq!(
            SolverSettings::bound_strengthen_from_level(0),
            Some(BoundStrengthen::Off)
        );
        assert_eq!(
            SolverSettings::bound_strengthen_from_level(2),
            Some(BoundStrengthen::Always)
        );
        assert_eq!(SolverSettings::bound_strengthen_from_level(3), None);
    }
}
