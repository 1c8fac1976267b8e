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

//! Parameter-file (.set) loading.
//!
//! Accepts `name = value` and `name value` lines. `#` and `;` start
//! comments, and a line whose first token is a lone `c` is a comment line
//! too (solver-log convention). Unknown names and out-of-range values are
//! fatal with a diagnostic pointing at file and line. Command-line flags
//! applied afterwards override anything set here.

use capstan_solver::settings::SolverSettings;
use std::path::{Path, PathBuf};

/// The error type for parameter-file loading.
#[derive(Debug)]
pub enum ParamError {
    Io(std::io::Error),
    /// Malformed `name value` line.
    Format { file: String, line: usize },
    /// Name not recognised.
    UnknownName {
        file: String,
        line: usize,
        name: String,
    },
    /// Value failed to parse or is out of range.
    BadValue {
        file: String,
        line: usize,
        name: String,
        value: String,
    },
}

impl std::fmt::Display for ParamError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParamError::Io(e) => write!(f, "cannot open parameter set file: {}", e),
            ParamError::Format { file, line } => {
                write!(f, "invalid parameter format in {}:{}", file, line)
            }
            ParamError::UnknownName { file, line, name } => {
                write!(f, "unknown parameter '{}' in {}:{}", name, file, line)
            }
            ParamError::BadValue {
                file,
                line,
                name,
                value,
            } => write!(
                f,
                "invalid value '{}' for parameter '{}' in {}:{}",
                value, name, file, line
            ),
        }
    }
}

impl std::error::Error for ParamError {}

/// Loads a parameter file into `settings`; `model_file` picks up a
/// `model_file` entry if present.
pub fn load_from_file(
    path: &Path,
    settings: &mut SolverSettings,
    model_file: &mut Option<PathBuf>,
) -> Result<(), ParamError> {
    let content = std::fs::read_to_string(path).map_err(ParamError::Io)?;
    let file = path.display().to_string();
    tracing::info!(file = %file, "loading parameter set file");
    for (line_idx, raw_line) in content.lines().enumerate() {
        let line_no = line_idx + 1;
        let without_comment = match raw_line.find(|ch| ch == '#' || ch == ';') {
            Some(pos) => &raw_line[..pos],
            None => raw_line,
        };
        let trimmed = without_comment.trim();
        if trimmed.is_empty() {
            continue;
        }
        if trimmed == "c" || trimmed.starts_with("c ") {
            continue;
        }
        let (name, value) = match trimmed.split_once('=') {
            Some((name, value)) => (name.trim(), value.trim()),
            None => match trimmed.split_once(char::is_whitespace) {
                Some((name, value)) => (name.trim(), value.trim()),
                None => {
                    return Err(ParamError::Format {
                        file,
                        line: line_no,
                    });
                }
            },
        };
        if name.is_empty() || value.is_empty() {
            return Err(ParamError::Format {
                file,
                line: line_no,
            });
        }
        set_param(settings, model_file, name, value).map_err(|kind| match kind {
            SetParamError::Unknown => ParamError::UnknownName {
                file: file.clone(),
                line: line_no,
                name: name.to_owned(),
            },
            SetParamError::BadValue => ParamError::BadValue {
                file: file.clone(),
                line: line_no,
                name: name.to_owned(),
                value: value.to_owned(),
            },
        })?;
    }
    Ok(())
}

enum SetParamError {
    Unknown,
    BadValue,
}

fn parse<T: std::str::FromStr>(value: &str) -> Result<T, SetParamError> {
    value.parse().map_err(|_| SetParamError::BadValue)
}

fn parse_bool(value: &str) -> Result<bool, SetParamError> {
    match value {
        "0" => Ok(false),
        "1" => Ok(true),
        _ => Err(SetParamError::BadValue),
    }
}

fn set_param(
    settings: &mut SolverSettings,
    model_file: &mut Option<PathBuf>,
    name: &str,
    value: &str,
) -> Result<(), SetParamError> {
    match name {
        "model_file" => *model_file = Some(PathBuf::from(value)),
        "sol_path" => settings.sol_path = Some(PathBuf::from(value)),
        "time_limit" => settings.time_limit = parse(value)?,
        "random_seed" => settings.random_seed = parse(value)?,
        "feas_tolerance" => settings.feas_tolerance = parse(value)?,
        "opt_tolerance" => settings.opt_tolerance = parse(value)?,
        "zero_tolerance" => settings.zero_tolerance = parse(value)?,
        "bound_strengthen" => {
            let level: u8 = parse(value)?;
            settings.bound_strengthen = SolverSettings::bound_strengthen_from_level(level)
                .ok_or(SetParamError::BadValue)?;
        }
        "split_eq" => settings.split_eq = parse_bool(value)?,
        "log_obj" => settings.log_obj = parse_bool(value)?,
        "restart_step" => settings.restart_step = parse(value)?,
        "smooth_prob" => settings.smooth_prob = parse(value)?,
        "bms_unsat_con" => settings.bms_unsat_con = parse(value)?,
        "bms_unsat_ops" => settings.bms_unsat_ops = parse(value)?,
        "bms_sat_con" => settings.bms_sat_con = parse(value)?,
        "bms_sat_ops" => settings.bms_sat_ops = parse(value)?,
        "bms_flip_ops" => settings.bms_flip_ops = parse(value)?,
        "bms_easy_ops" => settings.bms_easy_ops = parse(value)?,
        "bms_random_ops" => settings.bms_random_ops = parse(value)?,
        "tabu_base" => settings.tabu_base = parse(value)?,
        "tabu_var" => settings.tabu_variation = parse(value)?,
        "activity_period" => settings.activity_period = parse(value)?,
        "break_eq_feas" => settings.break_eq_feas = parse_bool(value)?,
        "start" => settings.start = value.to_owned(),
        "restart" => settings.restart = value.to_owned(),
        "weight" => settings.weight = value.to_owned(),
        "lift_scoring" => settings.lift_scoring = value.to_owned(),
        "neighbor_scoring" => settings.neighbor_scoring = value.to_owned(),
        _ => return Err(SetParamError::Unknown),
    }
    // Catch out-of-range numeric values right away so the diagnostic can
    // name the offending line.
    if settings.validate().is_err() {
        return Err(SetParamError::BadValue);
    }
    Ok(())
}
