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

//! MPS reader.
//!
//! Handles the classical sections NAME, OBJSENSE, ROWS (N/L/G/E), COLUMNS
//! (with `'MARKER'` INTORG/INTEND integrality toggles), RHS and BOUNDS
//! (UP, LO, BV, LI, UI, FX, FR, MI, PL). Section headers start in column
//! one, data lines are indented, `*` starts a comment. RANGES, SOS and
//! INDICATORS sections are rejected. The objective row is the `N` row; its
//! RHS entry becomes the negated objective offset during preprocessing.

use crate::error::ReadError;
use capstan_core::num::{INF, NEG_INF};
use capstan_model::constraint::ConSense;
use capstan_model::index::OBJECTIVE_CON;
use capstan_model::store::{ModelStore, ObjSense};
use capstan_model::variable::VarKind;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Preamble,
    Objsense,
    Rows,
    Columns,
    Rhs,
    Bounds,
    Done,
}

/// Reads an MPS file into `store`.
pub fn read_file(path: &Path, store: &mut ModelStore) -> Result<(), ReadError> {
    let content = std::fs::read_to_string(path)?;
    read_str(&content, store)
}

/// Reads MPS content into `store`.
pub fn read_str(content: &str, store: &mut ModelStore) -> Result<(), ReadError> {
    let mut section = Section::Preamble;
    let mut integrality_marker = false;
    for (line_idx, raw_line) in content.lines().enumerate() {
        let line_no = line_idx + 1;
        let trimmed = raw_line.trim();
        if trimmed.is_empty() || trimmed.starts_with('*') {
            continue;
        }
        if section == Section::Done {
            break;
        }
        let is_header = !raw_line.starts_with(' ') && !raw_line.starts_with('\t');
        if is_header {
            section = parse_header(raw_line, line_no, store)?;
            continue;
        }
        let tokens: Vec<&str> = trimmed.split_whitespace().collect();
        match section {
            Section::Preamble | Section::Done => {
                return Err(ReadError::Syntax {
                    line: line_no,
                    message: format!("unexpected data line before sections: {}", trimmed),
                });
            }
            Section::Objsense => {
                let upper = tokens[0].to_ascii_uppercase();
                if upper.starts_with("MAX") {
                    store.set_sense(ObjSense::Maximize);
                } else if !upper.starts_with("MIN") {
                    return Err(ReadError::Syntax {
                        line: line_no,
                        message: format!("invalid objective sense: {}", tokens[0]),
                    });
                }
            }
            Section::Rows => parse_row_line(&tokens, line_no, store)?,
            Section::Columns => {
                parse_column_line(&tokens, line_no, store, &mut integrality_marker)?
            }
            Section::Rhs => parse_rhs_line(&tokens, line_no, store)?,
            Section::Bounds => parse_bound_line(&tokens, line_no, store)?,
        }
    }
    Ok(())
}

fn parse_header(line: &str, line_no: usize, store: &mut ModelStore) -> Result<Section, ReadError> {
    let mut tokens = line.split_whitespace();
    let keyword = tokens.next().unwrap_or("").to_ascii_uppercase();
    match keyword.as_str() {
        "NAME" => {
            if let Some(name) = tokens.next() {
                tracing::debug!(model = name, "model name");
            }
            Ok(Section::Preamble)
        }
        "OBJSENSE" => {
            // Some writers put the sense on the header line itself.
            if let Some(value) = tokens.next() {
                if value.to_ascii_uppercase().starts_with("MAX") {
                    store.set_sense(ObjSense::Maximize);
                }
            }
            Ok(Section::Objsense)
        }
        "ROWS" => Ok(Section::Rows),
        "COLUMNS" => Ok(Section::Columns),
        "RHS" => Ok(Section::Rhs),
        "BOUNDS" => Ok(Section::Bounds),
        "ENDATA" => Ok(Section::Done),
        "RANGES" | "SOS" | "INDICATORS" => Err(ReadError::UnsupportedSection {
            line: line_no,
            section: keyword,
        }),
        _ => Err(ReadError::Syntax {
            line: line_no,
            message: format!("unknown section header: {}", line.trim()),
        }),
    }
}

fn parse_f64(token: &str, line_no: usize) -> Result<f64, ReadError> {
    let value: f64 = token.parse().map_err(|_| ReadError::Syntax {
        line: line_no,
        message: format!("malformed number: {}", token),
    })?;
    // Out-of-range literals overflow to IEEE infinity; clamp them to the
    // solver's bound sentinels.
    if value.is_infinite() {
        return Ok(if value > 0.0 { INF } else { NEG_INF });
    }
    Ok(value)
}

fn parse_row_line(tokens: &[&str], line_no: usize, store: &mut ModelStore) -> Result<(), ReadError> {
    if tokens.len() < 2 {
        return Err(ReadError::Syntax {
            line: line_no,
            message: "ROWS entry needs a sense and a name".to_owned(),
        });
    }
    let name = tokens[1];
    match tokens[0].to_ascii_uppercase().as_str() {
        "L" => {
            store.make_constraint(name, ConSense::LessEqual);
        }
        "E" => {
            store.make_constraint(name, ConSense::Equal);
        }
        "G" => {
            store.make_constraint(name, ConSense::GreaterEqual);
        }
        "N" => {
            if !store.obj_name().is_empty() {
                return Err(ReadError::Syntax {
                    line: line_no,
                    message: format!("second free row {} (objective already set)", name),
                });
            }
            store.set_obj_name(name);
        }
        other => {
            return Err(ReadError::Syntax {
                line: line_no,
                message: format!("unknown row sense: {}", other),
            });
        }
    }
    Ok(())
}

fn parse_column_line(
    tokens: &[&str],
    line_no: usize,
    store: &mut ModelStore,
    integrality_marker: &mut bool,
) -> Result<(), ReadError> {
    if tokens.len() >= 3 && tokens[1] == "'MARKER'" {
        match tokens[2] {
            "'INTORG'" | "'INTEND'" => {
                *integrality_marker = !*integrality_marker;
                return Ok(());
            }
            other => {
                return Err(ReadError::Syntax {
                    line: line_no,
                    message: format!("unknown marker: {}", other),
                });
            }
        }
    }
    if tokens.len() < 3 || tokens.len() % 2 == 0 {
        return Err(ReadError::Syntax {
            line: line_no,
            message: "COLUMNS entry needs a variable and (row, value) pairs".to_owned(),
        });
    }
    let var_name = tokens[0];
    for pair in tokens[1..].chunks(2) {
        let coeff = parse_f64(pair[1], line_no)?;
        add_coeff(store, pair[0], coeff, var_name, *integrality_marker, line_no)?;
    }
    Ok(())
}

fn add_coeff(
    store: &mut ModelStore,
    con_name: &str,
    coeff: f64,
    var_name: &str,
    integral: bool,
    line_no: usize,
) -> Result<(), ReadError> {
    let con_idx = if con_name == store.obj_name() {
        OBJECTIVE_CON
    } else {
        store
            .con_index_by_name(con_name)
            .ok_or_else(|| ReadError::Syntax {
                line: line_no,
                message: format!("unknown row in COLUMNS: {}", con_name),
            })?
    };
    let var_idx = store.make_variable(var_name, integral);
    store.add_term(con_idx, var_idx, coeff);
    Ok(())
}

fn parse_rhs_line(tokens: &[&str], line_no: usize, store: &mut ModelStore) -> Result<(), ReadError> {
    if tokens.len() < 3 || tokens.len() % 2 == 0 {
        return Err(ReadError::Syntax {
            line: line_no,
            message: "RHS entry needs a set name and (row, value) pairs".to_owned(),
        });
    }
    for pair in tokens[1..].chunks(2) {
        let value = parse_f64(pair[1], line_no)?;
        store.set_rhs_by_name(pair[0], value);
    }
    Ok(())
}

fn parse_bound_line(
    tokens: &[&str],
    line_no: usize,
    store: &mut ModelStore,
) -> Result<(), ReadError> {
    if tokens.len() < 3 {
        return Err(ReadError::Syntax {
            line: line_no,
            message: "BOUNDS entry needs a type, a set name and a variable".to_owned(),
        });
    }
    let bound_type = tokens[0].to_ascii_uppercase();
    let var_name = tokens[2];
    let value = match tokens.get(3) {
        Some(token) => Some(parse_f64(token, line_no)?),
        None => None,
    };
    let needs_value = matches!(bound_type.as_str(), "UP" | "LO" | "LI" | "UI" | "FX");
    if needs_value && value.is_none() {
        return Err(ReadError::Syntax {
            line: line_no,
            message: format!("bound type {} needs a value", bound_type),
        });
    }
    let Some(var_idx) = store.var_index_by_name(var_name) else {
        // Bounds for variables that never appeared in COLUMNS are ignored.
        return Ok(());
    };
    let feas = store.tolerances().feas;
    let var = store.var_mut(var_idx);
    // An explicit bound entry on a marker-binary variable means the model
    // intends a general integer; BV below restores binary explicitly.
    if var.kind() == VarKind::Binary {
        var.set_kind(VarKind::GeneralInteger);
        var.set_upper_bound(INF);
    }
    match bound_type.as_str() {
        "UP" | "UI" => var.set_upper_bound(value.unwrap()),
        "LO" | "LI" => var.set_lower_bound(value.unwrap()),
        "BV" => {
            var.set_kind(VarKind::Binary);
            var.set_upper_bound(1.0);
            var.set_lower_bound(0.0);
        }
        "FX" => {
            let fixed = value.unwrap();
            if !var.is_real() && (fixed - fixed.round()).abs() > feas {
                var.set_kind(VarKind::Real);
            }
            var.set_lower_bound(fixed);
            var.set_upper_bound(fixed);
            var.set_kind(VarKind::Fixed);
        }
        "FR" => {
            var.set_upper_bound(INF);
            var.set_lower_bound(NEG_INF);
        }
        "MI" => var.set_lower_bound(NEG_INF),
        "PL" => var.set_upper_bound(INF),
        other => {
            tracing::warn!(line = line_no, bound_type = other, "ignoring unknown bound type");
        }
    }
    Ok(())
}
