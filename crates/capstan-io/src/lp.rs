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

//! LP (CPLEX-like) reader.
//!
//! Sections: `minimize`/`maximize`, `subject to`, `bounds`,
//! `general`/`integer`, `binary`, `end`. Block comments (`/* ... */`),
//! `//` line comments, and lines starting with `\` are stripped before
//! tokenisation. Identifiers admit letters, digits and `_ . # [ ] ( ) $ @`;
//! numbers accept an optional decimal point and `e`/`E` exponent, with
//! out-of-range literals mapped to the bound sentinels. Constraints may be
//! named with a `name:` prefix or are auto-named.

use crate::error::ReadError;
use capstan_core::num::{INF, NEG_INF};
use capstan_model::constraint::ConSense;
use capstan_model::index::OBJECTIVE_CON;
use capstan_model::store::{ModelStore, ObjSense};
use capstan_model::variable::VarKind;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenKind {
    Identifier,
    Number,
    Colon,
    Semicolon,
    LessEqual,
    GreaterEqual,
    Equal,
    Plus,
    Minus,
    End,
}

#[derive(Debug, Clone)]
struct Token {
    kind: TokenKind,
    text: String,
    value: f64,
    line: usize,
}

impl Token {
    fn symbol(kind: TokenKind, line: usize) -> Self {
        Self {
            kind,
            text: String::new(),
            value: 0.0,
            line,
        }
    }
}

fn is_identifier_char(ch: u8) -> bool {
    ch.is_ascii_alphanumeric()
        || matches!(ch, b'_' | b'.' | b'#' | b'[' | b']' | b'(' | b')' | b'$' | b'@')
}

fn is_identifier_start(ch: u8) -> bool {
    is_identifier_char(ch) && !ch.is_ascii_digit() && ch != b'.'
}

struct Tokenizer {
    src: Vec<u8>,
    pos: usize,
    line: usize,
    pushed: Vec<Token>,
}

impl Tokenizer {
    fn new(content: &str) -> Self {
        Self {
            src: content.as_bytes().to_vec(),
            pos: 0,
            line: 1,
            pushed: Vec::new(),
        }
    }

    fn push_back(&mut self, token: Token) {
        self.pushed.push(token);
    }

    fn peek(&mut self) -> Result<Token, ReadError> {
        let token = self.next()?;
        self.push_back(token.clone());
        Ok(token)
    }

    fn next(&mut self) -> Result<Token, ReadError> {
        if let Some(token) = self.pushed.pop() {
            return Ok(token);
        }
        while self.pos < self.src.len() && self.src[self.pos].is_ascii_whitespace() {
            if self.src[self.pos] == b'\n' {
                self.line += 1;
            }
            self.pos += 1;
        }
        if self.pos >= self.src.len() {
            return Ok(Token::symbol(TokenKind::End, self.line));
        }
        let line = self.line;
        let ch = self.src[self.pos];
        match ch {
            b':' => {
                self.pos += 1;
                Ok(Token::symbol(TokenKind::Colon, line))
            }
            b';' => {
                self.pos += 1;
                Ok(Token::symbol(TokenKind::Semicolon, line))
            }
            b'+' => {
                self.pos += 1;
                Ok(Token::symbol(TokenKind::Plus, line))
            }
            b'-' => {
                self.pos += 1;
                Ok(Token::symbol(TokenKind::Minus, line))
            }
            b'<' => {
                self.pos += 1;
                if self.pos < self.src.len() && self.src[self.pos] == b'=' {
                    self.pos += 1;
                }
                Ok(Token::symbol(TokenKind::LessEqual, line))
            }
            b'>' => {
                self.pos += 1;
                if self.pos < self.src.len() && self.src[self.pos] == b'=' {
                    self.pos += 1;
                }
                Ok(Token::symbol(TokenKind::GreaterEqual, line))
            }
            b'=' => {
                self.pos += 1;
                if self.pos < self.src.len() {
                    if self.src[self.pos] == b'<' {
                        self.pos += 1;
                        return Ok(Token::symbol(TokenKind::LessEqual, line));
                    }
                    if self.src[self.pos] == b'>' {
                        self.pos += 1;
                        return Ok(Token::symbol(TokenKind::GreaterEqual, line));
                    }
                }
                Ok(Token::symbol(TokenKind::Equal, line))
            }
            _ if ch.is_ascii_digit() || ch == b'.' => self.lex_number(line),
            _ if is_identifier_start(ch) => {
                let start = self.pos;
                while self.pos < self.src.len() && is_identifier_char(self.src[self.pos]) {
                    self.pos += 1;
                }
                let text = String::from_utf8_lossy(&self.src[start..self.pos]).into_owned();
                Ok(Token {
                    kind: TokenKind::Identifier,
                    text,
                    value: 0.0,
                    line,
                })
            }
            other => Err(ReadError::Syntax {
                line,
                message: format!("unexpected character '{}'", other as char),
            }),
        }
    }

    fn lex_number(&mut self, line: usize) -> Result<Token, ReadError> {
        let start = self.pos;
        while self.pos < self.src.len()
            && (self.src[self.pos].is_ascii_digit() || self.src[self.pos] == b'.')
        {
            self.pos += 1;
        }
        if self.pos < self.src.len() && matches!(self.src[self.pos], b'e' | b'E') {
            let mut lookahead = self.pos + 1;
            if lookahead < self.src.len() && matches!(self.src[lookahead], b'+' | b'-') {
                lookahead += 1;
            }
            if lookahead < self.src.len() && self.src[lookahead].is_ascii_digit() {
                self.pos = lookahead;
                while self.pos < self.src.len() && self.src[self.pos].is_ascii_digit() {
                    self.pos += 1;
                }
            }
        }
        let text = String::from_utf8_lossy(&self.src[start..self.pos]).into_owned();
        let mut value: f64 = text.parse().map_err(|_| ReadError::Syntax {
            line,
            message: format!("malformed number: {}", text),
        })?;
        // Out-of-range literals become the bound sentinels.
        if value.is_infinite() {
            value = if value > 0.0 { INF } else { NEG_INF };
        }
        Ok(Token {
            kind: TokenKind::Number,
            text,
            value,
            line,
        })
    }
}

/// Strips block comments, `//` line comments and `\`-prefixed comment
/// lines while keeping the newline structure intact for line numbering.
fn preprocess(raw: &str) -> String {
    let mut no_blocks = String::with_capacity(raw.len());
    let mut in_block = false;
    let bytes = raw.as_bytes();
    let mut idx = 0;
    while idx < bytes.len() {
        if !in_block && idx + 1 < bytes.len() && bytes[idx] == b'/' && bytes[idx + 1] == b'*' {
            in_block = true;
            idx += 2;
            continue;
        }
        if in_block {
            if idx + 1 < bytes.len() && bytes[idx] == b'*' && bytes[idx + 1] == b'/' {
                in_block = false;
                idx += 2;
                continue;
            }
            if bytes[idx] == b'\n' {
                no_blocks.push('\n');
            }
            idx += 1;
            continue;
        }
        no_blocks.push(bytes[idx] as char);
        idx += 1;
    }
    if in_block {
        tracing::warn!("unclosed block comment in LP file");
    }
    let mut result = String::with_capacity(no_blocks.len());
    for line in no_blocks.split('\n') {
        let cut = line.find("//").map(|p| &line[..p]).unwrap_or(line);
        if cut.trim_start().starts_with('\\') {
            result.push('\n');
            continue;
        }
        result.push_str(cut);
        result.push('\n');
    }
    result
}

fn is_section_keyword(upper: &str) -> bool {
    matches!(
        upper,
        "SUBJECT"
            | "SUCH"
            | "ST"
            | "S.T."
            | "S.T"
            | "CONSTRAINTS"
            | "CONSTRAINT"
            | "BOUNDS"
            | "BOUND"
            | "BINARIES"
            | "BINARY"
            | "BIN"
            | "GENERAL"
            | "GENERALS"
            | "INTEGER"
            | "INTEGERS"
            | "INT"
            | "END"
    )
}

fn is_constraints_keyword(upper: &str) -> bool {
    matches!(
        upper,
        "SUBJECT" | "SUCH" | "ST" | "S.T." | "S.T" | "CONSTRAINTS" | "CONSTRAINT"
    )
}

fn is_bounds_keyword(upper: &str) -> bool {
    matches!(upper, "BOUNDS" | "BOUND")
}

fn is_integers_keyword(upper: &str) -> bool {
    matches!(upper, "GENERAL" | "GENERALS" | "INTEGER" | "INTEGERS" | "INT")
}

fn is_binary_keyword(upper: &str) -> bool {
    matches!(upper, "BINARY" | "BINARIES" | "BIN")
}

#[derive(Debug, Default)]
struct LinearExpr {
    terms: Vec<(String, f64)>,
    constant: f64,
}

fn parse_linear_expression(
    tokenizer: &mut Tokenizer,
    should_stop: impl Fn(&Token) -> bool,
) -> Result<LinearExpr, ReadError> {
    let mut expr = LinearExpr::default();
    let mut pending_sign = 1.0;
    loop {
        let token = tokenizer.peek()?;
        if token.kind == TokenKind::End || should_stop(&token) {
            break;
        }
        match token.kind {
            TokenKind::Plus => {
                tokenizer.next()?;
                pending_sign = 1.0;
            }
            TokenKind::Minus => {
                tokenizer.next()?;
                pending_sign = -1.0;
            }
            TokenKind::Number => {
                let number = tokenizer.next()?;
                let coeff = number.value * pending_sign;
                pending_sign = 1.0;
                let next = tokenizer.peek()?;
                if next.kind == TokenKind::Identifier
                    && !is_section_keyword(&next.text.to_ascii_uppercase())
                {
                    let var = tokenizer.next()?;
                    expr.terms.push((var.text, coeff));
                } else {
                    expr.constant += coeff;
                }
            }
            TokenKind::Identifier => {
                let token = tokenizer.next()?;
                if is_section_keyword(&token.text.to_ascii_uppercase()) {
                    tokenizer.push_back(token);
                    break;
                }
                expr.terms.push((token.text, pending_sign));
                pending_sign = 1.0;
            }
            TokenKind::Semicolon => {
                tokenizer.next()?;
                break;
            }
            _ => {
                return Err(ReadError::Syntax {
                    line: token.line,
                    message: "unexpected token inside linear expression".to_owned(),
                });
            }
        }
    }
    Ok(expr)
}

fn parse_numeric_value(tokenizer: &mut Tokenizer) -> Result<f64, ReadError> {
    let mut sign = 1.0;
    loop {
        let token = tokenizer.next()?;
        match token.kind {
            TokenKind::Plus => sign = 1.0,
            TokenKind::Minus => sign = -1.0,
            TokenKind::Number => return Ok(sign * token.value),
            TokenKind::Identifier => {
                let upper = token.text.to_ascii_uppercase();
                if upper == "INF" || upper == "INFINITY" {
                    return Ok(sign * INF);
                }
                return Err(ReadError::Syntax {
                    line: token.line,
                    message: format!("invalid numeric value: {}", token.text),
                });
            }
            _ => {
                return Err(ReadError::Syntax {
                    line: token.line,
                    message: "expecting numeric value".to_owned(),
                });
            }
        }
    }
}

/// Reads an LP file into `store`.
pub fn read_file(path: &Path, store: &mut ModelStore) -> Result<(), ReadError> {
    let content = std::fs::read_to_string(path)?;
    read_str(&content, store)
}

/// Reads LP content into `store`.
pub fn read_str(content: &str, store: &mut ModelStore) -> Result<(), ReadError> {
    let cleaned = preprocess(content);
    let mut tokenizer = Tokenizer::new(&cleaned);
    let mut auto_con_counter = 0usize;
    parse_objective(&mut tokenizer, store)?;
    loop {
        let token = tokenizer.peek()?;
        match token.kind {
            TokenKind::End => break,
            TokenKind::Semicolon => {
                tokenizer.next()?;
                continue;
            }
            TokenKind::Identifier => {}
            _ => {
                return Err(ReadError::Syntax {
                    line: token.line,
                    message: "unexpected token outside of sections".to_owned(),
                });
            }
        }
        let upper = token.text.to_ascii_uppercase();
        if is_constraints_keyword(&upper) {
            parse_constraints(&mut tokenizer, store, &mut auto_con_counter)?;
        } else if is_bounds_keyword(&upper) {
            parse_bounds(&mut tokenizer, store)?;
        } else if is_integers_keyword(&upper) {
            parse_integers(&mut tokenizer, store)?;
        } else if is_binary_keyword(&upper) {
            parse_binaries(&mut tokenizer, store)?;
        } else if upper == "END" {
            tokenizer.next()?;
            break;
        } else {
            return Err(ReadError::Syntax {
                line: token.line,
                message: format!("unknown section keyword: {}", token.text),
            });
        }
    }
    Ok(())
}

fn add_term(store: &mut ModelStore, con_name: &str, var_name: &str, coeff: f64) {
    let con_idx = if con_name.is_empty() || con_name == store.obj_name() {
        OBJECTIVE_CON
    } else {
        // Constraint rows are created before their terms are added.
        store
            .con_index_by_name(con_name)
            .expect("constraint row created before terms")
    };
    let var_idx = store.make_variable(var_name, false);
    store.add_term(con_idx, var_idx, coeff);
}

fn parse_objective(tokenizer: &mut Tokenizer, store: &mut ModelStore) -> Result<(), ReadError> {
    let sense_token = tokenizer.next()?;
    if sense_token.kind != TokenKind::Identifier {
        return Err(ReadError::Syntax {
            line: sense_token.line,
            message: "LP objective must start with MINIMIZE or MAXIMIZE".to_owned(),
        });
    }
    match sense_token.text.to_ascii_uppercase().as_str() {
        "MIN" | "MINIMIZE" | "MINIMUM" => {}
        "MAX" | "MAXIMIZE" | "MAXIMUM" => store.set_sense(ObjSense::Maximize),
        _ => {
            return Err(ReadError::Syntax {
                line: sense_token.line,
                message: format!("unexpected objective sense: {}", sense_token.text),
            });
        }
    }
    let mut obj_name = String::new();
    let next = tokenizer.peek()?;
    if next.kind == TokenKind::Identifier {
        let possible_name = tokenizer.next()?;
        let colon = tokenizer.peek()?;
        if colon.kind == TokenKind::Colon {
            tokenizer.next()?;
            obj_name = possible_name.text;
            store.set_obj_name(&obj_name);
        } else {
            tokenizer.push_back(possible_name);
        }
    }
    let expr = parse_linear_expression(tokenizer, |token| {
        token.kind == TokenKind::Identifier && is_section_keyword(&token.text.to_ascii_uppercase())
    })?;
    for (var_name, coeff) in &expr.terms {
        add_term(store, &obj_name, var_name, *coeff);
    }
    // An additive objective constant is carried as the objective row's rhs;
    // preprocessing turns it into the (negated) objective offset.
    store.con_mut(OBJECTIVE_CON).set_rhs(-expr.constant);
    Ok(())
}

fn parse_constraints(
    tokenizer: &mut Tokenizer,
    store: &mut ModelStore,
    auto_con_counter: &mut usize,
) -> Result<(), ReadError> {
    let keyword = tokenizer.next()?;
    let upper = keyword.text.to_ascii_uppercase();
    if upper == "SUBJECT" || upper == "SUCH" {
        let follower = if upper == "SUBJECT" { "TO" } else { "THAT" };
        let next = tokenizer.peek()?;
        if next.kind == TokenKind::Identifier && next.text.to_ascii_uppercase() == follower {
            tokenizer.next()?;
        }
    }
    loop {
        let token = tokenizer.peek()?;
        if token.kind == TokenKind::End {
            break;
        }
        if token.kind == TokenKind::Identifier
            && is_section_keyword(&token.text.to_ascii_uppercase())
        {
            break;
        }
        if token.kind == TokenKind::Semicolon {
            tokenizer.next()?;
            continue;
        }
        let mut con_name = String::new();
        if token.kind == TokenKind::Identifier {
            let name_token = tokenizer.next()?;
            let colon = tokenizer.peek()?;
            if colon.kind == TokenKind::Colon {
                tokenizer.next()?;
                con_name = name_token.text;
            } else {
                tokenizer.push_back(name_token);
            }
        }
        if con_name.is_empty() {
            con_name = format!("lp_auto_con_{}", *auto_con_counter);
            *auto_con_counter += 1;
        }
        let lhs = parse_linear_expression(tokenizer, |token| {
            matches!(
                token.kind,
                TokenKind::LessEqual | TokenKind::GreaterEqual | TokenKind::Equal | TokenKind::End
            )
        })?;
        let relation = tokenizer.next()?;
        let sense = match relation.kind {
            TokenKind::LessEqual => ConSense::LessEqual,
            TokenKind::GreaterEqual => ConSense::GreaterEqual,
            TokenKind::Equal => ConSense::Equal,
            _ => {
                return Err(ReadError::Syntax {
                    line: relation.line,
                    message: "constraint must contain relation operator".to_owned(),
                });
            }
        };
        let rhs = parse_numeric_value(tokenizer)?;
        let con_idx = store.make_constraint(&con_name, sense);
        store.con_mut(con_idx).set_rhs(rhs - lhs.constant);
        for (var_name, coeff) in &lhs.terms {
            add_term(store, &con_name, var_name, *coeff);
        }
        let maybe_semi = tokenizer.peek()?;
        if maybe_semi.kind == TokenKind::Semicolon {
            tokenizer.next()?;
        }
    }
    Ok(())
}

fn parse_bounds(tokenizer: &mut Tokenizer, store: &mut ModelStore) -> Result<(), ReadError> {
    tokenizer.next()?;
    loop {
        let token = tokenizer.peek()?;
        if token.kind == TokenKind::End {
            break;
        }
        if token.kind == TokenKind::Identifier
            && is_section_keyword(&token.text.to_ascii_uppercase())
        {
            break;
        }
        if token.kind == TokenKind::Semicolon {
            tokenizer.next()?;
            continue;
        }
        if matches!(token.kind, TokenKind::Number | TokenKind::Plus | TokenKind::Minus) {
            // `value <= x [<= value]` or `value >= x [>= value]`.
            let first_value = parse_numeric_value(tokenizer)?;
            let first_relation = tokenizer.next()?;
            if !matches!(
                first_relation.kind,
                TokenKind::LessEqual | TokenKind::GreaterEqual
            ) {
                return Err(ReadError::Syntax {
                    line: first_relation.line,
                    message: "invalid bounds statement".to_owned(),
                });
            }
            let var_token = tokenizer.next()?;
            if var_token.kind != TokenKind::Identifier {
                return Err(ReadError::Syntax {
                    line: var_token.line,
                    message: "expecting variable name in bounds".to_owned(),
                });
            }
            let var_idx = store.make_variable(&var_token.text, false);
            let maybe_second = tokenizer.peek()?;
            if first_relation.kind == TokenKind::LessEqual {
                store.var_mut(var_idx).set_lower_bound(first_value);
                if matches!(
                    maybe_second.kind,
                    TokenKind::LessEqual | TokenKind::GreaterEqual
                ) {
                    let second = tokenizer.next()?;
                    if second.kind != TokenKind::LessEqual {
                        return Err(ReadError::Syntax {
                            line: second.line,
                            message: "invalid chained bounds order".to_owned(),
                        });
                    }
                    let upper = parse_numeric_value(tokenizer)?;
                    store.var_mut(var_idx).set_upper_bound(upper);
                }
            } else {
                store.var_mut(var_idx).set_upper_bound(first_value);
                if maybe_second.kind == TokenKind::GreaterEqual {
                    tokenizer.next()?;
                    let lower = parse_numeric_value(tokenizer)?;
                    store.var_mut(var_idx).set_lower_bound(lower);
                }
            }
            continue;
        }
        let var_token = tokenizer.next()?;
        if var_token.kind != TokenKind::Identifier {
            return Err(ReadError::Syntax {
                line: var_token.line,
                message: "unexpected token in bounds".to_owned(),
            });
        }
        let var_idx = store.make_variable(&var_token.text, false);
        let next = tokenizer.peek()?;
        if next.kind == TokenKind::Identifier && next.text.to_ascii_uppercase() == "FREE" {
            tokenizer.next()?;
            store.var_mut(var_idx).set_lower_bound(NEG_INF);
            store.var_mut(var_idx).set_upper_bound(INF);
            continue;
        }
        let relation = tokenizer.next()?;
        match relation.kind {
            TokenKind::LessEqual => {
                let upper = parse_numeric_value(tokenizer)?;
                store.var_mut(var_idx).set_upper_bound(upper);
            }
            TokenKind::GreaterEqual => {
                let lower = parse_numeric_value(tokenizer)?;
                store.var_mut(var_idx).set_lower_bound(lower);
            }
            TokenKind::Equal => {
                let value = parse_numeric_value(tokenizer)?;
                let var = store.var_mut(var_idx);
                var.set_lower_bound(value);
                var.set_upper_bound(value);
                var.set_kind(VarKind::Fixed);
            }
            _ => {
                return Err(ReadError::Syntax {
                    line: relation.line,
                    message: "invalid bounds operator".to_owned(),
                });
            }
        }
    }
    Ok(())
}

fn parse_integers(tokenizer: &mut Tokenizer, store: &mut ModelStore) -> Result<(), ReadError> {
    tokenizer.next()?;
    loop {
        let token = tokenizer.peek()?;
        if token.kind == TokenKind::End {
            break;
        }
        if token.kind == TokenKind::Identifier
            && is_section_keyword(&token.text.to_ascii_uppercase())
        {
            break;
        }
        if token.kind == TokenKind::Semicolon {
            tokenizer.next()?;
            continue;
        }
        let token = tokenizer.next()?;
        if token.kind != TokenKind::Identifier {
            return Err(ReadError::Syntax {
                line: token.line,
                message: "invalid integer declaration".to_owned(),
            });
        }
        let var_idx = store.make_variable(&token.text, false);
        let var = store.var_mut(var_idx);
        if var.kind() != VarKind::Binary {
            var.set_kind(VarKind::GeneralInteger);
        }
    }
    Ok(())
}

fn parse_binaries(tokenizer: &mut Tokenizer, store: &mut ModelStore) -> Result<(), ReadError> {
    tokenizer.next()?;
    loop {
        let token = tokenizer.peek()?;
        if token.kind == TokenKind::End {
            break;
        }
        if token.kind == TokenKind::Identifier
            && is_section_keyword(&token.text.to_ascii_uppercase())
        {
            break;
        }
        if token.kind == TokenKind::Semicolon {
            tokenizer.next()?;
            continue;
        }
        let token = tokenizer.next()?;
        if token.kind != TokenKind::Identifier {
            return Err(ReadError::Syntax {
                line: token.line,
                message: "invalid binary declaration".to_owned(),
            });
        }
        let var_idx = store.make_variable(&token.text, false);
        let var = store.var_mut(var_idx);
        var.set_kind(VarKind::Binary);
        if var.lower_bound() < 0.0 {
            var.set_lower_bound(0.0);
        }
        if var.upper_bound() > 1.0 {
            var.set_upper_bound(1.0);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use capstan_core::num::Tolerances;
    use capstan_model::index::ConIndex;

    fn parsed(content: &str) -> ModelStore {
        let mut store = ModelStore::new(Tolerances::default());
        read_str(content, &mut store).expect("parse failed");
        store
    }

    #[test]
    fn test_simple_lp_model() {
        let store = parsed(
            "minimize obj: x + 2 y\n\
             subject to\n\
             c1: x + y <= 4\n\
             c2: 3 x - y >= -2\n\
             bounds\n\
             x <= 3\n\
             end\n",
        );
        assert_eq!(store.obj_name(), "obj");
        assert_eq!(store.objective().term_num(), 2);
        let c1 = store.con_index_by_name("c1").unwrap();
        let c2 = store.con_index_by_name("c2").unwrap();
        assert_eq!(store.con(c1).rhs(), 4.0);
        assert!(store.con(c2).is_greater());
        assert_eq!(store.con(c2).rhs(), -2.0);
        let x = store.var_index_by_name("x").unwrap();
        assert_eq!(store.var(x).upper_bound(), 3.0);
    }

    #[test]
    fn test_maximize_sets_sense_only() {
        let store = parsed("maximize 2 x + 3 y\nsubject to\nx + y <= 4\nend\n");
        assert_eq!(store.sense(), ObjSense::Maximize);
        // Coefficients stay raw until preprocessing negates them.
        assert_eq!(store.objective().coeff(0), 2.0);
    }

    #[test]
    fn test_auto_named_constraints() {
        let store = parsed("min x\nst\nx <= 1\nx >= 0\nend\n");
        assert!(store.con_index_by_name("lp_auto_con_0").is_some());
        assert!(store.con_index_by_name("lp_auto_con_1").is_some());
    }

    #[test]
    fn test_comments_are_stripped() {
        let store = parsed(
            "/* header\nblock comment */\nminimize x // trailing\n\\ whole line comment\n\
             subject to\nc: x >= 1 // done\nend\n",
        );
        assert!(store.con_index_by_name("c").is_some());
        assert_eq!(store.objective().term_num(), 1);
    }

    #[test]
    fn test_chained_bounds() {
        let store = parsed("min x\nsubject to\nx + y <= 9\nbounds\n1 <= x <= 5\ny free\nend\n");
        let x = store.var_index_by_name("x").unwrap();
        let y = store.var_index_by_name("y").unwrap();
        assert_eq!(store.var(x).lower_bound(), 1.0);
        assert_eq!(store.var(x).upper_bound(), 5.0);
        assert!(!store.var(y).has_finite_lower());
        assert!(!store.var(y).has_finite_upper());
    }

    #[test]
    fn test_integer_and_binary_sections() {
        let store = parsed(
            "min x + y + z\nsubject to\nx + y + z >= 1\nbounds\nx <= 10\n\
             general\nx\nbinary\ny\nend\n",
        );
        let x = store.var_index_by_name("x").unwrap();
        let y = store.var_index_by_name("y").unwrap();
        let z = store.var_index_by_name("z").unwrap();
        assert!(store.var(x).is_general_integer());
        assert_eq!(store.var(y).kind(), VarKind::Binary);
        assert_eq!(store.var(y).upper_bound(), 1.0);
        assert!(store.var(z).is_real());
    }

    #[test]
    fn test_objective_constant_becomes_rhs() {
        let store = parsed("min x + 5\nsubject to\nx >= 2\nend\n");
        assert_eq!(store.con(ConIndex::new(0)).rhs(), -5.0);
    }

    #[test]
    fn test_lhs_constant_folds_into_rhs() {
        let store = parsed("min x\nsubject to\nc: x + 1 <= 3\nend\n");
        let c = store.con_index_by_name("c").unwrap();
        assert_eq!(store.con(c).rhs(), 2.0);
    }

    #[test]
    fn test_missing_relation_is_error() {
        let mut store = ModelStore::new(Tolerances::default());
        let err = read_str("min x\nsubject to\nc: x 3\nend\n", &mut store).unwrap_err();
        assert!(matches!(err, ReadError::Syntax { .. }));
    }

    #[test]
    fn test_exponent_and_infinity_values() {
        let store = parsed(
            "min 1e2 x\nsubject to\nc: x <= 1.5e3\nbounds\nx >= -inf\nend\n",
        );
        assert_eq!(store.objective().coeff(0), 100.0);
        let c = store.con_index_by_name("c").unwrap();
        assert_eq!(store.con(c).rhs(), 1500.0);
        let x = store.var_index_by_name("x").unwrap();
        assert!(!store.var(x).has_finite_lower());
    }
}
