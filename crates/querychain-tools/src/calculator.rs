// SPDX-FileCopyrightText: 2026 QueryChain Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Arithmetic evaluation for the calculator tool.
//!
//! Input is first reduced to digits, `.`, `+ - * / %`, parentheses and
//! whitespace, then evaluated by a small recursive-descent parser:
//!
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := unary (('*' | '/' | '%') unary)*
//! unary   := ('-' | '+') unary | primary
//! primary := number | '(' expr ')'
//! ```
//!
//! `%` is the remainder operator, taking the sign of the dividend.

use querychain_core::{ErrorKind, ToolResult};

const INVALID: &str = "invalid expression";
const MAX_DEPTH: usize = 64;

/// Strip every character the evaluator does not understand.
pub fn sanitize(expression: &str) -> String {
    expression
        .chars()
        .filter(|c| c.is_ascii_digit() || "+-*/%().".contains(*c) || c.is_whitespace())
        .collect()
}

/// Evaluate a sanitized expression. `None` for anything malformed or non-finite.
pub fn evaluate(expression: &str) -> Option<f64> {
    let mut parser = Parser {
        chars: expression.chars().collect(),
        pos: 0,
        depth: 0,
    };
    let value = parser.expr()?;
    if parser.peek().is_some() || !value.is_finite() {
        return None;
    }
    Some(value)
}

/// The calculator tool. Never consults the model.
pub fn calculate(expression: &str) -> ToolResult {
    let sanitized = sanitize(expression);
    let sanitized = sanitized.trim();
    match evaluate(sanitized) {
        Some(result) => ToolResult {
            success: true,
            result: Some(result),
            expression: Some(sanitized.to_string()),
            ..ToolResult::default()
        },
        None => ToolResult {
            expression: Some(sanitized.to_string()),
            ..ToolResult::failure_message(ErrorKind::Parse, INVALID)
        },
    }
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
    depth: usize,
}

impl Parser {
    /// Next significant character, skipping whitespace.
    fn peek(&mut self) -> Option<char> {
        while self.chars.get(self.pos).is_some_and(|c| c.is_whitespace()) {
            self.pos += 1;
        }
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn expr(&mut self) -> Option<f64> {
        let mut acc = self.term()?;
        while let Some(op @ ('+' | '-')) = self.peek() {
            self.pos += 1;
            let rhs = self.term()?;
            acc = if op == '+' { acc + rhs } else { acc - rhs };
        }
        Some(acc)
    }

    fn term(&mut self) -> Option<f64> {
        let mut acc = self.unary()?;
        while let Some(op @ ('*' | '/' | '%')) = self.peek() {
            self.pos += 1;
            let rhs = self.unary()?;
            acc = match op {
                '*' => acc * rhs,
                _ if rhs == 0.0 => return None,
                '/' => acc / rhs,
                _ => acc % rhs,
            };
        }
        Some(acc)
    }

    fn unary(&mut self) -> Option<f64> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return None;
        }
        let value = match self.peek()? {
            '-' => {
                self.pos += 1;
                self.unary().map(|v| -v)
            }
            '+' => {
                self.pos += 1;
                self.unary()
            }
            _ => self.primary(),
        };
        self.depth -= 1;
        value
    }

    fn primary(&mut self) -> Option<f64> {
        if self.peek()? == '(' {
            self.pos += 1;
            let value = self.expr()?;
            return (self.bump()? == ')').then_some(value);
        }
        self.number()
    }

    fn number(&mut self) -> Option<f64> {
        self.peek()?;
        let start = self.pos;
        let mut seen_dot = false;
        while let Some(&c) = self.chars.get(self.pos) {
            match c {
                '0'..='9' => self.pos += 1,
                '.' if !seen_dot => {
                    seen_dot = true;
                    self.pos += 1;
                }
                _ => break,
            }
        }
        let literal: String = self.chars[start..self.pos].iter().collect();
        if literal.is_empty() || literal == "." {
            return None;
        }
        literal.parse().ok()
    }
}
