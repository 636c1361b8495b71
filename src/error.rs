use std::fmt;

use pest::error::{Error as PestError, LineColLocation};

use crate::parse::Rule;

/// Malformed source text.
///
/// This is the syntax channel. It is returned by [`parse`](crate::parse::parse)
/// and never turns into a [`Value`](crate::Value).
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError(Box<PestError<Rule>>);

impl ParseError {
    pub fn line_col(&self) -> (usize, usize) {
        match self.0.line_col {
            LineColLocation::Pos(pos) => pos,
            LineColLocation::Span(start, _) => start,
        }
    }
    pub fn inner(&self) -> &PestError<Rule> {
        &self.0
    }
}

impl From<PestError<Rule>> for ParseError {
    fn from(error: PestError<Rule>) -> Self {
        ParseError(Box::new(error.renamed_rules(rename_rule)))
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for ParseError {}

fn rename_rule(rule: &Rule) -> String {
    match rule {
        Rule::EOI => "end of input",
        Rule::number => "number",
        Rule::symbol => "symbol",
        Rule::string => "string",
        Rule::raw_string => "string contents",
        Rule::escape => "escape sequence",
        Rule::sexpr => "S-Expression",
        Rule::qexpr => "Q-Expression",
        Rule::program => "program",
        rule => return format!("{:?}", rule),
    }
    .into()
}

/// A failure during evaluation
///
/// The `Display` text of each variant is the exact message carried by the
/// resulting `Value::Error`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RuntimeError {
    #[error("Unbound symbol: '{}'", _0)]
    UnboundSymbol(String),
    #[error("S-Expression does not start with function")]
    NotAFunction,
    #[error("Function '{name}' passed too many arguments. Expected {expected}, got {got}.")]
    TooManyArgs {
        name: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("Function '{name}' passed too many arguments. Expected at most {expected}, got {got}.")]
    TooManyArgsAtMost {
        name: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("Function '{name}' passed too few arguments. Expected {expected}, got {got}.")]
    TooFewArgs {
        name: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("Function '{name}' passed too few arguments. Expected at least {expected}, got {got}.")]
    TooFewArgsAtLeast {
        name: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("Function '{name}' passed incorrect argument types. Expected {expected}, got {got}.")]
    WrongType {
        name: &'static str,
        expected: &'static str,
        got: &'static str,
    },
    #[error("Function '{}' passed empty list.", _0)]
    EmptyList(&'static str),
    #[error("Division by zero")]
    DivisionByZero,
    #[error("Cannot redefine builtin '{}'.", _0)]
    RedefineBuiltin(String),
    #[error("Cannot define non-symbol. Expected symbol, got {}.", _0)]
    NonSymbolFormal(&'static str),
    #[error("Function format invalid. Symbol '...' not followed by single symbol.")]
    BadVariadic,
    #[error("Function '{name}' cannot define non-symbol. Expected symbol, got {got}.")]
    NonSymbolTarget {
        name: &'static str,
        got: &'static str,
    },
    #[error("Function '{name}' passed incorrect number of values. Expected {expected}, got {got}.")]
    ValueCountMismatch {
        name: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("Maximum recursion depth of {} exceeded.", _0)]
    RecursionLimitExceeded(usize),
    #[error("Unable to open file: {}", _0)]
    UnreadableFile(String),
    #[error("Error loading file: {}", _0)]
    LoadFailed(String),
}
