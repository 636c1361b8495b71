use pest::{
    error::{Error as PestError, ErrorVariant},
    iterators::{Pair, Pairs},
    Parser, Position,
};

use crate::{
    error::ParseError,
    stack::{ensure_sufficient_stack, with_stack_for_nesting},
    value::{List, Value},
};

type PestResult<T> = Result<T, PestError<Rule>>;

/// The result of parsing source text
pub type ParseResult<T> = Result<T, ParseError>;

#[derive(pest_derive::Parser)]
#[grammar = "grammar.pest"]
struct LispParser;

/// Deepest bracket nesting accepted by [`parse`]
pub const MAX_NESTING: usize = 20_000;

/// Parse source text into its top-level atoms
///
/// `source_name` labels positions in any [`ParseError`]. Input nested deeper
/// than [`MAX_NESTING`] is rejected before parsing. Dropping a deeply nested
/// result recurses once per level, so the evaluator parses, evaluates and
/// drops the tree on a stack sized for its nesting.
pub fn parse(input: &str, source_name: &str) -> ParseResult<List> {
    nesting_depth(input)
        .and_then(|depth| with_stack_for_nesting(depth, || parse_program(input)))
        .map_err(|error| error.with_path(source_name).into())
}

/// The deepest bracket nesting in source text, ignoring strings and comments
pub(crate) fn nesting_depth(input: &str) -> PestResult<usize> {
    let (mut depth, mut deepest) = (0usize, 0usize);
    let mut chars = input.char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            '(' | '{' => {
                depth += 1;
                if depth > MAX_NESTING {
                    let pos =
                        Position::new(input, i).unwrap_or_else(|| Position::from_start(input));
                    let message = format!("expressions nested deeper than {} levels", MAX_NESTING);
                    return Err(PestError::new_from_pos(
                        ErrorVariant::CustomError { message },
                        pos,
                    ));
                }
                deepest = deepest.max(depth);
            }
            ')' | '}' => depth = depth.saturating_sub(1),
            '"' => {
                while let Some((_, c)) = chars.next() {
                    match c {
                        '\\' => {
                            chars.next();
                        }
                        '"' => break,
                        _ => {}
                    }
                }
            }
            ';' => {
                for (_, c) in chars.by_ref() {
                    if c == '\n' {
                        break;
                    }
                }
            }
            _ => {}
        }
    }
    Ok(deepest)
}

fn parse_program(input: &str) -> PestResult<List> {
    let mut pairs = LispParser::parse(Rule::program, input)?;
    let Some(program) = pairs.next() else {
        unreachable!("program matches exactly once")
    };
    parse_atoms(program.into_inner())
}

fn parse_atoms(pairs: Pairs<Rule>) -> PestResult<List> {
    pairs
        .filter(|pair| pair.as_rule() != Rule::EOI)
        .map(parse_atom)
        .collect()
}

fn parse_atom(pair: Pair<Rule>) -> PestResult<Value> {
    Ok(match pair.as_rule() {
        Rule::number => parse_number(pair)?,
        Rule::symbol => Value::symbol(pair.as_str()),
        Rule::string => Value::String(parse_string_literal(pair)),
        Rule::sexpr => Value::SExpr(ensure_sufficient_stack(|| parse_atoms(pair.into_inner()))?),
        Rule::qexpr => Value::QExpr(ensure_sufficient_stack(|| parse_atoms(pair.into_inner()))?),
        rule => unreachable!("{:?}", rule),
    })
}

fn parse_number(pair: Pair<Rule>) -> PestResult<Value> {
    pair.as_str().parse().map(Value::Number).map_err(|_| {
        PestError::new_from_span(
            ErrorVariant::CustomError {
                message: format!("Invalid number: {}", pair.as_str()),
            },
            pair.as_span(),
        )
    })
}

fn parse_string_literal(pair: Pair<Rule>) -> String {
    let mut s = String::new();
    for pair in pair.into_inner() {
        match pair.as_rule() {
            Rule::raw_string => s.push_str(pair.as_str()),
            Rule::escape => match pair.as_str().chars().nth(1) {
                Some('n') => s.push('\n'),
                Some('t') => s.push('\t'),
                Some('r') => s.push('\r'),
                Some('0') => s.push('\0'),
                Some(c) => s.push(c),
                None => unreachable!("escape always has a character"),
            },
            rule => unreachable!("{:?}", rule),
        }
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(input: &str) -> Vec<String> {
        parse(input, "<test>")
            .unwrap()
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    fn first(input: &str) -> Value {
        parse(input, "<test>").unwrap().first().cloned().unwrap()
    }

    #[test]
    fn numbers() {
        assert_eq!(first("5"), Value::Number(5.0));
        assert_eq!(first("-12"), Value::Number(-12.0));
        assert_eq!(first("0.25"), Value::Number(0.25));
        assert_eq!(first("-0.5"), Value::Number(-0.5));
    }

    #[test]
    fn symbols() {
        assert_eq!(first("-"), Value::symbol("-"));
        assert_eq!(first("..."), Value::symbol("..."));
        assert_eq!(first("add-mul"), Value::symbol("add-mul"));
        assert_eq!(first("<="), Value::symbol("<="));
        assert_eq!(first("5abc"), Value::symbol("5abc"));
        assert_eq!(first("1.2.3"), Value::symbol("1.2.3"));
    }

    #[test]
    fn strings_decode_escapes() {
        assert_eq!(first(r#""hello""#), Value::String("hello".into()));
        assert_eq!(first(r#""hello\"""#), Value::String("hello\"".into()));
        assert_eq!(first(r#""hello\n""#), Value::String("hello\n".into()));
        assert_eq!(first(r#""a\\b""#), Value::String("a\\b".into()));
        assert_eq!(first(r#""""#), Value::String(String::new()));
        assert_eq!(first(r#""(not a list) ; nor a comment""#).to_string(), r#""(not a list) ; nor a comment""#);
    }

    #[test]
    fn expressions_round_trip() {
        assert_eq!(render("{1 2 3}"), vec!["{1 2 3}"]);
        assert_eq!(render("(+ 1 (* 2 3)) {}"), vec!["(+ 1 (* 2 3))", "{}"]);
        assert_eq!(render("{head {1 {2}} ()}"), vec!["{head {1 {2}} ()}"]);
        assert_eq!(render("+ 5 6"), vec!["+", "5", "6"]);
    }

    #[test]
    fn whitespace_and_comments_are_discarded() {
        assert_eq!(render("5 ; this is a comment"), vec!["5"]);
        assert_eq!(render("; only a comment"), Vec::<String>::new());
        assert_eq!(render("(\n  1 ; one\n  2\t)"), vec!["(1 2)"]);
        assert_eq!(render(""), Vec::<String>::new());
        assert_eq!(render("(1)(2)"), vec!["(1)", "(2)"]);
    }

    #[test]
    fn malformed_input_is_a_parse_error() {
        for input in ["(+ 1 2", "{1 2", ")", "(1 2}", "\"unterminated"] {
            assert!(parse(input, "<test>").is_err(), "{:?} should not parse", input);
        }
    }

    #[test]
    fn nesting_ignores_strings_and_comments() {
        assert_eq!(nesting_depth("(+ 1 {2 (3)})").unwrap(), 3);
        assert_eq!(nesting_depth("(\"((\\\"(\" ; ((((\n)").unwrap(), 1);
        assert_eq!(nesting_depth("").unwrap(), 0);
    }

    #[test]
    fn excessive_nesting_is_a_parse_error() {
        let input = "(".repeat(MAX_NESTING + 1);
        let error = parse(&input, "<test>").unwrap_err();
        assert!(error.to_string().contains("nested deeper than"), "{}", error);
        assert_eq!(error.line_col(), (1, MAX_NESTING + 1));
    }

    #[test]
    fn deep_nesting_parses_without_overflow() {
        let depth = 5_000;
        let input = format!("{}1{}", "(+ 1 ".repeat(depth), ")".repeat(depth));
        with_stack_for_nesting(depth, || {
            let atoms = parse(&input, "<test>").unwrap();
            assert_eq!(atoms.len(), 1);
        });
    }

    #[test]
    fn parse_errors_carry_position_and_source() {
        let error = parse("(+ 1\n  (* 2 3)", "script.lisp").unwrap_err();
        assert_eq!(error.line_col().0, 2);
        assert!(error.to_string().contains("script.lisp"));
    }
}
