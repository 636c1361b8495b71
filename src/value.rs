use std::{fmt, rc::Rc};

use itertools::Itertools;
use rpds::Vector;

use crate::{builtin::Builtin, env::Env, error::RuntimeError};

/// The items of an S-Expression or Q-Expression
///
/// Persistent, so cloning a list never lets two holders observe each other's
/// changes.
pub type List = Vector<Value>;

/// The symbol that collects the remaining arguments of a closure
pub const VARIADIC_MARKER: &str = "...";

#[derive(Debug, Clone)]
pub enum Value {
    Number(f64),
    String(String),
    Error(String),
    Symbol(String),
    SExpr(List),
    QExpr(List),
    Function(Function),
}

impl Value {
    /// The empty S-Expression, used as the "no value" result
    pub fn unit() -> Self {
        Value::SExpr(List::new())
    }
    pub fn boolean(b: bool) -> Self {
        Value::Number(if b { 1.0 } else { 0.0 })
    }
    pub fn error<S>(message: S) -> Self
    where
        S: Into<String>,
    {
        Value::Error(message.into())
    }
    pub fn symbol<S>(name: S) -> Self
    where
        S: Into<String>,
    {
        Value::Symbol(name.into())
    }
    pub fn qexpr<I>(items: I) -> Self
    where
        I: IntoIterator<Item = Value>,
    {
        Value::QExpr(items.into_iter().collect())
    }
    pub fn sexpr<I>(items: I) -> Self
    where
        I: IntoIterator<Item = Value>,
    {
        Value::SExpr(items.into_iter().collect())
    }
    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error(_))
    }
    pub fn is_unit(&self) -> bool {
        matches!(self, Value::SExpr(items) if items.is_empty())
    }
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Error(_) => "error",
            Value::Symbol(_) => "symbol",
            Value::SExpr(_) => "S-Expression",
            Value::QExpr(_) => "Q-Expression",
            Value::Function(_) => "function",
        }
    }
    /// The form written by `print` and `println`
    ///
    /// Identical to the `Display` form except that a top-level string is
    /// written raw.
    pub fn to_print_string(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            value => value.to_string(),
        }
    }
}

impl From<RuntimeError> for Value {
    fn from(error: RuntimeError) -> Self {
        Value::Error(error.to_string())
    }
}

impl From<Function> for Value {
    fn from(function: Function) -> Self {
        Value::Function(function)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b))
            | (Value::Error(a), Value::Error(b))
            | (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (Value::SExpr(a), Value::SExpr(b)) | (Value::QExpr(a), Value::QExpr(b)) => {
                lists_eq(a, b)
            }
            (Value::Function(a), Value::Function(b)) => a == b,
            _ => false,
        }
    }
}

fn lists_eq(a: &List, b: &List) -> bool {
    a.len() == b.len() && a.iter().zip(b.iter()).all(|(a, b)| a == b)
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", format_number(*n)),
            Value::String(s) => write!(f, "\"{}\"", escape(s)),
            Value::Error(message) => write!(f, "Error: {}", message),
            Value::Symbol(name) => write!(f, "{}", name),
            Value::SExpr(items) => write!(f, "({})", items.iter().join(" ")),
            Value::QExpr(items) => write!(f, "{{{}}}", items.iter().join(" ")),
            Value::Function(function) => write!(f, "{}", function),
        }
    }
}

fn escape(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => escaped.push_str("\\\""),
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            '\t' => escaped.push_str("\\t"),
            '\r' => escaped.push_str("\\r"),
            '\0' => escaped.push_str("\\0"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// Format a number like C's `%g`
pub fn format_number(n: f64) -> String {
    const PRECISION: i32 = 6;
    if n.is_nan() {
        return "nan".into();
    }
    if n.is_infinite() {
        return if n > 0.0 { "inf" } else { "-inf" }.into();
    }
    if n == 0.0 {
        return if n.is_sign_negative() { "-0" } else { "0" }.into();
    }
    // Rounding to the target precision may bump the exponent, so read it
    // back from the rounded form
    let sci = format!("{:.*e}", (PRECISION - 1) as usize, n);
    let (mantissa, exp) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let exp: i32 = exp.parse().unwrap_or(0);
    if exp < -4 || exp >= PRECISION {
        format!(
            "{}e{}{:02}",
            trim_fraction(mantissa),
            if exp < 0 { '-' } else { '+' },
            exp.abs()
        )
    } else {
        let fixed = format!("{:.*}", (PRECISION - 1 - exp) as usize, n);
        trim_fraction(&fixed).into()
    }
}

fn trim_fraction(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

#[derive(Debug, Clone)]
pub enum Function {
    Builtin(Builtin),
    Closure(Rc<Closure>),
}

impl PartialEq for Function {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Function::Builtin(a), Function::Builtin(b)) => a == b,
            (Function::Closure(a), Function::Closure(b)) => {
                Rc::ptr_eq(a, b) || (a.formals == b.formals && lists_eq(&a.body, &b.body))
            }
            _ => false,
        }
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Function::Builtin(builtin) => write!(f, "<function '{}'>", builtin.name()),
            Function::Closure(closure) => write!(f, "{}", closure),
        }
    }
}

/// A user-defined function
///
/// `env` is the scope the closure was created in, extended with any
/// arguments already bound by partial application.
#[derive(Debug)]
pub struct Closure {
    pub formals: Formals,
    pub body: List,
    pub env: Env,
}

impl fmt::Display for Closure {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "(lambda {} {})",
            self.formals,
            Value::QExpr(self.body.clone())
        )
    }
}

/// The parameter list of a closure
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Formals {
    /// Names bound positionally
    pub names: Vec<String>,
    /// Name bound to a Q-Expression of any arguments past `names`
    pub rest: Option<String>,
}

impl Formals {
    /// Build formals from the items of a Q-Expression of symbols
    pub fn from_list(list: &List) -> Result<Self, RuntimeError> {
        let mut names = Vec::new();
        let mut symbols = Vec::with_capacity(list.len());
        for item in list.iter() {
            match item {
                Value::Symbol(name) => symbols.push(name.as_str()),
                item => return Err(RuntimeError::NonSymbolFormal(item.type_name())),
            }
        }
        for name in &symbols {
            if Builtin::from_name(name).is_some() {
                return Err(RuntimeError::RedefineBuiltin((*name).into()));
            }
        }
        let mut symbols = symbols.into_iter();
        while let Some(name) = symbols.next() {
            if name == VARIADIC_MARKER {
                return match (symbols.next(), symbols.next()) {
                    (Some(rest), None) if rest != VARIADIC_MARKER => Ok(Formals {
                        names,
                        rest: Some(rest.into()),
                    }),
                    _ => Err(RuntimeError::BadVariadic),
                };
            }
            names.push(name.into());
        }
        Ok(Formals { names, rest: None })
    }
    /// The formals that remain after binding the first `bound` names
    pub fn skip(&self, bound: usize) -> Self {
        Formals {
            names: self.names.iter().skip(bound).cloned().collect(),
            rest: self.rest.clone(),
        }
    }
}

impl fmt::Display for Formals {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let rest = self
            .rest
            .iter()
            .flat_map(|rest| [VARIADIC_MARKER, rest.as_str()]);
        write!(
            f,
            "{{{}}}",
            self.names.iter().map(String::as_str).chain(rest).join(" ")
        )
    }
}
