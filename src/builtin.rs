use std::{fs, rc::Rc};

use itertools::Itertools;

use crate::{
    env::Env,
    error::RuntimeError,
    eval::Evaluator,
    value::{Closure, Formals, Function, List, Value},
};

macro_rules! builtins {
    ($($variant:ident => $name:literal),* $(,)?) => {
        /// A native operation, identified by the symbol it is bound to
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum Builtin {
            $($variant),*
        }

        impl Builtin {
            pub const ALL: &'static [Builtin] = &[$(Builtin::$variant),*];
            pub fn name(self) -> &'static str {
                match self {
                    $(Builtin::$variant => $name),*
                }
            }
            pub fn from_name(name: &str) -> Option<Builtin> {
                match name {
                    $($name => Some(Builtin::$variant),)*
                    _ => None,
                }
            }
        }
    };
}

builtins! {
    Eval => "eval",
    Load => "load",
    Print => "print",
    Println => "println",
    Repr => "repr",
    Error => "error",
    List => "list",
    Head => "head",
    Tail => "tail",
    Join => "join",
    Cons => "cons",
    Add => "+",
    Sub => "-",
    Mul => "*",
    Div => "/",
    Rem => "%",
    Gt => ">",
    Ge => ">=",
    Lt => "<",
    Le => "<=",
    Eq => "==",
    Ne => "!=",
    And => "and",
    Or => "or",
    Not => "not",
    If => "if",
    Lambda => "lambda",
    Def => "def",
    Put => "=",
}

pub type BuiltinResult = Result<Value, RuntimeError>;

/// The evaluated arguments of a builtin call, with contract checks
pub struct Args {
    name: &'static str,
    values: Vec<Value>,
}

impl Args {
    pub fn new(builtin: Builtin, values: Vec<Value>) -> Self {
        Args {
            name: builtin.name(),
            values,
        }
    }
    pub fn len(&self) -> usize {
        self.values.len()
    }
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
    pub fn exactly(&self, expected: usize) -> Result<(), RuntimeError> {
        let (name, got) = (self.name, self.len());
        if got > expected {
            Err(RuntimeError::TooManyArgs {
                name,
                expected,
                got,
            })
        } else if got < expected {
            Err(RuntimeError::TooFewArgs {
                name,
                expected,
                got,
            })
        } else {
            Ok(())
        }
    }
    pub fn at_least(&self, expected: usize) -> Result<(), RuntimeError> {
        let (name, got) = (self.name, self.len());
        if got < expected {
            Err(RuntimeError::TooFewArgsAtLeast {
                name,
                expected,
                got,
            })
        } else {
            Ok(())
        }
    }
    pub fn at_most(&self, expected: usize) -> Result<(), RuntimeError> {
        let (name, got) = (self.name, self.len());
        if got > expected {
            Err(RuntimeError::TooManyArgsAtMost {
                name,
                expected,
                got,
            })
        } else {
            Ok(())
        }
    }
    fn wrong_type(&self, i: usize, expected: &'static str) -> RuntimeError {
        RuntimeError::WrongType {
            name: self.name,
            expected,
            got: self.values[i].type_name(),
        }
    }
    pub fn number(&self, i: usize) -> Result<f64, RuntimeError> {
        match &self.values[i] {
            Value::Number(n) => Ok(*n),
            _ => Err(self.wrong_type(i, "number")),
        }
    }
    pub fn string(&self, i: usize) -> Result<&str, RuntimeError> {
        match &self.values[i] {
            Value::String(s) => Ok(s),
            _ => Err(self.wrong_type(i, "string")),
        }
    }
    pub fn qexpr(&self, i: usize) -> Result<&List, RuntimeError> {
        match &self.values[i] {
            Value::QExpr(items) => Ok(items),
            _ => Err(self.wrong_type(i, "Q-Expression")),
        }
    }
    pub fn non_empty_qexpr(&self, i: usize) -> Result<&List, RuntimeError> {
        let items = self.qexpr(i)?;
        if items.is_empty() {
            Err(RuntimeError::EmptyList(self.name))
        } else {
            Ok(items)
        }
    }
    pub fn numbers(&self) -> Result<Vec<f64>, RuntimeError> {
        (0..self.len()).map(|i| self.number(i)).collect()
    }
    pub fn get(&self, i: usize) -> &Value {
        &self.values[i]
    }
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

impl Builtin {
    /// Run this operation on already-evaluated arguments
    pub fn apply(self, evaluator: &mut Evaluator, env: &Env, args: Args) -> BuiltinResult {
        match self {
            Builtin::Add | Builtin::Sub | Builtin::Mul | Builtin::Div | Builtin::Rem => {
                arithmetic(self, &args)
            }
            Builtin::Gt | Builtin::Ge | Builtin::Lt | Builtin::Le => ordering(self, &args),
            Builtin::Eq | Builtin::Ne => {
                args.exactly(2)?;
                let equal = args.get(0) == args.get(1);
                Ok(Value::boolean(if self == Builtin::Eq { equal } else { !equal }))
            }
            Builtin::And | Builtin::Or => {
                args.exactly(2)?;
                let (a, b) = (args.number(0)? != 0.0, args.number(1)? != 0.0);
                Ok(Value::boolean(if self == Builtin::And { a && b } else { a || b }))
            }
            Builtin::Not => {
                args.exactly(1)?;
                Ok(Value::boolean(args.number(0)? == 0.0))
            }
            Builtin::If => {
                args.at_least(2)?;
                args.at_most(3)?;
                let condition = args.number(0)?;
                let then = args.qexpr(1)?;
                let otherwise = if args.len() == 3 {
                    Some(args.qexpr(2)?)
                } else {
                    None
                };
                Ok(match (condition != 0.0, otherwise) {
                    (true, _) => evaluator.eval(Value::SExpr(then.clone()), env),
                    (false, Some(otherwise)) => {
                        evaluator.eval(Value::SExpr(otherwise.clone()), env)
                    }
                    (false, None) => Value::unit(),
                })
            }
            Builtin::List => Ok(Value::qexpr(args.into_values())),
            Builtin::Head => {
                args.exactly(1)?;
                let items = args.non_empty_qexpr(0)?;
                Ok(Value::qexpr(items.first().cloned()))
            }
            Builtin::Tail => {
                args.exactly(1)?;
                let items = args.non_empty_qexpr(0)?;
                Ok(Value::qexpr(items.iter().skip(1).cloned()))
            }
            Builtin::Join => {
                let lists = (0..args.len())
                    .map(|i| args.qexpr(i))
                    .collect::<Result<Vec<_>, _>>()?;
                args.at_least(2)?;
                Ok(Value::qexpr(
                    lists.into_iter().flat_map(|items| items.iter().cloned()),
                ))
            }
            Builtin::Cons => {
                args.exactly(2)?;
                let items = args.qexpr(1)?;
                let head = std::iter::once(args.get(0).clone());
                Ok(Value::qexpr(head.chain(items.iter().cloned())))
            }
            Builtin::Eval => {
                args.exactly(1)?;
                let items = args.qexpr(0)?;
                Ok(evaluator.eval(Value::SExpr(items.clone()), env))
            }
            Builtin::Lambda => {
                args.exactly(2)?;
                let formals = Formals::from_list(args.qexpr(0)?)?;
                let body = args.qexpr(1)?.clone();
                Ok(Function::Closure(Rc::new(Closure {
                    formals,
                    body,
                    env: env.clone(),
                }))
                .into())
            }
            Builtin::Def | Builtin::Put => define(self, env, args),
            Builtin::Print | Builtin::Println => {
                let line = args
                    .into_values()
                    .iter()
                    .map(Value::to_print_string)
                    .join(" ");
                if self == Builtin::Println {
                    evaluator.output_mut().println(&line);
                } else {
                    evaluator.output_mut().print(&line);
                }
                Ok(Value::unit())
            }
            Builtin::Repr => {
                args.exactly(1)?;
                Ok(Value::String(args.get(0).to_string()))
            }
            Builtin::Error => {
                args.exactly(1)?;
                Ok(Value::error(args.string(0)?))
            }
            Builtin::Load => {
                args.exactly(1)?;
                let path = args.string(0)?;
                load(evaluator, env, path)
            }
        }
    }
}

fn arithmetic(builtin: Builtin, args: &Args) -> BuiltinResult {
    let numbers = args.numbers()?;
    args.at_least(1)?;
    let mut numbers = numbers.into_iter();
    let first = numbers.next().unwrap_or_default();
    if builtin == Builtin::Sub && args.len() == 1 {
        return Ok(Value::Number(-first));
    }
    numbers
        .try_fold(first, |x, y| match builtin {
            Builtin::Add => Ok(x + y),
            Builtin::Sub => Ok(x - y),
            Builtin::Mul => Ok(x * y),
            Builtin::Div | Builtin::Rem if y == 0.0 => Err(RuntimeError::DivisionByZero),
            Builtin::Div => Ok(x / y),
            Builtin::Rem => Ok(x % y),
            builtin => unreachable!("{:?}", builtin),
        })
        .map(Value::Number)
}

fn ordering(builtin: Builtin, args: &Args) -> BuiltinResult {
    args.at_least(2)?;
    let numbers = args.numbers()?;
    let holds = numbers.windows(2).all(|pair| {
        let (x, y) = (pair[0], pair[1]);
        match builtin {
            Builtin::Gt => x > y,
            Builtin::Ge => x >= y,
            Builtin::Lt => x < y,
            Builtin::Le => x <= y,
            builtin => unreachable!("{:?}", builtin),
        }
    });
    Ok(Value::boolean(holds))
}

/// `def` binds in the global scope, `=` in the calling scope
fn define(builtin: Builtin, env: &Env, args: Args) -> BuiltinResult {
    args.at_least(1)?;
    let name = builtin.name();
    let targets = args.qexpr(0)?;
    let mut names = Vec::with_capacity(targets.len());
    for target in targets.iter() {
        match target {
            Value::Symbol(symbol) if Builtin::from_name(symbol).is_some() => {
                return Err(RuntimeError::RedefineBuiltin(symbol.clone()))
            }
            Value::Symbol(symbol) => names.push(symbol.clone()),
            target => {
                return Err(RuntimeError::NonSymbolTarget {
                    name,
                    got: target.type_name(),
                })
            }
        }
    }
    let values = args.len() - 1;
    if names.len() != values {
        return Err(RuntimeError::ValueCountMismatch {
            name,
            expected: names.len(),
            got: values,
        });
    }
    let scope = if builtin == Builtin::Def {
        env.root()
    } else {
        env.clone()
    };
    for (name, value) in names.into_iter().zip(args.into_values().into_iter().skip(1)) {
        tracing::debug!(%name, global = scope.is_root(), "define");
        scope.define(name, value)?;
    }
    Ok(Value::unit())
}

fn load(evaluator: &mut Evaluator, env: &Env, path: &str) -> BuiltinResult {
    tracing::debug!(path, "load");
    let source = fs::read_to_string(path).map_err(|error| {
        tracing::debug!(path, %error, "load failed");
        RuntimeError::UnreadableFile(path.into())
    })?;
    let results = evaluator
        .run(&source, path, env)
        .map_err(|error| RuntimeError::LoadFailed(error.to_string()))?;
    for result in results.iter().filter(|result| result.is_error()) {
        evaluator.output_mut().println(&result.to_string());
    }
    Ok(Value::unit())
}
