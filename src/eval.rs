use std::rc::Rc;

use crate::{
    builtin::Args,
    config::Config,
    env::Env,
    error::{ParseError, RuntimeError},
    output::Output,
    parse::{nesting_depth, parse},
    stack::{ensure_sufficient_stack, with_stack_for_nesting},
    value::{Closure, Function, List, Value},
};

/// Name used in arity errors for closures
const LAMBDA_NAME: &str = "<lambda>";

/// Reduces values to normal form
///
/// Holds everything evaluation needs besides the scope itself: limits, the
/// print sink and the current nesting depth.
#[derive(Debug, Default)]
pub struct Evaluator {
    config: Config,
    output: Output,
    depth: usize,
}

impl Evaluator {
    pub fn new(config: Config, output: Output) -> Self {
        Evaluator {
            config,
            output,
            depth: 0,
        }
    }
    /// An evaluator with default limits that collects output in memory
    pub fn buffered() -> Self {
        Evaluator::new(Config::default(), Output::buffer())
    }
    pub fn config(&self) -> &Config {
        &self.config
    }
    pub fn output_mut(&mut self) -> &mut Output {
        &mut self.output
    }
    /// Parse and evaluate source text as a single S-Expression
    ///
    /// `+ 5 6` evaluates to 11. A runtime failure is an `Ok(Value::Error)`;
    /// only malformed syntax is an `Err`.
    pub fn evaluate(
        &mut self,
        source: &str,
        source_name: &str,
        env: &Env,
    ) -> Result<Value, ParseError> {
        self.with_source_stack(source, source_name, |evaluator| {
            let atoms = parse(source, source_name)?;
            Ok(evaluator.eval(Value::SExpr(atoms), env))
        })
    }
    /// Parse source text and evaluate each top-level atom in order
    pub fn run(
        &mut self,
        source: &str,
        source_name: &str,
        env: &Env,
    ) -> Result<Vec<Value>, ParseError> {
        self.with_source_stack(source, source_name, |evaluator| {
            let atoms = parse(source, source_name)?;
            Ok(atoms
                .iter()
                .map(|atom| evaluator.eval(atom.clone(), env))
                .collect())
        })
    }
    /// Run `f` on a stack deep enough to parse, walk and drop `source`
    fn with_source_stack<R>(
        &mut self,
        source: &str,
        source_name: &str,
        f: impl FnOnce(&mut Self) -> Result<R, ParseError>,
    ) -> Result<R, ParseError> {
        let depth = nesting_depth(source)
            .map_err(|error| ParseError::from(error.with_path(source_name)))?;
        with_stack_for_nesting(depth, || f(self))
    }
    /// Reduce a value to normal form
    pub fn eval(&mut self, value: Value, env: &Env) -> Value {
        match value {
            Value::Symbol(name) => env
                .get(&name)
                .unwrap_or_else(|| RuntimeError::UnboundSymbol(name).into()),
            Value::SExpr(items) => self.eval_sexpr(items, env),
            value => value,
        }
    }
    fn eval_sexpr(&mut self, items: List, env: &Env) -> Value {
        if items.is_empty() {
            return Value::SExpr(items);
        }
        if self.depth >= self.config.max_depth {
            tracing::debug!(max_depth = self.config.max_depth, "recursion limit hit");
            return RuntimeError::RecursionLimitExceeded(self.config.max_depth).into();
        }
        self.depth += 1;
        let result = ensure_sufficient_stack(|| self.reduce(&items, env));
        self.depth -= 1;
        result
    }
    fn reduce(&mut self, items: &List, env: &Env) -> Value {
        let mut values = Vec::with_capacity(items.len());
        for item in items.iter() {
            let value = self.eval(item.clone(), env);
            if value.is_error() {
                return value;
            }
            values.push(value);
        }
        if values.len() == 1 {
            return values.remove(0);
        }
        let mut values = values.into_iter();
        match values.next() {
            Some(Value::Function(function)) => self.call(&function, values.collect(), env),
            _ => RuntimeError::NotAFunction.into(),
        }
    }
    /// Apply a function to evaluated arguments
    ///
    /// `env` is the calling scope, used by builtins such as `eval` and `=`.
    pub fn call(&mut self, function: &Function, args: Vec<Value>, env: &Env) -> Value {
        tracing::trace!(%function, args = args.len(), "call");
        match function {
            Function::Builtin(builtin) => builtin
                .apply(self, env, Args::new(*builtin, args))
                .unwrap_or_else(Value::from),
            Function::Closure(closure) => self.call_closure(closure, args),
        }
    }
    fn call_closure(&mut self, closure: &Closure, args: Vec<Value>) -> Value {
        let formals = &closure.formals;
        let positional = formals.names.len();
        let given = args.len();
        if given > positional && formals.rest.is_none() {
            return RuntimeError::TooManyArgs {
                name: LAMBDA_NAME,
                expected: positional,
                got: given,
            }
            .into();
        }
        let scope = closure.env.child();
        let mut args = args.into_iter();
        for (name, arg) in formals.names.iter().zip(args.by_ref()) {
            scope.bind(name.as_str(), arg);
        }
        if given < positional {
            return Function::Closure(Rc::new(Closure {
                formals: formals.skip(given),
                body: closure.body.clone(),
                env: scope,
            }))
            .into();
        }
        if let Some(rest) = &formals.rest {
            scope.bind(rest.as_str(), Value::qexpr(args));
        }
        self.eval(Value::SExpr(closure.body.clone()), &scope)
    }
}
