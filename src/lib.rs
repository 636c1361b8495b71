//! The core of a small Lisp: a grammar-driven parser and a tree-walking
//! evaluator over S-Expressions and Q-Expressions.
//!
//! Runtime failures are ordinary [`Value::Error`] values. Only malformed
//! syntax is reported out of band, as a [`ParseError`].
//!
//! ```
//! let mut session = mlisp::Session::buffered();
//! let result = session.evaluate("+ 5 6", "<doc>").unwrap();
//! assert_eq!(result.to_string(), "11");
//! ```

pub mod builtin;
pub mod config;
pub mod env;
pub mod error;
pub mod eval;
pub mod output;
pub mod parse;
mod stack;
pub mod value;

pub use crate::{
    builtin::Builtin,
    config::Config,
    env::{new_global_environment, Env},
    error::{ParseError, RuntimeError},
    eval::Evaluator,
    output::Output,
    parse::parse,
    value::{Closure, Formals, Function, List, Value},
};

/// Evaluate source text as a single S-Expression in `env`
///
/// Output from `print` goes to stdout.
pub fn evaluate(source: &str, source_name: &str, env: &Env) -> Result<Value, ParseError> {
    Evaluator::default().evaluate(source, source_name, env)
}

/// A global scope together with the evaluator that runs in it
///
/// Sessions are independent. Dropping one disposes its global scope.
#[derive(Debug)]
pub struct Session {
    env: Env,
    evaluator: Evaluator,
}

impl Default for Session {
    fn default() -> Self {
        Session::new(Config::default(), Output::Stdout)
    }
}

impl Session {
    pub fn new(config: Config, output: Output) -> Self {
        Session {
            env: new_global_environment(),
            evaluator: Evaluator::new(config, output),
        }
    }
    /// A session that collects output in memory
    pub fn buffered() -> Self {
        Session::new(Config::default(), Output::buffer())
    }
    pub fn env(&self) -> &Env {
        &self.env
    }
    pub fn evaluate(&mut self, source: &str, source_name: &str) -> Result<Value, ParseError> {
        self.evaluator.evaluate(source, source_name, &self.env)
    }
    pub fn run(&mut self, source: &str, source_name: &str) -> Result<Vec<Value>, ParseError> {
        self.evaluator.run(source, source_name, &self.env)
    }
    /// Evaluate a file, as the `load` builtin does
    pub fn load(&mut self, path: &str) -> Value {
        self.evaluator.call(
            &Function::Builtin(Builtin::Load),
            vec![Value::String(path.into())],
            &self.env,
        )
    }
    /// Take any output collected by a buffered session
    pub fn take_output(&mut self) -> String {
        self.evaluator.output_mut().take()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.env.dispose();
    }
}
