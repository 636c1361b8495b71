use std::{cell::RefCell, fmt, rc::Rc};

use rpds::RedBlackTreeMap;

use crate::{
    builtin::Builtin,
    error::RuntimeError,
    value::{Function, Value},
};

type Bindings = RedBlackTreeMap<String, Value>;

struct Frame {
    bindings: RefCell<Bindings>,
    parent: Option<Env>,
}

/// A lexical scope
///
/// Cloning an `Env` clones the handle, not the bindings. A frame lives as long
/// as the longest-lived closure or child scope that refers to it.
#[derive(Clone)]
pub struct Env(Rc<Frame>);

impl Env {
    /// Create an empty root scope with no builtins
    pub fn empty() -> Self {
        Env::with_parent(None)
    }
    fn with_parent(parent: Option<Env>) -> Self {
        Env(Rc::new(Frame {
            bindings: RefCell::new(Bindings::new()),
            parent,
        }))
    }
    /// Create a global scope seeded with every builtin
    pub fn global() -> Self {
        let env = Env::empty();
        for &builtin in Builtin::ALL {
            env.bind(builtin.name(), Function::Builtin(builtin).into());
        }
        env
    }
    pub fn child(&self) -> Self {
        Env::with_parent(Some(self.clone()))
    }
    pub fn parent(&self) -> Option<&Env> {
        self.0.parent.as_ref()
    }
    pub fn is_root(&self) -> bool {
        self.0.parent.is_none()
    }
    /// The outermost scope of this chain
    pub fn root(&self) -> Env {
        let mut env = self;
        while let Some(parent) = env.parent() {
            env = parent;
        }
        env.clone()
    }
    /// Look up a name, searching outward through parent scopes
    pub fn get(&self, name: &str) -> Option<Value> {
        let mut env = Some(self);
        while let Some(scope) = env {
            if let Some(value) = scope.0.bindings.borrow().get(name) {
                return Some(value.clone());
            }
            env = scope.parent();
        }
        None
    }
    pub fn contains_local(&self, name: &str) -> bool {
        self.0.bindings.borrow().contains_key(name)
    }
    /// Bind a name in this scope, replacing any previous local binding
    pub fn define<N>(&self, name: N, value: Value) -> Result<(), RuntimeError>
    where
        N: Into<String>,
    {
        let name = name.into();
        if Builtin::from_name(&name).is_some() {
            return Err(RuntimeError::RedefineBuiltin(name));
        }
        self.bind(name, value);
        Ok(())
    }
    /// Bind a name in the outermost scope
    pub fn define_global<N>(&self, name: N, value: Value) -> Result<(), RuntimeError>
    where
        N: Into<String>,
    {
        self.root().define(name, value)
    }
    /// Bind without the builtin guard
    ///
    /// Only for names already known not to shadow a builtin.
    pub(crate) fn bind<N>(&self, name: N, value: Value)
    where
        N: Into<String>,
    {
        let mut bindings = self.0.bindings.borrow_mut();
        *bindings = bindings.insert(name.into(), value);
    }
    /// Names bound directly in this scope, in sorted order
    pub fn local_names(&self) -> Vec<String> {
        self.0.bindings.borrow().keys().cloned().collect()
    }
    /// Drop every binding in this scope
    ///
    /// Closures stored in a scope keep that scope alive, so a global scope
    /// holding `def`ined closures must be disposed to be freed.
    pub fn dispose(&self) {
        let bindings = self.0.bindings.replace(Bindings::new());
        drop(bindings);
    }
}

impl fmt::Debug for Env {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut depth = 0;
        let mut env = self;
        while let Some(parent) = env.parent() {
            depth += 1;
            env = parent;
        }
        f.debug_struct("Env")
            .field("depth", &depth)
            .field("locals", &self.0.bindings.borrow().size())
            .finish()
    }
}

/// Create a fresh global scope for a new session
pub fn new_global_environment() -> Env {
    Env::global()
}
