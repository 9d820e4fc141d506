//! Values, closures and the two kinds of environment
use crate::eval::error::ExecutionError;
use crate::eval::machine::heap::Address;
use crate::syntax::ast::{Atom, LambdaForm};
use indexmap::IndexMap;
use itertools::Itertools;
use std::fmt;

/// A machine value: a heap address or a primitive integer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Value {
    Addr(Address),
    Int(i64),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Addr(a) => write!(f, "{}", a),
            Value::Int(n) => write!(f, "{}", n),
        }
    }
}

/// A lambda form together with values for its free variables
///
/// The free-value vector is captured at allocation time and holds
/// values, never references into the allocating environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Closure {
    lambda: LambdaForm,
    free_values: Vec<Value>,
}

impl Closure {
    pub fn new(lambda: LambdaForm, free_values: Vec<Value>) -> Self {
        debug_assert_eq!(lambda.free().len(), free_values.len());
        Closure {
            lambda,
            free_values,
        }
    }

    pub fn lambda(&self) -> &LambdaForm {
        &self.lambda
    }

    pub fn free_values(&self) -> &[Value] {
        &self.free_values
    }

    /// Local environment binding free variable names to their
    /// captured values
    pub fn free_env(&self) -> LocalEnv {
        self.lambda
            .free()
            .iter()
            .cloned()
            .zip(self.free_values.iter().copied())
            .collect()
    }
}

impl fmt::Display for Closure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.lambda.update() {
            write!(
                f,
                "Th({}|[{}])",
                self.lambda.body(),
                self.free_values.iter().format(", ")
            )
        } else if self.lambda.arity() > 0 {
            write!(
                f,
                "λ{{{}}}({}|[{}])",
                self.lambda.bound().iter().format(" "),
                self.lambda.body(),
                self.free_values.iter().format(", ")
            )
        } else {
            write!(
                f,
                "({}|[{}])",
                self.lambda.body(),
                self.free_values.iter().format(", ")
            )
        }
    }
}

/// Environment of local bindings, constructed afresh whenever a
/// closure is entered; insertion-ordered so traces render stably
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalEnv {
    bindings: IndexMap<String, Value>,
}

impl LocalEnv {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn lookup(&self, name: &str) -> Option<Value> {
        self.bindings.get(name).copied()
    }

    /// Bind or shadow a name
    pub fn bind<T: AsRef<str>>(&mut self, name: T, value: Value) {
        self.bindings.insert(name.as_ref().to_string(), value);
    }

    pub fn names(&self) -> Vec<String> {
        self.bindings.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.bindings.iter()
    }
}

impl FromIterator<(String, Value)> for LocalEnv {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        LocalEnv {
            bindings: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for LocalEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{{}}}",
            self.bindings
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .format(", ")
        )
    }
}

/// Environment of top-level bindings, populated once during
/// compilation and immutable thereafter
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlobalEnv {
    bindings: IndexMap<String, Address>,
}

impl GlobalEnv {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn insert<T: AsRef<str>>(&mut self, name: T, address: Address) {
        self.bindings.insert(name.as_ref().to_string(), address);
    }

    pub fn lookup(&self, name: &str) -> Option<Address> {
        self.bindings.get(name).copied()
    }

    pub fn names(&self) -> Vec<String> {
        self.bindings.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Address)> {
        self.bindings.iter()
    }
}

impl fmt::Display for GlobalEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{{}}}",
            self.bindings
                .iter()
                .map(|(k, a)| format!("{}={}", k, a))
                .format(", ")
        )
    }
}

/// Resolve a variable, local bindings shadowing globals
pub fn lookup_variable(
    locals: &LocalEnv,
    globals: &GlobalEnv,
    name: &str,
) -> Result<Value, ExecutionError> {
    locals
        .lookup(name)
        .or_else(|| globals.lookup(name).map(Value::Addr))
        .ok_or_else(|| ExecutionError::EnvLookupFailed {
            name: name.to_string(),
            locals: locals.clone(),
            globals: globals.clone(),
        })
}

/// Resolve an atom to a value; literals lift directly
pub fn lookup_atom(
    locals: &LocalEnv,
    globals: &GlobalEnv,
    atom: &Atom,
) -> Result<Value, ExecutionError> {
    match atom {
        Atom::Lit(n) => Ok(Value::Int(*n)),
        Atom::Var(name) => lookup_variable(locals, globals, name),
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::eval::machine::heap::Heap;
    use crate::syntax::ast::dsl::*;

    #[test]
    fn test_local_shadows_global() {
        let mut heap = Heap::new();
        let addr = heap.allocate(Closure::new(thunk(&[], num(1)), vec![]));

        let mut globals = GlobalEnv::empty();
        globals.insert("x", addr);

        let mut locals = LocalEnv::empty();
        locals.bind("x", Value::Int(9));

        assert_eq!(
            lookup_variable(&locals, &globals, "x"),
            Ok(Value::Int(9))
        );
        assert_eq!(
            lookup_variable(&LocalEnv::empty(), &globals, "x"),
            Ok(Value::Addr(addr))
        );
    }

    #[test]
    fn test_lookup_atom_lifts_literals() {
        let globals = GlobalEnv::empty();
        let locals = LocalEnv::empty();
        assert_eq!(
            lookup_atom(&locals, &globals, &lit(42)),
            Ok(Value::Int(42))
        );
        assert!(matches!(
            lookup_atom(&locals, &globals, &var("missing")),
            Err(ExecutionError::EnvLookupFailed { .. })
        ));
    }

    #[test]
    fn test_closure_free_env() {
        let closure = Closure::new(
            lambda(&["f", "g"], &["x"], app("f", vec![var("x")])),
            vec![Value::Int(1), Value::Int(2)],
        );
        let env = closure.free_env();
        assert_eq!(env.lookup("f"), Some(Value::Int(1)));
        assert_eq!(env.lookup("g"), Some(Value::Int(2)));
        assert_eq!(env.lookup("x"), None);
    }
}
