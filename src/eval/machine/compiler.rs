//! Loading programs into an initial machine configuration
//!
//! Top-level bindings may reference one another freely (including
//! cyclically), so loading is two-pass: every binding is assigned its
//! address first, then closures are built with free variables
//! resolved against the completed global environment.
use crate::eval::error::ExecutionError;
use crate::eval::machine::env::{lookup_variable, Closure, GlobalEnv, LocalEnv};
use crate::eval::machine::heap::{Address, Heap};
use crate::eval::machine::vm::{Code, Machine};
use crate::syntax::ast::Program;

/// Allocate a closure per top-level binding and prime a machine to
/// enter `main`
pub fn compile(program: &Program) -> Result<Machine, ExecutionError> {
    let mut globals = GlobalEnv::empty();
    for (i, binding) in program.bindings.iter().enumerate() {
        globals.insert(&binding.name, Address::new(i));
    }

    let mut heap = Heap::new();
    let empty = LocalEnv::empty();
    for binding in &program.bindings {
        let free_values = binding
            .lambda
            .free()
            .iter()
            .map(|name| lookup_variable(&empty, &globals, name))
            .collect::<Result<Vec<_>, _>>()?;
        heap.allocate(Closure::new(binding.lambda.clone(), free_values));
    }

    let main = globals
        .lookup("main")
        .ok_or(ExecutionError::UnableToFindMain)?;
    Ok(Machine::new(heap, globals, Code::Enter(main)))
}
