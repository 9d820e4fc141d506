//! The machine heap
//!
//! Addresses are never reused and closures are never deallocated, so
//! the heap is an append-only arena indexed by allocation order. The
//! only mutation is the explicit update operation used by the thunk
//! update rules.
use crate::eval::error::ExecutionError;
use crate::eval::machine::env::Closure;
use std::fmt;

/// An opaque index into the heap
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(usize);

impl Address {
    pub fn new(index: usize) -> Self {
        Address(index)
    }

    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Heap {
    cells: Vec<Closure>,
}

impl Heap {
    pub fn new() -> Self {
        Self::default()
    }

    /// The address the next allocation will receive
    pub fn next_address(&self) -> Address {
        Address(self.cells.len())
    }

    /// Append a closure, returning its fresh address
    pub fn allocate(&mut self, closure: Closure) -> Address {
        let address = self.next_address();
        self.cells.push(closure);
        address
    }

    pub fn lookup(&self, address: Address) -> Result<&Closure, ExecutionError> {
        self.cells
            .get(address.0)
            .ok_or(ExecutionError::HeapLookupFailed(address, self.cells.len()))
    }

    /// Overwrite the closure at an already-allocated address
    pub fn update(&mut self, address: Address, closure: Closure) -> Result<(), ExecutionError> {
        match self.cells.get_mut(address.0) {
            Some(cell) => {
                *cell = closure;
                Ok(())
            }
            None => Err(ExecutionError::HeapUpdateHasNoPreviousValue(address)),
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Cells in allocation order
    pub fn iter(&self) -> impl Iterator<Item = (Address, &Closure)> {
        self.cells
            .iter()
            .enumerate()
            .map(|(i, c)| (Address(i), c))
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::syntax::ast::dsl::*;
    use crate::syntax::ast::LambdaForm;

    fn unit_closure() -> Closure {
        Closure::new(LambdaForm::thunk(vec![], num(0)), vec![])
    }

    #[test]
    fn test_allocation_is_append_only() {
        let mut heap = Heap::new();
        let a = heap.allocate(unit_closure());
        let b = heap.allocate(unit_closure());
        assert_eq!(a.index(), 0);
        assert_eq!(b.index(), 1);
        assert_eq!(heap.len(), 2);
        assert!(heap.lookup(a).is_ok());
    }

    #[test]
    fn test_lookup_failure() {
        let heap = Heap::new();
        assert_eq!(
            heap.lookup(Address::new(3)),
            Err(ExecutionError::HeapLookupFailed(Address::new(3), 0))
        );
    }

    #[test]
    fn test_update_requires_previous_value() {
        let mut heap = Heap::new();
        let a = heap.allocate(unit_closure());
        let replacement = Closure::new(LambdaForm::thunk(vec![], num(9)), vec![]);
        assert!(heap.update(a, replacement.clone()).is_ok());
        assert_eq!(heap.lookup(a), Ok(&replacement));
        assert_eq!(
            heap.update(Address::new(7), replacement),
            Err(ExecutionError::HeapUpdateHasNoPreviousValue(Address::new(7)))
        );
    }
}
