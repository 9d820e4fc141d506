//! Intrinsic integer operations
//!
//! Primitive integers are 64-bit two's complement (`i64`); arithmetic
//! is checked and overflow is reported rather than wrapped. Extending
//! the machine with a new intrinsic is a matter of adding it to the
//! registry.
use crate::eval::error::ExecutionError;

/// A binary integer operation callable from STG code
pub trait Intrinsic: Sync {
    /// The surface name (by convention suffixed with `#`)
    fn name(&self) -> &'static str;

    fn apply(&self, left: i64, right: i64) -> Result<i64, ExecutionError>;
}

/// plus#(l, r) - add l to r
pub struct Plus;

impl Intrinsic for Plus {
    fn name(&self) -> &'static str {
        "plus#"
    }

    fn apply(&self, left: i64, right: i64) -> Result<i64, ExecutionError> {
        left.checked_add(right)
            .ok_or(ExecutionError::ArithmeticOverflow(self.name(), left, right))
    }
}

/// minus#(l, r) - subtract r from l
pub struct Minus;

impl Intrinsic for Minus {
    fn name(&self) -> &'static str {
        "minus#"
    }

    fn apply(&self, left: i64, right: i64) -> Result<i64, ExecutionError> {
        left.checked_sub(right)
            .ok_or(ExecutionError::ArithmeticOverflow(self.name(), left, right))
    }
}

/// times#(l, r) - multiply l by r
pub struct Times;

impl Intrinsic for Times {
    fn name(&self) -> &'static str {
        "times#"
    }

    fn apply(&self, left: i64, right: i64) -> Result<i64, ExecutionError> {
        left.checked_mul(right)
            .ok_or(ExecutionError::ArithmeticOverflow(self.name(), left, right))
    }
}

/// divide#(l, r) - divide l by r, truncating towards zero
pub struct Divide;

impl Intrinsic for Divide {
    fn name(&self) -> &'static str {
        "divide#"
    }

    fn apply(&self, left: i64, right: i64) -> Result<i64, ExecutionError> {
        if right == 0 {
            return Err(ExecutionError::DivisionByZero);
        }
        left.checked_div(right)
            .ok_or(ExecutionError::ArithmeticOverflow(self.name(), left, right))
    }
}

lazy_static! {
    static ref INTRINSICS: Vec<Box<dyn Intrinsic>> = vec![
        Box::new(Plus),
        Box::new(Minus),
        Box::new(Times),
        Box::new(Divide),
    ];
}

/// Look up an intrinsic by surface name
pub fn intrinsic(name: &str) -> Option<&'static dyn Intrinsic> {
    INTRINSICS
        .iter()
        .find(|i| i.name() == name)
        .map(|b| b.as_ref())
}

#[cfg(test)]
pub mod tests {
    use super::*;

    #[test]
    fn test_registry() {
        assert!(intrinsic("plus#").is_some());
        assert!(intrinsic("plus").is_none());
        assert!(intrinsic("PLUS#").is_none());
    }

    #[test]
    fn test_checked_arithmetic() {
        assert_eq!(intrinsic("plus#").unwrap().apply(2, 3), Ok(5));
        assert_eq!(intrinsic("minus#").unwrap().apply(2, 3), Ok(-1));
        assert_eq!(intrinsic("times#").unwrap().apply(4, 3), Ok(12));
        assert_eq!(intrinsic("divide#").unwrap().apply(7, 2), Ok(3));

        assert_eq!(
            intrinsic("plus#").unwrap().apply(i64::MAX, 1),
            Err(ExecutionError::ArithmeticOverflow("plus#", i64::MAX, 1))
        );
        assert_eq!(
            intrinsic("divide#").unwrap().apply(1, 0),
            Err(ExecutionError::DivisionByZero)
        );
        assert_eq!(
            intrinsic("divide#").unwrap().apply(i64::MIN, -1),
            Err(ExecutionError::ArithmeticOverflow("divide#", i64::MIN, -1))
        );
    }
}
