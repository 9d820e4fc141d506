//! End-to-end scenarios driving source text through the full pipeline
use codespan_reporting::files::SimpleFiles;
use spineless::eval::error::ExecutionError;
use spineless::eval::machine::compiler::compile;
use spineless::eval::machine::env::Value;
use spineless::eval::machine::heap::Address;
use spineless::eval::machine::vm::{Code, Machine};
use spineless::syntax::ast::Expr;
use spineless::syntax::parser::parse_program;

/// Parse and load a program into an initial machine
fn load(source: &str) -> Machine {
    let mut files = SimpleFiles::new();
    let id = files.add("scenario".to_string(), source.to_string());
    let program = parse_program(&files, id).unwrap();
    compile(&program).unwrap()
}

/// Run a program to its terminal instruction
fn run(source: &str) -> Result<Code, ExecutionError> {
    let mut machine = load(source);
    machine.safe_run(1000)?;
    Ok(machine.code().clone())
}

#[test]
fn test_identity_applied_to_literal() {
    let code = run(r"define main = {} \u {} -> id {1}; define id = {} \n {x} -> x {}").unwrap();
    assert_eq!(code, Code::ReturnInt(1));
}

#[test]
fn test_primitive_addition_via_intrinsic() {
    let code = run(r"define main = {} \u {} -> plus# {2, 3}").unwrap();
    assert_eq!(code, Code::ReturnInt(5));
}

#[test]
fn test_binop_sugar_reaches_intrinsics() {
    assert_eq!(
        run(r"define main = {} \u {} -> 2 + 3").unwrap(),
        Code::ReturnInt(5)
    );
    assert_eq!(
        run(r"define main = {} \u {} -> 10 - 4").unwrap(),
        Code::ReturnInt(6)
    );
    assert_eq!(
        run(r"define main = {} \u {} -> 6 * 7").unwrap(),
        Code::ReturnInt(42)
    );
    assert_eq!(
        run(r"define main = {} \u {} -> 9 / 3").unwrap(),
        Code::ReturnInt(3)
    );
}

#[test]
fn test_division_by_zero() {
    assert_eq!(
        run(r"define main = {} \u {} -> 1 / 0"),
        Err(ExecutionError::DivisionByZero)
    );
}

#[test]
fn test_sharing_thunk_computed_once() {
    let source = r"
define main = {} \u {} ->
  letrec x = {} \u {} -> plus# {1, 2}
  in case x {} of {
    a -> case x {} of {
      b -> Pair {a, b}
    }
  }
";
    let mut machine = load(source);
    let (states, error) = machine.trace(Some(1000));
    assert_eq!(error, None);

    let plus_evals = states
        .iter()
        .filter(|state| {
            matches!(
                state.code(),
                Code::Eval { expr, .. }
                    if matches!(&**expr, Expr::App { callable, .. } if callable == "plus#")
            )
        })
        .count();
    assert_eq!(plus_evals, 1);

    assert_eq!(
        *machine.code(),
        Code::ReturnCon {
            name: "Pair".to_string(),
            values: vec![Value::Int(3), Value::Int(3)],
        }
    );
}

#[test]
fn test_case_on_constructor() {
    let code = run(
        r"define main = {} \u {} -> case True {} of { True {} -> 1; False {} -> 0 }",
    )
    .unwrap();
    assert_eq!(code, Code::ReturnInt(1));
}

#[test]
fn test_partial_application_rewrites_heap_closure() {
    let source = r"
define main = {} \u {} ->
  let pap = {} \u {} -> flip {tuple}
  in pap {1, 2}
define flip = {} \n {f, x, y} -> f {y, x}
define tuple = {} \n {a, b} -> Tup {a, b}
";
    let mut machine = load(source);
    machine.safe_run(1000).unwrap();

    assert_eq!(
        *machine.code(),
        Code::ReturnCon {
            name: "Tup".to_string(),
            values: vec![Value::Int(2), Value::Int(1)],
        }
    );

    // the closure that held `flip {tuple}` has been rewritten with f
    // absorbed as a free variable bound to tuple's address
    let pap = machine.heap().lookup(Address::new(3)).unwrap();
    assert_eq!(pap.lambda().free(), ["f".to_string()]);
    assert_eq!(pap.lambda().bound(), ["x".to_string(), "y".to_string()]);
    assert_eq!(pap.free_values(), [Value::Addr(Address::new(2))]);
}

#[test]
fn test_unbound_variable() {
    let code = run(r"define main = {} \u {} -> bogus {}");
    assert!(matches!(
        code,
        Err(ExecutionError::EnvLookupFailed { name, .. }) if name == "bogus"
    ));
}

#[test]
fn test_letrec_self_reference_terminates() {
    let source = r"
define main = {} \u {} ->
  letrec ones = {ones} \n {} -> Cons {1, ones}
  in ones {}
";
    assert!(matches!(
        run(source).unwrap(),
        Code::ReturnCon { name, .. } if name == "Cons"
    ));
}

#[test]
fn test_let_self_reference_fails() {
    let source = r"
define main = {} \u {} ->
  let ones = {ones} \n {} -> Cons {1, ones}
  in ones {}
";
    assert!(matches!(
        run(source),
        Err(ExecutionError::EnvLookupFailed { name, .. }) if name == "ones"
    ));
}

#[test]
fn test_missing_main() {
    let mut files = SimpleFiles::new();
    let id = files.add(
        "scenario".to_string(),
        r"define helper = {} \u {} -> 1".to_string(),
    );
    let program = parse_program(&files, id).unwrap();
    assert!(matches!(
        compile(&program),
        Err(ExecutionError::UnableToFindMain)
    ));
}

#[test]
fn test_traces_are_deterministic() {
    let source = r"define main = {} \u {} -> id {1}; define id = {} \n {x} -> x {}";
    let mut first = load(source);
    let mut second = load(source);
    let (states1, err1) = first.trace(Some(1000));
    let (states2, err2) = second.trace(Some(1000));
    assert_eq!(err1, None);
    assert_eq!(err2, None);
    assert_eq!(states1, states2);
}

#[test]
fn test_nested_case_and_arithmetic() {
    let source = r"
define main = {} \u {} ->
  case plus# {1, 1} of {
    1 -> 100;
    2 -> case double {21} of { v -> v {} };
    n -> 0
  }
define double = {} \n {x} -> times# {x, 2}
";
    assert_eq!(run(source).unwrap(), Code::ReturnInt(42));
}
