//! Abstract syntax of STG programs as consumed by the machine
use itertools::Itertools;
use std::{fmt, rc::Rc};

/// An atomic argument, either a variable name or a literal integer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Atom {
    Var(String),
    Lit(i64),
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Atom::Var(name) => write!(f, "{}", name),
            Atom::Lit(n) => write!(f, "{}", n),
        }
    }
}

/// STG expression forms
///
/// Binary operators in the surface syntax are desugared to intrinsic
/// applications by the parser and never appear here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    /// Application of a variable (or intrinsic name) to atomic arguments
    App { callable: String, args: Vec<Atom> },
    /// Allocate bindings as closures then evaluate body
    Let {
        rec: bool,
        bindings: Vec<Binding>,
        body: Rc<Expr>,
    },
    /// Evaluate scrutinee with the alternatives as pending continuation
    Case {
        scrutinee: Rc<Expr>,
        alts: Vec<CaseAlt>,
    },
    /// Saturated data constructor application
    Con { name: String, args: Vec<Atom> },
    /// Primitive integer
    Lit(i64),
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::App { callable, args } => {
                write!(f, "{} {{{}}}", callable, args.iter().format(", "))
            }
            Expr::Let {
                rec,
                bindings,
                body,
            } => {
                let keyword = if *rec { "letrec" } else { "let" };
                write!(
                    f,
                    "{} {} in {}",
                    keyword,
                    bindings.iter().format("; "),
                    body
                )
            }
            Expr::Case { scrutinee, alts } => {
                write!(f, "case {} of {{{}}}", scrutinee, alts.iter().format("; "))
            }
            Expr::Con { name, args } => {
                write!(f, "{} {{{}}}", name, args.iter().format(", "))
            }
            Expr::Lit(n) => write!(f, "{}", n),
        }
    }
}

/// A case alternative; earlier alternatives take precedence
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaseAlt {
    /// Constructor pattern `Con {v1, …, vk} -> body`
    Con {
        name: String,
        binders: Vec<String>,
        body: Rc<Expr>,
    },
    /// Integer pattern `n -> body`
    Lit { value: i64, body: Rc<Expr> },
    /// Variable default `x -> body`
    Var { binder: String, body: Rc<Expr> },
}

impl CaseAlt {
    /// Whether this is the variable-default form
    pub fn is_default(&self) -> bool {
        matches!(self, CaseAlt::Var { .. })
    }
}

impl fmt::Display for CaseAlt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaseAlt::Con {
                name,
                binders,
                body,
            } => {
                write!(f, "{} {{{}}} -> {}", name, binders.iter().format(", "), body)
            }
            CaseAlt::Lit { value, body } => write!(f, "{} -> {}", value, body),
            CaseAlt::Var { binder, body } => write!(f, "{} -> {}", binder, body),
        }
    }
}

/// A lambda form: free variables, update flag, bound variables and body
///
/// `\u` marks a thunk to be updated in place once evaluated; data
/// constructors and partial applications are `\n`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LambdaForm {
    free: Vec<String>,
    update: bool,
    bound: Vec<String>,
    body: Rc<Expr>,
}

impl LambdaForm {
    pub fn new(free: Vec<String>, update: bool, bound: Vec<String>, body: Rc<Expr>) -> Self {
        LambdaForm {
            free,
            update,
            bound,
            body,
        }
    }

    /// A lambda form that will be updated after evaluation
    pub fn thunk(free: Vec<String>, body: Rc<Expr>) -> Self {
        LambdaForm::new(free, true, vec![], body)
    }

    /// A non-updatable lambda form
    pub fn lambda(free: Vec<String>, bound: Vec<String>, body: Rc<Expr>) -> Self {
        LambdaForm::new(free, false, bound, body)
    }

    /// Free variable identifiers in capture order
    pub fn free(&self) -> &[String] {
        &self.free
    }

    /// Whether the closure should be updated once evaluated
    pub fn update(&self) -> bool {
        self.update
    }

    /// Bound variable identifiers
    pub fn bound(&self) -> &[String] {
        &self.bound
    }

    /// Number of bound variables
    pub fn arity(&self) -> usize {
        self.bound.len()
    }

    pub fn body(&self) -> &Rc<Expr> {
        &self.body
    }
}

impl fmt::Display for LambdaForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{{}}} \\{} {{{}}} -> {}",
            self.free.iter().format(", "),
            if self.update { 'u' } else { 'n' },
            self.bound.iter().format(", "),
            self.body
        )
    }
}

/// A named lambda form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub name: String,
    pub lambda: LambdaForm,
}

impl Binding {
    pub fn new<T: AsRef<str>>(name: T, lambda: LambdaForm) -> Self {
        Binding {
            name: name.as_ref().to_string(),
            lambda,
        }
    }
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.name, self.lambda)
    }
}

/// An ordered list of top-level bindings
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Program {
    pub bindings: Vec<Binding>,
}

impl Program {
    pub fn new(bindings: Vec<Binding>) -> Self {
        Program { bindings }
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for binding in &self.bindings {
            writeln!(f, "define {}", binding)?;
        }
        Ok(())
    }
}

pub mod dsl {
    use std::rc::Rc;

    use super::{Atom, Binding, CaseAlt, Expr, LambdaForm, Program};

    pub fn var<T: AsRef<str>>(name: T) -> Atom {
        Atom::Var(name.as_ref().to_string())
    }

    pub fn lit(n: i64) -> Atom {
        Atom::Lit(n)
    }

    pub fn app<T: AsRef<str>>(callable: T, args: Vec<Atom>) -> Rc<Expr> {
        Rc::new(Expr::App {
            callable: callable.as_ref().to_string(),
            args,
        })
    }

    pub fn con<T: AsRef<str>>(name: T, args: Vec<Atom>) -> Rc<Expr> {
        Rc::new(Expr::Con {
            name: name.as_ref().to_string(),
            args,
        })
    }

    pub fn num(n: i64) -> Rc<Expr> {
        Rc::new(Expr::Lit(n))
    }

    pub fn let_(bindings: Vec<Binding>, body: Rc<Expr>) -> Rc<Expr> {
        Rc::new(Expr::Let {
            rec: false,
            bindings,
            body,
        })
    }

    pub fn letrec_(bindings: Vec<Binding>, body: Rc<Expr>) -> Rc<Expr> {
        Rc::new(Expr::Let {
            rec: true,
            bindings,
            body,
        })
    }

    pub fn case_(scrutinee: Rc<Expr>, alts: Vec<CaseAlt>) -> Rc<Expr> {
        Rc::new(Expr::Case { scrutinee, alts })
    }

    pub fn alt_con<T: AsRef<str>>(name: T, binders: Vec<&str>, body: Rc<Expr>) -> CaseAlt {
        CaseAlt::Con {
            name: name.as_ref().to_string(),
            binders: binders.iter().map(|b| b.to_string()).collect(),
            body,
        }
    }

    pub fn alt_lit(value: i64, body: Rc<Expr>) -> CaseAlt {
        CaseAlt::Lit { value, body }
    }

    pub fn alt_var<T: AsRef<str>>(binder: T, body: Rc<Expr>) -> CaseAlt {
        CaseAlt::Var {
            binder: binder.as_ref().to_string(),
            body,
        }
    }

    pub fn names(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|n| n.to_string()).collect()
    }

    pub fn lambda(free: &[&str], bound: &[&str], body: Rc<Expr>) -> LambdaForm {
        LambdaForm::lambda(names(free), names(bound), body)
    }

    pub fn thunk(free: &[&str], body: Rc<Expr>) -> LambdaForm {
        LambdaForm::thunk(names(free), body)
    }

    pub fn binding<T: AsRef<str>>(name: T, lambda: LambdaForm) -> Binding {
        Binding::new(name, lambda)
    }

    pub fn program(bindings: Vec<Binding>) -> Program {
        Program::new(bindings)
    }
}

/// Example programs for use in tests
#[cfg(test)]
pub mod ex {
    use super::dsl::*;
    use super::Program;

    /// main = id {1}
    pub fn identity_applied() -> Program {
        program(vec![
            binding("main", thunk(&[], app("id", vec![lit(1)]))),
            binding("id", lambda(&[], &["x"], app("x", vec![]))),
        ])
    }

    /// main = plus# {2, 3}
    pub fn primitive_add() -> Program {
        program(vec![binding(
            "main",
            thunk(&[], app("plus#", vec![lit(2), lit(3)])),
        )])
    }

    /// main = case True {} of { True {} -> 1; False {} -> 0 }
    pub fn case_on_constructor() -> Program {
        program(vec![binding(
            "main",
            thunk(
                &[],
                case_(
                    con("True", vec![]),
                    vec![
                        alt_con("True", vec![], num(1)),
                        alt_con("False", vec![], num(0)),
                    ],
                ),
            ),
        )])
    }

    /// main = bogus {}
    pub fn unbound_variable() -> Program {
        program(vec![binding("main", thunk(&[], app("bogus", vec![])))])
    }
}

#[cfg(test)]
mod tests {
    use super::dsl::*;

    #[test]
    fn test_display_round_trips_source_forms() {
        let lf = lambda(&["f"], &["x", "y"], app("f", vec![var("y"), var("x")]));
        assert_eq!(format!("{}", lf), "{f} \\n {x, y} -> f {y, x}");

        let thk = thunk(&[], app("plus#", vec![lit(2), lit(3)]));
        assert_eq!(format!("{}", thk), "{} \\u {} -> plus# {2, 3}");
    }

    #[test]
    fn test_display_case() {
        let expr = case_(
            con("True", vec![]),
            vec![
                alt_con("True", vec![], num(1)),
                alt_con("False", vec![], num(0)),
            ],
        );
        assert_eq!(
            format!("{}", expr),
            "case True {} of {True {} -> 1; False {} -> 0}"
        );
    }
}
