//! The STG machine proper
//!
//! A small-step machine over a current code instruction, three stacks
//! (arguments, returns, updates), a heap of closures and the global
//! environment. Lazy evaluation with sharing comes from the update
//! rules: entering an updatable closure pushes an update frame, and
//! the returns that find no continuation pay the frame off by
//! overwriting the thunk's address with its evaluated form. Partial
//! applications pay frames off by closure rewriting instead.
use crate::eval::error::ExecutionError;
use crate::eval::machine::env::{
    lookup_atom, lookup_variable, Closure, GlobalEnv, LocalEnv, Value,
};
use crate::eval::machine::heap::{Address, Heap};
use crate::eval::machine::intrinsic;
use crate::eval::machine::metrics::Metrics;
use crate::eval::machine::stack::Stack;
use crate::syntax::ast::{Atom, Binding, CaseAlt, Expr, LambdaForm};
use itertools::Itertools;
use std::fmt;
use std::rc::Rc;

/// The current machine instruction
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Code {
    /// Evaluate an expression in a local environment
    Eval { expr: Rc<Expr>, locals: LocalEnv },
    /// Enter the closure at an address
    Enter(Address),
    /// A primitive integer has been produced
    ReturnInt(i64),
    /// A data constructor has been produced
    ReturnCon { name: String, values: Vec<Value> },
    /// Pre-startup sentinel
    #[default]
    Uninitialized,
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Code::Eval { expr, locals } => write!(f, "EVAL({} | {})", expr, locals),
            Code::Enter(address) => write!(f, "ENTER({})", address),
            Code::ReturnInt(n) => write!(f, "RETURNINT({})", n),
            Code::ReturnCon { name, values } => {
                write!(f, "RETURNCON({}, [{}])", name, values.iter().format(", "))
            }
            Code::Uninitialized => write!(f, "UNINITIALIZED"),
        }
    }
}

/// A case's pending alternatives plus the environment to evaluate the
/// chosen alternative in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Continuation {
    pub alts: Vec<CaseAlt>,
    pub locals: LocalEnv,
}

impl fmt::Display for Continuation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tags: Vec<String> = self
            .alts
            .iter()
            .map(|alt| match alt {
                CaseAlt::Con { name, .. } => name.clone(),
                CaseAlt::Lit { value, .. } => value.to_string(),
                CaseAlt::Var { .. } => "…".to_string(),
            })
            .collect();
        write!(f, "⑂<{}>", tags.join(","))
    }
}

/// Snapshot of argument and return stacks plus the address of the
/// thunk to update once evaluation reaches a value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateFrame {
    pub args: Stack<Value>,
    pub returns: Stack<Continuation>,
    pub address: Address,
}

impl fmt::Display for UpdateFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "☇[{}, a×{}, r×{}]",
            self.address,
            self.args.len(),
            self.returns.len()
        )
    }
}

/// Outcome of a single transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Stepped,
    Halted,
}

/// The unique variable-default alternative of a continuation
fn default_alternative(alts: &[CaseAlt]) -> Result<(&String, &Rc<Expr>), ExecutionError> {
    let mut defaults = alts.iter().filter_map(|alt| match alt {
        CaseAlt::Var { binder, body } => Some((binder, body)),
        _ => None,
    });
    match (defaults.next(), defaults.next()) {
        (Some(default), None) => Ok(default),
        (Some(_), Some(_)) => Err(ExecutionError::CaseAltsHasMoreThanOneVariable),
        (None, _) => Err(ExecutionError::CaseAltsHasNoVariable),
    }
}

/// The STG machine state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Machine {
    /// Current instruction
    code: Code,
    /// Pending function arguments
    args: Stack<Value>,
    /// Pending case continuations
    returns: Stack<Continuation>,
    /// Pending thunk updates
    updates: Stack<UpdateFrame>,
    /// All allocated closures
    heap: Heap,
    /// Top-level bindings
    globals: GlobalEnv,
    /// Execution counters
    metrics: Metrics,
    /// Whether to log a summary line per step
    trace_steps: bool,
    /// Accumulated step log
    log: Vec<String>,
    /// Counter for synthetic identifiers in standard closures
    fresh_names: usize,
}

impl Machine {
    pub fn new(heap: Heap, globals: GlobalEnv, code: Code) -> Self {
        Machine {
            code,
            args: Stack::new(),
            returns: Stack::new(),
            updates: Stack::new(),
            heap,
            globals,
            metrics: Metrics::default(),
            trace_steps: false,
            log: vec![],
            fresh_names: 0,
        }
    }

    /// Enable the step log
    pub fn with_step_log(mut self) -> Self {
        self.trace_steps = true;
        self
    }

    pub fn code(&self) -> &Code {
        &self.code
    }

    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    pub fn globals(&self) -> &GlobalEnv {
        &self.globals
    }

    pub fn args(&self) -> &Stack<Value> {
        &self.args
    }

    pub fn returns(&self) -> &Stack<Continuation> {
        &self.returns
    }

    pub fn updates(&self) -> &Stack<UpdateFrame> {
        &self.updates
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn steps(&self) -> u64 {
        self.metrics.ticks()
    }

    pub fn log(&self) -> &[String] {
        &self.log
    }

    /// Execute one transition
    pub fn step(&mut self) -> Result<Step, ExecutionError> {
        self.metrics.tick();
        self.metrics
            .stacks(self.args.len(), self.returns.len(), self.updates.len());
        if self.trace_steps {
            self.log.push(self.to_string());
        }

        match std::mem::take(&mut self.code) {
            Code::Eval { expr, locals } => self.eval(expr, locals),
            Code::Enter(address) => self.enter(address),
            Code::ReturnInt(n) => self.return_int(n),
            Code::ReturnCon { name, values } => self.return_con(name, values),
            Code::Uninitialized => Err(ExecutionError::UninitializedCode),
        }
    }

    fn eval(&mut self, expr: Rc<Expr>, locals: LocalEnv) -> Result<Step, ExecutionError> {
        match &*expr {
            Expr::App { callable, args } => self.eval_app(&expr, callable, args, locals),
            Expr::Let {
                rec,
                bindings,
                body,
            } => {
                self.metrics.alloc(bindings.len());
                let extended = if *rec {
                    self.allocate_letrec(bindings, &locals)?
                } else {
                    self.allocate_let(bindings, &locals)?
                };
                self.code = Code::Eval {
                    expr: body.clone(),
                    locals: extended,
                };
                Ok(Step::Stepped)
            }
            Expr::Case { scrutinee, alts } => {
                self.returns.push(Continuation {
                    alts: alts.clone(),
                    locals: locals.clone(),
                });
                self.code = Code::Eval {
                    expr: scrutinee.clone(),
                    locals,
                };
                Ok(Step::Stepped)
            }
            Expr::Con { name, args } => {
                let values = self.resolve_atoms(args, &locals)?;
                self.code = Code::ReturnCon {
                    name: name.clone(),
                    values,
                };
                Ok(Step::Stepped)
            }
            Expr::Lit(n) => {
                self.code = Code::ReturnInt(*n);
                Ok(Step::Stepped)
            }
        }
    }

    fn eval_app(
        &mut self,
        expr: &Rc<Expr>,
        callable: &str,
        args: &[Atom],
        locals: LocalEnv,
    ) -> Result<Step, ExecutionError> {
        if let Some(bif) = intrinsic::intrinsic(callable) {
            let mut operands = Vec::with_capacity(args.len());
            for atom in args {
                match lookup_atom(&locals, &self.globals, atom)? {
                    Value::Int(n) => operands.push(n),
                    value => {
                        return Err(ExecutionError::IntrinsicBadArgument(
                            callable.to_string(),
                            value,
                        ))
                    }
                }
            }
            let (left, right) = match operands.as_slice() {
                [left, right] => (*left, *right),
                _ => {
                    return Err(ExecutionError::NotEnoughArgsOnStack(2, operands.len()));
                }
            };
            self.code = Code::ReturnInt(bif.apply(left, right)?);
            return Ok(Step::Stepped);
        }

        match lookup_variable(&locals, &self.globals, callable)? {
            Value::Int(n) => {
                if args.is_empty() {
                    self.code = Code::ReturnInt(n);
                    Ok(Step::Stepped)
                } else {
                    // a non-function was applied; halt with the
                    // attempted application as terminal instruction
                    self.code = Code::Eval {
                        expr: expr.clone(),
                        locals,
                    };
                    Ok(Step::Halted)
                }
            }
            Value::Addr(address) => {
                // resolve left to right, push so the first argument
                // lands topmost
                let values = self.resolve_atoms(args, &locals)?;
                for value in values.into_iter().rev() {
                    self.args.push(value);
                }
                self.code = Code::Enter(address);
                Ok(Step::Stepped)
            }
        }
    }

    fn resolve_atoms(
        &self,
        atoms: &[Atom],
        locals: &LocalEnv,
    ) -> Result<Vec<Value>, ExecutionError> {
        atoms
            .iter()
            .map(|atom| lookup_atom(locals, &self.globals, atom))
            .collect()
    }

    /// Allocate non-recursive let bindings; free variables resolve
    /// against the outer environment only
    fn allocate_let(
        &mut self,
        bindings: &[Binding],
        locals: &LocalEnv,
    ) -> Result<LocalEnv, ExecutionError> {
        let mut closures = Vec::with_capacity(bindings.len());
        for binding in bindings {
            let free_values = binding
                .lambda
                .free()
                .iter()
                .map(|name| lookup_variable(locals, &self.globals, name))
                .collect::<Result<Vec<_>, _>>()?;
            closures.push(Closure::new(binding.lambda.clone(), free_values));
        }
        let mut extended = locals.clone();
        for (binding, closure) in bindings.iter().zip(closures) {
            let address = self.heap.allocate(closure);
            extended.bind(&binding.name, Value::Addr(address));
        }
        Ok(extended)
    }

    /// Allocate recursive let bindings: addresses are assigned before
    /// any closure is built so the whole group (each binding
    /// included) is in scope during capture
    fn allocate_letrec(
        &mut self,
        bindings: &[Binding],
        locals: &LocalEnv,
    ) -> Result<LocalEnv, ExecutionError> {
        let base = self.heap.len();
        let mut extended = locals.clone();
        for (i, binding) in bindings.iter().enumerate() {
            extended.bind(&binding.name, Value::Addr(Address::new(base + i)));
        }
        for binding in bindings {
            let free_values = binding
                .lambda
                .free()
                .iter()
                .map(|name| lookup_variable(&extended, &self.globals, name))
                .collect::<Result<Vec<_>, _>>()?;
            self.heap
                .allocate(Closure::new(binding.lambda.clone(), free_values));
        }
        Ok(extended)
    }

    fn enter(&mut self, address: Address) -> Result<Step, ExecutionError> {
        let closure = self.heap.lookup(address)?.clone();
        let lambda = closure.lambda();

        if lambda.update() {
            // thunk entry: defer the update, clear the stacks
            if lambda.arity() > 0 {
                return Err(ExecutionError::UpdatableClosureWithArgs(address));
            }
            let locals = closure.free_env();
            let frame = UpdateFrame {
                args: self.args.drain(),
                returns: self.returns.drain(),
                address,
            };
            self.updates.push(frame);
            self.code = Code::Eval {
                expr: lambda.body().clone(),
                locals,
            };
            return Ok(Step::Stepped);
        }

        let arity = lambda.arity();
        if self.args.len() >= arity {
            let taken = self
                .args
                .take(arity)
                .map_err(|available| ExecutionError::NotEnoughArgsOnStack(arity, available))?;
            let mut locals = closure.free_env();
            for (name, value) in lambda.bound().iter().zip(taken) {
                locals.bind(name, value);
            }
            self.code = Code::Eval {
                expr: lambda.body().clone(),
                locals,
            };
            Ok(Step::Stepped)
        } else {
            self.rewrite_partial_application(address, &closure)
        }
    }

    /// Partial application: rewrite the pending update frame's
    /// closure into a curried form that has absorbed the supplied
    /// arguments, restore the frame's stacks beneath the current
    /// ones, and re-enter
    fn rewrite_partial_application(
        &mut self,
        address: Address,
        closure: &Closure,
    ) -> Result<Step, ExecutionError> {
        let frame = self
            .updates
            .pop()
            .ok_or(ExecutionError::UpdateStackEmpty)?;

        let lambda = closure.lambda();
        let supplied = self.args.len();

        let mut free = lambda.free().to_vec();
        free.extend(lambda.bound()[..supplied].iter().cloned());
        let remaining = lambda.bound()[supplied..].to_vec();

        let mut free_values = closure.free_values().to_vec();
        free_values.extend(self.args.iter_top().copied());

        let rewritten = Closure::new(
            LambdaForm::lambda(free, remaining, lambda.body().clone()),
            free_values,
        );
        self.heap.update(frame.address, rewritten)?;

        self.args.restore_under(frame.args);
        self.returns = frame.returns;
        self.code = Code::Enter(address);
        Ok(Step::Stepped)
    }

    fn return_int(&mut self, n: i64) -> Result<Step, ExecutionError> {
        match self.returns.pop() {
            Some(Continuation { alts, locals }) => {
                if alts.iter().any(|alt| matches!(alt, CaseAlt::Con { .. })) {
                    return Err(ExecutionError::ExpectedCaseAltInt);
                }
                let mut matching = alts
                    .iter()
                    .filter(|alt| matches!(alt, CaseAlt::Lit { value, .. } if *value == n));
                let first = matching.next();
                if matching.next().is_some() {
                    return Err(ExecutionError::CaseAltsOverlappingPatterns);
                }
                match first {
                    Some(CaseAlt::Lit { body, .. }) => {
                        self.code = Code::Eval {
                            expr: body.clone(),
                            locals,
                        };
                        Ok(Step::Stepped)
                    }
                    _ => match default_alternative(&alts) {
                        Ok((binder, body)) => {
                            let mut locals = locals;
                            locals.bind(binder, Value::Int(n));
                            self.code = Code::Eval {
                                expr: body.clone(),
                                locals,
                            };
                            Ok(Step::Stepped)
                        }
                        Err(ExecutionError::CaseAltsHasNoVariable) => {
                            Err(ExecutionError::NoMatchingAltPatternInt(n))
                        }
                        Err(e) => Err(e),
                    },
                }
            }
            None => match self.updates.pop() {
                None => {
                    self.code = Code::ReturnInt(n);
                    Ok(Step::Halted)
                }
                Some(frame) => {
                    // update the thunk with a standard integer closure
                    if !self.args.is_empty() {
                        return Err(ExecutionError::ReturnStackEmpty);
                    }
                    self.args = frame.args;
                    self.returns = frame.returns;
                    let standard =
                        Closure::new(LambdaForm::lambda(vec![], vec![], Rc::new(Expr::Lit(n))), vec![]);
                    self.heap.update(frame.address, standard)?;
                    self.code = Code::ReturnInt(n);
                    Ok(Step::Stepped)
                }
            },
        }
    }

    fn return_con(&mut self, name: String, values: Vec<Value>) -> Result<Step, ExecutionError> {
        match self.returns.pop() {
            Some(Continuation { alts, locals }) => {
                if alts.iter().any(|alt| matches!(alt, CaseAlt::Lit { .. })) {
                    return Err(ExecutionError::ExpectedCaseAltConstructor);
                }
                let mut matching = alts
                    .iter()
                    .filter(|alt| matches!(alt, CaseAlt::Con { name: n, .. } if *n == name));
                let first = matching.next();
                if matching.next().is_some() {
                    return Err(ExecutionError::CaseAltsOverlappingPatterns);
                }
                match first {
                    Some(CaseAlt::Con { binders, body, .. }) => {
                        if binders.len() != values.len() {
                            return Err(ExecutionError::ConstructorArityMismatch(
                                name,
                                binders.len(),
                                values.len(),
                            ));
                        }
                        let mut locals = locals;
                        for (binder, value) in binders.iter().zip(&values) {
                            locals.bind(binder, *value);
                        }
                        self.code = Code::Eval {
                            expr: body.clone(),
                            locals,
                        };
                        Ok(Step::Stepped)
                    }
                    _ => match default_alternative(&alts) {
                        Ok((binder, body)) => {
                            // the default variable sees the
                            // constructor as an allocated value
                            let standard = self.standard_constructor(&name, &values);
                            let address = self.heap.allocate(standard);
                            self.metrics.alloc(1);
                            let mut locals = locals;
                            locals.bind(binder, Value::Addr(address));
                            self.code = Code::Eval {
                                expr: body.clone(),
                                locals,
                            };
                            Ok(Step::Stepped)
                        }
                        Err(ExecutionError::CaseAltsHasNoVariable) => {
                            Err(ExecutionError::NoMatchingAltPatternConstructor(name))
                        }
                        Err(e) => Err(e),
                    },
                }
            }
            None => match self.updates.pop() {
                None => {
                    self.code = Code::ReturnCon { name, values };
                    Ok(Step::Halted)
                }
                Some(frame) => {
                    // snapshot the evaluated constructor into the
                    // thunk's slot
                    if !self.args.is_empty() {
                        return Err(ExecutionError::ReturnStackEmpty);
                    }
                    self.args = frame.args;
                    self.returns = frame.returns;
                    let standard = self.standard_constructor(&name, &values);
                    self.heap.update(frame.address, standard)?;
                    self.code = Code::ReturnCon { name, values };
                    Ok(Step::Stepped)
                }
            },
        }
    }

    /// A `\n {v1, …, vk} -> Con {v1, …, vk}` closure capturing
    /// already-evaluated constructor values under fresh synthetic
    /// identifiers
    fn standard_constructor(&mut self, name: &str, values: &[Value]) -> Closure {
        let ids: Vec<String> = (0..values.len())
            .map(|i| format!("$v{}", self.fresh_names + i))
            .collect();
        self.fresh_names += values.len();
        let atoms = ids.iter().map(|id| Atom::Var(id.clone())).collect();
        Closure::new(
            LambdaForm::lambda(
                ids,
                vec![],
                Rc::new(Expr::Con {
                    name: name.to_string(),
                    args: atoms,
                }),
            ),
            values.to_vec(),
        )
    }

    /// Run until the machine halts
    pub fn run(&mut self) -> Result<&Code, ExecutionError> {
        loop {
            if let Step::Halted = self.step()? {
                return Ok(&self.code);
            }
        }
    }

    /// Run, limiting execution to `limit` steps
    pub fn safe_run(&mut self, limit: usize) -> Result<&Code, ExecutionError> {
        let mut taken = 0;
        loop {
            if taken >= limit {
                return Err(ExecutionError::DidntTerminate(limit));
            }
            if let Step::Halted = self.step()? {
                return Ok(&self.code);
            }
            taken += 1;
        }
    }

    /// Step to completion collecting a snapshot of the machine after
    /// every transition, the initial configuration first
    pub fn trace(&mut self, limit: Option<usize>) -> (Vec<Machine>, Option<ExecutionError>) {
        let mut states = vec![self.clone()];
        let mut taken = 0;
        loop {
            if let Some(limit) = limit {
                if taken >= limit {
                    return (states, Some(ExecutionError::DidntTerminate(limit)));
                }
            }
            match self.step() {
                Ok(Step::Stepped) => {
                    states.push(self.clone());
                    taken += 1;
                }
                Ok(Step::Halted) => {
                    states.push(self.clone());
                    return (states, None);
                }
                Err(e) => return (states, Some(e)),
            }
        }
    }
}

impl fmt::Display for Machine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "M[{}] ⟪{}⟫ A{} R{} U{}",
            self.steps(),
            self.code,
            self.args,
            self.returns,
            self.updates
        )
    }
}
