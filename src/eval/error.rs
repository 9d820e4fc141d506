//! Execution errors
use crate::eval::machine::env::{GlobalEnv, LocalEnv, Value};
use crate::eval::machine::heap::Address;
use codespan_reporting::diagnostic::Diagnostic;
use thiserror::Error;

/// Edit distance between two identifier names
///
/// Single-vector dynamic programming; identifiers are short so this
/// only ever runs over a handful of characters.
pub fn edit_distance(from: &str, to: &str) -> usize {
    let target: Vec<char> = to.chars().collect();
    if from.is_empty() || target.is_empty() {
        return from.chars().count().max(target.len());
    }

    // costs[j] holds the distance from the prefix consumed so far to
    // the first j characters of the target
    let mut costs: Vec<usize> = (0..=target.len()).collect();

    for (i, fc) in from.chars().enumerate() {
        let mut diagonal = costs[0];
        costs[0] = i + 1;
        for (j, tc) in target.iter().enumerate() {
            let substituted = if fc == *tc { diagonal } else { diagonal + 1 };
            diagonal = costs[j + 1];
            costs[j + 1] = substituted.min(diagonal + 1).min(costs[j] + 1);
        }
    }

    costs[target.len()]
}

/// Bound names within a small edit distance of the target, closest
/// first, ties broken alphabetically
pub fn similar_names(target: &str, candidates: &[String]) -> Vec<String> {
    const MAX_DISTANCE: usize = 2;
    const MAX_SUGGESTIONS: usize = 3;

    let mut ranked: Vec<(usize, String)> = candidates
        .iter()
        .filter(|candidate| candidate.as_str() != target)
        .map(|candidate| (edit_distance(target, candidate), candidate.clone()))
        .filter(|(distance, _)| *distance <= MAX_DISTANCE)
        .collect();

    ranked.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
    ranked.truncate(MAX_SUGGESTIONS);
    ranked.into_iter().map(|(_, name)| name).collect()
}

/// Format an environment lookup failure, including suggestions drawn
/// from the names visible in both environments
fn format_env_lookup(name: &str, locals: &LocalEnv, globals: &GlobalEnv) -> String {
    let mut candidates = locals.names();
    candidates.extend(globals.names());
    let mut message = format!("variable '{name}' not bound in local or global environment");
    let hints = similar_names(name, &candidates);
    if !hints.is_empty() {
        let quoted: Vec<String> = hints.iter().map(|h| format!("'{h}'")).collect();
        message.push_str(&format!("\n  help: similar names: {}", quoted.join(", ")));
    }
    message
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    #[error("unable to find main binding")]
    UnableToFindMain,
    #[error("{}", format_env_lookup(.name, .locals, .globals))]
    EnvLookupFailed {
        name: String,
        locals: LocalEnv,
        globals: GlobalEnv,
    },
    #[error("address {0} not present in heap of size {1}")]
    HeapLookupFailed(Address, usize),
    #[error("update of address {0} which holds no previous value")]
    HeapUpdateHasNoPreviousValue(Address),
    #[error("needed {0} arguments but stack held {1}")]
    NotEnoughArgsOnStack(usize, usize),
    #[error("alternatives carry no variable default")]
    CaseAltsHasNoVariable,
    #[error("alternatives carry more than one variable default")]
    CaseAltsHasMoreThanOneVariable,
    #[error("more than one alternative matches the scrutinised value")]
    CaseAltsOverlappingPatterns,
    #[error("return found no continuation and no applicable update frame")]
    ReturnStackEmpty,
    #[error("integer return into constructor alternatives")]
    ExpectedCaseAltInt,
    #[error("constructor return into integer alternatives")]
    ExpectedCaseAltConstructor,
    #[error("no alternative matches integer {0}")]
    NoMatchingAltPatternInt(i64),
    #[error("no alternative matches constructor {0}")]
    NoMatchingAltPatternConstructor(String),
    #[error("partial application with no update frame to rewrite")]
    UpdateStackEmpty,
    #[error("updatable closure at {0} has bound variables")]
    UpdatableClosureWithArgs(Address),
    #[error("intrinsic {0} requires primitive int arguments, received {1}")]
    IntrinsicBadArgument(String, Value),
    #[error("constructor {0} carries {2} values but pattern binds {1}")]
    ConstructorArityMismatch(String, usize, usize),
    #[error("arithmetic overflow in {0} ({1}, {2})")]
    ArithmeticOverflow(&'static str, i64, i64),
    #[error("division by zero")]
    DivisionByZero,
    #[error("machine stepped before initialisation")]
    UninitializedCode,
    #[error("machine did not terminate after {0} steps")]
    DidntTerminate(usize),
}

impl ExecutionError {
    pub fn to_diagnostic(&self) -> Diagnostic<usize> {
        Diagnostic::error().with_message(format!("{}", self))
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;

    #[test]
    fn test_edit_distance() {
        assert_eq!(edit_distance("", "abc"), 3);
        assert_eq!(edit_distance("abc", ""), 3);
        assert_eq!(edit_distance("abc", "abc"), 0);
        assert_eq!(edit_distance("kitten", "sitting"), 3);
        assert_eq!(edit_distance("mian", "main"), 2);
    }

    #[test]
    fn test_similar_names() {
        let candidates = vec![
            "main".to_string(),
            "plus#".to_string(),
            "swap".to_string(),
        ];
        assert_eq!(similar_names("mian", &candidates), vec!["main"]);
        assert!(similar_names("unrelated", &candidates).is_empty());
        // an exact hit is not a suggestion
        assert!(similar_names("swap", &candidates).is_empty());
    }

    #[test]
    fn test_env_lookup_failure_includes_hint() {
        use crate::eval::machine::env::{GlobalEnv, LocalEnv};
        use crate::eval::machine::heap::Heap;
        use crate::syntax::ast::dsl::*;
        use crate::syntax::ast::LambdaForm;

        let mut globals = GlobalEnv::default();
        let mut heap = Heap::default();
        let closure = crate::eval::machine::env::Closure::new(
            LambdaForm::thunk(vec![], num(1)),
            vec![],
        );
        globals.insert("main", heap.allocate(closure));

        let err = ExecutionError::EnvLookupFailed {
            name: "mian".to_string(),
            locals: LocalEnv::default(),
            globals,
        };
        let message = format!("{}", err);
        assert!(message.contains("'mian' not bound"));
        assert!(message.contains("similar names: 'main'"));
    }
}
