//! Prepare and execute STG programs per the command line
use crate::common::prettify::prettify;
use crate::driver::error::StgError;
use crate::driver::options::{Input, Mode, StgiCli};
use crate::driver::statistics::Statistics;
use crate::eval::machine::compiler;
use crate::eval::machine::vm::{Code, Machine};
use crate::syntax::ast::{Binding, LambdaForm, Program};
use crate::syntax::parser;
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term::{
    self,
    termcolor::{ColorChoice, StandardStream},
};
use std::time::Instant;

/// Execute per the command line, printing output and diagnostics;
/// returns the process exit code
pub fn execute(cli: &StgiCli) -> i32 {
    let (files, loaded) = load(cli);
    let program = match loaded {
        Ok(program) => program,
        Err(e) => {
            report(&files, &e);
            return 2;
        }
    };

    match cli.mode() {
        Mode::Dump => {
            print!("{}", prettify(&program));
            0
        }
        Mode::Run => run_program(cli, &files, &program),
        Mode::Trace => trace_program(cli, &files, &program),
    }
}

/// Read and parse the requested input; an expression becomes the body
/// of a synthesized `main`
pub fn load(cli: &StgiCli) -> (SimpleFiles<String, String>, Result<Program, StgError>) {
    let mut files = SimpleFiles::new();
    let result = load_into(&mut files, cli);
    (files, result)
}

fn load_into(
    files: &mut SimpleFiles<String, String>,
    cli: &StgiCli,
) -> Result<Program, StgError> {
    match cli.source()? {
        Input::File(path) => {
            let text = std::fs::read_to_string(&path)
                .map_err(|_| StgError::FileCouldNotBeRead(path.display().to_string()))?;
            let id = files.add(path.display().to_string(), text);
            Ok(parser::parse_program(files, id)?)
        }
        Input::Expression(text) => {
            let id = files.add("<expression>".to_string(), text);
            let body = parser::parse_expression(files, id)?;
            Ok(Program::new(vec![Binding::new(
                "main",
                LambdaForm::thunk(vec![], body),
            )]))
        }
    }
}

fn run_program(cli: &StgiCli, files: &SimpleFiles<String, String>, program: &Program) -> i32 {
    let mut machine = match compiler::compile(program) {
        Ok(machine) => machine,
        Err(e) => {
            report(files, &StgError::from(e));
            return 1;
        }
    };
    if cli.log {
        machine = machine.with_step_log();
    }

    let started = Instant::now();
    let outcome = match cli.limit {
        Some(limit) => machine.safe_run(limit).map(Code::clone),
        None => machine.run().map(Code::clone),
    };
    let elapsed = started.elapsed();

    let exit = match outcome {
        Ok(code) => {
            println!("{}", code);
            0
        }
        Err(e) => {
            for line in machine.log() {
                eprintln!("{}", line);
            }
            report(files, &StgError::from(e));
            1
        }
    };

    if cli.statistics {
        eprint!("{}", statistics(&machine, elapsed));
    }
    exit
}

fn trace_program(cli: &StgiCli, files: &SimpleFiles<String, String>, program: &Program) -> i32 {
    let mut machine = match compiler::compile(program) {
        Ok(machine) => machine,
        Err(e) => {
            report(files, &StgError::from(e));
            return 1;
        }
    };

    let started = Instant::now();
    let (states, error) = machine.trace(cli.limit);
    let elapsed = started.elapsed();

    for state in &states {
        println!("{}", prettify(state));
    }

    let exit = match error {
        None => 0,
        Some(e) => {
            report(files, &StgError::from(e));
            1
        }
    };

    if cli.statistics {
        eprint!("{}", statistics(&machine, elapsed));
    }
    exit
}

fn statistics(machine: &Machine, elapsed: std::time::Duration) -> Statistics {
    let mut stats = Statistics::default();
    stats.record_metrics(machine.metrics());
    stats.set_heap_size(machine.heap().len());
    stats.timings_mut().record("execute", elapsed);
    stats
}

/// Print a diagnostic for the error against the file database
fn report(files: &SimpleFiles<String, String>, error: &StgError) {
    let diagnostic = error.to_diagnostic();
    let writer = StandardStream::stderr(ColorChoice::Auto);
    let config = term::Config::default();
    let _ = term::emit(&mut writer.lock(), &config, files, &diagnostic);
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_load_expression_synthesizes_main() {
        let cli = StgiCli::parse_from(["stgi", "-e", "plus# {2, 3}"]);
        let (_files, loaded) = load(&cli);
        let program = loaded.unwrap();
        assert_eq!(program.bindings.len(), 1);
        assert_eq!(program.bindings[0].name, "main");
        assert!(program.bindings[0].lambda.update());
        assert_eq!(program.bindings[0].lambda.arity(), 0);
    }

    #[test]
    fn test_load_missing_file() {
        let cli = StgiCli::parse_from(["stgi", "/no/such/file.stg"]);
        let (_files, loaded) = load(&cli);
        assert!(matches!(loaded, Err(StgError::FileCouldNotBeRead(_))));
    }

    #[test]
    fn test_expression_pipeline_runs_to_final_code() {
        let cli = StgiCli::parse_from(["stgi", "-e", "plus# {2, 3}"]);
        let (_files, loaded) = load(&cli);
        let mut machine = compiler::compile(&loaded.unwrap()).unwrap();
        machine.safe_run(100).unwrap();
        assert_eq!(*machine.code(), Code::ReturnInt(5));
    }
}
