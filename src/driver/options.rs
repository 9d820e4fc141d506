//! Command line argument handling with clap v4 and subcommands.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::driver::error::StgError;

/// stgi - an interpreter for the spineless tagless G-machine
#[derive(Parser, Debug, Clone)]
#[command(name = "stgi")]
#[command(about = "An interpreter for the spineless tagless G-machine")]
#[command(version)]
pub struct StgiCli {
    /// Print execution statistics to stderr before exiting
    #[arg(short = 'S', long = "statistics")]
    pub statistics: bool,

    /// Print the step log when execution fails
    #[arg(long = "log")]
    pub log: bool,

    /// Abandon execution after this many steps
    #[arg(short = 'l', long = "limit")]
    pub limit: Option<usize>,

    #[command(subcommand)]
    pub command: Option<Commands>,

    #[command(flatten)]
    pub input: InputArgs,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run a program to its final state (default)
    Run(InputArgs),
    /// Print every machine state as execution proceeds
    Trace(InputArgs),
    /// Parse and pretty print a program without running it
    Dump(InputArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct InputArgs {
    /// File to process
    #[arg(value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Expression to evaluate as the body of `main` in place of a file
    #[arg(short = 'e', long = "evaluate")]
    pub evaluate: Option<String>,
}

/// The source text to interpret
#[derive(Debug, Clone)]
pub enum Input {
    File(PathBuf),
    Expression(String),
}

/// What the driver has been asked to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Run,
    Trace,
    Dump,
}

impl StgiCli {
    pub fn mode(&self) -> Mode {
        match &self.command {
            Some(Commands::Trace(_)) => Mode::Trace,
            Some(Commands::Dump(_)) => Mode::Dump,
            _ => Mode::Run,
        }
    }

    fn input_args(&self) -> &InputArgs {
        match &self.command {
            Some(Commands::Run(args)) | Some(Commands::Trace(args)) | Some(Commands::Dump(args)) => {
                args
            }
            None => &self.input,
        }
    }

    /// Resolve the source to interpret, expressions taking precedence
    pub fn source(&self) -> Result<Input, StgError> {
        let args = self.input_args();
        if let Some(text) = &args.evaluate {
            Ok(Input::Expression(text.clone()))
        } else if let Some(path) = &args.file {
            Ok(Input::File(path.clone()))
        } else {
            Err(StgError::NoInput)
        }
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;

    #[test]
    fn test_default_mode_is_run() {
        let cli = StgiCli::parse_from(["stgi", "program.stg"]);
        assert_eq!(cli.mode(), Mode::Run);
        assert!(matches!(cli.source(), Ok(Input::File(_))));
    }

    #[test]
    fn test_trace_subcommand() {
        let cli = StgiCli::parse_from(["stgi", "trace", "program.stg"]);
        assert_eq!(cli.mode(), Mode::Trace);
        assert!(matches!(cli.source(), Ok(Input::File(_))));
    }

    #[test]
    fn test_evaluate_expression() {
        let cli = StgiCli::parse_from(["stgi", "run", "-e", "plus# {2, 3}"]);
        assert_eq!(cli.mode(), Mode::Run);
        assert!(matches!(cli.source(), Ok(Input::Expression(_))));
    }

    #[test]
    fn test_no_input() {
        let cli = StgiCli::parse_from(["stgi"]);
        assert!(matches!(cli.source(), Err(StgError::NoInput)));
    }

    #[test]
    fn test_limit_and_statistics_flags() {
        let cli = StgiCli::parse_from(["stgi", "-S", "--limit", "100", "program.stg"]);
        assert!(cli.statistics);
        assert_eq!(cli.limit, Some(100));
    }
}
