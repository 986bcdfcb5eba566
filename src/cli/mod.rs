//! Command line interface

pub mod args;
pub mod commands;
pub mod parser;
pub mod summary;

pub use args::{expand_response_files, read_args_from_file};
pub use parser::{usage, ConfigParser};

use crate::config::Config;
use crate::error::PrepResult;

/// What the binary was asked to do
#[derive(Debug)]
pub enum Invocation {
    Help,
    Version,
    Run(Config),
}

/// Decide what to do with the raw process arguments.
///
/// `--help`/`-h` and `--version`/`-V` win over everything else and are only
/// recognised on the command line itself, not inside response files.
pub fn invocation<S: AsRef<str>>(args: &[S]) -> PrepResult<Invocation> {
    let tokens: Vec<&str> = args.iter().map(|t| t.as_ref()).collect();

    if tokens.iter().any(|t| *t == "-h" || t.eq_ignore_ascii_case("--help")) {
        return Ok(Invocation::Help);
    }
    if tokens.iter().any(|t| *t == "-V" || t.eq_ignore_ascii_case("--version")) {
        return Ok(Invocation::Version);
    }

    ConfigParser::new()
        .parse_command_line(Some(args))
        .map(Invocation::Run)
}
