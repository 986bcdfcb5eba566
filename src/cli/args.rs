//! Command line token sources
//!
//! Arguments come from the command line itself and from response files. A
//! token of the form `@<path>` is replaced by the whitespace separated tokens
//! of the file at `<path>`, which may in turn reference further files.

use crate::error::{PrepError, PrepResult};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Prefix marking a response file reference
pub const RESPONSE_FILE_PREFIX: char = '@';

/// Expand every `@<path>` token in place.
///
/// Tokens keep their order: earlier tokens, then the file's tokens, then
/// later tokens. A response file that includes itself, directly or through
/// another file, is rejected.
pub fn expand_response_files<S: AsRef<str>>(tokens: &[S]) -> PrepResult<Vec<String>> {
    let mut expanded = Vec::with_capacity(tokens.len());
    let mut stack = Vec::new();
    for token in tokens {
        expand_token(token.as_ref(), &mut stack, &mut expanded)?;
    }
    Ok(expanded)
}

fn expand_token(token: &str, stack: &mut Vec<PathBuf>, out: &mut Vec<String>) -> PrepResult<()> {
    let Some(path) = token.strip_prefix(RESPONSE_FILE_PREFIX) else {
        out.push(token.to_string());
        return Ok(());
    };

    let canonical = std::fs::canonicalize(path).map_err(|e| {
        PrepError::ArgumentParsing(format!("cannot read response file {}: {}", path, e))
    })?;
    if stack.contains(&canonical) {
        return Err(PrepError::ArgumentParsing(format!(
            "response file {} includes itself",
            path
        )));
    }

    let tokens = read_args_from_file(path)?;
    debug!("Read {} argument(s) from response file {}", tokens.len(), path);

    stack.push(canonical);
    for nested in &tokens {
        expand_token(nested, stack, out)?;
    }
    stack.pop();
    Ok(())
}

/// Read the whitespace separated tokens of a response file.
///
/// The path must name an existing regular file.
pub fn read_args_from_file(path: impl AsRef<Path>) -> PrepResult<Vec<String>> {
    let path = path.as_ref();

    if !path.is_file() {
        return Err(PrepError::ArgumentParsing(format!(
            "response file {} does not exist or is not a regular file",
            path.display()
        )));
    }

    let content = std::fs::read_to_string(path).map_err(|e| {
        PrepError::ArgumentParsing(format!(
            "cannot read response file {}: {}",
            path.display(),
            e
        ))
    })?;

    Ok(content.split_whitespace().map(str::to_string).collect())
}
