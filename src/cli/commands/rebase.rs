use crate::cli::commands::print_summary;
use crate::cli::output::Output;
use crate::errors::{RestackError, Result};
use crate::git::GitCli;
use crate::stack::RebaseEngine;

pub fn run(prefix: &str, onto: &str, assume_yes: bool) -> Result<()> {
    let git = GitCli::new();
    let engine = RebaseEngine::new(&git);

    let outcome = engine.rebase_prefix(prefix, onto, assume_yes)?;
    print_summary(&outcome);

    if outcome.has_failures() {
        return Err(RestackError::rebase(format!(
            "{} stack(s) could not be rebased onto {onto}",
            outcome.failed.len()
        )));
    }
    if !outcome.is_empty() {
        Output::success(format!("All stacks up to date with {onto}"));
    }
    Ok(())
}
