use crate::cli::output::Output;
use crate::errors::Result;
use crate::git::{ensure_supported, GitCli, RefScope, Vcs};
use crate::utils::Spinner;
use tracing::debug;

/// Push every local branch under `prefix` whose tip differs from the cached
/// remote ref. Extra options are passed straight through to `git push`.
pub fn run(prefix: &str, push_opts: &[String]) -> Result<()> {
    let git = GitCli::new();
    ensure_supported(&git)?;

    let branches = git.list_refs(prefix, RefScope::Local)?;
    if branches.is_empty() {
        Output::info(format!("No branches match '{prefix}'"));
        return Ok(());
    }

    let mut to_push = Vec::new();
    for branch in branches {
        let local = git.resolve(&branch)?;
        match git.resolve(&format!("origin/{branch}")) {
            Ok(remote) if remote == local => {
                debug!("{branch} matches its remote; skipping");
            }
            _ => to_push.push(branch),
        }
    }

    if to_push.is_empty() {
        Output::info("Every matching branch is up to date with origin");
        return Ok(());
    }

    for branch in &to_push {
        Output::bullet(branch);
    }
    let spinner = Spinner::new(format!("Pushing {} branch(es)", to_push.len()));
    let pushed = git.push(&to_push, push_opts);
    spinner.stop();
    pushed?;

    Output::success(format!("Pushed {} branch(es)", to_push.len()));
    Ok(())
}
