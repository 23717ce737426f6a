use crate::cli::output::{confirm, Output};
use crate::errors::Result;
use crate::git::{ensure_supported, GitCli, GraphQueries, RefScope, Vcs};
use crate::stack::ObsolescenceOracle;
use tracing::warn;

/// Delete local branches whose remote tracking ref has vanished.
pub fn run_local(dry_run: bool) -> Result<()> {
    let git = GitCli::new();
    ensure_supported(&git)?;

    git.fetch(true)?;
    let gone = git.branches_with_gone_upstream()?;
    if gone.is_empty() {
        Output::info("No branches with a gone upstream");
        return Ok(());
    }

    let current = git.current_branch()?;
    for branch in gone {
        if Some(&branch) == current.as_ref() {
            Output::warning(format!("{branch} is checked out; not deleting"));
            continue;
        }
        if dry_run {
            Output::bullet(format!("would delete {branch}"));
            continue;
        }
        match git.delete_branch(&branch, true) {
            Ok(()) => Output::success(format!("Deleted {branch}")),
            Err(e) => warn!("could not delete {branch}: {e}"),
        }
    }
    Ok(())
}

/// Delete remote branches under `prefix` whose content already landed in
/// the remote target.
pub fn run_remote(prefix: &str, target: &str, dry_run: bool, assume_yes: bool) -> Result<()> {
    let git = GitCli::new();
    ensure_supported(&git)?;

    git.fetch(true)?;
    let remote_target = format!("origin/{target}");
    git.resolve(&remote_target)?;

    let graph = GraphQueries::new(&git);
    let oracle = ObsolescenceOracle::new(&graph);

    let mut obsolete = Vec::new();
    for remote_ref in git.list_refs(prefix, RefScope::Remote)? {
        if remote_ref == remote_target {
            continue;
        }
        if oracle.is_obsolete(&remote_ref, &remote_target)? {
            obsolete.push(
                remote_ref
                    .strip_prefix("origin/")
                    .unwrap_or(&remote_ref)
                    .to_string(),
            );
        }
    }

    if obsolete.is_empty() {
        Output::info(format!("No obsolete remote branches under '{prefix}'"));
        return Ok(());
    }

    Output::section(format!("Obsolete on origin ({})", obsolete.len()));
    for branch in &obsolete {
        Output::bullet(branch);
    }
    if dry_run {
        Output::info("Dry run; nothing deleted");
        return Ok(());
    }
    if !confirm(
        &format!("Delete {} remote branch(es)?", obsolete.len()),
        assume_yes,
    ) {
        Output::info("Keeping remote branches");
        return Ok(());
    }

    git.delete_remote(&obsolete)?;
    Output::success(format!("Deleted {} remote branch(es)", obsolete.len()));
    Ok(())
}
