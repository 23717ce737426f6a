use crate::cli::output::{confirm, Output};
use crate::errors::Result;
use crate::git::{GraphQueries, RebaseOutcome, Vcs};
use crate::stack::obsolete::ObsolescenceOracle;
use crate::stack::render::render_stack;
use crate::stack::snapshot::RefSnapshot;
use crate::stack::sync_point::{find_sync_point, SyncPoint};
use crate::stack::topology::{find_cut_point, find_tips};
use crate::utils::Spinner;
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Batch result: one rendered stack tree per processed tip, partitioned by
/// what happened to it.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub updated: Vec<String>,
    pub skipped: Vec<String>,
    pub failed: Vec<String>,
}

impl BatchOutcome {
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.updated.is_empty() && self.skipped.is_empty() && self.failed.is_empty()
    }
}

/// What a tip should be rebased onto when neither a sync point nor a cut
/// point applies.
enum PlainFallback {
    /// `git rebase --update-refs <target> <tip>`
    Target(String),
    /// `git rebase --update-refs --onto <new> <old> <tip>` (evolve)
    Range { onto: String, upstream: String },
}

/// Orchestrates whole-batch rebases over a [`Vcs`] gateway.
pub struct RebaseEngine<'a, V: Vcs> {
    vcs: &'a V,
    graph: GraphQueries<'a, V>,
}

impl<'a, V: Vcs> RebaseEngine<'a, V> {
    pub fn new(vcs: &'a V) -> Self {
        RebaseEngine {
            vcs,
            graph: GraphQueries::new(vcs),
        }
    }

    /// Rebase every stack of local branches under `prefix` onto `target`.
    ///
    /// Preflight failures (unknown target, failing pull) abort before any
    /// snapshot or rebase. Conflicts abort only the affected stack; the
    /// batch continues and reports per-stack outcomes.
    pub fn rebase_prefix(
        &self,
        prefix: &str,
        target: &str,
        assume_yes: bool,
    ) -> Result<BatchOutcome> {
        crate::git::ensure_supported(self.vcs)?;
        let start_branch = self.vcs.current_branch()?;
        let result = self.rebase_prefix_inner(prefix, target, assume_yes);
        self.restore(&start_branch, Some(target));
        result
    }

    fn rebase_prefix_inner(
        &self,
        prefix: &str,
        target: &str,
        assume_yes: bool,
    ) -> Result<BatchOutcome> {
        self.vcs.resolve(target)?;
        self.vcs.checkout(target)?;
        if self.vcs.upstream_of(target)?.is_some() {
            let spinner = Spinner::new(format!("Updating {target} from upstream"));
            let pulled = self.vcs.pull_rebase();
            spinner.stop();
            pulled?;
        }

        let all: Vec<String> = self
            .vcs
            .list_refs(prefix, crate::git::RefScope::Local)?
            .into_iter()
            .filter(|b| b != target)
            .collect();
        if all.is_empty() {
            Output::info(format!("No branches match '{prefix}'"));
            return Ok(BatchOutcome::default());
        }

        let snapshot = RefSnapshot::capture(self.vcs, &all)?;
        let tips = find_tips(&self.graph, &all)?;
        info!("{} branches, {} stacks", all.len(), tips.len());

        let oracle = ObsolescenceOracle::new(&self.graph);
        let all_set: HashSet<&String> = all.iter().collect();
        let mut outcome = BatchOutcome::default();
        let mut kept: HashSet<String> = HashSet::new();
        let mut delete_candidates: HashSet<String> = HashSet::new();

        for tip in &tips {
            let members: Vec<String> = self
                .vcs
                .branches_merged_into(tip, Some(prefix))?
                .into_iter()
                .filter(|b| all_set.contains(b))
                .collect();

            if oracle.is_obsolete(tip, target)? {
                info!("stack {tip} is already merged into {target}");
                outcome
                    .skipped
                    .push(render_stack(&self.graph, tip, &members)?);
                delete_candidates.extend(members);
                continue;
            }

            let fallback = PlainFallback::Target(target.to_string());
            match self.rebase_tip(tip, &snapshot, &oracle, target, fallback)? {
                RebaseOutcome::Ok => {
                    kept.extend(members.iter().cloned());
                    outcome
                        .updated
                        .push(render_stack(&self.graph, tip, &members)?);
                }
                RebaseOutcome::Conflict { stderr } => {
                    warn!("rebase of {tip} hit conflicts: {stderr}");
                    self.abort_rebase(tip);
                    kept.extend(members.iter().cloned());
                    outcome
                        .failed
                        .push(render_stack(&self.graph, tip, &members)?);
                }
            }
        }

        // shared bases of surviving stacks must not be deleted
        let deletable: Vec<String> = {
            let mut d: Vec<String> = delete_candidates
                .into_iter()
                .filter(|b| !kept.contains(b))
                .collect();
            d.sort();
            d
        };
        if !deletable.is_empty() {
            self.delete_merged(&deletable, target, assume_yes);
        }

        Ok(outcome)
    }

    /// Rescue dependent branches after the current branch was amended or
    /// reset in place: replay everything that still builds on `old` onto
    /// the new head.
    pub fn evolve(&self, old_rev: Option<&str>, assume_yes: bool) -> Result<BatchOutcome> {
        crate::git::ensure_supported(self.vcs)?;
        let start_branch = self.vcs.current_branch()?;
        let result = self.evolve_inner(old_rev, assume_yes, &start_branch);
        self.restore(&start_branch, None);
        result
    }

    fn evolve_inner(
        &self,
        old_rev: Option<&str>,
        assume_yes: bool,
        start_branch: &Option<String>,
    ) -> Result<BatchOutcome> {
        let old = match old_rev {
            Some(rev) => self.vcs.resolve(rev)?,
            None => self.vcs.resolve("HEAD@{1}")?,
        };
        let new = self.vcs.resolve("HEAD")?;
        if old == new {
            Output::info("Old and new positions are identical; nothing to evolve");
            return Ok(BatchOutcome::default());
        }

        let mut candidates = Vec::new();
        for branch in self.vcs.branches_containing(&old)? {
            if Some(&branch) == start_branch.as_ref() {
                continue;
            }
            let id = self.vcs.resolve(&branch)?;
            if self.graph.is_ancestor(&new, &id)? {
                continue; // already carries the amended commit
            }
            candidates.push(branch);
        }
        if candidates.is_empty() {
            Output::info("Nothing to evolve");
            return Ok(BatchOutcome::default());
        }

        let snapshot = RefSnapshot::capture(self.vcs, &candidates)?;
        let tips = find_tips(&self.graph, &candidates)?;
        let oracle = ObsolescenceOracle::new(&self.graph);
        let candidate_set: HashSet<&String> = candidates.iter().collect();

        Output::section("Stacks to evolve");
        let mut stacks = Vec::new();
        for tip in &tips {
            let members: Vec<String> = self
                .vcs
                .branches_merged_into(tip, None)?
                .into_iter()
                .filter(|b| candidate_set.contains(b))
                .collect();
            let tree = render_stack(&self.graph, tip, &members)?;
            println!("{tree}");
            stacks.push((tip.clone(), members));
        }
        if !confirm(
            &format!("Rebase {} stack(s) onto {}?", tips.len(), new.short()),
            assume_yes,
        ) {
            Output::info("Evolve cancelled");
            return Ok(BatchOutcome::default());
        }

        let mut outcome = BatchOutcome::default();
        for (tip, members) in &stacks {
            if oracle.is_obsolete(tip, new.as_str())? {
                outcome
                    .skipped
                    .push(render_stack(&self.graph, tip, members)?);
                continue;
            }
            let fallback = PlainFallback::Range {
                onto: new.as_str().to_string(),
                upstream: old.as_str().to_string(),
            };
            match self.rebase_tip(tip, &snapshot, &oracle, new.as_str(), fallback)? {
                RebaseOutcome::Ok => {
                    outcome
                        .updated
                        .push(render_stack(&self.graph, tip, members)?);
                }
                RebaseOutcome::Conflict { stderr } => {
                    warn!("rebase of {tip} hit conflicts: {stderr}");
                    self.abort_rebase(tip);
                    outcome
                        .failed
                        .push(render_stack(&self.graph, tip, members)?);
                }
            }
        }

        Ok(outcome)
    }

    /// First-match strategy selection for one tip. A sync point beats a cut
    /// point beats the plain fallback: rebasing against the bare target
    /// when a shared prefix has already been re-anchored elsewhere would
    /// duplicate that prefix.
    fn rebase_tip(
        &self,
        tip: &str,
        snapshot: &RefSnapshot,
        oracle: &ObsolescenceOracle<V>,
        cut_target: &str,
        fallback: PlainFallback,
    ) -> Result<RebaseOutcome> {
        let spinner = Spinner::new(format!("Rebasing {tip}"));
        let result = if let Some(SyncPoint { branch, old, new }) =
            find_sync_point(&self.graph, tip, snapshot)?
        {
            debug!("{tip}: syncing on already-moved ancestor {branch}");
            self.vcs
                .rebase_update_refs(tip, Some(new.as_str()), old.as_str())
        } else if let Some(cut) = find_cut_point(&self.graph, oracle, tip, cut_target)? {
            debug!("{tip}: cutting absorbed prefix at {}", cut.short());
            let onto = match &fallback {
                PlainFallback::Target(target) => target.clone(),
                PlainFallback::Range { onto, .. } => onto.clone(),
            };
            self.vcs.rebase_update_refs(tip, Some(&onto), cut.as_str())
        } else {
            match &fallback {
                PlainFallback::Target(target) => self.vcs.rebase_update_refs(tip, None, target),
                PlainFallback::Range { onto, upstream } => {
                    self.vcs.rebase_update_refs(tip, Some(onto), upstream)
                }
            }
        };
        spinner.stop();
        result
    }

    fn abort_rebase(&self, tip: &str) {
        if let Err(e) = self.vcs.rebase_abort() {
            // e.g. the rebase never started; the repository is already clean
            debug!("rebase --abort after {tip}: {e}");
        }
    }

    /// Cleanup failures never clobber the per-stack results already
    /// gathered; the batch exit status reflects the rebase outcomes.
    fn delete_merged(&self, branches: &[String], target: &str, assume_yes: bool) {
        Output::section("Fully merged branches");
        for branch in branches {
            Output::bullet(branch);
        }
        if !confirm(
            &format!("Delete {} fully merged branch(es)?", branches.len()),
            assume_yes,
        ) {
            Output::info("Keeping merged branches");
            return;
        }
        // step off any branch about to be deleted
        if let Err(e) = self.vcs.checkout(target) {
            warn!("could not check out {target} before deletion: {e}; keeping merged branches");
            return;
        }
        for branch in branches {
            match self.vcs.delete_branch(branch, true) {
                Ok(()) => Output::success(format!("Deleted {branch}")),
                Err(e) => warn!("could not delete {branch}: {e}"),
            }
        }
    }

    /// Finally-style epilogue: put the user back where they started. A
    /// start branch that no longer resolves (deleted during cleanup) falls
    /// back to the target.
    fn restore(&self, start_branch: &Option<String>, fallback: Option<&str>) {
        let Some(start) = start_branch else {
            warn!("started on a detached HEAD; leaving checkout as is");
            return;
        };
        let destination = if self.vcs.resolve(start).is_ok() {
            start.as_str()
        } else {
            let Some(fallback) = fallback else {
                warn!("start branch {start} no longer exists");
                return;
            };
            warn!("start branch {start} no longer exists; checking out {fallback}");
            fallback
        };
        if let Err(e) = self.vcs.checkout(destination) {
            warn!("could not restore {destination}: {e}");
        }
    }
}
