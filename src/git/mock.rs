//! In-memory [`Vcs`] implementation for unit tests.
//!
//! Models just enough of a commit DAG (parents, trees, patch-ids, refs) for
//! the engine's graph reasoning, and records every mutating call so tests
//! can assert which rebase strategy was chosen.

use crate::errors::{RestackError, Result};
use crate::git::gateway::{
    CherryEntry, CommitId, GitVersion, MergeTreeOutcome, RebaseOutcome, RefScope, TreeId, Vcs,
};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

#[derive(Debug, Clone)]
struct MockCommit {
    parents: Vec<String>,
    tree: String,
    patch: String,
}

/// A recorded `rebase_update_refs` invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RebaseCall {
    pub branch: String,
    pub onto: Option<String>,
    pub upstream: String,
}

pub struct MockRepo {
    commits: HashMap<String, MockCommit>,
    refs: RefCell<BTreeMap<String, String>>,
    head: RefCell<Option<String>>,
    version: GitVersion,
    upstreams: HashMap<String, String>,
    gone_upstreams: Vec<String>,
    conflicts: HashSet<String>,
    rebase_moves: HashMap<String, Vec<(String, String)>>,
    merge_clean: HashSet<(String, String)>,
    checkout_fail_after: Option<usize>,
    checkouts: RefCell<usize>,
    calls: RefCell<Vec<String>>,
    rebases: RefCell<Vec<RebaseCall>>,
}

impl MockRepo {
    pub fn builder() -> MockRepoBuilder {
        MockRepoBuilder::default()
    }

    pub fn calls_matching(&self, prefix: &str) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    pub fn rebase_invocations(&self) -> Vec<RebaseCall> {
        self.rebases.borrow().clone()
    }

    pub fn ref_at(&self, name: &str) -> Option<CommitId> {
        self.refs.borrow().get(name).cloned().map(CommitId::new)
    }

    pub fn head_branch(&self) -> Option<String> {
        self.head.borrow().clone()
    }

    fn log(&self, entry: String) {
        self.calls.borrow_mut().push(entry);
    }

    fn lookup(&self, rev: &str) -> Result<String> {
        if let Some(id) = self.refs.borrow().get(rev) {
            return Ok(id.clone());
        }
        if self.commits.contains_key(rev) {
            return Ok(rev.to_string());
        }
        if rev == "HEAD" {
            if let Some(branch) = self.head.borrow().as_deref() {
                if let Some(id) = self.refs.borrow().get(branch) {
                    return Ok(id.clone());
                }
            }
        }
        Err(RestackError::UnknownRef(rev.to_string()))
    }

    /// All commits reachable from `id`, including `id` itself
    fn ancestors(&self, id: &str) -> HashSet<String> {
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([id.to_string()]);
        while let Some(next) = queue.pop_front() {
            if !seen.insert(next.clone()) {
                continue;
            }
            if let Some(commit) = self.commits.get(&next) {
                for parent in &commit.parents {
                    queue.push_back(parent.clone());
                }
            }
        }
        seen
    }

    fn reaches(&self, ancestor: &str, descendant: &str) -> bool {
        self.ancestors(descendant).contains(ancestor)
    }

    /// Newest-first walk of `included` stopping at anything reachable from
    /// `excluded`. Test graphs are single-parent chains, so a first-parent
    /// walk is exact.
    fn walk(&self, excluded: Option<&str>, included: &str) -> Vec<String> {
        let stop: HashSet<String> = excluded.map(|e| self.ancestors(e)).unwrap_or_default();
        let mut out = Vec::new();
        let mut cursor = Some(included.to_string());
        while let Some(id) = cursor {
            if stop.contains(&id) {
                break;
            }
            let Some(commit) = self.commits.get(&id) else {
                break;
            };
            out.push(id);
            cursor = commit.parents.first().cloned();
        }
        out
    }

    fn local_refs(&self) -> Vec<String> {
        self.refs
            .borrow()
            .keys()
            .filter(|name| !name.starts_with("origin/"))
            .cloned()
            .collect()
    }
}

impl Vcs for MockRepo {
    fn version(&self) -> Result<GitVersion> {
        Ok(self.version)
    }

    fn current_branch(&self) -> Result<Option<String>> {
        Ok(self.head.borrow().clone())
    }

    fn resolve(&self, rev: &str) -> Result<CommitId> {
        self.lookup(rev).map(CommitId::new)
    }

    fn tree_of(&self, rev: &str) -> Result<TreeId> {
        let id = self.lookup(rev)?;
        let commit = self
            .commits
            .get(&id)
            .ok_or_else(|| RestackError::UnknownRef(rev.to_string()))?;
        Ok(TreeId::new(commit.tree.clone()))
    }

    fn is_ancestor(&self, ancestor: &CommitId, descendant: &CommitId) -> Result<bool> {
        self.log(format!("is_ancestor {ancestor} {descendant}"));
        Ok(self.reaches(ancestor.as_str(), descendant.as_str()))
    }

    fn rev_list(
        &self,
        excluded: &str,
        included: &str,
        max: Option<usize>,
    ) -> Result<Vec<CommitId>> {
        let excl = self.lookup(excluded)?;
        let incl = self.lookup(included)?;
        let mut commits = self.walk(Some(&excl), &incl);
        if let Some(n) = max {
            commits.truncate(n);
        }
        Ok(commits.into_iter().map(CommitId::new).collect())
    }

    fn rev_list_count(&self, excluded: &str, included: &str) -> Result<usize> {
        self.log(format!("rev_list_count {excluded}..{included}"));
        let excl = self.lookup(excluded)?;
        let incl = self.lookup(included)?;
        Ok(self.walk(Some(&excl), &incl).len())
    }

    fn recent_trees(&self, rev: &str, max: usize) -> Result<Vec<TreeId>> {
        self.log(format!("recent_trees {rev} {max}"));
        let id = self.lookup(rev)?;
        Ok(self
            .walk(None, &id)
            .into_iter()
            .take(max)
            .filter_map(|c| self.commits.get(&c).map(|m| TreeId::new(m.tree.clone())))
            .collect())
    }

    fn list_refs(&self, prefix: &str, scope: RefScope) -> Result<Vec<String>> {
        let refs = self.refs.borrow();
        let matches: Vec<String> = match scope {
            RefScope::Local => refs
                .keys()
                .filter(|n| !n.starts_with("origin/") && n.starts_with(prefix))
                .cloned()
                .collect(),
            RefScope::Remote => {
                let full = format!("origin/{prefix}");
                refs.keys().filter(|n| n.starts_with(&full)).cloned().collect()
            }
        };
        Ok(matches)
    }

    fn branches_merged_into(&self, tip: &str, prefix: Option<&str>) -> Result<Vec<String>> {
        let tip_id = self.lookup(tip)?;
        let mut merged = Vec::new();
        for name in self.local_refs() {
            if let Some(p) = prefix {
                if !name.starts_with(p) {
                    continue;
                }
            }
            let id = self.refs.borrow().get(&name).cloned().unwrap();
            if self.reaches(&id, &tip_id) {
                merged.push(name);
            }
        }
        Ok(merged)
    }

    fn branches_containing(&self, commit: &CommitId) -> Result<Vec<String>> {
        let mut containing = Vec::new();
        for name in self.local_refs() {
            let id = self.refs.borrow().get(&name).cloned().unwrap();
            if self.reaches(commit.as_str(), &id) {
                containing.push(name);
            }
        }
        Ok(containing)
    }

    fn upstream_of(&self, branch: &str) -> Result<Option<String>> {
        Ok(self.upstreams.get(branch).cloned())
    }

    fn branches_with_gone_upstream(&self) -> Result<Vec<String>> {
        Ok(self.gone_upstreams.clone())
    }

    fn cherry(&self, upstream: &str, head: &str) -> Result<Vec<CherryEntry>> {
        let up = self.lookup(upstream)?;
        let hd = self.lookup(head)?;
        let upstream_patches: HashSet<String> = self
            .ancestors(&up)
            .iter()
            .filter_map(|c| self.commits.get(c).map(|m| m.patch.clone()))
            .collect();
        let mut entries: Vec<CherryEntry> = self
            .walk(Some(&up), &hd)
            .into_iter()
            .map(|c| {
                let patch = &self.commits[&c].patch;
                CherryEntry {
                    unmatched: !upstream_patches.contains(patch),
                    commit: CommitId::new(c.clone()),
                }
            })
            .collect();
        entries.reverse(); // git cherry lists oldest first
        Ok(entries)
    }

    fn merge_tree(&self, base: &str, head: &str) -> Result<MergeTreeOutcome> {
        if self
            .merge_clean
            .contains(&(base.to_string(), head.to_string()))
        {
            return Ok(MergeTreeOutcome::Clean(self.tree_of(base)?));
        }
        let base_id = self.lookup(base)?;
        let head_id = self.lookup(head)?;
        if self.reaches(&head_id, &base_id) {
            return Ok(MergeTreeOutcome::Clean(self.tree_of(base)?));
        }
        Ok(MergeTreeOutcome::Conflict)
    }

    fn rebase_update_refs(
        &self,
        branch: &str,
        onto: Option<&str>,
        upstream: &str,
    ) -> Result<RebaseOutcome> {
        self.log(format!("rebase {branch}"));
        self.rebases.borrow_mut().push(RebaseCall {
            branch: branch.to_string(),
            onto: onto.map(str::to_string),
            upstream: upstream.to_string(),
        });
        if self.conflicts.contains(branch) {
            return Ok(RebaseOutcome::Conflict {
                stderr: format!("could not apply onto {upstream}"),
            });
        }
        if let Some(moves) = self.rebase_moves.get(branch) {
            let mut refs = self.refs.borrow_mut();
            for (name, commit) in moves {
                refs.insert(name.clone(), commit.clone());
            }
        }
        Ok(RebaseOutcome::Ok)
    }

    fn rebase_abort(&self) -> Result<()> {
        self.log("rebase_abort".to_string());
        Ok(())
    }

    fn checkout(&self, branch: &str) -> Result<()> {
        self.log(format!("checkout {branch}"));
        let attempt = {
            let mut count = self.checkouts.borrow_mut();
            *count += 1;
            *count
        };
        if self.checkout_fail_after.is_some_and(|limit| attempt > limit) {
            return Err(RestackError::branch(format!("cannot check out {branch}")));
        }
        if !self.refs.borrow().contains_key(branch) {
            return Err(RestackError::branch(format!("no such branch: {branch}")));
        }
        *self.head.borrow_mut() = Some(branch.to_string());
        Ok(())
    }

    fn pull_rebase(&self) -> Result<()> {
        self.log("pull_rebase".to_string());
        Ok(())
    }

    fn push(&self, branches: &[String], options: &[String]) -> Result<()> {
        self.log(format!("push {} {}", options.join(" "), branches.join(" ")));
        Ok(())
    }

    fn delete_remote(&self, branches: &[String]) -> Result<()> {
        self.log(format!("delete_remote {}", branches.join(" ")));
        let mut refs = self.refs.borrow_mut();
        for branch in branches {
            refs.remove(&format!("origin/{branch}"));
        }
        Ok(())
    }

    fn fetch(&self, prune: bool) -> Result<()> {
        self.log(format!("fetch prune={prune}"));
        Ok(())
    }

    fn delete_branch(&self, branch: &str, force: bool) -> Result<()> {
        self.log(format!("delete_branch {branch} force={force}"));
        if self.refs.borrow_mut().remove(branch).is_none() {
            return Err(RestackError::branch(format!("no such branch: {branch}")));
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MockRepoBuilder {
    commits: Vec<(String, MockCommit)>,
    refs: BTreeMap<String, String>,
    head: Option<String>,
    version: Option<GitVersion>,
    upstreams: HashMap<String, String>,
    conflicts: HashSet<String>,
    rebase_moves: HashMap<String, Vec<(String, String)>>,
    merge_clean: HashSet<(String, String)>,
    checkout_fail_after: Option<usize>,
}

impl MockRepoBuilder {
    fn push_chain(&mut self, parent: Option<String>, labels: &[&str]) -> Option<String> {
        let mut prev = parent;
        for label in labels {
            self.commits.push((
                label.to_string(),
                MockCommit {
                    parents: prev.iter().cloned().collect(),
                    tree: format!("tree-{label}"),
                    patch: format!("patch-{label}"),
                },
            ));
            prev = Some(label.to_string());
        }
        prev
    }

    /// Root chain of commits; `branch` points at the last one
    pub fn chain(mut self, branch: &str, labels: &[&str]) -> Self {
        if let Some(tip) = self.push_chain(None, labels) {
            self.refs.insert(branch.to_string(), tip);
        }
        self
    }

    /// Chain growing from an existing commit label or ref
    pub fn chain_from(mut self, parent: &str, branch: &str, labels: &[&str]) -> Self {
        let base = self.refs.get(parent).cloned().unwrap_or(parent.to_string());
        if let Some(tip) = self.push_chain(Some(base), labels) {
            self.refs.insert(branch.to_string(), tip);
        }
        self
    }

    /// Commits with no ref pointing at them (e.g. pre-built rebase results)
    pub fn loose_chain_from(mut self, parent: &str, labels: &[&str]) -> Self {
        let base = self.refs.get(parent).cloned().unwrap_or(parent.to_string());
        self.push_chain(Some(base), labels);
        self
    }

    /// Extra ref at an existing commit
    pub fn branch(mut self, name: &str, commit: &str) -> Self {
        let id = self.refs.get(commit).cloned().unwrap_or(commit.to_string());
        self.refs.insert(name.to_string(), id);
        self
    }

    pub fn remote(mut self, branch: &str, commit: &str) -> Self {
        let id = self.refs.get(commit).cloned().unwrap_or(commit.to_string());
        self.refs.insert(format!("origin/{branch}"), id);
        self
    }

    pub fn head(mut self, branch: &str) -> Self {
        self.head = Some(branch.to_string());
        self
    }

    pub fn version(mut self, major: u32, minor: u32) -> Self {
        self.version = Some(GitVersion {
            major,
            minor,
            patch: 0,
        });
        self
    }

    pub fn upstream(mut self, branch: &str, upstream: &str) -> Self {
        self.upstreams
            .insert(branch.to_string(), upstream.to_string());
        self
    }

    /// `commit`'s patch-id equals `of`'s (models a cherry-pick)
    pub fn copy_patch(mut self, commit: &str, of: &str) -> Self {
        let patch = format!("patch-{of}");
        if let Some((_, c)) = self.commits.iter_mut().find(|(id, _)| id == commit) {
            c.patch = patch;
        }
        self
    }

    /// `commit`'s tree equals `of`'s (models a squash retaining the tree)
    pub fn copy_tree(mut self, commit: &str, of: &str) -> Self {
        let tree = format!("tree-{of}");
        if let Some((_, c)) = self.commits.iter_mut().find(|(id, _)| id == commit) {
            c.tree = tree;
        }
        self
    }

    /// Rebasing `branch` reports a conflict
    pub fn conflict_on(mut self, branch: &str) -> Self {
        self.conflicts.insert(branch.to_string());
        self
    }

    /// Checkouts succeed `limit` times, then fail (e.g. only the
    /// post-confirm cleanup checkout)
    pub fn fail_checkout_after(mut self, limit: usize) -> Self {
        self.checkout_fail_after = Some(limit);
        self
    }

    /// Refs to move when a rebase of `branch` succeeds
    pub fn on_rebase(mut self, branch: &str, moves: &[(&str, &str)]) -> Self {
        self.rebase_moves.insert(
            branch.to_string(),
            moves
                .iter()
                .map(|(r, c)| (r.to_string(), c.to_string()))
                .collect(),
        );
        self
    }

    /// `merge_tree(base, head)` yields base's tree (models an absorbed squash)
    pub fn merge_clean(mut self, base: &str, head: &str) -> Self {
        self.merge_clean.insert((base.to_string(), head.to_string()));
        self
    }

    pub fn build(self) -> MockRepo {
        MockRepo {
            commits: self.commits.into_iter().collect(),
            refs: RefCell::new(self.refs),
            head: RefCell::new(self.head),
            version: self.version.unwrap_or(GitVersion {
                major: 2,
                minor: 43,
                patch: 0,
            }),
            upstreams: self.upstreams,
            gone_upstreams: Vec::new(),
            conflicts: self.conflicts,
            rebase_moves: self.rebase_moves,
            merge_clean: self.merge_clean,
            checkout_fail_after: self.checkout_fail_after,
            checkouts: RefCell::new(0),
            calls: RefCell::new(Vec::new()),
            rebases: RefCell::new(Vec::new()),
        }
    }
}
