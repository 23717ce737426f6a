use crate::errors::{RestackError, Result};
use std::fmt;
use std::path::PathBuf;
use std::process::{Command, Output};
use std::sync::OnceLock;
use tracing::debug;

/// Opaque identifier of a commit (a full object hash).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommitId(String);

impl CommitId {
    pub fn new<S: Into<String>>(hash: S) -> Self {
        CommitId(hash.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Abbreviated hash for display
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(8)]
    }
}

impl fmt::Display for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CommitId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Opaque identifier of a directory snapshot. Equal trees have equal content.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TreeId(String);

impl TreeId {
    pub fn new<S: Into<String>>(hash: S) -> Self {
        TreeId(hash.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TreeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Installed git version, compared against the oldest release that ships
/// `rebase --update-refs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct GitVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl GitVersion {
    /// `rebase --update-refs` landed in git 2.38
    pub const MIN_SUPPORTED: GitVersion = GitVersion {
        major: 2,
        minor: 38,
        patch: 0,
    };

    pub fn parse(text: &str) -> Option<Self> {
        // "git version 2.43.0" (possibly with a platform suffix)
        let numbers = text.split_whitespace().find(|w| {
            w.chars().next().is_some_and(|c| c.is_ascii_digit())
        })?;
        let mut parts = numbers.split('.');
        let major = parts.next()?.parse().ok()?;
        let minor = parts.next()?.parse().ok()?;
        let patch = parts
            .next()
            .and_then(|p| {
                p.chars()
                    .take_while(|c| c.is_ascii_digit())
                    .collect::<String>()
                    .parse()
                    .ok()
            })
            .unwrap_or(0);
        Some(GitVersion {
            major,
            minor,
            patch,
        })
    }

    pub fn supports_update_refs(&self) -> bool {
        *self >= Self::MIN_SUPPORTED
    }
}

impl fmt::Display for GitVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Which ref namespace to enumerate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefScope {
    Local,
    Remote,
}

/// One line of `git cherry` output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CherryEntry {
    /// true for `+` (no patch-id equivalent upstream), false for `-`
    pub unmatched: bool,
    pub commit: CommitId,
}

/// Outcome of a server-side merge computation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeTreeOutcome {
    Clean(TreeId),
    Conflict,
}

/// Outcome of an external rebase
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RebaseOutcome {
    Ok,
    Conflict { stderr: String },
}

/// Typed surface over the host VCS. Everything the engine knows about the
/// repository flows through this trait, so the orchestration logic can be
/// exercised against an in-memory implementation.
pub trait Vcs {
    fn version(&self) -> Result<GitVersion>;

    /// Current branch name, or None when HEAD is detached
    fn current_branch(&self) -> Result<Option<String>>;

    fn resolve(&self, rev: &str) -> Result<CommitId>;

    fn tree_of(&self, rev: &str) -> Result<TreeId>;

    fn is_ancestor(&self, ancestor: &CommitId, descendant: &CommitId) -> Result<bool>;

    /// Commits reachable from `included` but not `excluded`, newest first
    fn rev_list(&self, excluded: &str, included: &str, max: Option<usize>)
        -> Result<Vec<CommitId>>;

    fn rev_list_count(&self, excluded: &str, included: &str) -> Result<usize>;

    /// Trees of the most recent `max` commits reachable from `rev`
    fn recent_trees(&self, rev: &str, max: usize) -> Result<Vec<TreeId>>;

    fn list_refs(&self, prefix: &str, scope: RefScope) -> Result<Vec<String>>;

    /// Local branches under `prefix` whose tips are reachable from `tip`
    fn branches_merged_into(&self, tip: &str, prefix: Option<&str>) -> Result<Vec<String>>;

    fn branches_containing(&self, commit: &CommitId) -> Result<Vec<String>>;

    fn upstream_of(&self, branch: &str) -> Result<Option<String>>;

    /// Local branches whose configured upstream no longer exists
    fn branches_with_gone_upstream(&self) -> Result<Vec<String>>;

    /// Per-commit patch-id comparison of `upstream..head`
    fn cherry(&self, upstream: &str, head: &str) -> Result<Vec<CherryEntry>>;

    fn merge_tree(&self, base: &str, head: &str) -> Result<MergeTreeOutcome>;

    /// `git rebase --update-refs` of `branch`; `onto` defaults to `upstream`
    fn rebase_update_refs(
        &self,
        branch: &str,
        onto: Option<&str>,
        upstream: &str,
    ) -> Result<RebaseOutcome>;

    fn rebase_abort(&self) -> Result<()>;

    fn checkout(&self, branch: &str) -> Result<()>;

    fn pull_rebase(&self) -> Result<()>;

    fn push(&self, branches: &[String], options: &[String]) -> Result<()>;

    fn delete_remote(&self, branches: &[String]) -> Result<()>;

    fn fetch(&self, prune: bool) -> Result<()>;

    fn delete_branch(&self, branch: &str, force: bool) -> Result<()>;
}

/// `git branch` lists a "(HEAD detached at …)" entry when on no branch
fn is_branch_name(name: &str) -> bool {
    !name.starts_with('(') && name != "HEAD"
}

/// Refuse to proceed on a git that lacks `rebase --update-refs`
pub fn ensure_supported<V: Vcs>(vcs: &V) -> Result<()> {
    let version = vcs.version()?;
    if !version.supports_update_refs() {
        return Err(RestackError::UnsupportedGit(format!(
            "{version} (need {} or newer for ref-updating rebases)",
            GitVersion::MIN_SUPPORTED
        )));
    }
    Ok(())
}

/// `Vcs` implementation that shells out to the `git` executable and parses
/// its structured output. Never touches the repository on disk itself.
pub struct GitCli {
    work_dir: Option<PathBuf>,
    version: OnceLock<GitVersion>,
}

impl GitCli {
    pub fn new() -> Self {
        GitCli {
            work_dir: None,
            version: OnceLock::new(),
        }
    }

    /// Run against a repository other than the process working directory
    pub fn in_dir<P: Into<PathBuf>>(path: P) -> Self {
        GitCli {
            work_dir: Some(path.into()),
            version: OnceLock::new(),
        }
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new("git");
        cmd.args(args);
        if let Some(dir) = &self.work_dir {
            cmd.current_dir(dir);
        }
        cmd
    }

    fn run(&self, args: &[&str]) -> Result<Output> {
        debug!("git {}", args.join(" "));
        self.command(args)
            .output()
            .map_err(|e| RestackError::GitUnavailable(e.to_string()))
    }

    /// Run and require a zero exit status; returns trimmed stdout
    fn run_checked(&self, args: &[&str]) -> Result<String> {
        let output = self.run(args)?;
        if !output.status.success() {
            return Err(RestackError::CommandFailed {
                command: args.join(" "),
                status: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    fn run_lines(&self, args: &[&str]) -> Result<Vec<String>> {
        let stdout = self.run_checked(args)?;
        Ok(stdout
            .lines()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect())
    }
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new()
    }
}

impl Vcs for GitCli {
    fn version(&self) -> Result<GitVersion> {
        if let Some(v) = self.version.get() {
            return Ok(*v);
        }
        let text = self.run_checked(&["version"])?;
        let parsed = GitVersion::parse(&text)
            .ok_or_else(|| RestackError::UnsupportedGit(format!("unparseable: {text}")))?;
        Ok(*self.version.get_or_init(|| parsed))
    }

    fn current_branch(&self) -> Result<Option<String>> {
        let name = self.run_checked(&["branch", "--show-current"])?;
        Ok(if name.is_empty() { None } else { Some(name) })
    }

    fn resolve(&self, rev: &str) -> Result<CommitId> {
        let spec = format!("{rev}^{{commit}}");
        match self.run_checked(&["rev-parse", "--verify", "--quiet", &spec]) {
            Ok(hash) => Ok(CommitId::new(hash)),
            Err(RestackError::CommandFailed { .. }) => {
                Err(RestackError::UnknownRef(rev.to_string()))
            }
            Err(e) => Err(e),
        }
    }

    fn tree_of(&self, rev: &str) -> Result<TreeId> {
        let spec = format!("{rev}^{{tree}}");
        self.run_checked(&["rev-parse", "--verify", &spec])
            .map(TreeId::new)
    }

    fn is_ancestor(&self, ancestor: &CommitId, descendant: &CommitId) -> Result<bool> {
        let output = self.run(&[
            "merge-base",
            "--is-ancestor",
            ancestor.as_str(),
            descendant.as_str(),
        ])?;
        match output.status.code() {
            Some(0) => Ok(true),
            Some(1) => Ok(false),
            code => Err(RestackError::CommandFailed {
                command: "merge-base --is-ancestor".to_string(),
                status: code.unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }),
        }
    }

    fn rev_list(
        &self,
        excluded: &str,
        included: &str,
        max: Option<usize>,
    ) -> Result<Vec<CommitId>> {
        let range = format!("{excluded}..{included}");
        let capped;
        let mut args = vec!["rev-list"];
        if let Some(n) = max {
            capped = format!("--max-count={n}");
            args.push(&capped);
        }
        args.push(&range);
        Ok(self
            .run_lines(&args)?
            .into_iter()
            .map(CommitId::new)
            .collect())
    }

    fn rev_list_count(&self, excluded: &str, included: &str) -> Result<usize> {
        let range = format!("{excluded}..{included}");
        let count = self.run_checked(&["rev-list", "--count", &range])?;
        count
            .parse()
            .map_err(|e| RestackError::validation(format!("bad rev-list count '{count}': {e}")))
    }

    fn recent_trees(&self, rev: &str, max: usize) -> Result<Vec<TreeId>> {
        let cap = format!("--max-count={max}");
        Ok(self
            .run_lines(&["log", "--format=%T", &cap, rev])?
            .into_iter()
            .map(TreeId::new)
            .collect())
    }

    fn list_refs(&self, prefix: &str, scope: RefScope) -> Result<Vec<String>> {
        // for-each-ref patterns only match whole path components, so an
        // arbitrary prefix like "test-chain-" is filtered here instead
        let (namespace, full_prefix) = match scope {
            RefScope::Local => ("refs/heads", prefix.to_string()),
            RefScope::Remote => ("refs/remotes/origin", format!("origin/{prefix}")),
        };
        let refs = self.run_lines(&[
            "for-each-ref",
            "--format=%(refname:short)",
            "--sort=refname",
            namespace,
        ])?;
        Ok(refs
            .into_iter()
            .filter(|name| name.starts_with(&full_prefix))
            .collect())
    }

    fn branches_merged_into(&self, tip: &str, prefix: Option<&str>) -> Result<Vec<String>> {
        let branches = self.run_lines(&["branch", "--format=%(refname:short)", "--merged", tip])?;
        Ok(branches
            .into_iter()
            .filter(|name| is_branch_name(name))
            .filter(|name| prefix.map_or(true, |p| name.starts_with(p)))
            .collect())
    }

    fn branches_containing(&self, commit: &CommitId) -> Result<Vec<String>> {
        let branches = self.run_lines(&[
            "branch",
            "--format=%(refname:short)",
            "--contains",
            commit.as_str(),
        ])?;
        Ok(branches
            .into_iter()
            .filter(|name| is_branch_name(name))
            .collect())
    }

    fn upstream_of(&self, branch: &str) -> Result<Option<String>> {
        let spec = format!("{branch}@{{upstream}}");
        let output = self.run(&["rev-parse", "--abbrev-ref", "--symbolic-full-name", &spec])?;
        if output.status.success() {
            let name = String::from_utf8_lossy(&output.stdout).trim().to_string();
            Ok(if name.is_empty() { None } else { Some(name) })
        } else {
            // no upstream configured (or upstream ref gone)
            Ok(None)
        }
    }

    fn branches_with_gone_upstream(&self) -> Result<Vec<String>> {
        let lines = self.run_lines(&[
            "for-each-ref",
            "--format=%(refname:short) %(upstream:track)",
            "refs/heads",
        ])?;
        Ok(lines
            .into_iter()
            .filter_map(|line| {
                let (name, track) = line.split_once(' ')?;
                track.contains("[gone]").then(|| name.to_string())
            })
            .collect())
    }

    fn cherry(&self, upstream: &str, head: &str) -> Result<Vec<CherryEntry>> {
        let lines = self.run_lines(&["cherry", upstream, head])?;
        let mut entries = Vec::with_capacity(lines.len());
        for line in lines {
            let (marker, hash) = line
                .split_once(' ')
                .ok_or_else(|| RestackError::validation(format!("bad cherry line: {line}")))?;
            entries.push(CherryEntry {
                unmatched: marker == "+",
                commit: CommitId::new(hash),
            });
        }
        Ok(entries)
    }

    fn merge_tree(&self, base: &str, head: &str) -> Result<MergeTreeOutcome> {
        let output = self.run(&["merge-tree", "--write-tree", base, head])?;
        match output.status.code() {
            Some(0) => {
                let stdout = String::from_utf8_lossy(&output.stdout);
                let tree = stdout
                    .lines()
                    .next()
                    .map(str::trim)
                    .filter(|l| !l.is_empty())
                    .ok_or_else(|| RestackError::validation("empty merge-tree output"))?;
                Ok(MergeTreeOutcome::Clean(TreeId::new(tree)))
            }
            Some(1) => Ok(MergeTreeOutcome::Conflict),
            code => Err(RestackError::CommandFailed {
                command: format!("merge-tree --write-tree {base} {head}"),
                status: code.unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }),
        }
    }

    fn rebase_update_refs(
        &self,
        branch: &str,
        onto: Option<&str>,
        upstream: &str,
    ) -> Result<RebaseOutcome> {
        let mut args = vec!["rebase", "--update-refs"];
        if let Some(onto) = onto {
            args.push("--onto");
            args.push(onto);
        }
        args.push(upstream);
        args.push(branch);
        let output = self.run(&args)?;
        if output.status.success() {
            Ok(RebaseOutcome::Ok)
        } else {
            Ok(RebaseOutcome::Conflict {
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }

    fn rebase_abort(&self) -> Result<()> {
        self.run_checked(&["rebase", "--abort"]).map(|_| ())
    }

    fn checkout(&self, branch: &str) -> Result<()> {
        self.run_checked(&["checkout", branch]).map(|_| ())
    }

    fn pull_rebase(&self) -> Result<()> {
        self.run_checked(&["pull", "--rebase"]).map(|_| ())
    }

    fn push(&self, branches: &[String], options: &[String]) -> Result<()> {
        let mut args: Vec<&str> = vec!["push", "origin"];
        args.extend(options.iter().map(String::as_str));
        args.extend(branches.iter().map(String::as_str));
        self.run_checked(&args).map(|_| ())
    }

    fn delete_remote(&self, branches: &[String]) -> Result<()> {
        let mut args: Vec<&str> = vec!["push", "origin", "--delete"];
        args.extend(branches.iter().map(String::as_str));
        self.run_checked(&args).map(|_| ())
    }

    fn fetch(&self, prune: bool) -> Result<()> {
        let mut args = vec!["fetch"];
        if prune {
            args.push("--prune");
        }
        args.push("origin");
        self.run_checked(&args).map(|_| ())
    }

    fn delete_branch(&self, branch: &str, force: bool) -> Result<()> {
        let flag = if force { "-D" } else { "-d" };
        self.run_checked(&["branch", flag, branch]).map(|_| ())
    }
}
