use crate::errors::Result;
use crate::git::{CommitId, Vcs};
use std::collections::BTreeMap;

/// Branch positions captured once, before any rebase of a batch executes.
///
/// The engine mutates the same graph it reasons about, so ancestry and
/// distance questions asked during orchestration go through these frozen
/// hashes rather than live branch names.
#[derive(Debug, Clone)]
pub struct RefSnapshot {
    refs: BTreeMap<String, CommitId>,
}

impl RefSnapshot {
    pub fn capture<V: Vcs>(vcs: &V, branches: &[String]) -> Result<Self> {
        let mut refs = BTreeMap::new();
        for branch in branches {
            refs.insert(branch.clone(), vcs.resolve(branch)?);
        }
        Ok(RefSnapshot { refs })
    }

    pub fn initial(&self, branch: &str) -> Option<&CommitId> {
        self.refs.get(branch)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &CommitId)> {
        self.refs.iter()
    }
}
