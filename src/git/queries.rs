use crate::errors::Result;
use crate::git::gateway::{CommitId, TreeId, Vcs};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

/// Cached graph reads over a [`Vcs`] gateway.
///
/// Only facts keyed by commit id are cached: ancestry, trees, and commit
/// counts are immutable properties of the object database, so they stay
/// valid while the engine moves refs around. Ref-level reads (`resolve`,
/// listings) always go to the gateway. Cache lifetime is one invocation.
pub struct GraphQueries<'a, V: Vcs> {
    vcs: &'a V,
    ancestry: RefCell<HashMap<(CommitId, CommitId), bool>>,
    trees: RefCell<HashMap<CommitId, TreeId>>,
    counts: RefCell<HashMap<(CommitId, CommitId), usize>>,
    recent_trees: RefCell<HashMap<(CommitId, usize), HashSet<TreeId>>>,
}

impl<'a, V: Vcs> GraphQueries<'a, V> {
    pub fn new(vcs: &'a V) -> Self {
        GraphQueries {
            vcs,
            ancestry: RefCell::new(HashMap::new()),
            trees: RefCell::new(HashMap::new()),
            counts: RefCell::new(HashMap::new()),
            recent_trees: RefCell::new(HashMap::new()),
        }
    }

    /// The underlying gateway, for uncached operations
    pub fn gateway(&self) -> &'a V {
        self.vcs
    }

    /// Uncached: branch refs move underneath the engine
    pub fn resolve(&self, rev: &str) -> Result<CommitId> {
        self.vcs.resolve(rev)
    }

    pub fn is_ancestor(&self, ancestor: &CommitId, descendant: &CommitId) -> Result<bool> {
        let key = (ancestor.clone(), descendant.clone());
        if let Some(&hit) = self.ancestry.borrow().get(&key) {
            return Ok(hit);
        }
        let result = self.vcs.is_ancestor(ancestor, descendant)?;
        self.ancestry.borrow_mut().insert(key, result);
        Ok(result)
    }

    pub fn tree_of(&self, commit: &CommitId) -> Result<TreeId> {
        if let Some(hit) = self.trees.borrow().get(commit) {
            return Ok(hit.clone());
        }
        let tree = self.vcs.tree_of(commit.as_str())?;
        self.trees
            .borrow_mut()
            .insert(commit.clone(), tree.clone());
        Ok(tree)
    }

    /// Number of commits reachable from `included` but not `excluded`
    pub fn distance(&self, excluded: &CommitId, included: &CommitId) -> Result<usize> {
        let key = (excluded.clone(), included.clone());
        if let Some(&hit) = self.counts.borrow().get(&key) {
            return Ok(hit);
        }
        let count = self
            .vcs
            .rev_list_count(excluded.as_str(), included.as_str())?;
        self.counts.borrow_mut().insert(key, count);
        Ok(count)
    }

    /// Whether `tree` appears among the trees of the most recent `window`
    /// commits reachable from `of`
    pub fn tree_in_recent(&self, of: &CommitId, window: usize, tree: &TreeId) -> Result<bool> {
        let key = (of.clone(), window);
        if let Some(hit) = self.recent_trees.borrow().get(&key) {
            return Ok(hit.contains(tree));
        }
        let trees: HashSet<TreeId> = self
            .vcs
            .recent_trees(of.as_str(), window)?
            .into_iter()
            .collect();
        let found = trees.contains(tree);
        self.recent_trees.borrow_mut().insert(key, trees);
        Ok(found)
    }
}
