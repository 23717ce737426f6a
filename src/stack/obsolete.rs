use crate::errors::Result;
use crate::git::{GraphQueries, MergeTreeOutcome, Vcs};
use tracing::debug;

/// How far back in the target's history to look for a matching tree.
/// Bounds the cost of the revert-robust strategy; divergence beyond this is
/// still caught by the patch-id and merge-tree strategies.
const HISTORY_WINDOW: usize = 100;

/// Decides whether a commit's content has already landed in a target by any
/// means: rebase, merge, squash, cherry-pick, or revert-then-reapply.
pub struct ObsolescenceOracle<'a, V: Vcs> {
    graph: &'a GraphQueries<'a, V>,
    window: usize,
}

impl<'a, V: Vcs> ObsolescenceOracle<'a, V> {
    pub fn new(graph: &'a GraphQueries<'a, V>) -> Self {
        ObsolescenceOracle {
            graph,
            window: HISTORY_WINDOW,
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// True when applying `rev` on top of `target` would introduce nothing
    /// that is not already in `target`'s history.
    ///
    /// Strategies, first match wins:
    /// 1. every commit of `target..rev` has a patch-id equivalent upstream
    /// 2. merging `rev` into `target` reproduces `target`'s tree exactly
    ///    (squash merges; a conflict counts as not equal)
    /// 3. `rev`'s tree matches one of the last 100 trees of `target`
    ///    (revert-then-reapply, squashes that kept the tree)
    pub fn is_obsolete(&self, rev: &str, target: &str) -> Result<bool> {
        let vcs = self.graph.gateway();

        let entries = vcs.cherry(target, rev)?;
        if entries.iter().all(|e| !e.unmatched) {
            debug!("{rev}: every commit has a patch-id equivalent in {target}");
            return Ok(true);
        }

        let target_id = self.graph.resolve(target)?;
        let target_tree = self.graph.tree_of(&target_id)?;
        if let MergeTreeOutcome::Clean(merged) = vcs.merge_tree(target, rev)? {
            if merged == target_tree {
                debug!("{rev}: merge into {target} reproduces its tree (squash)");
                return Ok(true);
            }
        }

        let rev_id = self.graph.resolve(rev)?;
        let rev_tree = self.graph.tree_of(&rev_id)?;
        if self
            .graph
            .tree_in_recent(&target_id, self.window, &rev_tree)?
        {
            debug!("{rev}: tree appears in {target}'s recent history");
            return Ok(true);
        }

        Ok(false)
    }
}
