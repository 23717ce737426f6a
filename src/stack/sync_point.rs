use crate::errors::Result;
use crate::git::{CommitId, GraphQueries, Vcs};
use crate::stack::snapshot::RefSnapshot;
use tracing::debug;

/// An ancestor branch that has already been rebased earlier in the batch.
/// The commits above its old position must be replayed onto its new
/// position, not onto the bare target, or the shared prefix is duplicated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncPoint {
    pub branch: String,
    pub old: CommitId,
    pub new: CommitId,
}

/// Locate the best previously-rebased ancestor of `tip` on the initial
/// topology: among snapshot branches whose initial hash was an ancestor of
/// the tip's initial hash and whose ref has since moved, pick the one
/// closest to the tip (fewest commits in between on the initial graph).
/// Equal distances break toward the lexicographically smaller branch name.
pub fn find_sync_point<V: Vcs>(
    graph: &GraphQueries<V>,
    tip: &str,
    snapshot: &RefSnapshot,
) -> Result<Option<SyncPoint>> {
    let Some(tip_initial) = snapshot.initial(tip) else {
        return Ok(None);
    };

    let mut best: Option<(usize, SyncPoint)> = None;
    for (candidate, old) in snapshot.iter() {
        if candidate == tip {
            continue;
        }
        let old = old.clone();
        if !graph.is_ancestor(&old, tip_initial)? {
            continue;
        }
        let current = graph.resolve(candidate)?;
        if current == old {
            // not moved yet in this batch
            continue;
        }
        let dist = graph.distance(&old, tip_initial)?;
        let closer = match &best {
            None => true,
            Some((best_dist, best_point)) => {
                dist < *best_dist || (dist == *best_dist && *candidate < best_point.branch)
            }
        };
        if closer {
            best = Some((
                dist,
                SyncPoint {
                    branch: candidate.clone(),
                    old,
                    new: current,
                },
            ));
        }
    }

    if let Some((dist, point)) = best {
        debug!(
            "sync point for {tip}: {} ({} commits below, {} -> {})",
            point.branch,
            dist,
            point.old.short(),
            point.new.short()
        );
        return Ok(Some(point));
    }
    Ok(None)
}
