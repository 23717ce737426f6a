use crate::errors::Result;
use crate::git::{CommitId, GraphQueries, Vcs};
use crate::stack::obsolete::ObsolescenceOracle;
use tracing::debug;

/// Reduce `branches` to the minimal set of tips that dominate the rest:
/// a branch survives iff no other branch in the set strictly descends from
/// it. When two branches point at the same commit the lexicographically
/// smallest name is the tip. Result is sorted and deduplicated.
pub fn find_tips<V: Vcs>(graph: &GraphQueries<V>, branches: &[String]) -> Result<Vec<String>> {
    let mut sorted: Vec<String> = branches.to_vec();
    sorted.sort();
    sorted.dedup();

    let mut resolved = Vec::with_capacity(sorted.len());
    for branch in &sorted {
        resolved.push(graph.resolve(branch)?);
    }

    let mut tips = Vec::new();
    'candidates: for (i, branch) in sorted.iter().enumerate() {
        for (j, other) in sorted.iter().enumerate() {
            if i == j {
                continue;
            }
            if resolved[i] == resolved[j] {
                if other < branch {
                    continue 'candidates;
                }
            } else if graph.is_ancestor(&resolved[i], &resolved[j])? {
                continue 'candidates;
            }
        }
        tips.push(branch.clone());
    }
    debug!("tips of {} branches: {:?}", sorted.len(), tips);
    Ok(tips)
}

/// Newest commit on the `target..tip` path whose content has already landed
/// in `target`: the boundary past which unique work begins. Rebasing
/// `(cut, tip]` onto `target` drops exactly the absorbed portion.
pub fn find_cut_point<V: Vcs>(
    graph: &GraphQueries<V>,
    oracle: &ObsolescenceOracle<V>,
    tip: &str,
    target: &str,
) -> Result<Option<CommitId>> {
    let candidates = graph
        .gateway()
        .rev_list(target, tip, Some(oracle.window()))?;
    for commit in candidates {
        if oracle.is_obsolete(commit.as_str(), target)? {
            debug!("cut point for {tip} onto {target}: {}", commit.short());
            return Ok(Some(commit));
        }
    }
    Ok(None)
}
