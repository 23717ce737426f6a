use crate::errors::Result;
use crate::git::{GraphQueries, Vcs};

/// Render a stack as a tree rooted at its tip:
///
/// ```text
/// feature/c
///     ├─ feature/b
///     └─ feature/a
/// ```
///
/// Children are ordered by ascending commit distance from the tip, so the
/// branch closest to the tip comes first.
pub fn render_stack<V: Vcs>(
    graph: &GraphQueries<V>,
    tip: &str,
    members: &[String],
) -> Result<String> {
    let tip_id = graph.resolve(tip)?;
    let mut children = Vec::new();
    for member in members {
        if member == tip {
            continue;
        }
        let id = graph.resolve(member)?;
        children.push((graph.distance(&id, &tip_id)?, member.clone()));
    }
    children.sort();

    let mut out = String::from(tip);
    for (i, (_, name)) in children.iter().enumerate() {
        let connector = if i + 1 == children.len() {
            "└─"
        } else {
            "├─"
        };
        out.push_str(&format!("\n    {connector} {name}"));
    }
    Ok(out)
}
