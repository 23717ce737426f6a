pub mod completions;
pub mod evolve;
pub mod prune;
pub mod push;
pub mod rebase;

use crate::cli::output::Output;
use crate::stack::BatchOutcome;

/// Print the per-stack trees of a finished batch, grouped by outcome.
pub(crate) fn print_summary(outcome: &BatchOutcome) {
    if !outcome.updated.is_empty() {
        Output::section(format!("Updated ({})", outcome.updated.len()));
        for tree in &outcome.updated {
            println!("{tree}");
        }
    }
    if !outcome.skipped.is_empty() {
        Output::section(format!("Skipped, already merged ({})", outcome.skipped.len()));
        for tree in &outcome.skipped {
            println!("{tree}");
        }
    }
    if !outcome.failed.is_empty() {
        Output::section(format!(
            "Manual intervention required ({})",
            outcome.failed.len()
        ));
        for tree in &outcome.failed {
            println!("{tree}");
        }
    }
}
