pub mod gateway;
pub mod queries;

#[cfg(test)]
pub(crate) mod mock;

pub use gateway::{
    ensure_supported, CherryEntry, CommitId, GitCli, GitVersion, MergeTreeOutcome, RebaseOutcome,
    RefScope, TreeId, Vcs,
};
pub use queries::GraphQueries;
