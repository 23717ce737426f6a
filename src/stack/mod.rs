pub mod executor;
pub mod obsolete;
pub mod render;
pub mod snapshot;
pub mod sync_point;
pub mod topology;

pub use executor::{BatchOutcome, RebaseEngine};
pub use obsolete::ObsolescenceOracle;
pub use render::render_stack;
pub use snapshot::RefSnapshot;
pub use sync_point::{find_sync_point, SyncPoint};
pub use topology::{find_cut_point, find_tips};
