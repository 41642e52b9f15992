//! Shard-group DDL state: per-source sequences, the merged global sequence,
//! and the reconciliation algorithm tying them together.

mod ddl;
mod sharding;

pub use ddl::{DdlItem, DdlSequence};
pub use sharding::ShardDdlState;
