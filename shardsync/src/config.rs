//! Shared configuration types for shard groups.

use serde::{Deserialize, Serialize};
use shardsync_mysql::replication::ReplicationFlavor;

/// Configuration for one shard group.
///
/// Selected once per group; the location comparator and the flavor used to
/// reparse persisted GTID text are configuration, not per-call state.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct ShardGroupConfig {
    /// Compare replication locations by GTID set containment instead of
    /// binlog offset.
    #[serde(default)]
    pub enable_gtid: bool,
    /// Replication flavor of the upstream servers feeding this group.
    #[serde(default)]
    pub flavor: ReplicationFlavor,
}
