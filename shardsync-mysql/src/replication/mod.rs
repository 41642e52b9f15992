//! Replication location types: binlog positions, GTID sets and their comparison.

mod gtid;
mod location;
mod position;

pub use gtid::{GtidError, GtidSet, MariadbGtidSet, MysqlGtidSet, ReplicationFlavor};
pub use location::{Location, compare_locations};
pub use position::BinlogPosition;
