//! MySQL replication primitives shared by the shardsync crates.
//!
//! This crate provides replication locations (binlog positions and GTID sets),
//! replication flavors, and qualified table identities. It performs no I/O.

pub mod replication;
pub mod types;
