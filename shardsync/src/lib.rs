//! Sharding-DDL reconciliation for merging sharded MySQL tables into one
//! downstream table.
//!
//! Schema changes arrive independently from every shard source; the downstream
//! schema must change exactly once and in the same relative order for all
//! sources. This crate builds the global ordering of DDL events out of the
//! partially observed per-source sequences, detects divergence between
//! sources, tracks the DDL currently being applied, and persists the state so
//! a crashed sync task can resume without losing or duplicating a schema
//! change.
//!
//! The caller is expected to serialize all DDL arrivals and apply completions
//! for one shard group; distinct groups are fully independent.

pub mod config;
pub mod error;
mod macros;
pub mod state;
pub mod store;
