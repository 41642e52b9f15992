use std::fmt;

use serde::{Deserialize, Serialize};
use shardsync_mysql::replication::{BinlogPosition, GtidSet, Location, ReplicationFlavor};

use crate::error::SyncResult;

/// One atomic shard-source DDL event.
///
/// A single source event may batch several DDL statements; they are applied
/// downstream as one step. The serialized form carries the raw binlog position
/// and the GTID set as text, because GTID sets are flavor polymorphic and must
/// be reparsed against the source's replication flavor on restore.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DdlItem {
    /// Replication location of the first event carrying this batch.
    ///
    /// Not serialized directly; rebuilt from `first-position` and
    /// `first-gtid-set` when the item is restored.
    #[serde(skip)]
    pub location: Location,
    /// The DDL statements of this batch, in statement order.
    pub ddls: Vec<String>,
    /// Qualified identity of the upstream source table. The only field that
    /// may change after construction (rename remapping).
    pub source: String,

    #[serde(rename = "first-position")]
    first_position: BinlogPosition,
    #[serde(rename = "first-gtid-set")]
    first_gtid_set: String,
}

impl DdlItem {
    pub fn new(location: Location, ddls: Vec<String>, source: impl Into<String>) -> Self {
        let first_position = location.position.clone();
        let first_gtid_set = location.gtid_text();

        Self {
            location,
            ddls,
            source: source.into(),
            first_position,
            first_gtid_set,
        }
    }

    /// Rebuilds the in-memory location from the serialized position and GTID
    /// text. Empty GTID text means the position carries no GTID set.
    pub(crate) fn reattach_location(&mut self, flavor: ReplicationFlavor) -> SyncResult<()> {
        let gtid_set = if self.first_gtid_set.is_empty() {
            None
        } else {
            Some(GtidSet::parse(flavor, &self.first_gtid_set)?)
        };

        self.location = Location::with_gtid_set(self.first_position.clone(), gtid_set);
        Ok(())
    }
}

impl fmt::Display for DdlItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "location: {} ddls: {:?} source: {}",
            self.location, self.ddls, self.source
        )
    }
}

/// An ordered sequence of [`DdlItem`], append-only in normal operation.
///
/// Insertion order is arrival order for the sequence's scope (one source, or
/// the merged global view).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DdlSequence {
    items: Vec<DdlItem>,
}

impl DdlSequence {
    pub fn from_items(items: Vec<DdlItem>) -> Self {
        Self { items }
    }

    pub fn items(&self) -> &[DdlItem] {
        &self.items
    }

    pub(crate) fn items_mut(&mut self) -> &mut [DdlItem] {
        &mut self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub(crate) fn push(&mut self, item: DdlItem) {
        self.items.push(item);
    }

    /// Structural prefix check: `self` is a prefix of `other` iff it is no
    /// longer and every index holds an identical statement batch. Positions
    /// are irrelevant to this comparison.
    pub fn is_prefix_of(&self, other: &DdlSequence) -> bool {
        if self.items.len() > other.items.len() {
            return false;
        }
        self.items
            .iter()
            .zip(other.items.iter())
            .all(|(a, b)| a.ddls == b.ddls)
    }

    /// Canonical JSON encoding of the item list, used as the persisted
    /// payload and for diagnostics.
    pub fn to_canonical_json(&self) -> SyncResult<String> {
        Ok(serde_json::to_string(&self.items)?)
    }

    /// Decodes an item list previously produced by
    /// [`DdlSequence::to_canonical_json`]. Locations are not yet attached.
    pub(crate) fn from_canonical_json(data: &[u8]) -> SyncResult<Self> {
        let items: Vec<DdlItem> = serde_json::from_slice(data)?;
        Ok(Self { items })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(pos: u32, ddls: &[&str], source: &str) -> DdlItem {
        DdlItem::new(
            Location::new(BinlogPosition::new("mysql-bin.000001", pos)),
            ddls.iter().map(|s| s.to_string()).collect(),
            source,
        )
    }

    #[test]
    fn test_empty_sequence_is_prefix_of_everything() {
        let empty = DdlSequence::default();
        let other = DdlSequence::from_items(vec![item(4, &["ALTER TABLE t ADD c1 INT"], "a")]);

        assert!(empty.is_prefix_of(&other));
        assert!(empty.is_prefix_of(&empty));
        assert!(!other.is_prefix_of(&empty));
    }

    #[test]
    fn test_prefix_compares_statement_batches_only() {
        // Same statements at different positions still count as a prefix.
        let a = DdlSequence::from_items(vec![item(4, &["ALTER TABLE t ADD c1 INT"], "a")]);
        let b = DdlSequence::from_items(vec![
            item(999, &["ALTER TABLE t ADD c1 INT"], "b"),
            item(1200, &["ALTER TABLE t ADD c2 INT"], "b"),
        ]);

        assert!(a.is_prefix_of(&b));
    }

    #[test]
    fn test_prefix_rejects_differing_batches() {
        let a = DdlSequence::from_items(vec![item(4, &["ALTER TABLE t ADD c1 INT"], "a")]);
        let b = DdlSequence::from_items(vec![item(4, &["ALTER TABLE t ADD c2 INT"], "b")]);

        assert!(!a.is_prefix_of(&b));
    }

    #[test]
    fn test_prefix_compares_whole_batches() {
        let a = DdlSequence::from_items(vec![item(4, &["DROP INDEX i ON t"], "a")]);
        let b = DdlSequence::from_items(vec![item(
            4,
            &["DROP INDEX i ON t", "ALTER TABLE t ADD c1 INT"],
            "b",
        )]);

        assert!(!a.is_prefix_of(&b));
    }

    #[test]
    fn test_canonical_json_round_trip() {
        let sequence = DdlSequence::from_items(vec![
            item(4, &["ALTER TABLE t ADD c1 INT"], "`db`.`t1`"),
            item(222, &["ALTER TABLE t ADD c2 INT"], "`db`.`t2`"),
        ]);

        let encoded = sequence.to_canonical_json().unwrap();
        let mut decoded = DdlSequence::from_canonical_json(encoded.as_bytes()).unwrap();
        for decoded_item in decoded.items_mut() {
            decoded_item
                .reattach_location(ReplicationFlavor::MySql)
                .unwrap();
        }

        assert_eq!(decoded, sequence);
    }

    #[test]
    fn test_gtid_text_survives_round_trip() {
        let gtid_text = "3e11fa47-71ca-11e1-9e33-c80aa9429562:1-5";
        let location = Location::with_gtid_set(
            BinlogPosition::new("mysql-bin.000007", 42),
            Some(GtidSet::parse(ReplicationFlavor::MySql, gtid_text).unwrap()),
        );
        let sequence = DdlSequence::from_items(vec![DdlItem::new(
            location.clone(),
            vec!["ALTER TABLE t ADD c1 INT".to_string()],
            "`db`.`t1`",
        )]);

        let encoded = sequence.to_canonical_json().unwrap();
        let mut decoded = DdlSequence::from_canonical_json(encoded.as_bytes()).unwrap();
        decoded.items_mut()[0]
            .reattach_location(ReplicationFlavor::MySql)
            .unwrap();

        assert_eq!(decoded.items()[0].location, location);
    }

    #[test]
    fn test_restore_fails_on_bad_gtid_text() {
        let mut broken = item(4, &["ALTER TABLE t ADD c1 INT"], "a");
        broken.first_gtid_set = "definitely not a gtid set".to_string();

        assert!(
            broken
                .reattach_location(ReplicationFlavor::MySql)
                .is_err()
        );
    }
}
