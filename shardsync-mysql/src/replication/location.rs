use std::cmp::Ordering;
use std::fmt;

use crate::replication::gtid::GtidSet;
use crate::replication::position::BinlogPosition;

/// A replication location: a binlog position plus the optional GTID set
/// observed at that position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
    pub position: BinlogPosition,
    pub gtid_set: Option<GtidSet>,
}

impl Location {
    pub fn new(position: BinlogPosition) -> Self {
        Self {
            position,
            gtid_set: None,
        }
    }

    pub fn with_gtid_set(position: BinlogPosition, gtid_set: Option<GtidSet>) -> Self {
        Self { position, gtid_set }
    }

    /// Returns the textual form of the GTID set, or an empty string when the
    /// location carries none. This text is what survives persistence.
    pub fn gtid_text(&self) -> String {
        self.gtid_set
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default()
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "position: {}, gtid-set: {}", self.position, self.gtid_text())
    }
}

/// Compares two replication locations.
///
/// In offset mode this is a pure binlog position comparison. In GTID mode the
/// GTID sets are compared by containment (equal, superset, subset); when either
/// side lacks a set or the sets are incomparable, the comparison falls back to
/// the binlog position.
pub fn compare_locations(a: &Location, b: &Location, enable_gtid: bool) -> Ordering {
    if enable_gtid
        && let (Some(set_a), Some(set_b)) = (&a.gtid_set, &b.gtid_set)
    {
        if set_a == set_b {
            return Ordering::Equal;
        }
        if set_a.contains(set_b) {
            return Ordering::Greater;
        }
        if set_b.contains(set_a) {
            return Ordering::Less;
        }
    }

    a.position.cmp(&b.position)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replication::gtid::ReplicationFlavor;

    const UUID_A: &str = "3e11fa47-71ca-11e1-9e33-c80aa9429562";

    fn gtid(text: &str) -> Option<GtidSet> {
        Some(GtidSet::parse(ReplicationFlavor::MySql, text).unwrap())
    }

    #[test]
    fn test_offset_mode_compares_positions() {
        let a = Location::new(BinlogPosition::new("mysql-bin.000001", 4));
        let b = Location::new(BinlogPosition::new("mysql-bin.000001", 200));

        assert_eq!(compare_locations(&a, &b, false), Ordering::Less);
        assert_eq!(compare_locations(&a, &a, false), Ordering::Equal);
    }

    #[test]
    fn test_offset_mode_ignores_gtid_sets() {
        let a = Location::with_gtid_set(
            BinlogPosition::new("mysql-bin.000001", 4),
            gtid(&format!("{UUID_A}:1-10")),
        );
        let b = Location::with_gtid_set(
            BinlogPosition::new("mysql-bin.000001", 4),
            gtid(&format!("{UUID_A}:1-5")),
        );

        assert_eq!(compare_locations(&a, &b, false), Ordering::Equal);
    }

    #[test]
    fn test_gtid_mode_containment() {
        let superset = Location::with_gtid_set(
            BinlogPosition::new("mysql-bin.000001", 4),
            gtid(&format!("{UUID_A}:1-10")),
        );
        let subset = Location::with_gtid_set(
            BinlogPosition::new("mysql-bin.000009", 4),
            gtid(&format!("{UUID_A}:1-5")),
        );

        assert_eq!(compare_locations(&superset, &subset, true), Ordering::Greater);
        assert_eq!(compare_locations(&subset, &superset, true), Ordering::Less);
        assert_eq!(compare_locations(&subset, &subset, true), Ordering::Equal);
    }

    #[test]
    fn test_gtid_mode_incomparable_falls_back_to_position() {
        let a = Location::with_gtid_set(
            BinlogPosition::new("mysql-bin.000001", 4),
            gtid(&format!("{UUID_A}:1-3:10")),
        );
        let b = Location::with_gtid_set(
            BinlogPosition::new("mysql-bin.000002", 4),
            gtid(&format!("{UUID_A}:1-5")),
        );

        assert_eq!(compare_locations(&a, &b, true), Ordering::Less);
    }

    #[test]
    fn test_gtid_mode_missing_set_falls_back_to_position() {
        let a = Location::new(BinlogPosition::new("mysql-bin.000001", 4));
        let b = Location::with_gtid_set(
            BinlogPosition::new("mysql-bin.000001", 4),
            gtid(&format!("{UUID_A}:1-5")),
        );

        assert_eq!(compare_locations(&a, &b, true), Ordering::Equal);
    }
}
