use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A position inside a MySQL binlog stream.
///
/// Unlike PostgreSQL's LSN, MySQL positions are a binlog file name plus a byte
/// offset within that file. Ordering compares the numeric file suffix before
/// the offset, so that `mysql-bin.000100` sorts after `mysql-bin.000099` even
/// when the names would not compare that way lexically.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinlogPosition {
    /// The binlog file name, e.g. `mysql-bin.000001`.
    pub file: String,
    /// The byte offset within the binlog file.
    pub pos: u32,
}

impl BinlogPosition {
    pub fn new(file: impl Into<String>, pos: u32) -> Self {
        Self {
            file: file.into(),
            pos,
        }
    }

    /// Splits the file name into its base name and numeric rotation suffix.
    ///
    /// Binlog files are typically named like `mysql-bin.000123`. Returns
    /// [`None`] when the name carries no parsable numeric suffix.
    fn file_sequence(&self) -> Option<(&str, u64)> {
        let (base, suffix) = self.file.rsplit_once('.')?;
        let sequence = suffix.parse::<u64>().ok()?;
        Some((base, sequence))
    }
}

impl Ord for BinlogPosition {
    fn cmp(&self, other: &Self) -> Ordering {
        let by_file = match (self.file_sequence(), other.file_sequence()) {
            (Some((base_a, seq_a)), Some((base_b, seq_b))) if base_a == base_b => {
                seq_a.cmp(&seq_b)
            }
            _ => self.file.cmp(&other.file),
        };

        by_file
            .then(self.pos.cmp(&other.pos))
            // Keeps the ordering consistent with equality when two names carry
            // the same numeric suffix in different spellings.
            .then_with(|| self.file.cmp(&other.file))
    }
}

impl PartialOrd for BinlogPosition {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for BinlogPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.file, self.pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_ordering_within_file() {
        let a = BinlogPosition::new("mysql-bin.000001", 4);
        let b = BinlogPosition::new("mysql-bin.000001", 1024);

        assert!(a < b);
        assert_eq!(a.cmp(&a), Ordering::Equal);
    }

    #[test]
    fn test_position_ordering_across_files() {
        let a = BinlogPosition::new("mysql-bin.000099", 999_999);
        let b = BinlogPosition::new("mysql-bin.000100", 4);

        assert!(a < b);
    }

    #[test]
    fn test_position_ordering_numeric_suffix() {
        // Lexical comparison would get this wrong.
        let a = BinlogPosition::new("mysql-bin.999999", 4);
        let b = BinlogPosition::new("mysql-bin.1000000", 4);

        assert!(a < b);
    }

    #[test]
    fn test_position_ordering_without_suffix() {
        let a = BinlogPosition::new("binlog-a", 10);
        let b = BinlogPosition::new("binlog-b", 5);

        assert!(a < b);
    }

    #[test]
    fn test_position_serde_round_trip() {
        let position = BinlogPosition::new("mysql-bin.000042", 1337);
        let encoded = serde_json::to_string(&position).unwrap();
        let decoded: BinlogPosition = serde_json::from_str(&encoded).unwrap();

        assert_eq!(position, decoded);
    }

    #[test]
    fn test_position_display() {
        let position = BinlogPosition::new("mysql-bin.000001", 4);
        assert_eq!(position.to_string(), "(mysql-bin.000001, 4)");
    }
}
