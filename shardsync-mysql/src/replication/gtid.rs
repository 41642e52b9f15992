use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// The replication flavor of an upstream server.
///
/// GTID sets are flavor specific: MySQL uses `server_uuid:interval` sets while
/// MariaDB uses `domain-server-sequence` triples. Persisted GTID text must be
/// reparsed against the flavor of the server that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplicationFlavor {
    MySql,
    MariaDb,
}

impl ReplicationFlavor {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MySql => "mysql",
            Self::MariaDb => "mariadb",
        }
    }
}

impl Default for ReplicationFlavor {
    fn default() -> Self {
        Self::MySql
    }
}

impl fmt::Display for ReplicationFlavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReplicationFlavor {
    type Err = GtidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mysql" => Ok(Self::MySql),
            "mariadb" => Ok(Self::MariaDb),
            other => Err(GtidError::UnknownFlavor(other.to_string())),
        }
    }
}

/// Errors that can occur while parsing GTID text.
#[derive(Debug, Error)]
pub enum GtidError {
    #[error("unknown replication flavor: {0}")]
    UnknownFlavor(String),

    #[error("invalid GTID set {text:?}: {reason}")]
    InvalidSet { text: String, reason: String },
}

impl GtidError {
    fn invalid(text: &str, reason: impl Into<String>) -> Self {
        Self::InvalidSet {
            text: text.to_string(),
            reason: reason.into(),
        }
    }
}

/// A flavor-polymorphic GTID set.
///
/// Only equality and set containment are meaningful operations; GTID sets are
/// not totally ordered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GtidSet {
    MySql(MysqlGtidSet),
    MariaDb(MariadbGtidSet),
}

impl GtidSet {
    /// Parses GTID text against a replication flavor.
    ///
    /// Empty (or all-whitespace) text parses to the flavor's empty set.
    pub fn parse(flavor: ReplicationFlavor, text: &str) -> Result<Self, GtidError> {
        match flavor {
            ReplicationFlavor::MySql => MysqlGtidSet::parse(text).map(Self::MySql),
            ReplicationFlavor::MariaDb => MariadbGtidSet::parse(text).map(Self::MariaDb),
        }
    }

    pub fn flavor(&self) -> ReplicationFlavor {
        match self {
            Self::MySql(_) => ReplicationFlavor::MySql,
            Self::MariaDb(_) => ReplicationFlavor::MariaDb,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::MySql(set) => set.is_empty(),
            Self::MariaDb(set) => set.is_empty(),
        }
    }

    /// Returns `true` if `self` contains every transaction in `other`.
    ///
    /// Sets of different flavors never contain each other.
    pub fn contains(&self, other: &GtidSet) -> bool {
        match (self, other) {
            (Self::MySql(a), Self::MySql(b)) => a.contains(b),
            (Self::MariaDb(a), Self::MariaDb(b)) => a.contains(b),
            _ => false,
        }
    }
}

impl fmt::Display for GtidSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MySql(set) => set.fmt(f),
            Self::MariaDb(set) => set.fmt(f),
        }
    }
}

/// A MySQL GTID set: server UUID to a normalized list of closed intervals.
///
/// Intervals are kept sorted, disjoint and non-adjacent, so structural
/// equality matches set equality.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MysqlGtidSet {
    intervals: BTreeMap<Uuid, Vec<(u64, u64)>>,
}

impl MysqlGtidSet {
    /// Parses text like `3e11fa47-...-c80aa9429562:1-5:11,859b0a1a-...:1-4`.
    pub fn parse(text: &str) -> Result<Self, GtidError> {
        let mut set = Self::default();
        for part in text.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }

            let mut pieces = part.split(':');
            let uuid_text = pieces
                .next()
                .ok_or_else(|| GtidError::invalid(text, "missing server UUID"))?;
            let uuid = Uuid::parse_str(uuid_text.trim())
                .map_err(|err| GtidError::invalid(text, format!("bad server UUID: {err}")))?;

            let mut parsed_any = false;
            for interval in pieces {
                let (start, end) = parse_interval(text, interval.trim())?;
                set.intervals.entry(uuid).or_default().push((start, end));
                parsed_any = true;
            }
            if !parsed_any {
                return Err(GtidError::invalid(text, "missing transaction interval"));
            }
        }

        for intervals in set.intervals.values_mut() {
            normalize_intervals(intervals);
        }

        Ok(set)
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    pub fn contains(&self, other: &MysqlGtidSet) -> bool {
        for (uuid, intervals) in &other.intervals {
            let Some(own) = self.intervals.get(uuid) else {
                return false;
            };
            for &(start, end) in intervals {
                if !own
                    .iter()
                    .any(|&(own_start, own_end)| own_start <= start && end <= own_end)
                {
                    return false;
                }
            }
        }
        true
    }
}

impl fmt::Display for MysqlGtidSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (uuid, intervals) in &self.intervals {
            if !first {
                f.write_str(",")?;
            }
            first = false;

            write!(f, "{uuid}")?;
            for &(start, end) in intervals {
                if start == end {
                    write!(f, ":{start}")?;
                } else {
                    write!(f, ":{start}-{end}")?;
                }
            }
        }
        Ok(())
    }
}

/// A MariaDB GTID set: replication domain to the latest seen
/// `(server_id, sequence)` pair.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MariadbGtidSet {
    streams: BTreeMap<u32, (u32, u64)>,
}

impl MariadbGtidSet {
    /// Parses text like `0-1-100,1-2-42`.
    pub fn parse(text: &str) -> Result<Self, GtidError> {
        let mut set = Self::default();
        for part in text.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }

            let fields: Vec<&str> = part.split('-').collect();
            if fields.len() != 3 {
                return Err(GtidError::invalid(
                    text,
                    "expected domain-server-sequence triple",
                ));
            }
            let domain = parse_number::<u32>(text, fields[0], "domain id")?;
            let server = parse_number::<u32>(text, fields[1], "server id")?;
            let sequence = parse_number::<u64>(text, fields[2], "sequence number")?;

            // Within one domain the highest sequence wins.
            match set.streams.get(&domain) {
                Some(&(_, existing)) if existing >= sequence => {}
                _ => {
                    set.streams.insert(domain, (server, sequence));
                }
            }
        }
        Ok(set)
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    pub fn contains(&self, other: &MariadbGtidSet) -> bool {
        for (domain, &(_, sequence)) in &other.streams {
            match self.streams.get(domain) {
                Some(&(_, own_sequence)) if own_sequence >= sequence => {}
                _ => return false,
            }
        }
        true
    }
}

impl fmt::Display for MariadbGtidSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (domain, &(server, sequence)) in &self.streams {
            if !first {
                f.write_str(",")?;
            }
            first = false;
            write!(f, "{domain}-{server}-{sequence}")?;
        }
        Ok(())
    }
}

fn parse_interval(text: &str, interval: &str) -> Result<(u64, u64), GtidError> {
    let (start, end) = match interval.split_once('-') {
        Some((start, end)) => (
            parse_number::<u64>(text, start, "interval start")?,
            parse_number::<u64>(text, end, "interval end")?,
        ),
        None => {
            let single = parse_number::<u64>(text, interval, "transaction id")?;
            (single, single)
        }
    };

    if start == 0 || end < start {
        return Err(GtidError::invalid(
            text,
            format!("bad interval {start}-{end}"),
        ));
    }
    Ok((start, end))
}

fn parse_number<T: FromStr>(text: &str, field: &str, what: &str) -> Result<T, GtidError> {
    field
        .trim()
        .parse::<T>()
        .map_err(|_| GtidError::invalid(text, format!("bad {what}: {field:?}")))
}

/// Sorts intervals and merges overlapping or adjacent ones in place.
fn normalize_intervals(intervals: &mut Vec<(u64, u64)>) {
    intervals.sort_unstable();
    let mut merged: Vec<(u64, u64)> = Vec::with_capacity(intervals.len());
    for &(start, end) in intervals.iter() {
        match merged.last_mut() {
            Some(last) if start <= last.1.saturating_add(1) => {
                last.1 = last.1.max(end);
            }
            _ => merged.push((start, end)),
        }
    }
    *intervals = merged;
}
