use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use tracing::{debug, info};

use shardsync_mysql::replication::{Location, ReplicationFlavor, compare_locations};
use shardsync_mysql::types::TableName;

use crate::bail;
use crate::config::ShardGroupConfig;
use crate::error::{ErrorKind, SyncResult};
use crate::state::ddl::{DdlItem, DdlSequence};
use crate::store::{SqlStatement, SqlValue};

/// Sharding-DDL reconciliation state for one shard group.
///
/// Holds the merged global DDL sequence, each source's own sequence, and the
/// shared active cursor marking the next DDL step not yet applied downstream.
/// All sources are expected to eventually carry identical content at every
/// index, so one cursor tracks progress for the whole group.
///
/// Not thread safe; all DDL arrivals and apply completions for one group must
/// go through a single serialized caller. Distinct groups are independent.
#[derive(Debug)]
pub struct ShardDdlState {
    /// Index of the first unapplied DDL, shared across the global sequence
    /// and every source sequence.
    active_index: usize,
    /// Leading-edge union of all source sequences: entry `i` is contributed
    /// by whichever source reached step `i` first.
    global: DdlSequence,
    /// Source table identity to its own observed sequence. Every value is a
    /// structural prefix of `global`.
    sources: BTreeMap<String, DdlSequence>,
    /// Quoted identifier of the downstream meta table the flush SQL targets.
    meta_table: String,
    /// Whether locations compare by GTID set instead of binlog offset.
    enable_gtid: bool,
}

impl ShardDdlState {
    /// Creates an empty state for the group whose meta rows live in
    /// `schema`.`table`.
    pub fn new(schema: &str, table: &str, config: &ShardGroupConfig) -> Self {
        Self {
            active_index: 0,
            global: DdlSequence::default(),
            sources: BTreeMap::new(),
            meta_table: TableName::new(schema, table).as_quoted_identifier(),
            enable_gtid: config.enable_gtid,
        }
    }

    pub fn active_index(&self) -> usize {
        self.active_index
    }

    /// The merged global DDL sequence.
    pub fn global_items(&self) -> &[DdlItem] {
        self.global.items()
    }

    /// Resets the state to empty. Called automatically when the backlog
    /// drains; exposed for callers that reinitialize a group by hand.
    pub fn reinitialize(&mut self) {
        self.active_index = 0;
        self.global = DdlSequence::default();
        self.sources = BTreeMap::new();
    }

    /// Locates `item` in its source's sequence by location equality.
    ///
    /// Returns the index and `true` when an entry with an equal location
    /// exists (a redelivered event), otherwise the index the item would
    /// occupy if appended and `false`.
    fn find_item(&self, item: &DdlItem) -> (usize, bool) {
        let Some(source) = self.sources.get(&item.source) else {
            return (0, false);
        };
        for (index, existing) in source.items().iter().enumerate() {
            if compare_locations(&item.location, &existing.location, self.enable_gtid)
                == Ordering::Equal
            {
                return (index, true);
            }
        }
        (source.len(), false)
    }

    /// Adds a newly arrived DDL item to the group.
    ///
    /// Redelivery of an already recorded item is detected by location and
    /// changes nothing. Otherwise the item is appended to its source's
    /// sequence, and to the global sequence as well when this source is the
    /// first to reach the step. Returns whether the item sits at the active
    /// index, i.e. will be processed in this round.
    ///
    /// Fails with [`ErrorKind::DdlSequenceDiverged`] when the source's
    /// statement batch disagrees with what another source already contributed
    /// at the same step; the conflicting state is kept as-is for diagnosis.
    pub fn add_item(&mut self, item: DdlItem) -> SyncResult<bool> {
        let (index, exists) = self.find_item(&item);
        if exists {
            return Ok(index == self.active_index);
        }

        let source_id = item.source.clone();
        let source = self.sources.entry(source_id.clone()).or_default();
        source.push(item.clone());
        let source_len = source.len();

        if source_len > self.global.len() {
            self.global.push(item);
        }

        let source = &self.sources[&source_id];
        if !source.is_prefix_of(&self.global) {
            let detail = format!(
                "source {} sequence: {}, global sequence: {}",
                source_id,
                sequence_for_diagnostics(source),
                sequence_for_diagnostics(&self.global),
            );
            bail!(
                ErrorKind::DdlSequenceDiverged,
                "shard source DDL sequence diverges from the global sequence",
                detail
            );
        }

        debug!(
            source = %source_id,
            index,
            active_index = self.active_index,
            "recorded shard DDL item"
        );

        Ok(index == self.active_index)
    }

    /// The active DDL item of the global sequence, or [`None`] when that step
    /// has not been observed yet (wait for more sources).
    pub fn global_active_ddl(&self) -> Option<&DdlItem> {
        self.global.items().get(self.active_index)
    }

    /// The active DDL item of one source's sequence, or [`None`] when the
    /// source has not reported the active step yet.
    pub fn active_ddl_item(&self, source: &str) -> Option<&DdlItem> {
        self.sources.get(source)?.items().get(self.active_index)
    }

    /// Whether the group is mid-DDL: queued steps exist and the cursor has
    /// not drained them. Callers hold back row replication while this is
    /// true.
    pub fn in_sequence_sharding(&self) -> bool {
        !self.global.is_empty() && self.active_index < self.global.len()
    }

    /// Marks the currently active DDL as applied downstream and advances the
    /// cursor. When the whole backlog is drained the state resets to empty
    /// and `true` is returned; otherwise `false`.
    pub fn resolve_ddl(&mut self) -> bool {
        self.active_index += 1;
        if self.active_index == self.global.len() {
            self.reinitialize();
            return true;
        }
        false
    }

    /// Replication location of the active DDL in the global sequence.
    ///
    /// Fails with [`ErrorKind::ActiveIndexOutOfRange`] when the cursor is
    /// past the end, which indicates a caller bug (more resolves than queued
    /// items).
    pub fn active_ddl_location(&self) -> SyncResult<Location> {
        match self.global.items().get(self.active_index) {
            Some(item) => Ok(item.location.clone()),
            None => bail!(
                ErrorKind::ActiveIndexOutOfRange,
                "active index is past the end of the global DDL sequence",
                format!(
                    "active index: {}, global length: {}",
                    self.active_index,
                    self.global.len()
                )
            ),
        }
    }

    /// Produces the SQL persisting this state: one is-global row plus one row
    /// per source, upserted on `(target_table_id, source_table_id)` so
    /// repeated flushes overwrite. When the group is fully resolved, produces
    /// a single delete of any stale rows instead.
    pub fn flush_sql(
        &self,
        source_id: &str,
        target_table_id: &str,
    ) -> SyncResult<Vec<SqlStatement>> {
        if self.global.is_empty() {
            return Ok(vec![self.remove_sql(source_id, target_table_id)]);
        }

        let upsert = format!(
            "INSERT INTO {} \
             (`source_id`, `target_table_id`, `source_table_id`, `active_index`, `is_global`, `data`) \
             VALUES (?, ?, ?, ?, ?, ?) \
             ON DUPLICATE KEY UPDATE `data` = ?, `active_index` = ?",
            self.meta_table
        );

        let mut statements = Vec::with_capacity(1 + self.sources.len());
        let global_data = self.global.to_canonical_json()?;
        statements.push(SqlStatement::new(
            upsert.clone(),
            vec![
                SqlValue::text(source_id),
                SqlValue::text(target_table_id),
                SqlValue::text(""),
                SqlValue::Int(self.active_index as i64),
                SqlValue::Bool(true),
                SqlValue::Text(global_data.clone()),
                SqlValue::Text(global_data),
                SqlValue::Int(self.active_index as i64),
            ],
        ));

        for (source_table_id, sequence) in &self.sources {
            let data = sequence.to_canonical_json()?;
            statements.push(SqlStatement::new(
                upsert.clone(),
                vec![
                    SqlValue::text(source_id),
                    SqlValue::text(target_table_id),
                    SqlValue::text(source_table_id),
                    SqlValue::Int(self.active_index as i64),
                    SqlValue::Bool(false),
                    SqlValue::Text(data.clone()),
                    SqlValue::Text(data),
                    SqlValue::Int(self.active_index as i64),
                ],
            ));
        }

        Ok(statements)
    }

    /// Produces the SQL deleting all persisted rows of this group.
    fn remove_sql(&self, source_id: &str, target_table_id: &str) -> SqlStatement {
        SqlStatement::new(
            format!(
                "DELETE FROM {} WHERE `source_id` = ? AND `target_table_id` = ?",
                self.meta_table
            ),
            vec![SqlValue::text(source_id), SqlValue::text(target_table_id)],
        )
    }

    /// Restores one persisted sequence row into this state.
    ///
    /// Decodes the canonical sequence encoding, reparses each item's GTID
    /// text against `flavor`, and installs the sequence as the global one or
    /// as `source_table_id`'s. Must be invoked once per persisted row to
    /// fully rebuild a group's state.
    pub fn restore_from_data(
        &mut self,
        source_table_id: &str,
        active_index: usize,
        is_global: bool,
        data: &[u8],
        flavor: ReplicationFlavor,
    ) -> SyncResult<()> {
        let mut sequence = DdlSequence::from_canonical_json(data)?;
        for item in sequence.items_mut() {
            item.reattach_location(flavor)?;
        }

        debug!(
            source_table_id,
            active_index,
            is_global,
            items = sequence.len(),
            "restored shard DDL sequence"
        );

        if is_global {
            self.global = sequence;
        } else {
            self.sources.insert(source_table_id.to_string(), sequence);
        }
        self.active_index = active_index;

        Ok(())
    }

    /// Applies schema and table renames to every recorded source identity.
    ///
    /// Items in the global and per-source sequences are rewritten in place; a
    /// source map key whose own identity changed is moved to the new key
    /// (copy under the new key, delete the old one). Returns the SQL deleting
    /// stale rows under old identities and upserting fresh rows under new
    /// ones, for the caller to apply transactionally. No-op when both rename
    /// maps are empty.
    pub fn check_and_update(
        &mut self,
        target_table_id: &str,
        schema_renames: &HashMap<String, String>,
        table_renames: &HashMap<String, HashMap<String, String>>,
    ) -> SyncResult<Vec<SqlStatement>> {
        if schema_renames.is_empty() && table_renames.is_empty() {
            return Ok(Vec::new());
        }

        for item in self.global.items_mut() {
            let (new_id, changed) = renamed_source_id(&item.source, schema_renames, table_renames)?;
            if changed {
                item.source = new_id;
            }
        }

        let mut source_renames = Vec::new();
        for (source_id, sequence) in self.sources.iter_mut() {
            let (new_source_id, mut changed) =
                renamed_source_id(source_id, schema_renames, table_renames)?;
            for item in sequence.items_mut() {
                let (new_id, item_changed) =
                    renamed_source_id(&item.source, schema_renames, table_renames)?;
                if item_changed {
                    item.source = new_id;
                    changed = true;
                }
            }
            if changed {
                source_renames.push((source_id.clone(), new_source_id));
            }
        }

        let mut statements = Vec::new();
        for (old_id, new_id) in source_renames {
            if old_id != new_id {
                if let Some(sequence) = self.sources.remove(&old_id) {
                    self.sources.insert(new_id.clone(), sequence);
                }
                statements.push(self.remove_sql(&old_id, target_table_id));
            }
            info!(old = %old_id, new = %new_id, "fixing shard DDL source identity");
            statements.extend(self.flush_sql(&new_id, target_table_id)?);
        }

        Ok(statements)
    }
}

/// Applies the rename maps to one qualified source identity, returning the new
/// identity and whether anything changed.
fn renamed_source_id(
    source: &str,
    schema_renames: &HashMap<String, String>,
    table_renames: &HashMap<String, HashMap<String, String>>,
) -> SyncResult<(String, bool)> {
    let table = TableName::from_quoted_identifier(source)?;

    let mut changed = false;
    let schema = match schema_renames.get(&table.schema) {
        Some(new_schema) => {
            changed = true;
            new_schema.clone()
        }
        None => table.schema.clone(),
    };
    // Table renames are keyed by the old schema name.
    let name = match table_renames
        .get(&table.schema)
        .and_then(|renames| renames.get(&table.name))
    {
        Some(new_name) => {
            changed = true;
            new_name.clone()
        }
        None => table.name.clone(),
    };

    if !changed {
        return Ok((source.to_string(), false));
    }
    Ok((TableName::new(schema, name).as_quoted_identifier(), true))
}

/// Best-effort canonical rendering of a sequence for error details.
fn sequence_for_diagnostics(sequence: &DdlSequence) -> String {
    sequence
        .to_canonical_json()
        .unwrap_or_else(|_| format!("{sequence:?}"))
}
