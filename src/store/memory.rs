use super::{Change, RecordStore};
use crate::core::{Column, PersistenceError, Record, Result, TableDef, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, RwLock};
use tracing::{Level, event};

/// Write counters since creation or the last [`InMemoryRecordStore::reset_stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub inserts: usize,
    pub updates: usize,
    pub deletes: usize,
    pub version_increments: usize,
}

impl StoreStats {
    pub fn total_writes(&self) -> usize {
        self.inserts + self.updates + self.deletes + self.version_increments
    }
}

#[derive(Debug)]
struct MemoryTable {
    def: Arc<TableDef>,
    rows: BTreeMap<usize, Vec<Value>>,
    next_row_id: usize,
    pk_index: HashMap<Vec<Value>, usize>,
}

impl MemoryTable {
    fn new(def: Arc<TableDef>) -> Self {
        Self {
            def,
            rows: BTreeMap::new(),
            next_row_id: 0,
            pk_index: HashMap::new(),
        }
    }

    fn column_index(&self, column: &str) -> Result<usize> {
        self.def.resolve_column(column).ok_or_else(|| {
            PersistenceError::SchemaMismatch(format!(
                "Column '{}' not found in table '{}'",
                column,
                self.def.name()
            ))
        })
    }

    fn key_of(&self, values: &[Value]) -> Result<Vec<Value>> {
        self.def
            .primary_key_columns()
            .iter()
            .map(|column| self.column_index(column).map(|idx| values[idx].clone()))
            .collect()
    }

    fn find_row(&self, values: &[Value]) -> Result<Option<usize>> {
        let key = self.key_of(values)?;
        Ok(self.pk_index.get(&key).copied())
    }

    fn put(&mut self, row_id: usize, values: Vec<Value>) -> Result<()> {
        let key = self.key_of(&values)?;
        self.pk_index.insert(key, row_id);
        self.rows.insert(row_id, values);
        Ok(())
    }

    fn remove(&mut self, row_id: usize) -> Result<Option<Vec<Value>>> {
        let Some(row) = self.rows.remove(&row_id) else {
            return Ok(None);
        };
        let key = self.key_of(&row)?;
        self.pk_index.remove(&key);
        Ok(Some(row))
    }

    fn validate(&self, values: &[Value]) -> Result<()> {
        if values.len() != self.def.column_count() {
            return Err(PersistenceError::SchemaMismatch(format!(
                "Table '{}' expects {} values, got {}",
                self.def.name(),
                self.def.column_count(),
                values.len()
            )));
        }
        for (column, value) in self.def.columns().iter().zip(values) {
            column.validate(self.def.name(), value)?;
        }
        Ok(())
    }

    fn version_index(&self) -> Result<Option<usize>> {
        self.def
            .version_column_name()
            .map(|column| self.column_index(column))
            .transpose()
    }

    fn to_record(&self, values: &[Value]) -> Result<Record> {
        Record::from_values(self.def.clone(), values.to_vec())
    }
}

fn table_key(name: &str) -> String {
    name.to_ascii_uppercase()
}

fn columns_match(row: &[Value], columns: &[usize], values: &[Value]) -> bool {
    columns.iter().zip(values).all(|(idx, value)| &row[*idx] == value)
}

fn render(values: &[Value]) -> String {
    values
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Every non-NULL foreign key of `values` must point at an existing row.
fn check_references(
    tables: &HashMap<String, MemoryTable>,
    def: &TableDef,
    values: &[Value],
) -> Result<()> {
    for fk in def.foreign_keys() {
        let mut fk_values = Vec::with_capacity(fk.columns.len());
        for column in &fk.columns {
            let idx = def.resolve_column(column).ok_or_else(|| {
                PersistenceError::SchemaMismatch(format!(
                    "Foreign key '{}' uses unknown column '{}'",
                    fk.name, column
                ))
            })?;
            fk_values.push(values[idx].clone());
        }
        if fk_values.iter().any(Value::is_null) {
            continue;
        }

        let target = tables.get(&table_key(&fk.target_table)).ok_or_else(|| {
            PersistenceError::Configuration(format!(
                "Foreign key '{}' references unknown table '{}'",
                fk.name, fk.target_table
            ))
        })?;
        let target_columns = fk
            .target_columns
            .iter()
            .map(|column| target.column_index(column))
            .collect::<Result<Vec<_>>>()?;

        let exists = target
            .rows
            .values()
            .any(|row| columns_match(row, &target_columns, &fk_values));
        if !exists {
            return Err(PersistenceError::ConstraintViolation(format!(
                "Foreign key violation: value ({}) in '{}.{}' references non-existent key in '{}.{}'",
                render(&fk_values),
                def.name(),
                fk.columns.join(","),
                fk.target_table,
                fk.target_columns.join(",")
            )));
        }
    }
    Ok(())
}

/// No row of any table may still reference `row` of `def`.
fn check_not_referenced(
    tables: &HashMap<String, MemoryTable>,
    def: &TableDef,
    row: &[Value],
) -> Result<()> {
    for other in tables.values() {
        for fk in other
            .def
            .foreign_keys()
            .iter()
            .filter(|fk| def.is_named(&fk.target_table))
        {
            let mut target_values = Vec::with_capacity(fk.target_columns.len());
            for column in &fk.target_columns {
                let idx = def.resolve_column(column).ok_or_else(|| {
                    PersistenceError::SchemaMismatch(format!(
                        "Foreign key '{}' targets unknown column '{}.{}'",
                        fk.name,
                        def.name(),
                        column
                    ))
                })?;
                target_values.push(row[idx].clone());
            }
            let fk_columns = fk
                .columns
                .iter()
                .map(|column| other.column_index(column))
                .collect::<Result<Vec<_>>>()?;

            if other
                .rows
                .values()
                .any(|r| columns_match(r, &fk_columns, &target_values))
            {
                return Err(PersistenceError::ConstraintViolation(format!(
                    "Delete from '{}' violates foreign key constraint '{}' on '{}'",
                    def.name(),
                    fk.name,
                    other.def.name()
                )));
            }
        }
    }
    Ok(())
}

/// A [`RecordStore`] over in-memory tables.
///
/// Enforces primary keys, NOT NULL columns and foreign keys (restrict on
/// delete), honours version columns, and journals writes between
/// [`begin`](Self::begin) and [`commit`](Self::commit) so they can be
/// rolled back.
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    tables: RwLock<HashMap<String, MemoryTable>>,
    journal: Mutex<Option<Vec<Change>>>,
    stats: Mutex<StoreStats>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tables(tables: impl IntoIterator<Item = Arc<TableDef>>) -> Result<Self> {
        let store = Self::new();
        for table in tables {
            store.register_table(table)?;
        }
        Ok(store)
    }

    pub fn register_table(&self, def: Arc<TableDef>) -> Result<()> {
        def.validate()?;
        let mut tables = self.tables.write()?;
        let key = table_key(def.name());
        if tables.contains_key(&key) {
            return Err(PersistenceError::Configuration(format!(
                "Table '{}' already registered",
                def.name()
            )));
        }
        tables.insert(key, MemoryTable::new(def));
        Ok(())
    }

    pub fn table_def(&self, table: &str) -> Option<Arc<TableDef>> {
        let tables = self.tables.read().ok()?;
        tables.get(&table_key(table)).map(|t| t.def.clone())
    }

    /// Every row of `table`, in insertion order.
    pub fn rows(&self, table: &str) -> Result<Vec<Record>> {
        let tables = self.tables.read()?;
        let memory = Self::table(&tables, table)?;
        memory.rows.values().map(|row| memory.to_record(row)).collect()
    }

    pub fn count(&self, table: &str) -> Result<usize> {
        let tables = self.tables.read()?;
        Ok(Self::table(&tables, table)?.rows.len())
    }

    pub fn stats(&self) -> StoreStats {
        self.stats.lock().map(|s| *s).unwrap_or_default()
    }

    pub fn reset_stats(&self) -> Result<()> {
        *self.stats.lock()? = StoreStats::default();
        Ok(())
    }

    pub fn begin(&self) -> Result<()> {
        let mut journal = self.journal.lock()?;
        if journal.is_some() {
            return Err(PersistenceError::Store(
                "A transaction is already active".to_string(),
            ));
        }
        *journal = Some(Vec::new());
        Ok(())
    }

    pub fn in_transaction(&self) -> bool {
        self.journal.lock().map(|j| j.is_some()).unwrap_or(false)
    }

    pub fn commit(&self) -> Result<()> {
        let changes = self.journal.lock()?.take().ok_or_else(|| {
            PersistenceError::Store("No active transaction to commit".to_string())
        })?;
        event!(Level::DEBUG, changes = changes.len(), "transaction committed");
        Ok(())
    }

    /// Undoes every journaled write, newest first.
    pub fn rollback(&self) -> Result<()> {
        let changes = self.journal.lock()?.take().ok_or_else(|| {
            PersistenceError::Store("No active transaction to roll back".to_string())
        })?;
        let mut tables = self.tables.write()?;
        for change in changes.iter().rev() {
            let table = tables
                .get_mut(&table_key(change.table_name()))
                .ok_or_else(|| PersistenceError::Store(format!(
                    "Table '{}' vanished during rollback",
                    change.table_name()
                )))?;
            match change {
                Change::InsertRow { row_id, .. } => {
                    table.remove(*row_id)?;
                }
                Change::UpdateRow {
                    row_id, old_row, ..
                }
                | Change::DeleteRow {
                    row_id, old_row, ..
                } => {
                    table.remove(*row_id)?;
                    table.put(*row_id, old_row.clone())?;
                }
            }
        }
        event!(Level::DEBUG, changes = changes.len(), "transaction rolled back");
        Ok(())
    }

    fn table<'a>(tables: &'a HashMap<String, MemoryTable>, name: &str) -> Result<&'a MemoryTable> {
        tables.get(&table_key(name)).ok_or_else(|| {
            PersistenceError::Configuration(format!("Table '{}' not found", name))
        })
    }

    /// The table `record` belongs to, provided the record carries exactly
    /// the registered columns in the registered order.
    fn bound_table<'a>(
        tables: &'a HashMap<String, MemoryTable>,
        record: &Record,
    ) -> Result<&'a MemoryTable> {
        let table = Self::table(tables, record.record_type())?;
        let registered = table.def.columns();
        let given = record.table().columns();
        let same_shape = registered.len() == given.len()
            && record.values().len() == registered.len()
            && registered
                .iter()
                .zip(given)
                .all(|(a, b)| a.name.eq_ignore_ascii_case(&b.name));
        if !same_shape {
            let names = |columns: &[Column]| {
                columns
                    .iter()
                    .map(|c| c.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            return Err(PersistenceError::SchemaMismatch(format!(
                "Record for '{}' has columns ({}) but the table has ({})",
                table.def.name(),
                names(given),
                names(registered)
            )));
        }
        Ok(table)
    }

    fn table_mut<'a>(
        tables: &'a mut HashMap<String, MemoryTable>,
        name: &str,
    ) -> Result<&'a mut MemoryTable> {
        tables.get_mut(&table_key(name)).ok_or_else(|| {
            PersistenceError::Configuration(format!("Table '{}' not found", name))
        })
    }

    fn journal(&self, change: Change) -> Result<()> {
        if let Some(changes) = self.journal.lock()?.as_mut() {
            changes.push(change);
        }
        Ok(())
    }

    fn count_write(&self, apply: impl FnOnce(&mut StoreStats)) -> Result<()> {
        apply(&mut *self.stats.lock()?);
        Ok(())
    }
}

impl RecordStore for InMemoryRecordStore {
    fn insert(&self, record: &Record) -> Result<usize> {
        let mut tables = self.tables.write()?;
        let mut values = record.values().to_vec();
        let table_name = {
            let table = Self::bound_table(&tables, record)?;
            if let Some(idx) = table.version_index()?
                && values[idx].is_null()
            {
                values[idx] = Value::Integer(0);
            }
            table.validate(&values)?;
            if table.find_row(&values)?.is_some() {
                return Err(PersistenceError::ConstraintViolation(format!(
                    "Duplicate primary key ({}) in '{}'",
                    render(&table.key_of(&values)?),
                    table.def.name()
                )));
            }
            check_references(&tables, &table.def, &values)?;
            table.def.name().to_string()
        };

        let table = Self::table_mut(&mut tables, &table_name)?;
        let row_id = table.next_row_id;
        table.next_row_id += 1;
        table.put(row_id, values)?;

        self.journal(Change::InsertRow {
            table: table_name.clone(),
            row_id,
        })?;
        self.count_write(|s| s.inserts += 1)?;
        event!(Level::TRACE, table = %table_name, row_id, "record inserted");
        Ok(1)
    }

    fn update(&self, record: &Record) -> Result<usize> {
        let mut tables = self.tables.write()?;
        let mut values = record.values().to_vec();
        let (table_name, row_id, old_row) = {
            let table = Self::bound_table(&tables, record)?;
            let Some(row_id) = table.find_row(&values)? else {
                return Ok(0);
            };
            let old_row = table.rows[&row_id].clone();
            if let Some(idx) = table.version_index()? {
                let stored = old_row[idx].as_i64().unwrap_or(0);
                let expected = values[idx].as_i64().unwrap_or(0);
                if stored != expected {
                    event!(
                        Level::DEBUG,
                        table = %table.def.name(),
                        stored,
                        expected,
                        "stale version, update skipped"
                    );
                    return Ok(0);
                }
                values[idx] = Value::Integer(stored + 1);
            }
            table.validate(&values)?;
            check_references(&tables, &table.def, &values)?;
            (table.def.name().to_string(), row_id, old_row)
        };

        let table = Self::table_mut(&mut tables, &table_name)?;
        table.put(row_id, values)?;

        self.journal(Change::UpdateRow {
            table: table_name,
            row_id,
            old_row,
        })?;
        self.count_write(|s| s.updates += 1)?;
        Ok(1)
    }

    fn delete(&self, record: &Record) -> Result<usize> {
        let mut tables = self.tables.write()?;
        let (table_name, row_id) = {
            let table = Self::bound_table(&tables, record)?;
            let Some(row_id) = table.find_row(record.values())? else {
                return Ok(0);
            };
            check_not_referenced(&tables, &table.def, &table.rows[&row_id])?;
            (table.def.name().to_string(), row_id)
        };

        let table = Self::table_mut(&mut tables, &table_name)?;
        let Some(old_row) = table.remove(row_id)? else {
            return Ok(0);
        };

        self.journal(Change::DeleteRow {
            table: table_name,
            row_id,
            old_row,
        })?;
        self.count_write(|s| s.deletes += 1)?;
        Ok(1)
    }

    fn increment_version(&self, record: &Record) -> Result<usize> {
        let mut tables = self.tables.write()?;
        let (table_name, row_id, old_row, idx) = {
            let table = Self::bound_table(&tables, record)?;
            let idx = table.version_index()?.ok_or_else(|| {
                PersistenceError::Configuration(format!(
                    "Table '{}' has no version column",
                    table.def.name()
                ))
            })?;
            let Some(row_id) = table.find_row(record.values())? else {
                return Ok(0);
            };
            let old_row = table.rows[&row_id].clone();
            let stored = old_row[idx].as_i64().unwrap_or(0);
            let expected = record.values()[idx].as_i64().unwrap_or(0);
            if stored != expected {
                return Ok(0);
            }
            (table.def.name().to_string(), row_id, old_row, idx)
        };

        let table = Self::table_mut(&mut tables, &table_name)?;
        let mut values = old_row.clone();
        values[idx] = Value::Integer(old_row[idx].as_i64().unwrap_or(0) + 1);
        table.put(row_id, values)?;

        self.journal(Change::UpdateRow {
            table: table_name,
            row_id,
            old_row,
        })?;
        self.count_write(|s| s.version_increments += 1)?;
        Ok(1)
    }

    fn select(&self, table: &str, criteria: &[(&str, Value)]) -> Result<Vec<Record>> {
        let tables = self.tables.read()?;
        let memory = Self::table(&tables, table)?;
        let columns = criteria
            .iter()
            .map(|(column, _)| memory.column_index(column))
            .collect::<Result<Vec<_>>>()?;
        let values: Vec<Value> = criteria.iter().map(|(_, v)| v.clone()).collect();

        memory
            .rows
            .values()
            .filter(|row| columns_match(row, &columns, &values))
            .map(|row| memory.to_record(row))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Column, DataType, ForeignKeyDef};

    fn store() -> InMemoryRecordStore {
        InMemoryRecordStore::with_tables([
            Arc::new(
                TableDef::new("PARENT")
                    .column(Column::new("ID", DataType::Integer).not_null())
                    .column(Column::new("NAME", DataType::Text))
                    .column(Column::new("VERSION", DataType::Integer))
                    .primary_key(&["ID"])
                    .version_column("VERSION"),
            ),
            Arc::new(
                TableDef::new("child")
                    .column(Column::new("id", DataType::Integer).not_null())
                    .column(Column::new("parent_id", DataType::Integer).not_null())
                    .primary_key(&["id"])
                    .foreign_key(ForeignKeyDef::new(&["parent_id"], "PARENT", &["ID"])),
            ),
        ])
        .unwrap()
    }

    fn parent(store: &InMemoryRecordStore, id: i64, version: i64) -> Record {
        Record::new(store.table_def("PARENT").unwrap())
            .with("ID", id)
            .unwrap()
            .with("NAME", "p")
            .unwrap()
            .with("VERSION", version)
            .unwrap()
    }

    fn child(store: &InMemoryRecordStore, id: i64, parent_id: i64) -> Record {
        Record::new(store.table_def("CHILD").unwrap())
            .with("ID", id)
            .unwrap()
            .with("PARENT_ID", parent_id)
            .unwrap()
    }

    #[test]
    fn test_foreign_key_enforced_on_insert_and_delete() {
        let store = store();
        let err = store.insert(&child(&store, 1, 7)).unwrap_err();
        assert!(matches!(err, PersistenceError::ConstraintViolation(ref m) if m.contains("non-existent key")));

        store.insert(&parent(&store, 7, 0)).unwrap();
        store.insert(&child(&store, 1, 7)).unwrap();

        let err = store.delete(&parent(&store, 7, 0)).unwrap_err();
        assert!(matches!(err, PersistenceError::ConstraintViolation(ref m) if m.contains("violates foreign key")));

        assert_eq!(store.delete(&child(&store, 1, 7)).unwrap(), 1);
        assert_eq!(store.delete(&parent(&store, 7, 0)).unwrap(), 1);
        assert_eq!(store.count("parent").unwrap(), 0);
    }

    #[test]
    fn test_versioned_update() {
        let store = store();
        store.insert(&parent(&store, 1, 0)).unwrap();

        assert_eq!(store.update(&parent(&store, 1, 0)).unwrap(), 1);
        let stored = &store.rows("PARENT").unwrap()[0];
        assert_eq!(stored.version(), Some(1));

        // same stale version again
        assert_eq!(store.update(&parent(&store, 1, 0)).unwrap(), 0);
        assert_eq!(store.increment_version(&parent(&store, 1, 0)).unwrap(), 0);
        assert_eq!(store.increment_version(&parent(&store, 1, 1)).unwrap(), 1);
        assert_eq!(store.rows("PARENT").unwrap()[0].version(), Some(2));
    }

    #[test]
    fn test_record_with_foreign_layout_rejected() {
        let store = store();
        let narrow = Arc::new(
            TableDef::new("PARENT")
                .column(Column::new("ID", DataType::Integer).not_null())
                .primary_key(&["ID"]),
        );
        let record = Record::new(narrow).with("ID", 1i64).unwrap();
        for result in [
            store.insert(&record),
            store.update(&record),
            store.delete(&record),
            store.increment_version(&record),
        ] {
            assert!(matches!(result, Err(PersistenceError::SchemaMismatch(_))));
        }

        let reordered = Arc::new(
            TableDef::new("PARENT")
                .column(Column::new("NAME", DataType::Text))
                .column(Column::new("ID", DataType::Integer).not_null())
                .column(Column::new("VERSION", DataType::Integer))
                .primary_key(&["ID"])
                .version_column("VERSION"),
        );
        let record = Record::new(reordered)
            .with("ID", 1i64)
            .unwrap()
            .with("NAME", "p")
            .unwrap();
        assert!(matches!(
            store.insert(&record),
            Err(PersistenceError::SchemaMismatch(_))
        ));
        assert_eq!(store.count("PARENT").unwrap(), 0);
    }

    #[test]
    fn test_duplicate_primary_key_rejected() {
        let store = store();
        store.insert(&parent(&store, 1, 0)).unwrap();
        assert!(matches!(
            store.insert(&parent(&store, 1, 0)),
            Err(PersistenceError::ConstraintViolation(_))
        ));
    }

    #[test]
    fn test_rollback_restores_rows() {
        let store = store();
        store.insert(&parent(&store, 1, 0)).unwrap();

        store.begin().unwrap();
        store.insert(&parent(&store, 2, 0)).unwrap();
        store.update(&parent(&store, 1, 0)).unwrap();
        store.insert(&child(&store, 10, 1)).unwrap();
        store.delete(&child(&store, 10, 1)).unwrap();
        store.rollback().unwrap();

        let rows = store.rows("PARENT").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].version(), Some(0));
        assert_eq!(store.count("child").unwrap(), 0);
        assert!(!store.in_transaction());
        assert_eq!(store.stats().inserts, 3);
    }

    #[test]
    fn test_select_by_columns_case_insensitive() {
        let store = store();
        store.insert(&parent(&store, 1, 0)).unwrap();
        store.insert(&child(&store, 10, 1)).unwrap();
        store.insert(&child(&store, 11, 1)).unwrap();

        let rows = store
            .select("CHILD", &[("PARENT_ID", Value::Integer(1))])
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert!(store.select("CHILD", &[("NOPE", Value::Null)]).is_err());
    }
}
