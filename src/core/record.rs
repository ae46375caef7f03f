use super::{PersistenceError, Result, TableDef, Value};
use std::fmt;
use std::sync::Arc;

/// A flat relational tuple bound to the table it belongs to.
///
/// The engine treats records as opaque: mappers produce them, the providers
/// read and write individual columns by name, and the store writes them.
#[derive(Clone, PartialEq)]
pub struct Record {
    table: Arc<TableDef>,
    values: Vec<Value>,
}

impl Record {
    /// A record with every column set to NULL.
    pub fn new(table: Arc<TableDef>) -> Self {
        let values = vec![Value::Null; table.column_count()];
        Self { table, values }
    }

    pub fn from_values(table: Arc<TableDef>, values: Vec<Value>) -> Result<Self> {
        if values.len() != table.column_count() {
            return Err(PersistenceError::SchemaMismatch(format!(
                "Table '{}' has {} columns, got {} values",
                table.name(),
                table.column_count(),
                values.len()
            )));
        }
        Ok(Self { table, values })
    }

    pub fn table(&self) -> &Arc<TableDef> {
        &self.table
    }

    pub fn record_type(&self) -> &str {
        self.table.name()
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    fn column_index(&self, column: &str) -> Result<usize> {
        self.table.resolve_column(column).ok_or_else(|| {
            PersistenceError::SchemaMismatch(format!(
                "Record type '{}' has no column '{}' (tried {}, {} and {})",
                self.table.name(),
                column,
                column,
                column.to_ascii_uppercase(),
                column.to_ascii_lowercase()
            ))
        })
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.table.resolve_column(column).is_some()
    }

    pub fn get(&self, column: &str) -> Result<&Value> {
        let idx = self.column_index(column)?;
        Ok(&self.values[idx])
    }

    pub fn try_get(&self, column: &str) -> Option<&Value> {
        self.table.resolve_column(column).map(|idx| &self.values[idx])
    }

    pub fn set(&mut self, column: &str, value: impl Into<Value>) -> Result<()> {
        let idx = self.column_index(column)?;
        self.values[idx] = value.into();
        Ok(())
    }

    /// Builder-style [`Record::set`], handy inside mappers.
    pub fn with(mut self, column: &str, value: impl Into<Value>) -> Result<Self> {
        self.set(column, value)?;
        Ok(self)
    }

    pub fn primary_key(&self) -> Vec<Value> {
        self.table
            .primary_key_columns()
            .iter()
            .filter_map(|column| self.try_get(column).cloned())
            .collect()
    }

    pub fn version(&self) -> Option<i64> {
        self.table
            .version_column_name()
            .and_then(|column| self.try_get(column))
            .and_then(Value::as_i64)
    }

    /// Names of the columns whose values differ from `other`.
    pub fn changed_columns(&self, other: &Record) -> Vec<&str> {
        self.table
            .columns()
            .iter()
            .zip(self.values.iter().zip(other.values.iter()))
            .filter(|(_, (mine, theirs))| mine != theirs)
            .map(|(column, _)| column.name.as_str())
            .collect()
    }

    /// Field-by-field comparison against a record of the same type.
    pub fn same_fields(&self, other: &Record) -> bool {
        self.table.is_named(other.table.name()) && self.values == other.values
    }

    pub fn to_json(&self) -> serde_json::Value {
        let fields = self
            .table
            .columns()
            .iter()
            .zip(self.values.iter())
            .map(|(column, value)| {
                let json = serde_json::to_value(value).unwrap_or(serde_json::Value::Null);
                (column.name.clone(), json)
            })
            .collect::<serde_json::Map<_, _>>();
        serde_json::Value::Object(fields)
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ", self.table.name())?;
        let mut map = f.debug_map();
        for (column, value) in self.table.columns().iter().zip(self.values.iter()) {
            map.entry(&column.name, value);
        }
        map.finish()
    }
}
