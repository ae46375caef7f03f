use super::naming::name_candidates;
use super::{PersistenceError, Result, Value};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    Integer,
    Float,
    Text,
    Boolean,
    Uuid,
    Timestamp,
}

impl DataType {
    pub fn is_compatible(&self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) => true,
            (Self::Integer, Value::Integer(_)) => true,
            (Self::Float, Value::Float(_) | Value::Integer(_)) => true,
            (Self::Text, Value::Text(_)) => true,
            (Self::Boolean, Value::Boolean(_)) => true,
            (Self::Uuid, Value::Uuid(_)) => true,
            (Self::Timestamp, Value::Timestamp(_)) => true,
            _ => false,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer => write!(f, "INTEGER"),
            Self::Float => write!(f, "FLOAT"),
            Self::Text => write!(f, "TEXT"),
            Self::Boolean => write!(f, "BOOLEAN"),
            Self::Uuid => write!(f, "UUID"),
            Self::Timestamp => write!(f, "TIMESTAMP"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub data_type: DataType,
    pub nullable: bool,
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable: true,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn validate(&self, table: &str, value: &Value) -> Result<()> {
        if value.is_null() {
            if !self.nullable {
                return Err(PersistenceError::ConstraintViolation(format!(
                    "Column '{}.{}' cannot be NULL",
                    table, self.name
                )));
            }
            return Ok(());
        }

        if !self.data_type.is_compatible(value) {
            return Err(PersistenceError::SchemaMismatch(format!(
                "Column '{}.{}' expects type {}, got {}",
                table,
                self.name,
                self.data_type,
                value.type_name()
            )));
        }

        Ok(())
    }
}

/// A foreign key from `columns` of the owning table to `target_columns` of `target_table`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignKeyDef {
    pub name: String,
    pub columns: Vec<String>,
    pub target_table: String,
    pub target_columns: Vec<String>,
}

impl ForeignKeyDef {
    pub fn new(
        columns: &[&str],
        target_table: impl Into<String>,
        target_columns: &[&str],
    ) -> Self {
        let target_table = target_table.into();
        Self {
            name: format!("FK_{}_{}", columns.join("_"), target_table),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            target_table,
            target_columns: target_columns.iter().map(|c| c.to_string()).collect(),
        }
    }
}

/// Metadata of one relational table: the "record type" of every record bound to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDef {
    name: String,
    columns: Vec<Column>,
    primary_key: Vec<String>,
    version_column: Option<String>,
    foreign_keys: Vec<ForeignKeyDef>,
}

impl TableDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            primary_key: Vec::new(),
            version_column: None,
            foreign_keys: Vec::new(),
        }
    }

    pub fn column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    pub fn primary_key(mut self, columns: &[&str]) -> Self {
        self.primary_key = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    /// Marks an integer column as the optimistic-lock version counter.
    pub fn version_column(mut self, column: impl Into<String>) -> Self {
        self.version_column = Some(column.into());
        self
    }

    pub fn foreign_key(mut self, foreign_key: ForeignKeyDef) -> Self {
        self.foreign_keys.push(foreign_key);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn primary_key_columns(&self) -> &[String] {
        &self.primary_key
    }

    pub fn version_column_name(&self) -> Option<&str> {
        self.version_column.as_deref()
    }

    pub fn foreign_keys(&self) -> &[ForeignKeyDef] {
        &self.foreign_keys
    }

    pub fn find_column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|col| col.name == name)
    }

    /// Exact name first, then the UPPER and lower case variants.
    pub fn resolve_column(&self, name: &str) -> Option<usize> {
        name_candidates(name)
            .iter()
            .find_map(|candidate| self.find_column_index(candidate))
    }

    pub fn get_column(&self, name: &str) -> Option<&Column> {
        self.resolve_column(name).map(|idx| &self.columns[idx])
    }

    pub fn is_named(&self, other: &str) -> bool {
        self.name.eq_ignore_ascii_case(other)
    }

    pub fn validate(&self) -> Result<()> {
        let referenced = self
            .primary_key
            .iter()
            .chain(self.version_column.iter())
            .chain(self.foreign_keys.iter().flat_map(|fk| fk.columns.iter()));
        for column in referenced {
            if self.find_column_index(column).is_none() {
                return Err(PersistenceError::SchemaMismatch(format!(
                    "Table '{}' declares unknown column '{}'",
                    self.name, column
                )));
            }
        }
        if self.primary_key.is_empty() {
            return Err(PersistenceError::SchemaMismatch(format!(
                "Table '{}' has no primary key",
                self.name
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note_table() -> TableDef {
        TableDef::new("line_note")
            .column(Column::new("id", DataType::Integer).not_null())
            .column(Column::new("line_id", DataType::Integer).not_null())
            .column(Column::new("text", DataType::Text))
            .primary_key(&["id"])
            .foreign_key(ForeignKeyDef::new(&["line_id"], "ORDER_LINE", &["ID"]))
    }

    #[test]
    fn test_resolve_column_case_fallback() {
        let table = note_table();
        assert_eq!(table.resolve_column("ID"), Some(0));
        assert_eq!(table.resolve_column("line_id"), Some(1));
        assert_eq!(table.resolve_column("CONTAINER_ID"), None);
    }

    #[test]
    fn test_validate_rejects_unknown_key_columns() {
        assert!(note_table().validate().is_ok());
        let broken = TableDef::new("broken")
            .column(Column::new("ID", DataType::Integer))
            .primary_key(&["ID"])
            .version_column("VERSION");
        assert!(matches!(
            broken.validate(),
            Err(PersistenceError::SchemaMismatch(_))
        ));
    }

    #[test]
    fn test_column_not_null() {
        let column = Column::new("ID", DataType::Integer).not_null();
        assert!(column.validate("T", &Value::Integer(1)).is_ok());
        assert!(matches!(
            column.validate("T", &Value::Null),
            Err(PersistenceError::ConstraintViolation(_))
        ));
        assert!(column.validate("T", &Value::Text("x".into())).is_err());
    }
}
