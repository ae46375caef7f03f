// ============================================================================
// Transaction Change Tracking
// ============================================================================
//
// Every write the in-memory store performs inside a transaction is journaled
// as a Change so that ROLLBACK can undo it, newest first.
//
// ============================================================================

use crate::core::Value;

/// A single reversible row change.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    /// A row was added under `row_id`.
    InsertRow { table: String, row_id: usize },

    /// A row was overwritten; `old_row` is what it held before.
    UpdateRow {
        table: String,
        row_id: usize,
        old_row: Vec<Value>,
    },

    /// A row was removed.
    DeleteRow {
        table: String,
        row_id: usize,
        old_row: Vec<Value>,
    },
}

impl Change {
    pub fn table_name(&self) -> &str {
        match self {
            Change::InsertRow { table, .. } => table,
            Change::UpdateRow { table, .. } => table,
            Change::DeleteRow { table, .. } => table,
        }
    }

    pub fn row_id(&self) -> usize {
        match self {
            Change::InsertRow { row_id, .. }
            | Change::UpdateRow { row_id, .. }
            | Change::DeleteRow { row_id, .. } => *row_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_accessors() {
        let change = Change::UpdateRow {
            table: "PURCHASE_ORDER".to_string(),
            row_id: 4,
            old_row: vec![Value::Integer(1)],
        };
        assert_eq!(change.table_name(), "PURCHASE_ORDER");
        assert_eq!(change.row_id(), 4);
    }
}
