use super::map_position;
use crate::access::StructuralPosition;
use crate::core::{ForeignKeyDef, PersistenceError, Record, Result};
use crate::mirror::RecordMirrorRegistry;
use log::warn;
use std::sync::Arc;

/// Fills required foreign keys of a record from the ancestor rows they point at.
pub struct ParentReferenceProvider {
    registry: Arc<RecordMirrorRegistry>,
}

impl ParentReferenceProvider {
    pub fn new(registry: Arc<RecordMirrorRegistry>) -> Self {
        Self { registry }
    }

    /// For every foreign key with an unset NOT NULL column, copies the key
    /// of the nearest ancestor whose record type is the key's target table.
    /// Does nothing when every such key is already set.
    pub fn provide_parent_foreign_key_ids_for_entity_record(
        &self,
        record: &mut Record,
        position: &StructuralPosition,
    ) -> Result<()> {
        let table = record.table().clone();
        for fk in table.foreign_keys() {
            if !Self::needs_value(record, fk)? {
                continue;
            }

            let mut filled = false;
            for ancestor in position.ancestors() {
                let Some((mapper, parent)) = map_position(&self.registry, ancestor)? else {
                    continue;
                };
                if !mapper.record_type().eq_ignore_ascii_case(&fk.target_table) {
                    continue;
                }
                for (column, target) in fk.columns.iter().zip(&fk.target_columns) {
                    let value = parent.get(target)?.clone();
                    record.set(column, value)?;
                }
                filled = true;
                break;
            }

            if !filled {
                warn!(
                    "No ancestor of '{}' maps to '{}'; foreign key '{}' left unset",
                    position.key(),
                    fk.target_table,
                    fk.name
                );
            }
        }
        Ok(())
    }

    fn needs_value(record: &Record, fk: &ForeignKeyDef) -> Result<bool> {
        for column in &fk.columns {
            let definition = record.table().get_column(column).ok_or_else(|| {
                PersistenceError::SchemaMismatch(format!(
                    "Record type '{}' has no foreign key column '{}' (tried {} and {})",
                    record.record_type(),
                    column,
                    column.to_ascii_uppercase(),
                    column.to_ascii_lowercase()
                ))
            })?;
            if !definition.nullable && record.get(column)?.is_null() {
                return Ok(true);
            }
        }
        Ok(false)
    }
}
