use super::{SequenceCache, map_position};
use crate::access::StructuralPosition;
use crate::config::NamingConvention;
use crate::core::naming::record_sequence_candidates;
use crate::core::{PersistenceError, Record, Result, Value};
use crate::mirror::RecordMirrorRegistry;
use crate::model::TypeModelProvider;
use crate::store::{RecordStore, SequenceSource};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{Level, event};

/// Technical keys for value objects stored in their own rows.
///
/// Such a row carries a surrogate primary key (`ID`) drawn from a per-table
/// sequence and a `CONTAINER_ID` pointing at the row of the owning entity.
pub struct ValueObjectIdProvider {
    store: Arc<dyn RecordStore>,
    registry: Arc<RecordMirrorRegistry>,
    type_model: Arc<dyn TypeModelProvider>,
    sequences: SequenceCache,
    naming: NamingConvention,
}

impl ValueObjectIdProvider {
    pub fn new(
        store: Arc<dyn RecordStore>,
        registry: Arc<RecordMirrorRegistry>,
        type_model: Arc<dyn TypeModelProvider>,
        sequences: Arc<dyn SequenceSource>,
        naming: NamingConvention,
    ) -> Self {
        Self {
            store,
            registry,
            type_model,
            sequences: SequenceCache::new(sequences),
            naming,
        }
    }

    pub fn set_container_id_in_new_vo_record(
        &self,
        record: &mut Record,
        position: &StructuralPosition,
    ) -> Result<()> {
        let column = self.required_column(record, &self.naming.container_id_column)?;
        let container_id = self.container_id(position)?;
        record.set(&column, container_id)
    }

    /// Surrogate key of the stored row holding the same value object under
    /// the same container. Rows whose key is in `exclude` are skipped, so
    /// equal value objects in one collection each resolve to their own row.
    pub fn select_existing_tech_id_of_value_object(
        &self,
        record: &Record,
        position: &StructuralPosition,
        exclude: &HashSet<Value>,
    ) -> Result<Option<Value>> {
        let container_column = self.required_column(record, &self.naming.container_id_column)?;
        let pk_column = self.required_column(record, &self.naming.primary_key_column)?;
        let container_id = self.container_id(position)?;

        let mut criteria: Vec<(&str, Value)> = vec![(container_column.as_str(), container_id)];
        for (column, value) in record.table().columns().iter().zip(record.values()) {
            if value.is_null() || column.name == container_column || column.name == pk_column {
                continue;
            }
            criteria.push((column.name.as_str(), value.clone()));
        }

        let candidates = self.store.select(record.record_type(), &criteria)?;
        for candidate in candidates {
            let id = candidate.get(&pk_column)?.clone();
            if !id.is_null() && !exclude.contains(&id) {
                return Ok(Some(id));
            }
        }
        event!(
            Level::DEBUG,
            record_type = %record.record_type(),
            "no stored row for value object"
        );
        Ok(None)
    }

    pub fn provide_new_tech_id_for_value_object_record(&self, record: &mut Record) -> Result<()> {
        let column = self.required_column(record, &self.naming.primary_key_column)?;
        let record_type = record.record_type().to_string();
        let candidates = record_sequence_candidates(&record_type, &self.naming.sequence_suffix);
        let sequence = self.sequences.resolve(
            &record_type.to_ascii_uppercase(),
            &candidates,
            &record_type,
        )?;
        record.set(&column, sequence.next_value()?)
    }

    /// Exact, UPPER or lower spelling of `column` as it exists on `record`.
    fn required_column(&self, record: &Record, column: &str) -> Result<String> {
        record
            .table()
            .get_column(column)
            .map(|c| c.name.clone())
            .ok_or_else(|| {
                PersistenceError::SchemaMismatch(format!(
                    "Record type '{}' has neither '{}' nor '{}' column",
                    record.record_type(),
                    column.to_ascii_uppercase(),
                    column.to_ascii_lowercase()
                ))
            })
    }

    /// Primary key of the nearest entity ancestor that has its own row.
    fn container_id(&self, position: &StructuralPosition) -> Result<Value> {
        for ancestor in position.ancestors() {
            let is_entity = self
                .type_model
                .kind_of(ancestor.instance().type_name())
                .is_some_and(|kind| kind.is_entity());
            if !is_entity {
                continue;
            }
            let Some((_, container)) = map_position(&self.registry, ancestor)? else {
                continue;
            };
            return container.primary_key().into_iter().next().ok_or_else(|| {
                PersistenceError::SchemaMismatch(format!(
                    "Container record type '{}' has no primary key value",
                    container.record_type()
                ))
            });
        }
        Err(PersistenceError::Configuration(format!(
            "Value object '{}' at '{}' has no containing entity with a record",
            position.instance().type_name(),
            position.key()
        )))
    }
}
