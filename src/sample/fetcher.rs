use super::domain::{OrderId, PurchaseOrder};
use super::mirrors::SampleMirrors;
use crate::core::{PersistenceError, Record, Result, Value};
use crate::mirror::RecordMirror;
use crate::repository::AggregateFetcher;
use crate::store::RecordStore;
use std::sync::Arc;

/// Reads a [`PurchaseOrder`] back through the sample mirrors.
pub struct PurchaseOrderFetcher {
    store: Arc<dyn RecordStore>,
    mirrors: SampleMirrors,
}

impl PurchaseOrderFetcher {
    pub fn new(store: Arc<dyn RecordStore>, mirrors: SampleMirrors) -> Self {
        Self { store, mirrors }
    }

    fn children(&self, table: &str, column: &str, parent: &Value) -> Result<Vec<Record>> {
        self.store.select(table, &[(column, parent.clone())])
    }
}

fn missing_builder(record: &Record) -> PersistenceError {
    PersistenceError::Mapping(format!(
        "Mirror for '{}' produced no builder from an existing record",
        record.record_type()
    ))
}

impl AggregateFetcher<PurchaseOrder> for PurchaseOrderFetcher {
    fn fetch_by_id(&self, id: &OrderId) -> Result<Option<PurchaseOrder>> {
        let order_table = self.mirrors.orders.table_def().name().to_string();
        let rows = self.store.select(&order_table, &[("ID", Value::Integer(id.0))])?;
        let Some(row) = rows.first() else {
            return Ok(None);
        };
        let mut order = self
            .mirrors
            .orders
            .record_to_domain_object_builder(Some(row))?
            .ok_or_else(|| missing_builder(row))?;
        let order_key = row.get("ID")?.clone();

        let line_table = self.mirrors.lines.table_def().name().to_string();
        let note_table = self.mirrors.notes.table_def().name().to_string();
        for line_row in self.children(&line_table, "ORDER_ID", &order_key)? {
            let mut line = self
                .mirrors
                .lines
                .record_to_domain_object_builder(Some(&line_row))?
                .ok_or_else(|| missing_builder(&line_row))?;
            for note_row in self.children(&note_table, "LINE_ID", line_row.get("ID")?)? {
                let note = self
                    .mirrors
                    .notes
                    .record_to_domain_object_builder(Some(&note_row))?
                    .ok_or_else(|| missing_builder(&note_row))?;
                line.notes.push(note);
            }
            order.lines.push(line.build());
        }

        let shipping_table = self.mirrors.shipping.table_def().name().to_string();
        if let Some(shipping_row) = self
            .children(&shipping_table, "CONTAINER_ID", &order_key)?
            .first()
        {
            order.shipping = self
                .mirrors
                .shipping
                .record_to_domain_object_builder(Some(shipping_row))?;
        }

        let tag_table = self.mirrors.tags.table_def().name().to_string();
        for tag_row in self.children(&tag_table, "CONTAINER_ID", &order_key)? {
            if let Some(tag) = self
                .mirrors
                .tags
                .record_to_domain_object_builder(Some(&tag_row))?
            {
                order.tags.push(tag);
            }
        }

        Ok(Some(order.build()))
    }
}
