use crate::core::{Column, DataType, ForeignKeyDef, TableDef};
use crate::store::InMemorySequences;
use std::sync::Arc;

/// Tables of the sample aggregate. `line_note` and `order_tag` use lower
/// case names to exercise the case fallback of the providers.
#[derive(Debug, Clone)]
pub struct SampleSchema {
    pub purchase_order: Arc<TableDef>,
    pub order_line: Arc<TableDef>,
    pub line_note: Arc<TableDef>,
    pub shipping_address: Arc<TableDef>,
    pub order_tag: Arc<TableDef>,
}

impl SampleSchema {
    pub fn new() -> Self {
        let purchase_order = TableDef::new("PURCHASE_ORDER")
            .column(Column::new("ID", DataType::Integer).not_null())
            .column(Column::new("VERSION", DataType::Integer).not_null())
            .column(Column::new("CUSTOMER", DataType::Text).not_null())
            .column(Column::new("TOTAL_AMOUNT", DataType::Integer))
            .column(Column::new("TOTAL_CURRENCY", DataType::Text))
            .primary_key(&["ID"])
            .version_column("VERSION");

        let order_line = TableDef::new("ORDER_LINE")
            .column(Column::new("ID", DataType::Integer).not_null())
            .column(Column::new("ORDER_ID", DataType::Integer).not_null())
            .column(Column::new("PRODUCT", DataType::Text).not_null())
            .column(Column::new("QUANTITY", DataType::Integer).not_null())
            .primary_key(&["ID"])
            .foreign_key(ForeignKeyDef::new(&["ORDER_ID"], "PURCHASE_ORDER", &["ID"]));

        let line_note = TableDef::new("line_note")
            .column(Column::new("id", DataType::Integer).not_null())
            .column(Column::new("line_id", DataType::Integer).not_null())
            .column(Column::new("text", DataType::Text))
            .primary_key(&["id"])
            .foreign_key(ForeignKeyDef::new(&["line_id"], "ORDER_LINE", &["ID"]));

        let shipping_address = TableDef::new("SHIPPING_ADDRESS")
            .column(Column::new("ID", DataType::Integer).not_null())
            .column(Column::new("CONTAINER_ID", DataType::Integer).not_null())
            .column(Column::new("STREET", DataType::Text))
            .column(Column::new("CITY", DataType::Text))
            .column(Column::new("GEO_LAT", DataType::Integer).not_null())
            .column(Column::new("GEO_LON", DataType::Integer).not_null())
            .primary_key(&["ID"])
            .foreign_key(ForeignKeyDef::new(&["CONTAINER_ID"], "PURCHASE_ORDER", &["ID"]));

        let order_tag = TableDef::new("order_tag")
            .column(Column::new("id", DataType::Integer).not_null())
            .column(Column::new("container_id", DataType::Integer).not_null())
            .column(Column::new("label", DataType::Text))
            .primary_key(&["id"])
            .foreign_key(ForeignKeyDef::new(&["container_id"], "PURCHASE_ORDER", &["ID"]));

        Self {
            purchase_order: Arc::new(purchase_order),
            order_line: Arc::new(order_line),
            line_note: Arc::new(line_note),
            shipping_address: Arc::new(shipping_address),
            order_tag: Arc::new(order_tag),
        }
    }

    pub fn tables(&self) -> Vec<Arc<TableDef>> {
        vec![
            self.purchase_order.clone(),
            self.order_line.clone(),
            self.line_note.clone(),
            self.shipping_address.clone(),
            self.order_tag.clone(),
        ]
    }
}

impl Default for SampleSchema {
    fn default() -> Self {
        Self::new()
    }
}

/// One sequence per identity type and per value-object table.
pub fn sequences() -> InMemorySequences {
    InMemorySequences::new()
        .define("ORDER_ID_SEQ")
        .define_starting_at("LINE_ID_SEQ", 100)
        .define_starting_at("NOTE_ID_SEQ", 1000)
        .define("SHIPPING_ADDRESS_SEQ")
        .define("order_tag_seq")
}
