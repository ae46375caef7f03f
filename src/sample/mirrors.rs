use super::domain::{
    GeoPoint, LineId, LineNote, Money, NoteId, OrderId, OrderLine, OrderTag, PurchaseOrder,
    ShippingAddress,
};
use super::schema::SampleSchema;
use crate::core::{PersistenceError, Record, Result, TableDef};
use crate::mirror::{RecordMirror, RecordMirrorRegistry};
use std::sync::Arc;

fn int(record: &Record, column: &str) -> Result<i64> {
    record.get(column)?.as_i64().ok_or_else(|| {
        PersistenceError::Mapping(format!(
            "Column '{}.{}' does not hold an integer",
            record.record_type(),
            column
        ))
    })
}

fn text(record: &Record, column: &str) -> Result<String> {
    Ok(record.get(column)?.as_str().unwrap_or_default().to_string())
}

pub struct PurchaseOrderBuilder {
    pub id: OrderId,
    pub version: i64,
    pub customer: String,
    pub total: Money,
    pub lines: Vec<OrderLine>,
    pub shipping: Option<ShippingAddress>,
    pub tags: Vec<OrderTag>,
}

impl PurchaseOrderBuilder {
    pub fn build(self) -> PurchaseOrder {
        PurchaseOrder {
            id: Some(self.id),
            version: self.version,
            customer: self.customer,
            total: Arc::new(self.total),
            lines: self.lines.into_iter().map(Arc::new).collect(),
            shipping: self.shipping.map(Arc::new),
            tags: self.tags.into_iter().map(Arc::new).collect(),
        }
    }
}

pub struct OrderLineBuilder {
    pub id: LineId,
    pub product: String,
    pub quantity: i64,
    pub notes: Vec<LineNote>,
}

impl OrderLineBuilder {
    pub fn build(self) -> OrderLine {
        OrderLine {
            id: Some(self.id),
            product: self.product,
            quantity: self.quantity,
            notes: self.notes.into_iter().map(Arc::new).collect(),
        }
    }
}

#[derive(Clone)]
pub struct PurchaseOrderMirror {
    table: Arc<TableDef>,
}

impl RecordMirror for PurchaseOrderMirror {
    type Domain = PurchaseOrder;
    type Root = PurchaseOrder;
    type Builder = PurchaseOrderBuilder;

    fn table_def(&self) -> &Arc<TableDef> {
        &self.table
    }

    fn record_to_domain_object_builder(
        &self,
        record: Option<&Record>,
    ) -> Result<Option<PurchaseOrderBuilder>> {
        let Some(record) = record else {
            return Ok(None);
        };
        Ok(Some(PurchaseOrderBuilder {
            id: OrderId(int(record, "ID")?),
            version: int(record, "VERSION")?,
            customer: text(record, "CUSTOMER")?,
            total: Money::new(int(record, "TOTAL_AMOUNT")?, &text(record, "TOTAL_CURRENCY")?),
            lines: Vec::new(),
            shipping: None,
            tags: Vec::new(),
        }))
    }

    fn from(&self, order: &PurchaseOrder, _root: &PurchaseOrder) -> Result<Record> {
        Record::new(self.table.clone())
            .with("ID", order.id.as_ref().map(|id| id.0))?
            .with("VERSION", order.version)?
            .with("CUSTOMER", order.customer.as_str())?
            .with("TOTAL_AMOUNT", order.total.amount)?
            .with("TOTAL_CURRENCY", order.total.currency.as_str())
    }
}

/// Fills `ORDER_ID` from the root; the parent reference provider covers a
/// root that has no id yet.
#[derive(Clone)]
pub struct OrderLineMirror {
    table: Arc<TableDef>,
}

impl RecordMirror for OrderLineMirror {
    type Domain = OrderLine;
    type Root = PurchaseOrder;
    type Builder = OrderLineBuilder;

    fn table_def(&self) -> &Arc<TableDef> {
        &self.table
    }

    fn record_to_domain_object_builder(&self, record: Option<&Record>) -> Result<Option<OrderLineBuilder>> {
        let Some(record) = record else {
            return Ok(None);
        };
        Ok(Some(OrderLineBuilder {
            id: LineId(int(record, "ID")?),
            product: text(record, "PRODUCT")?,
            quantity: int(record, "QUANTITY")?,
            notes: Vec::new(),
        }))
    }

    fn from(&self, line: &OrderLine, root: &PurchaseOrder) -> Result<Record> {
        Record::new(self.table.clone())
            .with("ID", line.id.as_ref().map(|id| id.0))?
            .with("ORDER_ID", root.id.as_ref().map(|id| id.0))?
            .with("PRODUCT", line.product.as_str())?
            .with("QUANTITY", line.quantity)
    }
}

/// Leaves `line_id` unset: a note cannot see its line through the root.
#[derive(Clone)]
pub struct LineNoteMirror {
    table: Arc<TableDef>,
}

impl RecordMirror for LineNoteMirror {
    type Domain = LineNote;
    type Root = PurchaseOrder;
    type Builder = LineNote;

    fn table_def(&self) -> &Arc<TableDef> {
        &self.table
    }

    fn record_to_domain_object_builder(&self, record: Option<&Record>) -> Result<Option<LineNote>> {
        let Some(record) = record else {
            return Ok(None);
        };
        Ok(Some(LineNote {
            id: Some(NoteId(int(record, "ID")?)),
            text: text(record, "TEXT")?,
        }))
    }

    fn from(&self, note: &LineNote, _root: &PurchaseOrder) -> Result<Record> {
        Record::new(self.table.clone())
            .with("ID", note.id.as_ref().map(|id| id.0))?
            .with("TEXT", note.text.as_str())
    }
}

#[derive(Clone)]
pub struct ShippingAddressMirror {
    table: Arc<TableDef>,
}

impl RecordMirror for ShippingAddressMirror {
    type Domain = ShippingAddress;
    type Root = PurchaseOrder;
    type Builder = ShippingAddress;

    fn table_def(&self) -> &Arc<TableDef> {
        &self.table
    }

    fn record_to_domain_object_builder(&self, record: Option<&Record>) -> Result<Option<ShippingAddress>> {
        let Some(record) = record else {
            return Ok(None);
        };
        Ok(Some(ShippingAddress {
            street: text(record, "STREET")?,
            city: text(record, "CITY")?,
            geo: Arc::new(GeoPoint {
                lat: int(record, "GEO_LAT")?,
                lon: int(record, "GEO_LON")?,
            }),
        }))
    }

    fn from(&self, address: &ShippingAddress, _root: &PurchaseOrder) -> Result<Record> {
        Record::new(self.table.clone())
            .with("STREET", address.street.as_str())?
            .with("CITY", address.city.as_str())?
            .with("GEO_LAT", address.geo.lat)?
            .with("GEO_LON", address.geo.lon)
    }
}

#[derive(Clone)]
pub struct OrderTagMirror {
    table: Arc<TableDef>,
}

impl RecordMirror for OrderTagMirror {
    type Domain = OrderTag;
    type Root = PurchaseOrder;
    type Builder = OrderTag;

    fn table_def(&self) -> &Arc<TableDef> {
        &self.table
    }

    fn record_to_domain_object_builder(&self, record: Option<&Record>) -> Result<Option<OrderTag>> {
        let Some(record) = record else {
            return Ok(None);
        };
        Ok(Some(OrderTag::new(&text(record, "LABEL")?)))
    }

    fn from(&self, tag: &OrderTag, _root: &PurchaseOrder) -> Result<Record> {
        Record::new(self.table.clone()).with("LABEL", tag.label.as_str())
    }
}

/// Every mirror of the sample aggregate, bound to one schema.
#[derive(Clone)]
pub struct SampleMirrors {
    pub orders: PurchaseOrderMirror,
    pub lines: OrderLineMirror,
    pub notes: LineNoteMirror,
    pub shipping: ShippingAddressMirror,
    pub tags: OrderTagMirror,
}

impl SampleMirrors {
    pub fn new(schema: &SampleSchema) -> Self {
        Self {
            orders: PurchaseOrderMirror {
                table: schema.purchase_order.clone(),
            },
            lines: OrderLineMirror {
                table: schema.order_line.clone(),
            },
            notes: LineNoteMirror {
                table: schema.line_note.clone(),
            },
            shipping: ShippingAddressMirror {
                table: schema.shipping_address.clone(),
            },
            tags: OrderTagMirror {
                table: schema.order_tag.clone(),
            },
        }
    }

    pub fn registry(&self) -> RecordMirrorRegistry {
        RecordMirrorRegistry::new()
            .register(self.orders.clone())
            .register(self.lines.clone())
            .register(self.notes.clone())
            .register(self.shipping.clone())
            .register(self.tags.clone())
    }
}
