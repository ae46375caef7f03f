use crate::core::Result;
use crate::model::{
    DomainObject, DomainRef, DomainType, FieldDescriptor, FieldValue, Identity, IdentityType,
    TypeDescriptor, TypeModelRegistry, unknown_field,
};
use crate::repository::AggregateRoot;
use std::any::Any;
use std::sync::Arc;

crate::identity_type!(pub struct OrderId(i64););
crate::identity_type!(pub struct LineId(i64););
crate::identity_type!(pub struct NoteId(i64););

/// Order total in minor units. Stored inline in the order row.
#[derive(Debug, Clone, PartialEq)]
pub struct Money {
    pub amount: i64,
    pub currency: String,
}

impl Money {
    pub fn new(amount: i64, currency: &str) -> Self {
        Self {
            amount,
            currency: currency.to_string(),
        }
    }
}

/// Coordinates in micro-degrees, inlined into the address row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeoPoint {
    pub lat: i64,
    pub lon: i64,
}

/// Stored in its own row, keyed by a surrogate id and the order's id.
#[derive(Debug, Clone, PartialEq)]
pub struct ShippingAddress {
    pub street: String,
    pub city: String,
    pub geo: Arc<GeoPoint>,
}

impl ShippingAddress {
    pub fn new(street: &str, city: &str) -> Self {
        Self {
            street: street.to_string(),
            city: city.to_string(),
            geo: Arc::new(GeoPoint::default()),
        }
    }

    pub fn with_geo(mut self, lat: i64, lon: i64) -> Self {
        self.geo = Arc::new(GeoPoint { lat, lon });
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderTag {
    pub label: String,
}

impl OrderTag {
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineNote {
    pub id: Option<NoteId>,
    pub text: String,
}

impl LineNote {
    pub fn new(text: &str) -> Self {
        Self {
            id: None,
            text: text.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderLine {
    pub id: Option<LineId>,
    pub product: String,
    pub quantity: i64,
    pub notes: Vec<Arc<LineNote>>,
}

impl OrderLine {
    pub fn new(product: &str, quantity: i64) -> Self {
        Self {
            id: None,
            product: product.to_string(),
            quantity,
            notes: Vec::new(),
        }
    }

    pub fn with_note(mut self, text: &str) -> Self {
        self.notes.push(Arc::new(LineNote::new(text)));
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PurchaseOrder {
    pub id: Option<OrderId>,
    pub version: i64,
    pub customer: String,
    pub total: Arc<Money>,
    pub lines: Vec<Arc<OrderLine>>,
    pub shipping: Option<Arc<ShippingAddress>>,
    pub tags: Vec<Arc<OrderTag>>,
}

impl PurchaseOrder {
    pub fn new(customer: &str, total: Money) -> Self {
        Self {
            id: None,
            version: 0,
            customer: customer.to_string(),
            total: Arc::new(total),
            lines: Vec::new(),
            shipping: None,
            tags: Vec::new(),
        }
    }

    pub fn with_line(mut self, line: OrderLine) -> Self {
        self.lines.push(Arc::new(line));
        self
    }

    pub fn with_shipping(mut self, address: ShippingAddress) -> Self {
        self.shipping = Some(Arc::new(address));
        self
    }

    pub fn with_tag(mut self, label: &str) -> Self {
        self.tags.push(Arc::new(OrderTag::new(label)));
        self
    }

    pub fn line(&self, product: &str) -> Option<&Arc<OrderLine>> {
        self.lines.iter().find(|line| line.product == product)
    }

    /// Replaces the line for `product` with `edit` applied to a copy of it.
    pub fn edit_line(&mut self, product: &str, edit: impl FnOnce(&mut OrderLine)) -> bool {
        let Some(slot) = self.lines.iter_mut().find(|line| line.product == product) else {
            return false;
        };
        let mut line = (**slot).clone();
        edit(&mut line);
        *slot = Arc::new(line);
        true
    }

    pub fn remove_line(&mut self, product: &str) -> Option<Arc<OrderLine>> {
        let idx = self.lines.iter().position(|line| line.product == product)?;
        Some(self.lines.remove(idx))
    }
}

macro_rules! domain_object {
    ($ty:ident, $name:literal, |$this:ident, $field:ident| { $($arm:pat => $value:expr,)* }) => {
        impl DomainType for $ty {
            const TYPE_NAME: &'static str = $name;
        }

        impl DomainObject for $ty {
            fn type_name(&self) -> &'static str {
                $name
            }

            fn field_value(&self, field: &str) -> Result<FieldValue> {
                let $this = self;
                let $field = field;
                Ok(match $field {
                    $($arm => $value,)*
                    _ => return Err(unknown_field($name, field)),
                })
            }

            fn with_identity(&self, identity: &Identity) -> Result<DomainRef> {
                self.assign_identity(identity)
            }

            fn as_any(&self) -> &dyn Any {
                self
            }
        }
    };
}

trait AssignIdentity {
    fn assign_identity(&self, identity: &Identity) -> Result<DomainRef>;
}

fn reject_identity(type_name: &str, identity: &Identity) -> Result<DomainRef> {
    Err(crate::core::PersistenceError::Configuration(format!(
        "Value object '{}' cannot take identity {}",
        type_name, identity
    )))
}

impl AssignIdentity for Money {
    fn assign_identity(&self, identity: &Identity) -> Result<DomainRef> {
        reject_identity("Money", identity)
    }
}

impl AssignIdentity for GeoPoint {
    fn assign_identity(&self, identity: &Identity) -> Result<DomainRef> {
        reject_identity("GeoPoint", identity)
    }
}

impl AssignIdentity for ShippingAddress {
    fn assign_identity(&self, identity: &Identity) -> Result<DomainRef> {
        reject_identity("ShippingAddress", identity)
    }
}

impl AssignIdentity for OrderTag {
    fn assign_identity(&self, identity: &Identity) -> Result<DomainRef> {
        reject_identity("OrderTag", identity)
    }
}

impl AssignIdentity for LineNote {
    fn assign_identity(&self, identity: &Identity) -> Result<DomainRef> {
        Ok(Arc::new(Self {
            id: Some(identity.typed()?),
            ..self.clone()
        }))
    }
}

impl AssignIdentity for OrderLine {
    fn assign_identity(&self, identity: &Identity) -> Result<DomainRef> {
        Ok(Arc::new(Self {
            id: Some(identity.typed()?),
            ..self.clone()
        }))
    }
}

impl AssignIdentity for PurchaseOrder {
    fn assign_identity(&self, identity: &Identity) -> Result<DomainRef> {
        Ok(Arc::new(Self {
            id: Some(identity.typed()?),
            ..self.clone()
        }))
    }
}

domain_object!(Money, "Money", |this, field| {
    "amount" => FieldValue::scalar(this.amount),
    "currency" => FieldValue::scalar(this.currency.as_str()),
});

domain_object!(GeoPoint, "GeoPoint", |this, field| {
    "lat" => FieldValue::scalar(this.lat),
    "lon" => FieldValue::scalar(this.lon),
});

domain_object!(ShippingAddress, "ShippingAddress", |this, field| {
    "street" => FieldValue::scalar(this.street.as_str()),
    "city" => FieldValue::scalar(this.city.as_str()),
    "geo" => FieldValue::object(&this.geo),
});

domain_object!(OrderTag, "OrderTag", |this, field| {
    "label" => FieldValue::scalar(this.label.as_str()),
});

domain_object!(LineNote, "LineNote", |this, field| {
    "id" => FieldValue::identity(&this.id),
    "text" => FieldValue::scalar(this.text.as_str()),
});

domain_object!(OrderLine, "OrderLine", |this, field| {
    "id" => FieldValue::identity(&this.id),
    "product" => FieldValue::scalar(this.product.as_str()),
    "quantity" => FieldValue::scalar(this.quantity),
    "notes" => FieldValue::collection(&this.notes),
});

domain_object!(PurchaseOrder, "PurchaseOrder", |this, field| {
    "id" => FieldValue::identity(&this.id),
    "version" => FieldValue::scalar(this.version),
    "customer" => FieldValue::scalar(this.customer.as_str()),
    "total" => FieldValue::object(&this.total),
    "lines" => FieldValue::collection(&this.lines),
    "shipping" => FieldValue::optional(&this.shipping),
    "tags" => FieldValue::collection(&this.tags),
});

impl AggregateRoot for PurchaseOrder {
    type Id = OrderId;

    fn id(&self) -> Option<OrderId> {
        self.id.clone()
    }
}

/// Structure of the sample aggregate.
pub fn type_model() -> TypeModelRegistry {
    TypeModelRegistry::new()
        .register(
            TypeDescriptor::aggregate_root(PurchaseOrder::TYPE_NAME)
                .field(FieldDescriptor::identity("id", OrderId::TYPE_NAME))
                .field(FieldDescriptor::scalar("version"))
                .field(FieldDescriptor::scalar("customer"))
                .field(FieldDescriptor::value_object("total", Money::TYPE_NAME))
                .field(FieldDescriptor::entity("lines", OrderLine::TYPE_NAME).list())
                .field(
                    FieldDescriptor::value_object("shipping", ShippingAddress::TYPE_NAME)
                        .optional(),
                )
                .field(FieldDescriptor::value_object("tags", OrderTag::TYPE_NAME).list()),
        )
        .register(
            TypeDescriptor::entity(OrderLine::TYPE_NAME)
                .field(FieldDescriptor::identity("id", LineId::TYPE_NAME))
                .field(FieldDescriptor::scalar("product"))
                .field(FieldDescriptor::scalar("quantity"))
                .field(FieldDescriptor::entity("notes", LineNote::TYPE_NAME).list()),
        )
        .register(
            TypeDescriptor::entity(LineNote::TYPE_NAME)
                .field(FieldDescriptor::identity("id", NoteId::TYPE_NAME))
                .field(FieldDescriptor::scalar("text")),
        )
        .register(
            TypeDescriptor::value_object(Money::TYPE_NAME)
                .field(FieldDescriptor::scalar("amount"))
                .field(FieldDescriptor::scalar("currency")),
        )
        .register(
            TypeDescriptor::value_object(ShippingAddress::TYPE_NAME)
                .field(FieldDescriptor::scalar("street"))
                .field(FieldDescriptor::scalar("city"))
                .field(FieldDescriptor::value_object("geo", GeoPoint::TYPE_NAME)),
        )
        .register(
            TypeDescriptor::value_object(GeoPoint::TYPE_NAME)
                .field(FieldDescriptor::scalar("lat"))
                .field(FieldDescriptor::scalar("lon")),
        )
        .register(
            TypeDescriptor::value_object(OrderTag::TYPE_NAME).field(FieldDescriptor::scalar("label")),
        )
}
