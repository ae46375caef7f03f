use crate::core::naming::simple_type_name;
use crate::core::{PersistenceError, Result, Value};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Shared handle to a domain instance. Node identity inside one access model
/// is the identity of this pointer.
pub type DomainRef = Arc<dyn DomainObject>;

/// Compile-time name of a domain type, matching [`DomainObject::type_name`].
pub trait DomainType {
    const TYPE_NAME: &'static str;
}

/// Runtime field access for entities, value objects and aggregate roots.
///
/// The engine never uses language reflection: structure comes from the
/// [`TypeModelProvider`](super::TypeModelProvider) and values come from here.
pub trait DomainObject: fmt::Debug + Send + Sync + 'static {
    fn type_name(&self) -> &'static str;

    /// Current value of a declared field.
    fn field_value(&self, field: &str) -> Result<FieldValue>;

    /// A copy of this instance carrying `identity`. Entities persisted with
    /// generated identities must override this.
    fn with_identity(&self, identity: &Identity) -> Result<DomainRef> {
        Err(PersistenceError::Configuration(format!(
            "Type '{}' cannot accept generated identity {}",
            self.type_name(),
            identity
        )))
    }

    fn as_any(&self) -> &dyn Any;
}

/// Error for [`DomainObject::field_value`] implementations asked for an undeclared field.
pub fn unknown_field(type_name: &str, field: &str) -> PersistenceError {
    PersistenceError::Mapping(format!("Type '{}' has no field '{}'", type_name, field))
}

pub fn downcast<T: DomainObject>(instance: &dyn DomainObject) -> Result<&T> {
    instance.as_any().downcast_ref::<T>().ok_or_else(|| {
        PersistenceError::Mapping(format!(
            "Expected instance of '{}', got '{}'",
            std::any::type_name::<T>(),
            instance.type_name()
        ))
    })
}

/// Pointer identity, ignoring vtables.
pub fn same_instance(a: &DomainRef, b: &DomainRef) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

pub(crate) fn instance_address(instance: &DomainRef) -> usize {
    Arc::as_ptr(instance) as *const () as usize
}

/// Runtime value of one field.
#[derive(Debug, Clone)]
pub enum FieldValue {
    Null,
    Scalar(Value),
    Identity(Identity),
    Object(DomainRef),
    Optional(Option<DomainRef>),
    Collection(Vec<DomainRef>),
}

impl FieldValue {
    pub fn scalar(value: impl Into<Value>) -> Self {
        Self::Scalar(value.into())
    }

    pub fn object<T: DomainObject>(value: &Arc<T>) -> Self {
        Self::Object(value.clone())
    }

    pub fn optional<T: DomainObject>(value: &Option<Arc<T>>) -> Self {
        Self::Optional(value.as_ref().map(|v| v.clone() as DomainRef))
    }

    pub fn collection<T: DomainObject>(values: &[Arc<T>]) -> Self {
        Self::Collection(values.iter().map(|v| v.clone() as DomainRef).collect())
    }

    pub fn identity<I: IdentityType>(id: &Option<I>) -> Self {
        match id {
            Some(id) => Self::Identity(id.to_identity()),
            None => Self::Null,
        }
    }

    /// Domain instances reachable through this value, in order.
    pub fn references(&self) -> Vec<DomainRef> {
        match self {
            Self::Object(obj) => vec![obj.clone()],
            Self::Optional(Some(obj)) => vec![obj.clone()],
            Self::Collection(items) => items.clone(),
            Self::Null | Self::Scalar(_) | Self::Identity(_) | Self::Optional(None) => Vec::new(),
        }
    }

    /// Scalar cell form; identities collapse to their raw value.
    pub fn to_value(&self) -> Option<Value> {
        match self {
            Self::Null => Some(Value::Null),
            Self::Scalar(v) => Some(v.clone()),
            Self::Identity(id) => Some(id.value().clone()),
            _ => None,
        }
    }
}

/// Type-erased identity: the identity type's name plus its raw technical value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    type_name: String,
    value: Value,
}

impl Identity {
    pub fn new(type_name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            type_name: type_name.into(),
            value: value.into(),
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn simple_type_name(&self) -> &str {
        simple_type_name(&self.type_name)
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }

    pub fn typed<I: IdentityType>(&self) -> Result<I> {
        I::from_identity(self)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.simple_type_name(), self.value)
    }
}

/// Raw value types an identity newtype may wrap.
pub trait IdentityValue: Sized {
    fn from_value(value: &Value) -> Option<Self>;
    fn into_value(self) -> Value;
}

impl IdentityValue for i64 {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_i64()
    }

    fn into_value(self) -> Value {
        Value::Integer(self)
    }
}

impl IdentityValue for Uuid {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_uuid()
    }

    fn into_value(self) -> Value {
        Value::Uuid(self)
    }
}

impl IdentityValue for String {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_str().map(str::to_string)
    }

    fn into_value(self) -> Value {
        Value::Text(self)
    }
}

/// A typed identity with a single-argument constructor.
pub trait IdentityType: Clone + fmt::Debug + PartialEq + Send + Sync + 'static {
    const TYPE_NAME: &'static str;

    fn from_identity(identity: &Identity) -> Result<Self>;

    fn to_identity(&self) -> Identity;
}
