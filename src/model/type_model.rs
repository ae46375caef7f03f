use super::domain::{DomainObject, FieldValue, Identity};
use crate::core::{PersistenceError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// What a domain type is inside an aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DomainKind {
    AggregateRoot,
    Entity,
    ValueObject,
}

impl DomainKind {
    /// Aggregate roots are entities too.
    pub fn is_entity(&self) -> bool {
        matches!(self, Self::AggregateRoot | Self::Entity)
    }
}

/// What a field points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReferenceKind {
    Entity,
    ValueObject,
    AggregateRoot,
    Identity,
    Scalar,
}

/// Containment arity of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContainerShape {
    Single,
    Optional,
    List,
    Set,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    pub kind: ReferenceKind,
    pub shape: ContainerShape,
    pub declared_type: String,
    pub is_static: bool,
}

impl FieldDescriptor {
    fn new(name: &str, kind: ReferenceKind, declared_type: &str) -> Self {
        Self {
            name: name.to_string(),
            kind,
            shape: ContainerShape::Single,
            declared_type: declared_type.to_string(),
            is_static: false,
        }
    }

    pub fn scalar(name: &str) -> Self {
        Self::new(name, ReferenceKind::Scalar, "")
    }

    pub fn identity(name: &str, identity_type: &str) -> Self {
        Self::new(name, ReferenceKind::Identity, identity_type)
    }

    pub fn entity(name: &str, declared_type: &str) -> Self {
        Self::new(name, ReferenceKind::Entity, declared_type)
    }

    pub fn value_object(name: &str, declared_type: &str) -> Self {
        Self::new(name, ReferenceKind::ValueObject, declared_type)
    }

    pub fn aggregate_root(name: &str, declared_type: &str) -> Self {
        Self::new(name, ReferenceKind::AggregateRoot, declared_type)
    }

    pub fn optional(mut self) -> Self {
        self.shape = ContainerShape::Optional;
        self
    }

    pub fn list(mut self) -> Self {
        self.shape = ContainerShape::List;
        self
    }

    pub fn set(mut self) -> Self {
        self.shape = ContainerShape::Set;
        self
    }

    pub fn static_field(mut self) -> Self {
        self.is_static = true;
        self
    }

    pub fn is_reference(&self) -> bool {
        matches!(
            self.kind,
            ReferenceKind::Entity | ReferenceKind::ValueObject | ReferenceKind::AggregateRoot
        )
    }
}

/// Structural metadata of one domain type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDescriptor {
    pub type_name: String,
    pub kind: DomainKind,
    pub fields: Vec<FieldDescriptor>,
}

impl TypeDescriptor {
    pub fn new(type_name: &str, kind: DomainKind) -> Self {
        Self {
            type_name: type_name.to_string(),
            kind,
            fields: Vec::new(),
        }
    }

    pub fn aggregate_root(type_name: &str) -> Self {
        Self::new(type_name, DomainKind::AggregateRoot)
    }

    pub fn entity(type_name: &str) -> Self {
        Self::new(type_name, DomainKind::Entity)
    }

    pub fn value_object(type_name: &str) -> Self {
        Self::new(type_name, DomainKind::ValueObject)
    }

    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    pub fn identity_field(&self) -> Option<&FieldDescriptor> {
        self.fields
            .iter()
            .find(|f| f.kind == ReferenceKind::Identity && !f.is_static)
    }
}

/// Structural metadata about domain classes.
pub trait TypeModelProvider: Send + Sync {
    fn describe(&self, type_name: &str) -> Option<&TypeDescriptor>;

    fn require(&self, type_name: &str) -> Result<&TypeDescriptor> {
        self.describe(type_name).ok_or_else(|| {
            PersistenceError::Configuration(format!(
                "No type model registered for domain type '{}'",
                type_name
            ))
        })
    }

    fn fields_of(&self, type_name: &str) -> Result<&[FieldDescriptor]> {
        Ok(&self.require(type_name)?.fields)
    }

    fn kind_of(&self, type_name: &str) -> Option<DomainKind> {
        self.describe(type_name).map(|d| d.kind)
    }

    fn identity_field_of(&self, type_name: &str) -> Option<&FieldDescriptor> {
        self.describe(type_name).and_then(TypeDescriptor::identity_field)
    }
}

/// Reads the identity of an entity instance, if it has one yet.
pub fn identity_of(
    type_model: &dyn TypeModelProvider,
    instance: &dyn DomainObject,
) -> Result<Option<Identity>> {
    let Some(field) = type_model.identity_field_of(instance.type_name()) else {
        return Ok(None);
    };
    match instance.field_value(&field.name)? {
        FieldValue::Identity(identity) => Ok(Some(identity)),
        FieldValue::Scalar(value) if !value.is_null() => {
            Ok(Some(Identity::new(field.declared_type.clone(), value)))
        }
        _ => Ok(None),
    }
}

/// Explicit per-type registration of [`TypeDescriptor`]s.
#[derive(Debug, Clone, Default)]
pub struct TypeModelRegistry {
    types: HashMap<String, TypeDescriptor>,
}

impl TypeModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, descriptor: TypeDescriptor) -> Self {
        self.types.insert(descriptor.type_name.clone(), descriptor);
        self
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Checks that every referenced type is registered with a matching kind.
    pub fn validate(&self) -> Result<()> {
        for descriptor in self.types.values() {
            if descriptor.kind.is_entity() && descriptor.identity_field().is_none() {
                return Err(PersistenceError::Configuration(format!(
                    "Entity type '{}' declares no identity field",
                    descriptor.type_name
                )));
            }
            for field in descriptor.fields.iter().filter(|f| f.is_reference()) {
                let target = self.types.get(&field.declared_type).ok_or_else(|| {
                    PersistenceError::Configuration(format!(
                        "Field '{}.{}' references unregistered type '{}'",
                        descriptor.type_name, field.name, field.declared_type
                    ))
                })?;
                let consistent = match field.kind {
                    ReferenceKind::ValueObject => target.kind == DomainKind::ValueObject,
                    ReferenceKind::Entity | ReferenceKind::AggregateRoot => target.kind.is_entity(),
                    ReferenceKind::Identity | ReferenceKind::Scalar => true,
                };
                if !consistent {
                    return Err(PersistenceError::Configuration(format!(
                        "Field '{}.{}' is declared {:?} but '{}' is {:?}",
                        descriptor.type_name, field.name, field.kind, target.type_name, target.kind
                    )));
                }
            }
        }
        Ok(())
    }
}

impl TypeModelProvider for TypeModelRegistry {
    fn describe(&self, type_name: &str) -> Option<&TypeDescriptor> {
        self.types.get(type_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> TypeModelRegistry {
        TypeModelRegistry::new()
            .register(
                TypeDescriptor::aggregate_root("Order")
                    .field(FieldDescriptor::identity("id", "OrderId"))
                    .field(FieldDescriptor::scalar("customer"))
                    .field(FieldDescriptor::entity("lines", "Line").list())
                    .field(FieldDescriptor::value_object("address", "Address").optional()),
            )
            .register(
                TypeDescriptor::entity("Line").field(FieldDescriptor::identity("id", "LineId")),
            )
            .register(TypeDescriptor::value_object("Address").field(FieldDescriptor::scalar("city")))
    }

    #[test]
    fn test_identity_field_lookup() {
        let registry = registry();
        let field = registry.identity_field_of("Order").unwrap();
        assert_eq!(field.name, "id");
        assert_eq!(field.declared_type, "OrderId");
        assert!(registry.identity_field_of("Address").is_none());
        assert_eq!(registry.kind_of("Line"), Some(DomainKind::Entity));
    }

    #[test]
    fn test_validate_accepts_consistent_model() {
        assert!(registry().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_kind_mismatch() {
        let registry = registry().register(
            TypeDescriptor::entity("Broken")
                .field(FieldDescriptor::identity("id", "BrokenId"))
                .field(FieldDescriptor::value_object("line", "Line")),
        );
        assert!(registry.validate().unwrap_err().is_configuration());
    }

    #[test]
    fn test_unknown_type_is_configuration_error() {
        assert!(registry().fields_of("Nope").unwrap_err().is_configuration());
    }
}
