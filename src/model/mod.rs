//! Domain-side contracts: how the engine reads domain instances and what it
//! knows about their types.

pub mod domain;
mod macros;
pub mod type_model;

pub use domain::{
    DomainObject, DomainRef, DomainType, FieldValue, Identity, IdentityType, IdentityValue,
    downcast, same_instance, unknown_field,
};
pub use type_model::{
    ContainerShape, DomainKind, FieldDescriptor, ReferenceKind, TypeDescriptor,
    TypeModelProvider, TypeModelRegistry, identity_of,
};
