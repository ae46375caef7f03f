use super::access_model::AccessModel;
use super::position::{Discriminator, StructuralPosition};
use crate::core::{PersistenceError, Result, Value};
use crate::mirror::RecordMirrorRegistry;
use crate::model::domain::instance_address;
use crate::model::{
    DomainKind, DomainRef, FieldDescriptor, ReferenceKind, TypeModelProvider, identity_of,
};
use log::warn;
use std::collections::HashMap;
use std::sync::Arc;

/// Walks a domain instance depth-first and produces its access model.
#[derive(Clone)]
pub struct AccessModelBuilder {
    type_model: Arc<dyn TypeModelProvider>,
    mirrors: Arc<RecordMirrorRegistry>,
}

impl AccessModelBuilder {
    pub fn new(type_model: Arc<dyn TypeModelProvider>, mirrors: Arc<RecordMirrorRegistry>) -> Self {
        Self { type_model, mirrors }
    }

    pub fn build_access_model(&self, root: DomainRef) -> Result<Arc<AccessModel>> {
        let kind = self.type_model.require(root.type_name())?.kind;
        if kind == DomainKind::ValueObject {
            return Err(PersistenceError::Configuration(format!(
                "Value object '{}' is not owned by any entity and cannot be persisted",
                root.type_name()
            )));
        }
        let discriminator = self.discriminator(&root, kind)?;
        let position = Arc::new(StructuralPosition::root(root, discriminator));
        self.build_node(position, kind)
    }

    fn build_node(&self, position: Arc<StructuralPosition>, kind: DomainKind) -> Result<Arc<AccessModel>> {
        if position.is_back_reference() {
            return Ok(Arc::new(AccessModel::new(position, kind, None, Vec::new())));
        }

        let instance = position.instance().clone();
        let mut children = Vec::new();
        let mut occurrences: HashMap<(String, Discriminator), usize> = HashMap::new();

        for field in self.type_model.fields_of(instance.type_name())? {
            if field.is_static || !self.is_traversed(field) {
                continue;
            }

            let value = match instance.field_value(&field.name) {
                Ok(value) => value,
                Err(err) if err.is_configuration() => return Err(err),
                Err(err) => {
                    warn!(
                        "Skipping field '{}.{}' while building access model: {}",
                        instance.type_name(),
                        field.name,
                        err
                    );
                    continue;
                }
            };

            for child in value.references() {
                match self.build_child(&position, field, child, &mut occurrences) {
                    Ok(node) => children.push(node),
                    Err(err) if err.is_configuration() => return Err(err),
                    Err(err) => warn!(
                        "Skipping element of '{}.{}' while building access model: {}",
                        instance.type_name(),
                        field.name,
                        err
                    ),
                }
            }
        }

        let mirror = self
            .mirrors
            .lookup(instance.type_name(), &position.accessor_path());
        Ok(Arc::new(AccessModel::new(position, kind, mirror, children)))
    }

    fn build_child(
        &self,
        parent: &Arc<StructuralPosition>,
        field: &FieldDescriptor,
        child: DomainRef,
        occurrences: &mut HashMap<(String, Discriminator), usize>,
    ) -> Result<Arc<AccessModel>> {
        let kind = self.type_model.require(child.type_name())?.kind;
        if kind == DomainKind::ValueObject && !self.has_entity_on_path(parent) {
            return Err(PersistenceError::Configuration(format!(
                "Value object '{}' reached via '{}' has no owning entity",
                child.type_name(),
                field.name
            )));
        }

        let is_back_reference = self.is_back_reference(parent, &child, kind)?;
        let discriminator = self.discriminator(&child, kind)?;
        let slot = occurrences
            .entry((field.name.clone(), discriminator.clone()))
            .or_insert(0);
        let occurrence = *slot;
        *slot += 1;

        let position = Arc::new(StructuralPosition::child(
            parent,
            &field.name,
            child,
            discriminator,
            occurrence,
            is_back_reference,
        ));
        self.build_node(position, kind)
    }

    fn is_traversed(&self, field: &FieldDescriptor) -> bool {
        match field.kind {
            ReferenceKind::Entity | ReferenceKind::AggregateRoot => true,
            ReferenceKind::ValueObject => {
                self.type_model.kind_of(&field.declared_type) == Some(DomainKind::ValueObject)
            }
            ReferenceKind::Identity | ReferenceKind::Scalar => false,
        }
    }

    fn has_entity_on_path(&self, position: &StructuralPosition) -> bool {
        std::iter::once(position.instance())
            .chain(position.access_path_from_root().iter().map(|s| s.instance()))
            .any(|instance| {
                self.type_model
                    .kind_of(instance.type_name())
                    .is_some_and(|kind| kind.is_entity())
            })
    }

    /// A reference back to something already on the path: the same instance,
    /// or an entity of the same type and identity.
    fn is_back_reference(
        &self,
        parent: &StructuralPosition,
        child: &DomainRef,
        kind: DomainKind,
    ) -> Result<bool> {
        if parent.is_on_path(child) {
            return Ok(true);
        }
        if !kind.is_entity() {
            return Ok(false);
        }
        let Some(identity) = identity_of(self.type_model.as_ref(), child.as_ref())? else {
            return Ok(false);
        };
        let ancestors = std::iter::once(parent.instance())
            .chain(parent.access_path_from_root().iter().map(|s| s.instance()));
        for ancestor in ancestors {
            if ancestor.type_name() != child.type_name() {
                continue;
            }
            if identity_of(self.type_model.as_ref(), ancestor.as_ref())?.as_ref() == Some(&identity) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn discriminator(&self, instance: &DomainRef, kind: DomainKind) -> Result<Discriminator> {
        if kind.is_entity() {
            return Ok(match identity_of(self.type_model.as_ref(), instance.as_ref())? {
                Some(identity) => Discriminator::Identity(identity.into_value()),
                None => Discriminator::Transient(instance_address(instance)),
            });
        }

        let mut signature = Vec::new();
        for field in self.type_model.fields_of(instance.type_name())? {
            if field.is_static
                || !matches!(field.kind, ReferenceKind::Scalar | ReferenceKind::Identity)
            {
                continue;
            }
            let value = instance.field_value(&field.name)?;
            signature.push(value.to_value().unwrap_or(Value::Null));
        }
        Ok(Discriminator::Value(signature))
    }
}
