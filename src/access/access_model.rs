use super::position::{PositionKey, StructuralPosition};
use crate::core::{Record, Result};
use crate::mirror::RecordMapper;
use crate::model::{DomainKind, DomainRef};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// One node of the access model: a position, the mapper that persists it
/// (if it has its own row) and its child nodes.
#[derive(Clone)]
pub struct DomainObjectInstanceAccessModel {
    position: Arc<StructuralPosition>,
    kind: DomainKind,
    record_mirror: Option<Arc<dyn RecordMapper>>,
    children: im::Vector<Arc<DomainObjectInstanceAccessModel>>,
}

pub type AccessModel = DomainObjectInstanceAccessModel;

impl DomainObjectInstanceAccessModel {
    pub(crate) fn new(
        position: Arc<StructuralPosition>,
        kind: DomainKind,
        record_mirror: Option<Arc<dyn RecordMapper>>,
        children: Vec<Arc<DomainObjectInstanceAccessModel>>,
    ) -> Self {
        Self {
            position,
            kind,
            record_mirror,
            children: children.into_iter().collect(),
        }
    }

    pub fn position(&self) -> &Arc<StructuralPosition> {
        &self.position
    }

    pub fn instance(&self) -> &DomainRef {
        self.position.instance()
    }

    pub fn key(&self) -> &PositionKey {
        self.position.key()
    }

    pub fn kind(&self) -> DomainKind {
        self.kind
    }

    pub fn record_mirror(&self) -> Option<&Arc<dyn RecordMapper>> {
        self.record_mirror.as_ref()
    }

    pub fn children(&self) -> &im::Vector<Arc<DomainObjectInstanceAccessModel>> {
        &self.children
    }

    pub fn is_entity(&self) -> bool {
        self.kind.is_entity()
    }

    pub fn is_value_object(&self) -> bool {
        self.kind == DomainKind::ValueObject
    }

    pub fn is_record_mapped(&self) -> bool {
        self.record_mirror.is_some()
    }

    pub fn is_root(&self) -> bool {
        self.position.is_root()
    }

    /// This node and every node below it, parents before children.
    pub fn all_contained(self: &Arc<Self>) -> Vec<Arc<Self>> {
        let mut out = Vec::new();
        let mut stack = vec![self.clone()];
        while let Some(node) = stack.pop() {
            for child in node.children.iter().rev() {
                stack.push(child.clone());
            }
            out.push(node);
        }
        out
    }

    /// This node and every node below it, children before parents.
    pub fn post_order(self: &Arc<Self>) -> Vec<Arc<Self>> {
        let mut out = Vec::new();
        Self::collect_post_order(self, &mut out);
        out
    }

    fn collect_post_order(node: &Arc<Self>, out: &mut Vec<Arc<Self>>) {
        for child in node.children.iter() {
            Self::collect_post_order(child, out);
        }
        out.push(node.clone());
    }

    /// Same position, mapper and children around a different instance.
    pub fn clone_with_replacement(&self, instance: DomainRef) -> Self {
        Self {
            position: Arc::new(self.position.with_instance(instance)),
            ..self.clone()
        }
    }

    /// Maps this node through its own mapper, resolving the root from the position.
    pub fn map_record(&self) -> Result<Option<Record>> {
        match &self.record_mirror {
            Some(mirror) => {
                let record = mirror
                    .map_instance(self.instance().as_ref(), self.position.root_instance().as_ref())?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    pub fn record_mapped_count(self: &Arc<Self>) -> usize {
        self.all_contained()
            .iter()
            .filter(|node| node.is_record_mapped())
            .count()
    }
}

impl PartialEq for DomainObjectInstanceAccessModel {
    fn eq(&self, other: &Self) -> bool {
        self.position == other.position
    }
}

impl Eq for DomainObjectInstanceAccessModel {}

impl Hash for DomainObjectInstanceAccessModel {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.position.hash(state);
    }
}

impl fmt::Debug for DomainObjectInstanceAccessModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessModel")
            .field("key", &self.key().to_string())
            .field("kind", &self.kind)
            .field(
                "record_type",
                &self.record_mirror.as_ref().map(|m| m.record_type().to_string()),
            )
            .field("children", &self.children.len())
            .finish()
    }
}
