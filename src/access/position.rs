use crate::core::Value;
use crate::model::{DomainRef, same_instance};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Tells apart siblings reached through the same accessor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Discriminator {
    /// Entity with an identity value.
    Identity(Value),
    /// Value object, by its scalar field values.
    Value(Vec<Value>),
    /// Entity that has not been given an identity yet; keyed by instance address.
    Transient(usize),
}

impl fmt::Display for Discriminator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Identity(value) => write!(f, "{}", value),
            Self::Value(values) => {
                let parts: Vec<String> = values.iter().map(ToString::to_string).collect();
                write!(f, "<{}>", parts.join(","))
            }
            Self::Transient(addr) => write!(f, "new@{:x}", addr),
        }
    }
}

/// One level of a [`PositionKey`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeySegment {
    pub accessor: String,
    pub type_name: String,
    pub discriminator: Discriminator,
    /// Index among earlier siblings with an equal discriminator.
    pub occurrence: usize,
}

/// Structural label of a position, comparable across independently built trees.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct PositionKey(Vec<KeySegment>);

impl PositionKey {
    pub fn segments(&self) -> &[KeySegment] {
        &self.0
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }

    fn child(&self, segment: KeySegment) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment);
        Self(segments)
    }
}

impl fmt::Display for PositionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "/")?;
            }
            if !segment.accessor.is_empty() {
                write!(f, "{}:", segment.accessor)?;
            }
            write!(f, "{}[{}]", segment.type_name, segment.discriminator)?;
            if segment.occurrence > 0 {
                write!(f, "#{}", segment.occurrence)?;
            }
        }
        Ok(())
    }
}

/// (accessor name, instance) pair on the path from the aggregate root.
#[derive(Clone)]
pub struct PathSegment {
    accessor: String,
    instance: DomainRef,
}

impl PathSegment {
    pub fn accessor(&self) -> &str {
        &self.accessor
    }

    pub fn instance(&self) -> &DomainRef {
        &self.instance
    }
}

impl fmt::Debug for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.accessor, self.instance.type_name())
    }
}

/// Where one domain instance sits inside the aggregate graph.
///
/// Immutable. Equality and hashing go through the [`PositionKey`], so a node
/// of a freshly built tree equals the node at the same place in a tree that
/// was read back from the store.
#[derive(Clone)]
pub struct StructuralPosition {
    instance: DomainRef,
    parent: Option<Arc<StructuralPosition>>,
    accessor_from_parent: String,
    access_path_from_root: Vec<PathSegment>,
    is_back_reference: bool,
    key: PositionKey,
}

impl StructuralPosition {
    pub fn root(instance: DomainRef, discriminator: Discriminator) -> Self {
        let segment = KeySegment {
            accessor: String::new(),
            type_name: instance.type_name().to_string(),
            discriminator,
            occurrence: 0,
        };
        Self {
            instance,
            parent: None,
            accessor_from_parent: String::new(),
            access_path_from_root: Vec::new(),
            is_back_reference: false,
            key: PositionKey(vec![segment]),
        }
    }

    pub fn child(
        parent: &Arc<StructuralPosition>,
        accessor: &str,
        instance: DomainRef,
        discriminator: Discriminator,
        occurrence: usize,
        is_back_reference: bool,
    ) -> Self {
        let key = parent.key.child(KeySegment {
            accessor: accessor.to_string(),
            type_name: instance.type_name().to_string(),
            discriminator,
            occurrence,
        });
        Self {
            instance,
            parent: Some(parent.clone()),
            accessor_from_parent: accessor.to_string(),
            access_path_from_root: Self::path_below(parent),
            is_back_reference,
            key,
        }
    }

    fn path_below(parent: &StructuralPosition) -> Vec<PathSegment> {
        let mut path = parent.access_path_from_root.clone();
        path.push(PathSegment {
            accessor: parent.accessor_from_parent.clone(),
            instance: parent.instance.clone(),
        });
        path
    }

    pub fn instance(&self) -> &DomainRef {
        &self.instance
    }

    pub fn parent(&self) -> Option<&Arc<StructuralPosition>> {
        self.parent.as_ref()
    }

    pub fn accessor_from_parent(&self) -> &str {
        &self.accessor_from_parent
    }

    pub fn access_path_from_root(&self) -> &[PathSegment] {
        &self.access_path_from_root
    }

    pub fn is_back_reference(&self) -> bool {
        self.is_back_reference
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn key(&self) -> &PositionKey {
        &self.key
    }

    pub fn root_instance(&self) -> &DomainRef {
        self.access_path_from_root
            .first()
            .map(PathSegment::instance)
            .unwrap_or(&self.instance)
    }

    /// Accessor names from the root down to this node, root excluded.
    pub fn accessor_path(&self) -> Vec<&str> {
        self.access_path_from_root
            .iter()
            .skip(1)
            .map(PathSegment::accessor)
            .chain((!self.is_root()).then_some(self.accessor_from_parent.as_str()))
            .collect()
    }

    /// Parent first, root last.
    pub fn ancestors(&self) -> impl Iterator<Item = &Arc<StructuralPosition>> {
        std::iter::successors(self.parent.as_ref(), |p| p.parent.as_ref())
    }

    /// Whether `instance` is this node or one of its ancestors.
    pub fn is_on_path(&self, instance: &DomainRef) -> bool {
        same_instance(&self.instance, instance)
            || self
                .access_path_from_root
                .iter()
                .any(|segment| same_instance(&segment.instance, instance))
    }

    /// Same place, different instance.
    pub fn with_instance(&self, instance: DomainRef) -> Self {
        Self {
            instance,
            ..self.clone()
        }
    }

    /// Same place and instance under a replacement parent, so that the
    /// access path reflects instances substituted further up.
    pub fn reparented(&self, parent: Option<Arc<StructuralPosition>>) -> Self {
        let access_path_from_root = parent
            .as_deref()
            .map(Self::path_below)
            .unwrap_or_default();
        Self {
            parent,
            access_path_from_root,
            ..self.clone()
        }
    }
}

impl PartialEq for StructuralPosition {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for StructuralPosition {}

impl Hash for StructuralPosition {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl fmt::Debug for StructuralPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StructuralPosition")
            .field("key", &self.key.to_string())
            .field("type", &self.instance.type_name())
            .field("back_reference", &self.is_back_reference)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Result;
    use crate::model::{DomainObject, FieldValue, unknown_field};
    use std::any::Any;

    #[derive(Debug)]
    struct Node(&'static str);

    impl DomainObject for Node {
        fn type_name(&self) -> &'static str {
            self.0
        }

        fn field_value(&self, field: &str) -> Result<FieldValue> {
            Err(unknown_field(self.0, field))
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn node(name: &'static str) -> DomainRef {
        Arc::new(Node(name))
    }

    fn chain() -> (Arc<StructuralPosition>, Arc<StructuralPosition>, StructuralPosition) {
        let root = Arc::new(StructuralPosition::root(
            node("Order"),
            Discriminator::Identity(Value::Integer(1)),
        ));
        let line = Arc::new(StructuralPosition::child(
            &root,
            "lines",
            node("Line"),
            Discriminator::Identity(Value::Integer(10)),
            0,
            false,
        ));
        let note = StructuralPosition::child(
            &line,
            "notes",
            node("Note"),
            Discriminator::Identity(Value::Integer(100)),
            0,
            false,
        );
        (root, line, note)
    }

    #[test]
    fn test_path_is_parent_path_plus_parent() {
        let (root, line, note) = chain();
        assert!(root.access_path_from_root().is_empty());
        assert_eq!(line.access_path_from_root().len(), 1);
        assert_eq!(note.access_path_from_root().len(), 2);
        assert_eq!(note.access_path_from_root()[1].accessor(), "lines");
        assert!(same_instance(
            note.access_path_from_root()[1].instance(),
            line.instance()
        ));
        assert!(same_instance(note.root_instance(), root.instance()));
        assert_eq!(note.accessor_path(), vec!["lines", "notes"]);
        assert!(root.accessor_path().is_empty());
    }

    #[test]
    fn test_ancestors_nearest_first() {
        let (_, _, note) = chain();
        let types: Vec<&str> = note.ancestors().map(|p| p.instance().type_name()).collect();
        assert_eq!(types, vec!["Line", "Order"]);
    }

    #[test]
    fn test_equality_is_structural() {
        let (_, _, a) = chain();
        let (_, _, b) = chain();
        assert_eq!(a, b);
        assert!(!same_instance(a.instance(), b.instance()));
        assert_eq!(a.key().to_string(), "Order[1]/lines:Line[10]/notes:Note[100]");
    }

    #[test]
    fn test_reparented_rebuilds_path() {
        let (root, line, note) = chain();
        let new_root = Arc::new(root.with_instance(node("Order")));
        let new_line = Arc::new(line.reparented(Some(new_root.clone())));
        let moved = note.reparented(Some(new_line));
        assert!(same_instance(moved.root_instance(), new_root.instance()));
        assert_eq!(moved, note);
    }
}
