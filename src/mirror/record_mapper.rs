use crate::core::{Record, Result, TableDef};
use crate::model::{DomainObject, DomainType, downcast};
use std::sync::Arc;

/// Typed mapping between one domain type (owned by aggregate root type
/// `Root`) and the records of one table.
///
/// Round trips must preserve the primary key and every persisted scalar;
/// derived values may be dropped.
pub trait RecordMirror: Send + Sync + 'static {
    type Domain: DomainObject + DomainType;
    type Root: DomainObject + DomainType;
    type Builder;

    fn table_def(&self) -> &Arc<TableDef>;

    /// Partially populated builder, or `None` when there is no record.
    fn record_to_domain_object_builder(&self, record: Option<&Record>)
    -> Result<Option<Self::Builder>>;

    /// A new record for `domain`. `root` resolves cross references.
    fn from(&self, domain: &Self::Domain, root: &Self::Root) -> Result<Record>;
}

/// Object-safe view of a [`RecordMirror`], as stored in the registry.
pub trait RecordMapper: Send + Sync {
    fn domain_object_type(&self) -> &'static str;

    fn aggregate_root_type(&self) -> &'static str;

    fn table(&self) -> &Arc<TableDef>;

    fn record_type(&self) -> &str {
        self.table().name()
    }

    fn map_instance(
        &self,
        instance: &dyn DomainObject,
        aggregate_root: &dyn DomainObject,
    ) -> Result<Record>;
}

impl<M: RecordMirror> RecordMapper for M {
    fn domain_object_type(&self) -> &'static str {
        <M::Domain as DomainType>::TYPE_NAME
    }

    fn aggregate_root_type(&self) -> &'static str {
        <M::Root as DomainType>::TYPE_NAME
    }

    fn table(&self) -> &Arc<TableDef> {
        self.table_def()
    }

    fn map_instance(
        &self,
        instance: &dyn DomainObject,
        aggregate_root: &dyn DomainObject,
    ) -> Result<Record> {
        let domain = downcast::<M::Domain>(instance)?;
        let root = downcast::<M::Root>(aggregate_root)?;
        self.from(domain, root)
    }
}
