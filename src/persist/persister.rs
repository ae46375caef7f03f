use super::action::{PersistAction, PersistOutcome, PersistedChange};
use crate::access::{AccessModel, PositionKey, StructuralPosition};
use crate::config::PersistenceConfig;
use crate::core::{PersistenceError, Record, Result, Value};
use crate::mirror::RecordMapper;
use crate::model::{DomainRef, TypeModelProvider, identity_of};
use crate::provider::{IdentityProvider, ParentReferenceProvider, ValueObjectIdProvider};
use crate::store::RecordStore;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{Level, event, info_span};

/// Callback invoked once per successful write, in write order.
pub type ChangeCallback<'a> = dyn FnMut(&PersistedChange) + 'a;

/// A node of the new tree at its final position: reparented below
/// substituted ancestors and carrying its generated identity, if any.
struct ResolvedNode {
    node: Arc<AccessModel>,
    position: Arc<StructuralPosition>,
}

impl ResolvedNode {
    fn map(&self, mapper: &Arc<dyn RecordMapper>) -> Result<Record> {
        mapper.map_instance(
            self.position.instance().as_ref(),
            self.position.root_instance().as_ref(),
        )
    }
}

/// Surrogate keys of value-object rows already matched in this call, per table.
type ClaimedIds = HashMap<String, HashSet<Value>>;

/// Diffs access models and cascades the resulting record writes.
///
/// Inserts run parents first, deletes children first. Within `update` the
/// order is: forced root version bump, updates, deletes, inserts. The first
/// failing write aborts the rest of the cascade; changes reported before it
/// stay reported.
pub struct Persister {
    store: Arc<dyn RecordStore>,
    type_model: Arc<dyn TypeModelProvider>,
    identities: Arc<IdentityProvider>,
    value_object_ids: Arc<ValueObjectIdProvider>,
    parent_references: Arc<ParentReferenceProvider>,
    config: PersistenceConfig,
}

impl Persister {
    pub fn new(
        store: Arc<dyn RecordStore>,
        type_model: Arc<dyn TypeModelProvider>,
        identities: Arc<IdentityProvider>,
        value_object_ids: Arc<ValueObjectIdProvider>,
        parent_references: Arc<ParentReferenceProvider>,
        config: PersistenceConfig,
    ) -> Self {
        Self {
            store,
            type_model,
            identities,
            value_object_ids,
            parent_references,
            config,
        }
    }

    pub fn insert(
        &self,
        model: &Arc<AccessModel>,
        on_change: &mut ChangeCallback<'_>,
    ) -> Result<PersistOutcome> {
        let span = info_span!("persister.insert", aggregate = %model.key());
        let _enter = span.enter();

        let resolved = self.resolve_tree(model)?;
        let mut changes = Vec::new();
        for node in &resolved {
            if let Some(mapper) = node.node.record_mirror() {
                let change = self.write_insert(node, mapper)?;
                Self::report(change, &mut changes, on_change);
            }
        }

        event!(Level::DEBUG, writes = changes.len(), "aggregate inserted");
        Ok(PersistOutcome {
            changes,
            root: Self::root_of(&resolved, model),
        })
    }

    /// Reconciles `new_model` against `old_model`, the state last read from
    /// the store. Without an old model every mapped node is inserted.
    pub fn update(
        &self,
        new_model: &Arc<AccessModel>,
        old_model: Option<&Arc<AccessModel>>,
        on_change: &mut ChangeCallback<'_>,
    ) -> Result<PersistOutcome> {
        let Some(old_model) = old_model else {
            return self.insert(new_model, on_change);
        };
        let span = info_span!("persister.update", aggregate = %new_model.key());
        let _enter = span.enter();

        let resolved = self.resolve_tree(new_model)?;
        let old_nodes: HashMap<PositionKey, Arc<AccessModel>> = old_model
            .all_contained()
            .into_iter()
            .filter(|node| !node.position().is_back_reference())
            .map(|node| (node.key().clone(), node))
            .collect();
        let new_keys: HashSet<&PositionKey> = resolved.iter().map(|r| r.node.key()).collect();

        let mut updates: Vec<(&ResolvedNode, Record)> = Vec::new();
        let mut inserts: Vec<(&ResolvedNode, &Arc<dyn RecordMapper>)> = Vec::new();
        let mut unchanged_root: Option<(&ResolvedNode, Record)> = None;
        let mut replaced: HashSet<&PositionKey> = HashSet::new();

        for node in &resolved {
            let Some(mapper) = node.node.record_mirror() else {
                continue;
            };
            let Some(old) = old_nodes.get(node.node.key()) else {
                inserts.push((node, mapper));
                continue;
            };
            let record = node.map(mapper)?;
            // value objects are never updated; a differing row is replaced
            if node.node.is_value_object() {
                let same = match old.map_record()? {
                    Some(old_record) => self.same_value_object(&record, &old_record),
                    None => false,
                };
                if !same {
                    replaced.insert(node.node.key());
                    inserts.push((node, mapper));
                }
                continue;
            }
            let changed = match old.map_record()? {
                Some(old_record) => !record.same_fields(&old_record),
                None => true,
            };
            if changed {
                updates.push((node, record));
            } else if node.position.is_root() {
                unchanged_root = Some((node, record));
            }
        }

        let deletes: Vec<Arc<AccessModel>> = old_model
            .post_order()
            .into_iter()
            .filter(|node| {
                !node.position().is_back_reference()
                    && node.is_record_mapped()
                    && (!new_keys.contains(node.key()) || replaced.contains(node.key()))
            })
            .collect();

        event!(
            Level::DEBUG,
            inserts = inserts.len(),
            updates = updates.len(),
            deletes = deletes.len(),
            "reconciliation planned"
        );

        let mut changes = Vec::new();
        let has_writes = !(inserts.is_empty() && updates.is_empty() && deletes.is_empty());
        if let Some((root, record)) = unchanged_root
            && has_writes
            && self.config.bump_root_version
            && record.table().version_column_name().is_some()
        {
            let change = self.write_version_bump(root, record)?;
            Self::report(change, &mut changes, on_change);
        }

        for (node, record) in updates {
            let change = self.write_update(node, record)?;
            Self::report(change, &mut changes, on_change);
        }

        let mut claimed = ClaimedIds::new();
        for node in &deletes {
            let change = self.write_delete(node, &mut claimed)?;
            Self::report(change, &mut changes, on_change);
        }

        for (node, mapper) in inserts {
            let change = self.write_insert(node, mapper)?;
            Self::report(change, &mut changes, on_change);
        }

        event!(Level::DEBUG, writes = changes.len(), "aggregate updated");
        Ok(PersistOutcome {
            changes,
            root: Self::root_of(&resolved, new_model),
        })
    }

    pub fn delete(
        &self,
        model: &Arc<AccessModel>,
        on_change: &mut ChangeCallback<'_>,
    ) -> Result<PersistOutcome> {
        let span = info_span!("persister.delete", aggregate = %model.key());
        let _enter = span.enter();

        let mut changes = Vec::new();
        let mut claimed = ClaimedIds::new();
        for node in model.post_order() {
            if node.position().is_back_reference() || !node.is_record_mapped() {
                continue;
            }
            let change = self.write_delete(&node, &mut claimed)?;
            Self::report(change, &mut changes, on_change);
        }

        event!(Level::DEBUG, writes = changes.len(), "aggregate deleted");
        Ok(PersistOutcome {
            changes,
            root: model.instance().clone(),
        })
    }

    /// Pre-order walk that assigns identities to mapped entities lacking one
    /// and rebuilds positions so descendants see the substituted ancestors.
    fn resolve_tree(&self, model: &Arc<AccessModel>) -> Result<Vec<ResolvedNode>> {
        let mut out = Vec::new();
        self.resolve_node(model, None, &mut out)?;
        Ok(out)
    }

    fn resolve_node(
        &self,
        node: &Arc<AccessModel>,
        parent: Option<&Arc<StructuralPosition>>,
        out: &mut Vec<ResolvedNode>,
    ) -> Result<()> {
        if node.position().is_back_reference() {
            return Ok(());
        }

        let mut position = match parent {
            Some(parent) => Arc::new(node.position().reparented(Some(parent.clone()))),
            None => node.position().clone(),
        };
        if node.is_entity()
            && node.is_record_mapped()
            && identity_of(self.type_model.as_ref(), position.instance().as_ref())?.is_none()
        {
            let identity = self.identities.provide_for(node.instance().type_name())?;
            event!(Level::DEBUG, position = %node.key(), identity = %identity, "identity assigned");
            let instance = position.instance().with_identity(&identity)?;
            position = Arc::new(position.with_instance(instance));
        }

        out.push(ResolvedNode {
            node: node.clone(),
            position: position.clone(),
        });
        for child in node.children().iter() {
            self.resolve_node(child, Some(&position), out)?;
        }
        Ok(())
    }

    fn write_insert(&self, node: &ResolvedNode, mapper: &Arc<dyn RecordMapper>) -> Result<PersistedChange> {
        let mut record = node.map(mapper)?;
        if node.node.is_value_object() {
            self.value_object_ids
                .set_container_id_in_new_vo_record(&mut record, &node.position)?;
            self.value_object_ids
                .provide_new_tech_id_for_value_object_record(&mut record)?;
        }
        self.parent_references
            .provide_parent_foreign_key_ids_for_entity_record(&mut record, &node.position)?;

        if self.store.insert(&record)? == 0 {
            return Err(PersistenceError::Store(format!(
                "Insert into '{}' affected no rows",
                record.record_type()
            )));
        }
        Ok(self.change(PersistAction::Insert, &node.position, record))
    }

    fn write_update(&self, node: &ResolvedNode, mut record: Record) -> Result<PersistedChange> {
        self.parent_references
            .provide_parent_foreign_key_ids_for_entity_record(&mut record, &node.position)?;
        if self.store.update(&record)? == 0 {
            return Err(self.lock_conflict(&node.position, &record));
        }
        Ok(self.change(PersistAction::Update, &node.position, record))
    }

    fn write_version_bump(&self, root: &ResolvedNode, record: Record) -> Result<PersistedChange> {
        if self.store.increment_version(&record)? == 0 {
            return Err(self.lock_conflict(&root.position, &record));
        }
        event!(Level::DEBUG, record_type = %record.record_type(), "root version bumped");
        Ok(self.change(PersistAction::Update, &root.position, record))
    }

    fn write_delete(&self, node: &Arc<AccessModel>, claimed: &mut ClaimedIds) -> Result<PersistedChange> {
        let mut record = match node.map_record()? {
            Some(record) => record,
            None => {
                return Err(PersistenceError::Configuration(format!(
                    "No record mapper for '{}'",
                    node.key()
                )));
            }
        };

        if node.is_value_object() {
            let taken = claimed.entry(record.record_type().to_ascii_uppercase()).or_default();
            let id = self
                .value_object_ids
                .select_existing_tech_id_of_value_object(&record, node.position(), taken)?
                .ok_or_else(|| {
                    PersistenceError::optimistic_lock(
                        record.record_type(),
                        format!("no stored row for value object at {}", node.key()),
                    )
                })?;
            taken.insert(id.clone());
            record.set(&self.config.naming.primary_key_column, id)?;
        }

        if self.store.delete(&record)? == 0 {
            return Err(self.lock_conflict(node.position(), &record));
        }
        Ok(self.change(PersistAction::Delete, node.position(), record))
    }

    fn change(
        &self,
        action: PersistAction,
        position: &Arc<StructuralPosition>,
        record: Record,
    ) -> PersistedChange {
        event!(
            Level::DEBUG,
            action = %action,
            record_type = %record.record_type(),
            position = %position.key(),
            "record written"
        );
        PersistedChange {
            action,
            instance: position.instance().clone(),
            aggregate_root: (!position.is_root()).then(|| position.root_instance().clone()),
            record,
            position: position.clone(),
        }
    }

    /// Value-object records compared without their technical key and
    /// container columns, which the mapper does not own.
    fn same_value_object(&self, new: &Record, old: &Record) -> bool {
        let naming = &self.config.naming;
        let technical = |name: &str| {
            name.eq_ignore_ascii_case(&naming.primary_key_column)
                || name.eq_ignore_ascii_case(&naming.container_id_column)
        };
        new.table().is_named(old.table().name())
            && new.values().len() == old.values().len()
            && new
                .table()
                .columns()
                .iter()
                .zip(new.values().iter().zip(old.values()))
                .all(|(column, (mine, theirs))| technical(&column.name) || mine == theirs)
    }

    fn lock_conflict(&self, position: &StructuralPosition, record: &Record) -> PersistenceError {
        let version = record
            .version()
            .map(|v| format!(" at version {}", v))
            .unwrap_or_default();
        PersistenceError::optimistic_lock(
            record.record_type(),
            format!(
                "{}{} was modified or removed concurrently",
                position.key(),
                version
            ),
        )
    }

    fn report(change: PersistedChange, changes: &mut Vec<PersistedChange>, on_change: &mut ChangeCallback<'_>) {
        on_change(&change);
        changes.push(change);
    }

    fn root_of(resolved: &[ResolvedNode], model: &Arc<AccessModel>) -> DomainRef {
        resolved
            .first()
            .map(|r| r.position.instance().clone())
            .unwrap_or_else(|| model.instance().clone())
    }
}
