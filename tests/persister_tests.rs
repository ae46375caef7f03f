use aggmirror::access::AccessModel;
use aggmirror::model::{DomainRef, downcast};
use aggmirror::persist::{PersistAction, PersistedChange};
use aggmirror::sample::{OrderLine, PurchaseOrder, SampleStack, sample_order};
use aggmirror::store::RecordStore;
use aggmirror::{PersistenceError, Value};
use std::sync::Arc;

fn build(stack: &SampleStack, order: PurchaseOrder) -> Arc<AccessModel> {
    let root: DomainRef = Arc::new(order);
    stack
        .context
        .access_model_builder()
        .build_access_model(root)
        .unwrap()
}

#[test]
fn test_insert_reports_each_write_through_callback() {
    let stack = SampleStack::new().unwrap();
    let model = build(&stack, sample_order());

    let mut seen: Vec<(PersistAction, String)> = Vec::new();
    let outcome = stack
        .context
        .persister()
        .insert(&model, &mut |change: &PersistedChange| {
            seen.push((change.action, change.record_type().to_string()))
        })
        .unwrap();

    assert_eq!(outcome.count(PersistAction::Insert), 6);
    assert_eq!(seen.len(), outcome.changes.len());
    assert_eq!(seen[0], (PersistAction::Insert, "PURCHASE_ORDER".to_string()));
    assert_eq!(seen[1], (PersistAction::Insert, "ORDER_LINE".to_string()));
    assert_eq!(seen[2], (PersistAction::Insert, "line_note".to_string()));

    let root = downcast::<PurchaseOrder>(outcome.root.as_ref()).unwrap();
    assert!(root.id.is_some());
    // the model itself is untouched; identities live on substituted copies
    let original = downcast::<PurchaseOrder>(model.instance().as_ref()).unwrap();
    assert!(original.id.is_none());
}

#[test]
fn test_child_events_carry_persisted_root() {
    let stack = SampleStack::new().unwrap();
    let model = build(&stack, sample_order());

    let mut roots: Vec<Option<i64>> = Vec::new();
    stack
        .context
        .persister()
        .insert(&model, &mut |change: &PersistedChange| {
            if let Some(root) = &change.aggregate_root {
                let order = downcast::<PurchaseOrder>(root.as_ref()).unwrap();
                roots.push(order.id.as_ref().map(|id| id.0));
            }
        })
        .unwrap();

    assert_eq!(roots.len(), 5);
    assert!(roots.iter().all(|id| *id == Some(1)));
}

#[test]
fn test_update_without_old_model_inserts() {
    let stack = SampleStack::new().unwrap();
    let model = build(&stack, sample_order());

    let outcome = stack
        .context
        .persister()
        .update(&model, None, &mut |_: &PersistedChange| {})
        .unwrap();
    assert_eq!(outcome.count(PersistAction::Insert), 6);
    assert_eq!(stack.store.count("PURCHASE_ORDER").unwrap(), 1);
}

#[test]
fn test_removed_line_takes_its_notes_along() {
    let stack = SampleStack::new().unwrap();
    let stored = stack.repository.insert(sample_order()).unwrap();
    let old_model = build(&stack, stored.clone());

    let mut changed = stored;
    changed.remove_line("widget");
    let new_model = build(&stack, changed);

    let outcome = stack
        .context
        .persister()
        .update(&new_model, Some(&old_model), &mut |_: &PersistedChange| {})
        .unwrap();

    let deleted: Vec<&str> = outcome
        .changes
        .iter()
        .filter(|c| c.action == PersistAction::Delete)
        .map(|c| c.record_type())
        .collect();
    assert_eq!(deleted, vec!["line_note", "ORDER_LINE"]);
    assert_eq!(outcome.count(PersistAction::Update), 1);
    assert_eq!(stack.store.count("line_note").unwrap(), 0);
}

#[test]
fn test_new_line_gets_foreign_key_of_existing_root() {
    let stack = SampleStack::new().unwrap();
    let stored = stack.repository.insert(sample_order()).unwrap();
    let order_id = stored.id.clone().unwrap().0;
    let old_model = build(&stack, stored.clone());

    let new_model = build(&stack, stored.with_line(OrderLine::new("bolt", 4).with_note("boxed")));
    stack
        .context
        .persister()
        .update(&new_model, Some(&old_model), &mut |_: &PersistedChange| {})
        .unwrap();

    let bolts = stack
        .store
        .select("ORDER_LINE", &[("PRODUCT", Value::from("bolt"))])
        .unwrap();
    assert_eq!(bolts.len(), 1);
    assert_eq!(bolts[0].get("ORDER_ID").unwrap(), &Value::Integer(order_id));

    let notes = stack
        .store
        .select("line_note", &[("text", Value::from("boxed"))])
        .unwrap();
    assert_eq!(notes[0].get("line_id").unwrap(), bolts[0].get("ID").unwrap());
}

#[test]
fn test_root_row_cannot_be_deleted_before_children() {
    let stack = SampleStack::new().unwrap();
    stack.repository.insert(sample_order()).unwrap();

    let order_row = stack.store.rows("PURCHASE_ORDER").unwrap().remove(0);
    let err = stack.store.delete(&order_row).unwrap_err();
    assert!(matches!(err, PersistenceError::ConstraintViolation(_)));
}
