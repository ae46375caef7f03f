use aggmirror::access::AccessModel;
use aggmirror::config::NamingConvention;
use aggmirror::core::{Column, DataType, PersistenceError, Record, TableDef, Value};
use aggmirror::provider::{IdentityProvider, ParentReferenceProvider, ValueObjectIdProvider};
use aggmirror::sample::{SampleStack, sample_order, sequences, type_model};
use aggmirror::store::{InMemorySequences, RecordStore};
use std::collections::HashSet;
use std::sync::Arc;

fn identities(sequences: InMemorySequences) -> IdentityProvider {
    IdentityProvider::new(
        Arc::new(type_model()),
        Arc::new(sequences),
        NamingConvention::default(),
    )
}

/// Inserts the sample order and returns the access model of what was stored.
fn stored_model(stack: &SampleStack) -> Arc<AccessModel> {
    let order = stack.repository.insert(sample_order()).unwrap();
    stack
        .context
        .access_model_builder()
        .build_access_model(Arc::new(order))
        .unwrap()
}

fn node(model: &Arc<AccessModel>, type_name: &str) -> Arc<AccessModel> {
    model
        .all_contained()
        .into_iter()
        .find(|n| n.instance().type_name() == type_name)
        .unwrap()
}

fn value_object_ids(stack: &SampleStack) -> ValueObjectIdProvider {
    let store: Arc<dyn RecordStore> = stack.store.clone();
    ValueObjectIdProvider::new(
        store,
        stack.context.mirrors().clone(),
        stack.context.type_model().clone(),
        Arc::new(sequences()),
        NamingConvention::default(),
    )
}

#[test]
fn test_identity_sequence_per_identity_type() {
    let provider = identities(sequences());

    let first = provider.provide_for("OrderLine").unwrap();
    let second = provider.provide_for("OrderLine").unwrap();
    let order = provider.provide_for("PurchaseOrder").unwrap();

    assert_eq!(first.type_name(), "LineId");
    assert_eq!(first.value(), &Value::Integer(100));
    assert_eq!(second.value(), &Value::Integer(101));
    assert_eq!(order.value(), &Value::Integer(1));
    assert_eq!(provider.cached_sequences(), 2);
}

#[test]
fn test_identity_sequence_lower_case_fallback() {
    let provider = identities(InMemorySequences::new().define_starting_at("order_id_seq", 7));
    let id = provider.provide_for("PurchaseOrder").unwrap();
    assert_eq!(id.value(), &Value::Integer(7));
}

#[test]
fn test_missing_identity_sequence_is_configuration_error() {
    let provider = identities(InMemorySequences::new());
    let err = provider.provide_for("LineNote").unwrap_err();

    assert!(matches!(err, PersistenceError::Configuration(_)));
    assert!(err.to_string().contains("NOTE_ID_SEQ"), "{err}");
}

#[test]
fn test_type_without_identity_field_is_rejected() {
    let provider = identities(sequences());
    assert!(matches!(
        provider.provide_for("Money"),
        Err(PersistenceError::Configuration(_))
    ));
}

#[test]
fn test_value_object_keys_from_container_and_sequence() {
    let stack = SampleStack::new().unwrap();
    let model = stored_model(&stack);
    let provider = value_object_ids(&stack);

    let tag = node(&model, "OrderTag");
    let mut record = tag.map_record().unwrap().unwrap();
    assert!(record.get("container_id").unwrap().is_null());

    provider
        .set_container_id_in_new_vo_record(&mut record, tag.position())
        .unwrap();
    assert_eq!(record.get("container_id").unwrap(), &Value::Integer(1));

    provider
        .provide_new_tech_id_for_value_object_record(&mut record)
        .unwrap();
    assert_eq!(record.get("id").unwrap(), &Value::Integer(1));
}

#[test]
fn test_existing_value_object_row_is_found_once() {
    let stack = SampleStack::new().unwrap();
    let model = stored_model(&stack);
    let provider = value_object_ids(&stack);

    let shipping = node(&model, "ShippingAddress");
    let record = shipping.map_record().unwrap().unwrap();

    let mut claimed = HashSet::new();
    let id = provider
        .select_existing_tech_id_of_value_object(&record, shipping.position(), &claimed)
        .unwrap()
        .unwrap();
    assert_eq!(id, Value::Integer(1));

    claimed.insert(id);
    let again = provider
        .select_existing_tech_id_of_value_object(&record, shipping.position(), &claimed)
        .unwrap();
    assert!(again.is_none());
}

#[test]
fn test_value_object_table_without_container_column() {
    let stack = SampleStack::new().unwrap();
    let model = stored_model(&stack);
    let provider = value_object_ids(&stack);

    let badge = Arc::new(
        TableDef::new("BADGE")
            .column(Column::new("ID", DataType::Integer).not_null())
            .column(Column::new("LABEL", DataType::Text))
            .primary_key(&["ID"]),
    );
    let mut record = Record::new(badge).with("LABEL", "gold").unwrap();
    let tag = node(&model, "OrderTag");

    let err = provider
        .set_container_id_in_new_vo_record(&mut record, tag.position())
        .unwrap_err();
    assert!(matches!(err, PersistenceError::SchemaMismatch(_)));
    assert_eq!(
        err.to_string(),
        "Schema mismatch: Record type 'BADGE' has neither 'CONTAINER_ID' nor 'container_id' column"
    );
}

#[test]
fn test_parent_reference_copied_from_nearest_ancestor() {
    let stack = SampleStack::new().unwrap();
    let model = stored_model(&stack);
    let provider = ParentReferenceProvider::new(stack.context.mirrors().clone());

    let note = node(&model, "LineNote");
    let mut record = note.map_record().unwrap().unwrap();
    assert!(record.get("line_id").unwrap().is_null());

    provider
        .provide_parent_foreign_key_ids_for_entity_record(&mut record, note.position())
        .unwrap();

    let widget = note.position().parent().unwrap();
    let widget_record = stack
        .context
        .mirrors()
        .lookup("OrderLine", &widget.accessor_path())
        .unwrap()
        .map_instance(widget.instance().as_ref(), widget.root_instance().as_ref())
        .unwrap();
    assert_eq!(record.get("line_id").unwrap(), widget_record.get("ID").unwrap());
}

#[test]
fn test_parent_reference_leaves_set_keys_alone() {
    let stack = SampleStack::new().unwrap();
    let model = stored_model(&stack);
    let provider = ParentReferenceProvider::new(stack.context.mirrors().clone());

    let line = node(&model, "OrderLine");
    let original = line.map_record().unwrap().unwrap();
    let mut record = original.clone();

    provider
        .provide_parent_foreign_key_ids_for_entity_record(&mut record, line.position())
        .unwrap();
    assert_eq!(record, original);
}
