use crate::storage::page::{HeapPageId, RecordId};
use crate::storage::tuple::Tuple;
use crate::types::{Column, DataType, Field, Schema};
use std::sync::Arc;

fn mixed_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Column::builder().name("id").data_type(DataType::Int).build(),
        Column::builder()
            .name("label")
            .data_type(DataType::Text)
            .max_str_len(12)
            .build(),
    ]))
}

#[test]
fn test_arity_checked_at_construction() {
    let desc = mixed_schema();
    assert!(Tuple::new(Arc::clone(&desc), vec![Field::Integer(1)]).is_err());
}

#[test]
fn test_type_checked_at_construction() {
    let desc = mixed_schema();
    assert!(Tuple::new(
        Arc::clone(&desc),
        vec![Field::from("one"), Field::from("two")]
    )
    .is_err());
}

#[test]
fn test_set_field() {
    let desc = mixed_schema();
    let mut tuple = Tuple::new(
        Arc::clone(&desc),
        vec![Field::Integer(1), Field::from("before")],
    )
    .unwrap();

    tuple.set_field(1, Field::from("after")).unwrap();
    assert_eq!(*tuple.get_field(1).unwrap(), Field::from("after"));

    // Replacing a field with one of a different type is refused.
    assert!(tuple.set_field(0, Field::from("oops")).is_err());
}

#[test]
fn test_serialize_round_trip() {
    let desc = mixed_schema();
    let tuple = Tuple::new(
        Arc::clone(&desc),
        vec![Field::Integer(-7), Field::from("round trip")],
    )
    .unwrap();

    let data = tuple.serialize().unwrap();
    assert_eq!(data.len(), desc.tuple_size_bytes());
    assert_eq!(Tuple::deserialize(&data, &desc).unwrap(), tuple);
}

#[test]
fn test_random_tuples_round_trip() {
    let desc = mixed_schema();
    for seed in 0..16 {
        let tuple = crate::common::utility::create_random_tuple(&desc, Some(seed));
        let data = tuple.serialize().unwrap();
        assert_eq!(Tuple::deserialize(&data, &desc).unwrap(), tuple);
    }
}

#[test]
fn test_equality_ignores_record_id() {
    let desc = mixed_schema();
    let mut stored = Tuple::new(
        Arc::clone(&desc),
        vec![Field::Integer(3), Field::from("same")],
    )
    .unwrap();
    stored.set_rid(Some(RecordId::new(HeapPageId::new(1, 0), 4)));

    let fresh = Tuple::new(
        Arc::clone(&desc),
        vec![Field::Integer(3), Field::from("same")],
    )
    .unwrap();
    assert_eq!(stored, fresh);
}
