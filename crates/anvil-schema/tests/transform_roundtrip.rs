//! Property test: `backward(forward(x)) == x` for every payload valid
//! under the predecessor schema version.

use anvil_schema::{RenameFieldTransform, SchemaTransform};
use anvil_types::field::FieldValue;
use proptest::prelude::*;
use std::collections::BTreeMap;

fn arb_field_value() -> impl Strategy<Value = FieldValue> {
 prop_oneof![
 ".*".prop_map(FieldValue::Text),
 any::<i64>().prop_map(FieldValue::Range),
 any::<bool>().prop_map(FieldValue::Boolean),
 ]
}

proptest! {
 #[test]
 fn rename_transform_round_trips_for_arbitrary_payloads(
 value in arb_field_value(),
 passthrough in ".*",
) {
 let transform = RenameFieldTransform::new("v1_to_v2", "category", "cat");
 let mut old: BTreeMap<String, FieldValue> = BTreeMap::new();
 old.insert("category".to_string(), value);
 old.insert("notes".to_string(), FieldValue::Text(passthrough));

 let forward = transform.forward(&old).expect("forward never fails for rename");
 let back = transform.backward(&forward).expect("backward never fails for rename");
 prop_assert_eq!(back, old);
 }
}
