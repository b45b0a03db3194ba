//! For identical label vectors, every agreement metric returns 1.0
//! within floating-point tolerance, regardless of rater count or which
//! category was chosen.

use anvil_agreement::{cohen_kappa, fleiss_kappa};
use proptest::prelude::*;

fn arb_category() -> impl Strategy<Value = String> {
 prop_oneof![Just("a".to_string()), Just("b".to_string()), Just("c".to_string())]
}

proptest! {
 #[test]
 fn cohen_is_one_for_identical_pairs(category in arb_category(), n in 2usize..20) {
 let pairs: Vec<(String, String)> = (0..n).map(|_| (category.clone(), category.clone())).collect();
 let kappa = cohen_kappa(&pairs).unwrap();
 prop_assert!((kappa - 1.0).abs() < 1e-9);
 }

 #[test]
 fn fleiss_is_one_for_identical_items(category in arb_category(), n_items in 2usize..10, n_raters in 2usize..6) {
 let items: Vec<Vec<String>> = (0..n_items)
.map(|_| std::iter::repeat(category.clone()).take(n_raters).collect())
.collect();
 let kappa = fleiss_kappa(&items).unwrap();
 prop_assert!((kappa - 1.0).abs() < 1e-9);
 }
}
