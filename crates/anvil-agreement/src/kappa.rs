//! Cohen's kappa (exactly 2 raters) and Fleiss' kappa (3+ raters),
//! applicable only when every unit has the same rater count
//! and no missing values.

use std::collections::HashMap;

use crate::error::{AgreementError, AgreementResult};

/// Cohen's kappa over paired categorical ratings. `pairs` holds one
/// `(rater_a, rater_b)` category tuple per item; both raters must have
/// rated every item.
pub fn cohen_kappa(pairs: &[(String, String)]) -> AgreementResult<f64> {
 if pairs.len() < 2 {
 return Err(AgreementError::InsufficientLabels(pairs.len() * 2));
 }
 let n = pairs.len() as f64;

 let agree = pairs.iter().filter(|(a, b)| a == b).count() as f64;
 let p_o = agree / n;

 let mut counts_a: HashMap<&str, f64> = HashMap::new();
 let mut counts_b: HashMap<&str, f64> = HashMap::new();
 for (a, b) in pairs {
 *counts_a.entry(a.as_str()).or_insert(0.0) += 1.0;
 *counts_b.entry(b.as_str()).or_insert(0.0) += 1.0;
 }

 let categories: std::collections::HashSet<&str> = counts_a.keys().chain(counts_b.keys()).copied().collect();
 let p_e: f64 = categories
.iter()
.map(|c| (counts_a.get(c).copied().unwrap_or(0.0) / n) * (counts_b.get(c).copied().unwrap_or(0.0) / n))
.sum();

 if (1.0 - p_e).abs() < f64::EPSILON {
 return Ok(1.0);
 }
 Ok((p_o - p_e) / (1.0 - p_e))
}

/// Fleiss' kappa over `items`, each a slice of category labels assigned
/// by every rater of that item. Assumes a uniform rater count per item
/// (the precondition for choosing this statistic over Krippendorff's
/// alpha); returns `InsufficientLabels` if fewer than 2 raters rated any
/// item or the item set is empty.
pub fn fleiss_kappa(items: &[Vec<String>]) -> AgreementResult<f64> {
 let total_raters: usize = items.iter().map(|i| i.len()).sum();
 if items.is_empty() || items.iter().any(|i| i.len() < 2) {
 return Err(AgreementError::InsufficientLabels(total_raters));
 }
 let n_items = items.len() as f64;
 let n_raters = items[0].len() as f64;

 let mut category_totals: HashMap<&str, f64> = HashMap::new();
 let mut per_item_agreement = Vec::with_capacity(items.len());

 for item in items {
 let mut counts: HashMap<&str, f64> = HashMap::new();
 for label in item {
 *counts.entry(label.as_str()).or_insert(0.0) += 1.0;
 *category_totals.entry(label.as_str()).or_insert(0.0) += 1.0;
 }
 let sum_sq: f64 = counts.values().map(|c| c * c).sum();
 let p_i = (sum_sq - n_raters) / (n_raters * (n_raters - 1.0));
 per_item_agreement.push(p_i);
 }

 let p_bar: f64 = per_item_agreement.iter().sum::<f64>() / n_items;
 let p_e_bar: f64 = category_totals
.values()
.map(|total| {
 let share = total / (n_items * n_raters);
 share * share
 })
.sum();

 if (1.0 - p_e_bar).abs() < f64::EPSILON {
 return Ok(1.0);
 }
 Ok((p_bar - p_e_bar) / (1.0 - p_e_bar))
}
