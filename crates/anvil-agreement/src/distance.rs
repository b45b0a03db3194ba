//! Distance functions and the generalized Krippendorff's alpha engine
//!, following Krippendorff's coincidence-matrix formulation:
//! `alpha = 1 - D_o / D_e`, where `D_o` is observed disagreement and `D_e`
//! is disagreement expected by chance, both computed from squared
//! distances `delta(c, k)^2` between rated values.

use std::collections::HashMap;

use crate::error::{AgreementError, AgreementResult};
use crate::rating::Rating;

/// Which distance function applies to a field, per its
/// `select/boolean → nominal`, `range/number → interval`,
/// `date/datetime → ordinal` mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistanceMetric {
 Nominal,
 Interval,
 Ordinal,
}

fn nominal_delta_sq(a: &str, b: &str) -> f64 {
 if a == b {
 0.0
 } else {
 1.0
 }
}

fn interval_delta_sq(a: f64, b: f64) -> f64 {
 (a - b) * (a - b)
}

/// Krippendorff's ordinal distance: `(sum of global frequencies for
/// categories between a and b inclusive, minus the average of the two
/// endpoints' own frequencies)^2`. `frequencies` maps each distinct
/// numeric code observed anywhere in the reliability data to its total
/// count across all raters and units.
fn ordinal_delta_sq(a: f64, b: f64, sorted_categories: &[f64], frequencies: &HashMap<u64, f64>) -> f64 {
 if a == b {
 return 0.0;
 }
 let (lo, hi) = if a < b { (a, b) } else { (b, a) };
 let sum_between: f64 = sorted_categories
.iter()
.filter(|&&g| g >= lo && g <= hi)
.map(|g| frequencies.get(&g.to_bits()).copied().unwrap_or(0.0))
.sum();
 let n_lo = frequencies.get(&lo.to_bits()).copied().unwrap_or(0.0);
 let n_hi = frequencies.get(&hi.to_bits()).copied().unwrap_or(0.0);
 let value = sum_between - (n_lo + n_hi) / 2.0;
 value * value
}

/// Computes Krippendorff's alpha over `units`, one inner slice per unit
/// holding that unit's non-missing ratings (already filtered of `None`s
/// by the caller). Requires at least 2 pairable ratings total. The second
/// element of the result is `true` when expected disagreement was zero
/// (every rated value identical) — alpha is undefined in that case and
/// the caller should fall back to percent agreement 
pub fn krippendorff_alpha(units: &[Vec<Rating>], metric: DistanceMetric) -> AgreementResult<(f64, bool)> {
 let n: usize = units.iter().map(|u| u.len()).sum();
 if n < 2 {
 return Err(AgreementError::InsufficientLabels(n));
 }

 match metric {
 DistanceMetric::Nominal => {
 let keyed: Vec<Vec<String>> = units
.iter()
.map(|u| u.iter().map(|r| r.as_category_key()).collect())
.collect();
 alpha_with_delta(&keyed, |a, b| nominal_delta_sq(a, b))
 }
 DistanceMetric::Interval => {
 let numeric: Vec<Vec<f64>> = units
.iter()
.map(|u| u.iter().filter_map(|r| r.as_numeric()).collect())
.collect();
 alpha_with_numeric_delta(&numeric, interval_delta_sq)
 }
 DistanceMetric::Ordinal => {
 let numeric: Vec<Vec<f64>> = units
.iter()
.map(|u| u.iter().filter_map(|r| r.as_numeric()).collect())
.collect();
 let mut frequencies: HashMap<u64, f64> = HashMap::new();
 for value in numeric.iter().flatten() {
 *frequencies.entry(value.to_bits()).or_insert(0.0) += 1.0;
 }
 let mut sorted_categories: Vec<f64> = frequencies.keys().map(|bits| f64::from_bits(*bits)).collect();
 sorted_categories.sort_by(|a, b| a.partial_cmp(b).unwrap());
 alpha_with_numeric_delta(&numeric, |a, b| ordinal_delta_sq(a, b, &sorted_categories, &frequencies))
 }
 }
}

fn alpha_with_delta<T: Clone>(units: &[Vec<T>], delta_sq: impl Fn(&T, &T) -> f64) -> AgreementResult<(f64, bool)> {
 let n: usize = units.iter().map(|u| u.len()).sum();
 let n_f = n as f64;

 let mut observed_sum = 0.0;
 for unit in units {
 let m_u = unit.len();
 if m_u < 2 {
 continue;
 }
 let mut pair_sum = 0.0;
 for a in unit {
 for b in unit {
 pair_sum += delta_sq(a, b);
 }
 }
 observed_sum += pair_sum / (m_u as f64 - 1.0);
 }
 let d_o = observed_sum / n_f;

 let all: Vec<&T> = units.iter().flatten().collect();
 let mut expected_sum = 0.0;
 for a in &all {
 for b in &all {
 expected_sum += delta_sq(a, b);
 }
 }
 let d_e = expected_sum / (n_f * (n_f - 1.0));

 if d_e == 0.0 {
 return Ok((1.0, true));
 }
 Ok((1.0 - d_o / d_e, false))
}

fn alpha_with_numeric_delta(units: &[Vec<f64>], delta_sq: impl Fn(f64, f64) -> f64) -> AgreementResult<(f64, bool)> {
 let n: usize = units.iter().map(|u| u.len()).sum();
 let n_f = n as f64;

 let mut observed_sum = 0.0;
 for unit in units {
 let m_u = unit.len();
 if m_u < 2 {
 continue;
 }
 let mut pair_sum = 0.0;
 for &a in unit {
 for &b in unit {
 pair_sum += delta_sq(a, b);
 }
 }
 observed_sum += pair_sum / (m_u as f64 - 1.0);
 }
 let d_o = observed_sum / n_f;

 let all: Vec<f64> = units.iter().flatten().copied().collect();
 let mut expected_sum = 0.0;
 for &a in &all {
 for &b in &all {
 expected_sum += delta_sq(a, b);
 }
 }
 let d_e = expected_sum / (n_f * (n_f - 1.0));

 if d_e == 0.0 {
 return Ok((1.0, true));
 }
 Ok((1.0 - d_o / d_e, false))
}

/// Plain percent agreement: the fraction of within-unit rater pairs whose
/// category keys match exactly. Used as the fallback when
/// Krippendorff's alpha is degenerate.
pub fn percent_agreement(units: &[Vec<Rating>]) -> AgreementResult<f64> {
 let keyed: Vec<Vec<String>> = units.iter().map(|u| u.iter().map(|r| r.as_category_key()).collect()).collect();
 let mut agreeing = 0.0;
 let mut total = 0.0;
 for unit in &keyed {
 let m_u = unit.len();
 if m_u < 2 {
 continue;
 }
 for i in 0..m_u {
 for j in 0..m_u {
 if i == j {
 continue;
 }
 total += 1.0;
 if unit[i] == unit[j] {
 agreeing += 1.0;
 }
 }
 }
 }
 if total == 0.0 {
 return Err(AgreementError::InsufficientLabels(keyed.iter().map(|u| u.len()).sum()));
 }
 Ok(agreeing / total)
}

#[cfg(test)]
mod tests {
 use super::*;
 use crate::rating::Rating;

 fn cat(s: &str) -> Rating {
 Rating::Category(s.to_string())
 }

 fn num(n: f64) -> Rating {
 Rating::Ordered(n)
 }

 #[test]
 fn perfect_nominal_agreement_yields_alpha_one() {
 let units = vec![
 vec![cat("a"), cat("a")],
 vec![cat("b"), cat("b")],
 vec![cat("a"), cat("a")],
 ];
 let (alpha, degenerate) = krippendorff_alpha(&units, DistanceMetric::Nominal).unwrap();
 assert!((alpha - 1.0).abs() < 1e-9);
 assert!(!degenerate);
 }

 #[test]
 fn systematic_within_unit_disagreement_yields_negative_alpha() {
 // Every unit pairs one "a" with one "b": raters disagree every time
 // even though the overall a/b split is balanced, so observed
 // disagreement exceeds chance disagreement and alpha goes negative.
 let units = vec![vec![cat("a"), cat("b")], vec![cat("a"), cat("b")], vec![cat("a"), cat("b")]];
 let (alpha, _) = krippendorff_alpha(&units, DistanceMetric::Nominal).unwrap();
 assert!(alpha < -0.5);
 }

 #[test]
 fn interval_metric_rewards_closer_numeric_agreement() {
 let tight = vec![vec![num(1.0), num(1.1)], vec![num(5.0), num(5.1)], vec![num(9.0), num(9.2)]];
 let loose = vec![vec![num(1.0), num(9.0)], vec![num(5.0), num(1.0)], vec![num(9.0), num(5.0)]];
 let (tight_alpha, _) = krippendorff_alpha(&tight, DistanceMetric::Interval).unwrap();
 let (loose_alpha, _) = krippendorff_alpha(&loose, DistanceMetric::Interval).unwrap();
 assert!(tight_alpha > loose_alpha);
 }

 #[test]
 fn ordinal_metric_matches_hand_computed_value() {
 // Three ordinal categories {1,2,3}; three units agree exactly, one
 // unit splits the two most distant categories. By hand (frequencies
 // 1:3, 2:2, 3:3 across the 8 ratings): d_o = 50/8, d_e = 600/56,
 // alpha = 1 - (d_o/d_e) = 1 - 7/12 = 5/12.
 let units = vec![
 vec![num(1.0), num(1.0)],
 vec![num(2.0), num(2.0)],
 vec![num(3.0), num(3.0)],
 vec![num(1.0), num(3.0)],
 ];
 let (alpha, degenerate) = krippendorff_alpha(&units, DistanceMetric::Ordinal).unwrap();
 assert!(!degenerate);
 assert!((alpha - 5.0 / 12.0).abs() < 1e-6);
 }

 #[test]
 fn fewer_than_two_ratings_is_insufficient() {
 let units = vec![vec![cat("a")]];
 let err = krippendorff_alpha(&units, DistanceMetric::Nominal).unwrap_err();
 assert_eq!(err, AgreementError::InsufficientLabels(1));
 }

 #[test]
 fn all_identical_values_are_degenerate() {
 let units = vec![vec![cat("a"), cat("a")], vec![cat("a"), cat("a")]];
 let (alpha, degenerate) = krippendorff_alpha(&units, DistanceMetric::Nominal).unwrap();
 assert_eq!(alpha, 1.0);
 assert!(degenerate);
 }
}
