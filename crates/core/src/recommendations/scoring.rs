//! Score normalisation and ranking.

use std::cmp::Ordering;
use std::collections::HashMap;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use super::types::{Recommendation, RecommendationKind};

/// Weights of the advisor's balanced score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdvisorWeights {
    pub margin: f64,
    pub customer_price: f64,
}

impl Default for AdvisorWeights {
    fn default() -> Self {
        Self { margin: 0.60, customer_price: 0.40 }
    }
}

/// Maps `delta` relative to `reference` onto 0..1, with 0.5 meaning no change.
pub fn ratio_score(delta: Decimal, reference: Decimal) -> f64 {
    let reference = reference.abs();
    if reference.is_zero() {
        return match delta.cmp(&Decimal::ZERO) {
            Ordering::Greater => 1.0,
            Ordering::Less => 0.0,
            Ordering::Equal => 0.5,
        };
    }
    let ratio = delta.checked_div(reference).and_then(|ratio| ratio.to_f64()).unwrap_or(0.0);
    (0.5 + ratio / 2.0).clamp(0.0, 1.0)
}

pub fn balanced_score(weights: AdvisorWeights, margin_score: f64, price_score: f64) -> f64 {
    (margin_score * weights.margin + price_score * weights.customer_price).min(1.0)
}

/// Drops weak candidates, ranks the rest and caps each kind for diversity.
pub fn filter_and_diversify(
    mut recommendations: Vec<Recommendation>,
    min_score: f64,
    max_recommendations: usize,
    max_per_kind: usize,
) -> Vec<Recommendation> {
    recommendations.retain(|candidate| candidate.score >= min_score);

    recommendations.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| b.margin_delta.cmp(&a.margin_delta))
            .then_with(|| a.id.cmp(&b.id))
    });

    let mut kind_counts: HashMap<RecommendationKind, usize> = HashMap::new();
    let mut seen_ids = std::collections::HashSet::new();
    recommendations
        .into_iter()
        .filter(|candidate| seen_ids.insert(candidate.id.clone()))
        .filter(|candidate| {
            let count = kind_counts.entry(candidate.kind).or_insert(0);
            *count += 1;
            *count <= max_per_kind
        })
        .take(max_recommendations)
        .collect()
}
