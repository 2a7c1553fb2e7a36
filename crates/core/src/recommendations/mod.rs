//! Ranked suggestions read from a calculated offer.
//!
//! Strategies never change the offer; they re-price hypothetical variants of single items
//! and report the difference. A failing strategy contributes nothing.

mod engine;
mod scoring;
mod strategies;
mod types;

pub use engine::RecommendationEngine;
pub use scoring::{balanced_score, filter_and_diversify, ratio_score, AdvisorWeights};
pub use strategies::{Advisor, MarginUplift, RecommendationStrategy, Upsell};
pub use types::{Recommendation, RecommendationContext, RecommendationKind};

pub const DEFAULT_MIN_SCORE: f64 = 0.10;

pub const DEFAULT_MAX_RECOMMENDATIONS: usize = 5;

/// Cap per recommendation kind for diversity.
pub const MAX_PER_KIND: usize = 2;
