//! Enrichment and rating collaborators behind trait seams. The default
//! implementations are deterministic placeholder heuristics; production
//! deployments swap in live services behind the same traits.

pub mod address;
pub mod hazard;
pub mod rating;

use thiserror::Error;

pub use address::{AddressNormalizer, HeuristicAddressNormalizer};
pub use hazard::{CountyHazardScorer, HazardScorer};
pub use rating::{DeterministicRatingEngine, RatingEngine, RatingInput, RATING_REFERENCE_YEAR};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ToolError {
    #[error("address normalization failed: {0}")]
    AddressNormalization(String),
    #[error("hazard scoring failed: {0}")]
    HazardScoring(String),
    #[error("rating failed: {0}")]
    Rating(String),
}
