//! Pure scoring primitives for lost/found matching.
//!
//! Everything in this crate is a total function over its inputs: no storage,
//! no clock reads, no randomness. The same pair of inputs always produces the
//! same confidence score, which is what makes match decisions reproducible
//! and auditable after the fact.

pub mod geo;
pub mod scorer;
pub mod text;

pub use geo::{haversine_km, Coordinates};
pub use scorer::{score_match, MatchScore, ScoreDetails, ScoreInput, ScoreWeights};
pub use text::{shares_significant_token, significant_tokens, token_overlap, tokenize};
