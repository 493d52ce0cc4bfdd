use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geo::{haversine_km, Coordinates};
use crate::text::token_overlap;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Factor weights for [`score_match`].
///
/// The defaults are the canonical scheme: category is a hard filter worth 30
/// once it passes, name overlap 40, description overlap 20, geo proximity 20
/// and temporal proximity 10. Geo and temporal weights are the full-tier
/// values; the lower tiers are derived fractions of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub category: u32,
    pub name: u32,
    pub description: u32,
    pub geo: u32,
    pub temporal: u32,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            category: 30,
            name: 40,
            description: 20,
            geo: 20,
            temporal: 10,
        }
    }
}

/// One side of a match comparison, normalized by the caller.
///
/// `reported_at` is the date the item went missing for a lost report and the
/// report creation time for a found report (found reports record no separate
/// recovery date).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreInput {
    pub category: String,
    pub name: String,
    pub description: String,
    pub coordinates: Option<Coordinates>,
    pub reported_at: DateTime<Utc>,
}

/// Human-readable explanation for each scoring factor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreDetails {
    pub category: String,
    pub name: String,
    pub description: String,
    pub location: String,
    pub time: String,
}

/// A confidence score plus its per-factor breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchScore {
    /// Confidence in [0, 100].
    pub confidence: u8,
    pub details: ScoreDetails,
}

/// Scores a lost/found pair, returning a 0-100 confidence and the per-factor
/// explanation.
///
/// Category is a hard filter: a case-insensitive mismatch returns 0
/// immediately and no other factor is evaluated. All remaining factors are
/// symmetric in their inputs, so swapping which record is "lost" and which is
/// "found" does not change the result.
pub fn score_match(lost: &ScoreInput, found: &ScoreInput, weights: &ScoreWeights) -> MatchScore {
    let lost_category = lost.category.trim().to_lowercase();
    let found_category = found.category.trim().to_lowercase();

    if lost_category != found_category {
        return MatchScore {
            confidence: 0,
            details: ScoreDetails {
                category: format!("mismatch ({} vs {})", lost.category, found.category),
                name: "not evaluated".into(),
                description: "not evaluated".into(),
                location: "not evaluated".into(),
                time: "not evaluated".into(),
            },
        };
    }

    let mut total = weights.category;
    let category_detail = format!("match ({lost_category}) +{}", weights.category);

    let name_sim = token_overlap(&lost.name, &found.name);
    let name_points = (name_sim * f64::from(weights.name)).round() as u32;
    total += name_points;
    let name_detail = format!("overlap {name_sim:.2} +{name_points}");

    let desc_sim = token_overlap(&lost.description, &found.description);
    let desc_points = (desc_sim * f64::from(weights.description)).round() as u32;
    total += desc_points;
    let desc_detail = format!("overlap {desc_sim:.2} +{desc_points}");

    let (geo_points, location_detail) = match (lost.coordinates, found.coordinates) {
        (Some(a), Some(b)) => {
            let km = haversine_km(a, b);
            let points = geo_tier_points(km, weights.geo);
            (points, format!("{km:.2} km apart +{points}"))
        }
        _ => (0, "no coordinates".into()),
    };
    total += geo_points;

    let day_diff = (lost.reported_at - found.reported_at).num_seconds().abs() as f64
        / SECONDS_PER_DAY;
    let temporal_points = temporal_tier_points(day_diff, weights.temporal);
    total += temporal_points;
    let time_detail = format!("{day_diff:.1} days apart +{temporal_points}");

    MatchScore {
        confidence: total.min(100) as u8,
        details: ScoreDetails {
            category: category_detail,
            name: name_detail,
            description: desc_detail,
            location: location_detail,
            time: time_detail,
        },
    }
}

/// Distance tiers: <0.2 km full weight, then 3/4, 1/2 and 1/4 of it.
fn geo_tier_points(km: f64, weight: u32) -> u32 {
    if km < 0.2 {
        weight
    } else if km < 1.0 {
        weight * 3 / 4
    } else if km < 3.0 {
        weight / 2
    } else if km < 10.0 {
        weight / 4
    } else {
        0
    }
}

/// Day-gap tiers: <1 day full weight, <5 days half, <14 days a small credit.
fn temporal_tier_points(days: f64, weight: u32) -> u32 {
    if days < 1.0 {
        weight
    } else if days < 5.0 {
        weight / 2
    } else if days < 14.0 {
        weight / 5
    } else {
        0
    }
}
