use chrono::{DateTime, Utc};
use scoring::{Coordinates, ScoreDetails};
use serde::{Deserialize, Serialize};
use std::fmt;

pub type ItemId = u64;
pub type MatchId = u64;
pub type ClaimId = u64;
pub type UserId = u64;

/// Opaque reference to stored asset bytes (a path or object key).
pub type AssetRef = String;

/// Lifecycle of a lost or found report.
///
/// `Active` items are in the matching pool; creating a match flips both
/// sides to `Matched` (locked); a completed handover resolves them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Active,
    Matched,
    Resolved,
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ItemStatus::Active => "active",
            ItemStatus::Matched => "matched",
            ItemStatus::Resolved => "resolved",
        };
        f.write_str(s)
    }
}

/// Lifecycle of a match record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    /// Created by the ledger, not yet verified by a claim.
    Active,
    /// The claim built on this match completed handover.
    Confirmed,
    /// The match lock was undone (failed verification or rejection).
    Dissolved,
}

/// Claim workflow states. The transition table over this enum lives in the
/// claims crate and is the single source of truth for what may follow what.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimStatus {
    VerificationPending,
    VerificationFailed,
    AdminReview,
    Approved,
    Rejected,
    Completed,
}

impl fmt::Display for ClaimStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ClaimStatus::VerificationPending => "verification_pending",
            ClaimStatus::VerificationFailed => "verification_failed",
            ClaimStatus::AdminReview => "admin_review",
            ClaimStatus::Approved => "approved",
            ClaimStatus::Rejected => "rejected",
            ClaimStatus::Completed => "completed",
        };
        f.write_str(s)
    }
}

/// Role carried by an authenticated requester. Authentication itself is an
/// external collaborator; the core only ever sees id + role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Admin,
}

/// An authenticated caller identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requester {
    pub id: UserId,
    pub role: Role,
}

impl Requester {
    pub fn user(id: UserId) -> Self {
        Self {
            id,
            role: Role::User,
        }
    }

    pub fn admin(id: UserId) -> Self {
        Self {
            id,
            role: Role::Admin,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// A lost-property report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LostItem {
    pub id: ItemId,
    pub owner_id: UserId,
    pub item_name: String,
    pub category: String,
    pub description: String,
    /// Unique marks the owner recorded at report time; matched against the
    /// claimant's secret-marks answer during verification.
    pub unique_marks: String,
    pub color: Option<String>,
    pub material: Option<String>,
    pub location_text: Option<String>,
    pub coordinates: Option<Coordinates>,
    pub date_lost: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub masked_image: Option<AssetRef>,
    pub original_image: Option<AssetRef>,
    /// Set when masking failed and the public copy was withheld.
    pub evidence_flagged: bool,
    pub status: ItemStatus,
}

/// Fields supplied when reporting a lost item; the store fills the rest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewLostItem {
    pub owner_id: UserId,
    pub item_name: String,
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub unique_marks: String,
    pub color: Option<String>,
    pub material: Option<String>,
    pub location_text: Option<String>,
    pub coordinates: Option<Coordinates>,
    pub date_lost: DateTime<Utc>,
    pub masked_image: Option<AssetRef>,
    pub original_image: Option<AssetRef>,
    #[serde(default)]
    pub evidence_flagged: bool,
}

/// A found-property report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoundItem {
    pub id: ItemId,
    pub finder_id: UserId,
    pub item_name: String,
    pub category: String,
    #[serde(default)]
    pub description: String,
    pub condition: Option<String>,
    pub storage_place: Option<String>,
    /// How the finder prefers to hand the item over.
    pub finder_preference: Option<String>,
    pub location_text: Option<String>,
    pub coordinates: Option<Coordinates>,
    pub created_at: DateTime<Utc>,
    pub masked_image: Option<AssetRef>,
    pub original_image: Option<AssetRef>,
    pub evidence_flagged: bool,
    pub status: ItemStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewFoundItem {
    pub finder_id: UserId,
    pub item_name: String,
    pub category: String,
    #[serde(default)]
    pub description: String,
    pub condition: Option<String>,
    pub storage_place: Option<String>,
    pub finder_preference: Option<String>,
    pub location_text: Option<String>,
    pub coordinates: Option<Coordinates>,
    pub masked_image: Option<AssetRef>,
    pub original_image: Option<AssetRef>,
    #[serde(default)]
    pub evidence_flagged: bool,
}

/// A scored pairing of one lost and one found item.
///
/// At most one record exists per (lost, found) pair; its creation is the
/// event that locks both items out of the active pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub id: MatchId,
    pub lost_item_id: ItemId,
    pub found_item_id: ItemId,
    /// Confidence in [0, 100].
    pub confidence: u8,
    pub details: ScoreDetails,
    pub status: MatchStatus,
    pub created_at: DateTime<Utc>,
}

/// Structured answers a claimant supplies for ownership verification.
/// Serialized only at the storage/HTTP boundary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationAnswers {
    /// Secret marks only the true owner would know.
    #[serde(default)]
    pub secret_marks: String,
    /// Where the claimant believes the item was lost.
    pub where_lost: Option<String>,
    /// Any extra supporting detail.
    pub detail: Option<String>,
}

/// One user's assertion of ownership over a found item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    pub id: ClaimId,
    pub found_item_id: ItemId,
    pub lost_item_id: Option<ItemId>,
    pub claimant_id: UserId,
    pub status: ClaimStatus,
    pub answers: VerificationAnswers,
    pub proof_asset: Option<AssetRef>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Claim {
    /// Open claims block new claims against the same found item.
    pub fn is_open(&self) -> bool {
        !matches!(self.status, ClaimStatus::Rejected)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewClaim {
    pub found_item_id: ItemId,
    pub lost_item_id: Option<ItemId>,
    pub claimant_id: UserId,
    pub answers: VerificationAnswers,
    pub proof_asset: Option<AssetRef>,
}
