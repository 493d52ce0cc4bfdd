use crate::config::ServerConfig;
use crate::error::ServerResult;
use claims::ClaimEngine;
use dashmap::DashMap;
use ledger::{LedgerConfig, MatchLedger};
use notify::{MemoryDispatch, NotificationDispatch};
use privacy::{AssetStore, EvidenceKey, ImagePrivacyGate, MaskConfig, MemoryAssetStore};
use scoring::ScoreWeights;
use std::sync::Arc;
use store::{ItemStore, MemoryStore};

/// Shared application state
#[derive(Clone)]
pub struct ServerState {
    /// Server configuration
    pub config: Arc<ServerConfig>,

    /// Rate limit tracking: API key -> (count, window_start)
    pub rate_limiter: Arc<DashMap<String, (u32, std::time::Instant)>>,

    /// Repository (shared across requests and engines)
    pub store: Arc<dyn ItemStore>,

    /// Evidence byte storage
    pub assets: Arc<dyn AssetStore>,

    /// Notification dispatcher; in-memory so the listing endpoint can read
    /// back what was delivered
    pub dispatch: Arc<MemoryDispatch>,

    /// Matching ledger
    pub ledger: Arc<MatchLedger>,

    /// Claim engine
    pub claims: Arc<ClaimEngine>,

    /// Image privacy gate
    pub gate: Arc<ImagePrivacyGate>,
}

impl ServerState {
    /// Create new server state with the in-memory backends.
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        let store: Arc<dyn ItemStore> = Arc::new(MemoryStore::new());
        let assets: Arc<dyn AssetStore> = Arc::new(MemoryAssetStore::new());
        let dispatch = Arc::new(MemoryDispatch::with_admins(config.admin_ids.clone()));

        let key = match config.evidence_key_hex.as_deref() {
            Some(hex_key) => EvidenceKey::from_hex(hex_key)?,
            None => {
                tracing::warn!(
                    "No evidence key configured; generating an ephemeral one. \
                     Stored originals will be unreadable after restart."
                );
                EvidenceKey::generate()
            }
        };

        let ledger_cfg = LedgerConfig {
            threshold: config.match_threshold,
            weights: ScoreWeights::default(),
            link_base: config.link_base.clone(),
        };
        let ledger = Arc::new(MatchLedger::new(
            store.clone(),
            dispatch.clone() as Arc<dyn NotificationDispatch>,
            ledger_cfg,
        ));
        let claims = Arc::new(ClaimEngine::new(
            store.clone(),
            dispatch.clone() as Arc<dyn NotificationDispatch>,
        ));
        let gate = Arc::new(ImagePrivacyGate::new(
            store.clone(),
            assets.clone(),
            key,
            MaskConfig {
                blur_sigma: config.blur_sigma,
            },
        ));

        Ok(Self {
            config: Arc::new(config),
            rate_limiter: Arc::new(DashMap::new()),
            store,
            assets,
            dispatch,
            ledger,
            claims,
            gate,
        })
    }

    /// Check if API key is valid
    pub fn is_valid_api_key(&self, key: &str) -> bool {
        self.config.api_keys.contains(key)
    }

    /// Check rate limit for API key
    pub fn check_rate_limit(&self, key: &str) -> bool {
        let now = std::time::Instant::now();
        let window = std::time::Duration::from_secs(60);
        let limit = self.config.rate_limit_per_minute;

        let mut entry = self.rate_limiter.entry(key.to_string()).or_insert((0, now));
        let (count, window_start) = entry.value_mut();

        // Reset if window has passed
        if now.duration_since(*window_start) > window {
            *count = 0;
            *window_start = now;
        }

        if *count >= limit {
            return false;
        }

        *count += 1;
        true
    }
}
