use ledger::LedgerConfig;
use privacy::{EvidenceKey, MaskConfig};
use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Top-level configuration for a [`crate::Reclaim`] instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoreConfig {
    #[serde(default)]
    pub ledger: LedgerConfig,

    #[serde(default)]
    pub mask: MaskConfig,

    /// 64-char hex evidence key. When absent an ephemeral key is generated,
    /// which is fine for tests but makes stored originals unreadable after a
    /// restart.
    #[serde(default)]
    pub evidence_key_hex: Option<String>,
}

impl CoreConfig {
    pub(crate) fn evidence_key(&self) -> Result<EvidenceKey, CoreError> {
        match self.evidence_key_hex.as_deref() {
            Some(hex_key) => Ok(EvidenceKey::from_hex(hex_key)?),
            None => Ok(EvidenceKey::generate()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_threshold_is_fifty() {
        let cfg = CoreConfig::default();
        assert_eq!(cfg.ledger.threshold, 50);
        assert!(cfg.evidence_key_hex.is_none());
    }

    #[test]
    fn configured_key_must_be_valid_hex() {
        let cfg = CoreConfig {
            evidence_key_hex: Some("zz".repeat(32)),
            ..Default::default()
        };
        assert!(cfg.evidence_key().is_err());

        let cfg = CoreConfig {
            evidence_key_hex: Some("ab".repeat(32)),
            ..Default::default()
        };
        assert!(cfg.evidence_key().is_ok());
    }
}
