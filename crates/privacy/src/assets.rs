use std::collections::HashMap;
use std::sync::RwLock;

use store::models::AssetRef;

use crate::PrivacyError;

/// Upload storage boundary: raw bytes in, opaque reference out.
///
/// The core never depends on the storage medium; a filesystem or object-store
/// implementation plugs in behind the same trait.
pub trait AssetStore: Send + Sync {
    fn put(&self, label: &str, bytes: &[u8]) -> Result<AssetRef, PrivacyError>;
    fn get(&self, asset: &AssetRef) -> Result<Vec<u8>, PrivacyError>;
}

/// In-memory asset store for tests and single-process deployments.
pub struct MemoryAssetStore {
    blobs: RwLock<HashMap<AssetRef, Vec<u8>>>,
}

impl MemoryAssetStore {
    pub fn new() -> Self {
        Self {
            blobs: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryAssetStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AssetStore for MemoryAssetStore {
    fn put(&self, label: &str, bytes: &[u8]) -> Result<AssetRef, PrivacyError> {
        let mut blobs = self
            .blobs
            .write()
            .map_err(|_| PrivacyError::AssetUnreadable("poisoned lock".into()))?;
        let reference = format!("{label}-{}", blobs.len() + 1);
        blobs.insert(reference.clone(), bytes.to_vec());
        Ok(reference)
    }

    fn get(&self, asset: &AssetRef) -> Result<Vec<u8>, PrivacyError> {
        let blobs = self
            .blobs
            .read()
            .map_err(|_| PrivacyError::AssetUnreadable("poisoned lock".into()))?;
        blobs
            .get(asset)
            .cloned()
            .ok_or_else(|| PrivacyError::AssetUnreadable(asset.clone()))
    }
}
