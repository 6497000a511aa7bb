use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::customization::CustomizationState;
use crate::product::CatalogError;

/// Saved selections for one product, keyed by slug.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomizationSnapshot {
    pub slug: String,
    pub state: CustomizationState,
    pub saved_at_ms: u64,
}

pub trait CustomizationSnapshotStore {
    fn load(&self, slug: &str) -> Result<Option<CustomizationSnapshot>, CatalogError>;
    fn save(&mut self, snapshot: CustomizationSnapshot) -> Result<(), CatalogError>;
    fn delete(&mut self, slug: &str) -> Result<bool, CatalogError>;
}

#[derive(Debug, Default)]
pub struct InMemoryCustomizationStore {
    snapshots: BTreeMap<String, CustomizationSnapshot>,
}

impl InMemoryCustomizationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CustomizationSnapshotStore for InMemoryCustomizationStore {
    fn load(&self, slug: &str) -> Result<Option<CustomizationSnapshot>, CatalogError> {
        Ok(self.snapshots.get(slug).cloned())
    }

    fn save(&mut self, snapshot: CustomizationSnapshot) -> Result<(), CatalogError> {
        self.snapshots.insert(snapshot.slug.clone(), snapshot);
        Ok(())
    }

    fn delete(&mut self, slug: &str) -> Result<bool, CatalogError> {
        Ok(self.snapshots.remove(slug).is_some())
    }
}

#[cfg(target_arch = "wasm32")]
mod wasm_storage {
    use super::{CustomizationSnapshot, CustomizationSnapshotStore};
    use crate::product::CatalogError;

    /// One localStorage key per product: `<prefix>.<slug>`.
    #[derive(Debug)]
    pub struct LocalStorageCustomizationStore {
        key_prefix: String,
    }

    impl LocalStorageCustomizationStore {
        pub fn new(key: impl Into<String>) -> Result<Self, CatalogError> {
            // Fail early when storage is disabled (private mode, sandboxed iframe).
            window_local_storage()?;
            Ok(Self {
                key_prefix: key.into(),
            })
        }

        fn key(&self, slug: &str) -> String {
            format!("{}.{}", self.key_prefix, slug)
        }
    }

    impl CustomizationSnapshotStore for LocalStorageCustomizationStore {
        fn load(&self, slug: &str) -> Result<Option<CustomizationSnapshot>, CatalogError> {
            let storage = window_local_storage()?;
            let raw = storage
                .get_item(&self.key(slug))
                .map_err(|e| CatalogError::Io(format!("get_item failed: {:?}", e)))?;
            let Some(raw) = raw else {
                return Ok(None);
            };
            if raw.trim().is_empty() {
                return Ok(None);
            }
            match serde_json::from_str::<CustomizationSnapshot>(&raw) {
                Ok(s) => Ok(Some(s)),
                Err(e) => {
                    // Don't keep failing on the same broken payload.
                    let _ = storage.remove_item(&self.key(slug));
                    Err(CatalogError::Corrupt(e.to_string()))
                }
            }
        }

        fn save(&mut self, snapshot: CustomizationSnapshot) -> Result<(), CatalogError> {
            let storage = window_local_storage()?;
            let raw =
                serde_json::to_string(&snapshot).map_err(|e| CatalogError::Io(e.to_string()))?;
            storage
                .set_item(&self.key(&snapshot.slug), &raw)
                .map_err(|e| CatalogError::Io(format!("set_item failed: {:?}", e)))?;
            Ok(())
        }

        fn delete(&mut self, slug: &str) -> Result<bool, CatalogError> {
            let existed = self.load(slug).ok().flatten().is_some();
            let storage = window_local_storage()?;
            storage
                .remove_item(&self.key(slug))
                .map_err(|e| CatalogError::Io(format!("remove_item failed: {:?}", e)))?;
            Ok(existed)
        }
    }

    fn window_local_storage() -> Result<web_sys::Storage, CatalogError> {
        let win = web_sys::window().ok_or(CatalogError::StorageUnavailable)?;
        win.local_storage()
            .map_err(|e| CatalogError::Io(format!("localStorage error: {:?}", e)))?
            .ok_or(CatalogError::StorageUnavailable)
    }
}

#[cfg(target_arch = "wasm32")]
pub use wasm_storage::LocalStorageCustomizationStore;

#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug)]
pub struct LocalStorageCustomizationStore;

#[cfg(not(target_arch = "wasm32"))]
impl LocalStorageCustomizationStore {
    pub fn new(_key: impl Into<String>) -> Result<Self, CatalogError> {
        Err(CatalogError::StorageUnavailable)
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl CustomizationSnapshotStore for LocalStorageCustomizationStore {
    fn load(&self, _slug: &str) -> Result<Option<CustomizationSnapshot>, CatalogError> {
        Err(CatalogError::StorageUnavailable)
    }

    fn save(&mut self, _snapshot: CustomizationSnapshot) -> Result<(), CatalogError> {
        Err(CatalogError::StorageUnavailable)
    }

    fn delete(&mut self, _slug: &str) -> Result<bool, CatalogError> {
        Err(CatalogError::StorageUnavailable)
    }
}
