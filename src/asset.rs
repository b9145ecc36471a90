use egui::{Vec2, vec2};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tiny_skia::Pixmap;
use uuid::Uuid;

use crate::codec;
use crate::error::{EditorError, EditorResult};

/// Identifier of an imported image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetId(pub Uuid);

impl AssetId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AssetId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An imported bitmap, plus its background-removed variant once that arrives.
#[derive(Clone)]
pub struct ImageAsset {
    id: AssetId,
    original_bytes: Arc<[u8]>,
    mime_type: String,
    original: Pixmap,
    processed: Option<Pixmap>,
    is_loading: bool,
    /// Deleted, but still reachable through undo.
    retired: bool,
}

impl fmt::Debug for ImageAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageAsset")
            .field("id", &self.id)
            .field("mime_type", &self.mime_type)
            .field("bytes", &self.original_bytes.len())
            .field("size", &self.natural_size())
            .field("processed", &self.processed.is_some())
            .field("is_loading", &self.is_loading)
            .field("retired", &self.retired)
            .finish()
    }
}

impl ImageAsset {
    pub fn decode(bytes: &[u8], mime_type: &str) -> EditorResult<Self> {
        let original = codec::decode_pixmap(bytes)?;
        Ok(Self {
            id: AssetId::new(),
            original_bytes: Arc::from(bytes),
            mime_type: mime_type.to_owned(),
            original,
            processed: None,
            is_loading: false,
            retired: false,
        })
    }

    pub fn id(&self) -> AssetId {
        self.id
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn original_bytes(&self) -> &[u8] {
        &self.original_bytes
    }

    pub fn original(&self) -> &Pixmap {
        &self.original
    }

    pub fn processed(&self) -> Option<&Pixmap> {
        self.processed.as_ref()
    }

    /// What objects referencing this asset draw: the processed image when available.
    pub fn display(&self) -> &Pixmap {
        self.processed.as_ref().unwrap_or(&self.original)
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn natural_size(&self) -> Vec2 {
        vec2(self.original.width() as f32, self.original.height() as f32)
    }
}

/// Result of delivering a background-removal response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Applied,
    Failed,
    /// The asset was deleted while the request was in flight.
    Stale,
}

/// Imported assets in import order.
///
/// Deleting an asset only retires it: history snapshots record the retired set, so undoing the
/// deletion brings the asset back together with the objects that show it. Lookups only see live
/// assets.
#[derive(Debug, Default, Clone)]
pub struct AssetRegistry {
    assets: Vec<ImageAsset>,
}

impl AssetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, asset: ImageAsset) -> AssetId {
        let id = asset.id;
        info!("🖼️ Imported asset {id}: {:?}", asset.natural_size());
        self.assets.push(asset);
        id
    }

    pub fn get(&self, id: AssetId) -> Option<&ImageAsset> {
        self.iter().find(|a| a.id == id)
    }

    fn get_mut(&mut self, id: AssetId) -> Option<&mut ImageAsset> {
        self.assets.iter_mut().find(|a| a.id == id && !a.retired)
    }

    pub fn contains(&self, id: AssetId) -> bool {
        self.get(id).is_some()
    }

    /// Delete a live asset. Returns `false` when `id` is unknown or already deleted.
    pub fn retire(&mut self, id: AssetId) -> bool {
        match self.get_mut(id) {
            Some(asset) => {
                asset.retired = true;
                true
            }
            None => false,
        }
    }

    /// Ids of deleted assets, in import order.
    pub fn retired_ids(&self) -> Vec<AssetId> {
        self.assets.iter().filter(|a| a.retired).map(|a| a.id).collect()
    }

    /// Make exactly `retired` deleted and every other asset live again.
    pub fn set_retired(&mut self, retired: &[AssetId]) {
        for asset in &mut self.assets {
            let retire = retired.contains(&asset.id);
            if asset.retired != retire {
                debug!("Asset {} is {}", asset.id, if retire { "deleted" } else { "live again" });
            }
            asset.retired = retire;
        }
    }

    /// Forget deleted assets for good, once no history can bring them back.
    pub fn purge_retired(&mut self) -> usize {
        let before = self.assets.len();
        self.assets.retain(|a| !a.retired);
        before - self.assets.len()
    }

    /// Live assets in import order.
    pub fn iter(&self) -> impl Iterator<Item = &ImageAsset> {
        self.assets.iter().filter(|a| !a.retired)
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    /// Mark `id` as loading and hand back what the collaborator needs.
    ///
    /// Returns `Ok(None)` when a request for this asset is already in flight.
    pub fn begin_loading(&mut self, id: AssetId) -> EditorResult<Option<(Arc<[u8]>, String)>> {
        let asset = self.get_mut(id).ok_or(EditorError::UnknownAsset(id))?;
        if asset.is_loading {
            debug!("Background removal already pending for asset {id}");
            return Ok(None);
        }
        asset.is_loading = true;
        Ok(Some((Arc::clone(&asset.original_bytes), asset.mime_type.clone())))
    }

    /// Deliver a finished request. On failure the asset keeps its previous image.
    pub fn finish_loading(&mut self, id: AssetId, result: EditorResult<Pixmap>) -> LoadOutcome {
        let Some(asset) = self.assets.iter_mut().find(|a| a.id == id) else {
            warn!("Discarding background removal result for unknown asset {id}");
            return LoadOutcome::Stale;
        };
        asset.is_loading = false;
        if asset.retired {
            warn!("Discarding background removal result for deleted asset {id}");
            return LoadOutcome::Stale;
        }
        match result {
            Ok(pixmap) => {
                asset.processed = Some(pixmap);
                info!("✅ Background removed for asset {id}");
                LoadOutcome::Applied
            }
            Err(err) => {
                warn!("Background removal failed for asset {id}: {err}");
                LoadOutcome::Failed
            }
        }
    }
}
