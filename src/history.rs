use log::debug;
use std::sync::Arc;

use crate::asset::AssetId;
use crate::object::CanvasObject;
use crate::raster::RasterLayer;

/// Immutable copy of the object list, the paint layer pixels and which assets were deleted.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    objects: Vec<CanvasObject>,
    raster: Arc<Vec<u8>>,
    retired_assets: Vec<AssetId>,
}

impl Snapshot {
    pub fn capture(
        objects: &[CanvasObject],
        raster: &RasterLayer,
        retired_assets: Vec<AssetId>,
    ) -> Self {
        Self {
            objects: objects.to_vec(),
            raster: Arc::new(raster.data().to_vec()),
            retired_assets,
        }
    }

    pub fn objects(&self) -> &[CanvasObject] {
        &self.objects
    }

    pub fn retired_assets(&self) -> &[AssetId] {
        &self.retired_assets
    }

    pub fn raster_bytes(&self) -> &[u8] {
        &self.raster
    }

    /// True when both snapshots hold the very same pixel buffer.
    pub fn shares_raster_with(&self, other: &Snapshot) -> bool {
        Arc::ptr_eq(&self.raster, &other.raster)
    }
}

/// Linear undo/redo over full snapshots.
///
/// Starts with one snapshot and `index` always points at a valid one. Pushing after an undo
/// discards the redo tail.
#[derive(Debug, Clone)]
pub struct History {
    snapshots: Vec<Snapshot>,
    index: usize,
    limit: Option<usize>,
}

impl History {
    pub fn new(initial: Snapshot, limit: Option<usize>) -> Self {
        Self {
            snapshots: vec![initial],
            index: 0,
            limit: limit.map(|l| l.max(1)),
        }
    }

    /// Record a completed gesture.
    pub fn push(&mut self, mut snapshot: Snapshot) {
        self.snapshots.truncate(self.index + 1);

        // Object-only gestures leave the pixels untouched; share the buffer instead of copying it.
        let current = self.current();
        if current.raster == snapshot.raster {
            snapshot.raster = Arc::clone(&current.raster);
        }

        self.snapshots.push(snapshot);
        self.index = self.snapshots.len() - 1;

        if let Some(limit) = self.limit {
            let overflow = self.snapshots.len().saturating_sub(limit);
            if overflow > 0 {
                self.snapshots.drain(..overflow);
                self.index -= overflow;
            }
        }
        debug!("History push: {}/{}", self.index + 1, self.snapshots.len());
    }

    /// Step back. `None` at the oldest snapshot.
    pub fn undo(&mut self) -> Option<&Snapshot> {
        if self.index == 0 {
            return None;
        }
        self.index -= 1;
        Some(&self.snapshots[self.index])
    }

    /// Step forward. `None` at the newest snapshot.
    pub fn redo(&mut self) -> Option<&Snapshot> {
        if self.index + 1 >= self.snapshots.len() {
            return None;
        }
        self.index += 1;
        Some(&self.snapshots[self.index])
    }

    /// Drop everything and start over from `snapshot`.
    pub fn reset(&mut self, snapshot: Snapshot) {
        self.snapshots = vec![snapshot];
        self.index = 0;
    }

    pub fn current(&self) -> &Snapshot {
        &self.snapshots[self.index]
    }

    pub fn can_undo(&self) -> bool {
        self.index > 0
    }

    pub fn can_redo(&self) -> bool {
        self.index + 1 < self.snapshots.len()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }
}
