//! Scene state: the ordered object list, the selection and the raster paint layer.
//!
//! Mutations here never touch history; the caller commits a snapshot once a gesture is complete.

use egui::{Pos2, Vec2, vec2};
use log::debug;

use crate::asset::{AssetId, AssetRegistry};
use crate::error::{EditorError, EditorResult};
use crate::history::Snapshot;
use crate::id_generator::generate_id;
use crate::object::{CanvasObject, ObjectId, ObjectKind, ObjectPatch, factory};
use crate::raster::RasterLayer;
use crate::text::FontBook;

#[derive(Debug, Clone)]
pub struct Document {
    /// Paint order: the last object is drawn on top.
    objects: Vec<CanvasObject>,
    selected: Option<ObjectId>,
    raster: RasterLayer,
    fonts: FontBook,
    /// Next marker label. Only ever grows, so deleted numbers are never handed out again.
    next_marker_number: u32,
}

impl Document {
    pub fn new(width: u32, height: u32, fonts: FontBook) -> EditorResult<Self> {
        Ok(Self {
            objects: Vec::new(),
            selected: None,
            raster: RasterLayer::new(width, height)?,
            fonts,
            next_marker_number: 1,
        })
    }

    /// Size of the logical canvas.
    pub fn size(&self) -> Vec2 {
        vec2(self.raster.width() as f32, self.raster.height() as f32)
    }

    pub fn objects(&self) -> &[CanvasObject] {
        &self.objects
    }

    pub fn object(&self, id: ObjectId) -> Option<&CanvasObject> {
        self.objects.iter().find(|o| o.id == id)
    }

    fn index_of(&self, id: ObjectId) -> Option<usize> {
        self.objects.iter().position(|o| o.id == id)
    }

    pub fn selected_id(&self) -> Option<ObjectId> {
        self.selected
    }

    pub fn selected_object(&self) -> Option<&CanvasObject> {
        self.selected.and_then(|id| self.object(id))
    }

    pub fn raster(&self) -> &RasterLayer {
        &self.raster
    }

    pub fn raster_mut(&mut self) -> &mut RasterLayer {
        &mut self.raster
    }

    pub fn fonts(&self) -> &FontBook {
        &self.fonts
    }

    /// Register a font and re-measure every text object so hit-testing follows the new metrics.
    pub fn register_font(&mut self, family: &str, bytes: Vec<u8>) -> EditorResult<()> {
        self.fonts.register(family, bytes)?;
        for object in &mut self.objects {
            object.remeasure(&self.fonts);
        }
        Ok(())
    }

    /// Append on top of the paint order. Text is measured before it is stored.
    pub fn add(&mut self, mut object: CanvasObject) -> ObjectId {
        object.remeasure(&self.fonts);
        let id = object.id;
        debug!("Adding {} object {id}", object.kind_name());
        self.objects.push(object);
        id
    }

    pub fn remove(&mut self, id: ObjectId) -> Option<CanvasObject> {
        let index = self.index_of(id)?;
        if self.selected == Some(id) {
            self.selected = None;
        }
        Some(self.objects.remove(index))
    }

    pub fn update(&mut self, id: ObjectId, patch: ObjectPatch) -> EditorResult<()> {
        let index = self.index_of(id).ok_or(EditorError::UnknownObject(id))?;
        patch.apply(&mut self.objects[index], &self.fonts);
        Ok(())
    }

    /// Clone `id` on top of the paint order, shifted by `offset` on both axes.
    ///
    /// A duplicated marker takes the next free number; `None` once the marker limit is used up.
    pub fn duplicate(
        &mut self,
        id: ObjectId,
        offset: f32,
        max_marker_number: u32,
    ) -> Option<ObjectId> {
        let mut copy = self.object(id)?.clone();
        if let ObjectKind::Marker(marker) = &mut copy.kind {
            marker.number = self.take_marker_number(max_marker_number)?;
        }
        copy.id = generate_id();
        copy.placement.center += Vec2::splat(offset);
        Some(self.add(copy))
    }

    /// Select `id`, or clear with `None`. Unknown ids leave the selection unchanged.
    pub fn select(&mut self, id: Option<ObjectId>) -> bool {
        match id {
            Some(id) if self.object(id).is_none() => false,
            _ => {
                self.selected = id;
                true
            }
        }
    }

    /// Place the next numbered marker, or `None` when every number up to the limit was issued.
    pub fn add_marker(
        &mut self,
        center: Pos2,
        radius: f32,
        max_marker_number: u32,
    ) -> Option<ObjectId> {
        let number = self.take_marker_number(max_marker_number)?;
        Some(self.add(factory::create_marker(number, center, radius)))
    }

    fn take_marker_number(&mut self, max_marker_number: u32) -> Option<u32> {
        if self.next_marker_number > max_marker_number {
            debug!("Marker limit of {max_marker_number} reached");
            return None;
        }
        let number = self.next_marker_number;
        self.next_marker_number += 1;
        Some(number)
    }

    /// Number the next marker will get.
    pub fn next_marker_number(&self) -> u32 {
        self.next_marker_number
    }

    /// Drop every object that draws `asset_id`. Returns how many were removed.
    pub fn remove_referencing(&mut self, asset_id: AssetId) -> usize {
        let before = self.objects.len();
        self.objects.retain(|o| o.asset_id() != Some(asset_id));
        self.fix_selection();
        before - self.objects.len()
    }

    pub fn clear_objects(&mut self) {
        self.objects.clear();
        self.selected = None;
    }

    /// Capture the scene, with the assets deleted from `assets` so far.
    pub fn snapshot(&self, assets: &AssetRegistry) -> Snapshot {
        Snapshot::capture(&self.objects, &self.raster, assets.retired_ids())
    }

    /// Replace the object list and every raster pixel with `snapshot`, and bring the deleted
    /// state of `assets` back to what it was, so restored images always have their asset.
    pub fn restore(&mut self, snapshot: &Snapshot, assets: &mut AssetRegistry) {
        self.objects = snapshot.objects().to_vec();
        for object in &mut self.objects {
            object.remeasure(&self.fonts);
        }
        self.raster.restore(snapshot.raster_bytes());
        assets.set_retired(snapshot.retired_assets());
        self.fix_selection();
    }

    fn fix_selection(&mut self) {
        if let Some(id) = self.selected {
            if self.object(id).is_none() {
                self.selected = None;
            }
        }
    }

    /// The object list as JSON, for hosts that persist scenes.
    pub fn objects_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.objects)
    }
}
