//! Boundaries to the services the editor does not implement itself: the AI image services and
//! the host application.
//!
//! Requests are returned to the host as pending futures. The host drives them on whatever
//! executor it runs and hands the completed result back to the editor, so the editor never
//! blocks and never holds a borrow across an await.

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::asset::AssetId;
use crate::error::CollaboratorError;
use crate::object::ObjectId;

pub type CollaboratorFuture = BoxFuture<'static, Result<Vec<u8>, CollaboratorError>>;

/// Returns a copy of an image with its background made transparent.
pub trait BackgroundRemover {
    fn remove_background(&self, image: Vec<u8>, mime_type: &str) -> CollaboratorFuture;
}

/// Position of an object's center relative to the canvas, both components in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RelativePosition {
    pub x: f32,
    pub y: f32,
}

/// Blends an object image into a background photo, returning the new background.
pub trait SceneCompositor {
    fn composite_object_into_scene(
        &self,
        object_image: Vec<u8>,
        background_image: Vec<u8>,
        position: RelativePosition,
        locale: &str,
    ) -> CollaboratorFuture;
}

/// Callbacks into the application embedding the editor.
pub trait EditorHost {
    /// A flattened PNG of the scene, as a data URL.
    fn on_save(&self, image_data_url: String);
    fn on_close(&self);
    /// The paint layer as a PNG data URL, or `None` when nothing is painted.
    fn on_mask_change(&self, mask_data_url: Option<String>);
}

/// A background-removal request in flight.
pub struct PendingRemoval {
    asset_id: AssetId,
    future: CollaboratorFuture,
}

impl PendingRemoval {
    pub(crate) fn new(asset_id: AssetId, future: CollaboratorFuture) -> Self {
        Self { asset_id, future }
    }

    pub fn asset_id(&self) -> AssetId {
        self.asset_id
    }

    /// Wait for the collaborator. Pass the result to `Editor::complete_background_removal`.
    pub async fn resolve(self) -> CompletedRemoval {
        CompletedRemoval {
            asset_id: self.asset_id,
            result: self.future.await,
        }
    }
}

impl std::fmt::Debug for PendingRemoval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingRemoval").field("asset_id", &self.asset_id).finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletedRemoval {
    pub asset_id: AssetId,
    pub result: Result<Vec<u8>, CollaboratorError>,
}

/// A merge of one placed image into the background, in flight.
pub struct PendingMerge {
    object_id: ObjectId,
    future: CollaboratorFuture,
}

impl PendingMerge {
    pub(crate) fn new(object_id: ObjectId, future: CollaboratorFuture) -> Self {
        Self { object_id, future }
    }

    pub fn object_id(&self) -> ObjectId {
        self.object_id
    }

    /// Wait for the collaborator. Pass the result to `Editor::complete_object_merge`.
    pub async fn resolve(self) -> CompletedMerge {
        CompletedMerge {
            object_id: self.object_id,
            result: self.future.await,
        }
    }
}

impl std::fmt::Debug for PendingMerge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingMerge").field("object_id", &self.object_id).finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletedMerge {
    pub object_id: ObjectId,
    pub result: Result<Vec<u8>, CollaboratorError>,
}
