use egui::{Color32, Pos2, Vec2};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::asset::AssetId;
use crate::geometry::Placement;
use crate::text::FontBook;

mod patch;

pub use patch::ObjectPatch;

/// Unique identifier of a canvas object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(pub usize);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A selectable, transformable thing composited above the background.
///
/// All units are logical canvas pixels; `placement.center` is the object's center.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanvasObject {
    pub id: ObjectId,
    pub placement: Placement,
    pub kind: ObjectKind,
}

/// Per-kind payload. Every consumer matches exhaustively so a new kind cannot be forgotten.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ObjectKind {
    Image(PlacedImage),
    Text(PlacedText),
    Marker(PlacedMarker),
}

/// A pasted or imported image, drawn from its asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedImage {
    pub asset_id: AssetId,
}

/// Free-form text. `width`/`height` of the placement always match the measured text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedText {
    pub content: String,
    pub font_family: String,
    pub font_size: f32,
    pub color: Color32,
}

/// Numbered marker drawn as a filled circle with its label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedMarker {
    pub number: u32,
}

impl CanvasObject {
    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            ObjectKind::Image(_) => "image",
            ObjectKind::Text(_) => "text",
            ObjectKind::Marker(_) => "marker",
        }
    }

    pub fn center(&self) -> Pos2 {
        self.placement.center
    }

    pub fn asset_id(&self) -> Option<AssetId> {
        match &self.kind {
            ObjectKind::Image(image) => Some(image.asset_id),
            ObjectKind::Text(_) | ObjectKind::Marker(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&PlacedText> {
        match &self.kind {
            ObjectKind::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Edge handles only make sense for images; text and markers keep their proportions.
    pub fn supports_stretch(&self) -> bool {
        matches!(self.kind, ObjectKind::Image(_))
    }

    /// Re-derive the size of a text object from its content and font.
    pub fn remeasure(&mut self, fonts: &FontBook) {
        if let ObjectKind::Text(text) = &self.kind {
            let size = fonts.measure(&text.content, &text.font_family, text.font_size);
            self.placement.width = size.x;
            self.placement.height = size.y;
        }
    }
}

/// Factory functions for creating objects
pub mod factory {
    use super::*;
    use crate::id_generator::generate_id;

    /// Create an image object showing `asset_id` at `size`
    pub fn create_image(asset_id: AssetId, center: Pos2, size: Vec2) -> CanvasObject {
        CanvasObject {
            id: generate_id(),
            placement: Placement::new(center, size),
            kind: ObjectKind::Image(PlacedImage { asset_id }),
        }
    }

    /// Create a text object, measured immediately
    pub fn create_text(
        fonts: &FontBook,
        content: &str,
        font_family: &str,
        font_size: f32,
        color: Color32,
        center: Pos2,
    ) -> CanvasObject {
        let mut object = CanvasObject {
            id: generate_id(),
            placement: Placement::new(center, Vec2::ZERO),
            kind: ObjectKind::Text(PlacedText {
                content: content.to_owned(),
                font_family: font_family.to_owned(),
                font_size,
                color,
            }),
        };
        object.remeasure(fonts);
        object
    }

    /// Create a marker with the given label
    pub fn create_marker(number: u32, center: Pos2, radius: f32) -> CanvasObject {
        CanvasObject {
            id: generate_id(),
            placement: Placement::new(center, Vec2::splat(radius * 2.0)),
            kind: ObjectKind::Marker(PlacedMarker { number }),
        }
    }
}
