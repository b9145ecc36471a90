use serde::{Deserialize, Serialize};

mod lasso;
mod stroke;
mod transform;

pub use lasso::{LassoClick, LassoTool};
pub use stroke::{BrushSettings, StrokeGesture};
pub use transform::{TransformGesture, TransformMode};

/// The tool that receives primary-button pointer input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ToolKind {
    /// Pick, move, rotate, scale and stretch objects.
    #[default]
    Select,
    Brush,
    Eraser,
    Lasso,
    /// Click to place a text object.
    Text,
    /// Click to place the next numbered marker.
    Marker,
}

impl ToolKind {
    pub fn name(self) -> &'static str {
        match self {
            ToolKind::Select => "Select",
            ToolKind::Brush => "Brush",
            ToolKind::Eraser => "Eraser",
            ToolKind::Lasso => "Lasso",
            ToolKind::Text => "Text",
            ToolKind::Marker => "Marker",
        }
    }
}
