#![warn(clippy::all, rust_2018_idioms)]

pub mod asset;
pub mod codec;
pub mod collaborators;
pub mod config;
pub mod document;
pub mod editor;
pub mod error;
pub mod geometry;
pub mod gizmo;
pub mod history;
pub mod id_generator;
pub mod input;
pub mod object;
pub mod raster;
pub mod renderer;
pub mod text;
pub mod tools;
pub mod viewport;

pub use asset::{AssetId, AssetRegistry, ImageAsset, LoadOutcome};
pub use collaborators::{
    BackgroundRemover, CompletedMerge, CompletedRemoval, EditorHost, PendingMerge, PendingRemoval,
    RelativePosition, SceneCompositor,
};
pub use config::EditorConfig;
pub use document::Document;
pub use editor::Editor;
pub use error::{CollaboratorError, EditorError, EditorResult};
pub use geometry::Placement;
pub use history::{History, Snapshot};
pub use input::{InputEvent, InputHandler};
pub use object::{CanvasObject, ObjectId, ObjectKind, ObjectPatch};
pub use raster::RasterLayer;
pub use renderer::Renderer;
pub use text::FontBook;
pub use tools::ToolKind;
pub use viewport::Viewport;
