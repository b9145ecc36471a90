//! One editing session over a single background image.
//!
//! Pointer input drives a small gesture state machine. Every gesture that changes the scene
//! ends in exactly one history commit:
//!
//! ```text
//!                 PointerDown                 PointerUp
//!   ┌──────┐  ──────────────────►  ┌──────────┐ ─────────►  ┌──────┐
//!   │ Idle │                       │ Stroke   │   commit    │ Idle │
//!   │      │                       │ Transform│             │      │
//!   └──────┘  ◄──── undo/redo ──── │ Pan      │             └──────┘
//!                  (drops it)      └──────────┘
//! ```
//!
//! Lasso, text and marker placement are click based and commit directly.

use egui::{Color32, Key, Modifiers, PointerButton, Pos2, Vec2, vec2};
use log::{debug, info, warn};
use tiny_skia::Pixmap;

use crate::asset::{AssetId, AssetRegistry, ImageAsset, LoadOutcome};
use crate::codec;
use crate::collaborators::{
    BackgroundRemover, CompletedMerge, CompletedRemoval, EditorHost, PendingMerge, PendingRemoval,
    RelativePosition, SceneCompositor,
};
use crate::config::EditorConfig;
use crate::document::Document;
use crate::error::{EditorError, EditorResult};
use crate::geometry::hit_test;
use crate::gizmo::Gizmo;
use crate::history::History;
use crate::input::InputEvent;
use crate::object::{CanvasObject, ObjectId, ObjectKind, ObjectPatch, factory};
use crate::raster::StrokeMode;
use crate::renderer::Renderer;
use crate::text::FontBook;
use crate::tools::{
    BrushSettings, LassoClick, LassoTool, StrokeGesture, ToolKind, TransformGesture, TransformMode,
};
use crate::viewport::Viewport;

/// The pointer-down to pointer-up interaction in progress.
#[derive(Debug, Clone)]
enum ActiveGesture {
    Stroke(StrokeGesture),
    Transform(TransformGesture),
    Pan { last: Pos2 },
}

pub struct Editor {
    config: EditorConfig,
    document: Document,
    assets: AssetRegistry,
    history: History,
    viewport: Viewport,
    background: Pixmap,
    renderer: Renderer,
    tool: ToolKind,
    brush: BrushSettings,
    lasso: LassoTool,
    gesture: Option<ActiveGesture>,
    pending_merge: Option<ObjectId>,
    notice: Option<String>,
}

impl std::fmt::Debug for Editor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Editor")
            .field("background", &(self.background.width(), self.background.height()))
            .field("document", &self.document)
            .field("assets", &self.assets.len())
            .field("history", &(self.history.index(), self.history.len()))
            .field("tool", &self.tool)
            .field("gesture", &self.gesture)
            .finish_non_exhaustive()
    }
}

/// Largest size with the aspect of `natural` that fits in `bounds`, never larger than `natural`.
fn fit_within(natural: Vec2, bounds: Vec2) -> Vec2 {
    let scale = (bounds.x / natural.x).min(bounds.y / natural.y).min(1.0);
    natural * scale
}

impl Editor {
    /// Open a session for the encoded image `background`.
    ///
    /// The logical canvas is the background fit into the configured maximum size. A previously
    /// saved mask (PNG data URL) seeds the paint layer, stretched to the canvas.
    pub fn open(
        background: &[u8],
        initial_mask: Option<&str>,
        config: EditorConfig,
    ) -> EditorResult<Self> {
        let config = config.validated();
        let background = codec::decode_pixmap(background)?;
        let natural = vec2(background.width() as f32, background.height() as f32);
        let logical = fit_within(
            natural,
            vec2(config.max_logical_width as f32, config.max_logical_height as f32),
        );
        let width = (logical.x.round() as u32).max(1);
        let height = (logical.y.round() as u32).max(1);

        let fonts = FontBook::new(&config.default_font_family);
        let mut document = Document::new(width, height, fonts)?;
        if let Some(mask) = initial_mask {
            match codec::from_data_url(mask).and_then(|(bytes, _)| codec::decode_pixmap(&bytes)) {
                Ok(mask) => document.raster_mut().draw_scaled(&mask),
                Err(err) => warn!("Ignoring unreadable initial mask: {err}"),
            }
        }

        let canvas_size = document.size();
        let assets = AssetRegistry::new();
        let history = History::new(document.snapshot(&assets), config.history_limit);
        info!(
            "🎨 Editor opened: background {}x{}, canvas {width}x{height}",
            background.width(),
            background.height()
        );

        Ok(Self {
            viewport: Viewport::new(canvas_size, canvas_size, config.min_zoom, config.max_zoom),
            renderer: Renderer::new(config.marker_color),
            brush: BrushSettings {
                color: config.brush_color,
                width: config.brush_width,
                opacity: config.brush_opacity,
            },
            config,
            document,
            assets,
            history,
            background,
            tool: ToolKind::default(),
            lasso: LassoTool::new(),
            gesture: None,
            pending_merge: None,
            notice: None,
        })
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn assets(&self) -> &AssetRegistry {
        &self.assets
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn viewport_mut(&mut self) -> &mut Viewport {
        &mut self.viewport
    }

    pub fn set_viewport_size(&mut self, size: Vec2) {
        self.viewport.set_viewport_size(size);
    }

    pub fn background(&self) -> &Pixmap {
        &self.background
    }

    pub fn lasso(&self) -> &LassoTool {
        &self.lasso
    }

    pub fn is_gesture_active(&self) -> bool {
        self.gesture.is_some()
    }

    /// Transient message about a failed collaborator request.
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    pub fn register_font(&mut self, family: &str, bytes: Vec<u8>) -> EditorResult<()> {
        self.document.register_font(family, bytes)
    }

    // ---------------------------------------------------------------------------------------
    // Tools

    pub fn tool(&self) -> ToolKind {
        self.tool
    }

    /// Switch tools. Leaving the lasso fills the polygon drawn so far.
    pub fn set_tool(&mut self, tool: ToolKind) {
        if tool == self.tool {
            return;
        }
        self.finish_gesture();
        if self.tool == ToolKind::Lasso {
            self.finalize_lasso();
        }
        debug!("Tool: {} -> {}", self.tool.name(), tool.name());
        self.tool = tool;
    }

    pub fn brush(&self) -> BrushSettings {
        self.brush
    }

    pub fn set_brush(&mut self, brush: BrushSettings) {
        self.brush = BrushSettings {
            width: brush.width.max(1.0),
            opacity: brush.opacity.clamp(0.0, 1.0),
            ..brush
        };
    }

    pub fn set_eraser_width(&mut self, width: f32) {
        self.config.eraser_width = width.max(1.0);
    }

    fn gizmo(&self) -> Gizmo {
        Gizmo::new(
            self.config.handle_radius,
            self.config.rotate_handle_offset,
            self.viewport.zoom(),
        )
    }

    // ---------------------------------------------------------------------------------------
    // Input

    pub fn handle_event(&mut self, event: InputEvent) {
        match event {
            InputEvent::PointerDown { pos, button } => self.pointer_down(pos, button),
            InputEvent::PointerMove { pos } => self.pointer_move(pos),
            InputEvent::PointerUp { button, .. } => self.pointer_up(button),
            InputEvent::DoubleClick { .. } => {
                if self.tool == ToolKind::Lasso {
                    self.finalize_lasso();
                }
            }
            InputEvent::Scroll { pos, delta } => {
                self.viewport.scroll(pos, delta.y, self.config.scroll_zoom_step);
            }
            InputEvent::Key { key, modifiers } => self.key_pressed(key, modifiers),
        }
    }

    fn pointer_down(&mut self, pos: Pos2, button: PointerButton) {
        if self.gesture.is_some() {
            return;
        }
        match button {
            PointerButton::Middle => {
                self.gesture = Some(ActiveGesture::Pan { last: pos });
                return;
            }
            PointerButton::Primary => {}
            _ => return,
        }

        let logical = self.viewport.screen_to_logical(pos);
        match self.tool {
            ToolKind::Select => self.begin_select(logical),
            ToolKind::Brush | ToolKind::Eraser => {
                let (mode, settings) = if self.tool == ToolKind::Brush {
                    (StrokeMode::Paint, self.brush)
                } else {
                    (
                        StrokeMode::Erase,
                        BrushSettings {
                            width: self.config.eraser_width,
                            ..self.brush
                        },
                    )
                };
                let stroke =
                    StrokeGesture::begin(mode, settings, logical, self.document.raster_mut());
                self.gesture = Some(ActiveGesture::Stroke(stroke));
            }
            ToolKind::Lasso => {
                let radius = self.viewport.screen_to_logical_len(self.config.lasso_close_radius);
                if self.lasso.click(logical, radius) == LassoClick::Closed {
                    self.finalize_lasso();
                }
            }
            ToolKind::Text => {
                let content = self.config.default_text.clone();
                self.add_text(&content, logical);
                self.tool = ToolKind::Select;
            }
            ToolKind::Marker => {
                self.add_marker(logical);
            }
        }
    }

    /// Grab a handle of the selected object, else pick and move the topmost object under the
    /// pointer, else clear the selection.
    fn begin_select(&mut self, logical: Pos2) {
        let gizmo = self.gizmo();
        if let Some(selected) = self.document.selected_object() {
            if let Some(handle) = gizmo.handle_at(selected, logical) {
                self.gesture = Some(ActiveGesture::Transform(TransformGesture::begin(
                    selected,
                    TransformMode::from(handle),
                    logical,
                )));
                return;
            }
        }

        match hit_test(self.document.objects(), logical) {
            Some(id) => {
                self.document.select(Some(id));
                if let Some(object) = self.document.object(id) {
                    self.gesture = Some(ActiveGesture::Transform(TransformGesture::begin(
                        object,
                        TransformMode::Move,
                        logical,
                    )));
                }
            }
            None => {
                self.document.select(None);
            }
        }
    }

    fn pointer_move(&mut self, pos: Pos2) {
        let logical = self.viewport.screen_to_logical(pos);
        if self.tool == ToolKind::Lasso {
            self.lasso.hover(logical);
        }

        let vanished = match &mut self.gesture {
            None => false,
            Some(ActiveGesture::Pan { last }) => {
                let delta = pos - *last;
                *last = pos;
                self.viewport.pan_by(delta);
                false
            }
            Some(ActiveGesture::Stroke(stroke)) => {
                stroke.extend(self.document.raster_mut(), logical);
                false
            }
            Some(ActiveGesture::Transform(transform)) => {
                let patch =
                    transform.update(logical, self.document.fonts(), self.config.min_object_size);
                self.document.update(transform.object_id(), patch).is_err()
            }
        };
        if vanished {
            debug!("Transformed object vanished, dropping gesture");
            self.gesture = None;
        }
    }

    fn pointer_up(&mut self, button: PointerButton) {
        let ends = match &self.gesture {
            Some(ActiveGesture::Pan { .. }) => button == PointerButton::Middle,
            Some(_) => button == PointerButton::Primary,
            None => false,
        };
        if ends {
            self.finish_gesture();
        }
    }

    /// End the gesture in progress, committing what it changed.
    fn finish_gesture(&mut self) {
        match self.gesture.take() {
            None | Some(ActiveGesture::Pan { .. }) => {}
            Some(ActiveGesture::Stroke(stroke)) => {
                let label = match stroke.mode() {
                    StrokeMode::Paint => "Brush stroke",
                    StrokeMode::Erase => "Eraser stroke",
                };
                self.commit(label);
            }
            Some(ActiveGesture::Transform(transform)) => {
                self.commit(match transform.mode() {
                    TransformMode::Move => "Move",
                    TransformMode::Rotate => "Rotate",
                    TransformMode::Scale(_) => "Scale",
                    TransformMode::Stretch(_) => "Stretch",
                });
            }
        }
    }

    /// Throw away the gesture in progress and put the scene back to the last commit.
    fn cancel_gesture(&mut self) {
        if self.gesture.take().is_some() {
            debug!("Cancelling active gesture");
            self.document.restore(self.history.current(), &mut self.assets);
        }
    }

    fn key_pressed(&mut self, key: Key, modifiers: Modifiers) {
        match key {
            Key::Z if modifiers.command && modifiers.shift => {
                self.redo();
            }
            Key::Z if modifiers.command => {
                self.undo();
            }
            Key::Y if modifiers.command => {
                self.redo();
            }
            Key::D if modifiers.command => {
                self.duplicate_selected();
            }
            Key::Num0 if modifiers.command => self.viewport.reset(),
            Key::Delete | Key::Backspace if self.gesture.is_none() => {
                self.delete_selected();
            }
            Key::Escape => {
                if self.lasso.is_active() {
                    self.lasso.cancel();
                } else {
                    self.document.select(None);
                }
            }
            _ => {}
        }
    }

    // ---------------------------------------------------------------------------------------
    // History

    /// Record the current scene if it differs from the last commit.
    fn commit(&mut self, label: &str) -> bool {
        let snapshot = self.document.snapshot(&self.assets);
        if &snapshot == self.history.current() {
            debug!("{label}: nothing changed, no history entry");
            return false;
        }
        self.history.push(snapshot);
        info!("📝 {label} ({}/{})", self.history.index() + 1, self.history.len());
        true
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn undo(&mut self) -> bool {
        self.cancel_gesture();
        match self.history.undo() {
            Some(snapshot) => {
                self.document.restore(snapshot, &mut self.assets);
                debug!("Undo to {}/{}", self.history.index() + 1, self.history.len());
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        self.cancel_gesture();
        match self.history.redo() {
            Some(snapshot) => {
                self.document.restore(snapshot, &mut self.assets);
                debug!("Redo to {}/{}", self.history.index() + 1, self.history.len());
                true
            }
            None => false,
        }
    }

    // ---------------------------------------------------------------------------------------
    // Paint

    /// Fill the lasso polygon into the paint layer. Fewer than three points are dropped.
    pub fn finalize_lasso(&mut self) -> bool {
        let Some(points) = self.lasso.take_polygon() else {
            return false;
        };
        let filled = self.document.raster_mut().fill_polygon(
            &points,
            self.config.lasso_fill_color,
            self.config.lasso_fill_opacity,
        );
        filled && self.commit("Lasso fill")
    }

    /// Clear the paint layer.
    pub fn clear_paint(&mut self) -> bool {
        self.cancel_gesture();
        self.document.raster_mut().clear();
        self.commit("Clear paint")
    }

    // ---------------------------------------------------------------------------------------
    // Objects

    pub fn select(&mut self, id: Option<ObjectId>) -> bool {
        self.document.select(id)
    }

    pub fn selected_object(&self) -> Option<&CanvasObject> {
        self.document.selected_object()
    }

    pub fn delete_selected(&mut self) -> bool {
        match self.document.selected_id() {
            Some(id) => self.remove_object(id),
            None => false,
        }
    }

    pub fn remove_object(&mut self, id: ObjectId) -> bool {
        self.cancel_gesture();
        if self.document.remove(id).is_none() {
            return false;
        }
        self.commit("Delete object")
    }

    /// Copy the selected object, offset so it is visibly distinct, and select the copy.
    pub fn duplicate_selected(&mut self) -> Option<ObjectId> {
        let id = self.document.selected_id()?;
        self.cancel_gesture();
        let copy = self
            .document
            .duplicate(id, self.config.duplicate_offset, self.config.max_marker_number)?;
        self.document.select(Some(copy));
        self.commit("Duplicate object");
        Some(copy)
    }

    pub fn update_object(&mut self, id: ObjectId, patch: ObjectPatch) -> EditorResult<()> {
        self.cancel_gesture();
        self.document.update(id, patch)?;
        self.commit("Update object");
        Ok(())
    }

    /// Place a text object with the default style, centered at `center`, and select it.
    pub fn add_text(&mut self, content: &str, center: Pos2) -> ObjectId {
        let object = factory::create_text(
            self.document.fonts(),
            content,
            &self.config.default_font_family,
            self.config.default_font_size,
            self.config.default_text_color,
            center,
        );
        let id = self.document.add(object);
        self.document.select(Some(id));
        self.commit("Add text");
        id
    }

    pub fn set_text_content(&mut self, id: ObjectId, content: &str) -> EditorResult<()> {
        self.update_object(id, ObjectPatch::content(content))
    }

    pub fn set_text_style(
        &mut self,
        id: ObjectId,
        font_family: Option<String>,
        font_size: Option<f32>,
        color: Option<Color32>,
    ) -> EditorResult<()> {
        self.update_object(
            id,
            ObjectPatch {
                font_family,
                font_size,
                color,
                ..Default::default()
            },
        )
    }

    /// Place the next numbered marker. `None` once every number has been issued.
    pub fn add_marker(&mut self, center: Pos2) -> Option<ObjectId> {
        let id = self
            .document
            .add_marker(center, self.config.marker_radius, self.config.max_marker_number)?;
        self.document.select(Some(id));
        self.commit("Add marker");
        Some(id)
    }

    // ---------------------------------------------------------------------------------------
    // Assets

    pub fn import_image(&mut self, bytes: &[u8], mime_type: &str) -> EditorResult<AssetId> {
        let asset = ImageAsset::decode(bytes, mime_type)?;
        Ok(self.assets.insert(asset))
    }

    /// Place `asset_id` in the middle of the canvas, fit within half of it, and select it.
    pub fn place_asset(&mut self, asset_id: AssetId) -> EditorResult<ObjectId> {
        let asset = self.assets.get(asset_id).ok_or(EditorError::UnknownAsset(asset_id))?;
        let canvas = self.document.size();
        let size = fit_within(asset.natural_size(), canvas * 0.5);
        let id = self
            .document
            .add(factory::create_image(asset_id, (canvas * 0.5).to_pos2(), size));
        self.document.select(Some(id));
        self.commit("Place image");
        Ok(id)
    }

    /// Import and place in one step, as for a clipboard paste.
    pub fn paste_image(&mut self, bytes: &[u8], mime_type: &str) -> EditorResult<ObjectId> {
        let asset_id = self.import_image(bytes, mime_type)?;
        self.place_asset(asset_id)
    }

    /// Remove an asset and every object that shows it, as one undoable step. Returns how many
    /// objects went with it.
    pub fn delete_asset(&mut self, asset_id: AssetId) -> EditorResult<usize> {
        if !self.assets.contains(asset_id) {
            return Err(EditorError::UnknownAsset(asset_id));
        }
        self.cancel_gesture();
        self.assets.retire(asset_id);
        let removed = self.document.remove_referencing(asset_id);
        self.commit("Delete asset");
        info!("🗑️ Deleted asset {asset_id} and {removed} object(s)");
        Ok(removed)
    }

    // ---------------------------------------------------------------------------------------
    // Collaborators

    /// Ask `remover` for a background-free version of `asset_id`.
    ///
    /// Returns `Ok(None)` while a request for the same asset is still pending.
    pub fn request_background_removal(
        &mut self,
        asset_id: AssetId,
        remover: &dyn BackgroundRemover,
    ) -> EditorResult<Option<PendingRemoval>> {
        let Some((bytes, mime_type)) = self.assets.begin_loading(asset_id)? else {
            return Ok(None);
        };
        info!("✂️ Requesting background removal for asset {asset_id}");
        let future = remover.remove_background(bytes.to_vec(), &mime_type);
        Ok(Some(PendingRemoval::new(asset_id, future)))
    }

    pub fn complete_background_removal(&mut self, completed: CompletedRemoval) -> LoadOutcome {
        let CompletedRemoval { asset_id, result } = completed;
        let decoded = result
            .map_err(EditorError::from)
            .and_then(|bytes| codec::decode_pixmap(&bytes));
        let outcome = self.assets.finish_loading(asset_id, decoded);
        if outcome == LoadOutcome::Failed {
            self.notice = Some("Background removal failed".to_owned());
        }
        outcome
    }

    pub fn is_merge_pending(&self) -> bool {
        self.pending_merge.is_some()
    }

    /// Ask `compositor` to blend a placed image permanently into the background.
    pub fn request_object_merge(
        &mut self,
        object_id: ObjectId,
        compositor: &dyn SceneCompositor,
        locale: &str,
    ) -> EditorResult<PendingMerge> {
        if self.pending_merge.is_some() {
            return Err(EditorError::Busy);
        }
        let object = self.document.object(object_id).ok_or(EditorError::UnknownObject(object_id))?;
        let ObjectKind::Image(image) = &object.kind else {
            return Err(EditorError::NotMergeable(object_id));
        };
        let asset = self
            .assets
            .get(image.asset_id)
            .ok_or(EditorError::UnknownAsset(image.asset_id))?;

        let canvas = self.document.size();
        let position = RelativePosition {
            x: (object.center().x / canvas.x).clamp(0.0, 1.0),
            y: (object.center().y / canvas.y).clamp(0.0, 1.0),
        };
        let object_png = codec::encode_png(asset.display())?;
        let background_png = codec::encode_png(&self.background)?;

        info!("🧩 Requesting merge of object {object_id} at {position:?}");
        let future =
            compositor.composite_object_into_scene(object_png, background_png, position, locale);
        self.pending_merge = Some(object_id);
        Ok(PendingMerge::new(object_id, future))
    }

    /// Apply a finished merge. On success the objects are cleared, the background replaced and
    /// history restarted from the merged scene. Returns whether the scene changed.
    pub fn complete_object_merge(&mut self, completed: CompletedMerge) -> bool {
        self.pending_merge = None;
        let CompletedMerge { object_id, result } = completed;
        if self.document.object(object_id).is_none() {
            warn!("Discarding merge result for deleted object {object_id}");
            return false;
        }
        let merged = result
            .map_err(EditorError::from)
            .and_then(|bytes| codec::decode_pixmap(&bytes));
        match merged {
            Ok(background) => {
                self.cancel_gesture();
                self.background = background;
                self.document.clear_objects();
                let purged = self.assets.purge_retired();
                if purged > 0 {
                    debug!("Dropped {purged} deleted asset(s) along with the history");
                }
                self.history.reset(self.document.snapshot(&self.assets));
                info!("✅ Merged object {object_id} into the background");
                true
            }
            Err(err) => {
                warn!("Merge of object {object_id} failed: {err}");
                self.notice = Some("Merging the object into the image failed".to_owned());
                false
            }
        }
    }

    // ---------------------------------------------------------------------------------------
    // Output

    /// The live view at logical resolution.
    pub fn render_frame(&self) -> EditorResult<Pixmap> {
        self.renderer.render_frame(
            &self.background,
            &self.document,
            &self.assets,
            &self.lasso,
            &self.gizmo(),
        )
    }

    /// Redraw only the object layer into `target`, which must be the logical canvas size.
    pub fn render_objects(&self, target: &mut Pixmap) {
        self.renderer
            .render_objects(target, self.document.objects(), &self.assets, self.document.fonts());
    }

    /// The flattened scene at the background's native resolution.
    pub fn export(&self) -> EditorResult<Pixmap> {
        self.renderer.export(&self.background, &self.document, &self.assets)
    }

    pub fn export_data_url(&self) -> EditorResult<String> {
        let png = codec::encode_png(&self.export()?)?;
        Ok(codec::to_data_url(&png, "image/png"))
    }

    /// The paint layer as a PNG data URL, or `None` when nothing is painted.
    pub fn mask_data_url(&self) -> EditorResult<Option<String>> {
        let raster = self.document.raster();
        if raster.is_blank() {
            return Ok(None);
        }
        let png = codec::encode_png(raster.pixmap())?;
        Ok(Some(codec::to_data_url(&png, "image/png")))
    }

    pub fn save(&self, host: &dyn EditorHost) -> EditorResult<()> {
        let url = self.export_data_url()?;
        info!("💾 Saving flattened image ({} bytes)", url.len());
        host.on_save(url);
        Ok(())
    }

    /// End the session: report the paint layer, then close.
    ///
    /// `on_close` is called even when the mask cannot be encoded.
    pub fn close(self, host: &dyn EditorHost) -> EditorResult<()> {
        let mask = self.mask_data_url();
        if let Ok(mask) = &mask {
            host.on_mask_change(mask.clone());
        }
        host.on_close();
        info!("👋 Editor closed");
        mask.map(|_| ())
    }
}
