//! Pan/zoom state and the mapping between screen pixels and the logical canvas.
//!
//! `screen = logical * zoom + pan + centering_offset`, where the centering offset keeps a canvas
//! smaller than the viewport in the middle of it.

use egui::{Pos2, Vec2};
use log::debug;

#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    zoom: f32,
    pan: Vec2,
    viewport_size: Vec2,
    canvas_size: Vec2,
    min_zoom: f32,
    max_zoom: f32,
}

impl Viewport {
    pub fn new(canvas_size: Vec2, viewport_size: Vec2, min_zoom: f32, max_zoom: f32) -> Self {
        Self {
            zoom: 1.0_f32.clamp(min_zoom, max_zoom),
            pan: Vec2::ZERO,
            viewport_size,
            canvas_size,
            min_zoom,
            max_zoom,
        }
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn pan(&self) -> Vec2 {
        self.pan
    }

    pub fn viewport_size(&self) -> Vec2 {
        self.viewport_size
    }

    pub fn set_viewport_size(&mut self, size: Vec2) {
        self.viewport_size = size;
    }

    pub fn set_pan(&mut self, pan: Vec2) {
        self.pan = pan;
    }

    pub fn pan_by(&mut self, delta: Vec2) {
        self.pan += delta;
    }

    /// Offset that centers the scaled canvas when it is smaller than the viewport.
    pub fn centering_offset(&self) -> Vec2 {
        ((self.viewport_size - self.canvas_size * self.zoom) * 0.5).max(Vec2::ZERO)
    }

    fn origin(&self) -> Vec2 {
        self.pan + self.centering_offset()
    }

    pub fn logical_to_screen(&self, logical: Pos2) -> Pos2 {
        (logical.to_vec2() * self.zoom + self.origin()).to_pos2()
    }

    pub fn screen_to_logical(&self, screen: Pos2) -> Pos2 {
        ((screen.to_vec2() - self.origin()) / self.zoom).to_pos2()
    }

    /// Convert a length in screen pixels (handle radii, click tolerances) to logical units.
    pub fn screen_to_logical_len(&self, len: f32) -> f32 {
        len / self.zoom
    }

    /// Set the zoom, keeping the screen point `cursor` over the same logical point.
    pub fn zoom_at(&mut self, cursor: Pos2, zoom: f32) {
        let new_zoom = zoom.clamp(self.min_zoom, self.max_zoom);
        if new_zoom == self.zoom {
            return;
        }
        let ratio = new_zoom / self.zoom;
        let cursor = cursor.to_vec2();
        let new_origin = cursor - (cursor - self.origin()) * ratio;
        self.zoom = new_zoom;
        self.pan = new_origin - self.centering_offset();
        debug!("Zoom {:.2} pan {:?}", self.zoom, self.pan);
    }

    /// Scroll-wheel zoom: scrolling up (negative `delta_y`) zooms in by `step`.
    pub fn scroll(&mut self, cursor: Pos2, delta_y: f32, step: f32) {
        if delta_y == 0.0 {
            return;
        }
        let factor = if delta_y < 0.0 { step } else { 1.0 / step };
        self.zoom_at(cursor, self.zoom * factor);
    }

    /// Back to 100% with no pan.
    pub fn reset(&mut self) {
        self.zoom = 1.0_f32.clamp(self.min_zoom, self.max_zoom);
        self.pan = Vec2::ZERO;
    }
}
