use egui::{Key, Modifiers, PointerButton, Pos2, Vec2};

/// Pointer and keyboard input in screen coordinates, relative to the top-left of the viewport.
///
/// Move and up events are delivered regardless of where the pointer is, so a drag that leaves
/// the viewport still completes.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    PointerDown { pos: Pos2, button: PointerButton },
    PointerMove { pos: Pos2 },
    PointerUp { pos: Pos2, button: PointerButton },
    /// Sent in addition to the clicks that make it up.
    DoubleClick { pos: Pos2 },
    /// Wheel or trackpad scroll; negative `delta.y` scrolls up.
    Scroll { pos: Pos2, delta: Vec2 },
    Key { key: Key, modifiers: Modifiers },
}

impl InputEvent {
    pub fn pointer_pos(&self) -> Option<Pos2> {
        match self {
            InputEvent::PointerDown { pos, .. }
            | InputEvent::PointerMove { pos }
            | InputEvent::PointerUp { pos, .. }
            | InputEvent::DoubleClick { pos }
            | InputEvent::Scroll { pos, .. } => Some(*pos),
            InputEvent::Key { .. } => None,
        }
    }
}

/// Converts raw egui events into [`InputEvent`]s for hosts that already run egui.
///
/// egui reports wheel events without a position, so the last pointer position is tracked here.
#[derive(Debug, Clone, Default)]
pub struct InputHandler {
    last_pointer_pos: Option<Pos2>,
    /// Top-left of the viewport in egui screen space.
    origin: Pos2,
}

impl InputHandler {
    pub fn new(origin: Pos2) -> Self {
        Self {
            last_pointer_pos: None,
            origin,
        }
    }

    pub fn set_origin(&mut self, origin: Pos2) {
        self.origin = origin;
    }

    pub fn translate(&mut self, event: &egui::Event) -> Option<InputEvent> {
        match event {
            egui::Event::PointerMoved(pos) => {
                let pos = self.local(*pos);
                self.last_pointer_pos = Some(pos);
                Some(InputEvent::PointerMove { pos })
            }
            egui::Event::PointerButton {
                pos, button, pressed, ..
            } => {
                let pos = self.local(*pos);
                self.last_pointer_pos = Some(pos);
                Some(if *pressed {
                    InputEvent::PointerDown { pos, button: *button }
                } else {
                    InputEvent::PointerUp { pos, button: *button }
                })
            }
            egui::Event::MouseWheel { delta, .. } => Some(InputEvent::Scroll {
                pos: self.last_pointer_pos?,
                // egui reports scrolling up as positive.
                delta: -*delta,
            }),
            egui::Event::Key {
                key,
                pressed: true,
                modifiers,
                ..
            } => Some(InputEvent::Key {
                key: *key,
                modifiers: *modifiers,
            }),
            _ => None,
        }
    }

    fn local(&self, pos: Pos2) -> Pos2 {
        pos - self.origin.to_vec2()
    }
}
