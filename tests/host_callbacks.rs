use egui::{PointerButton, pos2};
use layer_canvas::codec;
use layer_canvas::{Editor, EditorConfig, EditorHost, InputEvent, ToolKind};
use std::cell::RefCell;
use tiny_skia::{Color, Pixmap};

#[derive(Default)]
struct RecordingHost {
    events: RefCell<Vec<String>>,
    saved: RefCell<Option<String>>,
    mask: RefCell<Option<Option<String>>>,
}

impl EditorHost for RecordingHost {
    fn on_save(&self, image_data_url: String) {
        self.events.borrow_mut().push("save".to_owned());
        *self.saved.borrow_mut() = Some(image_data_url);
    }

    fn on_close(&self) {
        self.events.borrow_mut().push("close".to_owned());
    }

    fn on_mask_change(&self, mask_data_url: Option<String>) {
        self.events.borrow_mut().push("mask".to_owned());
        *self.mask.borrow_mut() = Some(mask_data_url);
    }
}

fn background_png() -> Vec<u8> {
    let mut background = Pixmap::new(120, 80).unwrap();
    background.fill(Color::from_rgba8(0, 128, 0, 255));
    codec::encode_png(&background).unwrap()
}

fn paint_something(editor: &mut Editor) {
    editor.set_tool(ToolKind::Brush);
    editor.handle_event(InputEvent::PointerDown {
        pos: pos2(20.0, 20.0),
        button: PointerButton::Primary,
    });
    editor.handle_event(InputEvent::PointerMove { pos: pos2(100.0, 60.0) });
    editor.handle_event(InputEvent::PointerUp {
        pos: pos2(100.0, 60.0),
        button: PointerButton::Primary,
    });
}

#[test]
fn test_save_sends_flattened_png() {
    let _ = env_logger::builder().is_test(true).try_init();
    let editor = Editor::open(&background_png(), None, EditorConfig::default()).unwrap();
    let host = RecordingHost::default();
    editor.save(&host).unwrap();

    let url = host.saved.borrow().clone().unwrap();
    let (bytes, mime) = codec::from_data_url(&url).unwrap();
    assert_eq!(mime, "image/png");
    let image = codec::decode_pixmap(&bytes).unwrap();
    assert_eq!((image.width(), image.height()), (120, 80));
}

#[test]
fn test_close_reports_blank_mask_as_none() {
    let _ = env_logger::builder().is_test(true).try_init();
    let editor = Editor::open(&background_png(), None, EditorConfig::default()).unwrap();
    let host = RecordingHost::default();
    editor.close(&host).unwrap();

    assert_eq!(host.events.borrow().as_slice(), &["mask".to_owned(), "close".to_owned()]);
    assert_eq!(*host.mask.borrow(), Some(None));
}

#[test]
fn test_saved_mask_seeds_next_session() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut editor = Editor::open(&background_png(), None, EditorConfig::default()).unwrap();
    paint_something(&mut editor);
    let painted = editor.document().raster().data().to_vec();

    let host = RecordingHost::default();
    editor.close(&host).unwrap();
    let mask = host.mask.borrow().clone().flatten().unwrap();

    // Reopen with the mask: the paint layer comes back, as the initial state
    let reopened = Editor::open(&background_png(), Some(&mask), EditorConfig::default()).unwrap();
    let restored = reopened.document().raster().data();
    assert_eq!(restored.len(), painted.len());
    // PNG stores unpremultiplied pixels, so allow for rounding
    assert!(restored.iter().zip(&painted).all(|(a, b)| a.abs_diff(*b) <= 2));
    assert!(!reopened.document().raster().is_blank());
    assert_eq!(reopened.history().len(), 1);
}

#[test]
fn test_unreadable_mask_starts_blank() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mask = Some("data:image/png;base64,AAAA");
    let editor = Editor::open(&background_png(), mask, EditorConfig::default()).unwrap();
    assert!(editor.document().raster().is_blank());
}

#[test]
fn test_garbage_background_is_an_error() {
    let _ = env_logger::builder().is_test(true).try_init();
    assert!(Editor::open(b"definitely not a png", None, EditorConfig::default()).is_err());
}
