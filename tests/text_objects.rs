use egui::{Color32, pos2};
use layer_canvas::codec;
use layer_canvas::{CanvasObject, Editor, EditorConfig, ObjectId};
use tiny_skia::{Color, Pixmap};

fn mono_font() -> Vec<u8> {
    include_bytes!("fixtures/DejaVuSansMono.ttf").to_vec()
}

fn open_editor() -> Editor {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut background = Pixmap::new(400, 300).unwrap();
    background.fill(Color::BLACK);
    let png = codec::encode_png(&background).unwrap();
    Editor::open(&png, None, EditorConfig::default()).unwrap()
}

fn size_of(editor: &Editor, id: ObjectId) -> egui::Vec2 {
    editor.document().object(id).unwrap().placement.size()
}

/// Pixels in the box whose green channel is above `min_green`.
fn light_pixels(frame: &Pixmap, from: (u32, u32), to: (u32, u32), min_green: u8) -> usize {
    let mut count = 0;
    for y in from.1..to.1 {
        for x in from.0..to.0 {
            if frame.pixel(x, y).is_some_and(|p| p.green() > min_green) {
                count += 1;
            }
        }
    }
    count
}

#[test]
fn test_registering_a_font_remeasures_existing_text() {
    let mut editor = open_editor();
    let id = editor.add_text("Hello", pos2(200.0, 150.0));
    let approximate = size_of(&editor, id);
    assert!((approximate.x - 5.0 * 32.0 * 0.6).abs() < 1e-3);

    editor.register_font("sans-serif", mono_font()).unwrap();
    let measured = editor.document().fonts().measure("Hello", "sans-serif", 32.0);
    assert_eq!(size_of(&editor, id), measured);
    assert!((measured.x - approximate.x).abs() > 1.0);
}

#[test]
fn test_font_size_change_remeasures_and_commits() {
    let mut editor = open_editor();
    editor.register_font("sans-serif", mono_font()).unwrap();
    let id = editor.add_text("Label", pos2(200.0, 150.0));
    let before = size_of(&editor, id);
    let history_len = editor.history().len();

    editor.set_text_style(id, None, Some(64.0), None).unwrap();

    let after = size_of(&editor, id);
    assert!((after.x - before.x * 2.0).abs() < 1e-2);
    assert!((after.y - before.y * 2.0).abs() < 1e-2);
    assert_eq!(editor.document().object(id).unwrap().center(), pos2(200.0, 150.0));
    assert_eq!(editor.history().len(), history_len + 1);

    editor.undo();
    assert_eq!(size_of(&editor, id), before);
}

#[test]
fn test_font_family_change_remeasures_in_the_new_family() {
    let mut editor = open_editor();
    let id = editor.add_text("Wide text", pos2(200.0, 150.0));
    editor.register_font("mono", mono_font()).unwrap();
    let history_len = editor.history().len();

    editor.set_text_style(id, Some("mono".to_owned()), None, None).unwrap();

    let object = editor.document().object(id).unwrap();
    let text = object.as_text().unwrap();
    assert_eq!(text.font_family, "mono");
    let measured = editor.document().fonts().measure("Wide text", "mono", 32.0);
    assert_eq!(object.placement.size(), measured);
    assert_eq!(editor.history().len(), history_len + 1);

    // Color alone keeps the size
    let size = object.placement.size();
    editor.set_text_style(id, None, None, Some(Color32::YELLOW)).unwrap();
    assert_eq!(size_of(&editor, id), size);
}

#[test]
fn test_text_is_drawn_only_with_a_font() {
    let mut editor = open_editor();
    let id = editor.add_text("Hi", pos2(200.0, 150.0));
    editor.select(None);

    let frame = editor.render_frame().unwrap();
    assert_eq!(light_pixels(&frame, (160, 120), (240, 180), 200), 0);

    editor.register_font("sans-serif", mono_font()).unwrap();
    let size = size_of(&editor, id);
    let frame = editor.render_frame().unwrap();
    let from = ((200.0 - size.x / 2.0) as u32, (150.0 - size.y / 2.0) as u32);
    let to = ((200.0 + size.x / 2.0) as u32 + 1, (150.0 + size.y / 2.0) as u32 + 1);
    assert!(light_pixels(&frame, from, to, 200) > 20);
}

#[test]
fn test_marker_label_is_drawn_with_a_font() {
    let mut editor = open_editor();
    editor.add_marker(pos2(100.0, 100.0)).unwrap();
    // The selection handles are white too
    editor.select(None);

    let frame = editor.render_frame().unwrap();
    assert_eq!(light_pixels(&frame, (85, 85), (115, 115), 120), 0);

    editor.register_font("sans-serif", mono_font()).unwrap();
    let frame = editor.render_frame().unwrap();
    assert!(light_pixels(&frame, (85, 85), (115, 115), 120) > 0);
}

#[test]
fn test_scene_json_round_trip() {
    let mut editor = open_editor();
    editor.register_font("sans-serif", mono_font()).unwrap();
    editor.add_text("Caption", pos2(120.0, 40.0));
    editor.add_marker(pos2(30.0, 30.0));
    let mut image = Pixmap::new(40, 20).unwrap();
    image.fill(Color::WHITE);
    editor.paste_image(&codec::encode_png(&image).unwrap(), "image/png").unwrap();

    let json = editor.document().objects_json().unwrap();
    let parsed: Vec<CanvasObject> = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed.as_slice(), editor.document().objects());
}
