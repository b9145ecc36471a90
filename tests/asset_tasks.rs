use egui::pos2;
use futures::FutureExt;
use futures::executor::block_on;
use layer_canvas::codec;
use layer_canvas::collaborators::CollaboratorFuture;
use layer_canvas::{
    BackgroundRemover, CollaboratorError, Editor, EditorConfig, EditorError, LoadOutcome,
    RelativePosition, SceneCompositor,
};
use std::cell::{Cell, RefCell};
use tiny_skia::{Color, Pixmap};

fn png(width: u32, height: u32, color: Color) -> Vec<u8> {
    let mut pixmap = Pixmap::new(width, height).unwrap();
    pixmap.fill(color);
    codec::encode_png(&pixmap).unwrap()
}

fn open_editor() -> Editor {
    let _ = env_logger::builder().is_test(true).try_init();
    Editor::open(&png(400, 300, Color::BLACK), None, EditorConfig::default()).unwrap()
}

/// Counts calls and answers with a fixed result.
struct FakeRemover {
    calls: Cell<usize>,
    result: Result<Vec<u8>, CollaboratorError>,
}

impl FakeRemover {
    fn succeeding() -> Self {
        Self {
            calls: Cell::new(0),
            result: Ok(png(20, 10, Color::TRANSPARENT)),
        }
    }

    fn failing() -> Self {
        Self {
            calls: Cell::new(0),
            result: Err(CollaboratorError::Request("service unavailable".to_owned())),
        }
    }
}

impl BackgroundRemover for FakeRemover {
    fn remove_background(&self, _image: Vec<u8>, mime_type: &str) -> CollaboratorFuture {
        assert_eq!(mime_type, "image/png");
        self.calls.set(self.calls.get() + 1);
        futures::future::ready(self.result.clone()).boxed()
    }
}

struct FakeCompositor {
    calls: RefCell<Vec<RelativePosition>>,
    result: Result<Vec<u8>, CollaboratorError>,
}

impl FakeCompositor {
    fn new(result: Result<Vec<u8>, CollaboratorError>) -> Self {
        Self {
            calls: RefCell::new(Vec::new()),
            result,
        }
    }
}

impl SceneCompositor for FakeCompositor {
    fn composite_object_into_scene(
        &self,
        _object_image: Vec<u8>,
        _background_image: Vec<u8>,
        position: RelativePosition,
        locale: &str,
    ) -> CollaboratorFuture {
        assert_eq!(locale, "en");
        self.calls.borrow_mut().push(position);
        futures::future::ready(self.result.clone()).boxed()
    }
}

#[test]
fn test_second_request_for_same_asset_is_ignored() {
    let mut editor = open_editor();
    let asset = editor.import_image(&png(20, 10, Color::WHITE), "image/png").unwrap();
    let remover = FakeRemover::succeeding();

    let first = editor.request_background_removal(asset, &remover).unwrap();
    let second = editor.request_background_removal(asset, &remover).unwrap();
    assert!(first.is_some());
    assert!(second.is_none());
    assert_eq!(remover.calls.get(), 1);
    assert!(editor.assets().get(asset).unwrap().is_loading());

    // Exactly one terminal state
    let completed = block_on(first.unwrap().resolve());
    assert_eq!(editor.complete_background_removal(completed), LoadOutcome::Applied);
    let stored = editor.assets().get(asset).unwrap();
    assert!(!stored.is_loading());
    assert!(stored.processed().is_some());
    assert!(editor.notice().is_none());
}

#[test]
fn test_different_assets_may_run_concurrently() {
    let mut editor = open_editor();
    let a = editor.import_image(&png(20, 10, Color::WHITE), "image/png").unwrap();
    let b = editor.import_image(&png(10, 20, Color::WHITE), "image/png").unwrap();
    let remover = FakeRemover::succeeding();

    let pending_a = editor.request_background_removal(a, &remover).unwrap().unwrap();
    let pending_b = editor.request_background_removal(b, &remover).unwrap().unwrap();
    assert_eq!(remover.calls.get(), 2);

    // Completion order does not matter
    let done_b = block_on(pending_b.resolve());
    let done_a = block_on(pending_a.resolve());
    assert_eq!(editor.complete_background_removal(done_b), LoadOutcome::Applied);
    assert_eq!(editor.complete_background_removal(done_a), LoadOutcome::Applied);
}

#[test]
fn test_failed_removal_leaves_asset_unchanged() {
    let mut editor = open_editor();
    let asset = editor.import_image(&png(20, 10, Color::WHITE), "image/png").unwrap();
    let remover = FakeRemover::failing();

    let pending = editor.request_background_removal(asset, &remover).unwrap().unwrap();
    let completed = block_on(pending.resolve());
    assert_eq!(editor.complete_background_removal(completed), LoadOutcome::Failed);

    let stored = editor.assets().get(asset).unwrap();
    assert!(!stored.is_loading());
    assert!(stored.processed().is_none());
    assert!(editor.notice().is_some());
    editor.dismiss_notice();
    assert!(editor.notice().is_none());

    // A retry is allowed once the flag is cleared
    assert!(editor.request_background_removal(asset, &remover).unwrap().is_some());
}

#[test]
fn test_undecodable_response_counts_as_failure() {
    let mut editor = open_editor();
    let asset = editor.import_image(&png(20, 10, Color::WHITE), "image/png").unwrap();
    let remover = FakeRemover {
        calls: Cell::new(0),
        result: Ok(b"not an image".to_vec()),
    };
    let pending = editor.request_background_removal(asset, &remover).unwrap().unwrap();
    let completed = block_on(pending.resolve());
    assert_eq!(editor.complete_background_removal(completed), LoadOutcome::Failed);
    assert!(editor.assets().get(asset).unwrap().processed().is_none());
}

#[test]
fn test_result_for_deleted_asset_is_discarded() {
    let mut editor = open_editor();
    let asset = editor.import_image(&png(20, 10, Color::WHITE), "image/png").unwrap();
    editor.place_asset(asset).unwrap();
    let remover = FakeRemover::succeeding();
    let pending = editor.request_background_removal(asset, &remover).unwrap().unwrap();

    // The user deletes the asset while the request is in flight
    assert_eq!(editor.delete_asset(asset).unwrap(), 1);
    assert!(editor.document().objects().is_empty());
    let history_len = editor.history().len();

    let completed = block_on(pending.resolve());
    assert_eq!(editor.complete_background_removal(completed), LoadOutcome::Stale);
    assert!(editor.assets().is_empty());
    assert_eq!(editor.history().len(), history_len);
}

#[test]
fn test_delete_asset_removes_every_reference() {
    let mut editor = open_editor();
    let asset = editor.import_image(&png(20, 10, Color::WHITE), "image/png").unwrap();
    let other = editor.paste_image(&png(10, 10, Color::WHITE), "image/png").unwrap();
    editor.place_asset(asset).unwrap();
    editor.place_asset(asset).unwrap();
    editor.add_marker(pos2(10.0, 10.0));

    assert_eq!(editor.delete_asset(asset).unwrap(), 2);
    assert_eq!(editor.document().objects().len(), 2);
    assert!(editor.document().object(other).is_some());
    assert!(matches!(editor.delete_asset(asset), Err(EditorError::UnknownAsset(_))));
}

fn red_at(editor: &Editor, x: u32, y: u32) -> u8 {
    let frame = editor.render_frame().unwrap();
    frame.pixel(x, y).map(|p| p.red()).unwrap_or(0)
}

#[test]
fn test_undo_asset_deletion_brings_the_image_back() {
    let mut editor = open_editor();
    let object = editor.paste_image(&png(20, 10, Color::WHITE), "image/png").unwrap();
    let asset = editor.document().object(object).and_then(|o| o.asset_id()).unwrap();
    assert_eq!(red_at(&editor, 200, 150), 255);

    assert_eq!(editor.delete_asset(asset).unwrap(), 1);
    assert!(!editor.assets().contains(asset));
    assert_eq!(red_at(&editor, 200, 150), 0);

    // Step 1: undo restores the object together with a live asset
    assert!(editor.undo());
    assert!(editor.assets().contains(asset));
    assert!(editor.document().object(object).is_some());
    assert_eq!(red_at(&editor, 200, 150), 255);

    // Step 2: the restored image is a valid merge source again
    let compositor = FakeCompositor::new(Err(CollaboratorError::Request("offline".to_owned())));
    let pending = editor.request_object_merge(object, &compositor, "en").unwrap();
    assert!(!editor.complete_object_merge(block_on(pending.resolve())));

    // Step 3: redo deletes both again
    assert!(editor.redo());
    assert!(!editor.assets().contains(asset));
    assert!(editor.document().objects().is_empty());
}

#[test]
fn test_deleting_an_unplaced_asset_is_undoable() {
    let mut editor = open_editor();
    let asset = editor.import_image(&png(20, 10, Color::WHITE), "image/png").unwrap();
    assert_eq!(editor.delete_asset(asset).unwrap(), 0);
    assert_eq!(editor.history().len(), 2);
    assert!(editor.assets().is_empty());

    editor.undo();
    assert!(editor.assets().contains(asset));

    // An asset imported after the deletion is not touched by undoing it
    editor.redo();
    let later = editor.import_image(&png(8, 8, Color::WHITE), "image/png").unwrap();
    editor.undo();
    assert!(editor.assets().contains(later));
    assert!(editor.assets().contains(asset));
}

#[test]
fn test_merge_replaces_background_and_resets_history() {
    let mut editor = open_editor();
    let object = editor.paste_image(&png(40, 40, Color::WHITE), "image/png").unwrap();
    editor.add_marker(pos2(10.0, 10.0));
    let compositor = FakeCompositor::new(Ok(png(800, 600, Color::WHITE)));

    let pending = editor.request_object_merge(object, &compositor, "en").unwrap();
    assert!(editor.is_merge_pending());
    assert!(matches!(
        editor.request_object_merge(object, &compositor, "en"),
        Err(EditorError::Busy)
    ));
    assert_eq!(compositor.calls.borrow().as_slice(), &[RelativePosition { x: 0.5, y: 0.5 }]);

    let completed = block_on(pending.resolve());
    assert!(editor.complete_object_merge(completed));
    assert!(!editor.is_merge_pending());
    assert!(editor.document().objects().is_empty());
    assert_eq!(editor.history().len(), 1);
    assert!(!editor.can_undo());
    assert_eq!((editor.background().width(), editor.background().height()), (800, 600));
}

#[test]
fn test_failed_merge_leaves_scene_untouched() {
    let mut editor = open_editor();
    let object = editor.paste_image(&png(40, 40, Color::WHITE), "image/png").unwrap();
    let error = CollaboratorError::InvalidResponse("empty body".to_owned());
    let compositor = FakeCompositor::new(Err(error));
    let history_len = editor.history().len();

    let pending = editor.request_object_merge(object, &compositor, "en").unwrap();
    assert!(!editor.complete_object_merge(block_on(pending.resolve())));

    assert_eq!(editor.document().objects().len(), 1);
    assert_eq!(editor.history().len(), history_len);
    assert_eq!(editor.background().width(), 400);
    assert!(editor.notice().is_some());
    assert!(!editor.is_merge_pending());
}

#[test]
fn test_merge_result_for_deleted_object_is_discarded() {
    let mut editor = open_editor();
    let object = editor.paste_image(&png(40, 40, Color::WHITE), "image/png").unwrap();
    let compositor = FakeCompositor::new(Ok(png(800, 600, Color::WHITE)));
    let pending = editor.request_object_merge(object, &compositor, "en").unwrap();

    editor.remove_object(object);
    assert!(!editor.complete_object_merge(block_on(pending.resolve())));
    assert_eq!(editor.background().width(), 400);
}

#[test]
fn test_only_images_can_be_merged() {
    let mut editor = open_editor();
    let marker = editor.add_marker(pos2(10.0, 10.0)).unwrap();
    let compositor = FakeCompositor::new(Ok(Vec::new()));
    assert!(matches!(
        editor.request_object_merge(marker, &compositor, "en"),
        Err(EditorError::NotMergeable(_))
    ));
    assert!(compositor.calls.borrow().is_empty());
    assert!(!editor.is_merge_pending());
}
