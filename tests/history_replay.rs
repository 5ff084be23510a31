// ============================================================================
// HISTORY — undo, redo, truncation, and replay observed through pixels
// ============================================================================

use artboard::{
    CanvasError, Circle, Command, FilterKind, FontLibrary, Layer, Rectangle, TransformKind,
};

/// A layer with two committed figures and a committed invert filter.
fn scene() -> (Layer, FontLibrary) {
    let mut fonts = FontLibrary::new();
    let mut layer = Layer::new(80, 60);
    layer.commit(Command::Rect(Rectangle::new(10.0, 10.0, 30.0, 20.0)), &mut fonts);
    layer.commit(Command::Circle(Circle::new(50.0, 40.0, 12.0)), &mut fonts);
    layer.filter(FilterKind::Reverse, &[], &mut fonts);
    (layer, fonts)
}

fn buffer(layer: &Layer) -> Vec<u8> {
    layer.surface.image.as_raw().clone()
}

fn pixel(layer: &Layer, x: u32, y: u32) -> [u8; 4] {
    layer.surface.image.get_pixel(x, y).0
}

#[test]
fn replaying_the_same_window_twice_gives_identical_pixels() {
    let (mut layer, mut fonts) = scene();
    let first = buffer(&layer);

    layer.render(layer.pointer, &mut fonts);
    assert_eq!(buffer(&layer), first);
    layer.render(layer.pointer, &mut fonts);
    assert_eq!(buffer(&layer), first);
}

#[test]
fn undo_then_redo_restores_the_exact_buffer() {
    let (mut layer, mut fonts) = scene();
    let committed = buffer(&layer);

    layer.undo(&mut fonts).unwrap();
    assert_ne!(buffer(&layer), committed);
    layer.redo(&mut fonts).unwrap();
    assert_eq!(buffer(&layer), committed);
}

#[test]
fn committing_after_undo_discards_the_redo_branch() {
    let mut fonts = FontLibrary::new();
    let mut layer = Layer::new(80, 60);
    layer.commit(Command::Rect(Rectangle::new(5.0, 5.0, 20.0, 20.0)), &mut fonts);
    layer.commit(Command::Circle(Circle::new(40.0, 30.0, 10.0)), &mut fonts);
    layer.undo(&mut fonts).unwrap();

    layer.commit(Command::Rect(Rectangle::new(50.0, 10.0, 12.0, 12.0)), &mut fonts);

    assert_eq!(layer.history.len(), 2);
    assert_eq!(layer.pointer, 2);
    assert!(matches!(layer.history[1], Command::Rect(_)));
    assert_eq!(layer.redo(&mut fonts), Err(CanvasError::NothingToRedo));
}

#[test]
fn a_committed_rectangle_survives_an_undo_redo_cycle() {
    let mut fonts = FontLibrary::new();
    let mut layer = Layer::new(100, 100);
    layer.commit(Command::Rect(Rectangle::new(10.0, 10.0, 20.0, 20.0)), &mut fonts);

    let committed = buffer(&layer);
    assert_eq!(pixel(&layer, 20, 20), [0, 0, 0, 255]);

    layer.undo(&mut fonts).unwrap();
    assert!(buffer(&layer).iter().all(|&byte| byte == 0));

    layer.redo(&mut fonts).unwrap();
    assert_eq!(buffer(&layer), committed);
}

#[test]
fn history_boundaries_report_errors() {
    let mut fonts = FontLibrary::new();
    let mut layer = Layer::new(40, 40);
    assert_eq!(layer.undo(&mut fonts), Err(CanvasError::NothingToUndo));
    assert_eq!(layer.redo(&mut fonts), Err(CanvasError::NothingToRedo));

    layer.commit(Command::Rect(Rectangle::new(4.0, 4.0, 8.0, 8.0)), &mut fonts);
    assert_eq!(layer.redo(&mut fonts), Err(CanvasError::NothingToRedo));
    layer.undo(&mut fonts).unwrap();
    assert_eq!(layer.undo(&mut fonts), Err(CanvasError::NothingToUndo));
}

#[test]
fn undoing_a_translate_entry_moves_pixels_back() {
    let mut fonts = FontLibrary::new();
    let mut layer = Layer::new(100, 100);
    layer.commit(Command::Rect(Rectangle::new(5.0, 5.0, 20.0, 10.0)), &mut fonts);
    assert_eq!(pixel(&layer, 15, 10), [0, 0, 0, 255]);

    layer.transform(TransformKind::Translate, &[40.0, 20.0], &mut fonts);
    assert_eq!(layer.pointer, 2);
    assert_eq!(pixel(&layer, 55, 30), [0, 0, 0, 255]);
    assert_eq!(pixel(&layer, 15, 10), [0, 0, 0, 0]);

    layer.undo(&mut fonts).unwrap();
    assert_eq!(pixel(&layer, 15, 10), [0, 0, 0, 255]);
    assert_eq!(pixel(&layer, 55, 30), [0, 0, 0, 0]);

    layer.redo(&mut fonts).unwrap();
    assert_eq!(pixel(&layer, 55, 30), [0, 0, 0, 255]);
}
