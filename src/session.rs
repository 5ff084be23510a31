// ============================================================================
// SESSION — gesture-driven controller over the layer stack
// ============================================================================

use std::sync::Arc;

use image::RgbaImage;
use rayon::prelude::*;

use crate::canvas::{DEFAULT_HEIGHT, DEFAULT_WIDTH, Layer};
use crate::color::Color;
use crate::command::{Command, StrokePoint};
use crate::error::CanvasError;
use crate::geometry::{Circle, Line, Point, Rectangle};
use crate::ops::filters::FilterKind;
use crate::ops::shapes::{LineCap, LineJoin, blend_source_over};
use crate::ops::text::{FontLibrary, TextStyle};
use crate::ops::transform::TransformKind;

// ---------------------------------------------------------------------------
//  Modes
// ---------------------------------------------------------------------------

/// What a pointer gesture means.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Hand,
    Figure,
    Text,
    Tool,
    Eraser,
    Transform,
}

impl Mode {
    pub fn label(&self) -> &'static str {
        match self {
            Mode::Hand => "hand",
            Mode::Figure => "figure",
            Mode::Text => "text",
            Mode::Tool => "tool",
            Mode::Eraser => "eraser",
            Mode::Transform => "transform",
        }
    }

    pub fn all() -> &'static [Mode] {
        &[Mode::Hand, Mode::Figure, Mode::Text, Mode::Tool, Mode::Eraser, Mode::Transform]
    }

    pub fn from_name(name: &str) -> Option<Mode> {
        Mode::all().iter().copied().find(|mode| mode.label() == name.to_ascii_lowercase())
    }
}

/// Which figure a drag in figure mode produces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum FigureKind {
    #[default]
    Rectangle,
    Circle,
    Line,
}

impl FigureKind {
    pub fn label(&self) -> &'static str {
        match self {
            FigureKind::Rectangle => "rectangle",
            FigureKind::Circle => "circle",
            FigureKind::Line => "line",
        }
    }

    pub fn all() -> &'static [FigureKind] {
        &[FigureKind::Rectangle, FigureKind::Circle, FigureKind::Line]
    }

    pub fn from_name(name: &str) -> Option<FigureKind> {
        FigureKind::all().iter().copied().find(|kind| kind.label() == name.to_ascii_lowercase())
    }
}

/// A textbox waiting to be committed. It is created by a pointer-down in
/// text mode and turned into a history entry by the next mode change.
#[derive(Clone, Debug, Default)]
pub struct PendingText {
    pub anchor: Point,
    pub buffer: String,
}

// ---------------------------------------------------------------------------
//  Session
// ---------------------------------------------------------------------------

/// The drawing controller: a stack of layers, the active one, and the
/// pointer state machine that turns down/move/up events into history
/// entries on the active layer.
pub struct Session {
    pub layers: Vec<Layer>,
    pub active: usize,
    pub width: u32,
    pub height: u32,
    pub mode: Mode,
    pub figure: FigureKind,
    pub transform_kind: TransformKind,
    pub text_style: TextStyle,
    pub pending_text: Option<PendingText>,
    pub fonts: FontLibrary,
    is_down: bool,
    down_point: Point,
}

impl Session {
    pub fn new(width: u32, height: u32) -> Session {
        let width = if width == 0 { DEFAULT_WIDTH } else { width };
        let height = if height == 0 { DEFAULT_HEIGHT } else { height };
        Session {
            layers: vec![Layer::new(width, height)],
            active: 0,
            width,
            height,
            mode: Mode::default(),
            figure: FigureKind::default(),
            transform_kind: TransformKind::default(),
            text_style: TextStyle::default(),
            pending_text: None,
            fonts: FontLibrary::new(),
            is_down: false,
            down_point: Point::default(),
        }
    }

    /// Clamps a pointer position onto the canvas, edges included.
    pub fn get_offset(&self, point: Point) -> Point {
        Point::new(
            point.x().clamp(0.0, f64::from(self.width)),
            point.y().clamp(0.0, f64::from(self.height)),
        )
    }

    // ------------------------------------------------------------------
    //  Gestures
    // ------------------------------------------------------------------

    /// Pointer down. Tool mode consumes the event; text mode opens a
    /// pending textbox instead of a gesture; every drawing mode arms the
    /// state machine, and freehand modes stage their stroke right away.
    pub fn gesture_start(&mut self, point: Point) {
        let point = self.get_offset(point);
        match self.mode {
            Mode::Tool => {}
            Mode::Text => {
                if self.pending_text.is_none() {
                    self.pending_text = Some(PendingText { anchor: point, buffer: String::new() });
                }
            }
            _ => {
                self.is_down = true;
                self.down_point = point;
                if matches!(self.mode, Mode::Hand | Mode::Eraser) {
                    // The first point of a stroke always paints.
                    let active = self.active;
                    self.layers[active].stage(Command::Stroke(vec![StrokePoint::draw(point)]));
                    let upto = self.layers[active].pointer + 1;
                    self.layers[active].render(upto, &mut self.fonts);
                }
            }
        }
    }

    /// Pointer move. Freehand modes grow the staged stroke, figure and
    /// transform modes rebuild their staged entry from the down point, and
    /// every move refreshes the staged preview.
    pub fn gesture_move(&mut self, point: Point) {
        if !self.is_down {
            return;
        }
        let point = self.get_offset(point);
        let active = self.active;
        match self.mode {
            Mode::Hand | Mode::Eraser => {
                let erase = self.mode == Mode::Eraser;
                let pointer = self.layers[active].pointer;
                if let Some(Command::Stroke(points)) = self.layers[active].history.get_mut(pointer)
                {
                    points.push(StrokePoint { point, erase });
                }
            }
            Mode::Figure => {
                let command = self.figure_command(point);
                self.layers[active].restage(command);
            }
            Mode::Transform => {
                let layer = &self.layers[active];
                if !layer.history[..layer.pointer].iter().any(Command::is_drawable) {
                    return;
                }
                let amounts = self.transform_amounts(point);
                let kind = self.transform_kind;
                self.layers[active].restage(Command::Transform { kind, amounts });
            }
            Mode::Text | Mode::Tool => return,
        }
        let upto = self.layers[active].pointer + 1;
        self.layers[active].render(upto, &mut self.fonts);
    }

    /// Pointer up. Figure gestures take the release position as the final
    /// corner; the other modes commit whatever their moves staged, so a
    /// transform drag that never moved commits nothing.
    pub fn gesture_end(&mut self, point: Point) {
        if !self.is_down {
            return;
        }
        if self.mode == Mode::Figure {
            let point = self.get_offset(point);
            let command = self.figure_command(point);
            let active = self.active;
            self.layers[active].restage(command);
            let upto = self.layers[active].pointer + 1;
            self.layers[active].render(upto, &mut self.fonts);
        }
        self.is_down = false;
        self.layers[self.active].commit_staged();
    }

    /// Builds the staged figure from the down point and the current one.
    /// Rectangle drags toward the origin collapse to zero extent.
    fn figure_command(&self, point: Point) -> Command {
        let down = self.down_point;
        match self.figure {
            FigureKind::Rectangle => Command::Rect(Rectangle::new(
                down.x(),
                down.y(),
                (point.x() - down.x()).max(0.0),
                (point.y() - down.y()).max(0.0),
            )),
            FigureKind::Circle => {
                Command::Circle(Circle::new(down.x(), down.y(), Point::distance(down, point)))
            }
            FigureKind::Line => Command::Line(Line::new(down, point)),
        }
    }

    /// Gesture distance from the down point, expressed as the absolute
    /// amounts of the current transform kind. Scale factors grow by one
    /// canvas-width (or -height) per dragged pixel fraction.
    fn transform_amounts(&self, point: Point) -> Vec<f64> {
        let dx = point.x() - self.down_point.x();
        let dy = point.y() - self.down_point.y();
        match self.transform_kind {
            TransformKind::Translate => vec![dx, dy],
            TransformKind::Scale => {
                let sx = if dx != 0.0 { 1.0 + dx / f64::from(self.width) } else { 1.0 };
                let sy = if dy != 0.0 { 1.0 + dy / f64::from(self.height) } else { 1.0 };
                vec![sx, sy]
            }
            TransformKind::Rotate => vec![dy.atan2(dx).to_degrees()],
        }
    }

    // ------------------------------------------------------------------
    //  Modes and text input
    // ------------------------------------------------------------------

    /// Switches the gesture mode. Entering text mode first opens a fresh
    /// layer; any mode change commits a pending textbox, so re-entering
    /// text mode lands the previous text on the layer just added.
    pub fn set_mode(&mut self, mode: Mode) {
        if mode == Mode::Text {
            self.add_layer();
        }
        self.commit_pending_text();
        self.mode = mode;
    }

    /// Appends to the pending textbox, if one is open.
    pub fn input_text(&mut self, text: &str) {
        if let Some(pending) = self.pending_text.as_mut() {
            pending.buffer.push_str(text);
        }
    }

    fn commit_pending_text(&mut self) {
        if let Some(pending) = self.pending_text.take()
            && !pending.buffer.is_empty()
        {
            let active = self.active;
            let style = self.text_style.clone();
            // The textbox sits at the pointer-down point; the committed
            // anchor is the baseline, one font size below it.
            let anchor = Point::new(pending.anchor.x(), pending.anchor.y() + style.font.size);
            self.layers[active].draw_text(&pending.buffer, anchor, style, &mut self.fonts);
        }
    }

    // ------------------------------------------------------------------
    //  Layer management
    // ------------------------------------------------------------------

    /// Appends a fresh layer and makes it active.
    pub fn add_layer(&mut self) {
        let mut layer = Layer::new(self.width, self.height);
        layer.noise_seed = self.layers.len() as u64;
        self.layers.push(layer);
        self.active = self.layers.len() - 1;
    }

    pub fn select_layer(&mut self, index: usize) -> Result<(), CanvasError> {
        if index >= self.layers.len() {
            return Err(CanvasError::InvalidLayer { index, count: self.layers.len() });
        }
        self.active = index;
        Ok(())
    }

    /// Removes a layer; the last one stays. The active index slides down
    /// when the removal leaves it past the end.
    pub fn remove_layer(&mut self, index: usize) -> Result<(), CanvasError> {
        if self.layers.len() <= 1 {
            return Err(CanvasError::LastLayer);
        }
        if index >= self.layers.len() {
            return Err(CanvasError::InvalidLayer { index, count: self.layers.len() });
        }
        self.layers.remove(index);
        if self.active > 0 && self.layers.len() <= self.active {
            self.active -= 1;
        }
        Ok(())
    }

    pub fn set_layer_visible(&mut self, index: usize, visible: bool) -> Result<(), CanvasError> {
        let count = self.layers.len();
        match self.layers.get_mut(index) {
            Some(layer) => {
                layer.visible = visible;
                Ok(())
            }
            None => Err(CanvasError::InvalidLayer { index, count }),
        }
    }

    /// Composites the visible layers bottom-up into one image.
    pub fn flatten(&self) -> RgbaImage {
        let mut output = RgbaImage::new(self.width, self.height);
        let stride = self.width as usize * 4;
        for layer in self.layers.iter().filter(|layer| layer.visible) {
            let source = layer.surface.image.as_raw();
            output
                .as_mut()
                .par_chunks_mut(stride)
                .zip(source.par_chunks(stride))
                .for_each(|(dst_row, src_row)| {
                    for (dst, src) in
                        dst_row.chunks_exact_mut(4).zip(src_row.chunks_exact(4))
                    {
                        if src[3] == 0 {
                            continue;
                        }
                        blend_source_over(dst, [src[0], src[1], src[2], src[3]], 1.0);
                    }
                });
        }
        output
    }

    // ------------------------------------------------------------------
    //  Active-layer operations
    // ------------------------------------------------------------------

    pub fn undo(&mut self) -> Result<(), CanvasError> {
        self.layers[self.active].undo(&mut self.fonts)
    }

    pub fn redo(&mut self) -> Result<(), CanvasError> {
        self.layers[self.active].redo(&mut self.fonts)
    }

    pub fn clear(&mut self) {
        self.layers[self.active].clear();
    }

    pub fn fill(&mut self, point: Point, color: &Color) -> Result<(), CanvasError> {
        self.layers[self.active].fill(point.x(), point.y(), color)
    }

    pub fn pick_color(&self, point: Point) -> Color {
        self.layers[self.active].pick_color(point)
    }

    pub fn filter(&mut self, kind: FilterKind, amounts: &[f64]) {
        self.layers[self.active].filter(kind, amounts, &mut self.fonts);
    }

    pub fn draw_image(&mut self, image: Arc<RgbaImage>) {
        self.layers[self.active].draw_image(image, &mut self.fonts);
    }

    pub fn translate(&mut self, tx: f64, ty: f64) {
        self.layers[self.active].transform(TransformKind::Translate, &[tx, ty], &mut self.fonts);
    }

    pub fn scale(&mut self, sx: f64, sy: f64) {
        self.layers[self.active].transform(TransformKind::Scale, &[sx, sy], &mut self.fonts);
    }

    pub fn rotate(&mut self, degrees: f64) {
        self.layers[self.active].transform(TransformKind::Rotate, &[degrees], &mut self.fonts);
    }

    // ------------------------------------------------------------------
    //  Style
    // ------------------------------------------------------------------

    pub fn set_stroke_color(&mut self, color: Color, redraw: bool) {
        self.layers[self.active].set_stroke_color(color, redraw, &mut self.fonts);
    }

    pub fn set_fill_color(&mut self, color: Color, redraw: bool) {
        self.layers[self.active].set_fill_color(color, redraw, &mut self.fonts);
    }

    pub fn set_line_width(&mut self, width: f64, redraw: bool) {
        self.layers[self.active].set_line_width(width, redraw, &mut self.fonts);
    }

    pub fn set_line_cap(&mut self, cap: LineCap, redraw: bool) {
        self.layers[self.active].set_line_cap(cap, redraw, &mut self.fonts);
    }

    pub fn set_line_join(&mut self, join: LineJoin, redraw: bool) {
        self.layers[self.active].set_line_join(join, redraw, &mut self.fonts);
    }

    pub fn set_alpha(&mut self, alpha: f64, redraw: bool) {
        self.layers[self.active].set_alpha(alpha, redraw, &mut self.fonts);
    }

    pub fn set_text_style(&mut self, style: TextStyle) {
        self.text_style = style;
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_starts_with_one_layer_in_hand_mode() {
        let session = Session::new(100, 80);
        assert_eq!(session.layers.len(), 1);
        assert_eq!(session.active, 0);
        assert_eq!(session.mode, Mode::Hand);
        assert_eq!((session.width, session.height), (100, 80));
    }

    #[test]
    fn zero_dimensions_fall_back_to_defaults() {
        let session = Session::new(0, 0);
        assert_eq!((session.width, session.height), (DEFAULT_WIDTH, DEFAULT_HEIGHT));
    }

    #[test]
    fn hand_gesture_commits_one_stroke() {
        let mut session = Session::new(50, 50);
        session.set_line_width(4.0, false);
        session.gesture_start(Point::new(5.0, 5.0));
        session.gesture_move(Point::new(15.0, 5.0));
        session.gesture_move(Point::new(25.0, 5.0));
        session.gesture_end(Point::new(25.0, 5.0));

        let layer = &session.layers[0];
        assert_eq!(layer.pointer, 1);
        assert_eq!(layer.history.len(), 1);
        // The release position adds no point; the stroke is down plus moves.
        assert!(matches!(&layer.history[0], Command::Stroke(points) if points.len() == 3));
        assert_eq!(session.pick_color(Point::new(15.0, 5.0)), Color::BLACK);
    }

    #[test]
    fn eraser_tags_every_point_after_the_first() {
        let mut session = Session::new(50, 50);
        session.mode = Mode::Eraser;
        session.gesture_start(Point::new(5.0, 5.0));
        session.gesture_move(Point::new(10.0, 5.0));
        session.gesture_end(Point::new(15.0, 5.0));

        let Command::Stroke(points) = &session.layers[0].history[0] else {
            panic!("expected a stroke");
        };
        let tags: Vec<bool> = points.iter().map(|p| p.erase).collect();
        assert_eq!(tags, vec![false, true]);
    }

    #[test]
    fn pointer_positions_clamp_to_the_canvas() {
        let mut session = Session::new(40, 40);
        session.gesture_start(Point::new(-10.0, 5.0));
        session.gesture_move(Point::new(100.0, 100.0));
        session.gesture_end(Point::new(100.0, 100.0));

        let Command::Stroke(points) = &session.layers[0].history[0] else {
            panic!("expected a stroke");
        };
        assert_eq!(points[0].point, Point::new(0.0, 5.0));
        assert_eq!(points[1].point, Point::new(40.0, 40.0));
    }

    #[test]
    fn figure_gesture_commits_the_clamped_rectangle() {
        let mut session = Session::new(60, 60);
        session.mode = Mode::Figure;
        session.gesture_start(Point::new(10.0, 10.0));
        session.gesture_move(Point::new(30.0, 25.0));
        session.gesture_end(Point::new(30.0, 25.0));

        let Command::Rect(rect) = &session.layers[0].history[0] else {
            panic!("expected a rectangle");
        };
        assert_eq!(
            (rect.left(), rect.top(), rect.width(), rect.height()),
            (10.0, 10.0, 20.0, 15.0)
        );
    }

    #[test]
    fn backward_rectangle_drags_collapse_to_zero_extent() {
        let mut session = Session::new(60, 60);
        session.mode = Mode::Figure;
        session.gesture_start(Point::new(30.0, 30.0));
        session.gesture_end(Point::new(10.0, 10.0));

        let Command::Rect(rect) = &session.layers[0].history[0] else {
            panic!("expected a rectangle");
        };
        assert_eq!((rect.width(), rect.height()), (0.0, 0.0));
    }

    #[test]
    fn figure_click_still_commits_a_degenerate_figure() {
        let mut session = Session::new(60, 60);
        session.mode = Mode::Figure;
        session.gesture_start(Point::new(10.0, 10.0));
        session.gesture_end(Point::new(10.0, 10.0));
        assert_eq!(session.layers[0].history.len(), 1);
        assert_eq!(session.layers[0].pointer, 1);
    }

    #[test]
    fn circle_gesture_uses_the_drag_distance_as_radius() {
        let mut session = Session::new(60, 60);
        session.mode = Mode::Figure;
        session.figure = FigureKind::Circle;
        session.gesture_start(Point::new(30.0, 30.0));
        session.gesture_end(Point::new(30.0, 40.0));

        let Command::Circle(circle) = &session.layers[0].history[0] else {
            panic!("expected a circle");
        };
        assert_eq!((circle.center_x(), circle.center_y(), circle.radius()), (30.0, 30.0, 10.0));
    }

    #[test]
    fn transform_gesture_measures_from_the_down_point() {
        let mut session = Session::new(100, 100);
        session.mode = Mode::Figure;
        session.gesture_start(Point::new(20.0, 20.0));
        session.gesture_end(Point::new(40.0, 40.0));

        session.mode = Mode::Transform;
        session.gesture_start(Point::new(10.0, 10.0));
        session.gesture_move(Point::new(25.0, 15.0));
        session.gesture_end(Point::new(25.0, 15.0));

        let layer = &session.layers[0];
        assert_eq!(layer.history.len(), 2);
        let Command::Transform { kind, amounts } = &layer.history[1] else {
            panic!("expected a transform");
        };
        assert_eq!(*kind, TransformKind::Translate);
        assert_eq!(amounts, &vec![15.0, 5.0]);
    }

    #[test]
    fn scale_gesture_amounts_grow_per_canvas_fraction() {
        let mut session = Session::new(100, 100);
        session.mode = Mode::Figure;
        session.gesture_start(Point::new(20.0, 20.0));
        session.gesture_end(Point::new(40.0, 40.0));

        session.mode = Mode::Transform;
        session.transform_kind = TransformKind::Scale;
        session.gesture_start(Point::new(10.0, 10.0));
        session.gesture_move(Point::new(60.0, 10.0));
        session.gesture_end(Point::new(60.0, 10.0));

        let Command::Transform { amounts, .. } = &session.layers[0].history[1] else {
            panic!("expected a transform");
        };
        assert_eq!(amounts, &vec![1.5, 1.0]);
    }

    #[test]
    fn rotate_gesture_amount_is_the_drag_angle() {
        let mut session = Session::new(100, 100);
        session.mode = Mode::Figure;
        session.gesture_start(Point::new(20.0, 20.0));
        session.gesture_end(Point::new(40.0, 40.0));

        session.mode = Mode::Transform;
        session.transform_kind = TransformKind::Rotate;
        session.gesture_start(Point::new(10.0, 10.0));
        session.gesture_move(Point::new(10.0, 30.0));
        session.gesture_end(Point::new(10.0, 30.0));

        let Command::Transform { amounts, .. } = &session.layers[0].history[1] else {
            panic!("expected a transform");
        };
        assert_eq!(amounts, &vec![90.0]);
    }

    #[test]
    fn transform_gesture_without_movement_commits_nothing() {
        let mut session = Session::new(60, 60);
        session.mode = Mode::Figure;
        session.gesture_start(Point::new(10.0, 10.0));
        session.gesture_end(Point::new(30.0, 30.0));

        session.mode = Mode::Transform;
        session.gesture_start(Point::new(40.0, 40.0));
        session.gesture_end(Point::new(40.0, 40.0));
        assert_eq!(session.layers[0].history.len(), 1);
        assert_eq!(session.layers[0].pointer, 1);
    }

    #[test]
    fn transform_gesture_on_an_empty_layer_is_ignored() {
        let mut session = Session::new(60, 60);
        session.mode = Mode::Transform;
        session.gesture_start(Point::new(10.0, 10.0));
        session.gesture_move(Point::new(30.0, 10.0));
        session.gesture_end(Point::new(30.0, 10.0));
        assert!(session.layers[0].history.is_empty());
    }

    #[test]
    fn tool_mode_ignores_gestures() {
        let mut session = Session::new(60, 60);
        session.mode = Mode::Tool;
        session.gesture_start(Point::new(10.0, 10.0));
        session.gesture_move(Point::new(30.0, 10.0));
        session.gesture_end(Point::new(30.0, 10.0));
        assert!(session.layers[0].history.is_empty());
    }

    #[test]
    fn entering_text_mode_adds_a_layer() {
        let mut session = Session::new(60, 60);
        session.set_mode(Mode::Text);
        assert_eq!(session.layers.len(), 2);
        assert_eq!(session.active, 1);
        assert_eq!(session.mode, Mode::Text);
    }

    #[test]
    fn text_down_opens_one_pending_textbox_without_a_gesture() {
        let mut session = Session::new(60, 60);
        session.set_mode(Mode::Text);
        session.gesture_start(Point::new(12.0, 20.0));
        session.gesture_move(Point::new(40.0, 40.0));
        session.gesture_end(Point::new(40.0, 40.0));

        let pending = session.pending_text.as_ref().unwrap();
        assert_eq!(pending.anchor, Point::new(12.0, 20.0));
        assert!(session.layers[session.active].history.is_empty());

        // A second down must not move or replace the open textbox.
        session.gesture_start(Point::new(50.0, 50.0));
        assert_eq!(session.pending_text.as_ref().unwrap().anchor, Point::new(12.0, 20.0));
    }

    #[test]
    fn leaving_text_mode_commits_the_pending_text() {
        let mut session = Session::new(60, 60);
        session.set_mode(Mode::Text);
        session.gesture_start(Point::new(12.0, 20.0));
        session.input_text("hi");
        session.input_text(" there");
        session.set_mode(Mode::Hand);

        assert!(session.pending_text.is_none());
        let layer = &session.layers[1];
        assert_eq!(layer.history.len(), 1);
        let Command::Text { text, anchor, .. } = &layer.history[0] else {
            panic!("expected a text entry");
        };
        assert_eq!(text, "hi there");
        // The 16px default drops the committed baseline below the click.
        assert_eq!(*anchor, Point::new(12.0, 36.0));
    }

    #[test]
    fn committed_text_pivots_half_a_size_below_the_baseline() {
        let mut session = Session::new(60, 60);
        session.set_mode(Mode::Text);
        session.gesture_start(Point::new(12.0, 20.0));
        session.input_text("hi");
        session.set_mode(Mode::Hand);

        // Click y 20 + 16px baseline shift + half a size = 44.
        let command = &session.layers[1].history[0];
        let center = command.center_point(&mut session.fonts).unwrap();
        assert_eq!(center.y(), 44.0);
    }

    #[test]
    fn empty_pending_text_is_dropped_on_mode_change() {
        let mut session = Session::new(60, 60);
        session.set_mode(Mode::Text);
        session.gesture_start(Point::new(12.0, 20.0));
        session.set_mode(Mode::Hand);
        assert!(session.pending_text.is_none());
        assert!(session.layers[1].history.is_empty());
    }

    #[test]
    fn reentering_text_mode_commits_onto_the_new_layer() {
        let mut session = Session::new(60, 60);
        session.set_mode(Mode::Text);
        session.gesture_start(Point::new(12.0, 20.0));
        session.input_text("drifts");
        session.set_mode(Mode::Text);

        assert_eq!(session.layers.len(), 3);
        assert!(session.layers[1].history.is_empty());
        assert_eq!(session.layers[2].history.len(), 1);
    }

    #[test]
    fn layer_selection_validates_the_index() {
        let mut session = Session::new(60, 60);
        session.add_layer();
        assert_eq!(session.select_layer(0), Ok(()));
        assert_eq!(
            session.select_layer(5),
            Err(CanvasError::InvalidLayer { index: 5, count: 2 })
        );
    }

    #[test]
    fn the_last_layer_cannot_be_removed() {
        let mut session = Session::new(60, 60);
        assert_eq!(session.remove_layer(0), Err(CanvasError::LastLayer));
    }

    #[test]
    fn removing_a_layer_slides_the_active_index_down() {
        let mut session = Session::new(60, 60);
        session.add_layer();
        session.add_layer();
        assert_eq!(session.active, 2);
        session.remove_layer(0).unwrap();
        assert_eq!(session.active, 1);
        session.remove_layer(1).unwrap();
        assert_eq!(session.active, 0);
    }

    #[test]
    fn hidden_layers_stay_out_of_the_flattened_image() {
        let mut session = Session::new(40, 40);
        session.mode = Mode::Figure;
        session.gesture_start(Point::new(5.0, 5.0));
        session.gesture_end(Point::new(30.0, 30.0));

        session.set_layer_visible(0, false).unwrap();
        let flat = session.flatten();
        assert_eq!(flat.get_pixel(10, 10).0, [0, 0, 0, 0]);

        session.set_layer_visible(0, true).unwrap();
        let flat = session.flatten();
        assert_eq!(flat.get_pixel(10, 10).0, [0, 0, 0, 255]);
    }

    #[test]
    fn flatten_composites_layers_bottom_up() {
        let mut session = Session::new(40, 40);
        session.set_fill_color(Color::WHITE, false);
        session.set_stroke_color(Color::WHITE, false);
        session.mode = Mode::Figure;
        session.gesture_start(Point::new(5.0, 5.0));
        session.gesture_end(Point::new(35.0, 35.0));

        session.add_layer();
        session.mode = Mode::Figure;
        session.gesture_start(Point::new(15.0, 15.0));
        session.gesture_end(Point::new(25.0, 25.0));

        let flat = session.flatten();
        assert_eq!(flat.get_pixel(20, 20).0, [0, 0, 0, 255]);
        assert_eq!(flat.get_pixel(8, 8).0, [255, 255, 255, 255]);
    }

    #[test]
    fn undo_and_redo_reach_the_active_layer() {
        let mut session = Session::new(60, 60);
        assert_eq!(session.undo(), Err(CanvasError::NothingToUndo));
        session.mode = Mode::Figure;
        session.gesture_start(Point::new(10.0, 10.0));
        session.gesture_end(Point::new(30.0, 30.0));

        session.undo().unwrap();
        assert_eq!(session.pick_color(Point::new(20.0, 20.0)), Color::TRANSPARENT);
        session.redo().unwrap();
        assert_eq!(session.pick_color(Point::new(20.0, 20.0)), Color::BLACK);
        assert_eq!(session.redo(), Err(CanvasError::NothingToRedo));
    }

    #[test]
    fn direct_transform_calls_commit_one_entry_each() {
        let mut session = Session::new(60, 60);
        session.mode = Mode::Figure;
        session.gesture_start(Point::new(10.0, 10.0));
        session.gesture_end(Point::new(30.0, 30.0));

        session.translate(5.0, 0.0);
        session.rotate(45.0);
        session.scale(2.0, 2.0);
        assert_eq!(session.layers[0].history.len(), 4);
    }
}
