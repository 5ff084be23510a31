// ============================================================================
// COMMANDS — the replayable history entries
// ============================================================================

use std::sync::Arc;

use image::RgbaImage;

use crate::geometry::{Circle, Line, Point, Rectangle};
use crate::ops::filters::FilterKind;
use crate::ops::text::{FontLibrary, TextStyle};
use crate::ops::transform::TransformKind;

/// One vertex of a freehand stroke. The `erase` tag switches the segment
/// that ends here to destination-out compositing.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StrokePoint {
    pub point: Point,
    pub erase: bool,
}

impl StrokePoint {
    pub fn draw(point: Point) -> StrokePoint {
        StrokePoint { point, erase: false }
    }

    pub fn erase(point: Point) -> StrokePoint {
        StrokePoint { point, erase: true }
    }
}

/// One entry in a layer's history.
///
/// Drawable variants paint through the layer's standing matrix on replay.
/// `Filter` reworks the pixel buffer in place; `Transform` folds new
/// absolute amounts into the layer transform and redraws everything
/// committed before it.
#[derive(Clone, Debug)]
pub enum Command {
    Stroke(Vec<StrokePoint>),
    Rect(Rectangle),
    Circle(Circle),
    Line(Line),
    Text {
        text: String,
        anchor: Point,
        style: TextStyle,
    },
    Image(Arc<RgbaImage>),
    Filter {
        kind: FilterKind,
        amounts: Vec<f64>,
    },
    Transform {
        kind: TransformKind,
        amounts: Vec<f64>,
    },
}

impl Command {
    /// Whether this entry paints pixels on replay (and therefore offers a
    /// center for transforms to pivot on).
    pub fn is_drawable(&self) -> bool {
        !matches!(self, Command::Filter { .. } | Command::Transform { .. })
    }

    /// Pivot point used by transforms: bounding-box center for strokes and
    /// lines, geometric center for rectangles and circles, half a font size
    /// below the baseline anchor for text, image center for blits.
    pub fn center_point(&self, fonts: &mut FontLibrary) -> Option<Point> {
        match self {
            Command::Stroke(points) => stroke_center(points),
            Command::Rect(rect) => Some(rect.center()),
            Command::Circle(circle) => Some(circle.center()),
            Command::Line(line) => Some(line.center()),
            Command::Text { text, anchor, style } => {
                let width = fonts.measure(&style.font, text);
                Some(Point::new(
                    anchor.x() + width / 2.0,
                    anchor.y() + style.font.size / 2.0,
                ))
            }
            Command::Image(image) => Some(Point::new(
                f64::from(image.width()) / 2.0,
                f64::from(image.height()) / 2.0,
            )),
            Command::Filter { .. } | Command::Transform { .. } => None,
        }
    }

    /// Short name for log lines; `Debug` would dump whole image buffers.
    pub fn label(&self) -> &'static str {
        match self {
            Command::Stroke(_) => "stroke",
            Command::Rect(_) => "rect",
            Command::Circle(_) => "circle",
            Command::Line(_) => "line",
            Command::Text { .. } => "text",
            Command::Image(_) => "image",
            Command::Filter { .. } => "filter",
            Command::Transform { .. } => "transform",
        }
    }
}

/// Floored bounding-box center. The maxima accumulate from zero.
fn stroke_center(points: &[StrokePoint]) -> Option<Point> {
    if points.is_empty() {
        return None;
    }
    let mut min_x = f64::MAX;
    let mut min_y = f64::MAX;
    let mut max_x = 0.0f64;
    let mut max_y = 0.0f64;
    for sp in points {
        min_x = min_x.min(sp.point.x());
        min_y = min_y.min(sp.point.y());
        max_x = max_x.max(sp.point.x());
        max_y = max_y.max(sp.point.y());
    }
    Some(Point::new(
        ((max_x - min_x) / 2.0 + min_x).floor(),
        ((max_y - min_y) / 2.0 + min_y).floor(),
    ))
}

// ============================================================================
// Tests
// ============================================================================
