// ============================================================================
// CANVAS — rasterizing surface and the replayable layer on top of it
// ============================================================================

use std::sync::Arc;

use image::RgbaImage;
use log::debug;
use rand::{SeedableRng, rngs::StdRng};
use rayon::prelude::*;

use crate::color::Color;
use crate::command::Command;
use crate::error::CanvasError;
use crate::geometry::{Circle, Point, Rectangle};
use crate::ops::fill;
use crate::ops::filters::{self, FilterKind};
use crate::ops::shapes::{
    LineCap, LineJoin, blend_destination_out, blend_source_over, coverage, sdf_box, sdf_ellipse,
    sdf_stroke_segment,
};
use crate::ops::text::{FontLibrary, TextStyle};
use crate::ops::transform::{Affine, TransformKind, TransformState};

pub const DEFAULT_WIDTH: u32 = 300;
pub const DEFAULT_HEIGHT: u32 = 300;

/// Half-width of the anti-alias ramp, in device pixels.
const AA: f64 = 0.5;

// ============================================================================
// DRAW STYLE
// ============================================================================

/// The live stroke/fill state a layer renders its history with. Committed
/// strokes and figures pick these up again on every replay, so restyling
/// recolors everything already on the layer.
#[derive(Clone, Debug, PartialEq)]
pub struct DrawStyle {
    pub stroke_color: Color,
    pub fill_color: Color,
    pub line_width: f64,
    pub line_cap: LineCap,
    pub line_join: LineJoin,
    pub alpha: f64,
}

impl Default for DrawStyle {
    fn default() -> DrawStyle {
        DrawStyle {
            stroke_color: Color::BLACK,
            fill_color: Color::BLACK,
            line_width: 1.0,
            line_cap: LineCap::Butt,
            line_join: LineJoin::Miter,
            alpha: 1.0,
        }
    }
}

// ============================================================================
// SURFACE
// ============================================================================

/// A straight-alpha RGBA pixel buffer plus the affine matrix drawables pass
/// through. Shapes rasterize by signed distance: the affected rows are
/// walked in parallel, each device pixel maps back into shape space, and
/// the coverage of the distance field blends the ink in.
#[derive(Clone, Debug)]
pub struct Surface {
    pub image: RgbaImage,
    pub transform: Affine,
}

impl Surface {
    pub fn new(width: u32, height: u32) -> Surface {
        let width = if width == 0 { DEFAULT_WIDTH } else { width };
        let height = if height == 0 { DEFAULT_HEIGHT } else { height };
        Surface {
            image: RgbaImage::new(width, height),
            transform: Affine::IDENTITY,
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Blanks every pixel to transparent black. The matrix is kept.
    pub fn clear(&mut self) {
        self.image.as_mut().fill(0);
    }

    pub fn set_transform(&mut self, transform: Affine) {
        self.transform = transform;
    }

    /// Color under a device pixel; out of bounds reads back transparent.
    pub fn pick_color(&self, x: f64, y: f64) -> Color {
        if x < 0.0 || y < 0.0 || x >= f64::from(self.width()) || y >= f64::from(self.height()) {
            return Color::TRANSPARENT;
        }
        let p = self.image.get_pixel(x as u32, y as u32).0;
        Color::from_rgba8(p[0], p[1], p[2], p[3])
    }

    /// Renders one history entry through the standing matrix. Filters and
    /// transforms are not drawables and are ignored here.
    pub fn draw(&mut self, command: &Command, style: &DrawStyle, fonts: &mut FontLibrary) {
        match command {
            Command::Stroke(points) => {
                for pair in points.windows(2) {
                    self.stroke_segment(pair[0].point, pair[1].point, style, pair[1].erase);
                }
            }
            Command::Rect(rect) => self.draw_rect(rect, style),
            Command::Circle(circle) => self.draw_circle(circle, style),
            Command::Line(line) => self.stroke_segment(line.start(), line.end(), style, false),
            Command::Text { text, anchor, style: text_style } => {
                self.draw_text(text, *anchor, text_style, style.alpha, fonts);
            }
            Command::Image(image) => {
                self.blit(image.as_raw(), image.width(), image.height(), 0.0, 0.0, style.alpha);
            }
            Command::Filter { .. } | Command::Transform { .. } => {}
        }
    }

    /// One stroked segment. The cap comes from the style; an erase segment
    /// punches its coverage out of the destination instead of painting.
    pub fn stroke_segment(&mut self, a: Point, b: Point, style: &DrawStyle, erase: bool) {
        if style.line_width <= 0.0 {
            return;
        }
        let half = style.line_width / 2.0;
        let (ax, ay, bx, by) = (a.x(), a.y(), b.x(), b.y());
        let cap = style.line_cap;
        let bounds = (ax.min(bx), ay.min(by), ax.max(bx), ay.max(by));
        self.paint(
            bounds,
            half + 1.0,
            style.stroke_color.to_rgba8(),
            style.alpha,
            erase,
            move |x, y| sdf_stroke_segment(x, y, ax, ay, bx, by, half, cap),
        );
    }

    /// Outline first, fill second, like an immediate-mode path that is
    /// stroked and then filled.
    pub fn draw_rect(&mut self, rect: &Rectangle, style: &DrawStyle) {
        let center = rect.center();
        let (cx, cy) = (center.x(), center.y());
        let hx = rect.width() / 2.0;
        let hy = rect.height() / 2.0;
        let bounds = (
            rect.left(),
            rect.top(),
            rect.left() + rect.width(),
            rect.top() + rect.height(),
        );

        if style.line_width > 0.0 {
            let half = style.line_width / 2.0;
            let color = style.stroke_color.to_rgba8();
            match style.line_join {
                LineJoin::Round => self.paint(bounds, half + 1.0, color, style.alpha, false, {
                    move |x, y| sdf_box(x - cx, y - cy, hx, hy).abs() - half
                }),
                // Miter and bevel keep square corners: outer box minus inner box.
                _ => self.paint(bounds, half + 1.0, color, style.alpha, false, {
                    move |x, y| {
                        let outer = sdf_box(x - cx, y - cy, hx + half, hy + half);
                        let inner =
                            sdf_box(x - cx, y - cy, (hx - half).max(0.0), (hy - half).max(0.0));
                        outer.max(-inner)
                    }
                }),
            }
        }
        self.paint(bounds, 1.0, style.fill_color.to_rgba8(), style.alpha, false, {
            move |x, y| sdf_box(x - cx, y - cy, hx, hy)
        });
    }

    pub fn draw_circle(&mut self, circle: &Circle, style: &DrawStyle) {
        let (cx, cy, r) = (circle.center_x(), circle.center_y(), circle.radius());
        let bounds = (cx - r, cy - r, cx + r, cy + r);

        if style.line_width > 0.0 {
            let half = style.line_width / 2.0;
            self.paint(
                bounds,
                half + 1.0,
                style.stroke_color.to_rgba8(),
                style.alpha,
                false,
                move |x, y| sdf_ellipse(x - cx, y - cy, r, r).abs() - half,
            );
        }
        self.paint(bounds, 1.0, style.fill_color.to_rgba8(), style.alpha, false, {
            move |x, y| sdf_ellipse(x - cx, y - cy, r, r)
        });
    }

    /// Rasterizes a text run and blits it with its baseline on the
    /// anchor's y; the tile offsets are baseline-relative.
    pub fn draw_text(
        &mut self,
        text: &str,
        anchor: Point,
        text_style: &TextStyle,
        alpha: f64,
        fonts: &mut FontLibrary,
    ) {
        let color = text_style.color.to_rgba8();
        if let Some(tile) = fonts.rasterize(&text_style.font, text, color) {
            self.blit(
                &tile.buf,
                tile.width,
                tile.height,
                anchor.x() + f64::from(tile.off_x),
                anchor.y() + f64::from(tile.off_y),
                alpha,
            );
        }
    }

    /// Source-over blit of a flat RGBA tile whose top-left sits at
    /// `(origin_x, origin_y)` in shape space. Destination pixels map back
    /// into the tile and sample bilinearly against a transparent border,
    /// row-parallel.
    pub fn blit(
        &mut self,
        buf: &[u8],
        tile_width: u32,
        tile_height: u32,
        origin_x: f64,
        origin_y: f64,
        alpha: f64,
    ) {
        if alpha <= 0.0 || tile_width == 0 || tile_height == 0 {
            return;
        }
        let forward = self.transform.mul(&Affine::translation(origin_x, origin_y));
        let Some(inverse) = forward.invert() else {
            return;
        };

        let (tw, th) = (f64::from(tile_width), f64::from(tile_height));
        let corners = [
            forward.apply(0.0, 0.0),
            forward.apply(tw, 0.0),
            forward.apply(0.0, th),
            forward.apply(tw, th),
        ];
        let Some((x0, x1, y0, y1)) = self.clip_rows(&corners, 2.0) else {
            return;
        };

        let src_w = tile_width as i32;
        let src_h = tile_height as i32;
        let src_stride = tile_width as usize * 4;
        let stride = self.image.width() as usize * 4;
        let raw = self.image.as_mut();

        raw[y0 * stride..(y1 + 1) * stride]
            .par_chunks_mut(stride)
            .enumerate()
            .for_each(|(offset, row)| {
                let dy = (y0 + offset) as f64;
                for dx in x0..=x1 {
                    let (src_x, src_y) = inverse.apply(dx as f64, dy);
                    let cx0 = src_x.floor() as i32;
                    let cy0 = src_y.floor() as i32;
                    if cx0 < -1 || cy0 < -1 || cx0 >= src_w || cy0 >= src_h {
                        continue;
                    }
                    let fx = src_x - f64::from(cx0);
                    let fy = src_y - f64::from(cy0);

                    let sample = |sx: i32, sy: i32| -> [f64; 4] {
                        if sx < 0 || sy < 0 || sx >= src_w || sy >= src_h {
                            [0.0; 4]
                        } else {
                            let idx = sy as usize * src_stride + sx as usize * 4;
                            [
                                f64::from(buf[idx]),
                                f64::from(buf[idx + 1]),
                                f64::from(buf[idx + 2]),
                                f64::from(buf[idx + 3]),
                            ]
                        }
                    };
                    let tl = sample(cx0, cy0);
                    let tr = sample(cx0 + 1, cy0);
                    let bl = sample(cx0, cy0 + 1);
                    let br = sample(cx0 + 1, cy0 + 1);

                    let mut color = [0u8; 4];
                    for c in 0..4 {
                        let top = tl[c] + (tr[c] - tl[c]) * fx;
                        let bot = bl[c] + (br[c] - bl[c]) * fx;
                        color[c] = (top + (bot - top) * fy).round().clamp(0.0, 255.0) as u8;
                    }
                    if color[3] == 0 {
                        continue;
                    }
                    blend_source_over(&mut row[dx * 4..dx * 4 + 4], color, alpha);
                }
            });
    }

    /// Rasterizes one signed-distance shape. `bounds` is the unpadded
    /// shape-space box, `pad` the extra shape-space reach (stroke half-width
    /// plus ramp); the distance field is evaluated at the shape-space image
    /// of each device pixel center and rescaled by the matrix determinant.
    fn paint<D>(
        &mut self,
        bounds: (f64, f64, f64, f64),
        pad: f64,
        color: [u8; 4],
        alpha: f64,
        erase: bool,
        distance: D,
    ) where
        D: Fn(f64, f64) -> f64 + Sync,
    {
        if alpha <= 0.0 {
            return;
        }
        let Some(inverse) = self.transform.invert() else {
            return;
        };
        let det = self.transform.a * self.transform.d - self.transform.b * self.transform.c;
        let scale = det.abs().sqrt();
        if scale < 1e-12 {
            return;
        }

        let (left, top, right, bottom) = bounds;
        let corners = [
            self.transform.apply(left - pad, top - pad),
            self.transform.apply(right + pad, top - pad),
            self.transform.apply(left - pad, bottom + pad),
            self.transform.apply(right + pad, bottom + pad),
        ];
        let Some((x0, x1, y0, y1)) = self.clip_rows(&corners, 1.0) else {
            return;
        };

        let stride = self.image.width() as usize * 4;
        let raw = self.image.as_mut();

        raw[y0 * stride..(y1 + 1) * stride]
            .par_chunks_mut(stride)
            .enumerate()
            .for_each(|(offset, row)| {
                let py = (y0 + offset) as f64 + 0.5;
                for px in x0..=x1 {
                    let (sx, sy) = inverse.apply(px as f64 + 0.5, py);
                    let cov = coverage(distance(sx, sy) * scale, AA);
                    if cov <= 0.0 {
                        continue;
                    }
                    let dst = &mut row[px * 4..px * 4 + 4];
                    if erase {
                        blend_destination_out(dst, cov * alpha);
                    } else {
                        blend_source_over(dst, color, cov * alpha);
                    }
                }
            });
    }

    /// Clips a device-space corner hull (plus a pixel margin) to the image,
    /// returning inclusive `(x0, x1, y0, y1)` or `None` when nothing is hit.
    fn clip_rows(
        &self,
        corners: &[(f64, f64); 4],
        margin: f64,
    ) -> Option<(usize, usize, usize, usize)> {
        let mut min_x = f64::INFINITY;
        let mut min_y = f64::INFINITY;
        let mut max_x = f64::NEG_INFINITY;
        let mut max_y = f64::NEG_INFINITY;
        for (x, y) in corners {
            min_x = min_x.min(*x);
            min_y = min_y.min(*y);
            max_x = max_x.max(*x);
            max_y = max_y.max(*y);
        }
        if !(min_x.is_finite() && min_y.is_finite() && max_x.is_finite() && max_y.is_finite()) {
            return None;
        }

        let x0 = ((min_x - margin).floor() as i64).max(0);
        let y0 = ((min_y - margin).floor() as i64).max(0);
        let x1 = ((max_x + margin).ceil() as i64).min(i64::from(self.width()) - 1);
        let y1 = ((max_y + margin).ceil() as i64).min(i64::from(self.height()) - 1);
        if x0 > x1 || y0 > y1 {
            return None;
        }
        Some((x0 as usize, x1 as usize, y0 as usize, y1 as usize))
    }
}

// ============================================================================
// LAYER
// ============================================================================

/// One drawing layer: a surface plus the command history that produces it.
///
/// `pointer` counts the committed prefix of `history`. A gesture in flight
/// keeps its entry staged at `history[pointer]`; committing advances the
/// pointer over it, abandoning it leaves it as the redo branch head exactly
/// as if it had been undone.
#[derive(Clone, Debug)]
pub struct Layer {
    pub surface: Surface,
    pub history: Vec<Command>,
    pub pointer: usize,
    pub style: DrawStyle,
    pub visible: bool,
    pub noise_seed: u64,
}

impl Layer {
    pub fn new(width: u32, height: u32) -> Layer {
        Layer {
            surface: Surface::new(width, height),
            history: Vec::new(),
            pointer: 0,
            style: DrawStyle::default(),
            visible: true,
            noise_seed: 0,
        }
    }

    // ------------------------------------------------------------------
    //  History protocol
    // ------------------------------------------------------------------

    /// Commits an entry: drop the redo branch, append, advance, replay.
    pub fn commit(&mut self, command: Command, fonts: &mut FontLibrary) {
        debug!("commit {} as entry {}", command.label(), self.pointer);
        self.history.truncate(self.pointer);
        self.history.push(command);
        self.pointer += 1;
        self.render(self.pointer, fonts);
    }

    /// Parks an in-flight entry at the pointer without committing it.
    pub fn stage(&mut self, command: Command) {
        self.history.truncate(self.pointer);
        self.history.push(command);
    }

    /// Replaces the staged entry (or stages if none is parked yet).
    pub fn restage(&mut self, command: Command) {
        if self.history.len() > self.pointer {
            self.history[self.pointer] = command;
        } else {
            self.stage(command);
        }
    }

    /// Advances the pointer over the staged entry. Returns false when
    /// nothing was staged.
    pub fn commit_staged(&mut self) -> bool {
        if self.history.len() > self.pointer {
            self.pointer += 1;
            true
        } else {
            false
        }
    }

    pub fn discard_staged(&mut self) {
        self.history.truncate(self.pointer);
    }

    pub fn undo(&mut self, fonts: &mut FontLibrary) -> Result<(), CanvasError> {
        if self.pointer == 0 {
            return Err(CanvasError::NothingToUndo);
        }
        self.pointer -= 1;
        self.render(self.pointer, fonts);
        Ok(())
    }

    pub fn redo(&mut self, fonts: &mut FontLibrary) -> Result<(), CanvasError> {
        if self.pointer >= self.history.len() {
            return Err(CanvasError::NothingToRedo);
        }
        self.pointer += 1;
        self.render(self.pointer, fonts);
        Ok(())
    }

    // ------------------------------------------------------------------
    //  Replay
    // ------------------------------------------------------------------

    /// Rebuilds the surface from the first `upto` history entries.
    ///
    /// All transform entries in the window fold into one state first; the
    /// matrix of the latest one, pivoted on the center of the drawable
    /// preceding it, governs every drawable in the replay. Filters rework
    /// the buffer at their own positions, each with its own seeded
    /// generator so a replay reproduces the same pixels.
    pub fn render(&mut self, upto: usize, fonts: &mut FontLibrary) {
        let upto = upto.min(self.history.len());
        debug!("replay {upto} of {} entries", self.history.len());

        let mut state = TransformState::default();
        let mut latest: Option<(usize, TransformKind)> = None;
        for (index, command) in self.history[..upto].iter().enumerate() {
            if let Command::Transform { kind, amounts } = command
                && state.fold(*kind, amounts)
            {
                latest = Some((index, *kind));
            }
        }
        let mut matrix = Affine::IDENTITY;
        if let Some((index, kind)) = latest {
            let center = self.history[..index]
                .iter()
                .rev()
                .find(|command| command.is_drawable())
                .and_then(|command| command.center_point(fonts));
            if let Some(center) = center {
                matrix = state.matrix(kind, center);
            }
        }

        self.surface.clear();
        self.surface.set_transform(matrix);
        for (index, command) in self.history[..upto].iter().enumerate() {
            if let Command::Filter { kind, amounts } = command {
                let mut rng = StdRng::seed_from_u64(self.noise_seed ^ index as u64);
                let (width, height) = (self.surface.width(), self.surface.height());
                let input = self.surface.image.as_raw();
                if let Some(output) = filters::apply(*kind, input, width, amounts, &mut rng)
                    && let Some(filtered) = RgbaImage::from_raw(width, height, output)
                {
                    self.surface.image = filtered;
                }
            } else {
                self.surface.draw(command, &self.style, fonts);
            }
        }
    }

    // ------------------------------------------------------------------
    //  Operations
    // ------------------------------------------------------------------

    /// Blanks the surface without touching the history. The content comes
    /// back on the next replay, matching an immediate-mode clear.
    pub fn clear(&mut self) {
        self.surface.clear();
    }

    /// Flood-fills the 4-connected region of exactly-matching pixels under
    /// the seed. Works on the rendered buffer directly; not a history entry.
    pub fn fill(&mut self, x: f64, y: f64, color: &Color) -> Result<(), CanvasError> {
        let (width, height) = (self.surface.width(), self.surface.height());
        if x < 0.0 || y < 0.0 || x >= f64::from(width) || y >= f64::from(height) {
            return Err(CanvasError::OutOfBounds { x: x as i64, y: y as i64, width, height });
        }
        fill::flood_fill(
            self.surface.image.as_mut(),
            width,
            height,
            x as u32,
            y as u32,
            color.to_rgba8(),
        )
    }

    pub fn pick_color(&self, point: Point) -> Color {
        self.surface.pick_color(point.x(), point.y())
    }

    /// Commits a filter entry and replays. A filter that rejects its
    /// amounts still occupies a history slot, it just leaves pixels alone.
    pub fn filter(&mut self, kind: FilterKind, amounts: &[f64], fonts: &mut FontLibrary) {
        self.commit(Command::Filter { kind, amounts: amounts.to_vec() }, fonts);
    }

    /// Commits a transform entry. Nothing is committed when the amounts do
    /// not parse or when no committed drawable exists to pivot on.
    pub fn transform(&mut self, kind: TransformKind, amounts: &[f64], fonts: &mut FontLibrary) {
        let mut trial = TransformState::default();
        if !trial.fold(kind, amounts) {
            return;
        }
        if !self.history[..self.pointer].iter().any(Command::is_drawable) {
            return;
        }
        self.commit(Command::Transform { kind, amounts: amounts.to_vec() }, fonts);
    }

    /// Commits a text entry; the anchor's y is the baseline.
    pub fn draw_text(
        &mut self,
        text: &str,
        anchor: Point,
        style: TextStyle,
        fonts: &mut FontLibrary,
    ) {
        self.commit(Command::Text { text: text.to_string(), anchor, style }, fonts);
    }

    pub fn draw_image(&mut self, image: Arc<RgbaImage>, fonts: &mut FontLibrary) {
        self.commit(Command::Image(image), fonts);
    }

    // ------------------------------------------------------------------
    //  Style
    // ------------------------------------------------------------------

    pub fn set_stroke_color(&mut self, color: Color, redraw: bool, fonts: &mut FontLibrary) {
        self.style.stroke_color = color;
        if redraw {
            self.render(self.pointer, fonts);
        }
    }

    pub fn set_fill_color(&mut self, color: Color, redraw: bool, fonts: &mut FontLibrary) {
        self.style.fill_color = color;
        if redraw {
            self.render(self.pointer, fonts);
        }
    }

    /// Widths must be finite and positive; anything else is ignored.
    pub fn set_line_width(&mut self, width: f64, redraw: bool, fonts: &mut FontLibrary) {
        if !width.is_finite() || width <= 0.0 {
            return;
        }
        self.style.line_width = width;
        if redraw {
            self.render(self.pointer, fonts);
        }
    }

    pub fn set_line_cap(&mut self, cap: LineCap, redraw: bool, fonts: &mut FontLibrary) {
        self.style.line_cap = cap;
        if redraw {
            self.render(self.pointer, fonts);
        }
    }

    pub fn set_line_join(&mut self, join: LineJoin, redraw: bool, fonts: &mut FontLibrary) {
        self.style.line_join = join;
        if redraw {
            self.render(self.pointer, fonts);
        }
    }

    /// Global alpha stays inside 0..=1; out-of-range values are ignored.
    pub fn set_alpha(&mut self, alpha: f64, redraw: bool, fonts: &mut FontLibrary) {
        if !alpha.is_finite() || !(0.0..=1.0).contains(&alpha) {
            return;
        }
        self.style.alpha = alpha;
        if redraw {
            self.render(self.pointer, fonts);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
