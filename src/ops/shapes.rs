// ============================================================================
// SHAPE RASTERIZATION — signed distance fields, coverage, pixel blending
// ============================================================================

/// Stroke end-cap shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum LineCap {
    #[default]
    Butt,
    Round,
    Square,
}

impl LineCap {
    pub fn label(&self) -> &'static str {
        match self {
            LineCap::Butt => "butt",
            LineCap::Round => "round",
            LineCap::Square => "square",
        }
    }

    pub fn all() -> &'static [LineCap] {
        &[LineCap::Butt, LineCap::Round, LineCap::Square]
    }

    pub fn from_name(name: &str) -> Option<LineCap> {
        match name.to_ascii_lowercase().as_str() {
            "butt" => Some(LineCap::Butt),
            "round" => Some(LineCap::Round),
            "square" => Some(LineCap::Square),
            _ => None,
        }
    }
}

/// Stroke corner join. Validated and recorded for the style surface;
/// segments are stroked one at a time, so corners always come out
/// miter-like regardless of the setting.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum LineJoin {
    Bevel,
    Round,
    #[default]
    Miter,
}

impl LineJoin {
    pub fn label(&self) -> &'static str {
        match self {
            LineJoin::Bevel => "bevel",
            LineJoin::Round => "round",
            LineJoin::Miter => "miter",
        }
    }

    pub fn all() -> &'static [LineJoin] {
        &[LineJoin::Bevel, LineJoin::Round, LineJoin::Miter]
    }

    pub fn from_name(name: &str) -> Option<LineJoin> {
        match name.to_ascii_lowercase().as_str() {
            "bevel" => Some(LineJoin::Bevel),
            "round" => Some(LineJoin::Round),
            "miter" => Some(LineJoin::Miter),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
//  Signed distance fields (negative inside)
// ---------------------------------------------------------------------------

/// SDF for a box centred at origin with half-extents (hx, hy).
#[inline]
pub fn sdf_box(px: f64, py: f64, hx: f64, hy: f64) -> f64 {
    let dx = px.abs() - hx;
    let dy = py.abs() - hy;
    let outside = (dx.max(0.0) * dx.max(0.0) + dy.max(0.0) * dy.max(0.0)).sqrt();
    let inside = dx.max(dy).min(0.0);
    outside + inside
}

/// SDF for an ellipse centred at origin (approximation; exact for circles).
#[inline]
pub fn sdf_ellipse(px: f64, py: f64, rx: f64, ry: f64) -> f64 {
    if rx <= 0.0 || ry <= 0.0 {
        return f64::INFINITY;
    }
    let nx = px / rx;
    let ny = py / ry;
    let len = (nx * nx + ny * ny).sqrt();
    if len < 1e-12 {
        return -rx.min(ry);
    }
    // Distance from the normalized circle surface, scaled back.
    let scale = (rx * rx * ny * ny + ry * ry * nx * nx).sqrt() / (rx * ry * len);
    (len - 1.0) / scale
}

/// Distance from a point to a segment.
#[inline]
pub fn distance_to_segment(px: f64, py: f64, ax: f64, ay: f64, bx: f64, by: f64) -> f64 {
    let dx = bx - ax;
    let dy = by - ay;
    let len_sq = dx * dx + dy * dy;
    if len_sq < 1e-24 {
        return ((px - ax) * (px - ax) + (py - ay) * (py - ay)).sqrt();
    }
    let t = (((px - ax) * dx + (py - ay) * dy) / len_sq).clamp(0.0, 1.0);
    let cx = ax + t * dx;
    let cy = ay + t * dy;
    ((px - cx) * (px - cx) + (py - cy) * (py - cy)).sqrt()
}

/// Signed distance to the ink of a stroked segment of half-width `half`.
/// A zero-length segment has no direction and draws nothing, like an
/// immediate-mode canvas.
pub fn sdf_stroke_segment(
    px: f64,
    py: f64,
    ax: f64,
    ay: f64,
    bx: f64,
    by: f64,
    half: f64,
    cap: LineCap,
) -> f64 {
    let dx = bx - ax;
    let dy = by - ay;
    let len = (dx * dx + dy * dy).sqrt();
    if len < 1e-12 {
        return f64::INFINITY;
    }

    match cap {
        LineCap::Round => distance_to_segment(px, py, ax, ay, bx, by) - half,
        LineCap::Butt | LineCap::Square => {
            // Segment space: origin at the midpoint, x along the segment.
            let ux = dx / len;
            let uy = dy / len;
            let mx = (ax + bx) * 0.5;
            let my = (ay + by) * 0.5;
            let along = (px - mx) * ux + (py - my) * uy;
            let across = -(px - mx) * uy + (py - my) * ux;
            let extend = if cap == LineCap::Square { half } else { 0.0 };
            sdf_box(along, across, len * 0.5 + extend, half)
        }
    }
}

// ---------------------------------------------------------------------------
//  Coverage and blending
// ---------------------------------------------------------------------------

/// Smoothstep between edge0 and edge1.
#[inline]
pub fn smoothstep(edge0: f64, edge1: f64, x: f64) -> f64 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Pixel coverage for signed distance `d` with anti-alias half-width `aa`.
#[inline]
pub fn coverage(d: f64, aa: f64) -> f64 {
    1.0 - smoothstep(-aa, aa, d)
}

/// Source-over onto a straight-alpha RGBA pixel. `src_alpha` folds
/// coverage, the global alpha and the color's own alpha into 0..=1.
#[inline(always)]
pub fn blend_source_over(dst: &mut [u8], color: [u8; 4], src_alpha: f64) {
    if src_alpha <= 0.0 {
        return;
    }
    let sa = src_alpha.min(1.0) * (color[3] as f64 / 255.0);
    if sa <= 0.0 {
        return;
    }
    let da = dst[3] as f64 / 255.0;
    let out_a = sa + da * (1.0 - sa);
    for c in 0..3 {
        let s = color[c] as f64;
        let d = dst[c] as f64;
        dst[c] = (((s * sa) + d * da * (1.0 - sa)) / out_a)
            .round()
            .clamp(0.0, 255.0) as u8;
    }
    dst[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
}

/// Destination-out onto a straight-alpha RGBA pixel: the destination keeps
/// `1 − src_alpha` of its alpha. A fully erased pixel re-normalizes to
/// transparent black, like a canvas backing store read back out.
#[inline(always)]
pub fn blend_destination_out(dst: &mut [u8], src_alpha: f64) {
    if src_alpha <= 0.0 {
        return;
    }
    let keep = 1.0 - src_alpha.min(1.0);
    let out_a = (dst[3] as f64 * keep).round().clamp(0.0, 255.0) as u8;
    if out_a == 0 {
        dst.fill(0);
    } else {
        dst[3] = out_a;
    }
}

// ============================================================================
// Tests
// ============================================================================
