// ============================================================================
// TEXT — font resolution and glyph rasterization
// ============================================================================

use std::collections::HashMap;

use ab_glyph::{Font as _, FontArc, GlyphId, ScaleFont, point};
use font_kit::family_name::FamilyName;
use font_kit::properties::{Properties, Style, Weight};
use font_kit::source::SystemSource;
use log::warn;

/// CSS-flavored font description carried by committed text.
#[derive(Clone, Debug, PartialEq)]
pub struct Font {
    pub family: String,
    pub size: f64,
    pub style: String,
    pub weight: String,
}

impl Font {
    /// Non-positive or non-finite sizes degrade to the default.
    pub fn new(family: &str, size: f64, style: &str, weight: &str) -> Font {
        Font {
            family: family.to_string(),
            size: if size.is_finite() && size > 0.0 { size } else { 16.0 },
            style: style.to_string(),
            weight: weight.to_string(),
        }
    }
}

impl Default for Font {
    fn default() -> Font {
        Font::new("Arial", 16.0, "normal", "normal")
    }
}

/// Font plus fill color, snapshotted into every text command.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct TextStyle {
    pub font: Font,
    pub color: crate::color::Color,
}

/// One rasterized line of text. `off_x`/`off_y` place the tile relative to
/// the baseline origin the line was laid out against.
pub struct TextTile {
    pub buf: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub off_x: i32,
    pub off_y: i32,
}

/// Resolves font descriptions against the system font set and caches the
/// loaded faces. Families that fail to resolve keep a `None` entry so the
/// system lookup is not repeated.
#[derive(Default)]
pub struct FontLibrary {
    cache: HashMap<(String, u16, bool), Option<FontArc>>,
}

impl FontLibrary {
    pub fn new() -> FontLibrary {
        FontLibrary { cache: HashMap::new() }
    }

    /// Registers font bytes for a description, bypassing the system lookup.
    /// Lets headless callers and tests supply deterministic faces. Returns
    /// false when the bytes hold no usable face.
    pub fn register(&mut self, font: &Font, data: Vec<u8>) -> bool {
        match FontArc::try_from_vec(data) {
            Ok(face) => {
                self.cache.insert(cache_key(font), Some(face));
                true
            }
            Err(_) => {
                warn!("unusable font data registered for family {:?}", font.family);
                false
            }
        }
    }

    fn resolve(&mut self, font: &Font) -> Option<FontArc> {
        let key = cache_key(font);
        if let Some(cached) = self.cache.get(&key) {
            return cached.clone();
        }
        let loaded = load_system_font(&font.family, weight_value(&font.weight), key.2);
        if loaded.is_none() {
            warn!("no system font for family {:?}; text will not render", font.family);
        }
        self.cache.insert(key, loaded.clone());
        loaded
    }

    /// Advance width of `text` in pixels. Zero when the family resolves to
    /// no usable face.
    pub fn measure(&mut self, font: &Font, text: &str) -> f64 {
        let Some(face) = self.resolve(font) else {
            return 0.0;
        };
        let scaled = face.as_scaled(font.size as f32);
        let mut cursor = 0.0f32;
        let mut last: Option<GlyphId> = None;
        for ch in text.chars() {
            let id = face.glyph_id(ch);
            if let Some(prev) = last {
                cursor += scaled.kern(prev, id);
            }
            cursor += scaled.h_advance(id);
            last = Some(id);
        }
        cursor as f64
    }

    /// Rasterizes a single line with its baseline origin at (0, 0).
    /// Returns `None` when nothing would be painted: unresolvable family,
    /// empty string, or whitespace only.
    pub fn rasterize(&mut self, font: &Font, text: &str, color: [u8; 4]) -> Option<TextTile> {
        let face = self.resolve(font)?;
        let size = font.size as f32;
        let scaled = face.as_scaled(size);

        // Lay the glyphs out along the baseline.
        let mut cursor = 0.0f32;
        let mut last: Option<GlyphId> = None;
        let mut outlined = Vec::new();
        for ch in text.chars() {
            let id = face.glyph_id(ch);
            if let Some(prev) = last {
                cursor += scaled.kern(prev, id);
            }
            let glyph = id.with_scale_and_position(size, point(cursor, 0.0));
            cursor += scaled.h_advance(id);
            last = Some(id);
            if let Some(og) = face.outline_glyph(glyph) {
                outlined.push(og);
            }
        }
        if outlined.is_empty() {
            return None;
        }

        let mut min_x = f32::MAX;
        let mut min_y = f32::MAX;
        let mut max_x = f32::MIN;
        let mut max_y = f32::MIN;
        for og in &outlined {
            let b = og.px_bounds();
            min_x = min_x.min(b.min.x);
            min_y = min_y.min(b.min.y);
            max_x = max_x.max(b.max.x);
            max_y = max_y.max(b.max.y);
        }

        let x0 = min_x.floor() as i32;
        let y0 = min_y.floor() as i32;
        let width = (max_x.ceil() as i32 - x0).max(1) as u32;
        let height = (max_y.ceil() as i32 - y0).max(1) as u32;

        let mut coverage = vec![0.0f32; width as usize * height as usize];
        for og in &outlined {
            let b = og.px_bounds();
            og.draw(|px, py, cov| {
                let ix = (b.min.x + px as f32).round() as i32 - x0;
                let iy = (b.min.y + py as f32).round() as i32 - y0;
                if ix >= 0 && iy >= 0 && (ix as u32) < width && (iy as u32) < height {
                    let idx = iy as usize * width as usize + ix as usize;
                    coverage[idx] = coverage[idx].max(cov);
                }
            });
        }

        let mut buf = vec![0u8; width as usize * height as usize * 4];
        for (i, &cov) in coverage.iter().enumerate() {
            if cov > 0.001 {
                let idx = i * 4;
                buf[idx] = color[0];
                buf[idx + 1] = color[1];
                buf[idx + 2] = color[2];
                buf[idx + 3] = (color[3] as f32 * cov).round().min(255.0) as u8;
            }
        }

        Some(TextTile { buf, width, height, off_x: x0, off_y: y0 })
    }
}

/// Loads a face from the system by family name, with a sans-serif fallback
/// so ordinary families keep rendering even when the exact name is absent.
fn load_system_font(family: &str, weight: f32, italic: bool) -> Option<FontArc> {
    let mut props = Properties::new();
    props.weight = Weight(weight);
    if italic {
        props.style = Style::Italic;
    }

    let handle = SystemSource::new()
        .select_best_match(
            &[FamilyName::Title(family.to_string()), FamilyName::SansSerif],
            &props,
        )
        .ok()?;

    let font = handle.load().ok()?;
    let data = font.copy_font_data()?;
    FontArc::try_from_vec((*data).clone()).ok()
}

fn cache_key(font: &Font) -> (String, u16, bool) {
    (
        font.family.to_ascii_lowercase(),
        weight_value(&font.weight) as u16,
        is_italic(&font.style),
    )
}

/// CSS weight keywords and numeric strings, defaulting to regular.
fn weight_value(weight: &str) -> f32 {
    match weight.trim().to_ascii_lowercase().as_str() {
        "bold" => 700.0,
        "bolder" => 800.0,
        "lighter" => 300.0,
        "normal" | "" => 400.0,
        other => other.parse().unwrap_or(400.0),
    }
}

fn is_italic(style: &str) -> bool {
    matches!(style.trim().to_ascii_lowercase().as_str(), "italic" | "oblique")
}

// ============================================================================
// Tests
// ============================================================================
