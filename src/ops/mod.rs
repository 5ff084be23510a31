// ============================================================================
// OPS MODULE — Pixel-level operations behind the canvas
// ============================================================================
//
// Architecture:
//   shapes.rs    — signed distance fields, coverage and pixel blending
//   fill.rs      — scanline flood fill over exactly-matching pixels
//   filters.rs   — whole-surface filters (grayscale, noise, blur, warp, ...)
//   text.rs      — system font lookup, measurement and rasterization
//   transform.rs — affine matrices and the folded transform state
// ============================================================================

pub mod fill;
pub mod filters;
pub mod shapes;
pub mod text;
pub mod transform;
