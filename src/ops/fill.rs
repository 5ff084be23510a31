// ============================================================================
// FLOOD FILL — scanline seed fill with exact color matching
// ============================================================================

use crate::error::CanvasError;

/// Paints the 4-connected region of pixels that share the seed's exact RGBA
/// bytes. `buffer` is flat RGBA with row stride 4·width. The seed must lie
/// on the surface; seeding a pixel that already has the fill color is a
/// no-op.
pub fn flood_fill(
    buffer: &mut [u8],
    width: u32,
    height: u32,
    x: u32,
    y: u32,
    fill: [u8; 4],
) -> Result<(), CanvasError> {
    if x >= width || y >= height {
        return Err(CanvasError::OutOfBounds {
            x: i64::from(x),
            y: i64::from(y),
            width,
            height,
        });
    }
    let w = width as usize;
    let h = height as usize;
    let base = pixel(buffer, w, x as usize, y as usize);
    if base == fill {
        return Ok(());
    }

    let mut stack = vec![(x as usize, y as usize)];
    while let Some((x, y)) = stack.pop() {
        // A seed can be painted over between push and pop.
        if pixel(buffer, w, x, y) == fill {
            continue;
        }
        let mut left = x;
        let mut right = x;
        while left > 0 && pixel(buffer, w, left - 1, y) == base {
            left -= 1;
        }
        while right + 1 < w && pixel(buffer, w, right + 1, y) == base {
            right += 1;
        }
        for px in left..=right {
            put_pixel(buffer, w, px, y, fill);
        }
        if y > 0 {
            scan_horizon(buffer, w, left, right, y - 1, base, &mut stack);
        }
        if y + 1 < h {
            scan_horizon(buffer, w, left, right, y + 1, base, &mut stack);
        }
    }
    Ok(())
}

/// Pushes one seed per maximal run of base-colored pixels inside
/// `left..=right` on row `y`: the rightmost pixel of each run. The seed
/// re-expands past the span bounds when popped, so one per run suffices.
fn scan_horizon(
    buffer: &[u8],
    w: usize,
    left: usize,
    right: usize,
    y: usize,
    base: [u8; 4],
    stack: &mut Vec<(usize, usize)>,
) {
    let mut in_run = false;
    for x in left..=right {
        if pixel(buffer, w, x, y) == base {
            in_run = true;
        } else if in_run {
            stack.push((x - 1, y));
            in_run = false;
        }
    }
    if in_run {
        stack.push((right, y));
    }
}

#[inline(always)]
fn pixel(buffer: &[u8], w: usize, x: usize, y: usize) -> [u8; 4] {
    let i = (y * w + x) * 4;
    [buffer[i], buffer[i + 1], buffer[i + 2], buffer[i + 3]]
}

#[inline(always)]
fn put_pixel(buffer: &mut [u8], w: usize, x: usize, y: usize, px: [u8; 4]) {
    let i = (y * w + x) * 4;
    buffer[i..i + 4].copy_from_slice(&px);
}

// ============================================================================
// Tests
// ============================================================================
