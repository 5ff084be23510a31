// ============================================================================
// IMAGE FILTERS — the history-replayable pixel pipeline
// ============================================================================

use log::warn;
use rand::Rng;
use rayon::prelude::*;

/// Filter selector. Unknown names resolve to `None`, the identity filter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum FilterKind {
    #[default]
    None,
    Redemphasis,
    Grayscale,
    Reverse,
    Noise,
    Blur,
    Warp,
}

impl FilterKind {
    pub fn label(&self) -> &'static str {
        match self {
            FilterKind::None => "none",
            FilterKind::Redemphasis => "redemphasis",
            FilterKind::Grayscale => "grayscale",
            FilterKind::Reverse => "reverse",
            FilterKind::Noise => "noise",
            FilterKind::Blur => "blur",
            FilterKind::Warp => "warp",
        }
    }

    pub fn all() -> &'static [FilterKind] {
        &[
            FilterKind::None,
            FilterKind::Redemphasis,
            FilterKind::Grayscale,
            FilterKind::Reverse,
            FilterKind::Noise,
            FilterKind::Blur,
            FilterKind::Warp,
        ]
    }

    /// Case-insensitive lookup; unknown names degrade to the identity
    /// filter instead of failing the gesture.
    pub fn from_name(name: &str) -> FilterKind {
        match name.to_ascii_lowercase().as_str() {
            "redemphasis" => FilterKind::Redemphasis,
            "grayscale" => FilterKind::Grayscale,
            "reverse" => FilterKind::Reverse,
            "noise" => FilterKind::Noise,
            "blur" => FilterKind::Blur,
            "warp" => FilterKind::Warp,
            _ => FilterKind::None,
        }
    }
}

/// Runs `kind` over `input` (flat RGBA, row stride 4·width) and returns the
/// filtered buffer. The output always starts zeroed: filters that skip
/// pixels leave them transparent black. `None` means the surface keeps its
/// input, either because the filter is the identity or because it rejected
/// its amounts.
///
/// `rng` drives the noise filter. Replay hands in a deterministically
/// seeded generator so re-rendering a history reproduces the same pixels.
pub fn apply<R: Rng>(
    kind: FilterKind,
    input: &[u8],
    width: u32,
    amounts: &[f64],
    rng: &mut R,
) -> Option<Vec<u8>> {
    let result = match kind {
        FilterKind::None => None,
        FilterKind::Redemphasis => Some(redemphasis(input, width)),
        FilterKind::Grayscale => Some(grayscale(input, width)),
        FilterKind::Reverse => Some(reverse(input, width)),
        FilterKind::Noise => noise(input, amounts, rng),
        FilterKind::Blur => blur(input, amounts),
        FilterKind::Warp => Some(warp(input, width)),
    };
    if result.is_none() && kind != FilterKind::None {
        warn!("{} filter rejected amounts {amounts:?}", kind.label());
    }
    result
}

// ---------------------------------------------------------------------------
//  Per-pixel filters (row-parallel)
// ---------------------------------------------------------------------------

/// R → floor(1.5·R) saturating, G → 0, B and alpha copied.
fn redemphasis(input: &[u8], width: u32) -> Vec<u8> {
    per_pixel(input, width, |px| {
        [
            ((px[0] as u16 * 3) / 2).min(255) as u8,
            0,
            px[2],
            px[3],
        ]
    })
}

/// R = G = B = floor((R+G+B)/3), alpha copied.
fn grayscale(input: &[u8], width: u32) -> Vec<u8> {
    per_pixel(input, width, |px| {
        let mean = ((px[0] as u16 + px[1] as u16 + px[2] as u16) / 3) as u8;
        [mean, mean, mean, px[3]]
    })
}

/// Channel inversion, alpha copied. Self-inverse.
fn reverse(input: &[u8], width: u32) -> Vec<u8> {
    per_pixel(input, width, |px| {
        [255 - px[0], 255 - px[1], 255 - px[2], px[3]]
    })
}

fn per_pixel(input: &[u8], width: u32, op: impl Fn(&[u8]) -> [u8; 4] + Sync) -> Vec<u8> {
    let stride = width as usize * 4;
    let mut output = vec![0u8; input.len()];
    if stride == 0 {
        return output;
    }
    output
        .par_chunks_mut(stride)
        .zip(input.par_chunks(stride))
        .for_each(|(row_out, row_in)| {
            for (dst, src) in row_out.chunks_exact_mut(4).zip(row_in.chunks_exact(4)) {
                dst.copy_from_slice(&op(src));
            }
        });
    output
}

// ---------------------------------------------------------------------------
//  Flat-index filters (inherently sequential index arithmetic)
// ---------------------------------------------------------------------------

/// Overwrites n random pixels with a darkened sample (R>>1, G>>2, B>>1,
/// alpha copied). Everything else stays at the zeroed output, so
/// non-sampled pixels come out transparent black.
fn noise<R: Rng>(input: &[u8], amounts: &[f64], rng: &mut R) -> Option<Vec<u8>> {
    if amounts.len() < 3 {
        return None;
    }
    let width = checked_dim(amounts[0])?;
    let height = checked_dim(amounts[1])?;
    let n = checked_dim(amounts[2])?;

    let pixels = input.len() / 4;
    let mut output = vec![0u8; input.len()];
    for _ in 0..n {
        let x = if width == 0 { 0 } else { rng.gen_range(0..width) };
        let y = if height == 0 { 0 } else { rng.gen_range(0..height) };
        // Amounts beyond the real surface (or past usize entirely) land
        // outside the buffer; those samples fall on the zeroed output,
        // same as the source.
        if let Some(index) = y.checked_mul(width).and_then(|i| i.checked_add(x))
            && index < pixels
        {
            let p = index * 4;
            output[p] = input[p] >> 1;
            output[p + 1] = input[p + 1] >> 2;
            output[p + 2] = input[p + 2] >> 1;
            output[p + 3] = input[p + 3];
        }
    }
    Some(output)
}

/// 3×3 box blur over the flat channel array: every raw index averages the
/// in-range members of its 9-neighborhood at ±4 / ±4·width offsets. Row
/// boundaries therefore bleed channel values across neighboring pixels'
/// channels, byte-for-byte as inherited.
fn blur(input: &[u8], amounts: &[f64]) -> Option<Vec<u8>> {
    if amounts.is_empty() {
        return None;
    }
    // A stride past the whole buffer cannot reach a vertical neighbor, so
    // oversized widths clamp to the buffer length.
    let row = checked_dim(amounts[0])?.saturating_mul(4).min(input.len()) as i64;
    let len = input.len() as i64;

    let mut output = vec![0u8; input.len()];
    for i in 0..len {
        let neighbors = [
            i - 4 - row,
            i - row,
            i + 4 - row,
            i - 4,
            i,
            i + 4,
            i - 4 + row,
            i + row,
            i + 4 + row,
        ];
        let mut sum: u32 = 0;
        let mut num: u32 = 0;
        for idx in neighbors {
            if idx >= 0 && idx < len {
                sum += input[idx as usize] as u32;
                num += 1;
            }
        }
        output[i as usize] = (sum / num) as u8;
    }
    Some(output)
}

/// Sinusoidal row shift: out[i] = in[i + 4·width·dy] with
/// dy = floor(50·sin(π·col/180)) and col = (i mod 4·width)/4. Source
/// indices outside the buffer leave the zeroed output byte in place.
fn warp(input: &[u8], width: u32) -> Vec<u8> {
    let row = width as i64 * 4;
    let len = input.len() as i64;

    let mut output = vec![0u8; input.len()];
    if row == 0 {
        return output;
    }
    for i in 0..len {
        let col = (i % row) as f64 / 4.0;
        let dy = (50.0 * (col * std::f64::consts::PI / 180.0).sin()).floor() as i64;
        let src = i + row * dy;
        if src >= 0 && src < len {
            output[i as usize] = input[src as usize];
        }
    }
    output
}

/// Truncating non-negative dimension, `None` on NaN/negative input.
fn checked_dim(value: f64) -> Option<usize> {
    if !value.is_finite() {
        return None;
    }
    let v = value.trunc();
    if v < 0.0 {
        return None;
    }
    Some(v as usize)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn solid(width: u32, height: u32, px: [u8; 4]) -> Vec<u8> {
        px.repeat((width * height) as usize)
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test]
    fn unknown_names_degrade_to_identity() {
        assert_eq!(FilterKind::from_name("sepia"), FilterKind::None);
        assert_eq!(FilterKind::from_name("GRAYSCALE"), FilterKind::Grayscale);
        assert_eq!(
            apply(FilterKind::None, &solid(2, 2, [9, 9, 9, 9]), 2, &[], &mut rng()),
            None
        );
    }

    #[test]
    fn redemphasis_known_pixel() {
        let out = apply(FilterKind::Redemphasis, &[100, 150, 200, 255], 1, &[], &mut rng()).unwrap();
        assert_eq!(out, vec![150, 0, 200, 255]);
    }

    #[test]
    fn redemphasis_saturates_red() {
        let out = apply(FilterKind::Redemphasis, &[200, 0, 0, 255], 1, &[], &mut rng()).unwrap();
        assert_eq!(out[0], 255);
    }

    #[test]
    fn grayscale_flattens_channels() {
        let out = apply(FilterKind::Grayscale, &[10, 20, 40, 7], 1, &[], &mut rng()).unwrap();
        assert_eq!(out, vec![23, 23, 23, 7]);
    }

    #[test]
    fn reverse_is_self_inverse() {
        let input = [3, 150, 250, 128, 0, 255, 17, 4];
        let once = apply(FilterKind::Reverse, &input, 2, &[], &mut rng()).unwrap();
        let twice = apply(FilterKind::Reverse, &once, 2, &[], &mut rng()).unwrap();
        assert_eq!(twice, input);
    }

    #[test]
    fn noise_rejects_bad_amounts() {
        let input = solid(4, 4, [255, 255, 255, 255]);
        assert_eq!(apply(FilterKind::Noise, &input, 4, &[4.0, 4.0], &mut rng()), None);
        assert_eq!(
            apply(FilterKind::Noise, &input, 4, &[4.0, -1.0, 3.0], &mut rng()),
            None
        );
        assert_eq!(
            apply(FilterKind::Noise, &input, 4, &[f64::NAN, 4.0, 3.0], &mut rng()),
            None
        );
    }

    #[test]
    fn noise_samples_at_most_n_pixels_and_blanks_the_rest() {
        let input = solid(8, 8, [255, 255, 255, 255]);
        let out = apply(FilterKind::Noise, &input, 8, &[8.0, 8.0, 5.0], &mut rng()).unwrap();
        let mut sampled = 0;
        for px in out.chunks_exact(4) {
            match px {
                [127, 63, 127, 255] => sampled += 1,
                [0, 0, 0, 0] => {}
                other => panic!("unexpected pixel {other:?}"),
            }
        }
        assert!(sampled >= 1 && sampled <= 5);
    }

    #[test]
    fn noise_is_deterministic_for_a_given_seed() {
        let input = solid(8, 8, [200, 100, 50, 255]);
        let a = apply(FilterKind::Noise, &input, 8, &[8.0, 8.0, 12.0], &mut rng()).unwrap();
        let b = apply(FilterKind::Noise, &input, 8, &[8.0, 8.0, 12.0], &mut rng()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn noise_with_zero_samples_blanks_everything() {
        let input = solid(4, 4, [255, 255, 255, 255]);
        let out = apply(FilterKind::Noise, &input, 4, &[4.0, 4.0, 0.0], &mut rng()).unwrap();
        assert!(out.iter().all(|&b| b == 0));
    }

    #[test]
    fn noise_survives_astronomical_amounts() {
        // 1e18 passes the dimension check but indexes past usize; every
        // sample lands off-buffer and the output stays blanked.
        let input = solid(1, 1, [200, 200, 200, 255]);
        let out = apply(FilterKind::Noise, &input, 1, &[1e18, 1e18, 3.0], &mut rng()).unwrap();
        assert!(out.iter().all(|&b| b == 0));
    }

    #[test]
    fn blur_survives_astronomical_widths() {
        // A 5e18 row stride clamps to the buffer; a solid surface only
        // averages equal bytes either way.
        let input = solid(2, 2, [40, 40, 40, 255]);
        let out = apply(FilterKind::Blur, &input, 2, &[5e18], &mut rng()).unwrap();
        assert_eq!(out, input);
    }

    #[test]
    fn blur_on_single_pixel_is_identity() {
        let out = apply(FilterKind::Blur, &[40, 80, 120, 255], 1, &[1.0], &mut rng()).unwrap();
        assert_eq!(out, vec![40, 80, 120, 255]);
    }

    #[test]
    fn blur_averages_flat_neighbors() {
        // One 2-pixel row: index 0 sees itself and index 4 twice
        // (as right neighbor and as row-below neighbor).
        let input = [30, 0, 0, 255, 90, 0, 0, 255];
        let out = apply(FilterKind::Blur, &input, 2, &[2.0], &mut rng()).unwrap();
        assert_eq!(out[0], 70);
    }

    #[test]
    fn blur_rejects_bad_amounts() {
        let input = solid(2, 2, [1, 2, 3, 4]);
        assert_eq!(apply(FilterKind::Blur, &input, 2, &[], &mut rng()), None);
        assert_eq!(apply(FilterKind::Blur, &input, 2, &[-2.0], &mut rng()), None);
    }

    #[test]
    fn warp_keeps_column_zero_and_zeroes_dead_sources() {
        let (width, height) = (46u32, 40u32);
        let mut input = vec![0u8; (width * height * 4) as usize];
        for y in 0..height {
            for x in 0..width {
                let i = ((y * width + x) * 4) as usize;
                input[i..i + 4].fill(y as u8);
            }
        }
        let out = apply(FilterKind::Warp, &input, width, &[], &mut rng()).unwrap();

        // col 0: dy = 0, every byte copied in place.
        for y in 0..height {
            let i = (y * width * 4) as usize;
            assert_eq!(out[i], y as u8);
        }
        // col 45: dy = floor(50·sin(45°)) = 35.
        let at = |x: u32, y: u32| ((y * width + x) * 4) as usize;
        assert_eq!(out[at(45, 2)], 37);
        assert_eq!(out[at(45, 10)], 0, "source row 45 is out of range");
    }
}
