// ============================================================================
// TRANSFORM OPERATIONS — affine matrices and the absolute transform state
// ============================================================================

use crate::geometry::Point;

/// Which transform a gesture or history entry applies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TransformKind {
    #[default]
    Translate,
    Scale,
    Rotate,
}

impl TransformKind {
    pub fn label(&self) -> &'static str {
        match self {
            TransformKind::Translate => "translate",
            TransformKind::Scale => "scale",
            TransformKind::Rotate => "rotate",
        }
    }

    pub fn all() -> &'static [TransformKind] {
        &[
            TransformKind::Translate,
            TransformKind::Scale,
            TransformKind::Rotate,
        ]
    }

    /// Case-insensitive name lookup; unknown names yield `None` so callers
    /// can keep their current kind.
    pub fn from_name(name: &str) -> Option<TransformKind> {
        match name.to_ascii_lowercase().as_str() {
            "translate" => Some(TransformKind::Translate),
            "scale" => Some(TransformKind::Scale),
            "rotate" => Some(TransformKind::Rotate),
            _ => None,
        }
    }
}

/// A 2D affine matrix in the 2×3 form used by immediate-mode canvases:
/// `x' = a·x + c·y + e`, `y' = b·x + d·y + f`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Affine {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Affine {
    pub const IDENTITY: Affine = Affine {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    pub fn translation(tx: f64, ty: f64) -> Affine {
        Affine {
            e: tx,
            f: ty,
            ..Affine::IDENTITY
        }
    }

    pub fn rotation(radians: f64) -> Affine {
        let (sin, cos) = radians.sin_cos();
        Affine {
            a: cos,
            b: sin,
            c: -sin,
            d: cos,
            e: 0.0,
            f: 0.0,
        }
    }

    /// Scale and translation in one matrix, the trailing factor of the
    /// translate/scale composition.
    pub fn scale_translate(sx: f64, sy: f64, tx: f64, ty: f64) -> Affine {
        Affine {
            a: sx,
            b: 0.0,
            c: 0.0,
            d: sy,
            e: tx,
            f: ty,
        }
    }

    pub fn is_identity(&self) -> bool {
        *self == Affine::IDENTITY
    }

    /// Matrix product `self × rhs` (column vectors: `self` applies last).
    pub fn mul(&self, rhs: &Affine) -> Affine {
        Affine {
            a: self.a * rhs.a + self.c * rhs.b,
            b: self.b * rhs.a + self.d * rhs.b,
            c: self.a * rhs.c + self.c * rhs.d,
            d: self.b * rhs.c + self.d * rhs.d,
            e: self.a * rhs.e + self.c * rhs.f + self.e,
            f: self.b * rhs.e + self.d * rhs.f + self.f,
        }
    }

    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }

    /// Maps a direction, ignoring translation.
    pub fn apply_vector(&self, x: f64, y: f64) -> (f64, f64) {
        (self.a * x + self.c * y, self.b * x + self.d * y)
    }

    /// Inverse matrix; `None` on (near-)singular input, in which case the
    /// image of the plane is degenerate and there is nothing to sample.
    pub fn invert(&self) -> Option<Affine> {
        let det = self.a * self.d - self.b * self.c;
        if det.abs() < 1e-12 {
            return None;
        }
        let inv = 1.0 / det;
        Some(Affine {
            a: self.d * inv,
            b: -self.b * inv,
            c: -self.c * inv,
            d: self.a * inv,
            e: (self.c * self.f - self.d * self.e) * inv,
            f: (self.b * self.e - self.a * self.f) * inv,
        })
    }
}

/// Absolute per-layer transform amounts. Each transform call overwrites its
/// own component; the others persist.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TransformState {
    pub translate_x: f64,
    pub translate_y: f64,
    pub scale_x: f64,
    pub scale_y: f64,
    /// Radians.
    pub rotate: f64,
}

impl Default for TransformState {
    fn default() -> Self {
        TransformState {
            translate_x: 0.0,
            translate_y: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            rotate: 0.0,
        }
    }
}

impl TransformState {
    /// Folds absolute `amounts` for `kind` into the state. Short or
    /// non-finite amounts leave the state untouched and report `false` so
    /// callers can treat the whole call as a no-op.
    pub fn fold(&mut self, kind: TransformKind, amounts: &[f64]) -> bool {
        match kind {
            TransformKind::Translate => {
                if let [dx, dy, ..] = amounts
                    && dx.is_finite()
                    && dy.is_finite()
                {
                    self.translate_x = *dx;
                    self.translate_y = *dy;
                    return true;
                }
            }
            TransformKind::Scale => {
                if let [sx, sy, ..] = amounts
                    && sx.is_finite()
                    && sy.is_finite()
                {
                    self.scale_x = *sx;
                    self.scale_y = *sy;
                    return true;
                }
            }
            TransformKind::Rotate => {
                if let [degrees, ..] = amounts
                    && degrees.is_finite()
                {
                    self.rotate = degrees.to_radians();
                    return true;
                }
            }
        }
        false
    }

    /// Composes the drawing matrix about `center`. The rotation pivot wraps
    /// either side of the scale/translate factor depending on which kind is
    /// being applied: translate/scale use `T(c) × R × T(−c) × (S∘T)`,
    /// rotate uses `(S∘T) × T(c) × R × T(−c)`.
    pub fn matrix(&self, kind: TransformKind, center: Point) -> Affine {
        let pivot = Affine::translation(center.x(), center.y())
            .mul(&Affine::rotation(self.rotate))
            .mul(&Affine::translation(-center.x(), -center.y()));
        let scale_translate = Affine::scale_translate(
            self.scale_x,
            self.scale_y,
            self.translate_x,
            self.translate_y,
        );

        match kind {
            TransformKind::Translate | TransformKind::Scale => pivot.mul(&scale_translate),
            TransformKind::Rotate => scale_translate.mul(&pivot),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: (f64, f64), b: (f64, f64)) {
        assert!(
            (a.0 - b.0).abs() < 1e-9 && (a.1 - b.1).abs() < 1e-9,
            "{a:?} != {b:?}"
        );
    }

    #[test]
    fn identity_round_trip() {
        let m = Affine::IDENTITY;
        assert_close(m.apply(3.0, 4.0), (3.0, 4.0));
        assert_eq!(m.invert(), Some(m));
    }

    #[test]
    fn inverse_undoes_compose() {
        let m = Affine::translation(10.0, -4.0)
            .mul(&Affine::rotation(0.7))
            .mul(&Affine::scale_translate(2.0, 0.5, 3.0, 3.0));
        let inv = m.invert().unwrap();
        let (x, y) = m.apply(5.0, 6.0);
        assert_close(inv.apply(x, y), (5.0, 6.0));
    }

    #[test]
    fn singular_matrix_has_no_inverse() {
        let m = Affine::scale_translate(0.0, 1.0, 0.0, 0.0);
        assert_eq!(m.invert(), None);
    }

    #[test]
    fn fold_sets_absolute_amounts() {
        let mut state = TransformState::default();
        state.fold(TransformKind::Translate, &[5.0, 6.0]);
        state.fold(TransformKind::Translate, &[1.0, 2.0]);
        assert_eq!((state.translate_x, state.translate_y), (1.0, 2.0));

        state.fold(TransformKind::Rotate, &[90.0]);
        assert!((state.rotate - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
    }

    #[test]
    fn fold_rejects_short_or_non_finite_amounts() {
        let mut state = TransformState::default();
        assert!(!state.fold(TransformKind::Scale, &[2.0]));
        assert_eq!((state.scale_x, state.scale_y), (1.0, 1.0));
        assert!(!state.fold(TransformKind::Scale, &[f64::NAN, 2.0]));
        assert_eq!((state.scale_x, state.scale_y), (1.0, 1.0));
        assert!(state.fold(TransformKind::Scale, &[2.0, 3.0]));
        assert_eq!((state.scale_x, state.scale_y), (2.0, 3.0));
    }

    #[test]
    fn rotation_pivots_about_center() {
        let mut state = TransformState::default();
        state.fold(TransformKind::Rotate, &[180.0]);
        let m = state.matrix(TransformKind::Rotate, Point::new(10.0, 10.0));
        assert_close(m.apply(10.0, 10.0), (10.0, 10.0));
        assert_close(m.apply(12.0, 10.0), (8.0, 10.0));
    }

    #[test]
    fn translate_ordering_applies_offset_before_pivot() {
        let mut state = TransformState::default();
        state.fold(TransformKind::Rotate, &[90.0]);
        state.fold(TransformKind::Translate, &[100.0, 0.0]);
        let m = state.matrix(TransformKind::Translate, Point::new(0.0, 0.0));
        // Pivot at origin: the point is offset first, then rotated 90°.
        assert_close(m.apply(1.0, 0.0), (0.0, 101.0));
    }

    #[test]
    fn unknown_kind_name_is_none() {
        assert_eq!(TransformKind::from_name("skew"), None);
        assert_eq!(
            TransformKind::from_name("ROTATE"),
            Some(TransformKind::Rotate)
        );
    }
}
