// ============================================================================
// ERRORS — recoverable failure conditions surfaced to callers
// ============================================================================

use thiserror::Error;

/// Failures reported by layer and session operations.
///
/// History boundaries and bad indices are expected, recoverable conditions;
/// nothing here aborts the session or corrupts committed state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CanvasError {
    /// `undo` was called with no committed commands left.
    #[error("nothing to undo")]
    NothingToUndo,

    /// `redo` was called with no undone commands left.
    #[error("nothing to redo")]
    NothingToRedo,

    /// A coordinate fell outside the surface. The point is carried signed,
    /// so a seed left of the origin reports its real position.
    #[error("point ({x}, {y}) is outside the {width}x{height} surface")]
    OutOfBounds { x: i64, y: i64, width: u32, height: u32 },

    /// A layer index did not name an existing layer.
    #[error("layer {index} does not exist ({count} layers)")]
    InvalidLayer { index: usize, count: usize },

    /// Removing a layer would leave the session empty.
    #[error("cannot remove the last remaining layer")]
    LastLayer,

    /// A color string matched neither the `rgba(...)` nor the `#rrggbb` form.
    #[error("unrecognized color string {0:?}")]
    InvalidColor(String),
}
