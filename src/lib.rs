//! Layered raster drawing engine with a replayable command history.
//!
//! Every layer keeps the commands that produced it (strokes, figures, text,
//! images, filters, transforms) next to a history pointer; undo, redo,
//! restyling and transforms all work by replaying that history onto the
//! pixel buffer. [`Session`] drives the whole stack from pointer gestures.

pub mod canvas;
pub mod color;
pub mod command;
pub mod error;
pub mod geometry;
pub mod ops;
pub mod session;

pub use canvas::{DEFAULT_HEIGHT, DEFAULT_WIDTH, DrawStyle, Layer, Surface};
pub use color::Color;
pub use command::{Command, StrokePoint};
pub use error::CanvasError;
pub use geometry::{Circle, Line, Point, Rectangle};
pub use ops::filters::FilterKind;
pub use ops::shapes::{LineCap, LineJoin};
pub use ops::text::{Font, FontLibrary, TextStyle};
pub use ops::transform::{Affine, TransformKind, TransformState};
pub use session::{FigureKind, Mode, PendingText, Session};
