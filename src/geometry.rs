// ============================================================================
// GEOMETRY — immutable shape records with forgiving constructors
// ============================================================================

/// A 2D point. Non-finite coordinates degrade to 0.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Point {
    x: f64,
    y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Point {
            x: finite_or_zero(x),
            y: finite_or_zero(y),
        }
    }

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn y(&self) -> f64 {
        self.y
    }

    /// Component-wise `to − from`.
    pub fn offset(from: Point, to: Point) -> Point {
        Point::new(to.x - from.x, to.y - from.y)
    }

    /// Euclidean distance between two points.
    pub fn distance(a: Point, b: Point) -> f64 {
        ((b.x - a.x).powi(2) + (b.y - a.y).powi(2)).sqrt()
    }
}

/// An axis-aligned rectangle anchored at its top-left corner.
/// Negative or non-finite width/height degrade to 0, so a drag toward the
/// upper-left commits a degenerate rectangle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rectangle {
    left: f64,
    top: f64,
    width: f64,
    height: f64,
}

impl Rectangle {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Rectangle {
            left: finite_or_zero(left),
            top: finite_or_zero(top),
            width: positive_or_zero(width),
            height: positive_or_zero(height),
        }
    }

    pub fn left(&self) -> f64 {
        self.left
    }

    pub fn top(&self) -> f64 {
        self.top
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn center(&self) -> Point {
        Point::new(self.left + self.width / 2.0, self.top + self.height / 2.0)
    }
}

/// A circle described by its center and radius. Negative or non-finite
/// radius degrades to 0.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Circle {
    center_x: f64,
    center_y: f64,
    radius: f64,
}

impl Circle {
    pub fn new(center_x: f64, center_y: f64, radius: f64) -> Self {
        Circle {
            center_x: finite_or_zero(center_x),
            center_y: finite_or_zero(center_y),
            radius: positive_or_zero(radius),
        }
    }

    pub fn center_x(&self) -> f64 {
        self.center_x
    }

    pub fn center_y(&self) -> f64 {
        self.center_y
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn center(&self) -> Point {
        Point::new(self.center_x, self.center_y)
    }
}

/// A line segment between two points.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Line {
    start: Point,
    end: Point,
}

impl Line {
    pub fn new(start: Point, end: Point) -> Self {
        Line { start, end }
    }

    pub fn start(&self) -> Point {
        self.start
    }

    pub fn end(&self) -> Point {
        self.end
    }

    /// Center of the endpoint bounding box.
    pub fn center(&self) -> Point {
        let min_x = self.start.x.min(self.end.x);
        let min_y = self.start.y.min(self.end.y);
        let max_x = self.start.x.max(self.end.x);
        let max_y = self.start.y.max(self.end.y);

        Point::new((max_x - min_x) / 2.0 + min_x, (max_y - min_y) / 2.0 + min_y)
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}

fn positive_or_zero(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

// ============================================================================
// Tests
// ============================================================================
