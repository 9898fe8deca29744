//! Geometry primitives in global screen space
//!
//! Screen space has its origin at the bottom-left of the primary display and
//! y grows upward. `min_y` is therefore the bottom edge of a rectangle.

use serde::{Deserialize, Serialize};

/// Frames closer than this (in points) are considered identical.
pub const FRAME_TOLERANCE: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const ZERO: Size = Size {
        width: 0.0,
        height: 0.0,
    };

    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// A size with no area (or NaN) cannot be placed
    pub fn is_degenerate(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }

    pub fn approx_eq(&self, other: &Size) -> bool {
        (self.width - other.width).abs() <= FRAME_TOLERANCE
            && (self.height - other.height).abs() <= FRAME_TOLERANCE
    }
}

/// Axis-aligned rectangle in global screen coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScreenRect {
    pub origin: Point,
    pub size: Size,
}

impl ScreenRect {
    pub const ZERO: ScreenRect = ScreenRect {
        origin: Point { x: 0.0, y: 0.0 },
        size: Size::ZERO,
    };

    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            origin: Point { x, y },
            size: Size { width, height },
        }
    }

    pub fn from_origin_size(origin: Point, size: Size) -> Self {
        Self { origin, size }
    }

    pub fn min_x(&self) -> f64 {
        self.origin.x
    }

    pub fn min_y(&self) -> f64 {
        self.origin.y
    }

    pub fn max_x(&self) -> f64 {
        self.origin.x + self.size.width
    }

    pub fn max_y(&self) -> f64 {
        self.origin.y + self.size.height
    }

    pub fn mid_x(&self) -> f64 {
        self.origin.x + self.size.width / 2.0
    }

    pub fn mid_y(&self) -> f64 {
        self.origin.y + self.size.height / 2.0
    }

    pub fn width(&self) -> f64 {
        self.size.width
    }

    pub fn height(&self) -> f64 {
        self.size.height
    }

    pub fn is_degenerate(&self) -> bool {
        self.size.is_degenerate()
    }

    /// Same rectangle moved to `origin`
    pub fn with_origin(&self, origin: Point) -> Self {
        Self {
            origin,
            size: self.size,
        }
    }

    /// Same origin, new size. Used to resize "in place" without a jump.
    pub fn with_size(&self, size: Size) -> Self {
        Self {
            origin: self.origin,
            size,
        }
    }

    /// Shrink by `dx` on the left and right, `bottom` and `top` vertically
    pub fn inset(&self, dx: f64, bottom: f64, top: f64) -> Self {
        Self::new(
            self.origin.x + dx,
            self.origin.y + bottom,
            self.size.width - 2.0 * dx,
            self.size.height - bottom - top,
        )
    }

    pub fn contains_point(&self, point: Point) -> bool {
        point.x >= self.min_x()
            && point.x < self.max_x()
            && point.y >= self.min_y()
            && point.y < self.max_y()
    }

    /// True when `other` lies entirely inside `self` (edges may touch)
    pub fn contains_rect(&self, other: &ScreenRect) -> bool {
        const EPS: f64 = 1e-9;
        other.min_x() >= self.min_x() - EPS
            && other.max_x() <= self.max_x() + EPS
            && other.min_y() >= self.min_y() - EPS
            && other.max_y() <= self.max_y() + EPS
    }

    /// Tolerance-based equality on origin and size.
    ///
    /// Floating point noise from coordinate conversions must not register as
    /// a change, otherwise every frame update retriggers frame observers.
    pub fn approx_eq(&self, other: &ScreenRect) -> bool {
        (self.origin.x - other.origin.x).abs() <= FRAME_TOLERANCE
            && (self.origin.y - other.origin.y).abs() <= FRAME_TOLERANCE
            && self.size.approx_eq(&other.size)
    }
}

impl std::fmt::Display for ScreenRect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({:.1}, {:.1}, {:.1}x{:.1})",
            self.origin.x, self.origin.y, self.size.width, self.size.height
        )
    }
}
