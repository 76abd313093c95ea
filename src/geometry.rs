//! Basic geometry primitives used by placement, plus the two pieces of ICCCM
//! geometry every client carries: its gravity and its size constraints

use serde::{Deserialize, Serialize};
use std::fmt;

// ================================ Point ================================= [[[

/// A position on a root window
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct Point {
    pub(crate) x: i32,
    pub(crate) y: i32,
}

impl Point {
    /// Create a new [`Point`]
    pub(crate) const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance between two points
    pub(crate) fn distance(self, other: Self) -> f64 {
        let dx = f64::from(self.x - other.x);
        let dy = f64::from(self.y - other.y);
        dx.hypot(dy)
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "x: {}, y: {}", self.x, self.y)
    }
}

// ]]] === Point ===

// ============================== Rectangle =============================== [[[

/// An axis-aligned rectangle. Width and height are signed so that the
/// arithmetic done on client geometry never has to cast back and forth.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub(crate) struct Rectangle {
    pub(crate) x:      i32,
    pub(crate) y:      i32,
    pub(crate) width:  i32,
    pub(crate) height: i32,
}

impl Rectangle {
    /// Create a new [`Rectangle`]
    pub(crate) const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Area, widened so large monitors cannot overflow
    pub(crate) fn area(&self) -> i64 {
        i64::from(self.width) * i64::from(self.height)
    }

    /// One past the rightmost column
    pub(crate) const fn right(&self) -> i32 {
        self.x + self.width
    }

    /// One past the bottom row
    pub(crate) const fn bottom(&self) -> i32 {
        self.y + self.height
    }

    /// Midpoint of the rectangle
    pub(crate) const fn center(&self) -> Point {
        Point::new(self.x + self.width / 2, self.y + self.height / 2)
    }

    /// Grow the rectangle outwards by a border of width `bw` on every side
    pub(crate) const fn with_border(&self, bw: i32) -> Self {
        Self::new(
            self.x - bw,
            self.y - bw,
            self.width + 2 * bw,
            self.height + 2 * bw,
        )
    }

    /// Area shared by two rectangles, zero when disjoint
    pub(crate) fn intersection_area(&self, other: &Self) -> i64 {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = self.right().min(other.right());
        let y2 = self.bottom().min(other.bottom());

        if x2 <= x1 || y2 <= y1 {
            return 0;
        }

        i64::from(x2 - x1) * i64::from(y2 - y1)
    }

    /// Whether a point lies within the rectangle
    pub(crate) const fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x < self.right() && p.y >= self.y && p.y < self.bottom()
    }
}

/// Formatted the way X geometry strings are written: `WxH+X+Y`
impl fmt::Display for Rectangle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}x{}{:+}{:+}", self.width, self.height, self.x, self.y)
    }
}

// ]]] === Rectangle ===

// =============================== Gravity ================================ [[[

/// ICCCM window gravity. `Static` and any unknown value behave as
/// `NorthWest`, which is how the protocol's default is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Gravity {
    NorthWest,
    North,
    NorthEast,
    West,
    Center,
    East,
    SouthWest,
    South,
    SouthEast,
    Static,
}

impl Default for Gravity {
    fn default() -> Self {
        Self::NorthWest
    }
}

impl From<u32> for Gravity {
    fn from(value: u32) -> Self {
        match value {
            2 => Self::North,
            3 => Self::NorthEast,
            4 => Self::West,
            5 => Self::Center,
            6 => Self::East,
            7 => Self::SouthWest,
            8 => Self::South,
            9 => Self::SouthEast,
            10 => Self::Static,
            _ => Self::NorthWest,
        }
    }
}

impl Gravity {
    /// Offset applied to a client's position when a border of width `bw` is
    /// added, so the reference point of the gravity does not move on screen
    pub(crate) const fn border_offset(self, bw: i32) -> (i32, i32) {
        match self {
            Self::NorthWest | Self::Static => (bw, bw),
            Self::North => (0, bw),
            Self::NorthEast => (-bw, bw),
            Self::West => (bw, 0),
            Self::Center => (0, 0),
            Self::East => (-bw, 0),
            Self::SouthWest => (bw, -bw),
            Self::South => (0, -bw),
            Self::SouthEast => (-bw, -bw),
        }
    }

    /// How far the origin must move back when the size grows by `(dw, dh)`
    /// so that the anchored edge stays put
    pub(crate) const fn resize_shift(self, dw: i32, dh: i32) -> (i32, i32) {
        match self {
            Self::NorthWest | Self::Static => (0, 0),
            Self::North => (dw / 2, 0),
            Self::NorthEast => (dw, 0),
            Self::West => (0, dh / 2),
            Self::Center => (dw / 2, dh / 2),
            Self::East => (dw, dh / 2),
            Self::SouthWest => (0, dh),
            Self::South => (dw / 2, dh),
            Self::SouthEast => (dw, dh),
        }
    }
}

// ]]] === Gravity ===

// ============================ SizeConstraints =========================== [[[

/// Size constraints derived from `WM_NORMAL_HINTS`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SizeConstraints {
    pub(crate) min_width:   i32,
    pub(crate) min_height:  i32,
    /// Zero means unbounded
    pub(crate) max_width:   i32,
    /// Zero means unbounded
    pub(crate) max_height:  i32,
    pub(crate) base_width:  i32,
    pub(crate) base_height: i32,
    /// Always at least one
    pub(crate) width_inc:   i32,
    /// Always at least one
    pub(crate) height_inc:  i32,
}

impl Default for SizeConstraints {
    fn default() -> Self {
        Self {
            min_width:   1,
            min_height:  1,
            max_width:   0,
            max_height:  0,
            base_width:  0,
            base_height: 0,
            width_inc:   1,
            height_inc:  1,
        }
    }
}

/// Clamp one dimension to `[min, max]` (`max == 0` is unbounded)
pub(crate) const fn bound(value: i32, min: i32, max: i32) -> i32 {
    let mut v = value;
    if v < min {
        v = min;
    }
    if max > 0 && v > max {
        v = max;
    }
    v
}

/// Clamp then quantize a single dimension. Quantizing only ever rounds down
/// onto the `base + k * inc` lattice, so the maximum still holds afterwards
/// and only the minimum needs restoring.
const fn clamp_axis(value: i32, min: i32, max: i32, base: i32, inc: i32) -> i32 {
    let mut v = bound(value, min, max);
    if inc > 1 && v > base {
        v -= (v - base) % inc;
    }
    if v < min {
        v = min;
    }
    v
}

impl SizeConstraints {
    /// Clamp and quantize a width
    pub(crate) const fn clamp_width(&self, width: i32) -> i32 {
        clamp_axis(
            width,
            self.min_width,
            self.max_width,
            self.base_width,
            self.width_inc,
        )
    }

    /// Clamp and quantize a height
    pub(crate) const fn clamp_height(&self, height: i32) -> i32 {
        clamp_axis(
            height,
            self.min_height,
            self.max_height,
            self.base_height,
            self.height_inc,
        )
    }

    /// Whether the client cannot be resized at all
    pub(crate) const fn is_fixed_size(&self) -> bool {
        self.max_width != 0
            && self.max_height != 0
            && self.max_width == self.min_width
            && self.max_height == self.min_height
    }

    /// Size expressed in increments, as shown to the user
    pub(crate) const fn in_increments(&self, width: i32, height: i32) -> (i32, i32) {
        (
            (width - self.base_width) / self.width_inc,
            (height - self.base_height) / self.height_inc,
        )
    }
}

// ]]] === SizeConstraints ===

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rectangle_intersection() {
        let a = Rectangle::new(0, 0, 100, 100);
        let b = Rectangle::new(50, 50, 100, 100);
        let c = Rectangle::new(100, 0, 10, 10);

        assert_eq!(a.intersection_area(&b), 2500);
        assert_eq!(b.intersection_area(&a), 2500);
        // Touching edges do not intersect
        assert_eq!(a.intersection_area(&c), 0);
        assert_eq!(a.with_border(2), Rectangle::new(-2, -2, 104, 104));
    }

    #[test]
    fn rectangle_display() {
        assert_eq!(Rectangle::new(-5, 10, 80, 24).to_string(), "80x24-5+10");
    }

    #[test]
    fn gravity_offsets() {
        assert_eq!(Gravity::from(0), Gravity::NorthWest);
        assert_eq!(Gravity::from(9), Gravity::SouthEast);
        assert_eq!(Gravity::NorthWest.border_offset(3), (3, 3));
        assert_eq!(Gravity::SouthEast.border_offset(3), (-3, -3));
        assert_eq!(Gravity::Center.border_offset(3), (0, 0));
        assert_eq!(Gravity::Static.border_offset(3), (3, 3));
        assert_eq!(Gravity::East.resize_shift(10, 10), (10, 5));
        assert_eq!(Gravity::NorthWest.resize_shift(10, 10), (0, 0));
    }

    #[test]
    fn clamping_is_idempotent() {
        let hints = SizeConstraints {
            min_width:   20,
            min_height:  15,
            max_width:   500,
            max_height:  0,
            base_width:  4,
            base_height: 3,
            width_inc:   7,
            height_inc:  13,
        };

        for w in [0, 1, 19, 20, 21, 57, 300, 499, 500, 501, 9000] {
            let once = hints.clamp_width(w);
            assert_eq!(hints.clamp_width(once), once, "width {}", w);
            assert!(once >= hints.min_width && once <= hints.max_width);
        }

        for h in [0, 14, 15, 16, 100, 4000] {
            let once = hints.clamp_height(h);
            assert_eq!(hints.clamp_height(once), once, "height {}", h);
        }

        // On the lattice
        assert_eq!(hints.clamp_width(57), 53);
        assert_eq!(hints.clamp_height(100), 94);
    }

    #[test]
    fn fixed_size_detection() {
        let mut hints = SizeConstraints::default();
        assert!(!hints.is_fixed_size());
        hints.min_width = 100;
        hints.max_width = 100;
        hints.min_height = 50;
        hints.max_height = 50;
        assert!(hints.is_fixed_size());
    }
}
