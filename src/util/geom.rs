//! Canvas geometry.
//!
//! MNG positions and clip boundaries are signed 32-bit canvas coordinates;
//! right and bottom edges are exclusive.

/// A point on the canvas.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Component-wise sum, saturating.
    #[inline]
    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self { x: self.x.saturating_add(dx), y: self.y.saturating_add(dy) }
    }
}

/// A rectangle with exclusive right/bottom edges.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rect {
    pub left: i32,
    pub right: i32,
    pub top: i32,
    pub bottom: i32,
}

impl Rect {
    pub const fn new(left: i32, right: i32, top: i32, bottom: i32) -> Self {
        Self { left, right, top, bottom }
    }

    /// Rectangle at `origin` covering `width` x `height`.
    pub fn from_size(origin: Point, width: u32, height: u32) -> Self {
        Self {
            left: origin.x,
            right: origin.x.saturating_add(width.min(i32::MAX as u32) as i32),
            top: origin.y,
            bottom: origin.y.saturating_add(height.min(i32::MAX as u32) as i32),
        }
    }

    /// Rectangle that clips nothing.
    pub const fn unbounded() -> Self {
        Self { left: i32::MIN, right: i32::MAX, top: i32::MIN, bottom: i32::MAX }
    }

    #[inline]
    pub const fn width(&self) -> u32 {
        if self.right > self.left { (self.right as i64 - self.left as i64) as u32 } else { 0 }
    }

    #[inline]
    pub const fn height(&self) -> u32 {
        if self.bottom > self.top { (self.bottom as i64 - self.top as i64) as u32 } else { 0 }
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.right <= self.left || self.bottom <= self.top
    }

    #[inline]
    pub const fn contains(&self, p: Point) -> bool {
        p.x >= self.left && p.x < self.right && p.y >= self.top && p.y < self.bottom
    }

    /// Overlap of two rectangles (possibly empty).
    pub fn intersect(&self, other: &Rect) -> Rect {
        Rect {
            left: self.left.max(other.left),
            right: self.right.min(other.right),
            top: self.top.max(other.top),
            bottom: self.bottom.min(other.bottom),
        }
    }

    /// Shift all edges, saturating.
    pub fn offset(&self, dx: i32, dy: i32) -> Rect {
        Rect {
            left: self.left.saturating_add(dx),
            right: self.right.saturating_add(dx),
            top: self.top.saturating_add(dy),
            bottom: self.bottom.saturating_add(dy),
        }
    }
}
