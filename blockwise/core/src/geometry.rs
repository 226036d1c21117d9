use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// An unsigned 3D point or extent in voxels
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Point3 {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

impl Point3 {
    pub const ZERO: Point3 = Point3 { x: 0, y: 0, z: 0 };
    pub const ONE: Point3 = Point3 { x: 1, y: 1, z: 1 };

    pub const fn new(x: u32, y: u32, z: u32) -> Self {
        Self { x, y, z }
    }

    pub fn scale(self, other: Point3) -> Point3 {
        Point3::new(self.x * other.x, self.y * other.y, self.z * other.z)
    }

    pub fn div_floor(self, other: Point3) -> Point3 {
        Point3::new(self.x / other.x, self.y / other.y, self.z / other.z)
    }

    pub fn div_ceil(self, other: Point3) -> Point3 {
        Point3::new(self.x.div_ceil(other.x), self.y.div_ceil(other.y), self.z.div_ceil(other.z))
    }

    pub fn translate(self, other: Point3) -> Point3 {
        Point3::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }

    pub fn saturating_sub(self, other: Point3) -> Point3 {
        Point3::new(self.x.saturating_sub(other.x), self.y.saturating_sub(other.y), self.z.saturating_sub(other.z))
    }

    pub fn min(self, other: Point3) -> Point3 {
        Point3::new(self.x.min(other.x), self.y.min(other.y), self.z.min(other.z))
    }

    pub fn max(self, other: Point3) -> Point3 {
        Point3::new(self.x.max(other.x), self.y.max(other.y), self.z.max(other.z))
    }

    /// Strict component-wise comparison: `true` iff every component is smaller than the other's
    pub fn all_lt(self, other: Point3) -> bool {
        self.x < other.x && self.y < other.y && self.z < other.z
    }

    pub fn any_zero(self) -> bool {
        self.x == 0 || self.y == 0 || self.z == 0
    }

    pub fn volume(self) -> u64 {
        self.x as u64 * self.y as u64 * self.z as u64
    }

    /// Applies a signed offset, returning `None` if any component would become negative or overflow
    pub fn checked_offset(self, offset: Offset3) -> Option<Point3> {
        Some(Point3::new(
            self.x.checked_add_signed(offset.x)?,
            self.y.checked_add_signed(offset.y)?,
            self.z.checked_add_signed(offset.z)?,
        ))
    }
}

impl Display for Point3 {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

impl From<(u32, u32, u32)> for Point3 {
    fn from((x, y, z): (u32, u32, u32)) -> Self {
        Self::new(x, y, z)
    }
}

/// A signed 3D offset, in grid units when used with the block manager
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Offset3 {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Offset3 {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }
}

/// A half-open axis-aligned box `[location, location + size)`
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Box3 {
    pub location: Point3,
    pub size: Point3,
}

impl Box3 {
    pub const fn new(location: Point3, size: Point3) -> Self {
        Self { location, size }
    }

    /// The box spanning `[min, max)`. Components where `max <= min` yield a zero extent.
    pub fn from_bounds(min: Point3, max: Point3) -> Self {
        Self { location: min, size: max.saturating_sub(min) }
    }

    /// The exclusive upper corner
    pub fn end(&self) -> Point3 {
        self.location.translate(self.size)
    }

    pub fn is_empty(&self) -> bool {
        self.size.any_zero()
    }

    pub fn contains(&self, p: Point3) -> bool {
        let max = self.end();
        self.location.x <= p.x
            && p.x < max.x
            && self.location.y <= p.y
            && p.y < max.y
            && self.location.z <= p.z
            && p.z < max.z
    }

    pub fn intersection(&self, other: &Box3) -> Option<Box3> {
        let b = Box3::from_bounds(self.location.max(other.location), self.end().min(other.end()));
        (!b.is_empty()).then_some(b)
    }

    pub fn intersects(&self, other: &Box3) -> bool {
        self.intersection(other).is_some()
    }

    /// The smallest box containing both boxes. Empty boxes are ignored.
    pub fn union(&self, other: &Box3) -> Box3 {
        match (self.is_empty(), other.is_empty()) {
            (true, _) => *other,
            (_, true) => *self,
            _ => Box3::from_bounds(self.location.min(other.location), self.end().max(other.end())),
        }
    }

    /// The XY footprint of this box
    pub fn rect(&self) -> Rect {
        let max = self.end();
        Rect::new(self.location.x as i64, self.location.y as i64, max.x as i64, max.y as i64)
    }
}

impl Display for Box3 {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.location, self.end())
    }
}

/// A 2D pixel coordinate within a section
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Point2 {
    pub x: u32,
    pub y: u32,
}

impl Point2 {
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

/// A real-valued 2D point, used for centers of mass
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point2f {
    pub x: f64,
    pub y: f64,
}

impl Point2f {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_squared(&self, other: &Point2f) -> f64 {
        let (dx, dy) = (self.x - other.x, self.y - other.y);
        dx * dx + dy * dy
    }

    pub fn distance(&self, other: &Point2f) -> f64 {
        self.distance_squared(other).sqrt()
    }
}

/// A half-open 2D rectangle `[min, max)`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub min_x: i64,
    pub min_y: i64,
    pub max_x: i64,
    pub max_y: i64,
}

impl Rect {
    pub const fn new(min_x: i64, min_y: i64, max_x: i64, max_y: i64) -> Self {
        Self { min_x, min_y, max_x, max_y }
    }

    /// The neutral element of [`Rect::fit`]
    pub const fn empty() -> Self {
        Self { min_x: i64::MAX, min_y: i64::MAX, max_x: i64::MIN, max_y: i64::MIN }
    }

    pub fn is_empty(&self) -> bool {
        self.min_x >= self.max_x || self.min_y >= self.max_y
    }

    pub fn width(&self) -> i64 {
        (self.max_x - self.min_x).max(0)
    }

    pub fn height(&self) -> i64 {
        (self.max_y - self.min_y).max(0)
    }

    /// Extends this rectangle to contain `other`
    pub fn fit(&mut self, other: &Rect) {
        if other.is_empty() {
            return;
        }
        self.min_x = self.min_x.min(other.min_x);
        self.min_y = self.min_y.min(other.min_y);
        self.max_x = self.max_x.max(other.max_x);
        self.max_y = self.max_y.max(other.max_y);
    }

    /// Extends this rectangle to contain the unit pixel at `p`
    pub fn fit_pixel(&mut self, p: Point2) {
        self.fit(&Rect::new(p.x as i64, p.y as i64, p.x as i64 + 1, p.y as i64 + 1));
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.min_x < other.max_x && other.min_x < self.max_x && self.min_y < other.max_y && other.min_y < self.max_y
    }
}
