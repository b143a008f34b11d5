use core::ops::{Add, Sub};

use super::Vec2;

/// Integer 2D vector in whole logical pixels.
///
/// Layout positions and sizes snap to this grid so that sibling edges line up
/// without sub-pixel seams.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct Vec2i {
    pub x: i32,
    pub y: i32,
}

impl Vec2i {
    pub const ZERO: Vec2i = Vec2i::new(0, 0);

    #[inline]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn to_vec2(self) -> Vec2 {
        Vec2::new(self.x as f32, self.y as f32)
    }
}

impl From<(i32, i32)> for Vec2i {
    #[inline]
    fn from((x, y): (i32, i32)) -> Self {
        Vec2i::new(x, y)
    }
}

impl Add for Vec2i {
    type Output = Vec2i;
    #[inline]
    fn add(self, rhs: Vec2i) -> Vec2i {
        Vec2i::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vec2i {
    type Output = Vec2i;
    #[inline]
    fn sub(self, rhs: Vec2i) -> Vec2i {
        Vec2i::new(self.x - rhs.x, self.y - rhs.y)
    }
}
