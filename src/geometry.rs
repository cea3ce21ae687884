// plain geometry values shared by the chrome controllers
// all coordinates are physical screen pixels

use serde::{Deserialize, Serialize};
use std::ops::{Add, Sub};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

impl Size {
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }
}

/// Size and screen position of the widget window.
///
/// Width and height always satisfy the widget aspect ratio and the active
/// [`SizeBounds`] once they have passed through the solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WindowGeometry {
    pub width: i32,
    pub height: i32,
    pub x: i32,
    pub y: i32,
}

impl WindowGeometry {
    pub const fn new(width: i32, height: i32, x: i32, y: i32) -> Self {
        Self { width, height, x, y }
    }

    pub fn from_parts(size: Size, origin: Point) -> Self {
        Self::new(size.width, size.height, origin.x, origin.y)
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn right_edge(&self) -> i32 {
        self.x + self.width
    }

    pub fn set_size(&mut self, size: Size) {
        self.width = size.width;
        self.height = size.height;
    }

    pub fn set_origin(&mut self, origin: Point) {
        self.x = origin.x;
        self.y = origin.y;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeBounds {
    pub min_width: i32,
    pub max_width: i32,
    pub min_height: i32,
    pub max_height: i32,
}

impl SizeBounds {
    // a max below its min collapses onto the min
    pub fn new(min_width: i32, max_width: i32, min_height: i32, max_height: i32) -> Self {
        Self {
            min_width,
            max_width: max_width.max(min_width),
            min_height,
            max_height: max_height.max(min_height),
        }
    }

    pub fn contains(&self, size: Size) -> bool {
        (self.min_width..=self.max_width).contains(&size.width)
            && (self.min_height..=self.max_height).contains(&size.height)
    }
}

/// Usable area of the monitor the widget lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenArea {
    pub origin: Point,
    pub size: Size,
}

impl ScreenArea {
    pub fn center(&self, window: Size) -> Point {
        Point::new(
            self.origin.x + (self.size.width - window.width) / 2,
            self.origin.y + (self.size.height - window.height) / 2,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_arithmetic() {
        let offset = Point::new(100, 100) - Point::new(50, 50);
        assert_eq!(offset, Point::new(50, 50));
        assert_eq!(Point::new(130, 100) - offset, Point::new(80, 50));
        assert_eq!(offset + Point::new(-10, 5), Point::new(40, 55));
    }

    #[test]
    fn test_bounds_normalize_inverted_max() {
        let bounds = SizeBounds::new(210, 100, 350, 200);
        assert_eq!(bounds.max_width, 210);
        assert_eq!(bounds.max_height, 350);
        assert!(bounds.contains(Size::new(210, 350)));
    }

    #[test]
    fn test_center_in_screen_area() {
        let area = ScreenArea {
            origin: Point::new(0, 32),
            size: Size::new(1920, 1048),
        };
        assert_eq!(area.center(Size::new(300, 500)), Point::new(810, 306));
    }
}
