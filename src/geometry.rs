use std::fmt;

/// A coordinate triple. `z` is zero unless given.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Point { x, y, z: 0.0 }
    }

    pub fn new_3d(x: f64, y: f64, z: f64) -> Self {
        Point { x, y, z }
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Point::new(x, y)
    }
}

/// An axis-aligned rectangle.
///
/// The corners are stored exactly as given: a rectangle coming out of a two-corner transform
/// may have `x_min > x_max` or `y_min > y_max`, and [`Rect::normalized`] is left to the caller.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    pub x_min: f64,
    pub y_min: f64,
    pub x_max: f64,
    pub y_max: f64,
}

impl Rect {
    pub fn new(x_min: f64, y_min: f64, x_max: f64, y_max: f64) -> Self {
        Rect {
            x_min,
            y_min,
            x_max,
            y_max,
        }
    }

    /// Rectangle spanned by two corner points.
    pub fn from_corners(min: Point, max: Point) -> Self {
        Rect::new(min.x, min.y, max.x, max.y)
    }

    pub fn min(&self) -> Point {
        Point::new(self.x_min, self.y_min)
    }

    pub fn max(&self) -> Point {
        Point::new(self.x_max, self.y_max)
    }

    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }

    /// Same rectangle with min/max swapped where they are out of order.
    pub fn normalized(&self) -> Self {
        Rect::new(
            self.x_min.min(self.x_max),
            self.y_min.min(self.y_max),
            self.x_min.max(self.x_max),
            self.y_min.max(self.y_max),
        )
    }
}

/// Which way a transform runs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Source CRS to destination CRS.
    #[default]
    Forward,
    /// Destination CRS to source CRS.
    Inverse,
}

impl Direction {
    pub fn reversed(self) -> Self {
        match self {
            Direction::Forward => Direction::Inverse,
            Direction::Inverse => Direction::Forward,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Forward => f.write_str("forward"),
            Direction::Inverse => f.write_str("inverse"),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn point_defaults_to_zero_height() {
        assert_eq!(Point::new(1.0, 2.0), Point::new_3d(1.0, 2.0, 0.0));
        assert_eq!(Point::from((3.0, 4.0)).z, 0.0);
    }

    #[test]
    fn rect_keeps_corner_order() {
        let rect = Rect::new(10.0, 5.0, -10.0, -5.0);
        assert_eq!(rect.min(), Point::new(10.0, 5.0));
        assert_eq!(rect.width(), -20.0);
        assert_eq!(rect.normalized(), Rect::new(-10.0, -5.0, 10.0, 5.0));
    }

    #[test]
    fn direction_names() {
        assert_eq!(Direction::Forward.to_string(), "forward");
        assert_eq!(Direction::Forward.reversed().to_string(), "inverse");
    }
}
