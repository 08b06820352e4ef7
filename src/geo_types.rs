//! Conversions to and from [`geo-types`](https://docs.rs/geo-types) geometries.
//!
//! ```rust
//! # use approx::assert_relative_eq;
//! use crs_transform::{CoordinateTransform, Direction, Transform};
//!
//! let transform = CoordinateTransform::new("EPSG:4326", "EPSG:3857");
//! let projected = transform
//!     .transform_point(geo_types::point!(x: 10.0, y: 20.0).into(), Direction::Forward)
//!     .unwrap();
//! let projected: geo_types::Point = projected.into();
//! assert_relative_eq!(projected.x(), 1113194.9079, epsilon = 1e-3);
//! ```

use crate::geometry::{Point, Rect};
use geo_types::CoordFloat;
use num_traits::NumCast;

impl From<geo_types::Coord<f64>> for Point {
    fn from(coord: geo_types::Coord<f64>) -> Self {
        Point::new(coord.x, coord.y)
    }
}

impl From<geo_types::Point<f64>> for Point {
    fn from(point: geo_types::Point<f64>) -> Self {
        Point::new(point.x(), point.y())
    }
}

impl From<Point> for geo_types::Coord<f64> {
    fn from(point: Point) -> Self {
        geo_types::coord! { x: point.x, y: point.y }
    }
}

impl From<Point> for geo_types::Point<f64> {
    fn from(point: Point) -> Self {
        geo_types::Point::new(point.x, point.y)
    }
}

impl From<geo_types::Rect<f64>> for Rect {
    fn from(rect: geo_types::Rect<f64>) -> Self {
        Rect::from_corners(rect.min().into(), rect.max().into())
    }
}

/// `geo_types::Rect` always orders its corners, so an inverted rectangle comes back normalized.
impl From<Rect> for geo_types::Rect<f64> {
    fn from(rect: Rect) -> Self {
        geo_types::Rect::new(rect.min(), rect.max())
    }
}

impl Point {
    /// Convert to a `geo_types::Point` of another float type, if every coordinate fits.
    pub fn to_geo<T: CoordFloat>(&self) -> Option<geo_types::Point<T>> {
        Some(geo_types::Point::new(
            <T as NumCast>::from(self.x)?,
            <T as NumCast>::from(self.y)?,
        ))
    }
}
