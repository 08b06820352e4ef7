#![doc(html_logo_url = "https://raw.githubusercontent.com/georust/meta/master/logo/logo.png")]
//! `crs-transform` converts points and rectangles between two coordinate reference systems, each
//! given as definition text, using [PROJ](https://proj.org).
//!
//! Any definition PROJ understands can be used: WKT1 (including the ESRI dialect), WKT2,
//! PROJJSON, `AUTHORITY:CODE` strings such as `EPSG:3857`, and PROJ strings.
//!
//! # Usage
//!
//! Two implementations of the [`Transform`] trait are provided:
//!
//! 1. [`CoordinateTransform`] resolves both definitions into projection parameters, builds one
//!    projection engine per side and carries coordinates between them, shifting datums on the
//!    way when the two differ. Geographic coordinates are in degrees. Identical definitions short-circuit to the identity, and a definition that
//!    cannot be set up leaves the transform passing coordinates through unchanged rather than
//!    failing; check [`CoordinateTransform::state`] when that matters.
//! 2. [`DirectTransform`] hands both definitions to PROJ and lets it pick a single operation
//!    between them, created on first use.
//!
//! Both are configured through a [`TransformBuilder`], which sets resource search paths, the
//! [`CrsLookup`] service used for the default geographic CRS, and an optional [`ErrorLog`] that
//! setup failures are reported to.
//!
//! [`Transform::transform_rect`] transforms only the two corners of a rectangle. It is fast but
//! approximate; [`Transform::transform_rect_enveloping`] samples the rectangle's edges instead.
//!
//! # Requirements
//!
//! A `libproj` (9.x) with its `proj.db` must be available, either on the system or built by
//! `proj-sys` when the `bundled_proj` feature is enabled.
//!
//! # Example
//!
//! ```
//! use approx::assert_relative_eq;
//! use crs_transform::{CoordinateTransform, Direction, Point, Rect, Transform};
//!
//! let to_mercator = CoordinateTransform::new("EPSG:4326", "EPSG:3857");
//! let result = to_mercator
//!     .transform_point(Point::new(10.0, 20.0), Direction::Forward)
//!     .unwrap();
//! assert_relative_eq!(result.x, 1113194.9079, epsilon = 1e-3);
//! assert_relative_eq!(result.y, 2273030.9270, epsilon = 1e-3);
//!
//! let back = to_mercator.transform_point(result, Direction::Inverse).unwrap();
//! assert_relative_eq!(back.x, 10.0, epsilon = 1e-9);
//!
//! let same = CoordinateTransform::new("EPSG:4326", "EPSG:4326");
//! let rect = Rect::new(-10.0, -10.0, 10.0, 10.0);
//! assert_eq!(same.transform_rect(rect, Direction::Forward).unwrap(), rect);
//! ```

use libc::c_char;
use std::ffi::CStr;
use std::str;

mod config;
mod context;
mod crs;
mod datum;
mod direct;
mod engine;
mod errno;
mod error;
mod error_log;
#[cfg(feature = "geo-types")]
mod geo_types;
mod geometry;
mod lookup;
mod options;
mod transform;

pub use crate::config::TransformBuilder;
pub use crate::crs::{CrsDefinition, SpatialReference, WktDialect, export_proj_params};
pub use crate::direct::DirectTransform;
pub use crate::error::{ConstructionError, Error, ParseError, TransformError};
pub use crate::error_log::{ErrorEntry, ErrorLog, Severity, SharedErrorLog};
pub use crate::geometry::{Direction, Point, Rect};
pub use crate::lookup::{BuiltinLookup, CrsLookup, ProjDbLookup, WGS84_SRID, WGS84_WKT};
pub use crate::transform::{CoordinateTransform, Transform, TransformState};

/// Copy a NUL-terminated string owned by PROJ.
///
/// # Safety
///
/// `raw_ptr` must be non-null and point to a NUL-terminated string that stays alive for the
/// duration of the call.
pub(crate) unsafe fn _string(raw_ptr: *const c_char) -> Result<String, str::Utf8Error> {
    let c_str = unsafe { CStr::from_ptr(raw_ptr) };
    Ok(str::from_utf8(c_str.to_bytes())?.to_string())
}
