use crate::config::TransformBuilder;
use crate::context::ThreadContext;
use crate::crs::{CrsDefinition, SpatialReference, export_proj_params};
use crate::datum::{self, Datum};
use crate::engine::{self, Engine};
use crate::error::{Error, TransformError};
use crate::error_log::{ErrorEntry, Severity, SharedErrorLog};
use crate::geometry::{Direction, Point, Rect};
use crate::lookup::{CrsLookup, WGS84_WKT};
use log::{debug, warn};
use std::{fmt, rc};

/// Transform geometries between two coordinate reference systems.
///
/// Implemented by [`CoordinateTransform`] and [`DirectTransform`](crate::DirectTransform); the
/// two differ in how they are built and what they do on identical CRSs, not in how they are
/// called.
pub trait Transform {
    /// Transform parallel coordinate slices in place.
    ///
    /// `x`, `y` and `z` (when given) must have equal lengths. On error the slices may hold a mix
    /// of transformed and untransformed values. Where a side is geographic, `z` goes through the
    /// same degree/radian conversion as `x` and `y`.
    fn transform_coords(
        &self,
        x: &mut [f64],
        y: &mut [f64],
        z: Option<&mut [f64]>,
        direction: Direction,
    ) -> Result<(), Error>;

    /// Transform a point's `x` and `y`, as if it lay at height zero. `z` comes back unchanged;
    /// use [`transform_coords`](Transform::transform_coords) to transform heights.
    fn transform_point(&self, point: Point, direction: Direction) -> Result<Point, Error> {
        let mut x = [point.x];
        let mut y = [point.y];
        self.transform_coords(&mut x, &mut y, None, direction)?;
        Ok(Point::new_3d(x[0], y[0], point.z))
    }

    fn transform_xy(&self, x: f64, y: f64, direction: Direction) -> Result<Point, Error> {
        self.transform_point(Point::new(x, y), direction)
    }

    /// Transform the min and max corners independently and rebuild a rectangle from them.
    ///
    /// This is an approximation. Unless the projection preserves shape, the true footprint of
    /// `rect` is not an axis-aligned rectangle and the result can be smaller or larger than it;
    /// the corners can even come back out of order. See
    /// [`transform_rect_enveloping`](Transform::transform_rect_enveloping).
    fn transform_rect(&self, rect: Rect, direction: Direction) -> Result<Rect, Error> {
        let min = self.transform_point(rect.min(), direction)?;
        let max = self.transform_point(rect.max(), direction)?;
        Ok(Rect::from_corners(min, max))
    }

    /// Bounding box of the transformed outline of `rect`.
    ///
    /// Every edge is sampled at its two corners plus `densify` evenly spaced interior points;
    /// the result is the normalized envelope of all transformed samples that are finite.
    fn transform_rect_enveloping(
        &self,
        rect: Rect,
        direction: Direction,
        densify: usize,
    ) -> Result<Rect, Error> {
        let (mut x, mut y) = outline(&rect, densify);
        self.transform_coords(&mut x, &mut y, None, direction)?;
        Ok(envelope(&x, &y))
    }
}

fn outline(rect: &Rect, densify: usize) -> (Vec<f64>, Vec<f64>) {
    let corners = [
        (rect.x_min, rect.y_min),
        (rect.x_max, rect.y_min),
        (rect.x_max, rect.y_max),
        (rect.x_min, rect.y_max),
    ];
    let steps = densify + 1;
    let mut x = Vec::with_capacity(4 * steps);
    let mut y = Vec::with_capacity(4 * steps);
    for (i, &(x0, y0)) in corners.iter().enumerate() {
        let (x1, y1) = corners[(i + 1) % corners.len()];
        for step in 0..steps {
            let t = step as f64 / steps as f64;
            x.push(x0 + (x1 - x0) * t);
            y.push(y0 + (y1 - y0) * t);
        }
    }
    (x, y)
}

fn envelope(x: &[f64], y: &[f64]) -> Rect {
    x.iter()
        .zip(y)
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .fold(
            Rect::new(f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
            |acc, (&x, &y)| {
                Rect::new(acc.x_min.min(x), acc.y_min.min(y), acc.x_max.max(x), acc.y_max.max(y))
            },
        )
}

pub(crate) fn check_lengths(x: &[f64], y: &[f64], z: Option<&[f64]>) -> Result<(), Error> {
    let z_len = z.map_or(x.len(), <[f64]>::len);
    if x.len() == y.len() && x.len() == z_len {
        Ok(())
    } else {
        Err(Error::LengthMismatch {
            x: x.len(),
            y: y.len(),
            z: z_len,
        })
    }
}

/// Where a [`CoordinateTransform`] ended up after its last initialization.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransformState {
    Uninitialized,
    /// Source and destination texts are identical; nothing is transformed.
    ShortCircuit,
    Initialized,
    /// A definition could not be parsed or an engine could not be built; nothing is transformed.
    Failed,
}

enum State {
    Uninitialized,
    ShortCircuit,
    Initialized(Box<Resolved>),
    Failed,
}

struct Resolved {
    source: CrsDefinition,
    destination: CrsDefinition,
    source_engine: Engine,
    destination_engine: Engine,
    datum_shift: Option<Engine>,
}

/// Transforms between two CRS definition texts through a pair of projection engines.
///
/// Setting either side rebuilds everything from scratch. Setup failures are not returned: they
/// are logged, reported to the injected [`ErrorLog`](crate::ErrorLog) if there is one, and leave
/// the transform in [`TransformState::Failed`], where every call passes coordinates through
/// unchanged. Errors raised by PROJ while transforming are returned to the caller.
///
/// ```
/// use crs_transform::{CoordinateTransform, Direction, Point, Transform, WGS84_WKT};
/// # use approx::assert_relative_eq;
///
/// let to_utm = CoordinateTransform::new(WGS84_WKT, "EPSG:32631");
/// let point = to_utm.transform_point(Point::new(3.0, 0.0), Direction::Forward).unwrap();
/// assert_relative_eq!(point.x, 500000.0, epsilon = 1e-6);
/// ```
pub struct CoordinateTransform {
    ctx: rc::Rc<ThreadContext>,
    lookup: rc::Rc<dyn CrsLookup>,
    default_srid: u32,
    error_log: Option<SharedErrorLog>,
    source_text: String,
    destination_text: String,
    state: State,
}

impl CoordinateTransform {
    /// Transform with default configuration. Empty texts fall back to geographic WGS84.
    pub fn new(source: &str, destination: &str) -> Self {
        TransformBuilder::new().build(source, destination)
    }

    pub(crate) fn from_parts(
        ctx: rc::Rc<ThreadContext>,
        lookup: rc::Rc<dyn CrsLookup>,
        default_srid: u32,
        error_log: Option<SharedErrorLog>,
        source: &str,
        destination: &str,
    ) -> Self {
        let mut transform = CoordinateTransform {
            ctx,
            lookup,
            default_srid,
            error_log,
            source_text: source.to_string(),
            destination_text: destination.to_string(),
            state: State::Uninitialized,
        };
        transform.initialize();
        transform
    }

    pub fn set_source_crs(&mut self, definition: &str) {
        self.source_text = definition.to_string();
        self.initialize();
    }

    pub fn set_destination_crs(&mut self, definition: &str) {
        debug!("Destination CRS set");
        self.destination_text = definition.to_string();
        self.initialize();
    }

    /// Source definition text, after defaulting.
    pub fn source_crs(&self) -> &str {
        &self.source_text
    }

    /// Destination definition text, after defaulting.
    pub fn destination_crs(&self) -> &str {
        &self.destination_text
    }

    pub fn state(&self) -> TransformState {
        match self.state {
            State::Uninitialized => TransformState::Uninitialized,
            State::ShortCircuit => TransformState::ShortCircuit,
            State::Initialized(_) => TransformState::Initialized,
            State::Failed => TransformState::Failed,
        }
    }

    pub fn is_short_circuit(&self) -> bool {
        matches!(self.state, State::ShortCircuit)
    }

    pub fn is_initialized(&self) -> bool {
        matches!(self.state, State::Initialized(_))
    }

    pub fn source_definition(&self) -> Option<&CrsDefinition> {
        self.resolved().map(|resolved| &resolved.source)
    }

    pub fn destination_definition(&self) -> Option<&CrsDefinition> {
        self.resolved().map(|resolved| &resolved.destination)
    }

    fn resolved(&self) -> Option<&Resolved> {
        match &self.state {
            State::Initialized(resolved) => Some(resolved),
            _ => None,
        }
    }

    /// Rebuild both sides from the current definition texts.
    pub fn initialize(&mut self) {
        // Engines from the previous state are released before anything new is built.
        self.state = State::Uninitialized;

        if self.source_text.is_empty() {
            self.source_text = self.default_definition();
        }
        if self.destination_text.is_empty() {
            self.destination_text = self.source_text.clone();
        }
        if self.source_text == self.destination_text {
            debug!("Source and destination CRS are identical; transform short-circuited");
            self.state = State::ShortCircuit;
            return;
        }

        self.state = match self.resolve() {
            Ok(resolved) => {
                debug!(
                    "Coordinate transform set up\nINPUT: {}\nPARAMS: {}\nOUTPUT: {}\nPARAMS: {}",
                    self.source_text,
                    resolved.source.params(),
                    self.destination_text,
                    resolved.destination.params()
                );
                State::Initialized(Box::new(resolved))
            }
            Err(err) => {
                self.report_failure(&err);
                State::Failed
            }
        };
    }

    fn resolve(&self) -> Result<Resolved, Error> {
        let mut source = SpatialReference::parse(self.ctx.clone(), &self.source_text)?;
        let mut destination = SpatialReference::parse(self.ctx.clone(), &self.destination_text)?;

        let source_params = export_proj_params(&mut source)?;
        let destination_params = export_proj_params(&mut destination)?;

        let source_engine = Engine::from_params(self.ctx.clone(), &source_params)?;
        let destination_engine = Engine::from_params(self.ctx.clone(), &destination_params)?;
        let datum_shift = datum::shift_pipeline(
            &Datum::from_params(&source_params),
            &Datum::from_params(&destination_params),
        )
        .map(|pipeline| {
            debug!("Datum shift: {pipeline}");
            Engine::from_params(self.ctx.clone(), &pipeline)
        })
        .transpose()?;

        Ok(Resolved {
            source: CrsDefinition::from_parts(&self.source_text, source, source_params),
            destination: CrsDefinition::from_parts(
                &self.destination_text,
                destination,
                destination_params,
            ),
            source_engine,
            destination_engine,
            datum_shift,
        })
    }

    fn default_definition(&self) -> String {
        self.lookup
            .definition(self.default_srid)
            .unwrap_or_else(|| {
                warn!(
                    "No definition found for SRID {}, falling back to WGS84",
                    self.default_srid
                );
                WGS84_WKT.to_string()
            })
    }

    fn report_failure(&self, err: &Error) {
        warn!(
            "Coordinate transform could not be set up: {}\nINPUT: {}\nOUTPUT: {}",
            err, self.source_text, self.destination_text
        );
        if let Some(log) = &self.error_log {
            log.borrow_mut().report(ErrorEntry::new(
                err.to_string(),
                "CoordinateTransform",
                "initialize",
                Severity::Warning,
            ));
        }
    }
}

impl Transform for CoordinateTransform {
    fn transform_coords(
        &self,
        x: &mut [f64],
        y: &mut [f64],
        mut z: Option<&mut [f64]>,
        direction: Direction,
    ) -> Result<(), Error> {
        check_lengths(x, y, z.as_deref())?;
        let Some(resolved) = self.resolved() else {
            return Ok(());
        };
        let (from, to) = match direction {
            Direction::Forward => (&resolved.source_engine, &resolved.destination_engine),
            Direction::Inverse => (&resolved.destination_engine, &resolved.source_engine),
        };
        debug!("{} transform of {} coordinate(s)", direction, x.len());

        let attempted: Vec<(f64, f64)> = x.iter().copied().zip(y.iter().copied()).collect();
        if from.is_latlong() {
            scale(x, y, z.as_deref_mut(), f64::to_radians);
        }
        let shift = resolved.datum_shift.as_ref().map(|shift| (shift, direction));
        if let Err(message) = engine::transform_between(from, shift, to, x, y, z.as_deref_mut()) {
            let failed = x
                .iter()
                .zip(y.iter())
                .position(|(x, y)| !x.is_finite() || !y.is_finite())
                .unwrap_or(0);
            let (x, y) = attempted[failed];
            return Err(TransformError {
                direction,
                x,
                y,
                message,
            }
            .into());
        }
        if to.is_latlong() {
            scale(x, y, z, f64::to_degrees);
        }
        Ok(())
    }
}

fn scale(x: &mut [f64], y: &mut [f64], z: Option<&mut [f64]>, convert: fn(f64) -> f64) {
    let z = z.into_iter().flatten();
    for value in x.iter_mut().chain(y.iter_mut()).chain(z) {
        *value = convert(*value);
    }
}

impl fmt::Debug for CoordinateTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoordinateTransform")
            .field("source", &self.source_text)
            .field("destination", &self.destination_text)
            .field("state", &self.state())
            .finish()
    }
}
