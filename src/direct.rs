use crate::config::TransformBuilder;
use crate::context::ThreadContext;
use crate::crs::SpatialReference;
use crate::engine::Engine;
use crate::error::{ConstructionError, Error, ParseError, TransformError};
use crate::geometry::Direction;
use crate::transform::{Transform, check_lengths};
use log::{debug, warn};
use std::cell::RefCell;
use std::rc;

/// Transforms through a single CRS-to-CRS operation chosen by PROJ.
///
/// Unlike [`CoordinateTransform`](crate::CoordinateTransform), coordinates are taken in the
/// CRSs' own units (degrees for geographic CRSs, longitude first), identical definitions are
/// transformed like any others, and the operation is only created when first needed. A
/// definition that fails to parse is reported by its setter and leaves that side unset; every
/// transform then fails with [`Error::Unavailable`] until it is replaced.
pub struct DirectTransform {
    ctx: rc::Rc<ThreadContext>,
    source_text: String,
    destination_text: String,
    source: Option<SpatialReference>,
    destination: Option<SpatialReference>,
    transformer: RefCell<Option<Engine>>,
}

impl DirectTransform {
    pub fn new(source: &str, destination: &str) -> Self {
        DirectTransform::from_context(rc::Rc::new(ThreadContext::new()), source, destination)
    }

    /// Same as [`new`](DirectTransform::new), with the builder's search paths applied.
    pub fn with_builder(
        builder: &TransformBuilder,
        source: &str,
        destination: &str,
    ) -> Result<Self, ConstructionError> {
        builder.build_direct(source, destination)
    }

    pub(crate) fn from_context(ctx: rc::Rc<ThreadContext>, source: &str, destination: &str) -> Self {
        let mut transform = DirectTransform {
            ctx,
            source_text: String::new(),
            destination_text: String::new(),
            source: None,
            destination: None,
            transformer: RefCell::new(None),
        };
        if let Err(err) = transform.set_source_crs(source) {
            warn!("Source CRS not set: {err}");
        }
        if let Err(err) = transform.set_destination_crs(destination) {
            warn!("Destination CRS not set: {err}");
        }
        transform
    }

    /// Replace the source CRS. On failure the source is left unset and the previous text kept.
    pub fn set_source_crs(&mut self, definition: &str) -> Result<(), ParseError> {
        self.transformer.replace(None);
        self.source = None;
        let reference = SpatialReference::parse(self.ctx.clone(), definition)?;
        self.source = Some(reference);
        self.source_text = definition.to_string();
        Ok(())
    }

    /// Replace the destination CRS. On failure the destination is left unset and the previous
    /// text kept.
    pub fn set_destination_crs(&mut self, definition: &str) -> Result<(), ParseError> {
        self.transformer.replace(None);
        self.destination = None;
        let reference = SpatialReference::parse(self.ctx.clone(), definition)?;
        self.destination = Some(reference);
        self.destination_text = definition.to_string();
        Ok(())
    }

    /// Text of the last source definition that parsed.
    pub fn source_crs(&self) -> &str {
        &self.source_text
    }

    /// Text of the last destination definition that parsed.
    pub fn destination_crs(&self) -> &str {
        &self.destination_text
    }

    /// Whether the transformer has been created.
    pub fn is_ready(&self) -> bool {
        self.transformer.borrow().is_some()
    }

    /// Transform a single coordinate pair.
    pub fn transform_pair(&self, x: f64, y: f64) -> Result<(f64, f64), Error> {
        let mut xs = [x];
        let mut ys = [y];
        self.transform_coords(&mut xs, &mut ys, None, Direction::Forward)?;
        Ok((xs[0], ys[0]))
    }

    fn create_transformer(&self) -> Result<Engine, ConstructionError> {
        match (&self.source, &self.destination) {
            (Some(source), Some(destination)) => {
                Engine::between(self.ctx.clone(), source, destination)
            }
            (None, _) => Err(ConstructionError::Transformer {
                reason: "no valid source CRS".to_string(),
            }),
            (_, None) => Err(ConstructionError::Transformer {
                reason: "no valid destination CRS".to_string(),
            }),
        }
    }
}

impl Transform for DirectTransform {
    fn transform_coords(
        &self,
        x: &mut [f64],
        y: &mut [f64],
        z: Option<&mut [f64]>,
        direction: Direction,
    ) -> Result<(), Error> {
        check_lengths(x, y, z.as_deref())?;
        let mut transformer = self.transformer.borrow_mut();
        let engine = match transformer.take() {
            Some(engine) => engine,
            None => {
                debug!("Creating transformer");
                self.create_transformer().map_err(Error::Unavailable)?
            }
        };
        let engine = transformer.insert(engine);
        let (first_x, first_y) = (x.first().copied(), y.first().copied());
        engine.trans_arrays(direction, x, y, z).map_err(|message| {
            TransformError {
                direction,
                x: first_x.unwrap_or(f64::NAN),
                y: first_y.unwrap_or(f64::NAN),
                message,
            }
            .into()
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::geometry::{Point, Rect};
    use crate::lookup::WGS84_WKT;
    use approx::assert_relative_eq;

    #[test]
    fn transformer_is_created_lazily() {
        let transform = DirectTransform::new("EPSG:4326", "EPSG:3857");
        assert!(!transform.is_ready());
        let (x, y) = transform.transform_pair(10.0, 20.0).unwrap();
        assert!(transform.is_ready());
        assert_relative_eq!(x, 1113194.9079327357, epsilon = 1e-3);
        assert_relative_eq!(y, 2273030.926987689, epsilon = 1e-3);
    }

    #[test]
    fn batch_in_place() {
        let transform = DirectTransform::new(WGS84_WKT, "EPSG:32631");
        let mut x = [3.0, 0.0];
        let mut y = [0.0, 0.0];
        transform
            .transform_coords(&mut x, &mut y, None, Direction::Forward)
            .unwrap();
        assert_relative_eq!(x[0], 500000.0, epsilon = 1e-6);
        assert_relative_eq!(x[1], 166021.4431, epsilon = 1e-3);
        assert_relative_eq!(y[1], 0.0, epsilon = 1e-6);
    }

    #[test]
    fn shares_the_transform_interface() {
        let direct: Box<dyn Transform> = Box::new(DirectTransform::new("EPSG:4326", "EPSG:32631"));
        let point = direct.transform_point(Point::new(3.0, 0.0), Direction::Forward).unwrap();
        assert_relative_eq!(point.x, 500000.0, epsilon = 1e-6);
        let back = direct.transform_point(point, Direction::Inverse).unwrap();
        assert_relative_eq!(back.x, 3.0, epsilon = 1e-9);

        let rect = direct
            .transform_rect(Rect::new(2.0, 0.0, 4.0, 1.0), Direction::Forward)
            .unwrap();
        assert!(rect.x_min < 500000.0 && rect.x_max > 500000.0);
    }

    #[test]
    fn identical_definitions_still_transform() {
        let transform = DirectTransform::new("EPSG:4326", "EPSG:4326");
        let (x, y) = transform.transform_pair(10.0, 20.0).unwrap();
        assert!(transform.is_ready());
        assert_relative_eq!(x, 10.0, epsilon = 1e-12);
        assert_relative_eq!(y, 20.0, epsilon = 1e-12);
    }

    #[test]
    fn invalid_definition_makes_transformer_unavailable() {
        let mut transform = DirectTransform::new("EPSG:4326", "nonsense");
        assert!(transform.destination_crs().is_empty());
        assert!(matches!(
            transform.transform_pair(1.0, 2.0),
            Err(Error::Unavailable(ConstructionError::Transformer { .. }))
        ));
        assert!(!transform.is_ready());

        transform.set_destination_crs("EPSG:3857").unwrap();
        assert!(transform.transform_pair(1.0, 2.0).is_ok());
    }

    #[test]
    fn setter_failure_keeps_previous_text() {
        let mut transform = DirectTransform::new("EPSG:4326", "EPSG:3857");
        assert!(transform.set_source_crs("nonsense").is_err());
        assert_eq!(transform.source_crs(), "EPSG:4326");
        assert!(transform.transform_pair(1.0, 2.0).is_err());
    }

    #[test]
    fn math_errors_are_returned() {
        let transform = DirectTransform::new("EPSG:4326", "EPSG:3857");
        match transform.transform_pair(0.0, 95.0) {
            Err(Error::Transform(err)) => assert_eq!(err.direction, Direction::Forward),
            other => panic!("expected a transform error, got {other:?}"),
        }
    }
}
