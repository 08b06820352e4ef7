use crate::context::ThreadContext;
use crate::crs::SpatialReference;
use crate::errno::Errno;
use crate::error::ConstructionError;
use crate::geometry::Direction;
use std::{ffi, mem, ptr, rc};

const STRIDE: usize = mem::size_of::<f64>();

/// A safe wrapper around a PROJ coordinate operation.
///
/// Built from a CRS parameter string, the operation maps geodetic radians to the CRS's own
/// coordinates when run forward, and back when run inverse. A datum shift pipeline maps geodetic
/// radians on one datum to another. Built from two spatial references, it maps between them
/// directly in their native units.
pub(crate) struct Engine {
    pj: ptr::NonNull<proj_sys::PJ>,
    ctx: rc::Rc<ThreadContext>,
}

impl Engine {
    pub fn from_params(ctx: rc::Rc<ThreadContext>, params: &str) -> Result<Self, ConstructionError> {
        let definition = ffi::CString::new(operation_params(params))?;
        let pj_ptr = unsafe { proj_sys::proj_create(ctx.as_ptr(), definition.as_ptr()) };
        Engine::from_pj_ptr(ctx, pj_ptr).map_err(|reason| ConstructionError::Engine {
            params: params.to_string(),
            reason,
        })
    }

    /// One operation from `source` to `target`, with longitude/easting first on both sides.
    pub fn between(
        ctx: rc::Rc<ThreadContext>,
        source: &SpatialReference,
        target: &SpatialReference,
    ) -> Result<Self, ConstructionError> {
        let pj_ptr = unsafe {
            proj_sys::proj_create_crs_to_crs_from_pj(
                ctx.as_ptr(),
                source.as_ptr(),
                target.as_ptr(),
                ptr::null_mut(),
                ptr::null(),
            )
        };
        let operation = Engine::from_pj_ptr(ctx.clone(), pj_ptr)
            .map_err(|reason| ConstructionError::Transformer { reason })?;
        let pj_ptr =
            unsafe { proj_sys::proj_normalize_for_visualization(ctx.as_ptr(), operation.as_ptr()) };
        Engine::from_pj_ptr(ctx, pj_ptr).map_err(|reason| ConstructionError::Transformer { reason })
    }

    fn from_pj_ptr(
        ctx: rc::Rc<ThreadContext>,
        pj_ptr: *mut proj_sys::PJ,
    ) -> Result<Self, String> {
        match ptr::NonNull::new(pj_ptr) {
            Some(pj) => Ok(Engine { pj, ctx }),
            None => Err(ctx.last_error_message("PROJ returned no object")),
        }
    }

    pub fn as_ptr(&self) -> *mut proj_sys::PJ {
        self.pj.as_ptr()
    }

    /// Whether the CRS side of this operation is expressed in angular units.
    pub fn is_latlong(&self) -> bool {
        unsafe { proj_sys::proj_angular_output(self.as_ptr(), proj_sys::PJ_DIRECTION_PJ_FWD) != 0 }
    }

    fn errno_reset(&self) -> Errno {
        Errno(unsafe { proj_sys::proj_errno_reset(self.as_ptr()) })
    }

    fn errno(&self) -> Errno {
        Errno(unsafe { proj_sys::proj_errno(self.as_ptr()) })
    }

    /// Run the operation in place over parallel coordinate slices of equal length.
    ///
    /// Fails with PROJ's description of the first error raised; coordinates that could not be
    /// transformed are left as `HUGE_VAL`.
    pub fn trans_arrays(
        &self,
        direction: Direction,
        x: &mut [f64],
        y: &mut [f64],
        z: Option<&mut [f64]>,
    ) -> Result<(), String> {
        debug_assert_eq!(x.len(), y.len());
        let (z_ptr, z_len) = match z {
            Some(z) => (z.as_mut_ptr(), z.len()),
            None => (ptr::null_mut(), 0),
        };
        self.errno_reset();
        unsafe {
            proj_sys::proj_trans_generic(
                self.as_ptr(),
                pj_direction(direction),
                x.as_mut_ptr(),
                STRIDE,
                x.len(),
                y.as_mut_ptr(),
                STRIDE,
                y.len(),
                z_ptr,
                STRIDE,
                z_len,
                ptr::null_mut(),
                0,
                0,
            );
        }
        let errno = self.errno();
        if errno.is_ok() {
            Ok(())
        } else {
            Err(errno
                .message(&self.ctx)
                .unwrap_or_else(|err| format!("PROJ error {} ({err})", errno.0)))
        }
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        unsafe {
            proj_sys::proj_destroy(self.as_ptr());
        }
    }
}

fn pj_direction(direction: Direction) -> proj_sys::PJ_DIRECTION {
    match direction {
        Direction::Forward => proj_sys::PJ_DIRECTION_PJ_FWD,
        Direction::Inverse => proj_sys::PJ_DIRECTION_PJ_INV,
    }
}

// Without `+type=crs` PROJ builds the projection operation rather than a CRS object.
fn operation_params(params: &str) -> String {
    params
        .split_whitespace()
        .filter(|token| *token != "+type=crs")
        .collect::<Vec<_>>()
        .join(" ")
}

/// Carry coordinates from `from`'s CRS to `to`'s CRS through geodetic radians, running the
/// datum `shift` pipeline in the given direction on the way when there is one.
///
/// Angular coordinates go in and come out in radians.
pub(crate) fn transform_between(
    from: &Engine,
    shift: Option<(&Engine, Direction)>,
    to: &Engine,
    x: &mut [f64],
    y: &mut [f64],
    mut z: Option<&mut [f64]>,
) -> Result<(), String> {
    from.trans_arrays(Direction::Inverse, x, y, z.as_deref_mut())?;
    if let Some((shift, direction)) = shift {
        shift.trans_arrays(direction, x, y, z.as_deref_mut())?;
    }
    to.trans_arrays(Direction::Forward, x, y, z)
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    const WGS84: &str = "+proj=longlat +datum=WGS84 +no_defs +type=crs";
    const UTM31: &str = "+proj=utm +zone=31 +datum=WGS84 +units=m +no_defs +type=crs";

    fn ctx() -> rc::Rc<ThreadContext> {
        rc::Rc::new(ThreadContext::new())
    }

    #[test]
    fn strips_crs_marker() {
        assert_eq!(operation_params(UTM31), "+proj=utm +zone=31 +datum=WGS84 +units=m +no_defs");
    }

    #[test]
    fn detects_angular_units() {
        let ctx = ctx();
        assert!(Engine::from_params(ctx.clone(), WGS84).unwrap().is_latlong());
        assert!(!Engine::from_params(ctx, UTM31).unwrap().is_latlong());
    }

    #[test]
    fn unknown_projection_fails() {
        match Engine::from_params(ctx(), "+proj=nosuchprojection +type=crs") {
            Err(ConstructionError::Engine { params, .. }) => {
                assert_eq!(params, "+proj=nosuchprojection +type=crs")
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("engine built for an unknown projection"),
        }
    }

    #[test]
    fn geographic_to_utm() {
        let ctx = ctx();
        let geographic = Engine::from_params(ctx.clone(), WGS84).unwrap();
        let utm = Engine::from_params(ctx, UTM31).unwrap();
        let mut x = [3f64.to_radians()];
        let mut y = [0.0];
        transform_between(&geographic, None, &utm, &mut x, &mut y, None).unwrap();
        assert_relative_eq!(x[0], 500000.0, epsilon = 1e-6);
        assert_relative_eq!(y[0], 0.0, epsilon = 1e-6);
    }

    #[test]
    fn latitude_out_of_range_fails() {
        let ctx = ctx();
        let geographic = Engine::from_params(ctx.clone(), WGS84).unwrap();
        let utm = Engine::from_params(ctx, UTM31).unwrap();
        let mut x = [0.0];
        let mut y = [95f64.to_radians()];
        let message = transform_between(&geographic, None, &utm, &mut x, &mut y, None).unwrap_err();
        assert!(!message.is_empty());
    }

    #[test]
    fn datum_shift_between_engines() {
        let ctx = ctx();
        let geographic = Engine::from_params(ctx.clone(), WGS84).unwrap();
        let shift = Engine::from_params(
            ctx,
            "+proj=pipeline +step +proj=cart +ellps=WGS84 +step +inv +proj=helmert +x=446.448 +y=-125.157 +z=542.06 +step +inv +proj=cart +ellps=airy",
        )
        .unwrap();
        let mut x = [(-0.1276f64).to_radians()];
        let mut y = [51.5072f64.to_radians()];
        transform_between(&geographic, Some((&shift, Direction::Forward)), &geographic, &mut x, &mut y, None)
            .unwrap();
        assert!((x[0].to_degrees() + 0.1276).abs() > 1e-4);

        transform_between(&geographic, Some((&shift, Direction::Inverse)), &geographic, &mut x, &mut y, None)
            .unwrap();
        assert_relative_eq!(x[0].to_degrees(), -0.1276, epsilon = 1e-9);
        assert_relative_eq!(y[0].to_degrees(), 51.5072, epsilon = 1e-9);
    }

    #[test]
    fn missing_grid_fails_to_build() {
        assert!(matches!(
            Engine::from_params(ctx(), "+proj=pipeline +step +inv +proj=hgridshift +grids=no_such_grid.gsb"),
            Err(ConstructionError::Engine { .. })
        ));
    }

    #[test]
    fn crs_to_crs_uses_degrees() {
        let ctx = ctx();
        let wgs84 = SpatialReference::parse(ctx.clone(), "EPSG:4326").unwrap();
        let mercator = SpatialReference::parse(ctx.clone(), "EPSG:3857").unwrap();
        let engine = Engine::between(ctx, &wgs84, &mercator).unwrap();
        let mut x = [10.0];
        let mut y = [20.0];
        engine.trans_arrays(Direction::Forward, &mut x, &mut y, None).unwrap();
        assert_relative_eq!(x[0], 1113194.9079327357, epsilon = 1e-3);
        assert_relative_eq!(y[0], 2273030.926987689, epsilon = 1e-3);
    }
}
