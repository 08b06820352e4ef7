use crate::context::ThreadContext;
use crate::datum;
use crate::error::{ConstructionError, ParseError};
use crate::options::OptionList;
use log::debug;
use std::borrow::Cow;
use std::{ffi, fmt, ptr, rc};

/// WKT flavours PROJ can write a spatial reference as.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WktDialect {
    Wkt2,
    Wkt1Gdal,
    /// The ESRI dialect, with `GCS_`/`D_` style names.
    Wkt1Esri,
}

impl WktDialect {
    fn as_raw(self) -> proj_sys::PJ_WKT_TYPE {
        match self {
            WktDialect::Wkt2 => proj_sys::PJ_WKT_TYPE_PJ_WKT2_2019,
            WktDialect::Wkt1Gdal => proj_sys::PJ_WKT_TYPE_PJ_WKT1_GDAL,
            WktDialect::Wkt1Esri => proj_sys::PJ_WKT_TYPE_PJ_WKT1_ESRI,
        }
    }
}

/// A parsed coordinate reference system.
pub struct SpatialReference {
    pj: ptr::NonNull<proj_sys::PJ>,
    ctx: rc::Rc<ThreadContext>,
}

impl SpatialReference {
    /// Parse `text` with a PROJ context of its own.
    pub fn new(text: &str) -> Result<Self, ParseError> {
        SpatialReference::parse(rc::Rc::new(ThreadContext::new()), text)
    }

    /// Parse any definition PROJ understands: WKT (including the ESRI dialect), PROJJSON,
    /// `AUTHORITY:CODE`, or a PROJ string. PROJ strings lacking `+type=crs` are taken as CRS
    /// definitions all the same.
    pub(crate) fn parse(ctx: rc::Rc<ThreadContext>, text: &str) -> Result<Self, ParseError> {
        let definition = ffi::CString::new(&*as_crs_definition(text))?;
        let pj_ptr = unsafe { proj_sys::proj_create(ctx.as_ptr(), definition.as_ptr()) };
        let Some(pj) = ptr::NonNull::new(pj_ptr) else {
            return Err(ParseError::MalformedDefinition {
                definition: text.to_string(),
                reason: ctx.last_error_message("rejected by PROJ"),
            });
        };
        let reference = SpatialReference { pj, ctx };
        if !reference.is_crs() {
            return Err(ParseError::MalformedDefinition {
                definition: text.to_string(),
                reason: "not a coordinate reference system".to_string(),
            });
        }
        Ok(reference)
    }

    pub(crate) fn as_ptr(&self) -> *mut proj_sys::PJ {
        self.pj.as_ptr()
    }

    fn is_crs(&self) -> bool {
        unsafe { proj_sys::proj_is_crs(self.as_ptr()) != 0 }
    }

    /// Whether coordinates in this CRS are angular (latitude/longitude).
    pub fn is_geographic(&self) -> bool {
        let kind = unsafe { proj_sys::proj_get_type(self.as_ptr()) };
        matches!(
            kind,
            proj_sys::PJ_TYPE_PJ_TYPE_GEOGRAPHIC_CRS
                | proj_sys::PJ_TYPE_PJ_TYPE_GEOGRAPHIC_2D_CRS
                | proj_sys::PJ_TYPE_PJ_TYPE_GEOGRAPHIC_3D_CRS
        )
    }

    pub fn name(&self) -> Option<String> {
        let raw = unsafe { proj_sys::proj_get_name(self.as_ptr()) };
        if raw.is_null() {
            return None;
        }
        unsafe { crate::_string(raw) }.ok()
    }

    pub fn to_wkt(&self, dialect: WktDialect) -> Result<String, ConstructionError> {
        let raw = unsafe {
            proj_sys::proj_as_wkt(self.ctx.as_ptr(), self.as_ptr(), dialect.as_raw(), ptr::null())
        };
        self.exported(raw, "WKT")
    }

    /// PROJ.4 style parameter string, e.g. `+proj=longlat +datum=WGS84 +no_defs +type=crs`.
    pub fn to_proj_params(&self) -> Result<String, ConstructionError> {
        let raw = unsafe {
            proj_sys::proj_as_proj_string(
                self.ctx.as_ptr(),
                self.as_ptr(),
                proj_sys::PJ_PROJ_STRING_TYPE_PJ_PROJ_4,
                ptr::null(),
            )
        };
        self.exported(raw, "PROJ string")
    }

    // The returned buffer belongs to the PJ object and is overwritten by the next export.
    fn exported(&self, raw: *const libc::c_char, what: &str) -> Result<String, ConstructionError> {
        if raw.is_null() {
            return Err(ConstructionError::Export {
                reason: self
                    .ctx
                    .last_error_message(&format!("no {what} representation")),
            });
        }
        unsafe { crate::_string(raw) }.map_err(|err| ConstructionError::Export {
            reason: err.to_string(),
        })
    }

    /// Reinterpret this reference as if it had been written in the ESRI WKT dialect.
    ///
    /// The reference is rendered as ESRI WKT and read back by the lenient WKT parser, which maps
    /// ESRI datum and projection names onto their standard equivalents. When PROJ cannot render
    /// or re-read the ESRI form the reference is left untouched. Returns whether it was replaced.
    pub(crate) fn morph_from_esri(&mut self) -> bool {
        let esri = match self.to_wkt(WktDialect::Wkt1Esri) {
            Ok(esri) => esri,
            Err(err) => {
                debug!("No ESRI form for {:?}: {}", self.name(), err);
                return false;
            }
        };
        let Ok(wkt) = ffi::CString::new(esri) else {
            return false;
        };
        let Ok(options) = OptionList::from_pairs(&[("STRICT", "NO")]) else {
            return false;
        };
        let pj_ptr = options.with_ptr(|opts| unsafe {
            proj_sys::proj_create_from_wkt(
                self.ctx.as_ptr(),
                wkt.as_ptr(),
                opts,
                ptr::null_mut(),
                ptr::null_mut(),
            )
        });
        match ptr::NonNull::new(pj_ptr) {
            Some(pj) => {
                unsafe { proj_sys::proj_destroy(self.as_ptr()) };
                self.pj = pj;
                true
            }
            None => false,
        }
    }
}

impl fmt::Debug for SpatialReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpatialReference")
            .field("name", &self.name())
            .field("geographic", &self.is_geographic())
            .finish()
    }
}

impl Drop for SpatialReference {
    fn drop(&mut self) {
        unsafe {
            proj_sys::proj_destroy(self.as_ptr());
        }
    }
}

fn as_crs_definition(text: &str) -> Cow<'_, str> {
    let trimmed = text.trim();
    if trimmed.starts_with('+') && !trimmed.contains("+type=crs") {
        Cow::Owned(format!("{trimmed} +type=crs"))
    } else {
        Cow::Borrowed(text)
    }
}

/// Derive the projection parameter string used to build an engine for `reference`.
///
/// The reference is exported once, then reinterpreted through the ESRI dialect and exported
/// again; the second export is the one returned, whatever the first produced. ESRI WKT cannot
/// carry `+towgs84` or `+nadgrids`, so datum shift terms of the first export that the second
/// lost are appended to it. The reinterpretation leaves `reference` modified.
pub fn export_proj_params(reference: &mut SpatialReference) -> Result<String, ConstructionError> {
    let first = reference.to_proj_params();
    debug!("Initial parameters for {:?}: {:?}", reference.name(), first);
    reference.morph_from_esri();
    let second = reference.to_proj_params()?;
    Ok(match first {
        Ok(first) => datum::restore_shift(&first, &second),
        Err(_) => second,
    })
}

/// A CRS definition resolved into its spatial reference and engine parameters.
#[derive(Debug)]
pub struct CrsDefinition {
    text: String,
    reference: SpatialReference,
    params: String,
}

impl CrsDefinition {
    pub(crate) fn from_parts(text: &str, reference: SpatialReference, params: String) -> Self {
        CrsDefinition {
            text: text.to_string(),
            reference,
            params,
        }
    }

    /// The definition text this was built from.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn reference(&self) -> &SpatialReference {
        &self.reference
    }

    pub fn params(&self) -> &str {
        &self.params
    }
}
