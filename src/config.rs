use crate::context::ThreadContext;
use crate::direct::DirectTransform;
use crate::error::ConstructionError;
use crate::error_log::SharedErrorLog;
use crate::lookup::{BuiltinLookup, CrsLookup, WGS84_SRID};
use crate::transform::CoordinateTransform;
use std::ffi;
use std::path::Path;
use std::rc;

/// Configuration shared by the transforms it builds.
///
/// ```
/// use crs_transform::{ErrorLog, ProjDbLookup, TransformBuilder};
///
/// let log = ErrorLog::shared();
/// let builder = TransformBuilder::new()
///     .lookup(ProjDbLookup::new())
///     .error_log(log.clone());
///
/// let transform = builder.build("", "EPSG:3857");
/// assert!(transform.is_initialized());
/// assert!(log.borrow().is_empty());
/// ```
pub struct TransformBuilder {
    search_paths: Vec<String>,
    lookup: rc::Rc<dyn CrsLookup>,
    default_srid: u32,
    error_log: Option<SharedErrorLog>,
}

impl TransformBuilder {
    pub fn new() -> Self {
        TransformBuilder {
            search_paths: Vec::new(),
            lookup: rc::Rc::new(BuiltinLookup),
            default_srid: WGS84_SRID,
            error_log: None,
        }
    }

    /// Add a directory to search for resource files such as datum shift grids.
    ///
    /// Once any path is set, PROJ searches only the configured paths.
    pub fn set_search_paths<P: AsRef<Path>>(&mut self, path: P) -> Result<(), ConstructionError> {
        let path = path.as_ref();
        let path_str = path
            .to_str()
            .ok_or_else(|| ConstructionError::InvalidPath(path.to_path_buf()))?;
        ffi::CString::new(path_str)?;
        self.search_paths.push(path_str.to_string());
        Ok(())
    }

    /// Service used to resolve the default geographic CRS.
    pub fn lookup(mut self, lookup: impl CrsLookup + 'static) -> Self {
        self.lookup = rc::Rc::new(lookup);
        self
    }

    /// Identifier of the CRS an empty source falls back to. Defaults to 4326.
    pub fn default_srid(mut self, srid: u32) -> Self {
        self.default_srid = srid;
        self
    }

    /// Log that setup failures are reported to.
    pub fn error_log(mut self, log: SharedErrorLog) -> Self {
        self.error_log = Some(log);
        self
    }

    fn context(&self) -> Result<rc::Rc<ThreadContext>, ConstructionError> {
        let ctx = ThreadContext::new();
        if !self.search_paths.is_empty() {
            ctx.set_search_paths(&self.search_paths)?;
        }
        Ok(rc::Rc::new(ctx))
    }

    /// Build a [`CoordinateTransform`] and initialize it.
    pub fn build(&self, source: &str, destination: &str) -> CoordinateTransform {
        // Paths are checked for nul bytes as they are added.
        let ctx = self
            .context()
            .unwrap_or_else(|_| rc::Rc::new(ThreadContext::new()));
        CoordinateTransform::from_parts(
            ctx,
            self.lookup.clone(),
            self.default_srid,
            self.error_log.clone(),
            source,
            destination,
        )
    }

    /// Build a [`DirectTransform`]. Its transformer is created on first use.
    pub fn build_direct(
        &self,
        source: &str,
        destination: &str,
    ) -> Result<DirectTransform, ConstructionError> {
        Ok(DirectTransform::from_context(self.context()?, source, destination))
    }
}

impl Default for TransformBuilder {
    fn default() -> Self {
        TransformBuilder::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::lookup::{ProjDbLookup, WGS84_WKT};
    use crate::transform::TransformState;
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    struct NoLookup;

    impl CrsLookup for NoLookup {
        fn definition(&self, _srid: u32) -> Option<String> {
            None
        }
    }

    #[test]
    fn database_lookup_supplies_default() {
        let transform = TransformBuilder::new()
            .lookup(ProjDbLookup::new())
            .build("", "");
        assert!(transform.is_short_circuit());
        assert!(transform.source_crs().starts_with("GEOGCS[\"WGS 84\""));
    }

    #[test]
    fn default_srid_is_configurable() {
        let transform = TransformBuilder::new()
            .lookup(ProjDbLookup::new())
            .default_srid(3857)
            .build("", "EPSG:4326");
        assert_eq!(transform.state(), TransformState::Initialized);
        assert!(transform.source_crs().contains("Pseudo-Mercator"));
    }

    #[test]
    fn missing_default_falls_back_to_wgs84() {
        let transform = TransformBuilder::new().lookup(NoLookup).build("", "");
        assert_eq!(transform.source_crs(), WGS84_WKT);
    }

    #[test]
    fn search_paths_are_validated() {
        let mut builder = TransformBuilder::new();
        assert!(builder.set_search_paths("/usr/share/proj").is_ok());
        assert!(matches!(
            builder.set_search_paths(OsStr::from_bytes(b"/tmp/\xff")),
            Err(ConstructionError::InvalidPath(_))
        ));
        assert!(matches!(
            builder.set_search_paths("/tmp/\0grids"),
            Err(ConstructionError::ArgumentNul(_))
        ));
        assert!(builder.build_direct("EPSG:4326", "EPSG:3857").is_ok());
    }
}
