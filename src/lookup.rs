use crate::context::ThreadContext;
use crate::crs::{SpatialReference, WktDialect};
use log::debug;
use std::rc;

/// Numeric identifier of geographic WGS84.
pub const WGS84_SRID: u32 = 4326;

/// Definition text of geographic WGS84, used when a transform is given an empty source.
pub const WGS84_WKT: &str = r#"GEOGCS["WGS 84",DATUM["WGS_1984",SPHEROID["WGS 84",6378137,298.257223563,AUTHORITY["EPSG","7030"]],AUTHORITY["EPSG","6326"]],PRIMEM["Greenwich",0,AUTHORITY["EPSG","8901"]],UNIT["degree",0.0174532925199433,AUTHORITY["EPSG","9122"]],AUTHORITY["EPSG","4326"]]"#;

/// Resolves a numeric CRS identifier to its definition text.
pub trait CrsLookup {
    fn definition(&self, srid: u32) -> Option<String>;
}

/// Knows only WGS84, without touching the PROJ database.
#[derive(Clone, Copy, Debug, Default)]
pub struct BuiltinLookup;

impl CrsLookup for BuiltinLookup {
    fn definition(&self, srid: u32) -> Option<String> {
        (srid == WGS84_SRID).then(|| WGS84_WKT.to_string())
    }
}

/// Resolves `EPSG:<srid>` through the PROJ database and returns it as WKT1.
pub struct ProjDbLookup {
    ctx: rc::Rc<ThreadContext>,
}

impl ProjDbLookup {
    pub fn new() -> Self {
        ProjDbLookup {
            ctx: rc::Rc::new(ThreadContext::new()),
        }
    }
}

impl Default for ProjDbLookup {
    fn default() -> Self {
        ProjDbLookup::new()
    }
}

impl CrsLookup for ProjDbLookup {
    fn definition(&self, srid: u32) -> Option<String> {
        let reference = match SpatialReference::parse(self.ctx.clone(), &format!("EPSG:{srid}")) {
            Ok(reference) => reference,
            Err(err) => {
                debug!("EPSG:{srid} not found: {err}");
                return None;
            }
        };
        reference.to_wkt(WktDialect::Wkt1Gdal).ok()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn builtin_knows_wgs84_only() {
        assert_eq!(BuiltinLookup.definition(WGS84_SRID).as_deref(), Some(WGS84_WKT));
        assert_eq!(BuiltinLookup.definition(3857), None);
    }

    #[test]
    fn database_lookup() {
        let lookup = ProjDbLookup::new();
        let wkt = lookup.definition(32631).unwrap();
        assert!(wkt.starts_with("PROJCS[\"WGS 84 / UTM zone 31N\""));
        assert!(lookup.definition(999_999_999).is_none());
    }
}
