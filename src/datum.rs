//! Datum shifts between the geodetic bases of two CRSs.
//!
//! A PROJ.4 parameter string relates its datum to WGS84 through `+towgs84` (a 3 or 7 parameter
//! Helmert transformation, position vector convention) or `+nadgrids` (horizontal shift grids),
//! either given directly or implied by `+datum`. Two such datums are joined by a pipeline over
//! geocentric cartesian coordinates that consumes and produces geodetic radians, so it slots in
//! between the inverse of one projection engine and the forward of the other.

const ELLIPSOID_KEYS: [&str; 8] = ["ellps", "a", "b", "rf", "f", "R", "es", "e"];

/// Datums a `+datum=` term can name, with the ellipsoid and shift it stands for.
const KNOWN_DATUMS: [(&str, &str, &str); 10] = [
    ("WGS84", "ellps=WGS84", "towgs84=0,0,0"),
    ("GGRS87", "ellps=GRS80", "towgs84=-199.87,74.79,246.62"),
    ("NAD83", "ellps=GRS80", "towgs84=0,0,0"),
    ("NAD27", "ellps=clrk66", "nadgrids=@conus,@alaska,@ntv2_0.gsb,@ntv1_can.dat"),
    ("potsdam", "ellps=bessel", "towgs84=598.1,73.7,418.2,0.202,0.045,-2.455,6.7"),
    ("carthage", "ellps=clrk80ign", "towgs84=-263.0,6.0,431.0"),
    ("hermannskogel", "ellps=bessel", "towgs84=577.326,90.129,463.919,5.137,1.474,5.297,2.4232"),
    ("ire65", "ellps=mod_airy", "towgs84=482.530,-130.596,564.557,-1.042,-0.214,-0.631,8.15"),
    ("nzgd49", "ellps=intl", "towgs84=59.47,-5.04,187.44,0.47,-0.1,1.024,-4.5993"),
    ("OSGB36", "ellps=airy", "towgs84=446.448,-125.157,542.060,0.1502,0.2470,0.8421,-20.4894"),
];

const SHIFT_KEYS: [&str; 2] = ["towgs84", "nadgrids"];

#[derive(Clone, Debug, PartialEq)]
enum Shift {
    /// No relation to WGS84 is known; no shift is applied to or from this datum.
    Unknown,
    Helmert(Vec<f64>),
    Grids(String),
}

/// The geodetic datum of a CRS, as far as its PROJ.4 parameters describe it.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Datum {
    ellipsoid: Vec<String>,
    shift: Shift,
}

impl Datum {
    pub fn from_params(params: &str) -> Self {
        let mut terms: Vec<(&str, &str)> = params
            .split_whitespace()
            .filter_map(|token| token.strip_prefix('+'))
            .map(|token| token.split_once('=').unwrap_or((token, "")))
            .collect();
        // Explicit terms come first and win over the ones a named datum expands to.
        let expansion: Vec<(&str, &str)> = find(&terms, "datum")
            .and_then(|name| {
                KNOWN_DATUMS
                    .iter()
                    .find(|(known, ..)| known.eq_ignore_ascii_case(name))
            })
            .map(|(_, ellipsoid, shift)| {
                [*ellipsoid, *shift]
                    .into_iter()
                    .filter_map(|term| term.split_once('='))
                    .collect()
            })
            .unwrap_or_default();
        terms.extend(expansion);

        let mut seen: Vec<&str> = Vec::new();
        let mut ellipsoid = Vec::new();
        for &(key, value) in &terms {
            if ELLIPSOID_KEYS.contains(&key) && !seen.contains(&key) {
                seen.push(key);
                ellipsoid.push(format!("+{key}={value}"));
            }
        }

        let shift = if let Some(grids) = find(&terms, "nadgrids") {
            Shift::Grids(grids.to_string())
        } else if let Some(values) = find(&terms, "towgs84") {
            values
                .split(',')
                .map(|value| value.trim().parse::<f64>())
                .collect::<Result<Vec<_>, _>>()
                .ok()
                .filter(|values| values.len() == 3 || values.len() == 7)
                .map_or(Shift::Unknown, Shift::Helmert)
        } else {
            Shift::Unknown
        };

        Datum { ellipsoid, shift }
    }

    pub fn is_known(&self) -> bool {
        self.shift != Shift::Unknown
    }

    // Grid shifted datums meet WGS84 on the WGS84 ellipsoid.
    fn cartesian_ellipsoid(&self) -> String {
        match self.shift {
            Shift::Grids(_) => "+ellps=WGS84".to_string(),
            _ if self.ellipsoid.is_empty() => "+ellps=GRS80".to_string(),
            _ => self.ellipsoid.join(" "),
        }
    }

    fn grids(&self) -> Option<&str> {
        match &self.shift {
            Shift::Grids(grids) if !is_null_grid(grids) => Some(grids.as_str()),
            _ => None,
        }
    }

    fn helmert(&self) -> Option<String> {
        let Shift::Helmert(values) = &self.shift else {
            return None;
        };
        if values.iter().all(|value| *value == 0.0) {
            return None;
        }
        match values.as_slice() {
            [x, y, z] => Some(format!("+proj=helmert +x={x} +y={y} +z={z}")),
            [x, y, z, rx, ry, rz, s] => Some(format!(
                "+proj=helmert +x={x} +y={y} +z={z} +rx={rx} +ry={ry} +rz={rz} +s={s} +convention=position_vector"
            )),
            _ => None,
        }
    }
}

fn find<'a>(terms: &[(&'a str, &'a str)], key: &str) -> Option<&'a str> {
    terms
        .iter()
        .find(|(term, _)| *term == key)
        .map(|(_, value)| *value)
}

fn is_shift_term(token: &&str) -> bool {
    token
        .strip_prefix('+')
        .and_then(|term| term.split_once('='))
        .is_some_and(|(key, _)| SHIFT_KEYS.contains(&key))
}

fn is_null_grid(grids: &str) -> bool {
    grids
        .split(',')
        .all(|grid| grid.trim_start_matches('@') == "null")
}

/// Pipeline carrying geodetic radians from the `source` datum to the `target` datum.
///
/// `None` when nothing needs to happen: either datum is unknown, or the two are the same.
pub(crate) fn shift_pipeline(source: &Datum, target: &Datum) -> Option<String> {
    if !source.is_known() || !target.is_known() || source == target {
        return None;
    }
    let source_ellipsoid = source.cartesian_ellipsoid();
    let target_ellipsoid = target.cartesian_ellipsoid();
    let source_helmert = source.helmert();
    let target_helmert = target.helmert();
    if source.grids().is_none()
        && target.grids().is_none()
        && source_helmert.is_none()
        && target_helmert.is_none()
        && source_ellipsoid == target_ellipsoid
    {
        return None;
    }

    let mut steps = vec!["+proj=pipeline".to_string()];
    if let Some(grids) = source.grids() {
        steps.push(format!("+step +proj=hgridshift +grids={grids}"));
    }
    steps.push(format!("+step +proj=cart {source_ellipsoid}"));
    if let Some(helmert) = source_helmert {
        steps.push(format!("+step {helmert}"));
    }
    if let Some(helmert) = target_helmert {
        steps.push(format!("+step +inv {helmert}"));
    }
    steps.push(format!("+step +inv +proj=cart {target_ellipsoid}"));
    if let Some(grids) = target.grids() {
        steps.push(format!("+step +inv +proj=hgridshift +grids={grids}"));
    }
    Some(steps.join(" "))
}

/// `params` with the datum shift terms of `original` put back, when `params` has none of its own.
pub(crate) fn restore_shift(original: &str, params: &str) -> String {
    if params.split_whitespace().any(|token| is_shift_term(&token)) {
        return params.to_string();
    }
    let terms: Vec<&str> = original.split_whitespace().filter(is_shift_term).collect();
    if terms.is_empty() {
        params.to_string()
    } else {
        format!("{params} {}", terms.join(" "))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const OSGB36: &str = "+proj=tmerc +lat_0=49 +lon_0=-2 +k=0.9996012717 +x_0=400000 +y_0=-100000 +ellps=airy +towgs84=446.448,-125.157,542.06,0.15,0.247,0.842,-20.489 +units=m +no_defs +type=crs";

    #[test]
    fn named_datum_expands() {
        let datum = Datum::from_params("+proj=longlat +datum=WGS84 +no_defs +type=crs");
        assert_eq!(datum.ellipsoid, vec!["+ellps=WGS84"]);
        assert_eq!(datum.shift, Shift::Helmert(vec![0.0, 0.0, 0.0]));
        assert_eq!(
            datum,
            Datum::from_params("+proj=utm +zone=31 +ellps=WGS84 +towgs84=0,0,0 +units=m")
        );
    }

    #[test]
    fn explicit_terms_win() {
        let datum = Datum::from_params("+proj=longlat +datum=OSGB36 +towgs84=1,2,3");
        assert_eq!(datum.ellipsoid, vec!["+ellps=airy"]);
        assert_eq!(datum.shift, Shift::Helmert(vec![1.0, 2.0, 3.0]));
    }

    #[test]
    fn datum_without_shift_is_unknown() {
        let datum = Datum::from_params("+proj=longlat +ellps=airy +no_defs +type=crs");
        assert!(!datum.is_known());
        assert!(!Datum::from_params("+proj=longlat +ellps=airy +towgs84=1,2").is_known());
        let wgs84 = Datum::from_params("+proj=longlat +datum=WGS84");
        assert_eq!(shift_pipeline(&wgs84, &datum), None);
    }

    #[test]
    fn same_datum_needs_no_pipeline() {
        let wgs84 = Datum::from_params("+proj=longlat +datum=WGS84 +no_defs +type=crs");
        let utm = Datum::from_params("+proj=utm +zone=31 +datum=WGS84 +units=m +no_defs +type=crs");
        assert_eq!(shift_pipeline(&wgs84, &utm), None);
    }

    #[test]
    fn null_grid_on_wgs84_needs_no_pipeline() {
        let wgs84 = Datum::from_params("+proj=longlat +datum=WGS84");
        let mercator = Datum::from_params(
            "+proj=merc +a=6378137 +b=6378137 +lat_ts=0 +lon_0=0 +x_0=0 +y_0=0 +k=1 +units=m +nadgrids=@null +wktext +no_defs +type=crs",
        );
        assert!(mercator.is_known());
        assert_eq!(shift_pipeline(&wgs84, &mercator), None);
    }

    #[test]
    fn helmert_pipeline() {
        let wgs84 = Datum::from_params("+proj=longlat +datum=WGS84");
        let osgb = Datum::from_params(OSGB36);
        assert_eq!(
            shift_pipeline(&wgs84, &osgb).unwrap(),
            "+proj=pipeline +step +proj=cart +ellps=WGS84 \
             +step +inv +proj=helmert +x=446.448 +y=-125.157 +z=542.06 +rx=0.15 +ry=0.247 +rz=0.842 +s=-20.489 +convention=position_vector \
             +step +inv +proj=cart +ellps=airy"
        );
        assert!(shift_pipeline(&osgb, &wgs84).unwrap().contains("+step +proj=helmert"));
    }

    #[test]
    fn grid_pipeline() {
        let wgs84 = Datum::from_params("+proj=longlat +datum=WGS84");
        let gridded = Datum::from_params("+proj=longlat +ellps=clrk66 +nadgrids=ntv1_can.dat");
        assert_eq!(
            shift_pipeline(&gridded, &wgs84).unwrap(),
            "+proj=pipeline +step +proj=hgridshift +grids=ntv1_can.dat \
             +step +proj=cart +ellps=WGS84 +step +inv +proj=cart +ellps=WGS84"
        );
        assert!(shift_pipeline(&wgs84, &gridded).unwrap().ends_with("+step +inv +proj=hgridshift +grids=ntv1_can.dat"));
    }

    #[test]
    fn restores_dropped_shift() {
        assert_eq!(
            restore_shift(OSGB36, "+proj=tmerc +ellps=airy +units=m +no_defs +type=crs"),
            "+proj=tmerc +ellps=airy +units=m +no_defs +type=crs +towgs84=446.448,-125.157,542.06,0.15,0.247,0.842,-20.489"
        );
        assert_eq!(
            restore_shift(OSGB36, "+proj=tmerc +towgs84=1,2,3"),
            "+proj=tmerc +towgs84=1,2,3"
        );
        assert_eq!(restore_shift("+proj=longlat +datum=WGS84", "+proj=longlat"), "+proj=longlat");
    }
}
