use std::fmt;

use geo::{Coord, LineString, MapCoords};
use proj4rs::{proj::Proj, transform::transform};

use crate::error::{GapsError, Result};

/// A coordinate reference system, identified by its EPSG code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Crs(u32);

/// What we know about a supported CRS.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CrsDefinition {
    pub proj4: String,
    /// Angular (lon/lat) rather than planar coordinates.
    pub geographic: bool,
}

impl Crs {
    pub const WGS84: Self = Self(4326);
    pub const NAD83: Self = Self(4269);
    /// NAD83 / UTM zone 18N, the project's working CRS.
    pub const NAD83_UTM18N: Self = Self(26918);

    #[inline] pub const fn epsg(code: u32) -> Self { Self(code) }

    #[inline] pub fn code(&self) -> u32 { self.0 }

    /// Parse the CRS names that appear in GeoJSON `crs` members:
    /// `EPSG:26918`, `urn:ogc:def:crs:EPSG::26918`, `urn:ogc:def:crs:OGC:1.3:CRS84`.
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim();
        if name.eq_ignore_ascii_case("urn:ogc:def:crs:OGC:1.3:CRS84") || name.eq_ignore_ascii_case("CRS84") {
            return Some(Self::WGS84);
        }
        let upper = name.to_ascii_uppercase();
        let rest = upper.strip_prefix("URN:OGC:DEF:CRS:EPSG:")
            .or_else(|| upper.strip_prefix("EPSG:"))?;
        // `urn:ogc:def:crs:EPSG::26918` and `urn:ogc:def:crs:EPSG:6.6:26918` both end in the code.
        rest.rsplit(':').next()?.parse().ok().map(Self)
    }

    /// PROJ.4 definition for supported codes, `None` otherwise.
    pub fn definition(&self) -> Option<CrsDefinition> {
        let projected = |proj4: String| Some(CrsDefinition { proj4, geographic: false });
        match self.0 {
            4326 => Some(CrsDefinition {
                proj4: "+proj=longlat +datum=WGS84 +no_defs +type=crs".into(), geographic: true }),
            4269 => Some(CrsDefinition {
                proj4: "+proj=longlat +datum=NAD83 +no_defs +type=crs".into(), geographic: true }),
            3857 => projected("+proj=merc +a=6378137 +b=6378137 +lat_ts=0 +lon_0=0 +x_0=0 +y_0=0 +k=1 +units=m +no_defs +type=crs".into()),
            // NAD83 / Pennsylvania South (ftUS)
            2272 => projected("+proj=lcc +lat_0=39.3333333333333 +lon_0=-77.75 +lat_1=40.9666666666667 +lat_2=39.9333333333333 +x_0=600000 +y_0=0 +datum=NAD83 +units=us-ft +no_defs +type=crs".into()),
            // NAD83 / New Jersey (ftUS)
            3424 => projected("+proj=tmerc +lat_0=38.8333333333333 +lon_0=-74.5 +k=0.9999 +x_0=150000 +y_0=0 +datum=NAD83 +units=us-ft +no_defs +type=crs".into()),
            code @ 26901..=26923 => projected(format!(
                "+proj=utm +zone={} +datum=NAD83 +units=m +no_defs +type=crs", code - 26900)),
            code @ 32601..=32660 => projected(format!(
                "+proj=utm +zone={} +datum=WGS84 +units=m +no_defs +type=crs", code - 32600)),
            code @ 32701..=32760 => projected(format!(
                "+proj=utm +zone={} +south +datum=WGS84 +units=m +no_defs +type=crs", code - 32700)),
            _ => None,
        }
    }

    /// `urn:ogc:def:crs:EPSG::<code>`, the form written to GeoJSON `crs` members.
    pub fn urn(&self) -> String { format!("urn:ogc:def:crs:EPSG::{}", self.0) }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.0)
    }
}

/// Transforms coordinates from one supported CRS to a projected one.
pub(crate) struct Reprojector {
    from: Proj,
    to: Proj,
    from_geographic: bool,
    identity: bool,
}

impl Reprojector {
    /// Build a transform into `target`, which must be projected.
    pub(crate) fn new(source: Crs, target: Crs) -> Result<Self> {
        let resolve = |crs: Crs| crs.definition()
            .ok_or_else(|| GapsError::geometry(crs, "unsupported coordinate reference system"));
        let source_def = resolve(source)?;
        let target_def = resolve(target)?;
        if target_def.geographic {
            return Err(GapsError::geometry(target, "target CRS must be projected, not geographic"));
        }

        let build = |crs: Crs, def: &CrsDefinition| Proj::from_proj_string(&def.proj4)
            .map_err(|e| GapsError::geometry(crs, format!("failed to build PROJ.4 `{}`: {e}", def.proj4)));

        Ok(Self {
            from: build(source, &source_def)?,
            to: build(target, &target_def)?,
            from_geographic: source_def.geographic,
            identity: source == target,
        })
    }

    /// Reproject a line string.  Geographic input is in degrees; output is in
    /// the target's linear units.
    pub(crate) fn apply(&self, line: &LineString<f64>) -> Result<LineString<f64>> {
        if self.identity { return Ok(line.clone()) }

        line.try_map_coords(|coord: Coord<f64>| {
            let mut point = if self.from_geographic {
                (coord.x.to_radians(), coord.y.to_radians(), 0.0)
            } else {
                (coord.x, coord.y, 0.0)
            };
            transform(&self.from, &self.to, &mut point)
                .map_err(|e| GapsError::geometry(format!("({}, {})", coord.x, coord.y), format!("CRS transform failed: {e}")))?;
            Ok(Coord { x: point.0, y: point.1 })
        })
    }
}
