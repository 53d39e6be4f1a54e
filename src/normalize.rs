use std::collections::hash_map::Entry;

use ahash::AHashMap;
use linegraph::FeatureId;
use tracing::debug;

use crate::error::{GapsError, Result};
use crate::feature::{Crs, LineFeature, Reprojector, SourceFeature, SourceGeometry};

/// Explode multi-part lines and reproject everything into `target`.
///
/// Output features are numbered `FeatureId(0)..` in output order: parts of a
/// multi-part source follow each other, in part order, at the position of
/// their source.  Each part records its part index as `explode`; single-part
/// sources carry none.  `target` must be a projected CRS.
pub fn normalize(features: &[SourceFeature], target: Crs) -> Result<Vec<LineFeature>> {
    let mut reprojectors: AHashMap<Crs, Reprojector> = AHashMap::new();
    let mut lines = Vec::with_capacity(features.len());
    let mut exploded = 0usize;

    for feature in features {
        let crs = feature.crs
            .ok_or_else(|| GapsError::geometry(&feature.source, "missing coordinate reference system"))?;

        let reprojector = match reprojectors.entry(crs) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(Reprojector::new(crs, target)?),
        };

        let parts = match &feature.geometry {
            SourceGeometry::Line(line) => vec![(None, line)],
            SourceGeometry::MultiLine(multi) => {
                if multi.0.is_empty() {
                    return Err(GapsError::geometry(&feature.source, "multi-part line has no parts"));
                }
                exploded += 1;
                multi.0.iter().enumerate().map(|(i, line)| (Some(i as u32), line)).collect()
            }
        };

        for (explode, line) in parts {
            if line.0.len() < 2 {
                return Err(GapsError::geometry(&feature.source,
                    format!("line has {} vertices, need at least 2", line.0.len())));
            }
            let id = FeatureId::from(lines.len());
            lines.push(LineFeature::new(
                id,
                feature.source.clone(),
                explode,
                reprojector.apply(line)?,
                target,
                feature.attributes.clone(),
            )?);
        }
    }

    debug!(sources = features.len(), lines = lines.len(), exploded, %target, "normalized line features");
    Ok(lines)
}
