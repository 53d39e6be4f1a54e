use std::{fs, io::{ErrorKind, Write}, path::{Path, PathBuf}};

use geo::{Coord, LineString, MultiLineString};
use serde_json::{json, Value};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use super::{OutputGeometry, OutputLayer, SpatialStore};
use crate::error::{GapsError, Result};
use crate::feature::{Attributes, Crs, SourceFeature, SourceGeometry, SourceKey};

/// A store of GeoJSON FeatureCollections laid out as
/// `<root>/<schema>/<table>.geojson`.
#[derive(Debug, Clone)]
pub struct GeoJsonStore {
    root: PathBuf,
}

impl GeoJsonStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[inline] pub fn root(&self) -> &Path { &self.root }

    /// File backing `schema.table`.
    pub fn table_path(&self, schema: &str, table: &str) -> PathBuf {
        self.root.join(schema).join(format!("{table}.geojson"))
    }
}

/// CRS named by a collection's legacy `crs` member.  Collections without one
/// are RFC 7946 lon/lat; a member we cannot read yields `None`.
fn collection_crs(collection: &Value) -> Option<Crs> {
    match collection.get("crs") {
        None | Some(Value::Null) => Some(Crs::WGS84),
        Some(crs) => crs["properties"]["name"].as_str().and_then(Crs::parse),
    }
}

/// Parse a coordinate list: [[x, y], [x, y], ...].  Extra ordinates are ignored.
fn parse_line_coords(coords: &Value) -> Option<LineString<f64>> {
    coords.as_array()?.iter()
        .map(|pair| {
            let pair = pair.as_array()?;
            Some(Coord { x: pair.first()?.as_f64()?, y: pair.get(1)?.as_f64()? })
        })
        .collect::<Option<Vec<_>>>()
        .map(LineString)
}

fn parse_geometry(geometry: &Value) -> std::result::Result<SourceGeometry, String> {
    let coords = &geometry["coordinates"];
    match geometry["type"].as_str() {
        Some("LineString") => parse_line_coords(coords)
            .map(SourceGeometry::Line)
            .ok_or_else(|| "malformed LineString coordinates".into()),
        Some("MultiLineString") => coords.as_array()
            .and_then(|parts| parts.iter().map(parse_line_coords).collect::<Option<Vec<_>>>())
            .map(|parts| SourceGeometry::MultiLine(MultiLineString::new(parts)))
            .ok_or_else(|| "malformed MultiLineString coordinates".into()),
        Some(other) => Err(format!("{other} geometry where a line was expected")),
        None => Err("geometry has no type".into()),
    }
}

fn geometry_to_json(geometry: &OutputGeometry) -> Value {
    match geometry {
        OutputGeometry::Point(p) => json!({ "type": "Point", "coordinates": [p.x(), p.y()] }),
        OutputGeometry::Line(ls) => json!({
            "type": "LineString",
            "coordinates": ls.coords().map(|c| [c.x, c.y]).collect::<Vec<_>>(),
        }),
    }
}

/// Serialize a layer as a FeatureCollection with a legacy `crs` member.
fn layer_to_json(layer: &OutputLayer) -> Value {
    let features = layer.features.iter().map(|feature| {
        // The key column comes first and is never shadowed by a source attribute.
        let mut properties = serde_json::Map::new();
        properties.insert(layer.key.clone(), json!(feature.key));
        properties.extend(feature.properties.to_json().into_iter().filter(|(name, _)| *name != layer.key));
        json!({
            "type": "Feature",
            "id": feature.key,
            "geometry": geometry_to_json(&feature.geometry),
            "properties": properties,
        })
    }).collect::<Vec<_>>();

    json!({
        "type": "FeatureCollection",
        "name": layer.table,
        "crs": { "type": "name", "properties": { "name": layer.crs.urn() } },
        "features": features,
    })
}

impl SpatialStore for GeoJsonStore {
    fn read_lines(&self, schema: &str, table: &str) -> Result<Vec<SourceFeature>> {
        let path = self.table_path(schema, table);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(GapsError::Input(format!("table {schema}.{table} not found at {}", path.display())));
            }
            Err(e) => return Err(GapsError::io(&path, e)),
        };
        let collection: Value = serde_json::from_slice(&bytes).map_err(|e| GapsError::json(&path, e))?;

        if collection["type"].as_str() != Some("FeatureCollection") {
            return Err(GapsError::Input(format!("{schema}.{table} is not a FeatureCollection")));
        }
        let crs = collection_crs(&collection);
        let Some(features) = collection["features"].as_array() else {
            return Err(GapsError::Input(format!("{schema}.{table} has no features array")));
        };
        if features.is_empty() {
            return Err(GapsError::Input(format!("{schema}.{table} is empty")));
        }

        let lines = features.iter().enumerate().map(|(row, feature)| {
            let source = SourceKey::new(table, row as u32);
            let geometry = match &feature["geometry"] {
                Value::Null => return Err(GapsError::Input(format!("{source} has null geometry"))),
                geometry => parse_geometry(geometry).map_err(|reason| GapsError::Input(format!("{source}: {reason}")))?,
            };
            let attributes = feature["properties"].as_object().map(Attributes::from_json).unwrap_or_default();
            Ok(SourceFeature { source, geometry, crs, attributes })
        }).collect::<Result<Vec<_>>>()?;

        debug!(schema, table, features = lines.len(), crs = ?crs, "read line table");
        Ok(lines)
    }

    fn publish(&self, schema: &str, layers: &[OutputLayer]) -> Result<()> {
        let dir = self.root.join(schema);
        fs::create_dir_all(&dir).map_err(|e| GapsError::io(&dir, e))?;

        // Stage everything first; nothing becomes visible until all layers are written.
        let mut staged = Vec::with_capacity(layers.len());
        for layer in layers {
            let mut file = NamedTempFile::new_in(&dir).map_err(|e| GapsError::io(&dir, e))?;
            let bytes = serde_json::to_vec(&layer_to_json(layer)).map_err(|e| GapsError::json(file.path(), e))?;
            file.write_all(&bytes).map_err(|e| GapsError::io(file.path(), e))?;
            file.as_file().sync_all().map_err(|e| GapsError::io(file.path(), e))?;
            staged.push((file, self.table_path(schema, &layer.table)));
        }

        for (file, path) in staged {
            file.persist(&path).map_err(|e| GapsError::io(&path, e.error))?;
        }

        info!(schema, layers = layers.len(), features = layers.iter().map(OutputLayer::len).sum::<usize>(), "published layers");
        Ok(())
    }
}
