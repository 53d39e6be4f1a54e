//! Conversion of analysis results into publishable layers.

use crate::coverage::CenterlineRecord;
use crate::feature::{Attributes, Crs, LineFeature};
use crate::islands::Islands;
use crate::nodes::NodeTable;
use crate::store::{OutputFeature, OutputGeometry, OutputLayer};

/// Source attributes plus lineage columns shared by every line layer.
fn line_properties(feature: &LineFeature) -> Attributes {
    let mut properties = feature.attributes().clone();
    properties.set("source_row", feature.source().row);
    properties.set("explode", feature.explode());
    properties
}

/// Node table, keyed by `sw_node_id`.
pub fn node_layer(table: &str, crs: Crs, nodes: &NodeTable) -> OutputLayer {
    let features = nodes.nodes().iter().map(|node| {
        let mut properties = Attributes::new();
        properties.set("degree", node.degree());
        properties.set("chained", node.is_chained());
        OutputFeature {
            key: node.id().0 as u64,
            geometry: OutputGeometry::Point(node.point()),
            properties,
        }
    }).collect();

    OutputLayer { table: table.into(), crs, key: "sw_node_id".into(), features }
}

/// Centerlines with their coverage metrics, keyed by `centerline_id`.
pub fn coverage_layer(table: &str, crs: Crs, records: &[CenterlineRecord]) -> OutputLayer {
    let features = records.iter().map(|record| {
        let mut properties = line_properties(&record.feature);
        properties.set("centerline_length", record.feature.length());
        properties.set("sidewalk_length", record.sidewalk_length);
        properties.set("coverage_fraction", record.fraction);
        properties.set("left_fraction", record.left_fraction);
        properties.set("right_fraction", record.right_fraction);
        properties.set("coverage_class", record.class.as_str());
        OutputFeature {
            key: record.feature.id().0 as u64,
            geometry: OutputGeometry::Line(record.feature.geometry().clone()),
            properties,
        }
    }).collect();

    OutputLayer { table: table.into(), crs, key: "centerline_id".into(), features }
}

/// One row per sidewalk tagged with its island, keyed by `sidewalk_id`.
pub fn island_layer(table: &str, crs: Crs, sidewalks: &[LineFeature], islands: &Islands) -> OutputLayer {
    let features = sidewalks.iter().map(|sidewalk| {
        let group = islands.group(islands.group_of(sidewalk.id()));
        let mut properties = line_properties(sidewalk);
        properties.set("island_id", group.id.0);
        properties.set("island_size", group.len());
        properties.set("island_length", group.length);
        properties.set("neighbors", islands.adjacency().degree(sidewalk.id().index()));
        OutputFeature {
            key: sidewalk.id().0 as u64,
            geometry: OutputGeometry::Line(sidewalk.geometry().clone()),
            properties,
        }
    }).collect();

    OutputLayer { table: table.into(), crs, key: "sidewalk_id".into(), features }
}

#[cfg(test)]
mod tests {
    use linegraph::FeatureId;

    use super::*;
    use crate::config::{CoverageParams, IslandParams, SnapParams};
    use crate::feature::testing::line;
    use crate::feature::AttrValue;
    use crate::{coverage::classify, islands::detect_islands, nodes::build_nodes};

    fn sidewalks() -> Vec<LineFeature> {
        vec![
            line(0, &[(0.0, 5.0), (100.0, 5.0)]),
            line(1, &[(100.0, 5.0), (100.0, 50.0)]),
            line(2, &[(300.0, 5.0), (400.0, 5.0)]),
        ]
    }

    #[test]
    fn node_rows_carry_degree() {
        let nodes = build_nodes(&sidewalks(), &SnapParams { tolerance: 0.5, strategy: Default::default() }).unwrap();
        let layer = node_layer("nodes_for_sidewalks", Crs::NAD83_UTM18N, &nodes);

        assert_eq!(layer.key, "sw_node_id");
        assert_eq!(layer.len(), 5);
        assert_eq!(layer.features[1].properties.get("degree"), Some(&AttrValue::Int(2)));
        assert!(matches!(layer.features[0].geometry, OutputGeometry::Point(_)));
    }

    #[test]
    fn coverage_rows_carry_metrics() {
        let centerlines = vec![line(0, &[(0.0, 0.0), (100.0, 0.0)])];
        let params = CoverageParams { buffer_distance: 10.0, parallel_tolerance: 20.0, full_threshold: 0.9, min_parallel_fraction: 0.0 };
        let records = classify(&centerlines, &sidewalks(), &params).unwrap();
        let layer = coverage_layer("centerline_sidewalk_coverage", Crs::NAD83_UTM18N, &records);

        let row = &layer.features[0].properties;
        assert_eq!(row.get("coverage_class"), Some(&AttrValue::from("full")));
        assert_eq!(row.get("explode"), Some(&AttrValue::Null));
        assert_eq!(row.get("source_row"), Some(&AttrValue::Int(0)));
    }

    #[test]
    fn island_rows_carry_group_totals() {
        let sidewalks = sidewalks();
        let islands = detect_islands(&sidewalks, &IslandParams { adjacency_distance: 1.0 }).unwrap();
        let layer = island_layer("sidewalk_islands", Crs::NAD83_UTM18N, &sidewalks, &islands);

        assert_eq!(layer.len(), 3);
        let first = &layer.features[1].properties;
        assert_eq!(first.get("island_id"), Some(&AttrValue::Int(0)));
        assert_eq!(first.get("island_size"), Some(&AttrValue::Int(2)));
        assert_eq!(first.get("island_length"), Some(&AttrValue::Float(145.0)));
        assert_eq!(first.get("neighbors"), Some(&AttrValue::Int(1)));
        assert_eq!(layer.features[2].properties.get("island_id"), Some(&AttrValue::Int(1)));
        assert_eq!(islands.group(islands.group_of(FeatureId(1))).members, vec![FeatureId(0), FeatureId(1)]);
    }
}
