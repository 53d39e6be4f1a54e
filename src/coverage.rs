use std::fmt;

use geo::{BoundingRect, Coord, Euclidean, Length, Line};
use rayon::prelude::*;
use rstar::RTree;
use tracing::info;

use crate::config::CoverageParams;
use crate::error::{GapsError, Result};
use crate::feature::{common_crs, LineFeature};
use crate::index::{padded_envelope, segment_tree, IndexedSegment};

/// Overlaps shorter than this (in CRS units) contribute nothing.
const MIN_OVERLAP: f64 = 1e-6;

/// Discrete sidewalk coverage of a centerline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CoverageClass {
    Full,
    Partial,
    None,
}

impl CoverageClass {
    /// Bucket a coverage fraction.
    pub fn from_fraction(fraction: f64, params: &CoverageParams) -> Self {
        if fraction >= params.full_threshold { Self::Full }
        else if fraction > params.min_parallel_fraction { Self::Partial }
        else { Self::None }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Partial => "partial",
            Self::None => "none",
        }
    }
}

impl fmt::Display for CoverageClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// A centerline with its measured sidewalk coverage.
#[derive(Debug, Clone, PartialEq)]
pub struct CenterlineRecord {
    pub feature: LineFeature,
    /// Share of the centerline with parallel sidewalk on either side, in [0, 1].
    pub fraction: f64,
    /// Share with parallel sidewalk to the left of the digitized direction.
    pub left_fraction: f64,
    /// Share with parallel sidewalk to the right of the digitized direction.
    pub right_fraction: f64,
    /// In-buffer length of qualifying sidewalk, summed per centerline segment.
    pub sidewalk_length: f64,
    pub class: CoverageClass,
}

/// Sorted, merged set of `[start, end]` intervals along a segment.
#[derive(Debug, Default)]
struct Intervals(Vec<(f64, f64)>);

impl Intervals {
    #[inline] fn push(&mut self, start: f64, end: f64) { self.0.push((start, end)) }

    /// Total length covered by the union of the intervals.
    fn measure(&self) -> f64 {
        let mut spans = self.0.clone();
        spans.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut total = 0.0;
        let mut current: Option<(f64, f64)> = None;
        for (start, end) in spans {
            current = match current {
                Some((s, e)) if start <= e => Some((s, e.max(end))),
                Some((s, e)) => { total += e - s; Some((start, end)) }
                None => Some((start, end)),
            };
        }
        total + current.map_or(0.0, |(s, e)| e - s)
    }

    fn extend(&mut self, other: &Intervals) { self.0.extend_from_slice(&other.0) }
}

/// Restrict `[lo, hi]` to where `f(λ) = f0 + λ·(f1 − f0)` lies in `[min, max]`.
fn clip_linear((lo, hi): (f64, f64), f0: f64, f1: f64, min: f64, max: f64) -> Option<(f64, f64)> {
    let df = f1 - f0;
    if df.abs() < f64::EPSILON {
        return (min..=max).contains(&f0).then_some((lo, hi));
    }
    let (a, b) = ((min - f0) / df, (max - f0) / df);
    let (lo, hi) = (lo.max(a.min(b)), hi.min(a.max(b)));
    (lo <= hi).then_some((lo, hi))
}

#[inline] fn dot(a: Coord<f64>, b: Coord<f64>) -> f64 { a.x * b.x + a.y * b.y }

#[inline] fn cross(a: Coord<f64>, b: Coord<f64>) -> f64 { a.x * b.y - a.y * b.x }

/// Per-segment coverage accumulated along one centerline.
#[derive(Debug, Default)]
struct SegmentCoverage {
    left: Intervals,
    right: Intervals,
    sidewalk_length: f64,
}

/// Project the parallel, in-buffer part of each candidate sidewalk segment
/// onto the centerline segment `a → b`.
fn cover_segment<'a>(
    segment: Line<f64>,
    candidates: impl Iterator<Item = &'a IndexedSegment>,
    buffer: f64,
    max_sin: f64,
) -> Option<SegmentCoverage> {
    let length = Euclidean.length(&segment);
    if length <= MIN_OVERLAP { return None }

    let tangent = segment.delta() / length;
    let normal = Coord { x: -tangent.y, y: tangent.x };
    let mut coverage = SegmentCoverage::default();

    for candidate in candidates {
        let sidewalk = candidate.line;
        let sidewalk_length = Euclidean.length(&sidewalk);
        if sidewalk_length <= MIN_OVERLAP { continue }

        // Undirected angle between the two segments.
        if cross(tangent, sidewalk.delta() / sidewalk_length).abs() > max_sin { continue }

        // Local frame: `t` along the centerline from its start, `n` to the left.
        let (p, q) = (sidewalk.start - segment.start, sidewalk.end - segment.start);
        let (tp, tq) = (dot(p, tangent), dot(q, tangent));
        let (np, nq) = (dot(p, normal), dot(q, normal));

        let Some(span) = clip_linear((0.0, 1.0), tp, tq, 0.0, length) else { continue };
        let Some((lo, hi)) = clip_linear(span, np, nq, -buffer, buffer) else { continue };

        let (t0, t1) = (tp + lo * (tq - tp), tp + hi * (tq - tp));
        let (start, end) = (t0.min(t1), t0.max(t1));
        if end - start <= MIN_OVERLAP { continue }

        coverage.sidewalk_length += (hi - lo) * sidewalk_length;
        let n_mid = np + 0.5 * (lo + hi) * (nq - np);
        if n_mid >= 0.0 { coverage.left.push(start, end) } else { coverage.right.push(start, end) }
    }

    Some(coverage)
}

fn classify_one(centerline: &LineFeature, tree: &RTree<IndexedSegment>, params: &CoverageParams, max_sin: f64) -> CenterlineRecord {
    let (mut total, mut covered, mut left, mut right, mut sidewalk_length) = (0.0, 0.0, 0.0, 0.0, 0.0);

    for segment in centerline.geometry().lines() {
        let envelope = padded_envelope(segment.bounding_rect(), params.buffer_distance);
        let candidates = tree.locate_in_envelope_intersecting(&envelope);
        let Some(coverage) = cover_segment(segment, candidates, params.buffer_distance, max_sin) else { continue };

        let mut either = Intervals::default();
        either.extend(&coverage.left);
        either.extend(&coverage.right);

        total += Euclidean.length(&segment);
        covered += either.measure();
        left += coverage.left.measure();
        right += coverage.right.measure();
        sidewalk_length += coverage.sidewalk_length;
    }

    let share = |part: f64| if total > MIN_OVERLAP { (part / total).clamp(0.0, 1.0) } else { 0.0 };
    let fraction = share(covered);

    CenterlineRecord {
        feature: centerline.clone(),
        fraction,
        left_fraction: share(left),
        right_fraction: share(right),
        sidewalk_length,
        class: CoverageClass::from_fraction(fraction, params),
    }
}

/// Measure how much of each centerline has parallel sidewalk alongside it.
///
/// For every centerline segment, sidewalk segments within
/// `params.buffer_distance` and within `params.parallel_tolerance` degrees of
/// the segment's direction are clipped to the buffer strip and projected onto
/// the segment.  Projections are merged before measuring, so overlapping or
/// both-side sidewalks are not counted twice.  Centerlines with no sidewalk
/// nearby get a fraction of `0`.  Records come back in input order.
pub fn classify(centerlines: &[LineFeature], sidewalks: &[LineFeature], params: &CoverageParams) -> Result<Vec<CenterlineRecord>> {
    params.validate()?;
    if let (Some(a), Some(b)) = (common_crs(centerlines)?, common_crs(sidewalks)?) {
        if a != b {
            return Err(GapsError::geometry(sidewalks[0].source(),
                format!("sidewalk CRS {b} differs from centerline CRS {a}")));
        }
    }

    let tree = segment_tree(sidewalks);
    let max_sin = params.parallel_tolerance.to_radians().sin();

    let records = centerlines.par_iter()
        .map(|centerline| classify_one(centerline, &tree, params, max_sin))
        .collect::<Vec<_>>();

    let count = |class| records.iter().filter(|r| r.class == class).count();
    info!(
        centerlines = records.len(),
        sidewalk_segments = tree.size(),
        full = count(CoverageClass::Full),
        partial = count(CoverageClass::Partial),
        none = count(CoverageClass::None),
        "classified centerline coverage"
    );
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::testing::line;

    fn params() -> CoverageParams {
        CoverageParams { buffer_distance: 10.0, parallel_tolerance: 20.0, full_threshold: 0.9, min_parallel_fraction: 0.0 }
    }

    fn classify_single(centerline: &[(f64, f64)], sidewalks: &[&[(f64, f64)]]) -> CenterlineRecord {
        let centerlines = vec![line(0, centerline)];
        let sidewalks = sidewalks.iter().enumerate().map(|(i, c)| line(i as u32, c)).collect::<Vec<_>>();
        classify(&centerlines, &sidewalks, &params()).unwrap().remove(0)
    }

    #[test]
    fn full_length_parallel_sidewalk_is_full() {
        let record = classify_single(&[(0.0, 0.0), (100.0, 0.0)], &[&[(0.0, 6.0), (100.0, 6.0)]]);
        assert!((record.fraction - 1.0).abs() < 1e-9);
        assert_eq!(record.class, CoverageClass::Full);
        assert!((record.left_fraction - 1.0).abs() < 1e-9);
        assert_eq!(record.right_fraction, 0.0);
        assert!((record.sidewalk_length - 100.0).abs() < 1e-9);
    }

    #[test]
    fn no_sidewalk_nearby_is_none() {
        let record = classify_single(&[(0.0, 0.0), (100.0, 0.0)], &[&[(0.0, 50.0), (100.0, 50.0)]]);
        assert_eq!(record.fraction, 0.0);
        assert_eq!(record.class, CoverageClass::None);
    }

    #[test]
    fn no_sidewalks_at_all_is_none() {
        let centerlines = vec![line(0, &[(0.0, 0.0), (100.0, 0.0)])];
        let records = classify(&centerlines, &[], &params()).unwrap();
        assert_eq!(records[0].fraction, 0.0);
        assert_eq!(records[0].class, CoverageClass::None);
    }

    #[test]
    fn crossing_sidewalk_does_not_count() {
        let record = classify_single(&[(0.0, 0.0), (100.0, 0.0)], &[&[(50.0, -30.0), (50.0, 30.0)]]);
        assert_eq!(record.fraction, 0.0);
        assert_eq!(record.sidewalk_length, 0.0);
    }

    #[test]
    fn partial_overlap_is_clipped_to_the_centerline() {
        // Sidewalk runs from x=60 past the end of the street to x=160.
        let record = classify_single(&[(0.0, 0.0), (100.0, 0.0)], &[&[(60.0, -5.0), (160.0, -5.0)]]);
        assert!((record.fraction - 0.4).abs() < 1e-9);
        assert!((record.right_fraction - 0.4).abs() < 1e-9);
        assert_eq!(record.class, CoverageClass::Partial);
    }

    #[test]
    fn sidewalk_leaving_the_buffer_is_clipped() {
        // Slight angle: starts 0 away and drifts to 20 away; only the first half is within 10.
        let record = classify_single(&[(0.0, 0.0), (100.0, 0.0)], &[&[(0.0, 0.0), (100.0, 20.0)]]);
        assert!((record.fraction - 0.5).abs() < 1e-9);
    }

    #[test]
    fn both_sides_are_not_double_counted() {
        let record = classify_single(&[(0.0, 0.0), (100.0, 0.0)], &[
            &[(0.0, 5.0), (100.0, 5.0)],
            &[(0.0, -5.0), (100.0, -5.0)],
            &[(10.0, 6.0), (40.0, 6.0)],
        ]);
        assert!((record.fraction - 1.0).abs() < 1e-9);
        assert!((record.left_fraction - 1.0).abs() < 1e-9);
        assert!((record.right_fraction - 1.0).abs() < 1e-9);
    }

    #[test]
    fn fractions_follow_a_bent_centerline() {
        // L-shaped street with sidewalk only along the second leg.
        let record = classify_single(&[(0.0, 0.0), (100.0, 0.0), (100.0, 100.0)], &[&[(105.0, 0.0), (105.0, 100.0)]]);
        assert!((record.fraction - 0.5).abs() < 1e-9);
    }

    #[test]
    fn zero_length_overlap_contributes_nothing() {
        // Sidewalk only touches the buffer corner.
        let record = classify_single(&[(0.0, 0.0), (100.0, 0.0)], &[&[(100.0, 10.0), (150.0, 10.0)]]);
        assert_eq!(record.fraction, 0.0);
    }

    #[test]
    fn fractions_stay_in_bounds() {
        let sidewalks: Vec<&[(f64, f64)]> = vec![
            &[(0.0, 2.0), (100.0, 2.0)], &[(0.0, 3.0), (100.0, 3.0)], &[(-50.0, 1.0), (150.0, 1.0)],
        ];
        let record = classify_single(&[(0.0, 0.0), (100.0, 0.0)], &sidewalks);
        for f in [record.fraction, record.left_fraction, record.right_fraction] {
            assert!((0.0..=1.0).contains(&f));
        }
    }

    #[test]
    fn classification_uses_thresholds() {
        let p = params();
        assert_eq!(CoverageClass::from_fraction(1.0, &p), CoverageClass::Full);
        assert_eq!(CoverageClass::from_fraction(0.9, &p), CoverageClass::Full);
        assert_eq!(CoverageClass::from_fraction(0.5, &p), CoverageClass::Partial);
        assert_eq!(CoverageClass::from_fraction(0.0, &p), CoverageClass::None);
        assert_eq!(CoverageClass::None.to_string(), "none");

        let p = CoverageParams { min_parallel_fraction: 0.2, ..params() };
        assert_eq!(CoverageClass::from_fraction(0.1, &p), CoverageClass::None);
        assert_eq!(CoverageClass::from_fraction(0.2, &p), CoverageClass::None);
        assert_eq!(CoverageClass::from_fraction(0.3, &p), CoverageClass::Partial);
    }

    #[test]
    fn angle_tolerance_decides_parallelism() {
        let street: &[(f64, f64)] = &[(0.0, 0.0), (100.0, 0.0)];
        let (sin10, cos10) = 10f64.to_radians().sin_cos();
        let (sin30, cos30) = 30f64.to_radians().sin_cos();

        // 10 degrees off: inside a 20 degree tolerance, runs 50 along the street.
        let shallow = classify_single(street, &[&[(0.0, 0.0), (50.0, 50.0 * sin10 / cos10)]]);
        assert!((shallow.fraction - 0.5).abs() < 1e-9);

        // Same sidewalk digitized the other way round.
        let reversed = classify_single(street, &[&[(50.0, 50.0 * sin10 / cos10), (0.0, 0.0)]]);
        assert!((reversed.fraction - shallow.fraction).abs() < 1e-12);

        // 30 degrees off: outside the tolerance even though it starts on the street.
        let steep = classify_single(street, &[&[(0.0, 0.0), (10.0 * cos30, 10.0 * sin30)]]);
        assert_eq!(steep.fraction, 0.0);
        assert_eq!(steep.sidewalk_length, 0.0);

        let opposite = classify_single(street, &[&[(100.0, -6.0), (0.0, -6.0)]]);
        assert!((opposite.right_fraction - 1.0).abs() < 1e-9);
    }

    #[test]
    fn min_parallel_fraction_separates_none_from_partial() {
        let centerlines = vec![line(0, &[(0.0, 0.0), (100.0, 0.0)])];
        let params = CoverageParams { min_parallel_fraction: 0.2, ..params() };

        let short = vec![line(0, &[(0.0, 5.0), (10.0, 5.0)])];
        let record = classify(&centerlines, &short, &params).unwrap().remove(0);
        assert!((record.fraction - 0.1).abs() < 1e-9);
        assert_eq!(record.class, CoverageClass::None);

        let longer = vec![line(0, &[(0.0, 5.0), (30.0, 5.0)])];
        let record = classify(&centerlines, &longer, &params).unwrap().remove(0);
        assert!((record.fraction - 0.3).abs() < 1e-9);
        assert_eq!(record.class, CoverageClass::Partial);
    }

    #[test]
    fn records_keep_input_order() {
        let centerlines = (0..50).map(|i| line(i, &[(0.0, i as f64 * 100.0), (100.0, i as f64 * 100.0)])).collect::<Vec<_>>();
        let sidewalks = vec![line(0, &[(0.0, 5.0), (100.0, 5.0)])];
        let records = classify(&centerlines, &sidewalks, &params()).unwrap();
        assert_eq!(records.iter().map(|r| r.feature.id().0).collect::<Vec<_>>(), (0..50).collect::<Vec<_>>());
        assert_eq!(records[0].class, CoverageClass::Full);
        assert!(records[1..].iter().all(|r| r.class == CoverageClass::None));
    }

    #[test]
    fn out_of_range_params_are_config_errors() {
        let centerlines = vec![line(0, &[(0.0, 0.0), (100.0, 0.0)])];
        let bad = CoverageParams { buffer_distance: -1.0, ..params() };
        assert!(matches!(classify(&centerlines, &[], &bad), Err(GapsError::Config(_))));
    }
}
