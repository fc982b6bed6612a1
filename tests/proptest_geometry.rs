//! Property-based tests for polygon simplification and coordinate transforms.

use cellprep::geometry::{octagon, octagon_points};
use cellprep::transform::{apply_transform, compute_transform, ScalingPolicy, TransformConfig};
use proptest::prelude::*;

fn integer_polygon() -> impl Strategy<Value = Vec<(i64, i64)>> {
    prop::collection::vec((-1000_i64..1000, -1000_i64..1000), 3..40)
}

fn finite_coordinate() -> impl Strategy<Value = f64> {
    (-1.0e5..1.0e5).prop_filter("must be finite", |x: &f64| x.is_finite())
}

proptest! {
    /// Every octagon vertex sits on the extreme it is meant to track.
    #[test]
    fn prop_octagon_vertices_are_extremal(poly in integer_polygon()) {
        let oct = octagon(poly.as_slice()).unwrap();

        let min_x = poly.iter().map(|p| p.0).min().unwrap();
        let max_x = poly.iter().map(|p| p.0).max().unwrap();
        let min_y = poly.iter().map(|p| p.1).min().unwrap();
        let max_y = poly.iter().map(|p| p.1).max().unwrap();
        let min_sum = poly.iter().map(|p| p.0 + p.1).min().unwrap();
        let max_sum = poly.iter().map(|p| p.0 + p.1).max().unwrap();
        let min_diff = poly.iter().map(|p| p.1 - p.0).min().unwrap();
        let max_diff = poly.iter().map(|p| p.1 - p.0).max().unwrap();

        prop_assert_eq!(oct.len(), 8);
        prop_assert_eq!(oct[0].0, min_x);
        prop_assert_eq!(oct[0].0 + oct[0].1, min_sum);
        prop_assert_eq!(oct[1].0, min_x);
        prop_assert_eq!(oct[1].1 - oct[1].0, max_diff);
        prop_assert_eq!(oct[2].1, max_y);
        prop_assert_eq!(oct[2].1 - oct[2].0, max_diff);
        prop_assert_eq!(oct[3].1, max_y);
        prop_assert_eq!(oct[3].0 + oct[3].1, max_sum);
        prop_assert_eq!(oct[4].0, max_x);
        prop_assert_eq!(oct[4].0 + oct[4].1, max_sum);
        prop_assert_eq!(oct[5].0, max_x);
        prop_assert_eq!(oct[5].1 - oct[5].0, min_diff);
        prop_assert_eq!(oct[6].1, min_y);
        prop_assert_eq!(oct[6].1 - oct[6].0, min_diff);
        prop_assert_eq!(oct[7].1, min_y);
        prop_assert_eq!(oct[7].0 + oct[7].1, min_sum);
    }

    /// Simplifying an octagon gives the same octagon back.
    #[test]
    fn prop_octagon_is_idempotent(poly in integer_polygon()) {
        let oct = octagon(poly.as_slice()).unwrap();
        prop_assert_eq!(octagon(oct.as_slice()).unwrap(), oct);
        prop_assert_eq!(octagon(octagon_points(&oct).as_slice()).unwrap(), oct);
    }

    /// Float input gives the same result as the same input truncated by hand.
    #[test]
    fn prop_octagon_truncates_toward_zero(
        poly in prop::collection::vec((finite_coordinate(), finite_coordinate()), 3..20)
    ) {
        let truncated: Vec<(i64, i64)> = poly
            .iter()
            .map(|&(x, y)| (x.trunc() as i64, y.trunc() as i64))
            .collect();
        prop_assert_eq!(
            octagon(poly.as_slice()).unwrap(),
            octagon(truncated.as_slice()).unwrap()
        );
    }

    /// Independent scaling sends each axis's extreme centroids to the domain edges.
    #[test]
    fn prop_independent_maps_extremes_to_edges(
        centroids in prop::collection::vec((finite_coordinate(), finite_coordinate()), 2..50)
    ) {
        let min_x = centroids.iter().map(|p| p.0).fold(f64::INFINITY, f64::min);
        let max_x = centroids.iter().map(|p| p.0).fold(f64::NEG_INFINITY, f64::max);
        let min_y = centroids.iter().map(|p| p.1).fold(f64::INFINITY, f64::min);
        let max_y = centroids.iter().map(|p| p.1).fold(f64::NEG_INFINITY, f64::max);
        prop_assume!(max_x - min_x > 1e-3 && max_y - min_y > 1e-3);

        let config = TransformConfig::default();
        let transform = compute_transform(&centroids, &config).unwrap();
        let half = config.domain / 2.0;

        let (lo_x, lo_y) = apply_transform(&transform, (min_x, min_y), config.precision);
        let (hi_x, hi_y) = apply_transform(&transform, (max_x, max_y), config.precision);
        prop_assert_eq!((lo_x, lo_y), (-half, -half));
        prop_assert_eq!((hi_x, hi_y), (half, half));
    }

    /// Uniform scaling uses one positive scale for both axes.
    #[test]
    fn prop_uniform_shares_scale(
        centroids in prop::collection::vec((finite_coordinate(), finite_coordinate()), 2..50)
    ) {
        let config = TransformConfig {
            policy: ScalingPolicy::Uniform,
            ..TransformConfig::default()
        };
        if let Ok(transform) = compute_transform(&centroids, &config) {
            prop_assert_eq!(transform.x_scale, transform.y_scale);
            prop_assert!(transform.x_scale > 0.0);
        }
    }
}
