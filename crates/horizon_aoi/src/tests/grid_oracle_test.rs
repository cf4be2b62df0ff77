//! Grid queries checked against a brute-force scan
//!
//! Every query must return exactly the objects an O(n) scan over the same
//! snapshot returns, including objects sitting outside the zone bounds and
//! objects exactly on the query boundary.

use crate::{Bounds, GridIndex, QueryFilters, SpatialObject, SpatialQuery, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;

fn random_point(rng: &mut StdRng, extent: f64) -> Vec3 {
    Vec3::new(
        rng.random_range(-extent..extent),
        rng.random_range(-extent..extent),
        rng.random_range(-extent..extent),
    )
}

fn random_snapshot(rng: &mut StdRng, count: u32, extent: f64) -> Vec<SpatialObject> {
    (1..=count)
        .map(|id| SpatialObject::new(id, random_point(rng, extent)))
        .collect()
}

fn ids(objects: &[SpatialObject]) -> HashSet<u32> {
    objects.iter().map(|o| o.id).collect()
}

fn brute_sphere(snapshot: &[SpatialObject], center: Vec3, radius: f64) -> HashSet<u32> {
    snapshot
        .iter()
        .filter(|o| o.position.distance_squared(center) <= radius * radius)
        .map(|o| o.id)
        .collect()
}

fn brute_box(snapshot: &[SpatialObject], center: Vec3, half: Vec3) -> HashSet<u32> {
    snapshot
        .iter()
        .filter(|o| {
            (o.position.x - center.x).abs() <= half.x
                && (o.position.y - center.y).abs() <= half.y
                && (o.position.z - center.z).abs() <= half.z
        })
        .map(|o| o.id)
        .collect()
}

fn build(snapshot: &[SpatialObject], cell_size: f64) -> GridIndex {
    let mut grid = GridIndex::new(
        Bounds::new(Vec3::splat(-100.0), Vec3::splat(100.0)),
        cell_size,
        10_000,
    )
    .expect("valid grid parameters");
    grid.rebuild(snapshot);
    grid
}

#[test]
fn test_sphere_queries_match_brute_force() {
    let mut rng = StdRng::seed_from_u64(0xA01);
    // Some objects land outside the bounds and must still be found
    let snapshot = random_snapshot(&mut rng, 2_000, 120.0);

    for cell_size in [3.0, 16.0, 64.0] {
        let grid = build(&snapshot, cell_size);
        for _ in 0..200 {
            let center = random_point(&mut rng, 130.0);
            let radius = rng.random_range(0.0..60.0);
            assert_eq!(
                ids(&grid.query_sphere(center, radius)),
                brute_sphere(&snapshot, center, radius),
                "sphere at {:?} r={} with cell size {}",
                center,
                radius,
                cell_size
            );
        }
    }
}

#[test]
fn test_box_queries_match_brute_force() {
    let mut rng = StdRng::seed_from_u64(0xB0C5);
    let snapshot = random_snapshot(&mut rng, 1_500, 110.0);
    let grid = build(&snapshot, 12.0);

    for _ in 0..300 {
        let center = random_point(&mut rng, 120.0);
        let half = Vec3::new(
            rng.random_range(0.0..40.0),
            rng.random_range(0.0..40.0),
            rng.random_range(0.0..40.0),
        );
        assert_eq!(
            ids(&grid.query_box(center, half)),
            brute_box(&snapshot, center, half),
            "box at {:?} half {:?}",
            center,
            half
        );
    }
}

#[test]
fn test_huge_query_walks_occupied_cells() {
    let mut rng = StdRng::seed_from_u64(7);
    let snapshot = random_snapshot(&mut rng, 50, 100.0);
    let grid = build(&snapshot, 1.0);

    // Enclosing box spans far more cells than are occupied
    let everything = grid.query_box(Vec3::zero(), Vec3::splat(500.0));
    assert_eq!(ids(&everything), ids(&snapshot));
}

#[test]
fn test_boundary_points_are_included() {
    let snapshot = vec![
        SpatialObject::new(1, Vec3::new(10.0, 0.0, 0.0)),
        SpatialObject::new(2, Vec3::new(0.0, -10.0, 0.0)),
        SpatialObject::new(3, Vec3::new(6.0, 8.0, 0.0)),
        SpatialObject::new(4, Vec3::new(10.000_001, 0.0, 0.0)),
    ];
    let grid = build(&snapshot, 4.0);

    assert_eq!(ids(&grid.query_sphere(Vec3::zero(), 10.0)), HashSet::from([1, 2, 3]));
    assert_eq!(
        ids(&grid.query_box(Vec3::zero(), Vec3::new(10.0, 10.0, 0.0))),
        HashSet::from([1, 2, 3])
    );
}

#[test]
fn test_rebuild_is_idempotent() {
    let mut rng = StdRng::seed_from_u64(42);
    let snapshot = random_snapshot(&mut rng, 500, 100.0);
    let mut grid = build(&snapshot, 8.0);

    let queries: Vec<(Vec3, f64)> = (0..50)
        .map(|_| (random_point(&mut rng, 100.0), rng.random_range(1.0..30.0)))
        .collect();
    let first: Vec<HashSet<u32>> = queries
        .iter()
        .map(|(center, radius)| ids(&grid.query_sphere(*center, *radius)))
        .collect();

    grid.rebuild(&snapshot);
    let second: Vec<HashSet<u32>> = queries
        .iter()
        .map(|(center, radius)| ids(&grid.query_sphere(*center, *radius)))
        .collect();

    assert_eq!(first, second);
    assert_eq!(grid.object_count(), 500);
}

#[test]
fn test_filters_exclude_and_truncate() {
    let mut rng = StdRng::seed_from_u64(99);
    let snapshot = random_snapshot(&mut rng, 400, 50.0);
    let grid = build(&snapshot, 10.0);

    let center = Vec3::zero();
    let expected = brute_sphere(&snapshot, center, 40.0);
    let excluded: HashSet<u32> = expected.iter().copied().take(5).collect();

    let filtered = grid.query(&SpatialQuery::sphere(center, 40.0).with_filters(QueryFilters {
        exclude_ids: Some(excluded.clone()),
        max_results: None,
    }));
    let filtered = ids(&filtered);
    assert!(filtered.is_disjoint(&excluded));
    assert_eq!(filtered.len(), expected.len() - excluded.len());

    let capped = grid.query(&SpatialQuery::sphere(center, 40.0).with_filters(QueryFilters {
        exclude_ids: None,
        max_results: Some(3),
    }));
    assert_eq!(capped.len(), 3.min(expected.len()));
    assert!(ids(&capped).is_subset(&expected));
}
