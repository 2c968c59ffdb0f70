//! Integration tests for the spatial index over projected cities.

use gwlocate_lib::{project, Coordinates, SpatialIndex, SpatialPoint};

fn cities() -> Vec<(&'static str, SpatialPoint)> {
    [
        ("amsterdam", Coordinates::new(52.37, 4.89)),
        ("seattle", Coordinates::new(47.61, -122.33)),
        ("sydney", Coordinates::new(-33.87, 151.21)),
        ("sao-paulo", Coordinates::new(-23.55, -46.63)),
        ("tokyo", Coordinates::new(35.68, 139.65)),
        ("paris", Coordinates::new(48.86, 2.35)),
    ]
    .into_iter()
    .map(|(name, c)| (name, project(c)))
    .collect()
}

fn ranked_names(index: &SpatialIndex, names: &[&str], query: Coordinates) -> Vec<String> {
    index
        .k_nearest(&project(query), names.len())
        .into_iter()
        .map(|n| names[n.item].to_string())
        .collect()
}

#[test]
fn full_ranking_covers_every_city_once() {
    let cities = cities();
    let names: Vec<&str> = cities.iter().map(|(n, _)| *n).collect();
    let points: Vec<SpatialPoint> = cities.iter().map(|(_, p)| *p).collect();
    let index = SpatialIndex::build(&points);

    let ranked = ranked_names(&index, &names, Coordinates::new(51.5, -0.1));
    assert_eq!(ranked.len(), names.len());
    assert_eq!(&ranked[..2], &["paris".to_string(), "amsterdam".to_string()]);
    assert_eq!(ranked.last().map(String::as_str), Some("sydney"));
}

#[test]
fn nearest_city_to_itself_is_itself() {
    let cities = cities();
    let points: Vec<SpatialPoint> = cities.iter().map(|(_, p)| *p).collect();
    let index = SpatialIndex::build(&points);

    for (item, point) in points.iter().enumerate() {
        let nearest = index.k_nearest(point, 1);
        assert_eq!(nearest.len(), 1);
        assert_eq!(nearest[0].item, item);
        assert_eq!(nearest[0].distance_squared, 0.0);
        assert_eq!(index.point(item), Some(point));
    }
}

#[test]
fn ranking_is_stable_across_rebuilds() {
    let cities = cities();
    let names: Vec<&str> = cities.iter().map(|(n, _)| *n).collect();
    let points: Vec<SpatialPoint> = cities.iter().map(|(_, p)| *p).collect();

    let query = Coordinates::new(10.0, 100.0);
    let first = ranked_names(&SpatialIndex::build(&points), &names, query);
    let second = ranked_names(&SpatialIndex::build(&points), &names, query);
    assert_eq!(first, second);
    assert_eq!(first[0], "tokyo");
}
