use approx::assert_relative_eq;
use geoframe_spatial::{
    BinaryPredicate, Crs, GeomArray, NearestParams, OnInvalid,
};

#[test]
fn decode_index_query_pipeline() {
    let wkts = vec![
        Some("POINT(0 0)"),
        Some("POLYGON((2 2, 4 2, 4 4, 2 4, 2 2))"),
        None,
        Some("LINESTRING(0 5, 5 5)"),
        Some("POLYGON EMPTY"),
    ];
    let arr = GeomArray::from_wkt(&wkts, None, OnInvalid::Raise).unwrap();
    let index = arr.sindex();
    assert_eq!(index.size(), arr.len());

    // The polygon is the only thing within 1 of (2.5, 1.5).
    let probe = geoframe_spatial::parse_wkt("POINT(2.5 1.5)").unwrap();
    let hits = index
        .query(&probe, Some(BinaryPredicate::Dwithin), Some(1.0))
        .unwrap();
    assert_eq!(hits, vec![1]);

    // Nearest never reports the null or empty slots.
    let near_origin = geoframe_spatial::parse_wkt("POINT(0.5 0.5)").unwrap();
    let nearest = index.nearest(&near_origin, &NearestParams::default());
    assert_eq!(nearest.len(), 1);
    assert_eq!(nearest[0].0, 0);
    assert_relative_eq!(nearest[0].1, 0.5f64.sqrt(), max_relative = 1e-12);
}

#[test]
fn wkb_round_trip_through_reprojection() {
    let wgs84 = Crs::from_epsg(4326).unwrap();
    let mercator = Crs::from_epsg(3857).unwrap();
    let arr = GeomArray::from_wkt(
        &[Some("POINT(4.9 52.37)"), None, Some("LINESTRING(0 0, 1 1)")],
        Some(wgs84.clone()),
        OnInvalid::Raise,
    )
    .unwrap();

    let projected = arr.to_crs(&mercator).unwrap();
    let encoded = projected.to_wkb();
    assert!(encoded[1].is_none());
    let decoded = GeomArray::from_wkb(&encoded, Some(mercator), OnInvalid::Raise).unwrap();

    let back = decoded.to_crs(&wgs84).unwrap();
    for (orig, round) in arr.slots().iter().zip(back.slots()) {
        match (orig, round) {
            (None, None) => {}
            (Some(a), Some(b)) => {
                let (geo_types::Geometry::Point(pa), geo_types::Geometry::Point(pb)) = (a, b)
                else {
                    continue;
                };
                assert_relative_eq!(pa.x(), pb.x(), epsilon = 1e-9);
                assert_relative_eq!(pa.y(), pb.y(), epsilon = 1e-9);
            }
            _ => panic!("null pattern changed in round trip"),
        }
    }
}
