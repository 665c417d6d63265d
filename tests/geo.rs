#![forbid(unsafe_code)]
use mihrab::geo::{
    angle_difference, bearing_to, compass_direction, distance_to, format_distance,
    normalize_heading, QiblaInfo,
};
use mihrab::model::{Coordinate, KAABA};

fn coord(lat: f64, lon: f64) -> Coordinate {
    Coordinate::new(lat, lon).unwrap()
}

#[test]
fn london_to_kaaba() {
    let london = coord(51.5074, -0.1278);
    let bearing = bearing_to(london, KAABA);
    let distance = distance_to(london, KAABA);
    assert!((bearing - 118.98).abs() < 0.1, "bearing {bearing}");
    assert!((distance - 4793.0).abs() < 10.0, "distance {distance}");

    let info = QiblaInfo::from_coordinate(Some(london));
    assert!(info.valid);
    assert_eq!(info.compass, "ESE");
    assert_eq!(info.formatted_distance, "4794km");
}

#[test]
fn other_cities_stay_in_range() {
    let new_york = coord(40.7128, -74.0060);
    let sydney = coord(-33.8688, 151.2093);
    assert!((bearing_to(new_york, KAABA) - 58.48).abs() < 0.1);
    assert!((distance_to(new_york, KAABA) - 10306.0).abs() < 10.0);
    assert!((bearing_to(sydney, KAABA) - 277.50).abs() < 0.1);
    assert_eq!(distance_to(KAABA, KAABA), 0.0);
}

#[test]
fn antimeridian_has_no_discontinuity() {
    let west = coord(0.0, 179.9);
    let east = coord(0.0, -179.9);
    assert!((bearing_to(west, east) - 90.0).abs() < 1e-6);
    assert!((bearing_to(east, west) - 270.0).abs() < 1e-6);
    let d = distance_to(west, east);
    assert!(d > 22.0 && d < 22.5, "distance across antimeridian {d}");
}

#[test]
fn bearing_and_distance_ranges_over_grid() {
    let mut lat = -89.0;
    while lat <= 89.0 {
        let mut lon = -179.0;
        while lon <= 179.0 {
            let c = coord(lat, lon);
            let b = bearing_to(c, KAABA);
            assert!((0.0..360.0).contains(&b), "bearing {b} at {lat},{lon}");
            assert!(distance_to(c, KAABA) >= 0.0);
            lon += 17.0;
        }
        lat += 11.0;
    }
}

#[test]
fn heading_helpers() {
    for x in [-725.0, -360.0, -1.5, 0.0, 45.0, 359.9, 360.0, 1234.5] {
        let once = normalize_heading(x);
        assert!((0.0..360.0).contains(&once));
        assert_eq!(normalize_heading(once), once);
    }
    for (a, b) in [(10.0, 50.0), (350.0, 20.0), (-30.0, 400.0), (90.0, 271.0)] {
        assert_eq!(angle_difference(a, b), -angle_difference(b, a));
    }
    assert_eq!(angle_difference(0.0, 180.0), 180.0);
    assert_eq!(angle_difference(180.0, 0.0), 180.0);
}

#[test]
fn angle_difference_terminates_for_huge_inputs() {
    // 1e12 = 2_777_777_777 tours + 280°
    assert!((angle_difference(0.0, 1e12) + 80.0).abs() < 1e-6);
    for (a, b) in [(0.0, 1e17), (-1e20, 3.0), (1e300, -1e300)] {
        let d = angle_difference(a, b);
        assert!(d > -180.0 && d <= 180.0, "angle_difference({a}, {b}) = {d}");
    }
    assert!(angle_difference(f64::INFINITY, 0.0).is_nan());
}

#[test]
fn compass_and_distance_labels() {
    assert_eq!(compass_direction(0.0), "N");
    assert_eq!(compass_direction(45.0), "NE");
    assert_eq!(compass_direction(90.0), "E");
    assert_eq!(compass_direction(180.0), "S");
    assert_eq!(compass_direction(270.0), "W");
    assert_eq!(format_distance(0.5), "500m");
    assert_eq!(format_distance(150.5), "150.5km");
    assert_eq!(format_distance(2000.0), "2000km");
}
