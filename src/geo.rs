//! Géodésie de la Qibla : cap initial, distance orthodromique, aides de boussole.
//!
//! Fonctions pures, sans erreur : une entrée NaN donne une sortie NaN. La
//! validation des coordonnées se fait à la frontière (`Coordinate::new`).

use crate::model::{Coordinate, KAABA};

/// Rayon terrestre moyen (km) pour la formule de haversine.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

const COMPASS_LABELS: [&str; 16] = [
    "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW", "WSW", "W", "WNW", "NW",
    "NNW",
];

/// Cap initial (degrés, [0, 360)) de `from` vers `to`.
pub fn bearing_to(from: Coordinate, to: Coordinate) -> f64 {
    let lat1 = from.latitude().to_radians();
    let lat2 = to.latitude().to_radians();
    let delta_lon = (to.longitude() - from.longitude()).to_radians();

    let x = delta_lon.sin() * lat2.cos();
    let y = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * delta_lon.cos();

    normalize_heading(x.atan2(y).to_degrees())
}

/// Distance de haversine en kilomètres.
pub fn distance_to(from: Coordinate, to: Coordinate) -> f64 {
    let lat1 = from.latitude().to_radians();
    let lat2 = to.latitude().to_radians();
    let delta_lat = (to.latitude() - from.latitude()).to_radians();
    let delta_lon = (to.longitude() - from.longitude()).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

pub fn normalize_heading(heading: f64) -> f64 {
    ((heading % 360.0) + 360.0) % 360.0
}

/// Rotation signée la plus courte de `a` vers `b`, dans (-180, 180].
pub fn angle_difference(a: f64, b: f64) -> f64 {
    if !a.is_finite() || !b.is_finite() {
        return f64::NAN;
    }
    // réduction en un pas : termine quelle que soit l'amplitude
    let diff = (b - a).rem_euclid(360.0);
    if diff > 180.0 {
        diff - 360.0
    } else {
        diff
    }
}

/// Libellé de rose des vents (16 secteurs de 22,5°, à partir de "N").
pub fn compass_direction(degrees: f64) -> &'static str {
    let index = (normalize_heading(degrees) / 22.5).round() as usize % 16;
    COMPASS_LABELS[index]
}

pub fn format_distance(km: f64) -> String {
    if km < 1.0 {
        format!("{}m", (km * 1000.0).round() as i64)
    } else if km < 1000.0 {
        format!("{km:.1}km")
    } else {
        format!("{}km", km.round() as i64)
    }
}

/// Rendu d'affichage d'une coordonnée (quatre décimales).
pub fn format_coordinates(coordinate: Coordinate) -> String {
    format!(
        "{:.4}°N, {:.4}°E",
        coordinate.latitude(),
        coordinate.longitude()
    )
}

/// Résumé Qibla prêt à afficher.
#[derive(Debug, Clone, PartialEq)]
pub struct QiblaInfo {
    pub bearing: f64,
    pub distance_km: f64,
    pub compass: &'static str,
    pub formatted_distance: String,
    pub valid: bool,
}

impl QiblaInfo {
    pub fn from_coordinate(position: Option<Coordinate>) -> Self {
        let Some(position) = position else {
            return Self {
                bearing: 0.0,
                distance_km: 0.0,
                compass: "N",
                formatted_distance: "0km".to_string(),
                valid: false,
            };
        };
        let bearing = bearing_to(position, KAABA);
        let distance_km = distance_to(position, KAABA);
        Self {
            bearing,
            distance_km,
            compass: compass_direction(bearing),
            formatted_distance: format_distance(distance_km),
            valid: true,
        }
    }
}
