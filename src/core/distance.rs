use std::f64::consts::FRAC_PI_2;

use crate::models::{BoundingBox, Coordinates};

/// Earth's radius in kilometers
const EARTH_RADIUS_KM: f64 = 6371.0;


/// Calculate the Haversine distance between two points in kilometers
///
/// # Arguments
/// * `lat1` - Latitude of first point in degrees
/// * `lon1` - Longitude of first point in degrees
/// * `lat2` - Latitude of second point in degrees
/// * `lon2` - Longitude of second point in degrees
#[inline]
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// Bounding box around a center point, used as a cheap pre-filter before haversine.
///
/// Spans are the exact extremes of the great-circle disc: the latitude span
/// is the angular radius, the longitude span `asin(sin(r) / cos(lat))`. When
/// the disc reaches a pole the longitude span is the whole globe. Longitudes
/// may run past ±180; `is_within_bounding_box` wraps them.
pub fn calculate_bounding_box(center: Coordinates, radius_km: f64) -> BoundingBox {
    let angular = radius_km / EARTH_RADIUS_KM;
    let lat_delta = angular.to_degrees();

    let reaches_pole = angular >= FRAC_PI_2 || center.latitude.abs() + lat_delta >= 90.0;
    let lon_delta = if reaches_pole {
        180.0
    } else {
        let ratio = angular.sin() / center.latitude.to_radians().cos();
        if ratio >= 1.0 {
            180.0
        } else {
            ratio.asin().to_degrees()
        }
    };

    BoundingBox {
        min_lat: center.latitude - lat_delta,
        max_lat: center.latitude + lat_delta,
        min_lon: center.longitude - lon_delta,
        max_lon: center.longitude + lon_delta,
    }
}

/// Check if a point is within a bounding box, wrapping across the antimeridian
#[inline]
pub fn is_within_bounding_box(point: Coordinates, bbox: &BoundingBox) -> bool {
    if point.latitude < bbox.min_lat || point.latitude > bbox.max_lat {
        return false;
    }

    [point.longitude, point.longitude - 360.0, point.longitude + 360.0]
        .into_iter()
        .any(|lon| lon >= bbox.min_lon && lon <= bbox.max_lon)
}
