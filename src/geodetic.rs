use nalgebra::Vector3;
use serde_derive::{Deserialize, Serialize};

/// WGS84 semi-major axis in metres.
pub const WGS84_A: f64 = 6378137.0;
/// WGS84 inverse flattening.
pub const WGS84_FINV: f64 = 298.257223563;

/// A GPS fix: latitude and longitude in degrees, altitude in metres.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeodeticPoint {
    pub lat: f64,
    pub lon: f64,
    pub alt: f64,
}

impl GeodeticPoint {
    pub fn new(lat: f64, lon: f64, alt: f64) -> Self {
        Self { lat, lon, alt }
    }
}

/// How the vertical coordinate of a converted GPS fix is produced.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeightMode {
    /// `z` is the GPS altitude. X and Y are ECEF, so the resulting frame
    /// keeps the road roughly flat over the short extent of a drive.
    #[default]
    Altitude,
    /// `z` is the ECEF Z coordinate.
    Ellipsoid,
}

/// Converts a WGS84 fix into Earth-Centered, Earth-Fixed coordinates.
///
/// # Arguments
///
/// * `point` - The GPS fix.
/// * `mode` - Selects the vertical coordinate, see [`HeightMode`].
///
/// # Returns
///
/// * The (x, y, z) position in metres.
pub fn gps_to_ecef(point: &GeodeticPoint, mode: HeightMode) -> Vector3<f64> {
    let rad_lat = point.lat.to_radians();
    let rad_lon = point.lon.to_radians();

    let f = 1.0 / WGS84_FINV;
    let e2 = 1.0 - (1.0 - f) * (1.0 - f);
    let sin_lat = rad_lat.sin();
    let v = WGS84_A / (1.0 - e2 * sin_lat * sin_lat).sqrt();

    let x = (v + point.alt) * rad_lat.cos() * rad_lon.cos();
    let y = (v + point.alt) * rad_lat.cos() * rad_lon.sin();
    let z = match mode {
        HeightMode::Altitude => point.alt,
        HeightMode::Ellipsoid => (v * (1.0 - e2) + point.alt) * sin_lat,
    };

    Vector3::new(x, y, z)
}

/// Converts a sequence of GPS fixes.
///
/// # Arguments
///
/// * `points` - The GPS track.
/// * `mode` - Vertical coordinate mode.
/// * `zero_origin` - If true, the first position is subtracted from every position.
pub fn gps_track_to_ecef(
    points: &[GeodeticPoint],
    mode: HeightMode,
    zero_origin: bool,
) -> Vec<Vector3<f64>> {
    let mut track: Vec<Vector3<f64>> = points.iter().map(|p| gps_to_ecef(p, mode)).collect();

    if zero_origin {
        if let Some(origin) = track.first().copied() {
            track.iter_mut().for_each(|p| *p -= origin);
        }
    }

    track
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn should_convert_equator_prime_meridian() {
        let ecef = gps_to_ecef(&GeodeticPoint::new(0.0, 0.0, 0.0), HeightMode::Ellipsoid);
        assert_abs_diff_eq!(ecef, Vector3::new(WGS84_A, 0.0, 0.0), epsilon = 1e-6);
    }

    #[test]
    fn should_convert_north_pole() {
        let ecef = gps_to_ecef(&GeodeticPoint::new(90.0, 0.0, 0.0), HeightMode::Ellipsoid);
        // Semi-minor axis.
        assert_abs_diff_eq!(ecef[2], 6356752.314245, epsilon = 1e-3);
        assert_abs_diff_eq!(ecef[0], 0.0, epsilon = 1e-6);
    }

    #[test]
    fn should_keep_altitude_as_height() {
        let point = GeodeticPoint::new(49.011212804408, 8.4228850417969, 112.83492279053);
        let ecef = gps_to_ecef(&point, HeightMode::Altitude);
        assert_eq!(ecef[2], point.alt);

        let full = gps_to_ecef(&point, HeightMode::Ellipsoid);
        assert_abs_diff_eq!(ecef[0], full[0], epsilon = 1e-9);
        assert_abs_diff_eq!(ecef[1], full[1], epsilon = 1e-9);
        // Karlsruhe is around 4.8e6 metres above the equatorial plane.
        assert!(full[2] > 4.7e6 && full[2] < 4.9e6);
    }

    #[test]
    fn should_move_track_to_origin() {
        let track = gps_track_to_ecef(
            &[
                GeodeticPoint::new(49.0, 8.4, 110.0),
                GeodeticPoint::new(49.0001, 8.4, 111.0),
            ],
            HeightMode::Altitude,
            true,
        );
        assert_eq!(track[0], Vector3::zeros());
        assert_abs_diff_eq!(track[1][2], 1.0, epsilon = 1e-9);
        // 1e-4 degrees of latitude is roughly 11 metres.
        let dist = track[1].xy().norm();
        assert!(dist > 5.0 && dist < 15.0);

        assert!(gps_track_to_ecef(&[], HeightMode::Altitude, true).is_empty());
    }
}
