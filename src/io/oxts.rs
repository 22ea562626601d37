use std::path::{Path, PathBuf};

use nalgebra::Rotation3;

use crate::{
    error::Error,
    geodetic::{gps_to_ecef, GeodeticPoint, HeightMode},
    transform::Transform,
};

/// One GPS/IMU record of a KITTI raw drive (`oxts/data/NNNNNNNNNN.txt`).
#[derive(Clone, Debug, PartialEq)]
pub struct OxtsPacket {
    pub lat: f64,
    pub lon: f64,
    pub alt: f64,
    /// Roll angle in radians, 0 = level, positive = left side up.
    pub roll: f64,
    /// Pitch angle in radians, 0 = level, positive = front down.
    pub pitch: f64,
    /// Heading in radians, 0 = east, positive = counter clockwise.
    pub yaw: f64,
    /// Remaining fields (velocities, accelerations, accuracies, ...) in file order.
    pub extra: Vec<f64>,
}

impl OxtsPacket {
    pub fn parse(line: &str) -> Result<Self, Error> {
        let values = line
            .split_whitespace()
            .map(|token| {
                token
                    .parse::<f64>()
                    .map_err(|_| Error::parser(format!("Invalid oxts value {token}")))
            })
            .collect::<Result<Vec<f64>, Error>>()?;

        if values.len() < 6 {
            return Err(Error::parser(format!(
                "Oxts packet has {} values, expected at least 6",
                values.len()
            )));
        }

        Ok(Self {
            lat: values[0],
            lon: values[1],
            alt: values[2],
            roll: values[3],
            pitch: values[4],
            yaw: values[5],
            extra: values[6..].to_vec(),
        })
    }

    pub fn geodetic(&self) -> GeodeticPoint {
        GeodeticPoint::new(self.lat, self.lon, self.alt)
    }

    /// Orientation from extrinsic X-Y-Z Euler angles: `Rz(yaw) * Ry(pitch) * Rx(roll)`.
    pub fn rotation(&self) -> Rotation3<f64> {
        Rotation3::from_euler_angles(self.roll, self.pitch, self.yaw)
    }

    /// Pose of the IMU, taking IMU coordinates to the world frame.
    pub fn imu_to_world(&self, height_mode: HeightMode) -> Transform {
        Transform::new(&gps_to_ecef(&self.geodetic(), height_mode), &self.rotation())
    }
}

/// Reads a single oxts packet file.
pub fn read_oxts_packet<P: AsRef<Path>>(filepath: P) -> Result<OxtsPacket, Error> {
    let content = std::fs::read_to_string(filepath.as_ref())?;
    OxtsPacket::parse(content.trim())
}

/// Lists the packet files of a drive, sorted by name.
pub fn list_oxts_files<P: AsRef<Path>>(drive_dir: P) -> Result<Vec<PathBuf>, Error> {
    let pattern = drive_dir.as_ref().join("oxts").join("data").join("*.txt");
    let mut files = glob::glob(&pattern.to_string_lossy())?.collect::<Result<Vec<_>, _>>()?;
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use nalgebra::Vector3;

    const PACKET: &str = "49.015003823272 8.4342971002335 116.43032836914 0.035752 0.00903 -2.6087069803847 -7.2424902421342 -9.8367453868426 12.211834430737 -0.00030597542182212 0.0015096613578545 -0.10587523263753 -0.35101947796211 9.6761038368889 0.0020591061004401 0.0067766155939289 -0.010116286239005 -0.094347843676917 -0.38133025123113 9.7018047701651 0.0030016398591268 0.0060641993436098 -0.010213566296012 0.071774596624922 0.02449786081695 4 11 6 6 6";

    #[test]
    fn should_parse_packet() {
        let packet = OxtsPacket::parse(PACKET).unwrap();
        assert_eq!(packet.lat, 49.015003823272);
        assert_eq!(packet.yaw, -2.6087069803847);
        assert_eq!(packet.extra.len(), 24);
        assert!(OxtsPacket::parse("1 2 3").is_err());
        assert!(OxtsPacket::parse("1 2 3 a 5 6").is_err());
    }

    #[test]
    fn should_compose_extrinsic_xyz_rotation() {
        let packet = OxtsPacket::parse("0 0 0 0.1 0.2 0.3").unwrap();
        let expected = Rotation3::from_axis_angle(&Vector3::z_axis(), 0.3)
            * Rotation3::from_axis_angle(&Vector3::y_axis(), 0.2)
            * Rotation3::from_axis_angle(&Vector3::x_axis(), 0.1);
        assert_abs_diff_eq!(packet.rotation(), expected, epsilon = 1e-12);
    }

    #[test]
    fn should_place_imu_at_gps_position() {
        let packet = OxtsPacket::parse(PACKET).unwrap();
        let pose = packet.imu_to_world(HeightMode::Altitude);
        let expected = gps_to_ecef(&packet.geodetic(), HeightMode::Altitude);
        assert_abs_diff_eq!(pose.translation(), expected, epsilon = 1e-6);
    }
}
