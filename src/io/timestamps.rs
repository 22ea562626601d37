use std::{io::BufRead, path::Path};

use chrono::NaiveDateTime;

use crate::{camera::CameraSide, error::Error};

/// Sensors of a KITTI raw drive that carry a `timestamps.txt`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sensor {
    Gps,
    Lidar,
    Camera(CameraSide),
}

impl Sensor {
    pub fn folder(&self) -> &'static str {
        match self {
            Sensor::Gps => "oxts",
            Sensor::Lidar => "velodyne_points",
            Sensor::Camera(side) => side.image_folder(),
        }
    }
}

impl std::str::FromStr for Sensor {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gps" | "oxts" => Ok(Sensor::Gps),
            "lidar" | "velodyne" => Ok(Sensor::Lidar),
            _ => s
                .parse::<CameraSide>()
                .map(Sensor::Camera)
                .map_err(|_| Error::invalid_parameter(format!("Invalid sensor: {s}"))),
        }
    }
}

/// Parses a KITTI timestamp, e.g. `2011-09-26 13:02:25.964389445`, into
/// seconds since the Unix epoch. Timestamps are read as UTC.
pub fn parse_timestamp(line: &str) -> Result<f64, Error> {
    let datetime = NaiveDateTime::parse_from_str(line.trim(), "%Y-%m-%d %H:%M:%S%.f")
        .map_err(|err| Error::parser(format!("Invalid timestamp {line}: {err}")))?
        .and_utc();

    Ok(datetime.timestamp() as f64 + datetime.timestamp_subsec_nanos() as f64 * 1.0e-9)
}

/// Reads a `timestamps.txt` file, one timestamp per non-empty line.
///
/// # Arguments
///
/// * `filepath` - The timestamps file.
/// * `zero_origin` - If true, the first timestamp is subtracted from all.
pub fn read_timestamps<P: AsRef<Path>>(filepath: P, zero_origin: bool) -> Result<Vec<f64>, Error> {
    let file = std::fs::File::open(filepath)?;
    let reader = std::io::BufReader::new(file);
    let mut timestamps = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        timestamps.push(parse_timestamp(&line)?);
    }

    if zero_origin {
        if let Some(&first) = timestamps.first() {
            timestamps.iter_mut().for_each(|t| *t -= first);
        }
    }

    Ok(timestamps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::io::Write;

    #[test]
    fn should_parse_nanosecond_timestamp() {
        let t = parse_timestamp("2011-09-26 13:02:25.964389445").unwrap();
        assert_abs_diff_eq!(t, 1317042145.964389445, epsilon = 1e-6);
        assert!(parse_timestamp("2011-09-26_13:02:25").is_err());
    }

    #[test]
    fn should_read_zero_origin_timestamps() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "2011-09-26 13:02:25.964389445").unwrap();
        writeln!(file, "2011-09-26 13:02:26.064165192").unwrap();
        writeln!(file).unwrap();

        let ts = read_timestamps(file.path(), true).unwrap();
        assert_eq!(ts.len(), 2);
        assert_eq!(ts[0], 0.0);
        assert_abs_diff_eq!(ts[1], 0.099775747, epsilon = 1e-6);
    }

    #[test]
    fn should_map_sensor_folders() {
        assert_eq!("gps".parse::<Sensor>().unwrap().folder(), "oxts");
        assert_eq!("lidar".parse::<Sensor>().unwrap().folder(), "velodyne_points");
        assert_eq!("right".parse::<Sensor>().unwrap().folder(), "image_03");
        assert!("radar".parse::<Sensor>().is_err());
    }
}
