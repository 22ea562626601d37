use std::path::{Path, PathBuf};

use image::RgbImage;
use ndarray::Array2;
use rstest::fixture;
use tempfile::TempDir;

use crate::{
    camera::CameraIntrinsics,
    geodetic::{gps_track_to_ecef, GeodeticPoint, HeightMode},
    image::depth::write_depth_png,
    io::dataset::{frame_file_name, frame_label},
};

pub const SAMPLE_SUBSEQ: &str = "2011_09_26_drive_0002_sync";
const SAMPLE_DATE: &str = "2011_09_26";

/// A miniature KITTI raw + depth tree in a temporary directory.
///
/// The vehicle drives east along the equator at longitude -90°, level and
/// with heading 0, so its forward axis matches the direction of travel. The
/// lidar is aligned with the IMU and the camera looks forward.
pub struct SampleKittiTree {
    dir: TempDir,
    pub num_packets: usize,
    /// Frames with depth maps.
    pub depth_ids: Vec<usize>,
    pub width: usize,
    pub height: usize,
    pub camera: CameraIntrinsics,
}

impl SampleKittiTree {
    pub fn raw_root(&self) -> PathBuf {
        self.dir.path().join("raw")
    }

    pub fn selection_dir(&self) -> PathBuf {
        self.dir.path().join("depth_selection")
    }

    pub fn depth_dir(&self) -> PathBuf {
        self.dir.path().join("depth").join("train")
    }

    pub fn drive_dir(&self) -> PathBuf {
        self.raw_root().join(SAMPLE_DATE).join(SAMPLE_SUBSEQ)
    }

    pub fn gps_track(&self) -> Vec<GeodeticPoint> {
        (0..self.num_packets)
            .map(|i| GeodeticPoint::new(0.0, -90.0 + i as f64 * 1.0e-5, 10.0))
            .collect()
    }

    pub fn expected_path_length(&self) -> f64 {
        gps_track_to_ecef(&self.gps_track(), HeightMode::Altitude, false)
            .windows(2)
            .map(|pair| (pair[1] - pair[0]).norm())
            .sum()
    }

    /// Dense depth: every pixel is valid, from 5 metres at the top rows on.
    pub fn dense_depth(&self, id: usize) -> Array2<u16> {
        Array2::from_shape_fn((self.height, self.width), |(row, col)| {
            (256 * (5 + row) + 16 * col + id) as u16
        })
    }

    /// Sparse depth: the even rows of the dense depth.
    pub fn sparse_depth(&self, id: usize) -> Array2<u16> {
        let mut depth = self.dense_depth(id);
        depth
            .outer_iter_mut()
            .enumerate()
            .filter(|(row, _)| row % 2 == 1)
            .for_each(|(_, mut line)| line.fill(0));
        depth
    }

    fn rgb(&self, id: usize) -> RgbImage {
        RgbImage::from_fn(self.width as u32, self.height as u32, |x, y| {
            image::Rgb([(x * 20) as u8, (y * 30) as u8, (id * 50) as u8])
        })
    }

    fn write(&self) {
        self.write_calibration();
        self.write_drive();
        self.write_selection();
        self.write_split();
    }

    fn write_calibration(&self) {
        let date_dir = self.raw_root().join(SAMPLE_DATE);
        std::fs::create_dir_all(&date_dir).unwrap();

        let identity = "R: 1 0 0 0 1 0 0 0 1\nT: 0 0 0\n";
        std::fs::write(
            date_dir.join("calib_imu_to_velo.txt"),
            format!("calib_time: 25-May-2012 16:47:16\n{identity}"),
        )
        .unwrap();
        std::fs::write(
            date_dir.join("calib_velo_to_cam.txt"),
            "calib_time: 15-Mar-2012 11:37:16\nR: 0 -1 0 0 0 -1 1 0 0\nT: 0 0 0\n",
        )
        .unwrap();

        let k = &self.camera;
        std::fs::write(
            date_dir.join("calib_cam_to_cam.txt"),
            format!(
                "calib_time: 09-Jan-2012 13:57:47\n\
                 R_rect_00: 1 0 0 0 1 0 0 0 1\n\
                 S_rect_02: {} {}\n\
                 P_rect_02: {} 0 {} 0 0 {} {} 0 0 0 1 0\n",
                self.width, self.height, k.fx, k.cx, k.fy, k.cy
            ),
        )
        .unwrap();
    }

    fn write_drive(&self) {
        let drive_dir = self.drive_dir();
        let oxts_dir = drive_dir.join("oxts").join("data");
        let velo_dir = drive_dir.join("velodyne_points");
        let image_dir = drive_dir.join("image_02").join("data");
        for dir in [&oxts_dir, &velo_dir, &image_dir] {
            std::fs::create_dir_all(dir).unwrap();
        }

        let mut gps_times = String::new();
        let mut velo_times = String::new();
        for (i, fix) in self.gps_track().iter().enumerate() {
            let mut fields = vec![fix.lat, fix.lon, fix.alt, 0.0, 0.0, 0.0];
            fields.resize(30, 0.0);
            let line = fields
                .iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(" ");
            std::fs::write(oxts_dir.join(format!("{}.txt", frame_label(i))), line).unwrap();

            gps_times.push_str(&format!("2011-09-26 13:02:{:02}.100000000\n", 25 + i));
            velo_times.push_str(&format!("2011-09-26 13:02:{:02}.150000000\n", 25 + i));
            self.rgb(i).save(image_dir.join(frame_file_name(i))).unwrap();
        }
        std::fs::write(drive_dir.join("oxts").join("timestamps.txt"), gps_times).unwrap();
        std::fs::write(velo_dir.join("timestamps.txt"), velo_times).unwrap();
    }

    fn write_selection(&self) {
        let root = self.selection_dir();
        for folder in ["image", "intrinsics", "groundtruth_depth", "velodyne_raw"] {
            std::fs::create_dir_all(root.join(folder)).unwrap();
        }

        let k = &self.camera;
        for &id in &self.depth_ids {
            let label = frame_label(id);
            self.rgb(id)
                .save(root.join("image").join(format!("{SAMPLE_SUBSEQ}_image_{label}_image_02.png")))
                .unwrap();
            std::fs::write(
                root.join("intrinsics")
                    .join(format!("{SAMPLE_SUBSEQ}_image_{label}_image_02.txt")),
                format!("{} 0 {} 0 {} {} 0 0 1", k.fx, k.cx, k.fy, k.cy),
            )
            .unwrap();
            write_png(
                &root
                    .join("groundtruth_depth")
                    .join(format!("{SAMPLE_SUBSEQ}_groundtruth_depth_{label}_image_02.png")),
                &self.dense_depth(id),
            );
            write_png(
                &root
                    .join("velodyne_raw")
                    .join(format!("{SAMPLE_SUBSEQ}_velodyne_raw_{label}_image_02.png")),
                &self.sparse_depth(id),
            );
        }
    }

    fn write_split(&self) {
        let proj_depth = self.depth_dir().join(SAMPLE_SUBSEQ).join("proj_depth");
        let gt_dir = proj_depth.join("groundtruth").join("image_02");
        let raw_dir = proj_depth.join("velodyne_raw").join("image_02");
        std::fs::create_dir_all(&gt_dir).unwrap();
        std::fs::create_dir_all(&raw_dir).unwrap();

        for &id in &self.depth_ids {
            write_png(&gt_dir.join(frame_file_name(id)), &self.dense_depth(id));
            write_png(&raw_dir.join(frame_file_name(id)), &self.sparse_depth(id));
        }
    }
}

fn write_png(filepath: &Path, depth: &Array2<u16>) {
    write_depth_png(filepath, &depth.view()).unwrap();
}

#[fixture]
pub fn sample_kitti_tree() -> SampleKittiTree {
    let mut camera = CameraIntrinsics::from_simple_intrinsic(7.0, 7.5, 4.0, 3.0);
    camera.size(8, 6);

    let tree = SampleKittiTree {
        dir: tempfile::tempdir().unwrap(),
        num_packets: 5,
        depth_ids: vec![1, 3],
        width: 8,
        height: 6,
        camera,
    };
    tree.write();
    tree
}
