use std::ops::Index;

use nalgebra::Vector3;

use crate::transform::Transform;

/// Trajectory of camera poses, as loaded from GPS/IMU packets.
#[derive(Clone, Debug, Default)]
pub struct Trajectory {
    /// Camera poses, transforms points from camera to world.
    pub camera_to_world: Vec<Transform>,
    /// Timestamps of each pose, in seconds.
    pub times: Vec<f64>,
}

impl Trajectory {
    /// Adds a new pose to the trajectory.
    ///
    /// # Arguments
    ///
    /// * `camera_to_world` - Transform from camera to world.
    /// * `time` - Timestamp of the pose.
    pub fn push(&mut self, camera_to_world: Transform, time: f64) {
        self.camera_to_world.push(camera_to_world);
        self.times.push(time);
    }

    /// Returns the number of poses in the trajectory.
    pub fn len(&self) -> usize {
        self.camera_to_world.len()
    }

    /// Returns true if the trajectory is empty.
    pub fn is_empty(&self) -> bool {
        self.camera_to_world.is_empty()
    }

    /// Returns the transform taking points of `from_index` camera into `dest_index` camera.
    pub fn get_relative_transform(
        &self,
        from_index: usize,
        dest_index: usize,
    ) -> Option<Transform> {
        let from = self.camera_to_world.get(from_index)?;
        let dest = self.camera_to_world.get(dest_index)?;
        Some(&dest.inverse() * from)
    }

    /// Returns the iterator over poses and timestamps.
    pub fn iter(&self) -> impl Iterator<Item = (&Transform, f64)> + '_ {
        self.camera_to_world
            .iter()
            .zip(self.times.iter())
            .map(|(camera_to_world, time)| (camera_to_world, *time))
    }

    /// Creates a new trajectory with the poses transformed in such a way that the first pose is at origin.
    pub fn first_frame_at_origin(&self) -> Self {
        if self.camera_to_world.is_empty() {
            return self.clone();
        }

        let first_inv = self.camera_to_world[0].inverse();
        Self {
            camera_to_world: self
                .camera_to_world
                .iter()
                .map(|transform| &first_inv * transform)
                .collect::<Vec<Transform>>(),
            times: self.times.clone(),
        }
    }

    /// Creates a new trajectory with the poses at the given indices.
    /// Returns `None` if any index is out of range.
    pub fn select(&self, indices: &[usize]) -> Option<Self> {
        indices
            .iter()
            .map(|&i| Some((self.camera_to_world.get(i)?.clone(), *self.times.get(i)?)))
            .collect::<Option<Trajectory>>()
    }

    /// Camera centers, in world coordinates.
    pub fn positions(&self) -> Vec<Vector3<f64>> {
        self.camera_to_world
            .iter()
            .map(|pose| pose.translation())
            .collect()
    }

    /// Sum of the distances between consecutive camera centers.
    pub fn path_length(&self) -> f64 {
        self.positions()
            .windows(2)
            .map(|pair| (pair[1] - pair[0]).norm())
            .sum()
    }
}

impl FromIterator<(Transform, f64)> for Trajectory {
    /// Creates a new trajectory from the `(Transform, f64)` iterator.
    /// Use with the `collect::<Trajectory>` method.
    fn from_iter<T: IntoIterator<Item = (Transform, f64)>>(iter: T) -> Self {
        let mut trajectory = Trajectory::default();
        for (transform, time) in iter {
            trajectory.push(transform, time);
        }
        trajectory
    }
}

impl Index<usize> for Trajectory {
    type Output = Transform;
    /// Returns the pose at the given index.
    fn index(&self, index: usize) -> &Self::Output {
        &self.camera_to_world[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn straight_line() -> Trajectory {
        (0..4)
            .map(|i| {
                (
                    Transform::from_translation(&Vector3::new(10.0 + i as f64, 5.0, 0.0)),
                    i as f64 * 0.1,
                )
            })
            .collect()
    }

    #[test]
    fn should_move_first_frame_to_origin() {
        let traj = straight_line().first_frame_at_origin();
        assert_abs_diff_eq!(traj[0].translation(), Vector3::zeros(), epsilon = 1e-12);
        assert_abs_diff_eq!(
            traj[3].translation(),
            Vector3::new(3.0, 0.0, 0.0),
            epsilon = 1e-12
        );
        assert_abs_diff_eq!(traj.path_length(), 3.0, epsilon = 1e-12);
    }

    #[test]
    fn should_select_poses() {
        let traj = straight_line();
        let subset = traj.select(&[1, 3]).unwrap();
        assert_eq!(subset.len(), 2);
        assert_eq!(subset.times, vec![0.1, 0.30000000000000004]);
        assert!(traj.select(&[4]).is_none());
    }

    #[test]
    fn should_compute_relative_transform() {
        let traj = straight_line();
        let rel = traj.get_relative_transform(2, 0).unwrap();
        assert_abs_diff_eq!(rel.translation(), Vector3::new(2.0, 0.0, 0.0), epsilon = 1e-12);
        assert!(traj.get_relative_transform(0, 9).is_none());
    }
}
