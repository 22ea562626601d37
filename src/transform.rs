use nalgebra::{Isometry3, Matrix3, Matrix4, Rotation3, Translation3, UnitQuaternion, Vector3};
use ndarray::{Array2, Axis};

use std::ops;

/// Rigid transform. Poses of KITTI drives are expressed in metres close to
/// ECEF magnitudes, so double precision is kept throughout.
#[derive(Clone, Debug, PartialEq)]
pub struct Transform(Isometry3<f64>);

impl Transform {
    pub fn eye() -> Self {
        Self(Isometry3::identity())
    }

    pub fn new(translation: &Vector3<f64>, rotation: &Rotation3<f64>) -> Self {
        Self(Isometry3::from_parts(
            Translation3::from(*translation),
            UnitQuaternion::from_rotation_matrix(rotation),
        ))
    }

    pub fn from_translation(translation: &Vector3<f64>) -> Self {
        Self::new(translation, &Rotation3::identity())
    }

    /// Builds a transform out of a homogeneous matrix. The upper 3x3 block is
    /// projected onto the closest rotation, calibration files only store a few
    /// significant digits.
    pub fn from_matrix4(matrix: &Matrix4<f64>) -> Self {
        let translation = Vector3::new(matrix[(0, 3)], matrix[(1, 3)], matrix[(2, 3)]);
        let rotation = Self::closest_rotation(&matrix.fixed_slice::<3, 3>(0, 0).into_owned());
        Self::new(&translation, &rotation)
    }

    fn closest_rotation(matrix: &Matrix3<f64>) -> Rotation3<f64> {
        let svd = matrix.svd(true, true);
        match (svd.u, svd.v_t) {
            (Some(mut u), Some(v_t)) => {
                if (u * v_t).determinant() < 0.0 {
                    u.column_mut(2).neg_mut();
                }
                Rotation3::from_matrix_unchecked(u * v_t)
            }
            _ => Rotation3::from_matrix_eps(matrix, 1.0e-12, 100, Rotation3::identity()),
        }
    }

    /// Viewing transform `diag(1, -1, -1, 1)`, turns camera-frame clouds
    /// (y down, z forward) upright for viewers with y up.
    pub fn flip_yz() -> Self {
        Self::new(
            &Vector3::zeros(),
            &Rotation3::from_axis_angle(&Vector3::x_axis(), std::f64::consts::PI),
        )
    }

    pub fn inverse(&self) -> Self {
        Self(self.0.inverse())
    }

    pub fn translation(&self) -> Vector3<f64> {
        self.0.translation.vector
    }

    pub fn rotation(&self) -> Rotation3<f64> {
        self.0.rotation.to_rotation_matrix()
    }

    /// Rotation angle in radians.
    pub fn angle(&self) -> f64 {
        self.0.rotation.angle()
    }

    pub fn to_matrix4(&self) -> Matrix4<f64> {
        self.0.to_homogeneous()
    }

    /// Transforms an Nx3 array of points in place.
    pub fn transform(&self, mut rhs: Array2<f64>) -> Array2<f64> {
        for mut point in rhs.axis_iter_mut(Axis(0)) {
            let v = self.0 * nalgebra::Point3::new(point[0], point[1], point[2]);
            point[0] = v[0];
            point[1] = v[1];
            point[2] = v[2];
        }

        rhs
    }

    pub fn transform_point(&self, point: &Vector3<f64>) -> Vector3<f64> {
        (self.0 * nalgebra::Point3::from(*point)).coords
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::eye()
    }
}

impl ops::Mul<&Array2<f64>> for &Transform {
    type Output = Array2<f64>;

    fn mul(self, rhs: &Array2<f64>) -> Self::Output {
        self.transform(rhs.clone())
    }
}

impl ops::Mul<&Vector3<f64>> for &Transform {
    type Output = Vector3<f64>;

    fn mul(self, rhs: &Vector3<f64>) -> Self::Output {
        self.transform_point(rhs)
    }
}

impl ops::Mul<&Transform> for &Transform {
    type Output = Transform;

    fn mul(self, rhs: &Transform) -> Self::Output {
        Transform(self.0 * rhs.0)
    }
}

impl From<&Matrix4<f64>> for Transform {
    fn from(matrix: &Matrix4<f64>) -> Self {
        Transform::from_matrix4(matrix)
    }
}

impl From<Transform> for Matrix4<f64> {
    fn from(transform: Transform) -> Self {
        transform.to_matrix4()
    }
}

#[cfg(test)]
mod tests {
    use super::Transform;
    use approx::assert_abs_diff_eq;
    use nalgebra::{Matrix4, Rotation3, Vector3};
    use ndarray::array;

    #[test]
    fn test_mul_op() {
        let transform = Transform::eye();
        let points = array![[1., 2., 3.], [4., 5., 6.], [7., 8., 9.]];
        let mult_result = &transform * &points;

        assert_eq!(mult_result, points);

        let transform = Transform::new(
            &Vector3::new(0., 0., 3.),
            &Rotation3::from_scaled_axis(Vector3::y() * std::f64::consts::PI),
        );

        let result = &transform * &array![[1.0, 2.0, 3.0], [1.0, 2.0, 3.0]];
        assert_abs_diff_eq!(
            result,
            array![[-1.0, 2.0, 0.0], [-1.0, 2.0, 0.0]],
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_matrix_roundtrip_and_inverse() {
        #[rustfmt::skip]
        let matrix = Matrix4::new(
            0.0, -1.0, 0.0, 1.0,
            1.0, 0.0, 0.0, 2.0,
            0.0, 0.0, 1.0, 3.0,
            0.0, 0.0, 0.0, 1.0,
        );
        let transform = Transform::from_matrix4(&matrix);
        assert_abs_diff_eq!(transform.to_matrix4(), matrix, epsilon = 1e-9);

        let identity = &transform * &transform.inverse();
        assert_abs_diff_eq!(identity.to_matrix4(), Matrix4::identity(), epsilon = 1e-9);
    }

    #[test]
    fn test_flip_yz() {
        let flipped = &Transform::flip_yz() * &Vector3::new(1.0, 2.0, 3.0);
        assert_abs_diff_eq!(flipped, Vector3::new(1.0, -2.0, -3.0), epsilon = 1e-9);
    }
}
