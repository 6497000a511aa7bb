use super::quat::Quat;
use super::vec::Vec3;

/// Column-major 4x4 matrix (`cols[c][r]`), matching WGSL/WebGL layout.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Mat4 {
    pub cols: [[f64; 4]; 4],
}

impl Default for Mat4 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mat4 {
    pub const IDENTITY: Mat4 = Mat4 {
        cols: [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ],
    };

    /// `T * R * S`.
    pub fn from_trs(translation: Vec3, rotation: Quat, scale: Vec3) -> Self {
        let x = rotation.rotate(Vec3::new(1.0, 0.0, 0.0)) * scale.x;
        let y = rotation.rotate(Vec3::new(0.0, 1.0, 0.0)) * scale.y;
        let z = rotation.rotate(Vec3::new(0.0, 0.0, 1.0)) * scale.z;
        Mat4 {
            cols: [
                [x.x, x.y, x.z, 0.0],
                [y.x, y.y, y.z, 0.0],
                [z.x, z.y, z.z, 0.0],
                [translation.x, translation.y, translation.z, 1.0],
            ],
        }
    }

    /// Right-handed view matrix.
    pub fn look_at_rh(eye: Vec3, target: Vec3, up: Vec3) -> Self {
        let f = (target - eye).normalize();
        let s = f.cross(up).normalize();
        let u = s.cross(f);
        Mat4 {
            cols: [
                [s.x, u.x, -f.x, 0.0],
                [s.y, u.y, -f.y, 0.0],
                [s.z, u.z, -f.z, 0.0],
                [-s.dot(eye), -u.dot(eye), f.dot(eye), 1.0],
            ],
        }
    }

    /// Right-handed perspective projection with GL clip depth `[-1, 1]`.
    pub fn perspective_rh_gl(fov_y_rad: f64, aspect: f64, near: f64, far: f64) -> Self {
        let f = 1.0 / (0.5 * fov_y_rad).tan();
        let aspect = if aspect > 0.0 { aspect } else { 1.0 };
        let range = near - far;
        Mat4 {
            cols: [
                [f / aspect, 0.0, 0.0, 0.0],
                [0.0, f, 0.0, 0.0],
                [0.0, 0.0, (far + near) / range, -1.0],
                [0.0, 0.0, 2.0 * far * near / range, 0.0],
            ],
        }
    }

    /// Clip-space position `[x, y, z, w]` of `p`.
    pub fn project(&self, p: Vec3) -> [f64; 4] {
        let c = &self.cols;
        let mut out = [0.0; 4];
        for (r, o) in out.iter_mut().enumerate() {
            *o = c[0][r] * p.x + c[1][r] * p.y + c[2][r] * p.z + c[3][r];
        }
        out
    }

    pub fn transform_point(&self, p: Vec3) -> Vec3 {
        let c = &self.cols;
        Vec3::new(
            c[0][0] * p.x + c[1][0] * p.y + c[2][0] * p.z + c[3][0],
            c[0][1] * p.x + c[1][1] * p.y + c[2][1] * p.z + c[3][1],
            c[0][2] * p.x + c[1][2] * p.y + c[2][2] * p.z + c[3][2],
        )
    }

    pub fn to_f32(&self) -> [[f32; 4]; 4] {
        let mut out = [[0.0f32; 4]; 4];
        for (col, src) in out.iter_mut().zip(self.cols.iter()) {
            for (dst, v) in col.iter_mut().zip(src.iter()) {
                *dst = *v as f32;
            }
        }
        out
    }
}

impl std::ops::Mul for Mat4 {
    type Output = Mat4;

    // c = a * b
    fn mul(self, b: Mat4) -> Mat4 {
        let a = &self.cols;
        let mut c = [[0.0f64; 4]; 4];
        for col in 0..4 {
            for row in 0..4 {
                c[col][row] = a[0][row] * b.cols[col][0]
                    + a[1][row] * b.cols[col][1]
                    + a[2][row] * b.cols[col][2]
                    + a[3][row] * b.cols[col][3];
            }
        }
        Mat4 { cols: c }
    }
}

#[cfg(test)]
mod tests {
    use super::Mat4;
    use crate::math::{Quat, Vec3};

    #[test]
    fn trs_applies_scale_then_rotation_then_translation() {
        let m = Mat4::from_trs(
            Vec3::new(10.0, 0.0, 0.0),
            Quat::from_rotation_y(std::f64::consts::FRAC_PI_2),
            Vec3::new(2.0, 1.0, 1.0),
        );
        let p = m.transform_point(Vec3::new(1.0, 0.0, 0.0));
        assert!((p - Vec3::new(10.0, 0.0, -2.0)).length() < 1e-9);
    }

    #[test]
    fn multiplication_composes_parent_first() {
        let parent = Mat4::from_trs(Vec3::new(0.0, 1.0, 0.0), Quat::IDENTITY, Vec3::splat(2.0));
        let child = Mat4::from_trs(Vec3::new(1.0, 0.0, 0.0), Quat::IDENTITY, Vec3::ONE);
        let p = (parent * child).transform_point(Vec3::ZERO);
        assert_eq!(p, Vec3::new(2.0, 1.0, 0.0));
        assert_eq!(Mat4::IDENTITY * child, child);
    }

    #[test]
    fn view_projection_centers_the_target() {
        let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y);
        let proj = Mat4::perspective_rh_gl(std::f64::consts::FRAC_PI_2, 1.0, 1.0, 10.0);
        let clip = (proj * view).project(Vec3::ZERO);
        assert!(clip[0].abs() < 1e-9 && clip[1].abs() < 1e-9);
        assert!((clip[3] - 5.0).abs() < 1e-9);

        let near = (proj * view).project(Vec3::new(0.0, 0.0, 4.0));
        assert!((near[2] / near[3] + 1.0).abs() < 1e-9);
        let right = (proj * view).project(Vec3::new(1.0, 0.0, 0.0));
        assert!(right[0] > 0.0);
    }
}
