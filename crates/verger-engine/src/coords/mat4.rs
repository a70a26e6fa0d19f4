use core::ops::Mul;

use bytemuck::{Pod, Zeroable};

use super::Vec2;

/// Column-major 4x4 matrix (column-vector convention: `p' = M * p`).
///
/// `cols[c][r]` is the element at row `r` of column `c`, which is also the
/// layout WGSL expects for a `mat4x4<f32>` uniform.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct Mat4 {
    pub cols: [[f32; 4]; 4],
}

impl Mat4 {
    pub const IDENTITY: Mat4 = Mat4::from_cols([
        [1.0, 0.0, 0.0, 0.0],
        [0.0, 1.0, 0.0, 0.0],
        [0.0, 0.0, 1.0, 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ]);

    #[inline]
    pub const fn from_cols(cols: [[f32; 4]; 4]) -> Self {
        Self { cols }
    }

    #[inline]
    pub const fn translation(x: f32, y: f32, z: f32) -> Self {
        Self::from_cols([
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [x, y, z, 1.0],
        ])
    }

    #[inline]
    pub const fn scale(x: f32, y: f32, z: f32) -> Self {
        Self::from_cols([
            [x, 0.0, 0.0, 0.0],
            [0.0, y, 0.0, 0.0],
            [0.0, 0.0, z, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    /// Counter-clockwise rotation about +Z by `radians`.
    #[inline]
    pub fn rotation_z(radians: f32) -> Self {
        let (s, c) = radians.sin_cos();
        Self::from_cols([
            [c, s, 0.0, 0.0],
            [-s, c, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    /// `T(translation) * R(rotation) * S(scale)` built directly.
    pub fn from_translation_rotation_scale(translation: Vec2, rotation: f32, scale: Vec2) -> Self {
        let (s, c) = rotation.sin_cos();
        Self::from_cols([
            [c * scale.x, s * scale.x, 0.0, 0.0],
            [-s * scale.y, c * scale.y, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [translation.x, translation.y, 0.0, 1.0],
        ])
    }

    /// Right-handed orthographic projection with a `[0, 1]` depth range.
    pub fn orthographic_rh(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Self {
        let rcp_width = 1.0 / (right - left);
        let rcp_height = 1.0 / (top - bottom);
        let r = 1.0 / (near - far);
        Self::from_cols([
            [rcp_width + rcp_width, 0.0, 0.0, 0.0],
            [0.0, rcp_height + rcp_height, 0.0, 0.0],
            [0.0, 0.0, r, 0.0],
            [-(left + right) * rcp_width, -(top + bottom) * rcp_height, r * near, 1.0],
        ])
    }

    /// Right-handed perspective projection with a `[0, 1]` depth range.
    pub fn perspective_rh(fov_y_radians: f32, aspect: f32, near: f32, far: f32) -> Self {
        let (sin_fov, cos_fov) = (0.5 * fov_y_radians).sin_cos();
        let h = cos_fov / sin_fov;
        let w = h / aspect;
        let r = far / (near - far);
        Self::from_cols([
            [w, 0.0, 0.0, 0.0],
            [0.0, h, 0.0, 0.0],
            [0.0, 0.0, r, -1.0],
            [0.0, 0.0, r * near, 0.0],
        ])
    }

    /// Transforms a point, treating the matrix as affine (the `w` row is ignored).
    #[inline]
    pub fn transform_point3(&self, p: [f32; 3]) -> [f32; 3] {
        let c = &self.cols;
        [
            c[0][0] * p[0] + c[1][0] * p[1] + c[2][0] * p[2] + c[3][0],
            c[0][1] * p[0] + c[1][1] * p[1] + c[2][1] * p[2] + c[3][1],
            c[0][2] * p[0] + c[1][2] * p[1] + c[2][2] * p[2] + c[3][2],
        ]
    }

    /// Full homogeneous transform of `(x, y, z, 1)`.
    #[inline]
    pub fn project_point3(&self, p: [f32; 3]) -> [f32; 4] {
        let c = &self.cols;
        let mut out = [0.0; 4];
        for (row, o) in out.iter_mut().enumerate() {
            *o = c[0][row] * p[0] + c[1][row] * p[1] + c[2][row] * p[2] + c[3][row];
        }
        out
    }

    #[inline]
    pub fn transform_point(&self, p: Vec2) -> Vec2 {
        let [x, y, _] = self.transform_point3([p.x, p.y, 0.0]);
        Vec2::new(x, y)
    }

    #[inline]
    pub fn is_finite(&self) -> bool {
        self.cols.iter().flatten().all(|v| v.is_finite())
    }
}

impl Default for Mat4 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mul for Mat4 {
    type Output = Mat4;

    fn mul(self, rhs: Mat4) -> Mat4 {
        let mut out = [[0.0f32; 4]; 4];
        for (j, col) in out.iter_mut().enumerate() {
            for (i, v) in col.iter_mut().enumerate() {
                *v = (0..4).map(|k| self.cols[k][i] * rhs.cols[j][k]).sum();
            }
        }
        Mat4::from_cols(out)
    }
}

#[cfg(test)]
impl approx::AbsDiffEq for Mat4 {
    type Epsilon = f32;

    fn default_epsilon() -> f32 {
        1e-5
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: f32) -> bool {
        self.cols
            .iter()
            .flatten()
            .zip(other.cols.iter().flatten())
            .all(|(a, b)| (a - b).abs() <= epsilon)
    }
}
