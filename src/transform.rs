//! Minimal 4x4 transform math.
//!
//! Just enough matrix support for composing the translate/rotate/skew/scale
//! components of a [`TransitionableTransform`](crate::transition::TransitionableTransform).
//! Matrices are column-major, with the translation in elements 12..15.

/// A 4x4 transform matrix in column-major order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform(pub [f64; 16]);

impl Transform {
    /// The identity transform.
    pub const IDENTITY: Self = Self([
        1.0, 0.0, 0.0, 0.0, //
        0.0, 1.0, 0.0, 0.0, //
        0.0, 0.0, 1.0, 0.0, //
        0.0, 0.0, 0.0, 1.0,
    ]);

    /// A pure translation.
    pub fn translate(x: f64, y: f64, z: f64) -> Self {
        let mut m = Self::IDENTITY;
        m.0[12] = x;
        m.0[13] = y;
        m.0[14] = z;
        m
    }

    /// A pure axis-aligned scale.
    pub fn scale(x: f64, y: f64, z: f64) -> Self {
        let mut m = Self::IDENTITY;
        m.0[0] = x;
        m.0[5] = y;
        m.0[10] = z;
        m
    }

    /// Rotation about the x axis by `theta` radians.
    pub fn rotate_x(theta: f64) -> Self {
        let (s, c) = theta.sin_cos();
        let mut m = Self::IDENTITY;
        m.0[5] = c;
        m.0[6] = s;
        m.0[9] = -s;
        m.0[10] = c;
        m
    }

    /// Rotation about the y axis by `theta` radians.
    pub fn rotate_y(theta: f64) -> Self {
        let (s, c) = theta.sin_cos();
        let mut m = Self::IDENTITY;
        m.0[0] = c;
        m.0[2] = -s;
        m.0[8] = s;
        m.0[10] = c;
        m
    }

    /// Rotation about the z axis by `theta` radians.
    pub fn rotate_z(theta: f64) -> Self {
        let (s, c) = theta.sin_cos();
        let mut m = Self::IDENTITY;
        m.0[0] = c;
        m.0[1] = s;
        m.0[4] = -s;
        m.0[5] = c;
        m
    }

    /// A shear of the x/y plane by `theta` radians.
    pub fn skew(theta: f64) -> Self {
        let mut m = Self::IDENTITY;
        m.0[4] = theta.tan();
        m
    }

    /// Composes `self` with `other`, applying `other` first.
    pub fn compose(&self, other: &Self) -> Self {
        let a = &self.0;
        let b = &other.0;
        let mut out = [0.0; 16];
        for col in 0..4 {
            for row in 0..4 {
                let mut sum = 0.0;
                for k in 0..4 {
                    sum += a[k * 4 + row] * b[col * 4 + k];
                }
                out[col * 4 + row] = sum;
            }
        }
        Self(out)
    }

    /// The translation component of this transform.
    pub fn translation(&self) -> [f64; 3] {
        [self.0[12], self.0[13], self.0[14]]
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// The independently-driven components of a composed transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformComponents {
    pub translate: [f64; 3],
    /// Per-axis scale factors.
    pub scale: [f64; 3],
    /// Euler angles in radians, applied x then y then z.
    pub rotate: [f64; 3],
    /// Shear angles in radians; only the x/y component is applied.
    pub skew: [f64; 3],
}

impl TransformComponents {
    /// Components that build the identity transform.
    pub fn identity() -> Self {
        Self {
            translate: [0.0; 3],
            scale: [1.0, 1.0, 1.0],
            rotate: [0.0; 3],
            skew: [0.0; 3],
        }
    }

    /// Builds the composed matrix: translate, then rotate, then skew, then
    /// scale (innermost applied first).
    pub fn build(&self) -> Transform {
        let [tx, ty, tz] = self.translate;
        let [rx, ry, rz] = self.rotate;
        let [sx, sy, sz] = self.scale;
        let mut m = Transform::translate(tx, ty, tz);
        if rx != 0.0 {
            m = m.compose(&Transform::rotate_x(rx));
        }
        if ry != 0.0 {
            m = m.compose(&Transform::rotate_y(ry));
        }
        if rz != 0.0 {
            m = m.compose(&Transform::rotate_z(rz));
        }
        if self.skew[0] != 0.0 {
            m = m.compose(&Transform::skew(self.skew[0]));
        }
        m.compose(&Transform::scale(sx, sy, sz))
    }
}

impl Default for TransformComponents {
    fn default() -> Self {
        Self::identity()
    }
}
