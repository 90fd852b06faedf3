use glamx::{Mat3, Mat4, Vec2, Vec3, Vec4};
use smallvec::SmallVec;
use std::collections::BTreeMap;

/// Uniform name to value, ordered so draws upload uniforms deterministically.
pub type UniformMap = BTreeMap<String, UniformValue>;

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum UniformValue {
    Vec1(f32),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    Mat3(Mat3),
    Mat4(Mat4),
}

impl UniformValue {
    /// Raw float components in column-major order.
    pub fn to_floats(&self) -> SmallVec<[f32; 16]> {
        match self {
            UniformValue::Vec1(v) => SmallVec::from_slice(&[*v]),
            UniformValue::Vec2(v) => SmallVec::from_slice(&v.to_array()),
            UniformValue::Vec3(v) => SmallVec::from_slice(&v.to_array()),
            UniformValue::Vec4(v) => SmallVec::from_slice(&v.to_array()),
            UniformValue::Mat3(m) => SmallVec::from_slice(&m.to_cols_array()),
            UniformValue::Mat4(m) => SmallVec::from_slice(&m.to_cols_array()),
        }
    }
}

impl From<f32> for UniformValue {
    fn from(value: f32) -> Self {
        UniformValue::Vec1(value)
    }
}

impl From<Vec2> for UniformValue {
    fn from(value: Vec2) -> Self {
        UniformValue::Vec2(value)
    }
}

impl From<Vec3> for UniformValue {
    fn from(value: Vec3) -> Self {
        UniformValue::Vec3(value)
    }
}

impl From<Vec4> for UniformValue {
    fn from(value: Vec4) -> Self {
        UniformValue::Vec4(value)
    }
}

impl From<Mat3> for UniformValue {
    fn from(value: Mat3) -> Self {
        UniformValue::Mat3(value)
    }
}

impl From<Mat4> for UniformValue {
    fn from(value: Mat4) -> Self {
        UniformValue::Mat4(value)
    }
}
