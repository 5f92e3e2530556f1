use std::ops::Mul;

use serde::{Deserialize, Serialize};
use ultraviolet::{Rotor3, Vec3};

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Transform {
    pub position: Vec3,
    pub orientation: Rotor3,
    pub scale: Vec3,
}

impl Transform {
    pub fn from_arrays(position: [f32; 3], orientation: [f32; 4], scale: [f32; 3]) -> Self {
        Self {
            position: Vec3::from(position),
            orientation: Rotor3::from_quaternion_array(orientation),
            scale: Vec3::from(scale),
        }
    }

    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.position + (self.orientation * (point * self.scale))
    }

    /// Normals go through the inverse transpose, which for rotation * scale is rotation / scale.
    pub fn transform_normal(&self, normal: Vec3) -> Vec3 {
        let normal = self.orientation * (normal / self.scale);
        if normal.mag_sq() > 0.0 {
            normal.normalized()
        } else {
            normal
        }
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::default()
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::zero(),
            orientation: Rotor3::identity(),
            scale: Vec3::one(),
        }
    }
}

impl Mul<Transform> for &Transform {
    type Output = Transform;

    fn mul(self, rhs: Transform) -> Self::Output {
        Transform {
            position: self.transform_point(rhs.position),
            orientation: self.orientation * rhs.orientation,
            scale: self.scale * rhs.scale,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: Vec3, b: Vec3) {
        assert!((a - b).mag() < 1e-5, "{:?} != {:?}", a, b);
    }

    #[test]
    fn translation_and_scale_apply_to_points() {
        let transform = Transform::from_arrays([1.0, 2.0, 3.0], [0.0, 0.0, 0.0, 1.0], [2.0, 2.0, 2.0]);
        assert_close(
            transform.transform_point(Vec3::new(1.0, 1.0, 1.0)),
            Vec3::new(3.0, 4.0, 5.0),
        );
    }

    #[test]
    fn normals_ignore_translation_and_stay_unit_length() {
        let transform = Transform::from_arrays([5.0, 5.0, 5.0], [0.0, 0.0, 0.0, 1.0], [1.0, 4.0, 1.0]);
        assert_close(
            transform.transform_normal(Vec3::new(0.0, 1.0, 0.0)),
            Vec3::new(0.0, 1.0, 0.0),
        );
    }

    #[test]
    fn parent_transform_applies_after_child() {
        let parent = Transform::from_arrays([10.0, 0.0, 0.0], [0.0, 0.0, 0.0, 1.0], [1.0, 1.0, 1.0]);
        let child = Transform::from_arrays([0.0, 1.0, 0.0], [0.0, 0.0, 0.0, 1.0], [1.0, 1.0, 1.0]);
        let global = &parent * child;
        assert_close(global.transform_point(Vec3::zero()), Vec3::new(10.0, 1.0, 0.0));
        assert!(Transform::default().is_identity());
    }
}
