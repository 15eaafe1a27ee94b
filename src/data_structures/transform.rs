//! Position, Euler rotation and scale of a drawn object.

use cgmath::{Deg, Matrix4, Vector3};

/// Placement of an object in world space.
///
/// Rotation is given as Euler angles in degrees and applied X, then Y, then Z
/// in matrix order, so the resulting matrix is
/// `translate · rotate_x · rotate_y · rotate_z · scale`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub position: Vector3<f32>,
    pub rotation: Vector3<f32>,
    pub scale: Vector3<f32>,
}

impl Transform {
    /// Identity transformation (no move, rotate, or scale).
    pub fn new() -> Self {
        Self {
            position: Vector3::new(0.0, 0.0, 0.0),
            rotation: Vector3::new(0.0, 0.0, 0.0),
            scale: Vector3::new(1.0, 1.0, 1.0),
        }
    }

    pub fn to_matrix(&self) -> Matrix4<f32> {
        Matrix4::from_translation(self.position)
            * Matrix4::from_angle_x(Deg(self.rotation.x))
            * Matrix4::from_angle_y(Deg(self.rotation.y))
            * Matrix4::from_angle_z(Deg(self.rotation.z))
            * Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Vector3<f32>> for Transform {
    fn from(position: Vector3<f32>) -> Self {
        Transform {
            position,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{InnerSpace, Vector4};

    fn apply(transform: &Transform, point: [f32; 3]) -> Vector3<f32> {
        (transform.to_matrix() * Vector4::new(point[0], point[1], point[2], 1.0)).truncate()
    }

    fn close(a: Vector3<f32>, b: Vector3<f32>) -> bool {
        (a - b).magnitude() < 1e-5
    }

    #[test]
    fn origin_lands_on_the_position() {
        let transform = Transform {
            position: Vector3::new(1.0, 0.0, 0.0),
            scale: Vector3::new(2.0, 2.0, 2.0),
            ..Default::default()
        };
        assert!(close(apply(&transform, [0.0, 0.0, 0.0]), Vector3::new(1.0, 0.0, 0.0)));
    }

    #[test]
    fn scale_applies_before_translation() {
        let transform = Transform {
            position: Vector3::new(1.0, 0.0, 0.0),
            scale: Vector3::new(2.0, 2.0, 2.0),
            ..Default::default()
        };
        assert!(close(apply(&transform, [1.0, 0.0, 0.0]), Vector3::new(3.0, 0.0, 0.0)));
    }

    #[test]
    fn rotation_about_y_turns_x_into_minus_z() {
        let transform = Transform {
            rotation: Vector3::new(0.0, 90.0, 0.0),
            ..Default::default()
        };
        assert!(close(apply(&transform, [1.0, 0.0, 0.0]), Vector3::new(0.0, 0.0, -1.0)));
    }

    #[test]
    fn z_rotation_is_applied_first() {
        // Rz(90) maps x to y, then Rx(90) maps y to z.
        let transform = Transform {
            rotation: Vector3::new(90.0, 0.0, 90.0),
            ..Default::default()
        };
        assert!(close(apply(&transform, [1.0, 0.0, 0.0]), Vector3::new(0.0, 0.0, 1.0)));
    }
}
