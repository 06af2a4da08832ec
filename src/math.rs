//! Math types for RaySonic

pub use glam::{Mat4, Quat, Vec3};

/// Position and orientation of the ray emitter (the listener).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Pose {
    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    pub fn identity() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
        }
    }

    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
        }
    }

    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.rotation, self.position)
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::identity()
    }
}

impl From<Pose> for Mat4 {
    fn from(pose: Pose) -> Self {
        pose.to_matrix()
    }
}

/// Converts an emitter's local-to-world matrix into the kernel's convention.
///
/// The kernel traces along +Z in a right-handed frame, so the forward column
/// is negated.
pub fn kernel_emitter_matrix(local_to_world: Mat4) -> Mat4 {
    Mat4::from_cols(
        local_to_world.x_axis,
        local_to_world.y_axis,
        -local_to_world.z_axis,
        local_to_world.w_axis,
    )
}
