use crate::scene::CameraDesc;
use glam::{Mat4, Quat, Vec3};

/// Right-handed perspective camera looking down its local -Z axis.
#[derive(Debug, Clone, PartialEq)]
pub struct PerspectiveCamera {
    /// Vertical field of view in degrees.
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    pub position: Vec3,
    pub rotation: Quat,
    projection: Mat4,
    world: Mat4,
}

impl PerspectiveCamera {
    pub fn new(fov: f32, aspect: f32, near: f32, far: f32) -> Self {
        let mut camera = Self {
            fov,
            aspect,
            near,
            far,
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            projection: Mat4::IDENTITY,
            world: Mat4::IDENTITY,
        };
        camera.update_projection_matrix();
        camera.update_world_matrix();
        camera
    }

    /// Builds a camera from an asset description placed at `world`.
    pub fn from_desc(desc: &CameraDesc, world: Mat4) -> Self {
        let mut camera = Self::new(
            desc.yfov_deg,
            desc.aspect.unwrap_or(1.0),
            desc.znear,
            desc.zfar.unwrap_or(1000.0),
        );
        let (_, rotation, translation) = world.to_scale_rotation_translation();
        camera.position = translation;
        camera.rotation = rotation.normalize();
        camera.update_world_matrix();
        camera
    }

    pub fn update_projection_matrix(&mut self) {
        let near = self.near.max(1e-4);
        let far = self.far.max(near + 1e-3);
        let fov = self.fov.clamp(0.01, 179.0).to_radians();
        let aspect = if self.aspect.is_finite() && self.aspect > 0.0 {
            self.aspect
        } else {
            1.0
        };
        self.projection = Mat4::perspective_rh(fov, aspect, near, far);
    }

    pub fn update_world_matrix(&mut self) {
        self.world = Mat4::from_rotation_translation(self.rotation, self.position);
    }

    /// Turns the camera toward `target` keeping +Y up, then refreshes the world matrix.
    pub fn look_at(&mut self, target: Vec3) {
        let forward = target - self.position;
        if forward.length_squared() <= 1e-12 {
            return;
        }
        let view = Mat4::look_at_rh(self.position, target, Vec3::Y);
        self.rotation = Quat::from_mat4(&view.inverse()).normalize();
        self.update_world_matrix();
    }

    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    pub fn world_matrix(&self) -> Mat4 {
        self.world
    }

    pub fn view_matrix(&self) -> Mat4 {
        self.world.inverse()
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view_matrix()
    }

    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::NEG_Z
    }
}
