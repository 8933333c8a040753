use crate::scene::camera::PerspectiveCamera;
use glam::{Vec2, Vec3};

const EPS: f32 = 1e-6;
const MIN_POLAR: f32 = 1e-3;

/// Orbit, dolly and pan around a target point. Input accumulates into pending deltas that
/// [`OrbitControls::update`] applies to a camera once per frame; with damping enabled the
/// deltas decay over several frames instead of being consumed at once.
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitControls {
    pub target: Vec3,
    pub enable_damping: bool,
    pub damping_factor: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    /// (azimuth, polar) in radians.
    spherical_delta: Vec2,
    scale: f32,
    pan_offset: Vec3,
}

impl OrbitControls {
    pub fn new(target: Vec3) -> Self {
        Self {
            target,
            enable_damping: false,
            damping_factor: 0.05,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            pan_speed: 1.0,
            min_distance: 0.0,
            max_distance: f32::INFINITY,
            spherical_delta: Vec2::ZERO,
            scale: 1.0,
            pan_offset: Vec3::ZERO,
        }
    }

    /// Pointer drag in pixels. A drag across the full viewport height turns a full circle.
    pub fn rotate(&mut self, delta_px: Vec2, viewport_height: f32) {
        let height = viewport_height.max(1.0);
        let per_pixel = std::f32::consts::TAU / height * self.rotate_speed;
        self.spherical_delta.x -= delta_px.x * per_pixel;
        self.spherical_delta.y -= delta_px.y * per_pixel;
    }

    /// Screen-space drag in pixels, converted to world units at the target distance.
    pub fn pan(&mut self, delta_px: Vec2, viewport_height: f32, camera: &PerspectiveCamera) {
        let height = viewport_height.max(1.0);
        let distance = (camera.position - self.target).length();
        let visible = 2.0 * distance * (camera.fov.to_radians() * 0.5).tan();
        let world_per_pixel = visible / height * self.pan_speed;
        let world = camera.world_matrix();
        let right = world.x_axis.truncate();
        let up = world.y_axis.truncate();
        self.pan_offset += -right * delta_px.x * world_per_pixel + up * delta_px.y * world_per_pixel;
    }

    /// Wheel steps; positive moves toward the target.
    pub fn dolly(&mut self, steps: f32) {
        let step_scale = 0.95f32.powf(self.zoom_speed);
        self.scale *= step_scale.powf(steps);
    }

    /// Applies pending input to `camera` and re-aims it at the target. Returns whether the
    /// camera moved.
    pub fn update(&mut self, camera: &mut PerspectiveCamera) -> bool {
        let offset = camera.position - self.target;
        let radius = offset.length();
        let mut azimuth = offset.x.atan2(offset.z);
        let mut polar = if radius > EPS {
            (offset.y / radius).clamp(-1.0, 1.0).acos()
        } else {
            std::f32::consts::FRAC_PI_2
        };

        let blend = if self.enable_damping {
            self.damping_factor
        } else {
            1.0
        };
        azimuth += self.spherical_delta.x * blend;
        polar += self.spherical_delta.y * blend;
        polar = polar.clamp(MIN_POLAR, std::f32::consts::PI - MIN_POLAR);
        let radius = (radius * self.scale).clamp(self.min_distance, self.max_distance);
        self.target += self.pan_offset * blend;

        let sin_polar = polar.sin();
        let new_offset = Vec3::new(
            radius * sin_polar * azimuth.sin(),
            radius * polar.cos(),
            radius * sin_polar * azimuth.cos(),
        );
        let previous = camera.position;
        camera.position = self.target + new_offset;
        camera.look_at(self.target);

        if self.enable_damping {
            self.spherical_delta *= 1.0 - self.damping_factor;
            self.pan_offset *= 1.0 - self.damping_factor;
        } else {
            self.spherical_delta = Vec2::ZERO;
            self.pan_offset = Vec3::ZERO;
        }
        self.scale = 1.0;

        (camera.position - previous).length_squared() > EPS
    }
}
