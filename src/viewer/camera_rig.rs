use crate::params::{Axis, CameraParam, CameraParams};
use crate::render::camera::OrbitControls;
use crate::scene::camera::PerspectiveCamera;
use crate::scene::NodeId;
use glam::{Mat4, Vec2, Vec3};

/// Holds the active camera once one has been adopted. Every operation before adoption is a
/// silent no-op.
#[derive(Debug, Clone)]
pub struct CameraRig {
    camera: Option<PerspectiveCamera>,
    controls: Option<OrbitControls>,
    node: Option<NodeId>,
    viewport: (u32, u32),
    orbit_target: Vec3,
}

impl CameraRig {
    pub fn new(orbit_target: Vec3) -> Self {
        Self {
            camera: None,
            controls: None,
            node: None,
            viewport: (1, 1),
            orbit_target,
        }
    }

    pub fn adopt(&mut self, mut camera: PerspectiveCamera, params: &CameraParams, viewport: (u32, u32)) {
        self.viewport = (viewport.0.max(1), viewport.1.max(1));
        camera.aspect = self.viewport.0 as f32 / self.viewport.1 as f32;
        camera.near = params.near;
        camera.far = params.far;
        camera.update_projection_matrix();

        let mut controls = OrbitControls::new(self.orbit_target);
        controls.enable_damping = params.damping;
        controls.update(&mut camera);
        log::info!(
            "Adopted camera: fov {:.1}, aspect {:.3}, position {:?}",
            camera.fov,
            camera.aspect,
            camera.position
        );
        self.camera = Some(camera);
        self.controls = Some(controls);
    }

    /// Ties the adopted camera to the graph node that carries its pose.
    pub fn follow_node(&mut self, node: NodeId) {
        if self.camera.is_some() {
            self.node = Some(node);
        }
    }

    pub fn followed_node(&self) -> Option<NodeId> {
        self.node
    }

    /// Moves the camera to the followed node's world pose. Orbit controls take over from
    /// there on the next [`tick_controls`](Self::tick_controls).
    pub fn place_at(&mut self, world: Mat4) {
        let Some(camera) = &mut self.camera else {
            return;
        };
        let (_, rotation, translation) = world.to_scale_rotation_translation();
        camera.position = translation;
        camera.rotation = rotation.normalize();
        camera.update_world_matrix();
    }

    pub fn on_resize(&mut self, width: u32, height: u32) {
        let Some(camera) = &mut self.camera else {
            return;
        };
        self.viewport = (width.max(1), height.max(1));
        camera.aspect = self.viewport.0 as f32 / self.viewport.1 as f32;
        camera.update_projection_matrix();
    }

    /// Copies one edited camera field onto the adopted camera. Returns false before adoption.
    pub fn on_parameter_change(&mut self, param: CameraParam, params: &CameraParams) -> bool {
        let Some(camera) = &mut self.camera else {
            return false;
        };
        match param {
            CameraParam::Fov => {
                camera.fov = params.fov;
                camera.update_projection_matrix();
            }
            CameraParam::Near => {
                camera.near = params.near;
                camera.update_projection_matrix();
            }
            CameraParam::Far => {
                camera.far = params.far;
                camera.update_projection_matrix();
            }
            CameraParam::Position(axis) => {
                match axis {
                    Axis::X => camera.position.x = params.position.x,
                    Axis::Y => camera.position.y = params.position.y,
                    Axis::Z => camera.position.z = params.position.z,
                }
                camera.update_world_matrix();
            }
            CameraParam::Damping => {
                if let Some(controls) = &mut self.controls {
                    controls.enable_damping = params.damping;
                }
            }
        }
        true
    }

    /// Applies pending orbit input and damping.
    pub fn tick_controls(&mut self) -> bool {
        match (&mut self.camera, &mut self.controls) {
            (Some(camera), Some(controls)) => controls.update(camera),
            _ => false,
        }
    }

    pub fn orbit_rotate(&mut self, delta_px: Vec2) {
        if let Some(controls) = &mut self.controls {
            controls.rotate(delta_px, self.viewport.1 as f32);
        }
    }

    pub fn orbit_pan(&mut self, delta_px: Vec2) {
        if let (Some(camera), Some(controls)) = (&self.camera, &mut self.controls) {
            controls.pan(delta_px, self.viewport.1 as f32, camera);
        }
    }

    pub fn orbit_dolly(&mut self, steps: f32) {
        if let Some(controls) = &mut self.controls {
            controls.dolly(steps);
        }
    }

    pub fn active_camera(&self) -> Option<&PerspectiveCamera> {
        self.camera.as_ref()
    }

    pub fn controls(&self) -> Option<&OrbitControls> {
        self.controls.as_ref()
    }
}
