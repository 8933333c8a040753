pub mod camera;
pub mod gpu;
pub mod material;

use crate::render::material::MaterialBinder;
use crate::scene::camera::PerspectiveCamera;
use crate::scene::light::{SpotLight, SpotLightHelper};
use crate::scene::SceneGraph;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("failed to create window surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),
    #[error("no GPU adapter is compatible with the window surface")]
    AdapterUnavailable,
    #[error("failed to open GPU device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),
    #[error("surface reports no supported formats")]
    SurfaceUnsupported,
    #[error("failed to acquire swap chain texture: {0}")]
    Surface(#[from] wgpu::SurfaceError),
    #[error("render_frame called outside begin_frame/end_frame")]
    NoFrameInFlight,
}

/// Everything the renderer reads to draw one frame.
pub struct Frame<'a> {
    pub graph: &'a SceneGraph,
    pub camera: &'a PerspectiveCamera,
    pub material: &'a MaterialBinder,
    pub light: &'a SpotLight,
    pub helper: &'a SpotLightHelper,
}

/// Rendering engine boundary.
pub trait RenderBackend {
    /// Output surface size in physical pixels.
    fn resize(&mut self, width: u32, height: u32);

    /// Draws the scene graph through `frame.camera`. Called at most once per tick.
    fn render_frame(&mut self, frame: &Frame<'_>) -> Result<(), RenderError>;
}
