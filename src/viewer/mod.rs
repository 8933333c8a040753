//! The viewer core: parameter store, shared material, animation playback, camera and the
//! per-frame tick that ties them to a render backend.
//!
//! All state is owned by [`Viewer`] and touched only from the thread that calls
//! [`Viewer::tick`]. Background loads and ui edits reach it as [`ViewerMessage`]s that are
//! drained at the top of every tick.

pub mod animation;
pub mod binding;
pub mod camera_rig;
pub mod clock;

pub use animation::{AnimationController, PlaybackState};
pub use binding::{ControlPanelBinder, Folder, PANEL};
pub use camera_rig::CameraRig;

use crate::assets::{AssetError, AssetLoader, LoadedScene, Texture, TextureError};
use crate::params::{ParamId, ParamValue, ParameterStore};
use crate::render::material::MaterialBinder;
use crate::render::{Frame, RenderBackend, RenderError};
use crate::scene::camera::PerspectiveCamera;
use crate::scene::light::{SpotLight, SpotLightHelper};
use crate::scene::{Geometry, MaterialRef, MeshNode, Node, NodeKind, SceneGraph, Transform};
use clock::FrameClock;
use glam::{Vec2, Vec3};
use std::path::Path;
use std::sync::{mpsc, Arc};
use std::time::Instant;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadState {
    #[default]
    Pending,
    Loaded,
    Failed(String),
}

#[derive(Debug)]
pub enum ViewerMessage {
    SceneLoaded(Result<LoadedScene, AssetError>),
    EnvironmentLoaded(Result<Texture, TextureError>),
    NormalMapLoaded(Result<Texture, TextureError>),
    Edit(ParamId, ParamValue),
    ToggleAnimation,
    Resize { width: u32, height: u32 },
}

/// Posting end of the viewer's inbox. Sends after the viewer is gone are dropped.
#[derive(Debug, Clone)]
pub struct MessageSender(mpsc::Sender<ViewerMessage>);

impl MessageSender {
    pub fn send(&self, message: ViewerMessage) {
        let _ = self.0.send(message);
    }
}

pub struct Viewer {
    store: ParameterStore,
    material: MaterialBinder,
    animation: AnimationController,
    camera: CameraRig,
    graph: SceneGraph,
    light: SpotLight,
    helper: SpotLightHelper,
    clock: FrameClock,
    viewport: (u32, u32),
    inbox: mpsc::Receiver<ViewerMessage>,
    outbox: MessageSender,
    scene_state: LoadState,
    environment_state: LoadState,
    normal_map_state: LoadState,
}

impl Viewer {
    pub fn new(viewport: (u32, u32), orbit_target: Vec3) -> Self {
        let store = ParameterStore::new();
        let material = MaterialBinder::new(store.material());
        let light = SpotLight::from_params(store.light());
        let helper = SpotLightHelper::new(&light);

        let mut graph = SceneGraph::new();
        graph.add_node(
            None,
            Node::new(
                "placeholder",
                Transform::IDENTITY,
                NodeKind::Mesh(MeshNode {
                    geometry: Arc::new(Geometry::plane(1.0, 1.0)),
                    material: MaterialRef::Shared(material.handle()),
                }),
            ),
        );

        let (tx, inbox) = mpsc::channel();
        Self {
            store,
            material,
            animation: AnimationController::new(),
            camera: CameraRig::new(orbit_target),
            graph,
            light,
            helper,
            clock: FrameClock::default(),
            viewport: (viewport.0.max(1), viewport.1.max(1)),
            inbox,
            outbox: MessageSender(tx),
            scene_state: LoadState::Pending,
            environment_state: LoadState::Pending,
            normal_map_state: LoadState::Pending,
        }
    }

    pub fn sender(&self) -> MessageSender {
        self.outbox.clone()
    }

    /// Starts the three background loads. Each completion arrives as a message.
    pub fn start_loading(
        &mut self,
        loader: &AssetLoader,
        scene: &Path,
        environment: &Path,
        normal_map: &Path,
    ) {
        let tx = self.sender();
        if let Err(err) = loader.load_scene(scene, move |result| {
            tx.send(ViewerMessage::SceneLoaded(result))
        }) {
            self.scene_state = LoadState::Failed(err.to_string());
        }
        let tx = self.sender();
        if let Err(err) = loader.load_environment(environment, move |result| {
            tx.send(ViewerMessage::EnvironmentLoaded(result))
        }) {
            self.environment_state = LoadState::Failed(err.to_string());
        }
        let tx = self.sender();
        if let Err(err) = loader.load_normal_map(normal_map, move |result| {
            tx.send(ViewerMessage::NormalMapLoaded(result))
        }) {
            self.normal_map_state = LoadState::Failed(err.to_string());
        }
    }

    /// One frame: drain messages, advance animation, refresh transforms and the light
    /// helper, apply orbit input, then render if a camera exists. `backend` is `None` when
    /// no output frame could be acquired; everything but the render still runs. Returns
    /// whether a frame was rendered.
    pub fn tick(
        &mut self,
        now: Instant,
        backend: Option<&mut dyn RenderBackend>,
    ) -> Result<bool, RenderError> {
        while let Ok(message) = self.inbox.try_recv() {
            self.handle(message);
        }

        let time = self.clock.advance(now);
        let animated = self.animation.tick(time.delta, &mut self.graph);
        self.graph.update_world_transforms();
        if animated {
            if let Some(node) = self.camera.followed_node() {
                if self.animation.animates(node) {
                    self.camera.place_at(self.graph.world_transform(node));
                }
            }
        }
        self.helper.update(&self.light);
        self.camera.tick_controls();

        let (Some(camera), Some(backend)) = (self.camera.active_camera(), backend) else {
            return Ok(false);
        };
        backend.render_frame(&Frame {
            graph: &self.graph,
            camera,
            material: &self.material,
            light: &self.light,
            helper: &self.helper,
        })?;
        Ok(true)
    }

    fn handle(&mut self, message: ViewerMessage) {
        match message {
            ViewerMessage::SceneLoaded(result) => self.on_scene_loaded(result),
            ViewerMessage::EnvironmentLoaded(result) => match result {
                Ok(texture) => {
                    log::info!("Environment ready ({}x{})", texture.width, texture.height);
                    self.material.attach_environment(Arc::new(texture));
                    self.environment_state = LoadState::Loaded;
                }
                Err(err) => {
                    log::warn!("Environment load failed: {}", err);
                    self.environment_state = LoadState::Failed(err.to_string());
                }
            },
            ViewerMessage::NormalMapLoaded(result) => match result {
                Ok(texture) => {
                    log::info!("Normal map ready ({}x{})", texture.width, texture.height);
                    self.material.populate_normal_map(Arc::new(texture));
                    self.normal_map_state = LoadState::Loaded;
                }
                Err(err) => {
                    log::warn!("Normal map load failed: {}", err);
                    self.normal_map_state = LoadState::Failed(err.to_string());
                }
            },
            ViewerMessage::Edit(id, value) => {
                if let Err(err) = self.binder().edit(id, value) {
                    log::warn!("Rejected edit: {}", err);
                }
            }
            ViewerMessage::ToggleAnimation => {
                self.binder().toggle_playback();
            }
            ViewerMessage::Resize { width, height } => {
                log::debug!("Viewport resized to {}x{}", width, height);
                self.viewport = (width.max(1), height.max(1));
                self.camera.on_resize(width, height);
            }
        }
    }

    fn on_scene_loaded(&mut self, result: Result<LoadedScene, AssetError>) {
        let loaded = match result {
            Ok(loaded) => loaded,
            Err(err) => {
                log::warn!("Scene load failed: {}", err);
                self.scene_state = LoadState::Failed(err.to_string());
                return;
            }
        };

        let LoadedScene {
            graph,
            camera,
            clips,
        } = loaded;
        let offset = self.graph.attach(graph);
        let rebound = self.material.rebind_scene(&mut self.graph);
        self.graph.update_world_transforms();

        match camera {
            Some(embedded) => {
                let world = self.graph.world_transform(embedded.node + offset);
                let camera = PerspectiveCamera::from_desc(&embedded.desc, world);
                self.camera.adopt(camera, self.store.camera(), self.viewport);
                self.camera.follow_node(embedded.node + offset);
            }
            None => log::warn!("Scene has no camera; nothing will be rendered"),
        }

        let clip_count = clips.len();
        self.animation
            .register(clips.into_iter().map(|clip| clip.retarget(offset)).collect());
        self.scene_state = LoadState::Loaded;
        log::info!(
            "Scene ready: {} nodes, {} mesh(es) bound to the shared material, {} clip(s)",
            self.graph.len(),
            rebound,
            clip_count
        );
    }

    fn binder(&mut self) -> ControlPanelBinder<'_> {
        ControlPanelBinder {
            store: &mut self.store,
            material: &mut self.material,
            camera: &mut self.camera,
            light: &mut self.light,
            animation: &mut self.animation,
        }
    }

    pub fn orbit_rotate(&mut self, delta_px: Vec2) {
        self.camera.orbit_rotate(delta_px);
    }

    pub fn orbit_pan(&mut self, delta_px: Vec2) {
        self.camera.orbit_pan(delta_px);
    }

    pub fn orbit_dolly(&mut self, steps: f32) {
        self.camera.orbit_dolly(steps);
    }

    pub fn store(&self) -> &ParameterStore {
        &self.store
    }

    pub fn material(&self) -> &MaterialBinder {
        &self.material
    }

    pub fn animation(&self) -> &AnimationController {
        &self.animation
    }

    pub fn camera_rig(&self) -> &CameraRig {
        &self.camera
    }

    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    pub fn scene_state(&self) -> &LoadState {
        &self.scene_state
    }

    pub fn environment_state(&self) -> &LoadState {
        &self.environment_state
    }

    pub fn normal_map_state(&self) -> &LoadState {
        &self.normal_map_state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::test_support::{sample_glb, write_temp};
    use crate::assets::Texels;
    use crate::params::{CameraParam, MaterialParam};
    use crate::render::headless::RecordingBackend;
    use std::time::Duration;

    fn viewer() -> Viewer {
        Viewer::new((1280, 720), Vec3::new(0.0, 0.75, 0.0))
    }

    fn sample_scene() -> LoadedScene {
        let path = write_temp("viewer.glb", sample_glb());
        let scene = crate::assets::import_scene(&path).unwrap();
        let _ = std::fs::remove_file(path);
        scene
    }

    fn tick(viewer: &mut Viewer, backend: &mut RecordingBackend, at: Instant) -> bool {
        viewer.tick(at, Some(backend)).unwrap()
    }

    #[test]
    fn no_camera_means_no_render_calls() {
        let mut viewer = viewer();
        let mut backend = RecordingBackend::default();
        let start = Instant::now();
        for frame in 0..5 {
            assert!(!tick(&mut viewer, &mut backend, start + Duration::from_millis(16 * frame)));
        }
        assert_eq!(backend.renders, 0);
        assert_eq!(viewer.scene_state(), &LoadState::Pending);
    }

    #[test]
    fn one_render_per_tick_once_a_camera_is_adopted() {
        let mut viewer = viewer();
        let mut backend = RecordingBackend::default();
        viewer.sender().send(ViewerMessage::SceneLoaded(Ok(sample_scene())));
        let start = Instant::now();
        for frame in 0..4u32 {
            assert!(tick(&mut viewer, &mut backend, start + Duration::from_millis(16 * frame as u64)));
            assert_eq!(backend.renders, frame as usize + 1);
        }
    }

    #[test]
    fn loaded_scene_is_bound_adopted_and_animatable() {
        let mut viewer = viewer();
        let mut backend = RecordingBackend::default();
        let sender = viewer.sender();
        sender.send(ViewerMessage::SceneLoaded(Ok(sample_scene())));
        let start = Instant::now();
        tick(&mut viewer, &mut backend, start);

        assert_eq!(viewer.scene_state(), &LoadState::Loaded);
        let handle = viewer.material().handle();
        let shared = viewer
            .graph()
            .mesh_nodes()
            .filter(|(_, mesh)| mesh.material == MaterialRef::Shared(handle))
            .count();
        // Three asset meshes plus the placeholder plane.
        assert_eq!(shared, 4);
        assert_eq!(backend.last_shared_meshes, backend.last_mesh_count);
        assert!(viewer.camera_rig().active_camera().is_some());

        assert_eq!(viewer.animation().state(), PlaybackState::Stopped);
        sender.send(ViewerMessage::ToggleAnimation);
        tick(&mut viewer, &mut backend, start + Duration::from_millis(16));
        assert_eq!(viewer.animation().state(), PlaybackState::Running);

        sender.send(ViewerMessage::Resize {
            width: 800,
            height: 600,
        });
        tick(&mut viewer, &mut backend, start + Duration::from_millis(32));
        let aspect = viewer.camera_rig().active_camera().map(|c| c.aspect);
        assert_eq!(aspect, Some(800.0 / 600.0));
        assert_eq!(backend.last_aspect, Some(800.0 / 600.0));
    }

    #[test]
    fn running_animation_moves_the_target_node() {
        let mut viewer = viewer();
        let mut backend = RecordingBackend::default();
        viewer.sender().send(ViewerMessage::SceneLoaded(Ok(sample_scene())));
        viewer.sender().send(ViewerMessage::ToggleAnimation);
        let start = Instant::now();
        tick(&mut viewer, &mut backend, start);
        tick(&mut viewer, &mut backend, start + Duration::from_millis(500));

        let part = viewer
            .graph()
            .traverse()
            .into_iter()
            .find(|id| viewer.graph().node(*id).map(|n| n.name.as_str()) == Some("part_a"))
            .unwrap();
        let x = viewer.graph().node(part).unwrap().transform.translation.x;
        assert!((x - 1.0).abs() < 1e-3, "x = {}", x);
    }

    #[test]
    fn animated_camera_node_carries_the_view() {
        let mut scene = sample_scene();
        let node = scene.camera.map(|camera| camera.node).unwrap();
        scene.clips.push(crate::scene::animation::AnimationClip::new(
            "dolly",
            vec![crate::scene::animation::Track {
                node,
                times: vec![0.0, 1.0],
                values: crate::scene::animation::TrackValues::Translation(vec![
                    Vec3::new(0.0, 1.0, 5.0),
                    Vec3::new(0.0, 1.0, 50.0),
                ]),
                interpolation: crate::scene::animation::Interpolation::Linear,
            }],
        ));

        let mut viewer = viewer();
        let mut backend = RecordingBackend::default();
        viewer.sender().send(ViewerMessage::SceneLoaded(Ok(scene)));
        let start = Instant::now();
        tick(&mut viewer, &mut backend, start);
        let before = viewer.camera_rig().active_camera().map(|c| c.position.z).unwrap();

        viewer.sender().send(ViewerMessage::ToggleAnimation);
        tick(&mut viewer, &mut backend, start + Duration::from_millis(16));
        tick(&mut viewer, &mut backend, start + Duration::from_millis(516));
        let after = viewer.camera_rig().active_camera().map(|c| c.position.z).unwrap();
        assert!(before < 10.0, "before = {}", before);
        assert!(after > 20.0, "after = {}", after);
    }

    #[test]
    fn frame_without_output_still_updates() {
        let mut viewer = viewer();
        let mut backend = RecordingBackend::default();
        viewer.sender().send(ViewerMessage::SceneLoaded(Ok(sample_scene())));
        viewer.sender().send(ViewerMessage::ToggleAnimation);
        let start = Instant::now();
        assert!(!viewer.tick(start, None).unwrap());
        assert_eq!(viewer.scene_state(), &LoadState::Loaded);
        assert_eq!(viewer.animation().state(), PlaybackState::Running);

        assert!(!viewer.tick(start + Duration::from_millis(500), None).unwrap());
        let time = viewer.animation().mixer().map(|m| m.actions()[0].time());
        assert_eq!(time, Some(0.5));

        assert!(tick(&mut viewer, &mut backend, start + Duration::from_millis(516)));
        assert_eq!(backend.renders, 1);
    }

    #[test]
    fn failed_load_is_reported_and_renders_nothing() {
        let mut viewer = viewer();
        let mut backend = RecordingBackend::default();
        viewer.sender().send(ViewerMessage::SceneLoaded(Err(AssetError::NoScene)));
        assert!(!tick(&mut viewer, &mut backend, Instant::now()));
        assert!(matches!(viewer.scene_state(), LoadState::Failed(_)));
        assert_eq!(backend.renders, 0);
    }

    #[test]
    fn edits_are_applied_on_the_next_tick() {
        let mut viewer = viewer();
        let mut backend = RecordingBackend::default();
        let sender = viewer.sender();
        sender.send(ViewerMessage::Edit(
            ParamId::Material(MaterialParam::Clearcoat),
            ParamValue::Scalar(0.9),
        ));
        sender.send(ViewerMessage::Edit(
            ParamId::Material(MaterialParam::Clearcoat),
            ParamValue::Scalar(9.0),
        ));
        assert_eq!(viewer.material().material().clearcoat, 0.237);
        tick(&mut viewer, &mut backend, Instant::now());
        assert_eq!(viewer.material().material().clearcoat, 0.9);
        assert_eq!(
            viewer.store().get(ParamId::Material(MaterialParam::Clearcoat)),
            ParamValue::Scalar(0.9)
        );
    }

    #[test]
    fn resize_before_adoption_leaves_camera_absent() {
        let mut viewer = viewer();
        let mut backend = RecordingBackend::default();
        viewer.sender().send(ViewerMessage::Resize {
            width: 640,
            height: 480,
        });
        viewer.sender().send(ViewerMessage::Edit(
            ParamId::Camera(CameraParam::Near),
            ParamValue::Scalar(0.5),
        ));
        tick(&mut viewer, &mut backend, Instant::now());
        assert!(viewer.camera_rig().active_camera().is_none());

        viewer.sender().send(ViewerMessage::SceneLoaded(Ok(sample_scene())));
        tick(&mut viewer, &mut backend, Instant::now());
        let camera = viewer.camera_rig().active_camera().unwrap();
        assert!((camera.aspect - 640.0 / 480.0).abs() < 1e-6);
        assert_eq!(camera.near, 0.5);
    }

    #[test]
    fn textures_attach_when_they_arrive() {
        let mut viewer = viewer();
        let mut backend = RecordingBackend::default();
        let texture = || Texture {
            width: 1,
            height: 1,
            texels: Texels::Rgba32F(vec![1.0, 1.0, 1.0, 1.0]),
        };
        viewer
            .sender()
            .send(ViewerMessage::EnvironmentLoaded(Ok(texture())));
        viewer.sender().send(ViewerMessage::NormalMapLoaded(Err(TextureError::Empty {
            path: "normal.png".into(),
        })));
        tick(&mut viewer, &mut backend, Instant::now());
        assert!(viewer.material().material().env_map.is_some());
        assert_eq!(viewer.environment_state(), &LoadState::Loaded);
        assert!(matches!(viewer.normal_map_state(), LoadState::Failed(_)));
        assert!(!viewer.material().material().normal_map.is_ready());
    }

    #[test]
    fn background_load_completes_through_the_inbox() {
        let path = write_temp("inbox.glb", sample_glb());
        let mut viewer = viewer();
        let mut backend = RecordingBackend::default();
        let missing = Path::new("/no/such/texture.hdr");
        viewer.start_loading(&AssetLoader::default(), &path, missing, missing);

        let start = Instant::now();
        let mut frame = 0u64;
        while viewer.scene_state() == &LoadState::Pending {
            assert!(frame < 1000, "scene load never completed");
            std::thread::sleep(Duration::from_millis(10));
            tick(&mut viewer, &mut backend, start + Duration::from_millis(10 * frame));
            frame += 1;
        }
        assert_eq!(viewer.scene_state(), &LoadState::Loaded);
        assert!(tick(&mut viewer, &mut backend, start + Duration::from_millis(10 * frame)));
        let _ = std::fs::remove_file(path);
    }
}
