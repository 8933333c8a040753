mod egui_host;
mod input;
mod timing;

use crate::assets::AssetLoader;
use crate::config::ViewerConfig;
use crate::render::gpu::GpuRenderer;
use crate::render::RenderBackend;
use crate::ui::{ControlPanel, PanelState};
use crate::viewer::{Viewer, ViewerMessage};
use egui_host::EguiHost;
use input::{KeyAction, OrbitGesture, PointerState};
use timing::FrameTiming;

use glam::{Vec2, Vec3};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::{Duration, Instant};
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowAttributes, WindowId};

/// Upper bound on surface pixels per logical pixel.
const MAX_PIXEL_RATIO: f64 = 2.0;

/// Surface pixels per window pixel for a display with `scale_factor`.
fn surface_ratio(scale_factor: f64) -> f64 {
    if scale_factor <= MAX_PIXEL_RATIO {
        1.0
    } else {
        MAX_PIXEL_RATIO / scale_factor
    }
}

/// Render surface size for a window of `size` physical pixels.
fn surface_size(size: PhysicalSize<u32>, scale_factor: f64) -> (u32, u32) {
    let ratio = surface_ratio(scale_factor);
    let scale = |v: u32| ((v as f64 * ratio).round() as u32).max(1);
    (scale(size.width), scale(size.height))
}

struct Gpu {
    window: Arc<Window>,
    renderer: GpuRenderer,
    egui: EguiHost,
}

pub struct App {
    config: ViewerConfig,
    viewer: Viewer,
    panel: ControlPanel,
    pointer: PointerState,
    ui_wants_pointer: bool,
    ui_wants_keyboard: bool,
    gpu: Option<Gpu>,
    timing: FrameTiming,
    target_frame_duration: Duration,
    next_frame_time: Instant,
    failed: bool,
}

impl App {
    fn new(config: ViewerConfig) -> Self {
        let [width, height] = config.window_size;
        let mut viewer = Viewer::new((width, height), Vec3::from(config.orbit_target));
        viewer.start_loading(
            &AssetLoader::new(),
            &config.scene,
            &config.environment,
            &config.normal_map,
        );
        let now = Instant::now();
        Self {
            timing: FrameTiming::new(config.title.clone(), now),
            config,
            viewer,
            panel: ControlPanel::new(),
            pointer: PointerState::default(),
            ui_wants_pointer: false,
            ui_wants_keyboard: false,
            gpu: None,
            target_frame_duration: Duration::from_millis(16),
            next_frame_time: now,
            failed: false,
        }
    }

    fn init_gpu(&mut self, event_loop: &ActiveEventLoop) -> Result<Gpu, String> {
        let [width, height] = self.config.window_size;
        let window_attrs = WindowAttributes::default()
            .with_title(self.config.title.clone())
            .with_inner_size(PhysicalSize::new(width, height))
            .with_resizable(true);
        let window = Arc::new(
            event_loop
                .create_window(window_attrs)
                .map_err(|err| format!("failed to create window: {}", err))?,
        );
        let mut renderer = GpuRenderer::new(window.clone(), self.config.clear_color)
            .map_err(|err| format!("failed to initialise GPU: {}", err))?;
        let (w, h) = surface_size(window.inner_size(), window.scale_factor());
        renderer.resize(w, h);
        self.viewer.sender().send(ViewerMessage::Resize {
            width: w,
            height: h,
        });
        let egui = EguiHost::new(&window);
        log::info!("Window created ({}x{} surface)", w, h);
        Ok(Gpu {
            window,
            renderer,
            egui,
        })
    }

    fn handle_resize(&mut self, size: PhysicalSize<u32>, scale_factor: f64) {
        let Some(gpu) = &mut self.gpu else {
            return;
        };
        if size.width == 0 || size.height == 0 {
            return;
        }
        let (width, height) = surface_size(size, scale_factor);
        gpu.renderer.resize(width, height);
        self.viewer
            .sender()
            .send(ViewerMessage::Resize { width, height });
    }

    fn update_target_frame_duration(&mut self, window: &Window) {
        let mut target = Duration::from_millis(16);
        if let Some(monitor) = window.current_monitor() {
            if let Some(millihz) = monitor.refresh_rate_millihertz() {
                let hz = millihz as f32 / 1000.0;
                if hz > 1.0 {
                    target = Duration::from_secs_f32(1.0 / hz);
                }
            }
        }
        self.target_frame_duration = target;
        self.next_frame_time = Instant::now() + self.target_frame_duration;
    }

    fn redraw(&mut self) {
        let Some(gpu) = self.gpu.as_mut() else {
            return;
        };
        let frame_start = Instant::now();
        let backend: Option<&mut dyn RenderBackend> = match gpu.renderer.begin_frame() {
            Ok(()) => Some(&mut gpu.renderer),
            Err(err) => {
                log::warn!("Skipping render: {}", err);
                None
            }
        };
        if let Err(err) = self.viewer.tick(frame_start, backend) {
            log::warn!("Scene render failed: {}", err);
        }

        let state = PanelState {
            store: self.viewer.store(),
            playback: self.viewer.animation().state(),
            scene: self.viewer.scene_state(),
            environment: self.viewer.environment_state(),
            normal_map: self.viewer.normal_map_state(),
        };
        let ratio = surface_ratio(gpu.window.scale_factor()) as f32;
        let panel = &mut self.panel;
        let mut messages = Vec::new();
        let ui = gpu.egui.run_ui(&gpu.window, ratio, |ctx| {
            messages = panel.show(ctx, &state);
        });
        self.ui_wants_pointer = ui.wants_pointer_input;
        self.ui_wants_keyboard = ui.wants_keyboard_input;
        gpu.renderer.end_frame(Some(ui.paint));

        let sender = self.viewer.sender();
        for message in messages {
            sender.send(message);
        }

        self.timing
            .set_render_ms(frame_start.elapsed().as_secs_f32() * 1000.0);
        if let Some(title) = self.timing.update(frame_start) {
            gpu.window.set_title(&title);
        }
    }

    fn apply_gesture(&mut self, gesture: OrbitGesture) {
        let scale = self
            .gpu
            .as_ref()
            .map(|gpu| surface_ratio(gpu.window.scale_factor()) as f32)
            .unwrap_or(1.0);
        match gesture {
            OrbitGesture::Rotate(delta) => self.viewer.orbit_rotate(delta * scale),
            OrbitGesture::Pan(delta) => self.viewer.orbit_pan(delta * scale),
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.gpu.is_some() {
            return;
        }
        match self.init_gpu(event_loop) {
            Ok(gpu) => {
                let window = gpu.window.clone();
                self.gpu = Some(gpu);
                self.update_target_frame_duration(&window);
            }
            Err(err) => {
                log::error!("{}", err);
                self.failed = true;
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        if let Some(gpu) = &mut self.gpu {
            gpu.egui.on_window_event(&gpu.window, &event);
        }

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Focused(false) | WindowEvent::CursorLeft { .. } => {
                self.pointer.reset();
            }
            WindowEvent::KeyboardInput { event, .. } => {
                let pressed = event.state == ElementState::Pressed;
                match input::key_action(event.physical_key, pressed) {
                    KeyAction::Exit => event_loop.exit(),
                    KeyAction::ToggleAnimation if !self.ui_wants_keyboard && !event.repeat => {
                        self.viewer.sender().send(ViewerMessage::ToggleAnimation);
                    }
                    _ => {}
                }
            }
            WindowEvent::Resized(new_size) => {
                let scale_factor = self
                    .gpu
                    .as_ref()
                    .map(|gpu| gpu.window.scale_factor())
                    .unwrap_or(1.0);
                self.handle_resize(new_size, scale_factor);
                if let Some(window) = self.gpu.as_ref().map(|gpu| gpu.window.clone()) {
                    self.update_target_frame_duration(&window);
                }
            }
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                if let Some(size) = self.gpu.as_ref().map(|gpu| gpu.window.inner_size()) {
                    self.handle_resize(size, scale_factor);
                }
            }
            WindowEvent::Moved(_) => {
                if let Some(window) = self.gpu.as_ref().map(|gpu| gpu.window.clone()) {
                    self.update_target_frame_duration(&window);
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                let position = Vec2::new(position.x as f32, position.y as f32);
                if let Some(gesture) = self.pointer.handle_move(position) {
                    self.apply_gesture(gesture);
                }
            }
            WindowEvent::MouseInput { state, button, .. } => {
                let pressed = state == ElementState::Pressed;
                // Drags that start over the panel belong to the panel.
                if !(pressed && self.ui_wants_pointer) {
                    self.pointer.handle_button(button, pressed);
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                if !self.ui_wants_pointer {
                    self.viewer.orbit_dolly(input::wheel_steps(delta));
                }
            }
            WindowEvent::RedrawRequested => {
                self.redraw();
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let now = Instant::now();
        if now >= self.next_frame_time {
            if let Some(gpu) = &self.gpu {
                gpu.window.request_redraw();
            }
            self.next_frame_time = now + self.target_frame_duration;
        }
        event_loop.set_control_flow(ControlFlow::WaitUntil(self.next_frame_time));
    }
}

pub fn run() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let config = ViewerConfig::from_args(std::env::args());
    log::info!("Vitrine viewer");
    log::info!("   Scene: {}", config.scene.display());
    log::info!("   Left drag orbits, right drag pans, wheel zooms, Space toggles animation");

    let event_loop = match EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(err) => {
            log::error!("Failed to create event loop: {}", err);
            return ExitCode::FAILURE;
        }
    };
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut app = App::new(config);
    if let Err(err) = event_loop.run_app(&mut app) {
        log::error!("Event loop error: {}", err);
        return ExitCode::FAILURE;
    }
    if app.failed {
        return ExitCode::FAILURE;
    }

    log::info!("Goodbye");
    ExitCode::SUCCESS
}
