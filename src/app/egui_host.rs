use crate::render::gpu::UiPaint;
use winit::event::WindowEvent;
use winit::window::Window;

pub struct EguiFrame {
    pub paint: UiPaint,
    pub wants_pointer_input: bool,
    pub wants_keyboard_input: bool,
}

/// Owns the egui context and its winit integration.
pub struct EguiHost {
    context: egui::Context,
    winit_state: egui_winit::State,
}

impl EguiHost {
    pub fn new(window: &Window) -> Self {
        let context = egui::Context::default();
        let max_texture_side = None;
        let winit_state = egui_winit::State::new(
            context.clone(),
            egui::ViewportId::ROOT,
            window,
            Some(window.scale_factor() as f32),
            None,
            max_texture_side,
        );

        Self {
            context,
            winit_state,
        }
    }

    /// Returns true when egui consumed the event.
    pub fn on_window_event(&mut self, window: &Window, event: &WindowEvent) -> bool {
        self.winit_state.on_window_event(window, event).consumed
    }

    /// Runs one ui pass. `surface_ratio` is surface pixels per window pixel, applied when
    /// painting so the ui keeps window coordinates on a downscaled surface.
    pub fn run_ui<F>(&mut self, window: &Window, surface_ratio: f32, run_ui: F) -> EguiFrame
    where
        F: FnMut(&egui::Context),
    {
        let raw_input = self.winit_state.take_egui_input(window);
        let full_output = self.context.run(raw_input, run_ui);
        self.winit_state
            .handle_platform_output(window, full_output.platform_output);
        let pixels_per_point = full_output.pixels_per_point;
        let primitives = self.context.tessellate(full_output.shapes, pixels_per_point);

        EguiFrame {
            paint: UiPaint {
                primitives,
                textures_delta: full_output.textures_delta,
                pixels_per_point: pixels_per_point * surface_ratio,
            },
            wants_pointer_input: self.context.wants_pointer_input()
                || self.context.is_pointer_over_area(),
            wants_keyboard_input: self.context.wants_keyboard_input(),
        }
    }
}
