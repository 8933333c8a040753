use glam::Vec2;
use winit::event::{MouseButton, MouseScrollDelta};
use winit::keyboard::{KeyCode, PhysicalKey};

/// Pixel wheel deltas per dolly step.
const PIXELS_PER_STEP: f32 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OrbitGesture {
    Rotate(Vec2),
    Pan(Vec2),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    ToggleAnimation,
    Exit,
    None,
}

/// Turns raw pointer events into orbit gestures: left drag rotates, right drag pans.
#[derive(Default, Debug, Clone, Copy)]
pub struct PointerState {
    rotating: bool,
    panning: bool,
    last: Option<Vec2>,
}

impl PointerState {
    pub fn handle_button(&mut self, button: MouseButton, pressed: bool) {
        match button {
            MouseButton::Left => self.rotating = pressed,
            MouseButton::Right => self.panning = pressed,
            _ => {}
        }
    }

    pub fn handle_move(&mut self, position: Vec2) -> Option<OrbitGesture> {
        let delta = self.last.map(|last| position - last);
        self.last = Some(position);
        let delta = delta.filter(|d| *d != Vec2::ZERO)?;
        if self.rotating {
            Some(OrbitGesture::Rotate(delta))
        } else if self.panning {
            Some(OrbitGesture::Pan(delta))
        } else {
            None
        }
    }

    /// Cursor left the window or focus was lost; any drag in progress ends.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Dolly steps for one wheel event; positive moves toward the target.
pub fn wheel_steps(delta: MouseScrollDelta) -> f32 {
    match delta {
        MouseScrollDelta::LineDelta(_, y) => y,
        MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / PIXELS_PER_STEP,
    }
}

pub fn key_action(key: PhysicalKey, pressed: bool) -> KeyAction {
    if !pressed {
        return KeyAction::None;
    }
    match key {
        PhysicalKey::Code(KeyCode::Escape) => KeyAction::Exit,
        PhysicalKey::Code(KeyCode::Space) => KeyAction::ToggleAnimation,
        _ => KeyAction::None,
    }
}
