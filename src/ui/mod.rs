use crate::params::{ParamId, ParamKind, ParamValue, ParameterStore};
use crate::viewer::{Folder, LoadState, PlaybackState, ViewerMessage, PANEL};

/// Read-only view of the viewer state the panel displays.
pub struct PanelState<'a> {
    pub store: &'a ParameterStore,
    pub playback: PlaybackState,
    pub scene: &'a LoadState,
    pub environment: &'a LoadState,
    pub normal_map: &'a LoadState,
}

/// Control panel window. Widgets show the store's current values; every change is
/// returned as a message and never written directly.
#[derive(Debug, Default)]
pub struct ControlPanel {
    outbox: Vec<ViewerMessage>,
}

impl ControlPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn show(&mut self, ctx: &egui::Context, state: &PanelState<'_>) -> Vec<ViewerMessage> {
        egui::Window::new("controls")
            .default_width(280.0)
            .anchor(egui::Align2::RIGHT_TOP, [-8.0, 8.0])
            .show(ctx, |ui| {
                for folder in &PANEL {
                    self.folder(ui, folder, "", state.store);
                }
                ui.separator();
                let label = match state.playback {
                    PlaybackState::Stopped => "toggleAnimation (stopped)",
                    PlaybackState::Running => "toggleAnimation (running)",
                };
                if ui.button(label).clicked() {
                    self.outbox.push(ViewerMessage::ToggleAnimation);
                }
                ui.separator();
                status_line(ui, "scene", state.scene);
                status_line(ui, "environment", state.environment);
                status_line(ui, "normal map", state.normal_map);
            });
        std::mem::take(&mut self.outbox)
    }

    fn folder(&mut self, ui: &mut egui::Ui, folder: &Folder, parent: &str, store: &ParameterStore) {
        egui::CollapsingHeader::new(folder.name)
            .id_salt((parent, folder.name))
            .default_open(parent.is_empty())
            .show(ui, |ui| {
                for id in folder.params {
                    if let Some(value) = widget(ui, *id, store.get(*id)) {
                        self.outbox.push(ViewerMessage::Edit(*id, value));
                    }
                }
                for child in folder.children {
                    self.folder(ui, child, folder.name, store);
                }
            });
    }
}

/// Draws one field and returns its new value if the user changed it.
fn widget(ui: &mut egui::Ui, id: ParamId, current: ParamValue) -> Option<ParamValue> {
    let spec = id.spec();
    match (spec.kind, current) {
        (ParamKind::Numeric { min, max, step }, ParamValue::Scalar(stored)) => {
            let mut value = stored;
            let response = ui.add(
                egui::Slider::new(&mut value, min..=max)
                    .step_by(step as f64)
                    .text(spec.label),
            );
            (response.changed() && moved(stored, value, step))
                .then_some(ParamValue::Scalar(value))
        }
        (ParamKind::Color, ParamValue::Color(mut rgb)) => {
            let changed = ui
                .horizontal(|ui| {
                    let response = ui.color_edit_button_rgb(&mut rgb);
                    ui.label(spec.label);
                    response.changed()
                })
                .inner;
            changed.then_some(ParamValue::Color(rgb))
        }
        (ParamKind::Boolean, ParamValue::Toggle(mut on)) => {
            let response = ui.checkbox(&mut on, spec.label);
            response.changed().then_some(ParamValue::Toggle(on))
        }
        _ => None,
    }
}

/// True when a slider value differs from the stored one by more than step rounding.
fn moved(stored: f32, value: f32, step: f32) -> bool {
    (value - stored).abs() > step * 0.5
}

fn status_line(ui: &mut egui::Ui, what: &str, state: &LoadState) {
    match state {
        LoadState::Pending => ui.label(format!("{}: loading", what)),
        LoadState::Loaded => ui.label(format!("{}: ready", what)),
        LoadState::Failed(reason) => ui.colored_label(
            egui::Color32::LIGHT_RED,
            format!("{}: failed ({})", what, reason),
        ),
    };
}
