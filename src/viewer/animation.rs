use crate::scene::animation::{AnimationClip, AnimationMixer};
use crate::scene::{NodeId, SceneGraph};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Stopped,
    Running,
}

/// Two-state playback toggle over the mixer of the loaded asset.
///
/// Stopping performs no action on the clips themselves; it only gates [`tick`], so clips
/// hold their current time and resume from it on the next start.
///
/// [`tick`]: AnimationController::tick
#[derive(Debug, Default)]
pub struct AnimationController {
    state: PlaybackState,
    mixer: Option<AnimationMixer>,
}

impl AnimationController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn mixer(&self) -> Option<&AnimationMixer> {
        self.mixer.as_ref()
    }

    pub fn animates(&self, node: NodeId) -> bool {
        self.mixer.as_ref().is_some_and(|mixer| mixer.animates(node))
    }

    /// Installs the clips of a freshly loaded asset. Their actions start out not playing.
    pub fn register(&mut self, clips: Vec<AnimationClip>) {
        log::info!("Registered {} animation clip(s)", clips.len());
        self.mixer = Some(AnimationMixer::new(clips));
    }

    pub fn toggle(&mut self) -> PlaybackState {
        self.state = match self.state {
            PlaybackState::Stopped => {
                if let Some(mixer) = &mut self.mixer {
                    for action in mixer.actions_mut() {
                        action.play();
                    }
                }
                PlaybackState::Running
            }
            PlaybackState::Running => PlaybackState::Stopped,
        };
        log::info!("Animation playback {:?}", self.state);
        self.state
    }

    /// Advances every playing action by `delta` seconds. Returns whether anything advanced.
    pub fn tick(&mut self, delta: f32, graph: &mut SceneGraph) -> bool {
        if self.state != PlaybackState::Running {
            return false;
        }
        match &mut self.mixer {
            Some(mixer) => {
                mixer.update(delta, graph);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::animation::{Interpolation, Track, TrackValues};
    use crate::scene::{Node, NodeKind, Transform};
    use glam::Vec3;

    fn setup() -> (AnimationController, SceneGraph) {
        let mut graph = SceneGraph::new();
        graph.add_node(None, Node::new("n", Transform::IDENTITY, NodeKind::Empty));
        let clip = |name: &str| {
            AnimationClip::new(
                name,
                vec![Track {
                    node: 0,
                    times: vec![0.0, 10.0],
                    values: TrackValues::Translation(vec![Vec3::ZERO, Vec3::X * 10.0]),
                    interpolation: Interpolation::Linear,
                }],
            )
        };
        let mut controller = AnimationController::new();
        controller.register(vec![clip("a"), clip("b")]);
        (controller, graph)
    }

    fn all_playing(controller: &AnimationController) -> bool {
        controller
            .mixer()
            .map(|m| m.actions().iter().all(|a| a.is_playing()))
            .unwrap_or(false)
    }

    #[test]
    fn starts_stopped_and_does_not_advance() {
        let (mut controller, mut graph) = setup();
        assert_eq!(controller.state(), PlaybackState::Stopped);
        assert!(!controller.tick(1.0, &mut graph));
        assert!(!all_playing(&controller));
    }

    #[test]
    fn toggle_is_a_two_cycle() {
        let (mut controller, mut graph) = setup();
        assert_eq!(controller.toggle(), PlaybackState::Running);
        assert!(all_playing(&controller));
        controller.tick(2.0, &mut graph);

        assert_eq!(controller.toggle(), PlaybackState::Stopped);
        assert!(!controller.tick(3.0, &mut graph));
        let held = controller.mixer().map(|m| m.actions()[0].time());
        assert_eq!(held, Some(2.0));

        assert_eq!(controller.toggle(), PlaybackState::Running);
        assert!(all_playing(&controller));
        controller.tick(1.0, &mut graph);
        let resumed = controller.mixer().map(|m| m.actions()[0].time());
        assert_eq!(resumed, Some(3.0));
    }

    #[test]
    fn reports_which_nodes_are_animated() {
        let (controller, _) = setup();
        assert!(controller.animates(0));
        assert!(!controller.animates(1));
        assert!(!AnimationController::new().animates(0));
    }

    #[test]
    fn running_without_a_mixer_is_harmless() {
        let mut controller = AnimationController::new();
        let mut graph = SceneGraph::new();
        controller.toggle();
        assert!(!controller.tick(0.5, &mut graph));
        assert_eq!(controller.state(), PlaybackState::Running);
    }
}
