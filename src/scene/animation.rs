//! Keyframe clips, their runtime actions, and the mixer that applies them to a scene graph.

use crate::scene::{NodeId, SceneGraph};
use glam::{Quat, Vec3, Vec4};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interpolation {
    Linear,
    Step,
    /// Values are stored as `[in_tangent, value, out_tangent]` per keyframe.
    CubicSpline,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TrackValues {
    Translation(Vec<Vec3>),
    Rotation(Vec<Quat>),
    Scale(Vec<Vec3>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub node: NodeId,
    pub times: Vec<f32>,
    pub values: TrackValues,
    pub interpolation: Interpolation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnimationClip {
    pub name: String,
    pub tracks: Vec<Track>,
    duration: f32,
}

impl AnimationClip {
    pub fn new(name: impl Into<String>, tracks: Vec<Track>) -> Self {
        let duration = tracks
            .iter()
            .filter_map(|track| track.times.last().copied())
            .fold(0.0f32, f32::max);
        Self {
            name: name.into(),
            tracks,
            duration,
        }
    }

    pub fn duration(&self) -> f32 {
        self.duration
    }

    /// Shifts every track target by `offset`, used when the clip's graph is attached to
    /// another graph.
    pub fn retarget(mut self, offset: NodeId) -> Self {
        for track in &mut self.tracks {
            track.node += offset;
        }
        self
    }

    pub fn apply(&self, time: f32, graph: &mut SceneGraph) {
        for track in &self.tracks {
            let Some(node) = graph.node_mut(track.node) else {
                continue;
            };
            match &track.values {
                TrackValues::Translation(values) => {
                    if let Some(v) = sample(&track.times, values, track.interpolation, time) {
                        node.transform.translation = v;
                    }
                }
                TrackValues::Rotation(values) => {
                    if let Some(q) = sample(&track.times, values, track.interpolation, time) {
                        node.transform.rotation = q.normalize();
                    }
                }
                TrackValues::Scale(values) => {
                    if let Some(v) = sample(&track.times, values, track.interpolation, time) {
                        node.transform.scale = v;
                    }
                }
            }
        }
    }
}

trait Keyframe: Copy {
    fn lerp_to(self, other: Self, t: f32) -> Self;
    fn hermite(p0: Self, m0: Self, p1: Self, m1: Self, t: f32, span: f32) -> Self;
}

impl Keyframe for Vec3 {
    fn lerp_to(self, other: Self, t: f32) -> Self {
        self.lerp(other, t)
    }

    fn hermite(p0: Self, m0: Self, p1: Self, m1: Self, t: f32, span: f32) -> Self {
        let (h00, h10, h01, h11) = hermite_basis(t);
        p0 * h00 + m0 * (h10 * span) + p1 * h01 + m1 * (h11 * span)
    }
}

impl Keyframe for Quat {
    fn lerp_to(self, other: Self, t: f32) -> Self {
        self.slerp(other, t)
    }

    fn hermite(p0: Self, m0: Self, p1: Self, m1: Self, t: f32, span: f32) -> Self {
        let (h00, h10, h01, h11) = hermite_basis(t);
        let v = Vec4::from(p0) * h00
            + Vec4::from(m0) * (h10 * span)
            + Vec4::from(p1) * h01
            + Vec4::from(m1) * (h11 * span);
        Quat::from_vec4(v).normalize()
    }
}

fn hermite_basis(t: f32) -> (f32, f32, f32, f32) {
    let t2 = t * t;
    let t3 = t2 * t;
    (
        2.0 * t3 - 3.0 * t2 + 1.0,
        t3 - 2.0 * t2 + t,
        -2.0 * t3 + 3.0 * t2,
        t3 - t2,
    )
}

fn sample<T: Keyframe>(
    times: &[f32],
    values: &[T],
    interpolation: Interpolation,
    time: f32,
) -> Option<T> {
    let stride = match interpolation {
        Interpolation::CubicSpline => 3,
        _ => 1,
    };
    let key_count = times.len().min(values.len() / stride);
    if key_count == 0 {
        return None;
    }
    let value_at = |k: usize| match interpolation {
        Interpolation::CubicSpline => values[k * 3 + 1],
        _ => values[k],
    };
    if key_count == 1 || time <= times[0] {
        return Some(value_at(0));
    }
    if time >= times[key_count - 1] {
        return Some(value_at(key_count - 1));
    }
    let next = times[..key_count].partition_point(|&t| t <= time);
    let k = next - 1;
    let span = times[next] - times[k];
    let t = if span > 0.0 {
        (time - times[k]) / span
    } else {
        0.0
    };
    Some(match interpolation {
        Interpolation::Step => value_at(k),
        Interpolation::Linear => value_at(k).lerp_to(value_at(next), t),
        Interpolation::CubicSpline => {
            let out_tangent = values[k * 3 + 2];
            let in_tangent = values[next * 3];
            T::hermite(value_at(k), out_tangent, value_at(next), in_tangent, t, span)
        }
    })
}

/// Runtime playback handle of one clip.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationAction {
    clip: usize,
    time: f32,
    playing: bool,
}

impl AnimationAction {
    /// Starts (or resumes) playback from the action's current time.
    pub fn play(&mut self) {
        self.playing = true;
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn time(&self) -> f32 {
        self.time
    }
}

/// Owns the clips of one loaded asset and one action per clip.
#[derive(Debug, Clone, Default)]
pub struct AnimationMixer {
    clips: Vec<AnimationClip>,
    actions: Vec<AnimationAction>,
}

impl AnimationMixer {
    pub fn new(clips: Vec<AnimationClip>) -> Self {
        let actions = (0..clips.len())
            .map(|clip| AnimationAction {
                clip,
                time: 0.0,
                playing: false,
            })
            .collect();
        Self { clips, actions }
    }

    pub fn actions(&self) -> &[AnimationAction] {
        &self.actions
    }

    pub fn actions_mut(&mut self) -> &mut [AnimationAction] {
        &mut self.actions
    }

    /// Whether any clip carries a track targeting `node`.
    pub fn animates(&self, node: NodeId) -> bool {
        self.clips
            .iter()
            .any(|clip| clip.tracks.iter().any(|track| track.node == node))
    }

    /// Advances every playing action by `delta` seconds, looping at the clip end, and writes
    /// the sampled transforms into `graph`.
    pub fn update(&mut self, delta: f32, graph: &mut SceneGraph) {
        for action in &mut self.actions {
            if !action.playing {
                continue;
            }
            let clip = &self.clips[action.clip];
            let duration = clip.duration();
            action.time += delta;
            if duration > 0.0 {
                action.time = action.time.rem_euclid(duration);
            } else {
                action.time = 0.0;
            }
            clip.apply(action.time, graph);
        }
    }
}
