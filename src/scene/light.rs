use crate::params::{LightParam, LightParams};
use glam::{Quat, Vec3};

/// Cone light aimed from `position` at `target`.
#[derive(Debug, Clone, PartialEq)]
pub struct SpotLight {
    pub color: [f32; 3],
    pub intensity: f32,
    /// Range cutoff; 0 means unbounded.
    pub distance: f32,
    /// Half-angle of the cone in radians.
    pub angle: f32,
    pub penumbra: f32,
    pub decay: f32,
    pub position: Vec3,
    pub target: Vec3,
}

impl SpotLight {
    pub fn from_params(params: &LightParams) -> Self {
        Self {
            color: params.color,
            intensity: params.intensity,
            distance: params.distance,
            angle: params.angle,
            penumbra: params.penumbra,
            decay: params.decay,
            position: params.position,
            target: Vec3::ZERO,
        }
    }

    /// Copies one edited field from the store onto the light.
    pub fn apply(&mut self, param: LightParam, params: &LightParams) {
        match param {
            // Colors are replaced wholesale, never patched per channel.
            LightParam::Color => self.color = params.color,
            LightParam::Intensity => self.intensity = params.intensity,
            LightParam::Distance => self.distance = params.distance,
            LightParam::Angle => self.angle = params.angle,
            LightParam::Penumbra => self.penumbra = params.penumbra,
            LightParam::Decay => self.decay = params.decay,
            LightParam::Position(_) => self.position = params.position,
        }
    }

    pub fn direction(&self) -> Vec3 {
        (self.target - self.position)
            .try_normalize()
            .unwrap_or(Vec3::NEG_Y)
    }
}

const HELPER_RIM_SEGMENTS: usize = 32;
const HELPER_SPOKES: usize = 5;
const HELPER_UNBOUNDED_LENGTH: f32 = 1000.0;

/// Wireframe cone that mirrors a [`SpotLight`]. Rebuilt by [`SpotLightHelper::update`].
#[derive(Debug, Clone, Default)]
pub struct SpotLightHelper {
    segments: Vec<[Vec3; 2]>,
    color: [f32; 3],
}

impl SpotLightHelper {
    pub fn new(light: &SpotLight) -> Self {
        let mut helper = Self::default();
        helper.update(light);
        helper
    }

    pub fn update(&mut self, light: &SpotLight) {
        let length = if light.distance > 0.0 {
            light.distance
        } else {
            HELPER_UNBOUNDED_LENGTH
        };
        let radius = length * light.angle.clamp(0.0, 1.55).tan();
        let orientation = Quat::from_rotation_arc(Vec3::NEG_Z, light.direction());
        let rim_point = |t: f32| {
            let local = Vec3::new(radius * t.cos(), radius * t.sin(), -length);
            light.position + orientation * local
        };

        self.segments.clear();
        for spoke in 0..HELPER_SPOKES {
            let t = spoke as f32 / HELPER_SPOKES as f32 * std::f32::consts::TAU;
            self.segments.push([light.position, rim_point(t)]);
        }
        for i in 0..HELPER_RIM_SEGMENTS {
            let a = i as f32 / HELPER_RIM_SEGMENTS as f32 * std::f32::consts::TAU;
            let b = (i + 1) as f32 / HELPER_RIM_SEGMENTS as f32 * std::f32::consts::TAU;
            self.segments.push([rim_point(a), rim_point(b)]);
        }
        self.color = light.color;
    }

    pub fn segments(&self) -> &[[Vec3; 2]] {
        &self.segments
    }

    pub fn color(&self) -> [f32; 3] {
        self.color
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ParameterStore;

    #[test]
    fn apply_copies_only_the_edited_field() {
        let mut params = *ParameterStore::new().light();
        let mut light = SpotLight::from_params(&params);
        params.intensity = 3.0;
        params.decay = 2.0;
        light.apply(LightParam::Intensity, &params);
        assert_eq!(light.intensity, 3.0);
        assert_eq!(light.decay, 0.0);
    }

    #[test]
    fn helper_rim_sits_at_cone_radius() {
        let params = *ParameterStore::new().light();
        let mut light = SpotLight::from_params(&params);
        light.position = Vec3::new(0.0, 10.0, 0.0);
        light.distance = 10.0;
        light.angle = std::f32::consts::FRAC_PI_4;
        let helper = SpotLightHelper::new(&light);
        assert_eq!(helper.segments().len(), HELPER_SPOKES + HELPER_RIM_SEGMENTS);
        for [start, end] in &helper.segments()[HELPER_SPOKES..] {
            // Cone points straight down: the rim lies on the ground plane at radius 10.
            assert!(start.y.abs() < 1e-3);
            assert!((Vec3::new(start.x, 0.0, start.z).length() - 10.0).abs() < 1e-3);
            assert!(end.y.abs() < 1e-3);
        }
    }

    #[test]
    fn helper_follows_light_edits() {
        let params = *ParameterStore::new().light();
        let mut light = SpotLight::from_params(&params);
        let mut helper = SpotLightHelper::new(&light);
        light.position = Vec3::new(1.0, 5.0, 1.0);
        helper.update(&light);
        assert_eq!(helper.segments()[0][0], light.position);
    }
}
