//! Tunable viewer parameters.
//!
//! Every user-editable value lives in [`ParameterStore`]. Fields are addressed by the closed
//! [`ParamId`] enumeration rather than by name, and each id carries a static [`ParamSpec`]
//! describing its kind and valid range. Range checks happen at the edit boundary
//! ([`ParamSpec::check`]); the store itself trusts its callers.

use glam::Vec3;
use std::f32::consts::FRAC_PI_2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub fn label(self) -> &'static str {
        match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
        }
    }

    fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CameraParam {
    Fov,
    Near,
    Far,
    Position(Axis),
    Damping,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LightParam {
    Color,
    Intensity,
    Distance,
    Angle,
    Penumbra,
    Decay,
    Position(Axis),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaterialParam {
    Ior,
    Metalness,
    Reflectivity,
    Transmission,
    Thickness,
    Roughness,
    EnvMapIntensity,
    Clearcoat,
    ClearcoatRoughness,
    NormalScale,
    ClearcoatNormalScale,
    NormalRepeat,
}

impl MaterialParam {
    pub const ALL: [MaterialParam; 12] = [
        MaterialParam::Ior,
        MaterialParam::Metalness,
        MaterialParam::Reflectivity,
        MaterialParam::Transmission,
        MaterialParam::Thickness,
        MaterialParam::Roughness,
        MaterialParam::EnvMapIntensity,
        MaterialParam::Clearcoat,
        MaterialParam::ClearcoatRoughness,
        MaterialParam::NormalScale,
        MaterialParam::ClearcoatNormalScale,
        MaterialParam::NormalRepeat,
    ];
}

/// Identifier of one tunable field, grouped by the component that consumes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamId {
    Camera(CameraParam),
    Light(LightParam),
    Material(MaterialParam),
}

impl ParamId {
    pub const CAMERA: [ParamId; 7] = [
        ParamId::Camera(CameraParam::Fov),
        ParamId::Camera(CameraParam::Near),
        ParamId::Camera(CameraParam::Far),
        ParamId::Camera(CameraParam::Position(Axis::X)),
        ParamId::Camera(CameraParam::Position(Axis::Y)),
        ParamId::Camera(CameraParam::Position(Axis::Z)),
        ParamId::Camera(CameraParam::Damping),
    ];

    pub const LIGHT: [ParamId; 9] = [
        ParamId::Light(LightParam::Color),
        ParamId::Light(LightParam::Intensity),
        ParamId::Light(LightParam::Distance),
        ParamId::Light(LightParam::Angle),
        ParamId::Light(LightParam::Penumbra),
        ParamId::Light(LightParam::Decay),
        ParamId::Light(LightParam::Position(Axis::X)),
        ParamId::Light(LightParam::Position(Axis::Y)),
        ParamId::Light(LightParam::Position(Axis::Z)),
    ];

    pub fn all() -> impl Iterator<Item = ParamId> {
        Self::CAMERA
            .into_iter()
            .chain(Self::LIGHT)
            .chain(MaterialParam::ALL.into_iter().map(ParamId::Material))
    }

    pub fn spec(self) -> ParamSpec {
        match self {
            ParamId::Camera(param) => match param {
                CameraParam::Fov => ParamSpec::numeric("fov", 1.0, 120.0, 1.0),
                CameraParam::Near => ParamSpec::numeric("near", 0.01, 10.0, 0.01),
                CameraParam::Far => ParamSpec::numeric("far", 20.0, 1000.0, 1.0),
                CameraParam::Position(axis) => ParamSpec::numeric(axis.label(), -500.0, 500.0, 0.001),
                CameraParam::Damping => ParamSpec::boolean("enableDamping"),
            },
            ParamId::Light(param) => match param {
                LightParam::Color => ParamSpec::color("color"),
                LightParam::Intensity => ParamSpec::numeric("intensity", 0.0, 500.0, 0.001),
                LightParam::Distance => ParamSpec::numeric("distance", 0.0, 1000.0, 0.001),
                LightParam::Angle => ParamSpec::numeric("angle", 0.0, FRAC_PI_2, 0.001),
                LightParam::Penumbra => ParamSpec::numeric("penumbra", 0.0, 1.0, 0.001),
                LightParam::Decay => ParamSpec::numeric("decay", 0.0, 10.0, 0.001),
                LightParam::Position(axis) => ParamSpec::numeric(axis.label(), -300.0, 300.0, 0.001),
            },
            ParamId::Material(param) => match param {
                MaterialParam::Ior => ParamSpec::numeric("ior", 1.0, 2.333, 0.001),
                MaterialParam::Metalness => ParamSpec::numeric("metalness", 0.0, 1.0, 0.001),
                MaterialParam::Reflectivity => ParamSpec::numeric("reflectivity", 0.0, 1.0, 0.001),
                MaterialParam::Transmission => ParamSpec::numeric("transmission", 0.0, 1.0, 0.001),
                MaterialParam::Thickness => ParamSpec::numeric("thickness", 0.0, 5.0, 0.001),
                MaterialParam::Roughness => ParamSpec::numeric("roughness", 0.0, 1.0, 0.001),
                MaterialParam::EnvMapIntensity => {
                    ParamSpec::numeric("envMapIntensity", 0.0, 5.0, 0.001)
                }
                MaterialParam::Clearcoat => ParamSpec::numeric("clearcoat", 0.0, 1.0, 0.001),
                MaterialParam::ClearcoatRoughness => {
                    ParamSpec::numeric("clearcoatRoughness", 0.0, 1.0, 0.001)
                }
                MaterialParam::NormalScale => ParamSpec::numeric("normalScale", 0.0, 20.0, 0.001),
                MaterialParam::ClearcoatNormalScale => {
                    ParamSpec::numeric("clearcoatNormalScale", 0.0, 2.0, 0.001)
                }
                MaterialParam::NormalRepeat => ParamSpec::numeric("normalRepeat", 0.1, 10.0, 0.001),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamKind {
    Numeric { min: f32, max: f32, step: f32 },
    Color,
    Boolean,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSpec {
    pub label: &'static str,
    pub kind: ParamKind,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamValue {
    Scalar(f32),
    Color([f32; 3]),
    Toggle(bool),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EditError {
    #[error("{label} = {value} is outside [{min}, {max}]")]
    OutOfRange {
        label: &'static str,
        value: f32,
        min: f32,
        max: f32,
    },
    #[error("{label} expects a {expected} value")]
    WrongKind {
        label: &'static str,
        expected: &'static str,
    },
}

impl ParamSpec {
    const fn numeric(label: &'static str, min: f32, max: f32, step: f32) -> Self {
        Self {
            label,
            kind: ParamKind::Numeric { min, max, step },
        }
    }

    const fn color(label: &'static str) -> Self {
        Self {
            label,
            kind: ParamKind::Color,
        }
    }

    const fn boolean(label: &'static str) -> Self {
        Self {
            label,
            kind: ParamKind::Boolean,
        }
    }

    /// Rejects values that do not fit this field. Nothing is clamped.
    pub fn check(&self, value: ParamValue) -> Result<(), EditError> {
        match (self.kind, value) {
            (ParamKind::Numeric { min, max, .. }, ParamValue::Scalar(v)) => {
                if v.is_finite() && v >= min && v <= max {
                    Ok(())
                } else {
                    Err(EditError::OutOfRange {
                        label: self.label,
                        value: v,
                        min,
                        max,
                    })
                }
            }
            (ParamKind::Color, ParamValue::Color(rgb)) => {
                for channel in rgb {
                    if !(0.0..=1.0).contains(&channel) {
                        return Err(EditError::OutOfRange {
                            label: self.label,
                            value: channel,
                            min: 0.0,
                            max: 1.0,
                        });
                    }
                }
                Ok(())
            }
            (ParamKind::Boolean, ParamValue::Toggle(_)) => Ok(()),
            (kind, _) => Err(EditError::WrongKind {
                label: self.label,
                expected: match kind {
                    ParamKind::Numeric { .. } => "numeric",
                    ParamKind::Color => "color",
                    ParamKind::Boolean => "boolean",
                },
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraParams {
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    pub position: Vec3,
    pub damping: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightParams {
    pub color: [f32; 3],
    pub intensity: f32,
    pub distance: f32,
    pub angle: f32,
    pub penumbra: f32,
    pub decay: f32,
    pub position: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaterialParams {
    pub ior: f32,
    pub metalness: f32,
    pub reflectivity: f32,
    pub transmission: f32,
    pub thickness: f32,
    pub roughness: f32,
    pub env_map_intensity: f32,
    pub clearcoat: f32,
    pub clearcoat_roughness: f32,
    pub normal_scale: f32,
    pub clearcoat_normal_scale: f32,
    pub normal_repeat: f32,
}

impl MaterialParams {
    pub fn get(&self, param: MaterialParam) -> f32 {
        match param {
            MaterialParam::Ior => self.ior,
            MaterialParam::Metalness => self.metalness,
            MaterialParam::Reflectivity => self.reflectivity,
            MaterialParam::Transmission => self.transmission,
            MaterialParam::Thickness => self.thickness,
            MaterialParam::Roughness => self.roughness,
            MaterialParam::EnvMapIntensity => self.env_map_intensity,
            MaterialParam::Clearcoat => self.clearcoat,
            MaterialParam::ClearcoatRoughness => self.clearcoat_roughness,
            MaterialParam::NormalScale => self.normal_scale,
            MaterialParam::ClearcoatNormalScale => self.clearcoat_normal_scale,
            MaterialParam::NormalRepeat => self.normal_repeat,
        }
    }

    fn slot_mut(&mut self, param: MaterialParam) -> &mut f32 {
        match param {
            MaterialParam::Ior => &mut self.ior,
            MaterialParam::Metalness => &mut self.metalness,
            MaterialParam::Reflectivity => &mut self.reflectivity,
            MaterialParam::Transmission => &mut self.transmission,
            MaterialParam::Thickness => &mut self.thickness,
            MaterialParam::Roughness => &mut self.roughness,
            MaterialParam::EnvMapIntensity => &mut self.env_map_intensity,
            MaterialParam::Clearcoat => &mut self.clearcoat,
            MaterialParam::ClearcoatRoughness => &mut self.clearcoat_roughness,
            MaterialParam::NormalScale => &mut self.normal_scale,
            MaterialParam::ClearcoatNormalScale => &mut self.clearcoat_normal_scale,
            MaterialParam::NormalRepeat => &mut self.normal_repeat,
        }
    }
}

/// Authoritative values of every tunable. Created once with the built-in defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterStore {
    camera: CameraParams,
    light: LightParams,
    material: MaterialParams,
}

impl Default for ParameterStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ParameterStore {
    pub fn new() -> Self {
        Self {
            camera: CameraParams {
                fov: 75.0,
                near: 1.0,
                far: 1000.0,
                position: Vec3::splat(200.0),
                damping: true,
            },
            light: LightParams {
                color: color_from_hex(0x281533),
                intensity: 208.0,
                distance: 400.0,
                angle: 1.0,
                penumbra: 0.127,
                decay: 0.0,
                position: Vec3::new(0.0, 254.8, 0.0),
            },
            material: MaterialParams {
                ior: 1.5,
                metalness: 0.0,
                reflectivity: 0.427,
                transmission: 1.0,
                thickness: 0.0,
                roughness: 1.0,
                env_map_intensity: 0.863,
                clearcoat: 0.237,
                clearcoat_roughness: 0.507,
                normal_scale: 1.0,
                clearcoat_normal_scale: 1.3,
                normal_repeat: 1.0,
            },
        }
    }

    pub fn camera(&self) -> &CameraParams {
        &self.camera
    }

    pub fn light(&self) -> &LightParams {
        &self.light
    }

    pub fn material(&self) -> &MaterialParams {
        &self.material
    }

    pub fn get(&self, id: ParamId) -> ParamValue {
        match id {
            ParamId::Camera(param) => match param {
                CameraParam::Fov => ParamValue::Scalar(self.camera.fov),
                CameraParam::Near => ParamValue::Scalar(self.camera.near),
                CameraParam::Far => ParamValue::Scalar(self.camera.far),
                CameraParam::Position(axis) => {
                    ParamValue::Scalar(self.camera.position[axis.index()])
                }
                CameraParam::Damping => ParamValue::Toggle(self.camera.damping),
            },
            ParamId::Light(param) => match param {
                LightParam::Color => ParamValue::Color(self.light.color),
                LightParam::Intensity => ParamValue::Scalar(self.light.intensity),
                LightParam::Distance => ParamValue::Scalar(self.light.distance),
                LightParam::Angle => ParamValue::Scalar(self.light.angle),
                LightParam::Penumbra => ParamValue::Scalar(self.light.penumbra),
                LightParam::Decay => ParamValue::Scalar(self.light.decay),
                LightParam::Position(axis) => ParamValue::Scalar(self.light.position[axis.index()]),
            },
            ParamId::Material(param) => ParamValue::Scalar(self.material.get(param)),
        }
    }

    /// Stores `value` for `id`. The value is assumed to have passed [`ParamSpec::check`];
    /// a value of the wrong kind leaves the field untouched.
    pub fn set(&mut self, id: ParamId, value: ParamValue) {
        match (id, value) {
            (ParamId::Camera(param), ParamValue::Scalar(v)) => match param {
                CameraParam::Fov => self.camera.fov = v,
                CameraParam::Near => self.camera.near = v,
                CameraParam::Far => self.camera.far = v,
                CameraParam::Position(axis) => self.camera.position[axis.index()] = v,
                CameraParam::Damping => mismatched(id, value),
            },
            (ParamId::Camera(CameraParam::Damping), ParamValue::Toggle(on)) => {
                self.camera.damping = on
            }
            (ParamId::Light(LightParam::Color), ParamValue::Color(rgb)) => self.light.color = rgb,
            (ParamId::Light(param), ParamValue::Scalar(v)) => match param {
                LightParam::Intensity => self.light.intensity = v,
                LightParam::Distance => self.light.distance = v,
                LightParam::Angle => self.light.angle = v,
                LightParam::Penumbra => self.light.penumbra = v,
                LightParam::Decay => self.light.decay = v,
                LightParam::Position(axis) => self.light.position[axis.index()] = v,
                LightParam::Color => mismatched(id, value),
            },
            (ParamId::Material(param), ParamValue::Scalar(v)) => *self.material.slot_mut(param) = v,
            _ => mismatched(id, value),
        }
    }
}

fn mismatched(id: ParamId, value: ParamValue) {
    log::warn!("ignoring {:?} for {:?}: wrong value kind", value, id);
}

pub fn color_from_hex(hex: u32) -> [f32; 3] {
    [
        ((hex >> 16) & 0xFF) as f32 / 255.0,
        ((hex >> 8) & 0xFF) as f32 / 255.0,
        (hex & 0xFF) as f32 / 255.0,
    ]
}
