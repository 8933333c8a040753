use crate::params::{
    Axis, CameraParam, EditError, LightParam, MaterialParam, ParamId, ParamValue, ParameterStore,
};
use crate::render::material::MaterialBinder;
use crate::scene::light::SpotLight;
use crate::viewer::animation::{AnimationController, PlaybackState};
use crate::viewer::camera_rig::CameraRig;

/// Group of controls shown together in the panel.
#[derive(Debug)]
pub struct Folder {
    pub name: &'static str,
    pub params: &'static [ParamId],
    pub children: &'static [Folder],
}

const fn camera_axis(axis: Axis) -> ParamId {
    ParamId::Camera(CameraParam::Position(axis))
}

const fn light_axis(axis: Axis) -> ParamId {
    ParamId::Light(LightParam::Position(axis))
}

const fn material(param: MaterialParam) -> ParamId {
    ParamId::Material(param)
}

/// Control panel layout. Every field of the store appears exactly once.
pub const PANEL: [Folder; 3] = [
    Folder {
        name: "camera",
        params: &[
            ParamId::Camera(CameraParam::Fov),
            ParamId::Camera(CameraParam::Near),
            ParamId::Camera(CameraParam::Far),
            ParamId::Camera(CameraParam::Damping),
        ],
        children: &[Folder {
            name: "position",
            params: &[camera_axis(Axis::X), camera_axis(Axis::Y), camera_axis(Axis::Z)],
            children: &[],
        }],
    },
    Folder {
        name: "spotLight",
        params: &[
            ParamId::Light(LightParam::Color),
            ParamId::Light(LightParam::Intensity),
            ParamId::Light(LightParam::Distance),
            ParamId::Light(LightParam::Angle),
            ParamId::Light(LightParam::Penumbra),
            ParamId::Light(LightParam::Decay),
        ],
        children: &[Folder {
            name: "position",
            params: &[light_axis(Axis::X), light_axis(Axis::Y), light_axis(Axis::Z)],
            children: &[],
        }],
    },
    Folder {
        name: "material",
        params: &[
            material(MaterialParam::Transmission),
            material(MaterialParam::Thickness),
            material(MaterialParam::Roughness),
            material(MaterialParam::Reflectivity),
            material(MaterialParam::Clearcoat),
            material(MaterialParam::ClearcoatRoughness),
            material(MaterialParam::NormalScale),
            material(MaterialParam::ClearcoatNormalScale),
            material(MaterialParam::NormalRepeat),
            material(MaterialParam::Metalness),
            material(MaterialParam::Ior),
            material(MaterialParam::EnvMapIntensity),
        ],
        children: &[],
    },
];

/// The one place edits are interpreted: writes through to the store, then updates the
/// narrowest affected target.
pub struct ControlPanelBinder<'a> {
    pub store: &'a mut ParameterStore,
    pub material: &'a mut MaterialBinder,
    pub camera: &'a mut CameraRig,
    pub light: &'a mut SpotLight,
    pub animation: &'a mut AnimationController,
}

impl ControlPanelBinder<'_> {
    pub fn edit(&mut self, id: ParamId, value: ParamValue) -> Result<(), EditError> {
        id.spec().check(value)?;
        self.store.set(id, value);
        match id {
            ParamId::Material(param) => self.material.apply_one(param, self.store.material()),
            ParamId::Camera(param) => {
                self.camera.on_parameter_change(param, self.store.camera());
            }
            ParamId::Light(param) => self.light.apply(param, self.store.light()),
        }
        log::debug!("{:?} <- {:?}", id, value);
        Ok(())
    }

    pub fn toggle_playback(&mut self) -> PlaybackState {
        self.animation.toggle()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ParamKind;
    use crate::scene::camera::PerspectiveCamera;
    use glam::Vec3;
    use std::collections::HashSet;

    struct Targets {
        store: ParameterStore,
        material: MaterialBinder,
        camera: CameraRig,
        light: SpotLight,
        animation: AnimationController,
    }

    impl Targets {
        fn new() -> Self {
            let store = ParameterStore::new();
            Self {
                material: MaterialBinder::new(store.material()),
                light: SpotLight::from_params(store.light()),
                camera: CameraRig::new(Vec3::new(0.0, 0.75, 0.0)),
                animation: AnimationController::new(),
                store,
            }
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
    }

    fn collect(folders: &[Folder], out: &mut Vec<ParamId>) {
        for folder in folders {
            out.extend_from_slice(folder.params);
            collect(folder.children, out);
        }
    }

    #[test]
    fn panel_lists_every_field_once() {
        let mut listed = Vec::new();
        collect(&PANEL, &mut listed);
        let unique: HashSet<ParamId> = listed.iter().copied().collect();
        assert_eq!(unique.len(), listed.len());
        assert_eq!(unique, ParamId::all().collect());
    }

    #[test]
    fn material_edits_reach_store_and_material() {
        let mut targets = Targets::new();
        for param in MaterialParam::ALL {
            let ParamKind::Numeric { min, max, .. } = ParamId::Material(param).spec().kind else {
                panic!("material fields are numeric");
            };
            for value in [min, (min + max) * 0.5, max] {
                targets
                    .binder()
                    .edit(ParamId::Material(param), ParamValue::Scalar(value))
                    .unwrap();
                assert_eq!(targets.material.material().value(param), value);
                assert_eq!(
                    targets.store.get(ParamId::Material(param)),
                    ParamValue::Scalar(value)
                );
            }
        }
    }

    #[test]
    fn rejected_edit_changes_nothing() {
        let mut targets = Targets::new();
        let id = ParamId::Material(MaterialParam::Roughness);
        let err = targets.binder().edit(id, ParamValue::Scalar(1.5)).unwrap_err();
        assert!(matches!(err, EditError::OutOfRange { .. }));
        assert_eq!(targets.store.get(id), ParamValue::Scalar(1.0));
        assert_eq!(targets.material.material().roughness, 1.0);

        let err = targets
            .binder()
            .edit(id, ParamValue::Toggle(true))
            .unwrap_err();
        assert!(matches!(err, EditError::WrongKind { .. }));
    }

    #[test]
    fn light_edits_replace_the_color() {
        let mut targets = Targets::new();
        targets
            .binder()
            .edit(ParamId::Light(LightParam::Color), ParamValue::Color([1.0, 0.5, 0.0]))
            .unwrap();
        assert_eq!(targets.light.color, [1.0, 0.5, 0.0]);
        targets
            .binder()
            .edit(light_axis(Axis::X), ParamValue::Scalar(-12.0))
            .unwrap();
        assert_eq!(targets.light.position.x, -12.0);
    }

    #[test]
    fn camera_edits_before_adoption_only_update_the_store() {
        let mut targets = Targets::new();
        let id = ParamId::Camera(CameraParam::Fov);
        targets.binder().edit(id, ParamValue::Scalar(40.0)).unwrap();
        assert_eq!(targets.store.get(id), ParamValue::Scalar(40.0));
        assert!(targets.camera.active_camera().is_none());

        let camera = PerspectiveCamera::new(60.0, 1.0, 0.1, 100.0);
        targets
            .camera
            .adopt(camera, targets.store.camera(), (100, 100));
        targets.binder().edit(id, ParamValue::Scalar(20.0)).unwrap();
        assert_eq!(targets.camera.active_camera().map(|c| c.fov), Some(20.0));
    }

    #[test]
    fn playback_toggle_goes_through_the_binder() {
        let mut targets = Targets::new();
        assert_eq!(targets.binder().toggle_playback(), PlaybackState::Running);
        assert_eq!(targets.binder().toggle_playback(), PlaybackState::Stopped);
    }
}
