//! The single physically-based material shared by every surface, and the binder that keeps it
//! in step with the parameter store.

use crate::assets::Texture;
use crate::params::{color_from_hex, MaterialParam, MaterialParams};
use crate::scene::{MaterialHandle, MaterialRef, SceneGraph};
use glam::Vec2;
use std::sync::Arc;

pub const SPECULAR_COLOR: u32 = 0xB011F3;

/// Texture slot that exists before its pixels do. The revision changes whenever the image
/// is (re)populated so GPU copies can tell when to re-upload.
#[derive(Debug, Clone, Default)]
pub struct LazyTexture {
    image: Option<Arc<Texture>>,
    revision: u64,
}

impl LazyTexture {
    pub fn populate(&mut self, image: Arc<Texture>) {
        self.image = Some(image);
        self.revision += 1;
    }

    pub fn image(&self) -> Option<&Arc<Texture>> {
        self.image.as_ref()
    }

    pub fn is_ready(&self) -> bool {
        self.image.is_some()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }
}

#[derive(Debug, Clone)]
pub struct PhysicalMaterial {
    pub transmission: f32,
    pub thickness: f32,
    pub roughness: f32,
    pub reflectivity: f32,
    pub clearcoat: f32,
    pub clearcoat_roughness: f32,
    pub metalness: f32,
    pub ior: f32,
    pub env_map_intensity: f32,
    pub normal_scale: Vec2,
    pub clearcoat_normal_scale: Vec2,
    /// UV multiplier for both normal maps.
    pub normal_repeat: Vec2,
    pub specular_color: [f32; 3],
    pub opacity: f32,
    pub depth_test: bool,
    /// Also used as the clearcoat normal map.
    pub normal_map: LazyTexture,
    pub env_map: Option<Arc<Texture>>,
    version: u64,
}

impl PhysicalMaterial {
    fn new() -> Self {
        Self {
            transmission: 0.0,
            thickness: 0.0,
            roughness: 1.0,
            reflectivity: 0.5,
            clearcoat: 0.0,
            clearcoat_roughness: 0.0,
            metalness: 0.0,
            ior: 1.5,
            env_map_intensity: 1.0,
            normal_scale: Vec2::ONE,
            clearcoat_normal_scale: Vec2::ONE,
            normal_repeat: Vec2::ONE,
            specular_color: color_from_hex(SPECULAR_COLOR),
            opacity: 1.0,
            depth_test: false,
            normal_map: LazyTexture::default(),
            env_map: None,
            version: 0,
        }
    }

    /// Marks the material dirty so the renderer refreshes its GPU copy.
    pub fn needs_update(&mut self) {
        self.version += 1;
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Current value of the field driven by `param`.
    pub fn value(&self, param: MaterialParam) -> f32 {
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
            MaterialParam::NormalScale => self.normal_scale.x,
            MaterialParam::ClearcoatNormalScale => self.clearcoat_normal_scale.x,
            MaterialParam::NormalRepeat => self.normal_repeat.x,
        }
    }
}

/// Owns the one material instance and the handle every mesh node references after a load.
#[derive(Debug)]
pub struct MaterialBinder {
    handle: MaterialHandle,
    material: PhysicalMaterial,
}

impl MaterialBinder {
    pub fn new(params: &MaterialParams) -> Self {
        let mut binder = Self {
            handle: MaterialHandle::allocate(),
            material: PhysicalMaterial::new(),
        };
        binder.apply_all(params);
        binder
    }

    pub fn handle(&self) -> MaterialHandle {
        self.handle
    }

    pub fn material(&self) -> &PhysicalMaterial {
        &self.material
    }

    pub fn apply_all(&mut self, params: &MaterialParams) {
        for param in MaterialParam::ALL {
            self.write(param, params);
        }
        self.material.needs_update();
    }

    pub fn apply_one(&mut self, param: MaterialParam, params: &MaterialParams) {
        self.write(param, params);
        self.material.needs_update();
    }

    fn write(&mut self, param: MaterialParam, params: &MaterialParams) {
        let value = params.get(param);
        let material = &mut self.material;
        match param {
            MaterialParam::Ior => material.ior = value,
            MaterialParam::Metalness => material.metalness = value,
            MaterialParam::Reflectivity => material.reflectivity = value,
            MaterialParam::Transmission => material.transmission = value,
            MaterialParam::Thickness => material.thickness = value,
            MaterialParam::Roughness => material.roughness = value,
            MaterialParam::EnvMapIntensity => material.env_map_intensity = value,
            MaterialParam::Clearcoat => material.clearcoat = value,
            MaterialParam::ClearcoatRoughness => material.clearcoat_roughness = value,
            // Vector fields are rebuilt from their scalar driver, never patched.
            MaterialParam::NormalScale => material.normal_scale = Vec2::splat(value),
            MaterialParam::ClearcoatNormalScale => {
                material.clearcoat_normal_scale = Vec2::splat(value)
            }
            MaterialParam::NormalRepeat => material.normal_repeat = Vec2::splat(value),
        }
    }

    /// Points every mesh node at the shared instance. Returns how many nodes were visited.
    pub fn rebind_scene(&self, graph: &mut SceneGraph) -> usize {
        let mut count = 0;
        graph.for_each_mesh_mut(|mesh| {
            mesh.material = MaterialRef::Shared(self.handle);
            count += 1;
        });
        count
    }

    pub fn attach_environment(&mut self, texture: Arc<Texture>) {
        self.material.env_map = Some(texture);
        self.material.needs_update();
    }

    pub fn populate_normal_map(&mut self, texture: Arc<Texture>) {
        self.material.normal_map.populate(texture);
        self.material.needs_update();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::Texels;
    use crate::params::ParameterStore;
    use crate::scene::{AuthoredMaterial, Geometry, MeshNode, Node, NodeKind, Transform};

    fn graph_with_meshes(count: usize) -> SceneGraph {
        let mut graph = SceneGraph::new();
        let root = graph.add_node(None, Node::new("root", Transform::IDENTITY, NodeKind::Empty));
        for i in 0..count {
            graph.add_node(
                Some(root),
                Node::new(
                    format!("mesh_{}", i),
                    Transform::IDENTITY,
                    NodeKind::Mesh(MeshNode {
                        geometry: Arc::new(Geometry::plane(1.0, 1.0)),
                        material: MaterialRef::Authored(AuthoredMaterial::default()),
                    }),
                ),
            );
        }
        graph
    }

    #[test]
    fn new_binder_mirrors_store_defaults() {
        let store = ParameterStore::new();
        let binder = MaterialBinder::new(store.material());
        for param in MaterialParam::ALL {
            assert_eq!(binder.material().value(param), store.material().get(param), "{:?}", param);
        }
        assert_eq!(binder.material().clearcoat_normal_scale, Vec2::splat(1.3));
        assert_eq!(binder.material().opacity, 1.0);
        assert!(!binder.material().depth_test);
        assert_eq!(binder.material().specular_color, color_from_hex(0xB011F3));
    }

    #[test]
    fn apply_one_touches_only_that_field_and_bumps_version() {
        let store = ParameterStore::new();
        let mut params = *store.material();
        let mut binder = MaterialBinder::new(&params);
        let before = binder.material().version();
        params.roughness = 0.25;
        params.metalness = 0.75;
        binder.apply_one(MaterialParam::Roughness, &params);
        assert_eq!(binder.material().roughness, 0.25);
        assert_eq!(binder.material().metalness, 0.0);
        assert!(binder.material().version() > before);
    }

    #[test]
    fn normal_scale_is_rebuilt_on_both_axes() {
        let mut params = *ParameterStore::new().material();
        let mut binder = MaterialBinder::new(&params);
        params.normal_scale = 4.0;
        binder.apply_one(MaterialParam::NormalScale, &params);
        assert_eq!(binder.material().normal_scale, Vec2::new(4.0, 4.0));
    }

    #[test]
    fn rebind_is_idempotent() {
        let binder = MaterialBinder::new(ParameterStore::new().material());
        let mut graph = graph_with_meshes(3);
        assert_eq!(binder.rebind_scene(&mut graph), 3);
        let first: Vec<MaterialRef> = graph.mesh_nodes().map(|(_, m)| m.material.clone()).collect();
        assert_eq!(binder.rebind_scene(&mut graph), 3);
        let second: Vec<MaterialRef> = graph.mesh_nodes().map(|(_, m)| m.material.clone()).collect();
        assert_eq!(first, second);
        assert!(second
            .iter()
            .all(|material| *material == MaterialRef::Shared(binder.handle())));
    }

    #[test]
    fn textures_attach_after_construction() {
        let mut binder = MaterialBinder::new(ParameterStore::new().material());
        assert!(!binder.material().normal_map.is_ready());
        assert!(binder.material().env_map.is_none());
        let texture = Arc::new(Texture {
            width: 1,
            height: 1,
            texels: Texels::Rgba8(vec![128, 128, 255, 255]),
        });
        binder.populate_normal_map(texture.clone());
        binder.attach_environment(texture);
        assert!(binder.material().normal_map.is_ready());
        assert_eq!(binder.material().normal_map.revision(), 1);
        assert!(binder.material().env_map.is_some());
    }
}
