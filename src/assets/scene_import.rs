//! glTF 2.0 decoding into a [`SceneGraph`], an optional embedded camera and animation clips.

use crate::assets::AssetError;
use crate::scene::animation::{AnimationClip, Interpolation, Track, TrackValues};
use crate::scene::{
    AuthoredMaterial, CameraDesc, Geometry, MaterialRef, MeshNode, Node, NodeId, NodeKind,
    SceneGraph, Transform,
};
use glam::{Quat, Vec3};
use gltf::animation::util::ReadOutputs;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

const DRACO_EXTENSION: &str = "KHR_draco_mesh_compression";

/// Camera found in the asset, with the graph node that carries its pose.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmbeddedCamera {
    pub node: NodeId,
    pub desc: CameraDesc,
}

#[derive(Debug, Clone)]
pub struct LoadedScene {
    pub graph: SceneGraph,
    pub camera: Option<EmbeddedCamera>,
    pub clips: Vec<AnimationClip>,
}

pub fn import_scene(path: &Path) -> Result<LoadedScene, AssetError> {
    let display = path.display().to_string();
    let bytes = std::fs::read(path).map_err(|source| AssetError::Read {
        path: display.clone(),
        source,
    })?;
    let header = gltf::Gltf::from_slice_without_validation(&bytes).map_err(|source| {
        AssetError::Gltf {
            path: display.clone(),
            source,
        }
    })?;
    if header
        .document
        .extensions_required()
        .any(|extension| extension == DRACO_EXTENSION)
    {
        return Err(AssetError::UnsupportedExtension {
            path: display,
            extension: DRACO_EXTENSION,
        });
    }

    let (document, buffers, _images) = gltf::import(path).map_err(|source| AssetError::Gltf {
        path: display.clone(),
        source,
    })?;
    let loaded = decode_document(&document, &buffers)?;
    log::info!(
        "Decoded '{}': {} nodes, {} clips, camera: {}",
        display,
        loaded.graph.len(),
        loaded.clips.len(),
        if loaded.camera.is_some() { "yes" } else { "no" }
    );
    Ok(loaded)
}

pub(crate) fn decode_document(
    document: &gltf::Document,
    buffers: &[gltf::buffer::Data],
) -> Result<LoadedScene, AssetError> {
    let scene = document
        .default_scene()
        .or_else(|| document.scenes().next())
        .ok_or(AssetError::NoScene)?;

    let mut decoder = NodeDecoder {
        buffers,
        graph: SceneGraph::new(),
        node_map: HashMap::new(),
        camera: None,
    };
    for root in scene.nodes() {
        decoder.visit(&root, None);
    }

    let clips = document
        .animations()
        .map(|animation| decode_animation(&animation, buffers, &decoder.node_map))
        .collect();
    decoder.graph.update_world_transforms();

    Ok(LoadedScene {
        graph: decoder.graph,
        camera: decoder.camera,
        clips,
    })
}

struct NodeDecoder<'b> {
    buffers: &'b [gltf::buffer::Data],
    graph: SceneGraph,
    node_map: HashMap<usize, NodeId>,
    camera: Option<EmbeddedCamera>,
}

impl NodeDecoder<'_> {
    fn visit(&mut self, node: &gltf::Node<'_>, parent: Option<NodeId>) {
        let (translation, rotation, scale) = node.transform().decomposed();
        let transform = Transform {
            translation: Vec3::from_array(translation),
            rotation: Quat::from_array(rotation).normalize(),
            scale: Vec3::from_array(scale),
        };
        let name = node
            .name()
            .map(str::to_owned)
            .unwrap_or_else(|| format!("node_{}", node.index()));

        let mut primitives = node
            .mesh()
            .map(|mesh| self.decode_mesh(&mesh))
            .unwrap_or_default();
        let kind = if primitives.len() == 1 {
            NodeKind::Mesh(primitives.remove(0))
        } else {
            NodeKind::Empty
        };
        let id = self.graph.add_node(parent, Node::new(name.clone(), transform, kind));
        self.node_map.insert(node.index(), id);

        for (index, primitive) in primitives.into_iter().enumerate() {
            self.graph.add_node(
                Some(id),
                Node::new(
                    format!("{}_{}", name, index),
                    Transform::IDENTITY,
                    NodeKind::Mesh(primitive),
                ),
            );
        }

        if let Some(camera) = node.camera() {
            self.adopt_camera(&camera, id);
        }

        for child in node.children() {
            self.visit(&child, Some(id));
        }
    }

    fn adopt_camera(&mut self, camera: &gltf::Camera<'_>, node_id: NodeId) {
        let desc = match camera.projection() {
            gltf::camera::Projection::Perspective(perspective) => CameraDesc {
                yfov_deg: perspective.yfov().to_degrees(),
                aspect: perspective.aspect_ratio(),
                znear: perspective.znear(),
                zfar: perspective.zfar(),
            },
            gltf::camera::Projection::Orthographic(_) => {
                log::warn!("Skipping orthographic camera {}", camera.index());
                return;
            }
        };
        let camera_node = match self.graph.node(node_id).map(|n| &n.kind) {
            Some(NodeKind::Empty) => {
                if let Some(node) = self.graph.node_mut(node_id) {
                    node.kind = NodeKind::Camera;
                }
                node_id
            }
            _ => self.graph.add_node(
                Some(node_id),
                Node::new("camera", Transform::IDENTITY, NodeKind::Camera),
            ),
        };
        // Only the first camera in document order becomes the embedded camera.
        if self.camera.is_none() {
            self.camera = Some(EmbeddedCamera {
                node: camera_node,
                desc,
            });
        }
    }

    fn decode_mesh(&self, mesh: &gltf::Mesh<'_>) -> Vec<MeshNode> {
        let buffers = self.buffers;
        let mut out = Vec::new();
        for primitive in mesh.primitives() {
            if primitive.mode() != gltf::mesh::Mode::Triangles {
                log::debug!(
                    "Skipping non-triangle primitive {:?} in mesh {}",
                    primitive.mode(),
                    mesh.index()
                );
                continue;
            }
            let reader =
                primitive.reader(|buffer| buffers.get(buffer.index()).map(|data| data.0.as_slice()));
            let Some(positions) = reader.read_positions() else {
                continue;
            };
            let positions: Vec<[f32; 3]> = positions.collect();
            let normals = reader.read_normals().map(|normals| normals.collect());
            let uvs = reader
                .read_tex_coords(0)
                .map(|coords| coords.into_f32().collect());
            let indices = reader
                .read_indices()
                .map(|indices| indices.into_u32().collect());

            let material = primitive.material();
            let pbr = material.pbr_metallic_roughness();
            out.push(MeshNode {
                geometry: Arc::new(Geometry::new(positions, normals, uvs, indices)),
                material: MaterialRef::Authored(AuthoredMaterial {
                    name: material.name().map(str::to_owned),
                    base_color: pbr.base_color_factor(),
                    metallic: pbr.metallic_factor(),
                    roughness: pbr.roughness_factor(),
                }),
            });
        }
        out
    }
}

fn decode_animation(
    animation: &gltf::Animation<'_>,
    buffers: &[gltf::buffer::Data],
    node_map: &HashMap<usize, NodeId>,
) -> AnimationClip {
    let mut tracks = Vec::new();
    for channel in animation.channels() {
        let Some(&node) = node_map.get(&channel.target().node().index()) else {
            continue;
        };
        let interpolation = match channel.sampler().interpolation() {
            gltf::animation::Interpolation::Linear => Interpolation::Linear,
            gltf::animation::Interpolation::Step => Interpolation::Step,
            gltf::animation::Interpolation::CubicSpline => Interpolation::CubicSpline,
        };
        let reader =
            channel.reader(|buffer| buffers.get(buffer.index()).map(|data| data.0.as_slice()));
        let Some(inputs) = reader.read_inputs() else {
            continue;
        };
        let times: Vec<f32> = inputs.collect();
        let values = match reader.read_outputs() {
            Some(ReadOutputs::Translations(values)) => {
                TrackValues::Translation(values.map(Vec3::from_array).collect())
            }
            Some(ReadOutputs::Rotations(values)) => {
                TrackValues::Rotation(values.into_f32().map(Quat::from_array).collect())
            }
            Some(ReadOutputs::Scales(values)) => {
                TrackValues::Scale(values.map(Vec3::from_array).collect())
            }
            Some(ReadOutputs::MorphTargetWeights(_)) | None => continue,
        };
        tracks.push(Track {
            node,
            times,
            values,
            interpolation,
        });
    }
    let name = animation
        .name()
        .map(str::to_owned)
        .unwrap_or_else(|| format!("clip_{}", animation.index()));
    AnimationClip::new(name, tracks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::test_support::{sample_glb, sample_glb_requiring, write_temp};

    fn decode_sample() -> LoadedScene {
        let (document, buffers, _) = gltf::import_slice(sample_glb()).unwrap();
        decode_document(&document, &buffers).unwrap()
    }

    #[test]
    fn sample_decodes_meshes_camera_and_clip() {
        let loaded = decode_sample();
        assert_eq!(loaded.graph.mesh_nodes().count(), 3);
        for (_, mesh) in loaded.graph.mesh_nodes() {
            assert!(matches!(mesh.material, MaterialRef::Authored(_)));
            assert_eq!(mesh.geometry.positions.len(), 3);
            assert_eq!(mesh.geometry.normals.len(), 3);
        }
        assert_eq!(loaded.clips.len(), 1);
        assert_eq!(loaded.clips[0].duration(), 1.0);

        let camera = loaded.camera.expect("embedded camera");
        assert!((camera.desc.yfov_deg - 0.8f32.to_degrees()).abs() < 1e-4);
        assert_eq!(camera.desc.zfar, Some(100.0));
        let world = loaded.graph.world_transform(camera.node);
        assert!((world.transform_point3(Vec3::ZERO) - Vec3::new(0.0, 1.0, 5.0)).length() < 1e-6);
    }

    #[test]
    fn clip_targets_decoded_node() {
        let loaded = decode_sample();
        let track = &loaded.clips[0].tracks[0];
        let node = loaded.graph.node(track.node).unwrap();
        assert_eq!(node.name, "part_a");
        assert!(matches!(track.values, TrackValues::Translation(ref v) if v.len() == 2));
    }

    #[test]
    fn import_scene_reads_from_disk() {
        let path = write_temp("sample.glb", sample_glb());
        let loaded = import_scene(&path).unwrap();
        assert_eq!(loaded.graph.mesh_nodes().count(), 3);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn draco_compressed_scene_is_rejected_before_decoding() {
        let path = write_temp("draco.glb", sample_glb_requiring(DRACO_EXTENSION));
        let err = import_scene(&path).unwrap_err();
        let _ = std::fs::remove_file(path);
        assert!(matches!(
            err,
            AssetError::UnsupportedExtension {
                extension: DRACO_EXTENSION,
                ..
            }
        ));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = import_scene(Path::new("no/such/scene.glb")).unwrap_err();
        assert!(matches!(err, AssetError::Read { .. }));
    }
}
