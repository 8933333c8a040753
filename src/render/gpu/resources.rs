//! GPU-side layouts and uploads for the mesh, line and material data.

use crate::assets::{Texels, Texture};
use crate::render::material::PhysicalMaterial;
use crate::scene::light::SpotLight;
use crate::scene::Geometry;
use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use wgpu::util::DeviceExt;

pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
pub const ENV_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba32Float;
pub const NORMAL_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl MeshVertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 3] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x2];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<MeshVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct LineVertex {
    pub position: [f32; 3],
    pub color: [f32; 3],
}

impl LineVertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<LineVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct GlobalsUniform {
    view_proj: [[f32; 4]; 4],
    camera_pos: [f32; 4],
    light_pos: [f32; 4],
    light_dir: [f32; 4],
    light_color: [f32; 4],
    light_cone: [f32; 4],
}

impl GlobalsUniform {
    pub fn new(view_proj: Mat4, camera_pos: Vec3, light: &SpotLight, encode_srgb: bool) -> Self {
        let outer = light.angle.clamp(0.0, std::f32::consts::FRAC_PI_2);
        let inner = outer * (1.0 - light.penumbra.clamp(0.0, 1.0));
        Self {
            view_proj: view_proj.to_cols_array_2d(),
            camera_pos: camera_pos.extend(1.0).to_array(),
            light_pos: light.position.extend(light.distance).to_array(),
            light_dir: light.direction().extend(light.decay).to_array(),
            light_color: [light.color[0], light.color[1], light.color[2], light.intensity],
            light_cone: [
                outer.cos(),
                inner.cos(),
                if encode_srgb { 1.0 } else { 0.0 },
                0.0,
            ],
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct MaterialUniform {
    params0: [f32; 4],
    params1: [f32; 4],
    normal_scales: [f32; 4],
    params2: [f32; 4],
    specular: [f32; 4],
    flags: [f32; 4],
}

impl MaterialUniform {
    pub fn new(material: &PhysicalMaterial) -> Self {
        let flag = |on: bool| if on { 1.0 } else { 0.0 };
        Self {
            params0: [
                material.transmission,
                material.thickness,
                material.roughness,
                material.reflectivity,
            ],
            params1: [
                material.clearcoat,
                material.clearcoat_roughness,
                material.metalness,
                material.ior,
            ],
            normal_scales: [
                material.normal_scale.x,
                material.normal_scale.y,
                material.clearcoat_normal_scale.x,
                material.clearcoat_normal_scale.y,
            ],
            params2: [
                material.normal_repeat.x,
                material.normal_repeat.y,
                material.env_map_intensity,
                material.opacity,
            ],
            specular: [
                material.specular_color[0],
                material.specular_color[1],
                material.specular_color[2],
                flag(material.env_map.is_some()),
            ],
            flags: [flag(material.normal_map.is_ready()), 0.0, 0.0, 0.0],
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct NodeUniform {
    model: [[f32; 4]; 4],
    normal: [[f32; 4]; 4],
}

impl NodeUniform {
    pub fn new(model: Mat4) -> Self {
        Self {
            model: model.to_cols_array_2d(),
            normal: model.inverse().transpose().to_cols_array_2d(),
        }
    }
}

pub struct GpuMesh {
    pub vertices: wgpu::Buffer,
    pub indices: wgpu::Buffer,
    pub index_count: u32,
}

impl GpuMesh {
    pub fn upload(device: &wgpu::Device, geometry: &Geometry) -> Self {
        let vertices: Vec<MeshVertex> = geometry
            .positions
            .iter()
            .zip(&geometry.normals)
            .zip(&geometry.uvs)
            .map(|((position, normal), uv)| MeshVertex {
                position: *position,
                normal: *normal,
                uv: *uv,
            })
            .collect();
        let vertex_count = vertices.len() as u32;
        let indices: Vec<u32> = geometry
            .indices
            .iter()
            .copied()
            .filter(|index| *index < vertex_count)
            .collect();
        let indices = &indices[..indices.len() - indices.len() % 3];

        Self {
            vertices: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("mesh_vertices"),
                contents: non_empty(bytemuck::cast_slice(&vertices)),
                usage: wgpu::BufferUsages::VERTEX,
            }),
            indices: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("mesh_indices"),
                contents: non_empty(bytemuck::cast_slice(indices)),
                usage: wgpu::BufferUsages::INDEX,
            }),
            index_count: indices.len() as u32,
        }
    }
}

fn non_empty(bytes: &[u8]) -> &[u8] {
    const PAD: [u8; 4] = [0; 4];
    if bytes.is_empty() {
        &PAD
    } else {
        bytes
    }
}

/// Grow-only vertex buffer rewritten every frame.
pub struct StreamBuffer {
    buffer: wgpu::Buffer,
    capacity: u64,
    label: &'static str,
}

impl StreamBuffer {
    pub fn new(device: &wgpu::Device, label: &'static str, capacity: u64) -> Self {
        let capacity = capacity.max(64);
        Self {
            buffer: Self::allocate(device, label, capacity),
            capacity,
            label,
        }
    }

    fn allocate(device: &wgpu::Device, label: &'static str, size: u64) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    pub fn write(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, bytes: &[u8]) {
        let needed = bytes.len() as u64;
        if needed > self.capacity {
            self.capacity = needed.next_power_of_two();
            self.buffer = Self::allocate(device, self.label, self.capacity);
        }
        if needed > 0 {
            queue.write_buffer(&self.buffer, 0, bytes);
        }
    }

    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }
}

pub struct GpuTexture {
    _texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

impl GpuTexture {
    fn create(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        label: &str,
        format: wgpu::TextureFormat,
        width: u32,
        height: u32,
        bytes: &[u8],
    ) -> Self {
        let texture = device.create_texture_with_data(
            queue,
            &wgpu::TextureDescriptor {
                label: Some(label),
                size: wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            bytes,
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            _texture: texture,
            view,
        }
    }

    pub fn fallback_environment(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        let texel = [0.0f32, 0.0, 0.0, 1.0];
        Self::create(device, queue, "env_fallback", ENV_FORMAT, 1, 1, bytemuck::cast_slice(&texel))
    }

    pub fn fallback_normal(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        Self::create(device, queue, "normal_fallback", NORMAL_FORMAT, 1, 1, &[128, 128, 255, 255])
    }

    pub fn environment(device: &wgpu::Device, queue: &wgpu::Queue, image: &Texture) -> Self {
        let floats: Vec<f32>;
        let bytes: &[u8] = match &image.texels {
            Texels::Rgba32F(values) => bytemuck::cast_slice(values),
            Texels::Rgba8(values) => {
                floats = values.iter().map(|v| *v as f32 / 255.0).collect();
                bytemuck::cast_slice(&floats)
            }
        };
        Self::create(device, queue, "env_map", ENV_FORMAT, image.width, image.height, bytes)
    }

    pub fn normal(device: &wgpu::Device, queue: &wgpu::Queue, image: &Texture) -> Self {
        let bytes: Vec<u8>;
        let data: &[u8] = match &image.texels {
            Texels::Rgba8(values) => values,
            Texels::Rgba32F(values) => {
                bytes = values
                    .iter()
                    .map(|v| (v.clamp(0.0, 1.0) * 255.0).round() as u8)
                    .collect();
                &bytes
            }
        };
        Self::create(device, queue, "normal_map", NORMAL_FORMAT, image.width, image.height, data)
    }
}

pub struct DepthTarget {
    _texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

impl DepthTarget {
    pub fn new(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("depth"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            _texture: texture,
            view,
        }
    }
}

/// Per-node uniform buffer and its bind group. One slot per draw so every draw in a frame
/// sees its own transform.
pub struct NodeSlot {
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
}

impl NodeSlot {
    pub fn new(device: &wgpu::Device, layout: &wgpu::BindGroupLayout) -> Self {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("node_uniform"),
            size: std::mem::size_of::<NodeUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("node_bind_group"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });
        Self { buffer, bind_group }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ParameterStore;
    use crate::render::material::MaterialBinder;

    #[test]
    fn uniform_sizes_are_vec4_aligned() {
        assert_eq!(std::mem::size_of::<MeshVertex>(), 32);
        assert_eq!(std::mem::size_of::<LineVertex>(), 24);
        assert_eq!(std::mem::size_of::<GlobalsUniform>() % 16, 0);
        assert_eq!(std::mem::size_of::<MaterialUniform>(), 6 * 16);
        assert_eq!(std::mem::size_of::<NodeUniform>(), 128);
    }

    #[test]
    fn material_uniform_packs_fields() {
        let binder = MaterialBinder::new(ParameterStore::new().material());
        let uniform = MaterialUniform::new(binder.material());
        assert_eq!(uniform.params0[0], 1.0);
        assert_eq!(uniform.normal_scales[2], 1.3);
        assert_eq!(uniform.normal_scales[3], 1.3);
        assert_eq!(uniform.specular[3], 0.0);
        assert_eq!(uniform.flags[0], 0.0);
    }

    #[test]
    fn spot_cone_narrows_with_penumbra() {
        let light = SpotLight::from_params(ParameterStore::new().light());
        let globals = GlobalsUniform::new(Mat4::IDENTITY, Vec3::ZERO, &light, false);
        assert!(globals.light_cone[1] > globals.light_cone[0]);
        assert_eq!(globals.light_pos[3], 400.0);
    }
}
