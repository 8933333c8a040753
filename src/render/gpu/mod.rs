mod resources;

use crate::assets::Texture;
use crate::render::{Frame, RenderBackend, RenderError};
use crate::scene::GeometryId;
use resources::{
    DepthTarget, GlobalsUniform, GpuMesh, GpuTexture, LineVertex, MaterialUniform, MeshVertex,
    NodeSlot, NodeUniform, StreamBuffer, DEPTH_FORMAT,
};
use std::collections::HashMap;
use std::sync::Arc;
use winit::window::Window;

/// egui output for one frame, painted over the scene by [`GpuRenderer::end_frame`].
pub struct UiPaint {
    pub primitives: Vec<egui::ClippedPrimitive>,
    pub textures_delta: egui::TexturesDelta,
    pub pixels_per_point: f32,
}

struct InFlightFrame {
    surface_texture: wgpu::SurfaceTexture,
    view: wgpu::TextureView,
    encoder: wgpu::CommandEncoder,
}

struct MaterialBindings {
    bind_group: wgpu::BindGroup,
    env: Option<Arc<Texture>>,
    normal_revision: u64,
    version: Option<u64>,
    _env_texture: GpuTexture,
    _normal_texture: GpuTexture,
}

/// wgpu implementation of [`RenderBackend`], plus the egui paint pass.
///
/// A frame is `begin_frame` (acquire + clear), zero or one `render_frame`, then `end_frame`
/// (ui, submit, present). The scene pass only runs when the viewer has a camera, the ui
/// pass always runs.
pub struct GpuRenderer {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    encode_srgb: bool,
    clear_color: wgpu::Color,
    depth: DepthTarget,
    globals_buffer: wgpu::Buffer,
    globals_bind_group: wgpu::BindGroup,
    material_layout: wgpu::BindGroupLayout,
    material_buffer: wgpu::Buffer,
    material: MaterialBindings,
    normal_sampler: wgpu::Sampler,
    node_layout: wgpu::BindGroupLayout,
    node_slots: Vec<NodeSlot>,
    depth_tested_pipeline: wgpu::RenderPipeline,
    overlay_pipeline: wgpu::RenderPipeline,
    line_pipeline: wgpu::RenderPipeline,
    lines: StreamBuffer,
    meshes: HashMap<GeometryId, GpuMesh>,
    egui_renderer: egui_wgpu::Renderer,
    in_flight: Option<InFlightFrame>,
}

impl GpuRenderer {
    pub fn new(window: Arc<Window>, clear_color: [f32; 3]) -> Result<Self, RenderError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let surface = instance.create_surface(window.clone())?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .ok_or(RenderError::AdapterUnavailable)?;
        let info = adapter.get_info();
        log::info!("GPU adapter: {} ({:?})", info.name, info.backend);

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("vitrine_device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default().using_resolution(adapter.limits()),
                memory_hints: wgpu::MemoryHints::Performance,
            },
            None,
        ))?;

        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|f| !f.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .ok_or(RenderError::SurfaceUnsupported)?;
        let present_mode = if caps.present_modes.contains(&wgpu::PresentMode::Fifo) {
            wgpu::PresentMode::Fifo
        } else {
            caps.present_modes
                .first()
                .copied()
                .unwrap_or(wgpu::PresentMode::Fifo)
        };
        let alpha_mode = caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);
        let size = window.inner_size();
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);
        let encode_srgb = !format.is_srgb();
        log::info!("Surface format {:?}, shader sRGB encode: {}", format, encode_srgb);

        let globals_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("globals_layout"),
            entries: &[uniform_entry(
                0,
                wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            )],
        });
        let material_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("material_layout"),
            entries: &[
                uniform_entry(0, wgpu::ShaderStages::FRAGMENT),
                texture_entry(1, false),
                texture_entry(2, true),
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });
        let node_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("node_layout"),
            entries: &[uniform_entry(0, wgpu::ShaderStages::VERTEX)],
        });

        let globals_buffer = uniform_buffer(&device, "globals", std::mem::size_of::<GlobalsUniform>());
        let globals_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("globals_bind_group"),
            layout: &globals_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: globals_buffer.as_entire_binding(),
            }],
        });
        let material_buffer =
            uniform_buffer(&device, "material", std::mem::size_of::<MaterialUniform>());
        let normal_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("normal_sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        let material = create_material_bindings(
            &device,
            &material_layout,
            &material_buffer,
            &normal_sampler,
            GpuTexture::fallback_environment(&device, &queue),
            GpuTexture::fallback_normal(&device, &queue),
            None,
            0,
        );

        let physical = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("physical_shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/physical.wgsl").into()),
        });
        let lines_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("lines_shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/lines.wgsl").into()),
        });
        let mesh_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("mesh_pipeline_layout"),
            bind_group_layouts: &[&globals_layout, &material_layout, &node_layout],
            push_constant_ranges: &[],
        });
        let line_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("line_pipeline_layout"),
            bind_group_layouts: &[&globals_layout],
            push_constant_ranges: &[],
        });

        let depth_tested_pipeline = mesh_pipeline(
            &device,
            &mesh_layout,
            &physical,
            format,
            wgpu::CompareFunction::Less,
            true,
        );
        let overlay_pipeline = mesh_pipeline(
            &device,
            &mesh_layout,
            &physical,
            format,
            wgpu::CompareFunction::Always,
            false,
        );
        let line_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("line_pipeline"),
            layout: Some(&line_layout),
            vertex: wgpu::VertexState {
                module: &lines_shader,
                entry_point: Some("vs_main"),
                buffers: &[LineVertex::layout()],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &lines_shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::LineList,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: false,
                depth_compare: wgpu::CompareFunction::LessEqual,
                stencil: Default::default(),
                bias: Default::default(),
            }),
            multisample: Default::default(),
            multiview: None,
            cache: None,
        });

        let depth = DepthTarget::new(&device, config.width, config.height);
        let lines = StreamBuffer::new(&device, "helper_lines", 4096);
        let egui_renderer = egui_wgpu::Renderer::new(&device, format, None, 1, false);

        Ok(Self {
            window,
            surface,
            device,
            queue,
            config,
            encode_srgb,
            clear_color: wgpu::Color {
                r: clear_color[0] as f64,
                g: clear_color[1] as f64,
                b: clear_color[2] as f64,
                a: 1.0,
            },
            depth,
            globals_buffer,
            globals_bind_group,
            material_layout,
            material_buffer,
            material,
            normal_sampler,
            node_layout,
            node_slots: Vec::new(),
            depth_tested_pipeline,
            overlay_pipeline,
            line_pipeline,
            lines,
            meshes: HashMap::new(),
            egui_renderer,
            in_flight: None,
        })
    }

    /// Acquires the next swap chain texture and clears it.
    pub fn begin_frame(&mut self) -> Result<(), RenderError> {
        // A frame left over from a failed tick is dropped unpresented.
        self.in_flight = None;
        let surface_texture = match self.surface.get_current_texture() {
            Ok(texture) => texture,
            Err(err @ (wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated)) => {
                self.surface.configure(&self.device, &self.config);
                return Err(err.into());
            }
            Err(err) => return Err(err.into()),
        };
        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame_encoder"),
            });
        {
            let _clear = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("clear_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                ..Default::default()
            });
        }
        self.in_flight = Some(InFlightFrame {
            surface_texture,
            view,
            encoder,
        });
        Ok(())
    }

    /// Paints the ui over whatever the frame holds, then submits and presents.
    pub fn end_frame(&mut self, ui: Option<UiPaint>) {
        let Some(mut frame) = self.in_flight.take() else {
            return;
        };
        let mut ui_commands = Vec::new();
        let mut freed = Vec::new();
        if let Some(ui) = ui {
            let screen = egui_wgpu::ScreenDescriptor {
                size_in_pixels: [self.config.width, self.config.height],
                pixels_per_point: ui.pixels_per_point,
            };
            for (id, delta) in &ui.textures_delta.set {
                self.egui_renderer
                    .update_texture(&self.device, &self.queue, *id, delta);
            }
            ui_commands = self.egui_renderer.update_buffers(
                &self.device,
                &self.queue,
                &mut frame.encoder,
                &ui.primitives,
                &screen,
            );
            {
                let mut pass = frame
                    .encoder
                    .begin_render_pass(&wgpu::RenderPassDescriptor {
                        label: Some("egui_pass"),
                        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                            view: &frame.view,
                            resolve_target: None,
                            ops: wgpu::Operations {
                                load: wgpu::LoadOp::Load,
                                store: wgpu::StoreOp::Store,
                            },
                        })],
                        ..Default::default()
                    })
                    .forget_lifetime();
                self.egui_renderer.render(&mut pass, &ui.primitives, &screen);
            }
            freed = ui.textures_delta.free;
        }

        ui_commands.push(frame.encoder.finish());
        self.queue.submit(ui_commands);
        self.window.pre_present_notify();
        frame.surface_texture.present();
        for id in &freed {
            self.egui_renderer.free_texture(id);
        }
    }

    fn sync_material(&mut self, frame: &Frame<'_>) {
        let material = frame.material.material();
        let env_changed = match (&self.material.env, &material.env_map) {
            (Some(current), Some(next)) => !Arc::ptr_eq(current, next),
            (None, None) => false,
            _ => true,
        };
        let normal_changed = self.material.normal_revision != material.normal_map.revision();

        if env_changed || normal_changed {
            let max_dim = self.device.limits().max_texture_dimension_2d;
            let env_texture = match &material.env_map {
                Some(image) if image.width <= max_dim && image.height <= max_dim => {
                    log::info!("Uploading environment {}x{}", image.width, image.height);
                    GpuTexture::environment(&self.device, &self.queue, image)
                }
                Some(image) => {
                    log::warn!(
                        "Environment {}x{} exceeds device limit {}; using fallback",
                        image.width,
                        image.height,
                        max_dim
                    );
                    GpuTexture::fallback_environment(&self.device, &self.queue)
                }
                None => GpuTexture::fallback_environment(&self.device, &self.queue),
            };
            let normal_texture = match material.normal_map.image() {
                Some(image) if image.width <= max_dim && image.height <= max_dim => {
                    GpuTexture::normal(&self.device, &self.queue, image)
                }
                _ => GpuTexture::fallback_normal(&self.device, &self.queue),
            };
            self.material = create_material_bindings(
                &self.device,
                &self.material_layout,
                &self.material_buffer,
                &self.normal_sampler,
                env_texture,
                normal_texture,
                material.env_map.clone(),
                material.normal_map.revision(),
            );
        }

        if self.material.version != Some(material.version()) {
            self.queue.write_buffer(
                &self.material_buffer,
                0,
                bytemuck::bytes_of(&MaterialUniform::new(material)),
            );
            self.material.version = Some(material.version());
        }
    }
}

impl RenderBackend for GpuRenderer {
    fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        if self.config.width == width && self.config.height == height {
            return;
        }
        log::debug!("Surface resized to {}x{}", width, height);
        self.in_flight = None;
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        self.depth = DepthTarget::new(&self.device, width, height);
    }

    fn render_frame(&mut self, frame: &Frame<'_>) -> Result<(), RenderError> {
        if self.in_flight.is_none() {
            return Err(RenderError::NoFrameInFlight);
        }

        let globals = GlobalsUniform::new(
            frame.camera.view_projection(),
            frame.camera.position,
            frame.light,
            self.encode_srgb,
        );
        self.queue
            .write_buffer(&self.globals_buffer, 0, bytemuck::bytes_of(&globals));
        self.sync_material(frame);

        let mut draws = Vec::new();
        for (node, mesh) in frame.graph.mesh_nodes() {
            let geometry = &mesh.geometry;
            self.meshes
                .entry(geometry.id())
                .or_insert_with(|| GpuMesh::upload(&self.device, geometry));
            draws.push((geometry.id(), frame.graph.world_transform(node)));
        }
        while self.node_slots.len() < draws.len() {
            self.node_slots
                .push(NodeSlot::new(&self.device, &self.node_layout));
        }
        for (slot, (_, model)) in self.node_slots.iter().zip(&draws) {
            self.queue
                .write_buffer(&slot.buffer, 0, bytemuck::bytes_of(&NodeUniform::new(*model)));
        }

        let color = frame.helper.color();
        let line_vertices: Vec<LineVertex> = frame
            .helper
            .segments()
            .iter()
            .flat_map(|segment| {
                segment.iter().map(move |point| LineVertex {
                    position: point.to_array(),
                    color,
                })
            })
            .collect();
        self.lines
            .write(&self.device, &self.queue, bytemuck::cast_slice(&line_vertices));

        let pipeline = if frame.material.material().depth_test {
            &self.depth_tested_pipeline
        } else {
            &self.overlay_pipeline
        };
        let Some(in_flight) = self.in_flight.as_mut() else {
            return Err(RenderError::NoFrameInFlight);
        };
        let mut pass = in_flight
            .encoder
            .begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("scene_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &in_flight.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });

        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, &self.globals_bind_group, &[]);
        pass.set_bind_group(1, &self.material.bind_group, &[]);
        for (slot, (geometry, _)) in self.node_slots.iter().zip(&draws) {
            let Some(mesh) = self.meshes.get(geometry) else {
                continue;
            };
            if mesh.index_count == 0 {
                continue;
            }
            pass.set_bind_group(2, &slot.bind_group, &[]);
            pass.set_vertex_buffer(0, mesh.vertices.slice(..));
            pass.set_index_buffer(mesh.indices.slice(..), wgpu::IndexFormat::Uint32);
            pass.draw_indexed(0..mesh.index_count, 0, 0..1);
        }

        if !line_vertices.is_empty() {
            pass.set_pipeline(&self.line_pipeline);
            pass.set_bind_group(0, &self.globals_bind_group, &[]);
            pass.set_vertex_buffer(0, self.lines.buffer().slice(..));
            pass.draw(0..line_vertices.len() as u32, 0..1);
        }
        Ok(())
    }
}

fn uniform_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn texture_entry(binding: u32, filterable: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

fn uniform_buffer(device: &wgpu::Device, label: &str, size: usize) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size: size as u64,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

#[allow(clippy::too_many_arguments)]
fn create_material_bindings(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    uniform: &wgpu::Buffer,
    sampler: &wgpu::Sampler,
    env_texture: GpuTexture,
    normal_texture: GpuTexture,
    env: Option<Arc<Texture>>,
    normal_revision: u64,
) -> MaterialBindings {
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("material_bind_group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(&env_texture.view),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::TextureView(&normal_texture.view),
            },
            wgpu::BindGroupEntry {
                binding: 3,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    });
    MaterialBindings {
        bind_group,
        env,
        normal_revision,
        // Forces the uniform upload on the next frame.
        version: None,
        _env_texture: env_texture,
        _normal_texture: normal_texture,
    }
}

fn mesh_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    format: wgpu::TextureFormat,
    depth_compare: wgpu::CompareFunction,
    depth_write_enabled: bool,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("mesh_pipeline"),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            buffers: &[MeshVertex::layout()],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            cull_mode: None,
            ..Default::default()
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled,
            depth_compare,
            stencil: Default::default(),
            bias: Default::default(),
        }),
        multisample: Default::default(),
        multiview: None,
        cache: None,
    })
}
