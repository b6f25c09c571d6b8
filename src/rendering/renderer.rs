use super::meshes;
use super::shaders::{ShaderManager, MESH_SHADER, SPRITE_SHADER};
use super::{
    DrawCommand, FrameView, Geometry, Globals, GraphicsBackend, Material, RenderError,
    RenderResult, ResourceId, Side, Vertex,
};
use glam::{Mat4, Vec2};
use std::collections::HashMap;
use std::sync::Arc;
use wgpu::util::DeviceExt;
use winit::window::Window;

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Per-resource uniform block, mirrors `Object` in the shaders.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct ObjectUniform {
    model: [[f32; 4]; 4],
    color: [f32; 4],
    emissive: [f32; 4],
    params: [f32; 4],
}

impl ObjectUniform {
    fn new(model: Mat4, material: &Material, sprite_scale: Vec2) -> Self {
        let emissive = match material.emissive {
            Some(e) => e.color.rgba(e.intensity),
            None => [0.0; 4],
        };
        Self {
            model: model.to_cols_array_2d(),
            color: material.color.rgba(material.opacity),
            emissive,
            params: [
                if material.lit { 1.0 } else { 0.0 },
                sprite_scale.x,
                sprite_scale.y,
                0.0,
            ],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum PipelineKind {
    Mesh(Side),
    Lines,
    Points,
    Label,
}

struct GpuLabel {
    texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
}

struct GpuResource {
    pipeline: PipelineKind,
    vertex_buffer: wgpu::Buffer,
    vertex_count: u32,
    index_buffer: Option<(wgpu::Buffer, u32)>,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    label: Option<GpuLabel>,
    material: Material,
    sprite_scale: Vec2,
}

impl GpuResource {
    fn destroy(self) {
        self.vertex_buffer.destroy();
        if let Some((buffer, _)) = self.index_buffer {
            buffer.destroy();
        }
        self.uniform_buffer.destroy();
        if let Some(label) = self.label {
            label.texture.destroy();
        }
    }
}

/// Window-backed wgpu implementation of [`GraphicsBackend`].
pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
    depth_view: wgpu::TextureView,
    globals_buffer: wgpu::Buffer,
    globals_bind_group: wgpu::BindGroup,
    object_layout: wgpu::BindGroupLayout,
    label_layout: wgpu::BindGroupLayout,
    label_sampler: wgpu::Sampler,
    pipelines: HashMap<PipelineKind, wgpu::RenderPipeline>,
    resources: HashMap<ResourceId, GpuResource>,
    next_id: u64,
}

fn uniform_layout_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn create_depth_view(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("depth_texture"),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

fn create_pipeline(
    device: &wgpu::Device,
    format: wgpu::TextureFormat,
    layout: &wgpu::PipelineLayout,
    module: &wgpu::ShaderModule,
    kind: PipelineKind,
) -> wgpu::RenderPipeline {
    use wgpu::PrimitiveTopology as Topo;
    // Only the front faces of solid meshes write depth; everything
    // translucent tests against it without occluding.
    let (topology, cull_mode, depth_write) = match kind {
        PipelineKind::Mesh(Side::Front) => (Topo::TriangleList, Some(wgpu::Face::Back), true),
        PipelineKind::Mesh(Side::Back) => (Topo::TriangleList, Some(wgpu::Face::Front), false),
        PipelineKind::Mesh(Side::Double) => (Topo::TriangleList, None, false),
        PipelineKind::Lines => (Topo::LineList, None, false),
        PipelineKind::Points => (Topo::TriangleList, None, false),
        PipelineKind::Label => (Topo::TriangleList, None, false),
    };
    let entry_point = match kind {
        PipelineKind::Points => "vs_points",
        _ => "vs_main",
    };
    let label = format!("{kind:?}_pipeline");
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label.as_str()),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module,
            entry_point,
            buffers: &[Vertex::desc()],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module,
            entry_point: "fs_main",
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode,
            unclipped_depth: false,
            polygon_mode: wgpu::PolygonMode::Fill,
            conservative: false,
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: depth_write,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
    })
}

impl WgpuBackend {
    pub async fn new(window: Arc<Window>) -> RenderResult<Self> {
        let size = window.inner_size();
        let instance = wgpu::Instance::default();
        let surface = instance.create_surface(window)?;
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(RenderError::NoAdapter)?;
        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                },
                None,
            )
            .await?;
        let info = adapter.get_info();
        log::info!("using adapter {} ({:?})", info.name, info.backend);

        let surface_caps = surface.get_capabilities(&adapter);
        let format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or_else(|| RenderError::Resource("surface reports no formats".into()))?;
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);
        let depth_view = create_depth_view(&device, config.width, config.height);

        let globals_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("globals_bgl"),
            entries: &[uniform_layout_entry(0)],
        });
        let object_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("object_bgl"),
            entries: &[uniform_layout_entry(0)],
        });
        let label_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("label_bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let globals_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("globals"),
            size: std::mem::size_of::<Globals>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let globals_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("globals_bg"),
            layout: &globals_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: globals_buffer.as_entire_binding(),
            }],
        });
        let label_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("label_sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let shaders = ShaderManager::with_builtin(&device);
        let mesh_module = shaders
            .get(MESH_SHADER)
            .ok_or_else(|| RenderError::Resource("mesh shader missing".into()))?;
        let sprite_module = shaders
            .get(SPRITE_SHADER)
            .ok_or_else(|| RenderError::Resource("sprite shader missing".into()))?;
        let mesh_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("mesh_pipeline_layout"),
            bind_group_layouts: &[&globals_layout, &object_layout],
            push_constant_ranges: &[],
        });
        let sprite_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("sprite_pipeline_layout"),
            bind_group_layouts: &[&globals_layout, &object_layout, &label_layout],
            push_constant_ranges: &[],
        });
        let mut pipelines = HashMap::new();
        for kind in [
            PipelineKind::Mesh(Side::Front),
            PipelineKind::Mesh(Side::Back),
            PipelineKind::Mesh(Side::Double),
            PipelineKind::Lines,
            PipelineKind::Points,
        ] {
            pipelines.insert(
                kind,
                create_pipeline(&device, format, &mesh_layout, mesh_module, kind),
            );
        }
        pipelines.insert(
            PipelineKind::Label,
            create_pipeline(
                &device,
                format,
                &sprite_layout,
                sprite_module,
                PipelineKind::Label,
            ),
        );

        Ok(Self {
            device,
            queue,
            surface,
            config,
            depth_view,
            globals_buffer,
            globals_bind_group,
            object_layout,
            label_layout,
            label_sampler,
            pipelines,
            resources: HashMap::new(),
            next_id: 0,
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        self.depth_view = create_depth_view(&self.device, width, height);
    }

    pub fn size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    fn upload_label(&self, text: &str) -> GpuLabel {
        let bitmap = meshes::rasterize_label(text);
        let extent = wgpu::Extent3d {
            width: bitmap.width,
            height: bitmap.height,
            depth_or_array_layers: 1,
        };
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("label_texture"),
            size: extent,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        self.queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &bitmap.pixels,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(bitmap.width * 4),
                rows_per_image: Some(bitmap.height),
            },
            extent,
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("label_bg"),
            layout: &self.label_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.label_sampler),
                },
            ],
        });
        GpuLabel {
            texture,
            bind_group,
        }
    }

    fn acquire_frame(&self) -> RenderResult<wgpu::SurfaceTexture> {
        match self.surface.get_current_texture() {
            Ok(frame) => Ok(frame),
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::warn!("surface lost, reconfiguring");
                self.surface.configure(&self.device, &self.config);
                Ok(self.surface.get_current_texture()?)
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl GraphicsBackend for WgpuBackend {
    fn acquire(&mut self, geometry: &Geometry, material: &Material) -> RenderResult<ResourceId> {
        let mut sprite_scale = Vec2::ONE;
        let mut label = None;
        let (pipeline, vertices, indices) = match geometry {
            Geometry::Sphere { radius, segments } if material.wireframe => (
                PipelineKind::Lines,
                meshes::sphere_wireframe(*radius, *segments),
                None,
            ),
            Geometry::Sphere { radius, segments } => {
                let mesh = meshes::sphere(*radius, *segments);
                (PipelineKind::Mesh(material.side), mesh.vertices, Some(mesh.indices))
            }
            Geometry::Lines { points } => (PipelineKind::Lines, meshes::line_list(points), None),
            Geometry::Points { positions, size } => {
                sprite_scale = Vec2::splat(*size);
                (PipelineKind::Points, meshes::point_sprites(positions), None)
            }
            Geometry::Label { text, scale } => {
                sprite_scale = *scale;
                label = Some(self.upload_label(text));
                (PipelineKind::Label, meshes::quad(), None)
            }
        };
        if vertices.is_empty() {
            return Err(RenderError::Resource(format!(
                "empty {} geometry",
                geometry.kind()
            )));
        }

        let vertex_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(geometry.kind()),
                contents: bytemuck::cast_slice(&vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
        let index_buffer = indices.map(|indices| {
            let buffer = self
                .device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("indices"),
                    contents: bytemuck::cast_slice(&indices),
                    usage: wgpu::BufferUsages::INDEX,
                });
            (buffer, indices.len() as u32)
        });
        let uniform = ObjectUniform::new(Mat4::IDENTITY, material, sprite_scale);
        let uniform_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("object_uniform"),
                contents: bytemuck::bytes_of(&uniform),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            });
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("object_bg"),
            layout: &self.object_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let id = ResourceId(self.next_id);
        self.next_id += 1;
        self.resources.insert(
            id,
            GpuResource {
                pipeline,
                vertex_buffer,
                vertex_count: vertices.len() as u32,
                index_buffer,
                uniform_buffer,
                bind_group,
                label,
                material: *material,
                sprite_scale,
            },
        );
        Ok(id)
    }

    fn update_material(&mut self, id: ResourceId, material: &Material) -> RenderResult<()> {
        let res = self
            .resources
            .get_mut(&id)
            .ok_or(RenderError::UnknownResource(id))?;
        res.material = *material;
        Ok(())
    }

    fn release(&mut self, id: ResourceId) -> RenderResult<()> {
        let res = self
            .resources
            .remove(&id)
            .ok_or(RenderError::UnknownResource(id))?;
        res.destroy();
        Ok(())
    }

    fn render(&mut self, view: &FrameView, commands: &[DrawCommand]) -> RenderResult<()> {
        let mut draws = Vec::with_capacity(commands.len());
        for cmd in commands {
            let res = self
                .resources
                .get(&cmd.resource)
                .ok_or(RenderError::UnknownResource(cmd.resource))?;
            let pipeline = self
                .pipelines
                .get(&res.pipeline)
                .ok_or_else(|| RenderError::Resource(format!("no {:?} pipeline", res.pipeline)))?;
            let uniform = ObjectUniform::new(cmd.model, &res.material, res.sprite_scale);
            self.queue
                .write_buffer(&res.uniform_buffer, 0, bytemuck::bytes_of(&uniform));
            draws.push((res, pipeline));
        }
        let globals = Globals::from_view(view);
        self.queue
            .write_buffer(&self.globals_buffer, 0, bytemuck::bytes_of(&globals));

        let frame = self.acquire_frame()?;
        let target = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("render"),
            });
        {
            let [r, g, b] = view.background.rgb();
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("scene"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: r as f64,
                            g: g as f64,
                            b: b as f64,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            rpass.set_bind_group(0, &self.globals_bind_group, &[]);
            for (res, pipeline) in &draws {
                rpass.set_pipeline(pipeline);
                rpass.set_bind_group(1, &res.bind_group, &[]);
                if let Some(label) = &res.label {
                    rpass.set_bind_group(2, &label.bind_group, &[]);
                }
                rpass.set_vertex_buffer(0, res.vertex_buffer.slice(..));
                match &res.index_buffer {
                    Some((buffer, count)) => {
                        rpass.set_index_buffer(buffer.slice(..), wgpu::IndexFormat::Uint32);
                        rpass.draw_indexed(0..*count, 0, 0..1);
                    }
                    None => rpass.draw(0..res.vertex_count, 0..1),
                }
            }
        }
        self.queue.submit(Some(encoder.finish()));
        frame.present();
        Ok(())
    }

    fn live_resources(&self) -> usize {
        self.resources.len()
    }
}
