use std::collections::HashMap;
use std::sync::Arc;

use bytemuck::bytes_of;
use glam::Vec4;
use log::{info, warn};
use pollster::block_on;
use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::error::RenderError;
use crate::mesh::VertexLayout;
use crate::texture::DecodedImage;

use super::shader::{shader_source, FRAGMENT_ENTRY, VERTEX_ENTRY};
use super::{
    DrawCommand, MeshBuffersId, MeshUniforms, MeshUpload, RenderBackend, ShaderKind, TextureId,
};

/// wgpu backend drawing into a window surface.
pub struct WgpuBackend {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    depth: DepthBuffer,
    untextured_layout: wgpu::BindGroupLayout,
    textured_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    pipelines: HashMap<(ShaderKind, VertexLayout), wgpu::RenderPipeline>,
    meshes: Vec<MeshBuffers>,
    textures: Vec<wgpu::TextureView>,
    frame: Option<Frame>,
}

struct Frame {
    output: wgpu::SurfaceTexture,
    view: wgpu::TextureView,
    clear_color: wgpu::Color,
    draws: Vec<MeshBuffersId>,
}

impl WgpuBackend {
    /// Creates the surface, device and shared bind group layouts for `window`.
    pub async fn new(window: Arc<Window>) -> Result<Self, RenderError> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });
        let surface = instance
            .create_surface(window)
            .map_err(|err| RenderError::init("surface", err))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| RenderError::init("GPU adapter", "no compatible adapter found"))?;
        let info = adapter.get_info();
        info!("using {} ({:?} backend)", info.name, info.backend);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("renderer-device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await
            .map_err(|err| RenderError::init("GPU device", err))?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|format| format.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .ok_or_else(|| RenderError::init("surface", "adapter reports no surface formats"))?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            desired_maximum_frame_latency: 2,
            alpha_mode,
            view_formats: vec![],
        };
        surface.configure(&device, &config);

        let depth = DepthBuffer::create(&device, config.width, config.height);

        let uniform_entry = wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: wgpu::BufferSize::new(MeshUniforms::SIZE),
            },
            count: None,
        };
        let untextured_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("untextured-bind-layout"),
            entries: &[uniform_entry],
        });
        let textured_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("textured-bind-layout"),
            entries: &[
                uniform_entry,
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("texture-sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        Ok(Self {
            surface,
            device,
            queue,
            config,
            depth,
            untextured_layout,
            textured_layout,
            sampler,
            pipelines: HashMap::new(),
            meshes: Vec::new(),
            textures: Vec::new(),
            frame: None,
        })
    }

    fn bind_layout(&self, kind: ShaderKind) -> &wgpu::BindGroupLayout {
        match kind {
            ShaderKind::Textured => &self.textured_layout,
            ShaderKind::Untextured => &self.untextured_layout,
        }
    }

    /// Compiles and links the pipeline for one shader kind and vertex layout.
    fn ensure_pipeline(&mut self, kind: ShaderKind, layout: VertexLayout) -> Result<(), RenderError> {
        if self.pipelines.contains_key(&(kind, layout)) {
            return Ok(());
        }
        let label = format!("{}-{}f", kind.label(), layout.counts.stride());

        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(&label),
                source: wgpu::ShaderSource::Wgsl(shader_source(kind, &layout).into()),
            });
        if let Some(err) = block_on(self.device.pop_error_scope()) {
            return Err(RenderError::ShaderCompile {
                label,
                diagnostics: err.to_string(),
            });
        }

        let attributes: Vec<wgpu::VertexAttribute> = layout
            .attributes()
            .iter()
            .map(|attribute| wgpu::VertexAttribute {
                format: match attribute.components {
                    1 => wgpu::VertexFormat::Float32,
                    2 => wgpu::VertexFormat::Float32x2,
                    3 => wgpu::VertexFormat::Float32x3,
                    _ => wgpu::VertexFormat::Float32x4,
                },
                offset: attribute.offset_bytes,
                shader_location: attribute.slot.location(),
            })
            .collect();

        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let pipeline_layout = self
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(&label),
                bind_group_layouts: &[self.bind_layout(kind)],
                push_constant_ranges: &[],
            });
        let pipeline = self
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(&label),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &module,
                    entry_point: Some(VERTEX_ENTRY),
                    compilation_options: Default::default(),
                    buffers: &[wgpu::VertexBufferLayout {
                        array_stride: layout.stride_bytes(),
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &attributes,
                    }],
                },
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    ..Default::default()
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: DepthBuffer::FORMAT,
                    depth_write_enabled: true,
                    depth_compare: wgpu::CompareFunction::Less,
                    stencil: Default::default(),
                    bias: Default::default(),
                }),
                multisample: wgpu::MultisampleState::default(),
                fragment: Some(wgpu::FragmentState {
                    module: &module,
                    entry_point: Some(FRAGMENT_ENTRY),
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: self.config.format,
                        blend: Some(wgpu::BlendState::REPLACE),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                multiview: None,
                cache: None,
            });
        if let Some(err) = block_on(self.device.pop_error_scope()) {
            return Err(RenderError::ShaderLink {
                label,
                diagnostics: err.to_string(),
            });
        }

        self.pipelines.insert((kind, layout), pipeline);
        Ok(())
    }
}

impl RenderBackend for WgpuBackend {
    fn upload_mesh(&mut self, mesh: &MeshUpload<'_>) -> Result<MeshBuffersId, RenderError> {
        self.ensure_pipeline(mesh.shader, mesh.layout)?;

        let texture_view = match (mesh.shader, mesh.texture) {
            (ShaderKind::Textured, Some(TextureId(index))) => Some(
                self.textures
                    .get(index)
                    .ok_or_else(|| RenderError::InvalidMesh(format!("unknown texture {index}")))?,
            ),
            (ShaderKind::Textured, None) => {
                return Err(RenderError::InvalidMesh(format!(
                    "{} uses the textured shader without a texture",
                    mesh.label
                )));
            }
            (ShaderKind::Untextured, _) => None,
        };

        let buffers = MeshBuffers::new(
            &self.device,
            mesh,
            self.bind_layout(mesh.shader),
            texture_view.map(|view| (view, &self.sampler)),
        );
        self.meshes.push(buffers);
        Ok(MeshBuffersId(self.meshes.len() - 1))
    }

    fn upload_texture(
        &mut self,
        image: &DecodedImage,
        label: &str,
    ) -> Result<TextureId, RenderError> {
        let size = wgpu::Extent3d {
            width: image.width,
            height: image.height,
            depth_or_array_layers: 1,
        };
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &image.pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(image.bytes_per_row()),
                rows_per_image: Some(image.height),
            },
            size,
        );
        self.textures
            .push(texture.create_view(&wgpu::TextureViewDescriptor::default()));
        Ok(TextureId(self.textures.len() - 1))
    }

    fn begin_frame(&mut self, clear_color: Vec4) -> Result<bool, RenderError> {
        let output = match self.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.surface.configure(&self.device, &self.config);
                return Ok(false);
            }
            Err(wgpu::SurfaceError::Timeout) => {
                warn!("surface timeout; retrying next frame");
                return Ok(false);
            }
            Err(err) => return Err(RenderError::Surface(err.to_string())),
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        self.frame = Some(Frame {
            output,
            view,
            clear_color: wgpu::Color {
                r: clear_color.x as f64,
                g: clear_color.y as f64,
                b: clear_color.z as f64,
                a: clear_color.w as f64,
            },
            draws: Vec::new(),
        });
        Ok(true)
    }

    fn draw(&mut self, command: &DrawCommand) -> Result<(), RenderError> {
        let frame = self
            .frame
            .as_mut()
            .ok_or_else(|| RenderError::Surface("draw outside of a frame".into()))?;
        let mesh = self
            .meshes
            .get(command.mesh.0)
            .ok_or_else(|| RenderError::InvalidMesh(format!("unknown mesh {}", command.mesh.0)))?;
        // every mesh owns its uniform buffer, so writes never overlap
        self.queue
            .write_buffer(&mesh.uniforms, 0, bytes_of(&command.uniforms));
        frame.draws.push(command.mesh);
        Ok(())
    }

    fn present(&mut self) -> Result<(), RenderError> {
        let frame = self
            .frame
            .take()
            .ok_or_else(|| RenderError::Surface("present without a frame".into()))?;
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame-encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("main-pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &frame.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(frame.clear_color),
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

            for id in &frame.draws {
                let Some(mesh) = self.meshes.get(id.0) else {
                    continue;
                };
                let Some(pipeline) = self.pipelines.get(&(mesh.shader, mesh.layout)) else {
                    continue;
                };
                pass.set_pipeline(pipeline);
                pass.set_bind_group(0, &mesh.bind_group, &[]);
                pass.set_vertex_buffer(0, mesh.vertex.slice(..));
                pass.set_index_buffer(mesh.index.slice(..), wgpu::IndexFormat::Uint32);
                pass.draw_indexed(0..mesh.index_count, 0, 0..1);
            }
        }
        self.queue.submit(std::iter::once(encoder.finish()));
        frame.output.present();
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        self.depth = DepthBuffer::create(&self.device, width, height);
    }
}

struct MeshBuffers {
    vertex: wgpu::Buffer,
    index: wgpu::Buffer,
    index_count: u32,
    uniforms: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    shader: ShaderKind,
    layout: VertexLayout,
}

impl MeshBuffers {
    fn new(
        device: &wgpu::Device,
        mesh: &MeshUpload<'_>,
        bind_layout: &wgpu::BindGroupLayout,
        texture: Option<(&wgpu::TextureView, &wgpu::Sampler)>,
    ) -> Self {
        let label = mesh.label;
        let vertex = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label}-vertices")),
            contents: bytemuck::cast_slice(mesh.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label}-indices")),
            contents: bytemuck::cast_slice(mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        let uniforms = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&format!("{label}-uniforms")),
            size: MeshUniforms::SIZE,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut entries = vec![wgpu::BindGroupEntry {
            binding: 0,
            resource: uniforms.as_entire_binding(),
        }];
        if let Some((view, sampler)) = texture {
            entries.push(wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(view),
            });
            entries.push(wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::Sampler(sampler),
            });
        }
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("{label}-bind-group")),
            layout: bind_layout,
            entries: &entries,
        });

        Self {
            vertex,
            index,
            index_count: mesh.indices.len() as u32,
            uniforms,
            bind_group,
            shader: mesh.shader,
            layout: mesh.layout,
        }
    }
}

struct DepthBuffer {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl DepthBuffer {
    const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24Plus;

    fn create(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("depth-texture"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::FORMAT,
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
