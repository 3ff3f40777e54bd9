// Renderer module for Wirescape

use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use wgpu::util::DeviceExt;
use wgpu::{Adapter, Buffer, RenderPipeline};
use winit::window::Window;

use crate::camera::PerspectiveCamera;
use crate::geometry::Geometry;
use crate::material::Color;
use crate::panel::Overlay;
use crate::scene::{GeometryId, NodeId, Scene};
use crate::viewport::Viewport;

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

#[derive(Debug, Error)]
pub enum RendererError {
    #[error("failed to create surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),
    #[error("no compatible GPU adapter found")]
    NoAdapter,
    #[error("failed to acquire GPU device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),
    #[error("surface unusable: {0}")]
    Surface(#[from] wgpu::SurfaceError),
}

/// What the render loop needs from a renderer.
pub trait SceneRenderer {
    /// Sets the logical size of the drawing surface.
    fn set_size(&mut self, width: f32, height: f32);
    fn set_pixel_ratio(&mut self, ratio: f32);
    fn render(&mut self, scene: &Scene, camera: &PerspectiveCamera) -> Result<(), RendererError>;
}

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct Vertex {
    position: [f32; 3],
}

// Per-mesh uniforms: MVP matrix and linear color
#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct Uniforms {
    mvp: [[f32; 4]; 4],
    color: [f32; 4],
}

struct GpuGeometry {
    vertex_buffer: Buffer,
    triangle_buffer: Buffer,
    triangle_index_count: u32,
    edge_buffer: Buffer,
    edge_index_count: u32,
}

/// Logical surface size and pixel ratio. Changes are collected and the
/// surface is reconfigured once before the next frame.
#[derive(Debug, Clone, Copy)]
struct SurfaceSize {
    viewport: Viewport,
    dirty: bool,
}

impl SurfaceSize {
    fn new(viewport: Viewport) -> Self {
        Self { viewport, dirty: true }
    }

    fn set_size(&mut self, width: f32, height: f32) {
        if (width, height) != (self.viewport.width, self.viewport.height) {
            self.viewport.width = width;
            self.viewport.height = height;
            self.dirty = true;
        }
    }

    fn set_pixel_ratio(&mut self, ratio: f32) {
        if ratio != self.viewport.pixel_ratio {
            self.viewport.pixel_ratio = ratio;
            self.dirty = true;
        }
    }

    /// Physical size to configure, if anything changed since the last call.
    fn take_pending(&mut self) -> Option<(u32, u32)> {
        std::mem::take(&mut self.dirty).then(|| self.viewport.buffer_size())
    }
}

struct NodeBinding {
    uniform_buffer: Buffer,
    bind_group: wgpu::BindGroup,
}

pub struct Renderer {
    adapter: Adapter,
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface: wgpu::Surface<'static>,
    window: Arc<Window>,
    surface_format: wgpu::TextureFormat,
    alpha_mode: wgpu::CompositeAlphaMode,
    fill_pipeline: RenderPipeline,
    wire_pipeline: RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    depth_view: wgpu::TextureView,
    geometries: HashMap<GeometryId, GpuGeometry>,
    bindings: HashMap<NodeId, NodeBinding>,
    clear_color: wgpu::Color,
    size: SurfaceSize,
    egui_renderer: egui_wgpu::Renderer,
    overlay: Option<Overlay>,
}

impl Renderer {
    pub async fn new(
        window: Arc<Window>,
        viewport: Viewport,
        clear: Color,
    ) -> Result<Self, RendererError> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance.create_surface(window.clone())?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(RendererError::NoAdapter)?;
        let info = adapter.get_info();
        log::info!("using adapter {} ({:?})", info.name, info.backend);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Renderer Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                },
                None, // Trace path
            )
            .await?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .unwrap_or(surface_caps.formats[0]);
        // Prefer a compositor mode that honours the alpha channel
        let alpha_mode = surface_caps
            .alpha_modes
            .iter()
            .copied()
            .find(|m| {
                matches!(
                    m,
                    wgpu::CompositeAlphaMode::PreMultiplied
                        | wgpu::CompositeAlphaMode::PostMultiplied
                )
            })
            .unwrap_or(surface_caps.alpha_modes[0]);

        let shader_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shader.wgsl").into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Uniform Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Render Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let fill_pipeline = create_pipeline(
            &device,
            &pipeline_layout,
            &shader_module,
            surface_format,
            wgpu::PrimitiveTopology::TriangleList,
        );
        let wire_pipeline = create_pipeline(
            &device,
            &pipeline_layout,
            &shader_module,
            surface_format,
            wgpu::PrimitiveTopology::LineList,
        );

        let (width, height) = viewport.buffer_size();
        let depth_view = create_depth_view(&device, width, height);
        let egui_renderer = egui_wgpu::Renderer::new(&device, surface_format, None, 1);

        let [r, g, b] = clear.to_linear();
        let mut renderer = Self {
            adapter,
            device,
            queue,
            surface,
            window,
            surface_format,
            alpha_mode,
            fill_pipeline,
            wire_pipeline,
            bind_group_layout,
            depth_view,
            geometries: HashMap::new(),
            bindings: HashMap::new(),
            clear_color: wgpu::Color {
                r: f64::from(r),
                g: f64::from(g),
                b: f64::from(b),
                a: 1.0,
            },
            size: SurfaceSize::new(viewport),
            egui_renderer,
            overlay: None,
        };
        renderer.configure_pending();
        Ok(renderer)
    }

    pub fn window(&self) -> &Arc<Window> {
        &self.window
    }

    pub fn max_texture_side(&self) -> usize {
        self.device.limits().max_texture_dimension_2d as usize
    }

    /// Queues the debug panel for the next frame.
    pub fn set_overlay(&mut self, overlay: Overlay) {
        self.overlay = Some(overlay);
    }

    fn configure_pending(&mut self) {
        if self.size.take_pending().is_some() {
            self.configure_surface();
        }
    }

    fn configure_surface(&mut self) {
        let (width, height) = self.size.viewport.buffer_size();
        let surface_caps = self.surface.get_capabilities(&self.adapter);
        self.surface.configure(
            &self.device,
            &wgpu::SurfaceConfiguration {
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                format: self.surface_format,
                width,
                height,
                present_mode: wgpu::PresentMode::AutoVsync,
                alpha_mode: if surface_caps.alpha_modes.contains(&self.alpha_mode) {
                    self.alpha_mode
                } else {
                    surface_caps.alpha_modes[0]
                },
                view_formats: vec![],
                desired_maximum_frame_latency: 2,
            },
        );
        self.depth_view = create_depth_view(&self.device, width, height);
        log::debug!(
            "surface configured at {width}x{height} (pixel ratio {})",
            self.size.viewport.pixel_ratio
        );
    }

    /// Makes sure every drawn mesh has GPU buffers and fresh uniforms.
    fn prepare(
        &mut self,
        scene: &Scene,
        camera: &PerspectiveCamera,
    ) -> Vec<(NodeId, GeometryId, bool)> {
        let view_projection = camera.view_projection();
        let mut draws = Vec::new();

        for item in scene.visible_meshes() {
            let device = &self.device;
            self.geometries
                .entry(item.geometry)
                .or_insert_with(|| upload_geometry(device, scene.geometry(item.geometry)));

            let layout = &self.bind_group_layout;
            let binding = self
                .bindings
                .entry(item.node)
                .or_insert_with(|| {
                    log::debug!("creating uniforms for {}", scene.node(item.node).name);
                    create_node_binding(device, layout)
                });

            let material = scene.material(item.material);
            let [r, g, b] = material.color.to_linear();
            let uniforms = Uniforms {
                mvp: (view_projection * item.world).to_cols_array_2d(),
                color: [r, g, b, 1.0],
            };
            self.queue
                .write_buffer(&binding.uniform_buffer, 0, bytemuck::cast_slice(&[uniforms]));

            draws.push((item.node, item.geometry, material.wireframe));
        }
        draws
    }
}

impl SceneRenderer for Renderer {
    fn set_size(&mut self, width: f32, height: f32) {
        self.size.set_size(width, height);
    }

    fn set_pixel_ratio(&mut self, ratio: f32) {
        self.size.set_pixel_ratio(ratio);
    }

    fn render(&mut self, scene: &Scene, camera: &PerspectiveCamera) -> Result<(), RendererError> {
        self.configure_pending();
        let frame = match self.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.configure_surface();
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("timed out acquiring the next frame");
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        };

        let draws = self.prepare(scene, camera);
        let view = frame.texture.create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Render Encoder"),
        });

        let overlay = self.overlay.take();
        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [frame.texture.width(), frame.texture.height()],
            pixels_per_point: overlay.as_ref().map_or(1.0, |o| o.pixels_per_point),
        };
        let mut egui_commands = Vec::new();
        if let Some(overlay) = &overlay {
            for (id, image_delta) in &overlay.textures_delta.set {
                self.egui_renderer
                    .update_texture(&self.device, &self.queue, *id, image_delta);
            }
            egui_commands = self.egui_renderer.update_buffers(
                &self.device,
                &self.queue,
                &mut encoder,
                &overlay.paint_jobs,
                &screen_descriptor,
            );
        }

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
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
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            for (node, geometry, wireframe) in &draws {
                let gpu = &self.geometries[geometry];
                let binding = &self.bindings[node];
                let (pipeline, indices, count) = if *wireframe {
                    (&self.wire_pipeline, &gpu.edge_buffer, gpu.edge_index_count)
                } else {
                    (&self.fill_pipeline, &gpu.triangle_buffer, gpu.triangle_index_count)
                };
                render_pass.set_pipeline(pipeline);
                render_pass.set_bind_group(0, &binding.bind_group, &[]);
                render_pass.set_vertex_buffer(0, gpu.vertex_buffer.slice(..));
                render_pass.set_index_buffer(indices.slice(..), wgpu::IndexFormat::Uint32);
                render_pass.draw_indexed(0..count, 0, 0..1);
            }
        }

        if let Some(overlay) = &overlay {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Debug Panel Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            self.egui_renderer
                .render(&mut render_pass, &overlay.paint_jobs, &screen_descriptor);
        }

        self.queue
            .submit(egui_commands.into_iter().chain(std::iter::once(encoder.finish())));
        frame.present();

        if let Some(overlay) = overlay {
            for id in &overlay.textures_delta.free {
                self.egui_renderer.free_texture(id);
            }
        }
        Ok(())
    }
}

fn create_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    shader_module: &wgpu::ShaderModule,
    format: wgpu::TextureFormat,
    topology: wgpu::PrimitiveTopology,
) -> RenderPipeline {
    let vertex_buffer_layout = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[wgpu::VertexAttribute {
            offset: 0,
            shader_location: 0,
            format: wgpu::VertexFormat::Float32x3,
        }],
    };

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(match topology {
            wgpu::PrimitiveTopology::LineList => "Wireframe Pipeline",
            _ => "Fill Pipeline",
        }),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader_module,
            entry_point: "vs_main",
            buffers: &[vertex_buffer_layout],
        },
        fragment: Some(wgpu::FragmentState {
            module: shader_module,
            entry_point: "fs_main",
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState {
            topology,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            unclipped_depth: false,
            polygon_mode: wgpu::PolygonMode::Fill,
            conservative: false,
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview: None,
    })
}

fn create_depth_view(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Depth Texture"),
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

fn upload_geometry(device: &wgpu::Device, geometry: &Geometry) -> GpuGeometry {
    log::debug!(
        "uploading {:?}: {} vertices, {} triangles, {} edges",
        geometry.shape,
        geometry.vertex_count(),
        geometry.triangle_count(),
        geometry.edges.len() / 2
    );
    let vertices: Vec<Vertex> = geometry
        .positions
        .iter()
        .map(|&position| Vertex { position })
        .collect();

    let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Vertex Buffer"),
        contents: bytemuck::cast_slice(&vertices),
        usage: wgpu::BufferUsages::VERTEX,
    });
    let triangle_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Triangle Index Buffer"),
        contents: bytemuck::cast_slice(&geometry.indices),
        usage: wgpu::BufferUsages::INDEX,
    });
    let edge_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Edge Index Buffer"),
        contents: bytemuck::cast_slice(&geometry.edges),
        usage: wgpu::BufferUsages::INDEX,
    });

    GpuGeometry {
        vertex_buffer,
        triangle_buffer,
        triangle_index_count: geometry.indices.len() as u32,
        edge_buffer,
        edge_index_count: geometry.edges.len() as u32,
    }
}

fn create_node_binding(device: &wgpu::Device, layout: &wgpu::BindGroupLayout) -> NodeBinding {
    let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Uniform Buffer"),
        size: std::mem::size_of::<Uniforms>() as wgpu::BufferAddress,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Uniform Bind Group"),
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: uniform_buffer.as_entire_binding(),
        }],
    });
    NodeBinding {
        uniform_buffer,
        bind_group,
    }
}
