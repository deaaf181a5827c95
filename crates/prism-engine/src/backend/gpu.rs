use wgpu::util::DeviceExt;

use crate::device::{DeviceHandles, Gpu};
use crate::geometry::{AttributeType, VertexAttribute, VertexLayout};
use crate::logging::Diagnostics;
use crate::paint::Color;
use crate::render::RenderTarget;
use crate::shader::{self, CompiledStage, ShaderStage};

use super::{BackendInfo, BufferKind, Built, GraphicsBackend};

/// Backend switches.
#[derive(Debug, Clone, Default)]
pub struct BackendOptions {
    /// Rasterize triangle outlines only.
    ///
    /// Needs `wgpu::Features::POLYGON_MODE_LINE` on the device; falls back to
    /// filled polygons when the feature is absent.
    pub wireframe: bool,
}

pub struct WgpuShader {
    label: String,
    compiled: Option<CompiledStage>,
    module: Option<wgpu::ShaderModule>,
}

pub struct WgpuProgram {
    pipeline: Option<wgpu::RenderPipeline>,
}

pub struct WgpuBuffer {
    buffer: wgpu::Buffer,
}

pub struct WgpuVertexArray {
    label: String,
    vertices: wgpu::Buffer,
    indices: wgpu::Buffer,
    index_capacity: u32,
}

struct PendingDraw {
    pipeline: wgpu::RenderPipeline,
    vertices: wgpu::Buffer,
    indices: wgpu::Buffer,
    index_count: u32,
}

/// wgpu implementation of the graphics boundary.
///
/// Draws are recorded while the scene renders and encoded into one render pass
/// by [`WgpuBackend::encode`]. A `clear` issued during the frame becomes the
/// pass load op.
///
/// Shader sources are checked with naga before a module is created, so a
/// broken stage yields a compile log instead of a device validation error.
pub struct WgpuBackend {
    device: wgpu::Device,
    format: wgpu::TextureFormat,
    info: BackendInfo,
    options: BackendOptions,

    clear: Option<wgpu::Color>,
    pending: Vec<PendingDraw>,

    warned_index_clamp: bool,
    warned_wireframe: bool,
    diag: Diagnostics,
}

impl WgpuBackend {
    pub fn new(gpu: &Gpu<'_>, options: BackendOptions, diag: Diagnostics) -> Self {
        let DeviceHandles {
            device,
            format,
            adapter,
        } = gpu.handles();

        Self {
            device,
            format,
            info: describe_adapter(&adapter),
            options,
            clear: None,
            pending: Vec::new(),
            warned_index_clamp: false,
            warned_wireframe: false,
            diag,
        }
    }

    /// Encodes the recorded clear and draws into `target`, then forgets them.
    pub fn encode(&mut self, target: &mut RenderTarget<'_>) {
        let load = match self.clear.take() {
            Some(color) => wgpu::LoadOp::Clear(color),
            None => wgpu::LoadOp::Load,
        };

        let mut rpass = target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("prism scene pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target.color_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        for draw in self.pending.drain(..) {
            rpass.set_pipeline(&draw.pipeline);
            rpass.set_vertex_buffer(0, draw.vertices.slice(..));
            rpass.set_index_buffer(draw.indices.slice(..), wgpu::IndexFormat::Uint32);
            rpass.draw_indexed(0..draw.index_count, 0, 0..1);
        }
    }

    /// Runs `build` inside a validation error scope.
    ///
    /// wgpu reports validation failures to an uncaptured-error handler that
    /// panics by default; a captured error comes back as its message instead.
    fn capture<T>(&self, build: impl FnOnce(&wgpu::Device) -> T) -> Result<T, String> {
        let scope = self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let value = build(&self.device);
        match pollster::block_on(scope.pop()) {
            Some(err) => Err(err.to_string()),
            None => Ok(value),
        }
    }

    fn polygon_mode(&mut self) -> wgpu::PolygonMode {
        if !self.options.wireframe {
            return wgpu::PolygonMode::Fill;
        }
        if self.device.features().contains(wgpu::Features::POLYGON_MODE_LINE) {
            return wgpu::PolygonMode::Line;
        }
        if !self.warned_wireframe {
            self.diag
                .warn("wireframe requested but POLYGON_MODE_LINE is not enabled; drawing filled");
            self.warned_wireframe = true;
        }
        wgpu::PolygonMode::Fill
    }
}

impl GraphicsBackend for WgpuBackend {
    type Shader = WgpuShader;
    type Program = WgpuProgram;
    type Buffer = WgpuBuffer;
    type VertexArray = WgpuVertexArray;

    fn info(&self) -> BackendInfo {
        self.info.clone()
    }

    fn compile_shader(
        &mut self,
        stage: ShaderStage,
        label: &str,
        source: &str,
    ) -> Built<Self::Shader> {
        let failed = |log: String| {
            Built::failed(
                WgpuShader {
                    label: label.to_string(),
                    compiled: None,
                    module: None,
                },
                log,
            )
        };

        let compiled = match shader::compile(stage, source) {
            Ok(compiled) => compiled,
            Err(log) => return failed(log),
        };

        let module = self.capture(|device| {
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(label),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            })
        });

        match module {
            Ok(module) => Built::ok(WgpuShader {
                label: label.to_string(),
                compiled: Some(compiled),
                module: Some(module),
            }),
            Err(log) => failed(log),
        }
    }

    fn link_program(
        &mut self,
        label: &str,
        vertex: &Self::Shader,
        fragment: &Self::Shader,
        layout: &VertexLayout,
    ) -> Built<Self::Program> {
        let unlinked = || WgpuProgram { pipeline: None };

        let (Some(vs), Some(vs_module)) = (&vertex.compiled, &vertex.module) else {
            return Built::failed(unlinked(), format!("{} is not compiled", vertex.label));
        };
        let (Some(fs), Some(fs_module)) = (&fragment.compiled, &fragment.module) else {
            return Built::failed(unlinked(), format!("{} is not compiled", fragment.label));
        };

        let linked = match shader::link(vs, fs, layout) {
            Ok(linked) => linked,
            Err(log) => return Built::failed(unlinked(), log),
        };

        let mut attributes = Vec::with_capacity(layout.attributes.len());
        for attr in layout.attributes {
            match vertex_format(attr) {
                Some(format) => attributes.push(wgpu::VertexAttribute {
                    format,
                    offset: attr.offset,
                    shader_location: attr.location,
                }),
                None => {
                    return Built::failed(
                        unlinked(),
                        format!(
                            "unsupported vertex attribute at location {} ({} components)",
                            attr.location, attr.components
                        ),
                    );
                }
            }
        }

        let polygon_mode = self.polygon_mode();

        let format = self.format;
        let pipeline = self.capture(|device| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: None,

                vertex: wgpu::VertexState {
                    module: vs_module,
                    entry_point: Some(&linked.vertex_entry),
                    compilation_options: Default::default(),
                    buffers: &[wgpu::VertexBufferLayout {
                        array_stride: layout.stride,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &attributes,
                    }],
                },

                fragment: Some(wgpu::FragmentState {
                    module: fs_module,
                    entry_point: Some(&linked.fragment_entry),
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format,
                        blend: Some(wgpu::BlendState::REPLACE),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),

                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    polygon_mode,
                    unclipped_depth: false,
                    conservative: false,
                },

                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview_mask: None,
                cache: None,
            })
        });

        match pipeline {
            Ok(pipeline) => Built::ok(WgpuProgram {
                pipeline: Some(pipeline),
            }),
            Err(log) => Built::failed(unlinked(), log),
        }
    }

    fn delete_shader(&mut self, shader: Self::Shader) {
        drop(shader);
    }

    fn create_buffer(&mut self, label: &str, kind: BufferKind, contents: &[u8]) -> Self::Buffer {
        let usage = match kind {
            BufferKind::Vertex => wgpu::BufferUsages::VERTEX,
            BufferKind::Index => wgpu::BufferUsages::INDEX,
        };

        let buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents,
            usage,
        });

        WgpuBuffer { buffer }
    }

    fn create_vertex_array(
        &mut self,
        label: &str,
        _layout: &VertexLayout,
        vertices: &Self::Buffer,
        indices: &Self::Buffer,
    ) -> Self::VertexArray {
        // The attribute layout is baked into the pipeline at link time.
        WgpuVertexArray {
            label: label.to_string(),
            vertices: vertices.buffer.clone(),
            indices: indices.buffer.clone(),
            index_capacity: (indices.buffer.size() / 4) as u32,
        }
    }

    fn clear(&mut self, color: Color) {
        self.clear = Some(color.to_wgpu());
    }

    fn draw_indexed(
        &mut self,
        program: &Self::Program,
        vertex_array: &Self::VertexArray,
        index_count: u32,
    ) {
        let Some(pipeline) = program.pipeline.as_ref() else {
            self.diag.warn(format_args!(
                "{}: draw with unlinked program ignored",
                vertex_array.label
            ));
            return;
        };

        // wgpu rejects index ranges past the end of the buffer.
        let count = index_count.min(vertex_array.index_capacity);
        if count < index_count && !self.warned_index_clamp {
            self.diag.warn(format_args!(
                "{}: {index_count} indices requested, {} uploaded; drawing {count}",
                vertex_array.label, vertex_array.index_capacity
            ));
            self.warned_index_clamp = true;
        }

        self.pending.push(PendingDraw {
            pipeline: pipeline.clone(),
            vertices: vertex_array.vertices.clone(),
            indices: vertex_array.indices.clone(),
            index_count: count,
        });
    }

    fn delete_vertex_array(&mut self, vertex_array: Self::VertexArray) {
        drop(vertex_array);
    }

    fn delete_buffer(&mut self, buffer: Self::Buffer) {
        buffer.buffer.destroy();
    }

    fn delete_program(&mut self, program: Self::Program) {
        drop(program);
    }
}

fn vertex_format(attr: &VertexAttribute) -> Option<wgpu::VertexFormat> {
    match (attr.ty, attr.components) {
        (AttributeType::Float32, 1) => Some(wgpu::VertexFormat::Float32),
        (AttributeType::Float32, 2) => Some(wgpu::VertexFormat::Float32x2),
        (AttributeType::Float32, 3) => Some(wgpu::VertexFormat::Float32x3),
        (AttributeType::Float32, 4) => Some(wgpu::VertexFormat::Float32x4),
        _ => None,
    }
}

fn describe_adapter(info: &wgpu::AdapterInfo) -> BackendInfo {
    let version = format!("{:?} {} {}", info.backend, info.driver, info.driver_info);
    BackendInfo {
        vendor: format!("{:#06x}", info.vendor),
        renderer: info.name.clone(),
        version: version.trim().to_string(),
        shading_language: "WGSL".to_string(),
    }
}
