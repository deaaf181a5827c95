use std::collections::{BTreeSet, HashMap};

use crate::geometry::VertexLayout;
use crate::logging::Diagnostics;
use crate::paint::Color;
use crate::shader::{self, CompiledStage, ShaderStage};

use super::{BackendInfo, BufferKind, Built, GraphicsBackend};

/// One entry of the call log.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    CompileShader { id: u32, stage: ShaderStage, label: String, ok: bool },
    LinkProgram { id: u32, label: String, ok: bool },
    DeleteShader { id: u32 },
    CreateBuffer { id: u32, kind: BufferKind, label: String, size: usize },
    CreateVertexArray { id: u32, label: String },
    Clear(Color),
    Draw(DrawRecord),
    Resize { width: u32, height: u32 },
    DeleteVertexArray { id: u32 },
    DeleteBuffer { id: u32 },
    DeleteProgram { id: u32 },
}

/// A draw request and how much of it was actually rasterized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawRecord {
    /// Label of the vertex array that was drawn.
    pub label: String,
    pub program: u32,
    pub vertex_array: u32,
    /// Index count passed by the caller.
    pub requested: u32,
    /// Index count backed by the index buffer and rasterized.
    pub drawn: u32,
}

#[derive(Debug)]
pub struct SoftShader {
    id: u32,
    compiled: Option<CompiledStage>,
}

#[derive(Debug)]
pub struct SoftProgram {
    id: u32,
    linked: bool,
}

#[derive(Debug)]
pub struct SoftBuffer {
    id: u32,
}

#[derive(Debug)]
pub struct SoftVertexArray {
    id: u32,
    label: String,
    layout: VertexLayout,
    vertices: u32,
    indices: u32,
}

/// CPU reference backend.
///
/// Shaders are compiled and linked with the same checks the GPU backend uses,
/// but are not executed: rasterization treats attribute location 0 as the
/// clip-space position and location 1 as the vertex color, which is exactly what
/// the pass-through pair does. No depth test, no blending, no culling.
///
/// Every call is appended to a log so callers can assert on ordering.
pub struct SoftwareBackend {
    width: u32,
    height: u32,
    pixels: Vec<Color>,

    next_id: u32,
    live: BTreeSet<u32>,
    buffers: HashMap<u32, Vec<u8>>,

    calls: Vec<BackendCall>,
    diag: Diagnostics,
}

impl SoftwareBackend {
    pub fn new(width: u32, height: u32) -> Self {
        Self::with_diagnostics(width, height, Diagnostics::facade("SoftwareBackend"))
    }

    pub fn with_diagnostics(width: u32, height: u32, diag: Diagnostics) -> Self {
        Self {
            width,
            height,
            pixels: vec![Color::transparent(); (width as usize) * (height as usize)],
            next_id: 1,
            live: BTreeSet::new(),
            buffers: HashMap::new(),
            calls: Vec::new(),
            diag,
        }
    }

    #[inline]
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Color at pixel `(x, y)`; `(0, 0)` is the top-left corner.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get((y * self.width + x) as usize).copied()
    }

    /// Pixel containing the normalized device coordinate `(x, y)`.
    pub fn pixel_at_ndc(&self, x: f32, y: f32) -> Option<Color> {
        let px = ((x + 1.0) * 0.5 * self.width as f32).floor();
        let py = ((1.0 - y) * 0.5 * self.height as f32).floor();
        if px < 0.0 || py < 0.0 {
            return None;
        }
        self.pixel(px as u32, py as u32)
    }

    #[inline]
    pub fn calls(&self) -> &[BackendCall] {
        &self.calls
    }

    pub fn draws(&self) -> Vec<&DrawRecord> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                BackendCall::Draw(d) => Some(d),
                _ => None,
            })
            .collect()
    }

    pub fn compile_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, BackendCall::CompileShader { .. }))
            .count()
    }

    pub fn buffer_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, BackendCall::CreateBuffer { .. }))
            .count()
    }

    /// Number of handles created and not yet deleted.
    #[inline]
    pub fn live_resources(&self) -> usize {
        self.live.len()
    }

    pub fn clear_log(&mut self) {
        self.calls.clear();
    }

    fn allocate_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        self.live.insert(id);
        id
    }

    fn release(&mut self, id: u32, what: &str) {
        if !self.live.remove(&id) {
            self.diag.warn(format_args!("{what} {id} released twice or never created"));
        }
    }

    fn read_indices(&self, id: u32) -> Vec<u32> {
        self.buffers
            .get(&id)
            .map(|bytes| {
                bytes
                    .chunks_exact(4)
                    .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn fetch_vertex(&self, va: &SoftVertexArray, index: u32) -> Option<([f32; 3], [f32; 3])> {
        let bytes = self.buffers.get(&va.vertices)?;
        let base = index as usize * va.layout.stride as usize;

        let position = va
            .layout
            .attribute(0)
            .and_then(|a| read_floats(bytes, base + a.offset as usize, a.components))?;
        let color = va
            .layout
            .attribute(1)
            .and_then(|a| read_floats(bytes, base + a.offset as usize, a.components))
            .unwrap_or([1.0; 3]);

        Some((position, color))
    }

    fn rasterize(&mut self, tri: [([f32; 3], [f32; 3]); 3]) {
        let (w, h) = (self.width as f32, self.height as f32);
        let screen = tri.map(|(p, _)| ((p[0] + 1.0) * 0.5 * w, (1.0 - p[1]) * 0.5 * h));

        let area = edge(screen[0], screen[1], screen[2]);
        if area == 0.0 || !area.is_finite() {
            return;
        }

        let min_x = screen.iter().map(|s| s.0).fold(f32::INFINITY, f32::min);
        let max_x = screen.iter().map(|s| s.0).fold(f32::NEG_INFINITY, f32::max);
        let min_y = screen.iter().map(|s| s.1).fold(f32::INFINITY, f32::min);
        let max_y = screen.iter().map(|s| s.1).fold(f32::NEG_INFINITY, f32::max);

        // Uniform vertex colors are written as-is so flat fills compare exactly.
        let flat = tri[0].1 == tri[1].1 && tri[1].1 == tri[2].1;

        let x0 = min_x.floor().max(0.0) as i64;
        let y0 = min_y.floor().max(0.0) as i64;
        let x1 = (max_x.ceil() as i64).min(self.width as i64 - 1);
        let y1 = (max_y.ceil() as i64).min(self.height as i64 - 1);

        for py in y0..=y1 {
            for px in x0..=x1 {
                let p = (px as f32 + 0.5, py as f32 + 0.5);
                let b0 = edge(screen[1], screen[2], p) / area;
                let b1 = edge(screen[2], screen[0], p) / area;
                let b2 = edge(screen[0], screen[1], p) / area;
                if b0 < 0.0 || b1 < 0.0 || b2 < 0.0 {
                    continue;
                }

                let color = if flat {
                    Color::from(tri[0].1)
                } else {
                    let c = |i: usize| b0 * tri[0].1[i] + b1 * tri[1].1[i] + b2 * tri[2].1[i];
                    Color::rgb_f32(c(0), c(1), c(2))
                };
                let idx = py as usize * self.width as usize + px as usize;
                self.pixels[idx] = color;
            }
        }
    }
}

impl GraphicsBackend for SoftwareBackend {
    type Shader = SoftShader;
    type Program = SoftProgram;
    type Buffer = SoftBuffer;
    type VertexArray = SoftVertexArray;

    fn info(&self) -> BackendInfo {
        BackendInfo {
            vendor: "prism".to_string(),
            renderer: format!("software rasterizer {}x{}", self.width, self.height),
            version: env!("CARGO_PKG_VERSION").to_string(),
            shading_language: "WGSL (naga)".to_string(),
        }
    }

    fn compile_shader(
        &mut self,
        stage: ShaderStage,
        label: &str,
        source: &str,
    ) -> Built<Self::Shader> {
        let id = self.allocate_id();
        let result = shader::compile(stage, source);

        self.calls.push(BackendCall::CompileShader {
            id,
            stage,
            label: label.to_string(),
            ok: result.is_ok(),
        });

        match result {
            Ok(compiled) => Built::ok(SoftShader {
                id,
                compiled: Some(compiled),
            }),
            Err(log) => Built::failed(SoftShader { id, compiled: None }, log),
        }
    }

    fn link_program(
        &mut self,
        label: &str,
        vertex: &Self::Shader,
        fragment: &Self::Shader,
        layout: &VertexLayout,
    ) -> Built<Self::Program> {
        let id = self.allocate_id();

        let result = match (&vertex.compiled, &fragment.compiled) {
            (Some(vs), Some(fs)) => shader::link(vs, fs, layout).map(|_| ()),
            (None, _) => Err(format!("vertex shader {} is not compiled", vertex.id)),
            (_, None) => Err(format!("fragment shader {} is not compiled", fragment.id)),
        };

        self.calls.push(BackendCall::LinkProgram {
            id,
            label: label.to_string(),
            ok: result.is_ok(),
        });

        match result {
            Ok(()) => Built::ok(SoftProgram { id, linked: true }),
            Err(log) => Built::failed(SoftProgram { id, linked: false }, log),
        }
    }

    fn delete_shader(&mut self, shader: Self::Shader) {
        self.calls.push(BackendCall::DeleteShader { id: shader.id });
        self.release(shader.id, "shader");
    }

    fn create_buffer(&mut self, label: &str, kind: BufferKind, contents: &[u8]) -> Self::Buffer {
        let id = self.allocate_id();
        self.buffers.insert(id, contents.to_vec());
        self.calls.push(BackendCall::CreateBuffer {
            id,
            kind,
            label: label.to_string(),
            size: contents.len(),
        });
        SoftBuffer { id }
    }

    fn create_vertex_array(
        &mut self,
        label: &str,
        layout: &VertexLayout,
        vertices: &Self::Buffer,
        indices: &Self::Buffer,
    ) -> Self::VertexArray {
        let id = self.allocate_id();
        self.calls.push(BackendCall::CreateVertexArray {
            id,
            label: label.to_string(),
        });
        SoftVertexArray {
            id,
            label: label.to_string(),
            layout: *layout,
            vertices: vertices.id,
            indices: indices.id,
        }
    }

    fn clear(&mut self, color: Color) {
        self.pixels.fill(color);
        self.calls.push(BackendCall::Clear(color));
    }

    fn draw_indexed(
        &mut self,
        program: &Self::Program,
        vertex_array: &Self::VertexArray,
        index_count: u32,
    ) {
        let indices = self.read_indices(vertex_array.indices);
        let available = indices.len() as u32;

        let drawn = if program.linked {
            index_count.min(available)
        } else {
            self.diag.warn(format_args!(
                "draw with unlinked program {} ignored",
                program.id
            ));
            0
        };

        if program.linked && drawn < index_count {
            self.diag.warn(format_args!(
                "{}: {index_count} indices requested, {available} uploaded",
                vertex_array.label
            ));
        }

        self.calls.push(BackendCall::Draw(DrawRecord {
            label: vertex_array.label.clone(),
            program: program.id,
            vertex_array: vertex_array.id,
            requested: index_count,
            drawn,
        }));

        for tri in indices[..drawn as usize].chunks_exact(3) {
            let fetched = [
                self.fetch_vertex(vertex_array, tri[0]),
                self.fetch_vertex(vertex_array, tri[1]),
                self.fetch_vertex(vertex_array, tri[2]),
            ];
            if let [Some(a), Some(b), Some(c)] = fetched {
                self.rasterize([a, b, c]);
            }
        }
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.pixels = vec![Color::transparent(); (width as usize) * (height as usize)];
        self.calls.push(BackendCall::Resize { width, height });
    }

    fn delete_vertex_array(&mut self, vertex_array: Self::VertexArray) {
        self.calls.push(BackendCall::DeleteVertexArray { id: vertex_array.id });
        self.release(vertex_array.id, "vertex array");
    }

    fn delete_buffer(&mut self, buffer: Self::Buffer) {
        self.buffers.remove(&buffer.id);
        self.calls.push(BackendCall::DeleteBuffer { id: buffer.id });
        self.release(buffer.id, "buffer");
    }

    fn delete_program(&mut self, program: Self::Program) {
        self.calls.push(BackendCall::DeleteProgram { id: program.id });
        self.release(program.id, "program");
    }
}

#[inline]
fn edge(a: (f32, f32), b: (f32, f32), p: (f32, f32)) -> f32 {
    (b.0 - a.0) * (p.1 - a.1) - (b.1 - a.1) * (p.0 - a.0)
}

/// Reads up to three little-endian `f32`s; missing components stay `0.0`.
fn read_floats(bytes: &[u8], offset: usize, components: u32) -> Option<[f32; 3]> {
    let mut out = [0.0f32; 3];
    for (i, slot) in out.iter_mut().enumerate().take(components.min(3) as usize) {
        let at = offset + i * 4;
        let raw = bytes.get(at..at + 4)?;
        *slot = f32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]);
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{TriangleGeometry, Vec3, TRIANGLE_LAYOUT};
    use crate::shader::{DEFAULT_FRAGMENT_SOURCE, DEFAULT_VERTEX_SOURCE};

    fn linked_program(backend: &mut SoftwareBackend) -> SoftProgram {
        let vs = backend.compile_shader(ShaderStage::Vertex, "vs", DEFAULT_VERTEX_SOURCE);
        let fs = backend.compile_shader(ShaderStage::Fragment, "fs", DEFAULT_FRAGMENT_SOURCE);
        let program = backend.link_program("p", &vs.handle, &fs.handle, &TRIANGLE_LAYOUT);
        assert!(program.succeeded());
        backend.delete_shader(vs.handle);
        backend.delete_shader(fs.handle);
        program.handle
    }

    fn upload(
        backend: &mut SoftwareBackend,
        g: &TriangleGeometry,
    ) -> (SoftBuffer, SoftBuffer, SoftVertexArray) {
        let vbo = backend.create_buffer("vbo", BufferKind::Vertex, g.vertex_bytes());
        let ebo = backend.create_buffer("ebo", BufferKind::Index, g.index_bytes());
        let vao = backend.create_vertex_array("tri", &TRIANGLE_LAYOUT, &vbo, &ebo);
        (vbo, ebo, vao)
    }

    #[test]
    fn clear_fills_every_pixel() {
        let mut b = SoftwareBackend::new(8, 4);
        b.clear(Color::BLACK);
        for y in 0..4 {
            for x in 0..8 {
                assert_eq!(b.pixel(x, y), Some(Color::BLACK));
            }
        }
        assert_eq!(b.pixel(8, 0), None);
    }

    #[test]
    fn draw_rasterizes_triangle_color() {
        let mut b = SoftwareBackend::new(64, 64);
        let program = linked_program(&mut b);
        let g = TriangleGeometry::new(Vec3::zero(), Color::GREEN);
        let (_vbo, _ebo, vao) = upload(&mut b, &g);

        b.clear(Color::BLACK);
        b.draw_indexed(&program, &vao, 3);

        assert_eq!(b.pixel_at_ndc(0.0, 0.0), Some(Color::GREEN));
        assert_eq!(b.pixel_at_ndc(0.9, 0.9), Some(Color::BLACK));
    }

    #[test]
    fn oversized_index_count_is_clamped_and_recorded() {
        let mut b = SoftwareBackend::new(16, 16);
        let program = linked_program(&mut b);
        let g = TriangleGeometry::new(Vec3::zero(), Color::RED);
        let (_vbo, _ebo, vao) = upload(&mut b, &g);

        b.draw_indexed(&program, &vao, 6);

        let draws = b.draws();
        assert_eq!(draws.len(), 1);
        assert_eq!(draws[0].requested, 6);
        assert_eq!(draws[0].drawn, 3);
    }

    #[test]
    fn unlinked_program_draws_nothing() {
        let mut b = SoftwareBackend::new(16, 16);
        let vs = b.compile_shader(ShaderStage::Vertex, "vs", "not wgsl");
        let fs = b.compile_shader(ShaderStage::Fragment, "fs", DEFAULT_FRAGMENT_SOURCE);
        assert!(!vs.succeeded());
        let program = b.link_program("p", &vs.handle, &fs.handle, &TRIANGLE_LAYOUT);
        assert!(!program.succeeded());

        let g = TriangleGeometry::new(Vec3::zero(), Color::RED);
        let (_vbo, _ebo, vao) = upload(&mut b, &g);
        b.clear(Color::BLACK);
        b.draw_indexed(&program.handle, &vao, 3);

        assert_eq!(b.draws()[0].drawn, 0);
        assert_eq!(b.pixel_at_ndc(0.0, 0.0), Some(Color::BLACK));
    }

    #[test]
    fn deleting_everything_leaves_no_live_handles() {
        let mut b = SoftwareBackend::new(4, 4);
        let program = linked_program(&mut b);
        let g = TriangleGeometry::new(Vec3::zero(), Color::RED);
        let (vbo, ebo, vao) = upload(&mut b, &g);
        assert_eq!(b.live_resources(), 4);

        b.delete_vertex_array(vao);
        b.delete_buffer(ebo);
        b.delete_buffer(vbo);
        b.delete_program(program);
        assert_eq!(b.live_resources(), 0);
    }

    #[test]
    fn resize_reallocates_framebuffer() {
        let mut b = SoftwareBackend::new(4, 4);
        b.resize(10, 2);
        assert_eq!(b.size(), (10, 2));
        assert!(b.pixel(9, 1).is_some());
        assert!(b.pixel(0, 2).is_none());
    }
}
