//! Graphics API boundary.
//!
//! `GraphicsBackend` is the only surface through which engine objects touch the
//! GPU. Handles are associated types owned by the caller; every `delete_*`
//! consumes its handle, so a released resource cannot be named again.
//!
//! Implementations:
//! - `WgpuBackend` records draws for one frame and encodes them into a single pass
//! - `SoftwareBackend` rasterizes into a CPU framebuffer and logs every call

mod gpu;
mod software;

pub use gpu::{BackendOptions, WgpuBackend};
pub use software::{BackendCall, DrawRecord, SoftwareBackend};

use crate::geometry::VertexLayout;
use crate::paint::Color;
use crate::shader::ShaderStage;

/// Implementation strings reported by a backend.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackendInfo {
    pub vendor: String,
    pub renderer: String,
    pub version: String,
    pub shading_language: String,
}

/// Result of a compile or link step.
///
/// Like a GL shader/program object, the handle exists even when the step
/// failed; `log` then carries the diagnostic text.
#[derive(Debug)]
pub struct Built<T> {
    pub handle: T,
    pub log: Option<String>,
}

impl<T> Built<T> {
    #[inline]
    pub fn ok(handle: T) -> Self {
        Self { handle, log: None }
    }

    #[inline]
    pub fn failed(handle: T, log: impl Into<String>) -> Self {
        Self {
            handle,
            log: Some(log.into()),
        }
    }

    #[inline]
    pub fn succeeded(&self) -> bool {
        self.log.is_none()
    }
}

/// Intended binding of a buffer.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BufferKind {
    Vertex,
    Index,
}

/// Operations the engine needs from a graphics API.
///
/// All calls happen on the thread that owns the context.
pub trait GraphicsBackend {
    type Shader;
    type Program;
    type Buffer;
    type VertexArray;

    /// Vendor / renderer / version / shading-language strings.
    fn info(&self) -> BackendInfo;

    fn compile_shader(&mut self, stage: ShaderStage, label: &str, source: &str)
        -> Built<Self::Shader>;

    /// Links a vertex/fragment pair for geometry described by `layout`.
    fn link_program(
        &mut self,
        label: &str,
        vertex: &Self::Shader,
        fragment: &Self::Shader,
        layout: &VertexLayout,
    ) -> Built<Self::Program>;

    fn delete_shader(&mut self, shader: Self::Shader);

    /// Allocates a buffer and uploads `contents` (static usage).
    fn create_buffer(&mut self, label: &str, kind: BufferKind, contents: &[u8]) -> Self::Buffer;

    /// Binds `vertices` and `indices` together under `layout`.
    fn create_vertex_array(
        &mut self,
        label: &str,
        layout: &VertexLayout,
        vertices: &Self::Buffer,
        indices: &Self::Buffer,
    ) -> Self::VertexArray;

    /// Clears the color target.
    fn clear(&mut self, color: Color);

    /// Draws `index_count` indices as a triangle list (u32 indices, offset 0).
    fn draw_indexed(
        &mut self,
        program: &Self::Program,
        vertex_array: &Self::VertexArray,
        index_count: u32,
    );

    /// Drawable size changed.
    fn resize(&mut self, width: u32, height: u32) {
        let _ = (width, height);
    }

    fn delete_vertex_array(&mut self, vertex_array: Self::VertexArray);

    fn delete_buffer(&mut self, buffer: Self::Buffer);

    fn delete_program(&mut self, program: Self::Program);
}
