use crate::backend::{BufferKind, Built, GraphicsBackend};
use crate::geometry::{TriangleGeometry, Vec3, Vertex, TRIANGLE_LAYOUT};
use crate::logging::Diagnostics;
use crate::paint::Color;
use crate::shader::{ShaderError, ShaderProvider, ShaderStage, DEFAULT_SHADER_NAME};

/// Index count requested by a non-strict draw.
///
/// Only three indices are uploaded; backends clamp or ignore the excess.
pub const LEGACY_INDEX_COUNT: u32 = 6;

/// Name, placement and color of one triangle.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectDesc {
    pub name: String,
    pub origin: Vec3,
    pub color: Color,
}

impl ObjectDesc {
    pub fn new(name: impl Into<String>, origin: impl Into<Vec3>, color: impl Into<Color>) -> Self {
        Self {
            name: name.into(),
            origin: origin.into(),
            color: color.into(),
        }
    }
}

/// Per-object initialization settings.
#[derive(Debug, Clone)]
pub struct ObjectSettings {
    /// Base name of the `<name>.vert` / `<name>.frag` pair.
    pub shader_name: String,

    /// Gate buffer upload and linking on earlier success, and draw exactly the
    /// uploaded index count.
    ///
    /// `false` keeps the historical sequence: link after a failed compile,
    /// upload buffers after any failure, request [`LEGACY_INDEX_COUNT`] indices.
    pub strict: bool,
}

impl Default for ObjectSettings {
    fn default() -> Self {
        Self {
            shader_name: DEFAULT_SHADER_NAME.to_string(),
            strict: false,
        }
    }
}

/// Lifecycle of a [`GraphicsObject`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ObjectStatus {
    Uninitialized,
    /// Shaders compiled and linked; the object draws.
    Initialized,
    /// A shader could not be loaded, compiled or linked; the object never draws.
    Failed,
    /// Resources released. Terminal.
    Destroyed,
}

/// GPU handles owned by one object. Any of them may be absent after a failure.
struct GpuResources<B: GraphicsBackend> {
    program: Option<B::Program>,
    vertex_array: Option<B::VertexArray>,
    vertex_buffer: Option<B::Buffer>,
    index_buffer: Option<B::Buffer>,
}

impl<B: GraphicsBackend> GpuResources<B> {
    fn empty() -> Self {
        Self {
            program: None,
            vertex_array: None,
            vertex_buffer: None,
            index_buffer: None,
        }
    }

    fn release(self, backend: &mut B) {
        if let Some(va) = self.vertex_array {
            backend.delete_vertex_array(va);
        }
        if let Some(ebo) = self.index_buffer {
            backend.delete_buffer(ebo);
        }
        if let Some(vbo) = self.vertex_buffer {
            backend.delete_buffer(vbo);
        }
        if let Some(program) = self.program {
            backend.delete_program(program);
        }
    }
}

/// One renderable triangle: geometry, shader program and buffers.
///
/// Geometry is computed at construction. GPU state exists between
/// [`initialize`](Self::initialize) and [`destroy`](Self::destroy); `destroy`
/// takes the handles, so they cannot be released twice.
pub struct GraphicsObject<B: GraphicsBackend> {
    desc: ObjectDesc,
    geometry: TriangleGeometry,

    resources: Option<GpuResources<B>>,
    status: ObjectStatus,
    errors: Vec<ShaderError>,
    index_count: u32,

    diag: Diagnostics,
}

impl<B: GraphicsBackend> GraphicsObject<B> {
    pub fn new(desc: ObjectDesc, diag: &Diagnostics) -> Self {
        let geometry = TriangleGeometry::new(desc.origin, desc.color);
        let diag = diag.scoped(format!("GraphicsObject {}", desc.name));
        let index_count = geometry.indices().len() as u32;

        Self {
            desc,
            geometry,
            resources: None,
            status: ObjectStatus::Uninitialized,
            errors: Vec::new(),
            index_count,
            diag,
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.desc.name
    }

    #[inline]
    pub fn desc(&self) -> &ObjectDesc {
        &self.desc
    }

    #[inline]
    pub fn geometry(&self) -> &TriangleGeometry {
        &self.geometry
    }

    #[inline]
    pub fn status(&self) -> ObjectStatus {
        self.status
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.status == ObjectStatus::Initialized
    }

    /// Errors collected while initializing, in the order they occurred.
    #[inline]
    pub fn errors(&self) -> &[ShaderError] {
        &self.errors
    }

    /// Index count passed to each draw.
    #[inline]
    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    /// Loads, compiles and links the shader pair, then uploads geometry.
    ///
    /// Failures are logged and recorded; the object is left `Failed` and its
    /// `render` becomes a no-op.
    pub fn initialize(
        &mut self,
        backend: &mut B,
        shaders: &dyn ShaderProvider,
        settings: &ObjectSettings,
    ) {
        if self.status != ObjectStatus::Uninitialized {
            self.diag.warn(format_args!(
                "initialize called in state {:?}; ignored",
                self.status
            ));
            return;
        }

        let mut resources = GpuResources::empty();
        let pipeline_ok = self.init_shader(backend, shaders, settings, &mut resources);

        if pipeline_ok || !settings.strict {
            self.init_buffers(backend, &mut resources);
        } else {
            self.diag.warn("shader pipeline failed; buffer upload skipped");
        }

        self.index_count = if settings.strict {
            self.geometry.indices().len() as u32
        } else {
            LEGACY_INDEX_COUNT
        };

        self.resources = Some(resources);
        self.status = if pipeline_ok {
            ObjectStatus::Initialized
        } else {
            ObjectStatus::Failed
        };
    }

    /// Draws the triangle if initialized; otherwise logs and returns.
    pub fn render(&self, backend: &mut B) {
        let ready = match (&self.status, &self.resources) {
            (ObjectStatus::Initialized, Some(res)) => {
                res.program.as_ref().zip(res.vertex_array.as_ref())
            }
            _ => None,
        };

        match ready {
            Some((program, vertex_array)) => {
                backend.draw_indexed(program, vertex_array, self.index_count);
            }
            None => self.diag.warn("Object not initialized !!"),
        }
    }

    /// Releases vertex array, index buffer, vertex buffer and program.
    pub fn destroy(&mut self, backend: &mut B) {
        match self.resources.take() {
            Some(resources) => {
                resources.release(backend);
                self.diag.debug("GPU resources released");
            }
            None if self.status == ObjectStatus::Destroyed => {
                self.diag.warn("destroy called twice; ignored");
            }
            None => self.diag.debug("destroy called before initialize"),
        }
        self.status = ObjectStatus::Destroyed;
    }

    fn fail(&mut self, err: ShaderError) {
        self.diag.error(&err);
        self.errors.push(err);
    }

    fn init_shader(
        &mut self,
        backend: &mut B,
        shaders: &dyn ShaderProvider,
        settings: &ObjectSettings,
        resources: &mut GpuResources<B>,
    ) -> bool {
        self.diag.info("Initialize shaders.");

        let name = settings.shader_name.as_str();
        let vertex_src = match shaders.fetch(name, ShaderStage::Vertex) {
            Ok(src) => src,
            Err(e) => {
                self.fail(e);
                return false;
            }
        };
        let fragment_src = match shaders.fetch(name, ShaderStage::Fragment) {
            Ok(src) => src,
            Err(e) => {
                self.fail(e);
                return false;
            }
        };

        let mut ok = true;

        let Built { handle: vertex, log } = backend.compile_shader(
            ShaderStage::Vertex,
            &format!("{} {name}.vert", self.desc.name),
            &vertex_src,
        );
        if let Some(log) = log {
            self.fail(ShaderError::Compile {
                stage: ShaderStage::Vertex,
                log,
            });
            ok = false;
        }

        let Built { handle: fragment, log } = backend.compile_shader(
            ShaderStage::Fragment,
            &format!("{} {name}.frag", self.desc.name),
            &fragment_src,
        );
        if let Some(log) = log {
            self.fail(ShaderError::Compile {
                stage: ShaderStage::Fragment,
                log,
            });
            ok = false;
        }

        if ok || !settings.strict {
            let Built { handle: program, log } =
                backend.link_program(&self.desc.name, &vertex, &fragment, &TRIANGLE_LAYOUT);
            if let Some(log) = log {
                self.fail(ShaderError::Link { log });
                ok = false;
            }
            resources.program = Some(program);
        }

        backend.delete_shader(vertex);
        backend.delete_shader(fragment);

        ok
    }

    fn init_buffers(&mut self, backend: &mut B, resources: &mut GpuResources<B>) {
        self.diag.debug(format_args!(
            "Total vertices size : {}",
            self.geometry.vertex_bytes().len()
        ));
        self.diag.debug(format_args!("Stride : {}", Vertex::STRIDE));
        self.diag.debug(format_args!(
            "Total indices size : {}",
            self.geometry.index_bytes().len()
        ));

        let vertex_buffer = backend.create_buffer(
            &format!("{} vertices", self.desc.name),
            BufferKind::Vertex,
            self.geometry.vertex_bytes(),
        );
        let index_buffer = backend.create_buffer(
            &format!("{} indices", self.desc.name),
            BufferKind::Index,
            self.geometry.index_bytes(),
        );
        let vertex_array = backend.create_vertex_array(
            &self.desc.name,
            &TRIANGLE_LAYOUT,
            &vertex_buffer,
            &index_buffer,
        );

        resources.vertex_buffer = Some(vertex_buffer);
        resources.index_buffer = Some(index_buffer);
        resources.vertex_array = Some(vertex_array);
    }
}
