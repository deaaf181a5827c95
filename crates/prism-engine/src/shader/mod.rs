//! Shader sources, stages and the compile/link checks shared by all backends.
//!
//! Sources are WGSL, one stage per file, looked up as `<name>.vert` and
//! `<name>.frag`.

mod error;
mod source;
mod validate;

pub use error::{ShaderError, ShaderStage};
pub use source::{
    InMemoryShaders, ShaderDir, ShaderProvider, DEFAULT_FRAGMENT_SOURCE, DEFAULT_SHADER_NAME,
    DEFAULT_VERTEX_SOURCE,
};
pub use validate::{compile, link, CompiledStage, LinkedProgram};
