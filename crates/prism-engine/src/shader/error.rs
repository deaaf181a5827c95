use std::fmt;
use std::path::PathBuf;

/// Programmable pipeline stage.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    /// File extension used by the `<name>.<ext>` lookup convention.
    #[inline]
    pub const fn extension(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vert",
            ShaderStage::Fragment => "frag",
        }
    }

    #[inline]
    pub(crate) const fn to_naga(self) -> naga::ShaderStage {
        match self {
            ShaderStage::Vertex => naga::ShaderStage::Vertex,
            ShaderStage::Fragment => naga::ShaderStage::Fragment,
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

/// Failure while loading, compiling or linking a shader pair.
#[derive(Debug)]
pub enum ShaderError {
    /// No source exists at the expected location.
    Missing { stage: ShaderStage, path: PathBuf },
    /// The source exists but could not be read as UTF-8 text.
    Unreadable {
        stage: ShaderStage,
        path: PathBuf,
        source: std::io::Error,
    },
    /// The stage failed to compile; `log` holds the compiler output.
    Compile { stage: ShaderStage, log: String },
    /// The program failed to link; `log` holds the linker output.
    Link { log: String },
}

impl ShaderError {
    #[inline]
    pub fn is_missing(&self) -> bool {
        matches!(self, ShaderError::Missing { .. })
    }
}

impl fmt::Display for ShaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderError::Missing { stage, path } => {
                write!(f, "failed to find {stage} shader. PATH = {}", path.display())
            }
            ShaderError::Unreadable { stage, path, source } => {
                write!(f, "failed to read {stage} shader {}: {source}", path.display())
            }
            ShaderError::Compile { stage, log } => {
                write!(f, "failed to compile {stage} shader: {log}")
            }
            ShaderError::Link { log } => write!(f, "failed to link shader program: {log}"),
        }
    }
}

impl std::error::Error for ShaderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ShaderError::Unreadable { source, .. } => Some(source),
            _ => None,
        }
    }
}
