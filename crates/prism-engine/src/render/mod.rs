//! Frame targets handed from the runtime to the wgpu backend.

mod ctx;

pub use ctx::RenderTarget;
