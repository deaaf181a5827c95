//! Prism engine crate.
//!
//! Triangles on a window: geometry, shader loading and validation, a graphics
//! backend boundary with wgpu and software implementations, and the scene
//! surface that drives object lifecycles from window hooks.

pub mod backend;
pub mod device;
pub mod geometry;
pub mod input;
pub mod object;
pub mod paint;
pub mod render;
pub mod shader;
pub mod surface;
pub mod window;

pub mod logging;
