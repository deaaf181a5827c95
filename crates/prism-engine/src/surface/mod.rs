//! Render surfaces: the hook contract a host window drives, and the scene
//! that implements it.

mod hooks;
mod scene;

pub use hooks::{RenderSurface, SurfaceControl};
pub use scene::{SceneSurface, BACKGROUND};
