//! CPU-side geometry.
//!
//! Positions are normalized device coordinates (`-1..1`, +Y up). There is no
//! transform stage: what is uploaded is what is rasterized.

mod triangle;
mod vec3;

pub use triangle::{
    AttributeType, TriangleGeometry, Vertex, VertexAttribute, VertexLayout, BASE_TRIANGLE,
    TRIANGLE_INDICES, TRIANGLE_LAYOUT,
};
pub use vec3::Vec3;
