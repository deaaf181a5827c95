use bytemuck::{Pod, Zeroable};

use crate::paint::Color;

use super::Vec3;

/// Corner positions of the reference triangle, before the origin offset is applied.
pub const BASE_TRIANGLE: [Vec3; 3] = [
    Vec3::new(-0.3, -0.2, 0.0),
    Vec3::new(0.3, -0.2, 0.0),
    Vec3::new(0.0, 0.3, 0.0),
];

/// Index order for the single triangle.
pub const TRIANGLE_INDICES: [u32; 3] = [0, 1, 2];

// ── vertex ────────────────────────────────────────────────────────────────

/// Interleaved vertex record: `X, Y, Z, R, G, B`.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub color: [f32; 3],
}

impl Vertex {
    /// Byte distance between consecutive records.
    pub const STRIDE: u64 = std::mem::size_of::<Vertex>() as u64;

    /// Byte offset of the color attribute inside a record.
    pub const COLOR_OFFSET: u64 = std::mem::size_of::<[f32; 3]>() as u64;
}

// ── layout ────────────────────────────────────────────────────────────────

/// Component type of a vertex attribute.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AttributeType {
    Float32,
}

impl AttributeType {
    #[inline]
    pub const fn size(self) -> u64 {
        match self {
            AttributeType::Float32 => 4,
        }
    }
}

/// One attribute pointer: shader location, component count/type and byte offset.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct VertexAttribute {
    pub location: u32,
    pub components: u32,
    pub ty: AttributeType,
    pub normalized: bool,
    pub offset: u64,
}

/// Attribute layout of one vertex buffer.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct VertexLayout {
    pub stride: u64,
    pub attributes: &'static [VertexAttribute],
}

impl VertexLayout {
    pub fn attribute(&self, location: u32) -> Option<&VertexAttribute> {
        self.attributes.iter().find(|a| a.location == location)
    }
}

/// Location 0 = position, location 1 = color, both `3 x f32`.
pub const TRIANGLE_LAYOUT: VertexLayout = VertexLayout {
    stride: Vertex::STRIDE,
    attributes: &[
        VertexAttribute {
            location: 0,
            components: 3,
            ty: AttributeType::Float32,
            normalized: false,
            offset: 0,
        },
        VertexAttribute {
            location: 1,
            components: 3,
            ty: AttributeType::Float32,
            normalized: false,
            offset: Vertex::COLOR_OFFSET,
        },
    ],
};

// ── geometry ──────────────────────────────────────────────────────────────

/// CPU-side geometry of one triangle.
///
/// Built once from an origin and a color; never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct TriangleGeometry {
    vertices: [Vertex; 3],
    indices: [u32; 3],
}

impl TriangleGeometry {
    /// Offsets every corner of [`BASE_TRIANGLE`] by `-origin` and paints it `color`.
    pub fn new(origin: Vec3, color: Color) -> Self {
        let rgb = color.rgb();
        let vertices = BASE_TRIANGLE.map(|corner| Vertex {
            position: (corner - origin).to_array(),
            color: rgb,
        });

        Self {
            vertices,
            indices: TRIANGLE_INDICES,
        }
    }

    #[inline]
    pub fn vertices(&self) -> &[Vertex; 3] {
        &self.vertices
    }

    #[inline]
    pub fn indices(&self) -> &[u32; 3] {
        &self.indices
    }

    #[inline]
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    #[inline]
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geometry(origin: (f32, f32, f32), rgb: (f32, f32, f32)) -> TriangleGeometry {
        TriangleGeometry::new(origin.into(), Color::rgb_f32(rgb.0, rgb.1, rgb.2))
    }

    // ── positions ─────────────────────────────────────────────────────────

    #[test]
    fn zero_origin_keeps_base_shape() {
        let g = geometry((0.0, 0.0, 0.0), (1.0, 1.0, 1.0));
        for (v, base) in g.vertices().iter().zip(BASE_TRIANGLE) {
            assert_eq!(v.position, base.to_array());
        }
    }

    #[test]
    fn origin_is_subtracted_from_every_corner() {
        let origins = [(-0.5, -0.5, 0.0), (0.5, 0.5, 0.0), (0.25, -1.0, 2.0)];
        for origin in origins {
            let g = geometry(origin, (0.0, 1.0, 0.0));
            for (v, base) in g.vertices().iter().zip(BASE_TRIANGLE) {
                assert_eq!(v.position[0], base.x - origin.0);
                assert_eq!(v.position[1], base.y - origin.1);
                assert_eq!(v.position[2], base.z - origin.2);
            }
        }
    }

    // ── colors ────────────────────────────────────────────────────────────

    #[test]
    fn color_is_replicated_exactly() {
        let g = geometry((0.1, 0.2, 0.3), (0.25, 0.5, 0.75));
        assert!(g.vertices().iter().all(|v| v.color == [0.25, 0.5, 0.75]));
    }

    // ── layout ────────────────────────────────────────────────────────────

    #[test]
    fn layout_matches_record_size() {
        assert_eq!(TRIANGLE_LAYOUT.stride, 24);
        assert_eq!(TRIANGLE_LAYOUT.attribute(0).map(|a| a.offset), Some(0));
        assert_eq!(TRIANGLE_LAYOUT.attribute(1).map(|a| a.offset), Some(12));
        assert!(TRIANGLE_LAYOUT.attribute(2).is_none());
    }

    #[test]
    fn byte_views_cover_whole_arrays() {
        let g = geometry((0.0, 0.0, 0.0), (1.0, 0.0, 0.0));
        assert_eq!(g.vertex_bytes().len(), 3 * 24);
        assert_eq!(g.index_bytes().len(), 3 * 4);
        assert_eq!(g.indices(), &[0, 1, 2]);
    }
}
