//! Renderable objects.

mod graphics_object;

pub use graphics_object::{
    GraphicsObject, ObjectDesc, ObjectSettings, ObjectStatus, LEGACY_INDEX_COUNT,
};
