//! Color model shared by geometry and backends.

pub mod color;

pub use color::Color;
