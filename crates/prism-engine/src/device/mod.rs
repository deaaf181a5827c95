//! wgpu device and window swapchain.
//!
//! `Gpu` creates the device for a window, configures its surface, and acquires
//! and presents frames. Backends receive a `DeviceHandles` snapshot.

mod gpu;

pub use gpu::{DeviceHandles, Gpu, GpuFrame, GpuInit, SurfaceErrorAction};
