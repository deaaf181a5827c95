use crate::backend::GraphicsBackend;
use crate::input::Key;

/// What the host should do after a hook returns.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SurfaceControl {
    Continue,
    /// Close the window and leave the event loop.
    Close,
}

/// Contract between a host window and whatever draws into it.
///
/// The host calls these hooks on its event thread:
/// - `on_context_ready` once, after the graphics context exists
/// - `on_resize` whenever the drawable size changes
/// - `on_redraw` whenever a frame is needed
/// - `on_key_press` for each key press (repeats excluded)
pub trait RenderSurface<B: GraphicsBackend> {
    fn on_context_ready(&mut self, backend: &mut B);

    fn on_resize(&mut self, backend: &mut B, width: u32, height: u32) {
        let _ = (backend, width, height);
    }

    fn on_redraw(&mut self, backend: &mut B);

    fn on_key_press(&mut self, backend: &mut B, key: Key) -> SurfaceControl {
        let _ = (backend, key);
        SurfaceControl::Continue
    }
}
