use anyhow::{Context, Result};
use ouroboros::self_referencing;

use winit::application::ApplicationHandler;
use winit::dpi::{LogicalSize, PhysicalSize};
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::backend::{BackendOptions, WgpuBackend};
use crate::device::{Gpu, GpuInit, SurfaceErrorAction};
use crate::input::platform::winit::translate_key_press;
use crate::logging::Diagnostics;
use crate::render::RenderTarget;
use crate::surface::{RenderSurface, SurfaceControl};

/// Window/runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    pub initial_size: LogicalSize<f64>,
    pub backend: BackendOptions,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "prism".to_string(),
            initial_size: LogicalSize::new(640.0, 480.0),
            backend: BackendOptions::default(),
        }
    }
}

/// Entry point for the runtime.
///
/// Opens one window, binds a wgpu context to it and drives a [`RenderSurface`]
/// from the winit event loop.
pub struct Runtime;

impl Runtime {
    pub fn run<S>(config: RuntimeConfig, gpu_init: GpuInit, surface: S) -> Result<()>
    where
        S: RenderSurface<WgpuBackend> + 'static,
    {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut state = AppState::new(config, gpu_init, surface);

        event_loop
            .run_app(&mut state)
            .context("winit event loop terminated with error")?;

        match state.startup_error.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[self_referencing]
struct WindowEntry {
    window: Window,

    #[borrows(window)]
    #[covariant]
    gpu: Gpu<'this>,
}

struct AppState<S> {
    config: RuntimeConfig,
    gpu_init: GpuInit,
    surface: S,

    entry: Option<WindowEntry>,
    backend: Option<WgpuBackend>,

    exit_requested: bool,
    startup_error: Option<anyhow::Error>,
    diag: Diagnostics,
}

impl<S> AppState<S>
where
    S: RenderSurface<WgpuBackend>,
{
    fn new(config: RuntimeConfig, gpu_init: GpuInit, surface: S) -> Self {
        Self {
            config,
            gpu_init,
            surface,
            entry: None,
            backend: None,
            exit_requested: false,
            startup_error: None,
            diag: Diagnostics::facade("Runtime"),
        }
    }

    fn open_window(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(self.config.initial_size);

        let window = event_loop
            .create_window(attrs)
            .context("failed to create window")?;

        let gpu_init = self.gpu_init.clone();
        let entry = WindowEntryTryBuilder {
            window,
            gpu_builder: |w| pollster::block_on(Gpu::new(w, gpu_init)),
        }
        .try_build()?;

        let options = self.config.backend.clone();
        let backend_diag = self.diag.scoped("WgpuBackend");
        let mut backend = entry.with_gpu(|gpu| WgpuBackend::new(gpu, options, backend_diag));

        self.surface.on_context_ready(&mut backend);

        let size = entry.with_gpu(|gpu| gpu.size());
        self.surface.on_resize(&mut backend, size.width, size.height);

        entry.with_window(|w| w.request_redraw());

        self.entry = Some(entry);
        self.backend = Some(backend);
        Ok(())
    }

    fn resize(&mut self, new_size: PhysicalSize<u32>) {
        let (Some(entry), Some(backend)) = (self.entry.as_mut(), self.backend.as_mut()) else {
            return;
        };
        entry.with_gpu_mut(|gpu| gpu.resize(new_size));
        self.surface.on_resize(backend, new_size.width, new_size.height);
        entry.with_window(|w| w.request_redraw());
    }

    /// Drives one frame. Returns `false` if the surface is unusable.
    fn redraw(&mut self) -> bool {
        let (Some(entry), Some(backend)) = (self.entry.as_mut(), self.backend.as_mut()) else {
            return true;
        };
        let surface = &mut self.surface;

        entry.with_mut(|fields| {
            let mut frame = match fields.gpu.begin_frame() {
                Ok(f) => f,
                Err(err) => {
                    return match fields.gpu.handle_surface_error(err) {
                        SurfaceErrorAction::Reconfigured => {
                            fields.window.request_redraw();
                            true
                        }
                        SurfaceErrorAction::SkipFrame => true,
                        SurfaceErrorAction::Fatal => false,
                    };
                }
            };

            surface.on_redraw(backend);

            // RenderTarget borrows frame.encoder; dropped before submit() takes frame.
            {
                let mut target = RenderTarget::new(&mut frame.encoder, &frame.view);
                backend.encode(&mut target);
            }

            fields.window.pre_present_notify();
            fields.gpu.submit(frame);
            true
        })
    }
}

impl<S> ApplicationHandler for AppState<S>
where
    S: RenderSurface<WgpuBackend>,
{
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.entry.is_some() {
            return;
        }

        if let Err(e) = self.open_window(event_loop) {
            log::error!("failed to create initial window: {e:#}");
            self.startup_error = Some(e);
            self.exit_requested = true;
            event_loop.exit();
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }

        // Static content: frames are produced on demand only.
        event_loop.set_control_flow(ControlFlow::Wait);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }

        match event {
            WindowEvent::CloseRequested => {
                // The close button does not run the teardown hook.
                self.diag
                    .warn("window closed without teardown; GPU resources released on exit");
                self.exit_requested = true;
            }

            WindowEvent::Resized(new_size) => self.resize(new_size),

            WindowEvent::ScaleFactorChanged { .. } => {
                if let Some(size) = self.entry.as_ref().map(|e| e.with_window(|w| w.inner_size())) {
                    self.resize(size);
                }
            }

            WindowEvent::KeyboardInput { event, .. } => {
                let Some(key) = translate_key_press(&event) else {
                    return;
                };
                let Some(backend) = self.backend.as_mut() else {
                    return;
                };
                if self.surface.on_key_press(backend, key) == SurfaceControl::Close {
                    self.diag.info(format_args!("{key} pressed; closing"));
                    self.exit_requested = true;
                }
            }

            WindowEvent::RedrawRequested => {
                if !self.redraw() {
                    self.diag.error("surface lost beyond recovery; exiting");
                    self.exit_requested = true;
                }
            }

            _ => {}
        }

        if self.exit_requested {
            event_loop.exit();
        }
    }
}
