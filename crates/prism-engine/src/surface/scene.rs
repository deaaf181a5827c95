use crate::backend::GraphicsBackend;
use crate::input::Key;
use crate::logging::Diagnostics;
use crate::object::{GraphicsObject, ObjectDesc, ObjectSettings};
use crate::paint::Color;
use crate::shader::ShaderProvider;

use super::{RenderSurface, SurfaceControl};

/// Frame clear color.
pub const BACKGROUND: Color = Color::BLACK;

/// Ordered collection of [`GraphicsObject`]s bound to one render surface.
///
/// Objects are built from their descriptors when the context becomes ready,
/// drawn in insertion order every frame (last drawn wins, no depth test), and
/// destroyed on an explicit teardown request.
pub struct SceneSurface<B: GraphicsBackend> {
    descriptors: Vec<ObjectDesc>,
    objects: Vec<GraphicsObject<B>>,

    shaders: Box<dyn ShaderProvider>,
    settings: ObjectSettings,

    viewport: Option<(u32, u32)>,
    context_ready: bool,
    torn_down: bool,

    diag: Diagnostics,
}

impl<B: GraphicsBackend> SceneSurface<B> {
    pub fn new(
        shaders: impl ShaderProvider + 'static,
        settings: ObjectSettings,
        diag: &Diagnostics,
    ) -> Self {
        Self {
            descriptors: Vec::new(),
            objects: Vec::new(),
            shaders: Box::new(shaders),
            settings,
            viewport: None,
            context_ready: false,
            torn_down: false,
            diag: diag.scoped("SceneSurface"),
        }
    }

    /// Appends an object; insertion order is draw order.
    pub fn with_object(mut self, desc: ObjectDesc) -> Self {
        self.push_object(desc);
        self
    }

    /// Appends an object descriptor.
    ///
    /// Only descriptors present when the context becomes ready are built.
    pub fn push_object(&mut self, desc: ObjectDesc) {
        if self.context_ready {
            self.diag.warn(format_args!(
                "object {} added after context creation; it will not be built",
                desc.name
            ));
        }
        self.descriptors.push(desc);
    }

    #[inline]
    pub fn descriptors(&self) -> &[ObjectDesc] {
        &self.descriptors
    }

    #[inline]
    pub fn objects(&self) -> &[GraphicsObject<B>] {
        &self.objects
    }

    /// Last size reported by the host.
    #[inline]
    pub fn viewport(&self) -> Option<(u32, u32)> {
        self.viewport
    }

    #[inline]
    pub fn is_context_ready(&self) -> bool {
        self.context_ready
    }

    #[inline]
    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// Destroys every object, in order. Later calls do nothing.
    pub fn on_teardown_requested(&mut self, backend: &mut B) {
        if self.torn_down {
            self.diag.debug("teardown already done");
            return;
        }

        self.diag.info(format_args!("destroying {} object(s)", self.objects.len()));
        for object in &mut self.objects {
            object.destroy(backend);
        }
        self.torn_down = true;
    }

    fn log_backend_info(&self, backend: &B) {
        let info = backend.info();
        self.diag.info(format_args!(
            "Running on --->\n\tVENDOR : {}\n\tRENDERER : {}\n\tVERSION : {}\n\tSHADER_VERSION : {}",
            info.vendor, info.renderer, info.version, info.shading_language
        ));
    }
}

impl<B: GraphicsBackend> RenderSurface<B> for SceneSurface<B> {
    fn on_context_ready(&mut self, backend: &mut B) {
        if self.context_ready {
            self.diag.warn("context ready signalled twice; objects are not rebuilt");
            return;
        }
        self.context_ready = true;

        self.log_backend_info(backend);

        for desc in &self.descriptors {
            let mut object = GraphicsObject::new(desc.clone(), &self.diag);
            object.initialize(backend, self.shaders.as_ref(), &self.settings);
            self.objects.push(object);
        }
    }

    fn on_resize(&mut self, backend: &mut B, width: u32, height: u32) {
        self.diag.debug(format_args!("resize {width}x{height}"));
        self.viewport = Some((width, height));
        backend.resize(width, height);
    }

    fn on_redraw(&mut self, backend: &mut B) {
        backend.clear(BACKGROUND);
        for object in &self.objects {
            object.render(backend);
        }
    }

    fn on_key_press(&mut self, backend: &mut B, key: Key) -> SurfaceControl {
        match key {
            Key::Escape => {
                self.on_teardown_requested(backend);
                SurfaceControl::Close
            }
            _ => SurfaceControl::Continue,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use log::Level;

    use super::*;
    use crate::backend::SoftwareBackend;
    use crate::logging::MemorySink;
    use crate::object::ObjectStatus;
    use crate::shader::InMemoryShaders;

    fn scene(sink: &Arc<MemorySink>) -> SceneSurface<SoftwareBackend> {
        let diag = Diagnostics::new(sink.clone(), "test");
        SceneSurface::new(InMemoryShaders::with_defaults(), ObjectSettings::default(), &diag)
            .with_object(ObjectDesc::new("a", (0.0, 0.0, 0.0), Color::RED))
            .with_object(ObjectDesc::new("b", (0.1, 0.0, 0.0), Color::BLUE))
    }

    #[test]
    fn objects_are_built_only_on_context_ready() {
        let sink = Arc::new(MemorySink::new());
        let mut backend = SoftwareBackend::new(16, 16);
        let mut surface = scene(&sink);
        assert!(surface.objects().is_empty());
        assert!(!surface.is_context_ready());

        surface.on_context_ready(&mut backend);
        assert!(surface.is_context_ready());

        let names: Vec<&str> = surface.objects().iter().map(|o| o.name()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert!(surface.objects().iter().all(|o| o.is_initialized()));
        assert!(sink.contains(Level::Info, "VENDOR : prism"));
    }

    #[test]
    fn objects_pushed_after_context_ready_are_kept_but_not_built() {
        let sink = Arc::new(MemorySink::new());
        let mut backend = SoftwareBackend::new(16, 16);
        let mut surface = scene(&sink);
        surface.on_context_ready(&mut backend);

        surface.push_object(ObjectDesc::new("late", (0.0, 0.0, 0.0), Color::GREEN));

        assert_eq!(surface.descriptors().len(), 3);
        assert_eq!(surface.objects().len(), 2);
        assert!(sink.contains(Level::Warn, "late added after context creation"));
    }

    #[test]
    fn second_context_ready_does_not_duplicate_objects() {
        let sink = Arc::new(MemorySink::new());
        let mut backend = SoftwareBackend::new(16, 16);
        let mut surface = scene(&sink);

        surface.on_context_ready(&mut backend);
        let live = backend.live_resources();
        surface.on_context_ready(&mut backend);

        assert_eq!(surface.objects().len(), 2);
        assert_eq!(backend.live_resources(), live);
    }

    #[test]
    fn resize_is_forwarded_to_backend() {
        let sink = Arc::new(MemorySink::new());
        let mut backend = SoftwareBackend::new(16, 16);
        let mut surface = scene(&sink);

        surface.on_resize(&mut backend, 40, 30);

        assert_eq!(surface.viewport(), Some((40, 30)));
        assert_eq!(backend.size(), (40, 30));
    }

    #[test]
    fn escape_tears_down_and_closes() {
        let sink = Arc::new(MemorySink::new());
        let mut backend = SoftwareBackend::new(16, 16);
        let mut surface = scene(&sink);
        surface.on_context_ready(&mut backend);

        assert_eq!(
            surface.on_key_press(&mut backend, Key::Space),
            SurfaceControl::Continue
        );
        assert!(!surface.is_torn_down());

        assert_eq!(
            surface.on_key_press(&mut backend, Key::Escape),
            SurfaceControl::Close
        );
        assert!(surface.is_torn_down());
        assert!(surface
            .objects()
            .iter()
            .all(|o| o.status() == ObjectStatus::Destroyed));
        assert_eq!(backend.live_resources(), 0);
    }

    #[test]
    fn teardown_twice_is_harmless() {
        let sink = Arc::new(MemorySink::new());
        let mut backend = SoftwareBackend::new(16, 16);
        let mut surface = scene(&sink);
        surface.on_context_ready(&mut backend);

        surface.on_teardown_requested(&mut backend);
        backend.clear_log();
        surface.on_teardown_requested(&mut backend);

        assert!(backend.calls().is_empty());
    }
}
