use std::path::PathBuf;

use anyhow::Result;

use prism_engine::backend::BackendOptions;
use prism_engine::device::GpuInit;
use prism_engine::logging::{init_logging, Diagnostics, LoggingConfig};
use prism_engine::object::{ObjectDesc, ObjectSettings};
use prism_engine::paint::Color;
use prism_engine::shader::ShaderDir;
use prism_engine::surface::SceneSurface;
use prism_engine::window::{Runtime, RuntimeConfig};

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let wireframe = flag("PRISM_WIREFRAME");
    let settings = ObjectSettings {
        strict: flag("PRISM_STRICT"),
        ..ObjectSettings::default()
    };

    let shader_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("shaders");
    log::info!("loading shaders from {}", shader_dir.display());

    let diag = Diagnostics::facade("prism-demo");
    let surface = SceneSurface::new(ShaderDir::new(shader_dir), settings, &diag)
        .with_object(ObjectDesc::new("Triangle_1", (-0.5, -0.5, 0.0), Color::RED))
        .with_object(ObjectDesc::new("Triangle_2", (0.5, 0.5, 0.0), Color::BLUE));

    let config = RuntimeConfig {
        title: "prism - triangles".to_string(),
        backend: BackendOptions { wireframe },
        ..RuntimeConfig::default()
    };

    let gpu_init = if wireframe {
        GpuInit::default().with_wireframe()
    } else {
        GpuInit::default()
    };

    Runtime::run(config, gpu_init, surface)
}

/// `1`/`true` enables an environment switch.
fn flag(name: &str) -> bool {
    matches!(
        std::env::var(name).as_deref(),
        Ok("1") | Ok("true") | Ok("TRUE")
    )
}
