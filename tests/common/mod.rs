//! Shared fixtures for the integration tests.
//!
//! Everything runs on the [`DummyDevice`], with shader sources served from
//! memory so tests can edit them between loads.

use std::path::{Path, PathBuf};

use redlilium_deferred::pipeline::IblSettings;
use redlilium_deferred::{DeferredRenderer, DummyDevice, MemoryFileSource, RendererConfig};

/// Directory the shipped shaders are mounted at in memory.
pub const SHADER_ROOT: &str = "/shaders";

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn shipped_shader_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("shaders")
}

/// Copy the `shaders/` tree of this crate into memory under [`SHADER_ROOT`].
#[allow(dead_code)]
pub fn shipped_shaders() -> MemoryFileSource {
    let files = MemoryFileSource::new();
    let root = shipped_shader_dir();
    let mut pending = vec![root.clone()];
    while let Some(dir) = pending.pop() {
        for entry in std::fs::read_dir(&dir).expect("shader directory is readable") {
            let path = entry.expect("directory entry").path();
            if path.is_dir() {
                pending.push(path);
                continue;
            }
            let relative = path.strip_prefix(&root).expect("path under shader root");
            let source = std::fs::read_to_string(&path).expect("shader source is UTF-8");
            files.insert(Path::new(SHADER_ROOT).join(relative), source);
        }
    }
    files
}

/// Small targets and lighting maps so frame setup stays cheap.
#[allow(dead_code)]
pub fn small_config() -> RendererConfig {
    RendererConfig::default()
        .with_size(300, 150)
        .with_shader_dir(SHADER_ROOT)
        .with_ibl(IblSettings {
            environment_size: 16,
            irradiance_size: 4,
            specular_size: 8,
            specular_mip_levels: 3,
            brdf_lut_size: 8,
        })
}

#[allow(dead_code)]
pub fn renderer(files: &MemoryFileSource, config: RendererConfig) -> DeferredRenderer<DummyDevice> {
    init_logging();
    DeferredRenderer::new(DummyDevice::new(), files.clone(), config)
        .expect("renderer builds from the shipped shaders")
}
