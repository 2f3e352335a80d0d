//! Image based lighting maps, rendered once at startup.
//!
//! The HDRI is projected onto an environment cubemap, which is then
//! convolved into a diffuse irradiance cubemap and a roughness-prefiltered
//! specular cubemap. The split-sum BRDF table is integrated into a 2D
//! lookup texture.

use glam::{Mat4, Vec3};

use crate::backend::{
    ClearFlags, CompareFunction, CubeFace, CullFace, FramebufferId, FramebufferStatus,
    FrontFace, GraphicsDevice, PrimitiveTopology, Rect, TextureFormat, TextureId, TextureTarget,
    UniformValue, VertexArrayId,
};
use crate::error::{GraphicsError, GraphicsResult};
use crate::framebuffer::{create_framebuffer, FramebufferDesc};
use crate::materials::{SamplerArray, SamplerSet};
use crate::mesh::{build_program_vertex_array, Mesh};
use crate::resources::{create_cubemap, create_render_target, mip_level_count, TextureData};
use crate::shader::{ShaderLoader, ShaderProgram};

use super::{PassState, RendererConfig, ScreenDraw};

const CUBE_VERTEX_COUNT: u32 = 36;

/// Projection shared by the six capture views.
pub fn capture_projection() -> Mat4 {
    Mat4::perspective_rh_gl(90f32.to_radians(), 1.0, 0.1, 10.0)
}

/// View matrices looking from the origin through each face, in
/// [`CubeFace`] order.
pub fn capture_views() -> [Mat4; 6] {
    let look = |dir: Vec3, up: Vec3| Mat4::look_at_rh(Vec3::ZERO, dir, up);
    [
        look(Vec3::X, Vec3::NEG_Y),
        look(Vec3::NEG_X, Vec3::NEG_Y),
        look(Vec3::Y, Vec3::Z),
        look(Vec3::NEG_Y, Vec3::NEG_Z),
        look(Vec3::Z, Vec3::NEG_Y),
        look(Vec3::NEG_Z, Vec3::NEG_Y),
    ]
}

/// Precomputed lighting textures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IblMaps {
    /// Source equirectangular image
    pub hdri: TextureId,
    /// HDRI projected onto a mipmapped cube
    pub environment: TextureId,
    pub irradiance: TextureId,
    /// Prefiltered specular, roughness increasing with the mip level
    pub specular: TextureId,
    pub brdf_lut: TextureId,
}

impl IblMaps {
    /// Render every map. Capture programs are loaded from the configured
    /// shader directory and deleted afterwards.
    pub fn precompute(
        device: &mut dyn GraphicsDevice,
        loader: &mut ShaderLoader,
        config: &RendererConfig,
        cube: &Mesh,
        screen: &Mesh,
    ) -> GraphicsResult<Self> {
        let settings = config.ibl;
        let hdri = load_hdri(device, config)?;

        let environment = create_cubemap(
            device,
            "environment",
            settings.environment_size,
            TextureFormat::Rgb16Float,
            mip_level_count(settings.environment_size, settings.environment_size),
        )?;
        let irradiance = create_cubemap(
            device,
            "irradiance",
            settings.irradiance_size,
            TextureFormat::Rgb16Float,
            1,
        )?;
        let specular = create_cubemap(
            device,
            "specular",
            settings.specular_size,
            TextureFormat::Rgb16Float,
            settings.specular_mip_levels.max(1),
        )?;
        let brdf_lut = create_render_target(
            device,
            "brdf_lut",
            settings.brdf_lut_size,
            settings.brdf_lut_size,
            TextureFormat::Rg16Float,
        )?;

        let maps = Self {
            hdri,
            environment,
            irradiance,
            specular,
            brdf_lut,
        };
        let capture = CubeCapture::new(device)?;
        let rendered = render_maps(device, loader, config, &capture, &maps, cube, screen);
        capture.destroy(device);

        if let Err(err) = rendered {
            log::error!(target: "renderer", "image based lighting precompute failed: {err}");
            maps.destroy(device);
            return Err(err);
        }

        log::info!(
            target: "renderer",
            "image based lighting ready: environment {}, irradiance {}, specular {}x{} mips, brdf {}",
            settings.environment_size,
            settings.irradiance_size,
            settings.specular_size,
            settings.specular_mip_levels,
            settings.brdf_lut_size
        );
        Ok(maps)
    }

    /// Catalog read by the capture programs.
    fn capture_inputs(&self) -> SamplerSet {
        SamplerSet::new()
            .with("Hdri", TextureTarget::Texture2D, self.hdri)
            .with("Environment", TextureTarget::Cube, self.environment)
    }

    /// Add every map to the frame catalog.
    pub fn add_to_sampler_set(&self, set: &mut SamplerSet) {
        set.set("Hdri", TextureTarget::Texture2D, self.hdri)
            .set("Environment", TextureTarget::Cube, self.environment)
            .set("Irradiance", TextureTarget::Cube, self.irradiance)
            .set("Specular", TextureTarget::Cube, self.specular)
            .set("BrdfLut", TextureTarget::Texture2D, self.brdf_lut);
    }

    pub fn destroy(self, device: &mut dyn GraphicsDevice) {
        for texture in [
            self.hdri,
            self.environment,
            self.irradiance,
            self.specular,
            self.brdf_lut,
        ] {
            device.delete_texture(texture);
        }
    }
}

fn render_maps(
    device: &mut dyn GraphicsDevice,
    loader: &mut ShaderLoader,
    config: &RendererConfig,
    capture: &CubeCapture,
    maps: &IblMaps,
    cube: &Mesh,
    screen: &Mesh,
) -> GraphicsResult<()> {
    let settings = config.ibl;
    let inputs = maps.capture_inputs();

    with_cube_program(device, loader, config, "hdri_to_cubemap.glsl", cube, |device, program, vao| {
        let samplers = SamplerArray::resolve(program, None, Some(&inputs));
        capture.render(device, program, vao, &samplers, maps.environment, settings.environment_size, 0)
    })?;
    device.generate_mipmaps(maps.environment);

    with_cube_program(device, loader, config, "convolute_cubemap.glsl", cube, |device, program, vao| {
        let samplers = SamplerArray::resolve(program, None, Some(&inputs));
        capture.render(device, program, vao, &samplers, maps.irradiance, settings.irradiance_size, 0)
    })?;

    with_cube_program(
        device,
        loader,
        config,
        "prefilter_convolute_cubemap.glsl",
        cube,
        |device, program, vao| {
            let samplers = SamplerArray::resolve(program, None, Some(&inputs));
            let levels = settings.specular_mip_levels.max(1);
            for level in 0..levels {
                let roughness = level as f32 / (levels - 1).max(1) as f32;
                device.set_uniform(program.handle(), "roughness", UniformValue::Float(roughness));
                capture.render(device, program, vao, &samplers, maps.specular, settings.specular_size, level)?;
            }
            Ok(())
        },
    )?;

    integrate_brdf(device, loader, config, screen, maps.brdf_lut, settings.brdf_lut_size)
}

fn load_hdri(device: &mut dyn GraphicsDevice, config: &RendererConfig) -> GraphicsResult<TextureId> {
    let data = match &config.environment_map {
        Some(path) => TextureData::hdr_from_file(path)?,
        None => {
            log::warn!(target: "gl/textures", "no environment map configured, using flat grey");
            TextureData {
                width: 1,
                height: 1,
                format: TextureFormat::Rgb16Float,
                data: bytemuck::cast_slice(&[0.5f32; 3]).to_vec(),
                name: "grey_environment".into(),
            }
        }
    };
    data.upload(device)
}

/// Load a capture program, build the cube's vertex array for it, run `f`,
/// then release both.
fn with_cube_program<F>(
    device: &mut dyn GraphicsDevice,
    loader: &mut ShaderLoader,
    config: &RendererConfig,
    name: &str,
    cube: &Mesh,
    f: F,
) -> GraphicsResult<()>
where
    F: FnOnce(&mut dyn GraphicsDevice, &ShaderProgram, VertexArrayId) -> GraphicsResult<()>,
{
    let program = loader.load(device, config.shader_path(name), None)?;
    let result = build_program_vertex_array(device, program.handle(), &cube.layout).and_then(|vao| {
        let result = f(device, &program, vao);
        device.delete_vertex_array(vao);
        result
    });
    program.destroy(device);
    result
}

fn integrate_brdf(
    device: &mut dyn GraphicsDevice,
    loader: &mut ShaderLoader,
    config: &RendererConfig,
    screen: &Mesh,
    target: TextureId,
    size: u32,
) -> GraphicsResult<()> {
    let outputs = FramebufferDesc::new("brdf_lut").color("outBrdf", target);
    let framebuffer = create_framebuffer(device, &outputs)?;
    let program = match loader.load(device, config.shader_path("integrate_brdf.glsl"), Some(&outputs)) {
        Ok(program) => program,
        Err(err) => {
            device.delete_framebuffer(framebuffer);
            return Err(err);
        }
    };

    let result = build_program_vertex_array(device, program.handle(), &screen.layout).map(|vao| {
        PassState::new(Rect::from_size(size, size)).apply(device);
        device.bind_framebuffer(framebuffer);
        device.clear(ClearFlags::COLOR, [0.0; 4], 1.0);
        ScreenDraw::new(program.handle(), vao, SamplerArray::default()).draw(device);
        device.bind_framebuffer(FramebufferId::NONE);
        device.delete_vertex_array(vao);
    });

    program.destroy(device);
    device.delete_framebuffer(framebuffer);
    result
}

/// Framebuffer with a single draw buffer, re-pointed at each cube face.
struct CubeCapture {
    framebuffer: FramebufferId,
    projection: Mat4,
    views: [Mat4; 6],
}

impl CubeCapture {
    fn new(device: &mut dyn GraphicsDevice) -> GraphicsResult<Self> {
        let framebuffer = device.create_framebuffer()?;
        device.set_draw_buffers(framebuffer, &[Some(0)]);
        Ok(Self {
            framebuffer,
            projection: capture_projection(),
            views: capture_views(),
        })
    }

    /// Draw the cube once per face of `target` at mip `level`.
    #[allow(clippy::too_many_arguments)]
    fn render(
        &self,
        device: &mut dyn GraphicsDevice,
        program: &ShaderProgram,
        vertex_array: VertexArrayId,
        samplers: &SamplerArray,
        target: TextureId,
        size: u32,
        level: u32,
    ) -> GraphicsResult<()> {
        let level_size = (size >> level).max(1);
        PassState::new(Rect::from_size(level_size, level_size))
            .with_depth(CompareFunction::LessEqual, true)
            .with_cull(CullFace::Back, FrontFace::Cw)
            .apply(device);

        let handle = program.handle();
        device.bind_framebuffer(self.framebuffer);
        device.bind_vertex_array(vertex_array);
        samplers.bind(device);
        device.use_program(handle);
        device.set_uniform(handle, "matProjection", UniformValue::Mat4(self.projection.to_cols_array_2d()));

        for (face, view) in CubeFace::ALL.into_iter().zip(self.views) {
            device.attach_color(self.framebuffer, 0, target, Some(face), level);
            if face == CubeFace::PositiveX {
                if let FramebufferStatus::Incomplete(reason) = device.framebuffer_status(self.framebuffer) {
                    device.bind_framebuffer(FramebufferId::NONE);
                    log::error!(target: "gl/fbo", "cube capture is incomplete: {reason}");
                    return Err(GraphicsError::FramebufferIncomplete(format!("cube capture: {reason}")));
                }
            }
            device.set_uniform(handle, "matView", UniformValue::Mat4(view.to_cols_array_2d()));
            device.clear(ClearFlags::COLOR | ClearFlags::DEPTH, [0.0; 4], 1.0);
            device.draw_arrays(PrimitiveTopology::Triangles, 0, CUBE_VERTEX_COUNT, None);
        }

        device.bind_framebuffer(FramebufferId::NONE);
        log::debug!(
            target: "renderer",
            "captured {} at level {level} ({level_size}x{level_size})",
            program.path().display()
        );
        Ok(())
    }

    fn destroy(self, device: &mut dyn GraphicsDevice) {
        device.delete_framebuffer(self.framebuffer);
    }
}
