//! Frame-sized render targets and the framebuffers built over them.

use crate::backend::{FramebufferId, GraphicsDevice, Rect, TextureFormat, TextureId, TextureTarget};
use crate::error::GraphicsResult;
use crate::framebuffer::{create_framebuffer, FramebufferDesc};
use crate::materials::SamplerSet;
use crate::resources::{create_depth_target, create_render_target};

/// G-buffer textures plus the lighting and final targets.
///
/// The four descriptors are the output contracts of the passes and are
/// passed to the shader loader when their programs are built.
#[derive(Debug, Clone)]
pub struct GBuffer {
    width: u32,
    height: u32,

    pub albedo: TextureId,
    pub normal: TextureId,
    pub world_pos: TextureId,
    pub roughness: TextureId,
    pub metallic: TextureId,
    pub emission: TextureId,
    pub lightness: TextureId,
    pub depth: TextureId,
    pub final_color: TextureId,

    pub geometry_outputs: FramebufferDesc,
    pub lighting_outputs: FramebufferDesc,
    pub compose_outputs: FramebufferDesc,
    pub skybox_outputs: FramebufferDesc,

    pub geometry_framebuffer: FramebufferId,
    pub lighting_framebuffer: FramebufferId,
    pub compose_framebuffer: FramebufferId,
    pub skybox_framebuffer: FramebufferId,
}

impl GBuffer {
    pub fn new(device: &mut dyn GraphicsDevice, width: u32, height: u32) -> GraphicsResult<Self> {
        let mut target = |label: &str, format| create_render_target(&mut *device, label, width, height, format);
        let albedo = target("gbuffer_albedo", TextureFormat::Rgb8Unorm)?;
        let normal = target("gbuffer_normal", TextureFormat::Rgb8Unorm)?;
        let world_pos = target("gbuffer_worldpos", TextureFormat::Rgb32Float)?;
        let roughness = target("gbuffer_roughness", TextureFormat::R8Unorm)?;
        let metallic = target("gbuffer_metallic", TextureFormat::R8Unorm)?;
        let emission = target("gbuffer_emission", TextureFormat::Rgb8Unorm)?;
        let lightness = target("gbuffer_lightness", TextureFormat::Rgb32Float)?;
        let final_color = target("final", TextureFormat::Rgb8Unorm)?;
        let depth = create_depth_target(device, "gbuffer_depth", width, height)?;

        let geometry_outputs = FramebufferDesc::new("geometry")
            .color("outAlbedo", albedo)
            .color("outNormal", normal)
            .color("outWorldPos", world_pos)
            .color("outRoughness", roughness)
            .color("outMetallic", metallic)
            .color("outEmission", emission)
            .color("outLightness", lightness)
            .depth(depth);
        let lighting_outputs = FramebufferDesc::new("lighting").color("outLightness", lightness);
        let compose_outputs = FramebufferDesc::new("compose").color("outFinal", final_color);
        let skybox_outputs = FramebufferDesc::new("skybox")
            .color("outFinal", final_color)
            .depth(depth);

        let geometry_framebuffer = create_framebuffer(device, &geometry_outputs)?;
        let lighting_framebuffer = create_framebuffer(device, &lighting_outputs)?;
        let compose_framebuffer = create_framebuffer(device, &compose_outputs)?;
        let skybox_framebuffer = create_framebuffer(device, &skybox_outputs)?;

        log::info!(target: "renderer", "G-buffer created at {width}x{height}");

        Ok(Self {
            width,
            height,
            albedo,
            normal,
            world_pos,
            roughness,
            metallic,
            emission,
            lightness,
            depth,
            final_color,
            geometry_outputs,
            lighting_outputs,
            compose_outputs,
            skybox_outputs,
            geometry_framebuffer,
            lighting_framebuffer,
            compose_framebuffer,
            skybox_framebuffer,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Full render target area.
    pub fn rect(&self) -> Rect {
        Rect::from_size(self.width, self.height)
    }

    fn textures(&self) -> [(&'static str, TextureId); 9] {
        [
            ("Albedo", self.albedo),
            ("Normal", self.normal),
            ("WorldPos", self.world_pos),
            ("Roughness", self.roughness),
            ("Metallic", self.metallic),
            ("Emission", self.emission),
            ("Lightness", self.lightness),
            ("Depth", self.depth),
            ("Final", self.final_color),
        ]
    }

    /// Add every target to the frame catalog under its bare name.
    pub fn add_to_sampler_set(&self, set: &mut SamplerSet) {
        for (name, texture) in self.textures() {
            set.set(name, TextureTarget::Texture2D, texture);
        }
    }

    pub fn destroy(self, device: &mut dyn GraphicsDevice) {
        for framebuffer in [
            self.geometry_framebuffer,
            self.lighting_framebuffer,
            self.compose_framebuffer,
            self.skybox_framebuffer,
        ] {
            device.delete_framebuffer(framebuffer);
        }
        for (_, texture) in self.textures() {
            device.delete_texture(texture);
        }
    }
}
