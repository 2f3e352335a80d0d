//! Materials and sampler catalogs.

pub mod samplers;

use std::path::Path;

use crate::backend::{GraphicsDevice, TextureFormat, TextureId, TextureTarget};
use crate::error::GraphicsResult;
use crate::resources::TextureData;

pub use samplers::{
    SamplerArray, SamplerSet, SamplerSource, TextureBinding, FRAME_PREFIX, MATERIAL_PREFIX,
};

/// Image paths of a PBR material. Only albedo, normal and roughness are
/// required.
#[derive(Debug, Clone, Copy)]
pub struct PbrTexturePaths<'a> {
    pub albedo: &'a Path,
    pub normal: &'a Path,
    pub roughness: &'a Path,
    pub metallic: Option<&'a Path>,
    pub ambient_occlusion: Option<&'a Path>,
    pub emission: Option<&'a Path>,
}

/// Textures of a PBR material. Optional maps are [`TextureId::NONE`] when
/// absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PbrTextureSet {
    pub albedo: TextureId,
    pub normal: TextureId,
    pub roughness: TextureId,
    pub metallic: TextureId,
    pub ambient_occlusion: TextureId,
    pub emission: TextureId,
}

impl PbrTextureSet {
    /// Catalog names, in field order.
    pub const NAMES: [&'static str; 6] = [
        "Albedo",
        "Normal",
        "Roughness",
        "Metallic",
        "AmbientOcclusion",
        "Emission",
    ];

    pub fn load(device: &mut dyn GraphicsDevice, paths: &PbrTexturePaths<'_>) -> GraphicsResult<Self> {
        let mut load = |path: Option<&Path>, format| -> GraphicsResult<TextureId> {
            match path {
                Some(path) => TextureData::from_file_as(path, format)?.upload(device),
                None => Ok(TextureId::NONE),
            }
        };

        Ok(Self {
            albedo: load(Some(paths.albedo), TextureFormat::Rgba8Unorm)?,
            normal: load(Some(paths.normal), TextureFormat::Rgb8Unorm)?,
            roughness: load(Some(paths.roughness), TextureFormat::R8Unorm)?,
            metallic: load(paths.metallic, TextureFormat::R8Unorm)?,
            ambient_occlusion: load(paths.ambient_occlusion, TextureFormat::R8Unorm)?,
            emission: load(paths.emission, TextureFormat::Rgb8Unorm)?,
        })
    }

    fn textures(&self) -> [TextureId; 6] {
        [
            self.albedo,
            self.normal,
            self.roughness,
            self.metallic,
            self.ambient_occlusion,
            self.emission,
        ]
    }

    /// Material catalog with one 2D entry per loaded map.
    pub fn to_sampler_set(&self) -> SamplerSet {
        let mut set = SamplerSet::new();
        for (name, texture) in Self::NAMES.into_iter().zip(self.textures()) {
            if !texture.is_none() {
                set.set(name, TextureTarget::Texture2D, texture);
            }
        }
        set
    }

    pub fn destroy(self, device: &mut dyn GraphicsDevice) {
        for texture in self.textures() {
            if !texture.is_none() {
                device.delete_texture(texture);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sampler_set_skips_missing_maps() {
        let set = PbrTextureSet {
            albedo: TextureId::from_raw(1),
            normal: TextureId::from_raw(2),
            roughness: TextureId::from_raw(3),
            ..Default::default()
        }
        .to_sampler_set();

        assert_eq!(set.len(), 3);
        assert_eq!(set.get("Normal").unwrap().texture, TextureId::from_raw(2));
        assert!(set.get("Metallic").is_none());
    }

    #[test]
    fn test_load_missing_required_map_fails() {
        let mut device = crate::backend::DummyDevice::new();
        let paths = PbrTexturePaths {
            albedo: Path::new("/missing/albedo.png"),
            normal: Path::new("/missing/normal.png"),
            roughness: Path::new("/missing/roughness.png"),
            metallic: None,
            ambient_occlusion: None,
            emission: None,
        };
        assert!(PbrTextureSet::load(&mut device, &paths).is_err());
    }
}
