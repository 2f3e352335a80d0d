//! Sampler catalogs and per-program sampler resolution.
//!
//! Shaders name their samplers after the catalog that feeds them:
//! `materialAlbedo` reads `Albedo` from the material [`SamplerSet`],
//! `frameBrdfLut` reads `BrdfLut` from the frame [`SamplerSet`]. Resolving a
//! program against its catalogs yields a [`SamplerArray`] whose entry `i`
//! is bound to texture unit `i` at draw time.

use std::collections::BTreeMap;

use crate::backend::{GraphicsDevice, TextureId, TextureTarget};
use crate::shader::ShaderProgram;

/// Name prefix of samplers read from the material catalog.
pub const MATERIAL_PREFIX: &str = "material";
/// Name prefix of samplers read from the frame catalog.
pub const FRAME_PREFIX: &str = "frame";

/// A texture and the target it binds to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureBinding {
    pub target: TextureTarget,
    pub texture: TextureId,
}

impl TextureBinding {
    /// Binding used for anything that cannot be resolved. Samples as black.
    pub const NEUTRAL: Self = Self {
        target: TextureTarget::Texture2D,
        texture: TextureId::NONE,
    };

    pub const fn new(target: TextureTarget, texture: TextureId) -> Self {
        Self { target, texture }
    }
}

impl Default for TextureBinding {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

/// Catalog of textures by bare name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SamplerSet {
    textures: BTreeMap<String, TextureBinding>,
}

impl SamplerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an entry.
    pub fn set(&mut self, name: impl Into<String>, target: TextureTarget, texture: TextureId) -> &mut Self {
        self.textures
            .insert(name.into(), TextureBinding::new(target, texture));
        self
    }

    /// Builder form of [`set`](Self::set).
    pub fn with(mut self, name: impl Into<String>, target: TextureTarget, texture: TextureId) -> Self {
        self.set(name, target, texture);
        self
    }

    pub fn get(&self, name: &str) -> Option<TextureBinding> {
        self.textures.get(name).copied()
    }

    pub fn remove(&mut self, name: &str) -> Option<TextureBinding> {
        self.textures.remove(name)
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, TextureBinding)> {
        self.textures.iter().map(|(name, binding)| (name.as_str(), *binding))
    }
}

/// Which catalog a sampler name reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplerSource<'a> {
    /// Bare name in the material catalog.
    Material(&'a str),
    /// Bare name in the frame catalog.
    Frame(&'a str),
    Unknown,
}

impl<'a> SamplerSource<'a> {
    pub fn classify(sampler_name: &'a str) -> Self {
        let bare = |prefix: &str| {
            sampler_name
                .strip_prefix(prefix)
                .filter(|rest| !rest.is_empty())
        };
        if let Some(name) = bare(MATERIAL_PREFIX) {
            SamplerSource::Material(name)
        } else if let Some(name) = bare(FRAME_PREFIX) {
            SamplerSource::Frame(name)
        } else {
            SamplerSource::Unknown
        }
    }

    /// Look the name up in the catalogs, falling back to
    /// [`TextureBinding::NEUTRAL`].
    pub fn resolve(self, material: Option<&SamplerSet>, frame: Option<&SamplerSet>) -> TextureBinding {
        let (catalog, bare, kind) = match self {
            SamplerSource::Material(bare) => (material, bare, "material"),
            SamplerSource::Frame(bare) => (frame, bare, "frame"),
            SamplerSource::Unknown => return TextureBinding::NEUTRAL,
        };
        match catalog {
            Some(set) => set.get(bare).unwrap_or_else(|| {
                log::warn!(target: "gl/sampler_set", "{kind} sampler set does not provide '{bare}'");
                TextureBinding::NEUTRAL
            }),
            None => {
                log::debug!(target: "gl/sampler_set", "no {kind} sampler set for '{bare}'");
                TextureBinding::NEUTRAL
            }
        }
    }
}

/// Texture bindings of one program, aligned with its sampler order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SamplerArray {
    bindings: Vec<TextureBinding>,
}

impl SamplerArray {
    /// Resolve every sampler of `program`. Always yields exactly
    /// `program.sampler_count()` entries.
    pub fn resolve(
        program: &ShaderProgram,
        material: Option<&SamplerSet>,
        frame: Option<&SamplerSet>,
    ) -> Self {
        let bindings = program
            .sampler_names()
            .iter()
            .map(|name| match SamplerSource::classify(name) {
                SamplerSource::Unknown => {
                    log::warn!(
                        target: "gl/sampler_set",
                        "sampler '{name}' has no {MATERIAL_PREFIX}/{FRAME_PREFIX} prefix, bound to nothing"
                    );
                    TextureBinding::NEUTRAL
                }
                source => source.resolve(material, frame),
            })
            .collect();
        Self { bindings }
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<TextureBinding> {
        self.bindings.get(index).copied()
    }

    pub fn as_slice(&self) -> &[TextureBinding] {
        &self.bindings
    }

    /// Bind entry `i` to texture unit `i`.
    pub fn bind(&self, device: &mut dyn GraphicsDevice) {
        for (unit, binding) in self.bindings.iter().enumerate() {
            device.bind_texture(unit as u32, binding.target, binding.texture);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::material("materialDiffuse", SamplerSource::Material("Diffuse"))]
    #[case::frame("frameBrdfLut", SamplerSource::Frame("BrdfLut"))]
    #[case::bare_prefix("material", SamplerSource::Unknown)]
    #[case::unknown("gAlbedo", SamplerSource::Unknown)]
    #[case::case_sensitive("MaterialAlbedo", SamplerSource::Unknown)]
    fn test_classify(#[case] name: &str, #[case] expected: SamplerSource<'static>) {
        assert_eq!(SamplerSource::classify(name), expected);
    }

    #[test]
    fn test_resolve_hit_and_miss() {
        let material = SamplerSet::new().with("Diffuse", TextureTarget::Texture2D, TextureId::from_raw(7));
        let frame = SamplerSet::new().with("Environment", TextureTarget::Cube, TextureId::from_raw(3));

        assert_eq!(
            SamplerSource::Material("Diffuse").resolve(Some(&material), Some(&frame)),
            TextureBinding::new(TextureTarget::Texture2D, TextureId::from_raw(7))
        );
        assert_eq!(
            SamplerSource::Frame("Environment").resolve(Some(&material), Some(&frame)),
            TextureBinding::new(TextureTarget::Cube, TextureId::from_raw(3))
        );
        // catalogs are not interchangeable
        assert_eq!(
            SamplerSource::Frame("Diffuse").resolve(Some(&material), Some(&frame)),
            TextureBinding::NEUTRAL
        );
        assert_eq!(
            SamplerSource::Material("Diffuse").resolve(None, Some(&frame)),
            TextureBinding::NEUTRAL
        );
    }

    #[test]
    fn test_sampler_set_replace() {
        let mut set = SamplerSet::new();
        set.set("Albedo", TextureTarget::Texture2D, TextureId::from_raw(1))
            .set("Albedo", TextureTarget::Texture2D, TextureId::from_raw(2));
        assert_eq!(set.len(), 1);
        assert_eq!(set.get("Albedo").unwrap().texture, TextureId::from_raw(2));
        assert!(set.remove("Albedo").is_some());
        assert!(set.is_empty());
    }

    #[test]
    fn test_neutral_default() {
        assert_eq!(TextureBinding::default(), TextureBinding::NEUTRAL);
        assert!(TextureBinding::NEUTRAL.texture.is_none());
    }
}
