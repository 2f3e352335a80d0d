//! Vertex format registry.
//!
//! A fixed catalog of semantic vertex attributes. A shader opts into a
//! semantic by naming its input `in<Semantic>` (`inPosition`, `inUV`, ...);
//! [`resolve_attributes`] maps a linked program's active inputs back to
//! semantics and locations.

use crate::backend::{GraphicsDevice, ProgramId, VertexElementType};

/// Shader input names are the semantic name behind this prefix.
pub const INPUT_PREFIX: &str = "in";

/// Layout description of one semantic attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttribDesc {
    pub semantic: AttributeSemantic,
    pub element_type: VertexElementType,
    pub components: u32,
    pub normalized: bool,
    /// Canonical semantic name.
    pub name: &'static str,
    /// Required shader input name.
    pub input_name: &'static str,
}

impl AttribDesc {
    /// Size of one attribute value in bytes.
    pub fn byte_size(&self) -> u32 {
        self.element_type.size() * self.components
    }
}

macro_rules! attrib_table {
    ($($name:ident: $ty:ident x $count:literal $(, $norm:ident)?;)*) => {
        /// Semantic vertex attribute identity. The discriminant is the stable UID.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum AttributeSemantic {
            $($name,)*
        }

        /// The attribute catalog, indexed by [`AttributeSemantic::uid`].
        pub static ATTRIB_TABLE: &[AttribDesc] = &[
            $(AttribDesc {
                semantic: AttributeSemantic::$name,
                element_type: VertexElementType::$ty,
                components: $count,
                normalized: attrib_table!(@norm $($norm)?),
                name: stringify!($name),
                input_name: concat!("in", stringify!($name)),
            },)*
        ];
    };
    (@norm normalized) => { true };
    (@norm) => { false };
}

attrib_table! {
    Position: Float32 x 3;
    UV: Float32 x 2;
    UVLightmap: Float32 x 2;
    Normal: Float32 x 3;
    Tangent: Float32 x 3;
    Bitangent: Float32 x 3;
    BoneIndex4: Float32 x 4;
    BoneWeight4: Float32 x 4;
    ColorRGBA: Uint8 x 4, normalized;
    ColorRGB: Uint8 x 3, normalized;
    Velocity: Float32 x 3;
    TextUVLookup: Float32 x 1;
    ParticlePosition: Float32 x 4;
    ParticleData: Float32 x 4;
    ParticleScale: Float32 x 4;
    ParticleColorRGBA: Float32 x 4;
    ParticleSpriteData: Float32 x 4;
    ParticleSpriteUV: Float32 x 4;
    ParticleRotation: Float32 x 4;
    TrailInstanceData0: Float32 x 4;
}

impl AttributeSemantic {
    pub fn uid(self) -> u32 {
        self as u32
    }

    pub fn desc(self) -> &'static AttribDesc {
        &ATTRIB_TABLE[self as usize]
    }

    /// Look up a semantic by canonical name.
    pub fn from_name(name: &str) -> Option<Self> {
        ATTRIB_TABLE
            .iter()
            .find(|desc| desc.name == name)
            .map(|desc| desc.semantic)
    }

    /// Look up a semantic by its shader input name.
    pub fn from_input_name(input_name: &str) -> Option<Self> {
        ATTRIB_TABLE
            .iter()
            .find(|desc| desc.input_name == input_name)
            .map(|desc| desc.semantic)
    }
}

/// A program input matched to a semantic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedAttribute {
    pub semantic: AttributeSemantic,
    pub location: u32,
}

/// Match `program`'s active vertex inputs against the catalog.
///
/// Inputs that do not follow the `in<Semantic>` convention, or name an
/// unknown semantic, are skipped with a warning. Built-in `gl_` inputs are
/// skipped silently.
pub fn resolve_attributes(
    device: &dyn GraphicsDevice,
    program: ProgramId,
) -> Vec<ResolvedAttribute> {
    let mut resolved: Vec<ResolvedAttribute> = device
        .active_attributes(program)
        .into_iter()
        .filter_map(|attribute| {
            let name = attribute.name.as_str();
            if name.starts_with("gl_") {
                return None;
            }
            if name.len() <= INPUT_PREFIX.len() || !name.starts_with(INPUT_PREFIX) {
                log::warn!(
                    target: "gl/vfmt",
                    "vertex input {name} does not follow the {INPUT_PREFIX}<Semantic> naming, skipped"
                );
                return None;
            }
            let Some(semantic) = AttributeSemantic::from_input_name(name) else {
                log::warn!(target: "gl/vfmt", "vertex input {name} names no known semantic, skipped");
                return None;
            };
            log::trace!(target: "gl/vfmt", "vertex attribute {name}: {}", attribute.location);
            Some(ResolvedAttribute {
                semantic,
                location: attribute.location,
            })
        })
        .collect();
    resolved.sort_by_key(|attr| attr.location);
    resolved
}
