//! Common types shared between devices

macro_rules! gpu_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
        pub struct $name(pub(crate) u32);

        impl $name {
            /// The null handle.
            pub const NONE: Self = Self(0);

            /// Wrap a raw API object name.
            pub const fn from_raw(raw: u32) -> Self {
                Self(raw)
            }

            pub const fn raw(self) -> u32 {
                self.0
            }

            pub const fn is_none(self) -> bool {
                self.0 == 0
            }
        }
    };
}

gpu_handle!(
    /// Handle to a compiled shader stage
    ShaderId
);
gpu_handle!(
    /// Handle to a linked program
    ProgramId
);
gpu_handle!(
    /// Handle to a texture. [`TextureId::NONE`] samples as black.
    TextureId
);
gpu_handle!(
    /// Handle to a GPU buffer
    BufferId
);
gpu_handle!(
    /// Handle to a framebuffer object. [`FramebufferId::NONE`] is the window.
    FramebufferId
);
gpu_handle!(
    /// Handle to a vertex array object
    VertexArrayId
);

/// Programmable pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    pub const ALL: [ShaderStage; 2] = [ShaderStage::Vertex, ShaderStage::Fragment];

    /// Line-leading token that opens this stage's section in a source file.
    pub fn marker(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "#vertex",
            ShaderStage::Fragment => "#fragment",
        }
    }

    pub fn from_marker(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|stage| stage.marker() == token)
    }
}

/// Texture binding target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureTarget {
    #[default]
    Texture2D,
    Texture2DArray,
    Texture3D,
    Cube,
}

/// Cubemap face, in API face order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CubeFace {
    PositiveX,
    NegativeX,
    PositiveY,
    NegativeY,
    PositiveZ,
    NegativeZ,
}

impl CubeFace {
    pub const ALL: [CubeFace; 6] = [
        CubeFace::PositiveX,
        CubeFace::NegativeX,
        CubeFace::PositiveY,
        CubeFace::NegativeY,
        CubeFace::PositiveZ,
        CubeFace::NegativeZ,
    ];

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Texture storage format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    R8Unorm,
    Rgb8Unorm,
    Rgba8Unorm,
    R16Float,
    Rg16Float,
    Rgb16Float,
    Rgb32Float,
    Depth24Stencil8,
}

impl TextureFormat {
    pub fn is_depth(&self) -> bool {
        matches!(self, TextureFormat::Depth24Stencil8)
    }

    /// Channel count of the pixel data uploaded for this format.
    pub fn channels(&self) -> u32 {
        match self {
            TextureFormat::R8Unorm | TextureFormat::R16Float => 1,
            TextureFormat::Rg16Float => 2,
            TextureFormat::Rgb8Unorm | TextureFormat::Rgb16Float | TextureFormat::Rgb32Float => 3,
            TextureFormat::Rgba8Unorm => 4,
            TextureFormat::Depth24Stencil8 => 1,
        }
    }

    /// Size of one uploaded pixel. Float formats upload `f32` channels.
    pub fn upload_bytes_per_pixel(&self) -> u32 {
        match self {
            TextureFormat::R8Unorm | TextureFormat::Rgb8Unorm | TextureFormat::Rgba8Unorm => {
                self.channels()
            }
            TextureFormat::Depth24Stencil8 => 4,
            _ => self.channels() * 4,
        }
    }
}

/// Texture filtering mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFilter {
    Nearest,
    Linear,
    LinearMipmapLinear,
}

/// Texture addressing mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureWrap {
    Repeat,
    ClampToEdge,
}

/// Texture descriptor
#[derive(Debug, Clone, PartialEq)]
pub struct TextureDescriptor {
    pub label: Option<String>,
    pub target: TextureTarget,
    pub width: u32,
    pub height: u32,
    pub mip_levels: u32,
    pub format: TextureFormat,
    pub min_filter: TextureFilter,
    pub mag_filter: TextureFilter,
    pub wrap: TextureWrap,
}

impl Default for TextureDescriptor {
    fn default() -> Self {
        Self {
            label: None,
            target: TextureTarget::Texture2D,
            width: 1,
            height: 1,
            mip_levels: 1,
            format: TextureFormat::Rgba8Unorm,
            min_filter: TextureFilter::Linear,
            mag_filter: TextureFilter::Linear,
            wrap: TextureWrap::Repeat,
        }
    }
}

impl TextureDescriptor {
    pub fn new_2d(width: u32, height: u32, format: TextureFormat) -> Self {
        Self {
            width,
            height,
            format,
            ..Default::default()
        }
    }

    pub fn new_cube(size: u32, format: TextureFormat) -> Self {
        Self {
            target: TextureTarget::Cube,
            width: size,
            height: size,
            format,
            wrap: TextureWrap::ClampToEdge,
            ..Default::default()
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_mip_levels(mut self, mip_levels: u32) -> Self {
        self.mip_levels = mip_levels.max(1);
        self
    }

    pub fn with_filter(mut self, min: TextureFilter, mag: TextureFilter) -> Self {
        self.min_filter = min;
        self.mag_filter = mag;
        self
    }

    pub fn with_wrap(mut self, wrap: TextureWrap) -> Self {
        self.wrap = wrap;
        self
    }

    /// Size of `level` along one axis.
    pub fn level_size(&self, level: u32) -> (u32, u32) {
        ((self.width >> level).max(1), (self.height >> level).max(1))
    }
}

/// Buffer binding kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferKind {
    Vertex,
    Index,
    Uniform,
}

/// Numeric type of one vertex attribute element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexElementType {
    Float32,
    Uint8,
}

impl VertexElementType {
    pub fn size(&self) -> u32 {
        match self {
            VertexElementType::Float32 => 4,
            VertexElementType::Uint8 => 1,
        }
    }
}

/// One attribute pointer of a vertex array
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttributeBinding {
    pub buffer: BufferId,
    pub element_type: VertexElementType,
    pub components: u32,
    pub normalized: bool,
    pub stride: u32,
    pub offset: u32,
}

/// Index element type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IndexFormat {
    Uint16,
    #[default]
    Uint32,
}

impl IndexFormat {
    pub fn size(&self) -> u32 {
        match self {
            IndexFormat::Uint16 => 2,
            IndexFormat::Uint32 => 4,
        }
    }
}

/// Primitive topology
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PrimitiveTopology {
    Points,
    Lines,
    LineStrip,
    #[default]
    Triangles,
    TriangleStrip,
}

/// Depth comparison function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareFunction {
    Never,
    Less,
    Equal,
    LessEqual,
    Greater,
    NotEqual,
    GreaterEqual,
    Always,
}

/// Blend factor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    Zero,
    One,
    SrcAlpha,
    OneMinusSrcAlpha,
}

/// Source/destination blend factors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlendState {
    pub src: BlendFactor,
    pub dst: BlendFactor,
}

impl BlendState {
    pub const ALPHA: Self = Self {
        src: BlendFactor::SrcAlpha,
        dst: BlendFactor::OneMinusSrcAlpha,
    };
    pub const ADDITIVE: Self = Self {
        src: BlendFactor::One,
        dst: BlendFactor::One,
    };
}

/// Which faces are culled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CullFace {
    Front,
    Back,
}

/// Winding of front-facing triangles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FrontFace {
    #[default]
    Ccw,
    Cw,
}

/// Buffers cleared by [`GraphicsDevice::clear`](super::GraphicsDevice::clear)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClearFlags(u32);

impl ClearFlags {
    pub const COLOR: Self = Self(1 << 0);
    pub const DEPTH: Self = Self(1 << 1);
    pub const STENCIL: Self = Self(1 << 2);
    pub const ALL: Self = Self(0b111);

    pub fn contains(&self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }
}

impl std::ops::BitOr for ClearFlags {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

/// Pixel rectangle, origin at the lower left
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub const fn from_size(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }
}

/// Result of a framebuffer completeness check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FramebufferStatus {
    Complete,
    Incomplete(String),
}

/// Kind of an active uniform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformKind {
    /// A texture sampler of the given target
    Sampler(TextureTarget),
    /// Any non-opaque uniform
    Value,
}

/// Value of a plain (non-block, non-sampler) uniform
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Float(f32),
    /// Column-major matrix
    Mat4([[f32; 4]; 4]),
}

/// Active uniform reported by program reflection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveUniform {
    pub name: String,
    pub kind: UniformKind,
}

/// Active vertex input reported by program reflection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveAttribute {
    pub name: String,
    pub location: u32,
}

/// Implementation limits queried once at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceLimits {
    pub max_draw_buffers: u32,
    pub max_texture_units: u32,
    pub max_vertex_attributes: u32,
    pub max_uniform_buffer_bindings: u32,
}

impl Default for DeviceLimits {
    fn default() -> Self {
        Self {
            max_draw_buffers: 8,
            max_texture_units: 16,
            max_vertex_attributes: 16,
            max_uniform_buffer_bindings: 36,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_handles() {
        assert!(TextureId::NONE.is_none());
        assert_eq!(TextureId::from_raw(7).raw(), 7);
        assert!(!TextureId::from_raw(7).is_none());
        assert_eq!(FramebufferId::default(), FramebufferId::NONE);
    }

    #[test]
    fn test_stage_markers() {
        assert_eq!(ShaderStage::from_marker("#vertex"), Some(ShaderStage::Vertex));
        assert_eq!(
            ShaderStage::from_marker("#fragment"),
            Some(ShaderStage::Fragment)
        );
        assert_eq!(ShaderStage::from_marker("#version"), None);
    }

    #[test]
    fn test_level_size() {
        let desc = TextureDescriptor::new_cube(128, TextureFormat::Rgb16Float).with_mip_levels(5);
        assert_eq!(desc.level_size(0), (128, 128));
        assert_eq!(desc.level_size(4), (8, 8));
        assert_eq!(desc.level_size(10), (1, 1));
    }

    #[test]
    fn test_clear_flags() {
        let flags = ClearFlags::COLOR | ClearFlags::DEPTH;
        assert!(flags.contains(ClearFlags::COLOR));
        assert!(!flags.contains(ClearFlags::STENCIL));
        assert!(ClearFlags::ALL.contains(flags));
    }
}
