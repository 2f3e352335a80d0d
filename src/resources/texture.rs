//! Texture loading and creation

use std::path::Path;

use image::{DynamicImage, GenericImageView};

use crate::backend::{
    CubeFace, GraphicsDevice, TextureDescriptor, TextureFilter, TextureFormat, TextureId,
    TextureWrap,
};
use crate::error::{GraphicsError, GraphicsResult};

/// Loaded texture data
#[derive(Debug, Clone, PartialEq)]
pub struct TextureData {
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    /// Pixels, bottom row first, [`TextureFormat::upload_bytes_per_pixel`]
    /// bytes each.
    pub data: Vec<u8>,
    pub name: String,
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown")
        .to_string()
}

fn open_image(path: &Path) -> GraphicsResult<DynamicImage> {
    image::open(path).map_err(|e| {
        log::error!(target: "gl/textures", "failed to load {}: {e}", path.display());
        GraphicsError::ImageLoadFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        }
    })
}

/// Number of levels in a full mip chain for a `width` x `height` image.
pub fn mip_level_count(width: u32, height: u32) -> u32 {
    32 - width.max(height).max(1).leading_zeros()
}

impl TextureData {
    /// Load an 8-bit image from file, flipped so the first row is the
    /// bottom one.
    pub fn from_file<P: AsRef<Path>>(path: P) -> GraphicsResult<Self> {
        let path = path.as_ref();
        let img = open_image(path)?;
        Ok(Self::from_image(img.flipv(), &file_name(path)))
    }

    /// Load an image from encoded bytes, flipped like [`from_file`](Self::from_file).
    pub fn from_bytes(bytes: &[u8], name: &str) -> GraphicsResult<Self> {
        let img = image::load_from_memory(bytes).map_err(|e| GraphicsError::ImageLoadFailed {
            path: name.into(),
            reason: e.to_string(),
        })?;
        Ok(Self::from_image(img.flipv(), name))
    }

    /// Load a high dynamic range image as 3-channel float data.
    pub fn hdr_from_file<P: AsRef<Path>>(path: P) -> GraphicsResult<Self> {
        let path = path.as_ref();
        let img = open_image(path)?.flipv();
        let (width, height) = img.dimensions();
        let pixels = img.to_rgb32f().into_raw();

        Ok(Self {
            width,
            height,
            format: TextureFormat::Rgb16Float,
            data: bytemuck::cast_slice(&pixels).to_vec(),
            name: file_name(path),
        })
    }

    /// Load an 8-bit image from file as `format`, flipped like
    /// [`from_file`](Self::from_file).
    pub fn from_file_as<P: AsRef<Path>>(path: P, format: TextureFormat) -> GraphicsResult<Self> {
        let path = path.as_ref();
        let img = open_image(path)?.flipv();
        let (width, height) = img.dimensions();
        let data = match format {
            TextureFormat::R8Unorm => img.to_luma8().into_raw(),
            TextureFormat::Rgb8Unorm => img.to_rgb8().into_raw(),
            TextureFormat::Rgba8Unorm => img.to_rgba8().into_raw(),
            other => {
                return Err(GraphicsError::InvalidParameter(format!(
                    "{other:?} is not an 8-bit image format"
                )))
            }
        };

        Ok(Self {
            width,
            height,
            format,
            data,
            name: file_name(path),
        })
    }

    /// Keep single-channel and RGB images as they are; everything else
    /// becomes RGBA.
    fn from_image(img: DynamicImage, name: &str) -> Self {
        let (width, height) = img.dimensions();
        let (format, data) = match img.color().channel_count() {
            1 => (TextureFormat::R8Unorm, img.to_luma8().into_raw()),
            3 => (TextureFormat::Rgb8Unorm, img.to_rgb8().into_raw()),
            _ => (TextureFormat::Rgba8Unorm, img.to_rgba8().into_raw()),
        };

        Self {
            width,
            height,
            format,
            data,
            name: name.to_string(),
        }
    }

    /// Create a solid color texture
    pub fn solid_color(color: [u8; 4], name: &str) -> Self {
        Self {
            width: 1,
            height: 1,
            format: TextureFormat::Rgba8Unorm,
            data: color.to_vec(),
            name: name.to_string(),
        }
    }

    pub fn white() -> Self {
        Self::solid_color([255, 255, 255, 255], "white")
    }

    pub fn black() -> Self {
        Self::solid_color([0, 0, 0, 255], "black")
    }

    /// Flat tangent-space normal map
    pub fn default_normal() -> Self {
        Self::solid_color([128, 128, 255, 255], "default_normal")
    }

    /// Create a checkerboard texture with 8 pixel cells
    pub fn checkerboard(size: u32, color1: [u8; 4], color2: [u8; 4]) -> Self {
        let mut data = Vec::with_capacity((size * size * 4) as usize);

        for y in 0..size {
            for x in 0..size {
                let is_even = ((x / 8) + (y / 8)) % 2 == 0;
                let color = if is_even { color1 } else { color2 };
                data.extend_from_slice(&color);
            }
        }

        Self {
            width: size,
            height: size,
            format: TextureFormat::Rgba8Unorm,
            data,
            name: "checkerboard".to_string(),
        }
    }

    fn expected_len(&self) -> usize {
        (self.width * self.height * self.format.upload_bytes_per_pixel()) as usize
    }

    /// Upload as a repeating, trilinear filtered 2D texture with a full
    /// mip chain.
    pub fn upload(&self, device: &mut dyn GraphicsDevice) -> GraphicsResult<TextureId> {
        if self.data.len() != self.expected_len() {
            return Err(GraphicsError::InvalidParameter(format!(
                "texture {} has {} bytes, expected {}",
                self.name,
                self.data.len(),
                self.expected_len()
            )));
        }

        let desc = TextureDescriptor::new_2d(self.width, self.height, self.format)
            .with_label(self.name.clone())
            .with_mip_levels(mip_level_count(self.width, self.height))
            .with_filter(TextureFilter::LinearMipmapLinear, TextureFilter::Linear);
        let texture = device.create_texture(&desc)?;
        device.write_texture(texture, None, 0, &self.data);
        device.generate_mipmaps(texture);

        log::debug!(
            target: "gl/textures",
            "uploaded {} ({}x{}, {:?})",
            self.name,
            self.width,
            self.height,
            self.format
        );
        Ok(texture)
    }
}

/// Single-level, nearest filtered, edge clamped 2D texture to render into.
pub fn create_render_target(
    device: &mut dyn GraphicsDevice,
    label: &str,
    width: u32,
    height: u32,
    format: TextureFormat,
) -> GraphicsResult<TextureId> {
    let desc = TextureDescriptor::new_2d(width, height, format)
        .with_label(label)
        .with_filter(TextureFilter::Nearest, TextureFilter::Nearest)
        .with_wrap(TextureWrap::ClampToEdge);
    device.create_texture(&desc)
}

/// Depth render target.
pub fn create_depth_target(
    device: &mut dyn GraphicsDevice,
    label: &str,
    width: u32,
    height: u32,
) -> GraphicsResult<TextureId> {
    create_render_target(device, label, width, height, TextureFormat::Depth24Stencil8)
}

/// Linear filtered cubemap with `mip_levels` levels. With more than one
/// level, minification is trilinear.
pub fn create_cubemap(
    device: &mut dyn GraphicsDevice,
    label: &str,
    size: u32,
    format: TextureFormat,
    mip_levels: u32,
) -> GraphicsResult<TextureId> {
    let min_filter = if mip_levels > 1 {
        TextureFilter::LinearMipmapLinear
    } else {
        TextureFilter::Linear
    };
    let desc = TextureDescriptor::new_cube(size, format)
        .with_label(label)
        .with_mip_levels(mip_levels)
        .with_filter(min_filter, TextureFilter::Linear);
    device.create_texture(&desc)
}

/// Build a cubemap from six images, in [`CubeFace`] order. Face images are
/// not flipped.
pub fn load_cubemap<P: AsRef<Path>>(
    device: &mut dyn GraphicsDevice,
    label: &str,
    faces: [P; 6],
) -> GraphicsResult<TextureId> {
    let images = faces
        .iter()
        .map(|path| {
            let path = path.as_ref();
            Ok(TextureData::from_image(open_image(path)?.into_rgb8().into(), &file_name(path)))
        })
        .collect::<GraphicsResult<Vec<_>>>()?;

    let size = images[0].width;
    if let Some(bad) = images
        .iter()
        .find(|img| img.width != size || img.height != size)
    {
        return Err(GraphicsError::InvalidParameter(format!(
            "cubemap face {} is {}x{}, expected {size}x{size}",
            bad.name, bad.width, bad.height
        )));
    }

    let texture = create_cubemap(device, label, size, TextureFormat::Rgb8Unorm, 1)?;
    for (face, img) in CubeFace::ALL.into_iter().zip(&images) {
        device.write_texture(texture, Some(face), 0, &img.data);
    }
    Ok(texture)
}
