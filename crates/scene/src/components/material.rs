use crate::graph::TextureId;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum AlphaMode {
    Opaque,
    Mask,
    Blend,
}

/// Which faces are rasterized.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Side {
    Front,
    Double,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum MagFilter {
    Nearest,
    Linear,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum MinFilter {
    Nearest,
    Linear,
    NearestMipmapNearest,
    LinearMipmapNearest,
    NearestMipmapLinear,
    LinearMipmapLinear,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Wrap {
    ClampToEdge,
    MirroredRepeat,
    Repeat,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Sampler {
    pub mag_filter: MagFilter,
    pub min_filter: MinFilter,
    pub wrap_s: Wrap,
    pub wrap_t: Wrap,
}

impl Default for Sampler {
    // glTF leaves filters to the implementation; these match what WebGL uses.
    fn default() -> Self {
        Self {
            mag_filter: MagFilter::Linear,
            min_filter: MinFilter::LinearMipmapLinear,
            wrap_s: Wrap::Repeat,
            wrap_t: Wrap::Repeat,
        }
    }
}

/// Decoded texels, tightly packed RGBA8 rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl TextureImage {
    /// `None` unless `rgba` holds exactly `width * height` texels.
    pub fn new(width: u32, height: u32, rgba: Vec<u8>) -> Option<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)?
            .checked_mul(4)?;
        (width > 0 && height > 0 && rgba.len() == expected).then_some(Self {
            width,
            height,
            rgba,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Texture {
    pub name: Option<String>,
    pub sampler: Sampler,
    pub generate_mipmaps: bool,
    /// `None` when the source image could not be decoded; the renderer then
    /// samples plain white.
    pub image: Option<TextureImage>,
    /// Bumped whenever the renderer must re-upload.
    pub version: u32,
}

impl Texture {
    pub fn new(name: Option<String>, sampler: Sampler, image: Option<TextureImage>) -> Self {
        Self {
            name,
            sampler,
            generate_mipmaps: true,
            image,
            version: 0,
        }
    }

    pub fn byte_size(&self) -> usize {
        self.image.as_ref().map_or(0, |i| i.rgba.len())
    }

    pub fn mark_dirty(&mut self) {
        self.version = self.version.wrapping_add(1);
    }
}

/// Renderer-facing appearance of a material, without bookkeeping fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Appearance {
    pub base_color: [f32; 4],
    pub base_color_texture: Option<TextureId>,
    pub roughness: f32,
    pub metalness: f32,
    pub emissive: [f32; 3],
    pub emissive_intensity: f32,
    pub opacity: f32,
    pub alpha_mode: AlphaMode,
    pub side: Side,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: Option<String>,
    pub appearance: Appearance,
    pub version: u32,
}

impl Material {
    pub fn new(name: Option<String>) -> Self {
        Self {
            name,
            appearance: Appearance {
                base_color: [1.0, 1.0, 1.0, 1.0],
                base_color_texture: None,
                roughness: 1.0,
                metalness: 1.0,
                emissive: [0.0, 0.0, 0.0],
                emissive_intensity: 1.0,
                opacity: 1.0,
                alpha_mode: AlphaMode::Opaque,
                side: Side::Front,
            },
            version: 0,
        }
    }

    pub fn mark_dirty(&mut self) {
        self.version = self.version.wrapping_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::TextureImage;

    #[test]
    fn image_size_must_match_dimensions() {
        assert!(TextureImage::new(2, 1, vec![0; 8]).is_some());
        assert!(TextureImage::new(2, 1, vec![0; 7]).is_none());
        assert!(TextureImage::new(0, 0, Vec::new()).is_none());
    }
}
