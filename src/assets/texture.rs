use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum TextureError {
    #[error("failed to decode image {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: image::ImageError,
    },
    #[error("image {path} has no pixels")]
    Empty { path: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Texels {
    /// 8-bit RGBA, stored as authored (no color-space conversion).
    Rgba8(Vec<u8>),
    /// Linear 32-bit float RGBA, used for HDR environments.
    Rgba32F(Vec<f32>),
}

/// Decoded image ready for upload.
#[derive(Debug, Clone, PartialEq)]
pub struct Texture {
    pub width: u32,
    pub height: u32,
    pub texels: Texels,
}

impl Texture {
    pub fn is_hdr(&self) -> bool {
        matches!(self.texels, Texels::Rgba32F(_))
    }
}

/// Decodes an 8-bit image such as a normal map.
pub fn load_rgba8(path: &Path) -> Result<Texture, TextureError> {
    let image = open(path)?.into_rgba8();
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(TextureError::Empty {
            path: path.display().to_string(),
        });
    }
    Ok(Texture {
        width,
        height,
        texels: Texels::Rgba8(image.into_raw()),
    })
}

/// Decodes an equirectangular environment image (Radiance HDR, OpenEXR or any LDR format)
/// into linear float texels.
pub fn load_environment(path: &Path) -> Result<Texture, TextureError> {
    let image = open(path)?.into_rgba32f();
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(TextureError::Empty {
            path: path.display().to_string(),
        });
    }
    Ok(Texture {
        width,
        height,
        texels: Texels::Rgba32F(image.into_raw()),
    })
}

fn open(path: &Path) -> Result<image::DynamicImage, TextureError> {
    image::open(path).map_err(|source| TextureError::Decode {
        path: path.display().to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> std::path::PathBuf {
        let nonce = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("vitrine_{}_{}_{}", std::process::id(), nonce, name))
    }

    #[test]
    fn rgba8_png_decodes() {
        let path = temp_path("normal.png");
        let image = image::RgbaImage::from_pixel(2, 3, image::Rgba([128, 128, 255, 255]));
        image.save(&path).unwrap();

        let texture = load_rgba8(&path).unwrap();
        assert_eq!((texture.width, texture.height), (2, 3));
        assert!(!texture.is_hdr());
        match &texture.texels {
            Texels::Rgba8(bytes) => {
                assert_eq!(bytes.len(), 2 * 3 * 4);
                assert_eq!(&bytes[..4], &[128, 128, 255, 255]);
            }
            other => panic!("expected rgba8 texels, got {:?}", other),
        }
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn environment_decodes_to_float() {
        let path = temp_path("env.png");
        let image = image::RgbaImage::from_pixel(4, 2, image::Rgba([255, 0, 0, 255]));
        image.save(&path).unwrap();

        let texture = load_environment(&path).unwrap();
        assert!(texture.is_hdr());
        match &texture.texels {
            Texels::Rgba32F(values) => {
                assert_eq!(values.len(), 4 * 2 * 4);
                assert!((values[0] - 1.0).abs() < 1e-6);
            }
            other => panic!("expected float texels, got {:?}", other),
        }
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn missing_file_is_a_decode_error() {
        let err = load_rgba8(Path::new("definitely/not/here.png")).unwrap_err();
        assert!(matches!(err, TextureError::Decode { .. }));
    }
}
