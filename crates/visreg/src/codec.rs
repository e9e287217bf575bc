//! PNG decoding and encoding between disk and [`RasterImage`].

use crate::raster::RasterImage;
use crate::result::{VisregError, VisregResult};
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, ImageFormat};
use std::io;
use std::path::Path;
use tracing::debug;

/// Decode PNG bytes; `path` only labels errors
pub fn decode_bytes(bytes: &[u8], path: &Path) -> VisregResult<RasterImage> {
    let img = image::load_from_memory_with_format(bytes, ImageFormat::Png).map_err(|e| {
        VisregError::Decode {
            path: path.to_path_buf(),
            message: e.to_string(),
        }
    })?;
    Ok(RasterImage::from(img.to_rgba8()))
}

/// Encode a raster as PNG bytes
pub fn encode_bytes(raster: &RasterImage) -> VisregResult<Vec<u8>> {
    let mut buffer = Vec::new();
    PngEncoder::new(&mut buffer)
        .write_image(
            raster.as_bytes(),
            raster.width(),
            raster.height(),
            ExtendedColorType::Rgba8,
        )
        .map_err(|e| VisregError::Encode {
            message: e.to_string(),
        })?;
    Ok(buffer)
}

/// Read and decode the PNG at `path`
///
/// A missing file is [`VisregError::NotFound`] naming the path, never an
/// empty image.
pub async fn decode(path: &Path) -> VisregResult<RasterImage> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(VisregError::NotFound {
                path: path.to_path_buf(),
            })
        }
        Err(e) => return Err(VisregError::Io(e)),
    };
    let raster = decode_bytes(&bytes, path)?;
    debug!(path = %path.display(), width = raster.width(), height = raster.height(), "decoded image");
    Ok(raster)
}

/// Create `dir` and its ancestors
pub async fn ensure_dir(dir: &Path) -> VisregResult<()> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|source| VisregError::DirectoryCreate {
            path: dir.to_path_buf(),
            source,
        })
}

/// Encode `raster` and write it to `path`, creating parent directories first
pub async fn encode(raster: &RasterImage, path: &Path) -> VisregResult<()> {
    let bytes = encode_bytes(raster)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        ensure_dir(parent).await?;
    }
    tokio::fs::write(path, bytes)
        .await
        .map_err(|source| VisregError::FileWrite {
            path: path.to_path_buf(),
            source,
        })?;
    debug!(path = %path.display(), "wrote image");
    Ok(())
}
