use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::{GrayImage, ImageFormat, RgbaImage};

use crate::error::{Error, Result};

/// Encode an RGBA image to `path`.
///
/// The format follows the extension: png, tiff, webp, bmp or tga, png when
/// there is no extension. Other formats are refused because they either drop
/// the alpha channel (jpeg) or cap the image size (ico). The image is encoded
/// in memory and moved into place only once fully written, so a failed save
/// leaves any existing file untouched.
///
/// # Errors
///
/// Returns [`Error::UnsupportedFormat`] for formats without usable alpha,
/// [`Error::ImageSave`] if encoding fails, [`Error::Io`] if the write fails.
pub fn save_rgba<P: AsRef<Path>>(path: P, image: &RgbaImage) -> Result<()> {
    let path = path.as_ref();
    let bytes = encode_rgba(path, image)?;
    write_staged(&[(path, bytes.as_slice())])
}

/// Encode a grayscale image to `path`, format from the extension (png if none).
///
/// # Errors
///
/// Returns [`Error::ImageSave`] if the format is unknown or encoding fails.
pub fn save_gray<P: AsRef<Path>>(path: P, image: &GrayImage) -> Result<()> {
    let path = path.as_ref();
    let bytes = encode_gray(path, image)?;
    write_staged(&[(path, bytes.as_slice())])
}

pub(crate) fn encode_rgba(path: &Path, image: &RgbaImage) -> Result<Vec<u8>> {
    let format = alpha_format(path)?;

    let mut bytes = Cursor::new(Vec::new());
    image
        .write_to(&mut bytes, format)
        .map_err(|source| Error::ImageSave {
            path: path.to_path_buf(),
            source,
        })?;

    Ok(bytes.into_inner())
}

pub(crate) fn encode_gray(path: &Path, image: &GrayImage) -> Result<Vec<u8>> {
    let format = gray_format(path)?;

    let mut bytes = Cursor::new(Vec::new());
    image
        .write_to(&mut bytes, format)
        .map_err(|source| Error::ImageSave {
            path: path.to_path_buf(),
            source,
        })?;

    Ok(bytes.into_inner())
}

/// Format an RGBA image at `path` would be written in
pub(crate) fn alpha_format(path: &Path) -> Result<ImageFormat> {
    let Some(extension) = path.extension() else {
        return Ok(ImageFormat::Png);
    };

    match ImageFormat::from_extension(extension) {
        Some(
            format @ (ImageFormat::Png
            | ImageFormat::Tiff
            | ImageFormat::WebP
            | ImageFormat::Bmp
            | ImageFormat::Tga),
        ) => Ok(format),
        _ => Err(Error::UnsupportedFormat {
            path: path.to_path_buf(),
        }),
    }
}

/// Format a grayscale image at `path` would be written in
pub(crate) fn gray_format(path: &Path) -> Result<ImageFormat> {
    match path.extension() {
        None => Ok(ImageFormat::Png),
        Some(_) => ImageFormat::from_path(path).map_err(|source| Error::ImageSave {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Write every file to a sibling temp file, then rename them all into place.
///
/// No destination is touched until every temp file has been written.
pub(crate) fn write_staged(files: &[(&Path, &[u8])]) -> Result<()> {
    let staged: Vec<(PathBuf, &Path)> = files
        .iter()
        .map(|(path, _)| (partial_path(path), *path))
        .collect();

    let written = files
        .iter()
        .zip(&staged)
        .try_for_each(|((_, bytes), (temp, _))| fs::write(temp, bytes))
        .and_then(|()| {
            staged
                .iter()
                .try_for_each(|(temp, path)| fs::rename(temp, path))
        });

    if let Err(err) = written {
        for (temp, _) in &staged {
            let _ = fs::remove_file(temp);
        }
        return Err(err.into());
    }

    for (path, bytes) in files {
        tracing::debug!("Wrote {} bytes to {}", bytes.len(), path.display());
    }
    Ok(())
}

fn partial_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.partial"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_save_rgba_png_keeps_alpha() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.png");
        let image = RgbaImage::from_pixel(3, 2, Rgba([1, 2, 3, 128]));

        save_rgba(&path, &image).unwrap();

        let loaded = image::open(&path).unwrap().to_rgba8();
        assert_eq!(loaded, image);
        assert!(!dir.path().join(".out.png.partial").exists());
    }

    #[test]
    fn test_save_rgba_without_extension_is_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out");
        save_rgba(&path, &RgbaImage::new(2, 2)).unwrap();

        let bytes = fs::read(&path).unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Png);
    }

    #[test]
    fn test_save_rgba_bmp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.bmp");
        save_rgba(&path, &RgbaImage::from_pixel(2, 2, Rgba([9, 8, 7, 6]))).unwrap();

        let bytes = fs::read(&path).unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Bmp);
    }

    #[test]
    fn test_alpha_format_choices() {
        assert_eq!(alpha_format(Path::new("a.tga")).unwrap(), ImageFormat::Tga);
        assert_eq!(alpha_format(Path::new("a.TIFF")).unwrap(), ImageFormat::Tiff);
        assert!(alpha_format(Path::new("a.ico")).is_err());
        assert!(alpha_format(Path::new("a.jpeg")).is_err());
    }

    #[test]
    fn test_save_rgba_rejects_jpeg() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.jpg");
        let result = save_rgba(&path, &RgbaImage::new(2, 2));

        assert!(matches!(result, Err(Error::UnsupportedFormat { .. })));
        assert!(!path.exists());
    }

    #[test]
    fn test_failed_save_leaves_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.jpg");
        fs::write(&path, b"previous").unwrap();

        assert!(save_rgba(&path, &RgbaImage::new(2, 2)).is_err());
        assert_eq!(fs::read(&path).unwrap(), b"previous");
    }

    #[test]
    fn test_save_into_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.png");

        assert!(matches!(
            save_rgba(&path, &RgbaImage::new(2, 2)),
            Err(Error::Io(_))
        ));
    }

    #[test]
    fn test_staged_write_is_all_or_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.png");
        let bad = dir.path().join("missing").join("bad.png");

        let result = write_staged(&[(good.as_path(), &b"one"[..]), (bad.as_path(), &b"two"[..])]);

        assert!(matches!(result, Err(Error::Io(_))));
        assert!(!good.exists());
        assert!(!dir.path().join(".good.png.partial").exists());
    }

    #[test]
    fn test_save_gray() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("matte.png");
        let image = GrayImage::from_fn(4, 4, |x, y| image::Luma([(x * 4 + y) as u8]));

        save_gray(&path, &image).unwrap();
        assert_eq!(image::open(&path).unwrap().to_luma8(), image);
    }
}
