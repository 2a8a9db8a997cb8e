use std::path::Path;

use image::RgbImage;

use crate::error::{Error, Result};

/// Decode an image file into 8-bit RGB.
///
/// Any format the `image` crate can read is accepted; alpha and extra
/// precision in the source are discarded.
///
/// # Errors
///
/// Returns [`Error::ImageLoad`] if the file cannot be read or decoded.
pub fn load_rgb<P: AsRef<Path>>(path: P) -> Result<RgbImage> {
    let path = path.as_ref();

    let img = image::open(path).map_err(|source| Error::ImageLoad {
        path: path.to_path_buf(),
        source,
    })?;

    tracing::debug!(
        "Loaded {} ({}x{}, {:?})",
        path.display(),
        img.width(),
        img.height(),
        img.color()
    );

    Ok(img.to_rgb8())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, Rgba, RgbaImage};

    #[test]
    fn test_load_drops_alpha() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rgba.png");
        RgbaImage::from_pixel(6, 4, Rgba([10, 20, 30, 40]))
            .save(&path)
            .unwrap();

        let rgb = load_rgb(&path).unwrap();
        assert_eq!(rgb.dimensions(), (6, 4));
        assert_eq!(*rgb.get_pixel(3, 2), Rgb([10, 20, 30]));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_rgb(dir.path().join("missing.png"));

        assert!(matches!(result, Err(Error::ImageLoad { .. })));
    }

    #[test]
    fn test_load_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corrupt.png");
        std::fs::write(&path, b"not a png").unwrap();

        assert!(matches!(load_rgb(&path), Err(Error::ImageLoad { .. })));
    }
}
