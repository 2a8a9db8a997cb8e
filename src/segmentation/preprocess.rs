use super::scale::ScaleFactors;
use super::types::Mask;
use crate::error::{Error, Result};
use image::{imageops, GrayImage, Rgba, RgbImage, RgbaImage};
use ndarray::Array4;

/// Converts images to model input tensors and model output back to an alpha mask
pub struct Preprocessor {
    resize_filter: imageops::FilterType,
    mask_filter: imageops::FilterType,
}

impl Preprocessor {
    pub fn new(resize_filter: imageops::FilterType, mask_filter: imageops::FilterType) -> Self {
        Self {
            resize_filter,
            mask_filter,
        }
    }

    /// Resample the source image to the working resolution given by `factors`
    pub fn resize(&self, image: &RgbImage, factors: &ScaleFactors) -> RgbImage {
        let _span = tracing::debug_span!("resize").entered();

        let (width, height) = factors.working_size();
        if image.dimensions() == (width, height) {
            return image.clone();
        }

        imageops::resize(image, width, height, self.resize_filter)
    }

    /// Preprocess a working-resolution RGB image into a normalized NCHW tensor
    ///
    /// Each byte `v` becomes `(v - 127.5) / 127.5`. Channel planes are laid out
    /// one after another, so pixel (row, col) lands at `col + row * width` inside
    /// each plane.
    ///
    /// Returns: Array4<f32> with shape [1, 3, height, width]
    pub fn image_to_tensor(image: &RgbImage) -> Result<Array4<f32>> {
        let _span = tracing::debug_span!("preprocess").entered();

        let (width, height) = image.dimensions();
        let (width, height) = (width as usize, height as usize);
        let plane = width * height;

        let mut data = vec![0.0f32; 3 * plane];
        for (index, pixel) in image.as_raw().chunks_exact(3).enumerate() {
            data[index] = normalize(pixel[0]);
            data[index + plane] = normalize(pixel[1]);
            data[index + 2 * plane] = normalize(pixel[2]);
        }

        Array4::from_shape_vec((1, 3, height, width), data).map_err(|err| Error::ShapeMismatch {
            expected: format!("[1, 3, {height}, {width}]"),
            actual: err.to_string(),
        })
    }

    /// Decode the raw model output into a working-resolution mask
    ///
    /// The network emits values nominally in [0, 1]; they are scaled by 255 and
    /// kept unclamped.
    pub fn tensor_to_mask(output: &Array4<f32>, width: u32, height: u32) -> Result<Mask> {
        let expected = [1, 1, height as usize, width as usize];
        if output.shape() != expected {
            return Err(Error::ShapeMismatch {
                expected: format!("{expected:?}"),
                actual: format!("{:?}", output.shape()),
            });
        }

        let values = output.iter().map(|v| v * 255.0).collect();
        Mask::new(width, height, values)
    }

    /// Quantize the mask and resample it to the target (original) dimensions
    pub fn postprocess_mask(&self, mask: &Mask, target_width: u32, target_height: u32) -> GrayImage {
        let _span = tracing::debug_span!("postprocess").entered();

        let gray = mask.to_gray();
        if gray.dimensions() == (target_width, target_height) {
            return gray;
        }

        imageops::resize(&gray, target_width, target_height, self.mask_filter)
    }

    /// Join `alpha` onto `rgb` as a fourth channel
    pub fn join_alpha(rgb: &RgbImage, alpha: &GrayImage) -> Result<RgbaImage> {
        if rgb.dimensions() != alpha.dimensions() {
            return Err(Error::ShapeMismatch {
                expected: format!("{:?}", rgb.dimensions()),
                actual: format!("{:?}", alpha.dimensions()),
            });
        }

        let (width, height) = rgb.dimensions();
        let mut output = RgbaImage::new(width, height);
        for ((dst, src), a) in output.pixels_mut().zip(rgb.pixels()).zip(alpha.pixels()) {
            *dst = Rgba([src[0], src[1], src[2], a[0]]);
        }

        Ok(output)
    }
}

#[inline]
fn normalize(value: u8) -> f32 {
    (f32::from(value) - 127.5) / 127.5
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segmentation::scale::compute_scale_factors;
    use image::{Luma, Rgb};

    fn gradient(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x * 7) as u8, (y * 11) as u8, ((x + y) * 3) as u8])
        })
    }

    #[test]
    fn test_tensor_shape_and_length() {
        let image = gradient(64, 32);
        let tensor = Preprocessor::image_to_tensor(&image).unwrap();

        assert_eq!(tensor.shape(), &[1, 3, 32, 64]);
        assert_eq!(tensor.len(), 3 * 32 * 64);
    }

    #[test]
    fn test_planar_layout_matches_pixels() {
        let image = gradient(5, 3);
        let tensor = Preprocessor::image_to_tensor(&image).unwrap();
        let flat = tensor.as_slice().unwrap();
        let plane = 5 * 3;

        for row in 0..3u32 {
            for col in 0..5u32 {
                let pixel = image.get_pixel(col, row);
                let index = (col + row * 5) as usize;
                for channel in 0..3 {
                    assert_eq!(flat[index + channel * plane], normalize(pixel[channel]));
                    assert_eq!(
                        tensor[[0, channel, row as usize, col as usize]],
                        normalize(pixel[channel])
                    );
                }
            }
        }
    }

    #[test]
    fn test_normalization_range() {
        assert_eq!(normalize(0), -1.0);
        assert_eq!(normalize(255), 1.0);
        assert!(normalize(127) < 0.0 && normalize(128) > 0.0);
    }

    #[test]
    fn test_normalization_inverts_for_every_byte() {
        for v in 0..=255u8 {
            let restored = normalize(v) * 127.5 + 127.5;
            assert!((restored - f32::from(v)).abs() < 1e-3, "byte {v}");
        }
    }

    #[test]
    fn test_tensor_to_mask_scales_without_clamping() {
        let output = Array4::from_shape_vec((1, 1, 1, 4), vec![0.0, 0.5, 1.0, 1.25]).unwrap();
        let mask = Preprocessor::tensor_to_mask(&output, 4, 1).unwrap();

        assert_eq!(mask.values(), &[0.0, 127.5, 255.0, 318.75]);
    }

    #[test]
    fn test_tensor_to_mask_rejects_wrong_shape() {
        let output = Array4::<f32>::zeros((1, 1, 8, 8));
        let result = Preprocessor::tensor_to_mask(&output, 16, 8);

        assert!(matches!(result, Err(Error::ShapeMismatch { .. })));
    }

    #[test]
    fn test_resize_to_working_size() {
        let preprocessor = Preprocessor::new(
            imageops::FilterType::Lanczos3,
            imageops::FilterType::Lanczos3,
        );
        let image = gradient(1000, 500);
        let factors = compute_scale_factors(500, 1000, 512);

        assert_eq!(preprocessor.resize(&image, &factors).dimensions(), (992, 480));
    }

    #[test]
    fn test_postprocess_restores_original_size() {
        let preprocessor = Preprocessor::new(
            imageops::FilterType::Lanczos3,
            imageops::FilterType::Lanczos3,
        );
        let mask = Mask::new(32, 32, vec![255.0; 32 * 32]).unwrap();
        let alpha = preprocessor.postprocess_mask(&mask, 100, 70);

        assert_eq!(alpha.dimensions(), (100, 70));
        assert!(alpha.pixels().all(|p| p[0] == 255));
    }

    #[test]
    fn test_join_alpha_keeps_rgb() {
        let rgb = gradient(4, 4);
        let alpha = GrayImage::from_fn(4, 4, |x, _| Luma([(x * 60) as u8]));
        let rgba = Preprocessor::join_alpha(&rgb, &alpha).unwrap();

        for (x, y, pixel) in rgba.enumerate_pixels() {
            let src = rgb.get_pixel(x, y);
            assert_eq!(&pixel.0[..3], &src.0[..]);
            assert_eq!(pixel[3], alpha.get_pixel(x, y)[0]);
        }
    }

    #[test]
    fn test_join_alpha_rejects_mismatched_mask() {
        let rgb = gradient(4, 4);
        let alpha = GrayImage::new(4, 3);

        assert!(Preprocessor::join_alpha(&rgb, &alpha).is_err());
    }
}
