//! End-to-end portrait matting: decode, scale, infer, composite, encode.

use std::path::{Path, PathBuf};

use image::imageops::FilterType;
use image::{GrayImage, RgbImage, RgbaImage};

use crate::error::{Error, Result};
use crate::io;
use crate::segmentation::{
    compute_scale_factors, MattingModel, ModelHandle, Preprocessor, ScaleFactors,
};

/// Default reference size the network was tuned for.
pub const DEFAULT_REF_SIZE: u32 = 512;

/// Configuration for a matting run.
#[derive(Debug, Clone)]
pub struct MattingConfig {
    /// Reference size the working resolution is derived from.
    pub ref_size: u32,

    /// Kernel used to bring the source image to the working resolution.
    pub resize_filter: FilterType,

    /// Kernel used to bring the mask back to the source resolution.
    pub mask_filter: FilterType,

    /// ONNX Runtime intra-op threads, used when loading the model.
    pub intra_threads: usize,

    /// Also write the full-resolution alpha mask as a grayscale image.
    pub matte_output: Option<PathBuf>,
}

impl Default for MattingConfig {
    fn default() -> Self {
        Self {
            ref_size: DEFAULT_REF_SIZE,
            resize_filter: FilterType::Lanczos3,
            mask_filter: FilterType::Lanczos3,
            intra_threads: 4,
            matte_output: None,
        }
    }
}

impl MattingConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any parameter is out of valid range.
    pub fn validate(&self) -> Result<()> {
        if self.ref_size == 0 {
            return Err(Error::InvalidParameter {
                name: "ref_size".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }

        if self.intra_threads == 0 {
            return Err(Error::InvalidParameter {
                name: "intra_threads".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }

        Ok(())
    }
}

/// Result of matting one image in memory.
#[derive(Debug, Clone)]
pub struct Matted {
    /// Source pixels with the predicted alpha channel joined on.
    pub image: RgbaImage,
    /// Alpha mask at the source resolution.
    pub alpha: GrayImage,
    pub factors: ScaleFactors,
}

/// Matte an in-memory RGB image with `model`.
///
/// The network only ever sees a resized copy; the returned image keeps every
/// source pixel and takes just its alpha channel from the network.
///
/// # Errors
///
/// Returns an error if the working resolution collapses to zero, if inference
/// fails, or if the model output does not match the working resolution.
pub fn matte_image(
    image: &RgbImage,
    model: &mut dyn MattingModel,
    config: &MattingConfig,
) -> Result<Matted> {
    config.validate()?;

    let (width, height) = image.dimensions();
    let factors = compute_scale_factors(height, width, config.ref_size);
    let (work_width, work_height) = factors.working_size();
    tracing::debug!(
        "Scale factors x={:.4} y={:.4}, working size {}x{}",
        factors.x_scale,
        factors.y_scale,
        work_width,
        work_height
    );

    if work_width == 0 || work_height == 0 {
        return Err(Error::UnsupportedDimensions {
            width,
            height,
            reason: format!(
                "working size {work_width}x{work_height} for reference size {}",
                config.ref_size
            ),
        });
    }

    let preprocessor = Preprocessor::new(config.resize_filter, config.mask_filter);

    let resized = preprocessor.resize(image, &factors);
    let input = Preprocessor::image_to_tensor(&resized)?;

    tracing::debug!(
        "Running inference {} -> {}",
        model.input_name(),
        model.output_name()
    );
    let output = model.infer(input)?;

    let mask = Preprocessor::tensor_to_mask(&output, work_width, work_height)?;
    let alpha = preprocessor.postprocess_mask(&mask, width, height);
    let image = Preprocessor::join_alpha(image, &alpha)?;

    Ok(Matted {
        image,
        alpha,
        factors,
    })
}

/// Matte the image at `input_path` and write the RGBA result to `output_path`.
///
/// Output formats are checked before anything is decoded. Stages run one after
/// another on the blocking pool, and the output (plus the matte, when
/// configured) is encoded in memory and only moved into place once every
/// encode succeeded. A failed run writes nothing.
///
/// # Errors
///
/// Any stage failure aborts the run and is returned unchanged.
pub async fn run_matting(
    input_path: impl AsRef<Path>,
    model: &ModelHandle,
    output_path: impl AsRef<Path>,
    config: &MattingConfig,
) -> Result<()> {
    config.validate()?;

    let input_path = input_path.as_ref().to_path_buf();
    let output_path = output_path.as_ref().to_path_buf();
    let config = config.clone();

    io::alpha_format(&output_path)?;
    if let Some(matte_path) = &config.matte_output {
        io::gray_format(matte_path)?;
    }

    tracing::info!("Matting {}", input_path.display());

    let image = tokio::task::spawn_blocking(move || io::load_rgb(&input_path)).await??;

    let mut guard = model.acquire().await;
    let matted = tokio::task::spawn_blocking(move || {
        let matted = matte_image(&image, &mut **guard, &config)?;
        drop(guard);

        let output_bytes = io::encode_rgba(&output_path, &matted.image)?;
        match &config.matte_output {
            Some(matte_path) => {
                let matte_bytes = io::encode_gray(matte_path, &matted.alpha)?;
                io::write_staged(&[
                    (output_path.as_path(), output_bytes.as_slice()),
                    (matte_path.as_path(), matte_bytes.as_slice()),
                ])?;
                tracing::info!("Matte saved to {}", matte_path.display());
            }
            None => io::write_staged(&[(output_path.as_path(), output_bytes.as_slice())])?,
        }
        tracing::info!("Output saved to {}", output_path.display());

        Ok::<_, Error>(matted)
    })
    .await??;

    let (width, height) = matted.image.dimensions();
    tracing::debug!("Matting completed at {}x{}", width, height);

    Ok(())
}
