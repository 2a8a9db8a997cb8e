use crate::error::{Error, Result};
use image::{GrayImage, Luma};
use ndarray::Array4;

/// Alpha mask decoded from the network output, in 8-bit intensity units.
///
/// Values are not saturated: anything the network produced outside [0, 1]
/// shows up here outside [0, 255].
#[derive(Debug, Clone, PartialEq)]
pub struct Mask {
    width: u32,
    height: u32,
    values: Vec<f32>,
}

impl Mask {
    /// `values` are row-major and must hold `width * height` entries
    pub fn new(width: u32, height: u32, values: Vec<f32>) -> Result<Self> {
        let expected = width as usize * height as usize;
        if values.len() != expected {
            return Err(Error::ShapeMismatch {
                expected: format!("{expected} mask values for {width}x{height}"),
                actual: format!("{} values", values.len()),
            });
        }

        Ok(Self {
            width,
            height,
            values,
        })
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Quantize to a grayscale image, saturating to [0, 255]
    pub fn to_gray(&self) -> GrayImage {
        GrayImage::from_fn(self.width, self.height, |x, y| {
            let idx = (y * self.width + x) as usize;
            Luma([self.values[idx].clamp(0.0, 255.0) as u8])
        })
    }
}

/// Inference capability consumed by the matting pipeline
///
/// Implementations take a `[1, 3, H, W]` tensor normalized to [-1, 1] and
/// return the `[1, 1, H, W]` matte with values nominally in [0, 1].
pub trait MattingModel: Send {
    /// Name of the tensor the model is fed with
    fn input_name(&self) -> &str;

    /// Name of the tensor holding the matte
    fn output_name(&self) -> &str;

    /// Run one forward pass
    fn infer(&mut self, input: Array4<f32>) -> Result<Array4<f32>>;
}
