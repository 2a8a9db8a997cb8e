/// Spatial dimensions of the network input must be multiples of this.
pub const SIZE_MULTIPLE: u32 = 32;

/// Ratio between the working resolution and the source resolution.
///
/// The working size is kept alongside the factors so the resize target is exact
/// instead of being recovered through `floor(dim * scale)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleFactors {
    pub x_scale: f64,
    pub y_scale: f64,
    target_width: u32,
    target_height: u32,
}

impl ScaleFactors {
    /// Working resolution as (width, height)
    pub fn working_size(&self) -> (u32, u32) {
        (self.target_width, self.target_height)
    }
}

/// Compute the scale factors that bring a `height` x `width` image to the
/// network's working resolution for reference size `ref_size`.
///
/// Images smaller than `ref_size` on both axes are upscaled to `ref_size` high,
/// images larger on both axes are downscaled to `ref_size` wide, anything in
/// between keeps its size. Whichever branch is taken, both target dimensions are
/// then truncated to a multiple of 32, which may leave a dimension at 0.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn compute_scale_factors(height: u32, width: u32, ref_size: u32) -> ScaleFactors {
    let aspect = f64::from(width) / f64::from(height);

    let (mut target_height, mut target_width) = if height.max(width) < ref_size {
        (ref_size, (f64::from(ref_size) * aspect).floor() as u32)
    } else if height.min(width) > ref_size {
        ((f64::from(ref_size) / aspect).floor() as u32, ref_size)
    } else {
        (height, width)
    };

    target_width -= target_width % SIZE_MULTIPLE;
    target_height -= target_height % SIZE_MULTIPLE;

    ScaleFactors {
        x_scale: f64::from(target_width) / f64::from(width),
        y_scale: f64::from(target_height) / f64::from(height),
        target_width,
        target_height,
    }
}
