//! # modnet-matte
//!
//! Single-image portrait matting with a MODNet-style ONNX model.
//!
//! The source image is resized to a working resolution the network accepts
//! (both sides multiples of 32, aspect ratio kept), the predicted matte is
//! resampled back to the source resolution and joined onto the untouched
//! source pixels as an alpha channel.
//!
//! ## Example
//!
//! ```no_run
//! use modnet_matte::{run_matting, MattingConfig, ModelHandle};
//!
//! # async fn example() -> modnet_matte::Result<()> {
//! let config = MattingConfig::default();
//! let model = ModelHandle::load("modnet.onnx", config.intra_threads).await?;
//!
//! run_matting("portrait.jpg", &model, "portrait.png", &config).await?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod io;
pub mod pipeline;
pub mod segmentation;

pub use error::{Error, Result};
pub use pipeline::{matte_image, run_matting, Matted, MattingConfig, DEFAULT_REF_SIZE};
pub use segmentation::{Mask, MattingModel, ModelHandle, Modnet, ScaleFactors};
