mod modnet;
mod preprocess;
pub mod scale;
pub mod types;

pub use modnet::Modnet;
pub use preprocess::Preprocessor;
pub use scale::{compute_scale_factors, ScaleFactors};
pub use types::{Mask, MattingModel};

use crate::error::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Shared, caller-owned handle to a loaded matting model
///
/// Cloning is cheap; the model is released when the last clone is dropped.
/// Runs sharing one handle take turns on the model.
#[derive(Clone)]
pub struct ModelHandle {
    model: Arc<Mutex<Box<dyn MattingModel>>>,
}

impl ModelHandle {
    pub fn new<M: MattingModel + 'static>(model: M) -> Self {
        Self {
            model: Arc::new(Mutex::new(Box::new(model))),
        }
    }

    /// Load the default model (MODNet) from an ONNX file
    pub async fn load(model_path: impl Into<PathBuf>, intra_threads: usize) -> Result<Self> {
        let model_path = model_path.into();
        let model =
            tokio::task::spawn_blocking(move || Modnet::new(model_path, intra_threads)).await??;
        Ok(Self::new(model))
    }

    pub(crate) async fn acquire(&self) -> OwnedMutexGuard<Box<dyn MattingModel>> {
        Arc::clone(&self.model).lock_owned().await
    }
}
