use super::types::MattingModel;
use crate::error::{Error, Result};
use ndarray::Array4;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;
use std::path::Path;

/// MODNet portrait matting model
///
/// Stateless: every call is an independent forward pass. Tensor names are read
/// from the model metadata at load time, first input and first output.
pub struct Modnet {
    session: Session,
    input_name: String,
    output_name: String,
}

impl Modnet {
    /// Create a new MODNet model from an ONNX file
    ///
    /// # Arguments
    /// * `model_path` - Path to the ONNX model file
    /// * `intra_threads` - ONNX Runtime intra-op thread count
    pub fn new<P: AsRef<Path>>(model_path: P, intra_threads: usize) -> Result<Self> {
        let path = model_path.as_ref();
        let load_error = |source: ort::Error| Error::ModelLoad {
            path: path.to_path_buf(),
            source,
        };

        tracing::info!("Loading MODNet model from {}", path.display());

        let session = Session::builder()
            .map_err(load_error)?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(load_error)?
            .with_intra_threads(intra_threads)
            .map_err(load_error)?
            .commit_from_file(path)
            .map_err(load_error)?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .ok_or(Error::MissingTensor { kind: "input" })?;
        let output_name = session
            .outputs
            .first()
            .map(|output| output.name.clone())
            .ok_or(Error::MissingTensor { kind: "output" })?;

        tracing::info!("MODNet model loaded successfully");
        tracing::debug!("Model tensors: input={}, output={}", input_name, output_name);

        Ok(Self {
            session,
            input_name,
            output_name,
        })
    }
}

impl MattingModel for Modnet {
    fn input_name(&self) -> &str {
        &self.input_name
    }

    fn output_name(&self) -> &str {
        &self.output_name
    }

    fn infer(&mut self, input: Array4<f32>) -> Result<Array4<f32>> {
        let _span = tracing::debug_span!("inference").entered();

        let input = Tensor::from_array(input).map_err(|source| Error::Inference { source })?;

        let outputs = self
            .session
            .run(ort::inputs![self.input_name.as_str() => input])
            .map_err(|source| Error::Inference { source })?;

        let (shape, data) = outputs[self.output_name.as_str()]
            .try_extract_tensor::<f32>()
            .map_err(|source| Error::Inference { source })?;

        let raw: Vec<i64> = shape.iter().copied().collect();
        let [n, c, h, w] = output_dims(&raw)?;

        Array4::from_shape_vec((n, c, h, w), data.to_vec()).map_err(|err| Error::ShapeMismatch {
            expected: format!("{raw:?}"),
            actual: err.to_string(),
        })
    }
}

/// Matte shape: [1, 1, H, W], every dimension resolved
fn output_dims(shape: &[i64]) -> Result<[usize; 4]> {
    let mismatch = || Error::ShapeMismatch {
        expected: "4D tensor with concrete dimensions".to_string(),
        actual: format!("{shape:?}"),
    };

    let dims: Vec<usize> = shape
        .iter()
        .map(|&d| usize::try_from(d).map_err(|_| mismatch()))
        .collect::<Result<_>>()?;

    dims.try_into().map_err(|_| mismatch())
}
