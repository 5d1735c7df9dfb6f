//! Ensembles of external activation models.
//!
//! Models are loaded from an explicit list of paths and evaluated on the same
//! input features; their activation curves are averaged into one.

use std::path::{Path, PathBuf};

use ndarray::{Array1, ArrayView2};

use super::{BatchError, BatchResult, Executor};
use crate::{Activations, AudioEventResult};

/// A model mapping a feature matrix to one activation value per frame.
pub trait ActivationModel: Send + Sync {
    /// Computes the activation curve for `input` (`frames × features`).
    fn activations(&self, input: ArrayView2<'_, f64>) -> AudioEventResult<Array1<f64>>;
}

impl<M: ActivationModel + ?Sized> ActivationModel for Box<M> {
    fn activations(&self, input: ArrayView2<'_, f64>) -> AudioEventResult<Array1<f64>> {
        (**self).activations(input)
    }
}

/// Creates models from files.
pub trait ModelLoader: Sync {
    /// The model type produced.
    type Model: ActivationModel;

    /// Loads the model stored at `path`.
    fn load(&self, path: &Path) -> AudioEventResult<Self::Model>;
}

/// Which models to load and how to run them.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ModelConfig {
    /// Model files, loaded in order.
    pub model_paths: Vec<PathBuf>,
    /// Executor used for loading and evaluation.
    pub executor: Executor,
}

impl ModelConfig {
    /// Configuration for the given paths with sequential execution.
    pub fn new(model_paths: Vec<PathBuf>) -> Self {
        Self {
            model_paths,
            executor: Executor::default(),
        }
    }

    /// Replaces the executor.
    pub fn with_executor(mut self, executor: Executor) -> Self {
        self.executor = executor;
        self
    }
}

/// Loads every configured model through `loader`, preserving path order.
///
/// # Errors
/// Fails for an empty path list, or with the index of the first path that
/// could not be loaded.
pub fn load_models<L: ModelLoader>(
    config: &ModelConfig,
    loader: &L,
) -> BatchResult<Vec<L::Model>> {
    if config.model_paths.is_empty() {
        return Err(BatchError::invalid_configuration("no model paths given"));
    }
    config
        .executor
        .map(&config.model_paths, |path| loader.load(path))
}

/// Evaluates every model on `input` and returns the elementwise mean of their
/// activation curves at `fps`.
///
/// # Errors
/// Fails for an empty model list or invalid `fps`, with the index of the first
/// failing model, or when the models disagree on the curve length.
pub fn average_activations<M: ActivationModel>(
    models: &[M],
    input: ArrayView2<'_, f64>,
    executor: &Executor,
    fps: f64,
) -> BatchResult<Activations> {
    if models.is_empty() {
        return Err(BatchError::invalid_configuration("no models given"));
    }
    let curves = executor.map(models, |model| model.activations(input))?;

    let expected = curves[0].len();
    if let Some((index, curve)) = curves
        .iter()
        .enumerate()
        .find(|(_, curve)| curve.len() != expected)
    {
        return Err(BatchError::dimension_mismatch(format!(
            "model 0 produced {expected} frames, model {index} produced {}",
            curve.len()
        )));
    }

    let mut sum = Array1::<f64>::zeros(expected);
    for curve in &curves {
        sum += curve;
    }
    let mean = sum / models.len() as f64;
    tracing::debug!(num_models = models.len(), num_frames = expected, "activations averaged");
    Activations::new(mean, fps).map_err(|e| BatchError::invalid_configuration(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ParameterError;
    use ndarray::{Axis, array};

    /// Scaled row sums of the input.
    struct RowSum(f64);

    impl ActivationModel for RowSum {
        fn activations(&self, input: ArrayView2<'_, f64>) -> AudioEventResult<Array1<f64>> {
            Ok(input.sum_axis(Axis(1)) * self.0)
        }
    }

    struct Failing;

    impl ActivationModel for Failing {
        fn activations(&self, _input: ArrayView2<'_, f64>) -> AudioEventResult<Array1<f64>> {
            Err(ParameterError::invalid_value("model", "not loaded").into())
        }
    }

    struct Truncating;

    impl ActivationModel for Truncating {
        fn activations(&self, input: ArrayView2<'_, f64>) -> AudioEventResult<Array1<f64>> {
            Ok(Array1::zeros(input.nrows().saturating_sub(1)))
        }
    }

    /// Reads the scale factor from the file stem.
    struct StemLoader;

    impl ModelLoader for StemLoader {
        type Model = RowSum;

        fn load(&self, path: &Path) -> AudioEventResult<RowSum> {
            path.file_stem()
                .and_then(|stem| stem.to_str())
                .and_then(|stem| stem.parse().ok())
                .map(RowSum)
                .ok_or_else(|| ParameterError::invalid_value("path", "stem is not a number").into())
        }
    }

    #[test]
    fn test_average_of_two_models() {
        let input = array![[1.0, 1.0], [0.0, 2.0], [0.5, 0.5]];
        let models = vec![RowSum(1.0), RowSum(3.0)];
        let averaged = average_activations(&models, input.view(), &Executor::Sequential, 100.0)
            .unwrap();
        assert_eq!(averaged.values().to_vec(), vec![4.0, 4.0, 2.0]);
        assert_eq!(averaged.fps(), 100.0);
    }

    #[test]
    fn test_boxed_models_and_first_failure() {
        let input = array![[1.0], [2.0]];
        let models: Vec<Box<dyn ActivationModel>> =
            vec![Box::new(RowSum(1.0)), Box::new(Failing), Box::new(Failing)];
        let err = average_activations(&models, input.view(), &Executor::Sequential, 100.0)
            .unwrap_err();
        assert!(matches!(err, BatchError::ItemError { index: 1, .. }));
    }

    #[test]
    fn test_length_mismatch() {
        let input = array![[1.0], [2.0]];
        let models: Vec<Box<dyn ActivationModel>> = vec![Box::new(RowSum(1.0)), Box::new(Truncating)];
        let err = average_activations(&models, input.view(), &Executor::Sequential, 100.0)
            .unwrap_err();
        assert!(matches!(err, BatchError::DimensionMismatch { .. }));
    }

    #[test]
    fn test_empty_ensemble_is_rejected() {
        let input = array![[1.0]];
        let models: Vec<RowSum> = Vec::new();
        assert!(matches!(
            average_activations(&models, input.view(), &Executor::Sequential, 100.0),
            Err(BatchError::InvalidConfiguration { .. })
        ));
        assert!(load_models(&ModelConfig::default(), &StemLoader).is_err());
    }

    #[test]
    fn test_load_models_in_path_order() {
        let config = ModelConfig::new(vec![
            PathBuf::from("models/2.model"),
            PathBuf::from("models/0.5.model"),
        ]);
        let models = load_models(&config, &StemLoader).unwrap();
        assert_eq!(models.len(), 2);
        assert_eq!(models[0].0, 2.0);
        assert_eq!(models[1].0, 0.5);

        let broken = ModelConfig::new(vec![PathBuf::from("a.model"), PathBuf::from("b.model")]);
        assert!(matches!(
            load_models(&broken, &StemLoader),
            Err(BatchError::ItemError { index: 0, .. })
        ));
    }

    #[cfg(feature = "parallel-processing")]
    #[test]
    fn test_parallel_average_matches_sequential() {
        let input = array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]];
        let models: Vec<RowSum> = (1..=8).map(|k| RowSum(k as f64)).collect();
        let sequential =
            average_activations(&models, input.view(), &Executor::Sequential, 50.0).unwrap();
        let parallel = average_activations(
            &models,
            input.view(),
            &Executor::Parallel { num_threads: 3 },
            50.0,
        )
        .unwrap();
        assert_eq!(sequential, parallel);
    }
}
