//! Utility module for running independent work items in batches.
//!
//! The main use is evaluating ensembles of external activation models on the
//! same input and averaging their outputs. Items run sequentially or on a
//! rayon thread pool, selected through [`Executor`].

pub mod error;
pub mod models;
pub mod parallel;

pub use error::{BatchError, BatchResult};
pub use models::{ActivationModel, ModelConfig, ModelLoader, average_activations, load_models};
pub use parallel::Executor;
