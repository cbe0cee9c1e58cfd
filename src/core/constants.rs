//! Constants used throughout the pipeline.
//!
//! This module defines the fixed canvas size, reader pass counts, default
//! hyper-parameters and processing thresholds shared by the pipeline stages.

/// The height of the canvas every decoded image is cropped or padded to.
pub const IMAGE_HEIGHT: u32 = 256;

/// The width of the canvas every decoded image is cropped or padded to.
pub const IMAGE_WIDTH: u32 = 256;

/// The number of passes over the data source in evaluation and prediction.
pub const BOUNDED_PASSES: usize = 2;

/// The default threshold for parallel processing.
///
/// Batches with more records than this are decoded with rayon.
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 4;

/// The default capacity of the record shuffle buffer used in training.
pub const DEFAULT_SHUFFLE_BUFFER: usize = 256;

/// The name of the raw-record placeholder used when no data paths are given.
pub const PLACEHOLDER_NAME: &str = "input";

/// The label used in summary names for dimensions without a configured label.
pub const UNKNOWN_LABEL: &str = "unknown_label";

/// The placeholder rendered for missing metric values.
pub const MISSING_METRIC: &str = "N/A";

/// Default number of generator filters in the first conv layer.
pub const DEFAULT_NGF: usize = 64;

/// Default number of discriminator filters in the first conv layer.
pub const DEFAULT_NDF: usize = 64;

/// Default initial learning rate for adam.
pub const DEFAULT_LR: f64 = 0.0002;

/// Default momentum term of adam.
pub const DEFAULT_BETA1: f64 = 0.5;

/// Default weight on the L1 term for the generator gradient.
pub const DEFAULT_L1_WEIGHT: f64 = 100.0;

/// Default weight on the GAN term for the generator gradient.
pub const DEFAULT_GAN_WEIGHT: f64 = 1.0;
