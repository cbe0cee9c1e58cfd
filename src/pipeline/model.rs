//! The model facade.
//!
//! [`Model`] owns the immutable [`ModelConfig`] built once from the
//! construction arguments, and hands out [`Graph`]s that borrow it.

use crate::core::config::{DimensionSpec, ModelArgs};
use crate::core::constants::{
    DEFAULT_PARALLEL_THRESHOLD, IMAGE_HEIGHT, IMAGE_WIDTH, MISSING_METRIC, PLACEHOLDER_NAME,
};
use crate::core::errors::{PipelineError, PipelineResult};
use crate::core::traits::{AdversarialModel, ExampleReader};
use crate::pipeline::graph::{Graph, GraphInput};
use crate::pipeline::mode::GraphMode;
use crate::pipeline::reader::{ExampleStream, JsonLinesReader, ReadPolicy};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Configuration shared by every graph of a model. Never mutated after
/// construction.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// Construction arguments.
    pub args: ModelArgs,
    /// Canvas width images are cropped or padded to.
    pub image_width: u32,
    /// Canvas height images are cropped or padded to.
    pub image_height: u32,
    /// Class dimensions; `None` without a color map.
    pub dimensions: Option<DimensionSpec>,
    /// Seed for training shuffles; `None` seeds from entropy.
    pub shuffle_seed: Option<u64>,
    /// Batches larger than this are decoded in parallel.
    pub parallel_threshold: usize,
}

impl ModelConfig {
    /// Creates a configuration without class dimensions.
    pub fn new(args: ModelArgs) -> Self {
        Self {
            args,
            image_width: IMAGE_WIDTH,
            image_height: IMAGE_HEIGHT,
            dimensions: None,
            shuffle_seed: None,
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
        }
    }

    /// Creates a configuration, loading class dimensions from the color map
    /// named in `args`, if any.
    ///
    /// An empty color map is treated like no color map.
    ///
    /// # Errors
    ///
    /// Propagates errors reading or parsing the color map file.
    pub fn from_args(args: ModelArgs) -> PipelineResult<Self> {
        let dimensions = match &args.color_map {
            Some(path) => {
                let dimensions = DimensionSpec::from_path(path)?;
                if dimensions.is_empty() {
                    warn!("color map {} defines no colors", path.display());
                    None
                } else {
                    info!(
                        "Loaded {} class dimension(s) from {}",
                        dimensions.len(),
                        path.display()
                    );
                    Some(dimensions)
                }
            }
            None => None,
        };

        Ok(Self {
            dimensions,
            ..Self::new(args)
        })
    }
}

/// The pix2pix annotation model: configuration plus the example reader.
pub struct Model {
    config: ModelConfig,
    reader: Arc<dyn ExampleReader>,
}

impl Model {
    /// Creates a model reading JSON Lines data files.
    ///
    /// # Errors
    ///
    /// Propagates errors loading the color map.
    pub fn new(args: ModelArgs) -> PipelineResult<Self> {
        Ok(Self::from_config(ModelConfig::from_args(args)?))
    }

    /// Creates a model from an existing configuration.
    pub fn from_config(config: ModelConfig) -> Self {
        Self {
            config,
            reader: Arc::new(JsonLinesReader::new()),
        }
    }

    /// Replaces the example reader.
    pub fn with_reader(mut self, reader: Arc<dyn ExampleReader>) -> Self {
        self.reader = reader;
        self
    }

    /// Fixes the training shuffle seed.
    pub fn with_shuffle_seed(mut self, seed: u64) -> Self {
        self.config.shuffle_seed = Some(seed);
        self
    }

    /// Returns the model configuration.
    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Returns the construction arguments.
    pub fn args(&self) -> &ModelArgs {
        &self.config.args
    }

    /// Returns the class dimensions, if a color map is configured.
    pub fn dimensions(&self) -> Option<&DimensionSpec> {
        self.config.dimensions.as_ref()
    }

    /// Builds the input graph for one run.
    ///
    /// With `data_paths`, records are read from them: shuffled and repeated
    /// forever for [`GraphMode::Train`], in order for two passes otherwise.
    /// Without, the graph takes records fed through its `input` placeholder.
    ///
    /// # Errors
    ///
    /// Returns an error if `batch_size` is zero.
    pub fn build_graph(
        &self,
        data_paths: &[PathBuf],
        batch_size: usize,
        mode: GraphMode,
    ) -> PipelineResult<Graph<'_>> {
        if batch_size == 0 {
            return Err(PipelineError::config_error_with_context(
                "batch_size",
                "0",
                "must be at least 1",
            ));
        }
        debug!("building {} graph, batch_size: {}", mode, batch_size);

        let input = if data_paths.is_empty() {
            GraphInput::Placeholder {
                name: PLACEHOLDER_NAME.to_string(),
                queue: VecDeque::new(),
            }
        } else {
            GraphInput::Stream(ExampleStream::open(
                Arc::clone(&self.reader),
                data_paths.to_vec(),
                ReadPolicy::for_mode(mode, self.config.shuffle_seed),
            ))
        };

        Ok(Graph::new(&self.config, input, mode, batch_size))
    }

    /// Builds a [`GraphMode::Train`] graph.
    pub fn build_train_graph(
        &self,
        data_paths: &[PathBuf],
        batch_size: usize,
    ) -> PipelineResult<Graph<'_>> {
        self.build_graph(data_paths, batch_size, GraphMode::Train)
    }

    /// Builds a [`GraphMode::Evaluate`] graph.
    pub fn build_eval_graph(
        &self,
        data_paths: &[PathBuf],
        batch_size: usize,
    ) -> PipelineResult<Graph<'_>> {
        self.build_graph(data_paths, batch_size, GraphMode::Evaluate)
    }

    /// Gives the adversarial model a chance to set itself up before the
    /// first step.
    pub fn initialize<M: AdversarialModel + ?Sized>(&self, model: &mut M) -> PipelineResult<()> {
        model.initialize(&self.config.args)
    }

    /// Formats metric values for logging.
    ///
    /// See [`format_metric_values`].
    pub fn format_metric_values(&self, metric_values: &[Option<f32>]) -> String {
        format_metric_values(metric_values)
    }
}

/// Formats a (loss, accuracy)-like pair with three decimals.
///
/// A field that is `None` or beyond the end of `metric_values` is shown as
/// `N/A`, independently of the other field. Values beyond the second are
/// ignored.
pub fn format_metric_values(metric_values: &[Option<f32>]) -> String {
    let field = |i: usize| match metric_values.get(i).copied().flatten() {
        Some(value) => format!("{value:.3}"),
        None => MISSING_METRIC.to_string(),
    };
    format!("{}, {}", field(0), field(1))
}

/// Creates a model from raw command-line arguments.
///
/// `argv` must not include the program name.
///
/// # Returns
///
/// The model and the arguments it did not recognise, in their original order.
pub fn create_model<I, S>(argv: I) -> PipelineResult<(Model, Vec<String>)>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let (args, remaining) = ModelArgs::parse_known(argv)?;
    debug!("model args: {:?}, remaining: {:?}", args, remaining);
    Ok((Model::new(args)?, remaining))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::reader::MemoryReader;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn color_map_file() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[color_map]").unwrap();
        writeln!(file, "(0, 255, 0) = (0, 255, 0)").unwrap();
        writeln!(file, "(255, 0, 0) = (255, 0, 0)").unwrap();
        writeln!(file, "50 = (0, 0, 255)").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "[color_labels]").unwrap();
        writeln!(file, "50 = title").unwrap();
        file
    }

    #[test]
    fn test_format_metric_values() {
        assert_eq!(format_metric_values(&[]), "N/A, N/A");
        assert_eq!(format_metric_values(&[None, None]), "N/A, N/A");
        assert_eq!(format_metric_values(&[Some(0.1234)]), "0.123, N/A");
        assert_eq!(format_metric_values(&[None, Some(0.5)]), "N/A, 0.500");
        assert_eq!(format_metric_values(&[Some(0.5), Some(0.75)]), "0.500, 0.750");
        assert_eq!(format_metric_values(&[Some(1.0), Some(2.0), Some(3.0)]), "1.000, 2.000");
    }

    #[test]
    fn test_model_without_color_map_has_no_dimensions() {
        let model = Model::new(ModelArgs::default()).unwrap();
        assert!(model.dimensions().is_none());
        assert_eq!(model.config().image_width, 256);
        assert_eq!(model.config().image_height, 256);
    }

    #[test]
    fn test_model_loads_color_map_in_sorted_order() {
        let file = color_map_file();
        let args = ModelArgs::default().color_map(file.path());

        let first = Model::new(args.clone()).unwrap();
        let second = Model::new(args).unwrap();

        let dimensions = first.dimensions().unwrap();
        let keys: Vec<_> = dimensions.color_map.entries().iter().map(|e| e.key).collect();
        assert_eq!(keys, vec![[0, 255, 0], [50, 50, 50], [255, 0, 0]]);
        assert_eq!(dimensions.colors, vec![[0, 255, 0], [0, 0, 255], [255, 0, 0]]);
        assert_eq!(dimensions.labels, vec![None, Some("title".to_string()), None]);
        assert_eq!(second.dimensions(), first.dimensions());
    }

    #[test]
    fn test_missing_color_map_file_is_error() {
        let args = ModelArgs::default().color_map("/nonexistent/color_map.conf");
        assert!(matches!(Model::new(args), Err(PipelineError::Io(_))));
    }

    #[test]
    fn test_color_map_without_expected_sections_is_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[colour_map]").unwrap();
        writeln!(file, "1 = (255, 0, 0)").unwrap();

        let args = ModelArgs::default().color_map(file.path());
        assert!(matches!(Model::new(args), Err(PipelineError::ConfigError { .. })));
    }

    #[test]
    fn test_empty_color_map_means_no_dimensions() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[color_map]").unwrap();
        writeln!(file, "[color_labels]").unwrap();

        let model = Model::new(ModelArgs::default().color_map(file.path())).unwrap();
        assert!(model.dimensions().is_none());
    }

    #[test]
    fn test_create_model_passes_unknown_args_through() {
        let file = color_map_file();
        let color_map = file.path().display().to_string();
        let (model, remaining) = create_model([
            "--job-dir",
            "out",
            "--ngf=32",
            "--color_map",
            color_map.as_str(),
            "--batch_size",
            "8",
        ])
        .unwrap();

        assert_eq!(model.args().ngf, 32);
        assert_eq!(model.args().lr, 0.0002);
        assert_eq!(model.dimensions().map(DimensionSpec::len), Some(3));
        assert_eq!(remaining, vec!["--job-dir", "out", "--batch_size", "8"]);
    }

    #[test]
    fn test_create_model_rejects_malformed_known_flag() {
        assert!(create_model(["--ngf", "many"]).is_err());
    }

    #[test]
    fn test_build_graph_without_paths_uses_placeholder() {
        let model = Model::new(ModelArgs::default()).unwrap();
        let graph = model.build_graph(&[], 1, GraphMode::Predict).unwrap();
        assert_eq!(graph.placeholder_name(), Some(PLACEHOLDER_NAME));
        assert_eq!(graph.mode(), GraphMode::Predict);
    }

    #[test]
    fn test_build_graph_rejects_zero_batch_size() {
        let model = Model::new(ModelArgs::default()).unwrap();
        assert!(model.build_graph(&[], 0, GraphMode::Predict).is_err());
    }

    #[test]
    fn test_train_and_eval_wrappers_fix_mode() {
        let reader = MemoryReader::new().with_file("d.jsonl", Vec::new());
        let model = Model::new(ModelArgs::default())
            .unwrap()
            .with_reader(Arc::new(reader))
            .with_shuffle_seed(5);
        let paths = vec![PathBuf::from("d.jsonl")];

        let train = model.build_train_graph(&paths, 2).unwrap();
        assert_eq!(train.mode(), GraphMode::Train);
        assert!(train.placeholder_name().is_none());

        let mut eval = model.build_eval_graph(&paths, 2).unwrap();
        assert_eq!(eval.mode(), GraphMode::Evaluate);
        assert!(eval.next_batch().is_none());
    }
}
