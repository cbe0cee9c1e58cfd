//! Diagnostic images for monitoring a pix2pix run.
//!
//! This module turns one batch and the model's predictions into a fixed set of
//! named 8-bit images:
//!
//! - `input` and `target`, rendered directly from the batch
//! - with a color map, `targets_<i>_<label>` / `outputs_<i>_<label>` per class
//!   plus the `targets_combined` and `outputs_combined` composites
//! - without a color map, a single `output`
//!
//! Everything lands in one [`SummaryRegistry`], which serves both lookups by
//! name and ordered enumeration for export.
//!
//! # Examples
//!
//! ```rust
//! use oar_pix2pix::utils::visualization::SummaryRegistry;
//! use ndarray::Array4;
//!
//! let mut registry = SummaryRegistry::new();
//! registry.register_image("input", Array4::<u8>::zeros((1, 2, 2, 3)));
//! assert!(registry.image("input").is_some());
//! assert_eq!(registry.images().count(), 1);
//! ```

use crate::core::batch::{ImageBatch, Tensor4D};
use crate::core::config::DimensionSpec;
use crate::core::constants::UNKNOWN_LABEL;
use crate::core::errors::{PipelineError, PipelineResult, ProcessingStage};
use crate::pipeline::stages::{ExampleBatch, ModelOutputs};
use crate::processors::color_codec::{batch_dimensions_to_colors_list, combine_image, convert_image};
use crate::processors::decode::array_to_rgb;
use ndarray::Axis;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Name under which the displayable prediction is aliased.
pub const OUTPUT_IMAGE: &str = "output_image";

/// Scalar name of the discriminator loss.
pub const DISCRIM_LOSS: &str = "discrim_loss";
/// Scalar name of the generator adversarial loss.
pub const GEN_LOSS_GAN: &str = "gen_loss_GAN";
/// Scalar name of the generator L1 loss.
pub const GEN_LOSS_L1: &str = "gen_loss_L1";

/// Named diagnostic images and scalars, in registration order.
///
/// A name is registered at most once; registering it again replaces the
/// stored value in place.
#[derive(Debug, Clone, Default)]
pub struct SummaryRegistry {
    images: Vec<(String, ImageBatch)>,
    scalars: Vec<(String, f32)>,
    output_image: Option<String>,
}

impl SummaryRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an image batch under `name`.
    pub fn register_image(&mut self, name: impl Into<String>, image: ImageBatch) {
        let name = name.into();
        debug!("summary image '{}': shape {:?}", name, image.shape());
        match self.images.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = image,
            None => self.images.push((name, image)),
        }
    }

    /// Returns the image registered under `name`.
    pub fn image(&self, name: &str) -> Option<&ImageBatch> {
        self.images
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, image)| image)
    }

    /// Enumerates the registered images in registration order.
    pub fn images(&self) -> impl Iterator<Item = (&str, &ImageBatch)> {
        self.images.iter().map(|(n, image)| (n.as_str(), image))
    }

    /// Returns the registered image names in registration order.
    pub fn image_names(&self) -> Vec<&str> {
        self.images.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Registers a scalar under `name`.
    pub fn register_scalar(&mut self, name: impl Into<String>, value: f32) {
        let name = name.into();
        match self.scalars.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = value,
            None => self.scalars.push((name, value)),
        }
    }

    /// Returns the scalar registered under `name`.
    pub fn scalar(&self, name: &str) -> Option<f32> {
        self.scalars
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }

    /// Enumerates the registered scalars in registration order.
    pub fn scalars(&self) -> impl Iterator<Item = (&str, f32)> {
        self.scalars.iter().map(|(n, v)| (n.as_str(), *v))
    }

    /// Marks a registered image as the displayable prediction.
    ///
    /// # Errors
    ///
    /// Returns an error if no image is registered under `name`.
    pub fn set_output_image(&mut self, name: &str) -> PipelineResult<()> {
        if self.image(name).is_none() {
            return Err(PipelineError::invalid_input(format!(
                "cannot alias '{OUTPUT_IMAGE}' to unregistered image '{name}'"
            )));
        }
        self.output_image = Some(name.to_string());
        Ok(())
    }

    /// Returns the displayable prediction: `outputs_combined` with a color
    /// map, `output` without.
    pub fn output_image(&self) -> Option<&ImageBatch> {
        self.output_image.as_deref().and_then(|name| self.image(name))
    }

    /// Returns the number of registered images.
    pub fn len(&self) -> usize {
        self.images.len()
    }

    /// Returns true if no image is registered.
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Writes every registered image as PNG files under `dir`.
    ///
    /// Each batch entry becomes `<name>_<step>_<index>.png`. The directory is
    /// created if missing.
    ///
    /// # Returns
    ///
    /// The paths written, in registration order.
    pub fn write_pngs(&self, dir: &Path, step: u64) -> PipelineResult<Vec<PathBuf>> {
        std::fs::create_dir_all(dir)?;

        let mut written = Vec::new();
        for (name, batch) in self.images() {
            for (index, image) in batch.axis_iter(Axis(0)).enumerate() {
                let path = dir.join(format!("{name}_{step}_{index}.png"));
                array_to_rgb(image)?.save(&path).map_err(|e| {
                    PipelineError::processing_error(
                        ProcessingStage::Visualization,
                        format!("failed to write {}", path.display()),
                        e,
                    )
                })?;
                written.push(path);
            }
        }

        info!("Wrote {} summary image(s) to {}", written.len(), dir.display());
        Ok(written)
    }
}

fn class_suffix(index: usize, label: Option<&str>) -> String {
    format!("_{}_{}", index, label.unwrap_or(UNKNOWN_LABEL))
}

/// Registers the diagnostic images for one batch.
///
/// # Arguments
///
/// * `registry` - Destination registry.
/// * `batch` - The batch fed to the model.
/// * `predictions` - Model outputs, `(N, H, W, D)`.
/// * `dimensions` - Class colors and labels, if a color map is configured.
///
/// # Errors
///
/// Returns an error if the predictions have fewer channels than there are
/// classes.
pub fn add_model_summary_images(
    registry: &mut SummaryRegistry,
    batch: &ExampleBatch,
    predictions: &Tensor4D,
    dimensions: Option<&DimensionSpec>,
) -> PipelineResult<()> {
    registry.register_image("input", convert_image(batch.images.view()));
    registry.register_image("target", convert_image(batch.annotations.view()));

    let Some(dimensions) = dimensions else {
        registry.register_image("output", convert_image(predictions.view()));
        return registry.set_output_image("output");
    };

    for (prefix, tensor) in [("targets", &batch.targets), ("outputs", predictions)] {
        let weighted = batch_dimensions_to_colors_list(tensor.view(), &dimensions.colors)?;
        for (i, (image, label)) in weighted.iter().zip(&dimensions.labels).enumerate() {
            registry.register_image(
                format!("{prefix}{}", class_suffix(i, label.as_deref())),
                convert_image(image.view()),
            );
        }
        registry.register_image(format!("{prefix}_combined"), combine_image(&weighted, false)?);
    }

    registry.set_output_image("outputs_combined")
}

/// Registers the model losses as scalar summaries.
pub fn add_loss_summaries(registry: &mut SummaryRegistry, outputs: &ModelOutputs) {
    registry.register_scalar(DISCRIM_LOSS, outputs.discrim_loss);
    registry.register_scalar(GEN_LOSS_GAN, outputs.gen_loss_gan);
    registry.register_scalar(GEN_LOSS_L1, outputs.gen_loss_l1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::ColorMap;
    use ndarray::{Array4, s};
    use std::time::Duration;

    fn batch_with_targets(targets: Tensor4D) -> ExampleBatch {
        let (n, h, w, _) = targets.dim();
        ExampleBatch {
            keys: vec![None; n],
            input_uris: vec![String::new(); n],
            annotation_uris: vec![String::new(); n],
            images: Array4::from_elem((n, h, w, 3), 0.5),
            annotations: Array4::from_elem((n, h, w, 3), 1.0),
            targets,
            decode_time: Duration::ZERO,
        }
    }

    fn red_green_dimensions() -> DimensionSpec {
        let color_map =
            ColorMap::new([([1, 1, 1], [255, 0, 0]), ([2, 2, 2], [0, 255, 0])]).unwrap();
        DimensionSpec {
            colors: color_map.colors(),
            color_map,
            labels: vec![Some("body".to_string()), None],
        }
    }

    #[test]
    fn test_registry_lookup_and_enumeration_share_storage() {
        let mut registry = SummaryRegistry::new();
        registry.register_image("a", Array4::zeros((1, 1, 1, 3)));
        registry.register_image("b", Array4::zeros((1, 1, 1, 3)));
        registry.register_image("a", Array4::from_elem((1, 1, 1, 3), 7));

        assert_eq!(registry.image_names(), vec!["a", "b"]);
        assert_eq!(registry.image("a").unwrap()[[0, 0, 0, 0]], 7);
        let (_, first) = registry.images().next().unwrap();
        assert_eq!(first[[0, 0, 0, 0]], 7);
        assert!(registry.set_output_image("missing").is_err());
    }

    #[test]
    fn test_summary_names_with_color_map() {
        let mut targets = Array4::zeros((2, 3, 3, 2));
        targets.slice_mut(s![.., .., .., 0]).fill(1.0);
        let batch = batch_with_targets(targets.clone());
        let mut registry = SummaryRegistry::new();

        add_model_summary_images(&mut registry, &batch, &targets, Some(&red_green_dimensions()))
            .unwrap();

        assert_eq!(
            registry.image_names(),
            vec![
                "input",
                "target",
                "targets_0_body",
                "targets_1_unknown_label",
                "targets_combined",
                "outputs_0_body",
                "outputs_1_unknown_label",
                "outputs_combined",
            ]
        );
        let combined = registry.image("outputs_combined").unwrap();
        assert_eq!(combined.shape(), &[2, 3, 3, 3]);
        assert_eq!(combined.slice(s![0, 0, 0, ..]).to_vec(), vec![255, 0, 0]);
        assert_eq!(registry.output_image(), Some(combined));
        assert_eq!(registry.image("input").unwrap()[[1, 2, 2, 0]], 127);
    }

    #[test]
    fn test_composites_keep_black_background() {
        let targets = Array4::zeros((1, 2, 2, 2));
        let batch = batch_with_targets(targets.clone());
        let mut registry = SummaryRegistry::new();

        add_model_summary_images(&mut registry, &batch, &targets, Some(&red_green_dimensions()))
            .unwrap();

        for name in ["targets_combined", "outputs_combined"] {
            assert!(registry.image(name).unwrap().iter().all(|&v| v == 0), "{name}");
        }
    }

    #[test]
    fn test_summary_names_without_color_map() {
        let predictions = Array4::from_elem((1, 2, 2, 3), 1.0);
        let batch = batch_with_targets(predictions.clone());
        let mut registry = SummaryRegistry::new();

        add_model_summary_images(&mut registry, &batch, &predictions, None).unwrap();

        assert_eq!(registry.image_names(), vec!["input", "target", "output"]);
        assert!(registry.output_image().unwrap().iter().all(|&v| v == 255));
    }

    #[test]
    fn test_too_few_prediction_channels_is_error() {
        let targets = Array4::zeros((1, 2, 2, 2));
        let predictions = Array4::zeros((1, 2, 2, 1));
        let batch = batch_with_targets(targets);
        let mut registry = SummaryRegistry::new();

        assert!(
            add_model_summary_images(
                &mut registry,
                &batch,
                &predictions,
                Some(&red_green_dimensions())
            )
            .is_err()
        );
    }

    #[test]
    fn test_loss_summaries() {
        let outputs = ModelOutputs {
            outputs: Array4::zeros((1, 1, 1, 1)),
            discrim_loss: 1.5,
            gen_loss_gan: 0.25,
            gen_loss_l1: 3.0,
            global_step: 9,
        };
        let mut registry = SummaryRegistry::new();
        add_loss_summaries(&mut registry, &outputs);

        assert_eq!(registry.scalar(DISCRIM_LOSS), Some(1.5));
        assert_eq!(registry.scalar(GEN_LOSS_GAN), Some(0.25));
        assert_eq!(
            registry.scalars().map(|(n, _)| n).collect::<Vec<_>>(),
            vec![DISCRIM_LOSS, GEN_LOSS_GAN, GEN_LOSS_L1]
        );
    }

    #[test]
    fn test_write_pngs_one_file_per_batch_entry() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = SummaryRegistry::new();
        registry.register_image("output", Array4::from_elem((2, 4, 4, 3), 200));

        let written = registry.write_pngs(&dir.path().join("summaries"), 12).unwrap();

        assert_eq!(written.len(), 2);
        assert!(written[1].ends_with("output_12_1.png"));
        let reloaded = image::open(&written[0]).unwrap().to_rgb8();
        assert_eq!(reloaded.dimensions(), (4, 4));
        assert_eq!(reloaded.get_pixel(3, 3).0, [200, 200, 200]);
    }
}
