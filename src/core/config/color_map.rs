//! Color map configuration.
//!
//! A color map file is an INI document with two sections:
//!
//! ```ini
//! [color_map]
//! 1 = (255, 0, 0)
//! 2 = (0, 255, 0)
//! (3, 3, 3) = 200
//!
//! [color_labels]
//! 1 = title
//! 2 = abstract
//! ```
//!
//! `color_map` keys and values are colors, written either as a decimal grey
//! intensity `k` (meaning `(k, k, k)`) or as an `(r, g, b)` triple.
//! `color_labels` keys are decimal grey intensities. Dimensions are assigned
//! in ascending numeric order of the `color_map` keys, so loading the same
//! file always yields the same channel layout.

use super::ini::IniDocument;
use crate::core::errors::{PipelineError, PipelineResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};

/// Section holding the color key to color value mapping.
pub const COLOR_MAP_SECTION: &str = "color_map";

/// Section holding the grey intensity to label mapping.
pub const COLOR_LABELS_SECTION: &str = "color_labels";

/// An RGB color as `[r, g, b]`. Ordering is numeric tuple order.
pub type RgbColor = [u8; 3];

/// One configured color: the key it is sorted by and the color it stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorMapEntry {
    /// The configured key, used for ordering and label lookup.
    pub key: RgbColor,
    /// The annotation color of the dimension.
    pub color: RgbColor,
}

/// Ordered mapping from annotation colors to class dimensions.
///
/// Entry `i` describes dimension `i`. The map is immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorMap {
    entries: Vec<ColorMapEntry>,
}

impl ColorMap {
    /// Builds a color map from `(key, color)` pairs, sorting by key.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the same key appears twice.
    pub fn new(pairs: impl IntoIterator<Item = (RgbColor, RgbColor)>) -> PipelineResult<Self> {
        let mut entries: Vec<ColorMapEntry> = pairs
            .into_iter()
            .map(|(key, color)| ColorMapEntry { key, color })
            .collect();
        entries.sort_by_key(|entry| entry.key);

        if let Some(pair) = entries.windows(2).find(|pair| pair[0].key == pair[1].key) {
            return Err(PipelineError::config_error(format!(
                "duplicate color map key {:?}",
                pair[0].key
            )));
        }

        for (i, entry) in entries.iter().enumerate() {
            if entries[..i].iter().any(|other| other.color == entry.color) {
                warn!(
                    "color {:?} is mapped by more than one key; \
                     its pixels will activate several dimensions",
                    entry.color
                );
            }
        }

        Ok(Self { entries })
    }

    /// Reads the `color_map` section of a parsed INI document.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the section is missing or holds an
    /// invalid color. An empty section yields an empty map.
    pub fn from_ini(doc: &IniDocument) -> PipelineResult<Self> {
        let pairs = doc
            .items(COLOR_MAP_SECTION)?
            .iter()
            .map(|(key, value)| Ok((parse_color(key)?, parse_color(value)?)))
            .collect::<PipelineResult<Vec<_>>>()?;
        Self::new(pairs)
    }

    /// Returns the entries in dimension order.
    pub fn entries(&self) -> &[ColorMapEntry] {
        &self.entries
    }

    /// Returns the dimension colors in dimension order.
    pub fn colors(&self) -> Vec<RgbColor> {
        self.entries.iter().map(|entry| entry.color).collect()
    }

    /// Returns the dimension index of an annotation color.
    pub fn dimension_of(&self, color: RgbColor) -> Option<usize> {
        self.entries.iter().position(|entry| entry.color == color)
    }

    /// Returns the number of dimensions.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no colors are configured.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The immutable per-dimension configuration derived from a color map file.
///
/// `colors[i]` and `labels[i]` describe dimension `i`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionSpec {
    /// The color map the dimensions were derived from.
    pub color_map: ColorMap,
    /// The annotation color of each dimension.
    pub colors: Vec<RgbColor>,
    /// The optional human-readable label of each dimension.
    pub labels: Vec<Option<String>>,
}

impl DimensionSpec {
    /// Loads the dimension configuration from a color map file.
    ///
    /// Both the `color_map` and `color_labels` sections must be present.
    ///
    /// # Errors
    ///
    /// Propagates IO errors and malformed configuration unchanged.
    pub fn from_path(path: &Path) -> PipelineResult<Self> {
        let doc = IniDocument::from_path(path)?;
        Self::from_ini(&doc)
    }

    /// Derives the dimension configuration from a parsed INI document.
    pub fn from_ini(doc: &IniDocument) -> PipelineResult<Self> {
        let color_map = ColorMap::from_ini(doc)?;
        let label_map = parse_color_labels(doc)?;

        let colors = color_map.colors();
        let labels = color_map
            .entries()
            .iter()
            .map(|entry| label_map.get(&entry.key).cloned())
            .collect::<Vec<_>>();

        debug!("dimension_colors: {:?}", colors);
        debug!("dimension_labels: {:?}", labels);

        Ok(Self {
            color_map,
            colors,
            labels,
        })
    }

    /// Returns the number of dimensions.
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    /// Returns true if no dimensions are configured.
    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }
}

/// Parses the `color_labels` section into `{(k, k, k): label}`.
fn parse_color_labels(doc: &IniDocument) -> PipelineResult<HashMap<RgbColor, String>> {
    doc.items(COLOR_LABELS_SECTION)?
        .iter()
        .map(|(key, label)| {
            let k = parse_component(key.trim(), COLOR_LABELS_SECTION, key)?;
            Ok(([k, k, k], label.clone()))
        })
        .collect()
}

/// Parses a color written as a grey intensity `k` or as `(r, g, b)`.
///
/// # Errors
///
/// Returns a configuration error for anything else, including components
/// outside `0..=255`.
pub fn parse_color(text: &str) -> PipelineResult<RgbColor> {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();

    if !compact.is_empty() && compact.chars().all(|c| c.is_ascii_digit()) {
        let k = parse_component(&compact, COLOR_MAP_SECTION, text)?;
        return Ok([k, k, k]);
    }

    let inner = compact
        .strip_prefix('(')
        .and_then(|rest| rest.strip_suffix(')'))
        .ok_or_else(|| {
            PipelineError::config_error_with_context(COLOR_MAP_SECTION, text, "invalid color value")
        })?;

    let components = inner
        .split(',')
        .map(|part| parse_component(part, COLOR_MAP_SECTION, text))
        .collect::<PipelineResult<Vec<u8>>>()?;

    match components.as_slice() {
        &[r, g, b] => Ok([r, g, b]),
        _ => Err(PipelineError::config_error_with_context(
            COLOR_MAP_SECTION,
            text,
            "expected exactly three color components",
        )),
    }
}

fn parse_component(part: &str, field: &str, original: &str) -> PipelineResult<u8> {
    part.parse::<u8>().map_err(|_| {
        PipelineError::config_error_with_context(
            field,
            original,
            "color components must be integers in 0..=255",
        )
    })
}
