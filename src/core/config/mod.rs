//! Configuration management for the pipeline.
//!
//! This module provides the model construction arguments, the color map
//! configuration and the INI reader it is parsed with.

pub mod args;
pub mod color_map;
pub mod ini;

// Re-export commonly used types
pub use args::{ModelArgs, split_known_args};
pub use color_map::{ColorMap, ColorMapEntry, DimensionSpec, RgbColor, parse_color};
pub use ini::{IniDocument, IniSection};
