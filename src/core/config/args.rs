//! Model construction arguments.
//!
//! [`ModelArgs`] is the configuration surface handed to the adversarial model
//! collaborator. [`split_known_args`] separates the flags this layer owns from
//! the ones an outer driver owns, so both can parse the same command line.

use crate::core::constants::{
    DEFAULT_BETA1, DEFAULT_GAN_WEIGHT, DEFAULT_L1_WEIGHT, DEFAULT_LR, DEFAULT_NDF, DEFAULT_NGF,
};
use crate::core::errors::PipelineResult;
use clap::{CommandFactory, Parser};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;

/// Hyper-parameters and color map location for the pix2pix model.
#[derive(Parser, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[command(name = "pix2pix-model")]
#[command(about = "pix2pix annotation model arguments")]
pub struct ModelArgs {
    /// Number of generator filters in first conv layer
    #[arg(long, default_value_t = DEFAULT_NGF)]
    pub ngf: usize,

    /// Number of discriminator filters in first conv layer
    #[arg(long, default_value_t = DEFAULT_NDF)]
    pub ndf: usize,

    /// Initial learning rate for adam
    #[arg(long, default_value_t = DEFAULT_LR)]
    pub lr: f64,

    /// Momentum term of adam
    #[arg(long, default_value_t = DEFAULT_BETA1)]
    pub beta1: f64,

    /// Weight on L1 term for generator gradient
    #[arg(long = "l1_weight", default_value_t = DEFAULT_L1_WEIGHT)]
    pub l1_weight: f64,

    /// Weight on GAN term for generator gradient
    #[arg(long = "gan_weight", default_value_t = DEFAULT_GAN_WEIGHT)]
    pub gan_weight: f64,

    /// The path to the color map configuration
    #[arg(long = "color_map")]
    pub color_map: Option<PathBuf>,
}

impl Default for ModelArgs {
    fn default() -> Self {
        Self {
            ngf: DEFAULT_NGF,
            ndf: DEFAULT_NDF,
            lr: DEFAULT_LR,
            beta1: DEFAULT_BETA1,
            l1_weight: DEFAULT_L1_WEIGHT,
            gan_weight: DEFAULT_GAN_WEIGHT,
            color_map: None,
        }
    }
}

impl ModelArgs {
    /// Sets the color map path.
    pub fn color_map(mut self, path: impl Into<PathBuf>) -> Self {
        self.color_map = Some(path.into());
        self
    }

    /// Parses the flags this layer owns and returns the rest untouched.
    ///
    /// `argv` must not include the program name.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::Args` if a known flag has a missing or
    /// malformed value.
    pub fn parse_known<I, S>(argv: I) -> PipelineResult<(Self, Vec<String>)>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let (known, remaining) = split_known_args(argv);
        let args = Self::try_parse_from(std::iter::once("pix2pix-model".to_string()).chain(known))?;
        Ok((args, remaining))
    }
}

/// Splits `argv` into the arguments [`ModelArgs`] recognises and the rest.
///
/// Known flags are accepted as `--flag value` or `--flag=value`. Everything
/// else, including positional arguments, is returned in its original order.
pub fn split_known_args<I, S>(argv: I) -> (Vec<String>, Vec<String>)
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let known_flags: HashSet<String> = ModelArgs::command()
        .get_arguments()
        .filter_map(|arg| arg.get_long())
        .map(|long| format!("--{long}"))
        .collect();

    let mut known = Vec::new();
    let mut remaining = Vec::new();
    let mut argv = argv.into_iter().map(Into::into);

    while let Some(arg) = argv.next() {
        let flag = arg.split_once('=').map_or(arg.as_str(), |(flag, _)| flag);
        if !known_flags.contains(flag) {
            remaining.push(arg);
            continue;
        }
        let has_inline_value = arg.contains('=');
        known.push(arg);
        if !has_inline_value {
            if let Some(value) = argv.next() {
                known.push(value);
            }
        }
    }

    (known, remaining)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_parser_defaults() {
        let (args, remaining) = ModelArgs::parse_known(Vec::<String>::new()).unwrap();
        assert_eq!(args, ModelArgs::default());
        assert!(remaining.is_empty());
    }

    #[test]
    fn test_parse_known_passes_through_unknown_flags() {
        let (args, remaining) = ModelArgs::parse_known([
            "--ngf",
            "32",
            "--batch_size",
            "8",
            "--l1_weight=50",
            "--color_map",
            "conf/color_map.conf",
            "data.jsonl",
        ])
        .unwrap();

        assert_eq!(args.ngf, 32);
        assert_eq!(args.ndf, 64);
        assert_eq!(args.l1_weight, 50.0);
        assert_eq!(args.color_map, Some(PathBuf::from("conf/color_map.conf")));
        assert_eq!(remaining, vec!["--batch_size", "8", "data.jsonl"]);
    }

    #[test]
    fn test_malformed_known_value_is_an_error() {
        assert!(ModelArgs::parse_known(["--lr", "fast"]).is_err());
    }

    #[test]
    fn test_known_flag_missing_value_is_an_error() {
        assert!(ModelArgs::parse_known(["--ngf"]).is_err());
    }
}
