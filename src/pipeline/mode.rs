//! Graph construction modes.

use crate::core::constants::BOUNDED_PASSES;
use serde::{Deserialize, Serialize};

/// Which behaviour variant of the graph is being constructed.
///
/// `Train` and `Evaluate` are the training-is-active variants; `Predict` is
/// inference. The mode decides how examples are read: training reads shuffle
/// and repeat forever, every other mode reads in order for a fixed number of
/// passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GraphMode {
    /// Training graph.
    Train,
    /// Evaluation graph.
    Evaluate,
    /// Inference graph.
    Predict,
}

impl GraphMode {
    /// Returns true for the training-is-active variants.
    pub fn is_training(self) -> bool {
        matches!(self, GraphMode::Train | GraphMode::Evaluate)
    }

    /// Returns true if examples are shuffled.
    pub fn shuffles(self) -> bool {
        self == GraphMode::Train
    }

    /// Returns true if running the model should apply an optimizer update.
    pub fn applies_updates(self) -> bool {
        self == GraphMode::Train
    }

    /// Returns the number of passes over the data, or `None` for unbounded.
    pub fn passes(self) -> Option<usize> {
        match self {
            GraphMode::Train => None,
            GraphMode::Evaluate | GraphMode::Predict => Some(BOUNDED_PASSES),
        }
    }
}

impl std::fmt::Display for GraphMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GraphMode::Train => write!(f, "train"),
            GraphMode::Evaluate => write!(f, "evaluate"),
            GraphMode::Predict => write!(f, "predict"),
        }
    }
}
