//! Trait definitions for the pipeline.
//!
//! The traits in `standard` mark the seams where external collaborators plug
//! in: the example reader and the adversarial model.

pub mod standard;

pub use standard::{AdversarialModel, ExampleReader, KeyedRecord, RecordIter};
