//! AI layer: label taxonomy from tabular sources and ONNX sentence classification.

pub mod classify;
pub mod schema;
pub mod taxonomy;

#[cfg(feature = "onnx")]
mod onnx;
#[cfg(feature = "onnx")]
pub use onnx::OnnxClassifier;

pub use classify::TextClassifier;
pub use schema::SchemaError;
pub use taxonomy::{CategorySource, RatingSource, TaxonomyMap};
