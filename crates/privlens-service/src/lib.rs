//! Orchestration layer: the annotation pipeline and the usage meter.

mod annotate;
mod meter;

pub use annotate::{OVERALL_GRADE, ServiceContext};
pub use meter::UsageMeter;
