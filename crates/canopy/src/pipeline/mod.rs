//! End-to-end change-detection pipeline.
//!
//! Stage order: align (before is the reference) -> segment both images ->
//! loss/gain analysis on the aligned pair.

mod result;
mod run;

pub use result::{PipelineResult, PipelineSummary};
pub use run::run;
