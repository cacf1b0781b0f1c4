//! Bundled workflows.
//!
//! Each workflow module provides its shared-state type, the steps and tools
//! it needs, and a ready-made graph.

pub mod code_review;

pub use code_review::{CodeReviewState, FunctionMeta, Issue};
