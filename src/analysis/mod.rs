//! Thread classification and summarization pipeline.
//!
//! Flow per workspace: resolve workspace -> cache user names -> iterate
//! channels -> iterate thread roots -> selection filter -> per-thread
//! pipeline (classify -> extract tasks -> summarize -> post).

pub mod analyzer;
pub mod classifier;
pub mod pipeline;
mod prompts;
pub mod summary;
pub mod types;

pub use analyzer::{AnalysisResult, WorkspaceAnalyzer};
pub use classifier::Classifier;
pub use pipeline::{ThreadOutcome, ThreadProcessor, should_process};
