//! Analysis and rewriting passes that run between parsing and code generation.
//!
//! - [`capture`] decides which variables escape into heap closure contexts.
//! - [`instrument`] inserts debugger hooks for debug builds.

pub mod capture;
pub mod instrument;

pub use capture::{analyze, AnalyzeError, CaptureAnalysis, FunctionScope, Resolution};
pub use instrument::{instrument, DebugInfo};
