#![deny(missing_docs)]

//! PDF text recovery: extraction with positional fidelity, noise cleaning, and sentence-aware
//! chunking for downstream embedding and summarization.

/// Environment-driven configuration management.
pub mod config;
/// Structured logging and tracing setup.
pub mod logging;
/// Pipeline metrics helpers.
pub mod metrics;
/// Extraction, cleaning, and segmentation pipeline.
pub mod processing;
