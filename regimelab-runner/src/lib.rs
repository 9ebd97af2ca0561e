//! RegimeLab Runner: batch orchestration on top of `regimelab-core`.
//!
//! This crate provides:
//! - TOML pipeline configuration with validation and fingerprinting
//! - Parallel per-instrument analysis merged into a keyed batch result
//! - Best take-profit selection with a run-recency filter
//! - Training-dataset assembly (regime state, features, signal, label)
//! - CSV tables and a versioned JSON manifest

pub mod batch;
pub mod config;
pub mod dataset;
pub mod export;
pub mod selection;

pub use batch::{run_batch, BatchError, BatchResult, BatchRunner, InstrumentResult, LabelRecord};
pub use config::{ConfigError, PipelineConfig, SelectionConfig};
pub use dataset::{build_dataset, Dataset, DatasetRow};
pub use export::{load_manifest, save_outputs, Manifest, SCHEMA_VERSION};
pub use selection::{select_best, BestCandidate};
