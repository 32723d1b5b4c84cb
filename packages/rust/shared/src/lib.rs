//! Shared types, error model, and configuration for Pressmark.
//!
//! This crate is the foundation depended on by all other Pressmark crates.
//! It provides:
//! - [`PressError`] — the unified error type
//! - Domain types ([`Document`], [`Properties`])
//! - Configuration ([`AppConfig`], [`EnrichmentSettings`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, EnrichmentConfig, EnrichmentSettings, OutputConfig, config_dir, config_file_path,
    init_config, load_config, load_config_from,
};
pub use error::{PressError, Result};
pub use types::{Document, Properties};
