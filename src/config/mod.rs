//! Configuration loading and layering.
//!
//! Handles `.github/pullcheck/config.yaml` loading and environment
//! variable overrides with proper priority ordering.

pub mod loader;

pub use loader::{
    BlastRadiusConfig, BrandingConfig, Config, DocsConfig, FilesConfig, ProjectConfig,
    ReviewSettings, RiskConfig, RulesConfig,
};
