//! Configuration loading, application, and validation.
mod apply;
mod loader;
mod run;
pub mod types;


pub use apply::apply_config;
pub use loader::load_config;
pub use run::{RunConfig, TargetPlan};

#[cfg(test)]
pub(crate) use loader::load_config_file;
