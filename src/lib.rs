//! Recursive property-file loading.
//!
//! Property resources are line-oriented `key=value` files that can include
//! other files or URLs (`%include`), branch on already known values
//! (`%if`/`%else`/`%endif`) and reference other keys (`${key=default}`).
//! See [`ConfigLoader`] for the file format and [`PropertyStore`] for access.

pub mod config;
mod error;

pub use config::{ConfigError, ConfigLoader, LoadReport, PropertyStore};
pub use error::Error;
