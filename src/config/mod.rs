//! Property loading, expansion and typed access.

mod args;
mod builder;
mod coerce;
mod directive;
mod env;
mod error;
mod include;
mod report;
mod resolve;
mod source;
mod store;
mod typed;
mod validate;

pub use builder::{ConfigLoader, ConfigLoaderBuilder};
pub use coerce::FromProperty;
pub use directive::{classify, Condition, ConditionError, ConditionalState, Line};
pub use env::EnvSource;
pub use error::ConfigError;
pub use include::{resolve_include_url, IncludeContext, MAX_INCLUDE_RECURSION};
pub use report::{Diagnostic, LoadReport, Severity};
pub use resolve::{expand, Delimiters, Expander, KeyLookup, KEY_MAX_RECURSION};
pub use source::{DefaultFetcher, ResourceFetcher, DEFAULT_HTTP_TIMEOUT};
pub use store::{
    ObserverId, PropertyChange, PropertyStore, CONFIG_URL_KEY, DEFAULT_KEY_VALUE_SEPARATORS,
    DEFAULT_PROPERTY_SEPARATOR, NAME_KEY, REMOVAL_MARKERS,
};
pub use validate::{KeyAttribute, KeyAttributeError, Validation, ValueKind};
