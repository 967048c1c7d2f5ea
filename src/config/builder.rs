use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;
use url::Url;

use super::directive::interpret;
use super::env::EnvSource;
use super::include::{resolve_include_url, IncludeContext, LoadEnv};
use super::report::{LoadReport, Recorder};
use super::source::{DefaultFetcher, ResourceFetcher, DEFAULT_HTTP_TIMEOUT};
use super::store::{PropertyStore, CONFIG_URL_KEY, NAME_KEY};
use super::ConfigError;

/// Builder for loading property resources.
///
/// A resource is read line by line. Ordinary `key=value` lines are stored in
/// order, later lines overriding earlier ones. Directive lines control the load:
///
/// ```text
/// %include=file:defaults.conf        # must exist (failure is logged)
/// %include?=file:local.conf          # may be missing
/// %if env=prod
/// db.host=db.internal
/// %else
/// db.host=localhost
/// %endif
/// %log=using ${db.host}
/// url=jdbc://${db.host}:${db.port=5432}/app
/// ```
///
/// Includes are resolved relative to the including resource. Values are
/// stored raw and expanded when read with [`PropertyStore::get_string`].
///
/// Only a failure to read the root resource is returned as an error.
/// Everything else is logged through `tracing` and, with the `_report`
/// variants, returned alongside the store.
///
/// ## Example
///
/// ```no_run
/// use rtprops::{ConfigLoader, PropertyStore};
///
/// let mut ambient = PropertyStore::new();
/// ambient.set("env", "prod");
///
/// let store = ConfigLoader::builder()
///     .with_ambient(ambient)
///     .with_env("MYAPP", "__")
///     .build()
///     .load_file("config/app.conf")?;
///
/// let host = store.get_string_or("db.host", "localhost");
/// let port = store.get_int("db.port", 5432);
/// # Ok::<(), rtprops::ConfigError>(())
/// ```
#[derive(Debug)]
#[must_use = "builders do nothing until .build() is called"]
pub struct ConfigLoaderBuilder {
    ambient: Option<PropertyStore>,
    env: Vec<EnvSource>,
    fetcher: Option<Arc<dyn ResourceFetcher>>,
    http_timeout: Duration,
    ignore_case: bool,
    allow_blank_values: bool,
    log_messages: bool,
    include_name: bool,
}

impl Default for ConfigLoaderBuilder {
    fn default() -> Self {
        Self {
            ambient: None,
            env: Vec::new(),
            fetcher: None,
            http_timeout: DEFAULT_HTTP_TIMEOUT,
            ignore_case: false,
            allow_blank_values: true,
            log_messages: true,
            include_name: true,
        }
    }
}

impl ConfigLoaderBuilder {
    /// Store consulted by `%if` and by `%include`/`%log` expansion when a key
    /// is not defined in the resource being loaded.
    pub fn with_ambient(mut self, ambient: PropertyStore) -> Self {
        self.ambient = Some(ambient);
        self
    }

    /// Adds environment variables to the ambient properties.
    ///
    /// `PREFIX{sep}DB{sep}HOST` is visible as `db.host`. Environment values
    /// override [`with_ambient`](Self::with_ambient) values.
    pub fn with_env(mut self, prefix: impl Into<String>, separator: impl Into<String>) -> Self {
        self.env.push(EnvSource::new(prefix, separator));
        self
    }

    /// Replaces the default `file:`/`http(s):` fetcher.
    pub fn with_fetcher(mut self, fetcher: Arc<dyn ResourceFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Request timeout of the default fetcher.
    pub fn http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    pub fn ignore_case(mut self, ignore_case: bool) -> Self {
        self.ignore_case = ignore_case;
        self
    }

    pub fn allow_blank_values(mut self, allow: bool) -> Self {
        self.allow_blank_values = allow;
        self
    }

    /// Whether `%log` directives emit anything.
    pub fn log_messages(mut self, enabled: bool) -> Self {
        self.log_messages = enabled;
        self
    }

    /// Whether a `%name` in the loaded resource names the produced store.
    pub fn include_name(mut self, include: bool) -> Self {
        self.include_name = include;
        self
    }

    /// Resolves the ambient store and fetcher.
    pub fn build(self) -> ConfigLoader {
        let ambient = if self.env.is_empty() {
            self.ambient
        } else {
            let mut ambient = self.ambient.unwrap_or_default();
            for source in &self.env {
                ambient.merge(&source.load(), false);
            }
            Some(ambient)
        };

        let timeout = self.http_timeout;
        let fetcher = self.fetcher.unwrap_or_else(|| {
            let default: Arc<dyn ResourceFetcher> = Arc::new(DefaultFetcher::new(timeout));
            default
        });

        let mut template = PropertyStore::new();
        template.set_ignore_case(self.ignore_case);
        template.set_allow_blank_values(self.allow_blank_values);
        template.set_log_messages(self.log_messages);

        ConfigLoader {
            ambient,
            fetcher,
            template,
            include_name: self.include_name,
        }
    }
}

/// Loads property resources into [`PropertyStore`]s.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    ambient: Option<PropertyStore>,
    fetcher: Arc<dyn ResourceFetcher>,
    template: PropertyStore,
    include_name: bool,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        ConfigLoaderBuilder::default().build()
    }
}

impl ConfigLoader {
    pub fn builder() -> ConfigLoaderBuilder {
        ConfigLoaderBuilder::default()
    }

    pub fn ambient(&self) -> Option<&PropertyStore> {
        self.ambient.as_ref()
    }

    /// Loads a property file. A relative path is taken from the working directory.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<PropertyStore, ConfigError> {
        self.load_file_report(path).map(LoadReport::into_store)
    }

    pub fn load_file_report(&self, path: impl AsRef<Path>) -> Result<LoadReport, ConfigError> {
        let url = file_url(path.as_ref())?;
        self.load_url_report(url.as_str())
    }

    /// Loads a `file:`, `http:` or `https:` resource. `file:relative.conf` is
    /// taken from the working directory.
    pub fn load_url(&self, url: &str) -> Result<PropertyStore, ConfigError> {
        self.load_url_report(url).map(LoadReport::into_store)
    }

    pub fn load_url_report(&self, url: &str) -> Result<LoadReport, ConfigError> {
        let url = resolve_include_url(url, None)?;
        debug!(url = %url, "loading properties");
        let text = self.fetcher.fetch(&url)?;
        Ok(self.interpret_root(&text, Some(url)))
    }

    /// Loads properties from text with no source URL. Relative `file:`
    /// includes are taken from the working directory.
    pub fn load_str(&self, text: &str) -> PropertyStore {
        self.load_str_report(text).into_store()
    }

    pub fn load_str_report(&self, text: &str) -> LoadReport {
        self.interpret_root(text, None)
    }

    /// Loads `url` and merges the result into `target`, keeping keys of
    /// `target` the resource does not define.
    ///
    /// Returns the name of the loaded resource.
    pub fn load_into(
        &self,
        target: &mut PropertyStore,
        url: &str,
    ) -> Result<Option<String>, ConfigError> {
        let mut loaded = self.load_url(url)?;
        loaded.remove(CONFIG_URL_KEY);
        Ok(target.merge(&loaded, self.include_name))
    }

    fn interpret_root(&self, text: &str, url: Option<Url>) -> LoadReport {
        let env = LoadEnv {
            fetcher: self.fetcher.as_ref(),
            ambient: self.ambient.as_ref(),
        };

        let mut store = self.template.empty_like();
        if let Some(url) = &url {
            store.set(CONFIG_URL_KEY, url.as_str());
        }

        let mut ctx = IncludeContext::root(url);
        let mut recorder = Recorder::default();
        interpret(text, &mut store, &mut ctx, &env, &[], &mut recorder);

        if !self.include_name {
            store.remove(NAME_KEY);
        }

        let diagnostics = recorder.into_diagnostics();
        debug!(
            keys = store.len(),
            diagnostics = diagnostics.len(),
            "loaded properties"
        );
        LoadReport { store, diagnostics }
    }
}

fn file_url(path: &Path) -> Result<Url, ConfigError> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|e| ConfigError::ReadError {
                path: path.to_path_buf(),
                source: e,
            })?
            .join(path)
    };
    Url::from_file_path(&absolute)
        .map_err(|()| ConfigError::NotAFilePath(absolute.display().to_string()))
}
