//! Fetching property resources by URL.

use std::io::ErrorKind;
use std::time::Duration;

use url::Url;

use super::ConfigError;

pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Reads the text of a `file:`, `http:` or `https:` resource.
///
/// The loader only talks to resources through this trait, so tests and
/// embedders can serve includes from memory.
pub trait ResourceFetcher: Send + Sync + std::fmt::Debug {
    fn fetch(&self, url: &Url) -> Result<String, ConfigError>;
}

/// Fetches from the local filesystem and over blocking HTTP.
#[derive(Debug, Clone)]
pub struct DefaultFetcher {
    timeout: Duration,
}

impl Default for DefaultFetcher {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }
}

impl DefaultFetcher {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    fn fetch_file(&self, url: &Url) -> Result<String, ConfigError> {
        let path = url
            .to_file_path()
            .map_err(|()| ConfigError::NotAFilePath(url.to_string()))?;
        match std::fs::read(&path) {
            Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(ConfigError::FileNotFound(path)),
            Err(e) => Err(ConfigError::ReadError { path, source: e }),
        }
    }

    fn fetch_http(&self, url: &Url) -> Result<String, ConfigError> {
        let http_error = |source| ConfigError::HttpError {
            url: url.to_string(),
            source,
        };

        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(http_error)?;

        let response = client.get(url.clone()).send().map_err(http_error)?;
        if !response.status().is_success() {
            return Err(ConfigError::HttpStatus {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }
        response.text().map_err(http_error)
    }
}

impl ResourceFetcher for DefaultFetcher {
    fn fetch(&self, url: &Url) -> Result<String, ConfigError> {
        match url.scheme() {
            "file" => self.fetch_file(url),
            "http" | "https" => self.fetch_http(url),
            other => Err(ConfigError::UnsupportedScheme(other.to_string())),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;

    use super::*;

    /// Serves resources from memory, keyed by URL string.
    #[derive(Debug, Default)]
    pub(crate) struct MapFetcher {
        resources: HashMap<String, String>,
    }

    impl MapFetcher {
        pub(crate) fn with(mut self, url: &str, text: &str) -> Self {
            self.resources.insert(url.to_string(), text.to_string());
            self
        }
    }

    impl ResourceFetcher for MapFetcher {
        fn fetch(&self, url: &Url) -> Result<String, ConfigError> {
            self.resources
                .get(url.as_str())
                .cloned()
                .ok_or_else(|| ConfigError::HttpStatus {
                    url: url.to_string(),
                    status: 404,
                })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_fetch_file_url() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "key=value").unwrap();

        let url = Url::from_file_path(file.path()).unwrap();
        let text = DefaultFetcher::default().fetch(&url).unwrap();
        assert_eq!(text, "key=value\n");
    }

    #[test]
    fn test_fetch_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let url = Url::from_file_path(dir.path().join("missing.conf")).unwrap();
        let err = DefaultFetcher::default().fetch(&url).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_fetch_unsupported_scheme() {
        let url = Url::parse("ftp://example.com/a.conf").unwrap();
        let err = DefaultFetcher::default().fetch(&url).unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedScheme(s) if s == "ftp"));
    }
}
