use super::store::PropertyStore;

/// Ambient properties taken from environment variables.
///
/// `MYAPP__DB__HOST=localhost` with prefix `MYAPP` and separator `__`
/// becomes `db.host=localhost`. Values are kept as strings.
#[derive(Debug, Clone)]
pub struct EnvSource {
    prefix: String,
    separator: String,
}

impl EnvSource {
    /// An empty separator falls back to `__`.
    pub fn new(prefix: impl Into<String>, separator: impl Into<String>) -> Self {
        let separator = separator.into();
        Self {
            prefix: prefix.into(),
            separator: if separator.is_empty() {
                "__".to_string()
            } else {
                separator
            },
        }
    }

    /// Reads the current process environment.
    pub fn load(&self) -> PropertyStore {
        self.load_from(std::env::vars())
    }

    pub fn load_from(&self, vars: impl IntoIterator<Item = (String, String)>) -> PropertyStore {
        let prefix_with_sep = format!("{}{}", self.prefix, self.separator);
        let mut store = PropertyStore::new();

        for (key, value) in vars {
            let Some(path_str) = key.strip_prefix(&prefix_with_sep) else {
                continue;
            };
            if path_str.is_empty() {
                continue;
            }

            let path: Vec<String> = path_str
                .split(self.separator.as_str())
                .map(|s| s.to_lowercase())
                .collect();
            store.set(&path.join("."), value);
        }

        store
    }
}
