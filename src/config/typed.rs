//! Deserializing a loaded store into a caller type.

use serde::de::DeserializeOwned;
use toml::{Table, Value};

use super::store::PropertyStore;
use super::ConfigError;

impl PropertyStore {
    /// Deserializes the expanded properties into `T`.
    ///
    /// Dotted keys form nested tables (`db.port=5432` fills `db: Db { port }`).
    /// Values are coerced to the most specific of boolean, integer, float or
    /// string. Reserved `%` keys are skipped.
    ///
    /// ```no_run
    /// use rtprops::{ConfigLoader, PropertyStore};
    /// use serde::Deserialize;
    ///
    /// #[derive(Deserialize)]
    /// struct Db {
    ///     host: String,
    ///     port: u16,
    /// }
    ///
    /// #[derive(Deserialize)]
    /// struct AppConfig {
    ///     db: Db,
    /// }
    ///
    /// let store = ConfigLoader::builder().build().load_file("app.conf")?;
    /// let config: AppConfig = store.deserialize()?;
    /// # Ok::<(), rtprops::ConfigError>(())
    /// ```
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, ConfigError> {
        let mut table = Table::new();
        for (key, _) in self.iter() {
            if key.starts_with('%') {
                continue;
            }
            let Some(value) = self.get_string(key) else {
                continue;
            };
            let path: Vec<String> = key.split('.').map(str::to_string).collect();
            merge_at_path(&mut table, &path, coerce_value(&value));
        }

        Value::Table(table)
            .try_into()
            .map_err(ConfigError::DeserializeError)
    }
}

fn merge_at_path(table: &mut Table, path: &[String], value: Value) {
    let Some((first, rest)) = path.split_first() else {
        return;
    };

    if rest.is_empty() {
        match (table.get_mut(first), value) {
            (Some(Value::Table(base)), Value::Table(overlay)) => deep_merge(base, overlay),
            // a scalar never replaces an already nested table
            (Some(Value::Table(_)), _) => {}
            (_, value) => {
                table.insert(first.clone(), value);
            }
        }
        return;
    }

    if !matches!(table.get(first), Some(Value::Table(_))) {
        table.insert(first.clone(), Value::Table(Table::new()));
    }

    if let Some(Value::Table(nested)) = table.get_mut(first) {
        merge_at_path(nested, rest, value);
    }
}

fn deep_merge(base: &mut Table, overlay: Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(Value::Table(base_table)), Value::Table(overlay_table)) => {
                deep_merge(base_table, overlay_table);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

fn coerce_value(s: &str) -> Value {
    if s.eq_ignore_ascii_case("true") {
        return Value::Boolean(true);
    }
    if s.eq_ignore_ascii_case("false") {
        return Value::Boolean(false);
    }

    if looks_like_integer(s) {
        if let Ok(i) = s.parse::<i64>() {
            return Value::Integer(i);
        }
    }

    if s.contains('.') {
        if let Ok(f) = s.parse::<f64>() {
            return Value::Float(f);
        }
    }

    Value::String(s.to_string())
}

fn looks_like_integer(s: &str) -> bool {
    let s = s.strip_prefix('-').unwrap_or(s);
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Db {
        host: String,
        port: u16,
        ratio: f64,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct AppConfig {
        name: String,
        debug: bool,
        db: Db,
    }

    #[test]
    fn test_deserialize_nested_and_expanded() {
        let store = PropertyStore::parse(
            "[app] name=svc-${db.port} debug=TRUE db.host=localhost db.port=5432 db.ratio=0.5",
        );
        let config: AppConfig = store.deserialize().unwrap();
        assert_eq!(
            config,
            AppConfig {
                name: "svc-5432".to_string(),
                debug: true,
                db: Db {
                    host: "localhost".to_string(),
                    port: 5432,
                    ratio: 0.5,
                },
            }
        );
    }

    #[test]
    fn test_deserialize_type_mismatch() {
        let store = PropertyStore::parse("name=x debug=maybe");
        let result: Result<AppConfig, _> = store.deserialize();
        assert!(matches!(result, Err(ConfigError::DeserializeError(_))));
    }

    #[test]
    fn test_coerce_value() {
        assert_eq!(coerce_value("42"), Value::Integer(42));
        assert_eq!(coerce_value("-7"), Value::Integer(-7));
        assert_eq!(coerce_value("1.5"), Value::Float(1.5));
        assert_eq!(coerce_value("False"), Value::Boolean(false));
        assert_eq!(coerce_value("1.2.3"), Value::String("1.2.3".to_string()));
    }

    #[test]
    fn test_scalar_does_not_clobber_table() {
        let mut table = Table::new();
        merge_at_path(
            &mut table,
            &["a".to_string(), "b".to_string()],
            Value::Integer(1),
        );
        merge_at_path(&mut table, &["a".to_string()], Value::Integer(2));
        assert_eq!(table["a"]["b"], Value::Integer(1));
    }
}
