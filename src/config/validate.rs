//! Checking a store against the keys a program expects.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use tracing::warn;

use super::coerce::FromProperty;
use super::store::PropertyStore;

/// Type a key's value must parse as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    String,
    Integer,
    Float,
    Boolean,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::String => "string",
            ValueKind::Integer => "integer",
            ValueKind::Float => "float",
            ValueKind::Boolean => "boolean",
        };
        f.write_str(name)
    }
}

/// An expected key, with aliases, whether it is mandatory and its value type.
///
/// Parsed from `keys[=|:]attrs`:
///
/// - `keys` is a comma separated list of aliases (`v,verbose`).
/// - `=` makes the key mandatory, `:` optional. With no separator the key is
///   an optional string.
/// - `attrs` is a comma separated list of `m` (mandatory), `o` (optional),
///   `s`, `i`, `f`/`d` or `b` (string, integer, float, boolean).
///
/// ```
/// use rtprops::config::{KeyAttribute, ValueKind};
///
/// let attr: KeyAttribute = "p,port=i".parse().unwrap();
/// assert_eq!(attr.keys, vec!["p", "port"]);
/// assert!(attr.mandatory);
/// assert_eq!(attr.kind, ValueKind::Integer);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyAttribute {
    pub keys: Vec<String>,
    pub mandatory: bool,
    pub kind: ValueKind,
}

impl FromStr for KeyAttribute {
    type Err = KeyAttributeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || KeyAttributeError::InvalidSpec(s.to_string());
        let (keys, mandatory, attrs) = match s.find(&['=', ':'][..]) {
            Some(0) => return Err(invalid()),
            Some(p) => (&s[..p], s[p..].starts_with('='), &s[p + 1..]),
            None => (s, false, ""),
        };

        let keys: Vec<String> = keys
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .collect();
        if keys.is_empty() {
            return Err(invalid());
        }

        let mut attr = KeyAttribute {
            keys,
            mandatory,
            kind: ValueKind::String,
        };
        for flag in attrs.split(',').map(str::trim).filter(|a| !a.is_empty()) {
            match flag {
                "m" => attr.mandatory = true,
                "o" => attr.mandatory = false,
                "s" => attr.kind = ValueKind::String,
                "i" => attr.kind = ValueKind::Integer,
                "f" | "d" => attr.kind = ValueKind::Float,
                "b" => attr.kind = ValueKind::Boolean,
                _ => return Err(invalid()),
            }
        }
        Ok(attr)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyAttributeError {
    #[error("invalid key attribute specification: {0}")]
    InvalidSpec(String),

    #[error("multiple values found for keys: {0}")]
    Ambiguous(String),

    #[error("mandatory key not specified: {0}")]
    MissingMandatory(String),

    #[error("invalid value for key ({kind}): {key}")]
    InvalidValue { key: String, kind: ValueKind },
}

/// Outcome of [`PropertyStore::validate_key_attributes`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Validation {
    pub errors: Vec<KeyAttributeError>,
    /// Keys present in the store that no attribute names. These are warnings.
    pub unrecognized: Vec<String>,
}

impl Validation {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

impl PropertyStore {
    /// Checks the store against a list of expected keys.
    ///
    /// Values are expanded before they are checked, and types are parsed
    /// strictly. A mandatory boolean may be given as a bare flag with no value.
    /// Keys starting with `$` or `%` are never reported as unrecognized.
    pub fn validate_key_attributes(&self, attributes: &[KeyAttribute]) -> Validation {
        let mut validation = Validation::default();
        let mut unclaimed: Vec<&str> = self
            .keys(None)
            .into_iter()
            .filter(|k| !k.starts_with(&['$', '%'][..]))
            .collect();

        for attr in attributes {
            let aliases: Vec<&str> = attr.keys.iter().map(String::as_str).collect();
            let joined = aliases.join(",");
            unclaimed.retain(|k| !aliases.iter().any(|a| self.same_key(k, a)));

            let found = aliases.iter().filter(|a| self.contains_key(a)).count();
            if found > 1 {
                validation
                    .errors
                    .push(KeyAttributeError::Ambiguous(joined.clone()));
            }

            let Some(key) = self.first_defined(&aliases) else {
                if attr.mandatory {
                    validation
                        .errors
                        .push(KeyAttributeError::MissingMandatory(joined));
                }
                continue;
            };
            let value = self.get_string(key).unwrap_or_default();
            if value.trim().is_empty() {
                if attr.mandatory && attr.kind != ValueKind::Boolean {
                    validation
                        .errors
                        .push(KeyAttributeError::MissingMandatory(joined));
                }
                continue;
            }

            let valid = match attr.kind {
                ValueKind::String => true,
                ValueKind::Integer => i64::from_property(&value, true).is_some(),
                ValueKind::Float => f64::from_property(&value, true).is_some(),
                ValueKind::Boolean => bool::from_property(&value, true).is_some(),
            };
            if !valid {
                validation.errors.push(KeyAttributeError::InvalidValue {
                    key: key.to_string(),
                    kind: attr.kind,
                });
            }
        }

        for key in unclaimed {
            warn!(key, "unrecognized key specified");
            validation.unrecognized.push(key.to_string());
        }
        validation
    }

    fn same_key(&self, a: &str, b: &str) -> bool {
        if self.ignore_case() {
            a.eq_ignore_ascii_case(b)
        } else {
            a == b
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(specs: &[&str]) -> Vec<KeyAttribute> {
        specs.iter().map(|s| s.parse().unwrap()).collect()
    }

    #[test]
    fn test_parse_key_attributes() {
        let a: KeyAttribute = "name".parse().unwrap();
        assert_eq!((a.mandatory, a.kind), (false, ValueKind::String));

        let a: KeyAttribute = "b,bb:m,b".parse().unwrap();
        assert_eq!(a.keys, vec!["b", "bb"]);
        assert_eq!((a.mandatory, a.kind), (true, ValueKind::Boolean));

        let a: KeyAttribute = "ratio=o,d".parse().unwrap();
        assert_eq!((a.mandatory, a.kind), (false, ValueKind::Float));

        assert!("=i".parse::<KeyAttribute>().is_err());
        assert!(",:i".parse::<KeyAttribute>().is_err());
        assert!("x:q".parse::<KeyAttribute>().is_err());
    }

    #[test]
    fn test_valid_store_passes() {
        let store = PropertyStore::from_args(&["-port=8080", "-v", "-ratio=0.5", "-$tmp=1"]);
        let validation =
            store.validate_key_attributes(&attrs(&["port=i", "v,verbose=b", "ratio:f", "host"]));
        assert!(validation.is_valid(), "{:?}", validation.errors);
        assert!(validation.unrecognized.is_empty());
    }

    #[test]
    fn test_validation_errors() {
        let store = PropertyStore::parse("port=eighty v=1 verbose=yes ratio=1.5x name= extra=1");
        let validation = store.validate_key_attributes(&attrs(&[
            "port=i",
            "v,verbose:b",
            "ratio:f",
            "name=s",
            "host=s",
        ]));
        assert_eq!(
            validation.errors,
            vec![
                KeyAttributeError::InvalidValue {
                    key: "port".to_string(),
                    kind: ValueKind::Integer,
                },
                KeyAttributeError::Ambiguous("v,verbose".to_string()),
                KeyAttributeError::InvalidValue {
                    key: "ratio".to_string(),
                    kind: ValueKind::Float,
                },
                KeyAttributeError::MissingMandatory("name".to_string()),
                KeyAttributeError::MissingMandatory("host".to_string()),
            ]
        );
        assert_eq!(validation.unrecognized, vec!["extra"]);
        assert!(!validation.is_valid());
    }
}
