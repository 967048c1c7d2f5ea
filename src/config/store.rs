//! Ordered property storage.

use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use indexmap::IndexMap;

use super::coerce::FromProperty;
use super::resolve::{Expander, KeyLookup};
use super::ConfigError;
use crate::Error;

/// Reserved key holding the store name. Always iterated first.
pub const NAME_KEY: &str = "%name";

/// Reserved key holding the URL of the resource a store was loaded from.
pub const CONFIG_URL_KEY: &str = "%configURL";

/// Key prefixes meaning "remove the rest of this key" on [`PropertyStore::set`].
pub const REMOVAL_MARKERS: [char; 3] = ['!', '|', '^'];

pub const DEFAULT_KEY_VALUE_SEPARATORS: [char; 2] = ['=', ':'];
pub const DEFAULT_PROPERTY_SEPARATOR: char = ' ';

const NAME_START: char = '[';
const NAME_END: char = ']';

/// A single mutation, as seen by change observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyChange {
    pub key: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

type Observer = Arc<dyn Fn(&PropertyChange) + Send + Sync>;

/// Ordered string key/value map with a case sensitivity and blank-value policy.
///
/// Values are stored raw; `${...}` references are expanded when read through
/// [`get_string`](Self::get_string) or the typed accessors.
///
/// Observers registered with [`add_observer`](Self::add_observer) run
/// synchronously on every mutation. They must not mutate the store they
/// observe.
pub struct PropertyStore {
    entries: IndexMap<String, String>,
    ignore_case: bool,
    allow_blank_values: bool,
    log_messages: bool,
    key_value_separators: Vec<char>,
    property_separator: char,
    observers: Vec<(ObserverId, Observer)>,
    next_observer: u64,
}

impl Default for PropertyStore {
    fn default() -> Self {
        Self {
            entries: IndexMap::new(),
            ignore_case: false,
            allow_blank_values: true,
            log_messages: true,
            key_value_separators: DEFAULT_KEY_VALUE_SEPARATORS.to_vec(),
            property_separator: DEFAULT_PROPERTY_SEPARATOR,
            observers: Vec::new(),
            next_observer: 0,
        }
    }
}

impl Clone for PropertyStore {
    /// Clones entries and policy. Observers are not carried over.
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
            observers: Vec::new(),
            next_observer: 0,
            key_value_separators: self.key_value_separators.clone(),
            ..*self
        }
    }
}

impl fmt::Debug for PropertyStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyStore")
            .field("entries", &self.entries)
            .field("ignore_case", &self.ignore_case)
            .field("allow_blank_values", &self.allow_blank_values)
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl PropertyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses `"[name] key=value key2=\"quoted value\""` into a new store.
    pub fn parse(text: &str) -> Self {
        let mut store = Self::new();
        store.set_properties_str(text, true);
        store
    }

    /// An empty store sharing this store's policy settings.
    pub fn empty_like(&self) -> Self {
        Self {
            entries: IndexMap::new(),
            observers: Vec::new(),
            next_observer: 0,
            key_value_separators: self.key_value_separators.clone(),
            ..*self
        }
    }

    // ------------------------------------------------------------------
    // policy

    pub fn ignore_case(&self) -> bool {
        self.ignore_case
    }

    pub fn set_ignore_case(&mut self, ignore_case: bool) {
        self.ignore_case = ignore_case;
    }

    pub fn allow_blank_values(&self) -> bool {
        self.allow_blank_values
    }

    /// When disabled, setting a blank value removes the key instead.
    pub fn set_allow_blank_values(&mut self, allow: bool) {
        self.allow_blank_values = allow;
    }

    /// Whether `%log` directives emit messages while loading into this store.
    pub fn log_messages(&self) -> bool {
        self.log_messages
    }

    pub fn set_log_messages(&mut self, enabled: bool) {
        self.log_messages = enabled;
    }

    pub fn key_value_separators(&self) -> &[char] {
        &self.key_value_separators
    }

    /// Sets the key/value separators used by [`set_properties_str`](Self::set_properties_str).
    /// An empty slice restores the defaults.
    pub fn set_key_value_separators(&mut self, separators: &[char]) {
        self.key_value_separators = if separators.is_empty() {
            DEFAULT_KEY_VALUE_SEPARATORS.to_vec()
        } else {
            separators.to_vec()
        };
    }

    pub fn property_separator(&self) -> char {
        self.property_separator
    }

    pub fn set_property_separator(&mut self, separator: char) {
        self.property_separator = separator;
    }

    // ------------------------------------------------------------------
    // observers

    pub fn add_observer<F>(&mut self, observer: F) -> ObserverId
    where
        F: Fn(&PropertyChange) + Send + Sync + 'static,
    {
        let id = ObserverId(self.next_observer);
        self.next_observer += 1;
        self.observers.push((id, Arc::new(observer)));
        id
    }

    pub fn remove_observer(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(oid, _)| *oid != id);
        self.observers.len() != before
    }

    fn notify(&self, key: &str, old_value: Option<String>, new_value: Option<&str>) {
        if self.observers.is_empty() {
            return;
        }
        let change = PropertyChange {
            key: key.to_string(),
            old_value,
            new_value: new_value.map(str::to_string),
        };
        for (_, observer) in &self.observers {
            observer(&change);
        }
    }

    // ------------------------------------------------------------------
    // raw access

    fn index_of(&self, key: &str) -> Option<usize> {
        match self.entries.get_index_of(key) {
            Some(i) => Some(i),
            None if self.ignore_case => self
                .entries
                .keys()
                .position(|k| k.eq_ignore_ascii_case(key)),
            None => None,
        }
    }

    /// Returns the raw, unexpanded value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.index_of(key)
            .and_then(|i| self.entries.get_index(i))
            .map(|(_, v)| v.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.index_of(key).is_some()
    }

    /// Returns the first key of `keys` that is defined.
    pub fn first_defined<'k>(&self, keys: &[&'k str]) -> Option<&'k str> {
        keys.iter().copied().find(|k| self.contains_key(k))
    }

    /// Sets `key` to `value`.
    ///
    /// A key starting with one of [`REMOVAL_MARKERS`] removes the rest of the
    /// key instead (`"!db.host"` removes `db.host`). With blank values
    /// disallowed, a blank value also removes the key.
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        if key.is_empty() {
            return;
        }
        if let Some(target) = key.strip_prefix(&REMOVAL_MARKERS[..]) {
            self.remove(target);
            return;
        }
        let value = value.into();
        if !self.allow_blank_values && value.trim().is_empty() {
            self.remove(key);
            return;
        }

        let old_value = match self.index_of(key) {
            Some(i) => {
                let old = self
                    .entries
                    .get_index_mut(i)
                    .map(|(_, slot)| std::mem::replace(slot, value.clone()));
                if key == NAME_KEY {
                    self.entries.move_index(i, 0);
                }
                old
            }
            None if key == NAME_KEY => {
                self.entries.shift_insert(0, key.to_string(), value.clone());
                None
            }
            None => {
                self.entries.insert(key.to_string(), value.clone());
                None
            }
        };
        self.notify(key, old_value, Some(&value));
    }

    /// Removes `key`, preserving the order of the remaining entries.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        let index = self.index_of(key)?;
        let (stored_key, old) = self.entries.shift_remove_index(index)?;
        self.notify(&stored_key, Some(old.clone()), None);
        Some(old)
    }

    pub fn remove_all<'k>(&mut self, keys: impl IntoIterator<Item = &'k str>) {
        for key in keys {
            self.remove(key);
        }
    }

    pub fn clear(&mut self) {
        let keys: Vec<String> = self.entries.keys().cloned().collect();
        for key in keys {
            self.remove(&key);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates raw entries in insertion order (name first).
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Keys in insertion order, optionally restricted to those starting with `prefix`.
    pub fn keys(&self, prefix: Option<&str>) -> Vec<&str> {
        self.entries
            .keys()
            .filter(|k| prefix.map_or(true, |p| self.key_starts_with(k, p)))
            .map(String::as_str)
            .collect()
    }

    fn key_starts_with(&self, key: &str, prefix: &str) -> bool {
        if self.ignore_case {
            key.len() >= prefix.len()
                && key.is_char_boundary(prefix.len())
                && key[..prefix.len()].eq_ignore_ascii_case(prefix)
        } else {
            key.starts_with(prefix)
        }
    }

    /// A new store holding the raw entries whose keys start with `prefix`.
    pub fn subset(&self, prefix: &str) -> PropertyStore {
        let mut subset = self.empty_like();
        for (key, value) in &self.entries {
            if self.key_starts_with(key, prefix) {
                subset.set(key, value.clone());
            }
        }
        subset
    }

    /// Copies every entry of `other` into this store. Existing keys absent
    /// from `other` are kept.
    ///
    /// Returns the name of `other`, which is applied to this store only when
    /// `include_name` is set.
    pub fn merge(&mut self, other: &PropertyStore, include_name: bool) -> Option<String> {
        let mut name = None;
        for (key, value) in &other.entries {
            if key == NAME_KEY {
                name = Some(value.clone());
                if include_name {
                    self.set(NAME_KEY, value.clone());
                }
            } else {
                self.set(key, value.clone());
            }
        }
        name
    }

    pub fn name(&self) -> Option<&str> {
        self.get(NAME_KEY)
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.set(NAME_KEY, name);
    }

    // ------------------------------------------------------------------
    // expanded access

    /// Expands `${...}` references in `text` against this store.
    pub fn expand(&self, text: &str) -> String {
        Expander::new(self).expand(text)
    }

    /// Returns the value for `key` with references expanded.
    ///
    /// The key itself is excluded from its own expansion, so `k=${k}` reads
    /// back as `${k}`.
    pub fn get_string(&self, key: &str) -> Option<String> {
        let raw = self.get(key)?;
        Some(Expander::new(self).main_key(key).expand(raw))
    }

    pub fn get_string_or(&self, key: &str, default: &str) -> String {
        self.get_string(key).unwrap_or_else(|| default.to_string())
    }

    /// Parses the expanded value of `key` as `T`.
    pub fn get_as<T: FromProperty>(&self, key: &str, strict: bool) -> Option<T> {
        self.get_string(key)
            .and_then(|v| T::from_property(&v, strict))
    }

    /// Like [`get_as`](Self::get_as) with strict parsing, but reports why the value is unusable.
    pub fn require<T: FromProperty>(&self, key: &str) -> Result<T, Error> {
        let value = self
            .get_string(key)
            .ok_or_else(|| Error::MissingProperty(key.to_string()))?;
        T::from_property(&value, true).ok_or(Error::InvalidValue {
            key: key.to_string(),
            value,
            expected: T::EXPECTED,
        })
    }

    pub fn get_int(&self, key: &str, default: i32) -> i32 {
        self.get_as(key, false).unwrap_or(default)
    }

    pub fn get_long(&self, key: &str, default: i64) -> i64 {
        self.get_as(key, false).unwrap_or(default)
    }

    pub fn get_big_int(&self, key: &str, default: i128) -> i128 {
        self.get_as(key, false).unwrap_or(default)
    }

    pub fn get_double(&self, key: &str, default: f64) -> f64 {
        self.get_as(key, false).unwrap_or(default)
    }

    pub fn get_float(&self, key: &str, default: f32) -> f32 {
        self.get_as(key, false).unwrap_or(default)
    }

    /// A key that is defined with an empty value reads as `true`.
    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.get_string(key) {
            Some(v) if v.trim().is_empty() => true,
            Some(v) => bool::from_property(&v, false).unwrap_or(default),
            None => default,
        }
    }

    pub fn is_int(&self, key: &str, strict: bool) -> bool {
        self.get_as::<i32>(key, strict).is_some()
    }

    pub fn is_long(&self, key: &str, strict: bool) -> bool {
        self.get_as::<i64>(key, strict).is_some()
    }

    pub fn is_double(&self, key: &str, strict: bool) -> bool {
        self.get_as::<f64>(key, strict).is_some()
    }

    pub fn is_bool(&self, key: &str, strict: bool) -> bool {
        self.get_as::<bool>(key, strict).is_some()
    }

    // ------------------------------------------------------------------
    // string form

    /// Adds the properties in `"[name] key=value key=value"` form.
    ///
    /// Returns the name, if one was given either as a `[name]` prefix or a
    /// `%name` entry. The name is only applied when `include_name` is set.
    pub fn set_properties_str(&mut self, text: &str, include_name: bool) -> Option<String> {
        let mut rest = text.trim();
        let mut name = None;
        if let Some(after) = rest.strip_prefix(NAME_START) {
            match after.find(NAME_END) {
                Some(end) => {
                    name = Some(after[..end].trim().to_string());
                    rest = after[end + 1..].trim();
                }
                None => rest = after.trim(),
            }
        }

        let pairs = parse_properties(rest, self.property_separator, &self.key_value_separators);
        for (key, value) in pairs {
            if key == NAME_KEY {
                if name.is_none() {
                    name = Some(value);
                }
            } else {
                self.set(&key, value);
            }
        }

        if include_name {
            if let Some(n) = &name {
                self.set_name(n.clone());
            }
        }
        name
    }
}

impl PropertyStore {
    /// Writes the raw entries to `path`, one `key=value` line each, in
    /// iteration order. The first key/value separator is used.
    ///
    /// The output can be loaded back with [`ConfigLoader`](super::ConfigLoader).
    /// A value with leading whitespace keeps it, trailing whitespace is lost.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let kv = self.key_value_separators.first().copied().unwrap_or('=');
        let mut out = String::new();
        for (key, value) in &self.entries {
            out.push_str(key);
            out.push(kv);
            out.push_str(value);
            out.push('\n');
        }
        fs::write(path, out).map_err(|e| ConfigError::WriteError {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

impl KeyLookup for PropertyStore {
    fn lookup(&self, key: &str, _arg: Option<&str>, _default: &str) -> Option<String> {
        self.get(key).map(str::to_string)
    }
}

impl fmt::Display for PropertyStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let separator = self.property_separator;
        let kv = self.key_value_separators.first().copied().unwrap_or('=');
        for (i, (key, value)) in self.entries.iter().enumerate() {
            if i > 0 {
                write!(f, "{separator}")?;
            }
            let needs_quotes = value.is_empty()
                || value
                    .chars()
                    .any(|c| c.is_whitespace() || c == separator || c == '"');
            if needs_quotes {
                let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
                write!(f, "{key}{kv}\"{escaped}\"")?;
            } else {
                write!(f, "{key}{kv}{value}")?;
            }
        }
        Ok(())
    }
}

/// Splits `key=value` pairs separated by `property_separator`.
///
/// Values may be double quoted to contain separators, with `\` escaping the
/// next character inside quotes. A key without a separator gets an empty value.
fn parse_properties(
    text: &str,
    property_separator: char,
    key_value_separators: &[char],
) -> Vec<(String, String)> {
    let space_separated = property_separator == ' ' || property_separator == '\0';
    let is_prop_sep = |c: char| c == property_separator;
    let is_kv_sep = |c: char| key_value_separators.contains(&c);

    let chars: Vec<char> = text.trim().chars().collect();
    let len = chars.len();
    let mut pairs = Vec::new();
    let mut a = 0;

    while a < len {
        while a < len && (chars[a].is_whitespace() || is_prop_sep(chars[a])) {
            a += 1;
        }

        let mut key = String::new();
        while a < len && !chars[a].is_whitespace() && !is_prop_sep(chars[a]) && !is_kv_sep(chars[a])
        {
            key.push(chars[a]);
            a += 1;
        }

        if !space_separated {
            while a < len && chars[a].is_whitespace() {
                a += 1;
            }
        }

        let mut value = String::new();
        if a < len && is_kv_sep(chars[a]) {
            a += 1;
            if !space_separated {
                while a < len && chars[a].is_whitespace() {
                    a += 1;
                }
            }
            if a < len && chars[a] == '"' {
                a += 1;
                while a < len && chars[a] != '"' {
                    if chars[a] == '\\' && a + 1 < len {
                        a += 1;
                    }
                    value.push(chars[a]);
                    a += 1;
                }
                if a < len {
                    a += 1;
                }
            } else {
                while a < len && !chars[a].is_whitespace() && !is_prop_sep(chars[a]) {
                    value.push(chars[a]);
                    a += 1;
                }
            }
        }

        if !key.is_empty() {
            pairs.push((key, value));
        }

        // trailing junk up to the next separator
        while a < len && !is_prop_sep(chars[a]) {
            a += 1;
        }
    }

    pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_insertion_order_preserved() {
        let mut store = PropertyStore::new();
        store.set("zeta", "1");
        store.set("alpha", "2");
        store.set("mid", "3");
        store.set("alpha", "4");
        assert_eq!(store.keys(None), vec!["zeta", "alpha", "mid"]);
        assert_eq!(store.get("alpha"), Some("4"));
    }

    #[test]
    fn test_name_key_always_first() {
        let mut store = PropertyStore::new();
        store.set("a", "1");
        store.set("b", "2");
        store.set_name("main");
        assert_eq!(store.keys(None), vec![NAME_KEY, "a", "b"]);
        assert_eq!(store.name(), Some("main"));
        assert_eq!(store.to_string(), "%name=main a=1 b=2");
    }

    #[test]
    fn test_removal_markers() {
        let mut store = PropertyStore::new();
        store.set("a", "1");
        store.set("b", "2");
        store.set("c", "3");
        store.set("!a", "ignored");
        store.set("|b", "");
        store.set("^c", "x");
        assert!(store.is_empty());
    }

    #[test]
    fn test_blank_value_policy() {
        let mut store = PropertyStore::new();
        store.set("a", "1");
        store.set("a", "");
        assert_eq!(store.get("a"), Some(""));

        store.set_allow_blank_values(false);
        store.set("a", "   ");
        assert!(!store.contains_key("a"));
    }

    #[test]
    fn test_ignore_case_lookup_keeps_original_key() {
        let mut store = PropertyStore::new();
        store.set_ignore_case(true);
        store.set("Db.Host", "one");
        store.set("DB.HOST", "two");
        assert_eq!(store.keys(None), vec!["Db.Host"]);
        assert_eq!(store.get("db.host"), Some("two"));
        assert_eq!(store.keys(Some("db.")), vec!["Db.Host"]);
    }

    #[test]
    fn test_merge_is_additive() {
        let mut parent = PropertyStore::new();
        parent.set("keep", "p");
        parent.set("shared", "p");

        let mut child = PropertyStore::new();
        child.set_name("child");
        child.set("shared", "c");
        child.set("new", "c");

        let name = parent.merge(&child, false);
        assert_eq!(name.as_deref(), Some("child"));
        assert_eq!(parent.name(), None);
        assert_eq!(parent.get("keep"), Some("p"));
        assert_eq!(parent.get("shared"), Some("c"));
        assert_eq!(parent.keys(None), vec!["keep", "shared", "new"]);

        parent.merge(&child, true);
        assert_eq!(parent.name(), Some("child"));
    }

    #[test]
    fn test_subset_by_prefix() {
        let store = PropertyStore::parse("db.host=h db.port=5 web.port=80");
        let db = store.subset("db.");
        assert_eq!(db.keys(None), vec!["db.host", "db.port"]);
        assert_eq!(db.get("db.port"), Some("5"));
    }

    #[test]
    fn test_get_string_expands_references() {
        let store = PropertyStore::parse("host=example.com url=http://${host}:${port=80}/");
        assert_eq!(
            store.get_string("url").as_deref(),
            Some("http://example.com:80/")
        );
        assert_eq!(store.get("url"), Some("http://${host}:${port=80}/"));
    }

    #[test]
    fn test_self_reference_reads_back_unresolved() {
        let mut store = PropertyStore::new();
        store.set("key", "${key}");
        assert_eq!(store.get_string("key").as_deref(), Some("${key}"));
    }

    #[test]
    fn test_typed_accessors() {
        let store = PropertyStore::parse(
            "port=8080 ratio=0.75 flag=yes empty= big=0x10 bad=abc size=12kb",
        );
        assert_eq!(store.get_int("port", 0), 8080);
        assert_eq!(store.get_long("size", 0), 12);
        assert_eq!(store.get_double("ratio", 0.0), 0.75);
        assert!(store.get_bool("flag", false));
        assert!(store.get_bool("empty", false));
        assert!(!store.get_bool("missing", false));
        assert_eq!(store.get_big_int("big", 0), 16);
        assert_eq!(store.get_int("bad", -1), -1);
        assert!(store.is_long("size", false));
        assert!(!store.is_long("size", true));
    }

    #[test]
    fn test_require_reports_errors() {
        let store = PropertyStore::parse("port=eighty");
        assert!(matches!(
            store.require::<i32>("port"),
            Err(Error::InvalidValue { expected: "an int", .. })
        ));
        assert!(matches!(
            store.require::<i32>("missing"),
            Err(Error::MissingProperty(_))
        ));
    }

    #[test]
    fn test_parse_name_and_quoted_values() {
        let mut store = PropertyStore::new();
        let name = store.set_properties_str(
            r#"[server] greeting="hello \"world\"" port=80 flag"#,
            true,
        );
        assert_eq!(name.as_deref(), Some("server"));
        assert_eq!(store.get("greeting"), Some(r#"hello "world""#));
        assert_eq!(store.get("port"), Some("80"));
        assert_eq!(store.get("flag"), Some(""));
        assert_eq!(store.keys(None), vec![NAME_KEY, "greeting", "port", "flag"]);
    }

    #[test]
    fn test_parse_with_semicolon_separator() {
        let mut store = PropertyStore::new();
        store.set_property_separator(';');
        store.set_properties_str("a = one two ; b:three", false);
        assert_eq!(store.get("a"), Some("one"));
        assert_eq!(store.get("b"), Some("three"));
    }

    #[test]
    fn test_display_round_trip() {
        let mut store = PropertyStore::new();
        store.set("plain", "v");
        store.set("spaced", "a b");
        store.set("quoted", "say \"hi\"");
        let reparsed = PropertyStore::parse(&store.to_string());
        assert_eq!(reparsed.get("plain"), Some("v"));
        assert_eq!(reparsed.get("spaced"), Some("a b"));
        assert_eq!(reparsed.get("quoted"), Some("say \"hi\""));
    }

    #[test]
    fn test_save_writes_loadable_lines() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("saved.conf");

        let mut store = PropertyStore::new();
        store.set("db.host", "localhost");
        store.set("greeting", "  hello world");
        store.set("url", "jdbc://${db.host}/app");
        store.set_name("saved");
        store.save(&path).unwrap();

        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "%name=saved\ndb.host=localhost\ngreeting=  hello world\nurl=jdbc://${db.host}/app\n"
        );
        let loaded = crate::ConfigLoader::default().load_file(&path).unwrap();
        assert_eq!(loaded.name(), Some("saved"));
        assert_eq!(loaded.get("greeting"), Some("  hello world"));
        assert_eq!(
            loaded.get_string("url").as_deref(),
            Some("jdbc://localhost/app")
        );
    }

    #[test]
    fn test_save_to_missing_directory_fails() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = PropertyStore::parse("a=1")
            .save(dir.path().join("no/such/dir/x.conf"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::WriteError { .. }));
    }

    #[test]
    fn test_observers_see_mutations() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut store = PropertyStore::new();
        let sink = Arc::clone(&seen);
        let id = store.add_observer(move |change| {
            sink.lock().unwrap().push(change.clone());
        });

        store.set("a", "1");
        store.set("a", "2");
        store.remove("a");
        assert!(store.remove_observer(id));
        store.set("b", "3");

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[1].old_value.as_deref(), Some("1"));
        assert_eq!(seen[1].new_value.as_deref(), Some("2"));
        assert_eq!(seen[2].new_value, None);
    }

    #[test]
    fn test_clone_drops_observers() {
        let mut store = PropertyStore::new();
        store.set_allow_blank_values(false);
        store.add_observer(|_| {});
        store.set("a", "1");
        let copy = store.clone();
        assert_eq!(copy.get("a"), Some("1"));
        assert!(!copy.allow_blank_values());
        assert!(format!("{copy:?}").contains("observers: 0"));
    }
}
