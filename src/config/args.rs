//! Command line arguments as properties.

use tracing::warn;

use super::store::PropertyStore;

const ARG_PREFIX: char = '-';

impl PropertyStore {
    /// Builds a store from `key=value` style arguments. See [`set_args`](Self::set_args).
    pub fn from_args<S: AsRef<str>>(args: &[S]) -> Self {
        let mut store = Self::new();
        store.set_args(args);
        store
    }

    /// Adds command line arguments as properties.
    ///
    /// - `key=value` and `-key=value` (any number of leading `-`) set `key`.
    ///   The argument may be wrapped in single or double quotes.
    /// - `-key value` takes the next argument as the value, unless that one
    ///   also starts with `-`.
    /// - `-key` or `key` alone sets `key` to an empty value, which reads as
    ///   `true` through [`get_bool`](Self::get_bool).
    /// - A bare `-` or `--` stops parsing.
    ///
    /// Returns the index of the first argument after the `-`/`--` terminator,
    /// or `None` if every argument was consumed.
    ///
    /// ```
    /// use rtprops::PropertyStore;
    ///
    /// let mut store = PropertyStore::new();
    /// let rest = store.set_args(&["-port=8080", "-host", "db1", "--", "extra"]);
    /// assert_eq!(store.get_int("port", 0), 8080);
    /// assert_eq!(store.get("host"), Some("db1"));
    /// assert_eq!(rest, Some(4));
    /// ```
    pub fn set_args<S: AsRef<str>>(&mut self, args: &[S]) -> Option<usize> {
        let mut i = 0;
        while i < args.len() {
            let arg = args[i].as_ref();
            i += 1;
            if arg.trim().is_empty() {
                continue;
            }

            let kv = unquote(arg);
            let sep = kv.find(|c: char| self.key_value_separators().contains(&c));
            let (mut key, mut value) = match sep {
                Some(p) => (kv[..p].trim(), kv[p + 1..].trim()),
                None => (kv, ""),
            };

            if key.starts_with(ARG_PREFIX) {
                key = key.trim_start_matches(ARG_PREFIX);
                if sep.is_none() {
                    if key.is_empty() {
                        return Some(i).filter(|&next| next < args.len());
                    }
                    if let Some(next) = args.get(i).map(AsRef::as_ref) {
                        if !next.starts_with(ARG_PREFIX) {
                            value = next;
                            i += 1;
                        }
                    }
                }
            }

            if key.is_empty() {
                warn!(argument = %arg, "ignoring invalid key argument");
                continue;
            }
            self.set(key, value);
        }
        None
    }
}

fn unquote(arg: &str) -> &str {
    ['\'', '"']
        .iter()
        .find_map(|&q| {
            arg.strip_prefix(q)
                .and_then(|rest| rest.strip_suffix(q))
        })
        .unwrap_or(arg)
}
