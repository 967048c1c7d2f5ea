//! Variable reference expansion for property values.
//!
//! Supports `${key}`, `${key:arg}`, `${key=default}` and `${key:arg=default}`.
//! Defaults may themselves contain references, which are only expanded when
//! the outer key is undefined. Use `\${...}` to keep a reference literally.
//!
//! Expansion runs in passes over the whole string until the text stops
//! changing or [`KEY_MAX_RECURSION`] passes have run. A key is never
//! substituted into text that was produced by its own value, so
//! self-referential values stabilize instead of growing.

/// Maximum number of expansion passes over a string.
pub const KEY_MAX_RECURSION: usize = 6;

const KEY_START_ESC: u8 = b'\\';

/// The markers that delimit a variable reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delimiters {
    pub start: String,
    pub end: String,
    pub arg: String,
    pub default: String,
}

impl Default for Delimiters {
    fn default() -> Self {
        Self {
            start: "${".to_string(),
            end: "}".to_string(),
            arg: ":".to_string(),
            default: "=".to_string(),
        }
    }
}

impl Delimiters {
    /// Custom start/end markers with the default `:` and `=` separators.
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
            ..Self::default()
        }
    }
}

/// Source of values for variable references.
pub trait KeyLookup {
    /// Returns the value for `key`, or `None` if the key is not defined.
    ///
    /// `arg` is the optional `:arg` part of the reference and `default` the
    /// raw (unexpanded) default text, for lookups that want to use them.
    fn lookup(&self, key: &str, arg: Option<&str>, default: &str) -> Option<String>;
}

impl<F> KeyLookup for F
where
    F: Fn(&str, Option<&str>, &str) -> Option<String>,
{
    fn lookup(&self, key: &str, arg: Option<&str>, default: &str) -> Option<String> {
        self(key, arg, default)
    }
}

/// Expands `${...}` references in `text` using the default delimiters.
pub fn expand(text: &str, lookup: &dyn KeyLookup) -> String {
    Expander::new(lookup).expand(text)
}

/// Configurable variable expander.
pub struct Expander<'a> {
    lookup: &'a dyn KeyLookup,
    delimiters: Delimiters,
    filter: Option<&'a dyn Fn(&str) -> String>,
    main_key: Option<&'a str>,
}

impl<'a> Expander<'a> {
    pub fn new(lookup: &'a dyn KeyLookup) -> Self {
        Self {
            lookup,
            delimiters: Delimiters::default(),
            filter: None,
            main_key: None,
        }
    }

    pub fn delimiters(mut self, delimiters: Delimiters) -> Self {
        self.delimiters = delimiters;
        self
    }

    /// Applies `filter` to every looked-up value before it is substituted.
    /// Default text is substituted unfiltered.
    pub fn filter(mut self, filter: &'a dyn Fn(&str) -> String) -> Self {
        self.filter = Some(filter);
        self
    }

    /// The key whose value is being expanded. References to it are left as written.
    pub fn main_key(mut self, key: &'a str) -> Self {
        self.main_key = Some(key);
        self
    }

    pub fn expand(&self, text: &str) -> String {
        let delims = &self.delimiters;
        if delims.start.is_empty() || delims.end.is_empty() || !text.contains(&delims.start) {
            return text.to_string();
        }

        let mut frame = ExpansionFrame::new(self.main_key);
        let mut current = text.to_string();
        let mut origins = vec![ExpansionFrame::ROOT; current.len()];

        while frame.iterations < KEY_MAX_RECURSION {
            frame.iterations += 1;
            let (next, next_origins) = self.expand_pass(&current, &origins, &mut frame);
            if next == current {
                return next;
            }
            current = next;
            origins = next_origins;
        }
        current
    }

    /// Performs a single left-to-right pass, substituting every reference once.
    ///
    /// `origins` maps each byte of `text` to the chain of keys whose values
    /// produced it.
    fn expand_pass(
        &self,
        text: &str,
        origins: &[usize],
        frame: &mut ExpansionFrame,
    ) -> (String, Vec<usize>) {
        let delims = &self.delimiters;
        let bytes = text.as_bytes();
        let start_len = delims.start.len();
        let end_len = delims.end.len();

        let mut out = String::with_capacity(text.len());
        let mut out_origins = Vec::with_capacity(origins.len());
        let mut copied = 0;
        let mut pos = 0;

        while pos < text.len() {
            let Some(found) = text[pos..].find(&delims.start) else {
                break;
            };
            let start = pos + found;

            if start > 0 && bytes[start - 1] == KEY_START_ESC {
                pos = start + start_len;
                continue;
            }

            // unterminated reference, leave the remainder untouched
            let Some(end) = find_end_delimiter(
                bytes,
                start + start_len,
                delims.start.as_bytes(),
                delims.end.as_bytes(),
            ) else {
                break;
            };

            let reference = parse_reference(text[start + start_len..end].trim(), delims);
            let chain = origins[start];

            if frame.chain_contains(chain, reference.key) {
                pos = end + end_len;
                continue;
            }

            let (replacement, replacement_chain) =
                match self
                    .lookup
                    .lookup(reference.key, reference.arg, reference.default)
                {
                    Some(value) => {
                        let value = match self.filter {
                            Some(filter) => filter(&value),
                            None => value,
                        };
                        (value, frame.extend(chain, reference.key))
                    }
                    None => (reference.default.to_string(), chain),
                };

            out.push_str(&text[copied..start]);
            out_origins.extend_from_slice(&origins[copied..start]);
            out.push_str(&replacement);
            out_origins.extend(std::iter::repeat(replacement_chain).take(replacement.len()));

            copied = end + end_len;
            pos = copied;
        }

        out.push_str(&text[copied..]);
        out_origins.extend_from_slice(&origins[copied..]);
        (out, out_origins)
    }
}

struct Reference<'t> {
    key: &'t str,
    arg: Option<&'t str>,
    default: &'t str,
}

/// Splits `key[:arg][=default]`. The default is kept untrimmed.
fn parse_reference<'t>(key_arg_dft: &'t str, delims: &Delimiters) -> Reference<'t> {
    let (key_arg, default) = match key_arg_dft.find(&delims.default) {
        Some(d) if !delims.default.is_empty() => (
            key_arg_dft[..d].trim(),
            &key_arg_dft[d + delims.default.len()..],
        ),
        _ => (key_arg_dft, ""),
    };

    match key_arg.find(&delims.arg) {
        Some(a) if !delims.arg.is_empty() => Reference {
            key: key_arg[..a].trim(),
            arg: Some(&key_arg[a + delims.arg.len()..]),
            default,
        },
        _ => Reference {
            key: key_arg,
            arg: None,
            default,
        },
    }
}

/// Finds the end delimiter matching a start delimiter that ends just before `pos`.
///
/// Nested start delimiters increase the depth, and `\` skips the following character.
fn find_end_delimiter(bytes: &[u8], mut pos: usize, start: &[u8], end: &[u8]) -> Option<usize> {
    let mut depth = 1usize;
    while pos < bytes.len() {
        if bytes[pos] == KEY_START_ESC {
            pos += 2;
            continue;
        }
        if bytes[pos..].starts_with(start) {
            depth += 1;
            pos += start.len();
            continue;
        }
        if bytes[pos..].starts_with(end) {
            depth -= 1;
            if depth == 0 {
                return Some(pos);
            }
            pos += end.len();
            continue;
        }
        pos += 1;
    }
    None
}

/// Per-call expansion state: the key chains that produced each substituted
/// span, and the number of passes run so far.
struct ExpansionFrame {
    chains: Vec<Vec<String>>,
    iterations: usize,
}

impl ExpansionFrame {
    const ROOT: usize = 0;

    fn new(main_key: Option<&str>) -> Self {
        let root = main_key.map(|k| vec![k.to_string()]).unwrap_or_default();
        Self {
            chains: vec![root],
            iterations: 0,
        }
    }

    fn chain_contains(&self, chain: usize, key: &str) -> bool {
        self.chains[chain].iter().any(|k| k == key)
    }

    fn extend(&mut self, chain: usize, key: &str) -> usize {
        let mut keys = self.chains[chain].clone();
        keys.push(key.to_string());
        self.chains.push(keys);
        self.chains.len() - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str, Option<&str>, &str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key, _arg, _dft| map.get(key).cloned()
    }

    #[test]
    fn test_no_reference_fast_path() {
        let lookup = lookup_from(&[]);
        assert_eq!(expand("plain text", &lookup), "plain text");
    }

    #[test]
    fn test_simple_reference() {
        let lookup = lookup_from(&[("host", "localhost")]);
        assert_eq!(expand("http://${host}/api", &lookup), "http://localhost/api");
    }

    #[test]
    fn test_chained_references() {
        let lookup = lookup_from(&[("a", "hello"), ("b", "${a} world"), ("c", "${b}!")]);
        assert_eq!(expand("${c}", &lookup), "hello world!");
    }

    #[test]
    fn test_missing_key_without_default_is_blank() {
        let lookup = lookup_from(&[]);
        assert_eq!(expand("[${missing}]", &lookup), "[]");
    }

    #[test]
    fn test_default_used_when_missing() {
        let lookup = lookup_from(&[("port", "8080")]);
        assert_eq!(expand("${host=localhost}:${port=80}", &lookup), "localhost:8080");
    }

    #[test]
    fn test_default_keeps_leading_space() {
        let lookup = lookup_from(&[]);
        assert_eq!(expand("<${k= spaced}>", &lookup), "< spaced>");
    }

    #[test]
    fn test_default_with_nested_reference() {
        let lookup = lookup_from(&[("fallback", "fb")]);
        assert_eq!(expand("${missing=${fallback}-x}", &lookup), "fb-x");

        let lookup = lookup_from(&[("present", "p"), ("fallback", "fb")]);
        assert_eq!(expand("${present=${fallback}}", &lookup), "p");
    }

    #[test]
    fn test_key_with_arg_and_default() {
        let lookup = lookup_from(&[("b", "5")]);
        assert_eq!(expand("${b:-=fallback}", &lookup), "5");

        let seen = |key: &str, arg: Option<&str>, dft: &str| {
            Some(format!("{key}|{}|{dft}", arg.unwrap_or("none")))
        };
        assert_eq!(expand("${ k : x =d}", &seen), "k| x|d");
    }

    #[test]
    fn test_escaped_reference_left_literal() {
        let lookup = lookup_from(&[("a", "1")]);
        assert_eq!(expand(r"cost \${a} and ${a}", &lookup), r"cost \${a} and 1");
    }

    #[test]
    fn test_unterminated_reference_stops_expansion() {
        let lookup = lookup_from(&[("a", "1")]);
        assert_eq!(expand("${a} ${b ${a}", &lookup), "1 ${b ${a}");
    }

    #[test]
    fn test_self_reference_terminates() {
        let lookup = lookup_from(&[("k", "${k}")]);
        assert_eq!(expand("${k}", &lookup), "${k}");

        let growing = lookup_from(&[("k", "x${k}")]);
        assert_eq!(expand("${k}", &growing), "x${k}");
    }

    #[test]
    fn test_mutual_reference_terminates() {
        let lookup = lookup_from(&[("a", "${b}"), ("b", "${a}")]);
        assert_eq!(expand("${a}", &lookup), "${a}");
    }

    #[test]
    fn test_main_key_is_not_expanded() {
        let lookup = lookup_from(&[("k", "${k}"), ("j", "v")]);
        let out = Expander::new(&lookup).main_key("k").expand("${k}/${j}");
        assert_eq!(out, "${k}/v");
    }

    #[test]
    fn test_sibling_reference_in_value_is_resolved() {
        let lookup = lookup_from(&[("a", "${b}"), ("b", "v")]);
        assert_eq!(expand("${a}-${b}", &lookup), "v-v");
    }

    #[test]
    fn test_expansion_is_idempotent() {
        let lookup = lookup_from(&[("a", "${b}${c}"), ("b", "B"), ("c", "${d=D}")]);
        let once = expand("x ${a} ${b} y", &lookup);
        assert_eq!(once, "x BD B y");
        assert_eq!(expand(&once, &lookup), once);
    }

    #[test]
    fn test_pass_limit_bounds_deep_chains() {
        let pairs: Vec<(String, String)> = (0..10)
            .map(|i| (format!("k{i}"), format!("${{k{}}}", i + 1)))
            .collect();
        let map: HashMap<String, String> = pairs.into_iter().collect();
        let lookup = move |key: &str, _: Option<&str>, _: &str| map.get(key).cloned();
        assert_eq!(expand("${k0}", &lookup), format!("${{k{KEY_MAX_RECURSION}}}"));
    }

    #[test]
    fn test_custom_delimiters_and_filter() {
        let lookup = lookup_from(&[("name", "<b>")]);
        let upper = |v: &str| v.to_uppercase();
        let out = Expander::new(&lookup)
            .delimiters(Delimiters::new("%(", ")"))
            .filter(&upper)
            .expand("hi %(name) %(missing=def)");
        assert_eq!(out, "hi <B> def");
    }
}
