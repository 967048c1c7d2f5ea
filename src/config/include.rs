//! `%include` handling: URL resolution, recursion ceiling and failure policy.

use std::path::PathBuf;

use url::Url;

use super::directive::{interpret, ConditionalState};
use super::report::{Recorder, Severity};
use super::source::ResourceFetcher;
use super::store::{PropertyStore, CONFIG_URL_KEY};
use super::ConfigError;

/// Deepest resource nesting that may still include others. The root is level 1.
pub const MAX_INCLUDE_RECURSION: usize = 3;

/// Per-resource interpretation state.
#[derive(Debug, Clone)]
pub struct IncludeContext {
    pub source_url: Option<Url>,
    pub depth: usize,
    pub state: ConditionalState,
    pub debug_mode: bool,
}

impl IncludeContext {
    pub fn root(source_url: Option<Url>) -> Self {
        Self {
            source_url,
            depth: 1,
            state: ConditionalState::Normal,
            debug_mode: false,
        }
    }

    fn child(&self, url: Url) -> Self {
        Self {
            source_url: Some(url),
            depth: self.depth + 1,
            state: ConditionalState::Normal,
            debug_mode: false,
        }
    }

    pub(crate) fn source(&self) -> Option<&str> {
        self.source_url.as_ref().map(Url::as_str)
    }
}

/// What stays fixed across one load: how resources are fetched and the
/// ambient store consulted after the local one.
#[derive(Debug, Clone, Copy)]
pub(crate) struct LoadEnv<'a> {
    pub fetcher: &'a dyn ResourceFetcher,
    pub ambient: Option<&'a PropertyStore>,
}

/// Loads the resource named by an (already expanded) include target.
///
/// The child starts empty with `parent_store`'s policy. While it loads it can
/// read `parent_store` and the stores above it, but only its own lines land
/// in it.
///
/// Returns the child store with `%configURL` removed, ready to merge, or
/// `None` if the include was skipped. Failures are recorded, never returned.
#[allow(clippy::too_many_arguments)]
pub(crate) fn include(
    target: &str,
    optional: bool,
    parent: &IncludeContext,
    parent_store: &PropertyStore,
    outer: &[&PropertyStore],
    env: &LoadEnv<'_>,
    recorder: &mut Recorder,
    line: usize,
) -> Option<PropertyStore> {
    let target = target.trim();
    if target.is_empty() {
        report_failure(recorder, optional, parent, line, target, &ConfigError::BlankInclude);
        return None;
    }

    if parent.depth >= MAX_INCLUDE_RECURSION {
        let err = ConfigError::RecursionLimit {
            depth: parent.depth,
            url: target.to_string(),
        };
        recorder.record(Severity::Warning, parent.source(), Some(line), err.to_string());
        return None;
    }

    let url = match resolve_include_url(target, parent.source_url.as_ref()) {
        Ok(url) => url,
        Err(err) => {
            report_failure(recorder, optional, parent, line, target, &err);
            return None;
        }
    };

    if parent.debug_mode {
        recorder.record(
            Severity::Info,
            parent.source(),
            Some(line),
            format!("(DEBUG) including URL: [{target}] {url}"),
        );
    }

    let text = match env.fetcher.fetch(&url) {
        Ok(text) => text,
        Err(err) => {
            report_failure(recorder, optional, parent, line, target, &err);
            return None;
        }
    };

    let mut scopes = Vec::with_capacity(outer.len() + 1);
    scopes.push(parent_store);
    scopes.extend_from_slice(outer);

    let mut child = parent_store.empty_like();
    child.set(CONFIG_URL_KEY, url.as_str());
    let mut ctx = parent.child(url);
    interpret(&text, &mut child, &mut ctx, env, &scopes, recorder);
    child.remove(CONFIG_URL_KEY);
    Some(child)
}

fn report_failure(
    recorder: &mut Recorder,
    optional: bool,
    parent: &IncludeContext,
    line: usize,
    target: &str,
    err: &ConfigError,
) {
    let severity = if optional {
        Severity::Debug
    } else {
        Severity::Error
    };
    recorder.record(
        severity,
        parent.source(),
        Some(line),
        format!("error including '{target}': {err}"),
    );
}

/// Resolves an include target against the URL of the including resource.
///
/// - `file:relative/path` resolves against the parent's directory when the
///   parent is a file, or against the working directory when there is no parent.
/// - `http:relative/path` (same for `https`) resolves against the parent's
///   directory when the parent uses the same scheme, and is rejected otherwise.
/// - `file:` targets are refused from `http`/`https` parents.
/// - Anything with an absolute path is used as written.
pub fn resolve_include_url(target: &str, parent: Option<&Url>) -> Result<Url, ConfigError> {
    let target = target.trim();
    if target.is_empty() {
        return Err(ConfigError::BlankInclude);
    }
    let invalid = |source| ConfigError::InvalidUrl {
        url: target.to_string(),
        source,
    };

    let (scheme, rest) =
        split_scheme(target).ok_or(invalid(url::ParseError::RelativeUrlWithoutBase))?;
    let scheme = scheme.to_ascii_lowercase();
    let parent_scheme = parent.map(Url::scheme);

    match scheme.as_str() {
        "file" => {
            if let (Some(p), Some("http" | "https")) = (parent, parent_scheme) {
                return Err(ConfigError::CrossProtocolInclude {
                    parent: p.to_string(),
                    url: target.to_string(),
                });
            }
            if rest.is_empty() {
                return Err(ConfigError::BlankInclude);
            }
            if rest.starts_with('/') {
                return Url::parse(target).map_err(invalid);
            }
            match parent {
                Some(p) if p.scheme() == "file" => p.join(rest).map_err(invalid),
                Some(_) => Url::parse(target).map_err(invalid),
                None => {
                    let cwd = std::env::current_dir().map_err(|e| ConfigError::ReadError {
                        path: PathBuf::from(rest),
                        source: e,
                    })?;
                    let base = Url::from_directory_path(&cwd)
                        .map_err(|()| ConfigError::NotAFilePath(cwd.display().to_string()))?;
                    base.join(rest).map_err(invalid)
                }
            }
        }
        "http" | "https" => match parent {
            _ if rest.starts_with('/') => Url::parse(target).map_err(invalid),
            Some(p) if parent_scheme == Some(scheme.as_str()) => p.join(rest).map_err(invalid),
            // a relative path with no same-scheme parent to resolve it against
            _ => Err(invalid(url::ParseError::RelativeUrlWithoutBase)),
        },
        _ => Err(ConfigError::UnsupportedScheme(scheme)),
    }
}

/// Splits `scheme:rest`, requiring an RFC 3986 shaped scheme.
fn split_scheme(s: &str) -> Option<(&str, &str)> {
    let colon = s.find(':')?;
    let scheme = &s[..colon];
    let mut chars = scheme.chars();
    let first = chars.next()?;
    let valid = first.is_ascii_alphabetic()
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    valid.then(|| (scheme, &s[colon + 1..]))
}
