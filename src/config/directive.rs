//! Line interpreter for property resources.
//!
//! Each line is first classified on its own ([`classify`]), then dispatched
//! against the conditional state of the resource ([`interpret`]).

use thiserror::Error;

use super::coerce::FromProperty;
use super::include::{include, IncludeContext, LoadEnv};
use super::report::{Recorder, Severity};
use super::resolve::{Expander, KeyLookup};
use super::store::{PropertyStore, CONFIG_URL_KEY, NAME_KEY};

const KEY_IF: &str = "%if";
const KEY_ELSE: &str = "%else";
const KEY_ENDIF: &str = "%endif";
const KEY_LOG: &str = "%log";
const KEY_INCLUDE: &str = "%include";
const KEY_INCLUDE_OPT: &str = "%include?";
const KEY_DEBUG_MODE: &str = "%debugMode";

const COMMENT_CHARS: [char; 2] = ['#', '!'];
const SEPARATOR_CHARS: [char; 2] = ['=', ':'];

/// Position of the interpreter relative to a `%if` block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionalState {
    Normal,
    InConditionalTrue,
    InConditionalFalse,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConditionError {
    #[error("missing conditional after '%if'")]
    MissingConditional,

    #[error("invalid condition operator: {0}")]
    InvalidOperator(String),
}

/// A parsed `%if key [op value]` test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition<'a> {
    pub key: &'a str,
    pub value: Option<&'a str>,
    pub negate: bool,
}

impl Condition<'_> {
    /// Evaluates against the current value of the key.
    ///
    /// With a comparison value the test is a case-insensitive equality, an
    /// undefined key comparing as blank. Without one, the key only has to be
    /// defined.
    pub fn evaluate(&self, actual: Option<&str>) -> bool {
        let equal = match (self.value, actual) {
            (Some(expected), Some(actual)) => expected.eq_ignore_ascii_case(actual),
            (Some(expected), None) => expected.trim().is_empty(),
            (None, actual) => actual.is_some(),
        };
        equal != self.negate
    }
}

/// One classified input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line<'a> {
    /// Blank or comment.
    Ignored,
    /// `%if` not followed by whitespace.
    InvalidIf,
    If(Result<Condition<'a>, ConditionError>),
    Else { trailing: bool },
    EndIf { trailing: bool },
    Log(&'a str),
    Include { target: &'a str, optional: bool },
    DebugMode(&'a str),
    /// `%name` or `%configURL` assignment.
    Reserved { key: &'static str, value: &'a str },
    /// Unrecognized `%` key.
    Unknown(&'a str),
    Property { key: &'a str, value: &'a str },
}

pub fn classify(raw: &str) -> Line<'_> {
    let d = raw.trim();
    if d.is_empty() || d.starts_with(&COMMENT_CHARS[..]) {
        return Line::Ignored;
    }

    if let Some(rest) = d.strip_prefix(KEY_IF) {
        if !rest.starts_with(char::is_whitespace) {
            return Line::InvalidIf;
        }
        return Line::If(parse_condition(rest));
    }
    if let Some(rest) = d.strip_prefix(KEY_ELSE) {
        return Line::Else {
            trailing: !rest.is_empty(),
        };
    }
    if let Some(rest) = d.strip_prefix(KEY_ENDIF) {
        return Line::EndIf {
            trailing: !rest.is_empty(),
        };
    }
    if let Some(rest) = d.strip_prefix(KEY_LOG) {
        let message = rest.trim();
        let message = message.strip_prefix(&SEPARATOR_CHARS[..]).unwrap_or(message);
        return Line::Log(message.trim());
    }

    // `d` is already trimmed at the end, so a property value keeps only its
    // leading whitespace
    let (key, value) = match d.find('=').or_else(|| d.find(':')) {
        Some(p) => (d[..p].trim(), &d[p + 1..]),
        None => (d, ""),
    };
    if key.is_empty() {
        return Line::Ignored;
    }
    if !key.starts_with('%') {
        return Line::Property { key, value };
    }
    let value = value.trim();

    if key.eq_ignore_ascii_case(KEY_INCLUDE) {
        Line::Include {
            target: value,
            optional: false,
        }
    } else if key.eq_ignore_ascii_case(KEY_INCLUDE_OPT) {
        Line::Include {
            target: value,
            optional: true,
        }
    } else if key.eq_ignore_ascii_case(KEY_DEBUG_MODE) {
        Line::DebugMode(value)
    } else if key.eq_ignore_ascii_case(CONFIG_URL_KEY) {
        Line::Reserved {
            key: CONFIG_URL_KEY,
            value,
        }
    } else if key.eq_ignore_ascii_case(NAME_KEY) {
        Line::Reserved {
            key: NAME_KEY,
            value,
        }
    } else {
        Line::Unknown(key)
    }
}

/// Parses the part of a `%if` line after the directive.
fn parse_condition(text: &str) -> Result<Condition<'_>, ConditionError> {
    let d = text.trim();
    let op_start = d.find(&['!', '='][..]).unwrap_or(d.len());
    let key = d[..op_start].trim();
    if key.is_empty() {
        return Err(ConditionError::MissingConditional);
    }

    let after = &d[op_start..];
    let op_len = after
        .find(|c: char| c != '!' && c != '=')
        .unwrap_or(after.len());
    let (compare, negate) = match &after[..op_len] {
        "" => (false, false),
        "=" | "==" => (true, false),
        "!=" => (true, true),
        other => return Err(ConditionError::InvalidOperator(other.to_string())),
    };

    let rest = after[op_len..].trim();
    let value = if !rest.is_empty() {
        Some(rest)
    } else if compare {
        Some("")
    } else {
        None
    };
    Ok(Condition { key, value, negate })
}

/// Resolves keys against the store being loaded, then the stores of the
/// including resources (nearest first), then the ambient store.
pub(crate) struct ScopedLookup<'a> {
    local: &'a PropertyStore,
    parents: &'a [&'a PropertyStore],
    ambient: Option<&'a PropertyStore>,
}

impl<'a> ScopedLookup<'a> {
    pub(crate) fn new(
        local: &'a PropertyStore,
        parents: &'a [&'a PropertyStore],
        ambient: Option<&'a PropertyStore>,
    ) -> Self {
        Self {
            local,
            parents,
            ambient,
        }
    }

    fn get(&self, key: &str) -> Option<&'a str> {
        self.local
            .get(key)
            .or_else(|| self.parents.iter().find_map(|p| p.get(key)))
            .or_else(|| self.ambient.and_then(|a| a.get(key)))
    }

    fn expand(&self, text: &str) -> String {
        Expander::new(self).expand(text)
    }
}

impl KeyLookup for ScopedLookup<'_> {
    fn lookup(&self, key: &str, _arg: Option<&str>, _default: &str) -> Option<String> {
        self.get(key).map(str::to_string)
    }
}

/// Interprets `text` line by line into `store`.
///
/// `parents` holds the stores of the resources currently including this one,
/// innermost first. They are read for `%if` tests and `${..}` expansion of
/// `%log` and `%include` lines, never written.
///
/// Nothing here fails: syntax and include problems are recorded and the
/// offending line is skipped.
pub(crate) fn interpret(
    text: &str,
    store: &mut PropertyStore,
    ctx: &mut IncludeContext,
    env: &LoadEnv<'_>,
    parents: &[&PropertyStore],
    recorder: &mut Recorder,
) {
    let source = ctx.source_url.as_ref().map(|u| u.to_string());
    let source = source.as_deref();

    for (index, raw) in text.lines().enumerate() {
        let line = index + 1;

        match classify(raw) {
            Line::Ignored => {}

            Line::InvalidIf => recorder.record(
                Severity::Error,
                source,
                Some(line),
                format!("invalid '%if' specification: {}", raw.trim()),
            ),

            Line::If(_) if ctx.state != ConditionalState::Normal => recorder.record(
                Severity::Error,
                source,
                Some(line),
                "nested '%if' not supported",
            ),

            Line::If(Err(err)) => {
                recorder.record(Severity::Error, source, Some(line), err.to_string());
                ctx.state = ConditionalState::InConditionalTrue;
            }

            Line::If(Ok(condition)) => {
                let actual = ScopedLookup::new(store, parents, env.ambient).get(condition.key);
                let included = condition.evaluate(actual);
                if ctx.debug_mode {
                    recorder.record(
                        Severity::Info,
                        source,
                        Some(line),
                        format!("(DEBUG) '%if {}' is {included}", condition.key),
                    );
                }
                ctx.state = if included {
                    ConditionalState::InConditionalTrue
                } else {
                    ConditionalState::InConditionalFalse
                };
            }

            Line::Else { trailing } => {
                ctx.state = match ctx.state {
                    ConditionalState::Normal => {
                        recorder.record(
                            Severity::Error,
                            source,
                            Some(line),
                            "'%else' without previous '%if'",
                        );
                        continue;
                    }
                    ConditionalState::InConditionalTrue => ConditionalState::InConditionalFalse,
                    ConditionalState::InConditionalFalse => ConditionalState::InConditionalTrue,
                };
                if trailing {
                    recorder.record(
                        Severity::Warning,
                        source,
                        Some(line),
                        "invalid characters following '%else'",
                    );
                }
            }

            Line::EndIf { trailing } => {
                if ctx.state == ConditionalState::Normal {
                    recorder.record(
                        Severity::Error,
                        source,
                        Some(line),
                        "'%endif' without previous '%if'",
                    );
                    continue;
                }
                ctx.state = ConditionalState::Normal;
                if trailing {
                    recorder.record(
                        Severity::Warning,
                        source,
                        Some(line),
                        "invalid characters following '%endif'",
                    );
                }
            }

            _ if ctx.state == ConditionalState::InConditionalFalse => {}

            Line::Log(message) => {
                if store.log_messages() {
                    let expanded = ScopedLookup::new(store, parents, env.ambient).expand(message);
                    let mut out = String::new();
                    if let Some(url) = &ctx.source_url {
                        let file_name = url.path().rsplit('/').next().unwrap_or("");
                        out.push_str(&format!("[{file_name}] "));
                    }
                    out.push_str(expanded.trim());
                    recorder.log_message(source, line, out);
                }
            }

            Line::Include { target, optional } => {
                let expanded = ScopedLookup::new(store, parents, env.ambient).expand(target);
                if ctx.debug_mode {
                    recorder.record(
                        Severity::Info,
                        source,
                        Some(line),
                        format!("(DEBUG) including: {expanded}"),
                    );
                }
                if let Some(child) =
                    include(&expanded, optional, ctx, store, parents, env, recorder, line)
                {
                    store.merge(&child, false);
                }
            }

            Line::DebugMode(value) => {
                ctx.debug_mode = bool::from_property(value, false).unwrap_or(false);
                if ctx.debug_mode {
                    recorder.record(
                        Severity::Info,
                        source,
                        Some(line),
                        "(DEBUG) 'debugMode' set to true",
                    );
                }
            }

            Line::Reserved { key, value } => store.set(key, value),

            Line::Unknown(key) => recorder.record(
                Severity::Error,
                source,
                Some(line),
                format!("invalid/unrecognized key specified: {key}"),
            ),

            Line::Property { key, value } => store.set(key, value),
        }
    }

    if ctx.state != ConditionalState::Normal {
        recorder.record(Severity::Error, source, None, "missing '%endif'");
    }
}
