//! Compilation of path templates into anchored regular expressions.
//!
//! A template mixes literal text, named placeholders and raw regex groups:
//!
//! - `:name` matches one path variable (word characters by default, or the
//!   assertion pattern registered for `name`);
//! - `:name?` makes the whole `/segment` optional;
//! - `(...)` embeds a raw regex group, captured under a synthetic
//!   positional name (`"0"`, `"1"`, …).
//!
//! Variables compile to generated named capture groups so that groups
//! nested inside assertions or raw patterns cannot shift the extraction.

use regex::Regex;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PatternError {
    #[error("invalid assertion pattern for variable `{name}`: {source}")]
    InvalidAssertion { name: String, source: regex::Error },

    #[error("route template `{template}` compiled to an invalid pattern: {source}")]
    InvalidTemplate { template: String, source: regex::Error },

    #[error("unbalanced group in route template `{template}`")]
    UnbalancedGroup { template: String },
}

/// Checks an assertion sub-pattern at registration time, so a malformed one
/// is reported before the route table goes live.
pub(crate) fn validate_assertion(name: &str, pattern: &str) -> Result<(), PatternError> {
    match Regex::new(pattern) {
        Ok(_) => Ok(()),
        Err(source) => Err(PatternError::InvalidAssertion { name: name.to_string(), source }),
    }
}

/// Compiles path templates.
///
/// The placeholder syntax and the default variable sub-pattern are
/// configuration, constructed once at application start and passed along
/// explicitly.
#[derive(Debug, Clone)]
pub struct PatternCompiler {
    default_var_pattern: String,
}

impl PatternCompiler {
    pub fn new() -> Self {
        Self { default_var_pattern: r"\w+".to_string() }
    }

    /// Overrides the sub-pattern used for variables without an assertion.
    pub fn with_default_var_pattern(pattern: impl Into<String>) -> Self {
        Self { default_var_pattern: pattern.into() }
    }

    /// Compiles `template` into an anchored pattern.
    ///
    /// Terminal routes tolerate exactly one trailing slash and are anchored
    /// at both ends; passthrough (middleware) routes match as a path prefix
    /// and carry no end anchor, so they fire for all deeper paths.
    pub fn compile(
        &self,
        template: &str,
        assertions: &HashMap<String, String>,
        passthrough: bool,
    ) -> Result<CompiledPattern, PatternError> {
        let mut vars: Vec<PatternVar> = Vec::new();
        let mut pattern = String::from("^");

        let mut i = 0;
        while i < template.len() {
            let rest = &template[i..];
            if let Some((name, optional, consumed)) = parse_placeholder(rest) {
                let group = format!("v{}", vars.len());
                let sub = assertions.get(name).map(String::as_str).unwrap_or(&self.default_var_pattern);
                let capture = format!("(?P<{group}>{sub})");
                if optional && pattern.ends_with('/') {
                    pattern.pop();
                    pattern.push_str(&format!("(?:/{capture})?"));
                } else if optional {
                    pattern.push_str(&format!("(?:{capture})?"));
                } else {
                    pattern.push_str(&capture);
                }
                vars.push(PatternVar { name: name.to_string(), group });
                i += consumed;
            } else if rest.starts_with("(?") {
                // non-capturing or flagged group, passed through verbatim
                let len = group_len(rest).ok_or_else(|| PatternError::UnbalancedGroup { template: template.to_string() })?;
                pattern.push_str(&rest[..len]);
                i += len;
            } else if rest.starts_with('(') {
                let len = group_len(rest).ok_or_else(|| PatternError::UnbalancedGroup { template: template.to_string() })?;
                let index = vars.len();
                let group = format!("v{index}");
                pattern.push_str(&format!("(?P<{group}>{})", &rest[1..len - 1]));
                vars.push(PatternVar { name: index.to_string(), group });
                i += len;
            } else {
                let ch = rest.chars().next().expect("non-empty remainder");
                let mut buf = [0u8; 4];
                pattern.push_str(&regex::escape(ch.encode_utf8(&mut buf)));
                i += ch.len_utf8();
            }
        }

        if !passthrough {
            pattern.push_str("/?$");
        }

        let regex = Regex::new(&pattern)
            .map_err(|source| PatternError::InvalidTemplate { template: template.to_string(), source })?;
        Ok(CompiledPattern { regex, vars })
    }
}

impl Default for PatternCompiler {
    fn default() -> Self {
        Self::new()
    }
}

/// Parses a leading `:name` / `:name?` placeholder, returning the variable
/// name, whether it is optional, and the consumed byte length.
fn parse_placeholder(rest: &str) -> Option<(&str, bool, usize)> {
    let after_colon = rest.strip_prefix(':')?;
    let name_len = after_colon
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(after_colon.len());
    if name_len == 0 {
        return None;
    }
    let name = &after_colon[..name_len];
    let optional = after_colon[name_len..].starts_with('?');
    let consumed = 1 + name_len + usize::from(optional);
    Some((name, optional, consumed))
}

/// Byte length of the balanced group starting at the beginning of `s`.
fn group_len(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut escaped = false;
    for (index, ch) in s.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' => escaped = true,
            '(' => depth += 1,
            ')' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(index + 1);
                }
            }
            _ => {}
        }
    }
    None
}

#[derive(Debug, Clone)]
struct PatternVar {
    /// The user-visible variable name (or positional index for raw groups).
    name: String,
    /// The generated capture group name inside the compiled regex.
    group: String,
}

/// A compiled path pattern: one anchored regex plus the ordered variable names.
#[derive(Debug)]
pub struct CompiledPattern {
    regex: Regex,
    vars: Vec<PatternVar>,
}

impl CompiledPattern {
    /// Variable names in declaration order.
    pub fn var_names(&self) -> impl Iterator<Item = &str> {
        self.vars.iter().map(|var| var.name.as_str())
    }

    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    /// Extracts `(name, value)` pairs from a matching path, in declaration
    /// order. Optional variables that did not match are absent. Returns
    /// `None` when the path does not match at all.
    pub fn extract<'p>(&self, path: &'p str) -> Option<Vec<(&str, &'p str)>> {
        let captures = self.regex.captures(path)?;
        Some(
            self.vars
                .iter()
                .filter_map(|var| captures.name(&var.group).map(|m| (var.name.as_str(), m.as_str())))
                .collect(),
        )
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }
}
