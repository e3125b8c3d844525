//! Route pattern syntax.
//!
//! A pattern is a `/`-separated list of segments. A segment written as `:name` or
//! `{name}` is a placeholder that binds whatever non-empty text occupies that
//! position in the request path; every other segment must match literally
//! (case-sensitive).

use std::collections::HashSet;
use std::sync::Arc;

use super::table::ParamVec;
use crate::error::RouterError;

/// One `/`-delimited piece of a route pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// Matches exactly this text
    Literal(String),
    /// Matches any non-empty segment and binds it under this name
    Param(Arc<str>),
}

/// A parsed, normalized route pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    raw: String,
    segments: Vec<Segment>,
}

impl Pattern {
    /// Parse a full route pattern (group prefixes already joined).
    ///
    /// A missing leading `/` is added. Unless `strict` is set, trailing slashes are
    /// dropped so that `/users/` and `/users` register the same route.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::InvalidPattern`] for empty or badly formed placeholder
    /// names, unterminated or stray braces, and placeholder names repeated within
    /// one pattern.
    pub fn parse(raw: &str, strict: bool) -> Result<Self, RouterError> {
        let normalized = normalize_path(raw, strict);
        let mut segments = Vec::new();
        let mut seen: HashSet<&str> = HashSet::new();

        for segment in split_segments(&normalized) {
            let name = if let Some(name) = segment.strip_prefix(':') {
                Some(name)
            } else if let Some(rest) = segment.strip_prefix('{') {
                match rest.strip_suffix('}') {
                    Some(name) => Some(name),
                    None => {
                        return Err(RouterError::invalid_pattern(
                            &normalized,
                            format!("unterminated `{{` in segment `{segment}`"),
                        ))
                    }
                }
            } else {
                None
            };

            match name {
                Some(name) => {
                    validate_param_name(&normalized, name)?;
                    if !seen.insert(name) {
                        return Err(RouterError::invalid_pattern(
                            &normalized,
                            format!("parameter `{name}` appears more than once"),
                        ));
                    }
                    segments.push(Segment::Param(Arc::from(name)));
                }
                None => {
                    if segment.contains(['{', '}']) {
                        return Err(RouterError::invalid_pattern(
                            &normalized,
                            format!("stray brace in segment `{segment}`"),
                        ));
                    }
                    segments.push(Segment::Literal(segment.to_string()));
                }
            }
        }

        Ok(Self {
            raw: normalized,
            segments,
        })
    }

    /// The normalized pattern text, e.g. `/users/:id`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// `true` when the pattern has no placeholders.
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.segments
            .iter()
            .all(|s| matches!(s, Segment::Literal(_)))
    }

    /// `true` when both patterns match exactly the same paths: equal literals at the
    /// same positions, placeholders at the same positions whatever their names.
    #[must_use]
    pub fn same_shape(&self, other: &Pattern) -> bool {
        self.segments.len() == other.segments.len()
            && self
                .segments
                .iter()
                .zip(&other.segments)
                .all(|pair| match pair {
                    (Segment::Literal(a), Segment::Literal(b)) => a == b,
                    (Segment::Param(_), Segment::Param(_)) => true,
                    _ => false,
                })
    }

    /// Check already-split request path segments without binding anything.
    #[must_use]
    pub fn matches_segments<S: AsRef<str>>(&self, path: &[S]) -> bool {
        path.len() == self.segments.len()
            && self
                .segments
                .iter()
                .zip(path)
                .all(|(pattern_seg, path_seg)| match pattern_seg {
                    Segment::Literal(lit) => lit == path_seg.as_ref(),
                    Segment::Param(_) => !path_seg.as_ref().is_empty(),
                })
    }

    /// Match already-split request path segments, appending bindings to `params`.
    ///
    /// On a mismatch `params` is left exactly as it was passed in.
    pub fn match_segments<S: AsRef<str>>(&self, path: &[S], params: &mut ParamVec) -> bool {
        if !self.matches_segments(path) {
            return false;
        }
        for (pattern_seg, path_seg) in self.segments.iter().zip(path) {
            if let Segment::Param(name) = pattern_seg {
                params.push((Arc::clone(name), path_seg.as_ref().to_string()));
            }
        }
        true
    }
}

impl std::fmt::Display for Pattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

fn validate_param_name(pattern: &str, name: &str) -> Result<(), RouterError> {
    if name.is_empty() {
        return Err(RouterError::invalid_pattern(
            pattern,
            "parameter placeholder without a name",
        ));
    }
    if let Some(bad) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '-'))
    {
        return Err(RouterError::invalid_pattern(
            pattern,
            format!("invalid character `{bad}` in parameter name `{name}`"),
        ));
    }
    Ok(())
}

/// Add a leading `/` and, unless `strict`, drop trailing slashes (`/` stays `/`).
pub(crate) fn normalize_path(path: &str, strict: bool) -> String {
    let mut out = String::with_capacity(path.len() + 1);
    if !path.starts_with('/') {
        out.push('/');
    }
    out.push_str(path);
    if !strict {
        let trimmed = out.trim_end_matches('/').len();
        out.truncate(trimmed.max(1));
    }
    out
}

/// Split a normalized path into segments. The root path has none.
pub(crate) fn split_segments(path: &str) -> impl Iterator<Item = &str> {
    let body = path.strip_prefix('/').unwrap_or(path);
    let empty = body.is_empty();
    body.split('/').filter(move |_| !empty)
}
