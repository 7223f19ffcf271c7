//! Route predicates.
//!
//! # Responsibilities
//! - Match the request path against a segment template (case-sensitive)
//! - Match the request method against a set
//! - Combine conditions with AND / OR / NOT
//!
//! # Design Decisions
//! - Predicates are a plain enum tree, evaluated fresh per request
//! - Patterns are parsed once at startup; evaluation never allocates
//! - No regex: matching is a single left-to-right walk over segments
//! - `**` is only legal as the final segment, so there is no backtracking

use std::fmt;

use axum::http::Method;
use thiserror::Error;

/// Errors raised while parsing a path pattern.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("pattern `{0}` must start with '/'")]
    NotAbsolute(String),

    #[error("pattern `{0}` uses '**' before the final segment")]
    WildcardNotLast(String),
}

/// One segment of a path template.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    /// `*` or `{name}`: exactly one segment.
    Any,
    /// Trailing `**`: zero or more segments.
    Rest,
}

/// A parsed path template such as `/campaigns/**` or `/users/{id}/profile`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    /// Parse a template. Must be absolute; `**` may only end the pattern.
    pub fn parse(pattern: &str) -> Result<Self, PatternError> {
        let rest = pattern
            .strip_prefix('/')
            .ok_or_else(|| PatternError::NotAbsolute(pattern.to_string()))?;

        let parts: Vec<&str> = rest.split('/').collect();
        let last = parts.len() - 1;
        let mut segments = Vec::with_capacity(parts.len());

        for (i, part) in parts.into_iter().enumerate() {
            let segment = match part {
                "**" if i == last => Segment::Rest,
                "**" => return Err(PatternError::WildcardNotLast(pattern.to_string())),
                "*" => Segment::Any,
                p if p.len() > 2 && p.starts_with('{') && p.ends_with('}') => Segment::Any,
                p => Segment::Literal(p.to_string()),
            };
            segments.push(segment);
        }

        Ok(Self {
            raw: pattern.to_string(),
            segments,
        })
    }

    /// The template as written in configuration.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns true if `path` (without query) matches this template.
    pub fn matches(&self, path: &str) -> bool {
        let Some(rest) = path.strip_prefix('/') else {
            return false;
        };

        let mut actual = rest.split('/');
        for segment in &self.segments {
            match segment {
                Segment::Rest => return true,
                Segment::Any => {
                    if actual.next().is_none() {
                        return false;
                    }
                }
                Segment::Literal(expected) => match actual.next() {
                    Some(seg) if seg == expected => {}
                    _ => return false,
                },
            }
        }

        actual.next().is_none()
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// True if any segment of `path` is `.` or `..`, literally or with `%2e`
/// in place of a dot. Such paths can resolve elsewhere once a backend
/// normalises them, so they are never matched against patterns.
pub fn has_dot_segment(path: &str) -> bool {
    path.split('/').any(|segment| {
        if segment.len() > 6 {
            return false;
        }
        let decoded = segment.to_ascii_lowercase().replace("%2e", ".");
        decoded == "." || decoded == ".."
    })
}

/// A boolean condition over `(path, method)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    Path(PathPattern),
    Method(Vec<Method>),
    And(Box<Predicate>, Box<Predicate>),
    Or(Box<Predicate>, Box<Predicate>),
    Not(Box<Predicate>),
}

impl Predicate {
    /// Parse a path template into a `Path` predicate.
    pub fn path(pattern: &str) -> Result<Self, PatternError> {
        PathPattern::parse(pattern).map(Predicate::Path)
    }

    pub fn methods(methods: impl IntoIterator<Item = Method>) -> Self {
        Predicate::Method(methods.into_iter().collect())
    }

    pub fn and(self, other: Predicate) -> Self {
        Predicate::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: Predicate) -> Self {
        Predicate::Or(Box::new(self), Box::new(other))
    }

    pub fn negate(self) -> Self {
        Predicate::Not(Box::new(self))
    }

    /// Evaluate against a request. Pure; short-circuits AND / OR.
    pub fn evaluate(&self, path: &str, method: &Method) -> bool {
        match self {
            Predicate::Path(pattern) => pattern.matches(path),
            Predicate::Method(methods) => methods.contains(method),
            Predicate::And(left, right) => left.evaluate(path, method) && right.evaluate(path, method),
            Predicate::Or(left, right) => left.evaluate(path, method) || right.evaluate(path, method),
            Predicate::Not(inner) => !inner.evaluate(path, method),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Path(pattern) => write!(f, "path({})", pattern),
            Predicate::Method(methods) => {
                write!(f, "method(")?;
                for (i, m) in methods.iter().enumerate() {
                    if i > 0 {
                        write!(f, "|")?;
                    }
                    write!(f, "{}", m)?;
                }
                write!(f, ")")
            }
            Predicate::And(l, r) => write!(f, "({} && {})", l, r),
            Predicate::Or(l, r) => write!(f, "({} || {})", l, r),
            Predicate::Not(inner) => write!(f, "!{}", inner),
        }
    }
}
