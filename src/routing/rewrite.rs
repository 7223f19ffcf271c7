//! Path rewriting applied after a route matches.
//!
//! Replaces a leading path prefix with a replacement prefix. The prefix
//! must end on a segment boundary, so `/campaigns/docs` rewrites
//! `/campaigns/docs/api.json` but leaves `/campaigns/docsearch` alone.
//! The query string is never touched.

/// Result of applying a rewrite to a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewriteOutcome {
    Rewritten(String),
    /// Prefix absent; the original path is forwarded as-is.
    Unchanged,
}

/// Prefix substitution rule attached to a route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathRewrite {
    prefix: String,
    replacement: String,
}

impl PathRewrite {
    pub fn new(prefix: impl Into<String>, replacement: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            replacement: replacement.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn replacement(&self) -> &str {
        &self.replacement
    }

    /// True if applying the rule to its own output would rewrite again.
    pub fn is_reentrant(&self) -> bool {
        strip_segment_prefix(&self.replacement, &self.prefix).is_some()
    }

    /// Rewrite `path` (no query string).
    pub fn apply(&self, path: &str) -> RewriteOutcome {
        match strip_segment_prefix(path, &self.prefix) {
            Some(remainder) => {
                let mut rewritten = String::with_capacity(self.replacement.len() + remainder.len());
                rewritten.push_str(self.replacement.trim_end_matches('/'));
                rewritten.push_str(remainder);
                if !rewritten.starts_with('/') {
                    rewritten.insert(0, '/');
                }
                RewriteOutcome::Rewritten(rewritten)
            }
            None => RewriteOutcome::Unchanged,
        }
    }

    /// Rewrite a `path?query` string, keeping the query verbatim.
    pub fn apply_to_path_and_query(&self, path_and_query: &str) -> RewriteOutcome {
        let (path, query) = match path_and_query.split_once('?') {
            Some((p, q)) => (p, Some(q)),
            None => (path_and_query, None),
        };

        match self.apply(path) {
            RewriteOutcome::Rewritten(mut rewritten) => {
                if let Some(query) = query {
                    rewritten.push('?');
                    rewritten.push_str(query);
                }
                RewriteOutcome::Rewritten(rewritten)
            }
            RewriteOutcome::Unchanged => RewriteOutcome::Unchanged,
        }
    }
}

/// Strip `prefix` from `path` only if it ends on a segment boundary.
/// Returns the remainder, which is empty or starts with '/'.
fn strip_segment_prefix<'a>(path: &'a str, prefix: &str) -> Option<&'a str> {
    let trimmed = prefix.trim_end_matches('/');
    let remainder = path.strip_prefix(trimmed)?;
    if remainder.is_empty() || remainder.starts_with('/') {
        Some(remainder)
    } else {
        None
    }
}
