//! Public path classification.

/// Prefix matcher for the public allow-list.
///
/// Matching is segment-aware: `/auth` covers `/auth` and `/auth/login` but
/// not `/authx`, so an allow-list entry can never leak a neighboring route.
#[derive(Debug, Clone)]
pub struct PathMatcher {
    prefixes: Vec<String>,
}

impl PathMatcher {
    /// Builds a matcher from configured prefixes. Trailing slashes are
    /// normalized away so `/public/` and `/public` behave identically.
    #[must_use]
    pub fn new(prefixes: &[String]) -> Self {
        let prefixes = prefixes
            .iter()
            .map(|raw| {
                let trimmed = raw.trim_end_matches('/');
                if trimmed.is_empty() {
                    "/".to_string()
                } else {
                    trimmed.to_string()
                }
            })
            .collect();
        PathMatcher { prefixes }
    }

    /// Whether `path` is covered by the public allow-list.
    #[must_use]
    pub fn is_public(&self, path: &str) -> bool {
        self.prefixes.iter().any(|prefix| {
            if prefix == "/" {
                return true;
            }
            path == prefix
                || path
                    .strip_prefix(prefix.as_str())
                    .is_some_and(|rest| rest.starts_with('/'))
        })
    }
}
