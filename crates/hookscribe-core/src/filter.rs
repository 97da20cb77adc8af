use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::warn;

/// Tool-name allow-list built from glob patterns
///
/// An empty pattern list allows every tool. Invalid patterns are skipped
/// with a warning; if none survive, every tool is allowed.
#[derive(Debug, Clone, Default)]
pub struct ToolFilter {
    set: Option<GlobSet>,
}

impl ToolFilter {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Self {
        let mut builder = GlobSetBuilder::new();
        let mut added = 0usize;

        for pattern in patterns {
            let pattern = pattern.as_ref().trim();
            if pattern.is_empty() {
                continue;
            }
            match Glob::new(pattern) {
                Ok(glob) => {
                    builder.add(glob);
                    added += 1;
                }
                Err(e) => warn!(pattern, error = %e, "Ignoring invalid tool filter pattern"),
            }
        }

        if added == 0 {
            return Self::allow_all();
        }

        match builder.build() {
            Ok(set) => Self { set: Some(set) },
            Err(e) => {
                warn!(error = %e, "Failed to build tool filter, allowing all tools");
                Self::allow_all()
            }
        }
    }

    pub fn allow_all() -> Self {
        Self { set: None }
    }

    pub fn allows(&self, tool_name: &str) -> bool {
        self.set.as_ref().map_or(true, |set| set.is_match(tool_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_allows_everything() {
        let filter = ToolFilter::new::<&str>(&[]);
        assert!(filter.allows("Bash"));
        assert!(filter.allows("anything"));
    }

    #[test]
    fn test_globs() {
        let filter = ToolFilter::new(&["Bash", "mcp__*"]);
        assert!(filter.allows("Bash"));
        assert!(filter.allows("mcp__github__search"));
        assert!(!filter.allows("Read"));
    }

    #[test]
    fn test_invalid_patterns_are_skipped() {
        let filter = ToolFilter::new(&["[", "Edit"]);
        assert!(filter.allows("Edit"));
        assert!(!filter.allows("Bash"));

        let all_invalid = ToolFilter::new(&["["]);
        assert!(all_invalid.allows("Bash"));
    }
}
