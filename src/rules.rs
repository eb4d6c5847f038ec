//! Whitelist and filter-content rule sets

use regex::Regex;

use crate::error::{Error, Result};
use crate::model::PLATFORM_PREFIX;

/// Compiled whitelist glob rule
#[derive(Debug, Clone)]
struct GlobRule {
    pattern: Regex,
    /// Rule names only a leaf (no `:` or `/`)
    leaf_only: bool,
}

/// Patterns identifying resource names or file paths that are never renamed
///
/// Glob syntax: `*` any run, `+` a non-empty run, `?` an optional single
/// character; everything else is literal. A rule matches when it covers the
/// whole subject. Rules without `:` or `/` also match the leaf segment, so
/// `app_name` matches `app:string/app_name`.
#[derive(Debug, Clone, Default)]
pub struct Whitelist {
    rules: Vec<GlobRule>,
}

impl Whitelist {
    pub fn new<I, S>(rules: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let rules = rules
            .into_iter()
            .map(|rule| {
                let rule = rule.as_ref();
                let pattern = Regex::new(&glob_to_regex(rule)).map_err(|source| {
                    Error::InvalidRule {
                        rule: rule.to_string(),
                        source,
                    }
                })?;
                Ok(GlobRule {
                    pattern,
                    leaf_only: !rule.contains(':') && !rule.contains('/'),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rules })
    }

    /// Whether `subject` (a resource name or a module-qualified path) matches
    pub fn matches(&self, subject: &str) -> bool {
        let leaf = subject.rsplit('/').next().unwrap_or(subject);
        self.rules.iter().any(|rule| {
            rule.pattern.is_match(subject) || (rule.leaf_only && rule.pattern.is_match(leaf))
        })
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

fn glob_to_regex(rule: &str) -> String {
    let mut out = String::with_capacity(rule.len() + 8);
    out.push('^');
    for ch in rule.chars() {
        match ch {
            '*' => out.push_str(".*"),
            '+' => out.push_str(".+"),
            '?' => out.push_str(".?"),
            other => out.push_str(&regex::escape(&other.to_string())),
        }
    }
    out.push('$');
    out
}

/// Whether a resource name lives in the platform namespace
pub fn is_platform_name(name: &str) -> bool {
    name.starts_with(PLATFORM_PREFIX)
}

/// Suffix rules marking files exempt from content mutation
#[derive(Debug, Clone, Default)]
pub struct ContentFilter {
    suffixes: Vec<String>,
}

impl ContentFilter {
    pub fn new<I, S>(suffixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            suffixes: suffixes
                .into_iter()
                .map(Into::<String>::into)
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }

    /// `true` when no rule exempts `path`
    pub fn allows(&self, path: &str) -> bool {
        !self.suffixes.iter().any(|s| path.ends_with(s.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leaf_rule() {
        let wl = Whitelist::new(["app_name"]).unwrap();
        assert!(wl.matches("app:string/app_name"));
        assert!(!wl.matches("app:string/app_name_short"));
        assert!(!wl.matches("app:string/title"));
    }

    #[test]
    fn test_glob_rules() {
        let wl = Whitelist::new(["app:drawable/ic_*", "*.png", "app:string/v?"]).unwrap();
        assert!(wl.matches("app:drawable/ic_launcher"));
        assert!(!wl.matches("app:drawable/logo"));
        assert!(wl.matches("base/res/raw/intro.png"));
        assert!(wl.matches("app:string/v"));
        assert!(wl.matches("app:string/v2"));
        assert!(!wl.matches("app:string/v22"));
    }

    #[test]
    fn test_dot_is_literal() {
        let wl = Whitelist::new(["com.example:color/*"]).unwrap();
        assert!(wl.matches("com.example:color/primary"));
        assert!(!wl.matches("comXexample:color/primary"));
    }

    #[test]
    fn test_empty_whitelist() {
        let wl = Whitelist::default();
        assert!(wl.is_empty());
        assert!(!wl.matches("app:string/title"));
    }

    #[test]
    fn test_platform_name() {
        assert!(is_platform_name("android:color/white"));
        assert!(!is_platform_name("app:color/white"));
    }

    #[test]
    fn test_content_filter() {
        let filter = ContentFilter::new(["splash.png", ".so", ""]);
        assert!(!filter.allows("base/res/drawable/splash.png"));
        assert!(!filter.allows("base/lib/arm64-v8a/libfoo.so"));
        assert!(filter.allows("base/res/drawable/icon.png"));
        assert!(ContentFilter::default().allows("anything"));
    }
}
