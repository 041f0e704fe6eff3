//! Configuration file search.
//!
//! # Responsibilities
//! - Expand `${VAR}` templates against the environment
//! - Walk an ordered candidate list and return the first readable file
//!
//! # Design Decisions
//! - Expansion is all-or-nothing: a template referencing a missing variable
//!   expands to the empty string, which is never a valid candidate
//! - Search failure is a value (`None`), not an error

use std::path::{Path, PathBuf};

/// Environment variable naming the configuration file directly.
pub const CONFIG_PATH_VAR: &str = "APPMUX_CONFIG_PATH";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Fragment {
    Literal(String),
    Var(String),
}

/// A path template made of literal fragments and `${NAME}` references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvTemplate {
    fragments: Vec<Fragment>,
}

impl EnvTemplate {
    /// Parse a template. `$` not followed by a closed `{...}` is literal.
    pub fn parse(template: &str) -> Self {
        let mut fragments = Vec::new();
        let mut literal = String::new();
        let mut rest = template;

        while let Some(start) = rest.find("${") {
            let after = &rest[start + 2..];
            match after.find('}') {
                Some(end) if end > 0 => {
                    literal.push_str(&rest[..start]);
                    if !literal.is_empty() {
                        fragments.push(Fragment::Literal(std::mem::take(&mut literal)));
                    }
                    fragments.push(Fragment::Var(after[..end].to_string()));
                    rest = &after[end + 1..];
                }
                _ => {
                    literal.push_str(&rest[..start + 2]);
                    rest = after;
                }
            }
        }
        literal.push_str(rest);
        if !literal.is_empty() {
            fragments.push(Fragment::Literal(literal));
        }

        Self { fragments }
    }

    /// Expand against an arbitrary lookup.
    pub fn expand_with<F>(&self, lookup: F) -> String
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut out = String::new();
        for fragment in &self.fragments {
            match fragment {
                Fragment::Literal(text) => out.push_str(text),
                Fragment::Var(name) => match lookup(name) {
                    Some(value) => out.push_str(&value),
                    None => return String::new(),
                },
            }
        }
        out
    }

    /// Expand against the process environment.
    pub fn expand(&self) -> String {
        self.expand_with(|name| std::env::var(name).ok())
    }
}

/// Templates for the default search locations, in priority order.
pub const DEFAULT_SEARCH_TEMPLATES: &[&str] = &[
    "${APPMUX_CONFIG_PATH}",
    "/etc/appmux/conf.json",
    "${ProgramData}\\appmux\\conf.json",
    "/usr/local/etc/appmux/conf.json",
    "${HOME}/.local/etc/appmux/conf.json",
    "${HOME}/.config/appmux/conf.json",
    "${APPDATA}\\appmux\\conf.json",
    "${LOCALAPPDATA}\\appmux\\conf.json",
    "${USERPROFILE}\\.local\\appmux\\conf.json",
    "${USERPROFILE}\\.config\\appmux\\conf.json",
    "./.conf.json",
    "./.config.json",
];

/// Expanded default candidates. Templates with missing variables are dropped.
pub fn default_search_paths() -> Vec<PathBuf> {
    expand_all(DEFAULT_SEARCH_TEMPLATES, |name| std::env::var(name).ok())
}

fn expand_all<F>(templates: &[&str], lookup: F) -> Vec<PathBuf>
where
    F: Fn(&str) -> Option<String>,
{
    templates
        .iter()
        .map(|t| EnvTemplate::parse(t).expand_with(&lookup))
        .filter(|p| !p.is_empty())
        .map(PathBuf::from)
        .collect()
}

/// Return the canonical form of the first candidate that can be read as text.
pub async fn config_search<P: AsRef<Path>>(candidates: &[P]) -> Option<PathBuf> {
    for candidate in candidates {
        let candidate = candidate.as_ref();
        if candidate.as_os_str().is_empty() {
            continue;
        }
        let Ok(resolved) = tokio::fs::canonicalize(candidate).await else {
            tracing::trace!(path = %candidate.display(), "Config candidate does not resolve");
            continue;
        };
        if tokio::fs::read_to_string(&resolved).await.is_ok() {
            return Some(resolved);
        }
        tracing::trace!(path = %resolved.display(), "Config candidate is not readable");
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_expand_all_present() {
        let vars = env(&[("HOME", "/home/ann")]);
        let template = EnvTemplate::parse("${HOME}/.config/appmux/conf.json");
        assert_eq!(
            template.expand_with(|k| vars.get(k).cloned()),
            "/home/ann/.config/appmux/conf.json"
        );
    }

    #[test]
    fn test_expand_missing_variable_is_empty() {
        let vars = env(&[("HOME", "/home/ann")]);
        let template = EnvTemplate::parse("${HOME}/${XDG_NOPE}/conf.json");
        assert_eq!(template.expand_with(|k| vars.get(k).cloned()), "");
    }

    #[test]
    fn test_literal_only_and_unclosed() {
        let none = |_: &str| None;
        assert_eq!(EnvTemplate::parse("/etc/appmux/conf.json").expand_with(none), "/etc/appmux/conf.json");
        assert_eq!(EnvTemplate::parse("cost$5 ${open").expand_with(none), "cost$5 ${open");
        assert_eq!(EnvTemplate::parse("${}x").expand_with(none), "${}x");
    }

    #[test]
    fn test_default_paths_skip_missing() {
        let vars = env(&[("HOME", "/home/ann")]);
        let paths = expand_all(DEFAULT_SEARCH_TEMPLATES, |k| vars.get(k).cloned());

        assert_eq!(paths[0], PathBuf::from("/etc/appmux/conf.json"));
        assert!(paths.contains(&PathBuf::from("/home/ann/.config/appmux/conf.json")));
        assert!(paths.iter().all(|p| !p.to_string_lossy().contains("${")));
        assert_eq!(paths.last(), Some(&PathBuf::from("./.config.json")));
    }

    #[tokio::test]
    async fn test_search_returns_first_readable() {
        let dir = tempfile::tempdir().unwrap();
        let second = dir.path().join("second.json");
        let third = dir.path().join("third.json");
        std::fs::write(&second, "{}").unwrap();
        std::fs::write(&third, "{}").unwrap();

        let candidates = vec![
            PathBuf::new(),
            dir.path().join("missing.json"),
            second.clone(),
            third,
        ];
        let found = config_search(&candidates).await.unwrap();
        assert_eq!(found, std::fs::canonicalize(&second).unwrap());
    }

    #[tokio::test]
    async fn test_search_not_found() {
        let dir = tempfile::tempdir().unwrap();
        // A directory resolves but cannot be read as text.
        let candidates = vec![dir.path().to_path_buf(), dir.path().join("nope.json")];
        assert_eq!(config_search(&candidates).await, None);
    }
}
