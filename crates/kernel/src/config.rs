//! Configuration loaded from environment variables.

use std::env;

use anyhow::{Context, Result};

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port (default: 3000).
    pub port: u16,

    /// PostgreSQL connection URL.
    pub database_url: String,

    /// Maximum database connections in pool (default: 10).
    pub database_max_connections: u32,

    /// Redis connection URL. When unset the content cache stays in-process.
    pub redis_url: Option<String>,

    /// Page resolution and content settings.
    pub pages: PageConfig,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .context("PORT must be a valid u16")?;

        let database_url =
            env::var("DATABASE_URL").context("DATABASE_URL environment variable is required")?;

        let database_max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .context("DATABASE_MAX_CONNECTIONS must be a valid u32")?;

        let redis_url = env::var("REDIS_URL").ok().filter(|url| !url.trim().is_empty());

        let pages = PageConfig::from_env()?;

        Ok(Self {
            port,
            database_url,
            database_max_connections,
            redis_url,
            pages,
        })
    }
}

/// Settings consumed by the page and content services.
///
/// Read-only once constructed; every component receives it at construction
/// time instead of consulting global state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageConfig {
    /// Language used when a caller passes an empty language code.
    pub default_language: String,

    /// Supported languages, in fallback order. Always contains the default.
    pub languages: Vec<String>,

    /// Restrict pages to the current site.
    pub use_site_id: bool,

    /// Current site, used when `use_site_id` is on.
    pub site_id: i32,

    /// Pages with a future publication date are not visible.
    pub show_start_date: bool,

    /// Pages past their publication end date are not visible.
    pub show_end_date: bool,

    /// Require the full hierarchical path to match before accepting a page.
    pub use_strict_url: bool,

    /// Run content bodies through the sanitizer before storing them.
    pub sanitize_user_input: bool,

    /// Revisions kept per (page, language, type). 0 keeps everything.
    pub content_revision_depth: usize,

    /// Rewrite internal page links when serving content bodies.
    pub link_filter: bool,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            default_language: "en".to_string(),
            languages: vec!["en".to_string()],
            use_site_id: false,
            site_id: 1,
            show_start_date: false,
            show_end_date: false,
            use_strict_url: false,
            sanitize_user_input: false,
            content_revision_depth: 0,
            link_filter: false,
        }
    }
}

impl PageConfig {
    /// Load page settings from environment variables.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let default_language = env::var("DEFAULT_LANGUAGE")
            .map(|v| v.trim().to_lowercase())
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or(defaults.default_language);

        let languages = env::var("LANGUAGES")
            .map(|v| parse_language_list(&v))
            .unwrap_or_default();

        let site_id = env::var("SITE_ID")
            .unwrap_or_else(|_| defaults.site_id.to_string())
            .parse()
            .context("SITE_ID must be a valid i32")?;

        let content_revision_depth = env::var("CONTENT_REVISION_DEPTH")
            .unwrap_or_else(|_| "0".to_string())
            .parse()
            .context("CONTENT_REVISION_DEPTH must be a non-negative integer")?;

        Ok(Self {
            languages: with_default_first(&default_language, languages),
            default_language,
            use_site_id: env_flag("USE_SITE_ID", defaults.use_site_id)?,
            site_id,
            show_start_date: env_flag("SHOW_START_DATE", defaults.show_start_date)?,
            show_end_date: env_flag("SHOW_END_DATE", defaults.show_end_date)?,
            use_strict_url: env_flag("USE_STRICT_URL", defaults.use_strict_url)?,
            sanitize_user_input: env_flag("SANITIZE_USER_INPUT", defaults.sanitize_user_input)?,
            content_revision_depth,
            link_filter: env_flag("LINK_FILTER", defaults.link_filter)?,
        })
    }

    /// Replace the supported language list, keeping the default language in it.
    pub fn with_languages(mut self, languages: &[&str]) -> Self {
        let languages = languages.iter().map(|l| l.to_string()).collect();
        self.languages = with_default_first(&self.default_language, languages);
        self
    }

    /// Site that queries are restricted to, if site scoping is enforced.
    pub fn site_scope(&self) -> Option<i32> {
        self.use_site_id.then_some(self.site_id)
    }

    /// Map an empty language code to the default language.
    pub fn resolve_language<'a>(&'a self, language: &'a str) -> &'a str {
        if language.is_empty() {
            &self.default_language
        } else {
            language
        }
    }

    /// Check whether a language code is one of the supported languages.
    pub fn is_supported(&self, language: &str) -> bool {
        self.languages.iter().any(|l| l == language)
    }
}

/// Parse a comma-separated language list, dropping blanks and duplicates.
fn parse_language_list(value: &str) -> Vec<String> {
    let mut languages: Vec<String> = Vec::new();
    for code in value.split(',').map(|s| s.trim().to_lowercase()) {
        if !code.is_empty() && !languages.contains(&code) {
            languages.push(code);
        }
    }
    languages
}

/// Make sure the default language is part of the list. When missing it is
/// put first so fallback still reaches it.
fn with_default_first(default_language: &str, mut languages: Vec<String>) -> Vec<String> {
    if !languages.iter().any(|l| l == default_language) {
        languages.insert(0, default_language.to_string());
    }
    languages
}

/// Read a boolean flag. Accepts 1/0, true/false, yes/no, on/off.
fn env_flag(name: &str, default: bool) -> Result<bool> {
    match env::var(name) {
        Ok(value) => parse_flag(&value).with_context(|| format!("{name} must be a boolean flag")),
        Err(_) => Ok(default),
    }
}

fn parse_flag(value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => anyhow::bail!("unrecognized flag value '{other}'"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn language_list_is_deduplicated_and_trimmed() {
        assert_eq!(
            parse_language_list(" en, fr ,,de,FR"),
            vec!["en".to_string(), "fr".to_string(), "de".to_string()]
        );
    }

    #[test]
    fn default_language_is_prepended_when_missing() {
        let langs = with_default_first("en", vec!["fr".to_string(), "de".to_string()]);
        assert_eq!(langs, vec!["en", "fr", "de"]);

        let langs = with_default_first("fr", vec!["en".to_string(), "fr".to_string()]);
        assert_eq!(langs, vec!["en", "fr"]);
    }

    #[test]
    fn flags_parse() {
        assert!(parse_flag("1").unwrap());
        assert!(parse_flag("TRUE").unwrap());
        assert!(parse_flag(" on ").unwrap());
        assert!(!parse_flag("no").unwrap());
        assert!(!parse_flag("").unwrap());
        assert!(parse_flag("maybe").is_err());
    }

    #[test]
    fn site_scope_follows_flag() {
        let mut config = PageConfig::default();
        assert_eq!(config.site_scope(), None);

        config.use_site_id = true;
        config.site_id = 7;
        assert_eq!(config.site_scope(), Some(7));
    }

    #[test]
    fn empty_language_resolves_to_default() {
        let config = PageConfig::default().with_languages(&["fr", "de"]);
        assert_eq!(config.resolve_language(""), "en");
        assert_eq!(config.resolve_language("de"), "de");
        assert_eq!(config.languages, vec!["en", "fr", "de"]);
        assert!(config.is_supported("fr"));
        assert!(!config.is_supported("it"));
    }
}
