//! Sentiero test utilities.
//!
//! Helpers for integration testing: page fixture builders and assertion
//! utilities. Nothing here depends on the kernel; tests translate the
//! builders into kernel calls themselves.

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

/// Status codes as stored in the `page.status` column.
pub mod status {
    pub const DRAFT: i16 = 0;
    pub const PUBLISHED: i16 = 1;
    pub const HIDDEN: i16 = 3;
}

/// Create a published test page carrying `slug` (and the same title) in
/// English.
pub fn test_page(slug: &str) -> TestPage {
    TestPage {
        status: status::PUBLISHED,
        sites: vec![1],
        publication_date: None,
        publication_end_date: None,
        contents: vec![
            TestContent::new("en", "slug", slug),
            TestContent::new("en", "title", slug),
        ],
    }
}

/// A slug that will not collide with other tests sharing a database.
pub fn unique_slug(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::now_v7().simple())
}

/// One content body of a test page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestContent {
    pub language: String,
    pub content_type: String,
    pub body: String,
}

impl TestContent {
    pub fn new(language: &str, content_type: &str, body: &str) -> Self {
        Self {
            language: language.to_string(),
            content_type: content_type.to_string(),
            body: body.to_string(),
        }
    }
}

/// A test page builder for creating fixtures.
#[derive(Debug, Clone)]
pub struct TestPage {
    pub status: i16,
    pub sites: Vec<i32>,
    pub publication_date: Option<DateTime<Utc>>,
    pub publication_end_date: Option<DateTime<Utc>>,
    pub contents: Vec<TestContent>,
}

impl TestPage {
    /// Set as draft.
    pub fn draft(mut self) -> Self {
        self.status = status::DRAFT;
        self
    }

    /// Set as hidden.
    pub fn hidden(mut self) -> Self {
        self.status = status::HIDDEN;
        self
    }

    /// Set the sites the page belongs to.
    pub fn on_sites(mut self, sites: &[i32]) -> Self {
        self.sites = sites.to_vec();
        self
    }

    /// Publication starts `days` from now (negative for the past).
    pub fn starting_in_days(mut self, days: i64) -> Self {
        self.publication_date = Some(Utc::now() + Duration::days(days));
        self
    }

    /// Publication ends `days` from now (negative for the past).
    pub fn ending_in_days(mut self, days: i64) -> Self {
        self.publication_end_date = Some(Utc::now() + Duration::days(days));
        self
    }

    /// Set or replace one content body.
    pub fn with_content(mut self, language: &str, content_type: &str, body: &str) -> Self {
        self.contents
            .retain(|c| !(c.language == language && c.content_type == content_type));
        self.contents
            .push(TestContent::new(language, content_type, body));
        self
    }

    /// Set the title in a language.
    pub fn with_title(self, language: &str, title: &str) -> Self {
        self.with_content(language, "title", title)
    }

    /// Set the slug in a language.
    pub fn with_slug(self, language: &str, slug: &str) -> Self {
        self.with_content(language, "slug", slug)
    }

    /// Set the body in a language.
    pub fn with_body(self, language: &str, body: &str) -> Self {
        self.with_content(language, "body", body)
    }

    /// The body of one content type in a language, if set.
    pub fn content(&self, language: &str, content_type: &str) -> Option<&str> {
        self.contents
            .iter()
            .find(|c| c.language == language && c.content_type == content_type)
            .map(|c| c.body.as_str())
    }
}

/// Assertion helpers.
pub mod assert {
    use serde_json::Value;
    use uuid::Uuid;

    /// Assert that a JSON object has a string field with the expected value.
    pub fn json_str(value: &Value, key: &str, expected: &str) {
        assert_eq!(
            value.get(key).and_then(Value::as_str),
            Some(expected),
            "Expected '{key}' to be {expected:?} in: {value}"
        );
    }

    /// Assert that two id lists are equal, order included.
    pub fn same_ids(actual: &[Uuid], expected: &[Uuid]) {
        assert_eq!(
            actual, expected,
            "id lists differ:\nactual:   {actual:?}\nexpected: {expected:?}"
        );
    }
}
