use crate::crawler::{FieldData, Headers};
use crate::page_tests::{word_count, TestRecorder};
use crate::RegistrationError;
use scraper::{Html, Selector};
use std::fmt;

/// Everything a test can inspect about one fetched page
#[derive(Debug, Clone, Copy)]
pub struct PageContext<'a> {
    /// Canonical URL of the page
    pub url: &'a str,
    pub document: &'a Html,
    pub headers: &'a Headers,
    pub field_data: &'a FieldData,
    pub phrases: &'a [String],
}

impl<'a> PageContext<'a> {
    /// First value of a response header, matched case-insensitively
    pub fn header(&self, name: &str) -> Option<&'a str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .and_then(|(_, values)| values.first())
            .map(String::as_str)
    }

    pub fn field(&self, key: &str) -> Option<&'a serde_json::Value> {
        self.field_data.get(key)
    }

    /// Number of words in the text of the page body
    pub fn word_count(&self) -> usize {
        let Ok(selector) = Selector::parse("body") else {
            return 0;
        };

        self.document
            .select(&selector)
            .flat_map(|body| body.text())
            .map(word_count)
            .sum()
    }
}

/// An inspection run against every fetched HTML page
///
/// A test reports its findings through the recorder, one value per declared
/// column, and fails by returning an error. Closures of the shape
/// `Fn(&PageContext<'_>, &mut TestRecorder<'_>) -> anyhow::Result<()>`
/// implement this trait, so simple tests need no dedicated type.
pub trait PageTest: Send + Sync {
    fn run(&self, page: &PageContext<'_>, results: &mut TestRecorder<'_>) -> anyhow::Result<()>;
}

impl<F> PageTest for F
where
    F: Fn(&PageContext<'_>, &mut TestRecorder<'_>) -> anyhow::Result<()> + Send + Sync,
{
    fn run(&self, page: &PageContext<'_>, results: &mut TestRecorder<'_>) -> anyhow::Result<()> {
        self(page, results)
    }
}

/// A registered test
pub struct TestDefinition {
    name: String,
    title: String,
    columns: Vec<String>,
    callback: Option<Box<dyn PageTest>>,
}

impl TestDefinition {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Result columns the test reports
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Returns true if the test was registered without a callback
    ///
    /// Scaffold slots reserve the name but are skipped by the runner.
    pub fn is_scaffold(&self) -> bool {
        self.callback.is_none()
    }

    pub fn callback(&self) -> Option<&dyn PageTest> {
        self.callback.as_deref()
    }
}

impl fmt::Debug for TestDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestDefinition")
            .field("name", &self.name)
            .field("title", &self.title)
            .field("columns", &self.columns)
            .field("scaffold", &self.is_scaffold())
            .finish()
    }
}

/// Ordered collection of tests, keyed by unique name
#[derive(Debug, Default)]
pub struct TestRegistry {
    tests: Vec<TestDefinition>,
}

impl TestRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a test
    ///
    /// # Arguments
    ///
    /// * `name` - Unique, non-empty test name
    /// * `title` - Human readable title
    /// * `columns` - Result columns the test reports; at least one
    /// * `callback` - The test itself, or `None` for a scaffold slot
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The test was appended to the registry
    /// * `Err(RegistrationError)` - Nothing was registered
    pub fn register<I, S>(
        &mut self,
        name: impl Into<String>,
        title: impl Into<String>,
        columns: I,
        callback: Option<Box<dyn PageTest>>,
    ) -> Result<(), RegistrationError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(RegistrationError::EmptyName);
        }
        if self.get(&name).is_some() {
            return Err(RegistrationError::DuplicateName(name));
        }

        let title = title.into();
        if title.trim().is_empty() {
            return Err(RegistrationError::EmptyTitle(name));
        }

        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        if columns.is_empty() {
            return Err(RegistrationError::NoColumns(name));
        }

        tracing::debug!(
            "Registered test '{}'{}",
            name,
            if callback.is_none() { " (scaffold)" } else { "" }
        );
        self.tests.push(TestDefinition {
            name,
            title,
            columns,
            callback,
        });
        Ok(())
    }

    /// Registers a test with a callback
    pub fn add<I, S, T>(
        &mut self,
        name: impl Into<String>,
        title: impl Into<String>,
        columns: I,
        test: T,
    ) -> Result<(), RegistrationError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        T: PageTest + 'static,
    {
        self.register(name, title, columns, Some(Box::new(test)))
    }

    pub fn get(&self, name: &str) -> Option<&TestDefinition> {
        self.tests.iter().find(|test| test.name == name)
    }

    /// All tests in registration order, scaffolds included
    pub fn iter(&self) -> impl Iterator<Item = &TestDefinition> {
        self.tests.iter()
    }

    /// Tests that have a callback, in registration order
    pub fn runnable(&self) -> impl Iterator<Item = (&TestDefinition, &dyn PageTest)> {
        self.tests
            .iter()
            .filter_map(|test| test.callback().map(|callback| (test, callback)))
    }

    pub fn names(&self) -> Vec<String> {
        self.tests.iter().map(|test| test.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.tests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passing(_page: &PageContext<'_>, _results: &mut TestRecorder<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    #[test]
    fn test_register_in_order() {
        let mut registry = TestRegistry::new();
        registry.add("title", "Page title", ["Title"], passing).unwrap();
        registry
            .add("h1", "Headings", ["Count", "Text"], passing)
            .unwrap();

        assert_eq!(registry.names(), vec!["title", "h1"]);
        assert_eq!(registry.get("h1").unwrap().columns(), &["Count", "Text"]);
        assert_eq!(registry.get("title").unwrap().title(), "Page title");
    }

    #[test]
    fn test_register_empty_name() {
        let mut registry = TestRegistry::new();
        let err = registry.add("  ", "Title", ["A"], passing).unwrap_err();
        assert_eq!(err, RegistrationError::EmptyName);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_register_duplicate_name() {
        let mut registry = TestRegistry::new();
        registry.add("title", "Page title", ["Title"], passing).unwrap();

        let err = registry
            .add("title", "Another", ["Title"], passing)
            .unwrap_err();
        assert_eq!(err, RegistrationError::DuplicateName("title".to_string()));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_register_empty_title() {
        let mut registry = TestRegistry::new();
        let err = registry.add("title", "", ["Title"], passing).unwrap_err();
        assert_eq!(err, RegistrationError::EmptyTitle("title".to_string()));
    }

    #[test]
    fn test_register_no_columns() {
        let mut registry = TestRegistry::new();
        let err = registry
            .add("title", "Page title", Vec::<String>::new(), passing)
            .unwrap_err();
        assert_eq!(err, RegistrationError::NoColumns("title".to_string()));
    }

    #[test]
    fn test_scaffold_slot_reserves_name() {
        let mut registry = TestRegistry::new();
        registry
            .register("later", "Filled in later", ["Result"], None)
            .unwrap();

        assert!(registry.get("later").unwrap().is_scaffold());
        assert_eq!(registry.runnable().count(), 0);

        let err = registry
            .add("later", "Filled in later", ["Result"], passing)
            .unwrap_err();
        assert_eq!(err, RegistrationError::DuplicateName("later".to_string()));
    }

    #[test]
    fn test_page_context_lookups() {
        let document = Html::parse_document("<html><head></head><body></body></html>");
        let mut headers = Headers::new();
        headers.insert(
            "Content-Type".to_string(),
            vec!["text/html".to_string(), "charset=utf-8".to_string()],
        );
        let mut field_data = FieldData::new();
        field_data.insert("word_count".to_string(), serde_json::json!(120));

        let page = PageContext {
            url: "about",
            document: &document,
            headers: &headers,
            field_data: &field_data,
            phrases: &[],
        };

        assert_eq!(page.header("content-type"), Some("text/html"));
        assert_eq!(page.header("x-missing"), None);
        assert_eq!(page.field("word_count"), Some(&serde_json::json!(120)));
        assert_eq!(page.word_count(), 0);
    }

    #[test]
    fn test_page_word_count() {
        let document = Html::parse_document(
            "<html><head><title>Not counted</title></head>\
             <body><h1>Welcome home</h1><p>Three more words</p></body></html>",
        );
        let headers = Headers::new();
        let field_data = FieldData::new();
        let page = PageContext {
            url: "/",
            document: &document,
            headers: &headers,
            field_data: &field_data,
            phrases: &[],
        };

        assert_eq!(page.word_count(), 5);
    }
}
