//! Values recorded by page tests
//!
//! Each test declares its result columns at registration. While it runs on a
//! page it records values into those columns through a [`TestRecorder`]; the
//! values of the whole crawl end up in [`TestResults`].

use crate::page_tests::TestDefinition;
use serde_json::Value;
use std::collections::BTreeMap;

/// One value a test recorded for a page
#[derive(Debug, Clone, PartialEq)]
pub struct ResultEntry {
    /// Canonical URL of the page
    pub url: String,
    pub value: Value,
}

/// Recorded values keyed by test name and column
///
/// Entries under one key stay in recording order. Recording the same key
/// twice for a page keeps both values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TestResults {
    tests: BTreeMap<String, BTreeMap<String, Vec<ResultEntry>>>,
}

impl TestResults {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, test: &str, column: &str, url: &str, value: Value) {
        self.tests
            .entry(test.to_string())
            .or_default()
            .entry(column.to_string())
            .or_default()
            .push(ResultEntry {
                url: url.to_string(),
                value,
            });
    }

    /// Values recorded for one test column, in recording order
    pub fn get(&self, test: &str, column: &str) -> &[ResultEntry] {
        self.tests
            .get(test)
            .and_then(|columns| columns.get(column))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Every entry as `(test, column, entry)`, sorted by test then column
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, &ResultEntry)> {
        self.tests.iter().flat_map(|(test, columns)| {
            columns.iter().flat_map(move |(column, entries)| {
                entries
                    .iter()
                    .map(move |entry| (test.as_str(), column.as_str(), entry))
            })
        })
    }

    /// Total number of recorded values
    pub fn len(&self) -> usize {
        self.tests
            .values()
            .flat_map(BTreeMap::values)
            .map(Vec::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Records values for one test on one page
///
/// Only the columns the test declared at registration are accepted.
pub struct TestRecorder<'r> {
    test: &'r str,
    columns: &'r [String],
    url: &'r str,
    results: &'r mut TestResults,
}

impl<'r> TestRecorder<'r> {
    pub fn new(definition: &'r TestDefinition, url: &'r str, results: &'r mut TestResults) -> Self {
        Self {
            test: definition.name(),
            columns: definition.columns(),
            url,
            results,
        }
    }

    /// Name of the test this recorder belongs to
    pub fn test(&self) -> &str {
        self.test
    }

    /// Records a value in one of the test's columns
    ///
    /// # Errors
    ///
    /// Fails when `column` was not declared for the test.
    pub fn record(&mut self, column: &str, value: impl Into<Value>) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.columns.iter().any(|declared| declared == column),
            "test '{}' has no result column '{}'",
            self.test,
            column
        );
        self.results.record(self.test, column, self.url, value.into());
        Ok(())
    }
}

/// Counts the whitespace separated words of a text
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}
